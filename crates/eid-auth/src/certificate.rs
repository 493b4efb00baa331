//! Identity extraction from provider certificates.
//!
//! Both providers return the signer's X.509 certificate as base64 DER. The
//! subject carries the user's name in the common name (`"<first>,<last>"`)
//! and the ETSI semantics identifier in the serial number attribute
//! (`PNO<country>-<personal code>`).

use std::sync::LazyLock;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use x509_cert::Certificate;
use x509_cert::der::Decode;
use x509_cert::der::asn1::ObjectIdentifier;

use crate::AuthResult;
use crate::error::AuthError;

/// `id-at-commonName`
const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// `id-at-serialNumber`
const SERIAL_NUMBER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.5");

/// `PNO` + two letter country + `-` + personal code digits.
static IDENTITY_NUMBER_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^PNO[A-Z]{2}-(\d+)$").expect("Invalid identity number regex")
});

/// Identity attributes read from a certificate subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Full identity number, e.g. `PNOEE-60001017869`.
    pub identity_number: String,
    /// Digits of the identity number.
    pub personal_code: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

/// Extracts the identity from a base64 DER certificate.
///
/// # Errors
///
/// - `AuthError::InvalidCertificate` if the blob is not base64, not a DER
///   certificate, lacks a common name, or the common name has fewer than two
///   comma-separated parts
/// - `AuthError::InvalidIdentityNumber` if the serial number is missing or is
///   not `PNO<country>-<digits>`
pub fn extract_identity(certificate: &str) -> AuthResult<Identity> {
    let der = STANDARD
        .decode(certificate.trim())
        .map_err(|e| AuthError::invalid_certificate(format!("not base64: {e}")))?;

    let cert = Certificate::from_der(&der)
        .map_err(|e| AuthError::invalid_certificate(format!("not a DER certificate: {e}")))?;

    let mut common_name = None;
    let mut serial_number = None;
    for rdn in cert.tbs_certificate.subject.0.iter() {
        for atv in rdn.0.iter() {
            if atv.oid == COMMON_NAME {
                common_name = Some(attribute_text(atv.value.value())?);
            } else if atv.oid == SERIAL_NUMBER {
                serial_number = Some(attribute_text(atv.value.value())?);
            }
        }
    }

    let common_name =
        common_name.ok_or_else(|| AuthError::invalid_certificate("subject has no common name"))?;
    let mut parts = common_name.split(',').map(str::trim);
    let (first_name, last_name) = match (parts.next(), parts.next()) {
        (Some(first), Some(last)) => (first.to_string(), last.to_string()),
        _ => {
            return Err(AuthError::invalid_certificate(format!(
                "common name is not \"<first>,<last>\": {common_name}"
            )));
        }
    };

    let identity_number = serial_number.unwrap_or_default();
    let personal_code = IDENTITY_NUMBER_REGEX
        .captures(&identity_number)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| AuthError::invalid_identity_number(identity_number.clone()))?;

    Ok(Identity {
        identity_number,
        personal_code,
        first_name,
        last_name,
    })
}

fn attribute_text(bytes: &[u8]) -> AuthResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| AuthError::invalid_certificate("subject attribute is not UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};

    fn certificate(common_name: Option<&str>, serial: Option<&str>) -> String {
        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        if let Some(cn) = common_name {
            dn.push(DnType::CommonName, cn);
        }
        if let Some(serial) = serial {
            dn.push(DnType::CustomDnType(vec![2, 5, 4, 5]), serial);
        }
        dn.push(DnType::CountryName, "EE");
        params.distinguished_name = dn;

        let key = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();
        STANDARD.encode(cert.der())
    }

    #[test]
    fn test_extracts_identity() {
        let cert = certificate(Some("Mary,Änn"), Some("PNOEE-60001017869"));
        let identity = extract_identity(&cert).unwrap();
        assert_eq!(
            identity,
            Identity {
                identity_number: "PNOEE-60001017869".to_string(),
                personal_code: "60001017869".to_string(),
                first_name: "Mary".to_string(),
                last_name: "Änn".to_string(),
            }
        );
    }

    #[test]
    fn test_common_name_without_comma() {
        let cert = certificate(Some("Mary Änn"), Some("PNOEE-60001017869"));
        let err = extract_identity(&cert).unwrap_err();
        assert!(matches!(err, AuthError::InvalidCertificate { .. }));
    }

    #[test]
    fn test_missing_common_name() {
        let cert = certificate(None, Some("PNOEE-60001017869"));
        let err = extract_identity(&cert).unwrap_err();
        assert!(matches!(err, AuthError::InvalidCertificate { .. }));
    }

    #[test]
    fn test_serial_without_pno_prefix() {
        let cert = certificate(Some("Mary,Änn"), Some("IDCEE-60001017869"));
        let err = extract_identity(&cert).unwrap_err();
        assert!(matches!(err, AuthError::InvalidIdentityNumber { .. }));
    }

    #[test]
    fn test_serial_without_digits() {
        let cert = certificate(Some("Mary,Änn"), Some("PNOEE-"));
        let err = extract_identity(&cert).unwrap_err();
        assert!(matches!(err, AuthError::InvalidIdentityNumber { .. }));
    }

    #[test]
    fn test_missing_serial() {
        let cert = certificate(Some("Mary,Änn"), None);
        let err = extract_identity(&cert).unwrap_err();
        assert!(matches!(err, AuthError::InvalidIdentityNumber { .. }));
    }

    #[test]
    fn test_garbage_input() {
        let err = extract_identity("!!not base64!!").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCertificate { .. }));

        let err = extract_identity(&STANDARD.encode(b"not a certificate")).unwrap_err();
        assert!(matches!(err, AuthError::InvalidCertificate { .. }));
    }
}
