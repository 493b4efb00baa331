//! Provider result-code vocabulary.

use std::fmt;

/// Result codes reported by a completed provider session.
///
/// `OK` is the only success. Codes outside this set are unrecognized and
/// leave the session untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    /// The user authenticated.
    Ok,
    /// The user did not act within the provider's time limit.
    Timeout,
    /// The personal code and phone number are not a Mobile-ID client.
    NotMidClient,
    /// The user cancelled on the phone.
    UserCancelled,
    /// The signature does not match the hash.
    SignatureHashMismatch,
    /// The phone is unreachable.
    PhoneAbsent,
    /// The SMS could not be delivered.
    DeliveryError,
    /// The SIM card failed.
    SimError,
    /// The user refused in the Smart-ID app.
    UserRefused,
    /// The Smart-ID account cannot be used.
    DocumentUnusable,
    /// The user picked the wrong verification code.
    WrongVc,
    /// The app does not support the requested interaction.
    RequiredInteractionNotSupportedByApp,
    /// The user refused the certificate choice.
    UserRefusedCertChoice,
    /// The user refused the display-text-and-PIN interaction.
    UserRefusedDisplayTextAndPin,
    /// The user refused the verification-code choice.
    UserRefusedVcChoice,
    /// The user refused the confirmation message.
    UserRefusedConfirmationMessage,
    /// The user refused the confirmation message with verification-code choice.
    UserRefusedConfirmationMessageWithVcChoice,
}

impl ResultCode {
    const ALL: [ResultCode; 17] = [
        Self::Ok,
        Self::Timeout,
        Self::NotMidClient,
        Self::UserCancelled,
        Self::SignatureHashMismatch,
        Self::PhoneAbsent,
        Self::DeliveryError,
        Self::SimError,
        Self::UserRefused,
        Self::DocumentUnusable,
        Self::WrongVc,
        Self::RequiredInteractionNotSupportedByApp,
        Self::UserRefusedCertChoice,
        Self::UserRefusedDisplayTextAndPin,
        Self::UserRefusedVcChoice,
        Self::UserRefusedConfirmationMessage,
        Self::UserRefusedConfirmationMessageWithVcChoice,
    ];

    /// Parses a provider result code. Returns `None` for unrecognized codes.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }

    /// Returns the wire form of the code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Timeout => "TIMEOUT",
            Self::NotMidClient => "NOT_MID_CLIENT",
            Self::UserCancelled => "USER_CANCELLED",
            Self::SignatureHashMismatch => "SIGNATURE_HASH_MISMATCH",
            Self::PhoneAbsent => "PHONE_ABSENT",
            Self::DeliveryError => "DELIVERY_ERROR",
            Self::SimError => "SIM_ERROR",
            Self::UserRefused => "USER_REFUSED",
            Self::DocumentUnusable => "DOCUMENT_UNUSABLE",
            Self::WrongVc => "WRONG_VC",
            Self::RequiredInteractionNotSupportedByApp => {
                "REQUIRED_INTERACTION_NOT_SUPPORTED_BY_APP"
            }
            Self::UserRefusedCertChoice => "USER_REFUSED_CERT_CHOICE",
            Self::UserRefusedDisplayTextAndPin => "USER_REFUSED_DISPLAYTEXTANDPIN",
            Self::UserRefusedVcChoice => "USER_REFUSED_VC_CHOICE",
            Self::UserRefusedConfirmationMessage => "USER_REFUSED_CONFIRMATIONMESSAGE",
            Self::UserRefusedConfirmationMessageWithVcChoice => {
                "USER_REFUSED_CONFIRMATIONMESSAGE_WITH_VC_CHOICE"
            }
        }
    }

    /// Returns `true` for `OK`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_codes() {
        for code in ResultCode::ALL {
            assert_eq!(ResultCode::parse(code.as_str()), Some(code));
        }
        assert_eq!(ResultCode::parse("TIMEOUT"), Some(ResultCode::Timeout));
        assert_eq!(
            ResultCode::parse("USER_REFUSED_DISPLAYTEXTANDPIN"),
            Some(ResultCode::UserRefusedDisplayTextAndPin)
        );
    }

    #[test]
    fn test_unrecognized_codes() {
        assert_eq!(ResultCode::parse("ok"), None);
        assert_eq!(ResultCode::parse("SOMETHING_NEW"), None);
        assert_eq!(ResultCode::parse(""), None);
    }

    #[test]
    fn test_only_ok_is_success() {
        assert!(ResultCode::Ok.is_success());
        assert!(
            ResultCode::ALL
                .iter()
                .filter(|c| c.is_success())
                .count()
                == 1
        );
    }
}
