//! Token signing and issuance.
//!
//! - JWT encoding and decoding with HS256/RS256/RS384/ES384 keys
//! - Access/refresh pair issuance with authorization graph claims

pub mod issuer;
pub mod jwt;

pub use issuer::{TokenConfig, TokenIssuer, TokenPair};
pub use jwt::{
    AccessClaims, Jwk, Jwks, JwtError, JwtService, RefreshClaims, SigningAlgorithm,
    SigningKeyPair,
};
