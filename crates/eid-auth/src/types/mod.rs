//! Domain types shared by the session, storage and token modules.
//!
//! ## Domain Types
//!
//! - [`Session`] - One in-flight or just-resolved authentication attempt
//! - [`User`] - A resolved human identity
//! - [`Token`] - An issued access or refresh credential

pub mod session;
pub mod token;
pub mod user;

pub use session::{Session, SessionPayload, SessionStatus};
pub use token::{Token, TokenType};
pub use user::User;
