//! Storage traits for users, the authorization graph and issued tokens.
//!
//! # Implementations
//!
//! Storage implementations are provided in separate crates:
//!
//! - `eid-auth-postgres` - PostgreSQL storage backend

pub mod authorization;
pub mod token;
pub mod user;

pub use authorization::AuthorizationResolver;
pub use token::TokenStorage;
pub use user::UserStorage;
