//! Authentication state kept between CLI runs.
//!
//! - `Session`: the Strapi JWT and user, persisted to the cache directory
//! - `CredentialStore`: optional password storage in the OS keychain
//!
//! Tokens are treated as valid for 30 days, Strapi's default JWT lifetime.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData};
