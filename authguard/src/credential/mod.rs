//! Accounts, salted password credentials and the credential version that
//! ties sessions to the password they were created with.

pub mod errors;
pub mod models;
pub mod repository;
pub mod service;

pub use errors::{CredentialError, CredentialResult};
pub use models::{Credential, User};
pub use repository::{CredentialRepository, MemoryCredentialRepository, PgCredentialRepository};
pub use service::AccountService;
