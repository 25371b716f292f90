pub mod manager;
pub mod profile;
pub mod session;

pub use manager::{CredentialManager, CredentialStatus};
pub use profile::{Credential, CredentialStore};
pub use session::AuthSession;
