pub mod credentials;
pub mod recorder;
pub mod runner;
pub mod session;

pub use credentials::{store_credentials, LoginDetector};
pub use runner::{Agent, CommandRunner, ConfigProviderResolver, ProviderResolver};
pub use session::{CredentialRecord, SessionState};
