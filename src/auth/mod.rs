// Authentication module
// Manages credential lifecycle: persisted store, grant exchanges and validation

mod callback;
mod grants;
mod manager;
mod store;
mod types;

pub use callback::{authorize_url, CallbackServer};
pub use manager::TokenManager;
pub use store::CredentialStore;
pub use types::{Credential, GrantType, TokenResponse};
