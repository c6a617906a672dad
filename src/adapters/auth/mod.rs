//! Authentication adapters.
//!
//! Implementations of the `AuthApi` and `CredentialStore` ports that do not
//! need the backend (the HTTP `AuthApi` lives in `adapters::http`):
//!
//! - `file_store` - JSON file holding the persisted credential
//! - `mock` - In-memory test implementations

mod file_store;
mod mock;

pub use file_store::FileCredentialStore;
pub use mock::{InMemoryCredentialStore, MockAuthApi};
