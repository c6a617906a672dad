//! Session/identity provider.

mod provider;

pub use provider::SessionProvider;
