//! Credential handling for the chatwire client.
//!
//! # Components
//!
//! - [`credential`]: the three credential kinds and the headers they produce
//! - [`token_store`]: single owner of the active credential, proactive and
//!   single-flight token refresh
//! - [`store`]: persistence seam (file and in-memory implementations)
//! - [`clock`]: injectable time source for expiry decisions
//! - [`oauth`]: PKCE sign-in helpers and an OAuth-backed refresher

pub mod clock;
pub mod credential;
pub mod error;
pub mod oauth;
pub mod store;
pub mod token_store;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use credential::{AuthHeaders, Credential, StoredCredential, TokenGrant};
pub use error::{AuthError, Result};
pub use oauth::{OAuthConfig, OAuthRefresher, PkceChallenge};
pub use store::{
    CredentialStore, FileCredentialStore, InMemoryCredentialStore, SharedCredentialStore,
};
pub use token_store::{
    AuthStatus, SharedRefresher, TokenRefresher, TokenStore, TokenStoreBuilder,
};
