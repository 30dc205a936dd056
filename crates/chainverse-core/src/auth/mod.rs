//! Authentication module for delegated identities.
//!
//! This module provides:
//! - `Identity` / `DelegatedIdentity`: the credential a user logs in with
//! - `IdentityStorage`: persistence of the identity between runs (file or OS keychain)
//! - `IdentityProvider`: the interactive hand-off to an external identity provider
//! - `AuthClient`: owns the current identity and drives login/logout
//!
//! Delegations expire after the time to live requested at login (8 hours by default).

pub mod client;
pub mod error;
pub mod identity;
pub mod provider;
pub mod storage;

pub use client::{AuthClient, LoginOptions};
pub use error::AuthError;
pub use identity::{DelegatedIdentity, Identity};
pub use provider::{AuthorizeRequest, IdentityProvider, LoopbackProvider};
pub use storage::{FileStorage, IdentityStorage, KeyringStorage, MemoryStorage};
