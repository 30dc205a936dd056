//! Session lifecycle.
//!
//! `SessionManager` restores, creates and ends sessions, binding a remote
//! actor whenever a session becomes authenticated and discarding it on logout.
//! `Session` is the observable state the front end renders from.

pub mod error;
pub mod manager;
pub mod notifier;
pub mod state;

pub use error::SessionError;
pub use manager::{SessionManager, SessionOptions, LOGIN_ERROR_NOTICE, LOGIN_FAILED_NOTICE};
pub use notifier::Notifier;
pub use state::Session;
