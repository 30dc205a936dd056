//! Chainverse core library.
//!
//! Everything the front end needs to log a user in with a delegated identity
//! and talk to the NFT canister on their behalf:
//!
//! - `config`: deployment mode, provider URL, canister address
//! - `auth`: identities, identity storage, the identity provider hand-off
//! - `agent`: HTTP transport, agents and bound canister actors
//! - `session`: the session manager tying login/logout to actor binding
//! - `nft`: mint requests sent through a bound actor
//! - `utils`: display formatting helpers

pub mod agent;
pub mod auth;
pub mod config;
pub mod nft;
pub mod session;
pub mod utils;

#[cfg(test)]
mod testing;

pub use agent::{ActorBinder, ActorSlot, AgentError, RemoteActor, ServiceDescriptor};
pub use auth::{AuthClient, AuthError, DelegatedIdentity, Identity, IdentityProvider};
pub use config::{Config, DeploymentMode};
pub use session::{Notifier, Session, SessionError, SessionManager};
