//! Remote canister access on behalf of an identity.
//!
//! This module provides the `ActorBinder`, which builds an `HttpAgent` for an
//! identity, establishes the trust root when not running in production, and
//! publishes the resulting `RemoteActor` into a shared `ActorSlot`.
//!
//! Calls are sent as JSON to the replica's canister endpoints and carry the
//! identity's delegation as a bearer token.

pub mod actor;
pub mod binder;
pub mod descriptor;
pub mod error;
pub mod transport;

pub use actor::{CanisterActor, HttpAgent, RemoteActor};
pub use binder::{ActorBinder, ActorSlot};
pub use descriptor::{MethodDescriptor, MethodKind, ServiceDescriptor};
pub use error::AgentError;
pub use transport::{CallRequest, HttpTransport, Transport};
