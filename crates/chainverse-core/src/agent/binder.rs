use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::auth::Identity;
use crate::config::DeploymentMode;

use super::{AgentError, CanisterActor, HttpAgent, RemoteActor, ServiceDescriptor, Transport};

type ActorHandle = Option<Arc<dyn RemoteActor>>;

/// Shared slot holding the currently bound actor, if any.
///
/// Cloning shares the slot. Writers replace the whole value; readers always
/// see the latest one.
#[derive(Clone)]
pub struct ActorSlot {
    tx: Arc<watch::Sender<ActorHandle>>,
}

impl Default for ActorSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ActorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorSlot")
            .field("actor", &*self.tx.borrow())
            .finish()
    }
}

impl ActorSlot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn publish(&self, actor: Arc<dyn RemoteActor>) {
        self.tx.send_replace(Some(actor));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn current(&self) -> Option<Arc<dyn RemoteActor>> {
        self.tx.borrow().clone()
    }

    pub fn is_bound(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Receive every change to the slot.
    pub fn subscribe(&self) -> watch::Receiver<ActorHandle> {
        self.tx.subscribe()
    }
}

/// Builds actors for identities and publishes them to the slot.
pub struct ActorBinder {
    transport: Arc<dyn Transport>,
    mode: DeploymentMode,
    root_key: Option<Vec<u8>>,
    slot: ActorSlot,
}

impl ActorBinder {
    pub fn new(transport: Arc<dyn Transport>, mode: DeploymentMode, slot: ActorSlot) -> Self {
        Self {
            transport,
            mode,
            root_key: None,
            slot,
        }
    }

    /// Root key trusted in production, where it is never fetched.
    pub fn with_root_key(mut self, root_key: Option<Vec<u8>>) -> Self {
        self.root_key = root_key;
        self
    }

    pub fn slot(&self) -> &ActorSlot {
        &self.slot
    }

    /// Build an actor for `identity` and publish it.
    pub async fn bind(
        &self,
        identity: Arc<dyn Identity>,
        service: &ServiceDescriptor,
        canister_id: &str,
    ) -> Result<Arc<dyn RemoteActor>, AgentError> {
        let principal = identity.principal_text();
        let mut agent = HttpAgent::new(self.transport.clone(), identity, self.mode);

        if self.mode.is_production() {
            if let Some(ref key) = self.root_key {
                agent = agent.with_root_key(key.clone());
            }
        } else {
            debug!("Non-production deployment, fetching root key");
            agent.fetch_root_key().await?;
        }

        let actor: Arc<dyn RemoteActor> =
            Arc::new(CanisterActor::new(agent, canister_id, service.clone()));
        self.slot.publish(actor.clone());

        info!(%principal, canister_id, service = %service.name, "Actor bound");
        Ok(actor)
    }

    /// Drop the published actor.
    pub fn discard(&self) {
        if self.slot.is_bound() {
            debug!("Discarding bound actor");
        }
        self.slot.clear();
    }
}
