use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::auth::Identity;
use crate::config::DeploymentMode;

use super::{AgentError, CallRequest, MethodDescriptor, ServiceDescriptor, Transport};

/// A callable proxy for a remote service, acting as one identity.
#[async_trait]
pub trait RemoteActor: Send + Sync + fmt::Debug {
    async fn call(&self, method: &str, args: Value) -> Result<Value, AgentError>;

    /// Address of the service this actor talks to.
    fn canister_id(&self) -> &str;
}

/// Network agent scoped to a single identity.
pub struct HttpAgent {
    transport: Arc<dyn Transport>,
    identity: Arc<dyn Identity>,
    mode: DeploymentMode,
    root_key: Option<Vec<u8>>,
}

impl fmt::Debug for HttpAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAgent")
            .field("principal", &self.identity.principal_text())
            .field("mode", &self.mode)
            .field("has_root_key", &self.root_key.is_some())
            .finish()
    }
}

impl HttpAgent {
    pub fn new(transport: Arc<dyn Transport>, identity: Arc<dyn Identity>, mode: DeploymentMode) -> Self {
        Self {
            transport,
            identity,
            mode,
            root_key: None,
        }
    }

    /// Trust a root key that is already known, without asking the replica.
    pub fn with_root_key(mut self, root_key: Vec<u8>) -> Self {
        self.root_key = Some(root_key);
        self
    }

    /// Ask the replica for its root key and trust it from now on.
    /// Only meant for local and test replicas.
    pub async fn fetch_root_key(&mut self) -> Result<(), AgentError> {
        let key = self.transport.fetch_root_key().await?;
        debug!(key_len = key.len(), "Root key fetched");
        self.root_key = Some(key);
        Ok(())
    }

    pub async fn call(
        &self,
        canister_id: &str,
        method: &MethodDescriptor,
        arg: Value,
    ) -> Result<Value, AgentError> {
        // Production replicas are trusted through the network's built-in root.
        if !self.mode.is_production() && self.root_key.is_none() {
            return Err(AgentError::MissingRootKey);
        }

        let request = CallRequest {
            canister_id: canister_id.to_string(),
            method: method.name.clone(),
            kind: method.kind,
            sender: self.identity.principal_text(),
            arg,
        };
        self.transport.submit(&request, self.identity.delegation()).await
    }
}

/// Actor for a canister described by a `ServiceDescriptor`.
#[derive(Debug)]
pub struct CanisterActor {
    agent: HttpAgent,
    canister_id: String,
    service: ServiceDescriptor,
}

impl CanisterActor {
    pub fn new(agent: HttpAgent, canister_id: impl Into<String>, service: ServiceDescriptor) -> Self {
        Self {
            agent,
            canister_id: canister_id.into(),
            service,
        }
    }
}

#[async_trait]
impl RemoteActor for CanisterActor {
    async fn call(&self, method: &str, args: Value) -> Result<Value, AgentError> {
        let descriptor = self
            .service
            .method(method)
            .ok_or_else(|| AgentError::UnknownMethod {
                service: self.service.name.clone(),
                method: method.to_string(),
            })?;
        self.agent.call(&self.canister_id, descriptor, args).await
    }

    fn canister_id(&self) -> &str {
        &self.canister_id
    }
}
