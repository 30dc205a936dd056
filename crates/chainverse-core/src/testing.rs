//! In-memory fakes shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;

use crate::agent::{AgentError, CallRequest, Transport};
use crate::auth::{AuthError, AuthorizeRequest, DelegatedIdentity, IdentityProvider, IdentityStorage};
use crate::session::Notifier;

pub fn identity_for(principal: &str, minutes: i64) -> DelegatedIdentity {
    DelegatedIdentity {
        principal: principal.to_string(),
        delegation: format!("delegation-{}", principal),
        session_key: "00".to_string(),
        expires_at: Utc::now() + Duration::minutes(minutes),
    }
}

pub struct FakeProvider {
    outcome: Result<String, String>,
    revoke_fails: bool,
    authorize_calls: AtomicUsize,
    revoke_calls: AtomicUsize,
    last_request: Mutex<Option<AuthorizeRequest>>,
}

impl FakeProvider {
    pub fn succeeding(principal: &str) -> Self {
        Self::with_outcome(Ok(principal.to_string()))
    }

    pub fn failing(reason: &str) -> Self {
        Self::with_outcome(Err(reason.to_string()))
    }

    fn with_outcome(outcome: Result<String, String>) -> Self {
        Self {
            outcome,
            revoke_fails: false,
            authorize_calls: AtomicUsize::new(0),
            revoke_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_failing_revoke(mut self) -> Self {
        self.revoke_fails = true;
        self
    }

    pub fn authorize_calls(&self) -> usize {
        self.authorize_calls.load(Ordering::SeqCst)
    }

    pub fn revoke_calls(&self) -> usize {
        self.revoke_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<AuthorizeRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn authorize(&self, request: AuthorizeRequest) -> Result<DelegatedIdentity, AuthError> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
        match self.outcome {
            Ok(ref principal) => Ok(identity_for(principal, 480)),
            Err(ref reason) => Err(AuthError::Rejected(reason.clone())),
        }
    }

    async fn revoke(&self, _identity: &DelegatedIdentity) -> Result<(), AuthError> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        if self.revoke_fails {
            Err(AuthError::Provider("logout returned 503".to_string()))
        } else {
            Ok(())
        }
    }
}

pub struct FakeTransport {
    reply: Value,
    root_key_fails: bool,
    root_key_fetches: AtomicUsize,
    submitted: Mutex<Vec<(CallRequest, Option<String>)>>,
}

impl FakeTransport {
    pub fn replying(reply: Value) -> Self {
        Self {
            reply,
            root_key_fails: false,
            root_key_fetches: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_failing_root_key(mut self) -> Self {
        self.root_key_fails = true;
        self
    }

    pub fn root_key_fetches(&self) -> usize {
        self.root_key_fetches.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<(CallRequest, Option<String>)> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch_root_key(&self) -> Result<Vec<u8>, AgentError> {
        self.root_key_fetches.fetch_add(1, Ordering::SeqCst);
        if self.root_key_fails {
            Err(AgentError::ServerError("replica unavailable".to_string()))
        } else {
            Ok(vec![0x30, 0x81, 0x82])
        }
    }

    async fn submit(&self, request: &CallRequest, delegation: Option<&str>) -> Result<Value, AgentError> {
        self.submitted
            .lock()
            .unwrap()
            .push((request.clone(), delegation.map(str::to_string)));
        Ok(self.reply.clone())
    }
}

/// Storage whose stored identity can never be read back.
#[derive(Default)]
pub struct UnreadableStorage {
    saved: Mutex<Option<DelegatedIdentity>>,
}

impl UnreadableStorage {
    pub fn saved(&self) -> Option<DelegatedIdentity> {
        self.saved.lock().unwrap().clone()
    }
}

impl IdentityStorage for UnreadableStorage {
    fn load(&self) -> anyhow::Result<Option<DelegatedIdentity>> {
        Err(anyhow!("identity file unreadable"))
    }

    fn save(&self, identity: &DelegatedIdentity) -> anyhow::Result<()> {
        *self.saved.lock().unwrap() = Some(identity.clone());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        *self.saved.lock().unwrap() = None;
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
