use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

use crate::agent::{ActorBinder, ActorSlot, ServiceDescriptor};
use crate::auth::client::DEFAULT_MAX_TIME_TO_LIVE_HOURS;
use crate::auth::{AuthClient, AuthError, DelegatedIdentity, IdentityProvider, IdentityStorage, LoginOptions};
use crate::config::Config;

use super::{Notifier, Session, SessionError};

/// Shown when the identity provider reports a failed login.
pub const LOGIN_FAILED_NOTICE: &str = "Login failed. Please try again.";

/// Shown when login succeeded at the provider but the session could not be set up.
pub const LOGIN_ERROR_NOTICE: &str = "An error occurred during login.";

/// What the session manager logs in to and binds against.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub identity_provider_url: String,
    pub canister_id: String,
    pub service: ServiceDescriptor,
    pub max_time_to_live: Duration,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            identity_provider_url: config.identity_provider_url().to_string(),
            canister_id: config.canister_id()?.to_string(),
            service: ServiceDescriptor::nft_canister(),
            max_time_to_live: Duration::hours(DEFAULT_MAX_TIME_TO_LIVE_HOURS),
        })
    }
}

/// Owns the session and keeps the published actor in step with it.
///
/// `initialize`, `login` and `logout` hold one async lock for their whole
/// duration, so concurrent requests run one after another.
pub struct SessionManager {
    options: SessionOptions,
    provider: Arc<dyn IdentityProvider>,
    storage: Arc<dyn IdentityStorage>,
    binder: ActorBinder,
    notifier: Arc<dyn Notifier>,
    // None until initialize() has run
    auth: Mutex<Option<AuthClient>>,
    state: watch::Sender<Session>,
}

impl SessionManager {
    pub fn new(
        options: SessionOptions,
        provider: Arc<dyn IdentityProvider>,
        storage: Arc<dyn IdentityStorage>,
        binder: ActorBinder,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (state, _rx) = watch::channel(Session::loading());
        Self {
            options,
            provider,
            storage,
            binder,
            notifier,
            auth: Mutex::new(None),
            state,
        }
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receive every session change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// The slot the bound actor is published to.
    pub fn actor_slot(&self) -> &ActorSlot {
        self.binder.slot()
    }

    /// Restore a previous session if the identity provider still has one.
    ///
    /// Never fails: any error is logged and leaves the session logged out.
    pub async fn initialize(&self) -> Session {
        let mut auth = self.auth.lock().await;
        self.set_state(Session::loading());

        let session = match self.restore(&mut auth).await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Authentication initialization failed");
                self.binder.discard();
                Session::empty()
            }
        };

        info!(authenticated = session.is_authenticated(), "Session initialized");
        self.set_state(session.clone());
        session
    }

    async fn restore(&self, auth: &mut Option<AuthClient>) -> Result<Session, SessionError> {
        let client = match AuthClient::create(self.provider.clone(), self.storage.clone()).await {
            Ok(client) => client,
            Err(e) => {
                // Keep a usable client so login still works
                *auth = Some(AuthClient::new(self.provider.clone(), self.storage.clone()));
                return Err(e.into());
            }
        };

        if !client.is_authenticated() {
            *auth = Some(client);
            return Ok(Session::empty());
        }

        // The identity can still lapse between the two checks
        let identity = client.identity();
        *auth = Some(client);
        let identity = identity.ok_or(AuthError::NotAuthenticated)?;

        self.bind(identity.clone()).await?;
        Ok(Session::authenticated(identity.principal.clone()))
    }

    /// Log in through the identity provider and bind an actor for the new identity.
    ///
    /// On failure the user is notified once and the session stays logged out.
    pub async fn login(&self) -> Result<Session, SessionError> {
        let mut auth = self.auth.lock().await;
        let client = auth.as_mut().ok_or(SessionError::NotInitialized)?;

        let options = LoginOptions {
            identity_provider: self.options.identity_provider_url.clone(),
            max_time_to_live: self.options.max_time_to_live,
        };

        let identity = match client.login(options).await {
            Ok(identity) => identity,
            Err(e) => {
                error!(error = %e, "Login failed");
                self.notifier.notify(LOGIN_FAILED_NOTICE);
                return Err(e.into());
            }
        };

        if let Err(e) = self.bind(identity.clone()).await {
            error!(error = %e, principal = %identity.principal, "Login error");
            client.discard();
            self.binder.discard();
            self.set_state(Session::empty());
            self.notifier.notify(LOGIN_ERROR_NOTICE);
            return Err(e);
        }

        let session = Session::authenticated(identity.principal.clone());
        info!(principal = %identity.principal, "Logged in");
        self.set_state(session.clone());
        Ok(session)
    }

    /// End the session.
    ///
    /// The session is reset and the actor discarded even when the provider
    /// call fails; that failure is returned.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let mut auth = self.auth.lock().await;

        let result = match auth.as_mut() {
            Some(client) => client.logout().await,
            None => Ok(()),
        };

        self.binder.discard();
        self.set_state(Session::empty());

        match result {
            Ok(()) => {
                info!("Logged out");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Logout error, local session reset anyway");
                Err(e.into())
            }
        }
    }

    async fn bind(&self, identity: Arc<DelegatedIdentity>) -> Result<(), SessionError> {
        self.binder
            .bind(identity, &self.options.service, &self.options.canister_id)
            .await?;
        Ok(())
    }

    fn set_state(&self, session: Session) {
        self.state.send_replace(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, MemoryStorage};
    use crate::config::DeploymentMode;
    use crate::testing::{identity_for, FakeProvider, FakeTransport, RecordingNotifier, UnreadableStorage};
    use serde_json::json;

    struct Harness {
        manager: Arc<SessionManager>,
        provider: Arc<FakeProvider>,
        transport: Arc<FakeTransport>,
        notifier: Arc<RecordingNotifier>,
        storage: Arc<MemoryStorage>,
    }

    fn options() -> SessionOptions {
        SessionOptions {
            identity_provider_url: "http://localhost:8000/?canisterId=rdmx6-jaaaa-aaaaa-aaadq-cai".to_string(),
            canister_id: "ryjl3-tyaaa-aaaaa-aaaba-cai".to_string(),
            service: ServiceDescriptor::nft_canister(),
            max_time_to_live: Duration::hours(8),
        }
    }

    fn harness_with(
        provider: FakeProvider,
        transport: FakeTransport,
        storage: MemoryStorage,
        mode: DeploymentMode,
    ) -> Harness {
        let provider = Arc::new(provider);
        let transport = Arc::new(transport);
        let notifier = Arc::new(RecordingNotifier::default());
        let storage = Arc::new(storage);
        let binder = ActorBinder::new(transport.clone(), mode, ActorSlot::new());
        let manager = Arc::new(SessionManager::new(
            options(),
            provider.clone(),
            storage.clone(),
            binder,
            notifier.clone(),
        ));
        Harness {
            manager,
            provider,
            transport,
            notifier,
            storage,
        }
    }

    fn harness(provider: FakeProvider, storage: MemoryStorage) -> Harness {
        harness_with(
            provider,
            FakeTransport::replying(json!(null)),
            storage,
            DeploymentMode::Development,
        )
    }

    #[tokio::test]
    async fn test_starts_loading() {
        let h = harness(FakeProvider::succeeding("p"), MemoryStorage::new());
        assert!(h.manager.session().is_loading());
    }

    #[tokio::test]
    async fn test_initialize_without_prior_session() {
        let h = harness(FakeProvider::succeeding("p"), MemoryStorage::new());

        let session = h.manager.initialize().await;

        assert!(!session.is_loading());
        assert!(!session.is_authenticated());
        assert_eq!(session.principal(), "");
        assert!(h.manager.actor_slot().current().is_none());
        assert_eq!(h.manager.session(), session);
    }

    #[tokio::test]
    async fn test_initialize_restores_prior_session() {
        let storage = MemoryStorage::with_identity(identity_for("abcd1234-xyz", 60));
        let h = harness(FakeProvider::succeeding("p"), storage);

        let session = h.manager.initialize().await;

        assert!(!session.is_loading());
        assert!(session.is_authenticated());
        assert_eq!(session.principal(), "abcd1234-xyz");
        assert!(h.manager.actor_slot().current().is_some());
        assert_eq!(h.transport.root_key_fetches(), 1);
        assert_eq!(h.provider.authorize_calls(), 0);
    }

    #[tokio::test]
    async fn test_initialize_binding_failure_falls_back_to_logged_out() {
        let h = harness_with(
            FakeProvider::succeeding("p"),
            FakeTransport::replying(json!(null)).with_failing_root_key(),
            MemoryStorage::with_identity(identity_for("abcd1234-xyz", 60)),
            DeploymentMode::Development,
        );

        let session = h.manager.initialize().await;

        assert!(!session.is_loading());
        assert!(!session.is_authenticated());
        assert!(h.manager.actor_slot().current().is_none());
        assert!(h.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_storage_failure_still_allows_login() {
        let provider = Arc::new(FakeProvider::succeeding("abcd1234-xyz"));
        let storage = Arc::new(UnreadableStorage::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let binder = ActorBinder::new(
            Arc::new(FakeTransport::replying(json!(null))),
            DeploymentMode::Development,
            ActorSlot::new(),
        );
        let manager = SessionManager::new(options(), provider.clone(), storage.clone(), binder, notifier.clone());

        let session = manager.initialize().await;

        assert!(!session.is_loading());
        assert!(!session.is_authenticated());
        assert!(manager.actor_slot().current().is_none());
        assert!(notifier.messages().is_empty());

        let session = manager.login().await.unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.principal(), "abcd1234-xyz");
        assert!(manager.actor_slot().current().is_some());
        assert_eq!(provider.authorize_calls(), 1);
        assert_eq!(storage.saved().map(|identity| identity.principal).as_deref(), Some("abcd1234-xyz"));
    }

    #[tokio::test]
    async fn test_initialize_ignores_expired_identity() {
        let h = harness(
            FakeProvider::succeeding("p"),
            MemoryStorage::with_identity(identity_for("abcd1234-xyz", -5)),
        );

        let session = h.manager.initialize().await;

        assert!(!session.is_authenticated());
        assert!(h.manager.actor_slot().current().is_none());
        assert_eq!(h.transport.root_key_fetches(), 0);
    }

    #[tokio::test]
    async fn test_login_before_initialize_is_rejected() {
        let h = harness(FakeProvider::succeeding("p"), MemoryStorage::new());
        let result = h.manager.login().await;
        assert!(matches!(result, Err(SessionError::NotInitialized)));
        assert_eq!(h.provider.authorize_calls(), 0);
    }

    #[tokio::test]
    async fn test_login_success_binds_actor() {
        let h = harness(FakeProvider::succeeding("abcd1234-xyz"), MemoryStorage::new());
        h.manager.initialize().await;

        let session = h.manager.login().await.unwrap();

        assert!(session.is_authenticated());
        assert_eq!(session.principal(), "abcd1234-xyz");
        assert_eq!(session.display_principal().as_deref(), Some("abcd1234...-xyz"));
        assert!(h.manager.actor_slot().current().is_some());
        assert!(h.notifier.messages().is_empty());
        assert_eq!(
            h.provider.last_request().unwrap().provider_url,
            "http://localhost:8000/?canisterId=rdmx6-jaaaa-aaaaa-aaadq-cai"
        );
    }

    #[tokio::test]
    async fn test_login_failure_notifies_once() {
        let h = harness(FakeProvider::failing("UserInterrupt"), MemoryStorage::new());
        h.manager.initialize().await;

        let result = h.manager.login().await;

        assert!(matches!(result, Err(SessionError::Auth(AuthError::Rejected(_)))));
        assert_eq!(h.manager.session(), Session::empty());
        assert!(h.manager.actor_slot().current().is_none());
        assert_eq!(h.notifier.messages(), vec![LOGIN_FAILED_NOTICE.to_string()]);
    }

    #[tokio::test]
    async fn test_login_binding_failure_discards_identity() {
        let h = harness_with(
            FakeProvider::succeeding("abcd1234-xyz"),
            FakeTransport::replying(json!(null)).with_failing_root_key(),
            MemoryStorage::new(),
            DeploymentMode::Development,
        );
        h.manager.initialize().await;

        let result = h.manager.login().await;

        assert!(matches!(result, Err(SessionError::Bind(_))));
        assert!(!h.manager.session().is_authenticated());
        assert!(h.manager.actor_slot().current().is_none());
        assert!(h.storage.load().unwrap().is_none());
        assert_eq!(h.notifier.messages(), vec![LOGIN_ERROR_NOTICE.to_string()]);
    }

    #[tokio::test]
    async fn test_production_login_skips_root_key_fetch() {
        let h = harness_with(
            FakeProvider::succeeding("abcd1234-xyz"),
            FakeTransport::replying(json!(null)),
            MemoryStorage::new(),
            DeploymentMode::Production,
        );
        h.manager.initialize().await;
        h.manager.login().await.unwrap();

        assert_eq!(h.transport.root_key_fetches(), 0);
        assert!(h.manager.actor_slot().current().is_some());
    }

    #[tokio::test]
    async fn test_logout_resets_session() {
        let h = harness(FakeProvider::succeeding("abcd1234-xyz"), MemoryStorage::new());
        h.manager.initialize().await;
        h.manager.login().await.unwrap();

        h.manager.logout().await.unwrap();

        assert_eq!(h.manager.session(), Session::empty());
        assert!(h.manager.actor_slot().current().is_none());
        assert_eq!(h.provider.revoke_calls(), 1);
    }

    #[tokio::test]
    async fn test_logout_resets_session_even_when_provider_fails() {
        let h = harness(
            FakeProvider::succeeding("abcd1234-xyz").with_failing_revoke(),
            MemoryStorage::new(),
        );
        h.manager.initialize().await;
        h.manager.login().await.unwrap();

        let result = h.manager.logout().await;

        assert!(matches!(result, Err(SessionError::Auth(AuthError::Provider(_)))));
        assert!(!h.manager.session().is_authenticated());
        assert_eq!(h.manager.session().principal(), "");
        assert!(h.manager.actor_slot().current().is_none());
        assert!(h.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_login_and_logout_are_serialized() {
        let h = harness(FakeProvider::succeeding("abcd1234-xyz"), MemoryStorage::new());
        h.manager.initialize().await;

        let login = {
            let manager = h.manager.clone();
            tokio::spawn(async move { manager.login().await })
        };
        let logout = {
            let manager = h.manager.clone();
            tokio::spawn(async move { manager.logout().await })
        };
        login.await.unwrap().unwrap();
        logout.await.unwrap().unwrap();

        // Whichever ran last, the session and the slot agree
        let session = h.manager.session();
        assert_eq!(session.is_authenticated(), h.manager.actor_slot().is_bound());
    }

    #[tokio::test]
    async fn test_subscribers_see_session_changes() {
        let h = harness(FakeProvider::succeeding("abcd1234-xyz"), MemoryStorage::new());
        let mut rx = h.manager.subscribe();
        h.manager.initialize().await;
        h.manager.login().await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_authenticated());
    }
}
