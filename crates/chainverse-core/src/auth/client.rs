use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};

use super::{AuthError, AuthorizeRequest, DelegatedIdentity, IdentityProvider, IdentityStorage};

/// Default lifetime of a delegation requested at login.
pub const DEFAULT_MAX_TIME_TO_LIVE_HOURS: i64 = 8;

/// Size of the random session key in bytes.
const SESSION_KEY_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub struct LoginOptions {
    pub identity_provider: String,
    pub max_time_to_live: Duration,
}

impl LoginOptions {
    pub fn new(identity_provider: impl Into<String>) -> Self {
        Self {
            identity_provider: identity_provider.into(),
            max_time_to_live: Duration::hours(DEFAULT_MAX_TIME_TO_LIVE_HOURS),
        }
    }
}

/// Owns the current identity and its persistence.
pub struct AuthClient {
    provider: Arc<dyn IdentityProvider>,
    storage: Arc<dyn IdentityStorage>,
    identity: Option<Arc<DelegatedIdentity>>,
}

impl AuthClient {
    /// A client with no identity, ignoring whatever storage holds.
    pub fn new(provider: Arc<dyn IdentityProvider>, storage: Arc<dyn IdentityStorage>) -> Self {
        Self {
            provider,
            storage,
            identity: None,
        }
    }

    /// Create a client, restoring a stored identity if one is still valid.
    pub async fn create(
        provider: Arc<dyn IdentityProvider>,
        storage: Arc<dyn IdentityStorage>,
    ) -> Result<Self, AuthError> {
        let stored = storage.load().map_err(AuthError::storage)?;

        let identity = match stored {
            Some(identity) if identity.is_expired() => {
                debug!(principal = %identity.principal, "Stored identity expired, discarding");
                if let Err(e) = storage.clear() {
                    warn!(error = %e, "Failed to clear expired identity");
                }
                None
            }
            Some(identity) => {
                debug!(
                    principal = %identity.principal,
                    minutes_left = identity.minutes_until_expiry(),
                    "Restored identity"
                );
                Some(Arc::new(identity))
            }
            None => None,
        };

        Ok(Self {
            provider,
            storage,
            identity,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity
            .as_ref()
            .map(|identity| !identity.is_expired())
            .unwrap_or(false)
    }

    /// The current identity, if it has not expired.
    pub fn identity(&self) -> Option<Arc<DelegatedIdentity>> {
        self.identity
            .as_ref()
            .filter(|identity| !identity.is_expired())
            .cloned()
    }

    /// Run the provider's interactive flow and keep the resulting identity.
    pub async fn login(&mut self, options: LoginOptions) -> Result<Arc<DelegatedIdentity>, AuthError> {
        let session_key = hex::encode(rand::random::<[u8; SESSION_KEY_BYTES]>());
        let request = AuthorizeRequest {
            provider_url: options.identity_provider,
            session_key,
            max_time_to_live: options.max_time_to_live,
        };

        let identity = self.provider.authorize(request).await?;
        if identity.principal.is_empty() {
            return Err(AuthError::Callback("empty principal".to_string()));
        }

        if let Err(e) = self.storage.save(&identity) {
            warn!(error = %e, "Failed to persist identity");
        }

        info!(principal = %identity.principal, "Identity provider login complete");
        let identity = Arc::new(identity);
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    /// Forget the identity locally without contacting the provider.
    pub fn discard(&mut self) {
        self.identity = None;
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "Failed to clear stored identity");
        }
    }

    /// Forget the identity and revoke it at the provider.
    ///
    /// Local state is always cleared; the first failure is returned.
    pub async fn logout(&mut self) -> Result<(), AuthError> {
        let identity = self.identity.take();

        let cleared = self.storage.clear().map_err(AuthError::storage);

        let revoked = match identity {
            Some(identity) => self.provider.revoke(&identity).await,
            None => Ok(()),
        };

        cleared.and(revoked)
    }
}
