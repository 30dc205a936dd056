use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A credential that can act on behalf of a principal.
pub trait Identity: Send + Sync + fmt::Debug {
    /// Textual form of the principal this identity authenticates as.
    fn principal_text(&self) -> String;

    /// Bearer credential to attach to outgoing calls, if any.
    fn delegation(&self) -> Option<&str>;
}

/// Identity issued by the identity provider for a client-generated session key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatedIdentity {
    pub principal: String,
    pub delegation: String,
    pub session_key: String,
    pub expires_at: DateTime<Utc>,
}

impl DelegatedIdentity {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }
}

impl Identity for DelegatedIdentity {
    fn principal_text(&self) -> String {
        self.principal.clone()
    }

    fn delegation(&self) -> Option<&str> {
        Some(self.delegation.as_str())
    }
}
