use crate::utils::short_principal;

/// Authentication state as seen by the front end.
///
/// `principal` is non-empty exactly when `authenticated` is true; the
/// constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    authenticated: bool,
    principal: String,
    loading: bool,
}

impl Session {
    /// Logged out, not loading.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Logged out while the initial restore is in flight.
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    /// Logged in as `principal`. An empty principal yields a logged-out session.
    pub fn authenticated(principal: impl Into<String>) -> Self {
        let principal = principal.into();
        if principal.is_empty() {
            return Self::empty();
        }
        Self {
            authenticated: true,
            principal,
            loading: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Principal shortened for headers, e.g. `abcd1234...-xyz`.
    pub fn display_principal(&self) -> Option<String> {
        self.authenticated.then(|| short_principal(&self.principal))
    }
}
