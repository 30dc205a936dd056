use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - delegation may be expired")]
    Unauthorized,

    #[error("Canister not found: {0}")]
    NotFound(String),

    #[error("Rate limited by replica")]
    RateLimited,

    #[error("Replica error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid host: {0}")]
    InvalidHost(String),

    #[error("Call rejected by canister: {0}")]
    Rejected(String),

    #[error("Method '{method}' is not part of the {service} interface")]
    UnknownMethod { service: String, method: String },

    #[error("No trust root established; fetch the root key first")]
    MissingRootKey,

    #[error("Invalid root key: {0}")]
    InvalidRootKey(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl AgentError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => AgentError::Unauthorized,
            403 => AgentError::AccessDenied(truncated),
            404 => AgentError::NotFound(truncated),
            429 => AgentError::RateLimited,
            500..=599 => AgentError::ServerError(truncated),
            _ => AgentError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}
