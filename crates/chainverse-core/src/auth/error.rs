use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Login rejected by identity provider: {0}")]
    Rejected(String),

    #[error("Invalid callback from identity provider: {0}")]
    Callback(String),

    #[error("Identity storage error: {0}")]
    Storage(String),

    #[error("Invalid identity provider URL: {0}")]
    InvalidUrl(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AuthError {
    pub fn storage(err: anyhow::Error) -> Self {
        // {:#} keeps the context chain on one line
        AuthError::Storage(format!("{:#}", err))
    }
}
