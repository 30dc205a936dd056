use thiserror::Error;

use crate::agent::AgentError;
use crate::auth::AuthError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session manager has not been initialized")]
    NotInitialized,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Failed to bind actor: {0}")]
    Bind(#[from] AgentError),
}
