use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Not logged in")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Server returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Map a non-success HTTP status (and its body) to an error.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthenticated,
            StatusCode::FORBIDDEN => ClientError::Forbidden(body),
            StatusCode::NOT_FOUND => ClientError::NotFound(body),
            _ => ClientError::Status {
                status,
                message: body,
            },
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ClientError::Validation(msg.into())
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, ClientError::Forbidden(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }

    /// Text suitable for an alert or notification.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network(_) => {
                "Could not reach CookHUB. Please try again later.".to_string()
            }
            ClientError::Unauthenticated => "Please log in again.".to_string(),
            ClientError::Forbidden(_) => {
                "You are not authorized to perform this action.".to_string()
            }
            ClientError::NotFound(_) => "The requested item no longer exists.".to_string(),
            ClientError::Validation(msg) => msg.clone(),
            ClientError::Status { .. } | ClientError::Decode(_) | ClientError::Io(_) => {
                "Something went wrong. Please try again later.".to_string()
            }
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
