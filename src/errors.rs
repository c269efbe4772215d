use http::StatusCode;

use crate::features::auth::AuthError;

/// Client-facing failures written by handlers and middleware as a JSON
/// error envelope. Nothing here unwinds; see `middleware::recover` for that.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Request body errors
    #[error("invalid JSON body: {0}")]
    InvalidBody(#[from] serde_json::Error),
    #[error("upload error: {0}")]
    Upload(String),
    #[error("invalid mime type: {0}")]
    MimeNotAllowed(String),
    #[error("file too large: {0} bytes")]
    FileTooLarge(u64),

    // Auth errors
    #[error("Authorization header is missing")]
    MissingAuthToken,
    #[error("Invalid 'Authorization' header format. Expected 'Bearer <token>'.")]
    InvalidAuthHeader,
    #[error("missing session cookie")]
    MissingSessionCookie,
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("You do not have permission to access this resource.")]
    InsufficientPermissions,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidBody(_)
            | AppError::Upload(_)
            | AppError::MimeNotAllowed(_)
            | AppError::FileTooLarge(_) => StatusCode::BAD_REQUEST,
            AppError::MissingAuthToken
            | AppError::InvalidAuthHeader
            | AppError::MissingSessionCookie
            | AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::InsufficientPermissions => StatusCode::FORBIDDEN,
        }
    }

    /// Message placed in the `error` field of the envelope.
    pub fn client_message(&self) -> String {
        self.to_string()
    }
}

/// The `{"error": "..."}` body shared by every error response.
#[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}
