use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Backend request failed with status {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Unauthorized (status {status})")]
    Unauthorized { status: u16 },

    #[error("No active session, login required")]
    NotAuthenticated,

    #[error("Record {id} not found in {resource}")]
    NotFound { resource: String, id: String },

    #[error("Unsupported request type {kind}")]
    UnsupportedRequest { kind: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

impl ProviderError {
    pub fn validation(message: impl Into<String>) -> Self {
        ProviderError::ValidationError {
            message: message.into(),
        }
    }

    /// 對應到管理介面看得懂的 HTTP 狀態碼
    pub fn status(&self) -> u16 {
        match self {
            ProviderError::Backend { status, .. } => *status,
            ProviderError::Unauthorized { status } => *status,
            ProviderError::NotAuthenticated => 401,
            ProviderError::NotFound { .. } => 404,
            ProviderError::ValidationError { .. } => 400,
            _ => 500,
        }
    }

    /// Rejection payload in the shape the admin UI reads (`STATUSCODE`, `status`, `message`).
    pub fn rejection(&self) -> serde_json::Value {
        let message = match self {
            ProviderError::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        };
        json!({
            "STATUSCODE": self.status(),
            "status": self.status(),
            "message": message,
        })
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
