//! Client error types

use hm_crypto::CryptoError;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing or invalid key material (fatal to this call only)
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Session invalid, the user has to log in again
    #[error("Unauthorized")]
    Unauthorized,

    /// Envelope carried a non-success code
    #[error("{message}")]
    Business { code: i64, message: String },

    /// Non-2xx HTTP status
    #[error("{message}")]
    Http { status: u16, message: String },

    /// No response received
    #[error("Network error: {0}")]
    Network(String),

    /// Superseded or explicitly cancelled
    #[error("Request aborted")]
    Aborted,

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Business code or HTTP status, when there is one
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Business { code, .. } => Some(*code),
            Self::Http { status, .. } => Some(*status as i64),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Persistent key-value storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_error_displays_server_message() {
        let err = ClientError::Business {
            code: 500,
            message: "用户名或密码错误".into(),
        };
        assert_eq!(err.to_string(), "用户名或密码错误");
        assert_eq!(err.code(), Some(500));
        assert!(!err.is_aborted());
    }

    #[test]
    fn test_crypto_error_converts() {
        let err: ClientError = CryptoError::Config("RSA public key is empty".into()).into();
        assert!(matches!(err, ClientError::Crypto(CryptoError::Config(_))));
        assert!(ClientError::Aborted.is_aborted());
        assert!(ClientError::Unauthorized.is_unauthorized());
    }
}
