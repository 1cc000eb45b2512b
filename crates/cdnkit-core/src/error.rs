//! Error types module
//!
//! Errors raised by the backend-independent parts of cdnkit: configuration,
//! encryption and token handling. Storage drivers wrap these in their own
//! `StorageError`.

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_their_category() {
        let err = AppError::Config("CDN_PRIVATE_KEY must be set".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: CDN_PRIVATE_KEY must be set"
        );
        assert_eq!(
            AppError::InvalidToken("Invalid ttl".to_string()).to_string(),
            "Invalid token: Invalid ttl"
        );
    }
}
