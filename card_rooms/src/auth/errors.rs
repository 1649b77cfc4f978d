//! Identity error types.

use thiserror::Error;

/// Identity resolution errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token was presented
    #[error("Missing token")]
    MissingToken,

    /// JWT token error
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    /// Token decoded but its claims are unusable
    #[error("Invalid claims: {0}")]
    InvalidClaims(String),
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak token details
    pub fn client_message(&self) -> String {
        match self {
            AuthError::JwtError(_) | AuthError::InvalidClaims(_) => {
                "Authentication failed".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for identity operations
pub type AuthResult<T> = Result<T, AuthError>;
