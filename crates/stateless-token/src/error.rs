//! Error types for token creation and parsing

use thiserror::Error;

/// Errors raised while turning a principal into bytes and back
#[derive(Debug, Error)]
pub enum CodecError {
    /// The principal could not be serialized
    #[error("Failed to serialize payload: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    /// The bytes are not a decodable structure, or do not fit the target type
    #[error("Failed to deserialize payload: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    /// The radix-64 text is malformed
    #[error("Malformed base64 payload: {0}")]
    Decoding(#[from] base64::DecodeError),
}

/// Token errors
///
/// An expired token is not an error; see [`crate::TokenState::Expired`].
#[derive(Debug, Error)]
pub enum TokenError {
    /// The caller supplied something that cannot be used: a principal that
    /// does not serialize, a payload that does not decode into the requested
    /// type, or an incomplete expiration policy.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The token is malformed or its signature does not match. Callers must
    /// treat the request as unauthenticated.
    #[error("Token verification failed: {0}")]
    Verification(String),

    /// The signing primitive rejected the claims or the key
    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl From<CodecError> for TokenError {
    fn from(err: CodecError) -> Self {
        TokenError::InvalidArgument(err.to_string())
    }
}

pub type Result<T, E = TokenError> = std::result::Result<T, E>;
