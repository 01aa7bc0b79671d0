//! Bridge between binary payloads and text claim values
//!
//! The `entity` claim holds standard (padded) base64, not the URL-safe
//! alphabet the outer token uses.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::CodecError;

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    Ok(STANDARD.decode(text)?)
}
