//! Stateless, signed principal tokens
//!
//! A principal is serialized to MessagePack, base64 encoded into the `entity`
//! claim of an HS512 JWT and optionally given an expiration. Parsing verifies
//! the signature, reports expiry separately from forgery, and decodes the
//! principal back. No server-side state is kept.

pub mod claims;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod expiry;
pub mod parser;
pub mod radix64;
pub mod signer;

pub use claims::{Claims, ClaimsBuilder, ENTITY_CLAIM, EXPIRATION_CLAIM};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{MessagePackCodec, PayloadCodec};
pub use config::TokenConfig;
pub use error::{CodecError, Result, TokenError};
pub use expiry::{ExpirationPolicy, TimeUnit};
pub use parser::{ClaimsHook, JwtTokenParser, TokenParser, TokenState};
pub use signer::{ClaimsSigner, Hs512Signer};

// Re-export useful types
pub use chrono;
pub use chrono::{DateTime, Duration, Utc};
