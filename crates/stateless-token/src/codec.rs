//! Principal payload codec
//!
//! Principals are written as MessagePack maps with named fields, so the
//! decoding side does not need a schema to walk the bytes and any serde type
//! (nested structs, enums, collections, `serde_json::Value`) can round-trip.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;

/// Converts principals to bytes and back
pub trait PayloadCodec: Send + Sync {
    /// Serialize a principal
    fn encode<P>(&self, principal: &P) -> Result<Vec<u8>, CodecError>
    where
        P: Serialize + ?Sized;

    /// Deserialize bytes into the requested principal type
    fn decode<P>(&self, bytes: &[u8]) -> Result<P, CodecError>
    where
        P: DeserializeOwned;
}

/// Schema-less MessagePack codec
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePackCodec;

impl PayloadCodec for MessagePackCodec {
    fn encode<P>(&self, principal: &P) -> Result<Vec<u8>, CodecError>
    where
        P: Serialize + ?Sized,
    {
        Ok(rmp_serde::to_vec_named(principal)?)
    }

    fn decode<P>(&self, bytes: &[u8]) -> Result<P, CodecError>
    where
        P: DeserializeOwned,
    {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
