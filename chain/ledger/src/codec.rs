//! Record codec: versioned binary encoding for persisted records
//!
//! Every record is written as a bincode envelope `{ version, body }`. The
//! version is checked before the body is decoded so a node never silently
//! reinterprets bytes written by a different record layout.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::StoreError;

/// Current record layout version.
pub const RECORD_VERSION: u16 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u16,
    body: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[allow(dead_code)]
    version: u16,
    body: T,
}

/// Encode a record under the current version.
pub fn encode_record<T: Serialize>(body: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(&EnvelopeRef {
        version: RECORD_VERSION,
        body,
    })
    .map_err(|e| StoreError::Codec(e.to_string()))
}

/// Decode a record, rejecting any version this build does not know.
pub fn decode_record<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    let version = record_version(bytes)?;
    if version != RECORD_VERSION {
        return Err(StoreError::UnsupportedVersion(version));
    }
    let envelope: Envelope<T> =
        bincode::deserialize(bytes).map_err(|e| StoreError::Codec(e.to_string()))?;
    Ok(envelope.body)
}

/// Read only the version header of an encoded record.
pub fn record_version(bytes: &[u8]) -> Result<u16, StoreError> {
    bincode::deserialize::<u16>(bytes).map_err(|e| StoreError::Codec(e.to_string()))
}

/// Hex SHA-256 of a byte string.
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
