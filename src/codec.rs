//! On-disk codec
//!
//! Encoding and decoding functions for the persisted file format.
//!
//! ## Wire Format
//!
//! ```text
//! ┌────────────┬──────────────┬─────────────────────────────┐
//! │ Magic (5)  │ CRC-32 (4)   │         Payload             │
//! └────────────┴──────────────┴─────────────────────────────┘
//! ```
//!
//! - Magic: the 5 ASCII bytes `EMBKV`
//! - CRC-32: little-endian, computed over the payload bytes only
//! - Payload: a bincode-encoded map of `key -> entry text`, where each
//!   entry text is the value's self-describing JSON form
//!
//! The two-layer payload keeps the binary container generic over
//! heterogeneous value kinds while each entry stays independently
//! re-parseable.

use std::collections::{HashMap, HashSet};

use crate::error::{EmberError, Result};
use crate::value::Value;

/// Magic marker at the start of every database file
pub const MAGIC: &[u8; 5] = b"EMBKV";

/// Size of the magic marker in bytes
pub const MAGIC_SIZE: usize = 5;

/// Size of the checksum field in bytes
pub const CHECKSUM_SIZE: usize = 4;

/// Total header size: magic + checksum
pub const HEADER_SIZE: usize = MAGIC_SIZE + CHECKSUM_SIZE;

/// Encode a snapshot of the store map into a complete file frame
///
/// Keys in `excluded` (live TTL entries) are omitted from the payload —
/// ephemeral keys never reach disk.
pub fn encode(snapshot: &HashMap<String, Value>, excluded: &HashSet<String>) -> Result<Vec<u8>> {
    // Layer 1: each value to its JSON text form
    let mut entries: HashMap<&str, String> = HashMap::with_capacity(snapshot.len());
    for (key, value) in snapshot {
        if excluded.contains(key) {
            continue;
        }
        let text = serde_json::to_string(value)
            .map_err(|e| EmberError::Payload(format!("cannot encode entry '{}': {}", key, e)))?;
        entries.insert(key.as_str(), text);
    }

    // Layer 2: the key -> text map into the binary container
    let payload = bincode::serialize(&entries)
        .map_err(|e| EmberError::Payload(format!("cannot encode container: {}", e)))?;

    // Frame: magic + checksum + payload
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&payload);
    let checksum = hasher.finalize();

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(MAGIC);
    frame.extend_from_slice(&checksum.to_le_bytes());
    frame.extend_from_slice(&payload);

    Ok(frame)
}

/// Decode a complete file frame back into a store map
///
/// Failure taxonomy:
/// - first 5 bytes are not the magic → `Format`
/// - stored checksum does not match the payload → `Checksum`
/// - container or any entry text cannot be parsed → `Payload`
pub fn decode(bytes: &[u8]) -> Result<HashMap<String, Value>> {
    // Validate magic before anything else
    if bytes.len() < MAGIC_SIZE || &bytes[..MAGIC_SIZE] != MAGIC {
        return Err(EmberError::Format);
    }

    if bytes.len() < HEADER_SIZE {
        return Err(EmberError::Payload(format!(
            "truncated frame: {} bytes, checksum field missing",
            bytes.len()
        )));
    }

    // Verify the checksum over the payload region
    let stored = u32::from_le_bytes([
        bytes[MAGIC_SIZE],
        bytes[MAGIC_SIZE + 1],
        bytes[MAGIC_SIZE + 2],
        bytes[MAGIC_SIZE + 3],
    ]);

    let payload = &bytes[HEADER_SIZE..];
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(payload);
    let computed = hasher.finalize();

    if stored != computed {
        return Err(EmberError::Checksum { stored, computed });
    }

    // Unpack the container, then re-parse each entry text
    let entries: HashMap<String, String> = bincode::deserialize(payload)
        .map_err(|e| EmberError::Payload(format!("cannot decode container: {}", e)))?;

    let mut snapshot = HashMap::with_capacity(entries.len());
    for (key, text) in entries {
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| EmberError::Payload(format!("cannot decode entry '{}': {}", key, e)))?;
        snapshot.insert(key, value);
    }

    Ok(snapshot)
}
