//! JSON payloads stored by every backend.
//!
//! Backends compare encoded payloads byte-for-byte, so encoding must be
//! deterministic: struct fields serialize in declaration order and there are
//! no maps in a [`Record`].

use exn::ResultExt;

use crate::error::{ErrorKind, Result};
use crate::models::Record;

pub fn encode(record: &Record) -> Result<String> {
    serde_json::to_string(record).or_raise(|| ErrorKind::InvalidData)
}

/// Decode a stored payload, rejecting resources whose options do not match
/// their type.
pub fn decode(payload: &str) -> Result<Record> {
    let record: Record = serde_json::from_str(payload).or_raise(|| ErrorKind::InvalidData)?;
    if let Record::Resource(resource) = &record {
        resource.validate()?;
    }
    Ok(record)
}
