//! Serde for export session storage.
//!
//! # Key Format
//!
//! All keys start with a version byte and record type discriminator:
//!
//! ```text
//! | version (u8) | type (u8) | ... record-specific fields ... |
//! ```
//!
//! # Record Types
//!
//! - `Session` (0x01): one record per export session, keyed by the UTF-8
//!   session id; the value is the session serialized as JSON.
//! - `ActiveExport` (0x02): the single deployment-wide lock key; the value
//!   is the UTF-8 id of the session holding it.

use bytes::{BufMut, Bytes, BytesMut};
use common::BytesRange;

use crate::error::{Error, Result};
use crate::model::ExportSession;

/// Key format version (currently 0x01)
pub const KEY_VERSION: u8 = 0x01;

/// Storage key of the global export lock.
pub const ACTIVE_EXPORT_KEY: [u8; 2] = [KEY_VERSION, 0x02]; // RecordType::ActiveExport

/// Record type discriminators for export storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Session = 0x01,
    ActiveExport = 0x02,
}

impl RecordType {
    pub fn id(&self) -> u8 {
        *self as u8
    }

    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0x01 => Ok(RecordType::Session),
            0x02 => Ok(RecordType::ActiveExport),
            _ => Err(Error::Encoding(format!(
                "invalid record type: 0x{:02x}",
                id
            ))),
        }
    }
}

/// Key of a session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    pub id: String,
}

impl SessionKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2 + self.id.len());
        buf.put_u8(KEY_VERSION);
        buf.put_u8(RecordType::Session.id());
        buf.put_slice(self.id.as_bytes());
        buf.freeze()
    }

    pub fn deserialize(key: &[u8]) -> Result<Self> {
        if key.len() < 2 {
            return Err(Error::Encoding(format!(
                "session key too short: {} bytes",
                key.len()
            )));
        }
        if key[0] != KEY_VERSION {
            return Err(Error::Encoding(format!(
                "unsupported key version: 0x{:02x}",
                key[0]
            )));
        }
        let record_type = RecordType::from_id(key[1])?;
        if record_type != RecordType::Session {
            return Err(Error::Encoding(format!(
                "expected session key, found {:?}",
                record_type
            )));
        }
        let id = std::str::from_utf8(&key[2..])
            .map_err(|e| Error::Encoding(format!("session id is not UTF-8: {}", e)))?;
        Ok(Self::new(id))
    }

    /// Range covering every session record.
    pub fn scan_range() -> BytesRange {
        BytesRange::prefix(Bytes::from_static(&[KEY_VERSION, RecordType::Session as u8]))
    }
}

pub fn serialize_session(session: &ExportSession) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(session)?))
}

pub fn deserialize_session(value: &[u8]) -> Result<ExportSession> {
    Ok(serde_json::from_slice(value)?)
}

pub fn deserialize_active_export(value: &[u8]) -> Result<String> {
    String::from_utf8(value.to_vec())
        .map_err(|e| Error::Encoding(format!("active export id is not UTF-8: {}", e)))
}
