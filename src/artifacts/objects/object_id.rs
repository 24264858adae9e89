//! Git object identifier (SHA-1 hash)
//!
//! Object IDs are 40-character hexadecimal strings representing SHA-1 hashes.
//! They identify every snapshot (commit) and every tree compared by the detector.
//!
//! ## Format
//!
//! - Full: 40 hex characters (e.g., "abc123...def")
//! - Short: First 7 characters (e.g., "abc123")
//! - Raw: 20 bytes, as stored inside tree objects and pack indexes
//!
//! ## Storage
//!
//! Loose objects live in `.git/objects/<first-2-chars>/<remaining-38-chars>`

use crate::artifacts::objects::{OBJECT_ID_LENGTH, RAW_OBJECT_ID_LENGTH};
use sha1::{Digest, Sha1};
use std::io;
use std::path::PathBuf;

/// Git object identifier (SHA-1 hash)
///
/// Always stored lowercase so ids coming from refs, trees and pack indexes compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate an object ID from a string
    ///
    /// # Arguments
    ///
    /// * `id` - 40-character hexadecimal string
    ///
    /// # Returns
    ///
    /// Validated ObjectId or error if invalid length/characters
    pub fn try_parse(id: String) -> anyhow::Result<Self> {
        if id.len() != OBJECT_ID_LENGTH {
            return Err(anyhow::anyhow!("Invalid object ID length: {}", id.len()));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow::anyhow!("Invalid object ID characters: {}", id));
        }
        Ok(Self(id.to_ascii_lowercase()))
    }

    /// Build an object ID from its 20-byte binary form
    pub fn from_raw(raw: &[u8]) -> anyhow::Result<Self> {
        if raw.len() != RAW_OBJECT_ID_LENGTH {
            anyhow::bail!("Invalid raw object ID length: {}", raw.len());
        }

        Ok(Self(raw.iter().map(|byte| format!("{byte:02x}")).collect()))
    }

    /// Compute the ID of a serialized object (`<type> <size>\0<content>`)
    pub fn hash_of(serialized: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(serialized);

        Self(format!("{:x}", hasher.finalize()))
    }

    /// Read an object ID from binary format (20 bytes)
    ///
    /// Used when deserializing tree objects.
    pub fn read_h40_from<R: io::Read + ?Sized>(reader: &mut R) -> anyhow::Result<Self> {
        let mut raw = [0u8; RAW_OBJECT_ID_LENGTH];
        reader.read_exact(&mut raw)?;

        Self::from_raw(&raw)
    }

    /// The 20-byte binary form, as stored in pack indexes
    pub fn to_raw(&self) -> anyhow::Result<[u8; RAW_OBJECT_ID_LENGTH]> {
        let mut raw = [0u8; RAW_OBJECT_ID_LENGTH];
        for (i, byte) in raw.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&self.0[i * 2..i * 2 + 2], 16)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Invalid hex digit"))?;
        }

        Ok(raw)
    }

    /// Convert to file system path for loose object storage
    ///
    /// Splits the hash as `XX/YYYYYY...` where XX is the first 2 chars.
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// Get abbreviated form of the object ID
    ///
    /// # Returns
    ///
    /// First 7 characters of the hash (standard Git abbreviation)
    pub fn to_short_oid(&self) -> String {
        self.0.split_at(7).0.to_string()
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
