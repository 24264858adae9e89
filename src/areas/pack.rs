//! Packfile reader
//!
//! Cloned and fetched repositories keep most of their objects in packfiles under
//! `.git/objects/pack`. Each `pack-<hash>.pack` comes with a `pack-<hash>.idx`.
//!
//! ## Index Format (version 2)
//!
//! - Header: `\377tOc` magic and version `2`
//! - Fanout: 256 big-endian u32, entry `i` counts objects whose first byte is `<= i`
//! - Sorted object names (20 bytes each)
//! - CRC32 per object
//! - 31-bit offsets per object; with the MSB set the low bits index the 64-bit table
//! - 64-bit offsets table
//!
//! ## Pack Entry Format
//!
//! A variable length header (3-bit type, size in 4 + 7n bits) followed by a zlib stream.
//! Delta entries carry their base first: a negative offset for `OFS_DELTA`, a raw object
//! id for `REF_DELTA`. The inflated delta holds the base and result sizes followed by
//! copy and insert instructions.

use crate::artifacts::objects::RAW_OBJECT_ID_LENGTH;
use crate::artifacts::objects::object::RawObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use byteorder::{ByteOrder, NetworkEndian};
use bytes::Bytes;
use std::io::Read;
use std::path::{Path, PathBuf};

const IDX_SIGNATURE: &[u8; 4] = b"\xfftOc";
const IDX_VERSION: u32 = 2;
const IDX_HEADER_SIZE: usize = 8;
const FANOUT_SIZE: usize = 256 * 4;
const PACK_SIGNATURE: &[u8; 4] = b"PACK";

const OFS_DELTA: u8 = 6;
const REF_DELTA: u8 = 7;

/// Deltas referring to deltas deeper than this are treated as corrupt
const MAX_DELTA_DEPTH: usize = 512;

/// A single packfile together with its index
#[derive(Debug)]
pub struct Pack {
    path: PathBuf,
    index: Bytes,
    data: Bytes,
    count: usize,
}

/// Where the body of a pack entry comes from
enum EntryKind {
    Whole(ObjectType),
    OffsetDelta(usize),
    RefDelta(ObjectId),
}

impl Pack {
    /// Open `pack-<hash>.idx` and the `.pack` next to it
    pub fn open(idx_path: &Path) -> anyhow::Result<Self> {
        let pack_path = idx_path.with_extension("pack");

        let index = std::fs::read(idx_path)
            .with_context(|| format!("Unable to read pack index {}", idx_path.display()))?;
        let data = std::fs::read(&pack_path)
            .with_context(|| format!("Unable to read packfile {}", pack_path.display()))?;

        Self::from_bytes(pack_path, index.into(), data.into())
    }

    pub fn from_bytes(path: PathBuf, index: Bytes, data: Bytes) -> anyhow::Result<Self> {
        if index.len() < IDX_HEADER_SIZE + FANOUT_SIZE || &index[..4] != IDX_SIGNATURE {
            anyhow::bail!("Invalid pack index for {}", path.display());
        }
        let version = NetworkEndian::read_u32(&index[4..8]);
        if version != IDX_VERSION {
            anyhow::bail!(
                "Unsupported pack index version {version} for {}",
                path.display()
            );
        }
        if data.len() < 12 || &data[..4] != PACK_SIGNATURE {
            anyhow::bail!("Invalid packfile {}", path.display());
        }

        let count = NetworkEndian::read_u32(&index[IDX_HEADER_SIZE + 255 * 4..][..4]) as usize;
        let required = IDX_HEADER_SIZE + FANOUT_SIZE + count * (RAW_OBJECT_ID_LENGTH + 4 + 4);
        if index.len() < required {
            anyhow::bail!("Truncated pack index for {}", path.display());
        }

        Ok(Pack {
            path,
            index,
            data,
            count,
        })
    }

    fn fanout(&self, byte: usize) -> usize {
        NetworkEndian::read_u32(&self.index[IDX_HEADER_SIZE + byte * 4..][..4]) as usize
    }

    fn name_at(&self, position: usize) -> &[u8] {
        let start = IDX_HEADER_SIZE + FANOUT_SIZE + position * RAW_OBJECT_ID_LENGTH;
        &self.index[start..start + RAW_OBJECT_ID_LENGTH]
    }

    /// Sorted raw ids stored at `positions`
    fn names_in(&self, positions: std::ops::Range<usize>) -> &[[u8; RAW_OBJECT_ID_LENGTH]] {
        let names_start = IDX_HEADER_SIZE + FANOUT_SIZE;
        let (names, _) = self.index[names_start + positions.start * RAW_OBJECT_ID_LENGTH
            ..names_start + positions.end * RAW_OBJECT_ID_LENGTH]
            .as_chunks();
        names
    }

    /// Index positions of the objects whose first byte is `first_byte`
    fn bucket(&self, first_byte: u8) -> std::ops::Range<usize> {
        let end = self.fanout(first_byte as usize);
        let start = match first_byte {
            0 => 0,
            byte => self.fanout(byte as usize - 1),
        };

        start..end.max(start)
    }

    fn offset_at(&self, position: usize) -> anyhow::Result<usize> {
        let offsets_start = IDX_HEADER_SIZE + FANOUT_SIZE + self.count * (RAW_OBJECT_ID_LENGTH + 4);
        let offset = NetworkEndian::read_u32(&self.index[offsets_start + position * 4..][..4]);

        if offset & 0x8000_0000 == 0 {
            return Ok(offset as usize);
        }

        let large_start = offsets_start + self.count * 4 + (offset & 0x7fff_ffff) as usize * 8;
        let large = self
            .index
            .get(large_start..large_start + 8)
            .with_context(|| format!("Invalid large offset in {}", self.path.display()))?;

        usize::try_from(NetworkEndian::read_u64(large))
            .with_context(|| format!("Offset out of range in {}", self.path.display()))
    }

    /// Offset of `oid` inside the packfile, if the pack holds it
    pub fn find_offset(&self, oid: &ObjectId) -> anyhow::Result<Option<usize>> {
        let raw = oid.to_raw()?;
        let bucket = self.bucket(raw[0]);

        let names = self.names_in(bucket.clone());
        let found = names.partition_point(|name| name < &raw);

        if names.get(found) == Some(&raw) {
            self.offset_at(bucket.start + found).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn contains(&self, oid: &ObjectId) -> anyhow::Result<bool> {
        Ok(self.find_offset(oid)?.is_some())
    }

    /// Every object id in the pack starting with the hex `prefix` (at least 2 characters)
    pub fn find_objects_by_prefix(&self, prefix: &str) -> anyhow::Result<Vec<ObjectId>> {
        let first_byte = prefix
            .get(..2)
            .and_then(|byte| u8::from_str_radix(byte, 16).ok())
            .with_context(|| format!("Invalid object id prefix {prefix:?}"))?;

        self.bucket(first_byte)
            .map(|position| ObjectId::from_raw(self.name_at(position)))
            .filter(|oid| match oid {
                Ok(oid) => oid.to_string().starts_with(prefix),
                Err(_) => true,
            })
            .collect()
    }

    /// Read and fully resolve the object stored at `offset`
    ///
    /// `load_external` loads REF_DELTA bases that live outside this pack.
    pub fn read_at(
        &self,
        offset: usize,
        load_external: &dyn Fn(&ObjectId) -> anyhow::Result<RawObject>,
    ) -> anyhow::Result<RawObject> {
        let mut deltas = Vec::new();
        let mut current = offset;

        let base = loop {
            if deltas.len() > MAX_DELTA_DEPTH {
                anyhow::bail!("Delta chain too deep in {}", self.path.display());
            }

            let (kind, body_start) = self.read_entry_header(current)?;
            let body = self.inflate(body_start)?;

            match kind {
                EntryKind::Whole(object_type) => break RawObject::new(object_type, body),
                EntryKind::OffsetDelta(base_offset) => {
                    deltas.push(body);
                    current = base_offset;
                }
                EntryKind::RefDelta(base_oid) => {
                    deltas.push(body);
                    match self.find_offset(&base_oid)? {
                        Some(base_offset) => current = base_offset,
                        None => break load_external(&base_oid)?,
                    }
                }
            }
        };

        deltas.into_iter().rev().try_fold(base, |base, delta| {
            let content = apply_delta(&base.content, &delta)
                .with_context(|| format!("Corrupt delta in {}", self.path.display()))?;
            Ok(RawObject::new(base.object_type, content))
        })
    }

    fn byte_at(&self, position: usize) -> anyhow::Result<u8> {
        self.data
            .get(position)
            .copied()
            .with_context(|| format!("Unexpected end of packfile {}", self.path.display()))
    }

    fn read_entry_header(&self, offset: usize) -> anyhow::Result<(EntryKind, usize)> {
        let mut position = offset;
        let mut byte = self.byte_at(position)?;
        position += 1;

        let type_code = (byte >> 4) & 0x07;
        // the inflated size is implied by the zlib stream, skip it
        while byte & 0x80 != 0 {
            byte = self.byte_at(position)?;
            position += 1;
        }

        let kind = match type_code {
            OFS_DELTA => {
                byte = self.byte_at(position)?;
                position += 1;
                let mut distance = (byte & 0x7f) as usize;
                while byte & 0x80 != 0 {
                    byte = self.byte_at(position)?;
                    position += 1;
                    distance = ((distance + 1) << 7) | (byte & 0x7f) as usize;
                }

                let base_offset = offset.checked_sub(distance).with_context(|| {
                    format!("Invalid delta base offset in {}", self.path.display())
                })?;
                EntryKind::OffsetDelta(base_offset)
            }
            REF_DELTA => {
                let raw = self
                    .data
                    .get(position..position + RAW_OBJECT_ID_LENGTH)
                    .with_context(|| {
                        format!("Unexpected end of packfile {}", self.path.display())
                    })?;
                position += RAW_OBJECT_ID_LENGTH;
                EntryKind::RefDelta(ObjectId::from_raw(raw)?)
            }
            code => EntryKind::Whole(ObjectType::from_pack_type(code).with_context(|| {
                format!(
                    "Invalid object type {code} at offset {offset} in {}",
                    self.path.display()
                )
            })?),
        };

        Ok((kind, position))
    }

    fn inflate(&self, position: usize) -> anyhow::Result<Bytes> {
        let compressed = self
            .data
            .get(position..)
            .with_context(|| format!("Unexpected end of packfile {}", self.path.display()))?;

        let mut decoder = flate2::read::ZlibDecoder::new(compressed);
        let mut content = Vec::new();
        decoder
            .read_to_end(&mut content)
            .with_context(|| format!("Unable to decompress entry in {}", self.path.display()))?;

        Ok(content.into())
    }
}

/// Little-endian base-128 size used in delta headers
fn read_delta_size(delta: &[u8], position: &mut usize) -> anyhow::Result<usize> {
    let mut size = 0usize;
    let mut shift = 0;

    loop {
        let byte = *delta.get(*position).context("Truncated delta header")?;
        *position += 1;
        size |= ((byte & 0x7f) as usize) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            return Ok(size);
        }
    }
}

/// Rebuild an object from its base and a git delta
pub fn apply_delta(base: &[u8], delta: &[u8]) -> anyhow::Result<Bytes> {
    let mut position = 0;
    let base_size = read_delta_size(delta, &mut position)?;
    let result_size = read_delta_size(delta, &mut position)?;

    if base_size != base.len() {
        anyhow::bail!(
            "Delta base size mismatch: expected {base_size}, got {}",
            base.len()
        );
    }

    let mut result = Vec::with_capacity(result_size);

    while let Some(&opcode) = delta.get(position) {
        position += 1;

        if opcode & 0x80 != 0 {
            // copy from base: offset in up to 4 bytes, size in up to 3
            let mut fields = [0usize; 7];
            for (bit, field) in fields.iter_mut().enumerate() {
                if opcode & (1 << bit) != 0 {
                    *field = *delta.get(position).context("Truncated copy instruction")? as usize;
                    position += 1;
                }
            }

            let copy_offset = fields[0] | fields[1] << 8 | fields[2] << 16 | fields[3] << 24;
            let copy_size = match fields[4] | fields[5] << 8 | fields[6] << 16 {
                0 => 0x10000,
                size => size,
            };

            let chunk = base
                .get(copy_offset..copy_offset + copy_size)
                .context("Copy instruction out of base bounds")?;
            result.extend_from_slice(chunk);
        } else if opcode != 0 {
            let size = opcode as usize;
            let chunk = delta
                .get(position..position + size)
                .context("Truncated insert instruction")?;
            result.extend_from_slice(chunk);
            position += size;
        } else {
            anyhow::bail!("Reserved delta opcode 0");
        }
    }

    if result.len() != result_size {
        anyhow::bail!(
            "Delta result size mismatch: expected {result_size}, got {}",
            result.len()
        );
    }

    Ok(result.into())
}
