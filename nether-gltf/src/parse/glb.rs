//! GLB container reader.
//!
//! Layout: 12-byte header (`glTF`, version 2, total length), then chunks of
//! `[length: u32 LE][type: u32 LE][payload]`. The first chunk must be JSON;
//! an optional BIN chunk follows. All lengths are checked against the bytes
//! actually present before any slice is taken.

use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// `glTF` read as a little-endian u32
pub const GLB_MAGIC: u32 = 0x4654_6C67;
pub const GLB_VERSION: u32 = 2;
/// `JSON`
pub const CHUNK_JSON: u32 = 0x4E4F_534A;
/// `BIN\0`
pub const CHUNK_BIN: u32 = 0x004E_4942;

pub const HEADER_LEN: usize = 12;
pub const CHUNK_HEADER_LEN: usize = 8;

/// Payloads of a validated GLB container.
#[derive(Debug)]
pub(crate) struct GlbChunks<'a> {
    pub json: &'a [u8],
    pub bin: Option<&'a [u8]>,
}

/// True when `bytes` starts with the GLB magic.
pub fn is_glb(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && LittleEndian::read_u32(bytes) == GLB_MAGIC
}

pub(crate) fn split_chunks(bytes: &[u8]) -> Result<GlbChunks<'_>> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::Malformed(format!(
            "GLB header needs {HEADER_LEN} bytes, found {}",
            bytes.len()
        )));
    }

    let magic = LittleEndian::read_u32(&bytes[0..4]);
    if magic != GLB_MAGIC {
        return Err(Error::Malformed(format!("bad GLB magic {magic:#010x}")));
    }
    let version = LittleEndian::read_u32(&bytes[4..8]);
    if version != GLB_VERSION {
        return Err(Error::Unsupported(format!("GLB container version {version}")));
    }

    let declared = LittleEndian::read_u32(&bytes[8..12]) as usize;
    if declared > bytes.len() {
        return Err(Error::Malformed(format!(
            "GLB header declares {declared} bytes but only {} are present",
            bytes.len()
        )));
    }
    if declared < HEADER_LEN {
        return Err(Error::Malformed(format!("GLB header declares impossible length {declared}")));
    }
    if declared < bytes.len() {
        warn!(
            "Ignoring {} trailing bytes after GLB container",
            bytes.len() - declared
        );
    }

    let mut rest = &bytes[HEADER_LEN..declared];
    let mut json = None;
    let mut bin = None;
    let mut position = HEADER_LEN;

    while !rest.is_empty() {
        if rest.len() < CHUNK_HEADER_LEN {
            return Err(Error::Malformed(format!("truncated chunk header at byte {position}")));
        }
        let length = LittleEndian::read_u32(&rest[0..4]) as usize;
        let kind = LittleEndian::read_u32(&rest[4..8]);
        let available = rest.len() - CHUNK_HEADER_LEN;
        if length > available {
            return Err(Error::Malformed(format!(
                "chunk at byte {position} declares {length} bytes but only {available} remain"
            )));
        }
        let payload = &rest[CHUNK_HEADER_LEN..CHUNK_HEADER_LEN + length];

        match kind {
            CHUNK_JSON if json.is_none() => json = Some(payload),
            CHUNK_JSON => return Err(Error::Malformed("more than one JSON chunk".into())),
            _ if json.is_none() => {
                return Err(Error::Malformed(format!(
                    "first chunk must be JSON, found type {kind:#010x}"
                )));
            }
            CHUNK_BIN if bin.is_none() => bin = Some(payload),
            CHUNK_BIN => return Err(Error::Malformed("more than one BIN chunk".into())),
            other => debug!("Skipping unknown GLB chunk type {other:#010x} ({length} bytes)"),
        }

        rest = &rest[CHUNK_HEADER_LEN + length..];
        position += CHUNK_HEADER_LEN + length;
    }

    let json = json.ok_or_else(|| Error::Malformed("GLB container has no JSON chunk".into()))?;
    Ok(GlbChunks { json, bin })
}

/// Drop the space (or stray NUL) padding writers append to the JSON chunk.
pub(crate) fn trim_json_padding(json: &[u8]) -> &[u8] {
    let end = json
        .iter()
        .rposition(|&b| b != b' ' && b != 0)
        .map_or(0, |i| i + 1);
    &json[..end]
}
