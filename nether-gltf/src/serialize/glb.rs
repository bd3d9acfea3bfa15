//! GLB container writer.
//!
//! Length fields are written as placeholders and back-patched by seeking once
//! the padded chunk sizes are known.

use std::io::{Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::{Error, Result};
use crate::parse::{CHUNK_BIN, CHUNK_HEADER_LEN, CHUNK_JSON, GLB_MAGIC, GLB_VERSION, HEADER_LEN};

/// Bytes needed to round `len` up to a 4-byte boundary.
pub(crate) fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

fn to_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::Invariant(format!("{what} of {value} bytes exceeds GLB limits")))
}

/// Write a complete GLB container and return its total length.
///
/// JSON is right-padded with spaces and BIN with zeros to 4-byte multiples.
/// `bin` is `None` when the document has no buffers; the BIN chunk is then
/// omitted entirely.
pub(crate) fn write_container<W: Write + Seek>(
    w: &mut W,
    json: &[u8],
    bin: Option<&[u8]>,
) -> Result<u64> {
    let start = w.stream_position()?;

    // Header
    w.write_u32::<LittleEndian>(GLB_MAGIC)?;
    w.write_u32::<LittleEndian>(GLB_VERSION)?;
    w.write_u32::<LittleEndian>(0)?;

    // JSON chunk
    w.write_u32::<LittleEndian>(0)?;
    w.write_u32::<LittleEndian>(CHUNK_JSON)?;
    w.write_all(json)?;
    let json_padding = padding(json.len());
    w.write_all(&[b' '; 3][..json_padding])?;
    let json_len = (json.len() + json_padding) as u64;

    // BIN chunk
    let bin_len = match bin {
        Some(bytes) => {
            w.write_u32::<LittleEndian>(0)?;
            w.write_u32::<LittleEndian>(CHUNK_BIN)?;
            w.write_all(bytes)?;
            let bin_padding = padding(bytes.len());
            w.write_all(&[0u8; 3][..bin_padding])?;
            Some((bytes.len() + bin_padding) as u64)
        }
        None => None,
    };

    let end = w.stream_position()?;
    let total = end - start;

    w.seek(SeekFrom::Start(start + 8))?;
    w.write_u32::<LittleEndian>(to_u32(total, "GLB file")?)?;
    w.seek(SeekFrom::Start(start + HEADER_LEN as u64))?;
    w.write_u32::<LittleEndian>(to_u32(json_len, "JSON chunk")?)?;
    if let Some(bin_len) = bin_len {
        let bin_header = start + (HEADER_LEN + CHUNK_HEADER_LEN) as u64 + json_len;
        w.seek(SeekFrom::Start(bin_header))?;
        w.write_u32::<LittleEndian>(to_u32(bin_len, "BIN chunk")?)?;
    }
    w.seek(SeekFrom::Start(end))?;

    Ok(total)
}
