//! Parser entry points for both glTF forms.
//!
//! Parsing never touches buffer bytes beyond what the input itself holds:
//! URI buffers stay undecoded until an accessor is resolved, and the GLB BIN
//! chunk is staged as buffer 0.

mod glb;
mod json;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::validate;

pub use glb::{
    CHUNK_BIN, CHUNK_HEADER_LEN, CHUNK_JSON, GLB_MAGIC, GLB_VERSION, HEADER_LEN, is_glb,
};

impl Document {
    /// Parse a `.gltf` or `.glb` file. Relative buffer URIs resolve against
    /// the file's directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| Error::file(path, e))?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        debug!("Parsing {} ({} bytes)", path.display(), bytes.len());
        Self::from_slice(&bytes, base_dir)
    }

    /// Parse in-memory bytes, detecting GLB by its magic and treating
    /// anything else as JSON text.
    pub fn from_slice(bytes: &[u8], base_dir: impl Into<PathBuf>) -> Result<Self> {
        if is_glb(bytes) {
            Self::from_glb(bytes, base_dir)
        } else {
            Self::from_gltf(bytes, base_dir)
        }
    }

    /// Parse glTF JSON text.
    pub fn from_gltf(text: &[u8], base_dir: impl Into<PathBuf>) -> Result<Self> {
        let doc = json::parse_json(text, base_dir.into())?;
        validate::check_references(&doc)?;
        Ok(doc)
    }

    /// Parse a GLB container; its BIN chunk becomes the bytes of buffer 0.
    pub fn from_glb(bytes: &[u8], base_dir: impl Into<PathBuf>) -> Result<Self> {
        let chunks = glb::split_chunks(bytes)?;
        let mut doc = json::parse_json(glb::trim_json_padding(chunks.json), base_dir.into())?;
        validate::check_references(&doc)?;

        if let Some(bin) = chunks.bin {
            match doc.buffers.first() {
                Some(buffer) if buffer.uri.is_none() => {
                    if bin.len() < buffer.byte_length {
                        return Err(Error::BufferLengthMismatch {
                            buffer: 0,
                            declared: buffer.byte_length,
                            actual: bin.len(),
                        });
                    }
                    // BIN may carry up to 3 bytes of trailing padding
                    doc.staged[0] = bin[..buffer.byte_length].to_vec();
                }
                _ => warn!(
                    "GLB BIN chunk ({} bytes) has no embedded buffer to back; ignoring",
                    bin.len()
                ),
            }
        }
        Ok(doc)
    }
}
