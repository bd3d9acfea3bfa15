//! Document → `.gltf` / `.glb`.
//!
//! Serialization works on a prepared copy of the buffer, buffer view and
//! image tables; the caller's document is never modified. Preparation runs
//! three passes in order:
//!
//! 1. buffer lengths are recomputed from the staged bytes (parsed buffers
//!    that were never staged are read from their source), and every buffer
//!    view is checked to fit,
//! 2. (`.gltf` only) empty buffers are dropped and buffer views renumbered,
//! 3. absolute image paths are copied next to the output and made relative.
//!
//! All checks run before the first byte is written.

mod glb;
mod json;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hashbrown::{HashMap, HashSet};
use tracing::{debug, info};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::resolve::DATA_URI_PREFIX;
use crate::types::{Buffer, BufferView, Handle, Image};
use crate::validate;

/// Generator string written when none is configured.
pub const DEFAULT_GENERATOR: &str = concat!("nether-gltf ", env!("CARGO_PKG_VERSION"));

/// Knobs for a single write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    /// Write entity `name` keys (default: true)
    pub export_names: bool,
    /// Overrides `asset.generator` when set (default: this crate)
    pub generator: Option<String>,
    /// Create missing parent directories of the output path (default: true)
    pub create_directories: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            export_names: true,
            generator: Some(DEFAULT_GENERATOR.to_string()),
            create_directories: true,
        }
    }
}

/// Output-ready copies of the tables serialization rewrites.
#[derive(Debug)]
pub(crate) struct Prepared<'a> {
    pub buffers: Vec<Buffer>,
    /// Bytes of each entry in `buffers`
    pub data: Vec<&'a [u8]>,
    pub buffer_views: Vec<BufferView>,
    pub images: Vec<Image>,
}

fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

fn prepare<'a>(doc: &'a Document, out_dir: &Path, as_glb: bool) -> Result<Prepared<'a>> {
    validate::check_references(doc)?;

    // Pass 1: lengths come from the staged bytes, or from the source when
    // a parsed buffer was never staged
    let mut buffers: Vec<Buffer> = doc.buffers.clone();
    let mut data: Vec<&[u8]> = Vec::with_capacity(buffers.len());
    for (i, buffer) in buffers.iter_mut().enumerate() {
        let handle = i as Handle;
        let staged = doc.staged_bytes(handle);
        let bytes = if staged.is_empty() && buffer.byte_length > 0 {
            doc.buffer_bytes(handle)?
        } else {
            staged
        };
        buffer.byte_length = bytes.len();
        data.push(bytes);
    }

    let mut buffer_views = doc.buffer_views.clone();
    check_view_ranges(&buffer_views, &data)?;

    if as_glb {
        if buffers.first().is_some_and(|b| b.uri.is_some()) {
            return Err(Error::Invariant(
                "buffer 0 must have no URI to be embedded in a GLB".into(),
            ));
        }
        if let Some(i) = buffers.iter().skip(1).position(|b| b.uri.is_none()) {
            return Err(Error::Invariant(format!(
                "buffer {} has no URI; only buffer 0 can be embedded in a GLB",
                i + 1
            )));
        }
    } else {
        // Pass 2: drop empty buffers and renumber views
        let mut remap: Vec<Option<Handle>> = Vec::with_capacity(buffers.len());
        let mut next: Handle = 0;
        for buffer in &buffers {
            if buffer.byte_length == 0 {
                remap.push(None);
            } else {
                remap.push(Some(next));
                next += 1;
            }
        }
        for (i, view) in buffer_views.iter_mut().enumerate() {
            view.buffer = remap[view.buffer as usize].ok_or_else(|| {
                Error::Invariant(format!(
                    "bufferViews[{i}] refers to buffer {} which has no staged bytes",
                    view.buffer
                ))
            })?;
        }

        let before = buffers.len();
        (buffers, data) = buffers
            .into_iter()
            .zip(data)
            .filter(|(buffer, _)| buffer.byte_length > 0)
            .unzip();
        if buffers.len() < before {
            debug!("Removed {} empty buffers before writing", before - buffers.len());
        }
    }

    // Embedded bytes travel as base64 in .gltf; GLB keeps buffer 0 in BIN
    for (i, (buffer, bytes)) in buffers.iter_mut().zip(&data).enumerate() {
        let embedded = match buffer.uri.as_deref() {
            None => !(as_glb && i == 0),
            Some(uri) => is_data_uri(uri),
        };
        if embedded {
            buffer.uri = Some(format!("{DATA_URI_PREFIX}{}", STANDARD.encode(bytes)));
        }
    }

    // Pass 3: absolute image paths become siblings of the output
    let mut images = doc.images.clone();
    let mut copied: HashMap<PathBuf, String> = HashMap::new();
    let mut taken: HashSet<String> = HashSet::new();
    for image in &mut images {
        let Some(uri) = image.uri.as_deref() else {
            continue;
        };
        let source = Path::new(uri);
        if is_data_uri(uri) || !source.is_absolute() {
            continue;
        }
        if let Some(name) = copied.get(source) {
            image.uri = Some(name.clone());
            continue;
        }
        let Some(name) = unique_file_name(source, &taken) else {
            continue;
        };
        let dest = out_dir.join(&name);
        if dest != source {
            fs::copy(source, &dest).map_err(|e| Error::file(source, e))?;
            debug!("Copied image {} -> {}", source.display(), dest.display());
        }
        taken.insert(name.clone());
        copied.insert(source.to_path_buf(), name.clone());
        image.uri = Some(name);
    }

    Ok(Prepared {
        buffers,
        data,
        buffer_views,
        images,
    })
}

/// Every buffer view must lie inside the bytes that will be written.
fn check_view_ranges(views: &[BufferView], data: &[&[u8]]) -> Result<()> {
    for (i, view) in views.iter().enumerate() {
        let available = data[view.buffer as usize].len();
        let end = view.byte_offset.checked_add(view.byte_length);
        if end.is_none_or(|end| end > available) {
            return Err(Error::Invariant(format!(
                "bufferViews[{i}] spans {}+{} bytes but buffer {} holds {available}",
                view.byte_offset, view.byte_length, view.buffer
            )));
        }
    }
    Ok(())
}

/// File name for a copied image that no earlier image in this write uses.
///
/// `tex.png` stays `tex.png` when free, then becomes `tex_1.png`, `tex_2.png`...
fn unique_file_name(source: &Path, taken: &HashSet<String>) -> Option<String> {
    let file_name = source.file_name()?.to_string_lossy().into_owned();
    if !taken.contains(&file_name) {
        return Some(file_name);
    }
    let stem = source.file_stem()?.to_string_lossy();
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (1..)
        .map(|n| format!("{stem}_{n}{ext}"))
        .find(|name| !taken.contains(name))
}

fn write_external_buffers(prepared: &Prepared, out_dir: &Path) -> Result<()> {
    for (buffer, bytes) in prepared.buffers.iter().zip(&prepared.data) {
        let Some(uri) = buffer.uri.as_deref() else {
            continue;
        };
        if is_data_uri(uri) {
            continue;
        }
        let path = out_dir.join(uri);
        fs::write(&path, bytes).map_err(|e| Error::file(&path, e))?;
        debug!("Wrote buffer {} ({} bytes)", path.display(), bytes.len());
    }
    Ok(())
}

fn output_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

impl Document {
    /// Write the document as `.glb` (`as_glb`) or `.gltf` with default options.
    pub fn serialize(&self, path: impl AsRef<Path>, as_glb: bool) -> Result<()> {
        self.serialize_with(path, as_glb, &WriteOptions::default())
    }

    /// Write the document, placing any external buffer files next to `path`.
    pub fn serialize_with(
        &self,
        path: impl AsRef<Path>,
        as_glb: bool,
        options: &WriteOptions,
    ) -> Result<()> {
        let path = path.as_ref();
        let out_dir = output_dir(path);
        if options.create_directories {
            fs::create_dir_all(&out_dir).map_err(|e| Error::file(&out_dir, e))?;
        }

        let prepared = prepare(self, &out_dir, as_glb)?;
        let text = json::to_json(self, &prepared, options, !as_glb)?;
        write_external_buffers(&prepared, &out_dir)?;

        if as_glb {
            let file = File::create(path).map_err(|e| Error::file(path, e))?;
            let mut writer = BufWriter::new(file);
            let bin = prepared.data.first().copied();
            let total = glb::write_container(&mut writer, &text, bin)?;
            writer.flush().map_err(|e| Error::file(path, e))?;
            info!("Wrote {} ({total} bytes)", path.display());
        } else {
            fs::write(path, &text).map_err(|e| Error::file(path, e))?;
            info!("Wrote {} ({} bytes)", path.display(), text.len());
        }
        Ok(())
    }

    /// Copy every buffer's resolved bytes into the staging area so a parsed
    /// document can be written back out. Buffers already staged are kept.
    pub fn stage_resolved_buffers(&mut self) -> Result<()> {
        let mut resolved = Vec::with_capacity(self.buffers.len());
        for i in 0..self.buffers.len() {
            let handle = i as Handle;
            if self.staged_bytes(handle).is_empty() && self.buffers[i].byte_length > 0 {
                resolved.push(Some(self.buffer_bytes(handle)?.to_vec()));
            } else {
                resolved.push(None);
            }
        }
        for (slot, bytes) in self.staged.iter_mut().zip(resolved) {
            if let Some(bytes) = bytes {
                *slot = bytes;
            }
        }
        Ok(())
    }
}
