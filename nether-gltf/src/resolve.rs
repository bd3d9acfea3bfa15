//! Buffer → bufferView → accessor resolution.
//!
//! Buffer bytes come from one of three places, picked by the buffer's URI:
//! a base64 data URI, the document's own staging area (no URI), or a file
//! next to the document. URI sources are decoded on first use and kept for
//! the lifetime of the document; concurrent first uses decode exactly once.

use std::fs::File;
use std::io::Read;
use std::sync::PoisonError;
use std::sync::atomic::Ordering;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

use crate::accessor::AccessorView;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::types::{ComponentType, ElementType, Handle, effective_stride};

/// Prefix of the base64 data URIs glTF writers emit for buffers.
pub const DATA_URI_PREFIX: &str = "data:application/octet-stream;base64,";

/// Payload of a base64 `data:` URI, or `None` if `uri` is not a data URI.
pub(crate) fn data_uri_payload(uri: &str) -> Option<Result<&str>> {
    if let Some(payload) = uri.strip_prefix(DATA_URI_PREFIX) {
        return Some(Ok(payload));
    }
    let rest = uri.strip_prefix("data:")?;
    Some(match rest.split_once(";base64,") {
        Some((_, payload)) => Ok(payload),
        None => Err(Error::Unsupported("data URI without base64 encoding".into())),
    })
}

impl Document {
    /// Raw bytes of a buffer, decoding and caching them on first use.
    pub fn buffer_bytes(&self, buffer: Handle) -> Result<&[u8]> {
        let info = self.buffer(buffer).ok_or(Error::UnknownHandle {
            kind: "buffer",
            handle: buffer,
        })?;

        let Some(uri) = info.uri.as_deref() else {
            let staged = self.staged_bytes(buffer);
            if staged.is_empty() && info.byte_length > 0 {
                return Err(Error::MissingEmbeddedBuffer(buffer));
            }
            if staged.len() < info.byte_length {
                return Err(Error::BufferLengthMismatch {
                    buffer,
                    declared: info.byte_length,
                    actual: staged.len(),
                });
            }
            return Ok(staged);
        };

        let slot = &self.slots[buffer as usize];
        if let Some(bytes) = slot.bytes.get() {
            return Ok(bytes.as_slice());
        }

        let _guard = slot.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bytes) = slot.bytes.get() {
            return Ok(bytes.as_slice());
        }

        let decoded = self.decode_buffer(buffer, uri, info.byte_length)?;
        self.decode_count.fetch_add(1, Ordering::AcqRel);
        Ok(slot.bytes.get_or_init(|| decoded).as_slice())
    }

    fn decode_buffer(&self, buffer: Handle, uri: &str, byte_length: usize) -> Result<Vec<u8>> {
        if let Some(payload) = data_uri_payload(uri) {
            let bytes = STANDARD.decode(payload?)?;
            if bytes.len() != byte_length {
                return Err(Error::BufferLengthMismatch {
                    buffer,
                    declared: byte_length,
                    actual: bytes.len(),
                });
            }
            debug!("Decoded buffer {buffer} from base64 ({byte_length} bytes)");
            return Ok(bytes);
        }

        let path = self.base_dir.join(uri);
        let mut file = File::open(&path).map_err(|e| Error::file(&path, e))?;
        let mut bytes = vec![0; byte_length];
        file.read_exact(&mut bytes)
            .map_err(|e| Error::file(&path, e))?;
        debug!(
            "Read buffer {buffer} from {} ({byte_length} bytes)",
            path.display()
        );
        Ok(bytes)
    }

    /// Bounds-checked view of an accessor's elements.
    ///
    /// Fails before touching any bytes if the accessor, its buffer view or
    /// its buffer is missing, or if `count` elements at the effective stride
    /// do not fit inside the view and buffer.
    pub fn resolve_accessor(&self, accessor: Handle) -> Result<AccessorView<'_>> {
        let info = self.accessor(accessor).ok_or(Error::UnknownHandle {
            kind: "accessor",
            handle: accessor,
        })?;
        let location = || format!("accessors[{accessor}]");

        if info.sparse {
            return Err(Error::Unsupported(format!("{}: sparse accessors", location())));
        }
        if info.component_type == ComponentType::Invalid {
            return Err(Error::InvalidField {
                location: location(),
                field: "componentType",
                reason: "is not a glTF component type".into(),
            });
        }
        if info.element_type == ElementType::Invalid {
            return Err(Error::InvalidField {
                location: location(),
                field: "type",
                reason: "is not a glTF element type".into(),
            });
        }
        let Some(view_handle) = info.buffer_view else {
            return Err(Error::Unsupported(format!("{}: accessor without bufferView", location())));
        };
        let view = self.buffer_view(view_handle).ok_or_else(|| Error::OutOfRange {
            location: location(),
            field: "bufferView",
            target: "bufferView",
            handle: view_handle,
            len: self.buffer_views.len(),
        })?;
        if self.buffer(view.buffer).is_none() {
            return Err(Error::OutOfRange {
                location: format!("bufferViews[{view_handle}]"),
                field: "buffer",
                target: "buffer",
                handle: view.buffer,
                len: self.buffers.len(),
            });
        }

        let element_size = info.element_size();
        let stride = effective_stride(view.byte_stride, info.element_type, info.component_type);
        if stride < element_size {
            return Err(Error::InvalidField {
                location: format!("bufferViews[{view_handle}]"),
                field: "byteStride",
                reason: format!("{stride} is smaller than the {element_size}-byte element"),
            });
        }

        // Last element only needs its own size, not a full stride
        let span = match info.count {
            0 => 0,
            n => (n - 1)
                .checked_mul(stride)
                .and_then(|v| v.checked_add(element_size))
                .ok_or_else(|| Error::Malformed(format!("{}: count overflows", location())))?,
        };
        let required = info.byte_offset.saturating_add(span);
        if required > view.byte_length {
            return Err(Error::OutOfBounds {
                location: location(),
                required,
                available: view.byte_length,
            });
        }

        let bytes = self.buffer_bytes(view.buffer)?;
        let view_end = view.byte_offset.saturating_add(view.byte_length);
        if view_end > bytes.len() {
            return Err(Error::OutOfBounds {
                location: format!("bufferViews[{view_handle}]"),
                required: view_end,
                available: bytes.len(),
            });
        }

        let start = view.byte_offset + info.byte_offset;
        Ok(AccessorView::new(
            &bytes[start..start + span],
            stride,
            info.count,
            info.component_type,
            info.element_type,
            info.normalized,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::BufferView;

    fn base64_doc(payload: &[u8], declared: usize) -> Document {
        let mut doc = Document::new();
        let (_, buffer) = doc.create_buffer();
        buffer.byte_length = declared;
        buffer.uri = Some(format!("{DATA_URI_PREFIX}{}", STANDARD.encode(payload)));
        doc
    }

    fn add_accessor(
        doc: &mut Document,
        view: BufferView,
        offset: usize,
        count: usize,
        element: ElementType,
    ) -> Handle {
        let (view_handle, v) = doc.create_buffer_view();
        *v = view;
        let (handle, accessor) = doc.create_accessor();
        accessor.buffer_view = Some(view_handle);
        accessor.byte_offset = offset;
        accessor.count = count;
        accessor.component_type = ComponentType::Float;
        accessor.element_type = element;
        handle
    }

    #[test]
    fn test_base64_length_mismatch() {
        let mut doc = Document::new();
        let (_, buffer) = doc.create_buffer();
        buffer.byte_length = 10;
        buffer.uri = Some("data:application/octet-stream;base64,AAAA".into());

        let err = doc.buffer_bytes(0).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferLengthMismatch { declared: 10, actual: 3, .. }
        ));
        assert_eq!(doc.decode_count(), 0);
    }

    #[test]
    fn test_decode_once_across_accessors() {
        let floats: Vec<u8> = (0..12u32).flat_map(|i| (i as f32).to_le_bytes()).collect();
        let mut doc = base64_doc(&floats, floats.len());
        let view = BufferView {
            buffer: 0,
            byte_length: 48,
            ..Default::default()
        };
        let a = add_accessor(&mut doc, view.clone(), 0, 4, ElementType::Vec3);
        let b = add_accessor(&mut doc, view, 0, 12, ElementType::Scalar);

        let first = doc.resolve_accessor(a).unwrap();
        let second = doc.resolve_accessor(b).unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(second.len(), 12);
        assert_eq!(doc.decode_count(), 1);
    }

    #[test]
    fn test_interleaved_offset_fits_exact_view() {
        // two VEC3 attributes interleaved with stride 24
        let bytes = vec![0u8; 48];
        let mut doc = base64_doc(&bytes, 48);
        let view = BufferView {
            buffer: 0,
            byte_length: 48,
            byte_stride: 24,
            ..Default::default()
        };
        let normals = add_accessor(&mut doc, view, 12, 2, ElementType::Vec3);
        let resolved = doc.resolve_accessor(normals).unwrap();
        assert_eq!(resolved.stride(), 24);
    }

    #[test]
    fn test_count_exceeding_view_rejected() {
        let mut doc = base64_doc(&[0; 24], 24);
        let view = BufferView {
            buffer: 0,
            byte_length: 24,
            ..Default::default()
        };
        let accessor = add_accessor(&mut doc, view, 0, 3, ElementType::Vec3);
        let err = doc.resolve_accessor(accessor).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { required: 36, .. }));
        assert_eq!(doc.decode_count(), 0);
    }

    #[test]
    fn test_view_exceeding_buffer_rejected() {
        let mut doc = base64_doc(&[0; 8], 8);
        let view = BufferView {
            buffer: 0,
            byte_offset: 4,
            byte_length: 8,
            ..Default::default()
        };
        let accessor = add_accessor(&mut doc, view, 0, 1, ElementType::Vec2);
        let err = doc.resolve_accessor(accessor).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { .. }));
    }

    #[test]
    fn test_embedded_buffer_without_bytes() {
        let mut doc = Document::new();
        doc.create_buffer().1.byte_length = 16;
        let err = doc.buffer_bytes(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn test_sparse_and_viewless_accessors_unsupported() {
        let mut doc = Document::new();
        doc.create_accessor().1.sparse = true;
        doc.create_accessor();
        assert_eq!(
            doc.resolve_accessor(0).unwrap_err().kind(),
            ErrorKind::UnsupportedFeature
        );
        assert_eq!(
            doc.resolve_accessor(1).unwrap_err().kind(),
            ErrorKind::UnsupportedFeature
        );
        assert_eq!(
            doc.resolve_accessor(2).unwrap_err().kind(),
            ErrorKind::OutOfRangeReference
        );
    }

    #[test]
    fn test_external_file_short_read() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.bin"), [0u8; 4]).unwrap();

        let mut doc = Document::with_base_dir(dir.path());
        let (_, buffer) = doc.create_buffer();
        buffer.byte_length = 8;
        buffer.uri = Some("data.bin".into());

        let err = doc.buffer_bytes(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }
}
