//! In-memory glTF document.
//!
//! Entities live in append-only arrays addressed by [`Handle`]. Exporters
//! grow a document through the `create_*` factories and [`Document::buffer_alloc`];
//! the parser fills the same arrays directly.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

use crate::types::*;

/// Decode-once cache slot for one buffer.
///
/// `bytes` is written at most once; `lock` only serializes the first decode.
#[derive(Debug, Default)]
pub(crate) struct BufferSlot {
    pub(crate) bytes: OnceLock<Vec<u8>>,
    pub(crate) lock: Mutex<()>,
}

/// A glTF document plus the bytes backing its buffers.
#[derive(Debug, Default)]
pub struct Document {
    pub(crate) asset: Asset,
    pub(crate) accessors: Vec<Accessor>,
    pub(crate) buffers: Vec<Buffer>,
    pub(crate) buffer_views: Vec<BufferView>,
    pub(crate) meshes: Vec<Mesh>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) scenes: Vec<Scene>,
    pub(crate) materials: Vec<Material>,
    pub(crate) textures: Vec<Texture>,
    pub(crate) samplers: Vec<Sampler>,
    pub(crate) images: Vec<Image>,
    pub(crate) default_scene: Option<Handle>,

    /// Directory relative URIs are resolved against
    pub(crate) base_dir: PathBuf,
    /// Bytes owned by the document itself, one entry per buffer
    pub(crate) staged: Vec<Vec<u8>>,
    /// Lazily decoded URI bytes, one slot per buffer
    pub(crate) slots: Vec<BufferSlot>,
    pub(crate) decode_count: AtomicUsize,
}

macro_rules! entity_arena {
    ($($field:ident: $ty:ty => $get:ident, $get_mut:ident, $create:ident;)*) => {
        impl Document {
            $(
                pub fn $field(&self) -> &[$ty] {
                    &self.$field
                }

                pub fn $get(&self, handle: Handle) -> Option<&$ty> {
                    self.$field.get(handle as usize)
                }

                pub fn $get_mut(&mut self, handle: Handle) -> Option<&mut $ty> {
                    self.$field.get_mut(handle as usize)
                }

                /// Append a default entity and return its handle.
                pub fn $create(&mut self) -> (Handle, &mut $ty) {
                    let handle = next_handle(self.$field.len());
                    self.$field.push(<$ty>::default());
                    (handle, &mut self.$field[handle as usize])
                }
            )*
        }
    };
}

entity_arena! {
    accessors: Accessor => accessor, accessor_mut, create_accessor;
    buffer_views: BufferView => buffer_view, buffer_view_mut, create_buffer_view;
    meshes: Mesh => mesh, mesh_mut, create_mesh;
    nodes: Node => node, node_mut, create_node;
    scenes: Scene => scene, scene_mut, create_scene;
    materials: Material => material, material_mut, create_material;
    textures: Texture => texture, texture_mut, create_texture;
    samplers: Sampler => sampler, sampler_mut, create_sampler;
    images: Image => image, image_mut, create_image;
}

fn next_handle(len: usize) -> Handle {
    let handle = Handle::try_from(len).unwrap_or(INVALID_HANDLE);
    assert!(handle != INVALID_HANDLE, "entity array exceeds handle range");
    handle
}

impl Document {
    /// Empty document whose relative URIs resolve against the working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty document whose relative URIs resolve against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn asset_mut(&mut self) -> &mut Asset {
        &mut self.asset
    }

    pub fn default_scene(&self) -> Option<Handle> {
        self.default_scene
    }

    pub fn set_default_scene(&mut self, scene: Option<Handle>) {
        self.default_scene = scene;
    }

    pub fn buffers(&self) -> &[Buffer] {
        &self.buffers
    }

    pub fn buffer(&self, handle: Handle) -> Option<&Buffer> {
        self.buffers.get(handle as usize)
    }

    pub fn buffer_mut(&mut self, handle: Handle) -> Option<&mut Buffer> {
        self.buffers.get_mut(handle as usize)
    }

    /// Append a buffer together with its empty staging area and decode slot.
    pub fn create_buffer(&mut self) -> (Handle, &mut Buffer) {
        let handle = next_handle(self.buffers.len());
        self.buffers.push(Buffer::default());
        self.staged.push(Vec::new());
        self.slots.push(BufferSlot::default());
        (handle, &mut self.buffers[handle as usize])
    }

    /// Reserve `n_bytes` zeroed bytes at the end of a buffer's staging area.
    ///
    /// The staging area is first padded with zeros up to a multiple of
    /// `alignment`; the returned offset already accounts for that padding.
    ///
    /// # Panics
    ///
    /// If `buffer` was never created. That is a bug in the caller, not bad input.
    pub fn buffer_alloc(
        &mut self,
        buffer: Handle,
        n_bytes: usize,
        alignment: usize,
    ) -> (&mut [u8], usize) {
        let staging = self
            .staged
            .get_mut(buffer as usize)
            .unwrap_or_else(|| panic!("buffer_alloc on nonexistent buffer {buffer}"));

        let alignment = alignment.max(1);
        let offset = staging.len().next_multiple_of(alignment);
        staging.resize(offset + n_bytes, 0);
        (&mut staging[offset..], offset)
    }

    /// Copy plain-old-data values into a buffer, aligned to their own size
    /// (at least 4 bytes). Returns the byte offset of the first value.
    ///
    /// Values are written in host byte order.
    pub fn buffer_write<T: bytemuck::Pod>(&mut self, buffer: Handle, values: &[T]) -> usize {
        let bytes: &[u8] = bytemuck::cast_slice(values);
        let alignment = std::mem::align_of::<T>().max(4);
        let (dst, offset) = self.buffer_alloc(buffer, bytes.len(), alignment);
        dst.copy_from_slice(bytes);
        offset
    }

    /// Bytes staged for a buffer (exporter data or the GLB BIN chunk).
    pub fn staged_bytes(&self, buffer: Handle) -> &[u8] {
        self.staged
            .get(buffer as usize)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of buffer decodes performed so far.
    pub fn decode_count(&self) -> usize {
        self.decode_count.load(Ordering::Acquire)
    }

    /// Names of all scenes, synthesizing `scene<N>` (1-based) for unnamed ones.
    pub fn scene_names(&self) -> Vec<String> {
        self.scenes
            .iter()
            .enumerate()
            .map(|(i, scene)| {
                if scene.name.is_empty() {
                    format!("scene{}", i + 1)
                } else {
                    scene.name.clone()
                }
            })
            .collect()
    }

    /// One-line entity summary, used for logging.
    pub fn summary(&self) -> String {
        format!(
            "{} scenes, {} nodes, {} meshes, {} materials, \
             {} accessors, {} buffer views, {} buffers",
            self.scenes.len(),
            self.nodes.len(),
            self.meshes.len(),
            self.materials.len(),
            self.accessors.len(),
            self.buffer_views.len(),
            self.buffers.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_returns_sequential_handles() {
        let mut doc = Document::new();
        let (a, _) = doc.create_node();
        let (b, node) = doc.create_node();
        node.name = "second".into();

        assert_eq!((a, b), (0, 1));
        assert_eq!(doc.node(1).unwrap().name, "second");
        assert!(doc.node(2).is_none());
    }

    #[test]
    fn test_buffer_alloc_pads_to_alignment() {
        let mut doc = Document::new();
        let (buffer, _) = doc.create_buffer();

        let (bytes, offset) = doc.buffer_alloc(buffer, 3, 4);
        bytes.copy_from_slice(&[1, 2, 3]);
        assert_eq!(offset, 0);

        let (bytes, offset) = doc.buffer_alloc(buffer, 2, 4);
        assert_eq!(offset, 4);
        assert_eq!(bytes.len(), 2);

        assert_eq!(doc.staged_bytes(buffer), &[1u8, 2, 3, 0, 0, 0]);
    }

    #[test]
    fn test_buffer_write_pod() {
        let mut doc = Document::new();
        let (buffer, _) = doc.create_buffer();
        doc.buffer_alloc(buffer, 1, 1);

        let offset = doc.buffer_write(buffer, &[1.0f32, 2.0]);
        assert_eq!(offset, 4);
        assert_eq!(doc.staged_bytes(buffer).len(), 12);
    }

    #[test]
    #[should_panic(expected = "nonexistent buffer")]
    fn test_buffer_alloc_unknown_buffer_panics() {
        let mut doc = Document::new();
        doc.buffer_alloc(3, 16, 4);
    }

    #[test]
    fn test_scene_names() {
        let mut doc = Document::new();
        doc.create_scene().1.name = "Main".into();
        doc.create_scene();
        assert_eq!(doc.scene_names(), vec!["Main", "scene2"]);
    }
}
