//! glTF 2.0 codec
//!
//! Reads `.gltf` (JSON with external or base64 buffers) and `.glb` (binary
//! container) files into a [`Document`], resolves typed vertex and index
//! data through buffer → bufferView → accessor, and writes documents back
//! out in either form.
//!
//! # Reading
//!
//! ```no_run
//! use nether_gltf::{Document, Handle};
//!
//! # fn main() -> nether_gltf::Result<()> {
//! let doc = Document::open("model.glb")?;
//! let mesh: Handle = 0;
//! let position = doc.mesh(mesh).unwrap().primitives[0].attributes["POSITION"];
//! let view = doc.resolve_accessor(position)?;
//! for vertex in view.iter_f32() {
//!     println!("{vertex:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Writing
//!
//! Exporters append entities with the `create_*` factories, reserve buffer
//! space with [`Document::buffer_alloc`], then call [`Document::serialize`].
//! Buffer lengths are derived from the staged bytes at write time.
//!
//! # Caching
//!
//! [`DocumentCache`] keeps a bounded number of parsed documents by path and
//! hands out shared read-only handles.

pub mod accessor;
pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod parse;
pub mod resolve;
pub mod serialize;
pub mod transform;
pub mod types;
mod validate;

pub use accessor::{AccessorView, Component, Element};
pub use cache::DocumentCache;
pub use config::{CacheConfig, CodecConfig, ExportConfig};
pub use document::Document;
pub use error::{Error, ErrorKind, Result};
pub use parse::{
    CHUNK_BIN, CHUNK_HEADER_LEN, CHUNK_JSON, GLB_MAGIC, GLB_VERSION, HEADER_LEN, is_glb,
};
pub use resolve::DATA_URI_PREFIX;
pub use serialize::{DEFAULT_GENERATOR, WriteOptions};
pub use transform::{DecomposeError, TransformKind, decompose_matrix, trs_to_matrix};
pub use types::*;
