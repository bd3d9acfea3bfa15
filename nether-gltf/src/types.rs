//! glTF 2.0 entity types and the numeric taxonomy behind accessors.
//!
//! Every cross-reference between entities is a [`Handle`], the position of
//! the target inside its top-level array. Optional references are
//! `Option<Handle>`; on the wire an absent reference is simply an omitted key.

use std::collections::BTreeMap;

use glam::{Mat4, Quat, Vec3};

use crate::transform::TransformKind;

/// Index into one of a document's top-level arrays.
pub type Handle = u32;

/// Reserved handle value meaning "no entity".
///
/// Never a valid array position; the parser rejects it as an index.
pub const INVALID_HANDLE: Handle = u32::MAX;

/// Scalar type of each accessor component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComponentType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    UnsignedInt,
    #[default]
    Float,
    /// Code outside the glTF allow-list
    Invalid,
}

impl ComponentType {
    pub fn from_code(code: u64) -> Self {
        match code {
            5120 => Self::Byte,
            5121 => Self::UnsignedByte,
            5122 => Self::Short,
            5123 => Self::UnsignedShort,
            5125 => Self::UnsignedInt,
            5126 => Self::Float,
            _ => Self::Invalid,
        }
    }

    /// GL enum value, `None` for [`ComponentType::Invalid`].
    pub fn code(self) -> Option<u32> {
        Some(match self {
            Self::Byte => 5120,
            Self::UnsignedByte => 5121,
            Self::Short => 5122,
            Self::UnsignedShort => 5123,
            Self::UnsignedInt => 5125,
            Self::Float => 5126,
            Self::Invalid => return None,
        })
    }

    /// Size of one component in bytes (0 for `Invalid`).
    pub fn byte_width(self) -> usize {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort => 2,
            Self::UnsignedInt | Self::Float => 4,
            Self::Invalid => 0,
        }
    }
}

/// Shape of one accessor element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ElementType {
    #[default]
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    /// Token not in the allow-list
    Invalid,
}

impl ElementType {
    /// Exact, case-sensitive match against the seven glTF tokens.
    pub fn from_name(name: &str) -> Self {
        match name {
            "SCALAR" => Self::Scalar,
            "VEC2" => Self::Vec2,
            "VEC3" => Self::Vec3,
            "VEC4" => Self::Vec4,
            "MAT2" => Self::Mat2,
            "MAT3" => Self::Mat3,
            "MAT4" => Self::Mat4,
            _ => Self::Invalid,
        }
    }

    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::Scalar => "SCALAR",
            Self::Vec2 => "VEC2",
            Self::Vec3 => "VEC3",
            Self::Vec4 => "VEC4",
            Self::Mat2 => "MAT2",
            Self::Mat3 => "MAT3",
            Self::Mat4 => "MAT4",
            Self::Invalid => return None,
        })
    }

    /// Number of components per element (0 for `Invalid`).
    pub fn arity(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
            Self::Invalid => 0,
        }
    }

    /// Element type for a plain tuple of `n` components.
    ///
    /// Only 1..=4 map to a type; a 4-tuple is always `VEC4`, never `MAT2`.
    pub fn for_tuple_size(n: usize) -> Option<Self> {
        match n {
            1 => Some(Self::Scalar),
            2 => Some(Self::Vec2),
            3 => Some(Self::Vec3),
            4 => Some(Self::Vec4),
            _ => None,
        }
    }
}

/// Byte size of one tightly packed element.
pub fn default_stride(element: ElementType, component: ComponentType) -> usize {
    element.arity() * component.byte_width()
}

/// Distance between consecutive elements: the declared stride when nonzero,
/// otherwise the packed element size.
pub fn effective_stride(
    declared_stride: usize,
    element: ElementType,
    component: ComponentType,
) -> usize {
    if declared_stride != 0 {
        declared_stride
    } else {
        default_stride(element, component)
    }
}

/// Primitive topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
    Invalid,
}

impl RenderMode {
    pub fn from_code(code: u64) -> Self {
        match code {
            0 => Self::Points,
            1 => Self::Lines,
            2 => Self::LineLoop,
            3 => Self::LineStrip,
            4 => Self::Triangles,
            5 => Self::TriangleStrip,
            6 => Self::TriangleFan,
            _ => Self::Invalid,
        }
    }

    pub fn code(self) -> Option<u32> {
        Some(match self {
            Self::Points => 0,
            Self::Lines => 1,
            Self::LineLoop => 2,
            Self::LineStrip => 3,
            Self::Triangles => 4,
            Self::TriangleStrip => 5,
            Self::TriangleFan => 6,
            Self::Invalid => return None,
        })
    }
}

/// Intended GPU binding of a buffer view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferViewTarget {
    ArrayBuffer,
    ElementArrayBuffer,
    Invalid,
}

impl BufferViewTarget {
    pub fn from_code(code: u64) -> Self {
        match code {
            34962 => Self::ArrayBuffer,
            34963 => Self::ElementArrayBuffer,
            _ => Self::Invalid,
        }
    }

    pub fn code(self) -> Option<u32> {
        match self {
            Self::ArrayBuffer => Some(34962),
            Self::ElementArrayBuffer => Some(34963),
            Self::Invalid => None,
        }
    }
}

/// Sampler magnification/minification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
    Invalid,
}

impl TexFilter {
    pub fn from_code(code: u64) -> Self {
        match code {
            9728 => Self::Nearest,
            9729 => Self::Linear,
            9984 => Self::NearestMipmapNearest,
            9985 => Self::LinearMipmapNearest,
            9986 => Self::NearestMipmapLinear,
            9987 => Self::LinearMipmapLinear,
            _ => Self::Invalid,
        }
    }

    pub fn code(self) -> Option<u32> {
        Some(match self {
            Self::Nearest => 9728,
            Self::Linear => 9729,
            Self::NearestMipmapNearest => 9984,
            Self::LinearMipmapNearest => 9985,
            Self::NearestMipmapLinear => 9986,
            Self::LinearMipmapLinear => 9987,
            Self::Invalid => return None,
        })
    }
}

/// Sampler wrap mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TexWrap {
    ClampToEdge,
    MirroredRepeat,
    #[default]
    Repeat,
    Invalid,
}

impl TexWrap {
    pub fn from_code(code: u64) -> Self {
        match code {
            33071 => Self::ClampToEdge,
            33648 => Self::MirroredRepeat,
            10497 => Self::Repeat,
            _ => Self::Invalid,
        }
    }

    pub fn code(self) -> Option<u32> {
        match self {
            Self::ClampToEdge => Some(33071),
            Self::MirroredRepeat => Some(33648),
            Self::Repeat => Some(10497),
            Self::Invalid => None,
        }
    }
}

/// Material alpha blending mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

impl AlphaMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "OPAQUE" => Some(Self::Opaque),
            "MASK" => Some(Self::Mask),
            "BLEND" => Some(Self::Blend),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Opaque => "OPAQUE",
            Self::Mask => "MASK",
            Self::Blend => "BLEND",
        }
    }
}

/// Metadata block every glTF file carries.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub copyright: String,
    pub generator: String,
    /// Not checked by the codec; callers compare against what they support.
    pub version: String,
    pub min_version: String,
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            copyright: String::new(),
            generator: String::new(),
            version: "2.0".to_string(),
            min_version: String::new(),
        }
    }
}

/// Source of raw bytes.
///
/// A buffer owns no bytes; they live in the document's staging area
/// (exporters, the GLB BIN chunk) or its decode cache (URIs).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Buffer {
    pub byte_length: usize,
    /// `None` marks the GLB-embedded buffer (conventionally index 0).
    pub uri: Option<String>,
    pub name: String,
}

/// Byte window into a buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BufferView {
    pub buffer: Handle,
    pub byte_offset: usize,
    pub byte_length: usize,
    /// 0 means tightly packed
    pub byte_stride: usize,
    pub target: Option<BufferViewTarget>,
    pub name: String,
}

/// Typed, strided description of elements inside a buffer view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Accessor {
    /// Absent for sparse or zero-initialized accessors.
    pub buffer_view: Option<Handle>,
    pub byte_offset: usize,
    pub component_type: ComponentType,
    pub element_type: ElementType,
    pub count: usize,
    pub normalized: bool,
    /// Per-component bounds, stored losslessly as f64.
    pub min: Vec<f64>,
    pub max: Vec<f64>,
    /// Set when the source carried a `sparse` block; resolution rejects these.
    pub sparse: bool,
    pub name: String,
}

impl Accessor {
    /// Bytes occupied by one packed element.
    pub fn element_size(&self) -> usize {
        default_stride(self.element_type, self.component_type)
    }
}

/// One draw call's worth of geometry inside a mesh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Primitive {
    /// Semantic name (`POSITION`, `TEXCOORD_0`, ...) to accessor.
    pub attributes: BTreeMap<String, Handle>,
    pub indices: Option<Handle>,
    pub material: Option<Handle>,
    pub mode: RenderMode,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub primitives: Vec<Primitive>,
    pub name: String,
}

/// Scene graph node.
///
/// `matrix` and the TRS triple are mutually exclusive on the wire: a
/// non-identity matrix wins, see [`Node::transform_kind`].
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub camera: Option<Handle>,
    pub mesh: Option<Handle>,
    pub skin: Option<Handle>,
    pub children: Vec<Handle>,
    pub matrix: Mat4,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub name: String,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            camera: None,
            mesh: None,
            skin: None,
            children: Vec::new(),
            matrix: Mat4::IDENTITY,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            name: String::new(),
        }
    }
}

impl Node {
    pub fn transform_kind(&self) -> TransformKind {
        if self.matrix != Mat4::IDENTITY {
            TransformKind::Matrix
        } else if self.translation != Vec3::ZERO
            || self.rotation != Quat::IDENTITY
            || self.scale != Vec3::ONE
        {
            TransformKind::Trs
        } else {
            TransformKind::None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub nodes: Vec<Handle>,
    pub name: String,
}

/// Reference from a material slot to a texture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextureInfo {
    pub index: Handle,
    pub tex_coord: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalTextureInfo {
    pub index: Handle,
    pub tex_coord: u32,
    /// (default: 1.0)
    pub scale: f32,
}

impl Default for NormalTextureInfo {
    fn default() -> Self {
        Self {
            index: 0,
            tex_coord: 0,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OcclusionTextureInfo {
    pub index: Handle,
    pub tex_coord: u32,
    /// (default: 1.0)
    pub strength: f32,
}

impl Default for OcclusionTextureInfo {
    fn default() -> Self {
        Self {
            index: 0,
            tex_coord: 0,
            strength: 1.0,
        }
    }
}

/// Metallic-roughness parameter block.
#[derive(Debug, Clone, PartialEq)]
pub struct PbrMetallicRoughness {
    pub base_color_factor: [f32; 4],
    pub base_color_texture: Option<TextureInfo>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<TextureInfo>,
}

impl Default for PbrMetallicRoughness {
    fn default() -> Self {
        Self {
            base_color_factor: [1.0; 4],
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    pub normal_texture: Option<NormalTextureInfo>,
    pub occlusion_texture: Option<OcclusionTextureInfo>,
    pub emissive_texture: Option<TextureInfo>,
    pub emissive_factor: [f32; 3],
    pub alpha_mode: AlphaMode,
    /// Only meaningful with [`AlphaMode::Mask`] (default: 0.5)
    pub alpha_cutoff: f32,
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            pbr_metallic_roughness: None,
            normal_texture: None,
            occlusion_texture: None,
            emissive_texture: None,
            emissive_factor: [0.0; 3],
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Texture {
    pub sampler: Option<Handle>,
    pub source: Option<Handle>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sampler {
    pub mag_filter: Option<TexFilter>,
    pub min_filter: Option<TexFilter>,
    pub wrap_s: TexWrap,
    pub wrap_t: TexWrap,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Image {
    pub uri: Option<String>,
    pub mime_type: Option<String>,
    pub buffer_view: Option<Handle>,
    pub name: String,
}
