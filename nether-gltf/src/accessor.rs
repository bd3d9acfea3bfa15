//! Typed reads over a resolved accessor.
//!
//! [`AccessorView`] is produced by [`Document::resolve_accessor`] after all
//! bounds checks have passed, so element reads only need to check `i < len`.

use byteorder::{ByteOrder, LittleEndian};
use smallvec::SmallVec;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::types::{ComponentType, ElementType, Handle, RenderMode};

/// One decoded component value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Component {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    U32(u32),
    F32(f32),
}

impl Component {
    /// Float value, applying glTF's normalization rules when `normalized`.
    pub fn to_f32(self, normalized: bool) -> f32 {
        match (self, normalized) {
            (Component::I8(v), true) => (v as f32 / 127.0).max(-1.0),
            (Component::U8(v), true) => v as f32 / 255.0,
            (Component::I16(v), true) => (v as f32 / 32767.0).max(-1.0),
            (Component::U16(v), true) => v as f32 / 65535.0,
            (Component::I8(v), false) => v as f32,
            (Component::U8(v), false) => v as f32,
            (Component::I16(v), false) => v as f32,
            (Component::U16(v), false) => v as f32,
            (Component::U32(v), _) => v as f32,
            (Component::F32(v), _) => v,
        }
    }

    /// Unsigned integer value; `None` for signed or float components.
    pub fn to_u32(self) -> Option<u32> {
        match self {
            Component::U8(v) => Some(v.into()),
            Component::U16(v) => Some(v.into()),
            Component::U32(v) => Some(v),
            _ => None,
        }
    }
}

/// Element values, inline up to a full MAT4.
pub type Element<T> = SmallVec<[T; 16]>;

/// Strided, typed window over an accessor's bytes.
#[derive(Debug, Clone, Copy)]
pub struct AccessorView<'a> {
    bytes: &'a [u8],
    stride: usize,
    count: usize,
    component_type: ComponentType,
    element_type: ElementType,
    normalized: bool,
}

impl<'a> AccessorView<'a> {
    pub(crate) fn new(
        bytes: &'a [u8],
        stride: usize,
        count: usize,
        component_type: ComponentType,
        element_type: ElementType,
        normalized: bool,
    ) -> Self {
        Self {
            bytes,
            stride,
            count,
            component_type,
            element_type,
            normalized,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn normalized(&self) -> bool {
        self.normalized
    }

    /// Raw little-endian bytes of element `i`.
    pub fn raw_element(&self, i: usize) -> Option<&'a [u8]> {
        if i >= self.count {
            return None;
        }
        let start = i * self.stride;
        let size = self.element_type.arity() * self.component_type.byte_width();
        self.bytes.get(start..start + size)
    }

    /// Component `c` of element `i`.
    pub fn component(&self, i: usize, c: usize) -> Option<Component> {
        if c >= self.element_type.arity() {
            return None;
        }
        let width = self.component_type.byte_width();
        let raw = self.raw_element(i)?;
        let b = raw.get(c * width..(c + 1) * width)?;
        Some(match self.component_type {
            ComponentType::Byte => Component::I8(b[0] as i8),
            ComponentType::UnsignedByte => Component::U8(b[0]),
            ComponentType::Short => Component::I16(LittleEndian::read_i16(b)),
            ComponentType::UnsignedShort => Component::U16(LittleEndian::read_u16(b)),
            ComponentType::UnsignedInt => Component::U32(LittleEndian::read_u32(b)),
            ComponentType::Float => Component::F32(LittleEndian::read_f32(b)),
            ComponentType::Invalid => return None,
        })
    }

    /// All components of element `i`.
    pub fn get(&self, i: usize) -> Option<Element<Component>> {
        (0..self.element_type.arity())
            .map(|c| self.component(i, c))
            .collect()
    }

    /// Element `i` as floats, normalized if the accessor says so.
    pub fn get_f32(&self, i: usize) -> Option<Element<f32>> {
        let normalized = self.normalized;
        self.get(i)
            .map(|e| e.into_iter().map(|c| c.to_f32(normalized)).collect())
    }

    /// First component of element `i` as an unsigned integer.
    pub fn get_u32(&self, i: usize) -> Option<u32> {
        self.component(i, 0)?.to_u32()
    }

    pub fn iter_f32(&self) -> impl Iterator<Item = Element<f32>> + '_ {
        (0..self.count).filter_map(move |i| self.get_f32(i))
    }

    /// Element `i` as a fixed-size float array; `None` if `N` is not the arity.
    pub fn get_array<const N: usize>(&self, i: usize) -> Option<[f32; N]> {
        if N != self.element_type.arity() {
            return None;
        }
        let values = self.get_f32(i)?;
        let mut out = [0.0; N];
        out.copy_from_slice(&values);
        Some(out)
    }
}

impl Document {
    /// Triangle list indices for one primitive.
    ///
    /// Indexed primitives read their unsigned-integer index accessor;
    /// non-indexed ones yield `0..POSITION.count`. Only `TRIANGLES` is accepted.
    pub fn triangle_indices(&self, mesh: Handle, primitive: usize) -> Result<Vec<u32>> {
        let location = || format!("meshes[{mesh}].primitives[{primitive}]");
        let prim = self
            .mesh(mesh)
            .ok_or(Error::UnknownHandle {
                kind: "mesh",
                handle: mesh,
            })?
            .primitives
            .get(primitive)
            .ok_or_else(|| Error::Malformed(format!("{} does not exist", location())))?;

        if prim.mode != RenderMode::Triangles {
            return Err(Error::Unsupported(format!(
                "{}: render mode {:?}, only triangles can be converted",
                location(),
                prim.mode
            )));
        }

        let position = *prim
            .attributes
            .get("POSITION")
            .ok_or_else(|| Error::MissingField {
                location: location(),
                field: "POSITION",
            })?;
        let vertex_count = self.resolve_accessor(position)?.len();

        let indices: Vec<u32> = match prim.indices {
            Some(handle) => {
                let view = self.resolve_accessor(handle)?;
                if view.element_type() != ElementType::Scalar
                    || view.component_type() == ComponentType::Float
                {
                    return Err(Error::InvalidField {
                        location: location(),
                        field: "indices",
                        reason: "must be a scalar unsigned-integer accessor".into(),
                    });
                }
                (0..view.len())
                    .map(|i| {
                        view.get_u32(i).ok_or_else(|| Error::InvalidField {
                            location: location(),
                            field: "indices",
                            reason: "must be a scalar unsigned-integer accessor".into(),
                        })
                    })
                    .collect::<Result<_>>()?
            }
            None => (0..vertex_count as u32).collect(),
        };

        if indices.len() % 3 != 0 {
            return Err(Error::Unsupported(format!(
                "{}: {} indices do not form whole triangles",
                location(),
                indices.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(Error::Malformed(format!(
                "{}: index {bad} exceeds vertex count {vertex_count}",
                location()
            )));
        }
        Ok(indices)
    }
}
