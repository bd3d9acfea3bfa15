//! Documents built through the public factories for integration tests.
//!
//! Everything here is also valid input for the `gltf` crate, which the
//! tests use as an independent reader.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use glam::Vec3;
use nether_gltf::*;

pub const POSITIONS: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
pub const NORMALS: [[f32; 3]; 3] = [[0.0, 0.0, 1.0]; 3];
pub const INDICES: [u16; 3] = [0, 1, 2];

/// Append a tightly packed buffer view plus accessor over `values`.
fn push_accessor<T: bytemuck::Pod>(
    doc: &mut Document,
    buffer: Handle,
    values: &[T],
    count: usize,
    component_type: ComponentType,
    element_type: ElementType,
    target: BufferViewTarget,
) -> Handle {
    let byte_offset = doc.buffer_write(buffer, values);
    let (view, v) = doc.create_buffer_view();
    v.buffer = buffer;
    v.byte_offset = byte_offset;
    v.byte_length = std::mem::size_of_val(values);
    v.target = Some(target);

    let (handle, accessor) = doc.create_accessor();
    accessor.buffer_view = Some(view);
    accessor.component_type = component_type;
    accessor.element_type = element_type;
    accessor.count = count;
    handle
}

/// One indexed triangle with a red material, under a translated node in a
/// named default scene. All bytes live in buffer 0 with no URI.
pub fn triangle_document() -> Document {
    let mut doc = Document::new();
    doc.asset_mut().copyright = "nether-gltf tests".into();
    let (buffer, _) = doc.create_buffer();

    let position = push_accessor(
        &mut doc,
        buffer,
        &POSITIONS,
        3,
        ComponentType::Float,
        ElementType::Vec3,
        BufferViewTarget::ArrayBuffer,
    );
    let accessor = doc.accessor_mut(position).unwrap();
    accessor.min = vec![0.0, 0.0, 0.0];
    accessor.max = vec![1.0, 1.0, 0.0];
    accessor.name = "positions".into();

    let indices = push_accessor(
        &mut doc,
        buffer,
        &INDICES,
        3,
        ComponentType::UnsignedShort,
        ElementType::Scalar,
        BufferViewTarget::ElementArrayBuffer,
    );

    let (material, m) = doc.create_material();
    m.name = "Red".into();
    m.pbr_metallic_roughness = Some(PbrMetallicRoughness {
        base_color_factor: [1.0, 0.0, 0.0, 1.0],
        metallic_factor: 0.0,
        ..Default::default()
    });

    let (mesh, m) = doc.create_mesh();
    m.name = "Triangle".into();
    let mut primitive = Primitive {
        indices: Some(indices),
        material: Some(material),
        ..Default::default()
    };
    primitive.attributes.insert("POSITION".into(), position);
    m.primitives.push(primitive);

    let (node, n) = doc.create_node();
    n.name = "TriangleNode".into();
    n.mesh = Some(mesh);
    n.translation = Vec3::new(0.0, 1.0, 0.0);

    let (scene, s) = doc.create_scene();
    s.name = "Main".into();
    s.nodes.push(node);
    doc.set_default_scene(Some(scene));
    doc
}

/// Positions and normals interleaved in one view with a 24 byte stride.
pub fn interleaved_document() -> Document {
    let mut doc = Document::new();
    let (buffer, _) = doc.create_buffer();

    let vertices: Vec<[f32; 3]> = POSITIONS
        .iter()
        .zip(NORMALS.iter())
        .flat_map(|(p, n)| [*p, *n])
        .collect();
    let byte_offset = doc.buffer_write(buffer, &vertices);
    let (view, v) = doc.create_buffer_view();
    v.buffer = buffer;
    v.byte_offset = byte_offset;
    v.byte_length = std::mem::size_of_val(vertices.as_slice());
    v.byte_stride = 24;
    v.target = Some(BufferViewTarget::ArrayBuffer);

    for (offset, name) in [(0, "positions"), (12, "normals")] {
        let (_, accessor) = doc.create_accessor();
        accessor.buffer_view = Some(view);
        accessor.byte_offset = offset;
        accessor.component_type = ComponentType::Float;
        accessor.element_type = ElementType::Vec3;
        accessor.count = 3;
        accessor.name = name.into();
    }
    doc
}

/// Minimal `.gltf` whose only scene is called `name`.
pub fn write_named_scene(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(format!("{name}.gltf"));
    let json = format!(r#"{{"asset":{{"version":"2.0"}},"scenes":[{{"name":"{name}"}}]}}"#);
    std::fs::write(&path, json).expect("Failed to write fixture");
    path
}

/// GLB header + JSON chunk header whose declared total length is `declared`,
/// truncated to `actual` bytes.
pub fn truncated_glb(declared: u32, actual: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(actual.max(20));
    bytes.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    bytes.extend_from_slice(&GLB_VERSION.to_le_bytes());
    bytes.extend_from_slice(&declared.to_le_bytes());
    bytes.extend_from_slice(&(declared - 20).to_le_bytes());
    bytes.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    bytes.resize(actual, b' ');
    bytes
}
