//! Write → read round trips through both container forms.
//!
//! The `gltf` crate reads every file we write as an independent check.

mod fixtures;

use byteorder::{ByteOrder, LittleEndian};
use glam::Vec3;
use tempfile::tempdir;

use nether_gltf::{
    AlphaMode, CHUNK_BIN, CHUNK_JSON, ComponentType, Document, ElementType, ErrorKind, GLB_MAGIC,
    RenderMode, WriteOptions,
};

#[test]
fn test_glb_roundtrip_preserves_document() {
    let original = fixtures::triangle_document();
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("triangle.glb");
    original.serialize(&path, true).expect("Failed to write GLB");

    let doc = Document::open(&path).expect("Failed to read GLB back");
    assert_eq!(doc.accessors(), original.accessors());
    assert_eq!(doc.buffer_views(), original.buffer_views());
    assert_eq!(doc.meshes(), original.meshes());
    assert_eq!(doc.nodes(), original.nodes());
    assert_eq!(doc.scenes(), original.scenes());
    assert_eq!(doc.materials(), original.materials());
    assert_eq!(doc.default_scene(), Some(0));
    assert_eq!(doc.asset().copyright, "nether-gltf tests");
    assert_eq!(doc.buffers()[0].byte_length, original.staged_bytes(0).len());

    let positions = doc.resolve_accessor(0).expect("Failed to resolve positions");
    for (i, expected) in fixtures::POSITIONS.iter().enumerate() {
        assert_eq!(positions.get_array::<3>(i), Some(*expected));
    }
    assert_eq!(doc.triangle_indices(0, 0).unwrap(), vec![0, 1, 2]);
    assert_eq!(doc.decode_count(), 0, "GLB buffer 0 must not be decoded");
}

#[test]
fn test_glb_chunks_aligned_and_readable_by_gltf_crate() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("triangle.glb");
    fixtures::triangle_document()
        .serialize(&path, true)
        .expect("Failed to write GLB");

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(LittleEndian::read_u32(&bytes[0..4]), GLB_MAGIC);
    assert_eq!(LittleEndian::read_u32(&bytes[8..12]) as usize, bytes.len());
    assert_eq!(bytes.len() % 4, 0);

    let json_len = LittleEndian::read_u32(&bytes[12..16]) as usize;
    assert_eq!(LittleEndian::read_u32(&bytes[16..20]), CHUNK_JSON);
    assert_eq!(json_len % 4, 0);
    let bin_header = 20 + json_len;
    let bin_len = LittleEndian::read_u32(&bytes[bin_header..bin_header + 4]) as usize;
    assert_eq!(
        LittleEndian::read_u32(&bytes[bin_header + 4..bin_header + 8]),
        CHUNK_BIN
    );
    assert_eq!(bin_len % 4, 0);
    assert_eq!(bin_header + 8 + bin_len, bytes.len());

    let (document, buffers, _) = gltf::import(&path).expect("gltf crate rejected our GLB");
    assert_eq!(document.meshes().count(), 1);
    let primitive = document.meshes().next().unwrap().primitives().next().unwrap();
    let reader = primitive.reader(|b| Some(&buffers[b.index()]));
    let positions: Vec<[f32; 3]> = reader.read_positions().unwrap().collect();
    assert_eq!(positions, fixtures::POSITIONS.to_vec());
    let indices: Vec<u32> = reader.read_indices().unwrap().into_u32().collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[test]
fn test_gltf_roundtrip_with_external_buffer() {
    let mut original = fixtures::triangle_document();
    original.buffer_mut(0).unwrap().uri = Some("triangle.bin".into());

    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("out").join("triangle.gltf");
    original.serialize(&path, false).expect("Failed to write glTF");

    let bin = std::fs::read(dir.path().join("out").join("triangle.bin")).unwrap();
    assert_eq!(bin, original.staged_bytes(0));

    let doc = Document::open(&path).expect("Failed to read glTF back");
    assert_eq!(doc.meshes(), original.meshes());
    assert_eq!(doc.triangle_indices(0, 0).unwrap(), vec![0, 1, 2]);
    assert_eq!(doc.decode_count(), 1);

    let (document, _, _) = gltf::import(&path).expect("gltf crate rejected our glTF");
    assert_eq!(document.scenes().next().unwrap().name(), Some("Main"));
}

#[test]
fn test_gltf_embeds_staged_buffer_as_base64() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("embedded.gltf");
    fixtures::triangle_document()
        .serialize(&path, false)
        .expect("Failed to write glTF");

    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let uri = json["buffers"][0]["uri"].as_str().unwrap();
    assert!(uri.starts_with("data:application/octet-stream;base64,"));

    let doc = Document::open(&path).unwrap();
    let positions = doc.resolve_accessor(0).unwrap();
    assert_eq!(positions.get_array::<3>(1), Some([1.0, 0.0, 0.0]));
}

#[test]
fn test_parsed_glb_rewritten_as_gltf() {
    let dir = tempdir().expect("Failed to create temp dir");
    let glb = dir.path().join("a.glb");
    fixtures::triangle_document().serialize(&glb, true).unwrap();

    let mut doc = Document::open(&glb).unwrap();
    doc.stage_resolved_buffers().unwrap();
    doc.buffer_mut(0).unwrap().uri = Some("a.bin".into());
    let gltf_path = dir.path().join("a.gltf");
    doc.serialize(&gltf_path, false).unwrap();

    let reread = Document::open(&gltf_path).unwrap();
    assert_eq!(reread.triangle_indices(0, 0).unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_default_values_not_written() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("defaults.gltf");
    fixtures::triangle_document()
        .serialize(&path, false)
        .unwrap();

    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    for accessor in json["accessors"].as_array().unwrap() {
        let accessor = accessor.as_object().unwrap();
        assert!(!accessor.contains_key("byteOffset"));
        assert!(!accessor.contains_key("normalized"));
    }
    assert!(json["bufferViews"][0].get("byteOffset").is_none());
    assert!(json["bufferViews"][0].get("byteStride").is_none());
    assert!(json["meshes"][0]["primitives"][0].get("mode").is_none());
    assert!(json["nodes"][0].get("matrix").is_none());
    assert!(json.get("textures").is_none());
}

#[test]
fn test_names_policy_and_generator() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("anon.gltf");
    let options = WriteOptions {
        export_names: false,
        generator: Some("custom".into()),
        ..Default::default()
    };
    fixtures::triangle_document()
        .serialize_with(&path, false, &options)
        .unwrap();

    let doc = Document::open(&path).unwrap();
    assert_eq!(doc.asset().generator, "custom");
    assert!(doc.nodes()[0].name.is_empty());
    // unnamed materials get a synthesized name on read
    assert_eq!(doc.materials()[0].name, "material1");
    assert_eq!(doc.scene_names(), vec!["scene1"]);
}

#[test]
fn test_render_mode_and_material_fields_roundtrip() {
    let mut original = fixtures::triangle_document();
    original.mesh_mut(0).unwrap().primitives[0].mode = RenderMode::TriangleStrip;
    let material = original.material_mut(0).unwrap();
    material.alpha_mode = AlphaMode::Mask;
    material.alpha_cutoff = 0.25;
    material.emissive_factor = [0.5, 0.5, 0.0];
    let node = original.node_mut(0).unwrap();
    node.scale = Vec3::splat(2.0);

    let dir = tempdir().unwrap();
    let path = dir.path().join("fields.glb");
    original.serialize(&path, true).unwrap();

    let doc = Document::open(&path).unwrap();
    assert_eq!(doc.meshes()[0].primitives[0].mode, RenderMode::TriangleStrip);
    assert_eq!(doc.materials(), original.materials());
    assert_eq!(doc.nodes()[0].scale, Vec3::splat(2.0));
}

#[test]
fn test_interleaved_stride_roundtrip() {
    let original = fixtures::interleaved_document();
    let dir = tempdir().unwrap();
    let path = dir.path().join("interleaved.glb");
    original.serialize(&path, true).unwrap();

    let doc = Document::open(&path).unwrap();
    assert_eq!(doc.buffer_views()[0].byte_stride, 24);
    let normals = doc.resolve_accessor(1).unwrap();
    assert_eq!(normals.stride(), 24);
    assert_eq!(normals.component_type(), ComponentType::Float);
    assert_eq!(normals.element_type(), ElementType::Vec3);
    for (i, expected) in fixtures::NORMALS.iter().enumerate() {
        assert_eq!(normals.get_array::<3>(i), Some(*expected));
    }
}

#[test]
fn test_unstaged_external_buffer_survives_glb_write() {
    let dir = tempdir().unwrap();
    let aux: Vec<u8> = [1.5f32, -2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(dir.path().join("aux.bin"), &aux).unwrap();
    let input = dir.path().join("scene.gltf");
    std::fs::write(
        &input,
        r#"{
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": 0}, {"byteLength": 8, "uri": "aux.bin"}],
            "bufferViews": [{"buffer": 1, "byteLength": 8}],
            "accessors": [{"bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR"}]
        }"#,
    )
    .unwrap();

    // written into the input's own directory, without staging first
    let doc = Document::open(&input).unwrap();
    let output = dir.path().join("out.glb");
    doc.serialize(&output, true).expect("Failed to write GLB");

    assert_eq!(std::fs::read(dir.path().join("aux.bin")).unwrap(), aux);
    let reread = Document::open(&output).unwrap();
    assert_eq!(reread.buffers()[1].byte_length, 8);
    let values = reread.resolve_accessor(0).unwrap();
    assert_eq!(values.get_f32(1).unwrap().as_slice(), &[-2.0]);
}

#[test]
fn test_view_longer_than_staged_bytes_writes_nothing() {
    let mut doc = fixtures::triangle_document();
    doc.buffer_view_mut(1).unwrap().byte_length = 100;

    let dir = tempdir().unwrap();
    for (name, as_glb) in [("bad.glb", true), ("bad.gltf", false)] {
        let path = dir.path().join(name);
        let err = doc.serialize(&path, as_glb).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
        assert!(!path.exists(), "{name} must not be created");
    }
}
