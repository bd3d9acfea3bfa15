//! Wire structs for emitted glTF JSON.
//!
//! Field order here is the emitted key order. Every optional key is skipped
//! when it equals the glTF default, and empty top-level arrays are skipped.

use std::collections::BTreeMap;

use glam::{Mat4, Quat, Vec3};
use serde::Serialize;
use tracing::warn;

use super::{Prepared, WriteOptions};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::types::*;

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Root<'a> {
    asset: AssetJson<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    accessors: Vec<AccessorJson<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    buffers: Vec<BufferJson<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    buffer_views: Vec<BufferViewJson<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    nodes: Vec<NodeJson<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    meshes: Vec<MeshJson<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    materials: Vec<MaterialJson<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    scenes: Vec<SceneJson<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    textures: Vec<TextureJson<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<ImageJson<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    samplers: Vec<SamplerJson<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scene: Option<Handle>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssetJson<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    copyright: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generator: Option<&'a str>,
    version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_version: Option<&'a str>,
}

/// min/max are floats for FLOAT accessors and integers otherwise.
#[derive(Serialize)]
#[serde(untagged)]
enum Bound {
    Float(f64),
    Int(i64),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessorJson<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    buffer_view: Option<Handle>,
    #[serde(skip_serializing_if = "is_default")]
    byte_offset: usize,
    component_type: u32,
    #[serde(skip_serializing_if = "is_default")]
    normalized: bool,
    count: usize,
    #[serde(rename = "type")]
    element_type: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    max: Vec<Bound>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    min: Vec<Bound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BufferJson<'a> {
    byte_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BufferViewJson<'a> {
    buffer: Handle,
    #[serde(skip_serializing_if = "is_default")]
    byte_offset: usize,
    byte_length: usize,
    #[serde(skip_serializing_if = "is_default")]
    byte_stride: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeJson<'a> {
    #[serde(skip_serializing_if = "<[Handle]>::is_empty")]
    children: &'a [Handle],
    #[serde(skip_serializing_if = "Option::is_none")]
    matrix: Option<[f32; 16]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    translation: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rotation: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scale: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mesh: Option<Handle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrimitiveJson<'a> {
    attributes: &'a BTreeMap<String, Handle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    indices: Option<Handle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    material: Option<Handle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeshJson<'a> {
    primitives: Vec<PrimitiveJson<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TextureInfoJson {
    index: Handle,
    #[serde(skip_serializing_if = "is_default")]
    tex_coord: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NormalTextureJson {
    index: Handle,
    #[serde(skip_serializing_if = "is_default")]
    tex_coord: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    scale: Option<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OcclusionTextureJson {
    index: Handle,
    #[serde(skip_serializing_if = "is_default")]
    tex_coord: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    strength: Option<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PbrJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    base_color_factor: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_color_texture: Option<TextureInfoJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metallic_factor: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    roughness_factor: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metallic_roughness_texture: Option<TextureInfoJson>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MaterialJson<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pbr_metallic_roughness: Option<PbrJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    normal_texture: Option<NormalTextureJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    occlusion_texture: Option<OcclusionTextureJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    emissive_texture: Option<TextureInfoJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    emissive_factor: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alpha_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alpha_cutoff: Option<f32>,
    #[serde(skip_serializing_if = "is_default")]
    double_sided: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SceneJson<'a> {
    #[serde(skip_serializing_if = "<[Handle]>::is_empty")]
    nodes: &'a [Handle],
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TextureJson<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    sampler: Option<Handle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<Handle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageJson<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    buffer_view: Option<Handle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SamplerJson<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    mag_filter: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_filter: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wrap_s: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wrap_t: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

/// Builds wire structs under the name-export policy.
struct Emitter {
    export_names: bool,
}

impl Emitter {
    fn name<'a>(&self, name: &'a str) -> Option<&'a str> {
        (self.export_names && !name.is_empty()).then_some(name)
    }

    fn accessor<'a>(&self, i: usize, accessor: &'a Accessor) -> Result<AccessorJson<'a>> {
        let component_type = accessor
            .component_type
            .code()
            .ok_or_else(|| invalid_enum(format!("accessors[{i}]"), "componentType"))?;
        let element_type = accessor
            .element_type
            .name()
            .ok_or_else(|| invalid_enum(format!("accessors[{i}]"), "type"))?;

        let bound = |v: &f64| match accessor.component_type {
            ComponentType::Float => Bound::Float(f64::from(*v as f32)),
            _ => Bound::Int(*v as i64),
        };

        Ok(AccessorJson {
            buffer_view: accessor.buffer_view,
            byte_offset: accessor.byte_offset,
            component_type,
            normalized: accessor.normalized,
            count: accessor.count,
            element_type,
            max: accessor.max.iter().map(bound).collect(),
            min: accessor.min.iter().map(bound).collect(),
            name: self.name(&accessor.name),
        })
    }

    fn buffer_view<'a>(&self, i: usize, view: &'a BufferView) -> Result<BufferViewJson<'a>> {
        let target = view
            .target
            .map(|t| {
                t.code()
                    .ok_or_else(|| invalid_enum(format!("bufferViews[{i}]"), "target"))
            })
            .transpose()?;
        Ok(BufferViewJson {
            buffer: view.buffer,
            byte_offset: view.byte_offset,
            byte_length: view.byte_length,
            byte_stride: view.byte_stride,
            target,
            name: self.name(&view.name),
        })
    }

    fn node<'a>(&self, i: usize, node: &'a Node) -> NodeJson<'a> {
        if node.camera.is_some() || node.skin.is_some() {
            warn!("nodes[{i}]: dropping camera/skin reference, those arrays are not written");
        }

        let matrix = (node.matrix != Mat4::IDENTITY).then(|| node.matrix.to_cols_array());
        let trs = matrix.is_none();
        NodeJson {
            children: &node.children,
            matrix,
            translation: (trs && node.translation != Vec3::ZERO)
                .then(|| node.translation.to_array()),
            rotation: (trs && node.rotation != Quat::IDENTITY).then(|| node.rotation.to_array()),
            scale: (trs && node.scale != Vec3::ONE).then(|| node.scale.to_array()),
            mesh: node.mesh,
            name: self.name(&node.name),
        }
    }

    fn mesh<'a>(&self, i: usize, mesh: &'a Mesh) -> Result<MeshJson<'a>> {
        let primitives = mesh
            .primitives
            .iter()
            .enumerate()
            .map(|(p, prim)| {
                let mode = prim.mode.code().ok_or_else(|| {
                    invalid_enum(format!("meshes[{i}].primitives[{p}]"), "mode")
                })?;
                Ok(PrimitiveJson {
                    attributes: &prim.attributes,
                    indices: prim.indices,
                    material: prim.material,
                    mode: (prim.mode != RenderMode::Triangles).then_some(mode),
                })
            })
            .collect::<Result<_>>()?;
        Ok(MeshJson {
            primitives,
            name: self.name(&mesh.name),
        })
    }

    fn material<'a>(&self, material: &'a Material) -> MaterialJson<'a> {
        let info = |t: TextureInfo| TextureInfoJson {
            index: t.index,
            tex_coord: t.tex_coord,
        };
        let pbr = material.pbr_metallic_roughness.as_ref().map(|pbr| PbrJson {
            base_color_factor: (pbr.base_color_factor != [1.0; 4]).then_some(pbr.base_color_factor),
            base_color_texture: pbr.base_color_texture.map(info),
            metallic_factor: (pbr.metallic_factor != 1.0).then_some(pbr.metallic_factor),
            roughness_factor: (pbr.roughness_factor != 1.0).then_some(pbr.roughness_factor),
            metallic_roughness_texture: pbr.metallic_roughness_texture.map(info),
        });

        MaterialJson {
            name: self.name(&material.name),
            pbr_metallic_roughness: pbr,
            normal_texture: material.normal_texture.map(|t| NormalTextureJson {
                index: t.index,
                tex_coord: t.tex_coord,
                scale: (t.scale != 1.0).then_some(t.scale),
            }),
            occlusion_texture: material.occlusion_texture.map(|t| OcclusionTextureJson {
                index: t.index,
                tex_coord: t.tex_coord,
                strength: (t.strength != 1.0).then_some(t.strength),
            }),
            emissive_texture: material.emissive_texture.map(info),
            emissive_factor: (material.emissive_factor != [0.0; 3])
                .then_some(material.emissive_factor),
            alpha_mode: (material.alpha_mode != AlphaMode::Opaque)
                .then(|| material.alpha_mode.name()),
            alpha_cutoff: (material.alpha_mode == AlphaMode::Mask)
                .then_some(material.alpha_cutoff),
            double_sided: material.double_sided,
        }
    }

    fn sampler<'a>(&self, i: usize, sampler: &'a Sampler) -> Result<SamplerJson<'a>> {
        let at = || format!("samplers[{i}]");
        let filter = |f: Option<TexFilter>, field| {
            f.map(|f| f.code().ok_or_else(|| invalid_enum(at(), field)))
                .transpose()
        };
        let wrap = |w: TexWrap, field| match w {
            TexWrap::Repeat => Ok(None),
            other => other.code().map(Some).ok_or_else(|| invalid_enum(at(), field)),
        };
        Ok(SamplerJson {
            mag_filter: filter(sampler.mag_filter, "magFilter")?,
            min_filter: filter(sampler.min_filter, "minFilter")?,
            wrap_s: wrap(sampler.wrap_s, "wrapS")?,
            wrap_t: wrap(sampler.wrap_t, "wrapT")?,
            name: self.name(&sampler.name),
        })
    }
}

fn invalid_enum(location: String, field: &str) -> Error {
    Error::Invariant(format!("{location}: `{field}` holds a value outside the glTF allow-list"))
}

/// Render the document's JSON using the prepared buffer, view and image tables.
pub(crate) fn to_json(
    doc: &Document,
    prepared: &Prepared,
    options: &WriteOptions,
    pretty: bool,
) -> Result<Vec<u8>> {
    let e = Emitter {
        export_names: options.export_names,
    };

    let asset = &doc.asset;
    let generator = options
        .generator
        .as_deref()
        .or(non_empty(&asset.generator));
    let version = if asset.version.is_empty() {
        "2.0"
    } else {
        asset.version.as_str()
    };

    let root = Root {
        asset: AssetJson {
            copyright: non_empty(&asset.copyright),
            generator,
            version,
            min_version: non_empty(&asset.min_version),
        },
        accessors: doc
            .accessors
            .iter()
            .enumerate()
            .map(|(i, a)| e.accessor(i, a))
            .collect::<Result<_>>()?,
        buffers: prepared
            .buffers
            .iter()
            .map(|b| BufferJson {
                byte_length: b.byte_length,
                uri: b.uri.as_deref(),
                name: e.name(&b.name),
            })
            .collect(),
        buffer_views: prepared
            .buffer_views
            .iter()
            .enumerate()
            .map(|(i, v)| e.buffer_view(i, v))
            .collect::<Result<_>>()?,
        nodes: doc
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| e.node(i, n))
            .collect(),
        meshes: doc
            .meshes
            .iter()
            .enumerate()
            .map(|(i, m)| e.mesh(i, m))
            .collect::<Result<_>>()?,
        materials: doc.materials.iter().map(|m| e.material(m)).collect(),
        scenes: doc
            .scenes
            .iter()
            .map(|s| SceneJson {
                nodes: &s.nodes,
                name: e.name(&s.name),
            })
            .collect(),
        textures: doc
            .textures
            .iter()
            .map(|t| TextureJson {
                sampler: t.sampler,
                source: t.source,
                name: e.name(&t.name),
            })
            .collect(),
        images: prepared
            .images
            .iter()
            .map(|img| ImageJson {
                uri: img.uri.as_deref(),
                mime_type: img.mime_type.as_deref().and_then(non_empty),
                buffer_view: img.buffer_view,
                name: e.name(&img.name),
            })
            .collect(),
        samplers: doc
            .samplers
            .iter()
            .enumerate()
            .map(|(i, s)| e.sampler(i, s))
            .collect::<Result<_>>()?,
        scene: doc.default_scene,
    };

    let bytes = if pretty {
        serde_json::to_vec_pretty(&root)?
    } else {
        serde_json::to_vec(&root)?
    };
    Ok(bytes)
}
