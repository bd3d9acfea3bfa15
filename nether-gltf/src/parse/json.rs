//! glTF JSON → [`Document`].
//!
//! Walks an untyped `serde_json::Value` instead of deriving `Deserialize`
//! so every failure can name the entity, its index and the offending field.

use std::path::PathBuf;

use glam::{Mat4, Quat, Vec3};
use serde_json::{Map, Value};
use tracing::debug;

use crate::document::{BufferSlot, Document};
use crate::error::{Error, Result};
use crate::types::*;

type Object = Map<String, Value>;

/// Read-only view of one JSON object that knows where it sits in the file.
struct Entity<'a> {
    map: &'a Object,
    location: String,
}

impl<'a> Entity<'a> {
    fn new(map: &'a Object, location: String) -> Self {
        Self { map, location }
    }

    fn missing(&self, field: &'static str) -> Error {
        Error::MissingField {
            location: self.location.clone(),
            field,
        }
    }

    fn invalid(&self, field: &'static str, reason: impl Into<String>) -> Error {
        Error::InvalidField {
            location: self.location.clone(),
            field,
            reason: reason.into(),
        }
    }

    fn get(&self, field: &str) -> Option<&'a Value> {
        self.map.get(field)
    }

    fn opt_u64(&self, field: &'static str) -> Result<Option<u64>> {
        match self.get(field) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.invalid(field, "must be a non-negative integer")),
        }
    }

    fn req_u64(&self, field: &'static str) -> Result<u64> {
        self.opt_u64(field)?.ok_or_else(|| self.missing(field))
    }

    fn opt_usize(&self, field: &'static str) -> Result<Option<usize>> {
        self.opt_u64(field)?
            .map(|v| usize::try_from(v).map_err(|_| self.invalid(field, "is too large")))
            .transpose()
    }

    fn req_usize(&self, field: &'static str) -> Result<usize> {
        self.opt_usize(field)?.ok_or_else(|| self.missing(field))
    }

    fn to_handle(&self, field: &'static str, value: u64) -> Result<Handle> {
        match Handle::try_from(value) {
            Ok(handle) if handle != INVALID_HANDLE => Ok(handle),
            _ => Err(self.invalid(field, format!("index {value} is out of handle range"))),
        }
    }

    fn opt_handle(&self, field: &'static str) -> Result<Option<Handle>> {
        self.opt_u64(field)?
            .map(|v| self.to_handle(field, v))
            .transpose()
    }

    fn req_handle(&self, field: &'static str) -> Result<Handle> {
        self.opt_handle(field)?.ok_or_else(|| self.missing(field))
    }

    fn handle_list(&self, field: &'static str) -> Result<Vec<Handle>> {
        let Some(value) = self.get(field) else {
            return Ok(Vec::new());
        };
        let items = value
            .as_array()
            .ok_or_else(|| self.invalid(field, "must be an array of indices"))?;
        items
            .iter()
            .map(|item| {
                let v = item
                    .as_u64()
                    .ok_or_else(|| self.invalid(field, "must be an array of indices"))?;
                self.to_handle(field, v)
            })
            .collect()
    }

    fn opt_bool(&self, field: &'static str) -> Result<Option<bool>> {
        match self.get(field) {
            None => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.invalid(field, "must be a boolean")),
        }
    }

    /// Integer or real, as glTF allows either for float fields.
    fn opt_f32(&self, field: &'static str) -> Result<Option<f32>> {
        match self.get(field) {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .map(|v| Some(v as f32))
                .ok_or_else(|| self.invalid(field, "must be a number")),
        }
    }

    fn f64_list(&self, field: &'static str) -> Result<Vec<f64>> {
        let Some(value) = self.get(field) else {
            return Ok(Vec::new());
        };
        let items = value
            .as_array()
            .ok_or_else(|| self.invalid(field, "must be an array of numbers"))?;
        items
            .iter()
            .map(|item| {
                item.as_f64()
                    .ok_or_else(|| self.invalid(field, "must be an array of numbers"))
            })
            .collect()
    }

    fn opt_f32_array<const N: usize>(&self, field: &'static str) -> Result<Option<[f32; N]>> {
        if self.get(field).is_none() {
            return Ok(None);
        }
        let values = self.f64_list(field)?;
        if values.len() != N {
            return Err(self.invalid(field, format!("must have {N} components")));
        }
        let mut out = [0.0f32; N];
        for (dst, src) in out.iter_mut().zip(values) {
            *dst = src as f32;
        }
        Ok(Some(out))
    }

    fn opt_str(&self, field: &'static str) -> Result<Option<&'a str>> {
        match self.get(field) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| self.invalid(field, "must be a string")),
        }
    }

    fn name(&self) -> Result<String> {
        Ok(self.opt_str("name")?.unwrap_or_default().to_string())
    }

    fn opt_object(&self, field: &'static str) -> Result<Option<Entity<'a>>> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(Entity::new(
                map,
                format!("{}.{}", self.location, field),
            ))),
            Some(_) => Err(self.invalid(field, "must be an object")),
        }
    }
}

/// Iterate the objects of an optional top-level array.
fn entities<'a>(root: &Entity<'a>, key: &'static str) -> Result<Vec<Entity<'a>>> {
    let Some(value) = root.get(key) else {
        return Ok(Vec::new());
    };
    let items = value
        .as_array()
        .ok_or_else(|| root.invalid(key, "must be an array"))?;

    let prefix = if root.location == "root" {
        key.to_string()
    } else {
        format!("{}.{key}", root.location)
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(Entity::new(map, format!("{prefix}[{i}]"))),
            _ => Err(root.invalid(key, format!("element {i} is not an object"))),
        })
        .collect()
}

/// Parse glTF JSON text into a document with no staged or decoded bytes.
pub(crate) fn parse_json(text: &[u8], base_dir: PathBuf) -> Result<Document> {
    let value: Value = serde_json::from_slice(text)?;
    let Value::Object(map) = &value else {
        return Err(Error::Malformed(
            "top-level JSON value is not an object".into(),
        ));
    };
    let root = Entity::new(map, "root".into());

    let asset = root.opt_object("asset")?.ok_or_else(|| root.missing("asset"))?;

    let mut doc = Document::with_base_dir(base_dir);
    doc.asset = parse_asset(&asset)?;

    doc.accessors = entities(&root, "accessors")?
        .iter()
        .map(parse_accessor)
        .collect::<Result<_>>()?;
    doc.buffers = entities(&root, "buffers")?
        .iter()
        .map(parse_buffer)
        .collect::<Result<_>>()?;
    doc.buffer_views = entities(&root, "bufferViews")?
        .iter()
        .map(parse_buffer_view)
        .collect::<Result<_>>()?;
    doc.meshes = entities(&root, "meshes")?
        .iter()
        .map(parse_mesh)
        .collect::<Result<_>>()?;
    doc.nodes = entities(&root, "nodes")?
        .iter()
        .map(parse_node)
        .collect::<Result<_>>()?;
    doc.textures = entities(&root, "textures")?
        .iter()
        .map(parse_texture)
        .collect::<Result<_>>()?;
    doc.samplers = entities(&root, "samplers")?
        .iter()
        .map(parse_sampler)
        .collect::<Result<_>>()?;
    doc.images = entities(&root, "images")?
        .iter()
        .map(parse_image)
        .collect::<Result<_>>()?;
    doc.scenes = entities(&root, "scenes")?
        .iter()
        .map(parse_scene)
        .collect::<Result<_>>()?;
    doc.materials = entities(&root, "materials")?
        .iter()
        .enumerate()
        .map(|(i, entity)| parse_material(i, entity))
        .collect::<Result<_>>()?;
    doc.default_scene = root.opt_handle("scene")?;

    doc.staged = vec![Vec::new(); doc.buffers.len()];
    doc.slots = doc.buffers.iter().map(|_| BufferSlot::default()).collect();

    debug!("Parsed glTF JSON: {}", doc.summary());
    Ok(doc)
}

fn parse_asset(entity: &Entity) -> Result<Asset> {
    let text = |field: &'static str| -> Result<String> {
        Ok(entity.opt_str(field)?.unwrap_or_default().to_string())
    };
    Ok(Asset {
        copyright: text("copyright")?,
        generator: text("generator")?,
        version: text("version")?,
        min_version: text("minVersion")?,
    })
}

fn parse_accessor(entity: &Entity) -> Result<Accessor> {
    let type_name = entity
        .opt_str("type")?
        .ok_or_else(|| entity.missing("type"))?;

    Ok(Accessor {
        buffer_view: entity.opt_handle("bufferView")?,
        byte_offset: entity.opt_usize("byteOffset")?.unwrap_or(0),
        component_type: ComponentType::from_code(entity.req_u64("componentType")?),
        element_type: ElementType::from_name(type_name),
        count: entity.req_usize("count")?,
        normalized: entity.opt_bool("normalized")?.unwrap_or(false),
        min: entity.f64_list("min")?,
        max: entity.f64_list("max")?,
        sparse: entity.get("sparse").is_some(),
        name: entity.name()?,
    })
}

fn parse_buffer(entity: &Entity) -> Result<Buffer> {
    Ok(Buffer {
        byte_length: entity.req_usize("byteLength")?,
        uri: entity
            .opt_str("uri")?
            .filter(|uri| !uri.is_empty())
            .map(str::to_string),
        name: entity.name()?,
    })
}

fn parse_buffer_view(entity: &Entity) -> Result<BufferView> {
    Ok(BufferView {
        buffer: entity.req_handle("buffer")?,
        byte_offset: entity.opt_usize("byteOffset")?.unwrap_or(0),
        byte_length: entity.req_usize("byteLength")?,
        byte_stride: entity.opt_usize("byteStride")?.unwrap_or(0),
        target: entity.opt_u64("target")?.map(BufferViewTarget::from_code),
        name: entity.name()?,
    })
}

fn parse_mesh(entity: &Entity) -> Result<Mesh> {
    if entity.get("primitives").is_none() {
        return Err(entity.missing("primitives"));
    }
    let primitives = entities(entity, "primitives")?;

    Ok(Mesh {
        primitives: primitives
            .iter()
            .map(parse_primitive)
            .collect::<Result<_>>()?,
        name: entity.name()?,
    })
}

fn parse_primitive(entity: &Entity) -> Result<Primitive> {
    let attributes = entity
        .opt_object("attributes")?
        .ok_or_else(|| entity.missing("attributes"))?;

    let mut map = std::collections::BTreeMap::new();
    for (semantic, value) in attributes.map {
        let index = value
            .as_u64()
            .ok_or_else(|| entity.invalid("attributes", format!("`{semantic}` is not an index")))?;
        map.insert(semantic.clone(), entity.to_handle("attributes", index)?);
    }

    Ok(Primitive {
        attributes: map,
        indices: entity.opt_handle("indices")?,
        material: entity.opt_handle("material")?,
        mode: entity
            .opt_u64("mode")?
            .map(RenderMode::from_code)
            .unwrap_or_default(),
    })
}

fn parse_node(entity: &Entity) -> Result<Node> {
    let mut node = Node {
        camera: entity.opt_handle("camera")?,
        mesh: entity.opt_handle("mesh")?,
        skin: entity.opt_handle("skin")?,
        children: entity.handle_list("children")?,
        name: entity.name()?,
        ..Default::default()
    };

    if let Some(m) = entity.opt_f32_array::<16>("matrix")? {
        node.matrix = Mat4::from_cols_array(&m);
    }
    if let Some(t) = entity.opt_f32_array::<3>("translation")? {
        node.translation = Vec3::from_array(t);
    }
    if let Some(r) = entity.opt_f32_array::<4>("rotation")? {
        node.rotation = Quat::from_array(r);
    }
    if let Some(s) = entity.opt_f32_array::<3>("scale")? {
        node.scale = Vec3::from_array(s);
    }
    Ok(node)
}

fn parse_scene(entity: &Entity) -> Result<Scene> {
    Ok(Scene {
        nodes: entity.handle_list("nodes")?,
        name: entity.name()?,
    })
}

fn parse_texture_info(entity: &Entity) -> Result<TextureInfo> {
    Ok(TextureInfo {
        index: entity.req_handle("index")?,
        tex_coord: tex_coord(entity)?,
    })
}

fn tex_coord(entity: &Entity) -> Result<u32> {
    let value = entity.opt_u64("texCoord")?.unwrap_or(0);
    u32::try_from(value).map_err(|_| entity.invalid("texCoord", "is too large"))
}

fn parse_material(index: usize, entity: &Entity) -> Result<Material> {
    let mut material = Material {
        name: match entity.opt_str("name")? {
            Some(name) => name.to_string(),
            None => format!("material{}", index + 1),
        },
        ..Default::default()
    };

    if let Some(pbr) = entity.opt_object("pbrMetallicRoughness")? {
        let defaults = PbrMetallicRoughness::default();
        material.pbr_metallic_roughness = Some(PbrMetallicRoughness {
            base_color_factor: pbr
                .opt_f32_array::<4>("baseColorFactor")?
                .unwrap_or(defaults.base_color_factor),
            base_color_texture: pbr
                .opt_object("baseColorTexture")?
                .map(|t| parse_texture_info(&t))
                .transpose()?,
            metallic_factor: pbr
                .opt_f32("metallicFactor")?
                .unwrap_or(defaults.metallic_factor),
            roughness_factor: pbr
                .opt_f32("roughnessFactor")?
                .unwrap_or(defaults.roughness_factor),
            metallic_roughness_texture: pbr
                .opt_object("metallicRoughnessTexture")?
                .map(|t| parse_texture_info(&t))
                .transpose()?,
        });
    }

    if let Some(normal) = entity.opt_object("normalTexture")? {
        material.normal_texture = Some(NormalTextureInfo {
            index: normal.req_handle("index")?,
            tex_coord: tex_coord(&normal)?,
            scale: normal.opt_f32("scale")?.unwrap_or(1.0),
        });
    }
    if let Some(occlusion) = entity.opt_object("occlusionTexture")? {
        material.occlusion_texture = Some(OcclusionTextureInfo {
            index: occlusion.req_handle("index")?,
            tex_coord: tex_coord(&occlusion)?,
            strength: occlusion.opt_f32("strength")?.unwrap_or(1.0),
        });
    }
    material.emissive_texture = entity
        .opt_object("emissiveTexture")?
        .map(|t| parse_texture_info(&t))
        .transpose()?;

    if let Some(factor) = entity.opt_f32_array::<3>("emissiveFactor")? {
        material.emissive_factor = factor;
    }
    if let Some(mode) = entity.opt_str("alphaMode")? {
        material.alpha_mode = AlphaMode::from_name(mode)
            .ok_or_else(|| entity.invalid("alphaMode", format!("`{mode}` is not a known mode")))?;
    }
    if let Some(cutoff) = entity.opt_f32("alphaCutoff")? {
        material.alpha_cutoff = cutoff;
    }
    material.double_sided = entity.opt_bool("doubleSided")?.unwrap_or(false);

    Ok(material)
}

fn parse_texture(entity: &Entity) -> Result<Texture> {
    Ok(Texture {
        sampler: entity.opt_handle("sampler")?,
        source: entity.opt_handle("source")?,
        name: entity.name()?,
    })
}

fn parse_sampler(entity: &Entity) -> Result<Sampler> {
    Ok(Sampler {
        mag_filter: entity.opt_u64("magFilter")?.map(TexFilter::from_code),
        min_filter: entity.opt_u64("minFilter")?.map(TexFilter::from_code),
        wrap_s: entity
            .opt_u64("wrapS")?
            .map(TexWrap::from_code)
            .unwrap_or_default(),
        wrap_t: entity
            .opt_u64("wrapT")?
            .map(TexWrap::from_code)
            .unwrap_or_default(),
        name: entity.name()?,
    })
}

fn parse_image(entity: &Entity) -> Result<Image> {
    Ok(Image {
        uri: entity
            .opt_str("uri")?
            .filter(|uri| !uri.is_empty())
            .map(str::to_string),
        mime_type: entity.opt_str("mimeType")?.map(str::to_string),
        buffer_view: entity.opt_handle("bufferView")?,
        name: entity.name()?,
    })
}
