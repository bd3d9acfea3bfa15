//! Cross-reference checks.
//!
//! Documents may hold dangling handles while an exporter is still building
//! them. A document is only accepted as loaded, or written out, once every
//! handle points inside its target array.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::types::{Handle, Material};

struct Checker<'a> {
    doc: &'a Document,
}

impl Checker<'_> {
    fn check(
        &self,
        location: impl FnOnce() -> String,
        field: &'static str,
        target: &'static str,
        handle: Handle,
        len: usize,
    ) -> Result<()> {
        if (handle as usize) < len {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                location: location(),
                field,
                target,
                handle,
                len,
            })
        }
    }

    fn accessor(
        &self,
        location: impl FnOnce() -> String,
        field: &'static str,
        h: Handle,
    ) -> Result<()> {
        self.check(location, field, "accessor", h, self.doc.accessors.len())
    }

    fn buffer_view(
        &self,
        location: impl FnOnce() -> String,
        field: &'static str,
        h: Handle,
    ) -> Result<()> {
        self.check(location, field, "bufferView", h, self.doc.buffer_views.len())
    }

    fn node(
        &self,
        location: impl FnOnce() -> String,
        field: &'static str,
        h: Handle,
    ) -> Result<()> {
        self.check(location, field, "node", h, self.doc.nodes.len())
    }

    fn texture(
        &self,
        location: impl FnOnce() -> String,
        field: &'static str,
        h: Handle,
    ) -> Result<()> {
        self.check(location, field, "texture", h, self.doc.textures.len())
    }

    fn material_textures(&self, i: usize, material: &Material) -> Result<()> {
        let at = || format!("materials[{i}]");
        if let Some(pbr) = &material.pbr_metallic_roughness {
            if let Some(info) = pbr.base_color_texture {
                self.texture(at, "baseColorTexture", info.index)?;
            }
            if let Some(info) = pbr.metallic_roughness_texture {
                self.texture(at, "metallicRoughnessTexture", info.index)?;
            }
        }
        if let Some(info) = material.normal_texture {
            self.texture(at, "normalTexture", info.index)?;
        }
        if let Some(info) = material.occlusion_texture {
            self.texture(at, "occlusionTexture", info.index)?;
        }
        if let Some(info) = material.emissive_texture {
            self.texture(at, "emissiveTexture", info.index)?;
        }
        Ok(())
    }
}

/// Fail with [`Error::OutOfRange`] on the first handle that has no target.
///
/// Node `camera` and `skin` are not checked; those arrays are not modeled.
pub(crate) fn check_references(doc: &Document) -> Result<()> {
    let c = Checker { doc };

    for (i, accessor) in doc.accessors.iter().enumerate() {
        if let Some(view) = accessor.buffer_view {
            c.buffer_view(|| format!("accessors[{i}]"), "bufferView", view)?;
        }
    }

    for (i, view) in doc.buffer_views.iter().enumerate() {
        c.check(
            || format!("bufferViews[{i}]"),
            "buffer",
            "buffer",
            view.buffer,
            doc.buffers.len(),
        )?;
    }

    for (m, mesh) in doc.meshes.iter().enumerate() {
        for (p, primitive) in mesh.primitives.iter().enumerate() {
            let at = || format!("meshes[{m}].primitives[{p}]");
            for &accessor in primitive.attributes.values() {
                c.accessor(at, "attributes", accessor)?;
            }
            if let Some(indices) = primitive.indices {
                c.accessor(at, "indices", indices)?;
            }
            if let Some(material) = primitive.material {
                c.check(at, "material", "material", material, doc.materials.len())?;
            }
        }
    }

    for (i, node) in doc.nodes.iter().enumerate() {
        let at = || format!("nodes[{i}]");
        if let Some(mesh) = node.mesh {
            c.check(at, "mesh", "mesh", mesh, doc.meshes.len())?;
        }
        for &child in &node.children {
            c.node(at, "children", child)?;
        }
    }

    for (i, scene) in doc.scenes.iter().enumerate() {
        for &node in &scene.nodes {
            c.node(|| format!("scenes[{i}]"), "nodes", node)?;
        }
    }
    if let Some(scene) = doc.default_scene {
        c.check(|| "root".to_string(), "scene", "scene", scene, doc.scenes.len())?;
    }

    for (i, material) in doc.materials.iter().enumerate() {
        c.material_textures(i, material)?;
    }

    for (i, texture) in doc.textures.iter().enumerate() {
        let at = || format!("textures[{i}]");
        if let Some(sampler) = texture.sampler {
            c.check(at, "sampler", "sampler", sampler, doc.samplers.len())?;
        }
        if let Some(source) = texture.source {
            c.check(at, "source", "image", source, doc.images.len())?;
        }
    }

    for (i, image) in doc.images.iter().enumerate() {
        if let Some(view) = image.buffer_view {
            c.buffer_view(|| format!("images[{i}]"), "bufferView", view)?;
        }
    }

    Ok(())
}
