// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! glTF 2.0 decoder, for both `.gltf` JSON and `.glb` containers.

use super::Decoder;
use crate::error::LoadError;
use ahash::AHashMap;
use base64::Engine;
use stagehand_core::asset::Asset;
use stagehand_core::math::{LinearRgba, Vec3};
use stagehand_core::resource::{GpuHandle, RenderDevice};
use stagehand_core::scene::{
    Geometry, GeometryShape, Material, MaterialKind, MaterialParams, MeshData, SceneNode,
    Texture, TextureData, TextureMapping, TextureSlot, Transform,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolves resources a glTF file references by URI.
pub trait ResourceResolver: Send + Sync {
    /// Returns the bytes of `uri`, referenced from the asset at `base`.
    fn resolve(&self, base: &str, uri: &str) -> Result<Vec<u8>, LoadError>;
}

/// Resolves URIs on the local filesystem, relative to the referencing asset.
pub struct FileSystemResolver {
    root: PathBuf,
}

impl FileSystemResolver {
    /// Resolves against `root`, the same root the asset paths are relative to.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ResourceResolver for FileSystemResolver {
    fn resolve(&self, base: &str, uri: &str) -> Result<Vec<u8>, LoadError> {
        let base = Path::new(base.trim_start_matches('/'));
        let dir = base.parent().unwrap_or_else(|| Path::new(""));
        let full = self.root.join(dir).join(uri);
        std::fs::read(&full).map_err(|e| LoadError::Source {
            path: uri.to_string(),
            reason: format!("{}: {}", full.display(), e),
        })
    }
}

/// Decodes glTF into a node hierarchy.
///
/// The default scene (or the first one) becomes the root's children.
/// Geometries are shared per mesh primitive, materials and textures per
/// index, so a decoded model keeps the sharing of the source file.
pub struct GltfDecoder {
    resolver: Arc<dyn ResourceResolver>,
}

impl GltfDecoder {
    /// Creates a decoder resolving external URIs through `resolver`.
    pub fn new(resolver: Arc<dyn ResourceResolver>) -> Self {
        Self { resolver }
    }
}

impl Decoder for GltfDecoder {
    fn decode(
        &self,
        path: &str,
        bytes: &[u8],
        device: &dyn RenderDevice,
    ) -> Result<Asset, LoadError> {
        let gltf = ::gltf::Gltf::from_slice(bytes)
            .map_err(|e| LoadError::decode(path, format!("invalid glTF: {e}")))?;
        let buffers = load_buffers(path, &gltf, &*self.resolver)?;

        let mut builder = ModelBuilder {
            path,
            device,
            resolver: &*self.resolver,
            buffers: &buffers,
            geometries: AHashMap::new(),
            materials: AHashMap::new(),
            textures: AHashMap::new(),
            allocated: Vec::new(),
        };
        match builder.build(&gltf.document) {
            Ok(root) => {
                log::debug!(
                    "Decoded glTF '{}': {} nodes, {} materials",
                    path,
                    root.node_count(),
                    builder.materials.len()
                );
                Ok(Asset::Model(root))
            }
            Err(err) => {
                for handle in builder.allocated {
                    device.release(handle);
                }
                Err(err)
            }
        }
    }
}

fn load_buffers(
    path: &str,
    gltf: &::gltf::Gltf,
    resolver: &dyn ResourceResolver,
) -> Result<Vec<Vec<u8>>, LoadError> {
    let mut data = Vec::new();
    for buffer in gltf.buffers() {
        let bytes = match buffer.source() {
            ::gltf::buffer::Source::Bin => gltf
                .blob
                .as_deref()
                .map(<[u8]>::to_vec)
                .ok_or_else(|| LoadError::decode(path, "GLB binary chunk is missing"))?,
            ::gltf::buffer::Source::Uri(uri) => match decode_data_uri(uri) {
                Some(decoded) => decoded.map_err(|e| LoadError::decode(path, e))?,
                None => resolver.resolve(path, uri)?,
            },
        };
        if bytes.len() < buffer.length() {
            return Err(LoadError::decode(
                path,
                format!(
                    "buffer {} holds {} bytes, {} declared",
                    buffer.index(),
                    bytes.len(),
                    buffer.length()
                ),
            ));
        }
        data.push(bytes);
    }
    Ok(data)
}

/// Decodes `data:<mime>;base64,<payload>`. Returns `None` for other URIs.
fn decode_data_uri(uri: &str) -> Option<Result<Vec<u8>, String>> {
    let rest = uri.strip_prefix("data:")?;
    let payload = match rest.split_once(";base64,") {
        Some((_, payload)) => payload,
        None => return Some(Err("only base64 data URIs are supported".to_string())),
    };
    Some(
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| format!("invalid base64 payload: {e}")),
    )
}

struct ModelBuilder<'a> {
    path: &'a str,
    device: &'a dyn RenderDevice,
    resolver: &'a dyn ResourceResolver,
    buffers: &'a [Vec<u8>],
    geometries: AHashMap<(usize, usize), Arc<Geometry>>,
    materials: AHashMap<Option<usize>, Arc<Material>>,
    textures: AHashMap<usize, Arc<Texture>>,
    allocated: Vec<GpuHandle>,
}

impl ModelBuilder<'_> {
    fn build(&mut self, document: &::gltf::Document) -> Result<SceneNode, LoadError> {
        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| LoadError::decode(self.path, "file contains no scene"))?;
        let mut root = SceneNode::new(scene.name().unwrap_or(self.path));
        for node in scene.nodes() {
            let child = self.node(&node)?;
            root.add_child(child);
        }
        Ok(root)
    }

    fn node(&mut self, node: &::gltf::Node<'_>) -> Result<SceneNode, LoadError> {
        let name = node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node_{}", node.index()));
        let mut out = SceneNode::new(name);
        let (translation, rotation, scale) = node.transform().decomposed();
        out.transform = Transform {
            position: Vec3::from_array(translation),
            rotation: quat_to_euler_xyz(rotation),
            scale: Vec3::from_array(scale),
        };

        if let Some(mesh) = node.mesh() {
            let primitives: Vec<_> = mesh.primitives().collect();
            for primitive in &primitives {
                let geometry = self.geometry(&mesh, primitive)?;
                let material = self.material(&primitive.material())?;
                if primitives.len() == 1 {
                    out.mesh = Some(stagehand_core::scene::Mesh { geometry, material });
                } else {
                    let label = format!(
                        "{}_{}",
                        mesh.name().unwrap_or("primitive"),
                        primitive.index()
                    );
                    out.add_child(SceneNode::with_mesh(label, geometry, material));
                }
            }
        }

        for child in node.children() {
            let child = self.node(&child)?;
            out.add_child(child);
        }
        Ok(out)
    }

    fn geometry(
        &mut self,
        mesh: &::gltf::Mesh<'_>,
        primitive: &::gltf::Primitive<'_>,
    ) -> Result<Arc<Geometry>, LoadError> {
        let key = (mesh.index(), primitive.index());
        if let Some(geometry) = self.geometries.get(&key) {
            return Ok(Arc::clone(geometry));
        }

        let buffers = self.buffers;
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
        let positions = reader
            .read_positions()
            .map(|iter| iter.map(Vec3::from_array).collect::<Vec<_>>())
            .ok_or_else(|| {
                LoadError::decode(
                    self.path,
                    format!("mesh {} has a primitive without positions", mesh.index()),
                )
            })?;
        let data = MeshData {
            positions,
            normals: reader
                .read_normals()
                .map(|iter| iter.map(Vec3::from_array).collect()),
            uvs: reader
                .read_tex_coords(0)
                .map(|iter| iter.into_f32().collect()),
            indices: reader.read_indices().map(|iter| iter.into_u32().collect()),
        };

        let label = mesh.name().unwrap_or(self.path).to_string();
        let geometry = Arc::new(Geometry::new(
            self.device,
            &label,
            GeometryShape::Mesh(Arc::new(data)),
        ));
        self.allocated.push(geometry.handle());
        self.geometries.insert(key, Arc::clone(&geometry));
        Ok(geometry)
    }

    fn material(&mut self, material: &::gltf::Material<'_>) -> Result<Arc<Material>, LoadError> {
        let key = material.index();
        if let Some(existing) = self.materials.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let pbr = material.pbr_metallic_roughness();
        let [r, g, b, a] = pbr.base_color_factor();
        let [er, eg, eb] = material.emissive_factor();
        let params = MaterialParams {
            kind: MaterialKind::Standard {
                roughness: pbr.roughness_factor(),
                metalness: pbr.metallic_factor(),
            },
            color: LinearRgba::new(r, g, b, a),
            opacity: a,
            transparent: matches!(material.alpha_mode(), ::gltf::material::AlphaMode::Blend),
            emissive: LinearRgba::rgb(er, eg, eb),
            double_sided: material.double_sided(),
        };

        let mut slots = Vec::new();
        if let Some(info) = pbr.base_color_texture() {
            slots.push((TextureSlot::BaseColor, info.texture()));
        }
        if let Some(info) = pbr.metallic_roughness_texture() {
            slots.push((TextureSlot::MetallicRoughness, info.texture()));
        }
        if let Some(info) = material.normal_texture() {
            slots.push((TextureSlot::Normal, info.texture()));
        }
        if let Some(info) = material.emissive_texture() {
            slots.push((TextureSlot::Emissive, info.texture()));
        }
        if let Some(info) = material.occlusion_texture() {
            slots.push((TextureSlot::Occlusion, info.texture()));
        }

        let label = material.name().unwrap_or(self.path).to_string();
        let mut out = Material::new(self.device, &label, params);
        self.allocated.push(out.handle());
        for (slot, texture) in slots {
            let texture = self.texture(&texture)?;
            out = out.with_texture(slot, texture);
        }

        let out = Arc::new(out);
        self.materials.insert(key, Arc::clone(&out));
        Ok(out)
    }

    fn texture(&mut self, texture: &::gltf::Texture<'_>) -> Result<Arc<Texture>, LoadError> {
        let key = texture.index();
        if let Some(existing) = self.textures.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let bytes = match texture.source().source() {
            ::gltf::image::Source::View { view, .. } => {
                let buffer = self.buffers.get(view.buffer().index()).ok_or_else(|| {
                    LoadError::decode(self.path, "image view references a missing buffer")
                })?;
                buffer
                    .get(view.offset()..view.offset() + view.length())
                    .ok_or_else(|| LoadError::decode(self.path, "image view out of bounds"))?
                    .to_vec()
            }
            ::gltf::image::Source::Uri { uri, .. } => match decode_data_uri(uri) {
                Some(decoded) => decoded.map_err(|e| LoadError::decode(self.path, e))?,
                None => self.resolver.resolve(self.path, uri)?,
            },
        };
        let image = ::image::load_from_memory(&bytes)
            .map_err(|e| LoadError::decode(self.path, format!("texture {key}: {e}")))?
            .to_rgba8();
        let (width, height) = image.dimensions();

        let label = texture
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}#texture{}", self.path, key));
        let out = Arc::new(Texture::new(
            self.device,
            &label,
            Arc::new(TextureData::rgba8(width, height, image.into_raw())),
            TextureMapping::Uv,
        ));
        self.allocated.push(out.handle());
        self.textures.insert(key, Arc::clone(&out));
        Ok(out)
    }
}

/// Converts a unit quaternion `[x, y, z, w]` to XYZ-order Euler angles.
fn quat_to_euler_xyz([x, y, z, w]: [f32; 4]) -> Vec3 {
    let m11 = 1.0 - 2.0 * (y * y + z * z);
    let m12 = 2.0 * (x * y - z * w);
    let m13 = 2.0 * (x * z + y * w);
    let m22 = 1.0 - 2.0 * (x * x + z * z);
    let m23 = 2.0 * (y * z - x * w);
    let m32 = 2.0 * (y * z + x * w);
    let m33 = 1.0 - 2.0 * (x * x + y * y);

    let ry = m13.clamp(-1.0, 1.0).asin();
    if m13.abs() < 0.999_999_9 {
        Vec3::new((-m23).atan2(m33), ry, (-m12).atan2(m11))
    } else {
        // Gimbal lock: fold the z rotation into x.
        Vec3::new(m32.atan2(m22), ry, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use stagehand_core::resource::ResourceLedger;

    struct NoResolver;

    impl ResourceResolver for NoResolver {
        fn resolve(&self, _base: &str, uri: &str) -> Result<Vec<u8>, LoadError> {
            Err(LoadError::Source {
                path: uri.to_string(),
                reason: "external resources disabled".to_string(),
            })
        }
    }

    fn triangle_gltf(buffer_uri: &str) -> String {
        format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [
    {{ "name": "base", "children": [1, 2] }},
    {{ "name": "left", "mesh": 0, "translation": [-1.0, 0.0, 0.0] }},
    {{ "name": "right", "mesh": 0, "translation": [1.0, 0.0, 0.0] }}
  ],
  "meshes": [{{ "name": "tri", "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "material": 0 }}] }}],
  "materials": [{{ "pbrMetallicRoughness": {{ "baseColorFactor": [1.0, 0.0, 0.0, 1.0], "metallicFactor": 0.0, "roughnessFactor": 0.8 }} }}],
  "buffers": [{{ "byteLength": 36, "uri": "{buffer_uri}" }}],
  "bufferViews": [{{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }}],
  "accessors": [{{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }}]
}}"#
        )
    }

    fn triangle_data_uri() -> String {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let bytes = bytemuck::cast_slice::<f32, u8>(&positions);
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        format!("data:application/octet-stream;base64,{encoded}")
    }

    #[test]
    fn test_decodes_hierarchy_with_shared_resources() {
        // ARRANGE
        let ledger = ResourceLedger::new();
        let decoder = GltfDecoder::new(Arc::new(NoResolver));
        let json = triangle_gltf(&triangle_data_uri());

        // ACT
        let asset = decoder.decode("tri.gltf", json.as_bytes(), &ledger).unwrap();

        // ASSERT
        let root = asset.as_model().unwrap();
        let base = root.find("base").unwrap();
        assert_eq!(base.children().len(), 2);
        let left = base.find("left").unwrap().mesh.as_ref().unwrap();
        let right = base.find("right").unwrap().mesh.as_ref().unwrap();
        assert!(Arc::ptr_eq(&left.geometry, &right.geometry));
        assert!(Arc::ptr_eq(&left.material, &right.material));
        assert_eq!(left.geometry.shape.vertex_count(), 3);
        assert_eq!(
            left.material.params.kind,
            MaterialKind::Standard {
                roughness: 0.8,
                metalness: 0.0
            }
        );
        assert_eq!(base.find("left").unwrap().transform.position.x, -1.0);
        // One geometry and one material.
        assert_eq!(ledger.live_count(), 2);
    }

    #[test]
    fn test_multi_material_mesh_splits_into_child_nodes() {
        let ledger = ResourceLedger::new();
        let decoder = GltfDecoder::new(Arc::new(NoResolver));
        let json = format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [{{ "name": "panel", "mesh": 0 }}],
  "meshes": [{{ "name": "quad", "primitives": [
    {{ "attributes": {{ "POSITION": 0 }}, "material": 0 }},
    {{ "attributes": {{ "POSITION": 0 }}, "material": 1 }}
  ] }}],
  "materials": [
    {{ "pbrMetallicRoughness": {{ "roughnessFactor": 0.2 }} }},
    {{ "pbrMetallicRoughness": {{ "roughnessFactor": 0.9 }} }}
  ],
  "buffers": [{{ "byteLength": 36, "uri": "{}" }}],
  "bufferViews": [{{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }}],
  "accessors": [{{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }}]
}}"#,
            triangle_data_uri()
        );

        let asset = decoder.decode("panel.gltf", json.as_bytes(), &ledger).unwrap();

        let panel = asset.as_model().unwrap().find("panel").unwrap();
        assert!(panel.mesh.is_none());
        let parts: Vec<_> = panel
            .children()
            .iter()
            .map(|child| child.mesh.as_ref().unwrap())
            .collect();
        assert_eq!(parts.len(), 2);
        assert!(!Arc::ptr_eq(&parts[0].material, &parts[1].material));
        assert_eq!(panel.children()[0].name, "quad_0");
        assert_eq!(panel.children()[1].name, "quad_1");
        // Two geometries and two materials.
        assert_eq!(ledger.live_count(), 4);
    }

    #[test]
    fn test_invalid_json_is_a_decode_failure() {
        let ledger = ResourceLedger::new();
        let decoder = GltfDecoder::new(Arc::new(NoResolver));

        let result = decoder.decode("broken.gltf", b"{ not gltf", &ledger);

        assert!(matches!(result, Err(LoadError::DecodeFailure { .. })));
        assert_eq!(ledger.live_count(), 0);
    }

    #[test]
    fn test_unresolvable_buffer_fails_without_allocating() {
        let ledger = ResourceLedger::new();
        let decoder = GltfDecoder::new(Arc::new(NoResolver));
        let json = triangle_gltf("tri.bin");

        let result = decoder.decode("tri.gltf", json.as_bytes(), &ledger);

        assert!(matches!(result, Err(LoadError::Source { .. })));
        assert_eq!(ledger.allocation_count(), 0);
    }

    #[test]
    fn test_filesystem_resolver_is_relative_to_asset() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("models")).unwrap();
        std::fs::write(dir.path().join("models/tri.bin"), [1u8, 2, 3]).unwrap();

        let resolver = FileSystemResolver::new(dir.path());

        assert_eq!(resolver.resolve("models/tri.gltf", "tri.bin").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_quaternion_about_y_becomes_yaw() {
        let half = std::f32::consts::FRAC_PI_4 / 2.0;
        let euler = quat_to_euler_xyz([0.0, half.sin(), 0.0, half.cos()]);
        assert_relative_eq!(euler.y, std::f32::consts::FRAC_PI_4, epsilon = 1e-5);
        assert_relative_eq!(euler.x, 0.0, epsilon = 1e-5);
    }
}
