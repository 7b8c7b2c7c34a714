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

//! Wavefront OBJ decoder.

use super::Decoder;
use crate::error::LoadError;
use ahash::AHashMap;
use stagehand_core::asset::Asset;
use stagehand_core::math::Vec3;
use stagehand_core::resource::RenderDevice;
use stagehand_core::scene::{
    Geometry, GeometryShape, Material, MaterialKind, MaterialParams, MeshData, SceneNode,
};
use std::sync::Arc;

/// Decodes OBJ text into one child node per object, all sharing a default
/// Phong material. `mtllib` references are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjDecoder;

impl Decoder for ObjDecoder {
    fn decode(
        &self,
        path: &str,
        bytes: &[u8],
        device: &dyn RenderDevice,
    ) -> Result<Asset, LoadError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| LoadError::decode(path, format!("OBJ file is not valid UTF-8: {e}")))?;

        let (models, _materials) = tobj::load_obj_buf(
            &mut std::io::Cursor::new(text),
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_| Ok((Vec::new(), AHashMap::new())),
        )
        .map_err(|e| LoadError::decode(path, format!("failed to parse OBJ: {e}")))?;

        let meshes: Vec<(String, MeshData)> = models
            .into_iter()
            .filter(|model| !model.mesh.positions.is_empty())
            .map(|model| (model.name, mesh_data(model.mesh)))
            .collect();
        if meshes.is_empty() {
            return Err(LoadError::decode(path, "no geometry found in OBJ file"));
        }

        let material = Arc::new(Material::new(
            device,
            path,
            MaterialParams::new(MaterialKind::Phong { shininess: 30.0 }),
        ));
        let mut root = SceneNode::new(path);
        for (name, data) in meshes {
            let geometry = Arc::new(Geometry::new(
                device,
                &name,
                GeometryShape::Mesh(Arc::new(data)),
            ));
            root.add_child(SceneNode::with_mesh(name, geometry, Arc::clone(&material)));
        }
        Ok(Asset::Model(root))
    }
}

fn mesh_data(mesh: tobj::Mesh) -> MeshData {
    let vec3s = |values: &[f32]| -> Vec<Vec3> {
        values
            .chunks_exact(3)
            .map(|v| Vec3::new(v[0], v[1], v[2]))
            .collect()
    };
    MeshData {
        positions: vec3s(&mesh.positions),
        normals: (!mesh.normals.is_empty()).then(|| vec3s(&mesh.normals)),
        uvs: (!mesh.texcoords.is_empty()).then(|| {
            mesh.texcoords
                .chunks_exact(2)
                .map(|t| [t[0], t[1]])
                .collect()
        }),
        indices: (!mesh.indices.is_empty()).then_some(mesh.indices),
    }
}
