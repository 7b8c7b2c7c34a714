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

use crate::resource::{GpuHandle, RenderDevice};
use crate::scene::{Geometry, Material, Mesh, SceneNode, Texture};
use std::collections::HashMap;
use std::sync::Arc;

/// Deep-copies decoded assets onto fresh GPU handles.
///
/// Sharing inside the source is preserved inside the copy: two nodes that
/// used one material end up using one (new) material. Nothing is shared
/// with the source except immutable CPU data.
pub struct Duplicator<'a> {
    device: &'a dyn RenderDevice,
    geometries: HashMap<GpuHandle, Arc<Geometry>>,
    materials: HashMap<GpuHandle, Arc<Material>>,
    textures: HashMap<GpuHandle, Arc<Texture>>,
}

impl<'a> Duplicator<'a> {
    /// Starts a copy allocating from `device`.
    pub fn new(device: &'a dyn RenderDevice) -> Self {
        Self {
            device,
            geometries: HashMap::new(),
            materials: HashMap::new(),
            textures: HashMap::new(),
        }
    }

    /// Copy of `texture`, reusing an earlier copy of the same source.
    pub fn texture(&mut self, texture: &Arc<Texture>) -> Arc<Texture> {
        let device = self.device;
        Arc::clone(
            self.textures
                .entry(texture.handle())
                .or_insert_with(|| Arc::new(texture.duplicate(device))),
        )
    }

    /// Copy of `geometry`, reusing an earlier copy of the same source.
    pub fn geometry(&mut self, geometry: &Arc<Geometry>) -> Arc<Geometry> {
        let device = self.device;
        Arc::clone(
            self.geometries
                .entry(geometry.handle())
                .or_insert_with(|| Arc::new(geometry.duplicate(device))),
        )
    }

    /// Copy of `material` and its textures, reusing earlier copies.
    pub fn material(&mut self, material: &Arc<Material>) -> Arc<Material> {
        if let Some(copy) = self.materials.get(&material.handle()) {
            return Arc::clone(copy);
        }
        let textures = material
            .textures()
            .map(|(slot, texture)| (slot, self.texture(texture)))
            .collect();
        let copy = Arc::new(material.duplicate_with(self.device, textures));
        self.materials.insert(material.handle(), Arc::clone(&copy));
        copy
    }

    /// Copy of a whole subtree, with fresh node ids.
    pub fn node(&mut self, node: &SceneNode) -> SceneNode {
        let mesh = node.mesh.as_ref().map(|mesh| Mesh {
            geometry: self.geometry(&mesh.geometry),
            material: self.material(&mesh.material),
        });
        let mut copy = node.shallow_copy(mesh);
        for child in node.children() {
            let child_copy = self.node(child);
            copy.add_child(child_copy);
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceLedger;
    use crate::scene::{GeometryShape, MaterialParams};

    #[test]
    fn test_copy_preserves_internal_sharing_only() {
        // ARRANGE
        let ledger = ResourceLedger::new();
        let geometry = Arc::new(Geometry::new(&ledger, "g", GeometryShape::unit_box()));
        let material = Arc::new(Material::new(&ledger, "m", MaterialParams::basic()));
        let mut root = SceneNode::new("root");
        root.add_child(SceneNode::with_mesh("a", Arc::clone(&geometry), Arc::clone(&material)));
        root.add_child(SceneNode::with_mesh("b", Arc::clone(&geometry), Arc::clone(&material)));

        // ACT
        let copy = Duplicator::new(&ledger).node(&root);

        // ASSERT
        let a = copy.children()[0].mesh.as_ref().unwrap();
        let b = copy.children()[1].mesh.as_ref().unwrap();
        assert!(Arc::ptr_eq(&a.material, &b.material));
        assert_ne!(a.material.handle(), material.handle());
        assert_ne!(a.geometry.handle(), geometry.handle());
        assert_ne!(copy.id(), root.id());
        assert!(copy.handles().is_disjoint(&root.handles()));
        assert_eq!(ledger.live_count(), 4);
    }
}
