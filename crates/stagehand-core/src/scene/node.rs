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

//! Scene-graph nodes.

use super::geometry::Geometry;
use super::material::Material;
use crate::math::Vec3;
use crate::resource::GpuHandle;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`SceneNode`].
///
/// Copies produced from a template get fresh ids, so identity never leaks
/// between a template and its clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Local position, Euler rotation (radians, XYZ order) and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation.
    pub position: Vec3,
    /// Rotation in radians.
    pub rotation: Vec3,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// A drawable: geometry shaded by a material.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// The buffers to draw.
    pub geometry: Arc<Geometry>,
    /// The material to draw them with.
    pub material: Arc<Material>,
}

/// A node of a scene graph, optionally carrying a [`Mesh`].
#[derive(Debug)]
pub struct SceneNode {
    id: NodeId,
    /// Display name.
    pub name: String,
    /// Local transform.
    pub transform: Transform,
    /// Hidden nodes and their subtrees are skipped when drawing.
    pub visible: bool,
    /// Attached drawable.
    pub mesh: Option<Mesh>,
    children: Vec<SceneNode>,
}

impl SceneNode {
    /// An empty group node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NodeId::next(),
            name: name.into(),
            transform: Transform::default(),
            visible: true,
            mesh: None,
            children: Vec::new(),
        }
    }

    /// A node drawing `geometry` with `material`.
    pub fn with_mesh(
        name: impl Into<String>,
        geometry: Arc<Geometry>,
        material: Arc<Material>,
    ) -> Self {
        let mut node = Self::new(name);
        node.mesh = Some(Mesh { geometry, material });
        node
    }

    /// This node's identity.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Appends a child and returns its id.
    pub fn add_child(&mut self, child: SceneNode) -> NodeId {
        let id = child.id;
        self.children.push(child);
        id
    }

    /// Detaches the direct child with the given id.
    pub fn remove_child(&mut self, id: NodeId) -> Option<SceneNode> {
        let index = self.children.iter().position(|c| c.id == id)?;
        Some(self.children.remove(index))
    }

    /// Direct children.
    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    /// Mutable direct children.
    pub fn children_mut(&mut self) -> &mut [SceneNode] {
        &mut self.children
    }

    /// Visits this node and its descendants, depth-first, parents first.
    pub fn traverse<'a>(&'a self, visit: &mut impl FnMut(&'a SceneNode)) {
        visit(self);
        for child in &self.children {
            child.traverse(visit);
        }
    }

    /// Number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.traverse(&mut |_| count += 1);
        count
    }

    /// First node in the subtree with the given name.
    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Every distinct GPU handle referenced by the subtree.
    pub fn handles(&self) -> HashSet<GpuHandle> {
        let mut handles = HashSet::new();
        self.traverse(&mut |node| {
            if let Some(mesh) = &node.mesh {
                handles.insert(mesh.geometry.handle());
                handles.insert(mesh.material.handle());
                for (_, texture) in mesh.material.textures() {
                    handles.insert(texture.handle());
                }
            }
        });
        handles
    }

    /// Builds a copy with fresh identity, keeping the given subtree layout.
    /// Used by the duplicator, which supplies the copied mesh.
    pub(crate) fn shallow_copy(&self, mesh: Option<Mesh>) -> Self {
        Self {
            id: NodeId::next(),
            name: self.name.clone(),
            transform: self.transform,
            visible: self.visible,
            mesh,
            children: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> SceneNode {
        let mut root = SceneNode::new("root");
        let mut arm = SceneNode::new("arm");
        arm.add_child(SceneNode::new("hand"));
        root.add_child(arm);
        root.add_child(SceneNode::new("leg"));
        root
    }

    #[test]
    fn test_traverse_is_depth_first_preorder() {
        let root = tree();
        let mut names = Vec::new();
        root.traverse(&mut |node| names.push(node.name.clone()));
        assert_eq!(names, ["root", "arm", "hand", "leg"]);
    }

    #[test]
    fn test_find_and_remove_child() {
        let mut root = tree();
        assert!(root.find("hand").is_some());
        let leg = root.find("leg").map(SceneNode::id).unwrap();

        let removed = root.remove_child(leg).unwrap();

        assert_eq!(removed.name, "leg");
        assert_eq!(root.node_count(), 3);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(SceneNode::new("a").id(), SceneNode::new("a").id());
    }
}
