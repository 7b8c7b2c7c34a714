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

//! Disposal contract and the graph walker used to honour it.

use super::device::RenderDevice;
use super::handle::GpuHandle;
use crate::scene::{Geometry, Material, SceneNode, Texture};
use std::collections::HashSet;

/// An owner of GPU handles.
///
/// `dispose` releases everything the owner holds. It must be idempotent: a
/// second call does nothing, and no call ever fails. After disposal the owner
/// must not allocate again.
pub trait Disposable {
    /// Releases every owned handle.
    fn dispose(&mut self);

    /// Returns `true` once [`Disposable::dispose`] has run.
    fn is_disposed(&self) -> bool;
}

/// Releases handles through a device, at most once each.
///
/// Scene graphs share geometries, materials and textures through `Arc`, so a
/// naive walk would hit the same handle several times. A `ReleaseSet`
/// remembers what it has already released during one teardown, and can be
/// told to keep handles that are still owned elsewhere.
///
/// # Examples
///
/// ```
/// use stagehand_core::resource::{ReleaseSet, RenderDevice, ResourceKind, ResourceLedger};
///
/// let ledger = ResourceLedger::new();
/// let handle = ledger.allocate(ResourceKind::Texture, "albedo");
///
/// let mut releases = ReleaseSet::new(&ledger);
/// assert!(releases.release(handle));
/// assert!(!releases.release(handle));
/// assert_eq!(ledger.rejected_releases(), 0);
/// ```
pub struct ReleaseSet<'a> {
    device: &'a dyn RenderDevice,
    released: HashSet<GpuHandle>,
    retained: HashSet<GpuHandle>,
}

impl<'a> ReleaseSet<'a> {
    /// Starts a teardown against `device`.
    pub fn new(device: &'a dyn RenderDevice) -> Self {
        Self {
            device,
            released: HashSet::new(),
            retained: HashSet::new(),
        }
    }

    /// Marks handles that must survive this teardown.
    pub fn retain(&mut self, handles: impl IntoIterator<Item = GpuHandle>) {
        self.retained.extend(handles);
    }

    /// Releases `handle` unless it was already released or is retained.
    /// Returns `true` if the device was called.
    pub fn release(&mut self, handle: GpuHandle) -> bool {
        if self.retained.contains(&handle) || !self.released.insert(handle) {
            return false;
        }
        self.device.release(handle);
        true
    }

    /// Releases a geometry's buffers.
    pub fn release_geometry(&mut self, geometry: &Geometry) {
        self.release(geometry.handle());
    }

    /// Releases a texture.
    pub fn release_texture(&mut self, texture: &Texture) {
        self.release(texture.handle());
    }

    /// Releases a material and every texture it samples.
    pub fn release_material(&mut self, material: &Material) {
        for (_, texture) in material.textures() {
            self.release_texture(texture);
        }
        self.release(material.handle());
    }

    /// Walks `node` depth-first and releases every distinct handle found.
    pub fn release_node(&mut self, node: &SceneNode) {
        node.traverse(&mut |n| {
            if let Some(mesh) = &n.mesh {
                self.release_geometry(&mesh.geometry);
                self.release_material(&mesh.material);
            }
        });
    }

    /// Number of handles released so far.
    pub fn released_count(&self) -> usize {
        self.released.len()
    }
}
