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

use super::{Asset, Duplicator};
use crate::error::ResourceError;
use crate::resource::{RenderDevice, ReleaseSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// An immutable decoded asset that copies are stamped from.
///
/// A template is owned by whichever cache produced it and is never placed in
/// a scene. [`ResourceTemplate::instantiate`] yields an [`Asset`] with its own
/// GPU handles; the template only counts how many copies it has produced.
///
/// Templates are shared behind `Arc`, so release goes through `&self` and is
/// guarded by an atomic flag: the first [`ResourceTemplate::release`] wins,
/// later calls are no-ops, and instantiation after release fails with
/// [`ResourceError::TemplateReleased`].
#[derive(Debug)]
pub struct ResourceTemplate {
    label: String,
    asset: Asset,
    clones: AtomicUsize,
    released: AtomicBool,
}

impl ResourceTemplate {
    /// Wraps a decoded asset. `label` is usually the source path.
    pub fn new(label: impl Into<String>, asset: Asset) -> Self {
        Self {
            label: label.into(),
            asset,
            clones: AtomicUsize::new(0),
            released: AtomicBool::new(false),
        }
    }

    /// The label given at construction.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Read access to the decoded asset.
    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    /// How many copies have been produced so far.
    pub fn clone_count(&self) -> usize {
        self.clones.load(Ordering::Acquire)
    }

    /// Returns `true` once the template's handles have been released.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Produces an independent copy with freshly allocated handles.
    pub fn instantiate(&self, device: &dyn RenderDevice) -> Result<Asset, ResourceError> {
        if self.is_released() {
            return Err(ResourceError::TemplateReleased {
                label: self.label.clone(),
            });
        }
        let copy = self.asset.duplicate(&mut Duplicator::new(device));
        self.clones.fetch_add(1, Ordering::AcqRel);
        Ok(copy)
    }

    /// Releases the template's own handles. Returns `false` if it was
    /// already released.
    pub fn release(&self, device: &dyn RenderDevice) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        let mut releases = ReleaseSet::new(device);
        self.asset.release(&mut releases);
        log::debug!(
            "Released template '{}' ({} handles)",
            self.label,
            releases.released_count()
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceLedger;
    use crate::scene::{Geometry, GeometryShape, Material, MaterialParams, SceneNode};
    use std::sync::Arc;

    fn model(ledger: &ResourceLedger) -> ResourceTemplate {
        let geometry = Arc::new(Geometry::new(ledger, "g", GeometryShape::unit_box()));
        let material = Arc::new(Material::new(ledger, "m", MaterialParams::standard()));
        ResourceTemplate::new(
            "chair.glb",
            Asset::Model(SceneNode::with_mesh("chair", geometry, material)),
        )
    }

    #[test]
    fn test_instantiate_counts_and_never_aliases() {
        let ledger = ResourceLedger::new();
        let template = model(&ledger);
        assert_eq!(template.clone_count(), 0);

        let first = template.instantiate(&ledger).unwrap();
        let second = template.instantiate(&ledger).unwrap();

        assert_eq!(template.clone_count(), 2);
        assert!(first.handles().is_disjoint(&template.asset().handles()));
        assert!(first.handles().is_disjoint(&second.handles()));
    }

    #[test]
    fn test_release_is_idempotent_and_blocks_instantiation() {
        let ledger = ResourceLedger::new();
        let template = model(&ledger);

        assert!(template.release(&ledger));
        assert!(!template.release(&ledger));

        assert_eq!(ledger.live_count(), 0);
        assert_eq!(ledger.rejected_releases(), 0);
        assert!(matches!(
            template.instantiate(&ledger),
            Err(ResourceError::TemplateReleased { .. })
        ));
    }

    #[test]
    fn test_releasing_a_copy_leaves_template_intact() {
        let ledger = ResourceLedger::new();
        let template = model(&ledger);
        let copy = template.instantiate(&ledger).unwrap();

        copy.release(&mut ReleaseSet::new(&ledger));

        assert!(template
            .asset()
            .handles()
            .iter()
            .all(|handle| ledger.is_live(*handle)));
    }
}
