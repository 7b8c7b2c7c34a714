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

//! The per-stage scene graph container.

use crate::config::{FogSettings, SceneSettings};
use crate::error::StageError;
use crate::presets::fog_preset;
use stagehand_core::asset::{Asset, ResourceTemplate};
use stagehand_core::math::LinearRgba;
use stagehand_core::resource::{Disposable, GpuHandle, ReleaseSet, RenderDevice};
use stagehand_core::scene::{Material, MaterialParams, NodeId, SceneNode};
use std::collections::HashSet;
use std::sync::Arc;

/// Per-object options recorded alongside each added node.
#[derive(Debug, Clone, PartialEq)]
pub struct AddOptions {
    /// The object casts shadows.
    pub cast_shadow: bool,
    /// The object receives shadows.
    pub receive_shadow: bool,
    /// Free-form tag for hosts that need to find objects again.
    pub tag: Option<String>,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            cast_shadow: true,
            receive_shadow: true,
            tag: None,
        }
    }
}

impl AddOptions {
    /// Builder for the tag.
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Fog state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    /// Fog color.
    pub color: LinearRgba,
    /// Start distance.
    pub near: f32,
    /// Opaque distance.
    pub far: f32,
    /// Exponential-squared density. `0` means linear between `near` and
    /// `far`.
    pub density: f32,
}

/// What is drawn behind the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    /// Nothing; the clear color of the surface shows through.
    None,
    /// A solid color.
    Color(LinearRgba),
    /// The bound environment map.
    Environment,
}

/// The environment map a scene samples from. The scene only references the
/// map; the [`EnvironmentBuilder`](crate::EnvironmentBuilder) owns it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentBinding {
    /// Handle of the map.
    pub map: GpuHandle,
    /// Reflection intensity.
    pub intensity: f32,
    /// Rotation around the vertical axis, in radians.
    pub rotation: f32,
    /// Background blurriness.
    pub blur: f32,
    /// The map is also used as background.
    pub as_background: bool,
}

#[derive(Debug)]
struct SceneEntry {
    node: SceneNode,
    options: AddOptions,
}

/// Owns one scene graph and everything added to it.
///
/// Objects are tracked by the [`NodeId`] of their root, so two structurally
/// identical nodes are still two entries. The container owns the GPU handles
/// of every node added to it and releases them on [`SceneContainer::remove`]
/// or [`Disposable::dispose`].
pub struct SceneContainer {
    name: String,
    device: Arc<dyn RenderDevice>,
    entries: Vec<SceneEntry>,
    settings: SceneSettings,
    fog: Option<Fog>,
    background: Background,
    shadows_enabled: bool,
    exposure: f32,
    environment: Option<EnvironmentBinding>,
    disposed: bool,
}

impl SceneContainer {
    /// Creates an empty scene with `settings` applied.
    pub fn new(name: impl Into<String>, device: Arc<dyn RenderDevice>, settings: SceneSettings) -> Self {
        let mut scene = Self {
            name: name.into(),
            device,
            entries: Vec::new(),
            settings,
            fog: None,
            background: Background::None,
            shadows_enabled: true,
            exposure: 1.0,
            environment: None,
            disposed: false,
        };
        scene.update_from_debug();
        scene
    }

    /// The scene's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Takes ownership of `node` and returns its id.
    ///
    /// Adding to a disposed scene releases the node immediately.
    pub fn add(&mut self, node: SceneNode, options: AddOptions) -> NodeId {
        let id = node.id();
        if self.disposed {
            log::warn!("Scene '{}' is disposed, releasing '{}'", self.name, node.name);
            ReleaseSet::new(&*self.device).release_node(&node);
            return id;
        }
        log::trace!("Adding '{}' to scene '{}'", node.name, self.name);
        self.entries.push(SceneEntry { node, options });
        id
    }

    /// Instantiates `template` and adds the copy.
    ///
    /// Models are added as-is; bare geometry gets a default standard
    /// material. Textures are rejected with [`StageError::NotDrawable`].
    pub fn add_template(
        &mut self,
        template: &ResourceTemplate,
        options: AddOptions,
    ) -> Result<NodeId, StageError> {
        if self.disposed {
            return Err(StageError::Disposed);
        }
        if let Asset::Texture(_) = template.asset() {
            return Err(StageError::NotDrawable {
                label: template.label().to_string(),
                kind: template.asset().kind_name(),
            });
        }
        let node = match template.instantiate(&*self.device)? {
            Asset::Model(node) => node,
            Asset::Geometry(geometry) => {
                let material = Material::new(&*self.device, template.label(), MaterialParams::standard());
                SceneNode::with_mesh(template.label(), geometry, Arc::new(material))
            }
            Asset::Texture(texture) => {
                // Checked above; keep the copy from leaking regardless.
                ReleaseSet::new(&*self.device).release_texture(&texture);
                return Err(StageError::NotDrawable {
                    label: template.label().to_string(),
                    kind: "texture",
                });
            }
        };
        Ok(self.add(node, options))
    }

    /// Removes the entry whose root is `id` and releases every handle that no
    /// other entry still references. Returns `false` if there is no such
    /// entry.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(node) = self.detach(id) else {
            return false;
        };
        let mut releases = ReleaseSet::new(&*self.device);
        releases.retain(self.handles());
        releases.release_node(&node);
        log::debug!(
            "Removed '{}' from scene '{}' ({} handles released)",
            node.name,
            self.name,
            releases.released_count()
        );
        true
    }

    /// Removes the entry whose root is `id` and hands it back without
    /// releasing anything. The caller becomes the owner.
    pub fn detach(&mut self, id: NodeId) -> Option<SceneNode> {
        let index = self.entries.iter().position(|e| e.node.id() == id)?;
        Some(self.entries.remove(index).node)
    }

    /// The node whose root is `id`.
    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.entries.iter().find(|e| e.node.id() == id).map(|e| &e.node)
    }

    /// Mutable access to the node whose root is `id`.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.entries
            .iter_mut()
            .find(|e| e.node.id() == id)
            .map(|e| &mut e.node)
    }

    /// The options `id` was added with.
    pub fn options(&self, id: NodeId) -> Option<&AddOptions> {
        self.entries.iter().find(|e| e.node.id() == id).map(|e| &e.options)
    }

    /// Ids of the root objects, in insertion order.
    pub fn object_ids(&self) -> Vec<NodeId> {
        self.entries.iter().map(|e| e.node.id()).collect()
    }

    /// Root objects, in insertion order.
    pub fn objects(&self) -> impl Iterator<Item = &SceneNode> {
        self.entries.iter().map(|e| &e.node)
    }

    /// Returns `true` if `id` is a root object of this scene.
    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.iter().any(|e| e.node.id() == id)
    }

    /// Number of root objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every distinct GPU handle owned by the scene's objects.
    pub fn handles(&self) -> HashSet<GpuHandle> {
        self.entries.iter().flat_map(|e| e.node.handles()).collect()
    }

    /// The debug object.
    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    /// Mutable debug object. Changes apply on
    /// [`SceneContainer::update_from_debug`].
    pub fn settings_mut(&mut self) -> &mut SceneSettings {
        &mut self.settings
    }

    /// Applies the debug object to the live fog, background, shadow and
    /// tone-mapping state.
    pub fn update_from_debug(&mut self) {
        let settings = &self.settings;
        self.fog = if settings.fog.enabled {
            resolve_fog(&settings.fog)
        } else {
            None
        };
        self.background = match (self.environment, settings.background.enabled) {
            (Some(binding), _) if binding.as_background => Background::Environment,
            (_, true) => {
                let mut color = LinearRgba::from_hex(settings.background.color);
                color.a = settings.background.alpha.clamp(0.0, 1.0);
                Background::Color(color)
            }
            (_, false) => Background::None,
        };
        self.shadows_enabled = settings.shadows.enabled;
        self.exposure = if settings.tone_mapping.enabled {
            settings.tone_mapping.exposure.max(0.0)
        } else {
            1.0
        };
    }

    /// Current fog.
    pub fn fog(&self) -> Option<Fog> {
        self.fog
    }

    /// Current background.
    pub fn background(&self) -> Background {
        self.background
    }

    /// Whether shadows are rendered.
    pub fn shadows_enabled(&self) -> bool {
        self.shadows_enabled
    }

    /// Current tone-mapping exposure.
    pub fn exposure(&self) -> f32 {
        self.exposure
    }

    /// Sets the tone-mapping exposure, keeping the debug object in sync.
    pub fn set_exposure(&mut self, exposure: f32) {
        self.settings.tone_mapping.exposure = exposure.max(0.0);
        self.exposure = self.settings.tone_mapping.exposure;
    }

    /// The bound environment map.
    pub fn environment(&self) -> Option<&EnvironmentBinding> {
        self.environment.as_ref()
    }

    /// Binds (or unbinds) an environment map.
    pub fn set_environment(&mut self, binding: Option<EnvironmentBinding>) {
        self.environment = binding;
        self.update_from_debug();
    }
}

/// Fog for enabled settings. A known preset supplies color and density and
/// the `"none"` preset turns fog off. An unknown preset falls back to the
/// explicit values.
fn resolve_fog(settings: &FogSettings) -> Option<Fog> {
    let mut color = settings.color;
    let mut density = settings.density;
    if let Some(key) = settings.preset.as_deref() {
        match fog_preset(key) {
            Some(preset) => {
                color = preset.color?;
                density = preset.density;
            }
            None => log::warn!("Unknown fog preset '{key}'"),
        }
    }
    Some(Fog {
        color: LinearRgba::from_hex(color),
        near: settings.near,
        far: settings.far.max(settings.near),
        density: density.max(0.0),
    })
}

impl Disposable for SceneContainer {
    /// Walks every object depth-first and releases each distinct geometry,
    /// material and material texture once.
    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        let mut releases = ReleaseSet::new(&*self.device);
        for entry in &self.entries {
            releases.release_node(&entry.node);
        }
        log::info!(
            "Disposed scene '{}': {} objects, {} handles",
            self.name,
            self.entries.len(),
            releases.released_count()
        );
        self.entries.clear();
        self.environment = None;
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_core::resource::ResourceLedger;
    use stagehand_core::scene::{Geometry, GeometryShape};

    fn scene() -> (SceneContainer, Arc<ResourceLedger>) {
        let ledger = Arc::new(ResourceLedger::new());
        (
            SceneContainer::new("test", ledger.clone(), SceneSettings::default()),
            ledger,
        )
    }

    fn cube(ledger: &ResourceLedger, material: &Arc<Material>) -> SceneNode {
        let geometry = Arc::new(Geometry::new(ledger, "cube", GeometryShape::unit_box()));
        SceneNode::with_mesh("cube", geometry, Arc::clone(material))
    }

    #[test]
    fn test_shared_material_is_released_once() {
        // ARRANGE
        let (mut scene, ledger) = scene();
        let material = Arc::new(Material::new(&*ledger, "paint", MaterialParams::standard()));
        scene.add(cube(&ledger, &material), AddOptions::default());
        scene.add(cube(&ledger, &material), AddOptions::default());

        // ACT
        scene.dispose();
        scene.dispose();

        // ASSERT
        assert!(scene.is_disposed());
        assert_eq!(ledger.live_count(), 0);
        assert_eq!(ledger.release_order().len(), 3);
        assert_eq!(ledger.rejected_releases(), 0);
    }

    #[test]
    fn test_remove_finds_the_exact_entry() {
        let (mut scene, ledger) = scene();
        let material = Arc::new(Material::new(&*ledger, "paint", MaterialParams::standard()));
        let first = scene.add(cube(&ledger, &material), AddOptions::default());
        let second = scene.add(cube(&ledger, &material), AddOptions::default());

        assert!(scene.remove(first));
        assert!(!scene.remove(first));

        assert_eq!(scene.object_ids(), vec![second]);
        // The shared material is still used by the second cube.
        assert!(ledger.is_live(material.handle()));
        assert_eq!(ledger.live_count(), 2);
    }

    #[test]
    fn test_detach_transfers_ownership() {
        let (mut scene, ledger) = scene();
        let material = Arc::new(Material::new(&*ledger, "paint", MaterialParams::standard()));
        let id = scene.add(cube(&ledger, &material), AddOptions::default().tagged("hero"));
        assert_eq!(scene.options(id).and_then(|o| o.tag.as_deref()), Some("hero"));

        let node = scene.detach(id).unwrap();
        scene.dispose();

        assert!(node.handles().iter().all(|h| ledger.is_live(*h)));
    }

    #[test]
    fn test_texture_templates_are_not_drawable() {
        let (mut scene, ledger) = scene();
        let data = Arc::new(stagehand_core::scene::TextureData::rgba8(1, 1, vec![0; 4]));
        let texture = stagehand_core::scene::Texture::new(
            &*ledger,
            "albedo.png",
            data,
            stagehand_core::scene::TextureMapping::Uv,
        );
        let template = ResourceTemplate::new("albedo.png", Asset::Texture(Arc::new(texture)));

        let result = scene.add_template(&template, AddOptions::default());

        assert!(matches!(result, Err(StageError::NotDrawable { .. })));
        assert_eq!(template.clone_count(), 0);
        assert_eq!(ledger.live_count(), 1);
    }

    #[test]
    fn test_geometry_templates_get_a_material() {
        let (mut scene, ledger) = scene();
        let geometry = Arc::new(Geometry::new(&*ledger, "draco", GeometryShape::unit_box()));
        let template = ResourceTemplate::new("bunny.drc", Asset::Geometry(geometry));

        let id = scene.add_template(&template, AddOptions::default()).unwrap();

        assert_eq!(template.clone_count(), 1);
        assert!(scene.get(id).and_then(|n| n.mesh.as_ref()).is_some());
        assert_eq!(scene.handles().len(), 2);
    }

    #[test]
    fn test_update_from_debug_applies_fog_and_background() {
        let (mut scene, _) = scene();
        assert!(scene.fog().is_none());
        assert!(matches!(scene.background(), Background::Color(_)));

        scene.settings_mut().fog.enabled = true;
        scene.settings_mut().background.enabled = false;
        scene.settings_mut().tone_mapping.exposure = 2.0;
        scene.update_from_debug();

        assert_eq!(scene.fog().map(|f| f.far), Some(1000.0));
        assert_eq!(scene.background(), Background::None);
        assert_eq!(scene.exposure(), 2.0);
    }

    #[test]
    fn test_fog_preset_sets_color_and_density() {
        // ARRANGE
        let (mut scene, _) = scene();
        scene.settings_mut().fog.enabled = true;
        scene.settings_mut().fog.preset = Some("forest_haze".to_string());

        // ACT
        scene.update_from_debug();

        // ASSERT
        let fog = scene.fog().unwrap();
        assert_eq!(fog.color, LinearRgba::from_hex(0xe6ffe6));
        assert_eq!(fog.density, 0.15);

        scene.settings_mut().fog.preset = Some("none".to_string());
        scene.update_from_debug();
        assert!(scene.fog().is_none());

        scene.settings_mut().fog.preset = Some("not_a_fog".to_string());
        scene.settings_mut().fog.density = 0.05;
        scene.update_from_debug();
        assert_eq!(scene.fog().map(|f| f.density), Some(0.05));
    }

    #[test]
    fn test_environment_binding_takes_over_background() {
        let (mut scene, ledger) = scene();
        let map = ledger.allocate(stagehand_core::resource::ResourceKind::EnvironmentMap, "sky");

        scene.set_environment(Some(EnvironmentBinding {
            map,
            intensity: 1.0,
            rotation: 0.0,
            blur: 0.0,
            as_background: true,
        }));

        assert_eq!(scene.background(), Background::Environment);
        scene.dispose();
        // The scene does not own the map.
        assert!(ledger.is_live(map));
    }
}
