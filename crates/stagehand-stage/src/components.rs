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

//! Named, reusable geometry, material and light templates.

use crate::error::StageError;
use stagehand_core::params::{ParamSet, Tunable};
use stagehand_core::resource::{Disposable, GpuHandle, ReleaseSet, RenderDevice, ResourceKind};
use stagehand_core::scene::{Geometry, GeometryShape, Light, Material, MaterialParams, SceneNode};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// The closed set of component kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    /// A [`GeometryShape`].
    Geometry,
    /// A [`MaterialParams`].
    Material,
    /// A [`Light`].
    Light,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComponentKind::Geometry => "geometry",
            ComponentKind::Material => "material",
            ComponentKind::Light => "light",
        })
    }
}

/// What gets registered.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentTemplate {
    /// A geometry description.
    Geometry(GeometryShape),
    /// A material description.
    Material(MaterialParams),
    /// A light description.
    Light(Light),
}

impl ComponentTemplate {
    /// The kind this template is registered under.
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentTemplate::Geometry(_) => ComponentKind::Geometry,
            ComponentTemplate::Material(_) => ComponentKind::Material,
            ComponentTemplate::Light(_) => ComponentKind::Light,
        }
    }
}

/// Read access to a registered template.
#[derive(Debug, Clone, Copy)]
pub enum ComponentRef<'a> {
    /// A geometry template.
    Geometry(&'a Geometry),
    /// A material template.
    Material(&'a Material),
    /// A light template.
    Light(&'a Light),
}

#[derive(Debug)]
enum Component {
    Geometry(Geometry),
    Material(Material),
    Light { light: Light, handle: GpuHandle },
}

impl Component {
    fn build(device: &dyn RenderDevice, name: &str, template: ComponentTemplate) -> Self {
        match template {
            ComponentTemplate::Geometry(shape) => Component::Geometry(Geometry::new(device, name, shape)),
            ComponentTemplate::Material(params) => Component::Material(Material::new(device, name, params)),
            ComponentTemplate::Light(light) => Component::Light {
                light,
                handle: device.allocate(ResourceKind::Light, name),
            },
        }
    }

    fn params(&self) -> ParamSet {
        match self {
            Component::Geometry(geometry) => geometry.shape.params(),
            Component::Material(material) => material.params.params(),
            Component::Light { light, .. } => light.params(),
        }
    }

    fn apply_params(&mut self, params: &ParamSet) {
        match self {
            Component::Geometry(geometry) => geometry.shape.apply_params(params),
            Component::Material(material) => material.params.apply_params(params),
            Component::Light { light, .. } => light.apply_params(params),
        }
    }

    fn release(&self, releases: &mut ReleaseSet<'_>) {
        match self {
            Component::Geometry(geometry) => releases.release_geometry(geometry),
            Component::Material(material) => releases.release_material(material),
            Component::Light { handle, .. } => {
                releases.release(*handle);
            }
        }
    }
}

#[derive(Debug)]
struct Entry {
    component: Component,
    debug: ParamSet,
}

/// Registry of named templates, shared by every stage of a coordinator.
///
/// The registry owns its templates and nothing else: [`ComponentRegistry::instantiate`]
/// builds drawables on fresh handles that belong to whoever receives them.
///
/// Each template carries a debug object, a [`ParamSet`] that an editor can
/// mutate through [`ComponentRegistry::debug_params_mut`] before calling
/// [`ComponentRegistry::update_from_debug`].
pub struct ComponentRegistry {
    device: Arc<dyn RenderDevice>,
    entries: BTreeMap<(ComponentKind, String), Entry>,
    disposed: bool,
}

impl ComponentRegistry {
    /// An empty registry.
    pub fn new(device: Arc<dyn RenderDevice>) -> Self {
        Self {
            device,
            entries: BTreeMap::new(),
            disposed: false,
        }
    }

    /// A registry preloaded with the stock templates: `box`, `sphere` and
    /// `plane` geometries, `basic`, `standard` and `physical` materials,
    /// `ambient`, `directional` and `point` lights.
    pub fn with_defaults(device: Arc<dyn RenderDevice>) -> Self {
        let mut registry = Self::new(device);
        let defaults = [
            ("box", ComponentTemplate::Geometry(GeometryShape::unit_box())),
            (
                "sphere",
                ComponentTemplate::Geometry(GeometryShape::Sphere {
                    radius: 1.0,
                    width_segments: 32,
                    height_segments: 16,
                }),
            ),
            (
                "plane",
                ComponentTemplate::Geometry(GeometryShape::Plane {
                    width: 1.0,
                    height: 1.0,
                }),
            ),
            ("basic", ComponentTemplate::Material(MaterialParams::basic())),
            ("standard", ComponentTemplate::Material(MaterialParams::standard())),
            ("physical", ComponentTemplate::Material(MaterialParams::physical())),
            ("ambient", ComponentTemplate::Light(Light::ambient())),
            ("directional", ComponentTemplate::Light(Light::directional())),
            ("point", ComponentTemplate::Light(Light::point())),
        ];
        for (name, template) in defaults {
            registry.insert(name, template);
        }
        registry
    }

    /// Registers `template` under `name` within its kind. Replacing an
    /// existing template releases it. Returns `true` on replacement.
    pub fn register(&mut self, name: &str, template: ComponentTemplate) -> Result<bool, StageError> {
        if self.disposed {
            return Err(StageError::Disposed);
        }
        Ok(self.insert(name, template))
    }

    fn insert(&mut self, name: &str, template: ComponentTemplate) -> bool {
        let kind = template.kind();
        let component = Component::build(&*self.device, name, template);
        let debug = component.params();
        let previous = self
            .entries
            .insert((kind, name.to_string()), Entry { component, debug });
        match previous {
            Some(old) => {
                old.component.release(&mut ReleaseSet::new(&*self.device));
                log::debug!("Replaced {kind} component '{name}'");
                true
            }
            None => {
                log::trace!("Registered {kind} component '{name}'");
                false
            }
        }
    }

    /// Unregisters and releases a template.
    pub fn unregister(&mut self, kind: ComponentKind, name: &str) -> bool {
        match self.entries.remove(&(kind, name.to_string())) {
            Some(entry) => {
                entry.component.release(&mut ReleaseSet::new(&*self.device));
                true
            }
            None => false,
        }
    }

    /// The template registered as `name` within `kind`.
    pub fn get(&self, kind: ComponentKind, name: &str) -> Option<ComponentRef<'_>> {
        let entry = self.entries.get(&(kind, name.to_string()))?;
        Some(match &entry.component {
            Component::Geometry(geometry) => ComponentRef::Geometry(geometry),
            Component::Material(material) => ComponentRef::Material(material),
            Component::Light { light, .. } => ComponentRef::Light(light),
        })
    }

    /// The geometry template `name`.
    pub fn geometry(&self, name: &str) -> Option<&Geometry> {
        match self.get(ComponentKind::Geometry, name)? {
            ComponentRef::Geometry(geometry) => Some(geometry),
            _ => None,
        }
    }

    /// The material template `name`.
    pub fn material(&self, name: &str) -> Option<&Material> {
        match self.get(ComponentKind::Material, name)? {
            ComponentRef::Material(material) => Some(material),
            _ => None,
        }
    }

    /// The light template `name`.
    pub fn light(&self, name: &str) -> Option<&Light> {
        match self.get(ComponentKind::Light, name)? {
            ComponentRef::Light(light) => Some(light),
            _ => None,
        }
    }

    /// Registered names of `kind`, sorted.
    pub fn names(&self, kind: ComponentKind) -> Vec<&str> {
        self.entries
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.as_str())
            .collect()
    }

    /// Total number of templates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds a drawable node from a geometry and a material template.
    ///
    /// The node gets its own geometry, material and texture handles, so
    /// scenes never alias registry templates.
    pub fn instantiate(&self, geometry: &str, material: &str) -> Result<SceneNode, StageError> {
        let missing = |kind, name: &str| StageError::MissingComponent {
            kind,
            name: name.to_string(),
        };
        let geometry_template = self
            .geometry(geometry)
            .ok_or_else(|| missing(ComponentKind::Geometry, geometry))?;
        let material_template = self
            .material(material)
            .ok_or_else(|| missing(ComponentKind::Material, material))?;

        let device = &*self.device;
        let textures = material_template
            .textures()
            .map(|(slot, texture)| (slot, Arc::new(texture.duplicate(device))))
            .collect();
        Ok(SceneNode::with_mesh(
            geometry,
            Arc::new(geometry_template.duplicate(device)),
            Arc::new(material_template.duplicate_with(device, textures)),
        ))
    }

    /// The debug object of a template.
    pub fn debug_params(&self, kind: ComponentKind, name: &str) -> Option<&ParamSet> {
        self.entries.get(&(kind, name.to_string())).map(|e| &e.debug)
    }

    /// Mutable debug object of a template.
    pub fn debug_params_mut(&mut self, kind: ComponentKind, name: &str) -> Option<&mut ParamSet> {
        self.entries
            .get_mut(&(kind, name.to_string()))
            .map(|e| &mut e.debug)
    }

    /// Applies a template's debug object to the template, then refreshes the
    /// debug object with the values actually applied. Returns `false` if the
    /// template does not exist.
    pub fn update_from_debug(&mut self, kind: ComponentKind, name: &str) -> bool {
        let Some(entry) = self.entries.get_mut(&(kind, name.to_string())) else {
            return false;
        };
        entry.component.apply_params(&entry.debug);
        entry.debug = entry.component.params();
        true
    }
}

impl Disposable for ComponentRegistry {
    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        let mut releases = ReleaseSet::new(&*self.device);
        for entry in self.entries.values() {
            entry.component.release(&mut releases);
        }
        log::info!(
            "Disposed component registry: {} templates, {} handles",
            self.entries.len(),
            releases.released_count()
        );
        self.entries.clear();
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_core::params::ParamValue;
    use stagehand_core::resource::ResourceLedger;

    fn registry() -> (ComponentRegistry, Arc<ResourceLedger>) {
        let ledger = Arc::new(ResourceLedger::new());
        (ComponentRegistry::with_defaults(ledger.clone()), ledger)
    }

    #[test]
    fn test_defaults_are_registered() {
        let (registry, ledger) = registry();
        assert_eq!(registry.names(ComponentKind::Geometry), ["box", "plane", "sphere"]);
        assert_eq!(registry.names(ComponentKind::Light), ["ambient", "directional", "point"]);
        assert_eq!(ledger.live_count(), 9);
    }

    #[test]
    fn test_instantiate_gets_fresh_handles() {
        // ARRANGE
        let (registry, ledger) = registry();
        let template_geometry = registry.geometry("box").unwrap().handle();

        // ACT
        let node = registry.instantiate("box", "standard").unwrap();

        // ASSERT
        let mesh = node.mesh.as_ref().unwrap();
        assert_ne!(mesh.geometry.handle(), template_geometry);
        assert_eq!(ledger.live_count(), 11);
    }

    #[test]
    fn test_instantiate_reports_the_missing_name() {
        let (registry, _) = registry();

        let err = registry.instantiate("torus", "standard").unwrap_err();
        assert!(matches!(
            err,
            StageError::MissingComponent { kind: ComponentKind::Geometry, ref name } if name == "torus"
        ));

        let err = registry.instantiate("box", "chrome").unwrap_err();
        assert!(matches!(
            err,
            StageError::MissingComponent { kind: ComponentKind::Material, .. }
        ));
    }

    #[test]
    fn test_same_name_in_different_kinds() {
        let (mut registry, _) = registry();
        registry
            .register("point", ComponentTemplate::Geometry(GeometryShape::unit_box()))
            .unwrap();

        assert!(registry.geometry("point").is_some());
        assert!(registry.light("point").is_some());
    }

    #[test]
    fn test_replacing_releases_the_old_template() {
        let (mut registry, ledger) = registry();
        let old = registry.material("basic").unwrap().handle();

        let replaced = registry
            .register("basic", ComponentTemplate::Material(MaterialParams::standard()))
            .unwrap();

        assert!(replaced);
        assert!(!ledger.is_live(old));
        assert_eq!(ledger.live_count(), 9);
    }

    #[test]
    fn test_update_from_debug_applies_through_tunable() {
        let (mut registry, _) = registry();
        registry
            .debug_params_mut(ComponentKind::Material, "standard")
            .unwrap()
            .set("roughness", ParamValue::Float(3.0));

        assert!(registry.update_from_debug(ComponentKind::Material, "standard"));

        let debug = registry.debug_params(ComponentKind::Material, "standard").unwrap();
        assert_eq!(debug.float("roughness"), Some(1.0));
        let node = registry.instantiate("box", "standard").unwrap();
        assert_eq!(
            node.mesh.unwrap().material.params.params().float("roughness"),
            Some(1.0)
        );
    }

    #[test]
    fn test_dispose_releases_templates_only() {
        let (mut registry, ledger) = registry();
        let node = registry.instantiate("sphere", "physical").unwrap();

        registry.dispose();
        registry.dispose();

        assert!(registry.is_empty());
        assert_eq!(ledger.live_count(), 2);
        assert!(node.handles().iter().all(|h| ledger.is_live(*h)));
        assert!(matches!(
            registry.register("box", ComponentTemplate::Geometry(GeometryShape::unit_box())),
            Err(StageError::Disposed)
        ));
    }
}
