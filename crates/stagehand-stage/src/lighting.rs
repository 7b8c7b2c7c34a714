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

//! The per-stage set of lights.

use crate::error::StageError;
use stagehand_core::params::{ParamSet, Tunable};
use stagehand_core::resource::{Disposable, GpuHandle, RenderDevice, ResourceKind};
use stagehand_core::scene::Light;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A light placed in a stage.
#[derive(Debug)]
pub struct LightInstance {
    name: String,
    light_type: String,
    handle: GpuHandle,
    /// The live light.
    pub light: Light,
    /// Debug object, applied on [`LightingRig::update`].
    pub debug: ParamSet,
}

impl LightInstance {
    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The template type it was cloned from.
    pub fn light_type(&self) -> &str {
        &self.light_type
    }

    /// Handle of the light's uniform and shadow resources.
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }
}

/// Named lights of one stage, cloned from a table of light types.
///
/// The stock types are `ambient`, `directional`, `point`, `spot` and
/// `rect_area`; hosts can register more with [`LightingRig::register_type`].
pub struct LightingRig {
    device: Arc<dyn RenderDevice>,
    types: BTreeMap<String, Light>,
    lights: BTreeMap<String, LightInstance>,
    disposed: bool,
}

impl LightingRig {
    /// A rig with the stock light types and no lights.
    pub fn new(device: Arc<dyn RenderDevice>) -> Self {
        let types = [
            ("ambient", Light::ambient()),
            ("directional", Light::directional()),
            ("point", Light::point()),
            ("spot", Light::spot()),
            ("rect_area", Light::rect_area()),
        ]
        .into_iter()
        .map(|(name, light)| (name.to_string(), light))
        .collect();
        Self {
            device,
            types,
            lights: BTreeMap::new(),
            disposed: false,
        }
    }

    /// Adds or replaces a light type.
    pub fn register_type(&mut self, light_type: &str, template: Light) {
        self.types.insert(light_type.to_string(), template);
    }

    /// Registered light types, sorted.
    pub fn types(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }

    /// Clones the `light_type` template, applies `params` and places it as
    /// `name`. An existing light with that name is released and replaced.
    pub fn add_light(
        &mut self,
        name: &str,
        light_type: &str,
        params: &ParamSet,
    ) -> Result<&LightInstance, StageError> {
        if self.disposed {
            return Err(StageError::Disposed);
        }
        let mut light = *self
            .types
            .get(light_type)
            .ok_or_else(|| StageError::UnknownLightType {
                light_type: light_type.to_string(),
            })?;
        light.apply_params(params);

        let instance = LightInstance {
            name: name.to_string(),
            light_type: light_type.to_string(),
            handle: self.device.allocate(ResourceKind::Light, name),
            debug: light.params(),
            light,
        };
        log::trace!("Added {light_type} light '{name}'");
        match self.lights.entry(name.to_string()) {
            Entry::Occupied(mut slot) => {
                let old = slot.insert(instance);
                self.device.release(old.handle);
                log::debug!("Replaced light '{name}'");
                Ok(slot.into_mut())
            }
            Entry::Vacant(slot) => Ok(slot.insert(instance)),
        }
    }

    /// Removes and releases a light. Returns `false` if there is none.
    pub fn remove_light(&mut self, name: &str) -> bool {
        match self.lights.remove(name) {
            Some(instance) => {
                self.device.release(instance.handle);
                true
            }
            None => false,
        }
    }

    /// The light called `name`.
    pub fn light(&self, name: &str) -> Option<&LightInstance> {
        self.lights.get(name)
    }

    /// Mutable access to the light called `name`.
    pub fn light_mut(&mut self, name: &str) -> Option<&mut LightInstance> {
        self.lights.get_mut(name)
    }

    /// All lights, by name.
    pub fn lights(&self) -> impl Iterator<Item = &LightInstance> {
        self.lights.values()
    }

    /// Number of lights.
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    /// Returns `true` if the rig has no lights.
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Applies every light's debug object.
    pub fn update(&mut self) {
        for instance in self.lights.values_mut() {
            instance.light.apply_params(&instance.debug);
        }
    }
}

impl Disposable for LightingRig {
    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        for instance in self.lights.values() {
            self.device.release(instance.handle);
        }
        log::debug!("Disposed lighting rig ({} lights)", self.lights.len());
        self.lights.clear();
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}
