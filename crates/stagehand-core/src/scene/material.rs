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

//! Material descriptors.

use super::texture::Texture;
use crate::math::LinearRgba;
use crate::params::{ParamSet, ParamValue, Tunable};
use crate::resource::{GpuHandle, RenderDevice, ResourceKind};
use std::sync::Arc;

/// The shading model of a material, with model-specific parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialKind {
    /// Unlit.
    Basic,
    /// Diffuse only.
    Lambert,
    /// Blinn-Phong.
    Phong {
        /// Specular exponent.
        shininess: f32,
    },
    /// Metallic-roughness PBR.
    Standard {
        /// Perceptual roughness in `[0, 1]`.
        roughness: f32,
        /// Metalness in `[0, 1]`.
        metalness: f32,
    },
    /// Extended PBR.
    Physical {
        /// Perceptual roughness in `[0, 1]`.
        roughness: f32,
        /// Metalness in `[0, 1]`.
        metalness: f32,
        /// Clearcoat layer strength.
        clearcoat: f32,
        /// Transmission factor.
        transmission: f32,
    },
    /// Screen-space points, used for splats.
    Points {
        /// Point size in pixels.
        size: f32,
    },
}

/// CPU-side description of a material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialParams {
    /// Shading model.
    pub kind: MaterialKind,
    /// Base color.
    pub color: LinearRgba,
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
    /// Whether blending is enabled.
    pub transparent: bool,
    /// Emitted color.
    pub emissive: LinearRgba,
    /// Render both faces.
    pub double_sided: bool,
}

impl MaterialParams {
    /// Parameters for `kind` with neutral defaults.
    pub fn new(kind: MaterialKind) -> Self {
        Self {
            kind,
            color: LinearRgba::WHITE,
            opacity: 1.0,
            transparent: false,
            emissive: LinearRgba::BLACK,
            double_sided: false,
        }
    }

    /// An unlit material.
    pub fn basic() -> Self {
        Self::new(MaterialKind::Basic)
    }

    /// A PBR material with mid roughness.
    pub fn standard() -> Self {
        Self::new(MaterialKind::Standard {
            roughness: 0.5,
            metalness: 0.0,
        })
    }

    /// An extended PBR material.
    pub fn physical() -> Self {
        Self::new(MaterialKind::Physical {
            roughness: 0.5,
            metalness: 0.0,
            clearcoat: 0.0,
            transmission: 0.0,
        })
    }

    /// Builder for the base color.
    pub fn with_color(mut self, color: LinearRgba) -> Self {
        self.color = color;
        self
    }
}

impl Tunable for MaterialParams {
    fn params(&self) -> ParamSet {
        let mut params = ParamSet::new()
            .with("color", ParamValue::Color(self.color.to_hex()))
            .with("opacity", ParamValue::Float(self.opacity))
            .with("transparent", ParamValue::Flag(self.transparent));
        match self.kind {
            MaterialKind::Standard {
                roughness,
                metalness,
            }
            | MaterialKind::Physical {
                roughness,
                metalness,
                ..
            } => {
                params.set("roughness", ParamValue::Float(roughness));
                params.set("metalness", ParamValue::Float(metalness));
            }
            MaterialKind::Phong { shininess } => {
                params.set("shininess", ParamValue::Float(shininess))
            }
            MaterialKind::Points { size } => params.set("size", ParamValue::Float(size)),
            MaterialKind::Basic | MaterialKind::Lambert => {}
        }
        params
    }

    fn apply_params(&mut self, params: &ParamSet) {
        if let Some(color) = params.color("color") {
            self.color = color;
        }
        if let Some(opacity) = params.float("opacity") {
            self.opacity = opacity.clamp(0.0, 1.0);
        }
        if let Some(transparent) = params.flag("transparent") {
            self.transparent = transparent;
        }
        let unit = |key: &str| params.float(key).map(|v| v.clamp(0.0, 1.0));
        match &mut self.kind {
            MaterialKind::Standard {
                roughness,
                metalness,
            }
            | MaterialKind::Physical {
                roughness,
                metalness,
                ..
            } => {
                *roughness = unit("roughness").unwrap_or(*roughness);
                *metalness = unit("metalness").unwrap_or(*metalness);
            }
            MaterialKind::Phong { shininess } => {
                *shininess = params.float("shininess").unwrap_or(*shininess);
            }
            MaterialKind::Points { size } => {
                *size = params.float("size").unwrap_or(*size);
            }
            MaterialKind::Basic | MaterialKind::Lambert => {}
        }
    }
}

/// Which input of the shading model a texture feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    /// Base color / albedo.
    BaseColor,
    /// Tangent-space normals.
    Normal,
    /// Packed metallic (B) and roughness (G).
    MetallicRoughness,
    /// Emission.
    Emissive,
    /// Ambient occlusion.
    Occlusion,
}

/// A compiled material resident on the GPU, with the textures it samples.
#[derive(Debug)]
pub struct Material {
    handle: GpuHandle,
    label: String,
    /// Shading parameters.
    pub params: MaterialParams,
    textures: Vec<(TextureSlot, Arc<Texture>)>,
}

impl Material {
    /// Compiles a material, allocating a new handle.
    pub fn new(device: &dyn RenderDevice, label: &str, params: MaterialParams) -> Self {
        Self {
            handle: device.allocate(ResourceKind::Material, label),
            label: label.to_string(),
            params,
            textures: Vec::new(),
        }
    }

    /// Binds `texture` to `slot`, replacing any previous binding.
    pub fn with_texture(mut self, slot: TextureSlot, texture: Arc<Texture>) -> Self {
        self.textures.retain(|(s, _)| *s != slot);
        self.textures.push((slot, texture));
        self
    }

    /// The owned handle.
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The texture bound to `slot`, if any.
    pub fn texture(&self, slot: TextureSlot) -> Option<&Arc<Texture>> {
        self.textures
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, texture)| texture)
    }

    /// Every bound texture.
    pub fn textures(&self) -> impl Iterator<Item = (TextureSlot, &Arc<Texture>)> {
        self.textures.iter().map(|(slot, texture)| (*slot, texture))
    }

    /// Compiles the same parameters under a fresh handle, binding the given
    /// textures instead of the current ones.
    pub fn duplicate_with(
        &self,
        device: &dyn RenderDevice,
        textures: Vec<(TextureSlot, Arc<Texture>)>,
    ) -> Self {
        Self {
            handle: device.allocate(ResourceKind::Material, &self.label),
            label: self.label.clone(),
            params: self.params,
            textures,
        }
    }
}
