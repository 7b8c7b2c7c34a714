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

//! Light descriptors.
//!
//! A [`Light`] is a plain value. It only becomes a GPU resource when a
//! lighting rig instantiates it, so templates of lights can be stored and
//! cloned freely.

use crate::math::{LinearRgba, Vec3};
use crate::params::{ParamSet, ParamValue, Tunable};

/// The type of a light, with type-specific parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Uniform light from every direction.
    Ambient,
    /// Parallel rays from an infinitely distant source, like the sun.
    Directional {
        /// Whether the light renders a shadow map.
        cast_shadow: bool,
    },
    /// Omnidirectional light from a point.
    Point {
        /// Distance at which the contribution reaches zero. `0` means infinite.
        range: f32,
        /// Falloff exponent.
        decay: f32,
    },
    /// A cone of light.
    Spot {
        /// Distance at which the contribution reaches zero. `0` means infinite.
        range: f32,
        /// Half-angle of the cone in radians.
        angle: f32,
        /// Fraction of the cone that is softened, in `[0, 1]`.
        penumbra: f32,
    },
    /// A rectangular emitter.
    RectArea {
        /// Emitter width.
        width: f32,
        /// Emitter height.
        height: f32,
    },
}

/// A light source description.
///
/// # Examples
///
/// ```
/// use stagehand_core::scene::Light;
/// use stagehand_core::math::Vec3;
///
/// let mut key = Light::directional();
/// key.position = Vec3::new(5.0, 10.0, 7.5);
/// key.intensity = 2.0;
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// Type and type-specific parameters.
    pub kind: LightKind,
    /// Color in linear space.
    pub color: LinearRgba,
    /// Intensity multiplier.
    pub intensity: f32,
    /// Position in world space. Directional and spot lights aim at the origin.
    pub position: Vec3,
}

impl Light {
    /// A dim grey fill light.
    pub fn ambient() -> Self {
        Self {
            kind: LightKind::Ambient,
            color: LinearRgba::from_hex(0x404040),
            intensity: 1.0,
            position: Vec3::ZERO,
        }
    }

    /// A white key light from above, casting shadows.
    pub fn directional() -> Self {
        Self {
            kind: LightKind::Directional { cast_shadow: true },
            color: LinearRgba::WHITE,
            intensity: 1.0,
            position: Vec3::new(5.0, 5.0, 5.0),
        }
    }

    /// A white bulb.
    pub fn point() -> Self {
        Self {
            kind: LightKind::Point {
                range: 100.0,
                decay: 2.0,
            },
            color: LinearRgba::WHITE,
            intensity: 1.0,
            position: Vec3::new(0.0, 5.0, 0.0),
        }
    }

    /// A white spot with a soft edge.
    pub fn spot() -> Self {
        Self {
            kind: LightKind::Spot {
                range: 100.0,
                angle: std::f32::consts::FRAC_PI_6,
                penumbra: 0.1,
            },
            color: LinearRgba::WHITE,
            intensity: 1.0,
            position: Vec3::new(0.0, 10.0, 0.0),
        }
    }

    /// A 10x10 white panel.
    pub fn rect_area() -> Self {
        Self {
            kind: LightKind::RectArea {
                width: 10.0,
                height: 10.0,
            },
            color: LinearRgba::WHITE,
            intensity: 1.0,
            position: Vec3::new(0.0, 5.0, 0.0),
        }
    }

    /// Direction the light travels, for lights that have one.
    pub fn direction(&self) -> Option<Vec3> {
        match self.kind {
            LightKind::Directional { .. } | LightKind::Spot { .. } => {
                Some((-self.position).normalize())
            }
            _ => None,
        }
    }
}

impl Tunable for Light {
    fn params(&self) -> ParamSet {
        let f = ParamValue::Float;
        let mut params = ParamSet::new()
            .with("intensity", f(self.intensity))
            .with("color", ParamValue::Color(self.color.to_hex()));
        match self.kind {
            LightKind::Ambient => {}
            LightKind::Directional { cast_shadow } => {
                params.set("cast_shadow", ParamValue::Flag(cast_shadow))
            }
            LightKind::Point { range, decay } => {
                params.set("range", f(range));
                params.set("decay", f(decay));
            }
            LightKind::Spot {
                range,
                angle,
                penumbra,
            } => {
                params.set("range", f(range));
                params.set("angle", f(angle));
                params.set("penumbra", f(penumbra));
            }
            LightKind::RectArea { width, height } => {
                params.set("width", f(width));
                params.set("height", f(height));
            }
        }
        params
    }

    fn apply_params(&mut self, params: &ParamSet) {
        if let Some(intensity) = params.float("intensity") {
            self.intensity = intensity.max(0.0);
        }
        if let Some(color) = params.color("color") {
            self.color = color;
        }
        let read = |slot: &mut f32, key: &str| {
            if let Some(v) = params.float(key) {
                *slot = v.max(0.0);
            }
        };
        match &mut self.kind {
            LightKind::Ambient => {}
            LightKind::Directional { cast_shadow } => {
                if let Some(flag) = params.flag("cast_shadow") {
                    *cast_shadow = flag;
                }
            }
            LightKind::Point { range, decay } => {
                read(range, "range");
                read(decay, "decay");
            }
            LightKind::Spot {
                range,
                angle,
                penumbra,
            } => {
                read(range, "range");
                read(&mut *angle, "angle");
                *angle = angle.min(std::f32::consts::FRAC_PI_2);
                read(&mut *penumbra, "penumbra");
                *penumbra = penumbra.min(1.0);
            }
            LightKind::RectArea { width, height } => {
                read(width, "width");
                read(height, "height");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spot_angle_is_clamped_to_hemisphere() {
        let mut spot = Light::spot();
        spot.apply_params(&ParamSet::new().with("angle", ParamValue::Float(10.0)));
        match spot.kind {
            LightKind::Spot { angle, .. } => assert_eq!(angle, std::f32::consts::FRAC_PI_2),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_directional_aims_at_origin() {
        let light = Light::directional();
        let dir = light.direction().unwrap();
        assert!(dir.x < 0.0 && dir.y < 0.0 && dir.z < 0.0);
        assert!(Light::ambient().direction().is_none());
    }
}
