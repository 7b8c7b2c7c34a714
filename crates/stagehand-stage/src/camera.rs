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

//! Cameras, orbit controls and the presets they are built from.

use stagehand_core::math::Vec3;
use std::collections::BTreeMap;
use std::f32::consts::PI;

/// Height of the film gate focal lengths are measured against, in mm.
pub const FILM_GATE_HEIGHT: f32 = 24.0;

/// Lens settings a camera is created from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPreset {
    /// Focal length in mm.
    pub focal_length: f32,
    /// Aperture.
    pub f_stop: f32,
    /// Distance to the focal plane.
    pub focus_distance: f32,
    /// Depth-of-field blur multiplier.
    pub bokeh_scale: f32,
    /// Film grain strength.
    pub film_grain: f32,
}

impl CameraPreset {
    /// Vertical field of view in degrees.
    pub fn vertical_fov(&self) -> f32 {
        let focal = self.focal_length.max(f32::EPSILON);
        (2.0 * (FILM_GATE_HEIGHT / (2.0 * focal)).atan()).to_degrees()
    }
}

/// The stock presets, by name.
pub const CAMERA_PRESETS: [(&str, CameraPreset); 6] = [
    ("default", preset(35.0, 2.8, 20.0, 2.0, 0.5)),
    ("wide_shot", preset(24.0, 5.6, 50.0, 1.0, 0.3)),
    ("close_up", preset(85.0, 1.4, 10.0, 3.0, 0.6)),
    ("portrait", preset(50.0, 1.8, 15.0, 2.0, 0.4)),
    ("dramatic", preset(35.0, 1.2, 30.0, 4.0, 0.7)),
    ("architectural", preset(24.0, 8.0, 100.0, 0.0, 0.2)),
];

const fn preset(
    focal_length: f32,
    f_stop: f32,
    focus_distance: f32,
    bokeh_scale: f32,
    film_grain: f32,
) -> CameraPreset {
    CameraPreset {
        focal_length,
        f_stop,
        focus_distance,
        bokeh_scale,
        film_grain,
    }
}

/// A perspective camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// World position.
    pub position: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    /// Width over height.
    pub aspect: f32,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
    /// Lens settings the camera was built from.
    pub lens: CameraPreset,
}

impl Camera {
    /// A camera at `(0, 2, 10)` looking at the origin.
    pub fn from_preset(lens: CameraPreset, aspect: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 10.0),
            target: Vec3::ZERO,
            fov_y: lens.vertical_fov(),
            aspect,
            near: 0.1,
            far: 1000.0,
            lens,
        }
    }

    /// Updates the aspect ratio. A zero height is ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    /// Unit vector from the camera to its target.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }
}

/// Damped orbit around a target point.
///
/// Input arrives through [`OrbitControls::rotate`] and
/// [`OrbitControls::zoom`]; [`OrbitControls::update`] eases the camera
/// towards the requested orbit.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    /// Orbit center.
    pub target: Vec3,
    /// Radians per pixel of drag.
    pub rotation_speed: f32,
    /// Relative zoom per wheel step.
    pub zoom_speed: f32,
    /// Closest allowed distance.
    pub min_distance: f32,
    /// Farthest allowed distance.
    pub max_distance: f32,
    /// Easing rate per second; `0` disables damping.
    pub damping: f32,
    /// Spin around the target without input.
    pub auto_rotate: bool,
    /// Auto-rotation speed in radians per second.
    pub auto_rotate_speed: f32,
    radius: f32,
    theta: f32,
    phi: f32,
    goal_radius: f32,
    goal_theta: f32,
    goal_phi: f32,
}

const MIN_PHI: f32 = 0.1;
const MAX_PHI: f32 = PI - 0.1;

impl OrbitControls {
    /// Controls orbiting `camera` around its current target.
    pub fn new(camera: &Camera) -> Self {
        let offset = camera.position - camera.target;
        let radius = offset.length().max(f32::EPSILON);
        let theta = offset.x.atan2(offset.z);
        let phi = (offset.y / radius).clamp(-1.0, 1.0).acos().clamp(MIN_PHI, MAX_PHI);
        Self {
            target: camera.target,
            rotation_speed: 0.005,
            zoom_speed: 0.1,
            min_distance: 1.0,
            max_distance: 100.0,
            damping: 10.0,
            auto_rotate: false,
            auto_rotate_speed: 0.5,
            radius,
            theta,
            phi,
            goal_radius: radius,
            goal_theta: theta,
            goal_phi: phi,
        }
    }

    /// Builder enabling auto-rotation.
    pub fn auto_rotating(mut self) -> Self {
        self.auto_rotate = true;
        self
    }

    /// Requests an orbit by a drag of `(dx, dy)` pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.goal_theta += dx * self.rotation_speed;
        self.goal_phi = (self.goal_phi + dy * self.rotation_speed).clamp(MIN_PHI, MAX_PHI);
    }

    /// Requests a zoom by `steps` wheel steps; positive moves away.
    pub fn zoom(&mut self, steps: f32) {
        let scaled = self.goal_radius * (1.0 + steps * self.zoom_speed);
        self.goal_radius = scaled.clamp(self.min_distance, self.max_distance);
    }

    /// Current distance to the target.
    pub fn distance(&self) -> f32 {
        self.radius
    }

    /// Current azimuth in radians.
    pub fn azimuth(&self) -> f32 {
        self.theta
    }

    /// Advances the orbit by `dt` seconds and moves `camera` onto it.
    pub fn update(&mut self, dt: f32, camera: &mut Camera) {
        if self.auto_rotate {
            self.goal_theta += self.auto_rotate_speed * dt;
        }
        let t = if self.damping > 0.0 {
            (self.damping * dt).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.theta += (self.goal_theta - self.theta) * t;
        self.phi += (self.goal_phi - self.phi) * t;
        self.radius += (self.goal_radius - self.radius) * t;

        let sin_phi = self.phi.sin();
        let offset = Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        );
        camera.position = self.target + offset;
        camera.target = self.target;
    }
}

/// A camera and its optional controls.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraRig {
    /// The camera.
    pub camera: Camera,
    /// Controls driving it, if any.
    pub controls: Option<OrbitControls>,
}

impl CameraRig {
    /// Advances the controls.
    pub fn update(&mut self, dt: f32) {
        if let Some(controls) = &mut self.controls {
            controls.update(dt, &mut self.camera);
        }
    }
}

/// Builds camera rigs from named presets. Shared by every stage of a
/// coordinator.
#[derive(Debug, Clone)]
pub struct CameraManager {
    presets: BTreeMap<String, CameraPreset>,
    aspect: f32,
}

impl CameraManager {
    /// A manager with the stock presets.
    pub fn new(aspect: f32) -> Self {
        Self {
            presets: CAMERA_PRESETS
                .iter()
                .map(|(name, preset)| (name.to_string(), *preset))
                .collect(),
            aspect,
        }
    }

    /// Adds or replaces a preset.
    pub fn register_preset(&mut self, name: &str, preset: CameraPreset) {
        self.presets.insert(name.to_string(), preset);
    }

    /// The preset called `name`.
    pub fn preset(&self, name: &str) -> Option<&CameraPreset> {
        self.presets.get(name)
    }

    /// Preset names, sorted.
    pub fn preset_names(&self) -> Vec<&str> {
        self.presets.keys().map(String::as_str).collect()
    }

    /// Aspect ratio new rigs are created with.
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Updates the aspect ratio for new rigs.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Builds a rig from a camera preset and a controls preset.
    ///
    /// Unknown camera presets fall back to `default`. Controls are `orbit`,
    /// `auto_orbit` or `none`; anything else falls back to `orbit`.
    pub fn create_rig(&self, camera: &str, controls: &str) -> CameraRig {
        let lens = match self.presets.get(camera) {
            Some(lens) => *lens,
            None => {
                log::warn!("Unknown camera preset '{camera}', using 'default'");
                self.presets
                    .get("default")
                    .copied()
                    .unwrap_or(CAMERA_PRESETS[0].1)
            }
        };
        let camera = Camera::from_preset(lens, self.aspect);
        let controls = match controls {
            "none" => None,
            "auto_orbit" => Some(OrbitControls::new(&camera).auto_rotating()),
            "orbit" => Some(OrbitControls::new(&camera)),
            other => {
                log::warn!("Unknown controls preset '{other}', using 'orbit'");
                Some(OrbitControls::new(&camera))
            }
        };
        CameraRig { camera, controls }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fov_follows_focal_length() {
        // A 24mm lens on a 24mm gate sees 2 * atan(0.5).
        let wide = CameraManager::new(1.0).preset("wide_shot").copied().unwrap();
        assert_relative_eq!(wide.vertical_fov(), 53.130_1, epsilon = 1e-3);

        let close = CameraManager::new(1.0).preset("close_up").copied().unwrap();
        assert!(close.vertical_fov() < wide.vertical_fov());
    }

    #[test]
    fn test_unknown_presets_fall_back() {
        let manager = CameraManager::new(16.0 / 9.0);

        let rig = manager.create_rig("fisheye", "trackball");

        assert_eq!(rig.camera.lens, CAMERA_PRESETS[0].1);
        assert!(rig.controls.is_some());
        assert_relative_eq!(rig.camera.aspect, 16.0 / 9.0);
        assert!(manager.create_rig("portrait", "none").controls.is_none());
    }

    #[test]
    fn test_orbit_keeps_distance_and_clamps_zoom() {
        let manager = CameraManager::new(1.0);
        let mut rig = manager.create_rig("default", "orbit");
        let start = rig.camera.position;
        let distance = start.length();

        rig.controls.as_mut().unwrap().rotate(200.0, 0.0);
        for _ in 0..120 {
            rig.update(1.0 / 60.0);
        }

        assert_ne!(rig.camera.position, start);
        assert_relative_eq!(rig.camera.position.length(), distance, epsilon = 1e-3);

        let controls = rig.controls.as_mut().unwrap();
        controls.zoom(1000.0);
        for _ in 0..120 {
            controls.update(1.0 / 60.0, &mut rig.camera);
        }
        assert_relative_eq!(controls.distance(), 100.0, epsilon = 1e-2);
    }

    #[test]
    fn test_auto_rotate_spins_without_input() {
        let manager = CameraManager::new(1.0);
        let mut rig = manager.create_rig("default", "auto_orbit");
        let before = rig.controls.as_ref().unwrap().azimuth();

        rig.update(0.5);

        assert!(rig.controls.as_ref().unwrap().azimuth() > before);
    }

    #[test]
    fn test_zero_height_viewport_is_ignored() {
        let mut camera = Camera::from_preset(CAMERA_PRESETS[0].1, 2.0);
        camera.set_viewport(800, 0);
        assert_eq!(camera.aspect, 2.0);
        camera.set_viewport(800, 400);
        assert_eq!(camera.aspect, 2.0);
        camera.set_viewport(300, 300);
        assert_eq!(camera.aspect, 1.0);
    }
}
