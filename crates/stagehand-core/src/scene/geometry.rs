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

//! Geometry descriptors.

use crate::math::Vec3;
use crate::params::{ParamSet, ParamValue, Tunable};
use crate::resource::{GpuHandle, RenderDevice, ResourceKind};
use std::sync::Arc;

/// Indexed triangle data produced by model decoders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Optional per-vertex normals.
    pub normals: Option<Vec<Vec3>>,
    /// Optional per-vertex texture coordinates.
    pub uvs: Option<Vec<[f32; 2]>>,
    /// Optional triangle indices.
    pub indices: Option<Vec<u32>>,
}

impl MeshData {
    /// Number of triangles, indexed or not.
    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }
}

/// Gaussian splat / point-cloud data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloudData {
    /// Splat centers.
    pub positions: Vec<Vec3>,
    /// Per-splat scale.
    pub scales: Vec<Vec3>,
    /// Per-splat RGBA color.
    pub colors: Vec<[u8; 4]>,
    /// Per-splat rotation, quantized quaternion.
    pub rotations: Vec<[u8; 4]>,
}

impl PointCloudData {
    /// Number of splats.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns `true` if there are no splats.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// What a [`Geometry`] is built from.
///
/// Procedural shapes keep their construction parameters so a tuning UI can
/// edit them; decoded data is shared immutably between copies.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryShape {
    /// An axis-aligned box.
    Box {
        /// Size along x.
        width: f32,
        /// Size along y.
        height: f32,
        /// Size along z.
        depth: f32,
    },
    /// A UV sphere.
    Sphere {
        /// Radius.
        radius: f32,
        /// Horizontal segments.
        width_segments: u32,
        /// Vertical segments.
        height_segments: u32,
    },
    /// A flat rectangle in the xy plane.
    Plane {
        /// Size along x.
        width: f32,
        /// Size along y.
        height: f32,
    },
    /// A capped cylinder or cone.
    Cylinder {
        /// Top radius.
        radius_top: f32,
        /// Bottom radius.
        radius_bottom: f32,
        /// Height.
        height: f32,
        /// Segments around the axis.
        radial_segments: u32,
    },
    /// A flat disc.
    Circle {
        /// Radius.
        radius: f32,
        /// Segments around the rim.
        segments: u32,
    },
    /// Decoded triangle data.
    Mesh(Arc<MeshData>),
    /// Decoded splat data.
    Points(Arc<PointCloudData>),
}

impl GeometryShape {
    /// A unit box.
    pub fn unit_box() -> Self {
        GeometryShape::Box {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        }
    }

    /// Number of vertices the shape expands to.
    pub fn vertex_count(&self) -> usize {
        match self {
            GeometryShape::Box { .. } => 24,
            GeometryShape::Sphere {
                width_segments,
                height_segments,
                ..
            } => (*width_segments as usize + 1) * (*height_segments as usize + 1),
            GeometryShape::Plane { .. } => 4,
            GeometryShape::Cylinder {
                radial_segments, ..
            } => {
                let r = *radial_segments as usize;
                (r + 1) * 2 + 2 * (2 * r + 1)
            }
            GeometryShape::Circle { segments, .. } => *segments as usize + 2,
            GeometryShape::Mesh(mesh) => mesh.positions.len(),
            GeometryShape::Points(points) => points.len(),
        }
    }
}

impl Tunable for GeometryShape {
    fn params(&self) -> ParamSet {
        let f = ParamValue::Float;
        match self {
            GeometryShape::Box {
                width,
                height,
                depth,
            } => ParamSet::new()
                .with("width", f(*width))
                .with("height", f(*height))
                .with("depth", f(*depth)),
            GeometryShape::Sphere {
                radius,
                width_segments,
                height_segments,
            } => ParamSet::new()
                .with("radius", f(*radius))
                .with("width_segments", f(*width_segments as f32))
                .with("height_segments", f(*height_segments as f32)),
            GeometryShape::Plane { width, height } => ParamSet::new()
                .with("width", f(*width))
                .with("height", f(*height)),
            GeometryShape::Cylinder {
                radius_top,
                radius_bottom,
                height,
                radial_segments,
            } => ParamSet::new()
                .with("radius_top", f(*radius_top))
                .with("radius_bottom", f(*radius_bottom))
                .with("height", f(*height))
                .with("radial_segments", f(*radial_segments as f32)),
            GeometryShape::Circle { radius, segments } => ParamSet::new()
                .with("radius", f(*radius))
                .with("segments", f(*segments as f32)),
            GeometryShape::Mesh(_) | GeometryShape::Points(_) => ParamSet::new(),
        }
    }

    fn apply_params(&mut self, params: &ParamSet) {
        let set = |slot: &mut f32, key: &str| {
            if let Some(v) = params.float(key) {
                *slot = v.max(0.0);
            }
        };
        // Segment counts below 3 produce degenerate shapes.
        let set_segments = |slot: &mut u32, key: &str| {
            if let Some(v) = params.float(key) {
                *slot = (v.round() as u32).max(3);
            }
        };
        match self {
            GeometryShape::Box {
                width,
                height,
                depth,
            } => {
                set(width, "width");
                set(height, "height");
                set(depth, "depth");
            }
            GeometryShape::Sphere {
                radius,
                width_segments,
                height_segments,
            } => {
                set(radius, "radius");
                set_segments(width_segments, "width_segments");
                set_segments(height_segments, "height_segments");
            }
            GeometryShape::Plane { width, height } => {
                set(width, "width");
                set(height, "height");
            }
            GeometryShape::Cylinder {
                radius_top,
                radius_bottom,
                height,
                radial_segments,
            } => {
                set(radius_top, "radius_top");
                set(radius_bottom, "radius_bottom");
                set(height, "height");
                set_segments(radial_segments, "radial_segments");
            }
            GeometryShape::Circle { radius, segments } => {
                set(radius, "radius");
                set_segments(segments, "segments");
            }
            GeometryShape::Mesh(_) | GeometryShape::Points(_) => {}
        }
    }
}

/// Vertex and index buffers resident on the GPU.
#[derive(Debug)]
pub struct Geometry {
    handle: GpuHandle,
    label: String,
    /// What the buffers were built from.
    pub shape: GeometryShape,
}

impl Geometry {
    /// Builds the buffers for `shape`, allocating a new handle.
    pub fn new(device: &dyn RenderDevice, label: &str, shape: GeometryShape) -> Self {
        Self {
            handle: device.allocate(ResourceKind::Geometry, label),
            label: label.to_string(),
            shape,
        }
    }

    /// The owned handle.
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Builds the same shape again under a fresh handle.
    pub fn duplicate(&self, device: &dyn RenderDevice) -> Self {
        Self::new(device, &self.label, self.shape.clone())
    }
}
