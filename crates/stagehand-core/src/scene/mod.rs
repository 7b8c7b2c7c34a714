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

//! Scene-graph nodes and the GPU-backed descriptors attached to them.
//!
//! Geometry, material and texture values own exactly one [`GpuHandle`] each
//! and are shared between nodes through `Arc`. Sharing a value shares the
//! handle, which is why graph teardown goes through
//! [`ReleaseSet`](crate::resource::ReleaseSet).
//!
//! [`GpuHandle`]: crate::resource::GpuHandle

pub mod geometry;
pub mod light;
pub mod material;
pub mod node;
pub mod texture;

pub use geometry::{Geometry, GeometryShape, MeshData, PointCloudData};
pub use light::{Light, LightKind};
pub use material::{Material, MaterialKind, MaterialParams, TextureSlot};
pub use node::{Mesh, NodeId, SceneNode, Transform};
pub use texture::{Texture, TextureData, TextureFormat, TextureMapping};
