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

use std::fmt;

/// An opaque reference to a native GPU object.
///
/// Handles are plain values: copying one does not duplicate the GPU object.
/// Only the owner recorded in the resource model may release it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuHandle(u64);

impl GpuHandle {
    /// Wraps a raw id produced by a device.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GpuHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpu#{}", self.0)
    }
}

/// What kind of native object a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Vertex and index buffers.
    Geometry,
    /// A shader program plus its uniform state.
    Material,
    /// A sampled image.
    Texture,
    /// A prefiltered environment map.
    EnvironmentMap,
    /// The transient program used to prefilter environment maps.
    Generator,
    /// A light's uniform block and shadow resources.
    Light,
}
