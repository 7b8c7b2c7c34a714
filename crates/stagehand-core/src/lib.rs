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

//! # Stagehand Core
//!
//! Foundational crate containing the contracts every other Stagehand crate
//! builds on.
//!
//! - [`resource`]: the GPU handle model. Handles are allocated and released
//!   through a [`resource::RenderDevice`]; every owner of handles implements
//!   [`resource::Disposable`], and graph teardown goes through a
//!   [`resource::ReleaseSet`] so shared handles are released exactly once.
//! - [`scene`]: scene-graph nodes and the geometry, material, texture and
//!   light descriptors they carry.
//! - [`asset`]: decoded assets and the [`asset::ResourceTemplate`] they are
//!   cached as. Templates are never attached to a scene directly; callers
//!   instantiate independent copies.
//! - [`params`]: flat parameter sets used as debug objects by tuning UIs.

#![warn(missing_docs)]

pub mod asset;
pub mod error;
pub mod math;
pub mod params;
pub mod resource;
pub mod scene;

pub use error::ResourceError;
