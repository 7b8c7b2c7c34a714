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

//! The GPU handle model.
//!
//! A [`GpuHandle`] stands for one native graphics object (buffer, texture,
//! program, light uniform block). Handles are produced by a [`RenderDevice`]
//! and must be handed back to it exactly once. Each handle has exactly one
//! owner, and that owner implements [`Disposable`].

mod device;
mod dispose;
mod handle;

pub use device::{LedgerEvent, RenderDevice, ResourceLedger};
pub use dispose::{Disposable, ReleaseSet};
pub use handle::{GpuHandle, ResourceKind};
