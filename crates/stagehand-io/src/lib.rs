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

//! # Stagehand IO
//!
//! Turns `(format, path)` requests into cached [`ResourceTemplate`]s.
//!
//! The pieces, bottom up:
//!
//! - [`source`]: where bytes come from ([`FileSource`], [`MemorySource`]).
//! - [`decoders`]: one synchronous [`Decoder`] per file format.
//! - [`loader`]: [`FormatLoader`], the async per-format contract, and
//!   [`CachedLoader`], which wraps a decoder with a local pending/ready cache
//!   and hands every caller its own copy.
//! - [`registry`]: the format tag to loader map.
//! - [`cache`]: [`AssetCache`], the application-wide deduplicating cache.
//!
//! Both caches are built on [`InFlightMap`], which guarantees that a key is
//! decoded at most once while a decode is in flight and that every waiter
//! observes the same outcome.
//!
//! [`ResourceTemplate`]: stagehand_core::asset::ResourceTemplate

#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod decoders;
pub mod error;
pub mod inflight;
pub mod loader;
pub mod registry;
pub mod source;

pub use cache::{AssetCache, CacheKey};
pub use config::LoaderConfig;
pub use decoders::Decoder;
pub use error::LoadError;
pub use inflight::{EntryState, InFlightMap, LoadStats};
pub use loader::{CachedLoader, FormatLoader};
pub use registry::LoaderRegistry;
pub use source::{AssetSource, FileSource, MemorySource};
