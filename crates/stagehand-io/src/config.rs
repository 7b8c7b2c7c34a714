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

//! Loader configuration.

use crate::source::FileSource;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for the default loader set.
///
/// Every field has a default, and unknown keys are ignored when
/// deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directory asset paths are relative to.
    pub asset_root: PathBuf,
    /// Upper bound on splats kept per file. `None` keeps all of them.
    pub max_splat_points: Option<usize>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            max_splat_points: None,
        }
    }
}

impl LoaderConfig {
    /// A [`FileSource`] rooted at [`LoaderConfig::asset_root`].
    pub fn file_source(&self) -> FileSource {
        FileSource::new(&self.asset_root)
    }
}
