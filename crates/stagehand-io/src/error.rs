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

//! Error type for asset loading.

use stagehand_core::ResourceError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while requesting or decoding assets.
///
/// The type is `Clone` because a single decode outcome is delivered to every
/// caller that joined it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// No loader is registered for the requested format tag.
    #[error("no loader registered for format '{format}'")]
    UnknownFormat {
        /// The requested tag.
        format: String,
    },

    /// The bytes could not be decoded.
    #[error("failed to decode '{path}': {reason}")]
    DecodeFailure {
        /// Source path.
        path: String,
        /// Decoder message.
        reason: String,
    },

    /// The bytes could not be read (missing file, I/O or network failure).
    #[error("failed to read '{path}': {reason}")]
    Source {
        /// Source path.
        path: String,
        /// Underlying message.
        reason: String,
    },

    /// The file uses a feature no installed codec can handle.
    #[error("'{path}' requires unsupported feature: {feature}")]
    UnsupportedFeature {
        /// Source path.
        path: String,
        /// What is missing.
        feature: String,
    },

    /// The loader was disposed and cannot be used again.
    #[error("loader for '{format}' has been disposed")]
    LoaderDisposed {
        /// The loader's tag.
        format: String,
    },

    /// The asset cache was disposed and cannot be used again.
    #[error("asset cache has been disposed")]
    CacheDisposed,

    /// The decode task ended without publishing a result (it panicked or
    /// the runtime shut down).
    #[error("decode task ended before publishing a result")]
    Interrupted,

    /// The caller stopped waiting. The decode itself keeps running.
    #[error("gave up waiting for '{path}' after {waited:?}")]
    TimedOut {
        /// Source path.
        path: String,
        /// How long the caller waited.
        waited: Duration,
    },

    /// A template could not produce a copy.
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

impl LoadError {
    /// Builds a [`LoadError::DecodeFailure`].
    pub fn decode(path: &str, reason: impl std::fmt::Display) -> Self {
        LoadError::DecodeFailure {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` if issuing the same request again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LoadError::DecodeFailure { .. }
                | LoadError::Source { .. }
                | LoadError::Interrupted
                | LoadError::TimedOut { .. }
        )
    }
}
