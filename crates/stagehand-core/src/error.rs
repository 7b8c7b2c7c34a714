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

//! Error types for resource ownership.

use std::fmt;

/// An error raised when working with owned GPU resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The template was released (evicted or its owner disposed) and can no
    /// longer produce copies.
    TemplateReleased {
        /// Label of the released template, usually its source path.
        label: String,
    },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::TemplateReleased { label } => {
                write!(f, "Template '{label}' has been released")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_label() {
        let err = ResourceError::TemplateReleased {
            label: "models/chair.glb".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Template 'models/chair.glb' has been released"
        );
    }
}
