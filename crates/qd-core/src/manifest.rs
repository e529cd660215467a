use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{DramaError, ErrorKind};
use crate::types::Role;

pub const MANIFEST_FILE_NAME: &str = "qd.json";

/// Project manifest (`qd.json`) at the root of a script directory or package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub index: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<RolesSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default, rename = "default-style")]
    pub default_style: DefaultStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RolesSource {
    Path(String),
    Inline(BTreeMap<String, Role>),
}

/// Initial render-state overrides. Keys the engine does not interpret (font, window
/// geometry, icon) are kept for presenters in `presentation`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultStyle {
    #[serde(default, alias = "fg", skip_serializing_if = "Option::is_none")]
    pub foreground: Option<String>,
    #[serde(default, alias = "bg", skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
    #[serde(default, rename = "blank-lines", skip_serializing_if = "Option::is_none")]
    pub blank_lines: Option<u32>,
    #[serde(flatten)]
    pub presentation: BTreeMap<String, JsonValue>,
}

impl Manifest {
    pub fn from_json_str(text: &str) -> Result<Self, DramaError> {
        serde_json::from_str(text).map_err(|error| {
            DramaError::new(
                ErrorKind::InvalidManifest,
                format!("Failed to parse {}: {}", MANIFEST_FILE_NAME, error),
            )
        })
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("untitled")
    }
}
