use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DramaError, ErrorKind};
use crate::palette::{Color, TextStyle};

/// Field names understood inside a structured `key value;;key value` record.
pub const RECORD_FIELDS: &[&str] = &["text", "role", "fore", "back", "style", "delay"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Directive {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn from_tokens<I, S>(tokens: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens = tokens.into_iter().map(Into::into);
        let name = tokens.next()?;
        Some(Self {
            name,
            args: tokens.collect(),
        })
    }

    pub fn tokens(&self) -> Vec<&str> {
        std::iter::once(self.name.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LineUnit {
    Text {
        content: String,
        #[serde(default, skip_serializing_if = "is_false")]
        continues: bool,
    },
    Speech {
        role: String,
        content: String,
        #[serde(default, skip_serializing_if = "is_false")]
        continues: bool,
    },
    Directive(Directive),
    Record {
        fields: BTreeMap<String, String>,
    },
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl LineUnit {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
            continues: false,
        }
    }

    pub fn speech(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Speech {
            role: role.into(),
            content: content.into(),
            continues: false,
        }
    }

    /// True when the unit flows into the next one without an advance wait.
    pub fn continues(&self) -> bool {
        match self {
            Self::Text { continues, .. } | Self::Speech { continues, .. } => *continues,
            Self::Directive(_) | Self::Record { .. } => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Speech { .. } => "speech",
            Self::Directive(_) => "directive",
            Self::Record { .. } => "record",
        }
    }
}

/// Compiled script: built once, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    lines: Vec<LineUnit>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, unit: LineUnit) {
        self.lines.push(unit);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LineUnit> {
        self.lines.get(index)
    }

    pub fn lines(&self) -> &[LineUnit] {
        &self.lines
    }
}

impl FromIterator<LineUnit> for Script {
    fn from_iter<T: IntoIterator<Item = LineUnit>>(iter: T) -> Self {
        Self {
            lines: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default, rename = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleRegistry {
    roles: BTreeMap<String, Role>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> Result<Self, DramaError> {
        serde_json::from_str::<BTreeMap<String, Role>>(text)
            .map(Self::from)
            .map_err(|error| {
                DramaError::new(
                    ErrorKind::InvalidManifest,
                    format!("Failed to parse role registry: {}", error),
                )
            })
    }

    pub fn insert(&mut self, id: impl Into<String>, role: Role) {
        self.roles.insert(id.into(), role);
    }

    pub fn get(&self, id: &str) -> Option<&Role> {
        self.roles.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.roles.contains_key(id)
    }

    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.roles
            .get(id)
            .and_then(|role| role.display_name.as_deref())
            .unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl From<BTreeMap<String, Role>> for RoleRegistry {
    fn from(roles: BTreeMap<String, Role>) -> Self {
        Self { roles }
    }
}

/// One presentation instruction produced by the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    /// Typewriter text: one character at a time, `delay` between characters.
    Type {
        text: String,
        style: TextStyle,
        delay: Duration,
    },
    BlankLines(u32),
    /// Closes the line the reader just acknowledged.
    LineBreak,
    /// Continue marker shown while waiting for the advance signal.
    Prompt,
    Sleep(Duration),
    EndMessage(String),
}
