use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Layer,
    Group,
}

impl NodeKind {
    /// Exact, case-sensitive match on the type column.
    pub fn from_column(raw: &str) -> Option<Self> {
        match raw {
            "layer" => Some(Self::Layer),
            "group" => Some(Self::Group),
            _ => None,
        }
    }

    pub fn is_group(self) -> bool {
        self == Self::Group
    }
}

/// One CSV row: a named node, where it lives and where it sits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    pub name: String,
    pub kind: NodeKind,

    /// Literal parent path from the CSV; empty means the anchor.
    #[serde(default)]
    pub parent_path: String,

    pub x: f64,
    pub y: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl PositionRecord {
    pub fn layer(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Layer,
            parent_path: String::new(),
            x,
            y,
            width: None,
            height: None,
        }
    }

    pub fn group(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            kind: NodeKind::Group,
            ..Self::layer(name, x, y)
        }
    }

    pub fn under(mut self, parent_path: impl Into<String>) -> Self {
        self.parent_path = parent_path.into();
        self
    }

    pub fn is_root_level(&self) -> bool {
        self.parent_path.is_empty()
    }

    /// `parent/name`, or just `name` at root level.
    pub fn full_path(&self) -> String {
        if self.parent_path.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.parent_path, self.name)
        }
    }
}
