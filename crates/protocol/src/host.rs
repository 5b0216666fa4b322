use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

pub type HostResult<T> = std::result::Result<T, HostError>;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Host rejected {method}: {message}")]
    Rejected { method: String, message: String },

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Malformed host response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Opaque node identifier issued by the editor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeHandle(String);

impl NodeHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeHandle {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for NodeHandle {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// One node of a `query-node-tree` snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "uuid", default = "empty_handle")]
    pub handle: NodeHandle,

    #[serde(default)]
    pub children: Vec<SceneNode>,
}

fn empty_handle() -> NodeHandle {
    NodeHandle::new("")
}

impl SceneNode {
    pub fn new(name: impl Into<String>, handle: impl Into<NodeHandle>) -> Self {
        Self {
            name: name.into(),
            handle: handle.into(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }
}

/// `query-node` result; only the component list matters to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDump {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "__comps__", default)]
    pub components: Vec<ComponentDump>,
}

impl NodeDump {
    /// Index of the first component whose type equals `component`.
    pub fn component_index(&self, component: &str) -> Option<usize> {
        self.components
            .iter()
            .position(|comp| comp.type_name == component)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDump {
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
}

/// Typed value written through `set-property`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDump {
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: Value,
}

impl PropertyDump {
    pub fn new(type_name: impl Into<String>, value: Value) -> Self {
        Self {
            type_name: type_name.into(),
            value,
        }
    }

    pub fn vec3(x: f64, y: f64, z: f64) -> Self {
        Self::new("cc.Vec3", json!({ "x": x, "y": y, "z": z }))
    }

    pub fn integer(value: i64) -> Self {
        Self::new("Number", json!(value))
    }

    /// Asset reference; `expected_type` adds the `__expectedType__` hint some
    /// editor versions require.
    pub fn asset_ref(type_name: &str, uuid: &str, expected_type: bool) -> Self {
        let value = if expected_type {
            json!({ "uuid": uuid, "__expectedType__": type_name })
        } else {
            json!({ "uuid": uuid })
        };
        Self::new(type_name, value)
    }
}

/// `execute-scene-script` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneScript {
    pub name: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetInfo {
    #[serde(default)]
    pub uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    /// Declared sub-assets in declaration order.
    #[serde(rename = "subMetas", default)]
    pub sub_metas: IndexMap<String, SubMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubMeta {
    #[serde(default)]
    pub uuid: Option<String>,
}

/// Scene tree service. Every call is one request/response round trip; the
/// editor gives no guarantee that a mutation is visible to the next query.
#[async_trait]
pub trait SceneHost: Send + Sync {
    /// Full tree from the scene root, `None` when no scene is open.
    async fn query_node_tree(&self) -> HostResult<Option<SceneNode>>;

    async fn query_node(&self, node: &NodeHandle) -> HostResult<Option<NodeDump>>;

    async fn create_node(&self, parent: &NodeHandle, name: &str)
        -> HostResult<Option<NodeHandle>>;

    async fn create_component(&self, node: &NodeHandle, component: &str) -> HostResult<()>;

    /// `Ok(false)` means the editor refused the write.
    async fn set_property(
        &self,
        node: &NodeHandle,
        path: &str,
        dump: PropertyDump,
    ) -> HostResult<bool>;

    async fn move_node(
        &self,
        node: &NodeHandle,
        parent: &NodeHandle,
        index: usize,
    ) -> HostResult<bool>;

    async fn execute_scene_script(&self, script: SceneScript) -> HostResult<bool>;
}

/// Asset registration service.
#[async_trait]
pub trait AssetDb: Send + Sync {
    async fn refresh_asset(&self, db_path: &str) -> HostResult<()>;

    async fn query_asset_info(&self, db_path: &str) -> HostResult<Option<AssetInfo>>;

    async fn query_asset_meta(&self, db_path: &str) -> HostResult<Option<AssetMeta>>;
}
