//! In-memory editor: a scene tree plus asset registry that answers the host
//! contract synchronously. Backs the offline `--scene` mode and the tests.

use crate::host::{
    AssetDb, AssetInfo, AssetMeta, ComponentDump, HostError, HostResult, NodeDump, NodeHandle,
    PropertyDump, SceneHost, SceneNode, SceneScript,
};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

const ROOT_HANDLE: &str = "scene-root";

/// Which parts of the editor API the memory host pretends to support.
#[derive(Debug, Clone)]
pub struct MemoryBehavior {
    /// `false` makes `query-node-tree` report no open scene.
    pub scene_open: bool,
    /// `execute-scene-script` support.
    pub scripts: bool,
    /// `move-node` support; when off every move answers `false`.
    pub moves: bool,
    /// `set-property` paths (matched by suffix) answered with `false`.
    pub rejected_paths: Vec<String>,
    /// Node names whose `create-node` returns no handle.
    pub failing_creates: Vec<String>,
}

impl Default for MemoryBehavior {
    fn default() -> Self {
        Self {
            scene_open: true,
            scripts: false,
            moves: true,
            rejected_paths: Vec::new(),
            failing_creates: Vec::new(),
        }
    }
}

/// Every request the host received, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    QueryTree,
    QueryNode(String),
    CreateNode { parent: String, name: String },
    CreateComponent { node: String, component: String },
    SetProperty { node: String, path: String },
    MoveNode { node: String, parent: String, index: usize },
    Script(String),
    Refresh(String),
    AssetInfo(String),
    AssetMeta(String),
}

impl HostCall {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            HostCall::CreateNode { .. }
                | HostCall::CreateComponent { .. }
                | HostCall::SetProperty { .. }
                | HostCall::MoveNode { .. }
                | HostCall::Script(_)
        )
    }
}

#[derive(Debug, Clone)]
struct MemComponent {
    type_name: String,
    properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
struct MemNode {
    name: String,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
    components: Vec<MemComponent>,
    properties: BTreeMap<String, Value>,
}

impl MemNode {
    fn new(name: &str, parent: Option<NodeHandle>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            components: Vec::new(),
            properties: BTreeMap::new(),
        }
    }
}

#[derive(Debug)]
struct SceneState {
    root: NodeHandle,
    nodes: HashMap<NodeHandle, MemNode>,
    next_id: u64,
    calls: Vec<HostCall>,
    assets: HashMap<String, AssetInfo>,
    metas: HashMap<String, AssetMeta>,
}

impl SceneState {
    fn fresh_handle(&mut self) -> NodeHandle {
        loop {
            self.next_id += 1;
            let handle = NodeHandle::new(format!("node-{}", self.next_id));
            if !self.nodes.contains_key(&handle) {
                return handle;
            }
        }
    }

    fn insert_snapshot(&mut self, node: &SceneNode, parent: Option<NodeHandle>) -> NodeHandle {
        let handle = if node.handle.is_empty() || self.nodes.contains_key(&node.handle) {
            self.fresh_handle()
        } else {
            node.handle.clone()
        };
        self.nodes
            .insert(handle.clone(), MemNode::new(&node.name, parent));
        for child in &node.children {
            let child_handle = self.insert_snapshot(child, Some(handle.clone()));
            if let Some(mem) = self.nodes.get_mut(&handle) {
                mem.children.push(child_handle);
            }
        }
        handle
    }

    fn snapshot_of(&self, handle: &NodeHandle) -> Option<SceneNode> {
        let node = self.nodes.get(handle)?;
        Some(SceneNode {
            name: node.name.clone(),
            handle: handle.clone(),
            children: node
                .children
                .iter()
                .filter_map(|child| self.snapshot_of(child))
                .collect(),
        })
    }

    fn is_ancestor(&self, candidate: &NodeHandle, of: &NodeHandle) -> bool {
        let mut cursor = self.nodes.get(of).and_then(|n| n.parent.clone());
        while let Some(current) = cursor {
            if &current == candidate {
                return true;
            }
            cursor = self.nodes.get(&current).and_then(|n| n.parent.clone());
        }
        false
    }

    fn place(&mut self, node: &NodeHandle, parent: &NodeHandle, index: usize) -> bool {
        if node == parent || self.is_ancestor(node, parent) || !self.nodes.contains_key(parent) {
            return false;
        }
        let Some(old_parent) = self.nodes.get(node).map(|n| n.parent.clone()) else {
            return false;
        };
        if let Some(old) = old_parent.and_then(|p| self.nodes.get_mut(&p)) {
            old.children.retain(|child| child != node);
        }
        if let Some(new_parent) = self.nodes.get_mut(parent) {
            let at = index.min(new_parent.children.len());
            new_parent.children.insert(at, node.clone());
        }
        if let Some(mem) = self.nodes.get_mut(node) {
            mem.parent = Some(parent.clone());
        }
        true
    }
}

/// Reference implementation of [`SceneHost`] and [`AssetDb`].
#[derive(Debug)]
pub struct MemoryHost {
    state: Mutex<SceneState>,
    behavior: MemoryBehavior,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::empty()
    }
}

impl MemoryHost {
    /// A scene root with no children.
    pub fn empty() -> Self {
        Self::from_snapshot(&SceneNode::new("scene", ROOT_HANDLE))
    }

    /// Load a tree; nodes without a usable handle get a generated one.
    pub fn from_snapshot(root: &SceneNode) -> Self {
        let mut state = SceneState {
            root: NodeHandle::new(ROOT_HANDLE),
            nodes: HashMap::new(),
            next_id: 0,
            calls: Vec::new(),
            assets: HashMap::new(),
            metas: HashMap::new(),
        };
        state.root = state.insert_snapshot(root, None);
        Self {
            state: Mutex::new(state),
            behavior: MemoryBehavior::default(),
        }
    }

    pub fn with_behavior(mut self, behavior: MemoryBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SceneState> {
        self.state.lock().expect("memory host mutex poisoned")
    }

    pub fn register_asset(&self, db_path: &str, uuid: &str) {
        self.lock().assets.insert(
            db_path.to_string(),
            AssetInfo {
                uuid: Some(uuid.to_string()),
                ..AssetInfo::default()
            },
        );
    }

    pub fn register_meta(&self, db_path: &str, meta: AssetMeta) {
        self.lock().metas.insert(db_path.to_string(), meta);
    }

    pub fn root(&self) -> NodeHandle {
        self.lock().root.clone()
    }

    pub fn snapshot(&self) -> SceneNode {
        let state = self.lock();
        let root = state.root.clone();
        state
            .snapshot_of(&root)
            .unwrap_or_else(|| SceneNode::new("scene", root))
    }

    /// First node with `name` in depth-first order below the root.
    pub fn find(&self, name: &str) -> Option<NodeHandle> {
        fn walk(node: &SceneNode, name: &str) -> Option<NodeHandle> {
            for child in &node.children {
                if child.name == name {
                    return Some(child.handle.clone());
                }
                if let Some(found) = walk(child, name) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.snapshot(), name)
    }

    pub fn child_names(&self, parent: &NodeHandle) -> Vec<String> {
        let state = self.lock();
        state
            .nodes
            .get(parent)
            .map(|node| {
                node.children
                    .iter()
                    .filter_map(|child| state.nodes.get(child).map(|c| c.name.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Stored value of a node property or `__comps__.<i>.<prop>` path.
    pub fn property(&self, node: &NodeHandle, path: &str) -> Option<Value> {
        let state = self.lock();
        let mem = state.nodes.get(node)?;
        match split_component_path(path) {
            Some((index, prop)) => mem.components.get(index)?.properties.get(prop).cloned(),
            None => mem.properties.get(path).cloned(),
        }
    }

    pub fn component_types(&self, node: &NodeHandle) -> Vec<String> {
        self.lock()
            .nodes
            .get(node)
            .map(|n| n.components.iter().map(|c| c.type_name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.lock().calls.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.is_mutation()).count()
    }

    fn record(&self, call: HostCall) {
        self.lock().calls.push(call);
    }

    fn rejects(&self, path: &str) -> bool {
        self.behavior
            .rejected_paths
            .iter()
            .any(|suffix| path.ends_with(suffix.as_str()))
    }
}

/// `__comps__.3._spriteFrame` → `(3, "spriteFrame")`; backing-field spellings
/// land on the same property.
fn split_component_path(path: &str) -> Option<(usize, &str)> {
    let rest = path.strip_prefix("__comps__.")?;
    let (index, prop) = rest.split_once('.')?;
    let index = index.parse::<usize>().ok()?;
    Some((index, prop.trim_start_matches('_')))
}

#[async_trait]
impl SceneHost for MemoryHost {
    async fn query_node_tree(&self) -> HostResult<Option<SceneNode>> {
        self.record(HostCall::QueryTree);
        if !self.behavior.scene_open {
            return Ok(None);
        }
        Ok(Some(self.snapshot()))
    }

    async fn query_node(&self, node: &NodeHandle) -> HostResult<Option<NodeDump>> {
        self.record(HostCall::QueryNode(node.to_string()));
        let state = self.lock();
        Ok(state.nodes.get(node).map(|mem| NodeDump {
            name: mem.name.clone(),
            components: mem
                .components
                .iter()
                .map(|comp| ComponentDump {
                    type_name: comp.type_name.clone(),
                    value: Value::Object(
                        comp.properties
                            .iter()
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect::<Map<String, Value>>(),
                    ),
                })
                .collect(),
        }))
    }

    async fn create_node(
        &self,
        parent: &NodeHandle,
        name: &str,
    ) -> HostResult<Option<NodeHandle>> {
        self.record(HostCall::CreateNode {
            parent: parent.to_string(),
            name: name.to_string(),
        });
        if self.behavior.failing_creates.iter().any(|n| n == name) {
            return Ok(None);
        }
        let mut state = self.lock();
        if !state.nodes.contains_key(parent) {
            return Err(HostError::Rejected {
                method: "create-node".to_string(),
                message: format!("unknown parent {parent}"),
            });
        }
        let handle = state.fresh_handle();
        state
            .nodes
            .insert(handle.clone(), MemNode::new(name, Some(parent.clone())));
        if let Some(parent_node) = state.nodes.get_mut(parent) {
            parent_node.children.push(handle.clone());
        }
        Ok(Some(handle))
    }

    async fn create_component(&self, node: &NodeHandle, component: &str) -> HostResult<()> {
        self.record(HostCall::CreateComponent {
            node: node.to_string(),
            component: component.to_string(),
        });
        let mut state = self.lock();
        let Some(mem) = state.nodes.get_mut(node) else {
            return Err(HostError::Rejected {
                method: "create-component".to_string(),
                message: format!("unknown node {node}"),
            });
        };
        if !mem.components.iter().any(|c| c.type_name == component) {
            mem.components.push(MemComponent {
                type_name: component.to_string(),
                properties: BTreeMap::new(),
            });
        }
        Ok(())
    }

    async fn set_property(
        &self,
        node: &NodeHandle,
        path: &str,
        dump: PropertyDump,
    ) -> HostResult<bool> {
        self.record(HostCall::SetProperty {
            node: node.to_string(),
            path: path.to_string(),
        });
        if self.rejects(path) {
            return Ok(false);
        }
        let mut state = self.lock();
        if path == "siblingIndex" {
            let Some(index) = dump.value.as_u64() else {
                return Ok(false);
            };
            let Some(parent) = state.nodes.get(node).and_then(|n| n.parent.clone()) else {
                return Ok(false);
            };
            return Ok(state.place(node, &parent, index as usize));
        }
        let Some(mem) = state.nodes.get_mut(node) else {
            return Ok(false);
        };
        match split_component_path(path) {
            Some((index, prop)) => match mem.components.get_mut(index) {
                Some(comp) => {
                    comp.properties.insert(prop.to_string(), dump.value);
                    Ok(true)
                }
                None => Ok(false),
            },
            None => {
                mem.properties.insert(path.to_string(), dump.value);
                Ok(true)
            }
        }
    }

    async fn move_node(
        &self,
        node: &NodeHandle,
        parent: &NodeHandle,
        index: usize,
    ) -> HostResult<bool> {
        self.record(HostCall::MoveNode {
            node: node.to_string(),
            parent: parent.to_string(),
            index,
        });
        if !self.behavior.moves {
            return Ok(false);
        }
        Ok(self.lock().place(node, parent, index))
    }

    async fn execute_scene_script(&self, script: SceneScript) -> HostResult<bool> {
        self.record(HostCall::Script(script.name.clone()));
        if !self.behavior.scripts {
            return Err(HostError::Rejected {
                method: "execute-scene-script".to_string(),
                message: format!("no scene script named {}", script.name),
            });
        }
        let node = script.args.first().and_then(Value::as_str).map(NodeHandle::from);
        let frame = script.args.get(1).and_then(Value::as_str).map(str::to_string);
        let index = script.args.get(2).and_then(Value::as_u64).map(|i| i as usize);
        let (Some(node), Some(frame), Some(index)) = (node, frame, index) else {
            return Ok(false);
        };
        let mut state = self.lock();
        let Some(comp) = state
            .nodes
            .get_mut(&node)
            .and_then(|mem| mem.components.get_mut(index))
        else {
            return Ok(false);
        };
        comp.properties
            .insert("spriteFrame".to_string(), json!({ "uuid": frame }));
        comp.properties.insert("sizeMode".to_string(), json!(2));
        Ok(true)
    }
}

#[async_trait]
impl AssetDb for MemoryHost {
    async fn refresh_asset(&self, db_path: &str) -> HostResult<()> {
        self.record(HostCall::Refresh(db_path.to_string()));
        Ok(())
    }

    async fn query_asset_info(&self, db_path: &str) -> HostResult<Option<AssetInfo>> {
        self.record(HostCall::AssetInfo(db_path.to_string()));
        Ok(self.lock().assets.get(db_path).cloned())
    }

    async fn query_asset_meta(&self, db_path: &str) -> HostResult<Option<AssetMeta>> {
        self.record(HostCall::AssetMeta(db_path.to_string()));
        Ok(self.lock().metas.get(db_path).cloned())
    }
}
