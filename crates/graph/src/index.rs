use layout_protocol::{NodeHandle, SceneNode};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEntry {
    pub handle: NodeHandle,
    /// Slash-joined names from the first level below the scene root.
    pub full_path: String,
    /// Added locally after a create, not observed in the snapshot.
    pub synthetic: bool,
}

/// Name -> nodes, built once from a scene snapshot.
///
/// Entries sharing a name keep depth-first pre-order, so `first` is stable
/// for a given snapshot. The index only learns about nodes the caller
/// creates through [`TargetIndex::insert_created`].
#[derive(Debug, Clone, Default)]
pub struct TargetIndex {
    entries: HashMap<String, Vec<TargetEntry>>,
    version: u64,
}

impl TargetIndex {
    pub fn from_snapshot(root: &SceneNode) -> Self {
        let mut entries: HashMap<String, Vec<TargetEntry>> = HashMap::new();

        // (node, parent path); reversed pushes keep pre-order.
        let mut stack: Vec<(&SceneNode, String)> = root
            .children
            .iter()
            .rev()
            .map(|child| (child, String::new()))
            .collect();

        while let Some((node, parent_path)) = stack.pop() {
            let full_path = join_path(&parent_path, &node.name);
            for child in node.children.iter().rev() {
                stack.push((child, full_path.clone()));
            }
            if node.name.is_empty() || node.handle.is_empty() {
                continue;
            }
            entries.entry(node.name.clone()).or_default().push(TargetEntry {
                handle: node.handle.clone(),
                full_path,
                synthetic: false,
            });
        }

        let index = Self {
            entries,
            version: 0,
        };
        log::debug!(
            "Indexed {} scene nodes under {} distinct names",
            index.len(),
            index.entries.len()
        );
        index
    }

    /// First node carrying `name`, in snapshot traversal order.
    pub fn first(&self, name: &str) -> Option<&TargetEntry> {
        self.entries.get(name).and_then(|found| found.first())
    }

    pub fn all(&self, name: &str) -> &[TargetEntry] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Record a node created during this run. It is appended after any
    /// snapshot entries with the same name.
    pub fn insert_created(
        &mut self,
        name: impl Into<String>,
        handle: NodeHandle,
        full_path: impl Into<String>,
    ) {
        self.entries.entry(name.into()).or_default().push(TargetEntry {
            handle,
            full_path: full_path.into(),
            synthetic: true,
        });
        self.version += 1;
    }

    /// Number of local inserts since the snapshot was taken.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}
