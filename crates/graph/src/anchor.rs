use layout_protocol::{NodeHandle, SceneNode};

pub const DEFAULT_ANCHOR_NAME: &str = "Canvas";

/// Parent for root-level records: the first root child called `preferred`,
/// else the first root child, else the scene root itself.
pub fn find_anchor(root: &SceneNode, preferred: &str) -> Option<NodeHandle> {
    let usable = |node: &&SceneNode| !node.handle.is_empty();

    if let Some(named) = root
        .children
        .iter()
        .filter(usable)
        .find(|child| child.name == preferred)
    {
        return Some(named.handle.clone());
    }

    if let Some(first) = root.children.iter().find(usable) {
        log::debug!(
            "No \"{preferred}\" under the scene root, anchoring at \"{}\"",
            first.name
        );
        return Some(first.handle.clone());
    }

    if root.handle.is_empty() {
        None
    } else {
        Some(root.handle.clone())
    }
}
