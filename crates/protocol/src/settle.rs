use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed waits standing in for completion signals the editor does not expose.
///
/// Every pause the engine takes is one of these fields; call sites never
/// sleep on their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlePolicy {
    /// After `create-node`, before the first property write on the new node.
    pub after_node_create_ms: u64,
    /// After `create-component`, before querying the node for its index.
    pub after_component_create_ms: u64,
    /// After `refresh-asset` on the import folder.
    pub after_refresh_ms: u64,
    /// Extra wait once the whole image import finished.
    pub after_import_ms: u64,
    /// After each sibling move in the ordering pass.
    pub between_moves_ms: u64,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            after_node_create_ms: 100,
            after_component_create_ms: 300,
            after_refresh_ms: 3_000,
            after_import_ms: 2_000,
            between_moves_ms: 50,
        }
    }
}

impl SettlePolicy {
    /// No waits at all; for hosts that apply mutations synchronously.
    pub fn immediate() -> Self {
        Self {
            after_node_create_ms: 0,
            after_component_create_ms: 0,
            after_refresh_ms: 0,
            after_import_ms: 0,
            between_moves_ms: 0,
        }
    }

    pub async fn after_node_create(&self) {
        pause(self.after_node_create_ms).await;
    }

    pub async fn after_component_create(&self) {
        pause(self.after_component_create_ms).await;
    }

    pub async fn after_refresh(&self) {
        pause(self.after_refresh_ms).await;
    }

    pub async fn after_import(&self) {
        pause(self.after_import_ms).await;
    }

    pub async fn between_moves(&self) {
        pause(self.between_moves_ms).await;
    }
}

async fn pause(ms: u64) {
    if ms == 0 {
        return;
    }
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
