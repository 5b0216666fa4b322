use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_true() -> bool {
    true
}

/// Caller options for one import run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptions {
    #[serde(default)]
    pub auto_create: bool,

    #[serde(default = "default_true")]
    pub update_position: bool,

    #[serde(default)]
    pub import_images: bool,

    #[serde(default)]
    pub images_source_folder: Option<PathBuf>,

    #[serde(default)]
    pub images_target_folder: Option<PathBuf>,

    #[serde(default)]
    pub project_path: PathBuf,

    /// Mirror the source folder's subdirectories under the target.
    #[serde(default = "default_true")]
    pub keep_structure: bool,

    /// Run the sibling ordering pass after reconciliation.
    #[serde(default = "default_true")]
    pub enforce_order: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            auto_create: false,
            update_position: true,
            import_images: false,
            images_source_folder: None,
            images_target_folder: None,
            project_path: PathBuf::new(),
            keep_structure: true,
            enforce_order: true,
        }
    }
}

impl ImportOptions {
    /// Source and target folders, only when image import is switched on and
    /// both are set.
    pub fn image_folders(&self) -> Option<(&PathBuf, &PathBuf)> {
        if !self.import_images {
            return None;
        }
        match (&self.images_source_folder, &self.images_target_folder) {
            (Some(source), Some(target)) => Some((source, target)),
            _ => None,
        }
    }
}

/// Sibling ordering pass summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReport {
    /// Parents whose children were re-sorted.
    pub parents: usize,
    /// Children placed by `move-node`.
    pub moved: usize,
    /// Children placed through the `siblingIndex` property.
    pub fallbacks: usize,
    /// Children neither strategy could place.
    #[serde(default)]
    pub failed: Vec<String>,
}

/// Counters of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub updated: usize,
    pub created: usize,
    pub images_set: usize,
    pub failed: Vec<String>,
    pub total: usize,
    pub images_count: usize,
    #[serde(default)]
    pub target_folder: String,
    /// Records whose parent group was never reached.
    #[serde(default)]
    pub skipped: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reorder: Option<OrderReport>,
}

/// What a run hands back: either the full counters or a fatal message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(flatten)]
    pub outcome: Option<ReconcileOutcome>,
}

impl ReconcileReport {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            outcome: None,
        }
    }

    pub fn completed(outcome: ReconcileOutcome) -> Self {
        Self {
            success: true,
            message: None,
            outcome: Some(outcome),
        }
    }

    /// One-line summary for logs and terminal output.
    pub fn summary(&self) -> String {
        match (&self.outcome, &self.message) {
            (Some(o), _) => format!(
                "updated {}, created {}, sprites {}, failed {}, skipped {} (of {})",
                o.updated,
                o.created,
                o.images_set,
                o.failed.len(),
                o.skipped.len(),
                o.total
            ),
            (None, Some(message)) => format!("import failed: {message}"),
            (None, None) => "import failed".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn failure_serializes_to_message_only() {
        let json = serde_json::to_value(ReconcileReport::failure("no rows")).unwrap();
        assert_eq!(json, serde_json::json!({ "success": false, "message": "no rows" }));
    }

    #[test]
    fn completed_report_flattens_counters_in_camel_case() {
        let report = ReconcileReport::completed(ReconcileOutcome {
            created: 2,
            total: 2,
            ..ReconcileOutcome::default()
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["created"], 2);
        assert_eq!(json["imagesSet"], 0);
        assert!(json["failed"].as_array().unwrap().is_empty());
    }

    #[test]
    fn options_default_to_updating_positions_and_ordering() {
        let options: ImportOptions = serde_json::from_str(r#"{"autoCreate":true}"#).unwrap();
        assert!(options.auto_create);
        assert!(options.update_position);
        assert!(options.enforce_order);
        assert!(options.image_folders().is_none());
    }
}
