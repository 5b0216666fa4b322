use crate::binding::{BindingProfile, SpriteBinder};
use crate::error::{ImportError, Result};
use crate::order::OrderEnforcer;
use crate::reconciler::{ImageBindings, Reconciler};
use crate::resolver::SpriteFrameResolver;
use layout_graph::{find_anchor, TargetIndex, DEFAULT_ANCHOR_NAME};
use layout_indexer::{ImportedImages, ResourceImporter};
use layout_protocol::{
    AssetDb, ImportOptions, ReconcileOutcome, ReconcileReport, SceneHost, SceneNode,
    SettlePolicy,
};
use layout_records::{load_records, Grouping};
use std::path::Path;
use std::sync::Arc;

/// One CSV file in, one report out.
///
/// ```no_run
/// use layout_engine::LayoutSync;
/// use layout_protocol::{ImportOptions, MemoryHost};
/// use std::sync::Arc;
///
/// # async fn run() {
/// let host = Arc::new(MemoryHost::empty());
/// let sync = LayoutSync::new(host.clone(), host);
/// let options = ImportOptions { auto_create: true, ..ImportOptions::default() };
/// let report = sync.import_csv("layout.csv", &options).await;
/// println!("{}", report.summary());
/// # }
/// ```
pub struct LayoutSync {
    host: Arc<dyn SceneHost>,
    assets: Arc<dyn AssetDb>,
    settle: SettlePolicy,
    binding: BindingProfile,
    anchor_name: String,
}

impl LayoutSync {
    pub fn new(host: Arc<dyn SceneHost>, assets: Arc<dyn AssetDb>) -> Self {
        Self {
            host,
            assets,
            settle: SettlePolicy::default(),
            binding: BindingProfile::default(),
            anchor_name: DEFAULT_ANCHOR_NAME.to_string(),
        }
    }

    pub fn with_settle(mut self, settle: SettlePolicy) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_binding(mut self, binding: BindingProfile) -> Self {
        self.binding = binding;
        self
    }

    pub fn with_anchor_name(mut self, name: impl Into<String>) -> Self {
        self.anchor_name = name.into();
        self
    }

    /// Never fails: fatal preconditions come back as `success: false`.
    pub async fn import_csv(
        &self,
        path: impl AsRef<Path>,
        options: &ImportOptions,
    ) -> ReconcileReport {
        match self.run(path.as_ref(), options).await {
            Ok(outcome) => {
                let report = ReconcileReport::completed(outcome);
                log::info!("Import finished: {}", report.summary());
                report
            }
            Err(e) => {
                log::error!("Import aborted: {e}");
                ReconcileReport::failure(e.to_string())
            }
        }
    }

    async fn run(&self, path: &Path, options: &ImportOptions) -> Result<ReconcileOutcome> {
        // Every fatal check happens before the first mutation.
        let records = load_records(path).await?;
        let tree = self.scene_tree().await?;
        let anchor = find_anchor(&tree, &self.anchor_name)
            .ok_or_else(|| ImportError::NoAnchor("scene has no usable root node".to_string()))?;
        log::info!("Anchoring root-level records at {anchor}");

        let mut index = TargetIndex::from_snapshot(&tree);
        let grouping = Grouping::from_records(&records);

        let imported = self.import_images(options).await;
        let binder = SpriteBinder::new(
            self.host.clone(),
            self.binding.clone(),
            self.settle.clone(),
        );
        let mut reconciler =
            Reconciler::new(self.host.clone(), binder, self.settle.clone(), options);
        let images_count = imported.as_ref().map_or(0, |imported| imported.images.len());
        if let Some(imported) = imported {
            reconciler = reconciler.with_images(ImageBindings {
                resolver: SpriteFrameResolver::new(
                    self.assets.clone(),
                    imported.db_path,
                    &self.binding,
                ),
                images: imported.images,
            });
        }

        let mut outcome = reconciler.run(&grouping, &mut index, &anchor).await;
        outcome.images_count = images_count;
        outcome.target_folder = options
            .images_target_folder
            .as_ref()
            .map(|folder| folder.display().to_string())
            .unwrap_or_default();

        if options.enforce_order {
            let enforcer = OrderEnforcer::new(self.host.clone(), self.settle.clone());
            outcome.reorder = Some(enforcer.enforce(&grouping, &index, &anchor).await);
        }
        Ok(outcome)
    }

    async fn scene_tree(&self) -> Result<SceneNode> {
        match self.host.query_node_tree().await {
            Ok(Some(tree)) => Ok(tree),
            Ok(None) => Err(ImportError::NoAnchor("no scene is open".to_string())),
            Err(e) => Err(ImportError::NoAnchor(format!("scene tree query failed: {e}"))),
        }
    }

    /// Image import problems never abort the run; the nodes are still placed.
    async fn import_images(&self, options: &ImportOptions) -> Option<ImportedImages> {
        let (source, target) = options.image_folders()?;
        let importer = ResourceImporter::new(self.assets.clone(), self.settle.clone());
        match importer
            .import(source, target, &options.project_path, options.keep_structure)
            .await
        {
            Ok(imported) => Some(imported),
            Err(e) => {
                log::warn!("Image import skipped: {e}");
                None
            }
        }
    }
}

