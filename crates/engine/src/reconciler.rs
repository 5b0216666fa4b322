use crate::binding::SpriteBinder;
use crate::resolver::SpriteFrameResolver;
use layout_graph::TargetIndex;
use layout_indexer::ImageMap;
use layout_protocol::{
    ImportOptions, NodeHandle, PositionRecord, PropertyDump, ReconcileOutcome, SceneHost,
    SettlePolicy,
};
use layout_records::{GroupKey, Grouping};
use std::collections::HashSet;
use std::sync::Arc;

/// Imported images plus the resolver that maps them to sprite frames.
pub struct ImageBindings {
    pub resolver: SpriteFrameResolver,
    pub images: ImageMap,
}

/// Pending children of one expanded group.
struct Frame<'g> {
    records: &'g [PositionRecord],
    next: usize,
    parent: NodeHandle,
}

/// Walks the grouping top-down and makes each record's node exist at its
/// position.
pub struct Reconciler {
    host: Arc<dyn SceneHost>,
    binder: SpriteBinder,
    settle: SettlePolicy,
    auto_create: bool,
    update_position: bool,
    images: Option<ImageBindings>,
}

impl Reconciler {
    pub fn new(
        host: Arc<dyn SceneHost>,
        binder: SpriteBinder,
        settle: SettlePolicy,
        options: &ImportOptions,
    ) -> Self {
        Self {
            host,
            binder,
            settle,
            auto_create: options.auto_create,
            update_position: options.update_position,
            images: None,
        }
    }

    pub fn with_images(mut self, images: ImageBindings) -> Self {
        self.images = Some(images);
        self
    }

    /// Depth-first over the grouping starting at the root group. Every group
    /// key is expanded at most once, so the walk is bounded by the number of
    /// records even when parent paths form a cycle.
    pub async fn run(
        &self,
        grouping: &Grouping,
        index: &mut TargetIndex,
        anchor: &NodeHandle,
    ) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        let mut expanded: HashSet<GroupKey> = HashSet::new();
        let mut stack: Vec<Frame<'_>> = Vec::new();

        expanded.insert(GroupKey::Root);
        stack.push(Frame {
            records: grouping.root(),
            next: 0,
            parent: anchor.clone(),
        });

        while let Some(frame) = stack.last_mut() {
            let records = frame.records;
            let Some(record) = records.get(frame.next) else {
                stack.pop();
                continue;
            };
            frame.next += 1;
            let parent = frame.parent.clone();

            let Some(handle) = self.reconcile(record, &parent, index, &mut outcome).await else {
                continue;
            };
            if !record.kind.is_group() {
                continue;
            }

            let key = GroupKey::Path(record.name.clone());
            if !expanded.insert(key.clone()) {
                log::debug!("Group \"{key}\" already expanded, not descending again");
                continue;
            }
            let children = grouping.children_of(&key);
            if !children.is_empty() {
                stack.push(Frame {
                    records: children,
                    next: 0,
                    parent: handle,
                });
            }
        }

        for (key, records) in grouping.iter() {
            if expanded.contains(key) {
                continue;
            }
            log::info!(
                "Parent \"{key}\" was never reached, skipping {} records",
                records.len()
            );
            outcome
                .skipped
                .extend(records.iter().map(|record| record.name.clone()));
        }

        outcome.total = grouping.iter().map(|(_, records)| records.len()).sum();
        log::info!(
            "Reconciled {} records: {} updated, {} created, {} failed",
            outcome.total,
            outcome.updated,
            outcome.created,
            outcome.failed.len()
        );
        outcome
    }

    /// Update or create one record's node. Returns the node it ended up on.
    async fn reconcile(
        &self,
        record: &PositionRecord,
        parent: &NodeHandle,
        index: &mut TargetIndex,
        outcome: &mut ReconcileOutcome,
    ) -> Option<NodeHandle> {
        let frame = self.resolve_frame(record).await;

        if let Some(entry) = index.first(&record.name) {
            let handle = entry.handle.clone();
            if self.update_position {
                self.set_position(&handle, record).await;
            }
            if let Some(frame) = &frame {
                if self.binder.bind(&handle, frame).await {
                    outcome.images_set += 1;
                }
            }
            outcome.updated += 1;
            return Some(handle);
        }

        if !self.auto_create {
            log::warn!("No node named \"{}\" and creation is off", record.name);
            outcome.failed.push(record.name.clone());
            return None;
        }

        let handle = match self.host.create_node(parent, &record.name).await {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                log::warn!("Editor returned no node for \"{}\"", record.name);
                outcome.failed.push(record.name.clone());
                return None;
            }
            Err(e) => {
                log::warn!("create-node \"{}\" failed: {e}", record.name);
                outcome.failed.push(record.name.clone());
                return None;
            }
        };

        self.settle.after_node_create().await;
        self.set_position(&handle, record).await;
        if let Some(frame) = &frame {
            if self.binder.bind(&handle, frame).await {
                outcome.images_set += 1;
            }
        }

        log::debug!("Created \"{}\" as {handle} under {parent}", record.name);
        index.insert_created(record.name.clone(), handle.clone(), record.full_path());
        outcome.created += 1;
        Some(handle)
    }

    async fn resolve_frame(&self, record: &PositionRecord) -> Option<String> {
        if record.kind.is_group() {
            return None;
        }
        let bindings = self.images.as_ref()?;
        let image = bindings.images.get(&record.name)?;
        bindings.resolver.resolve(&record.name, image).await
    }

    async fn set_position(&self, node: &NodeHandle, record: &PositionRecord) {
        let dump = PropertyDump::vec3(record.x, record.y, 0.0);
        match self.host.set_property(node, "position", dump).await {
            Ok(true) => {}
            Ok(false) => log::warn!("Editor refused position for \"{}\"", record.name),
            Err(e) => log::warn!("Setting position of \"{}\" failed: {e}", record.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BindingProfile;
    use layout_protocol::{MemoryHost, SceneNode};
    use pretty_assertions::assert_eq;

    fn reconciler(host: &Arc<MemoryHost>, options: &ImportOptions) -> Reconciler {
        let settle = SettlePolicy::immediate();
        let binder = SpriteBinder::new(host.clone(), BindingProfile::default(), settle.clone());
        Reconciler::new(host.clone(), binder, settle, options)
    }

    fn creating() -> ImportOptions {
        ImportOptions {
            auto_create: true,
            ..ImportOptions::default()
        }
    }

    #[tokio::test]
    async fn self_parented_group_expands_once() {
        let host = Arc::new(MemoryHost::empty());
        let records = vec![
            PositionRecord::group("Loop", 0.0, 0.0),
            PositionRecord::group("Loop", 1.0, 1.0).under("Loop"),
        ];
        let grouping = Grouping::from_records(&records);
        let root = host.snapshot();
        let mut index = TargetIndex::from_snapshot(&root);

        let outcome = reconciler(&host, &creating())
            .run(&grouping, &mut index, &host.root())
            .await;

        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.updated, 1);
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.total, 2);
    }

    #[tokio::test]
    async fn unreached_parents_are_skipped_not_failed() {
        let host = Arc::new(MemoryHost::empty());
        let records = vec![
            PositionRecord::layer("A", 0.0, 0.0),
            PositionRecord::layer("Orphan", 0.0, 0.0).under("Missing"),
        ];
        let grouping = Grouping::from_records(&records);
        let mut index = TargetIndex::from_snapshot(&host.snapshot());

        let outcome = reconciler(&host, &creating())
            .run(&grouping, &mut index, &host.root())
            .await;

        assert_eq!(outcome.created, 1);
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.skipped, vec!["Orphan"]);
    }

    #[tokio::test]
    async fn children_land_under_their_group() {
        let scene = SceneNode::new("scene", "root").with_child(SceneNode::new("Canvas", "canvas"));
        let host = Arc::new(MemoryHost::from_snapshot(&scene));
        let records = vec![
            PositionRecord::group("Panel", 0.0, 0.0),
            PositionRecord::layer("Icon", 3.0, 4.0).under("Panel"),
            PositionRecord::layer("Top", 0.0, 0.0),
        ];
        let grouping = Grouping::from_records(&records);
        let mut index = TargetIndex::from_snapshot(&host.snapshot());
        let canvas = NodeHandle::from("canvas");

        let outcome = reconciler(&host, &creating())
            .run(&grouping, &mut index, &canvas)
            .await;

        assert_eq!(outcome.created, 3);
        assert_eq!(host.child_names(&canvas), vec!["Panel", "Top"]);
        let panel = host.find("Panel").unwrap();
        assert_eq!(host.child_names(&panel), vec!["Icon"]);
        assert_eq!(index.first("Icon").unwrap().full_path, "Panel/Icon");
        assert_eq!(index.version(), 3);
    }

    #[tokio::test]
    async fn missing_node_without_auto_create_fails() {
        let host = Arc::new(MemoryHost::empty());
        let grouping = Grouping::from_records(&[PositionRecord::layer("A", 0.0, 0.0)]);
        let mut index = TargetIndex::from_snapshot(&host.snapshot());

        let outcome = reconciler(&host, &ImportOptions::default())
            .run(&grouping, &mut index, &host.root())
            .await;

        assert_eq!(outcome.failed, vec!["A"]);
        assert_eq!(host.mutation_count(), 0);
    }
}
