use crate::fallback::{accepted, first_success, Strategy};
use layout_graph::TargetIndex;
use layout_protocol::{
    NodeHandle, OrderReport, PositionRecord, PropertyDump, SceneHost, SettlePolicy,
};
use layout_records::{GroupKey, Grouping};
use std::collections::HashMap;
use std::sync::Arc;

/// Makes the editor's sibling order match CSV order, one parent at a time.
pub struct OrderEnforcer {
    host: Arc<dyn SceneHost>,
    settle: SettlePolicy,
}

impl OrderEnforcer {
    pub fn new(host: Arc<dyn SceneHost>, settle: SettlePolicy) -> Self {
        Self { host, settle }
    }

    /// Children missing from the index are left out and do not take up a
    /// slot. Siblings that are not in the CSV are not considered.
    pub async fn enforce(
        &self,
        grouping: &Grouping,
        index: &TargetIndex,
        anchor: &NodeHandle,
    ) -> OrderReport {
        let mut report = OrderReport::default();
        let parents = group_handles(grouping, index);

        for (key, records) in grouping.iter() {
            let children: Vec<(&str, NodeHandle)> = records
                .iter()
                .filter_map(|record| {
                    index
                        .first(&record.name)
                        .map(|entry| (record.name.as_str(), entry.handle.clone()))
                })
                .collect();
            if children.len() < 2 {
                continue;
            }

            let parent = match key {
                GroupKey::Root => Some(anchor),
                GroupKey::Path(path) => parents.get(path.as_str()),
            };
            let Some(parent) = parent else {
                log::info!("No node for parent \"{key}\", leaving its children unordered");
                continue;
            };

            log::debug!(
                "Ordering under \"{key}\": {}",
                children
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(" -> ")
            );
            report.parents += 1;
            for (position, (name, child)) in children.iter().enumerate() {
                self.place(name, child, parent, position, &mut report).await;
                self.settle.between_moves().await;
            }
        }

        log::info!(
            "Ordered {} parents: {} moved, {} via siblingIndex, {} failed",
            report.parents,
            report.moved,
            report.fallbacks,
            report.failed.len()
        );
        report
    }

    async fn place(
        &self,
        name: &str,
        child: &NodeHandle,
        parent: &NodeHandle,
        position: usize,
        report: &mut OrderReport,
    ) {
        #[derive(Clone, Copy)]
        enum Placed {
            Moved,
            Fallback,
        }

        let host = &self.host;
        let sibling_index = i64::try_from(position).unwrap_or(i64::MAX);
        let strategies = vec![
            Strategy::new("move-node", async {
                accepted(host.move_node(child, parent, position).await)
                    .map(|hit| hit.map(|()| Placed::Moved))
            }),
            Strategy::new("siblingIndex", async {
                accepted(
                    host.set_property(child, "siblingIndex", PropertyDump::integer(sibling_index))
                        .await,
                )
                .map(|hit| hit.map(|()| Placed::Fallback))
            }),
        ];

        match first_success(&format!("order {name}"), strategies).await {
            Some(Placed::Moved) => report.moved += 1,
            Some(Placed::Fallback) => report.fallbacks += 1,
            None => {
                log::warn!("Could not move \"{name}\" to position {position}");
                report.failed.push(name.to_string());
            }
        }
    }
}

/// Handles of group records present in the index, keyed by both the group's
/// full path and its bare name. Full paths win over names on collision.
fn group_handles(grouping: &Grouping, index: &TargetIndex) -> HashMap<String, NodeHandle> {
    let groups: Vec<&PositionRecord> = grouping
        .iter()
        .flat_map(|(_, records)| records.iter())
        .filter(|record| record.kind.is_group())
        .collect();

    let mut handles = HashMap::new();
    for record in &groups {
        if let Some(entry) = index.first(&record.name) {
            handles
                .entry(record.name.clone())
                .or_insert_with(|| entry.handle.clone());
        }
    }
    for record in &groups {
        if let Some(entry) = index.first(&record.name) {
            handles.insert(record.full_path(), entry.handle.clone());
        }
    }
    handles
}
