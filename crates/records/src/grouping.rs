use indexmap::IndexMap;
use layout_protocol::PositionRecord;
use std::fmt;

/// Where a record hangs: the anchor, or the literal parent path string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Root,
    Path(String),
}

impl GroupKey {
    pub fn for_parent(parent_path: &str) -> Self {
        if parent_path.is_empty() {
            Self::Root
        } else {
            Self::Path(parent_path.to_string())
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("<root>"),
            Self::Path(path) => f.write_str(path),
        }
    }
}

/// Records bucketed by declared parent. Buckets and their contents keep
/// first-seen input order; parent paths are compared verbatim.
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    groups: IndexMap<GroupKey, Vec<PositionRecord>>,
}

impl Grouping {
    pub fn from_records(records: &[PositionRecord]) -> Self {
        let mut groups: IndexMap<GroupKey, Vec<PositionRecord>> = IndexMap::new();
        for record in records {
            groups
                .entry(GroupKey::for_parent(&record.parent_path))
                .or_default()
                .push(record.clone());
        }
        Self { groups }
    }

    pub fn children_of(&self, key: &GroupKey) -> &[PositionRecord] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn root(&self) -> &[PositionRecord] {
        self.children_of(&GroupKey::Root)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &[PositionRecord])> {
        self.groups.iter().map(|(key, records)| (key, records.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.groups.keys()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn names(records: &[PositionRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn interleaved_parents_keep_input_order() {
        let records = vec![
            PositionRecord::group("Panel", 0.0, 0.0),
            PositionRecord::layer("A", 0.0, 0.0).under("Panel"),
            PositionRecord::layer("Top", 0.0, 0.0),
            PositionRecord::layer("B", 0.0, 0.0).under("Panel"),
            PositionRecord::layer("Inner", 0.0, 0.0).under("Panel/Sub"),
            PositionRecord::layer("C", 0.0, 0.0).under("Panel"),
        ];
        let grouping = Grouping::from_records(&records);

        assert_eq!(names(grouping.root()), vec!["Panel", "Top"]);
        assert_eq!(
            names(grouping.children_of(&GroupKey::Path("Panel".into()))),
            vec!["A", "B", "C"]
        );
        let keys: Vec<String> = grouping.keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["<root>", "Panel", "Panel/Sub"]);
    }

    #[test]
    fn parent_paths_are_not_normalized() {
        let records = vec![
            PositionRecord::layer("A", 0.0, 0.0).under("Root/Panel"),
            PositionRecord::layer("B", 0.0, 0.0).under("Panel"),
        ];
        let grouping = Grouping::from_records(&records);
        assert_eq!(grouping.len(), 2);
        assert_eq!(names(grouping.children_of(&GroupKey::Path("Panel".into()))), vec!["B"]);
    }

    #[test]
    fn unknown_parent_has_no_children() {
        let grouping = Grouping::from_records(&[]);
        assert!(grouping.is_empty());
        assert!(grouping.children_of(&GroupKey::Path("nope".into())).is_empty());
    }

    proptest! {
        #[test]
        fn proptest_children_follow_input_order(parents in proptest::collection::vec(0usize..3, 1..40)) {
            let labels = ["", "P", "Q"];
            let records: Vec<PositionRecord> = parents
                .iter()
                .enumerate()
                .map(|(i, p)| PositionRecord::layer(format!("n{i}"), 0.0, 0.0).under(labels[*p]))
                .collect();
            let grouping = Grouping::from_records(&records);

            for label in labels {
                let expected: Vec<&str> = records
                    .iter()
                    .filter(|r| r.parent_path == label)
                    .map(|r| r.name.as_str())
                    .collect();
                let actual = names(grouping.children_of(&GroupKey::for_parent(label)));
                prop_assert_eq!(actual, expected);
            }
        }
    }
}
