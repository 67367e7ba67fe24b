use std::collections::{BTreeMap, HashMap};

use crate::model::nodes::NodeRegistry;

/// One parsed row, keyed by the source file's header fields.
pub type Record = HashMap<String, String>;

/// Per-organization aggregation slot. Every bucket carries the full
/// set of registered node-type keys from the moment it is created, so
/// downstream rendering never has to guard against missing keys.
#[derive(Debug, Clone)]
pub struct OrgBucket {
    pub nodes: BTreeMap<&'static str, Vec<Record>>,
    pub validated: bool,
}

impl OrgBucket {
    /// Fresh bucket per organization. A factory instead of a shared
    /// template: buckets must never alias each other's record lists.
    pub fn for_registry(registry: &NodeRegistry) -> Self {
        let nodes = registry
            .canonical_names()
            .map(|name| (name, Vec::new()))
            .collect();
        OrgBucket {
            nodes,
            validated: false,
        }
    }

    /// Replace the record list for a node type. Returns true when the
    /// slot already held data (the caller warns about the overwrite).
    pub fn insert(&mut self, node: &'static str, records: Vec<Record>) -> bool {
        match self.nodes.get_mut(node) {
            Some(slot) => {
                let overwrote = !slot.is_empty();
                *slot = records;
                overwrote
            }
            None => {
                self.nodes.insert(node, records);
                false
            }
        }
    }

    pub fn records(&self, node: &str) -> &[Record] {
        self.nodes.get(node).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::nodes::{NODE_TYPES, NodeRegistry};

    fn record(key: &str, value: &str) -> Record {
        let mut r = Record::new();
        r.insert(key.to_string(), value.to_string());
        r
    }

    #[test]
    fn test_factory_populates_every_node_type() {
        let reg = NodeRegistry::new();
        let bucket = OrgBucket::for_registry(&reg);
        assert_eq!(bucket.nodes.len(), NODE_TYPES.len());
        assert!(bucket.nodes.values().all(Vec::is_empty));
        assert!(!bucket.validated);
    }

    #[test]
    fn test_factory_returns_independent_buckets() {
        let reg = NodeRegistry::new();
        let mut a = OrgBucket::for_registry(&reg);
        let b = OrgBucket::for_registry(&reg);
        a.insert("case", vec![record("submitter_id", "c1")]);
        assert_eq!(a.records("case").len(), 1);
        assert!(b.records("case").is_empty());
    }

    #[test]
    fn test_insert_reports_overwrite() {
        let reg = NodeRegistry::new();
        let mut bucket = OrgBucket::for_registry(&reg);
        assert!(!bucket.insert("case", vec![record("submitter_id", "c1")]));
        assert!(bucket.insert("case", vec![record("submitter_id", "c2")]));
        assert_eq!(bucket.records("case")[0]["submitter_id"], "c2");
    }
}
