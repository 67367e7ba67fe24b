use std::collections::BTreeMap;

use thiserror::Error;

use crate::model::{NodeRegistry, OrgBucket};
use crate::store::{ObjectStore, StoreError};

pub mod parse;

pub use parse::{DataFormat, ParseError, ParsedFile, parse_records};

/// Substring marking a candidate data file in a storage key.
pub const DATA_FILE_MARKER: &str = "tsv";
/// Companion object marking an organization's submission as validated.
pub const VALIDATION_FILE_MARKER: &str = "validated.status";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed parsing '{key}': {source}")]
    Parse {
        key: String,
        #[source]
        source: ParseError,
    },
}

/// Walk the bucket listing and fold every recognized data file into a
/// per-organization bucket.
///
/// Keys that look like data files but match no known node type are
/// skipped with a warning; a second file for an already-populated node
/// type warns and overwrites. Validation-status objects flip the
/// owning organization's validated flag, with the organization taken
/// from the status key itself.
pub fn ingest_bucket(
    store: &dyn ObjectStore,
    registry: &NodeRegistry,
) -> Result<BTreeMap<String, OrgBucket>, IngestError> {
    let mut orgs: BTreeMap<String, OrgBucket> = BTreeMap::new();

    for entry in store.list_objects()? {
        let key = entry.key.as_str();
        let org_name = key.split('/').next().unwrap_or(key).to_string();

        if key.contains(VALIDATION_FILE_MARKER) {
            tracing::info!("validation file found for {}", org_name);
            orgs.entry(org_name)
                .or_insert_with(|| OrgBucket::for_registry(registry))
                .validated = true;
            continue;
        }
        if !key.contains(DATA_FILE_MARKER) {
            continue;
        }

        let Some(node) = registry.normalize_node_name(key) else {
            tracing::warn!("unable to figure out data type for {}, skipping", key);
            continue;
        };

        tracing::info!("loading {}", key);
        let data = store.load_object(key)?;
        let parsed =
            parse_records(&data, DataFormat::Tsv, None).map_err(|source| IngestError::Parse {
                key: key.to_string(),
                source,
            })?;

        let bucket = orgs
            .entry(org_name)
            .or_insert_with(|| OrgBucket::for_registry(registry));
        if bucket.insert(node, parsed.records) {
            tracing::warn!("overwriting existing data for {} (key {})", node, key);
        }
    }

    Ok(orgs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use crate::store::ObjectEntry;

    struct MemStore {
        objects: Vec<(String, String)>,
    }

    impl ObjectStore for MemStore {
        fn list_objects(&self) -> Result<Vec<ObjectEntry>, StoreError> {
            Ok(self
                .objects
                .iter()
                .map(|(key, _)| ObjectEntry { key: key.clone() })
                .collect())
        }

        fn load_object(&self, key: &str) -> Result<String, StoreError> {
            self.objects
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, body)| body.clone())
                .ok_or_else(|| StoreError::Missing(key.to_string()))
        }
    }

    fn store() -> MemStore {
        MemStore {
            objects: vec![
                (
                    "orgA/case.tsv".to_string(),
                    "submitter_id\tgender\nc1\tfemale\nc2\tmale\n".to_string(),
                ),
                (
                    "orgA/samples.tsv".to_string(),
                    "submitter_id\tvolume\ns1\t10\n".to_string(),
                ),
                ("orgA/mystery.tsv".to_string(), "a\tb\n1\t2\n".to_string()),
                ("orgB/validated.status".to_string(), String::new()),
                ("orgB/readme.txt".to_string(), "not data".to_string()),
            ],
        }
    }

    #[test]
    fn test_ingest_routes_files_to_org_buckets() {
        let reg = NodeRegistry::new();
        let orgs = ingest_bucket(&store(), &reg).unwrap();

        let org_a = &orgs["orgA"];
        assert_eq!(org_a.records("case").len(), 2);
        assert_eq!(org_a.records("sample").len(), 1);
        assert!(!org_a.validated);
    }

    #[test]
    fn test_unrecognized_file_is_skipped_not_fatal() {
        let reg = NodeRegistry::new();
        let orgs = ingest_bucket(&store(), &reg).unwrap();
        // mystery.tsv contributed nothing, but ingestion continued.
        assert!(orgs["orgA"].nodes.values().map(Vec::len).sum::<usize>() == 3);
    }

    #[test]
    fn test_validation_file_flags_its_own_org() {
        let reg = NodeRegistry::new();
        let orgs = ingest_bucket(&store(), &reg).unwrap();
        assert!(orgs["orgB"].validated);
        assert!(orgs["orgB"].nodes.values().all(Vec::is_empty));
    }

    #[test]
    fn test_duplicate_node_file_overwrites() {
        let reg = NodeRegistry::new();
        let mem = MemStore {
            objects: vec![
                (
                    "orgA/case.tsv".to_string(),
                    "submitter_id\tgender\nc1\tfemale\nc2\tmale\n".to_string(),
                ),
                (
                    "orgA/cases.tsv".to_string(),
                    "submitter_id\tgender\nc9\tfemale\n".to_string(),
                ),
            ],
        };
        let orgs = ingest_bucket(&mem, &reg).unwrap();
        let cases: &[Record] = orgs["orgA"].records("case");
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0]["submitter_id"], "c9");
    }

    #[test]
    fn test_single_column_file_yields_no_records() {
        // A file without the delimiter has no header line either, so
        // every line is skipped and the node slot stays empty.
        let reg = NodeRegistry::new();
        let mem = MemStore {
            objects: vec![(
                "orgA/aliquot.tsv".to_string(),
                "submitter_id\na1\na2\n".to_string(),
            )],
        };
        let orgs = ingest_bucket(&mem, &reg).unwrap();
        assert!(orgs["orgA"].records("aliquot").is_empty());
    }
}
