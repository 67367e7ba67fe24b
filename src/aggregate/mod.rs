use std::collections::{BTreeMap, BTreeSet};

use crate::model::nodes::ROLLUP_GROUPS;
use crate::model::{OrgBucket, Record};

/// Fold sub-type record lists into their declared parent buckets
/// (clinical sub-types into `clinical`, submitted-reads sub-types into
/// `sequencing_files`). Parent lists receive every non-empty member
/// list in member-table order, without de-duplication.
///
/// The transform is deliberately not idempotent: a second application
/// appends the members again and doubles the parent lists. Callers
/// apply it exactly once per report run.
pub fn roll_up(bucket: &OrgBucket) -> OrgBucket {
    let mut rolled = bucket.clone();
    for (parent, members) in ROLLUP_GROUPS {
        let mut additions: Vec<Record> = Vec::new();
        for member in *members {
            let records = bucket.records(member);
            if !records.is_empty() {
                additions.extend(records.iter().cloned());
            }
        }
        if let Some(slot) = rolled.nodes.get_mut(parent) {
            slot.extend(additions);
        }
    }
    rolled
}

/// Organization/project identity recovered from the `project` record's
/// submitter id (e.g. `bpa_OrgName_P0001`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgProject {
    pub organization: String,
    pub project: String,
    pub description: String,
}

const PROJECT_DELIMITERS: &[char] = &['_', '-'];
const DEFAULT_PROJECT: &str = "p0001";

/// Guess the submitter-id delimiter, take the second token as the
/// organization, and the `P`-prefixed token as the project name.
/// Malformed ids fall back instead of failing the report.
pub fn parse_org_project(project_records: &[Record]) -> OrgProject {
    let Some(project) = project_records.first() else {
        return OrgProject {
            organization: "unknown".to_string(),
            project: DEFAULT_PROJECT.to_string(),
            description: "unknown".to_string(),
        };
    };
    let submitter_id = project
        .get("submitter_id")
        .map(String::as_str)
        .unwrap_or("unknown");

    let delimiter = PROJECT_DELIMITERS
        .iter()
        .copied()
        .find(|d| submitter_id.contains(*d));
    let parts: Vec<&str> = match delimiter {
        Some(d) => submitter_id.split(d).collect(),
        None => {
            tracing::warn!("unable to guess delimiter for {}", submitter_id);
            vec![submitter_id]
        }
    };

    let organization = parts.get(1).unwrap_or(&submitter_id).to_string();

    let mut project_name = None;
    if parts.len() > 2 {
        for part in &parts {
            if part.starts_with('P') {
                project_name = Some(part.to_string());
            }
        }
    }
    let project_name = project_name.unwrap_or_else(|| {
        tracing::warn!("unable to determine project for {}", submitter_id);
        DEFAULT_PROJECT.to_string()
    });

    let description = project
        .get("name")
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());

    OrgProject {
        organization,
        project: project_name,
        description,
    }
}

/// Record fields lifted into the detailed matrix, per source node type.
pub const SECONDARY_FIELDS: &[(&str, &[&str])] = &[
    (
        "assay_result",
        &["assay_kit_name", "ctc_feature_value", "assay_technology"],
    ),
    ("experimental_analysis", &["sensitivity", "LLOD", "specificity"]),
    ("sample", &["volume", "method_of_sample_procurement"]),
];

/// Submission-field name -> detailed-matrix column.
pub const SECONDARY_LOGICAL_NAMES: &[(&str, &str)] = &[
    ("assay_kit_name", "extraction_method"),
    ("assay_technology", "technology_used"),
    ("ctc_feature_value", "ctdna_concentration"),
    ("sensitivity", "sensitivity"),
    ("LLOD", "llod"),
    ("specificity", "specificity"),
    ("method_of_sample_procurement", "collection_method"),
    ("volume", "volume"),
];

fn logical_name(field: &str) -> &'static str {
    SECONDARY_LOGICAL_NAMES
        .iter()
        .find(|(raw, _)| *raw == field)
        .map(|(_, logical)| *logical)
        .unwrap_or("unknown")
}

/// One organization's row of the detailed matrix: project identity plus
/// de-duplicated value sets per logical column.
#[derive(Debug, Clone)]
pub struct SecondaryRow {
    pub project: String,
    pub description: String,
    pub fields: BTreeMap<&'static str, BTreeSet<String>>,
}

pub fn extract_secondary(bucket: &OrgBucket) -> SecondaryRow {
    let org_project = parse_org_project(bucket.records("project"));
    let mut fields: BTreeMap<&'static str, BTreeSet<String>> = BTreeMap::new();

    for (node, wanted) in SECONDARY_FIELDS {
        for record in bucket.records(node) {
            for field in *wanted {
                if let Some(value) = record.get(*field) {
                    fields
                        .entry(logical_name(field))
                        .or_default()
                        .insert(value.clone());
                }
            }
        }
    }

    SecondaryRow {
        project: org_project.project,
        description: org_project.description,
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeRegistry;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn bucket_with_clinical() -> OrgBucket {
        let reg = NodeRegistry::new();
        let mut bucket = OrgBucket::for_registry(&reg);
        bucket.insert(
            "demographic",
            vec![record(&[("id", "a")]), record(&[("id", "b")])],
        );
        bucket.insert("diagnosis", vec![record(&[("id", "c")])]);
        bucket
    }

    #[test]
    fn test_roll_up_unions_clinical_subtypes() {
        let bucket = bucket_with_clinical();
        let rolled = roll_up(&bucket);
        assert_eq!(rolled.records("clinical").len(), 3);
        // Member lists are untouched.
        assert_eq!(rolled.records("demographic").len(), 2);
        assert_eq!(rolled.records("diagnosis").len(), 1);
    }

    #[test]
    fn test_roll_up_applied_twice_double_counts() {
        let bucket = bucket_with_clinical();
        let twice = roll_up(&roll_up(&bucket));
        assert_eq!(twice.records("clinical").len(), 6);
    }

    #[test]
    fn test_roll_up_carries_validated_flag() {
        let mut bucket = bucket_with_clinical();
        bucket.validated = true;
        assert!(roll_up(&bucket).validated);
    }

    #[test]
    fn test_roll_up_does_not_deduplicate() {
        let reg = NodeRegistry::new();
        let mut bucket = OrgBucket::for_registry(&reg);
        let shared = record(&[("id", "dup")]);
        bucket.insert("demographic", vec![shared.clone()]);
        bucket.insert("exposure", vec![shared]);
        let rolled = roll_up(&bucket);
        assert_eq!(rolled.records("clinical").len(), 2);
    }

    #[test]
    fn test_parse_org_project_full_id() {
        let records = vec![record(&[
            ("submitter_id", "bpa_OrgName_P0007"),
            ("name", "CTC study"),
        ])];
        let parsed = parse_org_project(&records);
        assert_eq!(parsed.organization, "OrgName");
        assert_eq!(parsed.project, "P0007");
        assert_eq!(parsed.description, "CTC study");
    }

    #[test]
    fn test_parse_org_project_hyphen_delimiter() {
        let records = vec![record(&[("submitter_id", "bpa-OrgName-P0002")])];
        let parsed = parse_org_project(&records);
        assert_eq!(parsed.organization, "OrgName");
        assert_eq!(parsed.project, "P0002");
        assert_eq!(parsed.description, "unknown");
    }

    #[test]
    fn test_parse_org_project_defaults_when_no_project_part() {
        let records = vec![record(&[("submitter_id", "bpa_OrgName")])];
        let parsed = parse_org_project(&records);
        assert_eq!(parsed.organization, "OrgName");
        assert_eq!(parsed.project, "p0001");
    }

    #[test]
    fn test_parse_org_project_empty_records() {
        let parsed = parse_org_project(&[]);
        assert_eq!(parsed.organization, "unknown");
        assert_eq!(parsed.project, "p0001");
    }

    #[test]
    fn test_extract_secondary_deduplicates_values() {
        let reg = NodeRegistry::new();
        let mut bucket = OrgBucket::for_registry(&reg);
        bucket.insert(
            "project",
            vec![record(&[("submitter_id", "bpa_OrgName_P0001")])],
        );
        bucket.insert(
            "assay_result",
            vec![
                record(&[("assay_kit_name", "KitA"), ("assay_technology", "ddPCR")]),
                record(&[("assay_kit_name", "KitA")]),
                record(&[("assay_kit_name", "KitB")]),
            ],
        );
        let row = extract_secondary(&bucket);
        let kits = &row.fields["extraction_method"];
        assert_eq!(kits.len(), 2);
        assert!(kits.contains("KitA") && kits.contains("KitB"));
        assert_eq!(row.fields["technology_used"].len(), 1);
        assert_eq!(row.project, "P0001");
    }
}
