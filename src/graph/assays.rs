use std::collections::BTreeSet;

use serde_json::Value;

use crate::graph::counts::{organization_of, project_name_of};
use crate::graph::{GraphClient, GraphError};

/// Assay node type -> display category.
pub const ASSAY_TYPES: &[(&str, &str)] = &[
    ("mass_cytometry_assay", "Mass Cytometry"),
    ("quantification_assay", "Quantification"),
    ("pcr_assay", "PCR"),
    ("immunoassay", "Immunoassay"),
];

/// Project ids the assay report never includes.
pub const NOT_VALIDATED_ASSAY_PROJECTS: &[&str] = &["internal-test", "bpa-USC_OPT1_T1"];

/// Aggregated assay properties for one experiment. The instrument,
/// model, and method sets are de-duplicated across every aliquot-level
/// assay record reachable from the experiment.
#[derive(Debug, Clone)]
pub struct AssayRow {
    pub organization: String,
    pub project: String,
    pub experiment: String,
    pub categories: Vec<String>,
    pub instruments: BTreeSet<String>,
    pub models: BTreeSet<String>,
    pub methods: BTreeSet<String>,
}

impl AssayRow {
    fn new(organization: &str, project: &str, experiment: &str) -> Self {
        AssayRow {
            organization: organization.to_string(),
            project: project.to_string(),
            experiment: experiment.to_string(),
            categories: Vec::new(),
            instruments: BTreeSet::new(),
            models: BTreeSet::new(),
            methods: BTreeSet::new(),
        }
    }
}

pub fn experiments_query(project_id: &str) -> String {
    format!(
        "query Project {{project (first:0, project_id: \"{}\") {{\
         studies(first:0) {{submitter_id}}}}}}",
        project_id
    )
}

/// Studies reachable only through the given assay type; returns the
/// cases below the first matching study.
pub fn assay_cases_query(project_id: &str, experiment_id: &str, assay: &str) -> String {
    format!(
        "query Cases {{study (first:0, project_id: \"{}\", submitter_id: \"{}\", \
         with_path_to:{{type: \"{}\"}}) {{cases(first:0){{submitter_id}}}}}}",
        project_id, experiment_id, assay
    )
}

/// Full biospecimen path from a case down to the assay records.
pub fn assay_traversal_query(project_id: &str, case_id: &str, assay_plural: &str) -> String {
    format!(
        "query ReadGroups {{case (first:0, project_id: \"{}\", submitter_id: \"{}\") {{\
         biospecimens(first:0){{samples(first:0){{aliquots(first:0){{analytes(first:0){{\
         {}(first:0){{assay_instrument assay_instrument_model assay_method}}\
         }}}}}}}}}}}}",
        project_id, case_id, assay_plural
    )
}

/// Flatten nested array fields: each path step selects an array field
/// on every value collected so far.
fn nested_arrays<'a>(value: &'a Value, path: &[&str]) -> Vec<&'a Value> {
    let mut current = vec![value];
    for field in path {
        let mut next = Vec::new();
        for value in current {
            if let Some(items) = value.get(field).and_then(Value::as_array) {
                next.extend(items.iter());
            }
        }
        current = next;
    }
    current
}

fn submitter_ids(values: &[&Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(|v| v.get("submitter_id").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

pub fn experiments_from_data(data: &Value) -> Vec<String> {
    submitter_ids(&nested_arrays(data, &["project", "studies"]))
}

pub fn assay_cases_from_data(data: &Value) -> Vec<String> {
    submitter_ids(&nested_arrays(data, &["study", "cases"]))
}

/// Fold one case traversal response into the row's property sets.
pub fn accumulate_assay_properties(row: &mut AssayRow, case_data: &Value, assay_plural: &str) {
    let path = [
        "case",
        "biospecimens",
        "samples",
        "aliquots",
        "analytes",
        assay_plural,
    ];
    for assay in nested_arrays(case_data, &path) {
        if let Some(v) = assay.get("assay_instrument").and_then(Value::as_str) {
            row.instruments.insert(v.to_string());
        }
        if let Some(v) = assay.get("assay_instrument_model").and_then(Value::as_str) {
            row.models.insert(v.to_string());
        }
        if let Some(v) = assay.get("assay_method").and_then(Value::as_str) {
            row.methods.insert(v.to_string());
        }
    }
}

/// One row per experiment that carries at least one assay category.
/// Experiments without assays are dropped from the report entirely.
pub fn collect_assays(
    client: &mut GraphClient,
    excluded: &[&str],
) -> Result<Vec<AssayRow>, GraphError> {
    let mut rows = Vec::new();
    for project in client.get_projects(excluded)? {
        tracing::info!("querying assays for {}", project);
        let organization = organization_of(&project);
        let proj_name = project_name_of(&project);

        let data = client.query(&experiments_query(&project), None)?;
        for experiment in experiments_from_data(&data) {
            let mut row = AssayRow::new(&organization, &proj_name, &experiment);

            for (assay, category) in ASSAY_TYPES {
                let data = client.query(&assay_cases_query(&project, &experiment, assay), None)?;
                let cases = assay_cases_from_data(&data);
                if cases.is_empty() {
                    continue;
                }
                row.categories.push(category.to_string());

                let assay_plural = format!("{}s", assay);
                for case in cases {
                    let data =
                        client.query(&assay_traversal_query(&project, &case, &assay_plural), None)?;
                    accumulate_assay_properties(&mut row, &data, &assay_plural);
                }
            }

            if !row.categories.is_empty() {
                rows.push(row);
            }
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_builders_embed_identifiers() {
        let q = experiments_query("bpa-OrgName_P0001");
        assert!(q.contains("project_id: \"bpa-OrgName_P0001\""));

        let q = assay_cases_query("bpa-OrgName_P0001", "S-01", "pcr_assay");
        assert!(q.contains("submitter_id: \"S-01\""));
        assert!(q.contains("with_path_to:{type: \"pcr_assay\"}"));

        let q = assay_traversal_query("bpa-OrgName_P0001", "case-1", "pcr_assays");
        assert!(q.contains("pcr_assays(first:0)"));
        assert!(q.contains("assay_instrument_model"));
    }

    #[test]
    fn test_experiments_from_data() {
        let data = json!({
            "project": [{"studies": [
                {"submitter_id": "S-01"},
                {"submitter_id": "S-02"},
            ]}]
        });
        assert_eq!(experiments_from_data(&data), vec!["S-01", "S-02"]);
        assert!(experiments_from_data(&json!({"project": []})).is_empty());
    }

    #[test]
    fn test_accumulate_walks_biospecimen_path_and_dedupes() {
        let case_data = json!({
            "case": [{
                "biospecimens": [{
                    "samples": [{
                        "aliquots": [{
                            "analytes": [{
                                "pcr_assays": [
                                    {
                                        "assay_instrument": "QX200",
                                        "assay_instrument_model": "Bio-Rad",
                                        "assay_method": "ddPCR",
                                    },
                                    {
                                        "assay_instrument": "QX200",
                                        "assay_instrument_model": null,
                                        "assay_method": "qPCR",
                                    },
                                ]
                            }]
                        }]
                    }]
                }]
            }]
        });
        let mut row = AssayRow::new("OrgName", "OrgName_P0001", "S-01");
        accumulate_assay_properties(&mut row, &case_data, "pcr_assays");
        assert_eq!(row.instruments.len(), 1);
        assert!(row.instruments.contains("QX200"));
        assert_eq!(row.models.len(), 1);
        assert_eq!(row.methods.len(), 2);
    }

    #[test]
    fn test_missing_path_segments_yield_nothing() {
        let mut row = AssayRow::new("OrgName", "OrgName_P0001", "S-01");
        accumulate_assay_properties(&mut row, &json!({"case": []}), "pcr_assays");
        assert!(row.instruments.is_empty());
        assert!(row.methods.is_empty());
    }
}
