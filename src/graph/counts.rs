use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::graph::{GraphClient, GraphError};

/// Logical column -> count field exposed by the graph service.
pub const COUNT_FIELDS: &[(&str, &str)] = &[
    ("study", "_study_count"),
    ("protocol", "_protocol_count"),
    ("case", "_case_count"),
    ("biospecimen", "_biospecimen_count"),
    ("demographic", "_demographic_count"),
    ("family_history", "_family_history_count"),
    ("diagnosis", "_diagnosis_count"),
    ("exposure", "_exposure_count"),
    ("treatment", "_treatment_count"),
    ("followup", "_followup_count"),
    ("sample", "_sample_count"),
    ("aliquot", "_aliquot_count"),
    ("analyte", "_analyte_count"),
    ("contrived_expectation", "_contrived_expectation_count"),
    ("slide_image", "_slide_image_count"),
    ("cell_image", "_cell_image_count"),
    ("mass_cytometry_image", "_mass_cytometry_image_count"),
    ("mass_cytometry_assay", "_mass_cytometry_assay_count"),
    ("pcr_assay", "_pcr_assay_count"),
    ("immunoassay", "_immunoassay_count"),
    ("quantification_assay", "_quantification_assay_count"),
    ("sequencing_assay", "_sequencing_assay_count"),
    ("read_group", "_read_group_count"),
    (
        "submitted_unaligned_reads_file",
        "_submitted_unaligned_reads_count",
    ),
    (
        "submitted_aligned_reads_file",
        "_submitted_aligned_reads_count",
    ),
    (
        "submitted_somatic_mutations",
        "_submitted_somatic_mutation_count",
    ),
    ("submitted_copy_number", "_submitted_copy_number_count"),
    ("submitted_methylation", "_submitted_methylation_count"),
];

/// Project ids the counts report never includes.
pub const NOT_VALIDATED_PROJECTS: &[&str] = &["internal-test"];

const PROJECT_ID_PREFIX: &str = "bpa-";

/// Summary counts for one project, keyed by logical column name. A
/// `None` count renders as the `--` placeholder.
#[derive(Debug, Clone)]
pub struct ProjectCounts {
    pub organization: String,
    pub project: String,
    pub counts: BTreeMap<&'static str, Option<i64>>,
}

/// Build the one-shot counts query covering every tracked node type.
pub fn counts_query() -> String {
    let mut body = String::from("query Counts ($projectID: [String]) {\n");
    for (_, field) in COUNT_FIELDS {
        body.push_str("  ");
        body.push_str(field);
        body.push_str("(project_id: $projectID)\n");
    }
    body.push('}');
    body
}

/// Organization token of a project id: second `_`/`-` delimited part,
/// e.g. `bpa-OrgName_P0001` -> `OrgName`.
pub fn organization_of(project_id: &str) -> String {
    let normalized = project_id.replace('-', "_");
    normalized
        .split('_')
        .nth(1)
        .unwrap_or(project_id)
        .to_string()
}

/// Display name of a project id, with the submission prefix removed.
pub fn project_name_of(project_id: &str) -> String {
    project_id
        .strip_prefix(PROJECT_ID_PREFIX)
        .unwrap_or(project_id)
        .to_string()
}

pub fn fetch_project_counts(
    client: &mut GraphClient,
    project_id: &str,
) -> Result<ProjectCounts, GraphError> {
    let variables = json!({ "projectID": project_id });
    let data = client.query(&counts_query(), Some(variables))?;
    Ok(ProjectCounts {
        organization: organization_of(project_id),
        project: project_name_of(project_id),
        counts: counts_from_data(&data),
    })
}

fn counts_from_data(data: &Value) -> BTreeMap<&'static str, Option<i64>> {
    COUNT_FIELDS
        .iter()
        .map(|(logical, field)| (*logical, data.get(field).and_then(Value::as_i64)))
        .collect()
}

/// One counts row per non-excluded project, in sorted project order.
pub fn collect_counts(
    client: &mut GraphClient,
    excluded: &[&str],
) -> Result<Vec<ProjectCounts>, GraphError> {
    let mut rows = Vec::new();
    for project in client.get_projects(excluded)? {
        tracing::info!("querying counts for {}", project);
        rows.push(fetch_project_counts(client, &project)?);
    }
    Ok(rows)
}
