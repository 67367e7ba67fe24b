use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod html;
pub mod tsv;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report formatting failed: {0}")]
    Fmt(#[from] std::fmt::Error),
    #[error("report IO error: {0}")]
    Io(#[from] io::Error),
}

/// Column order of the main submitted-data matrix.
pub const MAIN_HEADER_ORDER: &[&str] = &[
    "project",
    "experiment",
    "case",
    "clinical",
    "sample",
    "sample_expectation",
    "slide",
    "slide_image",
    "slide_count",
    "aliquot",
    "read_group",
    "assay_result",
    "sequencing_files",
    "experimental_analysis",
    "experimental_metadata",
    "formats_not_supported",
    "validated",
];

pub const MAIN_HEADER_LABELS: &[(&str, &str)] = &[
    ("organization", "Organization"),
    ("project", "Project"),
    ("experiment", "Experiments"),
    ("case", "Cases"),
    ("clinical", "Clinical Data"),
    ("sample", "Samples"),
    ("sample_expectation", "Expected Mutations"),
    ("slide", "Slides"),
    ("slide_image", "Slide Images"),
    ("slide_count", "Slide Counts"),
    ("aliquot", "Aliquots"),
    ("read_group", "Read Groups"),
    ("assay_result", "Assay Results"),
    ("sequencing_files", "Sequencing Files"),
    ("experimental_analysis", "Experimental Analysis"),
    ("experimental_metadata", "Experimental Metadata"),
    ("formats_not_supported", "Formats Not Supported"),
    ("validated", "Validated*"),
];

/// Columns whose footer cell shows N/A instead of a sum.
pub const NO_TOTAL_COLUMNS: &[&str] = &["formats_not_supported"];

/// Organizations submitting in formats the pipeline cannot ingest.
/// They appear as fixed rows with a note in place of counts.
pub const HARDCODED_ORGS: &[(&str, &str)] = &[("MSKCC P0001", "Unsupported TSV")];

pub const SECONDARY_HEADER_ORDER: &[&str] = &[
    "project",
    "description",
    "collection_method",
    "technology_used",
    "extraction_method",
    "volume",
    "ctdna_concentration",
    "llod",
    "specificity",
    "sensitivity",
];

pub const SECONDARY_HEADER_LABELS: &[(&str, &str)] = &[
    ("organization", "Organization"),
    ("project", "Project"),
    ("description", "Project Description"),
    ("collection_method", "Collection Method"),
    ("technology_used", "Technology Used"),
    ("extraction_method", "Extraction Method"),
    ("volume", "Volume"),
    ("ctdna_concentration", "ctDNA Concentration"),
    ("llod", "LLOD"),
    ("specificity", "Specificity"),
    ("sensitivity", "Sensitivity"),
];

/// Column order of the assay summary report.
pub const ASSAY_HEADER_ORDER: &[&str] = &[
    "organization",
    "project",
    "experiment",
    "assay_category",
    "assay_instrument",
    "assay_instrument_model",
    "assay_method",
];

pub const ASSAY_HEADER_LABELS: &[(&str, &str)] = &[
    ("organization", "Organization"),
    ("project", "Project Name"),
    ("experiment", "Experiment ID"),
    ("assay_category", "Category"),
    ("assay_instrument", "Assay Instrument"),
    ("assay_instrument_model", "Instrument Model"),
    ("assay_method", "Assay Methodology"),
];

/// Column order of the graph-query counts matrix.
pub const COUNTS_HEADER_ORDER: &[&str] = &[
    "organization",
    "project",
    "study",
    "protocol",
    "case",
    "clinical",
    "biospecimen",
    "sample",
    "aliquot",
    "analyte",
    "images",
    "contrived_expectation",
    "assays",
    "read_group",
    "sequencing_data",
    "submitted_copy_number",
    "submitted_methylation",
];

/// Parent columns of the counts matrix that span several sub-columns.
pub const COUNTS_MULTICOLUMNS: &[(&str, &[&str])] = &[
    (
        "clinical",
        &[
            "demographic",
            "family_history",
            "exposure",
            "diagnosis",
            "treatment",
            "followup",
        ],
    ),
    (
        "sequencing_data",
        &[
            "submitted_unaligned_reads_file",
            "submitted_aligned_reads_file",
            "submitted_somatic_mutations",
            "sequencing_assay",
        ],
    ),
    (
        "assays",
        &[
            "immunoassay",
            "pcr_assay",
            "mass_cytometry_assay",
            "quantification_assay",
        ],
    ),
    (
        "images",
        &["slide_image", "cell_image", "mass_cytometry_image"],
    ),
];

pub const COUNTS_HEADER_LABELS: &[(&str, &str)] = &[
    ("organization", "Organization"),
    ("project", "Project"),
    ("study", "Studies"),
    ("protocol", "Protocol Documents"),
    ("case", "Cases"),
    ("clinical", "Clinical Data"),
    ("biospecimen", "Biospecimens"),
    ("demographic", "Demographic Records"),
    ("family_history", "Family History Records"),
    ("exposure", "Exposure Records"),
    ("diagnosis", "Diagnosis Records"),
    ("treatment", "Treatment Records"),
    ("followup", "Follow-Up Records"),
    ("sample", "Samples"),
    ("aliquot", "Aliquots"),
    ("analyte", "Analytes"),
    ("images", "Images"),
    ("slide_image", "Slide Images"),
    ("cell_image", "Cell Images"),
    ("mass_cytometry_image", "Mass Cytometry Images"),
    ("contrived_expectation", "Expected Mutations"),
    ("assays", "Assays"),
    ("immunoassay", "Immunoassays"),
    ("pcr_assay", "PCR"),
    ("mass_cytometry_assay", "Mass Cytometry"),
    ("quantification_assay", "Quantification"),
    ("read_group", "Read Groups"),
    ("sequencing_data", "Sequencing Data"),
    ("sequencing_assay", "Sequencing Assays"),
    ("submitted_unaligned_reads_file", "Unaligned Reads Files"),
    ("submitted_aligned_reads_file", "Aligned Reads Files"),
    ("submitted_somatic_mutations", "Somatic Mutations Files"),
    ("submitted_copy_number", "Copy Number Files"),
    ("submitted_methylation", "Methylation Files"),
];

pub fn label(table: &'static [(&'static str, &'static str)], key: &str) -> &'static str {
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .unwrap_or("")
}

/// Organization display name: second whitespace token once underscores
/// become spaces (`bpa_OrgName_P0001` -> `OrgName`).
pub fn org_display_name(org: &str) -> String {
    let spaced = org.replace('_', " ");
    spaced.split_whitespace().nth(1).unwrap_or(org).to_string()
}

pub fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Unix seconds -> `YYYY-MM-DD HH:MM:SS UTC` for the report trailer.
pub fn fmt_timestamp(ts: u64) -> String {
    match DateTime::<Utc>::from_timestamp(ts as i64, 0) {
        Some(instant) => instant.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "unknown".to_string(),
    }
}

/// Publish a finished report by copying it into the web server's
/// document root under its own file name.
pub fn copy_to_server(report: &Path, server_dir: &Path) -> Result<PathBuf, ReportError> {
    let file_name = report.file_name().unwrap_or(report.as_os_str());
    let target = server_dir.join(file_name);
    std::fs::copy(report, &target)?;
    tracing::info!("published {} to {}", report.display(), target.display());
    Ok(target)
}
