use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::Path;

use crate::aggregate::{SecondaryRow, parse_org_project};
use crate::graph::assays::AssayRow;
use crate::graph::counts::ProjectCounts;
use crate::model::OrgBucket;
use crate::report::{
    ASSAY_HEADER_LABELS, ASSAY_HEADER_ORDER, COUNTS_HEADER_LABELS, COUNTS_HEADER_ORDER,
    COUNTS_MULTICOLUMNS, HARDCODED_ORGS, MAIN_HEADER_LABELS, MAIN_HEADER_ORDER, NO_TOTAL_COLUMNS,
    ReportError, SECONDARY_HEADER_LABELS, SECONDARY_HEADER_ORDER, fmt_timestamp, label,
    org_display_name,
};

const PAGE_STYLE: &str = "table{border-collapse:collapse}th,td{border:1px solid #999;\
padding:4px 8px;text-align:center}th{background:#e8eef7}";

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn page_open(out: &mut String, title: &str) -> Result<(), ReportError> {
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html>")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<title>{}</title>", escape(title))?;
    writeln!(out, "<style>{}</style>", PAGE_STYLE)?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;
    writeln!(out, "<h1>{}</h1>", escape(title))?;
    Ok(())
}

fn page_close(out: &mut String, generated_at: u64) -> Result<(), ReportError> {
    writeln!(out, "<p>Last processed: {}</p>", fmt_timestamp(generated_at))?;
    writeln!(out, "</body>")?;
    writeln!(out, "</html>")?;
    Ok(())
}

fn write_page(path: &Path, page: &str) -> Result<(), ReportError> {
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(page.as_bytes())?;
    out.flush()?;
    Ok(())
}

/// Render the main submitted-data matrix: one row per organization,
/// one column per tracked node type, totals in the footer. Buckets are
/// expected to already have their roll-up columns populated.
pub fn render_main_matrix(
    orgs: &BTreeMap<String, OrgBucket>,
    generated_at: u64,
) -> Result<String, ReportError> {
    let mut out = String::new();
    page_open(&mut out, "Data Submission Matrix")?;
    writeln!(out, "<table>")?;

    write!(out, "<tr><th>{}</th>", label(MAIN_HEADER_LABELS, "organization"))?;
    for key in MAIN_HEADER_ORDER {
        write!(out, "<th>{}</th>", label(MAIN_HEADER_LABELS, key))?;
    }
    writeln!(out, "</tr>")?;

    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for (org, bucket) in orgs {
        let org_data = parse_org_project(bucket.records("project"));
        write!(out, "<tr><th>{}</th>", escape(&org_display_name(org)))?;
        for key in MAIN_HEADER_ORDER {
            match *key {
                "validated" => {
                    write!(out, "<td>{}</td>", bucket.validated)?;
                    if bucket.validated {
                        *totals.entry("validated").or_default() += 1;
                    }
                }
                "project" => {
                    write!(out, "<td>{}</td>", escape(&org_data.project))?;
                    *totals.entry("project").or_default() += 1;
                }
                _ => {
                    if bucket.nodes.contains_key(key) {
                        let count = bucket.records(key).len();
                        if count == 0 {
                            write!(out, "<td>--</td>")?;
                        } else {
                            write!(out, "<td>{}</td>", count)?;
                            *totals.entry(*key).or_default() += count as u64;
                        }
                    } else if *key == "formats_not_supported" {
                        write!(out, "<td>N/A</td>")?;
                    } else {
                        write!(out, "<td>--</td>")?;
                    }
                }
            }
        }
        writeln!(out, "</tr>")?;
    }

    for (org, note) in HARDCODED_ORGS {
        write!(out, "<tr><th>{}</th>", escape(org))?;
        for key in MAIN_HEADER_ORDER {
            match *key {
                "formats_not_supported" => write!(out, "<td>{}</td>", escape(note))?,
                "validated" => write!(out, "<td>false</td>")?,
                _ => write!(out, "<td>--</td>")?,
            }
        }
        writeln!(out, "</tr>")?;
    }

    write!(out, "<tr><th>TOTALS</th>")?;
    for key in MAIN_HEADER_ORDER {
        if NO_TOTAL_COLUMNS.contains(key) {
            write!(out, "<td>N/A</td>")?;
        } else {
            write!(out, "<td>{}</td>", totals.get(key).copied().unwrap_or(0))?;
        }
    }
    writeln!(out, "</tr>")?;

    writeln!(out, "</table>")?;
    writeln!(out, "<p>* - validation passed and upload completed</p>")?;
    page_close(&mut out, generated_at)?;
    Ok(out)
}

pub fn write_main_matrix(
    orgs: &BTreeMap<String, OrgBucket>,
    generated_at: u64,
    path: &Path,
) -> Result<(), ReportError> {
    write_page(path, &render_main_matrix(orgs, generated_at)?)
}

/// Render the detailed matrix of assay metadata, one row per
/// organization. Multi-valued cells join their values with commas.
pub fn render_detailed_matrix(
    rows: &BTreeMap<String, SecondaryRow>,
    generated_at: u64,
) -> Result<String, ReportError> {
    let mut out = String::new();
    page_open(&mut out, "Assay Submission Details")?;
    writeln!(out, "<table>")?;

    write!(
        out,
        "<tr><th>{}</th>",
        label(SECONDARY_HEADER_LABELS, "organization")
    )?;
    for key in SECONDARY_HEADER_ORDER {
        write!(out, "<th>{}</th>", label(SECONDARY_HEADER_LABELS, key))?;
    }
    writeln!(out, "</tr>")?;

    for (org, row) in rows {
        write!(out, "<tr><th>{}</th>", escape(&org_display_name(org)))?;
        for key in SECONDARY_HEADER_ORDER {
            match *key {
                "project" => write!(out, "<td>{}</td>", escape(&row.project))?,
                "description" => write!(out, "<td>{}</td>", escape(&row.description))?,
                _ => match row.fields.get(key) {
                    Some(values) if !values.is_empty() => {
                        let joined = values
                            .iter()
                            .map(|v| escape(v))
                            .collect::<Vec<_>>()
                            .join(", ");
                        write!(out, "<td>{}</td>", joined)?;
                    }
                    _ => write!(out, "<td>--</td>")?,
                },
            }
        }
        writeln!(out, "</tr>")?;
    }

    writeln!(out, "</table>")?;
    page_close(&mut out, generated_at)?;
    Ok(out)
}

pub fn write_detailed_matrix(
    rows: &BTreeMap<String, SecondaryRow>,
    generated_at: u64,
    path: &Path,
) -> Result<(), ReportError> {
    write_page(path, &render_detailed_matrix(rows, generated_at)?)
}

fn join_or_dash<'a>(values: impl Iterator<Item = &'a String>) -> String {
    let joined = values.map(|v| escape(v)).collect::<Vec<_>>().join("<br/>");
    if joined.is_empty() {
        "--".to_string()
    } else {
        joined
    }
}

/// Render the assay summary: one row per experiment, with the
/// organization and project cells spanning their row groups.
pub fn render_assay_matrix(rows: &[AssayRow], generated_at: u64) -> Result<String, ReportError> {
    let mut out = String::new();
    page_open(&mut out, "Genetic Analysis Summary")?;
    writeln!(out, "<table>")?;

    write!(out, "<tr>")?;
    for key in ASSAY_HEADER_ORDER {
        write!(out, "<th>{}</th>", label(ASSAY_HEADER_LABELS, key))?;
    }
    writeln!(out, "</tr>")?;

    let mut org_counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut project_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows {
        *org_counts.entry(row.organization.as_str()).or_default() += 1;
        *project_counts.entry(row.project.as_str()).or_default() += 1;
    }

    let mut seen_orgs: Vec<&str> = Vec::new();
    let mut seen_projects: Vec<&str> = Vec::new();
    for row in rows {
        write!(out, "<tr>")?;
        if !seen_orgs.contains(&row.organization.as_str()) {
            write!(
                out,
                "<th rowspan=\"{}\">{}</th>",
                org_counts[row.organization.as_str()],
                escape(&row.organization)
            )?;
            seen_orgs.push(row.organization.as_str());
        }
        if !seen_projects.contains(&row.project.as_str()) {
            write!(
                out,
                "<td rowspan=\"{}\">{}</td>",
                project_counts[row.project.as_str()],
                escape(&row.project)
            )?;
            seen_projects.push(row.project.as_str());
        }
        write!(out, "<td>{}</td>", escape(&row.experiment))?;
        write!(out, "<td>{}</td>", join_or_dash(row.categories.iter()))?;
        write!(out, "<td>{}</td>", join_or_dash(row.instruments.iter()))?;
        write!(out, "<td>{}</td>", join_or_dash(row.models.iter()))?;
        write!(out, "<td>{}</td>", join_or_dash(row.methods.iter()))?;
        writeln!(out, "</tr>")?;
    }

    writeln!(out, "</table>")?;
    page_close(&mut out, generated_at)?;
    Ok(out)
}

pub fn write_assay_matrix(
    rows: &[AssayRow],
    generated_at: u64,
    path: &Path,
) -> Result<(), ReportError> {
    write_page(path, &render_assay_matrix(rows, generated_at)?)
}

fn counts_columns() -> Vec<&'static str> {
    let mut columns = Vec::new();
    for key in COUNTS_HEADER_ORDER {
        match COUNTS_MULTICOLUMNS.iter().find(|(parent, _)| parent == key) {
            Some((_, members)) => columns.extend(members.iter().copied()),
            None if *key == "organization" || *key == "project" => {}
            None => columns.push(*key),
        }
    }
    columns
}

/// Render the graph-counts matrix. Grouped columns get a two-row
/// header: the parent label spanning its members, member labels below.
pub fn render_counts_matrix(
    rows: &[ProjectCounts],
    generated_at: u64,
) -> Result<String, ReportError> {
    let mut out = String::new();
    page_open(&mut out, "Submission Counts")?;
    writeln!(out, "<table>")?;

    write!(out, "<tr>")?;
    for key in COUNTS_HEADER_ORDER {
        match COUNTS_MULTICOLUMNS.iter().find(|(parent, _)| parent == key) {
            Some((_, members)) => write!(
                out,
                "<th colspan=\"{}\">{}</th>",
                members.len(),
                label(COUNTS_HEADER_LABELS, key)
            )?,
            None => write!(
                out,
                "<th rowspan=\"2\">{}</th>",
                label(COUNTS_HEADER_LABELS, key)
            )?,
        }
    }
    writeln!(out, "</tr>")?;
    write!(out, "<tr>")?;
    for key in COUNTS_HEADER_ORDER {
        if let Some((_, members)) = COUNTS_MULTICOLUMNS.iter().find(|(parent, _)| parent == key) {
            for member in *members {
                write!(out, "<th>{}</th>", label(COUNTS_HEADER_LABELS, member))?;
            }
        }
    }
    writeln!(out, "</tr>")?;

    let columns = counts_columns();
    let mut totals: BTreeMap<&str, i64> = BTreeMap::new();
    let mut project_total: u64 = 0;
    let mut seen_orgs: Vec<&str> = Vec::new();

    for row in rows {
        write!(out, "<tr>")?;
        if seen_orgs.contains(&row.organization.as_str()) {
            write!(out, "<th></th>")?;
        } else {
            write!(out, "<th>{}</th>", escape(&row.organization))?;
            seen_orgs.push(row.organization.as_str());
        }
        write!(out, "<td>{}</td>", escape(&row.project))?;
        project_total += 1;
        for column in &columns {
            match row.counts.get(column).copied().flatten() {
                Some(count) => {
                    write!(out, "<td>{}</td>", count)?;
                    *totals.entry(*column).or_default() += count;
                }
                None => write!(out, "<td>--</td>")?,
            }
        }
        writeln!(out, "</tr>")?;
    }

    write!(out, "<tr><th>TOTALS</th><td>{}</td>", project_total)?;
    for column in &columns {
        write!(out, "<td>{}</td>", totals.get(column).copied().unwrap_or(0))?;
    }
    writeln!(out, "</tr>")?;

    writeln!(out, "</table>")?;
    page_close(&mut out, generated_at)?;
    Ok(out)
}

pub fn write_counts_matrix(
    rows: &[ProjectCounts],
    generated_at: u64,
    path: &Path,
) -> Result<(), ReportError> {
    write_page(path, &render_counts_matrix(rows, generated_at)?)
}
