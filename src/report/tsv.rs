use crate::model::Record;

/// Render records back into tab-delimited text in the given column
/// order. Fields absent from a record render as empty cells so every
/// row keeps the header's width.
pub fn render_tsv(header: &[String], records: &[Record]) -> String {
    let mut out = String::new();
    out.push_str(&header.join("\t"));
    out.push('\n');
    for record in records {
        let row: Vec<&str> = header
            .iter()
            .map(|field| record.get(field).map(String::as_str).unwrap_or(""))
            .collect();
        out.push_str(&row.join("\t"));
        out.push('\n');
    }
    out
}
