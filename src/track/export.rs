// src/track/export.rs
use super::TrackedRecord;

/// Export formats for the tracked-lead view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

pub(crate) const CSV_HEADER: &str = "fingerprint,title,link,source,status,created_at,updated_at";

pub(crate) fn to_csv(records: &[&TrackedRecord]) -> String {
    let mut out = String::new();
    out.push_str(CSV_HEADER);
    out.push('\n');
    for r in records {
        let row = [
            escape_csv(r.fingerprint.as_str()),
            escape_csv(&r.item.title),
            escape_csv(&r.item.link),
            escape_csv(&r.item.source),
            escape_csv(r.status.as_str()),
            escape_csv(&r.created_at.to_rfc3339()),
            escape_csv(&r.updated_at.to_rfc3339()),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

pub(crate) fn to_json(records: &[&TrackedRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

/// Quote a field when it contains a comma, quote or newline; double
/// embedded quotes (RFC 4180).
fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
