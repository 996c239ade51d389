//! Tabular export of assignment edges (CSV and JSON).
//!
//! Column order is fixed:
//! `Name, AssignmentTarget, AssignmentGroupName, AssignmentType, AssignmentMode`.
//! `AssignmentTarget` carries the raw group id and is blank for built-in
//! groups.

use crate::error::{ExportError, ExportResult};
use ia_core::AssignmentEdge;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Header row of every CSV export.
pub const CSV_HEADER: [&str; 5] = [
    "Name",
    "AssignmentTarget",
    "AssignmentGroupName",
    "AssignmentType",
    "AssignmentMode",
];

/// One flattened export row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentRow<'a> {
    #[serde(rename = "Name")]
    pub name: &'a str,
    #[serde(rename = "AssignmentTarget")]
    pub target: &'a str,
    #[serde(rename = "AssignmentGroupName")]
    pub group_name: &'a str,
    #[serde(rename = "AssignmentType")]
    pub assignment_type: &'static str,
    #[serde(rename = "AssignmentMode")]
    pub mode: &'static str,
}

impl<'a> From<&'a AssignmentEdge> for AssignmentRow<'a> {
    fn from(edge: &'a AssignmentEdge) -> Self {
        Self {
            name: &edge.object_name,
            target: edge.group_id.as_deref().unwrap_or(""),
            group_name: &edge.group_name,
            assignment_type: edge.object_kind.label(),
            mode: match edge.mode {
                ia_core::AssignmentMode::Included => "Included",
                ia_core::AssignmentMode::Excluded => "Excluded",
            },
        }
    }
}

/// Writes `edges` as CSV, header first. An empty edge list still gets a header.
pub fn write_csv<W: Write>(writer: W, edges: &[AssignmentEdge]) -> ExportResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(CSV_HEADER)?;
    for edge in edges {
        csv_writer.serialize(AssignmentRow::from(edge))?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes `edges` as CSV to `path`, replacing any existing file.
pub fn write_csv_file(path: &Path, edges: &[AssignmentEdge]) -> ExportResult<()> {
    let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
    write_csv(BufWriter::new(file), edges)
}

/// Writes `edges` as a pretty-printed JSON array of rows.
pub fn write_json<W: Write>(writer: W, edges: &[AssignmentEdge]) -> ExportResult<()> {
    let rows: Vec<AssignmentRow<'_>> = edges.iter().map(AssignmentRow::from).collect();
    serde_json::to_writer_pretty(writer, &rows)?;
    Ok(())
}

pub fn write_json_file(path: &Path, edges: &[AssignmentEdge]) -> ExportResult<()> {
    let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write_json(&mut writer, edges)?;
    writer.flush().map_err(|e| ExportError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ia_core::{AssignmentMode, ResourceKind};

    fn baseline_edges() -> Vec<AssignmentEdge> {
        vec![
            AssignmentEdge {
                object_name: "Baseline".into(),
                object_kind: ResourceKind::ConfigurationProfile,
                group_id: None,
                group_name: "All Devices".into(),
                mode: AssignmentMode::Included,
            },
            AssignmentEdge {
                object_name: "Baseline".into(),
                object_kind: ResourceKind::ConfigurationProfile,
                group_id: Some("g1".into()),
                group_name: "Finance".into(),
                mode: AssignmentMode::Excluded,
            },
        ]
    }

    #[test]
    fn test_csv_columns_are_exact() {
        let mut out = Vec::new();
        write_csv(&mut out, &baseline_edges()).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "Name,AssignmentTarget,AssignmentGroupName,AssignmentType,AssignmentMode\n\
             Baseline,,All Devices,ConfigurationProfile,Included\n\
             Baseline,g1,Finance,ConfigurationProfile,Excluded\n"
        );
    }

    #[test]
    fn test_empty_csv_has_header_only() {
        let mut out = Vec::new();
        write_csv(&mut out, &[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Name,AssignmentTarget,AssignmentGroupName,AssignmentType,AssignmentMode\n"
        );
    }

    #[test]
    fn test_csv_quotes_commas() {
        let mut edges = baseline_edges();
        edges[1].group_name = "Finance, EMEA".into();
        let mut out = Vec::new();
        write_csv(&mut out, &edges).unwrap();
        assert!(String::from_utf8(out)
            .unwrap()
            .contains("Baseline,g1,\"Finance, EMEA\",ConfigurationProfile,Excluded"));
    }

    #[test]
    fn test_json_rows_use_column_names() {
        let mut out = Vec::new();
        write_json(&mut out, &baseline_edges()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value[0]["AssignmentTarget"], "");
        assert_eq!(value[0]["AssignmentGroupName"], "All Devices");
        assert_eq!(value[1]["AssignmentTarget"], "g1");
        assert_eq!(value[1]["AssignmentMode"], "Excluded");
    }
}
