//! # ia-export
//!
//! Exporters for assignment aggregates: fixed-column CSV and JSON tables,
//! a node/link graph document with a standalone HTML rendering, and
//! group-centric filtering.

pub mod error;
pub mod filter;
pub mod graph;
pub mod output;
pub mod table;

pub use error::{ExportError, ExportResult};
pub use filter::edges_for_group;
pub use graph::{GraphDocument, GraphLink, GraphNode, GraphSettings, NodeKind};
pub use output::{
    group_file_stem, kind_file_stem, Exporter, OutputConfig, ALL_FILE_STEM,
};
pub use table::{write_csv, write_csv_file, write_json, write_json_file, AssignmentRow, CSV_HEADER};
