//! Export file layout.
//!
//! Every file lands in one output directory, created on first write:
//!
//! | Selection      | Files                                              |
//! |----------------|----------------------------------------------------|
//! | one kind       | `<Kind>Assignments.csv` (+ `.json`)                |
//! | all kinds      | `AllAssignments.csv` (+ `.json`)                   |
//! | one group      | `Group_<name>Assignments.csv` (+ `.json`)          |
//! | graph          | `AssignmentGraph.html` (+ `AssignmentGraph.json`)  |

use crate::error::{ExportError, ExportResult};
use crate::filter::edges_for_group;
use crate::graph::{GraphDocument, GraphSettings};
use crate::table::{write_csv_file, write_json_file};
use ia_core::{AssignmentEdge, ResourceKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory all export files are written to.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_true")]
    pub write_csv: bool,
    #[serde(default)]
    pub write_json: bool,
    #[serde(default = "default_graph_file_name")]
    pub graph_file_name: String,
    #[serde(default)]
    pub graph: GraphSettings,
}

fn default_directory() -> PathBuf {
    PathBuf::from("assignments")
}

fn default_true() -> bool {
    true
}

fn default_graph_file_name() -> String {
    "AssignmentGraph.html".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            write_csv: true,
            write_json: false,
            graph_file_name: default_graph_file_name(),
            graph: GraphSettings::default(),
        }
    }
}

/// File stem for a kind's export.
pub fn kind_file_stem(kind: ResourceKind) -> String {
    format!("{}Assignments", kind.label())
}

/// File stem for the all-kinds export.
pub const ALL_FILE_STEM: &str = "AllAssignments";

/// File stem for a group export. Characters unsafe in file names become `_`.
pub fn group_file_stem(group_name: &str) -> String {
    let safe: String = group_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("Group_{}Assignments", safe)
}

/// Writes aggregates to the configured output directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    config: OutputConfig,
}

impl Exporter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Writes the edges of one kind.
    pub fn export_kind(
        &self,
        kind: ResourceKind,
        edges: &[AssignmentEdge],
    ) -> ExportResult<Vec<PathBuf>> {
        self.write_table(&kind_file_stem(kind), edges)
    }

    /// Writes the all-kinds aggregate.
    pub fn export_all(&self, edges: &[AssignmentEdge]) -> ExportResult<Vec<PathBuf>> {
        self.write_table(ALL_FILE_STEM, edges)
    }

    /// Writes the edges targeting `group_name`. Returns the matched edges
    /// together with the files written.
    pub fn export_group(
        &self,
        group_name: &str,
        edges: &[AssignmentEdge],
    ) -> ExportResult<(Vec<AssignmentEdge>, Vec<PathBuf>)> {
        let matched = edges_for_group(edges, group_name);
        let written = self.write_table(&group_file_stem(group_name), &matched)?;
        Ok((matched, written))
    }

    /// Writes the graph page, plus the graph document as JSON when JSON
    /// output is enabled.
    pub fn export_graph(&self, edges: &[AssignmentEdge]) -> ExportResult<Vec<PathBuf>> {
        self.ensure_directory()?;
        let document = GraphDocument::from_edges(edges);
        let mut written = Vec::new();

        let html_path = self.config.directory.join(&self.config.graph_file_name);
        document.write_html(&html_path, &self.config.graph)?;
        written.push(html_path);

        if self.config.write_json {
            let json_path = self
                .config
                .directory
                .join(&self.config.graph_file_name)
                .with_extension("json");
            document.write_json(&json_path)?;
            written.push(json_path);
        }

        info!(
            nodes = document.nodes.len(),
            links = document.links.len(),
            "Wrote assignment graph"
        );
        Ok(written)
    }

    fn write_table(&self, stem: &str, edges: &[AssignmentEdge]) -> ExportResult<Vec<PathBuf>> {
        self.ensure_directory()?;
        let mut written = Vec::new();

        if self.config.write_csv {
            let path = self.path_for(stem, "csv");
            write_csv_file(&path, edges)?;
            written.push(path);
        }
        if self.config.write_json {
            let path = self.path_for(stem, "json");
            write_json_file(&path, edges)?;
            written.push(path);
        }

        for path in &written {
            info!(path = %path.display(), rows = edges.len(), "Wrote export file");
        }
        Ok(written)
    }

    fn path_for(&self, stem: &str, extension: &str) -> PathBuf {
        self.config
            .directory
            .join(format!("{}.{}", stem, extension))
    }

    fn ensure_directory(&self) -> ExportResult<()> {
        create_dir(&self.config.directory)
    }
}

fn create_dir(path: &Path) -> ExportResult<()> {
    fs::create_dir_all(path).map_err(|e| ExportError::io(path, e))
}
