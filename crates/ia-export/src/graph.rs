//! Graph export.
//!
//! Folds the edge list into a node/link document: one node per distinct
//! display string (object names and group names share one namespace), one
//! directed link per assignment edge, object → group, labelled with the mode.
//!
//! Nodes are keyed by display string, not by id. Two objects that share a
//! display name, or an object named like a group, collapse into one node.

use crate::error::{ExportError, ExportResult};
use ia_core::{AssignmentEdge, AssignmentMode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Role a node was first seen in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Object,
    Group,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: usize,
    pub label: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLink {
    pub from: usize,
    pub to: usize,
    pub label: AssignmentMode,
}

/// Node/link description of an aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl GraphDocument {
    /// Builds the document. Nodes are numbered in first-appearance order.
    pub fn from_edges(edges: &[AssignmentEdge]) -> Self {
        let mut document = GraphDocument::default();
        let mut index: HashMap<String, usize> = HashMap::new();

        for edge in edges {
            let from = document.node_for(&mut index, &edge.object_name, NodeKind::Object);
            let to = document.node_for(&mut index, &edge.group_name, NodeKind::Group);
            document.links.push(GraphLink {
                from,
                to,
                label: edge.mode,
            });
        }

        document
    }

    fn node_for(&mut self, index: &mut HashMap<String, usize>, label: &str, kind: NodeKind) -> usize {
        if let Some(id) = index.get(label) {
            return *id;
        }
        let id = self.nodes.len();
        self.nodes.push(GraphNode {
            id,
            label: label.to_string(),
            kind,
        });
        index.insert(label.to_string(), id);
        id
    }

    pub fn to_json(&self) -> ExportResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Standalone HTML page rendering the document with vis-network.
    pub fn render_html(&self, settings: &GraphSettings) -> ExportResult<String> {
        let nodes: Vec<serde_json::Value> = self
            .nodes
            .iter()
            .map(|node| {
                let color = match node.kind {
                    NodeKind::Object => &settings.object_color,
                    NodeKind::Group => &settings.group_color,
                };
                serde_json::json!({
                    "id": node.id,
                    "label": node.label,
                    "group": node.kind,
                    "color": color,
                    "shape": match node.kind {
                        NodeKind::Object => "box",
                        NodeKind::Group => "ellipse",
                    },
                })
            })
            .collect();
        let links: Vec<serde_json::Value> = self
            .links
            .iter()
            .map(|link| {
                serde_json::json!({
                    "from": link.from,
                    "to": link.to,
                    "label": link.label,
                    "arrows": "to",
                    "dashes": link.label == AssignmentMode::Excluded,
                })
            })
            .collect();

        let html = format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <script src="{script_url}"></script>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 0; }}
        h1 {{ font-size: 18px; padding: 10px 20px; margin: 0; }}
        .legend {{ padding: 0 20px 10px; font-size: 13px; }}
        .swatch {{ display: inline-block; width: 12px; height: 12px; margin: 0 4px 0 12px; }}
        #network {{ width: 100%; height: {height}; border-top: 1px solid #e2e8f0; }}
    </style>
</head>
<body>
    <h1>{title}</h1>
    <div class="legend">
        <span class="swatch" style="background: {object_color}"></span>Object
        <span class="swatch" style="background: {group_color}"></span>Group
        ({node_count} nodes, {link_count} assignments)
    </div>
    <div id="network"></div>
    <script>
        const nodes = new vis.DataSet({nodes});
        const edges = new vis.DataSet({links});
        new vis.Network(document.getElementById("network"), {{ nodes, edges }}, {{
            physics: {{ stabilization: true }},
            edges: {{ font: {{ align: "middle", size: 10 }} }}
        }});
    </script>
</body>
</html>"#,
            title = html_escape(&settings.title),
            script_url = html_escape(&settings.script_url),
            height = html_escape(&settings.height),
            object_color = html_escape(&settings.object_color),
            group_color = html_escape(&settings.group_color),
            node_count = self.nodes.len(),
            link_count = self.links.len(),
            nodes = script_json(&nodes)?,
            links = script_json(&links)?,
        );

        Ok(html)
    }

    pub fn write_html(&self, path: &Path, settings: &GraphSettings) -> ExportResult<()> {
        let html = self.render_html(settings)?;
        fs::write(path, html).map_err(|e| ExportError::io(path, e))
    }

    pub fn write_json(&self, path: &Path) -> ExportResult<()> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|e| ExportError::io(path, e))
    }
}

/// Presentation settings for the HTML graph page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    pub title: String,
    pub script_url: String,
    pub object_color: String,
    pub group_color: String,
    /// CSS height of the drawing area.
    pub height: String,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            title: "Assignment Graph".to_string(),
            script_url: "https://unpkg.com/vis-network/standalone/umd/vis-network.min.js"
                .to_string(),
            object_color: "#97c2fc".to_string(),
            group_color: "#fbcf7e".to_string(),
            height: "90vh".to_string(),
        }
    }
}

/// JSON safe to embed inside a `<script>` element.
fn script_json<T: Serialize>(value: &T) -> ExportResult<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
