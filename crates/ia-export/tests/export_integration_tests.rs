//! Integration tests for writing export files to disk.

use ia_core::{AssignmentEdge, AssignmentMode, ResourceKind};
use ia_export::{Exporter, GraphDocument, OutputConfig};
use std::fs;
use tempfile::TempDir;

fn sample_edges() -> Vec<AssignmentEdge> {
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
        AssignmentEdge {
            object_name: "Company Portal".into(),
            object_kind: ResourceKind::Application,
            group_id: Some("g1".into()),
            group_name: "Finance".into(),
            mode: AssignmentMode::Included,
        },
    ]
}

fn exporter_in(dir: &TempDir, write_json: bool) -> Exporter {
    Exporter::new(OutputConfig {
        directory: dir.path().join("out"),
        write_json,
        ..Default::default()
    })
}

#[test]
fn test_kind_export_creates_directory_and_file() {
    let dir = TempDir::new().unwrap();
    let exporter = exporter_in(&dir, false);

    let edges: Vec<AssignmentEdge> = sample_edges()
        .into_iter()
        .filter(|e| e.object_kind == ResourceKind::ConfigurationProfile)
        .collect();
    let written = exporter
        .export_kind(ResourceKind::ConfigurationProfile, &edges)
        .unwrap();

    assert_eq!(written.len(), 1);
    assert_eq!(
        written[0],
        dir.path().join("out").join("ConfigurationProfileAssignments.csv")
    );

    let contents = fs::read_to_string(&written[0]).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Name,AssignmentTarget,AssignmentGroupName,AssignmentType,AssignmentMode",
            "Baseline,,All Devices,ConfigurationProfile,Included",
            "Baseline,g1,Finance,ConfigurationProfile,Excluded",
        ]
    );
}

#[test]
fn test_all_export_writes_csv_and_json() {
    let dir = TempDir::new().unwrap();
    let exporter = exporter_in(&dir, true);

    let written = exporter.export_all(&sample_edges()).unwrap();

    assert_eq!(written.len(), 2);
    assert!(written[0].ends_with("AllAssignments.csv"));
    assert!(written[1].ends_with("AllAssignments.json"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&written[1]).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 3);
    assert_eq!(json[2]["AssignmentType"], "Application");
}

#[test]
fn test_group_export_only_contains_matching_rows() {
    let dir = TempDir::new().unwrap();
    let exporter = exporter_in(&dir, false);

    let (matched, written) = exporter.export_group("finance", &sample_edges()).unwrap();

    assert_eq!(matched.len(), 2);
    assert!(written[0].ends_with("Group_financeAssignments.csv"));
    let contents = fs::read_to_string(&written[0]).unwrap();
    assert_eq!(contents.lines().count(), 3);
    assert!(!contents.contains("All Devices"));
}

#[test]
fn test_graph_export() {
    let dir = TempDir::new().unwrap();
    let exporter = exporter_in(&dir, true);

    let written = exporter.export_graph(&sample_edges()).unwrap();

    assert!(written[0].ends_with("AssignmentGraph.html"));
    assert!(written[1].ends_with("AssignmentGraph.json"));

    let html = fs::read_to_string(&written[0]).unwrap();
    assert!(html.contains("vis.Network"));
    assert!(html.contains("(4 nodes, 3 assignments)"));

    let document: GraphDocument =
        serde_json::from_str(&fs::read_to_string(&written[1]).unwrap()).unwrap();
    assert_eq!(document.nodes.len(), 4);
    assert_eq!(document.links.len(), 3);
}

#[test]
fn test_rerun_replaces_previous_file() {
    let dir = TempDir::new().unwrap();
    let exporter = exporter_in(&dir, false);

    exporter.export_all(&sample_edges()).unwrap();
    let written = exporter.export_all(&[]).unwrap();

    let contents = fs::read_to_string(&written[0]).unwrap();
    assert_eq!(contents.lines().count(), 1);
}
