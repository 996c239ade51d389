//! Group-centric views over an aggregate.

use ia_core::AssignmentEdge;

/// Edges whose group name equals `group_name`, ignoring case and
/// surrounding whitespace. Order is preserved.
pub fn edges_for_group(edges: &[AssignmentEdge], group_name: &str) -> Vec<AssignmentEdge> {
    let wanted = group_name.trim().to_lowercase();
    edges
        .iter()
        .filter(|edge| edge.group_name.to_lowercase() == wanted)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ia_core::{AssignmentMode, ResourceKind};

    fn edge(object: &str, group: &str) -> AssignmentEdge {
        AssignmentEdge {
            object_name: object.into(),
            object_kind: ResourceKind::Application,
            group_id: Some(format!("id-{}", group)),
            group_name: group.into(),
            mode: AssignmentMode::Included,
        }
    }

    #[test]
    fn test_case_insensitive_match() {
        let edges = vec![edge("A", "Finance"), edge("B", "Sales"), edge("C", "FINANCE")];
        let matched = edges_for_group(&edges, " finance ");
        let objects: Vec<&str> = matched.iter().map(|e| e.object_name.as_str()).collect();
        assert_eq!(objects, vec!["A", "C"]);
    }

    #[test]
    fn test_no_partial_matches() {
        let edges = vec![edge("A", "Finance EMEA")];
        assert!(edges_for_group(&edges, "Finance").is_empty());
    }
}
