use crate::diag::Diagnostic;
use crate::graph::StepGraph;
use crate::layout::{Handle, LayoutEdge};
use crate::loops::LoopBodies;
use crate::step::StepKind;
use once_cell::sync::Lazy;
use regex::Regex;

static POSITIVE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(approve|true|yes|success|default)$").unwrap());
static NEGATIVE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(reject|false|no|failure|error)$").unwrap());
static LOOP_EXIT_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(done|complete|finished|exit)$").unwrap());

/// Visual class of an edge, derived from its transition label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleClass {
    Positive,
    Negative,
    Neutral,
    LoopExit,
}

impl StyleClass {
    pub fn as_str(self) -> &'static str {
        match self {
            StyleClass::Positive => "positive",
            StyleClass::Negative => "negative",
            StyleClass::Neutral => "neutral",
            StyleClass::LoopExit => "loop-exit",
        }
    }
}

/// Edge stacking order: backward edges sit furthest back, edges touching
/// a loop container behind plain edges, edges inside one body on top.
pub(crate) const Z_EDGE_BACKWARD: i32 = -10;
pub(crate) const Z_EDGE_LOOP: i32 = -5;
pub(crate) const Z_EDGE_DEFAULT: i32 = 0;
pub(crate) const Z_EDGE_BODY: i32 = 10;

pub fn classify_label(label: &str) -> StyleClass {
    if POSITIVE_LABEL.is_match(label) {
        StyleClass::Positive
    } else if NEGATIVE_LABEL.is_match(label) {
        StyleClass::Negative
    } else if LOOP_EXIT_LABEL.is_match(label) {
        StyleClass::LoopExit
    } else {
        StyleClass::Neutral
    }
}

/// Turn raw transitions into drawable edges.
///
/// Dangling targets are dropped with a diagnostic. Containment edges
/// (a loop pointing into its own body) and backward/negative entries
/// into a loop are suppressed entirely. Handles picked here are
/// provisional; the handle pass may flip forward edges that end up
/// pointing upward once positions exist.
pub fn build_edges(
    graph: &StepGraph<'_>,
    bodies: &LoopBodies,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<LayoutEdge> {
    let mut edges = Vec::new();
    for transition in graph.transitions() {
        let source = transition.source;
        let Some(target) = graph.get(transition.target) else {
            diagnostics.push(Diagnostic::DanglingTransition {
                source: source.id.clone(),
                label: transition.label.to_string(),
                target: transition.target.to_string(),
            });
            continue;
        };

        // A loop's edge into its own body is a containment relationship,
        // not a drawn connection. Membership is exclusive, so an edge to
        // a sibling in a different body survives this check.
        if source.kind == StepKind::Loop && bodies.is_member(&source.id, &target.id) {
            continue;
        }

        let style_class = classify_label(transition.label);
        let is_backward = target.order < source.order;

        // Loops are only entered through their forward, non-negative
        // edges; anything else just clutters the diagram.
        if target.kind == StepKind::Loop && (is_backward || style_class == StyleClass::Negative) {
            continue;
        }

        let (source_handle, target_handle) = if is_backward {
            (Handle::LeftSource, Handle::RightTarget)
        } else {
            (Handle::BottomSource, Handle::TopTarget)
        };

        let source_parent = bodies.parent_of(&source.id);
        let target_parent = bodies.parent_of(&target.id);
        let z_index = if is_backward {
            Z_EDGE_BACKWARD
        } else if source_parent.is_some() && source_parent == target_parent {
            Z_EDGE_BODY
        } else if source.kind == StepKind::Loop || target.kind == StepKind::Loop {
            Z_EDGE_LOOP
        } else {
            Z_EDGE_DEFAULT
        };

        edges.push(LayoutEdge {
            id: format!("{}-{}-{}", source.id, transition.label, target.id),
            source: source.id.clone(),
            target: target.id.clone(),
            source_handle,
            target_handle,
            style_class,
            is_backward,
            z_index,
            label: transition.label.to_string(),
        });
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loops::resolve_loop_bodies;
    use crate::step::{Step, parse_steps};

    fn edges_for(input: &str) -> (Vec<LayoutEdge>, Vec<Diagnostic>) {
        let steps: Vec<Step> = parse_steps(input).unwrap();
        let graph = StepGraph::build(&steps);
        let mut diagnostics = Vec::new();
        let bodies = resolve_loop_bodies(&graph, &mut diagnostics);
        let edges = build_edges(&graph, &bodies, &mut diagnostics);
        (edges, diagnostics)
    }

    fn find<'a>(edges: &'a [LayoutEdge], source: &str, target: &str) -> Option<&'a LayoutEdge> {
        edges.iter().find(|e| e.source == source && e.target == target)
    }

    #[test]
    fn labels_classify_case_insensitively() {
        assert_eq!(classify_label("success"), StyleClass::Positive);
        assert_eq!(classify_label("TRUE"), StyleClass::Positive);
        assert_eq!(classify_label("Approve"), StyleClass::Positive);
        assert_eq!(classify_label("failure"), StyleClass::Negative);
        assert_eq!(classify_label("No"), StyleClass::Negative);
        assert_eq!(classify_label("DONE"), StyleClass::LoopExit);
        assert_eq!(classify_label("exit"), StyleClass::LoopExit);
        assert_eq!(classify_label("retry"), StyleClass::Neutral);
        // Only whole-label matches count.
        assert_eq!(classify_label("successful"), StyleClass::Neutral);
    }

    #[test]
    fn backward_edges_route_sideways() {
        let (edges, _) = edges_for(
            r#"[
                {"id": "y", "kind": "llm", "order": 2},
                {"id": "x", "kind": "condition", "order": 5, "transitions": {"false": "y"}}
            ]"#,
        );
        let edge = find(&edges, "x", "y").unwrap();
        assert!(edge.is_backward);
        assert_eq!(edge.style_class, StyleClass::Negative);
        assert_eq!(edge.source_handle, Handle::LeftSource);
        assert_eq!(edge.target_handle, Handle::RightTarget);
        assert_eq!(edge.z_index, Z_EDGE_BACKWARD);
    }

    #[test]
    fn containment_edges_are_suppressed() {
        let (edges, _) = edges_for(
            r#"[
                {"id": "l", "kind": "loop", "order": 1, "transitions": {"loop": "a", "done": "x"}},
                {"id": "a", "kind": "llm", "order": 2, "transitions": {"success": "b"}},
                {"id": "b", "kind": "action", "order": 3, "transitions": {"next": "l"}},
                {"id": "x", "kind": "action", "order": 4}
            ]"#,
        );
        assert!(find(&edges, "l", "a").is_none());
        // The done exit is drawn.
        let done = find(&edges, "l", "x").unwrap();
        assert_eq!(done.style_class, StyleClass::LoopExit);
        // Member-to-member edges inside the body sit on top.
        assert_eq!(find(&edges, "a", "b").unwrap().z_index, Z_EDGE_BODY);
        // The body's backward re-entry into the loop is suppressed.
        assert!(find(&edges, "b", "l").is_none());
    }

    #[test]
    fn negative_entries_into_loops_are_suppressed() {
        let (edges, _) = edges_for(
            r#"[
                {"id": "check", "kind": "condition", "order": 1, "transitions": {"false": "l", "true": "ok"}},
                {"id": "l", "kind": "loop", "order": 2, "transitions": {"done": "ok"}},
                {"id": "ok", "kind": "action", "order": 3}
            ]"#,
        );
        assert!(find(&edges, "check", "l").is_none());
        assert!(find(&edges, "check", "ok").is_some());
    }

    #[test]
    fn forward_entry_into_a_loop_is_kept() {
        let (edges, _) = edges_for(
            r#"[
                {"id": "t", "kind": "trigger", "order": 1, "transitions": {"next": "l"}},
                {"id": "l", "kind": "loop", "order": 2, "transitions": {"done": "x"}},
                {"id": "x", "kind": "action", "order": 3}
            ]"#,
        );
        let entry = find(&edges, "t", "l").unwrap();
        assert!(!entry.is_backward);
        assert_eq!(entry.z_index, Z_EDGE_LOOP);
        assert_eq!(entry.source_handle, Handle::BottomSource);
        assert_eq!(entry.target_handle, Handle::TopTarget);
    }

    #[test]
    fn dangling_targets_drop_with_a_diagnostic() {
        let (edges, diags) = edges_for(
            r#"[{"id": "a", "kind": "action", "order": 1, "transitions": {"next": "ghost"}}]"#,
        );
        assert!(edges.is_empty());
        assert_eq!(diags.len(), 1);
        assert!(matches!(
            &diags[0],
            Diagnostic::DanglingTransition { target, .. } if target == "ghost"
        ));
    }

    #[test]
    fn sibling_edges_across_bodies_survive() {
        // `shared` resolves into l2; the edge from l1 into it is then a
        // cross-body connection, not containment.
        let (edges, diags) = edges_for(
            r#"[
                {"id": "l1", "kind": "loop", "order": 1, "transitions": {"loop": "shared", "done": "x"}},
                {"id": "l2", "kind": "loop", "order": 2, "transitions": {"loop": "shared", "done": "x"}},
                {"id": "shared", "kind": "llm", "order": 3, "transitions": {"success": "x"}},
                {"id": "x", "kind": "action", "order": 4}
            ]"#,
        );
        assert!(!diags.is_empty());
        assert!(find(&edges, "l1", "shared").is_some());
        assert!(find(&edges, "l2", "shared").is_none());
    }
}
