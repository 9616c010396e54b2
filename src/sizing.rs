use crate::config::LayoutConfig;
use crate::graph::StepGraph;
use crate::loops::LoopBodies;
use crate::step::StepKind;
use std::collections::{HashMap, HashSet};

/// Recursive, memoized width estimation for loop containers.
///
/// Width depends only on the membership tree, so results are memoized per
/// loop id for the duration of one layout run. An in-progress guard keeps
/// the recursion bounded even if a membership map ever violated the
/// "no loop contains itself" invariant.
pub struct SizeEstimator<'a> {
    graph: &'a StepGraph<'a>,
    bodies: &'a LoopBodies,
    config: &'a LayoutConfig,
    memo: HashMap<String, f32>,
    in_progress: HashSet<String>,
}

impl<'a> SizeEstimator<'a> {
    pub fn new(graph: &'a StepGraph<'a>, bodies: &'a LoopBodies, config: &'a LayoutConfig) -> Self {
        Self {
            graph,
            bodies,
            config,
            memo: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    /// Pixel width required for a loop container.
    pub fn width(&mut self, loop_id: &str) -> f32 {
        if let Some(&width) = self.memo.get(loop_id) {
            return width;
        }
        if !self.in_progress.insert(loop_id.to_string()) {
            return self.config.container_base_width;
        }
        let width = self.compute(loop_id);
        self.in_progress.remove(loop_id);
        self.memo.insert(loop_id.to_string(), width);
        width
    }

    fn compute(&mut self, loop_id: &str) -> f32 {
        let graph = self.graph;
        let bodies = self.bodies;
        let config = self.config;

        let Some(members) = bodies.members(loop_id) else {
            return config.container_base_width;
        };
        if members.is_empty() {
            return config.container_base_width;
        }

        let nested: Vec<&str> = members
            .iter()
            .map(String::as_str)
            .filter(|id| {
                graph
                    .get(id)
                    .is_some_and(|step| step.kind == StepKind::Loop)
            })
            .collect();
        if nested.is_empty() {
            return config.container_base_width;
        }

        // A condition fanning out into a nested loop plus a sibling
        // non-loop branch needs room for both side by side.
        let mut split_widest: Option<f32> = None;
        for member_id in members {
            let Some(step) = graph.get(member_id) else {
                continue;
            };
            if step.kind != StepKind::Condition {
                continue;
            }
            let mut loop_branch_widest: Option<f32> = None;
            let mut has_plain_branch = false;
            for target in step.transitions.values() {
                if !members.contains(target) {
                    continue;
                }
                match graph.get(target).map(|t| t.kind) {
                    Some(StepKind::Loop) => {
                        let width = self.width(target);
                        loop_branch_widest =
                            Some(loop_branch_widest.map_or(width, |cur: f32| cur.max(width)));
                    }
                    Some(_) => has_plain_branch = true,
                    None => {}
                }
            }
            if has_plain_branch {
                if let Some(width) = loop_branch_widest {
                    split_widest = Some(split_widest.map_or(width, |cur: f32| cur.max(width)));
                }
            }
        }
        if let Some(widest) = split_widest {
            let width =
                widest + config.branch_separation + config.node_width + config.container_padding_x;
            return width.min(config.container_max_width);
        }

        let nested_widths: Vec<f32> = nested.iter().map(|id| self.width(id)).collect();
        if let [only] = nested_widths.as_slice() {
            // Loops stack vertically, never side by side.
            return only + config.container_padding_x + config.nesting_margin;
        }

        let side_by_side: f32 = nested_widths.iter().sum::<f32>()
            + config.branch_separation * (nested_widths.len() - 1) as f32;
        let widest = nested_widths.iter().copied().fold(0.0, f32::max);
        let stacked = widest + config.container_padding_x + config.nesting_margin;
        side_by_side.max(stacked).min(config.container_max_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Diagnostic;
    use crate::loops::resolve_loop_bodies;
    use crate::step::{Step, parse_steps};
    use std::collections::{BTreeMap, BTreeSet};

    fn width_of(input: &str, loop_id: &str) -> f32 {
        let steps: Vec<Step> = parse_steps(input).unwrap();
        let graph = StepGraph::build(&steps);
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let bodies = resolve_loop_bodies(&graph, &mut diagnostics);
        let config = LayoutConfig::default();
        let mut sizes = SizeEstimator::new(&graph, &bodies, &config);
        sizes.width(loop_id)
    }

    #[test]
    fn empty_body_gets_base_width() {
        let width = width_of(
            r#"[
                {"id": "l", "kind": "loop", "order": 1, "transitions": {"loop": "a", "done": "x"}},
                {"id": "a", "kind": "action", "order": 2},
                {"id": "x", "kind": "action", "order": 3}
            ]"#,
            "l",
        );
        assert_eq!(width, 640.0);
    }

    #[test]
    fn flat_body_gets_base_width_regardless_of_member_count() {
        let width = width_of(
            r#"[
                {"id": "l", "kind": "loop", "order": 1, "transitions": {"loop": "a", "done": "x"}},
                {"id": "a", "kind": "llm", "order": 2, "transitions": {"success": "b"}},
                {"id": "b", "kind": "llm", "order": 3, "transitions": {"success": "c"}},
                {"id": "c", "kind": "llm", "order": 4, "transitions": {"success": "l"}},
                {"id": "x", "kind": "action", "order": 5}
            ]"#,
            "l",
        );
        assert_eq!(width, 640.0);
    }

    #[test]
    fn single_nested_loop_adds_padding_and_margin() {
        let input = r#"[
            {"id": "outer", "kind": "loop", "order": 1, "transitions": {"loop": "inner", "done": "x"}},
            {"id": "inner", "kind": "loop", "order": 2, "transitions": {"loop": "work", "done": "outer"}},
            {"id": "work", "kind": "llm", "order": 3, "transitions": {"success": "inner"}},
            {"id": "x", "kind": "action", "order": 4}
        ]"#;
        assert_eq!(width_of(input, "inner"), 640.0);
        assert_eq!(width_of(input, "outer"), 640.0 + 32.0 + 64.0);
    }

    #[test]
    fn width_grows_monotonically_with_nesting_depth() {
        let input = r#"[
            {"id": "l1", "kind": "loop", "order": 1, "transitions": {"loop": "l2", "done": "x"}},
            {"id": "l2", "kind": "loop", "order": 2, "transitions": {"loop": "l3", "done": "l1"}},
            {"id": "l3", "kind": "loop", "order": 3, "transitions": {"loop": "work", "done": "l2"}},
            {"id": "work", "kind": "llm", "order": 4, "transitions": {"success": "l3"}},
            {"id": "x", "kind": "action", "order": 5}
        ]"#;
        let (w3, w2, w1) = (
            width_of(input, "l3"),
            width_of(input, "l2"),
            width_of(input, "l1"),
        );
        assert_eq!(w3, 640.0);
        assert!(w2 >= w3 + 96.0);
        assert!(w1 >= w2 + 96.0);
    }

    #[test]
    fn condition_split_reserves_room_for_both_branches() {
        let width = width_of(
            r#"[
                {"id": "outer", "kind": "loop", "order": 1, "transitions": {"loop": "check", "done": "x"}},
                {"id": "check", "kind": "condition", "order": 2, "transitions": {"true": "inner", "false": "fix"}},
                {"id": "inner", "kind": "loop", "order": 3, "transitions": {"loop": "work", "done": "outer"}},
                {"id": "work", "kind": "llm", "order": 4, "transitions": {"success": "inner"}},
                {"id": "fix", "kind": "action", "order": 5, "transitions": {"success": "outer"}},
                {"id": "x", "kind": "action", "order": 6}
            ]"#,
            "outer",
        );
        assert_eq!(width, 640.0 + 120.0 + 300.0 + 32.0);
    }

    #[test]
    fn sibling_nested_loops_take_the_wider_of_row_and_stack() {
        let width = width_of(
            r#"[
                {"id": "outer", "kind": "loop", "order": 1, "transitions": {"loop": "a", "done": "x"}},
                {"id": "a", "kind": "loop", "order": 2, "transitions": {"loop": "wa", "done": "b"}},
                {"id": "wa", "kind": "llm", "order": 3, "transitions": {"success": "a"}},
                {"id": "b", "kind": "loop", "order": 4, "transitions": {"loop": "wb", "done": "outer"}},
                {"id": "wb", "kind": "llm", "order": 5, "transitions": {"success": "b"}},
                {"id": "x", "kind": "action", "order": 6}
            ]"#,
            "outer",
        );
        // Row of two base-width loops beats the stacked estimate.
        assert_eq!(width, 640.0 + 640.0 + 120.0);
    }

    #[test]
    fn width_is_capped_at_the_maximum() {
        let width = width_of(
            r#"[
                {"id": "outer", "kind": "loop", "order": 1, "transitions": {"loop": "a", "done": "x"}},
                {"id": "a", "kind": "loop", "order": 2, "transitions": {"loop": "wa", "done": "b"}},
                {"id": "wa", "kind": "llm", "order": 3, "transitions": {"success": "a"}},
                {"id": "b", "kind": "loop", "order": 4, "transitions": {"loop": "wb", "done": "c"}},
                {"id": "wb", "kind": "llm", "order": 5, "transitions": {"success": "b"}},
                {"id": "c", "kind": "loop", "order": 6, "transitions": {"loop": "wc", "done": "outer"}},
                {"id": "wc", "kind": "llm", "order": 7, "transitions": {"success": "c"}},
                {"id": "x", "kind": "action", "order": 8}
            ]"#,
            "outer",
        );
        assert_eq!(width, 1920.0);
    }

    #[test]
    fn self_referential_membership_cannot_recurse_unboundedly() {
        // Hand-built membership that violates the no-self-containment
        // invariant; the guard must still return a finite width.
        let steps: Vec<Step> =
            parse_steps(r#"[{"id": "l", "kind": "loop", "order": 1, "transitions": {"loop": "l"}}]"#)
                .unwrap();
        let graph = StepGraph::build(&steps);
        let mut members = BTreeMap::new();
        members.insert("l".to_string(), BTreeSet::from(["l".to_string()]));
        let mut parent_of = BTreeMap::new();
        parent_of.insert("l".to_string(), "l".to_string());
        let bodies = LoopBodies::from_parts(members, parent_of);
        let config = LayoutConfig::default();
        let mut sizes = SizeEstimator::new(&graph, &bodies, &config);
        let width = sizes.width("l");
        assert!(width.is_finite());
        assert_eq!(width, 640.0 + 32.0 + 64.0);
    }
}
