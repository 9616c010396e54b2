use crate::diag::Diagnostic;
use crate::graph::StepGraph;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// Loop membership derived from the step graph.
///
/// Membership is exclusive at the innermost enclosing level: a step
/// reachable from several loop bodies belongs to exactly one of them.
#[derive(Debug, Clone, Default)]
pub struct LoopBodies {
    members: BTreeMap<String, BTreeSet<String>>,
    parent_of: BTreeMap<String, String>,
}

impl LoopBodies {
    /// Assigned members of a loop. Every loop step has an entry, empty
    /// for degenerate loops.
    pub fn members(&self, loop_id: &str) -> Option<&BTreeSet<String>> {
        self.members.get(loop_id)
    }

    /// The loop a step was assigned to, if any.
    pub fn parent_of(&self, step_id: &str) -> Option<&str> {
        self.parent_of.get(step_id).map(String::as_str)
    }

    pub fn is_member(&self, loop_id: &str, step_id: &str) -> bool {
        self.parent_of(step_id) == Some(loop_id)
    }

    pub fn loop_ids(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        members: BTreeMap<String, BTreeSet<String>>,
        parent_of: BTreeMap<String, String>,
    ) -> Self {
        Self { members, parent_of }
    }
}

/// Discover loop bodies with a bounded breadth-first walk.
///
/// For each loop step, the walk starts at the `loop` transition target
/// and stops at the loop itself, at its `done` target, and at declared
/// leaves (frontier steps, not folded into the container). The visited
/// set guarantees termination for arbitrarily cyclic inputs.
pub fn resolve_loop_bodies(
    graph: &StepGraph<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> LoopBodies {
    // Raw bodies, in declaration order. A step may show up in several of
    // them; exclusive assignment happens below.
    let mut raw: Vec<(&str, BTreeSet<&str>)> = Vec::new();
    for loop_step in graph.loops() {
        let mut body: BTreeSet<&str> = BTreeSet::new();
        if let Some(entry) = loop_step.loop_entry() {
            let exit = loop_step.loop_exit();
            let mut visited: HashSet<&str> = HashSet::new();
            let mut queue: VecDeque<&str> = VecDeque::new();
            queue.push_back(entry);
            while let Some(id) = queue.pop_front() {
                if !visited.insert(id) {
                    continue;
                }
                if id == loop_step.id {
                    continue;
                }
                if exit == Some(id) {
                    continue;
                }
                let Some(step) = graph.get(id) else {
                    continue;
                };
                if step.is_leaf() {
                    continue;
                }
                body.insert(step.id.as_str());
                for target in step.transitions.values() {
                    queue.push_back(target);
                }
            }
        }
        raw.push((loop_step.id.as_str(), body));
    }

    // Candidate loops per step, in discovery order.
    let mut candidates: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, (_, body)) in raw.iter().enumerate() {
        for member in body {
            candidates.entry(*member).or_default().push(idx);
        }
    }

    let mut members: BTreeMap<String, BTreeSet<String>> = raw
        .iter()
        .map(|(id, _)| (id.to_string(), BTreeSet::new()))
        .collect();
    let mut parent_of: BTreeMap<String, String> = BTreeMap::new();

    for (step_id, loop_indices) in &candidates {
        let chosen = if loop_indices.len() == 1 {
            loop_indices[0]
        } else {
            choose_innermost(&raw, loop_indices, step_id, diagnostics)
        };
        let loop_id = raw[chosen].0;
        members
            .get_mut(loop_id)
            .expect("every discovered loop has a members entry")
            .insert((*step_id).to_string());
        parent_of.insert((*step_id).to_string(), loop_id.to_string());
    }

    LoopBodies { members, parent_of }
}

/// Pick the innermost of several candidate loops: the one that is itself
/// a member of the most other candidates' bodies. When no candidate is
/// nested in another the loops are unrelated, which indicates a non-tree
/// structure; the most recently discovered candidate wins as the
/// documented fallback and a diagnostic records the ambiguity.
fn choose_innermost(
    raw: &[(&str, BTreeSet<&str>)],
    loop_indices: &[usize],
    step_id: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> usize {
    let mut best_idx = loop_indices[0];
    let mut best_depth = 0usize;
    for &candidate in loop_indices {
        let candidate_id = raw[candidate].0;
        let depth = loop_indices
            .iter()
            .filter(|&&other| other != candidate && raw[other].1.contains(candidate_id))
            .count();
        if depth > best_depth || (depth == best_depth && candidate >= best_idx) {
            best_depth = depth;
            best_idx = candidate;
        }
    }
    if best_depth == 0 {
        diagnostics.push(Diagnostic::AmbiguousMembership {
            step: step_id.to_string(),
            chosen: raw[best_idx].0.to_string(),
            candidates: loop_indices.iter().map(|&i| raw[i].0.to_string()).collect(),
        });
    }
    best_idx
}
