use crate::step::{Step, StepKind};
use std::collections::BTreeMap;

/// One labelled transition, flattened out of a step's transition map.
#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    pub source: &'a Step,
    pub label: &'a str,
    pub target: &'a str,
}

/// Read-only view over the flat step list: declaration order plus id
/// lookup. Builds no layout state of its own.
#[derive(Debug)]
pub struct StepGraph<'a> {
    steps: Vec<&'a Step>,
    index: BTreeMap<&'a str, usize>,
}

impl<'a> StepGraph<'a> {
    pub fn build(steps: &'a [Step]) -> Self {
        let mut ordered = Vec::with_capacity(steps.len());
        let mut index = BTreeMap::new();
        for step in steps {
            // First declaration wins if the caller bypassed parse_steps
            // and fed duplicate ids directly.
            if index.contains_key(step.id.as_str()) {
                continue;
            }
            index.insert(step.id.as_str(), ordered.len());
            ordered.push(step);
        }
        Self {
            steps: ordered,
            index,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Steps in declaration order.
    pub fn steps(&self) -> impl Iterator<Item = &'a Step> + '_ {
        self.steps.iter().copied()
    }

    /// Loop steps in declaration order.
    pub fn loops(&self) -> impl Iterator<Item = &'a Step> + '_ {
        self.steps().filter(|step| step.kind == StepKind::Loop)
    }

    pub fn get(&self, id: &str) -> Option<&'a Step> {
        self.index.get(id).map(|&i| self.steps[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Position of a step in the declaration sequence; used as the
    /// ordering hint handed to the layered layout.
    pub fn declared_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// All transitions in declaration order (steps first, then the
    /// step's labels in their map order). Targets are not validated
    /// here; dangling ids surface during edge construction.
    pub fn transitions(&self) -> impl Iterator<Item = Transition<'a>> + '_ {
        self.steps().flat_map(|step| {
            step.transitions.iter().map(move |(label, target)| Transition {
                source: step,
                label,
                target,
            })
        })
    }
}
