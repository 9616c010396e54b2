use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// The kind of a workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Start,
    Trigger,
    Llm,
    Condition,
    Loop,
    Action,
}

impl StepKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::Start => "start",
            StepKind::Trigger => "trigger",
            StepKind::Llm => "llm",
            StepKind::Condition => "condition",
            StepKind::Loop => "loop",
            StepKind::Action => "action",
        }
    }
}

/// One step of a workflow definition.
///
/// `transitions` maps a free-form label (`success`, `false`, `loop`,
/// `done`, ...) to the id of the next step. A step with no transitions is
/// a terminal leaf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub kind: StepKind,
    /// Declaration/execution order; used as a layout tie-break and to
    /// detect backward (cycle) edges.
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub transitions: BTreeMap<String, String>,
    /// Display name shown by the rendering surface; falls back to the id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Step {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn is_leaf(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Target of the `loop` transition: the entry point of a loop body.
    pub fn loop_entry(&self) -> Option<&str> {
        self.transitions.get("loop").map(String::as_str)
    }

    /// Target of the `done` transition: the exit boundary of a loop body.
    pub fn loop_exit(&self) -> Option<&str> {
        self.transitions.get("done").map(String::as_str)
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid step list: {0}")]
    Decode(#[from] json5::Error),
    #[error("duplicate step id `{0}`")]
    DuplicateId(String),
}

/// Decode a step list from JSON or JSON5 text.
///
/// JSON5 is accepted so hand-authored workflow files can carry comments
/// and trailing commas; strict JSON parses identically.
pub fn parse_steps(input: &str) -> Result<Vec<Step>, ParseError> {
    let steps: Vec<Step> = json5::from_str(input)?;
    let mut seen = BTreeSet::new();
    for step in &steps {
        if !seen.insert(step.id.as_str()) {
            return Err(ParseError::DuplicateId(step.id.clone()));
        }
    }
    Ok(steps)
}
