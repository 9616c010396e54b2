use std::fmt;

/// Structural findings produced while deriving the layout.
///
/// None of these abort a run; partially connected or non-tree workflows
/// occur naturally while a user is mid-edit. Callers that want to detect
/// malformed definitions inspect these instead of catching errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A transition pointed at a step id absent from the input; the edge
    /// was dropped.
    DanglingTransition {
        source: String,
        label: String,
        target: String,
    },
    /// A step was reachable from several unrelated loop bodies; the
    /// documented fallback picked the most recently discovered loop.
    AmbiguousMembership {
        step: String,
        chosen: String,
        candidates: Vec<String>,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DanglingTransition {
                source,
                label,
                target,
            } => write!(
                f,
                "transition `{label}` from `{source}` points at unknown step `{target}`; edge dropped"
            ),
            Diagnostic::AmbiguousMembership {
                step,
                chosen,
                candidates,
            } => write!(
                f,
                "step `{step}` is reachable from unrelated loops ({}); assigned to `{chosen}`",
                candidates.join(", ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offenders() {
        let diag = Diagnostic::DanglingTransition {
            source: "a".into(),
            label: "next".into(),
            target: "ghost".into(),
        };
        let text = diag.to_string();
        assert!(text.contains("`ghost`"));
        assert!(text.contains("`next`"));

        let diag = Diagnostic::AmbiguousMembership {
            step: "x".into(),
            chosen: "l2".into(),
            candidates: vec!["l1".into(), "l2".into()],
        };
        assert!(diag.to_string().contains("l1, l2"));
    }
}
