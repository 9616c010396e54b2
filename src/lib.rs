pub mod classify;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod diag;
pub mod dump;
pub mod graph;
pub mod handles;
pub mod layout;
pub mod loops;
pub mod sizing;
pub mod step;

pub use classify::StyleClass;
pub use config::LayoutConfig;
pub use diag::Diagnostic;
pub use dump::{LayoutDump, layout_dump_string, write_layout_dump};
pub use layout::{Handle, LayoutEdge, LayoutNode, WorkflowLayout, compute_layout};
pub use step::{ParseError, Step, StepKind, parse_steps};

#[cfg(feature = "cli")]
pub use cli::run;
