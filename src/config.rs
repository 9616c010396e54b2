use serde::{Deserialize, Serialize};

/// Geometry constants for the layout engine.
///
/// The defaults are the canonical values the rendering surface is built
/// against; they are not user-tunable through the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Width of an ordinary (non-loop) step node.
    pub node_width: f32,
    /// Height of an ordinary step node.
    pub node_height: f32,
    /// Width of a loop container with no nested loops.
    pub container_base_width: f32,
    /// Hard cap on any computed container width.
    pub container_max_width: f32,
    /// Minimum loop container height, regardless of body contents.
    pub container_min_height: f32,
    /// Space reserved above a loop body, inside the container.
    pub container_top_padding: f32,
    /// Space reserved below a loop body, inside the container.
    pub container_bottom_padding: f32,
    /// Stand-in body height used before the body has been measured.
    pub container_placeholder_body_height: f32,
    /// Horizontal padding added during container width estimation.
    pub container_padding_x: f32,
    /// Side padding children must stay clear of when centered in a container.
    pub child_side_padding: f32,
    /// Horizontal separation between a nested loop and a sibling branch.
    pub branch_separation: f32,
    /// Extra width margin for a container holding a nested loop.
    pub nesting_margin: f32,
    /// Horizontal spacing between top-level siblings.
    pub node_spacing: f32,
    /// Vertical spacing between top-level ranks.
    pub rank_spacing: f32,
    /// Horizontal spacing between siblings inside a container.
    pub child_node_spacing: f32,
    /// Vertical spacing between ranks inside a container.
    pub child_rank_spacing: f32,
    /// Weight for condition-branch and loop-exit edges; low so the
    /// ranking spreads branches horizontally.
    pub branch_edge_weight: f32,
    /// Weight for all other edges; high so chains stack vertically.
    pub default_edge_weight: f32,
    /// Anchor fraction for the target handle on a shared side.
    pub anchor_split_target: f32,
    /// Anchor fraction for the source handle on a shared side.
    pub anchor_split_source: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 300.0,
            node_height: 80.0,
            container_base_width: 640.0,
            container_max_width: 1920.0,
            container_min_height: 300.0,
            container_top_padding: 80.0,
            container_bottom_padding: 40.0,
            container_placeholder_body_height: 180.0,
            container_padding_x: 32.0,
            child_side_padding: 16.0,
            branch_separation: 120.0,
            nesting_margin: 64.0,
            node_spacing: 100.0,
            rank_spacing: 50.0,
            child_node_spacing: 120.0,
            child_rank_spacing: 60.0,
            branch_edge_weight: 0.2,
            default_edge_weight: 2.0,
            anchor_split_target: 0.45,
            anchor_split_source: 0.55,
        }
    }
}

impl LayoutConfig {
    /// Container height used in Pass 1, before the body is measured.
    pub fn container_placeholder_height(&self) -> f32 {
        let estimated = self.container_top_padding
            + self.container_placeholder_body_height
            + self.container_bottom_padding;
        estimated.max(self.container_min_height)
    }
}
