use crate::classify::{self, StyleClass};
use crate::config::LayoutConfig;
use crate::diag::Diagnostic;
use crate::graph::StepGraph;
use crate::handles;
use crate::loops::{self, LoopBodies};
use crate::sizing::SizeEstimator;
use crate::step::{Step, StepKind};
use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};
use std::collections::{HashMap, HashSet};

/// Top-left corner of a node, in pixels. Relative to the parent
/// container for loop members, to the canvas origin otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// Named anchor points where an edge attaches to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    TopSource,
    TopTarget,
    BottomSource,
    BottomTarget,
    LeftSource,
    RightTarget,
}

impl Handle {
    pub fn as_str(self) -> &'static str {
        match self {
            Handle::TopSource => "top-source",
            Handle::TopTarget => "top-target",
            Handle::BottomSource => "bottom-source",
            Handle::BottomTarget => "bottom-target",
            Handle::LeftSource => "left-source",
            Handle::RightTarget => "right-target",
        }
    }
}

/// Presentation metadata the rendering surface needs but the layout
/// engine does not interpret further.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub name: String,
    pub order: i64,
    pub is_leaf_node: bool,
    pub is_terminal_node: bool,
    pub incoming_count: usize,
    pub outgoing_count: usize,
    /// Whether the top/bottom anchor had to split into two offset
    /// positions because both an incoming and an outgoing edge use it.
    pub top_anchor_split: bool,
    pub bottom_anchor_split: bool,
    /// Anchor offsets as fractions of the node width (0.5 = centered).
    pub top_target_anchor: f32,
    pub top_source_anchor: f32,
    pub bottom_target_anchor: f32,
    pub bottom_source_anchor: f32,
}

#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub id: String,
    pub kind: StepKind,
    pub width: f32,
    pub height: f32,
    pub position: Position,
    /// Set iff the node is a loop member; always the innermost
    /// enclosing loop container.
    pub parent_id: Option<String>,
    pub z_index: i32,
    pub data: NodeData,
}

#[derive(Debug, Clone)]
pub struct LayoutEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: Handle,
    pub target_handle: Handle,
    pub style_class: StyleClass,
    pub is_backward: bool,
    pub z_index: i32,
    pub label: String,
}

/// The complete computed layout: what the rendering surface consumes.
#[derive(Debug, Clone, Default)]
pub struct WorkflowLayout {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    pub diagnostics: Vec<Diagnostic>,
}

struct WeightedEdge {
    source: String,
    target: String,
    weight: f32,
}

/// Compute the full diagram layout for a step list.
///
/// Pure and infallible: the same input always produces the same output,
/// nothing is shared between invocations, and malformed references or
/// cycles degrade to a best-effort layout instead of an error.
pub fn compute_layout(steps: &[Step], config: &LayoutConfig) -> WorkflowLayout {
    let graph = StepGraph::build(steps);
    if graph.is_empty() {
        return WorkflowLayout::default();
    }

    let mut diagnostics = Vec::new();
    let bodies = loops::resolve_loop_bodies(&graph, &mut diagnostics);
    let mut sizes = SizeEstimator::new(&graph, &bodies, config);
    let mut edges = classify::build_edges(&graph, &bodies, &mut diagnostics);

    let mut nodes = build_nodes(&graph, &bodies, &mut sizes, config);
    let index: HashMap<String, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.clone(), i))
        .collect();

    // Pass 1: top-level nodes with placeholder container heights.
    let top_ids: Vec<String> = nodes
        .iter()
        .filter(|node| node.parent_id.is_none())
        .map(|node| node.id.clone())
        .collect();
    let top_edges = collect_weighted_edges(&edges, &top_ids, &graph, config, false);
    apply_positions(
        &run_layered(
            &graph,
            &top_ids,
            &nodes,
            &index,
            &top_edges,
            config.node_spacing,
            config.rank_spacing,
        ),
        &mut nodes,
        &index,
    );

    // Pass 1b: each loop body laid out independently, then measured.
    layout_loop_bodies(&graph, &bodies, &mut nodes, &index, &edges, config);

    // Pass 2: the top level again, now with corrected container heights,
    // so siblings below a tall loop no longer overlap it. Children keep
    // their Pass-1b positions; only container geometry changed.
    apply_positions(
        &run_layered(
            &graph,
            &top_ids,
            &nodes,
            &index,
            &top_edges,
            config.node_spacing,
            config.rank_spacing,
        ),
        &mut nodes,
        &index,
    );

    handles::finalize(&mut nodes, &mut edges, config);

    WorkflowLayout {
        nodes,
        edges,
        diagnostics,
    }
}

fn build_nodes(
    graph: &StepGraph<'_>,
    bodies: &LoopBodies,
    sizes: &mut SizeEstimator<'_>,
    config: &LayoutConfig,
) -> Vec<LayoutNode> {
    let mut nodes = Vec::with_capacity(graph.len());
    for step in graph.steps() {
        let parent_id = bodies.parent_of(&step.id).map(str::to_string);
        let (width, height) = if step.kind == StepKind::Loop {
            (sizes.width(&step.id), config.container_placeholder_height())
        } else {
            (config.node_width, config.node_height)
        };
        // Members render above their container; nested members above
        // their nested container in turn.
        let z_index = nesting_depth(bodies, &step.id) as i32;
        nodes.push(LayoutNode {
            id: step.id.clone(),
            kind: step.kind,
            width,
            height,
            position: Position::default(),
            parent_id,
            z_index,
            data: NodeData {
                name: step.display_name().to_string(),
                order: step.order,
                is_leaf_node: step.is_leaf(),
                is_terminal_node: step.is_leaf(),
                incoming_count: 0,
                outgoing_count: 0,
                top_anchor_split: false,
                bottom_anchor_split: false,
                top_target_anchor: 0.5,
                top_source_anchor: 0.5,
                bottom_target_anchor: 0.5,
                bottom_source_anchor: 0.5,
            },
        });
    }
    nodes
}

/// Branch edges get a very low weight so the ranking spreads them
/// horizontally; everything else stacks vertically. The loop-exit rule
/// only applies at the top level, it has no meaning inside a body.
fn collect_weighted_edges(
    edges: &[LayoutEdge],
    ids: &[String],
    graph: &StepGraph<'_>,
    config: &LayoutConfig,
    inside_container: bool,
) -> Vec<WeightedEdge> {
    let id_set: HashSet<&str> = ids.iter().map(String::as_str).collect();
    edges
        .iter()
        .filter(|edge| {
            id_set.contains(edge.source.as_str()) && id_set.contains(edge.target.as_str())
        })
        .map(|edge| {
            let branching = graph
                .get(&edge.source)
                .is_some_and(|step| step.kind == StepKind::Condition)
                || (!inside_container && edge.style_class == StyleClass::LoopExit);
            WeightedEdge {
                source: edge.source.clone(),
                target: edge.target.clone(),
                weight: if branching {
                    config.branch_edge_weight
                } else {
                    config.default_edge_weight
                },
            }
        })
        .collect()
}

/// One layered-layout run over a node subset.
///
/// The graph context is created here and dropped on return; nothing is
/// shared across calls. Ranking uses dagre's default network-simplex
/// heuristic with no forced alignment, which lets branches spread
/// naturally.
fn run_layered(
    graph: &StepGraph<'_>,
    ids: &[String],
    nodes: &[LayoutNode],
    index: &HashMap<String, usize>,
    edges: &[WeightedEdge],
    nodesep: f32,
    ranksep: f32,
) -> HashMap<String, Position> {
    if ids.is_empty() {
        return HashMap::new();
    }

    let mut dagre_graph: DagreGraph<DagreConfig, DagreNode, DagreEdge> =
        DagreGraph::new(Some(GraphOption {
            directed: Some(true),
            multigraph: Some(false),
            compound: Some(false),
        }));

    let mut graph_config = DagreConfig::default();
    graph_config.rankdir = Some("TB".to_string());
    graph_config.nodesep = Some(nodesep);
    graph_config.ranksep = Some(ranksep);
    graph_config.marginx = Some(0.0);
    graph_config.marginy = Some(0.0);
    dagre_graph.set_graph(graph_config);

    for id in ids {
        let Some(&i) = index.get(id) else {
            continue;
        };
        let layout = &nodes[i];
        let mut node = DagreNode::default();
        node.width = layout.width;
        node.height = layout.height;
        node.order = graph.declared_index(id);
        dagre_graph.set_node(id.clone(), Some(node));
    }

    let mut edge_set: HashSet<(&str, &str)> = HashSet::new();
    for edge in edges {
        if edge.source == edge.target {
            continue;
        }
        if !edge_set.insert((edge.source.as_str(), edge.target.as_str())) {
            continue;
        }
        let mut edge_label = DagreEdge::default();
        edge_label.minlen = Some(1.0);
        edge_label.weight = Some(edge.weight);
        let _ = dagre_graph.set_edge(&edge.source, &edge.target, Some(edge_label), None);
    }

    dagre_layout::run_layout(&mut dagre_graph);

    let mut positions = HashMap::new();
    for id in ids {
        let Some(dagre_node) = dagre_graph.node(id) else {
            continue;
        };
        let Some(&i) = index.get(id) else {
            continue;
        };
        positions.insert(
            id.clone(),
            Position {
                x: dagre_node.x - nodes[i].width / 2.0,
                y: dagre_node.y - nodes[i].height / 2.0,
            },
        );
    }
    positions
}

fn apply_positions(
    positions: &HashMap<String, Position>,
    nodes: &mut [LayoutNode],
    index: &HashMap<String, usize>,
) {
    for (id, position) in positions {
        if let Some(&i) = index.get(id) {
            nodes[i].position = *position;
        }
    }
}

/// Pass 1b: lay out each loop's members inside the container, center
/// the measured bounding box, and correct the container height.
fn layout_loop_bodies(
    graph: &StepGraph<'_>,
    bodies: &LoopBodies,
    nodes: &mut Vec<LayoutNode>,
    index: &HashMap<String, usize>,
    edges: &[LayoutEdge],
    config: &LayoutConfig,
) {
    // Innermost loops first, so a parent measures its nested containers
    // at their corrected height, not the placeholder. Stable sort keeps
    // declaration order among loops at the same depth.
    let mut ordered: Vec<_> = graph.loops().collect();
    ordered.sort_by_key(|loop_step| std::cmp::Reverse(nesting_depth(bodies, &loop_step.id)));

    for loop_step in ordered {
        let Some(&container_idx) = index.get(loop_step.id.as_str()) else {
            continue;
        };

        // Declaration order, like the top-level pass.
        let member_ids: Vec<String> = graph
            .steps()
            .filter(|step| bodies.is_member(&loop_step.id, &step.id))
            .map(|step| step.id.clone())
            .collect();

        if member_ids.is_empty() {
            nodes[container_idx].height = (config.container_top_padding
                + config.container_bottom_padding)
                .max(config.container_min_height);
            continue;
        }

        let child_edges = collect_weighted_edges(edges, &member_ids, graph, config, true);
        let positions = run_layered(
            graph,
            &member_ids,
            nodes,
            index,
            &child_edges,
            config.child_node_spacing,
            config.child_rank_spacing,
        );

        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for id in &member_ids {
            let Some(position) = positions.get(id) else {
                continue;
            };
            let Some(&i) = index.get(id) else {
                continue;
            };
            min_x = min_x.min(position.x);
            min_y = min_y.min(position.y);
            max_x = max_x.max(position.x + nodes[i].width);
            max_y = max_y.max(position.y + nodes[i].height);
        }
        if min_x > max_x {
            // No member got a position; treat as an empty body.
            nodes[container_idx].height = (config.container_top_padding
                + config.container_bottom_padding)
                .max(config.container_min_height);
            continue;
        }

        let container_width = nodes[container_idx].width;
        let bbox_width = max_x - min_x;
        let bbox_height = max_y - min_y;

        // Center horizontally, but never let a child cross the side
        // padding; when the body is wider than the container the left
        // boundary wins.
        let mut offset_x = (container_width - bbox_width) / 2.0 - min_x;
        offset_x = offset_x.max(config.child_side_padding - min_x);
        let overflow = (min_x + offset_x + bbox_width)
            - (container_width - config.child_side_padding);
        if overflow > 0.0 && bbox_width + 2.0 * config.child_side_padding <= container_width {
            offset_x -= overflow;
        }

        for id in &member_ids {
            let (Some(position), Some(&i)) = (positions.get(id), index.get(id)) else {
                continue;
            };
            nodes[i].position = Position {
                x: position.x + offset_x,
                y: config.container_top_padding + (position.y - min_y),
            };
        }

        nodes[container_idx].height = (config.container_top_padding
            + bbox_height
            + config.container_bottom_padding)
            .max(config.container_min_height);
    }
}

/// How many loop containers enclose a step. The membership map is
/// acyclic by construction; the hop cap only guards a hand-built
/// violation.
fn nesting_depth(bodies: &LoopBodies, step_id: &str) -> usize {
    let mut depth = 0;
    let mut current = step_id;
    while let Some(parent) = bodies.parent_of(current) {
        if parent == current || depth > 64 {
            break;
        }
        depth += 1;
        current = parent;
    }
    depth
}
