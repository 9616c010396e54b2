use crate::layout::{LayoutEdge, LayoutNode, WorkflowLayout};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Serializable mirror of a computed layout, for the CLI and for
/// consumers that take the layout as JSON rather than in-process.
#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub z_index: i32,
    pub data: NodeDataDump,
}

#[derive(Debug, Serialize)]
pub struct NodeDataDump {
    pub name: String,
    pub order: i64,
    pub is_leaf_node: bool,
    pub is_terminal_node: bool,
    pub incoming_count: usize,
    pub outgoing_count: usize,
    pub top_anchor_split: bool,
    pub bottom_anchor_split: bool,
    pub top_target_anchor: f32,
    pub top_source_anchor: f32,
    pub bottom_target_anchor: f32,
    pub bottom_source_anchor: f32,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: String,
    pub target_handle: String,
    pub style_class: String,
    pub is_backward: bool,
    pub z_index: i32,
    pub label: String,
}

impl LayoutDump {
    pub fn from_layout(layout: &WorkflowLayout) -> Self {
        LayoutDump {
            nodes: layout.nodes.iter().map(NodeDump::from_node).collect(),
            edges: layout.edges.iter().map(EdgeDump::from_edge).collect(),
            diagnostics: layout
                .diagnostics
                .iter()
                .map(|diag| diag.to_string())
                .collect(),
        }
    }
}

impl NodeDump {
    fn from_node(node: &LayoutNode) -> Self {
        NodeDump {
            id: node.id.clone(),
            kind: node.kind.as_str().to_string(),
            x: node.position.x,
            y: node.position.y,
            width: node.width,
            height: node.height,
            parent_id: node.parent_id.clone(),
            z_index: node.z_index,
            data: NodeDataDump {
                name: node.data.name.clone(),
                order: node.data.order,
                is_leaf_node: node.data.is_leaf_node,
                is_terminal_node: node.data.is_terminal_node,
                incoming_count: node.data.incoming_count,
                outgoing_count: node.data.outgoing_count,
                top_anchor_split: node.data.top_anchor_split,
                bottom_anchor_split: node.data.bottom_anchor_split,
                top_target_anchor: node.data.top_target_anchor,
                top_source_anchor: node.data.top_source_anchor,
                bottom_target_anchor: node.data.bottom_target_anchor,
                bottom_source_anchor: node.data.bottom_source_anchor,
            },
        }
    }
}

impl EdgeDump {
    fn from_edge(edge: &LayoutEdge) -> Self {
        EdgeDump {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            source_handle: edge.source_handle.as_str().to_string(),
            target_handle: edge.target_handle.as_str().to_string(),
            style_class: edge.style_class.as_str().to_string(),
            is_backward: edge.is_backward,
            z_index: edge.z_index,
            label: edge.label.clone(),
        }
    }
}

pub fn layout_dump_string(layout: &WorkflowLayout, pretty: bool) -> anyhow::Result<String> {
    let dump = LayoutDump::from_layout(layout);
    let json = if pretty {
        serde_json::to_string_pretty(&dump)?
    } else {
        serde_json::to_string(&dump)?
    };
    Ok(json)
}

pub fn write_layout_dump(path: &Path, layout: &WorkflowLayout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
