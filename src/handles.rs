use crate::config::LayoutConfig;
use crate::layout::{Handle, LayoutEdge, LayoutNode};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
struct SideUse {
    top_target: usize,
    top_source: usize,
    bottom_target: usize,
    bottom_source: usize,
    incoming: usize,
    outgoing: usize,
}

/// Post-layout handle resolution.
///
/// Forward edges that end up pointing upward (target above source once
/// positions exist) flip to `top-source`/`bottom-target`; backward edges
/// keep their side routing. Afterwards, any node where one side carries
/// both a target and a source anchor gets the two split to 45%/55% of
/// its width. Positions never change here, only handle choices and the
/// anchor fractions exported in node data.
pub fn finalize(nodes: &mut [LayoutNode], edges: &mut [LayoutEdge], config: &LayoutConfig) {
    let index: HashMap<String, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.clone(), i))
        .collect();

    // Absolute vertical centers; members are parent-relative, so walk
    // the container chain (nested loops give more than one hop). The
    // hop cap only guards a malformed parent cycle.
    let center_y: Vec<f32> = nodes
        .iter()
        .map(|node| {
            let mut y = node.position.y + node.height / 2.0;
            let mut parent = node.parent_id.as_deref();
            let mut hops = 0;
            while let Some(parent_id) = parent {
                let Some(&p) = index.get(parent_id) else {
                    break;
                };
                y += nodes[p].position.y;
                parent = nodes[p].parent_id.as_deref();
                hops += 1;
                if hops > 64 {
                    break;
                }
            }
            y
        })
        .collect();

    for edge in edges.iter_mut() {
        if edge.is_backward {
            continue;
        }
        let (Some(&s), Some(&t)) = (index.get(&edge.source), index.get(&edge.target)) else {
            continue;
        };
        if center_y[t] < center_y[s] {
            edge.source_handle = Handle::TopSource;
            edge.target_handle = Handle::BottomTarget;
        } else {
            edge.source_handle = Handle::BottomSource;
            edge.target_handle = Handle::TopTarget;
        }
    }

    let mut uses = vec![SideUse::default(); nodes.len()];
    for edge in edges.iter() {
        if let Some(&s) = index.get(&edge.source) {
            uses[s].outgoing += 1;
            match edge.source_handle {
                Handle::TopSource => uses[s].top_source += 1,
                Handle::BottomSource => uses[s].bottom_source += 1,
                _ => {}
            }
        }
        if let Some(&t) = index.get(&edge.target) {
            uses[t].incoming += 1;
            match edge.target_handle {
                Handle::TopTarget => uses[t].top_target += 1,
                Handle::BottomTarget => uses[t].bottom_target += 1,
                _ => {}
            }
        }
    }

    for (node, side_use) in nodes.iter_mut().zip(uses) {
        node.data.incoming_count = side_use.incoming;
        node.data.outgoing_count = side_use.outgoing;
        if side_use.top_target > 0 && side_use.top_source > 0 {
            node.data.top_anchor_split = true;
            node.data.top_target_anchor = config.anchor_split_target;
            node.data.top_source_anchor = config.anchor_split_source;
        }
        if side_use.bottom_target > 0 && side_use.bottom_source > 0 {
            node.data.bottom_anchor_split = true;
            node.data.bottom_target_anchor = config.anchor_split_target;
            node.data.bottom_source_anchor = config.anchor_split_source;
        }
    }
}
