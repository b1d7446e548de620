use crate::graph::{NodeId, RoadGraph};
use log::debug;
use std::collections::HashSet;

/// Only keep the nodes where streets meet or end.
///
/// Every chain of degree 2 nodes is contracted into one segment between the
/// nodes at its ends, whose length is the sum of the chain. A cycle made only
/// of degree 2 nodes keeps its first node.
pub fn simplify(graph: &RoadGraph) -> RoadGraph {
    let mut kept = graph
        .nodes()
        .filter(|node_id| graph.degree(*node_id) != 2)
        .collect::<HashSet<_>>();
    let mut covered = HashSet::new();
    let mut segments = Vec::new();

    for start in graph.nodes().filter(|node_id| kept.contains(node_id)) {
        for first in graph.neighbors(start) {
            let chain = walk(graph, start, first);
            covered.extend(chain.interior);
            segments.push((start, chain.end, chain.length));
        }
    }

    for node_id in graph.nodes() {
        if kept.contains(&node_id) || covered.contains(&node_id) {
            continue;
        }

        // Reached only through degree 2 nodes, so this is an isolated loop.
        if let Some(first) = graph.neighbors(node_id).next() {
            covered.extend(walk(graph, node_id, first).interior);
        }
        kept.insert(node_id);
    }

    let mut simplified = RoadGraph::default();

    for node_id in graph.nodes().filter(|node_id| kept.contains(node_id)) {
        if let Some(point) = graph.point(node_id) {
            simplified.add_node(node_id, point);
        }
    }

    for (from, to, length) in segments {
        simplified.add_segment(from, to, length);
    }

    debug!(
        "simplified {} nodes into {}",
        graph.node_count(),
        simplified.node_count()
    );

    simplified
}

struct Chain {
    end: NodeId,
    length: f64,
    interior: Vec<NodeId>,
}

/// Follows degree 2 nodes from `start` through `first` until reaching a node
/// of another degree, or `start` again.
fn walk(graph: &RoadGraph, start: NodeId, first: NodeId) -> Chain {
    let mut previous = start;
    let mut current = first;
    let mut length = graph.segment_length(start, first).unwrap_or_default();
    let mut interior = Vec::new();

    while current != start && graph.degree(current) == 2 {
        interior.push(current);

        let Some(next) = graph.neighbors(current).find(|node_id| *node_id != previous) else {
            break;
        };

        length += graph.segment_length(current, next).unwrap_or_default();
        previous = current;
        current = next;
    }

    Chain {
        end: current,
        length,
        interior,
    }
}
