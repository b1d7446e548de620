use crate::graph::{NodeId, RoadGraph, Route};
use crate::traits::TopByKey;
use itertools::Itertools;
use log::{debug, trace};
use serde::Serialize;

/// How many of the most connected nodes are paired up into flows.
pub const TOP_NODES: usize = 10;

/// A notional home to work trip: the shortest path between two well
/// connected intersections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flow {
    pub source: NodeId,
    pub target: NodeId,
    pub path: Vec<NodeId>,
    /// Meters.
    pub length: f64,
}

/// The `count` nodes with the highest degree, highest first.
/// Nodes of equal degree keep the graph's node order.
pub fn top_nodes(graph: &RoadGraph, count: usize) -> Vec<NodeId> {
    graph
        .degrees()
        .top_by_key(count, |(_, degree)| *degree)
        .into_iter()
        .map(|(node_id, _)| node_id)
        .collect()
}

/// Shortest paths between every pair of the top nodes.
///
/// Pairs are visited as `(top[0], top[1])`, `(top[0], top[2])`, ...,
/// `(top[1], top[2])`, ... and a pair without a path yields no flow.
pub fn compute_flows(graph: &RoadGraph) -> Vec<Flow> {
    let top = top_nodes(graph, TOP_NODES);
    debug!("top nodes by degree {top:?}");

    let flows = top
        .iter()
        .tuple_combinations()
        .filter_map(|(&source, &target)| {
            let route = graph.shortest_path(source, target);

            if route.is_none() {
                trace!("no path between {source} and {target}");
            }

            route.map(|Route { length, path }| Flow {
                source,
                target,
                path,
                length,
            })
        })
        .collect_vec();

    debug!("computed {} flows between {} nodes", flows.len(), top.len());

    flows
}
