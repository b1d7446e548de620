use geo::{Distance, Haversine, Point};
use itertools::Itertools;
use petgraph::{algo::astar, prelude::UnGraphMap, visit::Bfs};
use std::collections::{HashMap, HashSet};

pub type NodeId = i64;

/// A path found between two nodes, with its total length in meters.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub length: f64,
    pub path: Vec<NodeId>,
}

/// Undirected street network. Every node has a point (`x` longitude, `y` latitude)
/// and every edge carries the segment length in meters.
///
/// Nodes iterate in the order they were first added.
#[derive(Debug, Clone, Default)]
pub struct RoadGraph {
    points: HashMap<NodeId, Point<f64>>,
    distances: UnGraphMap<NodeId, f64>,
}

impl RoadGraph {
    /// Builds a graph from the node sequences of ways.
    ///
    /// Nodes without a point are truncated, which also splits the way there:
    /// only nodes that are consecutive in the way become connected.
    pub fn from_ways<W>(points: &HashMap<NodeId, Point<f64>>, ways: W) -> Self
    where
        W: IntoIterator,
        W::Item: IntoIterator<Item = NodeId>,
    {
        let mut graph = Self::default();

        for way in ways {
            let located = way
                .into_iter()
                .map(|node_id| points.get(&node_id).map(|point| (node_id, *point)))
                .collect_vec();

            for (node_id, point) in located.iter().flatten() {
                graph.add_node(*node_id, *point);
            }

            for pair in located.iter().tuple_windows() {
                if let (Some((from, from_point)), Some((to, to_point))) = pair {
                    graph.add_segment(*from, *to, Haversine::distance(*from_point, *to_point));
                }
            }
        }

        graph
    }

    pub fn add_node(&mut self, node_id: NodeId, point: Point<f64>) {
        self.points.insert(node_id, point);
        self.distances.add_node(node_id);
    }

    /// Connects two existing nodes. An existing segment keeps the shorter length.
    ///
    /// Returns `false` without changing the graph for self-loops or unknown nodes.
    pub fn add_segment(&mut self, from: NodeId, to: NodeId, length: f64) -> bool {
        if from == to || !self.contains_node(from) || !self.contains_node(to) {
            return false;
        }

        match self.distances.edge_weight_mut(from, to) {
            Some(existing) if length < *existing => *existing = length,
            Some(_) => {}
            None => {
                self.distances.add_edge(from, to, length);
            }
        }

        true
    }

    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.points.contains_key(&node_id)
    }

    pub fn point(&self, node_id: NodeId) -> Option<Point<f64>> {
        self.points.get(&node_id).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.distances.nodes()
    }

    pub fn neighbors(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.distances.neighbors(node_id)
    }

    pub fn segments(&self) -> impl Iterator<Item = (NodeId, NodeId, f64)> + '_ {
        self.distances
            .all_edges()
            .map(|(from, to, length)| (from, to, *length))
    }

    pub fn segment_length(&self, from: NodeId, to: NodeId) -> Option<f64> {
        self.distances.edge_weight(from, to).copied()
    }

    pub fn degree(&self, node_id: NodeId) -> usize {
        self.distances.neighbors(node_id).count()
    }

    /// Every node paired with its degree, in node order.
    pub fn degrees(&self) -> impl Iterator<Item = (NodeId, usize)> + '_ {
        self.nodes().map(|node_id| (node_id, self.degree(node_id)))
    }

    pub fn node_count(&self) -> usize {
        self.distances.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.distances.edge_count()
    }

    /// Shortest path by length, or `None` when either node is unknown or
    /// no path connects them.
    pub fn shortest_path(&self, from: NodeId, to: NodeId) -> Option<Route> {
        if !self.contains_node(from) || !self.contains_node(to) {
            return None;
        }

        astar(
            &self.distances,
            from,
            |finish| finish == to,
            |(_, _, length)| *length,
            |_| 0.,
        )
        .map(|(length, path)| Route { length, path })
    }

    /// Copy of the graph with only the nodes accepted by `keep`, and the
    /// segments between them. Node order is preserved.
    pub fn retain_nodes(&self, keep: impl Fn(NodeId) -> bool) -> RoadGraph {
        let mut graph = RoadGraph::default();

        for node_id in self.nodes().filter(|node_id| keep(*node_id)) {
            if let Some(point) = self.point(node_id) {
                graph.add_node(node_id, point);
            }
        }

        for (from, to, length) in self.segments() {
            graph.add_segment(from, to, length);
        }

        graph
    }

    /// Keeps the connected component with the most nodes.
    /// On a tie the component reached first in node order wins.
    pub fn largest_component(&self) -> RoadGraph {
        let mut seen = HashSet::new();
        let mut largest = Vec::new();

        for start in self.nodes() {
            if seen.contains(&start) {
                continue;
            }

            let mut bfs = Bfs::new(&self.distances, start);
            let mut component = Vec::new();

            while let Some(node_id) = bfs.next(&self.distances) {
                seen.insert(node_id);
                component.push(node_id);
            }

            if component.len() > largest.len() {
                largest = component;
            }
        }

        let largest = largest.into_iter().collect::<HashSet<_>>();
        self.retain_nodes(|node_id| largest.contains(&node_id))
    }
}
