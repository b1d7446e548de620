use crate::flows::{top_nodes, Flow};
use crate::graph::{NodeId, RoadGraph};
use crate::loader::LoadedGraph;
use derive_more::Display;
use geo::Point;
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

pub const ZOOM: u8 = 14;

/// How many nodes receive a marker when nodes are shown.
pub const MARKER_LIMIT: usize = 50;

/// `[latitude, longitude]`, the order Leaflet expects.
pub type LatLon = [f64; 2];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum Theme {
    #[default]
    #[display("Clair")]
    Clair,
    #[display("Sombre")]
    Sombre,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown theme {0:?}, expected \"Clair\" or \"Sombre\"")]
pub struct UnknownTheme(pub String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Clair" => Ok(Self::Clair),
            "Sombre" => Ok(Self::Sombre),
            other => Err(UnknownTheme(other.to_string())),
        }
    }
}

impl Theme {
    pub fn tiles(self) -> TileLayer {
        match self {
            Self::Clair => TileLayer {
                url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
                attribution: "© OpenStreetMap contributors",
                subdomains: None,
                max_zoom: 19,
            },
            Self::Sombre => TileLayer {
                url: "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png",
                attribution: "© OpenStreetMap contributors © CARTO",
                subdomains: Some("abcd"),
                max_zoom: 20,
            },
        }
    }
}

/// Which nodes get a marker.
///
/// `IterationOrder` marks the first nodes loaded, regardless of degree, which is
/// independent of the top nodes used for flows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarkerSelection {
    #[default]
    IterationOrder,
    TopDegree,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown marker selection {0:?}, expected \"iteration-order\" or \"top-degree\"")]
pub struct UnknownMarkerSelection(pub String);

impl FromStr for MarkerSelection {
    type Err = UnknownMarkerSelection;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "iteration-order" => Ok(Self::IterationOrder),
            "top-degree" => Ok(Self::TopDegree),
            other => Err(UnknownMarkerSelection(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub show_nodes: bool,
    pub theme: Theme,
    pub markers: MarkerSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayer {
    pub url: &'static str,
    pub attribution: &'static str,
    /// Values for `{s}` in `url`, for tile servers that shard by host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomains: Option<&'static str>,
    pub max_zoom: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircleMarker {
    pub location: LatLon,
    pub radius: u8,
    pub color: &'static str,
    pub fill: bool,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolyLine {
    pub points: Vec<LatLon>,
    pub color: &'static str,
    pub weight: u8,
    pub tooltip: String,
}

/// Everything the page needs to draw the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowMap {
    pub center: LatLon,
    pub zoom: u8,
    pub tiles: TileLayer,
    pub markers: Vec<CircleMarker>,
    pub polylines: Vec<PolyLine>,
}

pub fn render(loaded: &LoadedGraph, flows: &[Flow], options: RenderOptions) -> FlowMap {
    let graph = &loaded.graph;

    let markers = if options.show_nodes {
        marked_nodes(graph, options.markers)
            .into_iter()
            .filter_map(|node_id| {
                let point = graph.point(node_id)?;
                Some(CircleMarker {
                    location: lat_lon(point),
                    radius: 2,
                    color: "blue",
                    fill: true,
                    tooltip: format!("Noeud {node_id} (degré {})", graph.degree(node_id)),
                })
            })
            .collect()
    } else {
        Vec::new()
    };

    let polylines = flows
        .iter()
        .map(|flow| PolyLine {
            points: flow
                .path
                .iter()
                .filter_map(|node_id| graph.point(*node_id))
                .map(lat_lon)
                .collect(),
            color: "red",
            weight: 2,
            tooltip: format!("{} → {} : {:.0} m", flow.source, flow.target, flow.length),
        })
        .collect();

    FlowMap {
        center: lat_lon(loaded.center),
        zoom: ZOOM,
        tiles: options.theme.tiles(),
        markers,
        polylines,
    }
}

/// One line summary of the loaded graph.
pub fn status_line(graph: &RoadGraph) -> String {
    format!(
        "Graphe chargé avec {} noeuds et {} arêtes.",
        graph.node_count(),
        graph.edge_count()
    )
}

fn marked_nodes(graph: &RoadGraph, selection: MarkerSelection) -> Vec<NodeId> {
    match selection {
        MarkerSelection::IterationOrder => graph.nodes().take(MARKER_LIMIT).collect(),
        MarkerSelection::TopDegree => top_nodes(graph, MARKER_LIMIT),
    }
}

fn lat_lon(point: Point<f64>) -> LatLon {
    [point.y(), point.x()]
}

#[cfg(test)]
mod test {
    use super::{render, status_line, MarkerSelection, RenderOptions, Theme, MARKER_LIMIT};
    use crate::flows::compute_flows;
    use crate::graph::RoadGraph;
    use crate::loader::LoadedGraph;
    use geo::Point;
    use itertools::Itertools;

    /// A star: node 0 is the hub, nodes 1..=n hang off it.
    fn star(n: i64) -> LoadedGraph {
        let mut graph = RoadGraph::default();
        for node_id in (1..=n).chain([0]) {
            graph.add_node(node_id, Point::new(node_id as f64, -(node_id as f64)));
        }
        for node_id in 1..=n {
            graph.add_segment(0, node_id, 10.);
        }
        LoadedGraph {
            graph,
            center: Point::new(2.35, 48.85),
        }
    }

    fn options(show_nodes: bool, markers: MarkerSelection) -> RenderOptions {
        RenderOptions {
            show_nodes,
            theme: Theme::Clair,
            markers,
        }
    }

    #[test]
    fn should_center_on_the_geocoded_point() {
        let loaded = star(2);

        let map = render(&loaded, &[], options(false, MarkerSelection::IterationOrder));

        assert_eq!(map.center, [48.85, 2.35]);
        assert_eq!(map.zoom, 14);
        assert!(map.markers.is_empty());
        assert!(map.polylines.is_empty());
    }

    #[test]
    fn should_mark_first_nodes_in_iteration_order() {
        let loaded = star(60);

        let map = render(&loaded, &[], options(true, MarkerSelection::IterationOrder));

        assert_eq!(map.markers.len(), MARKER_LIMIT);
        // The hub is added last, so it is not among the first 50.
        assert_eq!(map.markers[0].location, [-1., 1.]);
        assert!(map.markers.iter().all(|marker| marker.location != [0., 0.]));
    }

    #[test]
    fn should_mark_top_degree_nodes_when_selected() {
        let loaded = star(60);

        let map = render(&loaded, &[], options(true, MarkerSelection::TopDegree));

        assert_eq!(map.markers.len(), MARKER_LIMIT);
        assert_eq!(map.markers[0].location, [0., 0.]);
    }

    #[test]
    fn should_draw_flows_in_path_order() {
        let loaded = star(2);
        let flows = compute_flows(&loaded.graph);

        let map = render(&loaded, &flows, options(false, MarkerSelection::IterationOrder));

        let lines = map
            .polylines
            .iter()
            .map(|line| line.points.clone())
            .collect_vec();
        assert_eq!(
            lines,
            vec![
                vec![[0., 0.], [-1., 1.]],
                vec![[0., 0.], [-2., 2.]],
                vec![[-1., 1.], [0., 0.], [-2., 2.]],
            ]
        );
        assert!(map.polylines.iter().all(|line| line.color == "red"));
    }

    #[test]
    fn should_render_a_single_node() {
        let mut graph = RoadGraph::default();
        graph.add_node(7, Point::new(1., 2.));
        let loaded = LoadedGraph {
            graph,
            center: Point::new(1., 2.),
        };
        let flows = compute_flows(&loaded.graph);

        let map = render(&loaded, &flows, options(true, MarkerSelection::IterationOrder));

        assert_eq!(map.markers.len(), 1);
        assert!(map.polylines.is_empty());
    }

    #[test]
    fn should_pick_tiles_by_theme() {
        assert!(Theme::Clair.tiles().url.contains("openstreetmap"));
        assert!(Theme::Sombre.tiles().url.contains("dark_all"));
        assert_eq!("Sombre".parse::<Theme>(), Ok(Theme::Sombre));
        assert!("Dark".parse::<Theme>().is_err());
    }

    #[test]
    fn should_parse_what_it_displays() {
        for theme in [Theme::Clair, Theme::Sombre] {
            assert_eq!(theme.to_string().parse::<Theme>(), Ok(theme));
        }
        assert_eq!(Theme::default().to_string(), "Clair");
    }

    #[test]
    fn should_only_list_subdomains_used_by_the_url() {
        for theme in [Theme::Clair, Theme::Sombre] {
            let tiles = theme.tiles();
            assert_eq!(tiles.url.contains("{s}"), tiles.subdomains.is_some());
        }
    }

    #[test]
    fn should_summarise_counts() {
        let loaded = star(3);

        assert_eq!(
            status_line(&loaded.graph),
            "Graphe chargé avec 4 noeuds et 3 arêtes."
        );
    }
}
