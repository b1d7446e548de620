mod drivable;
mod geocode;
mod overpass;
mod pbf;

pub use drivable::{is_drivable, OVERPASS_FILTER};
pub use geocode::{GeocodeError, Geocoder, Nominatim};
pub use overpass::Overpass;
pub use pbf::PbfExtract;

use crate::{
    graph::{NodeId, RoadGraph},
    simplify::simplify,
    Radius,
};
use geo::{Distance, Haversine, Point};
use log::info;
use std::{collections::HashMap, future::Future};
use thiserror::Error;

/// Nodes and drivable ways as they come out of a source, before any truncation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawNetwork {
    pub points: HashMap<NodeId, Point<f64>>,
    pub ways: Vec<Vec<NodeId>>,
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    #[error("{0}")]
    Pbf(#[from] osmpbf::Error),

    #[error("reading the extract stopped: {0}")]
    Interrupted(#[from] tokio::task::JoinError),

    #[error("no drivable streets within {radius} m of ({lat:.5}, {lon:.5})")]
    Empty { radius: Radius, lat: f64, lon: f64 },
}

/// Where drivable streets around a point come from.
pub trait NetworkSource: Send + Sync {
    fn fetch(
        &self,
        center: Point<f64>,
        radius: Radius,
    ) -> impl Future<Output = Result<RawNetwork, NetworkError>> + Send;
}

/// The sources a server can be configured with.
#[derive(Debug, Clone)]
pub enum StreetSource {
    Overpass(Overpass),
    Pbf(PbfExtract),
}

impl NetworkSource for StreetSource {
    async fn fetch(
        &self,
        center: Point<f64>,
        radius: Radius,
    ) -> Result<RawNetwork, NetworkError> {
        match self {
            Self::Overpass(overpass) => overpass.fetch(center, radius).await,
            Self::Pbf(extract) => extract.fetch(center, radius).await,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("geocoding failed: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("street network retrieval failed: {0}")]
    Network(#[from] NetworkError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Contract chains of degree 2 nodes.
    pub simplify: bool,
    /// Keep every connected component instead of only the largest.
    pub retain_all: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            simplify: true,
            retain_all: false,
        }
    }
}

/// A street network with the geocoded point it was searched around.
#[derive(Debug, Clone)]
pub struct LoadedGraph {
    pub graph: RoadGraph,
    pub center: Point<f64>,
}

pub trait LoadGraph: Send + Sync {
    fn load(
        &self,
        city: &str,
        radius: Radius,
    ) -> impl Future<Output = Result<LoadedGraph, LoadError>> + Send;
}

/// Geocodes a city, then fetches and cleans up the streets around it.
#[derive(Debug, Clone)]
pub struct Loader<G, S> {
    geocoder: G,
    source: S,
    options: LoaderOptions,
}

impl<G, S> Loader<G, S> {
    pub fn new(geocoder: G, source: S, options: LoaderOptions) -> Self {
        Self {
            geocoder,
            source,
            options,
        }
    }
}

impl<G: Geocoder, S: NetworkSource> LoadGraph for Loader<G, S> {
    async fn load(&self, city: &str, radius: Radius) -> Result<LoadedGraph, LoadError> {
        info!("geocoding {city:?}");
        let center = self.geocoder.geocode(city).await?;

        info!(
            "fetching streets within {radius} m of ({}, {})",
            center.y(),
            center.x()
        );
        let network = self.source.fetch(center, radius).await?;

        let graph = build_graph(network, center, radius, self.options);

        if graph.node_count() == 0 {
            return Err(NetworkError::Empty {
                radius,
                lat: center.y(),
                lon: center.x(),
            }
            .into());
        }

        info!(
            "loaded {city:?} with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(LoadedGraph { graph, center })
    }
}

/// Truncates a raw network to `radius` around `center` and turns it into a
/// simple undirected graph.
pub fn build_graph(
    network: RawNetwork,
    center: Point<f64>,
    radius: Radius,
    options: LoaderOptions,
) -> RoadGraph {
    let RawNetwork { mut points, ways } = network;
    let range = f64::from(radius.meters());

    points.retain(|_, point| Haversine::distance(center, *point) <= range);

    let graph = RoadGraph::from_ways(&points, ways);

    let graph = if options.retain_all {
        graph
    } else {
        graph.largest_component()
    };

    if options.simplify {
        simplify(&graph)
    } else {
        graph
    }
}
