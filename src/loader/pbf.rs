use super::{drivable::is_drivable, NetworkError, NetworkSource, RawNetwork};
use crate::{graph::NodeId, Radius};
use geo::{Distance, Haversine, Point};
use itertools::Itertools;
use log::debug;
use osmpbf::{Element, ElementReader};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

/// Street network source reading a local Open Street Maps PBF extract.
#[derive(Debug, Clone)]
pub struct PbfExtract {
    path: PathBuf,
}

impl PbfExtract {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl NetworkSource for PbfExtract {
    async fn fetch(
        &self,
        center: Point<f64>,
        radius: Radius,
    ) -> Result<RawNetwork, NetworkError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_extract(&path, center, radius)).await?
    }
}

/// Reads the extract twice: nodes within range first, then the drivable ways
/// passing through them.
fn read_extract(
    path: &Path,
    center: Point<f64>,
    radius: Radius,
) -> Result<RawNetwork, NetworkError> {
    let range = f64::from(radius.meters());

    let points = ElementReader::from_path(path)?.par_map_reduce(
        |element| {
            match element {
                Element::Node(node) => Some((node.id(), Point::new(node.lon(), node.lat()))),
                Element::DenseNode(node) => Some((node.id(), Point::new(node.lon(), node.lat()))),
                _ => None,
            }
            .filter(|(_, point)| Haversine::distance(center, *point) <= range)
            .map(|node_id_point| HashMap::from_iter([node_id_point]))
            .unwrap_or_default()
        },
        HashMap::<NodeId, Point<f64>>::new,
        |mut accu, curr| {
            accu.extend(curr);
            accu
        },
    )?;

    debug!("{} nodes within {radius} m in {}", points.len(), path.display());

    let ways = ElementReader::from_path(path)?.par_map_reduce(
        |element| {
            match element {
                Element::Way(way) => Some(way),
                _ => None,
            }
            .filter(|way| is_drivable(way.tags()))
            .map(|way| (way.id(), way.refs().collect_vec()))
            .filter(|(_, refs)| refs.iter().any(|node_id| points.contains_key(node_id)))
            .into_iter()
            .collect_vec()
        },
        Vec::new,
        |mut accu, curr| {
            accu.extend(curr);
            accu
        },
    )?;

    // Parallel reads finish in any order; sort so node order is repeatable.
    let ways = ways
        .into_iter()
        .sorted_by_key(|(way_id, _)| *way_id)
        .map(|(_, refs)| refs)
        .collect();

    Ok(RawNetwork { points, ways })
}
