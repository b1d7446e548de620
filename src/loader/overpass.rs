use super::{drivable, NetworkError, NetworkSource, RawNetwork};
use crate::{graph::NodeId, Radius};
use geo::Point;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};
use url::Url;

/// Street network source backed by an Overpass API interpreter.
#[derive(Debug, Clone)]
pub struct Overpass {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl Overpass {
    pub fn new(client: Client, endpoint: Url, timeout: Duration) -> Self {
        Self {
            client,
            endpoint,
            timeout,
        }
    }
}

impl NetworkSource for Overpass {
    async fn fetch(
        &self,
        center: Point<f64>,
        radius: Radius,
    ) -> Result<RawNetwork, NetworkError> {
        let query = drivable_ways_query(center, radius, self.timeout);
        debug!("overpass query {query}");

        let response = self
            .client
            .post(self.endpoint.clone())
            .form(&[("data", query)])
            .send()
            .await?
            .error_for_status()?
            .json::<OverpassResponse>()
            .await?;

        Ok(RawNetwork::from(response))
    }
}

/// Drivable ways within `radius` of `center`, followed by all of their nodes.
fn drivable_ways_query(center: Point<f64>, radius: Radius, timeout: Duration) -> String {
    format!(
        "[out:json][timeout:{timeout}];way{filter}(around:{radius},{lat},{lon});(._;>;);out;",
        timeout = timeout.as_secs().max(1),
        filter = drivable::OVERPASS_FILTER,
        lat = center.y(),
        lon = center.x(),
    )
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Element {
    Node {
        id: NodeId,
        lat: f64,
        lon: f64,
    },
    Way {
        nodes: Vec<NodeId>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    #[serde(other)]
    Other,
}

impl From<OverpassResponse> for RawNetwork {
    fn from(response: OverpassResponse) -> Self {
        let mut network = RawNetwork::default();

        for element in response.elements {
            match element {
                Element::Node { id, lat, lon } => {
                    network.points.insert(id, Point::new(lon, lat));
                }
                Element::Way { nodes, tags } => {
                    let tags = tags.iter().map(|(key, value)| (key.as_str(), value.as_str()));
                    if drivable::is_drivable(tags) {
                        network.ways.push(nodes);
                    }
                }
                Element::Other => {}
            }
        }

        network
    }
}
