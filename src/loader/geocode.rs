use geo::Point;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use thiserror::Error;
use url::Url;

/// Resolves a place name to a point (`x` longitude, `y` latitude).
pub trait Geocoder: Send + Sync {
    fn geocode(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Point<f64>, GeocodeError>> + Send;
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    #[error("no place matches {0:?}")]
    NotFound(String),

    #[error("invalid coordinates ({lat:?}, {lon:?}) for {query:?}")]
    InvalidCoordinates {
        query: String,
        lat: String,
        lon: String,
    },
}

/// Search result of a Nominatim compatible API, which sends coordinates as strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

/// Geocoder backed by the `search` endpoint of Nominatim.
#[derive(Debug, Clone)]
pub struct Nominatim {
    client: Client,
    endpoint: Url,
}

impl Nominatim {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

impl Geocoder for Nominatim {
    async fn geocode(&self, query: &str) -> Result<Point<f64>, GeocodeError> {
        let places = self
            .client
            .get(self.endpoint.clone())
            .query(&[("q", query), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Place>>()
            .await?;

        first_point(query, places)
    }
}

fn first_point(query: &str, places: Vec<Place>) -> Result<Point<f64>, GeocodeError> {
    let place = places
        .into_iter()
        .next()
        .ok_or_else(|| GeocodeError::NotFound(query.to_string()))?;

    debug!("{query:?} resolved to {:?}", place.display_name);

    match (place.lat.parse::<f64>(), place.lon.parse::<f64>()) {
        (Ok(lat), Ok(lon)) if lat.is_finite() && lon.is_finite() => Ok(Point::new(lon, lat)),
        _ => Err(GeocodeError::InvalidCoordinates {
            query: query.to_string(),
            lat: place.lat,
            lon: place.lon,
        }),
    }
}
