//! Home to work flows over the street network of a city.
//!
//! A [`loader::Loader`] geocodes a city and fetches the drivable streets around
//! it, [`cache::GraphCache`] keeps each loaded network for the life of the
//! process, [`flows::compute_flows`] finds shortest paths between the most
//! connected intersections, and [`render::render`] turns all of it into a map.
pub mod cache;
pub mod flows;
pub mod graph;
pub mod loader;
mod radius;
pub mod render;
pub mod simplify;
mod traits;

pub use radius::{Radius, RadiusError};
