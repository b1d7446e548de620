mod handler;
mod page;

use anyhow::Result;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, LevelFilter, Verbosity};
use commute_flows::{
    cache::{GraphCache, MemoryStore},
    loader::{Loader, LoaderOptions, Nominatim, Overpass, PbfExtract, StreetSource},
    render::MarkerSelection,
};
use handler::HandlerState;
use log::info;
use page::Page;
use std::{net::SocketAddr, num::NonZeroUsize, path::PathBuf, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use url::Url;

/// Nominatim and Overpass both ask clients to identify themselves.
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[tokio::main]
async fn main() -> Result<()> {
    let args = try_get_args()?;

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(args.timeout)
        .build()?;

    let geocoder = Nominatim::new(client.clone(), args.nominatim);
    let source = match args.pbf {
        Some(path) => StreetSource::Pbf(PbfExtract::new(path)),
        None => StreetSource::Overpass(Overpass::new(client, args.overpass, args.timeout)),
    };
    let loader = Loader::new(geocoder, source, args.loader);

    let store = args
        .cache_capacity
        .map_or_else(MemoryStore::unbounded, MemoryStore::with_capacity);

    let state = HandlerState {
        cache: Arc::new(GraphCache::with_store(loader, store)),
        page: Arc::new(Page::new()?),
        markers: args.markers,
    };

    let listener = TcpListener::bind(args.bind).await?;
    info!("serving on http://{}", listener.local_addr()?);

    axum::serve(listener, handler::router(state)).await?;

    Ok(())
}

fn setup_logger(level: LevelFilter) -> Result<()> {
    env_logger::Builder::new().filter_level(level).try_init()?;
    Ok(())
}

fn try_get_args() -> Result<ParsedArgs> {
    let raw_args = RawArgs::parse();

    setup_logger(raw_args.verbose.log_level_filter())?;

    let args = ParsedArgs::from(raw_args);

    Ok(args)
}

/// Serves a map of notional home to work flows between the busiest
/// intersections of a city.
#[derive(Debug, Parser)]
#[command(version, about)]
struct RawArgs {
    /// Address to serve the page on.
    #[arg(long, env = "COMMUTE_FLOWS_BIND", default_value = "127.0.0.1:8501")]
    bind: SocketAddr,

    /// Nominatim search endpoint used to geocode city names.
    #[arg(
        long,
        env = "COMMUTE_FLOWS_NOMINATIM",
        default_value = "https://nominatim.openstreetmap.org/search"
    )]
    nominatim: Url,

    /// Overpass API interpreter queried for streets.
    #[arg(
        long,
        env = "COMMUTE_FLOWS_OVERPASS",
        default_value = "https://overpass-api.de/api/interpreter"
    )]
    overpass: Url,

    /// Reads streets from this `.osm.pbf` extract instead of the Overpass API.
    #[arg(long, env = "COMMUTE_FLOWS_PBF")]
    pbf: Option<PathBuf>,

    /// Seconds to wait on geocoding and street requests.
    #[arg(long, env = "COMMUTE_FLOWS_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Most (city, radius) networks kept in memory.
    /// Defaults to keeping every network for the life of the process.
    #[arg(long, env = "COMMUTE_FLOWS_CACHE_CAPACITY")]
    cache_capacity: Option<NonZeroUsize>,

    /// Nodes that get a marker: `iteration-order` for the first 50 loaded,
    /// `top-degree` for the 50 most connected.
    #[arg(long, env = "COMMUTE_FLOWS_MARKERS", default_value = "iteration-order")]
    markers: MarkerSelection,

    /// Keeps every node instead of contracting chains between intersections.
    #[arg(long)]
    no_simplify: bool,

    /// Keeps every connected component instead of only the largest.
    #[arg(long)]
    retain_all: bool,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Debug)]
struct ParsedArgs {
    bind: SocketAddr,
    nominatim: Url,
    overpass: Url,
    pbf: Option<PathBuf>,
    timeout: Duration,
    cache_capacity: Option<NonZeroUsize>,
    markers: MarkerSelection,
    loader: LoaderOptions,
}

impl From<RawArgs> for ParsedArgs {
    fn from(
        RawArgs {
            bind,
            nominatim,
            overpass,
            pbf,
            timeout,
            cache_capacity,
            markers,
            no_simplify,
            retain_all,
            ..
        }: RawArgs,
    ) -> Self {
        Self {
            bind,
            nominatim,
            overpass,
            pbf,
            timeout: Duration::from_secs(timeout),
            cache_capacity,
            markers,
            loader: LoaderOptions {
                simplify: !no_simplify,
                retain_all,
            },
        }
    }
}
