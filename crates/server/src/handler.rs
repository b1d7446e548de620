use crate::page::Page;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use commute_flows::{
    cache::GraphCache,
    flows::compute_flows,
    loader::{GeocodeError, LoadError, LoadGraph},
    render::{render, status_line, FlowMap, MarkerSelection, RenderOptions, Theme, UnknownTheme},
    Radius, RadiusError,
};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_CITY: &str = "Paris, France";

pub struct HandlerState<L> {
    pub cache: Arc<GraphCache<L>>,
    pub page: Arc<Page>,
    pub markers: MarkerSelection,
}

impl<L> Clone for HandlerState<L> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            page: self.page.clone(),
            markers: self.markers,
        }
    }
}

pub fn router<L: LoadGraph + 'static>(state: HandlerState<L>) -> Router {
    Router::new()
        .route("/", get(index::<L>))
        .route("/api/map", get(map_json::<L>))
        .route("/api/health", get(health))
        .with_state(state)
}

/// Query string of the sidebar form.
#[derive(Debug, Default, Deserialize)]
pub struct MapParams {
    pub theme: Option<String>,
    pub city: Option<String>,
    pub radius: Option<String>,
    pub show_nodes: Option<String>,
}

/// What the sidebar shows, valid or not.
#[derive(Debug, Clone, PartialEq)]
pub struct FormValues {
    pub theme: String,
    pub city: String,
    pub radius: String,
    pub show_nodes: bool,
}

impl From<&MapParams> for FormValues {
    fn from(params: &MapParams) -> Self {
        Self {
            theme: params
                .theme
                .clone()
                .unwrap_or_else(|| Theme::default().to_string()),
            city: params
                .city
                .clone()
                .unwrap_or_else(|| DEFAULT_CITY.to_string()),
            radius: params
                .radius
                .clone()
                .unwrap_or_else(|| Radius::default().to_string()),
            // Browsers leave an unticked checkbox out of a submitted form.
            show_nodes: params.city.is_none() || params.show_nodes.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapRequest {
    pub theme: Theme,
    pub city: String,
    pub radius: Radius,
    pub show_nodes: bool,
}

impl TryFrom<&FormValues> for MapRequest {
    type Error = PageError;

    fn try_from(form: &FormValues) -> Result<Self, Self::Error> {
        let city = form.city.trim();

        if city.is_empty() {
            return Err(PageError::MissingCity);
        }

        Ok(Self {
            theme: form.theme.parse()?,
            city: city.to_string(),
            radius: parse_radius(&form.radius)?,
            show_nodes: form.show_nodes,
        })
    }
}

fn parse_radius(value: &str) -> Result<Radius, PageError> {
    let meters = value
        .trim()
        .parse::<u32>()
        .map_err(|_| PageError::RadiusNotANumber(value.to_string()))?;

    Ok(Radius::try_from(meters)?)
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error("no city given")]
    MissingCity,

    #[error("{0}")]
    Theme(#[from] UnknownTheme),

    #[error("radius {0:?} is not a whole number of meters")]
    RadiusNotANumber(String),

    #[error("{0}")]
    Radius(#[from] RadiusError),

    #[error("{0}")]
    Load(#[from] LoadError),
}

impl PageError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCity
            | Self::Theme(_)
            | Self::RadiusNotANumber(_)
            | Self::Radius(_) => StatusCode::BAD_REQUEST,
            Self::Load(LoadError::Geocode(GeocodeError::NotFound(_))) => StatusCode::NOT_FOUND,
            Self::Load(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MapView {
    pub status: String,
    pub nodes: usize,
    pub edges: usize,
    pub flows: usize,
    pub map: FlowMap,
}

/// Loads (or reuses) the network, computes flows and renders them.
pub async fn build_map<L: LoadGraph>(
    cache: &GraphCache<L>,
    request: &MapRequest,
    markers: MarkerSelection,
) -> Result<MapView, PageError> {
    let loaded = cache.get(&request.city, request.radius).await?;
    let graph = &loaded.graph;

    let flows = compute_flows(graph);

    let options = RenderOptions {
        show_nodes: request.show_nodes,
        theme: request.theme,
        markers,
    };

    Ok(MapView {
        status: status_line(graph),
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        flows: flows.len(),
        map: render(&loaded, &flows, options),
    })
}

async fn resolve<L: LoadGraph>(
    state: &HandlerState<L>,
    form: &FormValues,
) -> Result<MapView, PageError> {
    let request = MapRequest::try_from(form)?;
    let result = build_map(&state.cache, &request, state.markers).await;

    if let Err(error) = &result {
        warn!("{:?} within {} m: {error}", request.city, request.radius);
    }

    result
}

pub struct HandlerResponse {
    status: StatusCode,
    html: Html<String>,
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        (self.status, self.html).into_response()
    }
}

pub async fn index<L: LoadGraph>(
    State(state): State<HandlerState<L>>,
    Query(params): Query<MapParams>,
) -> HandlerResponse {
    let form = FormValues::from(&params);
    let outcome = resolve(&state, &form).await;

    let status = outcome
        .as_ref()
        .map_or_else(PageError::status, |_| StatusCode::OK);

    match state.page.render(&form, &outcome) {
        Ok(html) => HandlerResponse {
            status,
            html: Html(html),
        },
        Err(render_error) => {
            error!("rendering the page failed: {render_error}");
            HandlerResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                html: Html("<h1>Erreur interne</h1>".to_string()),
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub async fn map_json<L: LoadGraph>(
    State(state): State<HandlerState<L>>,
    Query(params): Query<MapParams>,
) -> Response {
    let form = FormValues::from(&params);

    match resolve(&state, &form).await {
        Ok(view) => Json(view).into_response(),
        Err(error) => {
            let body = ErrorBody {
                error: error.to_string(),
            };
            (error.status(), Json(body)).into_response()
        }
    }
}

pub async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod test {
    use super::{
        build_map, index, map_json, FormValues, HandlerState, MapParams, MapRequest,
        PageError, DEFAULT_CITY,
    };
    use crate::page::Page;
    use axum::{
        extract::{Query, State},
        http::{header::CONTENT_TYPE, StatusCode},
        response::IntoResponse,
    };
    use commute_flows::{
        cache::GraphCache,
        graph::RoadGraph,
        loader::{GeocodeError, LoadError, LoadGraph, LoadedGraph, NetworkError},
        render::{MarkerSelection, Theme},
        Radius,
    };
    use geo::Point;
    use std::sync::Arc;

    /// Three nodes in a line for every city except "Atlantis".
    struct LineLoader;

    impl LoadGraph for LineLoader {
        async fn load(&self, city: &str, _radius: Radius) -> Result<LoadedGraph, LoadError> {
            if city == "Atlantis" {
                return Err(GeocodeError::NotFound(city.to_string()).into());
            }

            let mut graph = RoadGraph::default();
            for node_id in 1..=3 {
                graph.add_node(node_id, Point::new(2.35 + node_id as f64 * 0.001, 48.85));
            }
            graph.add_segment(1, 2, 10.);
            graph.add_segment(2, 3, 10.);

            Ok(LoadedGraph {
                graph,
                center: Point::new(2.35, 48.85),
            })
        }
    }

    fn state() -> HandlerState<LineLoader> {
        HandlerState {
            cache: Arc::new(GraphCache::new(LineLoader)),
            page: Arc::new(Page::new().unwrap()),
            markers: MarkerSelection::IterationOrder,
        }
    }

    fn params(city: &str) -> MapParams {
        MapParams {
            theme: Some("Sombre".to_string()),
            city: Some(city.to_string()),
            radius: Some("1500".to_string()),
            show_nodes: Some("on".to_string()),
        }
    }

    #[test]
    fn should_default_an_empty_query() {
        let form = FormValues::from(&MapParams::default());

        assert_eq!(
            form,
            FormValues {
                theme: "Clair".to_string(),
                city: DEFAULT_CITY.to_string(),
                radius: "1000".to_string(),
                show_nodes: true,
            }
        );
    }

    #[test]
    fn should_read_missing_checkbox_as_unticked() {
        let form = FormValues::from(&MapParams {
            show_nodes: None,
            ..params("Lyon")
        });

        assert!(!form.show_nodes);
    }

    #[test]
    fn should_validate_the_form() {
        let form = FormValues::from(&params("  Lyon "));
        let request = MapRequest::try_from(&form).unwrap();

        assert_eq!(request.city, "Lyon");
        assert_eq!(request.theme, Theme::Sombre);
        assert_eq!(request.radius.meters(), 1_500);

        let invalid = [
            FormValues {
                radius: "750".to_string(),
                ..form.clone()
            },
            FormValues {
                radius: "abc".to_string(),
                ..form.clone()
            },
            FormValues {
                radius: String::new(),
                ..form.clone()
            },
            FormValues {
                theme: "Dark".to_string(),
                ..form.clone()
            },
            FormValues {
                city: " ".to_string(),
                ..form.clone()
            },
        ];

        for form in invalid {
            let error = MapRequest::try_from(&form).unwrap_err();
            assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn should_map_load_failures_to_statuses() {
        let not_found = PageError::from(LoadError::from(GeocodeError::NotFound("X".into())));
        let empty = PageError::from(LoadError::from(NetworkError::Empty {
            radius: Radius::default(),
            lat: 0.,
            lon: 0.,
        }));

        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(empty.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn should_build_a_map_of_flows() {
        let cache = GraphCache::new(LineLoader);
        let request = MapRequest::try_from(&FormValues::from(&params("Lyon"))).unwrap();

        let view = build_map(&cache, &request, MarkerSelection::IterationOrder)
            .await
            .unwrap();

        assert_eq!(view.status, "Graphe chargé avec 3 noeuds et 2 arêtes.");
        assert_eq!(view.flows, 3);
        assert_eq!(view.map.polylines.len(), 3);
        assert_eq!(view.map.markers.len(), 3);
        assert!(view.map.tiles.url.contains("dark_all"));
    }

    #[tokio::test]
    async fn should_respond_with_the_page() {
        let response = index(State(state()), Query(params("Lyon")))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn should_respond_not_found_for_unknown_cities() {
        let response = index(State(state()), Query(params("Atlantis")))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_respond_bad_request_for_invalid_radius() {
        let query = MapParams {
            radius: Some("12000".to_string()),
            ..params("Lyon")
        };

        let response = index(State(state()), Query(query)).await.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_render_the_page_for_a_non_numeric_radius() {
        let query = MapParams {
            radius: Some("abc".to_string()),
            ..params("Lyon")
        };

        let response = index(State(state()), Query(query)).await.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers()[CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
    }

    #[tokio::test]
    async fn should_answer_json_for_a_non_numeric_radius() {
        let query = MapParams {
            radius: Some(String::new()),
            ..params("Lyon")
        };

        let response = map_json(State(state()), Query(query)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }
}
