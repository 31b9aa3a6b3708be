use std::sync::{Arc, RwLock};

use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tower_http::cors::CorsLayer;

use crate::filters::ranges::to_wire;
use crate::filters::{AggregationType, DataType, FilterStore, Selection};
use crate::grid::{self, CategorizedNodes};
use crate::pricing::PricingClient;
use crate::pricing::dashboard::{self, DashboardSnapshot, ExportRequest};

/// Directory page size; the dropdowns want every node.
const NODE_DIRECTORY_LIMIT: u32 = 1000;

#[derive(Clone)]
struct AppState {
    client: Arc<PricingClient>,
    filters: Arc<RwLock<FilterStore>>,
}

#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// A selection snapshot plus its single-instant view, so clients never
/// recombine the calendar fields themselves.
#[derive(Serialize)]
struct SelectionView {
    #[serde(flatten)]
    selection: Selection,
    selected_instant: Option<String>,
}

impl From<Selection> for SelectionView {
    fn from(selection: Selection) -> Self {
        let selected_instant = selection.selected_instant().map(to_wire);
        Self {
            selection,
            selected_instant,
        }
    }
}

/// Distinguishes an absent field (leave untouched) from an explicit
/// null (clear the selection).
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Partial filter update: every present field is routed through its
/// setter, nothing else is touched.
#[derive(Debug, Default, Deserialize)]
struct FilterUpdate {
    #[serde(default, deserialize_with = "nullable")]
    year: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    month: Option<Option<u32>>,
    #[serde(default, deserialize_with = "nullable")]
    day: Option<Option<u32>>,
    #[serde(default, deserialize_with = "nullable")]
    hour: Option<Option<u32>>,
    #[serde(default, deserialize_with = "nullable")]
    node1: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    node2: Option<Option<i64>>,
    #[serde(default)]
    data_type: Option<DataType>,
    #[serde(default)]
    aggregation: Option<AggregationType>,
    #[serde(default)]
    market: Option<String>,
    /// Convenience for date pickers: spreads one instant across the
    /// four calendar fields, truncated to the hour.
    #[serde(default)]
    datetime: Option<DateTime<Utc>>,
}

impl FilterUpdate {
    fn apply(self, store: &mut FilterStore) {
        if let Some(instant) = self.datetime {
            store.set_datetime(instant);
        }
        if let Some(year) = self.year {
            store.set_year(year);
        }
        if let Some(month) = self.month {
            store.set_month(month);
        }
        if let Some(day) = self.day {
            store.set_day(day);
        }
        if let Some(hour) = self.hour {
            store.set_hour(hour);
        }
        if let Some(node1) = self.node1 {
            store.set_node1(node1);
        }
        if let Some(node2) = self.node2 {
            store.set_node2(node2);
        }
        if let Some(data_type) = self.data_type {
            store.set_data_type(data_type);
        }
        if let Some(aggregation) = self.aggregation {
            store.set_aggregation(aggregation);
        }
        if let Some(market) = self.market {
            store.set_market(market);
        }
    }
}

/// GET /health
async fn health() -> &'static str {
    "OK"
}

/// GET /api/v1/filters
async fn get_filters(State(state): State<AppState>) -> Json<ApiResponse<SelectionView>> {
    match state.filters.read() {
        Ok(store) => Json(ApiResponse::success(store.snapshot().into())),
        Err(_) => Json(ApiResponse::error("filter store poisoned".to_string())),
    }
}

/// PUT /api/v1/filters
async fn update_filters(
    State(state): State<AppState>,
    Json(update): Json<FilterUpdate>,
) -> Json<ApiResponse<SelectionView>> {
    match state.filters.write() {
        Ok(mut store) => {
            update.apply(&mut store);
            Json(ApiResponse::success(store.snapshot().into()))
        }
        Err(_) => Json(ApiResponse::error("filter store poisoned".to_string())),
    }
}

/// POST /api/v1/filters/reset
async fn reset_filters(State(state): State<AppState>) -> Json<ApiResponse<SelectionView>> {
    match state.filters.write() {
        Ok(mut store) => {
            store.reset();
            Json(ApiResponse::success(store.snapshot().into()))
        }
        Err(_) => Json(ApiResponse::error("filter store poisoned".to_string())),
    }
}

/// GET /api/v1/export/request
///
/// Derives the export request body for the current selection, or the
/// blocking message when no primary node is chosen. No request leaves
/// the process here; spreadsheet generation lives elsewhere.
async fn get_export_request(State(state): State<AppState>) -> Json<ApiResponse<ExportRequest>> {
    let selection = match state.filters.read() {
        Ok(store) => store.snapshot(),
        Err(_) => return Json(ApiResponse::error("filter store poisoned".to_string())),
    };

    match dashboard::export_request(&selection) {
        Ok(request) => Json(ApiResponse::success(request)),
        Err(err) => Json(ApiResponse::error(err.to_string())),
    }
}

/// GET /api/v1/dashboard
///
/// Assembles every panel for the selection as it stands right now.
/// Individual panel failures are reported inside the snapshot, never as
/// a request failure.
async fn get_dashboard(State(state): State<AppState>) -> Json<ApiResponse<DashboardSnapshot>> {
    let selection = match state.filters.read() {
        Ok(store) => store.snapshot(),
        Err(_) => return Json(ApiResponse::error("filter store poisoned".to_string())),
    };

    let snapshot = dashboard::refresh_dashboard(&state.client, &selection).await;
    Json(ApiResponse::success(snapshot))
}

/// GET /api/v1/nodes/categories
async fn get_node_categories(
    State(state): State<AppState>,
) -> Json<ApiResponse<CategorizedNodes>> {
    match state.client.nodes(NODE_DIRECTORY_LIMIT).await {
        Ok(nodes) => Json(ApiResponse::success(grid::classify(&nodes))),
        Err(err) => {
            tracing::error!(error = %err, "node directory fetch failed");
            Json(ApiResponse::error(err.to_string()))
        }
    }
}

pub async fn start_server(bind_addr: &str, client: PricingClient) -> anyhow::Result<()> {
    let state = AppState {
        client: Arc::new(client),
        filters: Arc::new(RwLock::new(FilterStore::new())),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/v1/filters", get(get_filters).put(update_filters))
        .route("/api/v1/filters/reset", post(reset_filters))
        .route("/api/v1/dashboard", get(get_dashboard))
        .route("/api/v1/export/request", get(get_export_request))
        .route("/api/v1/nodes/categories", get(get_node_categories))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = bind_addr, "dashboard gateway listening");

    axum::serve(listener, app).await?;

    Ok(())
}
