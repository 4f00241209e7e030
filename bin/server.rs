// COLCX Registry Dashboard - Web Server
// REST API over the dataset store, plus the raw CSVs under /data

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use colcx_dashboard::{
    DashboardConfig, DatasetKind, DatasetStore, DatasetUnavailable, InformationView,
    InitiativesView, LoadPhase, Selector, TaxWithdrawalsView, ViewPayload,
    VoluntaryWithdrawalsView, VERSION,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<DatasetStore>,
    config: Arc<DashboardConfig>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PeriodQuery {
    year: Option<String>,
    month: Option<String>,
    #[serde(default)]
    include_rows: bool,
}

#[derive(Debug, Default, Deserialize)]
struct InitiativeQuery {
    status: Option<String>,
    year: Option<String>,
    country: Option<String>,
    #[serde(default)]
    include_rows: bool,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

fn unavailable(e: DatasetUnavailable) -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, Json(ApiResponse::err(e.to_string()))).into_response()
}

fn unknown_dataset(kind: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::err(format!("unknown dataset: {}", kind))),
    )
        .into_response()
}

fn view_response<V: Serialize, R: Serialize>(view: &V, rows: &[R], include_rows: bool) -> Response {
    Json(ApiResponse::ok(ViewPayload::new(view, rows, include_rows))).into_response()
}

/// Load `kind` if needed; a failed load answers 503 with its message
fn dataset_response(store: &DatasetStore, kind: DatasetKind) -> Response {
    let status = store.load(kind);
    if status.state == LoadPhase::Failed {
        let message = status.error.unwrap_or_else(|| "load failed".to_string());
        return (StatusCode::SERVICE_UNAVAILABLE, Json(ApiResponse::err(message))).into_response();
    }
    Json(ApiResponse::ok(status)).into_response()
}

/// Store access blocks on file or HTTP reads, so it runs off the async workers
async fn blocking<F>(state: AppState, work: F) -> Response
where
    F: FnOnce(&DatasetStore, &DashboardConfig) -> Response + Send + 'static,
{
    match tokio::task::spawn_blocking(move || work(&state.store, &state.config)).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "blocking task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err("internal error")),
            )
                .into_response()
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "OK",
        version: VERSION,
    }))
}

/// GET /api/info - Registry source links
async fn get_info() -> impl IntoResponse {
    Json(ApiResponse::ok(InformationView::build()))
}

/// GET /api/views/tax?year=&month=&include_rows=
async fn get_tax_view(State(state): State<AppState>, Query(query): Query<PeriodQuery>) -> Response {
    blocking(state, move |store, config| match store.withdrawals() {
        Ok(rows) => {
            let view = TaxWithdrawalsView::build(
                &rows,
                Selector::from(query.year.as_deref()),
                Selector::from(query.month.as_deref()),
                config,
            );
            view_response(&view, &view.rows, query.include_rows)
        }
        Err(e) => unavailable(e),
    })
    .await
}

/// GET /api/views/voluntary?year=&month=&include_rows=
async fn get_voluntary_view(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Response {
    blocking(state, move |store, config| match store.certificates() {
        Ok(rows) => {
            let view = VoluntaryWithdrawalsView::build(
                &rows,
                Selector::from(query.year.as_deref()),
                Selector::from(query.month.as_deref()),
                config,
            );
            view_response(&view, &view.rows, query.include_rows)
        }
        Err(e) => unavailable(e),
    })
    .await
}

/// GET /api/views/initiatives?status=&year=&country=&include_rows=
async fn get_initiatives_view(
    State(state): State<AppState>,
    Query(query): Query<InitiativeQuery>,
) -> Response {
    blocking(state, move |store, config| match store.initiatives() {
        Ok(rows) => {
            let view = InitiativesView::build(
                &rows,
                Selector::from(query.status.as_deref()),
                Selector::from(query.year.as_deref()),
                Selector::from(query.country.as_deref()),
                config,
            );
            view_response(&view, &view.rows, query.include_rows)
        }
        Err(e) => unavailable(e),
    })
    .await
}

/// GET /api/datasets/:kind - Load state and schema check
async fn get_dataset(State(state): State<AppState>, Path(kind): Path<String>) -> Response {
    let Some(kind) = DatasetKind::parse(&kind) else {
        return unknown_dataset(&kind);
    };

    blocking(state, move |store, _| dataset_response(store, kind)).await
}

/// POST /api/datasets/:kind/reload - Forget the cached outcome and load again
async fn reload_dataset(State(state): State<AppState>, Path(kind): Path<String>) -> Response {
    let Some(kind) = DatasetKind::parse(&kind) else {
        return unknown_dataset(&kind);
    };

    // Invalidating waits on the slot lock, which an in-flight load holds
    blocking(state, move |store, _| {
        store.invalidate(kind);
        dataset_response(store, kind)
    })
    .await
}

// ============================================================================
// Main Server
// ============================================================================

fn router(state: AppState, data_dir: PathBuf) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/info", get(get_info))
        .route("/views/tax", get(get_tax_view))
        .route("/views/voluntary", get(get_voluntary_view))
        .route("/views/initiatives", get(get_initiatives_view))
        .route("/datasets/:kind", get(get_dataset))
        .route("/datasets/:kind/reload", post(reload_dataset))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .nest_service("/data", ServeDir::new(data_dir.join("data")))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    fmt().with_env_filter(env).init();

    // Optional config path as the only argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = DashboardConfig::load(config_path.as_deref())?;

    let store = DatasetStore::from_config(&config)?;
    info!(source = %store.source().describe(), "🌐 COLCX Dashboard - Web Server");

    let bind_addr = config.bind_addr.clone();
    let data_dir = config.data_dir.clone();
    let state = AppState {
        store: Arc::new(store),
        config: Arc::new(config),
    };

    // Warm the cache without delaying startup
    let warm = state.store.clone();
    tokio::task::spawn_blocking(move || warm.preload());

    let app = router(state, data_dir);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!("🚀 Server running on http://{}", bind_addr);
    info!("   API: http://{}/api/views/tax", bind_addr);

    axum::serve(listener, app).await.context("Failed to start server")?;

    Ok(())
}
