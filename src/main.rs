use axum::{
    extract::State,
    http::{HeaderName, Request},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::time::Duration;
use tokio::signal;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dayfeed::config::Config;
use dayfeed::gateway::GatewayClient;
use dayfeed::metrics;
use dayfeed::routes::ws::{ws_handler, WsState};
use dayfeed::session::StreamSessions;
use dayfeed::stream::StreamContext;

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone)]
pub struct AppState {
    pub ctx: StreamContext,
    pub sessions: StreamSessions,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

// Allow extracting WsState from AppState
impl axum::extract::FromRef<AppState> for WsState {
    fn from_ref(app_state: &AppState) -> Self {
        WsState {
            ctx: app_state.ctx.clone(),
            sessions: app_state.sessions.clone(),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn healthz() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics_handle.render()
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("tower_http=debug".parse().unwrap());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .json(),
        )
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_logging();

    let config = Config::from_env()?;
    let addr = config.socket_addr();

    // Initialize metrics
    info!("Initializing metrics...");
    let metrics_handle = metrics::init_metrics();
    info!("Metrics initialized");

    info!("Starting dayfeed service");
    info!(host = %config.server_host, port = %config.server_port, "Server configuration");
    info!(gateway_url = %config.gateway_url, "Arweave gateway");
    info!(
        page_size = config.page_size,
        block_delay_ms = config.block_delay_ms,
        visual_search_days = config.visual_search_days,
        "Stream configuration"
    );

    // Initialize gateway client
    info!("Initializing gateway client...");
    let gateway = GatewayClient::new(config.gateway_url.clone(), config.gateway_timeout())?;
    info!("Gateway client initialized");

    // Create the stream session registry
    let sessions = StreamSessions::new();

    let state = AppState {
        ctx: StreamContext::from_config(&config, gateway),
        sessions: sessions.clone(),
        metrics_handle,
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_endpoint))
        .route("/ws", get(ws_handler))
        .fallback_service(ServeDir::new(&config.static_dir))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let request_id = request
                        .headers()
                        .get(&X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");

                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_response(|response: &axum::http::Response<_>, latency: Duration, _span: &Span| {
                    tracing::info!(
                        status = %response.status().as_u16(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                })
                .on_failure(|error: tower_http::classify::ServerErrorsFailureClass, latency: Duration, _span: &Span| {
                    tracing::error!(
                        error = %error,
                        latency_ms = %latency.as_millis(),
                        "request failed"
                    );
                }),
        )
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cancel any streams still producing on shutdown
    info!("Cancelling active streams...");
    sessions.cancel_all().await;

    info!("Shutdown complete");
    Ok(())
}
