use axum::{
    routing::get,
    Router,
    Json,
    response::{IntoResponse, Response},
    extract::State,
    http::{header, Uri, StatusCode},
    body::Body,
};
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use rust_embed::RustEmbed;
use crate::BrokerScope;
use crate::dashboard::models::system::SystemSnapshot;
use crate::dashboard::models::topology::{Connection, Data, Exchange, Queue};

// Embed the frontend build directory
#[derive(RustEmbed)]
#[folder = "dashboard/dist/"]
struct Assets;

pub fn router(engine: BrokerScope) -> Router {
    Router::new()
        .route("/api/data", get(get_data))
        .route("/api/connections", get(get_connections))
        .route("/api/queues", get(get_queues))
        .route("/api/exchanges", get(get_exchanges))
        .route("/api/system", get(get_system))
        .layer(CompressionLayer::new())
        .fallback(static_handler)
        .with_state(engine)
}

/// Serves the dashboard on an already bound listener until the server stops.
pub async fn serve(listener: TcpListener, engine: BrokerScope) -> std::io::Result<()> {
    axum::serve(listener, router(engine)).await
}

pub async fn start_dashboard_server(engine: BrokerScope, host: &str, port: u16) -> std::io::Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Dashboard available at http://{}", listener.local_addr()?);
    serve(listener, engine).await
}

pub async fn get_data(State(engine): State<BrokerScope>) -> Json<Data> {
    Json(engine.topology.snapshot())
}

pub async fn get_connections(State(engine): State<BrokerScope>) -> Json<Vec<Connection>> {
    Json(engine.topology.snapshot().connections)
}

pub async fn get_queues(State(engine): State<BrokerScope>) -> Json<Vec<Queue>> {
    Json(engine.topology.snapshot().queues)
}

pub async fn get_exchanges(State(engine): State<BrokerScope>) -> Json<Vec<Exchange>> {
    Json(engine.topology.snapshot().exchanges)
}

pub async fn get_system(State(engine): State<BrokerScope>) -> Json<SystemSnapshot> {
    Json(engine.system_snapshot())
}

fn embedded(path: &str) -> Option<Response> {
    let content = Assets::get(path)?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Some(([(header::CONTENT_TYPE, mime.as_ref())], Body::from(content.data)).into_response())
}

// Handler for serving embedded static files (SPA support)
async fn static_handler(uri: Uri) -> Response {
    let path = match uri.path().trim_start_matches('/') {
        "" => "index.html",
        other => other,
    };

    embedded(path)
        // SPA Fallback: if file not found, serve index.html
        .or_else(|| embedded("index.html"))
        .unwrap_or_else(|| (StatusCode::NOT_FOUND, "Dashboard not found (index.html missing)").into_response())
}
