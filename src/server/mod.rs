pub mod handlers;
pub mod state;

use crate::config::Config;
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    response::Response,
    routing::{any, get},
};
use metrics_exporter_prometheus::PrometheusHandle;
use state::AppState;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Version header attached to every response
pub const VERSION_HEADER: &str = "x-streamgate-version";

/// Build the router without a metrics recorder (tests, embedding)
pub fn build_router(config: Config) -> Router {
    build_router_with_metrics(config, None)
}

/// Build the router with all routes and middleware
pub fn build_router_with_metrics(
    config: Config,
    metrics_handle: Option<PrometheusHandle>,
) -> Router {
    let is_dev = config.is_dev;
    let redirect_path = config.redirect_path.clone();

    // Create shared application state
    let state = AppState::new(config, metrics_handle);

    // CORS layer: permissive in dev mode for testing with browser players
    let cors = if is_dev {
        info!("CORS: Permissive mode (dev)");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let mut app = Router::new()
        .route("/", any(handlers::redirect::serve_redirect))
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::serve_metrics));

    if redirect_path != "/" {
        app = app.route(&redirect_path, any(handlers::redirect::serve_redirect));
    }

    app.layer(middleware::map_response(add_version_header))
        .layer(cors)
        .with_state(state)
}

async fn add_version_header(mut response: Response) -> Response {
    response.headers_mut().insert(
        VERSION_HEADER,
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    response
}

/// Start the Axum HTTP server
pub async fn start(
    config: Config,
    metrics_handle: Option<PrometheusHandle>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.bind_addr, config.port);
    let redirect_path = config.redirect_path.clone();

    let app = build_router_with_metrics(config, metrics_handle);

    // Bind TCP listener
    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("🚀 Server listening on http://{}", addr);
    info!(
        "📺 Redirect endpoint: http://{}{}?proxy=…&rtp=…&rtsp=…",
        addr, redirect_path
    );

    // Start serving
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
