use crate::server::state::AppState;
use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// Serve Prometheus metrics in text exposition format
///
/// 404 when the process runs without an installed recorder (tests, embedding).
pub async fn serve_metrics(State(state): State<AppState>) -> Response {
    let Some(handle) = &state.metrics_handle else {
        return (StatusCode::NOT_FOUND, "Metrics recorder not installed").into_response();
    };

    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
        .into_response()
}
