use crate::{
    error::{GateError, Result},
    metrics,
    rewrite::rewrite,
    server::state::AppState,
};
use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use std::time::Instant;

/// Rewrite the request's query string into a proxy URL and redirect there.
///
/// Any method is accepted; only the query string is consulted. Success is
/// a `302 Found` with an empty body, failures are plain-text 400/500.
pub async fn serve_redirect(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response> {
    let start = Instant::now();
    let diag = &state.diagnostics;

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    diag.info(format!("request received: {proto}://{host}{uri}"));

    let outcome = rewrite(uri.query().unwrap_or(""), &state.policy, diag).and_then(|redirect| {
        let location = HeaderValue::from_str(&redirect.location)
            .map_err(|e| GateError::BuildFailure(format!("Location header: {e}")))?;
        Ok((redirect, location))
    });

    match outcome {
        Ok((redirect, location)) => {
            metrics::record_request("redirect", StatusCode::FOUND.as_u16());
            metrics::record_duration("redirect", start);
            tracing::info!("{} redirect -> {}", redirect.kind.as_str(), redirect.location);

            Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
        }
        Err(e) => {
            diag.warn(format!("request rejected: {e}"));
            metrics::record_request("redirect", e.status().as_u16());
            metrics::record_duration("redirect", start);
            Err(e)
        }
    }
}
