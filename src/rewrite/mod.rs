//! Live/playback decision and URL rewriting.
//!
//! Single pass, no shared state: decode → resolve → select → build.

pub mod builder;
pub mod decoder;
pub mod diagnostics;
pub mod policy;
pub mod resolver;
pub mod selector;

pub use diagnostics::{DiagnosticSink, Diagnostics, FileSink, RecordingSink, TracingSink};
pub use policy::ProxyPolicy;
pub use selector::Decision;

use crate::error::{GateError, Result};
use url::Url;

/// Which stream kind a redirect points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    Live,
    Playback,
}

impl RedirectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectKind::Live => "live",
            RedirectKind::Playback => "playback",
        }
    }
}

/// Successful rewrite: where to send the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub kind: RedirectKind,
    pub location: String,
}

/// Run the whole pipeline over a raw query string.
///
/// # Errors
/// Hard failures only: missing input, missing/invalid proxy, no usable
/// source, or a target that cannot be emitted as a `Location` header.
pub fn rewrite(raw_query: &str, policy: &ProxyPolicy, diag: &Diagnostics) -> Result<Redirect> {
    let params = decoder::decode_query(raw_query)?;
    diag.info(format!(
        "{} parameters: proxy={}, rtp={}, rtsp={}",
        params.convention.as_str(),
        params.proxy,
        params.rtp.as_deref().unwrap_or("-"),
        params.rtsp.as_deref().unwrap_or("-"),
    ));

    let inputs = resolver::resolve(params, policy, diag)?;

    let decision = selector::decide(&inputs, diag);
    let kind = match &decision {
        Decision::RedirectLive { .. } => RedirectKind::Live,
        Decision::RedirectPlayback { .. } => RedirectKind::Playback,
        Decision::Reject(e) => return Err(e.clone()),
    };

    let location = builder::build(&inputs.proxy, &decision)
        .ok_or_else(|| GateError::BuildFailure("builder produced no URL".to_string()))?;
    check_location(&location)?;

    diag.info(format!("redirect to: {location}"));
    Ok(Redirect { kind, location })
}

/// Guard against targets a client could not follow.
///
/// The builders escape path and query, so this only trips on an authority
/// that is not plain ASCII.
fn check_location(location: &str) -> Result<()> {
    if let Some(c) = location
        .chars()
        .find(|c| !c.is_ascii() || c.is_ascii_whitespace() || c.is_ascii_control())
    {
        return Err(GateError::BuildFailure(format!(
            "target contains forbidden character {c:?}"
        )));
    }
    Url::parse(location).map_err(|e| GateError::BuildFailure(format!("{location}: {e}")))?;
    Ok(())
}
