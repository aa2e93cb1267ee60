//! Request decoding: turn the raw query string into named parameters.
//!
//! Two wire conventions are accepted:
//!
//! - **Named** (canonical): `proxy=…&rtp=…&rtsp=…&playseek=…&r2h-token=…&fcc=…`,
//!   each value percent-encoded.
//! - **Composite** (legacy): the first segment is a percent-encoded absolute
//!   URL `http://proxy[:port]/rtp/host:port[?fcc=…]#rtsp://…`, followed by
//!   ordinary `&playseek=…` style parameters. The playback descriptor may
//!   also follow an embedded `&rtsp://` instead of the fragment.
//!
//! Both produce the same [`RequestParams`].

use crate::{
    error::{GateError, Result},
    rewrite::resolver::{LIVE_SCHEME, PLAYBACK_SCHEME, UriParts},
};
use std::borrow::Cow;
use std::collections::HashMap;
use url::{Url, form_urlencoded};

pub const PARAM_PROXY: &str = "proxy";
pub const PARAM_RTP: &str = "rtp";
pub const PARAM_RTSP: &str = "rtsp";
pub const PARAM_PLAYSEEK: &str = "playseek";
pub const PARAM_TOKEN: &str = "r2h-token";
pub const PARAM_FCC: &str = "fcc";

/// Standalone keys that may follow a composite URL segment
const STANDALONE_KEYS: [&str; 3] = [PARAM_PLAYSEEK, PARAM_TOKEN, PARAM_FCC];

/// Which wire convention a request used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    Named,
    Composite,
}

impl Convention {
    pub fn as_str(&self) -> &'static str {
        match self {
            Convention::Named => "named",
            Convention::Composite => "composite",
        }
    }
}

/// Decoded request parameters, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    pub convention: Convention,
    pub proxy: String,
    pub rtp: Option<String>,
    pub rtsp: Option<String>,
    pub playseek: Option<String>,
    pub token: Option<String>,
    pub fcc: Option<String>,
}

/// Decode a raw (still percent-encoded) query string.
///
/// # Errors
/// - [`GateError::MissingInput`] for an empty query string
/// - [`GateError::MissingRequiredParameter`] when no proxy can be located
///   under either convention
pub fn decode_query(raw: &str) -> Result<RequestParams> {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    if raw.is_empty() {
        return Err(GateError::MissingInput);
    }

    let mut pairs = parse_pairs(raw);
    if let Some(proxy) = pairs.remove(PARAM_PROXY) {
        return Ok(RequestParams {
            convention: Convention::Named,
            proxy: decode_nested(proxy),
            rtp: pairs.remove(PARAM_RTP).map(decode_nested),
            rtsp: pairs.remove(PARAM_RTSP).map(decode_nested),
            playseek: pairs.remove(PARAM_PLAYSEEK),
            token: pairs.remove(PARAM_TOKEN),
            fcc: pairs.remove(PARAM_FCC),
        });
    }

    decode_composite(raw)
        .ok_or_else(|| GateError::MissingRequiredParameter(PARAM_PROXY.to_string()))
}

/// Flat `key=value` pairs, form-decoded. The last occurrence of a key wins.
fn parse_pairs(raw: &str) -> HashMap<String, String> {
    form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Undo a second layer of percent-encoding on URL-valued parameters.
///
/// Some clients encode the whole value twice, so after form decoding it
/// still reads `rtp%3A%2F%2F…`.
fn decode_nested(value: String) -> String {
    if value.contains("://") || !value.to_ascii_lowercase().contains("%3a") {
        return value;
    }
    match urlencoding::decode(&value) {
        Ok(Cow::Owned(decoded)) => decoded,
        _ => value,
    }
}

fn decode_composite(raw: &str) -> Option<RequestParams> {
    let (head, tail) = split_composite(raw);
    let head = urlencoding::decode(head).ok()?;

    let (live_part, playback) = split_playback(&head);
    let parts = UriParts::split(live_part)?;
    // The proxy part must be a real URL, not just something with "://" in it
    Url::parse(live_part).ok()?;

    let proxy = format!("{}://{}", parts.scheme, parts.authority);
    let rtp = live_from_path(parts.path);

    let mut standalone = tail.map(parse_pairs).unwrap_or_default();
    let embedded_fcc = parts.query.and_then(|q| {
        form_urlencoded::parse(q.as_bytes())
            .find(|(k, _)| k == PARAM_FCC)
            .map(|(_, v)| v.into_owned())
    });

    Some(RequestParams {
        convention: Convention::Composite,
        proxy,
        rtp,
        rtsp: playback.map(str::to_string),
        playseek: standalone.remove(PARAM_PLAYSEEK),
        token: standalone.remove(PARAM_TOKEN),
        fcc: standalone.remove(PARAM_FCC).or(embedded_fcc),
    })
}

/// Split the composite URL segment from the standalone parameters.
///
/// The segment ends at the first `&` that introduces a standalone key.
fn split_composite(raw: &str) -> (&str, Option<&str>) {
    let cut = STANDALONE_KEYS
        .iter()
        .filter_map(|key| raw.find(&format!("&{key}=")))
        .min();

    match cut {
        Some(idx) => (&raw[..idx], Some(&raw[idx + 1..])),
        None => (raw, None),
    }
}

/// Separate the playback descriptor from a decoded composite URL.
///
/// It is either the fragment or whatever follows an embedded `&rtsp://`
/// (or `?rtsp://`).
fn split_playback(decoded: &str) -> (&str, Option<&str>) {
    if let Some((live, fragment)) = decoded.split_once('#') {
        return (live, Some(fragment).filter(|f| !f.is_empty()));
    }

    let marker = format!("{PLAYBACK_SCHEME}://");
    for (idx, _) in decoded.match_indices(&marker) {
        if idx > 0 && matches!(decoded.as_bytes()[idx - 1], b'&' | b'?') {
            return (&decoded[..idx - 1], Some(&decoded[idx..]));
        }
    }

    (decoded, None)
}

/// Recover an `rtp://` descriptor from a composite URL path.
///
/// Accepts `/rtp://host:port` (raw substitution style) and `/rtp/host:port`
/// (already in proxy path form). Anything else is handed on as-is so the
/// resolver can reject it.
fn live_from_path(path: &str) -> Option<String> {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return None;
    }

    let prefix_len = LIVE_SCHEME.len();
    let lower = path.to_ascii_lowercase();
    if lower.starts_with(&format!("{LIVE_SCHEME}://")) {
        Some(path.to_string())
    } else if lower.starts_with(&format!("{LIVE_SCHEME}/")) {
        Some(format!("{LIVE_SCHEME}://{}", &path[prefix_len + 1..]))
    } else {
        Some(path.to_string())
    }
}
