//! Parameter resolution: decode and structurally validate each located
//! parameter into the values the mode selector works with.
//!
//! A bad proxy aborts the request. A bad `rtp` or `rtsp` descriptor does
//! not: it is reported and treated as absent, since the other descriptor
//! may still satisfy the request.

use crate::{
    error::{GateError, Result},
    metrics,
    rewrite::{decoder::RequestParams, diagnostics::Diagnostics, policy::ProxyPolicy},
};
use url::Url;

/// Scheme of a live (multicast) descriptor
pub const LIVE_SCHEME: &str = "rtp";
/// Scheme of a playback (unicast RTSP) descriptor
pub const PLAYBACK_SCHEME: &str = "rtsp";

/// Raw, undecoded pieces of an absolute `scheme://authority/path?query#fragment`
/// string. Slices borrow the input verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UriParts<'a> {
    pub scheme: &'a str,
    pub authority: &'a str,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

impl<'a> UriParts<'a> {
    /// Split an absolute URI without normalizing anything.
    ///
    /// Returns `None` when there is no `scheme://` prefix.
    pub fn split(raw: &'a str) -> Option<Self> {
        let (scheme, rest) = raw.split_once("://")?;
        let valid_scheme = scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid_scheme {
            return None;
        }

        let (rest, fragment) = match rest.split_once('#') {
            Some((r, f)) => (r, Some(f)),
            None => (rest, None),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((r, q)) => (r, Some(q)),
            None => (rest, None),
        };
        let (authority, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };

        Some(Self {
            scheme,
            authority,
            path,
            query,
            fragment,
        })
    }
}

/// `host[:port]` part of an authority
fn strip_userinfo(authority: &str) -> &str {
    authority.rsplit_once('@').map_or(authority, |(_, host_port)| host_port)
}

/// The downstream streaming proxy, normalized to `scheme://host[:port]/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
}

impl ProxyTarget {
    /// Parse a decoded proxy address. Path, query and credentials are dropped.
    pub fn parse(raw: &str) -> Result<Self> {
        let parsed = Url::parse(raw)
            .map_err(|e| GateError::InvalidProxy(format!("{raw}: {e}")))?;

        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| GateError::InvalidProxy(format!("{raw}: no host")))?
            .to_string();

        // Url drops ports equal to the scheme default; keep them if the
        // caller wrote them out.
        let port = parsed.port().or_else(|| {
            let default = parsed.port_or_known_default()?;
            let host_port = strip_userinfo(UriParts::split(raw)?.authority);
            host_port.ends_with(&format!(":{default}")).then_some(default)
        });

        Ok(Self {
            scheme: parsed.scheme().to_string(),
            host,
            port,
        })
    }

    /// `scheme://host[:port]/`, always with the trailing slash
    pub fn base(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}/", self.scheme, self.host, port),
            None => format!("{}://{}/", self.scheme, self.host),
        }
    }
}

/// A multicast live source: `rtp://host[:port]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveDescriptor {
    /// `host[:port]` as written in the descriptor, credentials removed
    pub host_port: String,
}

impl LiveDescriptor {
    /// Validate an `rtp://` descriptor. Its own query is discarded; the
    /// standalone `fcc` parameter supersedes it.
    pub fn parse(raw: &str) -> Result<Self> {
        let parts = UriParts::split(raw)
            .filter(|p| p.scheme.eq_ignore_ascii_case(LIVE_SCHEME))
            .ok_or_else(|| GateError::InvalidLiveDescriptor(format!("{raw}: no rtp:// prefix")))?;
        require_host(raw).map_err(GateError::InvalidLiveDescriptor)?;

        Ok(Self {
            host_port: strip_userinfo(parts.authority).to_string(),
        })
    }
}

/// A unicast playback source: `rtsp://host[:port]/path[?query]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackDescriptor {
    /// Authority exactly as written (may carry port or credentials)
    pub host: String,
    /// Path including its leading `/`, or empty
    pub path: String,
    /// Embedded query, verbatim and without the `?`
    pub query: Option<String>,
}

impl PlaybackDescriptor {
    pub fn parse(raw: &str) -> Result<Self> {
        let parts = UriParts::split(raw)
            .filter(|p| p.scheme.eq_ignore_ascii_case(PLAYBACK_SCHEME))
            .ok_or_else(|| {
                GateError::InvalidPlaybackDescriptor(format!("{raw}: no rtsp:// prefix"))
            })?;
        require_host(raw).map_err(GateError::InvalidPlaybackDescriptor)?;

        Ok(Self {
            host: parts.authority.to_string(),
            path: parts.path.to_string(),
            query: parts.query.filter(|q| !q.is_empty()).map(str::to_string),
        })
    }
}

fn require_host(raw: &str) -> std::result::Result<(), String> {
    let parsed = Url::parse(raw).map_err(|e| format!("{raw}: {e}"))?;
    match parsed.host_str() {
        Some(h) if !h.is_empty() => Ok(()),
        _ => Err(format!("{raw}: no host")),
    }
}

/// Everything the mode selector needs, resolved once per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionInputs {
    pub proxy: ProxyTarget,
    pub live: Option<LiveDescriptor>,
    pub playback: Option<PlaybackDescriptor>,
    pub seek: Option<String>,
    pub token: Option<String>,
    pub fcc: Option<String>,
}

impl SelectionInputs {
    pub fn has_live(&self) -> bool {
        self.live.is_some()
    }

    pub fn has_playback(&self) -> bool {
        self.playback.is_some()
    }

    pub fn has_seek(&self) -> bool {
        self.seek.is_some()
    }
}

/// Resolve decoded request parameters.
///
/// # Errors
/// [`GateError::InvalidProxy`] when the proxy does not parse or the policy
/// rejects its host. Invalid descriptors are never returned as errors.
pub fn resolve(
    params: RequestParams,
    policy: &ProxyPolicy,
    diag: &Diagnostics,
) -> Result<SelectionInputs> {
    let proxy = ProxyTarget::parse(&params.proxy)?;
    policy.check(&proxy)?;
    diag.info(format!("proxy base: {}", proxy.base()));

    let live = params.rtp.as_deref().and_then(|raw| {
        LiveDescriptor::parse(raw)
            .inspect(|d| diag.info(format!("rtp source: {}", d.host_port)))
            .inspect_err(|e| {
                metrics::record_invalid_descriptor(LIVE_SCHEME);
                diag.warn(e.to_string());
            })
            .ok()
    });

    let playback = params.rtsp.as_deref().and_then(|raw| {
        PlaybackDescriptor::parse(raw)
            .inspect(|d| diag.info(format!("rtsp source: {}{}", d.host, d.path)))
            .inspect_err(|e| {
                metrics::record_invalid_descriptor(PLAYBACK_SCHEME);
                diag.warn(e.to_string());
            })
            .ok()
    });

    if let Some(seek) = &params.playseek {
        diag.info(format!("playseek: {seek}"));
    }
    if params.token.is_some() {
        diag.info("r2h-token present");
    }
    if let Some(fcc) = &params.fcc {
        diag.info(format!("fcc: {fcc}"));
    }

    Ok(SelectionInputs {
        proxy,
        live,
        playback,
        seek: params.playseek,
        token: params.token,
        fcc: params.fcc,
    })
}
