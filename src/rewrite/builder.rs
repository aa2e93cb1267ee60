//! URL builders: pure translation of a decision into the proxy's path
//! convention.
//!
//! - live: `<proxyBase>rtp/<host>[:<port>][?fcc=…][&|?r2h-token=…]`
//! - playback: `<proxyBase>rtsp/<host><path>[?<query>][&|?playseek=…][&|?r2h-token=…]`
//!
//! Parameter values are percent-encoded with the RFC 3986 unreserved set
//! left as-is, so decoding them gives back the original text. The playback
//! path and embedded query are copied through, with only bytes that cannot
//! appear in a URI escaped.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::rewrite::{
    decoder::{PARAM_FCC, PARAM_PLAYSEEK, PARAM_TOKEN},
    resolver::{LIVE_SCHEME, PLAYBACK_SCHEME, ProxyTarget},
    selector::Decision,
};

/// Bytes escaped when copying a descriptor path or query. `%` and the
/// reserved delimiters are not in the set, so existing escapes survive.
const NOT_IN_URI: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Build the live redirect target
pub fn build_live_url(
    proxy_base: &str,
    host_port: &str,
    fcc: Option<&str>,
    token: Option<&str>,
) -> String {
    let mut url = join(proxy_base, &format!("{LIVE_SCHEME}/{host_port}"));
    append_param(&mut url, PARAM_FCC, fcc);
    append_token(&mut url, token);
    url
}

/// Build the playback redirect target
pub fn build_playback_url(
    proxy_base: &str,
    host: &str,
    path: &str,
    embedded_query: Option<&str>,
    seek: Option<&str>,
    token: Option<&str>,
) -> String {
    let path = utf8_percent_encode(path, NOT_IN_URI);
    let mut url = join(proxy_base, &format!("{PLAYBACK_SCHEME}/{host}{path}"));
    if let Some(query) = embedded_query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.extend(utf8_percent_encode(query, NOT_IN_URI));
    }
    append_param(&mut url, PARAM_PLAYSEEK, seek);
    append_token(&mut url, token);
    url
}

/// Build the target for a redirect decision. `None` for [`Decision::Reject`].
pub fn build(proxy: &ProxyTarget, decision: &Decision) -> Option<String> {
    let base = proxy.base();
    match decision {
        Decision::RedirectLive { stream, fcc, token } => Some(build_live_url(
            &base,
            &stream.host_port,
            fcc.as_deref(),
            token.as_deref(),
        )),
        Decision::RedirectPlayback {
            stream,
            seek,
            token,
        } => Some(build_playback_url(
            &base,
            &stream.host,
            &stream.path,
            stream.query.as_deref(),
            seek.as_deref(),
            token.as_deref(),
        )),
        Decision::Reject(_) => None,
    }
}

fn join(proxy_base: &str, path: &str) -> String {
    format!("{}/{}", proxy_base.trim_end_matches('/'), path)
}

fn connector(url: &str) -> char {
    if url.contains('?') { '&' } else { '?' }
}

/// Append `key=<encoded value>` when the value is present and non-empty
fn append_param(url: &mut String, key: &str, value: Option<&str>) {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return;
    };
    let sep = connector(url);
    url.push(sep);
    url.push_str(key);
    url.push('=');
    url.push_str(&urlencoding::encode(value));
}

/// Like [`append_param`], but never adds a second token
fn append_token(url: &mut String, token: Option<&str>) {
    if url.contains(&format!("{PARAM_TOKEN}=")) {
        return;
    }
    append_param(url, PARAM_TOKEN, token);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::resolver::{LiveDescriptor, PlaybackDescriptor};
    use proptest::prelude::*;

    const BASE: &str = "http://10.0.0.1/";

    // --- Live ---

    #[test]
    fn live_bare() {
        assert_eq!(
            build_live_url(BASE, "239.1.2.3:10000", None, None),
            "http://10.0.0.1/rtp/239.1.2.3:10000"
        );
    }

    #[test]
    fn live_with_fcc_and_token() {
        assert_eq!(
            build_live_url(
                "http://10.0.0.1:5140/",
                "239.1.2.3:10000",
                Some("10.0.0.9:8027"),
                Some("a b/c")
            ),
            "http://10.0.0.1:5140/rtp/239.1.2.3:10000?fcc=10.0.0.9%3A8027&r2h-token=a%20b%2Fc"
        );
    }

    #[test]
    fn live_token_only_uses_question_mark() {
        assert_eq!(
            build_live_url(BASE, "239.1.2.3:10000", None, Some("tok")),
            "http://10.0.0.1/rtp/239.1.2.3:10000?r2h-token=tok"
        );
    }

    #[test]
    fn live_empty_values_are_skipped() {
        assert_eq!(
            build_live_url(BASE, "239.1.2.3:10000", Some(""), Some("")),
            "http://10.0.0.1/rtp/239.1.2.3:10000"
        );
    }

    #[test]
    fn base_without_trailing_slash_joins_once() {
        assert_eq!(
            build_live_url("http://10.0.0.1", "239.1.2.3:1", None, None),
            "http://10.0.0.1/rtp/239.1.2.3:1"
        );
        assert_eq!(
            build_live_url("http://10.0.0.1//", "239.1.2.3:1", None, None),
            "http://10.0.0.1/rtp/239.1.2.3:1"
        );
    }

    // --- Playback ---

    #[test]
    fn playback_with_seek() {
        assert_eq!(
            build_playback_url(BASE, "10.0.0.2", "/PLTV/a.smil", None, Some("20240101120000-"), None),
            "http://10.0.0.1/rtsp/10.0.0.2/PLTV/a.smil?playseek=20240101120000-"
        );
    }

    #[test]
    fn playback_merges_embedded_query_first() {
        assert_eq!(
            build_playback_url(
                BASE,
                "10.0.0.2:554",
                "/a.smil",
                Some("rrsip=10.0.0.2&icpid=X"),
                Some("20240101120000-20240101130000"),
                Some("tok")
            ),
            "http://10.0.0.1/rtsp/10.0.0.2:554/a.smil?rrsip=10.0.0.2&icpid=X\
             &playseek=20240101120000-20240101130000&r2h-token=tok"
        );
    }

    #[test]
    fn playback_without_seek() {
        assert_eq!(
            build_playback_url(BASE, "10.0.0.2", "/a.smil", None, None, Some("tok")),
            "http://10.0.0.1/rtsp/10.0.0.2/a.smil?r2h-token=tok"
        );
    }

    #[test]
    fn playback_without_path() {
        assert_eq!(
            build_playback_url(BASE, "10.0.0.2", "", None, None, None),
            "http://10.0.0.1/rtsp/10.0.0.2"
        );
    }

    #[test]
    fn playback_keeps_token_already_in_embedded_query() {
        let url = build_playback_url(
            BASE,
            "10.0.0.2",
            "/a.smil",
            Some("r2h-token=old"),
            Some("x"),
            Some("new"),
        );
        assert_eq!(url, "http://10.0.0.1/rtsp/10.0.0.2/a.smil?r2h-token=old&playseek=x");
        assert_eq!(url.matches("r2h-token=").count(), 1);
    }

    #[test]
    fn playback_escapes_only_bytes_outside_uri() {
        assert_eq!(
            build_playback_url(
                BASE,
                "10.0.0.2",
                "/a b/频道.smil",
                Some("name=x y&k=%2F"),
                None,
                None
            ),
            "http://10.0.0.1/rtsp/10.0.0.2/a%20b/%E9%A2%91%E9%81%93.smil?name=x%20y&k=%2F"
        );
    }

    #[test]
    fn playback_keeps_well_formed_path_verbatim() {
        let path = "/PLTV/88888888/224/3221225632/10000100000000060000000000107311_0.smil";
        let query = "rrsip=10.0.0.2:554&zoneoffset=0&icpid=&a%2Bb=c;d";
        let url = build_playback_url(BASE, "10.0.0.2:554", path, Some(query), None, None);
        assert_eq!(url, format!("http://10.0.0.1/rtsp/10.0.0.2:554{path}?{query}"));
    }

    // --- Decision dispatch ---

    #[test]
    fn build_dispatches_on_decision() {
        let proxy = ProxyTarget::parse("http://10.0.0.1:5140").unwrap();

        let live = Decision::RedirectLive {
            stream: LiveDescriptor {
                host_port: "239.1.2.3:10000".into(),
            },
            fcc: None,
            token: None,
        };
        assert_eq!(
            build(&proxy, &live).as_deref(),
            Some("http://10.0.0.1:5140/rtp/239.1.2.3:10000")
        );

        let playback = Decision::RedirectPlayback {
            stream: PlaybackDescriptor {
                host: "10.0.0.2".into(),
                path: "/a.smil".into(),
                query: None,
            },
            seek: Some("x".into()),
            token: None,
        };
        assert_eq!(
            build(&proxy, &playback).as_deref(),
            Some("http://10.0.0.1:5140/rtsp/10.0.0.2/a.smil?playseek=x")
        );

        let reject = Decision::Reject(crate::error::GateError::NoValidSource);
        assert_eq!(build(&proxy, &reject), None);
    }

    proptest! {
        #[test]
        fn seek_round_trips(seek in "\\PC{1,40}") {
            let url = build_playback_url(BASE, "10.0.0.2", "/a.smil", None, Some(&seek), None);
            prop_assert_eq!(url.matches("playseek=").count(), 1);

            let encoded = url.split("playseek=").nth(1).unwrap();
            let decoded = urlencoding::decode(encoded).unwrap();
            prop_assert_eq!(&*decoded, seek.as_str());
        }

        #[test]
        fn token_is_never_duplicated(
            token in "[a-zA-Z0-9._~-]{1,24}",
            existing in proptest::option::of("[a-z0-9]{1,8}"),
        ) {
            let embedded = existing.map(|v| format!("r2h-token={v}"));
            let playback = build_playback_url(
                BASE, "10.0.0.2", "/a.smil", embedded.as_deref(), Some("x"), Some(&token),
            );
            prop_assert_eq!(playback.matches("r2h-token=").count(), 1);

            let live = build_live_url(BASE, "239.1.2.3:10000", Some("f"), Some(&token));
            prop_assert_eq!(live.matches("r2h-token=").count(), 1);
        }

        #[test]
        fn live_prefix_is_base_plus_host(a in 224u8..=239, b in any::<u8>(), port in 1u16..=u16::MAX) {
            let host_port = format!("{a}.{b}.1.1:{port}");
            let url = build_live_url("http://10.0.0.1:5140/", &host_port, None, None);
            let expected = format!("http://10.0.0.1:5140/rtp/{}", host_port);
            prop_assert!(url.starts_with(&expected));
        }
    }
}
