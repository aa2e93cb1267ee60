use crate::{
    error::{GateError, Result},
    rewrite::resolver::ProxyTarget,
};
use tracing::warn;

/// Which proxy hosts a request may redirect to.
///
/// The middleware issues redirects to whatever `proxy` the client names, so
/// an open deployment is an open redirector. Listing the hosts of the
/// streaming proxies closes that.
///
/// An empty allowlist accepts any host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyPolicy {
    allowed_hosts: Vec<String>,
}

impl ProxyPolicy {
    pub fn allow_any() -> Self {
        Self::default()
    }

    /// Restrict redirects to the given hosts (case-insensitive, exact match).
    ///
    /// IPv6 literals are written with brackets, as they appear in URLs:
    /// `[fd00::1]`.
    pub fn allow_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_hosts: hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.allowed_hosts.is_empty()
    }

    /// # Errors
    /// Returns [`GateError::InvalidProxy`] when the host is not listed.
    pub fn check(&self, proxy: &ProxyTarget) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }

        let host = proxy.host.to_ascii_lowercase();
        if self.allowed_hosts.iter().any(|allowed| *allowed == host) {
            return Ok(());
        }

        warn!("Proxy host {} is not in the allowlist", proxy.host);
        Err(GateError::InvalidProxy(
            "Proxy host is not allowed".to_string(),
        ))
    }
}
