use crate::{
    config::Config,
    rewrite::{Diagnostics, FileSink, ProxyPolicy},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Which proxy hosts redirects may point at
    pub policy: ProxyPolicy,
    /// Diagnostic sinks handed to every rewrite
    pub diagnostics: Diagnostics,
    /// Prometheus handle, present when a recorder was installed
    pub metrics_handle: Option<PrometheusHandle>,
    /// Server start time for uptime tracking
    pub started_at: Instant,
}

impl AppState {
    /// Create a new AppState with the given configuration
    pub fn new(config: Config, metrics_handle: Option<PrometheusHandle>) -> Self {
        let policy = config.proxy_policy();
        if policy.is_open() {
            info!("Proxy allowlist: disabled (any proxy host accepted)");
        } else {
            info!("Proxy allowlist: {}", config.allowed_proxy_hosts.join(", "));
        }

        let mut diagnostics = Diagnostics::tracing();
        if let Some(path) = &config.diagnostic_log {
            // A missing log file must not keep the gateway from serving
            match FileSink::open(path) {
                Ok(sink) => {
                    info!("Diagnostic log: {}", path.display());
                    diagnostics = diagnostics.with_sink(Arc::new(sink));
                }
                Err(e) => warn!("Cannot open diagnostic log {}: {}", path.display(), e),
            }
        }

        Self {
            config: Arc::new(config),
            policy,
            diagnostics,
            metrics_handle,
            started_at: Instant::now(),
        }
    }
}
