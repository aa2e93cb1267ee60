use crate::rewrite::ProxyPolicy;
use std::env;
use std::path::PathBuf;

/// Default extra route serving the redirect (besides `/`)
pub const DEFAULT_REDIRECT_PATH: &str = "/play";

/// Routes the server registers itself
const RESERVED_PATHS: [&str; 2] = ["/health", "/metrics"];

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Listen address (default: 0.0.0.0)
    pub bind_addr: String,
    pub is_dev: bool,
    /// Proxy hosts clients may be redirected to; empty allows any host
    pub allowed_proxy_hosts: Vec<String>,
    /// Optional file receiving timestamped diagnostic lines
    pub diagnostic_log: Option<PathBuf>,
    /// Extra route serving the redirect, in addition to `/`
    pub redirect_path: String,
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode, provides sensible defaults. In PROD mode, PORT is required.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Check if running in dev mode
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        // Port: required in prod, defaults to 3000 in dev
        let port = if is_dev {
            env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?
        } else {
            env::var("PORT")
                .map_err(|_| "PORT is required in production")?
                .parse()?
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());

        // Comma-separated allowlist; blank entries are dropped
        let allowed_proxy_hosts = env::var("ALLOWED_PROXY_HOSTS")
            .map(|v| {
                v.split(',')
                    .map(|h| h.trim().to_string())
                    .filter(|h| !h.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let diagnostic_log = env::var("DIAGNOSTIC_LOG")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let redirect_path = env::var("REDIRECT_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REDIRECT_PATH.to_string());
        if !redirect_path.starts_with('/') {
            return Err(format!("REDIRECT_PATH must start with '/': {redirect_path}").into());
        }
        if RESERVED_PATHS.contains(&redirect_path.as_str()) {
            return Err(format!("REDIRECT_PATH collides with a built-in route: {redirect_path}").into());
        }

        Ok(Config {
            port,
            bind_addr,
            is_dev,
            allowed_proxy_hosts,
            diagnostic_log,
            redirect_path,
        })
    }

    /// Proxy host policy derived from `allowed_proxy_hosts`
    pub fn proxy_policy(&self) -> ProxyPolicy {
        ProxyPolicy::allow_hosts(&self.allowed_proxy_hosts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serialize all env-var tests to prevent races between parallel test threads.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 6] = [
        "DEV_MODE",
        "PORT",
        "BIND_ADDR",
        "ALLOWED_PROXY_HOSTS",
        "DIAGNOSTIC_LOG",
        "REDIRECT_PATH",
    ];

    /// Set env vars, run `f`, then restore original state.
    ///
    /// Every variable `Config` reads is cleared first unless listed in `set`.
    fn with_env(set: &[(&str, &str)], f: impl FnOnce()) {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());

        let saved: Vec<(&str, Option<String>)> =
            ALL_VARS.iter().map(|k| (*k, std::env::var(k).ok())).collect();

        for k in ALL_VARS {
            // SAFETY: serialized by ENV_LOCK, no other thread modifies env vars concurrently.
            unsafe { std::env::remove_var(k) };
        }
        for (k, v) in set {
            unsafe { std::env::set_var(k, v) };
        }

        f();

        for (k, old) in saved {
            match old {
                Some(v) => unsafe { std::env::set_var(k, v) },
                None => unsafe { std::env::remove_var(k) },
            }
        }
    }

    #[test]
    fn dev_mode_uses_defaults() {
        with_env(&[("DEV_MODE", "true")], || {
            let config = Config::from_env().expect("should succeed in dev mode");
            assert!(config.is_dev);
            assert_eq!(config.port, 3000);
            assert_eq!(config.bind_addr, "0.0.0.0");
            assert!(config.allowed_proxy_hosts.is_empty());
            assert!(config.proxy_policy().is_open());
            assert_eq!(config.diagnostic_log, None);
            assert_eq!(config.redirect_path, "/play");
        });
    }

    #[test]
    fn prod_mode_requires_port() {
        with_env(&[], || {
            let result = Config::from_env();
            assert!(result.is_err(), "Should fail without PORT in prod mode");
        });
    }

    #[test]
    fn prod_mode_with_port() {
        with_env(&[("PORT", "8080")], || {
            let config = Config::from_env().unwrap();
            assert!(!config.is_dev);
            assert_eq!(config.port, 8080);
        });
    }

    #[test]
    fn invalid_port_is_rejected() {
        with_env(&[("PORT", "not-a-port")], || {
            assert!(Config::from_env().is_err());
        });
        with_env(&[("PORT", "70000")], || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn allowed_hosts_are_split_and_trimmed() {
        with_env(
            &[
                ("DEV_MODE", "true"),
                ("ALLOWED_PROXY_HOSTS", " 10.0.0.1, iptv.lan ,,"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.allowed_proxy_hosts, vec!["10.0.0.1", "iptv.lan"]);
                assert!(!config.proxy_policy().is_open());
            },
        );
    }

    #[test]
    fn diagnostic_log_path() {
        with_env(
            &[("DEV_MODE", "true"), ("DIAGNOSTIC_LOG", "/var/log/streamgate.log")],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(
                    config.diagnostic_log,
                    Some(PathBuf::from("/var/log/streamgate.log"))
                );
            },
        );
    }

    #[test]
    fn custom_redirect_path() {
        with_env(&[("DEV_MODE", "true"), ("REDIRECT_PATH", "/index.php")], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.redirect_path, "/index.php");
        });
    }

    #[test]
    fn reserved_redirect_path_is_rejected() {
        with_env(&[("DEV_MODE", "true"), ("REDIRECT_PATH", "/health")], || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn relative_redirect_path_is_rejected() {
        with_env(&[("DEV_MODE", "true"), ("REDIRECT_PATH", "play")], || {
            assert!(Config::from_env().is_err());
        });
    }
}
