use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Unset means outbound fetches wait for as long as the upstream takes.
    pub fetch_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            fetch_timeout: None,
            user_agent: default_user_agent(),
        }
    }
}

impl AppConfig {
    /// Reads `PODRSS_*` variables, after loading `.env.local` when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::from_filename(".env.local");
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let host = read("PODRSS_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host: IpAddr = host.trim().parse().map_err(|error: std::net::AddrParseError| {
            ConfigError::Invalid {
                name: "PODRSS_HOST",
                value: host.clone(),
                reason: error.to_string(),
            }
        })?;

        let port = match read("PODRSS_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|error| ConfigError::Invalid {
                name: "PODRSS_PORT",
                value: raw.clone(),
                reason: error.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let fetch_timeout = match read("PODRSS_FETCH_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        name: "PODRSS_FETCH_TIMEOUT_SECS",
                        value: raw,
                        reason: "must be greater than zero".to_string(),
                    })
                }
                Err(error) => {
                    return Err(ConfigError::Invalid {
                        name: "PODRSS_FETCH_TIMEOUT_SECS",
                        value: raw.clone(),
                        reason: error.to_string(),
                    })
                }
            },
            None => None,
        };

        Ok(Self {
            bind_addr: SocketAddr::new(host, port),
            fetch_timeout,
            user_agent: read("PODRSS_USER_AGENT").unwrap_or_else(default_user_agent),
        })
    }

    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        let mut builder = reqwest::Client::builder().user_agent(self.user_agent.clone());
        if let Some(timeout) = self.fetch_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}

fn default_user_agent() -> String {
    format!("podcast-rss-bridge/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name: &str| values.get(name).cloned()
    }

    #[test]
    fn defaults_listen_on_port_3000_without_timeout() {
        let config = AppConfig::from_lookup(lookup_from(&[])).expect("defaults must be valid");

        assert_eq!(config.bind_addr, "0.0.0.0:3000".parse::<SocketAddr>().expect("addr must parse"));
        assert!(config.fetch_timeout.is_none());
        assert!(config.user_agent.starts_with("podcast-rss-bridge/"));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PODRSS_HOST", "127.0.0.1"),
            ("PODRSS_PORT", "8080"),
            ("PODRSS_FETCH_TIMEOUT_SECS", "15"),
            ("PODRSS_USER_AGENT", "feed-bot/1.0"),
        ]))
        .expect("overrides must be valid");

        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse::<SocketAddr>().expect("addr must parse"));
        assert_eq!(config.fetch_timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.user_agent, "feed-bot/1.0");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[("PODRSS_PORT", "  ")]))
            .expect("blank port must fall back");

        assert_eq!(config.bind_addr.port(), 3000);
    }

    #[test]
    fn rejects_invalid_values() {
        for pairs in [
            [("PODRSS_PORT", "70000")],
            [("PODRSS_HOST", "not-an-ip")],
            [("PODRSS_FETCH_TIMEOUT_SECS", "0")],
            [("PODRSS_FETCH_TIMEOUT_SECS", "soon")],
        ] {
            let error = AppConfig::from_lookup(lookup_from(&pairs)).expect_err("value must be rejected");
            assert!(matches!(error, ConfigError::Invalid { .. }), "{error}");
        }
    }
}
