//! Client configuration.

use std::time::Duration;

use crate::error::ApiError;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 7099;

/// Where the service lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Bound on a whole request. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Read `BBJ_HOST`, `BBJ_PORT` and `BBJ_TIMEOUT_SECS`, falling back to
    /// the defaults for any that are unset.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let mut config = Self::default();
        if let Some(host) = lookup("BBJ_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("BBJ_PORT") {
            config.port = port
                .parse()
                .map_err(|_| ApiError::InvalidConfig(format!("BBJ_PORT is not a port number: {port:?}")))?;
        }
        if let Some(secs) = lookup("BBJ_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| ApiError::InvalidConfig(format!("BBJ_TIMEOUT_SECS is not a whole number: {secs:?}")))?;
            config.timeout = Some(Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// `http://<host>:<port>/api`, with no trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}/api", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_local_service() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url(), "http://127.0.0.1:7099/api");
        assert!(config.timeout.is_none());
    }

    #[test]
    fn env_overrides_every_field() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("BBJ_HOST", "bbj.example"),
            ("BBJ_PORT", "8080"),
            ("BBJ_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.base_url(), "http://bbj.example:8080/api");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[("BBJ_PORT", "seventy")])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidConfig(_)));
    }

    #[test]
    fn empty_env_gives_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
    }
}
