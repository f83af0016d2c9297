//! Runtime configuration, resolved once at startup from the environment.

use std::env;
use std::time::Duration;

pub(crate) const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";
pub(crate) const DEFAULT_HISTORY_MAX_TURNS: usize = 10;
pub(crate) const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub(crate) struct Config {
    /// Base URL of the backend, no trailing slash.
    pub server: String,
    /// Number of past exchanges sent along with each query.
    pub history_max_turns: usize,
    /// Timeout for non-streaming knowledge-base requests.
    pub request_timeout: Duration,
}

impl Config {
    pub(crate) fn from_env() -> Self {
        let server = env::var("KBCHAT_SERVER")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER.to_string());
        let history_max_turns = env::var("KBCHAT_HISTORY_MAX_TURNS")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_HISTORY_MAX_TURNS);
        let request_timeout = env::var("KBCHAT_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
        Self {
            server,
            history_max_turns,
            request_timeout,
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            history_max_turns: DEFAULT_HISTORY_MAX_TURNS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_server_and_path() {
        let cfg = Config {
            server: "http://host:9000".to_string(),
            ..Config::default()
        };
        assert_eq!(
            cfg.endpoint("/chat/api/chat/stream"),
            "http://host:9000/chat/api/chat/stream"
        );
    }

    #[test]
    fn default_config_uses_local_server() {
        let cfg = Config::default();
        assert_eq!(cfg.server, DEFAULT_SERVER);
        assert_eq!(cfg.history_max_turns, DEFAULT_HISTORY_MAX_TURNS);
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
    }
}
