//! Blocking HTTP client for the chat backend.

pub(crate) mod chat;
pub(crate) mod knowledge;

use std::time::Duration;

use serde_json::Value;

use crate::config::Config;

pub(crate) const CHAT_STREAM_PATH: &str = "/chat/api/chat/stream";
pub(crate) const KNOWLEDGE_LIST_PATH: &str = "/knowledge/api/knowledge/list";
pub(crate) const KNOWLEDGE_CREATE_PATH: &str = "/knowledge/api/knowledge/create";
pub(crate) const KNOWLEDGE_DELETE_PATH: &str = "/knowledge/api/knowledge/delete";
pub(crate) const KNOWLEDGE_UPLOAD_PATH: &str = "/knowledge/api/knowledge/upload";

pub(crate) fn knowledge_info_path(name: &str) -> String {
    format!("/knowledge/api/knowledge/{name}/info")
}

/// Client for the streaming chat endpoint. Only the connection phase gets a
/// timeout; a reply stream stays open for as long as the model is talking.
pub(crate) fn stream_client() -> Result<reqwest::blocking::Client, String> {
    reqwest::blocking::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(None)
        .build()
        .map_err(|e| format!("http client init failed: {e}"))
}

/// Client for the knowledge-base endpoints, bounded by the configured
/// request timeout.
pub(crate) fn request_client(cfg: &Config) -> Result<reqwest::blocking::Client, String> {
    reqwest::blocking::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(cfg.request_timeout)
        .build()
        .map_err(|e| format!("http client init failed: {e}"))
}

/// Pull a human-readable error out of a backend response body. The backend
/// reports failures as `{"error": "..."}`; anything else falls back to the
/// status code.
pub(crate) fn extract_error(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(msg) = value.get("error").and_then(Value::as_str) {
            return msg.to_string();
        }
    }
    format!("server returned {status}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn extract_error_prefers_backend_message() {
        let msg = extract_error(
            StatusCode::BAD_REQUEST,
            r#"{"error": "knowledge base already exists"}"#,
        );
        assert_eq!(msg, "knowledge base already exists");
    }

    #[test]
    fn extract_error_falls_back_to_status() {
        assert_eq!(
            extract_error(StatusCode::BAD_GATEWAY, "<html>oops</html>"),
            "server returned 502 Bad Gateway"
        );
        assert_eq!(
            extract_error(StatusCode::NOT_FOUND, r#"{"detail": "nope"}"#),
            "server returned 404 Not Found"
        );
    }

    #[test]
    fn knowledge_info_path_embeds_name() {
        assert_eq!(
            knowledge_info_path("docs"),
            "/knowledge/api/knowledge/docs/info"
        );
    }
}
