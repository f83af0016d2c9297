use std::io::{BufRead, BufReader};

use crossbeam_channel::Sender;
use serde_json::{json, Value};

use crate::api::{extract_error, stream_client, CHAT_STREAM_PATH};
use crate::app::{ChatTurn, WorkerEvent};
use crate::config::Config;

/// One parsed server-sent event from the reply stream.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StreamEvent {
    Content { text: String, done: bool },
    Error(String),
}

/// Stream one reply from the backend, forwarding content fragments to the
/// UI as they arrive. Returns once the server marks the reply finished.
pub(crate) fn run_stream(
    cfg: &Config,
    query: &str,
    history: &[ChatTurn],
    knowledge_base: Option<&str>,
    tx: &Sender<WorkerEvent>,
) -> std::result::Result<(), String> {
    let client = stream_client()?;
    let body = json!({
        "query": query,
        "history": history,
        "knowledge_base": knowledge_base,
    });
    let response = client
        .post(cfg.endpoint(CHAT_STREAM_PATH))
        .json(&body)
        .send()
        .map_err(|e| format!("chat request failed: {e}"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(extract_error(status, &body));
    }

    let reader = BufReader::new(response);
    for line in reader.lines() {
        let line = line.map_err(|e| format!("chat stream read failed: {e}"))?;
        match parse_stream_line(&line) {
            Some(StreamEvent::Error(message)) => return Err(message),
            Some(StreamEvent::Content { text, done }) => {
                if !text.is_empty() {
                    let _ = tx.send(WorkerEvent::Chunk(text));
                }
                if done {
                    return Ok(());
                }
            }
            None => {}
        }
    }
    Err("reply stream ended before completion".to_string())
}

/// Parse one line of the SSE stream. Lines that are not `data:` payloads
/// (blank keep-alives, comments) yield `None`, as do payloads that are not
/// valid JSON.
pub(crate) fn parse_stream_line(line: &str) -> Option<StreamEvent> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(payload).ok()?;
    if let Some(message) = value.get("error").and_then(Value::as_str) {
        return Some(StreamEvent::Error(message.to_string()));
    }
    if value.get("type").and_then(Value::as_str)? != "content" {
        return None;
    }
    let text = value
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let done = value.get("done").and_then(Value::as_bool).unwrap_or(false);
    Some(StreamEvent::Content { text, done })
}
