use std::path::Path;

use reqwest::blocking::multipart;
use serde_json::{json, Value};

use crate::api::{
    extract_error, knowledge_info_path, request_client, KNOWLEDGE_CREATE_PATH,
    KNOWLEDGE_DELETE_PATH, KNOWLEDGE_LIST_PATH, KNOWLEDGE_UPLOAD_PATH,
};
use crate::app::{KnowledgeBase, KnowledgeBaseInfo};
use crate::config::Config;

pub(crate) fn list(cfg: &Config) -> std::result::Result<Vec<KnowledgeBase>, String> {
    let client = request_client(cfg)?;
    let response = client
        .get(cfg.endpoint(KNOWLEDGE_LIST_PATH))
        .send()
        .map_err(|e| format!("knowledge list failed: {e}"))?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| format!("knowledge list read failed: {e}"))?;
    if !status.is_success() {
        return Err(extract_error(status, &body));
    }
    serde_json::from_str(&body).map_err(|e| format!("knowledge list parse failed: {e}"))
}

pub(crate) fn create(cfg: &Config, name: &str) -> std::result::Result<String, String> {
    post_name(cfg, KNOWLEDGE_CREATE_PATH, name, "knowledge create")
}

pub(crate) fn delete(cfg: &Config, name: &str) -> std::result::Result<String, String> {
    post_name(cfg, KNOWLEDGE_DELETE_PATH, name, "knowledge delete")
}

pub(crate) fn info(cfg: &Config, name: &str) -> std::result::Result<KnowledgeBaseInfo, String> {
    let client = request_client(cfg)?;
    let response = client
        .get(cfg.endpoint(&knowledge_info_path(name)))
        .send()
        .map_err(|e| format!("knowledge info failed: {e}"))?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| format!("knowledge info read failed: {e}"))?;
    if !status.is_success() {
        return Err(extract_error(status, &body));
    }
    serde_json::from_str(&body).map_err(|e| format!("knowledge info parse failed: {e}"))
}

/// Upload local documents into a knowledge base. The backend expects a
/// multipart form with the base name in `knowledge_base` and each document
/// as a `files[]` part.
pub(crate) fn upload(
    cfg: &Config,
    name: &str,
    paths: &[String],
) -> std::result::Result<String, String> {
    let mut form = multipart::Form::new().text("knowledge_base", name.to_string());
    for path in paths {
        if !Path::new(path).is_file() {
            return Err(format!("not a file: {path}"));
        }
        form = form
            .file("files[]", path)
            .map_err(|e| format!("cannot read {path}: {e}"))?;
    }

    let client = request_client(cfg)?;
    let response = client
        .post(cfg.endpoint(KNOWLEDGE_UPLOAD_PATH))
        .multipart(form)
        .send()
        .map_err(|e| format!("knowledge upload failed: {e}"))?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| format!("knowledge upload read failed: {e}"))?;
    if !status.is_success() {
        return Err(extract_error(status, &body));
    }
    Ok(extract_message(&body).unwrap_or_else(|| format!("uploaded {} file(s)", paths.len())))
}

fn post_name(
    cfg: &Config,
    path: &str,
    name: &str,
    what: &str,
) -> std::result::Result<String, String> {
    let client = request_client(cfg)?;
    let response = client
        .post(cfg.endpoint(path))
        .json(&json!({ "name": name }))
        .send()
        .map_err(|e| format!("{what} failed: {e}"))?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| format!("{what} read failed: {e}"))?;
    if !status.is_success() {
        return Err(extract_error(status, &body));
    }
    Ok(extract_message(&body).unwrap_or_else(|| "ok".to_string()))
}

fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_body_parses_as_named_bases() {
        let body = r#"[{"name": "docs"}, {"name": "notes"}]"#;
        let bases: Vec<KnowledgeBase> = serde_json::from_str(body).unwrap();
        assert_eq!(bases.len(), 2);
        assert_eq!(bases[0].name, "docs");
        assert_eq!(bases[1].name, "notes");

        let empty: Vec<KnowledgeBase> = serde_json::from_str("[]").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn info_body_parses_with_fractional_ctime() {
        // created_at is a filesystem ctime, so it arrives as a JSON float.
        let body = r#"{"name": "docs", "document_count": 3, "created_at": 1723456789.5}"#;
        let info: KnowledgeBaseInfo = serde_json::from_str(body).unwrap();
        assert_eq!(info.name, "docs");
        assert_eq!(info.document_count, 3);
        assert!((info.created_at - 1723456789.5).abs() < f64::EPSILON);
    }

    #[test]
    fn info_body_parses_with_missing_optional_fields() {
        let info: KnowledgeBaseInfo = serde_json::from_str(r#"{"name": "docs"}"#).unwrap();
        assert_eq!(info.name, "docs");
        assert_eq!(info.document_count, 0);
        assert_eq!(info.created_at, 0.0);
    }

    #[test]
    fn extract_message_reads_backend_ack() {
        assert_eq!(
            extract_message(r#"{"message": "knowledge base created"}"#),
            Some("knowledge base created".to_string())
        );
        assert_eq!(extract_message(r#"{"status": "ok"}"#), None);
        assert_eq!(extract_message("not json"), None);
    }
}
