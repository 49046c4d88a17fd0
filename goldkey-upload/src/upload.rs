use anyhow::{Context, Result, bail};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{PolicyDocument, fetch_document};

pub const DEFAULT_API_ENDPOINT: &str = "http://localhost:8000/api/upload-policy";
pub const DEFAULT_DOC_TYPE: &str = "policy terms";

/// Longest slice of an error body echoed back to the user.
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub api_endpoint: String,
    /// Sent as `X-API-Key` when non-empty.
    pub api_key: String,
    pub insurer: String,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            api_key: String::new(),
            insurer: String::new(),
        }
    }
}

/// POST `doc` with its provenance as multipart form data.
///
/// Parts: `file`, `source_url`, `insurer`, `doc_type`. Returns the endpoint's
/// JSON reply (`Null` for an empty body).
pub async fn upload_policy(
    client: &reqwest::Client,
    settings: &UploadSettings,
    doc: &PolicyDocument,
    source_url: &str,
    doc_type: &str,
) -> Result<Value> {
    let file = Part::bytes(doc.bytes.clone())
        .file_name(doc.filename.clone())
        .mime_str(&doc.mime_type)
        .with_context(|| format!("invalid mime type {:?}", doc.mime_type))?;

    let form = Form::new()
        .part("file", file)
        .text("source_url", source_url.to_string())
        .text("insurer", settings.insurer.clone())
        .text("doc_type", doc_type.to_string());

    let mut req = client.post(&settings.api_endpoint).multipart(form);
    if !settings.api_key.is_empty() {
        req = req.header("X-API-Key", settings.api_key.as_str());
    }

    let resp = req
        .send()
        .await
        .with_context(|| format!("upload to {}", settings.api_endpoint))?;

    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        bail!("upload rejected: {status}: {snippet}");
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).context("parse upload response")
}

/// Fetch `url` and upload it. The fetched URL is recorded as the source.
pub async fn send_to_bucket(
    client: &reqwest::Client,
    settings: &UploadSettings,
    url: &str,
    doc_type: &str,
) -> Result<(PolicyDocument, Value)> {
    let doc = fetch_document(client, url).await?;
    tracing::info!(filename = %doc.filename, bytes = doc.bytes.len(), "fetched policy document");
    let reply = upload_policy(client, settings, &doc, url, doc_type).await?;
    tracing::info!(filename = %doc.filename, "policy document uploaded");
    Ok((doc, reply))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_endpoint_without_key() {
        let s = UploadSettings::default();
        assert_eq!(s.api_endpoint, DEFAULT_API_ENDPOINT);
        assert!(s.api_key.is_empty());
        assert!(s.insurer.is_empty());
    }

    #[test]
    fn settings_fill_missing_fields() {
        let s: UploadSettings = serde_json::from_str(r#"{ "insurer": "Samsung Life" }"#).unwrap();
        assert_eq!(s.insurer, "Samsung Life");
        assert_eq!(s.api_endpoint, DEFAULT_API_ENDPOINT);
    }
}
