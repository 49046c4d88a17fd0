use anyhow::{Context, Result, bail};
use percent_encoding::percent_decode_str;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;

pub const DEFAULT_FILENAME: &str = "policy.pdf";
pub const DEFAULT_MIME: &str = "application/pdf";

/// A downloaded policy document, ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Last path segment of `url`, without query or fragment, percent-decoded.
/// Falls back to `policy.pdf` when the URL does not parse or ends in `/`.
pub fn filename_from_url(url: &str) -> String {
    let segment = Url::parse(url)
        .ok()
        .and_then(|u| u.path_segments()?.next_back().map(str::to_owned))
        .unwrap_or_default();
    let decoded = percent_decode_str(&segment).decode_utf8_lossy();
    if decoded.trim().is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        decoded.into_owned()
    }
}

/// Download `url`. Any non-success status is an error.
pub async fn fetch_document(client: &reqwest::Client, url: &str) -> Result<PolicyDocument> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("fetch {url}"))?;

    let status = resp.status();
    if !status.is_success() {
        bail!("HTTP {status}");
    }

    let mime_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(DEFAULT_MIME)
        .to_string();

    let bytes = resp.bytes().await.context("read document body")?.to_vec();

    Ok(PolicyDocument {
        filename: filename_from_url(url),
        mime_type,
        bytes,
    })
}
