//! goldkey-upload: send insurer policy PDFs to the document bucket.
//!
//! Fetches a document by URL and POSTs it, with provenance fields, as
//! multipart form data to the ingestion endpoint.

pub mod document;
pub mod upload;

pub use document::{PolicyDocument, fetch_document, filename_from_url};
pub use upload::{DEFAULT_DOC_TYPE, UploadSettings, send_to_bucket, upload_policy};
