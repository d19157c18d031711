//! Annotation service client.
//!
//! [`Annotator`] is the seam the pipeline calls through; [`VisionClient`] is
//! the production implementation, a blocking HTTP client for the
//! `images:annotate` REST endpoint. All five detections are requested in a
//! single call.

use super::model::Annotations;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Features requested for every image.
const FEATURES: [&str; 5] = [
    "LABEL_DETECTION",
    "IMAGE_PROPERTIES",
    "FACE_DETECTION",
    "LOGO_DETECTION",
    "TEXT_DETECTION",
];

#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Network, DNS, TLS, or client-side timeout.
    #[error("Vision request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Vision API returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    /// The service answered, but reported an error for this image.
    #[error("Vision API error: code {code}, message: \"{message}\"")]
    Service { code: i32, message: String },
    #[error("Vision API response was empty")]
    EmptyResponse,
    #[error("Vision API response could not be parsed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Vision API key is not set (expected in ${0})")]
    MissingApiKey(String),
}

/// One image's answer: the payload as the service sent it, and its parsed form.
///
/// `raw` is what gets stored; `annotations` drives region selection. Fields
/// the model does not declare survive only in `raw`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationResponse {
    pub raw: serde_json::Value,
    pub annotations: Annotations,
}

impl AnnotationResponse {
    /// Parse a per-image payload, surfacing a service-reported error.
    pub fn from_raw(raw: serde_json::Value) -> Result<Self, AnnotationError> {
        let annotations = check_service_error(Annotations::deserialize(&raw)?)?;
        Ok(Self { raw, annotations })
    }
}

/// Source of annotations for one image.
pub trait Annotator: Send + Sync {
    fn annotate(&self, image: &Path) -> Result<AnnotationResponse, AnnotationError>;
}

/// Turn a service payload into annotations, surfacing a per-image error.
pub fn check_service_error(annotations: Annotations) -> Result<Annotations, AnnotationError> {
    match annotations.error {
        Some(status) => Err(AnnotationError::Service {
            code: status.code,
            message: status.message,
        }),
        None => Ok(annotations),
    }
}

#[derive(Deserialize)]
struct BatchResponse {
    #[serde(default)]
    responses: Vec<serde_json::Value>,
}

/// Build the JSON body for a single-image annotate request.
fn request_body(image_bytes: &[u8]) -> serde_json::Value {
    let features: Vec<serde_json::Value> = FEATURES
        .iter()
        .map(|f| serde_json::json!({ "type": f }))
        .collect();
    serde_json::json!({
        "requests": [{
            "image": { "content": BASE64.encode(image_bytes) },
            "features": features,
        }]
    })
}

/// Blocking client for the vision service's REST API.
pub struct VisionClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl VisionClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AnnotationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// Read the API key from the named environment variable.
    pub fn from_env(
        endpoint: impl Into<String>,
        api_key_env: &str,
        timeout: Duration,
    ) -> Result<Self, AnnotationError> {
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AnnotationError::MissingApiKey(api_key_env.to_string()))?;
        Self::new(endpoint, api_key, timeout)
    }

    fn annotate_url(&self) -> String {
        format!("{}/v1/images:annotate", self.endpoint.trim_end_matches('/'))
    }
}

impl Annotator for VisionClient {
    fn annotate(&self, image: &Path) -> Result<AnnotationResponse, AnnotationError> {
        let bytes = std::fs::read(image)?;
        tracing::debug!(path = %image.display(), bytes = bytes.len(), "requesting annotations");

        let response = self
            .client
            .post(self.annotate_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body(&bytes))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AnnotationError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let batch: BatchResponse = response.json()?;
        let raw = batch
            .responses
            .into_iter()
            .next()
            .ok_or(AnnotationError::EmptyResponse)?;
        AnnotationResponse::from_raw(raw)
    }
}
