use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;

use super::auth::{ServiceAccountKey, TokenSource};
use super::response::{AnnotateImageResponse, BatchAnnotateImagesResponse};
use crate::engine::OcrError;
use crate::options::GoogleVisionOcrOptions;

/// The remote text-detection service the adapter talks to.
#[async_trait]
pub trait VisionService: Send + Sync {
    /// Runs document text detection on one encoded image.
    async fn document_text_detection(
        &self,
        image: &[u8],
        language_hints: &[String],
    ) -> Result<AnnotateImageResponse, OcrError>;

    /// Releases whatever the service holds on to. Called on drop.
    fn close(&self) {}
}

/// HTTP client for the Cloud Vision `images:annotate` endpoint.
pub struct VisionClient {
    http: reqwest::Client,
    endpoint: String,
    tokens: TokenSource,
}

impl VisionClient {
    pub fn new(options: &GoogleVisionOcrOptions) -> Result<Self, OcrError> {
        let key = ServiceAccountKey::from_credentials(&options.credentials)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(|e| OcrError::Configuration(format!("cannot build HTTP client: {}", e)))?;
        let tokens = TokenSource::new(key, options.token_uri.as_deref(), http.clone())?;

        Ok(Self {
            http,
            endpoint: options.endpoint.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn client_email(&self) -> &str {
        self.tokens.client_email()
    }

    fn annotate_url(&self) -> String {
        format!("{}/v1/images:annotate", self.endpoint)
    }
}

pub(crate) fn annotate_request(image: &[u8], language_hints: &[String]) -> serde_json::Value {
    let mut request = json!({
        "image": { "content": STANDARD.encode(image) },
        "features": [{ "type": "DOCUMENT_TEXT_DETECTION" }],
    });
    if !language_hints.is_empty() {
        request["imageContext"] = json!({ "languageHints": language_hints });
    }
    json!({ "requests": [request] })
}

#[async_trait]
impl VisionService for VisionClient {
    async fn document_text_detection(
        &self,
        image: &[u8],
        language_hints: &[String],
    ) -> Result<AnnotateImageResponse, OcrError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .post(self.annotate_url())
            .bearer_auth(token)
            .json(&annotate_request(image, language_hints))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Api(format!("Vision returned {}: {}", status, body)));
        }

        let batch: BatchAnnotateImagesResponse = response.json().await?;
        batch
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| OcrError::Api("Vision returned no responses".into()))
    }

    fn close(&self) {
        self.tokens.clear();
    }
}
