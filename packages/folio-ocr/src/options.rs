//! Engine and pipeline options.
//!
//! Every options type deserializes from JSON so a pipeline can be described
//! in a single file; the `kind` tag selects the engine in the registry.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// A structured credential blob, kept opaque and never printed.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(pub serde_json::Value);

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            serde_json::Value::Null => true,
            serde_json::Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleVisionOcrOptions {
    /// Language hints passed to the service (BCP-47 codes, e.g. `en`).
    pub lang: Vec<String>,
    /// Service-account key, as downloaded from the cloud console.
    pub credentials: Credentials,
    pub force_full_page_ocr: bool,
    /// Bitmaps covering less than this fraction of the page are not OCR'd.
    pub bitmap_area_threshold: f64,
    pub endpoint: String,
    pub token_uri: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GoogleVisionOcrOptions {
    fn default() -> Self {
        Self {
            lang: Vec::new(),
            credentials: Credentials::default(),
            force_full_page_ocr: false,
            bitmap_area_threshold: 0.05,
            endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            token_uri: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OcrOptions {
    GoogleVision(GoogleVisionOcrOptions),
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self::GoogleVision(GoogleVisionOcrOptions::default())
    }
}

impl OcrOptions {
    /// Tag the registry uses to find the engine for these options.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GoogleVision(_) => "google_vision",
        }
    }

    pub fn lang(&self) -> &[String] {
        match self {
            Self::GoogleVision(o) => &o.lang,
        }
    }

    pub fn force_full_page_ocr(&self) -> bool {
        match self {
            Self::GoogleVision(o) => o.force_full_page_ocr,
        }
    }

    pub fn bitmap_area_threshold(&self) -> f64 {
        match self {
            Self::GoogleVision(o) => o.bitmap_area_threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceleratorDevice {
    #[default]
    Auto,
    Cpu,
    Cuda,
    Mps,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceleratorOptions {
    pub device: AcceleratorDevice,
    pub num_threads: usize,
}

impl Default for AcceleratorOptions {
    fn default() -> Self {
        Self {
            device: AcceleratorDevice::Auto,
            num_threads: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PictureDescriptionApiOptions {
    /// OpenAI-compatible chat completions URL.
    pub url: String,
    pub headers: HashMap<String, String>,
    /// Extra body fields, e.g. `model` or `max_tokens`.
    pub params: serde_json::Map<String, serde_json::Value>,
    pub timeout_secs: u64,
    pub prompt: String,
    /// Raster scale used when cropping pictures.
    pub scale: f64,
    /// Pictures covering less than this fraction of the page are skipped.
    pub picture_area_threshold: f64,
}

impl Default for PictureDescriptionApiOptions {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/v1/chat/completions".to_string(),
            headers: HashMap::new(),
            params: serde_json::Map::new(),
            timeout_secs: 20,
            prompt: "Describe this image in a few sentences.".to_string(),
            scale: 2.0,
            picture_area_threshold: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PictureDescriptionOptions {
    Api(PictureDescriptionApiOptions),
}

impl Default for PictureDescriptionOptions {
    fn default() -> Self {
        Self::Api(PictureDescriptionApiOptions::default())
    }
}

impl PictureDescriptionOptions {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Api(_) => "api",
        }
    }

    /// Raster scale pictures are cropped at before being described.
    pub fn scale(&self) -> f64 {
        match self {
            Self::Api(o) => o.scale,
        }
    }
}

/// Everything a conversion run needs to pick and configure its engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub do_ocr: bool,
    pub ocr_options: OcrOptions,
    pub accelerator_options: AcceleratorOptions,
    pub do_picture_description: bool,
    pub picture_description_options: PictureDescriptionOptions,
    /// Must be set before any engine may send page content off-host.
    pub enable_remote_services: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            do_ocr: true,
            ocr_options: OcrOptions::default(),
            accelerator_options: AcceleratorOptions::default(),
            do_picture_description: false,
            picture_description_options: PictureDescriptionOptions::default(),
            enable_remote_services: false,
        }
    }
}
