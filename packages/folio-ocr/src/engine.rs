use async_trait::async_trait;
use thiserror::Error;

use crate::options::{AcceleratorOptions, OcrOptions};
use crate::page::{ConversionResult, Page};

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("engine is not configured: {0}")]
    Configuration(String),
    #[error("no engine registered for options kind `{0}`")]
    UnknownEngine(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("service returned an error: {0}")]
    Api(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An OCR engine the conversion pipeline can run over a batch of pages.
///
/// Implementations must return every page they were given, in order. A
/// disabled model hands the batch back untouched.
#[async_trait]
pub trait OcrModel: Send + Sync {
    fn enabled(&self) -> bool;

    fn options(&self) -> &OcrOptions;

    fn accelerator_options(&self) -> &AcceleratorOptions;

    async fn process(&self, conv_res: &mut ConversionResult, pages: Vec<Page>) -> Vec<Page>;
}
