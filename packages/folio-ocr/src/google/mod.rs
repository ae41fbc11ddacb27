//! Google Cloud Vision OCR engine.

pub mod auth;
mod client;
mod model;
pub mod response;

pub use auth::{ServiceAccountKey, TokenSource};
pub use client::{VisionClient, VisionService};
pub use model::{cells_from_annotation, GoogleVisionOcrModel, FALLBACK_CONFIDENCE, OCR_SCALE};
