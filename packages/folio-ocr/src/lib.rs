//! # folio-ocr
//!
//! OCR engines for the folio document conversion pipeline.
//!
//! An engine implements [`OcrModel`]: it receives a batch of [`Page`]s, finds the
//! regions worth OCR-ing, recognizes them and merges the resulting [`TextCell`]s
//! back into each page. [`GoogleVisionOcrModel`] does the recognition remotely
//! with Google Cloud Vision document text detection. Engines are looked up
//! through the [`PluginRegistry`] by the `kind` of their options.

pub mod base;
pub mod engine;
pub mod google;
pub mod options;
pub mod page;
pub mod picture;
pub mod profiling;
pub mod region;
pub mod registry;
pub mod settings;
pub mod visualize;

pub use engine::{OcrError, OcrModel};
pub use google::{GoogleVisionOcrModel, VisionClient, VisionService};
pub use options::{
    AcceleratorDevice, AcceleratorOptions, Credentials, GoogleVisionOcrOptions, OcrOptions,
    PictureDescriptionApiOptions, PictureDescriptionOptions, PipelineOptions,
};
pub use page::{ConversionResult, Page, PageBackend, Size};
pub use picture::{PictureDescriptionApiModel, PictureDescriptionModel, PictureItem};
pub use region::{BoundingBox, CoordOrigin, TextCell};
pub use registry::PluginRegistry;

/// Prelude module for convenient imports
///
/// ```ignore
/// use folio_ocr::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AcceleratorOptions, BoundingBox, ConversionResult, Credentials, GoogleVisionOcrModel,
        GoogleVisionOcrOptions, OcrError, OcrModel, OcrOptions, Page, PageBackend,
        PictureDescriptionModel, PipelineOptions, PluginRegistry, Size, TextCell, VisionService,
    };
}
