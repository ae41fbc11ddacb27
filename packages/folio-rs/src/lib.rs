//! # folio-rs
//!
//! Turns scanned pages into positioned text cells using the engines from
//! [`folio_ocr`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use folio_rs::prelude::*;
//!
//! let mut options = PipelineOptions::default();
//! let OcrOptions::GoogleVision(google) = &mut options.ocr_options;
//! google.credentials = Credentials(serde_json::from_str(&key_json)?);
//!
//! let converter = DocumentConverter::new(&options)?;
//! let report = converter.convert(Path::new("scan.png")).await?;
//! for cell in &report.pages[0].cells {
//!     println!("{:?} {}", cell.rect, cell.text);
//! }
//! ```

pub mod backend;
pub mod converter;

pub use backend::ImageFileBackend;
pub use converter::{collect_inputs, ConversionReport, DocumentConverter, PageReport, PictureReport};

/// Prelude module for convenient imports
///
/// ```ignore
/// use folio_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{collect_inputs, ConversionReport, DocumentConverter, ImageFileBackend, PageReport};
    pub use folio_ocr::prelude::*;
}
