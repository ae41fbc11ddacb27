//! Pages as the conversion pipeline hands them to OCR engines.

use std::fmt;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::engine::OcrError;
use crate::profiling::Timings;
use crate::region::{BoundingBox, TextCell};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn as_bbox(&self) -> BoundingBox {
        BoundingBox::new(0.0, 0.0, self.width, self.height)
    }
}

/// Rendering side of a page: rasters, validity and embedded bitmaps.
pub trait PageBackend: Send + Sync {
    fn is_valid(&self) -> bool;

    /// Page size in page units (1 unit = 1/72 inch).
    fn size(&self) -> Size;

    /// Areas of the page covered by embedded bitmaps, top-left origin.
    fn bitmap_rects(&self) -> Vec<BoundingBox> {
        Vec::new()
    }

    /// Renders the page, or the `cropbox` part of it, at `scale` times the
    /// page-unit resolution.
    fn get_page_image(
        &self,
        scale: f64,
        cropbox: Option<&BoundingBox>,
    ) -> Result<DynamicImage, OcrError>;
}

pub struct Page {
    pub page_no: usize,
    pub size: Option<Size>,
    /// Text cells known for this page, programmatic and OCR.
    pub cells: Vec<TextCell>,
    backend: Option<Box<dyn PageBackend>>,
}

impl Page {
    pub fn new(page_no: usize) -> Self {
        Self {
            page_no,
            size: None,
            cells: Vec::new(),
            backend: None,
        }
    }

    pub fn with_backend(page_no: usize, backend: Box<dyn PageBackend>) -> Self {
        let size = backend.is_valid().then(|| backend.size());
        Self {
            page_no,
            size,
            cells: Vec::new(),
            backend: Some(backend),
        }
    }

    pub fn backend(&self) -> Option<&dyn PageBackend> {
        self.backend.as_deref()
    }

    pub fn is_valid(&self) -> bool {
        self.backend.as_ref().is_some_and(|b| b.is_valid())
    }

    pub fn get_image(
        &self,
        scale: f64,
        cropbox: Option<&BoundingBox>,
    ) -> Result<DynamicImage, OcrError> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| OcrError::InvalidInput(format!("page {} has no backend", self.page_no)))?;
        backend.get_page_image(scale, cropbox)
    }

    /// Drops the backend once the page is fully processed.
    pub fn unload(&mut self) {
        self.backend = None;
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("page_no", &self.page_no)
            .field("size", &self.size)
            .field("cells", &self.cells.len())
            .field("has_backend", &self.backend.is_some())
            .finish()
    }
}

/// Per-document state shared by every stage of a conversion.
#[derive(Debug, Default)]
pub struct ConversionResult {
    /// Name of the input, used for debug artifacts.
    pub input_name: String,
    pub timings: Timings,
}

impl ConversionResult {
    pub fn new(input_name: impl Into<String>) -> Self {
        Self {
            input_name: input_name.into(),
            timings: Timings::default(),
        }
    }
}
