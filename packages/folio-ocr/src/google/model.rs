use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, warn};

use super::client::{VisionClient, VisionService};
use super::response::AnnotationPage;
use crate::base::{get_ocr_rects, post_process_cells};
use crate::engine::{OcrError, OcrModel};
use crate::options::{AcceleratorOptions, GoogleVisionOcrOptions, OcrOptions};
use crate::page::{ConversionResult, Page};
use crate::profiling::TimeRecorder;
use crate::region::{BoundingBox, TextCell};
use crate::settings::{settings, DebugSettings};
use crate::visualize::draw_ocr_rects_and_cells;

/// Raster multiplier for OCR: 72 dpi page units become 216 dpi pixels.
pub const OCR_SCALE: f64 = 3.0;

/// Confidence reported for words that come back without symbols.
pub const FALLBACK_CONFIDENCE: f64 = 1.0;

/// OCR engine backed by Google Cloud Vision document text detection.
pub struct GoogleVisionOcrModel {
    enabled: bool,
    options: OcrOptions,
    accelerator_options: AcceleratorOptions,
    debug: DebugSettings,
    service: Option<Box<dyn VisionService>>,
}

impl GoogleVisionOcrModel {
    /// Builds the model. When enabled, the credentials are validated and the
    /// HTTP client is created here; any problem is returned immediately.
    ///
    /// The engine runs remotely, so `artifacts_path` and the accelerator
    /// options have no effect.
    pub fn new(
        enabled: bool,
        _artifacts_path: Option<&Path>,
        options: GoogleVisionOcrOptions,
        accelerator_options: AcceleratorOptions,
    ) -> Result<Self, OcrError> {
        let service: Option<Box<dyn VisionService>> = if enabled {
            let client = VisionClient::new(&options)?;
            debug!("Initializing Google Vision OCR as {}", client.client_email());
            Some(Box::new(client))
        } else {
            None
        };

        Ok(Self {
            enabled,
            options: OcrOptions::GoogleVision(options),
            accelerator_options,
            debug: settings().debug.clone(),
            service,
        })
    }

    /// Builds the model around an already constructed service.
    pub fn with_service(
        enabled: bool,
        options: GoogleVisionOcrOptions,
        service: Box<dyn VisionService>,
    ) -> Self {
        Self {
            enabled,
            options: OcrOptions::GoogleVision(options),
            accelerator_options: AcceleratorOptions::default(),
            debug: settings().debug.clone(),
            service: Some(service),
        }
    }

    /// Overrides the process-wide debug settings for this model.
    pub fn with_debug(mut self, debug: DebugSettings) -> Self {
        self.debug = debug;
        self
    }

    pub fn options_kind() -> &'static str {
        "google_vision"
    }

    /// OCR cells for `regions` of `page`, before they are merged into it.
    ///
    /// Regions that fail or come back empty contribute nothing; the others
    /// still do. Indices run from zero in emission order.
    pub async fn recognize_page(&self, page: &Page, regions: &[BoundingBox]) -> Vec<TextCell> {
        let Some(service) = self.service.as_deref() else {
            return Vec::new();
        };

        let mut cells = Vec::new();
        for region in regions {
            if region.area() == 0.0 {
                continue;
            }

            // Crop and translate by the same whole-unit origin.
            let region = region.snapped();
            match self.recognize_region(service, page, &region).await {
                Ok(Some(annotation)) => {
                    let next_index = cells.len();
                    cells.extend(cells_from_annotation(&annotation, &region, OCR_SCALE, next_index));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        "Google Vision OCR failed on page {} region {:?}: {}",
                        page.page_no, region, e
                    );
                }
            }
        }
        cells
    }

    async fn recognize_region(
        &self,
        service: &dyn VisionService,
        page: &Page,
        region: &BoundingBox,
    ) -> Result<Option<AnnotationPage>, OcrError> {
        let high_res_image = page.get_image(OCR_SCALE, Some(region))?;
        let image_bytes = encode_png(&high_res_image)?;

        let response = service
            .document_text_detection(&image_bytes, self.options.lang())
            .await?;

        if let Some(status) = response.error {
            return Err(OcrError::Api(format!("{} (code {})", status.message, status.code)));
        }

        let Some(annotation) = response.full_text_annotation else {
            debug!("No text detected on page {} region {:?}", page.page_no, region);
            return Ok(None);
        };

        if annotation.pages.len() != 1 {
            warn!(
                "Expected 1 page in Google Vision response, got {}; using the first",
                annotation.pages.len()
            );
        }

        let first = annotation.pages.into_iter().next();
        if first.is_none() {
            debug!("No text detected on page {} region {:?}", page.page_no, region);
        }
        Ok(first)
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, OcrError> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Maps the words of one response page to cells in page coordinates.
///
/// Pixel coordinates are divided by `scale` and shifted by the region's
/// top-left corner; `first_index` numbers the first emitted cell.
pub fn cells_from_annotation(
    annotation: &AnnotationPage,
    region: &BoundingBox,
    scale: f64,
    first_index: usize,
) -> Vec<TextCell> {
    annotation
        .words()
        .filter_map(|word| {
            let px = word.bounding_box.to_bbox()?;
            let rect = BoundingBox::new(px.l / scale, px.t / scale, px.r / scale, px.b / scale)
                .translated(region.l, region.t);
            let confidence = word.mean_confidence().unwrap_or(FALLBACK_CONFIDENCE);
            Some((word.text(), confidence, rect))
        })
        .enumerate()
        .map(|(i, (text, confidence, rect))| TextCell::from_ocr(first_index + i, text, confidence, rect))
        .collect()
}

#[async_trait]
impl OcrModel for GoogleVisionOcrModel {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn options(&self) -> &OcrOptions {
        &self.options
    }

    fn accelerator_options(&self) -> &AcceleratorOptions {
        &self.accelerator_options
    }

    async fn process(&self, conv_res: &mut ConversionResult, pages: Vec<Page>) -> Vec<Page> {
        if !self.enabled {
            return pages;
        }

        let mut processed = Vec::with_capacity(pages.len());
        for mut page in pages {
            if !page.is_valid() {
                processed.push(page);
                continue;
            }

            let timer = TimeRecorder::start("ocr", self.debug.profile_pipeline_timings);
            let ocr_rects = get_ocr_rects(&page, &self.options);
            let cells = self.recognize_page(&page, &ocr_rects).await;
            post_process_cells(cells, &mut page, &self.options);
            timer.finish(&mut conv_res.timings);

            if self.debug.visualize_ocr {
                if let Err(e) = draw_ocr_rects_and_cells(
                    conv_res,
                    &page,
                    &ocr_rects,
                    &self.debug.debug_output_path,
                ) {
                    warn!("Cannot draw OCR debug image for page {}: {}", page.page_no, e);
                }
            }

            processed.push(page);
        }
        processed
    }
}

impl Drop for GoogleVisionOcrModel {
    fn drop(&mut self) {
        if let Some(service) = &self.service {
            service.close();
        }
    }
}
