//! Drives the OCR engine over image inputs and collects a JSON-friendly
//! report per document.
use crate::backend::ImageFileBackend;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use folio_ocr::picture::{PictureDescriptionModel, PictureItem};
use folio_ocr::profiling::Timings;
use folio_ocr::{
  BoundingBox, ConversionResult, OcrModel, Page, PipelineOptions, PluginRegistry, TextCell,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize)]
pub struct PictureReport {
  pub bbox: BoundingBox,
  pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
  pub page_no: usize,
  pub width: f64,
  pub height: f64,
  pub valid: bool,
  pub cells: Vec<TextCell>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub pictures: Vec<PictureReport>,
}

/// Result of converting one input file.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
  pub input: String,
  pub generated_at: String,
  pub ocr_engine: String,
  pub ocr_enabled: bool,
  pub pages: Vec<PageReport>,
  #[serde(skip_serializing_if = "Timings::is_empty")]
  pub timings: Timings,
}

impl ConversionReport {
  pub fn cell_count(&self) -> usize {
    self.pages.iter().map(|p| p.cells.len()).sum()
  }
}

pub struct DocumentConverter {
  ocr_model: Box<dyn OcrModel>,
  picture_model: Option<Box<dyn PictureDescriptionModel>>,
}

impl DocumentConverter {
  /// Builds the engines named by `options` through the plugin registry.
  /// Configuration problems (e.g. missing credentials) surface here.
  pub fn new(options: &PipelineOptions) -> Result<Self> {
    let registry = PluginRegistry::defaults();
    let ocr_model = registry
      .create_ocr_model(
        options.do_ocr,
        None,
        &options.ocr_options,
        &options.accelerator_options,
      )
      .context("Failed to initialize OCR engine")?;

    let picture_model = if options.do_picture_description {
      Some(
        registry
          .create_picture_description_model(
            true,
            options.enable_remote_services,
            &options.picture_description_options,
          )
          .context("Failed to initialize picture description engine")?,
      )
    } else {
      None
    };

    Ok(Self {
      ocr_model,
      picture_model,
    })
  }

  pub fn with_model(ocr_model: Box<dyn OcrModel>) -> Self {
    Self {
      ocr_model,
      picture_model: None,
    }
  }

  pub fn with_picture_model(mut self, picture_model: Box<dyn PictureDescriptionModel>) -> Self {
    self.picture_model = Some(picture_model);
    self
  }

  /// Converts a single image file into a one-page report.
  pub async fn convert(&self, path: &Path) -> Result<ConversionReport> {
    let input = path.display().to_string();
    let mut conv_res = ConversionResult::new(input.clone());

    let backend = ImageFileBackend::open(path);
    let pages = vec![Page::with_backend(0, Box::new(backend))];
    let pages = self.ocr_model.process(&mut conv_res, pages).await;

    let mut reports = Vec::with_capacity(pages.len());
    for mut page in pages {
      let pictures = self.describe_pictures(&page).await;
      let size = page.size;
      reports.push(PageReport {
        page_no: page.page_no,
        width: size.map(|s| s.width).unwrap_or(0.0),
        height: size.map(|s| s.height).unwrap_or(0.0),
        valid: page.is_valid(),
        cells: std::mem::take(&mut page.cells),
        pictures,
      });
      page.unload();
    }

    Ok(ConversionReport {
      input,
      generated_at: Utc::now().to_rfc3339(),
      ocr_engine: self.ocr_model.options().kind().to_string(),
      ocr_enabled: self.ocr_model.enabled(),
      pages: reports,
      timings: conv_res.timings,
    })
  }

  async fn describe_pictures(&self, page: &Page) -> Vec<PictureReport> {
    let (Some(model), Some(backend), Some(size)) = (&self.picture_model, page.backend(), page.size) else {
      return Vec::new();
    };

    let scale = model.options().scale();
    let mut pictures = Vec::new();
    for bbox in backend.bitmap_rects() {
      match backend.get_page_image(scale, Some(&bbox)) {
        Ok(image) => pictures.push(PictureItem {
          page_no: page.page_no,
          bbox,
          page_size: size,
          image,
          description: None,
        }),
        Err(e) => warn!("Cannot crop picture on page {}: {}", page.page_no, e),
      }
    }

    model
      .annotate(pictures)
      .await
      .into_iter()
      .map(|p| PictureReport {
        bbox: p.bbox,
        description: p.description,
      })
      .collect()
  }

  /// Converts every input in order. A failing input is reported and skipped.
  pub async fn convert_all(&self, inputs: &[PathBuf]) -> Vec<ConversionReport> {
    let mut reports = Vec::with_capacity(inputs.len());
    for (idx, path) in inputs.iter().enumerate() {
      info!("Converting {}/{}: {}", idx + 1, inputs.len(), path.display());
      match self.convert(path).await {
        Ok(report) => {
          info!("{}: {} cells", report.input, report.cell_count());
          for (stage, item) in report.timings.iter() {
            debug!(
              "{} {}: {} runs, {:.3}s total, {:.3}s mean",
              report.input,
              stage,
              item.count,
              item.total(),
              item.mean()
            );
          }
          reports.push(report);
        }
        Err(e) => warn!("Error converting {}: {}", path.display(), e),
      }
    }
    reports
  }
}

/// Expands directories into the image files they contain, sorted; files are
/// kept as given.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
  let mut files = Vec::new();
  for input in inputs {
    if input.is_dir() {
      let mut found: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| ImageFileBackend::is_image_file(p))
        .collect();
      found.sort();
      files.extend(found);
    } else if input.exists() {
      files.push(input.clone());
    } else {
      return Err(anyhow!("Input not found: {}", input.display()));
    }
  }
  Ok(files)
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use folio_ocr::{
    AcceleratorOptions, GoogleVisionOcrModel, GoogleVisionOcrOptions, PictureDescriptionApiOptions,
    PictureDescriptionOptions,
  };

  /// Captions each picture with the pixel size it was handed.
  struct SizeCaption {
    options: PictureDescriptionOptions,
  }

  #[async_trait]
  impl PictureDescriptionModel for SizeCaption {
    fn enabled(&self) -> bool {
      true
    }

    fn options(&self) -> &PictureDescriptionOptions {
      &self.options
    }

    async fn annotate(&self, mut pictures: Vec<PictureItem>) -> Vec<PictureItem> {
      for picture in pictures.iter_mut() {
        picture.description = Some(format!("{}x{}", picture.image.width(), picture.image.height()));
      }
      pictures
    }
  }

  fn disabled_ocr() -> Box<dyn OcrModel> {
    Box::new(
      GoogleVisionOcrModel::new(
        false,
        None,
        GoogleVisionOcrOptions::default(),
        AcceleratorOptions::default(),
      )
      .unwrap(),
    )
  }

  #[test]
  fn directories_are_walked_for_images() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    std::fs::write(dir.path().join("b.png"), b"").unwrap();
    std::fs::write(dir.path().join("nested").join("a.jpg"), b"").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

    let files = collect_inputs(&[dir.path().to_path_buf()]).unwrap();
    let names: Vec<_> = files
      .iter()
      .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
      .collect();
    assert_eq!(names, ["b.png", "a.jpg"]);
  }

  #[test]
  fn missing_input_is_an_error() {
    assert!(collect_inputs(&[PathBuf::from("/definitely/not/here.png")]).is_err());
  }

  #[tokio::test]
  async fn disabled_ocr_reports_page_without_cells() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("page.png");
    image::DynamicImage::new_rgb8(64, 32).save(&path).unwrap();

    let converter = DocumentConverter::with_model(disabled_ocr());
    let report = converter.convert(&path).await.unwrap();

    assert_eq!(report.ocr_engine, "google_vision");
    assert!(!report.ocr_enabled);
    assert_eq!(report.pages.len(), 1);
    assert!(report.pages[0].valid);
    assert_eq!((report.pages[0].width, report.pages[0].height), (64.0, 32.0));
    assert_eq!(report.cell_count(), 0);
  }

  #[tokio::test]
  async fn pictures_are_cropped_at_the_configured_scale() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photo.png");
    image::DynamicImage::new_rgb8(20, 10).save(&path).unwrap();

    let mut descriptions = Vec::new();
    for scale in [2.0, 3.0] {
      let options = PictureDescriptionOptions::Api(PictureDescriptionApiOptions {
        scale,
        ..Default::default()
      });
      let converter =
        DocumentConverter::with_model(disabled_ocr()).with_picture_model(Box::new(SizeCaption { options }));
      let report = converter.convert(&path).await.unwrap();
      descriptions.push(report.pages[0].pictures[0].description.clone().unwrap());
    }

    assert_eq!(descriptions, ["40x20", "60x30"]);
  }
}
