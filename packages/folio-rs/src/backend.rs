//! Page backend for plain image files: one file, one page, one pixel per
//! page unit.
use folio_ocr::{BoundingBox, OcrError, PageBackend, Size};
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::warn;

/// File extensions treated as page images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif", "webp"];

pub struct ImageFileBackend {
  path: PathBuf,
  image: Option<DynamicImage>,
}

impl ImageFileBackend {
  /// Decodes `path`. A file that cannot be decoded yields an invalid backend
  /// rather than an error, so the page still flows through the pipeline.
  pub fn open(path: &Path) -> Self {
    let image = match image::open(path) {
      Ok(image) => Some(image),
      Err(e) => {
        warn!("Cannot decode {}: {}", path.display(), e);
        None
      }
    };
    Self {
      path: path.to_path_buf(),
      image,
    }
  }

  pub fn from_image(path: impl Into<PathBuf>, image: DynamicImage) -> Self {
    Self {
      path: path.into(),
      image: Some(image),
    }
  }

  pub fn is_image_file(path: &Path) -> bool {
    path
      .extension()
      .and_then(|e| e.to_str())
      .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
      .unwrap_or(false)
  }
}

impl PageBackend for ImageFileBackend {
  fn is_valid(&self) -> bool {
    self.image.is_some()
  }

  fn size(&self) -> Size {
    let (width, height) = self
      .image
      .as_ref()
      .map(|i| (i.width(), i.height()))
      .unwrap_or((0, 0));
    Size {
      width: width as f64,
      height: height as f64,
    }
  }

  /// The whole file is a bitmap.
  fn bitmap_rects(&self) -> Vec<BoundingBox> {
    if self.is_valid() {
      vec![self.size().as_bbox()]
    } else {
      Vec::new()
    }
  }

  fn get_page_image(&self, scale: f64, cropbox: Option<&BoundingBox>) -> Result<DynamicImage, OcrError> {
    let image = self
      .image
      .as_ref()
      .ok_or_else(|| OcrError::InvalidInput(format!("{} is not a readable image", self.path.display())))?;

    let cropped = match cropbox {
      Some(bbox) => {
        let x0 = bbox.l.floor().max(0.0) as u32;
        let y0 = bbox.t.floor().max(0.0) as u32;
        let x1 = (bbox.r.ceil() as u32).min(image.width());
        let y1 = (bbox.b.ceil() as u32).min(image.height());
        if x1 <= x0 || y1 <= y0 {
          return Err(OcrError::InvalidInput(format!(
            "crop box {:?} lies outside {}",
            bbox,
            self.path.display()
          )));
        }
        image.crop_imm(x0, y0, x1 - x0, y1 - y0)
      }
      None => image.clone(),
    };

    if (scale - 1.0).abs() < f64::EPSILON {
      return Ok(cropped);
    }

    let width = ((cropped.width() as f64 * scale).round() as u32).max(1);
    let height = ((cropped.height() as f64 * scale).round() as u32).max(1);
    Ok(cropped.resize_exact(width, height, FilterType::Triangle))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn backend() -> ImageFileBackend {
    ImageFileBackend::from_image("page.png", DynamicImage::new_rgb8(100, 50))
  }

  #[test]
  fn page_size_matches_pixels() {
    let size = backend().size();
    assert_eq!((size.width, size.height), (100.0, 50.0));
  }

  #[test]
  fn crop_then_scale() {
    let image = backend()
      .get_page_image(3.0, Some(&BoundingBox::new(10.0, 10.0, 30.0, 20.0)))
      .unwrap();
    assert_eq!((image.width(), image.height()), (60, 30));
  }

  #[test]
  fn crop_is_clamped_to_the_image() {
    let image = backend()
      .get_page_image(1.0, Some(&BoundingBox::new(90.0, 40.0, 200.0, 200.0)))
      .unwrap();
    assert_eq!((image.width(), image.height()), (10, 10));
  }

  #[test]
  fn crop_outside_the_image_is_an_error() {
    assert!(backend()
      .get_page_image(1.0, Some(&BoundingBox::new(150.0, 0.0, 200.0, 10.0)))
      .is_err());
  }

  #[test]
  fn undecodable_file_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"not an image").unwrap();

    let backend = ImageFileBackend::open(&path);
    assert!(!backend.is_valid());
    assert!(backend.bitmap_rects().is_empty());
    assert!(backend.get_page_image(1.0, None).is_err());
  }

  #[test]
  fn recognizes_image_extensions() {
    assert!(ImageFileBackend::is_image_file(Path::new("scan.PNG")));
    assert!(!ImageFileBackend::is_image_file(Path::new("notes.txt")));
  }
}
