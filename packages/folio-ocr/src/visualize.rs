//! Debug drawing of OCR regions and the cells found on a page.

use std::path::{Path, PathBuf};

use image::Rgba;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use tracing::debug;

use crate::engine::OcrError;
use crate::page::{ConversionResult, Page};
use crate::region::BoundingBox;

const REGION_COLOR: Rgba<u8> = Rgba([0, 160, 255, 255]);
const OCR_CELL_COLOR: Rgba<u8> = Rgba([255, 0, 255, 255]);
const PROGRAMMATIC_CELL_COLOR: Rgba<u8> = Rgba([128, 128, 128, 255]);

fn to_rect(bbox: &BoundingBox) -> Option<Rect> {
    let width = bbox.width().round() as u32;
    let height = bbox.height().round() as u32;
    (width > 0 && height > 0)
        .then(|| Rect::at(bbox.l.round() as i32, bbox.t.round() as i32).of_size(width, height))
}

/// Renders `page` at scale 1 with its OCR regions and cells outlined and
/// writes it to `output_dir`. Returns the written path.
pub fn draw_ocr_rects_and_cells(
    conv_res: &ConversionResult,
    page: &Page,
    ocr_rects: &[BoundingBox],
    output_dir: &Path,
) -> Result<PathBuf, OcrError> {
    let mut image = page.get_image(1.0, None)?.to_rgba8();

    for rect in ocr_rects.iter().filter_map(to_rect) {
        draw_hollow_rect_mut(&mut image, rect, REGION_COLOR);
    }

    for cell in &page.cells {
        let color = if cell.from_ocr {
            OCR_CELL_COLOR
        } else {
            PROGRAMMATIC_CELL_COLOR
        };
        if let Some(rect) = to_rect(&cell.rect) {
            draw_hollow_rect_mut(&mut image, rect, color);
        }
    }

    std::fs::create_dir_all(output_dir)?;
    let stem = Path::new(&conv_res.input_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let path = output_dir.join(format!("debug_{}_ocr_page_{:05}.png", stem, page.page_no));
    image.save(&path)?;

    debug!("OCR debug image written to {}", path.display());
    Ok(path)
}
