//! Behaviour shared by every OCR engine: choosing which parts of a page to
//! OCR and merging OCR output into the page's existing cells.

use crate::options::OcrOptions;
use crate::page::Page;
use crate::region::{BoundingBox, TextCell};

/// Above this bitmap coverage the whole page is OCR'd as one region.
pub const BITMAP_COVERAGE_THRESHOLD: f64 = 0.75;

/// Regions of `page` that should be sent to OCR, in page coordinates.
pub fn get_ocr_rects(page: &Page, options: &OcrOptions) -> Vec<BoundingBox> {
    let (Some(backend), Some(size)) = (page.backend(), page.size) else {
        return Vec::new();
    };
    let page_area = size.area();
    if page_area <= 0.0 {
        return Vec::new();
    }

    let page_box = size.as_bbox();
    if options.force_full_page_ocr() {
        return vec![page_box];
    }

    let threshold = options.bitmap_area_threshold();
    let bitmaps = backend
        .bitmap_rects()
        .into_iter()
        .filter_map(|r| r.to_top_left_origin(size.height).intersection(&page_box))
        .filter(|r| r.area() / page_area >= threshold);

    let merged = merge_overlapping(bitmaps);
    let coverage = merged.iter().map(|r| r.area()).sum::<f64>() / page_area;

    if coverage > BITMAP_COVERAGE_THRESHOLD {
        vec![page_box]
    } else {
        merged
    }
}

/// Folds overlapping rectangles into their bounding union. The result is
/// pairwise disjoint.
fn merge_overlapping<I>(rects: I) -> Vec<BoundingBox>
where
    I: IntoIterator<Item = BoundingBox>,
{
    let mut merged: Vec<BoundingBox> = Vec::new();
    for rect in rects {
        let mut current = rect;
        while let Some(i) = merged
            .iter()
            .position(|m| m.intersection(&current).is_some())
        {
            current = current.union(&merged.swap_remove(i));
        }
        merged.push(current);
    }
    merged
}

/// Merges `ocr_cells` into `page.cells` and re-indexes the result.
///
/// Unless the whole page was force-OCR'd, OCR cells that intersect a
/// programmatic cell are dropped; with forced OCR the page's cells are
/// replaced outright.
pub fn post_process_cells(ocr_cells: Vec<TextCell>, page: &mut Page, options: &OcrOptions) {
    if options.force_full_page_ocr() {
        page.cells = ocr_cells;
    } else {
        let kept: Vec<TextCell> = ocr_cells
            .into_iter()
            .filter(|ocr| {
                !page
                    .cells
                    .iter()
                    .filter(|c| !c.from_ocr)
                    .any(|c| c.rect.intersection_area(&ocr.rect) > 0.0)
            })
            .collect();
        page.cells.extend(kept);
    }

    for (index, cell) in page.cells.iter_mut().enumerate() {
        cell.index = index;
    }
}
