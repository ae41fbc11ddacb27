//! Picture description engines: short natural-language captions for the
//! pictures found on a page.

mod api;

use async_trait::async_trait;
use image::DynamicImage;

use crate::options::PictureDescriptionOptions;
use crate::page::Size;
use crate::region::BoundingBox;

pub use api::PictureDescriptionApiModel;

/// A picture cropped from a page, waiting for a description.
#[derive(Debug, Clone)]
pub struct PictureItem {
    pub page_no: usize,
    pub bbox: BoundingBox,
    pub page_size: Size,
    pub image: DynamicImage,
    pub description: Option<String>,
}

impl PictureItem {
    /// Fraction of the page this picture covers.
    pub fn area_fraction(&self) -> f64 {
        let page_area = self.page_size.area();
        if page_area <= 0.0 {
            0.0
        } else {
            self.bbox.area() / page_area
        }
    }
}

#[async_trait]
pub trait PictureDescriptionModel: Send + Sync {
    fn enabled(&self) -> bool;

    fn options(&self) -> &PictureDescriptionOptions;

    /// Returns the pictures in order, with descriptions filled in where the
    /// engine produced one.
    async fn annotate(&self, pictures: Vec<PictureItem>) -> Vec<PictureItem>;
}
