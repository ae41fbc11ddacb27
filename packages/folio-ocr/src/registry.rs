//! Plugin registry: the engines this crate provides, keyed on the `kind`
//! tag of their options.

use std::path::Path;

use crate::engine::{OcrError, OcrModel};
use crate::google::GoogleVisionOcrModel;
use crate::options::{AcceleratorOptions, OcrOptions, PictureDescriptionOptions};
use crate::picture::{PictureDescriptionApiModel, PictureDescriptionModel};

pub type OcrFactory = fn(
    bool,
    Option<&Path>,
    &OcrOptions,
    &AcceleratorOptions,
) -> Result<Box<dyn OcrModel>, OcrError>;

pub type PictureDescriptionFactory =
    fn(bool, bool, &PictureDescriptionOptions) -> Result<Box<dyn PictureDescriptionModel>, OcrError>;

pub struct EngineEntry<F> {
    pub name: &'static str,
    pub kind: &'static str,
    pub factory: F,
}

pub struct EngineList<F> {
    entries: Vec<EngineEntry<F>>,
}

impl<F> Default for EngineList<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<F> EngineList<F> {
    pub fn register(&mut self, name: &'static str, kind: &'static str, factory: F) -> &mut Self {
        self.entries.push(EngineEntry { name, kind, factory });
        self
    }

    pub fn entries(&self) -> &[EngineEntry<F>] {
        &self.entries
    }

    pub fn find(&self, kind: &str) -> Result<&EngineEntry<F>, OcrError> {
        self.entries
            .iter()
            .find(|e| e.kind == kind)
            .ok_or_else(|| OcrError::UnknownEngine(kind.to_string()))
    }
}

fn google_vision(
    enabled: bool,
    artifacts_path: Option<&Path>,
    options: &OcrOptions,
    accelerator_options: &AcceleratorOptions,
) -> Result<Box<dyn OcrModel>, OcrError> {
    let OcrOptions::GoogleVision(options) = options;
    let model = GoogleVisionOcrModel::new(
        enabled,
        artifacts_path,
        options.clone(),
        accelerator_options.clone(),
    )?;
    Ok(Box::new(model))
}

fn picture_description_api(
    enabled: bool,
    enable_remote_services: bool,
    options: &PictureDescriptionOptions,
) -> Result<Box<dyn PictureDescriptionModel>, OcrError> {
    let PictureDescriptionOptions::Api(options) = options;
    let model = PictureDescriptionApiModel::new(enabled, enable_remote_services, options.clone())?;
    Ok(Box::new(model))
}

pub fn ocr_engines() -> EngineList<OcrFactory> {
    let mut list = EngineList::default();
    list.register(
        "GoogleVisionOcrModel",
        GoogleVisionOcrModel::options_kind(),
        google_vision as OcrFactory,
    );
    list
}

pub fn picture_description() -> EngineList<PictureDescriptionFactory> {
    let mut list = EngineList::default();
    list.register(
        "PictureDescriptionApiModel",
        PictureDescriptionApiModel::options_kind(),
        picture_description_api as PictureDescriptionFactory,
    );
    list
}

pub struct PluginRegistry {
    pub ocr_engines: EngineList<OcrFactory>,
    pub picture_description: EngineList<PictureDescriptionFactory>,
}

impl PluginRegistry {
    pub fn defaults() -> Self {
        Self {
            ocr_engines: ocr_engines(),
            picture_description: picture_description(),
        }
    }

    /// Builds the OCR engine registered for `options.kind()`.
    pub fn create_ocr_model(
        &self,
        enabled: bool,
        artifacts_path: Option<&Path>,
        options: &OcrOptions,
        accelerator_options: &AcceleratorOptions,
    ) -> Result<Box<dyn OcrModel>, OcrError> {
        let entry = self.ocr_engines.find(options.kind())?;
        (entry.factory)(enabled, artifacts_path, options, accelerator_options)
    }

    pub fn create_picture_description_model(
        &self,
        enabled: bool,
        enable_remote_services: bool,
        options: &PictureDescriptionOptions,
    ) -> Result<Box<dyn PictureDescriptionModel>, OcrError> {
        let entry = self.picture_description.find(options.kind())?;
        (entry.factory)(enabled, enable_remote_services, options)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::defaults()
    }
}
