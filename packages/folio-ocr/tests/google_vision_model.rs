//! Adapter behaviour against an in-memory Vision service and page backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use folio_ocr::google::response::AnnotateImageResponse;
use folio_ocr::prelude::*;
use folio_ocr::settings::DebugSettings;
use image::DynamicImage;
use serde_json::json;

#[derive(Clone, Default)]
struct Probe {
    calls: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
    hints: Arc<Mutex<Vec<Vec<String>>>>,
}

struct FakeVision {
    responses: Mutex<VecDeque<Result<AnnotateImageResponse, OcrError>>>,
    probe: Probe,
}

impl FakeVision {
    fn new(responses: Vec<Result<AnnotateImageResponse, OcrError>>, probe: &Probe) -> Box<Self> {
        Box::new(Self {
            responses: Mutex::new(responses.into()),
            probe: probe.clone(),
        })
    }
}

#[async_trait]
impl VisionService for FakeVision {
    async fn document_text_detection(
        &self,
        image: &[u8],
        language_hints: &[String],
    ) -> Result<AnnotateImageResponse, OcrError> {
        assert!(image.starts_with(b"\x89PNG"), "expected a PNG payload");
        self.probe.calls.fetch_add(1, Ordering::SeqCst);
        self.probe.hints.lock().unwrap().push(language_hints.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(AnnotateImageResponse::default()))
    }

    fn close(&self) {
        self.probe.closed.store(true, Ordering::SeqCst);
    }
}

struct FakeBackend {
    valid: bool,
}

impl PageBackend for FakeBackend {
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn size(&self) -> Size {
        Size {
            width: 200.0,
            height: 200.0,
        }
    }

    fn get_page_image(
        &self,
        scale: f64,
        cropbox: Option<&BoundingBox>,
    ) -> Result<DynamicImage, OcrError> {
        let bbox = cropbox.copied().unwrap_or_else(|| self.size().as_bbox());
        let width = ((bbox.width() * scale) as u32).max(1);
        let height = ((bbox.height() * scale) as u32).max(1);
        Ok(DynamicImage::new_rgb8(width, height))
    }
}

fn word(text: &str, from: (i64, i64), to: (i64, i64), confidences: &[f64]) -> serde_json::Value {
    let symbols: Vec<_> = text
        .chars()
        .enumerate()
        .map(|(i, c)| match confidences.get(i) {
            Some(conf) => json!({"text": c.to_string(), "confidence": conf}),
            None => json!({"text": c.to_string()}),
        })
        .collect();
    json!({
        "boundingBox": {"vertices": [
            {"x": from.0, "y": from.1}, {"x": to.0, "y": from.1},
            {"x": to.0, "y": to.1}, {"x": from.0, "y": to.1}
        ]},
        "symbols": symbols
    })
}

/// One-page response holding `words`.
fn response(words: Vec<serde_json::Value>) -> AnnotateImageResponse {
    serde_json::from_value(json!({
        "fullTextAnnotation": {
            "pages": [{"blocks": [{"paragraphs": [{"words": words}]}]}]
        }
    }))
    .unwrap()
}

fn full_page_options() -> GoogleVisionOcrOptions {
    GoogleVisionOcrOptions {
        force_full_page_ocr: true,
        lang: vec!["en".into()],
        ..Default::default()
    }
}

fn quiet() -> DebugSettings {
    DebugSettings::default()
}

fn page(page_no: usize, valid: bool) -> Page {
    let mut page = Page::with_backend(page_no, Box::new(FakeBackend { valid }));
    page.cells.push(TextCell::programmatic(
        0,
        "existing",
        BoundingBox::new(0.0, 0.0, 1.0, 1.0),
    ));
    page
}

#[tokio::test]
async fn disabled_model_passes_pages_through_in_order() {
    let probe = Probe::default();
    let model = GoogleVisionOcrModel::with_service(
        false,
        full_page_options(),
        FakeVision::new(vec![], &probe),
    )
    .with_debug(quiet());
    let mut conv_res = ConversionResult::new("doc.png");

    let pages = model
        .process(&mut conv_res, vec![page(0, true), page(1, false), page(2, true)])
        .await;

    let numbers: Vec<_> = pages.iter().map(|p| p.page_no).collect();
    assert_eq!(numbers, [0, 1, 2]);
    assert!(pages.iter().all(|p| p.cells.len() == 1 && p.cells[0].text == "existing"));
    assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_backend_is_not_sent_to_the_service() {
    let probe = Probe::default();
    let model = GoogleVisionOcrModel::with_service(
        true,
        full_page_options(),
        FakeVision::new(vec![], &probe),
    )
    .with_debug(quiet());
    let mut conv_res = ConversionResult::new("doc.png");

    let pages = model.process(&mut conv_res, vec![page(7, false)]).await;

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].page_no, 7);
    assert_eq!(pages[0].cells.len(), 1);
    assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn zero_area_regions_are_skipped() {
    let probe = Probe::default();
    let model = GoogleVisionOcrModel::with_service(
        true,
        full_page_options(),
        FakeVision::new(vec![], &probe),
    )
    .with_debug(quiet());
    let page = page(0, true);

    let regions = [
        BoundingBox::new(10.0, 10.0, 10.0, 50.0),
        BoundingBox::new(0.0, 0.0, 50.0, 50.0),
    ];
    model.recognize_page(&page, &regions).await;

    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failing_region_does_not_block_the_others() {
    let probe = Probe::default();
    let service_error: AnnotateImageResponse =
        serde_json::from_value(json!({"error": {"code": 13, "message": "internal"}})).unwrap();
    let responses = vec![
        Err(OcrError::Api("503 Service Unavailable".into())),
        Ok(service_error),
        Ok(response(vec![word("left", (0, 0), (30, 15), &[0.5])])),
    ];
    let model = GoogleVisionOcrModel::with_service(
        true,
        full_page_options(),
        FakeVision::new(responses, &probe),
    )
    .with_debug(quiet());
    let page = page(0, true);

    let regions = [
        BoundingBox::new(0.0, 0.0, 50.0, 50.0),
        BoundingBox::new(50.0, 0.0, 100.0, 50.0),
        BoundingBox::new(100.0, 0.0, 150.0, 50.0),
    ];
    let cells = model.recognize_page(&page, &regions).await;

    assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
    assert_eq!(cells.len(), 1);
    assert_eq!(cells[0].text, "left");
    assert_eq!(cells[0].index, 0);
    assert_eq!(cells[0].rect, BoundingBox::new(100.0, 0.0, 110.0, 5.0));
}

#[tokio::test]
async fn indices_are_contiguous_across_regions() {
    let probe = Probe::default();
    let responses = vec![
        Ok(response(vec![
            word("a", (0, 0), (3, 3), &[]),
            word("b", (3, 0), (6, 3), &[]),
        ])),
        Ok(AnnotateImageResponse::default()),
        Ok(response(vec![word("c", (0, 0), (3, 3), &[])])),
    ];
    let model = GoogleVisionOcrModel::with_service(
        true,
        full_page_options(),
        FakeVision::new(responses, &probe),
    )
    .with_debug(quiet());
    let page = page(0, true);

    let regions = [
        BoundingBox::new(0.0, 0.0, 10.0, 10.0),
        BoundingBox::new(10.0, 0.0, 20.0, 10.0),
        BoundingBox::new(20.0, 0.0, 30.0, 10.0),
    ];
    let cells = model.recognize_page(&page, &regions).await;

    let indices: Vec<_> = cells.iter().map(|c| c.index).collect();
    let texts: Vec<_> = cells.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(indices, [0, 1, 2]);
    assert_eq!(texts, ["a", "b", "c"]);
}

#[tokio::test]
async fn multi_page_response_uses_first_page() {
    let probe = Probe::default();
    let two_pages: AnnotateImageResponse = serde_json::from_value(json!({
        "fullTextAnnotation": {"pages": [
            {"blocks": [{"paragraphs": [{"words": [{
                "boundingBox": {"vertices": [{"x": 0, "y": 0}, {"x": 3, "y": 3}]},
                "symbols": [{"text": "1"}]
            }]}]}]},
            {"blocks": [{"paragraphs": [{"words": [{
                "boundingBox": {"vertices": [{"x": 0, "y": 0}, {"x": 3, "y": 3}]},
                "symbols": [{"text": "2"}]
            }]}]}]}
        ]}
    }))
    .unwrap();
    let model = GoogleVisionOcrModel::with_service(
        true,
        full_page_options(),
        FakeVision::new(vec![Ok(two_pages)], &probe),
    )
    .with_debug(quiet());

    let cells = model
        .recognize_page(&page(0, true), &[BoundingBox::new(0.0, 0.0, 10.0, 10.0)])
        .await;

    assert_eq!(cells.len(), 1);
    assert_eq!(cells[0].text, "1");
}

#[tokio::test]
async fn full_page_ocr_replaces_cells_in_page_coordinates() {
    let probe = Probe::default();
    let responses = vec![Ok(response(vec![
        word("Hello", (0, 0), (300, 300), &[0.8, 0.9, 1.0, 0.9, 0.9]),
        word("x", (300, 0), (330, 30), &[]),
        word("", (330, 0), (360, 30), &[]),
    ]))];
    let model = GoogleVisionOcrModel::with_service(
        true,
        full_page_options(),
        FakeVision::new(responses, &probe),
    )
    .with_debug(quiet());
    let mut conv_res = ConversionResult::new("doc.png");

    let pages = model.process(&mut conv_res, vec![page(0, true)]).await;
    let cells = &pages[0].cells;

    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    assert_eq!(probe.hints.lock().unwrap()[0], ["en".to_string()]);
    assert_eq!(cells.len(), 3);
    assert_eq!(cells[0].text, "Hello");
    assert_eq!(cells[0].rect, BoundingBox::new(0.0, 0.0, 100.0, 100.0));
    assert!((cells[0].confidence - 0.9).abs() < 1e-9);
    // "x" carries a symbol whose zero confidence was omitted.
    assert_eq!(cells[1].confidence, 0.0);
    assert_eq!(cells[2].confidence, folio_ocr::google::FALLBACK_CONFIDENCE);
    assert!(cells.iter().all(|c| c.from_ocr));
}

#[tokio::test]
async fn ocr_stage_is_timed_when_profiling() {
    let probe = Probe::default();
    let debug = DebugSettings {
        profile_pipeline_timings: true,
        ..DebugSettings::default()
    };
    let model = GoogleVisionOcrModel::with_service(
        true,
        full_page_options(),
        FakeVision::new(vec![], &probe),
    )
    .with_debug(debug);
    let mut conv_res = ConversionResult::new("doc.png");

    model
        .process(&mut conv_res, vec![page(0, true), page(1, false), page(2, true)])
        .await;

    assert_eq!(conv_res.timings.get("ocr").unwrap().count, 2);
}

#[tokio::test]
async fn visualization_writes_one_image_per_page() {
    let dir = tempfile::tempdir().unwrap();
    let probe = Probe::default();
    let debug = DebugSettings {
        visualize_ocr: true,
        debug_output_path: dir.path().to_path_buf(),
        ..DebugSettings::default()
    };
    let model = GoogleVisionOcrModel::with_service(
        true,
        full_page_options(),
        FakeVision::new(vec![], &probe),
    )
    .with_debug(debug);
    let mut conv_res = ConversionResult::new("scan.png");

    model.process(&mut conv_res, vec![page(0, true), page(1, true)]).await;

    assert!(dir.path().join("debug_scan_ocr_page_00000.png").exists());
    assert!(dir.path().join("debug_scan_ocr_page_00001.png").exists());
}

#[test]
fn dropping_the_model_closes_the_service() {
    let probe = Probe::default();
    let model = GoogleVisionOcrModel::with_service(
        true,
        full_page_options(),
        FakeVision::new(vec![], &probe),
    );
    assert!(!probe.closed.load(Ordering::SeqCst));
    drop(model);
    assert!(probe.closed.load(Ordering::SeqCst));
}

#[test]
fn enabled_model_builds_from_service_account_key() {
    let credentials = Credentials(serde_json::from_str(include_str!("fixtures/service_account.json")).unwrap());
    let options = GoogleVisionOcrOptions {
        credentials,
        ..Default::default()
    };
    let model = GoogleVisionOcrModel::new(true, None, options, AcceleratorOptions::default()).unwrap();
    assert!(model.enabled());
}

#[tokio::test]
async fn fractional_region_origin_is_snapped_before_mapping() {
    let probe = Probe::default();
    let responses = vec![Ok(response(vec![word("a", (0, 0), (30, 30), &[1.0])]))];
    let model = GoogleVisionOcrModel::with_service(
        true,
        full_page_options(),
        FakeVision::new(responses, &probe),
    )
    .with_debug(quiet());

    let cells = model
        .recognize_page(&page(0, true), &[BoundingBox::new(10.5, 20.5, 50.0, 60.0)])
        .await;

    assert_eq!(cells.len(), 1);
    assert_eq!(cells[0].rect, BoundingBox::new(10.0, 20.0, 20.0, 30.0));
}
