use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat};
use tracing::{debug, warn};

use super::{PictureDescriptionModel, PictureItem};
use crate::engine::OcrError;
use crate::options::{PictureDescriptionApiOptions, PictureDescriptionOptions};

/// Describes pictures through an OpenAI-compatible chat completions API.
pub struct PictureDescriptionApiModel {
    enabled: bool,
    options: PictureDescriptionOptions,
    http: reqwest::Client,
}

impl PictureDescriptionApiModel {
    pub fn new(
        enabled: bool,
        enable_remote_services: bool,
        options: PictureDescriptionApiOptions,
    ) -> Result<Self, OcrError> {
        if enabled && !enable_remote_services {
            return Err(OcrError::Configuration(
                "Connections to remote services are only allowed when set explicitly. \
                 Set `enable_remote_services` in the pipeline options."
                    .into(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(|e| OcrError::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            enabled,
            options: PictureDescriptionOptions::Api(options),
            http,
        })
    }

    pub fn options_kind() -> &'static str {
        "api"
    }

    fn api_options(&self) -> &PictureDescriptionApiOptions {
        match &self.options {
            PictureDescriptionOptions::Api(o) => o,
        }
    }

    async fn describe(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let options = self.api_options();
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png)?;

        let body = chat_request(&buf.into_inner(), &options.prompt, &options.params);
        let mut request = self.http.post(&options.url).json(&body);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Api(format!("{} returned {}: {}", options.url, status, body)));
        }

        let json: serde_json::Value = response.json().await?;
        parse_chat_response(&json)
    }
}

pub(crate) fn chat_request(
    image_png: &[u8],
    prompt: &str,
    params: &serde_json::Map<String, serde_json::Value>,
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "messages": [{
            "role": "user",
            "content": [
                { "type": "image_url",
                  "image_url": { "url": format!("data:image/png;base64,{}", STANDARD.encode(image_png)) } },
                { "type": "text", "text": prompt }
            ]
        }]
    });
    if let Some(obj) = body.as_object_mut() {
        for (key, value) in params {
            obj.insert(key.clone(), value.clone());
        }
    }
    body
}

pub(crate) fn parse_chat_response(json: &serde_json::Value) -> Result<String, OcrError> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| OcrError::Api("response has no message content".into()))
}

#[async_trait]
impl PictureDescriptionModel for PictureDescriptionApiModel {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn options(&self) -> &PictureDescriptionOptions {
        &self.options
    }

    async fn annotate(&self, mut pictures: Vec<PictureItem>) -> Vec<PictureItem> {
        if !self.enabled {
            return pictures;
        }

        let threshold = self.api_options().picture_area_threshold;
        for picture in pictures.iter_mut() {
            if picture.area_fraction() < threshold {
                debug!(
                    "Skipping picture on page {}: covers {:.3} of the page",
                    picture.page_no,
                    picture.area_fraction()
                );
                continue;
            }
            match self.describe(&picture.image).await {
                Ok(text) => picture.description = Some(text),
                Err(e) => warn!("Picture description failed on page {}: {}", picture.page_no, e),
            }
        }
        pictures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Size;
    use crate::region::BoundingBox;

    #[test]
    fn remote_calls_must_be_allowed_explicitly() {
        let err = PictureDescriptionApiModel::new(true, false, Default::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("enable_remote_services"));
        assert!(PictureDescriptionApiModel::new(false, false, Default::default()).is_ok());
    }

    #[test]
    fn request_carries_image_prompt_and_params() {
        let mut params = serde_json::Map::new();
        params.insert("model".into(), serde_json::json!("granite-vision"));
        let body = chat_request(b"png", "What is this?", &params);

        assert_eq!(body["model"], "granite-vision");
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["image_url"]["url"], "data:image/png;base64,cG5n");
        assert_eq!(content[1]["text"], "What is this?");
    }

    #[test]
    fn response_content_is_trimmed() {
        let json = serde_json::json!({"choices": [{"message": {"content": "  A bar chart.\n"}}]});
        assert_eq!(parse_chat_response(&json).unwrap(), "A bar chart.");
        assert!(parse_chat_response(&serde_json::json!({})).is_err());
    }

    #[tokio::test]
    async fn small_pictures_are_left_alone() {
        let model = PictureDescriptionApiModel::new(
            true,
            true,
            PictureDescriptionApiOptions {
                url: "http://127.0.0.1:9/unreachable".into(),
                ..Default::default()
            },
        )
        .unwrap();
        let picture = PictureItem {
            page_no: 0,
            bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            page_size: Size {
                width: 100.0,
                height: 100.0,
            },
            image: DynamicImage::new_rgb8(1, 1),
            description: None,
        };
        let pictures = model.annotate(vec![picture]).await;
        assert!(pictures[0].description.is_none());
    }
}
