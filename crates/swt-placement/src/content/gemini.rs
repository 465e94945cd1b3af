//! Generative Language REST client. Every call to the content service goes through here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::prompts::{cover_image_prompt, job_description_prompt};
use super::{ContentError, ContentGenerator, ImageRef, VideoAsset, VideoOperation, VideoRequest};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const TEXT_MODEL: &str = "gemini-2.5-flash";
pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";
const COVER_ASPECT_RATIO: &str = "4:3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    image_config: ImageConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig<'a> {
    aspect_ratio: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .into_iter()
            .flat_map(|content| content.parts.iter())
    }

    /// Concatenated text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let text: String = self
            .parts()
            .filter_map(|part| part.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }

    /// First inline image of the first candidate, as a data URL.
    fn inline_image(&self) -> Option<ImageRef> {
        self.parts()
            .find_map(|part| part.inline_data.as_ref())
            .map(|data| ImageRef::data_url(&data.mime_type, &data.data))
    }
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<PredictInstance<'a>>,
    parameters: VideoParameters<'a>,
}

#[derive(Debug, Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParameters<'a> {
    aspect_ratio: &'a str,
    resolution: &'a str,
    sample_count: u32,
}

#[derive(Debug, Deserialize)]
struct OperationResponse {
    name: String,
    #[serde(default)]
    done: bool,
    response: Option<OperationResult>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResult {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<VideoFile>,
}

#[derive(Debug, Deserialize)]
struct VideoFile {
    uri: Option<String>,
}

impl OperationResponse {
    fn into_operation(self) -> Result<VideoOperation, ContentError> {
        if let Some(error) = self.error {
            return Err(ContentError::Api {
                status: error.code.unwrap_or_default(),
                message: error.message,
            });
        }
        let video_uri = self
            .response
            .and_then(|result| result.generate_video_response)
            .and_then(|response| response.generated_samples.into_iter().next())
            .and_then(|sample| sample.video)
            .and_then(|video| video.uri);
        Ok(VideoOperation {
            name: self.name,
            done: self.done,
            video_uri,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<u16>,
    message: String,
}

/// Gemini / Veo client authenticated with an API key.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    max_attempts: u32,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ContentError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ContentError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_attempts: 1,
        })
    }

    /// Retries rate limits and server errors up to `attempts` sends in total. Failures
    /// surface on the first attempt unless this is raised.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{model}:{method}", self.base_url)
    }

    async fn generate_content(
        &self,
        model: &str,
        prompt: &str,
        generation_config: Option<GenerationConfig<'_>>,
    ) -> Result<GenerateContentResponse, ContentError> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config,
        };
        let url = self.model_url(model, "generateContent");
        self.send_json(|| self.client.post(&url).json(&body)).await
    }

    /// Sends the request built by `build`. Rate limits and server errors are retried with
    /// exponential backoff while attempts remain.
    async fn send_json<T: DeserializeOwned>(
        &self,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<T, ContentError> {
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying content request");
                tokio::time::sleep(delay).await;
            }

            let response = match build().header("x-goog-api-key", &self.api_key).send().await {
                Ok(response) => response,
                Err(err) => {
                    last_error = Some(ContentError::Http(err));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(ContentError::Api {
                    status: status.as_u16(),
                    message: error_message(body),
                });
                continue;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ContentError::Api {
                    status: status.as_u16(),
                    message: error_message(body),
                });
            }

            let text = response.text().await?;
            return Ok(serde_json::from_str(&text)?);
        }

        Err(last_error.unwrap_or(ContentError::EmptyContent))
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn job_description(
        &self,
        title: &str,
        requirements: &str,
    ) -> Result<String, ContentError> {
        let prompt = job_description_prompt(title, requirements);
        let response = self.generate_content(TEXT_MODEL, &prompt, None).await?;
        response.text().ok_or(ContentError::EmptyContent)
    }

    async fn cover_image(&self, prompt: &str) -> Result<ImageRef, ContentError> {
        let prompt = cover_image_prompt(prompt);
        let config = GenerationConfig {
            image_config: ImageConfig {
                aspect_ratio: COVER_ASPECT_RATIO,
            },
        };
        let response = self
            .generate_content(IMAGE_MODEL, &prompt, Some(config))
            .await?;
        response.inline_image().ok_or(ContentError::EmptyContent)
    }

    async fn start_video(&self, request: &VideoRequest) -> Result<VideoOperation, ContentError> {
        let body = PredictRequest {
            instances: vec![PredictInstance {
                prompt: &request.prompt,
            }],
            parameters: VideoParameters {
                aspect_ratio: &request.aspect_ratio,
                resolution: &request.resolution,
                sample_count: request.number_of_videos,
            },
        };
        let url = self.model_url(VIDEO_MODEL, "predictLongRunning");
        let operation: OperationResponse =
            self.send_json(|| self.client.post(&url).json(&body)).await?;
        debug!(operation = %operation.name, "video generation started");
        operation.into_operation()
    }

    async fn poll_video(&self, operation: &VideoOperation) -> Result<VideoOperation, ContentError> {
        let url = format!("{}/{}", self.base_url, operation.name);
        let operation: OperationResponse = self.send_json(|| self.client.get(&url)).await?;
        operation.into_operation()
    }

    async fn fetch_video(&self, uri: &str) -> Result<VideoAsset, ContentError> {
        let response = self
            .client
            .get(uri)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ContentError::Api {
                status: status.as_u16(),
                message: error_message(body),
            });
        }
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("video/mp4")
            .to_string();
        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(ContentError::EmptyContent);
        }
        Ok(VideoAsset { bytes, mime_type })
    }
}

/// Prefers the `error.message` field of a JSON error body over the raw text.
fn error_message(body: String) -> String {
    serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn image_request_carries_aspect_ratio() {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: "beach" }],
            }],
            generation_config: Some(GenerationConfig {
                image_config: ImageConfig {
                    aspect_ratio: COVER_ASPECT_RATIO,
                },
            }),
        };
        assert_eq!(
            serde_json::to_value(&body).expect("serializes"),
            json!({
                "contents": [{"parts": [{"text": "beach"}]}],
                "generationConfig": {"imageConfig": {"aspectRatio": "4:3"}}
            })
        );
    }

    #[test]
    fn text_response_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "## 亮点\n"}, {"text": "Sunny beach"}]}}]
        }))
        .expect("parses");
        assert_eq!(response.text().as_deref(), Some("## 亮点\nSunny beach"));
        assert!(GenerateContentResponse::default().text().is_none());
    }

    #[test]
    fn image_response_becomes_data_url() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [
                {"text": "Here is your image"},
                {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
            ]}}]
        }))
        .expect("parses");
        let image = response.inline_image().expect("image part");
        assert_eq!(image.as_str(), "data:image/png;base64,iVBORw0KGgo=");
        assert!(image.is_inline());
    }

    #[test]
    fn finished_operation_exposes_video_uri() {
        let operation: OperationResponse = serde_json::from_value(json!({
            "name": "models/veo-3.1-fast-generate-preview/operations/op-1",
            "done": true,
            "response": {"generateVideoResponse": {"generatedSamples": [
                {"video": {"uri": "https://example.com/files/v1:download?alt=media"}}
            ]}}
        }))
        .expect("parses");
        let operation = operation.into_operation().expect("no error");
        assert!(operation.done);
        assert_eq!(
            operation.video_uri.as_deref(),
            Some("https://example.com/files/v1:download?alt=media")
        );
    }

    #[test]
    fn failed_operation_surfaces_api_error() {
        let operation: OperationResponse = serde_json::from_value(json!({
            "name": "operations/op-2",
            "done": true,
            "error": {"code": 400, "message": "prompt rejected"}
        }))
        .expect("parses");
        match operation.into_operation() {
            Err(ContentError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "prompt rejected");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn error_message_prefers_json_body() {
        let body = r#"{"error":{"code":403,"message":"API key not valid","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(error_message(body.to_string()), "API key not valid");
        assert_eq!(error_message("bad gateway".to_string()), "bad gateway");
    }

    #[test]
    fn base_url_is_normalized() {
        let client = GeminiClient::with_base_url("key", "http://localhost:9000/v1beta/")
            .expect("client builds");
        assert_eq!(
            client.model_url(TEXT_MODEL, "generateContent"),
            "http://localhost:9000/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn sends_once_unless_retries_requested() {
        let client = GeminiClient::new("key").expect("client builds");
        assert_eq!(client.max_attempts, 1);
        assert_eq!(client.clone().with_max_attempts(0).max_attempts, 1);
        assert_eq!(client.with_max_attempts(3).max_attempts, 3);
    }
}
