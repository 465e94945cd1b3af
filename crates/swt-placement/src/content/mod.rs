//! Boundary to the generative content service used while drafting job postings.
//!
//! Nothing here touches the ledger. Generated text and images land in a [`JobDraft`]; the
//! draft reaches the ledger only when it is posted.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod draft;
pub mod gemini;
pub mod prompts;

pub use draft::{fill_cover_image, fill_description, generate_promo_video, DraftScope, JobDraft};
pub use gemini::GeminiClient;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("content service returned nothing usable")]
    EmptyContent,

    #[error("video operation finished without a video")]
    MissingVideo,

    #[error("{0} is required before generating")]
    MissingInput(&'static str),

    #[error("generation cancelled; the draft was closed")]
    Cancelled,
}

/// Displayable image reference: a remote URL or an inline `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    pub fn data_url(mime_type: &str, base64_data: &str) -> Self {
        Self(format!("data:{mime_type};base64,{base64_data}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_inline(&self) -> bool {
        self.0.starts_with("data:")
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    pub prompt: String,
    pub aspect_ratio: String,
    pub resolution: String,
    pub number_of_videos: u32,
}

impl VideoRequest {
    /// Portrait promo clip advertised on the admin dashboard.
    pub fn promo() -> Self {
        Self {
            prompt: prompts::PROMO_VIDEO_PROMPT.to_string(),
            aspect_ratio: "9:16".to_string(),
            resolution: "1080p".to_string(),
            number_of_videos: 1,
        }
    }
}

/// Handle to a long-running video generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoOperation {
    pub name: String,
    pub done: bool,
    pub video_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoAsset {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Markdown job description for a posting.
    async fn job_description(&self, title: &str, requirements: &str)
        -> Result<String, ContentError>;

    async fn cover_image(&self, prompt: &str) -> Result<ImageRef, ContentError>;

    async fn start_video(&self, request: &VideoRequest) -> Result<VideoOperation, ContentError>;

    async fn poll_video(&self, operation: &VideoOperation) -> Result<VideoOperation, ContentError>;

    async fn fetch_video(&self, uri: &str) -> Result<VideoAsset, ContentError>;
}
