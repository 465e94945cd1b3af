use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ContentError, ContentGenerator, ImageRef, VideoAsset, VideoRequest};
use crate::placement::JobPosting;

/// Job-posting form still being edited. Generated content is written here, never into the
/// ledger, until the admin posts it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobDraft {
    pub posting: JobPosting,
    /// Free-text hints fed to the description prompt.
    pub requirements: String,
}

impl JobDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            posting: JobPosting {
                title: title.into(),
                ..JobPosting::default()
            },
            requirements: String::new(),
        }
    }

    pub fn cover_image(&self) -> Option<&str> {
        self.posting.image.as_deref()
    }

    pub fn into_posting(self) -> JobPosting {
        self.posting
    }
}

/// Lifetime of the view that started a generation. Closing the scope abandons every
/// generation still running under it.
#[derive(Debug, Clone, Default)]
pub struct DraftScope {
    token: CancellationToken,
}

impl DraftScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Runs `work` unless the scope closes first. A result that arrives after the scope
    /// closed is dropped.
    pub async fn run<T, F>(&self, work: F) -> Result<T, ContentError>
    where
        F: Future<Output = Result<T, ContentError>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ContentError::Cancelled),
            result = work => {
                if self.is_active() {
                    result
                } else {
                    Err(ContentError::Cancelled)
                }
            }
        }
    }
}

/// Fills the draft's description from its title and requirements.
pub async fn fill_description(
    generator: &dyn ContentGenerator,
    scope: &DraftScope,
    draft: &mut JobDraft,
) -> Result<(), ContentError> {
    let title = draft.posting.title.trim().to_string();
    if title.is_empty() {
        return Err(ContentError::MissingInput("job title"));
    }
    let requirements = draft.requirements.clone();

    let description = scope
        .run(generator.job_description(&title, &requirements))
        .await
        .inspect_err(|err| warn!(%title, error = %err, "description generation failed"))?;
    draft.posting.description = description;
    info!(%title, "description drafted");
    Ok(())
}

/// Generates a cover image for the draft. `prompt` defaults to the job title.
pub async fn fill_cover_image(
    generator: &dyn ContentGenerator,
    scope: &DraftScope,
    draft: &mut JobDraft,
    prompt: Option<&str>,
) -> Result<ImageRef, ContentError> {
    let prompt = prompt
        .map(str::trim)
        .filter(|prompt| !prompt.is_empty())
        .unwrap_or_else(|| draft.posting.title.trim())
        .to_string();
    if prompt.is_empty() {
        return Err(ContentError::MissingInput("image prompt"));
    }

    let image = scope
        .run(generator.cover_image(&prompt))
        .await
        .inspect_err(|err| warn!(error = %err, "cover generation failed"))?;
    draft.posting.image = Some(image.as_str().to_string());
    info!(inline = image.is_inline(), "cover image drafted");
    Ok(image)
}

/// Starts a video generation, polls it every `poll_interval` until done, then downloads it.
pub async fn generate_promo_video(
    generator: &dyn ContentGenerator,
    scope: &DraftScope,
    request: &VideoRequest,
    poll_interval: Duration,
) -> Result<VideoAsset, ContentError> {
    scope
        .run(async {
            let mut operation = generator.start_video(request).await?;
            let mut polls = 0u32;
            while !operation.done {
                tokio::time::sleep(poll_interval).await;
                polls += 1;
                debug!(operation = %operation.name, polls, "polling video generation");
                operation = generator.poll_video(&operation).await?;
            }
            let uri = operation.video_uri.ok_or(ContentError::MissingVideo)?;
            let asset = generator.fetch_video(&uri).await?;
            info!(polls, bytes = asset.bytes.len(), "promo video ready");
            Ok(asset)
        })
        .await
        .inspect_err(|err| warn!(error = %err, "video generation failed"))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::content::VideoOperation;

    #[derive(Default)]
    struct FakeGenerator {
        delay: Duration,
        polls_until_done: usize,
        polls: AtomicUsize,
        fail_text: bool,
        seen_prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ContentGenerator for FakeGenerator {
        async fn job_description(
            &self,
            title: &str,
            requirements: &str,
        ) -> Result<String, ContentError> {
            tokio::time::sleep(self.delay).await;
            if self.fail_text {
                return Err(ContentError::Api {
                    status: 500,
                    message: "backend unavailable".to_string(),
                });
            }
            Ok(format!("## {title}\n{requirements}"))
        }

        async fn cover_image(&self, prompt: &str) -> Result<ImageRef, ContentError> {
            self.seen_prompts
                .lock()
                .expect("prompts mutex poisoned")
                .push(prompt.to_string());
            tokio::time::sleep(self.delay).await;
            Ok(ImageRef::data_url("image/png", "AAAA"))
        }

        async fn start_video(
            &self,
            _request: &VideoRequest,
        ) -> Result<VideoOperation, ContentError> {
            Ok(VideoOperation {
                name: "operations/fake".to_string(),
                done: self.polls_until_done == 0,
                video_uri: (self.polls_until_done == 0).then(|| "mem://video".to_string()),
            })
        }

        async fn poll_video(
            &self,
            operation: &VideoOperation,
        ) -> Result<VideoOperation, ContentError> {
            let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            let done = polls >= self.polls_until_done;
            Ok(VideoOperation {
                name: operation.name.clone(),
                done,
                video_uri: done.then(|| "mem://video".to_string()),
            })
        }

        async fn fetch_video(&self, uri: &str) -> Result<VideoAsset, ContentError> {
            Ok(VideoAsset {
                bytes: uri.as_bytes().to_vec(),
                mime_type: "video/mp4".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn description_lands_in_draft_only() {
        let generator = FakeGenerator::default();
        let scope = DraftScope::new();
        let mut draft = JobDraft::new("Line Cook");
        draft.requirements = "seafood".to_string();

        fill_description(&generator, &scope, &mut draft)
            .await
            .expect("generation succeeds");
        assert_eq!(draft.posting.description, "## Line Cook\nseafood");
    }

    #[tokio::test]
    async fn blank_title_is_refused_before_calling_out() {
        let generator = FakeGenerator::default();
        let mut draft = JobDraft::new("   ");
        let err = fill_description(&generator, &DraftScope::new(), &mut draft)
            .await
            .expect_err("title required");
        assert!(matches!(err, ContentError::MissingInput("job title")));
    }

    #[tokio::test]
    async fn failure_leaves_field_unfilled() {
        let generator = FakeGenerator {
            fail_text: true,
            ..FakeGenerator::default()
        };
        let mut draft = JobDraft::new("Line Cook");
        draft.posting.description = "hand written".to_string();
        let err = fill_description(&generator, &DraftScope::new(), &mut draft)
            .await
            .expect_err("backend fails");
        assert!(matches!(err, ContentError::Api { status: 500, .. }));
        assert_eq!(draft.posting.description, "hand written");
    }

    #[tokio::test(start_paused = true)]
    async fn closing_the_scope_discards_in_flight_result() {
        let generator = FakeGenerator {
            delay: Duration::from_secs(10),
            ..FakeGenerator::default()
        };
        let scope = DraftScope::new();
        let mut draft = JobDraft::new("Lifeguard");

        let (result, ()) = tokio::join!(
            fill_cover_image(&generator, &scope, &mut draft, None),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                scope.close();
            }
        );

        assert!(matches!(result, Err(ContentError::Cancelled)));
        assert!(draft.cover_image().is_none());
        assert!(!scope.is_active());
    }

    #[tokio::test]
    async fn closed_scope_refuses_new_work() {
        let generator = FakeGenerator::default();
        let scope = DraftScope::new();
        scope.close();
        let mut draft = JobDraft::new("Lifeguard");
        let result = fill_description(&generator, &scope, &mut draft).await;
        assert!(matches!(result, Err(ContentError::Cancelled)));
        assert!(draft.posting.description.is_empty());
    }

    #[tokio::test]
    async fn cover_prompt_falls_back_to_title() {
        let generator = FakeGenerator::default();
        let mut draft = JobDraft::new("Resort Lifeguard");
        let image = fill_cover_image(&generator, &DraftScope::new(), &mut draft, Some("  "))
            .await
            .expect("image generated");
        assert_eq!(draft.cover_image(), Some(image.as_str()));
        assert_eq!(
            *generator.seen_prompts.lock().expect("prompts mutex poisoned"),
            vec!["Resort Lifeguard".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn video_is_polled_until_done() {
        let generator = FakeGenerator {
            polls_until_done: 3,
            ..FakeGenerator::default()
        };
        let started = tokio::time::Instant::now();
        let asset = generate_promo_video(
            &generator,
            &DraftScope::new(),
            &VideoRequest::promo(),
            Duration::from_secs(3),
        )
        .await
        .expect("video generated");

        assert_eq!(asset.bytes, b"mem://video".to_vec());
        assert_eq!(generator.polls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn video_polling_stops_when_scope_closes() {
        let generator = FakeGenerator {
            polls_until_done: 100,
            ..FakeGenerator::default()
        };
        let scope = DraftScope::new();
        let request = VideoRequest::promo();

        let (result, ()) = tokio::join!(
            generate_promo_video(&generator, &scope, &request, Duration::from_secs(3)),
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                scope.close();
            }
        );

        assert!(matches!(result, Err(ContentError::Cancelled)));
        assert!(generator.polls.load(Ordering::SeqCst) < 100);
    }
}
