use std::path::PathBuf;

use clap::Subcommand;
use swt_placement::config::ContentConfig;
use swt_placement::content::{
    fill_cover_image, fill_description, generate_promo_video, ContentGenerator, DraftScope,
    GeminiClient, ImageRef, JobDraft, VideoRequest,
};
use swt_placement::error::AppError;
use tracing::info;

#[derive(Subcommand, Debug)]
pub(crate) enum GenerateCommand {
    /// Draft a job description from a title and free-text requirements
    Description {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        requirements: String,
    },
    /// Generate a 4:3 cover image for a job posting
    Cover {
        /// Image prompt. Falls back to the job title.
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long, default_value = "")]
        title: String,
    },
    /// Generate the promotional video and save it locally
    Video {
        #[arg(long, default_value = "promo.mp4")]
        output: PathBuf,
    },
}

pub(crate) async fn run_generate(
    command: GenerateCommand,
    config: &ContentConfig,
) -> Result<(), AppError> {
    let client = GeminiClient::new(config.require_api_key()?)?;
    let scope = DraftScope::new();

    // Ctrl-C stands in for the view closing: in-flight generations are abandoned.
    let interrupt = tokio::spawn({
        let scope = scope.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                scope.close();
            }
        }
    });

    let result = execute(&client, &scope, command, config).await;
    interrupt.abort();
    result
}

async fn execute(
    generator: &dyn ContentGenerator,
    scope: &DraftScope,
    command: GenerateCommand,
    config: &ContentConfig,
) -> Result<(), AppError> {
    match command {
        GenerateCommand::Description {
            title,
            requirements,
        } => {
            let mut draft = JobDraft::new(title);
            draft.requirements = requirements;
            fill_description(generator, scope, &mut draft).await?;
            println!("{}", draft.posting.description);
        }
        GenerateCommand::Cover { prompt, title } => {
            let mut draft = JobDraft::new(title);
            let image = fill_cover_image(generator, scope, &mut draft, prompt.as_deref()).await?;
            println!("{}", describe_image(&image));
        }
        GenerateCommand::Video { output } => {
            let asset = generate_promo_video(
                generator,
                scope,
                &VideoRequest::promo(),
                config.poll_interval,
            )
            .await?;
            tokio::fs::write(&output, &asset.bytes).await?;
            info!(path = %output.display(), mime = %asset.mime_type, "promo video saved");
            println!(
                "saved {} bytes ({}) to {}",
                asset.bytes.len(),
                asset.mime_type,
                output.display()
            );
        }
    }
    Ok(())
}

/// Inline images are too long to print; show their type and size instead.
fn describe_image(image: &ImageRef) -> String {
    if !image.is_inline() {
        return image.to_string();
    }
    let header = image
        .as_str()
        .split_once(',')
        .map(|(header, _)| header)
        .unwrap_or("data:");
    format!("{header},... ({} characters)", image.as_str().len())
}
