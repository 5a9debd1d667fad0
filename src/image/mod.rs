pub mod types;

use crate::core::error::StudioError;
use crate::providers::GenerativeGateway;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use types::{AspectRatio, ImageCount, ImagePayload, ImageRequest};

/// How a generation ended, reported by [`ImageStudio::settle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The batch arrived; holds the number of images (possibly zero).
    Images(usize),
    Failed,
}

/// Image generation state: adjustable parameters, the latest result set and
/// at most one outstanding request.
pub struct ImageStudio {
    gateway: Arc<dyn GenerativeGateway>,
    prompt: String,
    number_of_images: ImageCount,
    aspect_ratio: AspectRatio,
    results: Vec<ImagePayload>,
    last_error: Option<String>,
    in_flight: Option<BoxFuture<'static, Result<Vec<ImagePayload>, StudioError>>>,
}

impl ImageStudio {
    pub fn new(gateway: Arc<dyn GenerativeGateway>) -> Self {
        Self {
            gateway,
            prompt: String::new(),
            number_of_images: ImageCount::default(),
            aspect_ratio: AspectRatio::default(),
            results: Vec::new(),
            last_error: None,
            in_flight: None,
        }
    }

    pub fn with_defaults(mut self, number_of_images: ImageCount, aspect_ratio: AspectRatio) -> Self {
        self.number_of_images = number_of_images;
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn number_of_images(&self) -> ImageCount {
        self.number_of_images
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn results(&self) -> &[ImagePayload] {
        &self.results
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    // Parameter changes never touch a request already issued.

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn set_number_of_images(&mut self, count: u8) -> Result<(), StudioError> {
        self.number_of_images = ImageCount::new(count)?;
        Ok(())
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Issue a generation with the current parameters.
    ///
    /// Returns false without touching any state when the prompt is blank or a
    /// generation is already pending. Otherwise the previous results and
    /// error are cleared at once.
    pub fn generate(&mut self) -> bool {
        if self.prompt.trim().is_empty() || self.is_pending() {
            return false;
        }

        self.last_error = None;
        self.results.clear();

        let request = ImageRequest {
            prompt: self.prompt.clone(),
            number_of_images: self.number_of_images,
            aspect_ratio: self.aspect_ratio,
        };
        info!(
            count = request.number_of_images.get(),
            aspect_ratio = %request.aspect_ratio,
            "Generating images"
        );

        let gateway = Arc::clone(&self.gateway);
        self.in_flight = Some(async move { gateway.generate_images(&request).await }.boxed());
        true
    }

    /// Wait for the outstanding generation and fold its result into state.
    /// Returns `None` when nothing is pending.
    pub async fn settle(&mut self) -> Option<GenerationOutcome> {
        let request = self.in_flight.as_mut()?;
        let result = request.await;
        self.in_flight = None;

        let outcome = match result {
            Ok(images) => {
                let count = images.len();
                self.results = images;
                GenerationOutcome::Images(count)
            }
            Err(e) => {
                error!(error = %e, "Image generation failed");
                self.results.clear();
                self.last_error = Some(e.user_message());
                GenerationOutcome::Failed
            }
        };
        Some(outcome)
    }
}

/// Write a result set to `dir` under its download names, in order.
pub fn save_all(images: &[ImagePayload], dir: &Path) -> Result<Vec<PathBuf>, StudioError> {
    let paths = images
        .iter()
        .enumerate()
        .map(|(index, image)| image.save_to(dir, index))
        .collect::<Result<Vec<_>, _>>()?;
    info!(count = paths.len(), dir = %dir.display(), "Saved images");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::IMAGE_FAILURE_MESSAGE;
    use crate::providers::scripted::ScriptedGateway;

    fn image(byte: u8) -> ImagePayload {
        ImagePayload::new("image/jpeg", vec![byte])
    }

    fn studio(gateway: &ScriptedGateway) -> ImageStudio {
        ImageStudio::new(Arc::new(gateway.clone()))
    }

    #[tokio::test]
    async fn scenario_red_cube() {
        let gateway = ScriptedGateway::new().with_images(vec![image(1), image(2)]);
        let mut studio = studio(&gateway);
        studio.set_prompt("a red cube");
        studio.set_number_of_images(2).unwrap();
        studio.set_aspect_ratio(AspectRatio::Square);

        assert!(studio.generate());
        assert!(studio.is_pending());
        assert_eq!(studio.settle().await, Some(GenerationOutcome::Images(2)));

        assert_eq!(studio.results(), &[image(1), image(2)]);
        assert!(studio.last_error().is_none());
        assert!(!studio.is_pending());

        let requests = gateway.image_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "a red cube");
        assert_eq!(requests[0].number_of_images.get(), 2);
        assert_eq!(requests[0].aspect_ratio.as_str(), "1:1");
    }

    #[tokio::test]
    async fn failure_sets_error_and_clears_pending() {
        let gateway = ScriptedGateway::new().with_image_failure();
        let mut studio = studio(&gateway);
        studio.set_prompt("a red cube");

        studio.generate();
        assert_eq!(studio.settle().await, Some(GenerationOutcome::Failed));

        assert!(studio.results().is_empty());
        assert_eq!(studio.last_error(), Some(IMAGE_FAILURE_MESSAGE));
        assert!(!studio.is_pending());
    }

    #[tokio::test]
    async fn empty_batch_is_not_an_error() {
        let gateway = ScriptedGateway::new().with_images(Vec::new());
        let mut studio = studio(&gateway);
        studio.set_prompt("nothing");

        studio.generate();
        assert_eq!(studio.settle().await, Some(GenerationOutcome::Images(0)));
        assert!(studio.results().is_empty());
        assert!(studio.last_error().is_none());
    }

    #[test]
    fn blank_prompt_changes_nothing() {
        let gateway = ScriptedGateway::new();
        let mut studio = studio(&gateway);

        studio.set_prompt("   ");
        assert!(!studio.generate());
        assert!(!studio.is_pending());
        assert!(studio.last_error().is_none());
        assert!(gateway.image_requests().is_empty());
    }

    #[tokio::test]
    async fn regenerating_clears_previous_results_immediately() {
        let gateway = ScriptedGateway::new()
            .with_images(vec![image(1), image(2)])
            .with_images(vec![image(3)]);
        let mut studio = studio(&gateway);
        studio.set_prompt("first");
        studio.generate();
        studio.settle().await;
        assert_eq!(studio.results().len(), 2);

        assert!(studio.generate());
        assert!(studio.results().is_empty());

        studio.settle().await;
        assert_eq!(studio.results(), &[image(3)]);
    }

    #[tokio::test]
    async fn regenerating_clears_previous_error() {
        let gateway = ScriptedGateway::new()
            .with_image_failure()
            .with_images(vec![image(7)]);
        let mut studio = studio(&gateway);
        studio.set_prompt("cube");
        studio.generate();
        studio.settle().await;
        assert!(studio.last_error().is_some());

        assert!(studio.generate());
        assert!(studio.last_error().is_none());
        assert_eq!(studio.settle().await, Some(GenerationOutcome::Images(1)));
    }

    #[tokio::test]
    async fn generate_while_pending_is_rejected() {
        let gateway = ScriptedGateway::new().with_images(vec![image(1)]);
        let mut studio = studio(&gateway);
        studio.set_prompt("cube");

        assert!(studio.generate());
        assert!(!studio.generate());
        studio.settle().await;

        assert_eq!(gateway.image_requests().len(), 1);
    }

    #[tokio::test]
    async fn parameter_changes_apply_to_the_next_request_only() {
        let gateway = ScriptedGateway::new()
            .with_images(vec![image(1)])
            .with_images(vec![image(2), image(3)]);
        let mut studio = studio(&gateway);
        studio.set_prompt("before");
        studio.generate();

        studio.set_prompt("after");
        studio.set_number_of_images(2).unwrap();
        studio.set_aspect_ratio(AspectRatio::Wide);
        studio.settle().await;
        studio.generate();
        studio.settle().await;

        let requests = gateway.image_requests();
        assert_eq!(requests[0].prompt, "before");
        assert_eq!(requests[0].number_of_images.get(), 1);
        assert_eq!(requests[0].aspect_ratio, AspectRatio::Square);
        assert_eq!(requests[1].prompt, "after");
        assert_eq!(requests[1].number_of_images.get(), 2);
        assert_eq!(requests[1].aspect_ratio, AspectRatio::Wide);
    }

    #[test]
    fn out_of_range_count_is_rejected_and_kept() {
        let mut studio = studio(&ScriptedGateway::new());
        assert!(studio.set_number_of_images(5).is_err());
        assert!(studio.set_number_of_images(0).is_err());
        assert_eq!(studio.number_of_images().get(), 1);
    }

    #[test]
    fn save_all_uses_one_based_download_names() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![image(1), ImagePayload::new("image/png", vec![2, 2])];

        let paths = save_all(&images, dir.path()).unwrap();
        assert_eq!(paths[0], dir.path().join("gemini-image-1.jpeg"));
        assert_eq!(paths[1], dir.path().join("gemini-image-2.png"));
        assert_eq!(std::fs::read(&paths[1]).unwrap(), vec![2, 2]);
    }

    #[tokio::test]
    async fn settle_when_idle_returns_none() {
        let mut studio = studio(&ScriptedGateway::new());
        assert!(studio.settle().await.is_none());
    }
}
