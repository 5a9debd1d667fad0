use crate::core::error::StudioError;
use crate::image::types::{ImagePayload, ImageRequest};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

pub mod base_client;
pub mod gemini;
pub mod sse;

#[cfg(test)]
pub mod scripted;

/// System instruction every chat session starts with.
pub const CHAT_SYSTEM_INSTRUCTION: &str = "You are a helpful and creative assistant. \
Provide clear, concise, and informative answers.";

/// Forward-only sequence of reply fragments for one chat turn.
///
/// Ends when the provider signals completion. Errors surfacing mid-stream are
/// yielded as items; consumers decide how to recover.
pub type FragmentStream = BoxStream<'static, Result<String, StudioError>>;

/// A stateful multi-turn exchange with the provider.
#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Send `text` as the next user turn and stream the reply.
    ///
    /// Fails only when the call cannot be initiated.
    async fn send_message_stream(&self, text: &str) -> Result<FragmentStream, StudioError>;
}

/// Provider façade shared by the chat and image orchestrators.
#[async_trait]
pub trait GenerativeGateway: Send + Sync {
    fn open_chat_session(&self) -> Arc<dyn ChatSession>;

    /// Generate one batch of images. An empty vector means the provider
    /// produced nothing and is not an error.
    async fn generate_images(
        &self,
        request: &ImageRequest,
    ) -> Result<Vec<ImagePayload>, StudioError>;
}
