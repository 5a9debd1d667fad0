use crate::config::Settings;
use crate::core::error::{IMAGE_FAILURE_MESSAGE, StudioError};
use crate::image::types::{ImagePayload, ImageRequest};
use crate::providers::{CHAT_SYSTEM_INSTRUCTION, ChatSession, FragmentStream, GenerativeGateway};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info};

mod client;
mod types;

pub use client::GeminiClient;
use types::GeminiContent;

/// Gateway backed by the Gemini (text) and Imagen (image) REST endpoints.
#[derive(Clone)]
pub struct GeminiGateway {
    client: GeminiClient,
}

impl GeminiGateway {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: GeminiClient::new(
                settings.base_url.clone(),
                settings.api_key.expose().to_string(),
                settings.chat_model.clone(),
                settings.image_model.clone(),
            ),
        }
    }
}

#[async_trait]
impl GenerativeGateway for GeminiGateway {
    fn open_chat_session(&self) -> Arc<dyn ChatSession> {
        info!(model = %self.client.chat_model, "Opening chat session");
        Arc::new(GeminiChatSession {
            client: self.client.clone(),
            system_instruction: CHAT_SYSTEM_INSTRUCTION.to_string(),
            history: Arc::new(Mutex::new(Vec::new())),
        })
    }

    async fn generate_images(
        &self,
        request: &ImageRequest,
    ) -> Result<Vec<ImagePayload>, StudioError> {
        self.client.predict_images(request).await.map_err(|e| {
            error!(error = %e, "Error generating images");
            StudioError::Transport(IMAGE_FAILURE_MESSAGE.to_string())
        })
    }
}

/// Client-side conversation state for one chat.
///
/// The REST endpoint is stateless, so every turn resends the history. A turn
/// is recorded only once its reply stream has been fully consumed without
/// error.
pub struct GeminiChatSession {
    client: GeminiClient,
    system_instruction: String,
    history: Arc<Mutex<Vec<GeminiContent>>>,
}

impl GeminiChatSession {
    #[cfg(test)]
    fn turns(&self) -> usize {
        self.history.lock().len()
    }
}

#[async_trait]
impl ChatSession for GeminiChatSession {
    async fn send_message_stream(&self, text: &str) -> Result<FragmentStream, StudioError> {
        let user_turn = GeminiContent::user(text);
        let mut contents = self.history.lock().clone();
        contents.push(user_turn.clone());

        let mut inner = self
            .client
            .stream_generate_content(contents, &self.system_instruction)
            .await?;

        let history = Arc::clone(&self.history);
        let recorded = async_stream::try_stream! {
            let mut reply = String::new();
            while let Some(fragment) = inner.next().await {
                let fragment = fragment?;
                reply.push_str(&fragment);
                yield fragment;
            }
            // The API rejects empty text parts, so an empty reply leaves no turn.
            if reply.is_empty() {
                debug!("Empty reply, turn not recorded");
            } else {
                let mut history = history.lock();
                history.push(user_turn);
                history.push(GeminiContent::model(reply));
            }
        };

        Ok(recorded.boxed())
    }
}
