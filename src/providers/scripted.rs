//! In-memory gateway for orchestrator tests. Replies are scripted up front
//! and consumed in order; every request is recorded.

use crate::core::error::{IMAGE_FAILURE_MESSAGE, StudioError};
use crate::image::types::{ImagePayload, ImageRequest};
use crate::providers::{ChatSession, FragmentStream, GenerativeGateway};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

pub enum Turn {
    Fragments(Vec<String>),
    FailToOpen,
    FailAfter(Vec<String>),
}

impl Turn {
    pub fn fragments(parts: &[&str]) -> Self {
        Turn::Fragments(parts.iter().map(|p| p.to_string()).collect())
    }

    pub fn fail_to_open() -> Self {
        Turn::FailToOpen
    }

    pub fn fail_after(parts: &[&str]) -> Self {
        Turn::FailAfter(parts.iter().map(|p| p.to_string()).collect())
    }
}

#[derive(Default)]
struct Script {
    turns: VecDeque<Turn>,
    batches: VecDeque<Result<Vec<ImagePayload>, StudioError>>,
    sent: Vec<String>,
    requests: Vec<ImageRequest>,
    sessions: usize,
}

#[derive(Clone, Default)]
pub struct ScriptedGateway {
    script: Arc<Mutex<Script>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_turn(self, turn: Turn) -> Self {
        self.script.lock().turns.push_back(turn);
        self
    }

    pub fn with_images(self, images: Vec<ImagePayload>) -> Self {
        self.script.lock().batches.push_back(Ok(images));
        self
    }

    pub fn with_image_failure(self) -> Self {
        self.script
            .lock()
            .batches
            .push_back(Err(StudioError::Transport(IMAGE_FAILURE_MESSAGE.to_string())));
        self
    }

    pub fn sent_messages(&self) -> Vec<String> {
        self.script.lock().sent.clone()
    }

    pub fn image_requests(&self) -> Vec<ImageRequest> {
        self.script.lock().requests.clone()
    }

    pub fn sessions_opened(&self) -> usize {
        self.script.lock().sessions
    }
}

struct ScriptedSession {
    script: Arc<Mutex<Script>>,
}

#[async_trait]
impl ChatSession for ScriptedSession {
    async fn send_message_stream(&self, text: &str) -> Result<FragmentStream, StudioError> {
        let turn = {
            let mut script = self.script.lock();
            script.sent.push(text.to_string());
            script.turns.pop_front()
        };

        match turn {
            Some(Turn::Fragments(parts)) => {
                Ok(futures::stream::iter(parts.into_iter().map(Ok)).boxed())
            }
            Some(Turn::FailAfter(parts)) => {
                let items = parts
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(StudioError::Network(
                        "connection reset".to_string(),
                    ))));
                Ok(futures::stream::iter(items).boxed())
            }
            Some(Turn::FailToOpen) => Err(StudioError::Api("503 Service Unavailable".to_string())),
            None => Err(StudioError::Api("no scripted turn left".to_string())),
        }
    }
}

#[async_trait]
impl GenerativeGateway for ScriptedGateway {
    fn open_chat_session(&self) -> Arc<dyn ChatSession> {
        self.script.lock().sessions += 1;
        Arc::new(ScriptedSession {
            script: Arc::clone(&self.script),
        })
    }

    async fn generate_images(
        &self,
        request: &ImageRequest,
    ) -> Result<Vec<ImagePayload>, StudioError> {
        let mut script = self.script.lock();
        script.requests.push(request.clone());
        script.batches.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}
