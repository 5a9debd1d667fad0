//! Chat orchestration: owns the transcript and drives one streamed exchange
//! at a time.
//!
//! `send` only mutates state and parks the exchange; the caller then drives
//! it with [`ChatOrchestrator::pump`] (one suspension point per call) and can
//! render the transcript between pumps. Dropping the orchestrator drops any
//! in-flight exchange.

pub mod message;

use crate::core::error::{CHAT_FAILURE_MESSAGE, StudioError};
use crate::providers::{ChatSession, FragmentStream, GenerativeGateway};
use futures::FutureExt;
use futures::StreamExt;
use futures::future::BoxFuture;
use message::{Message, MessageId, Transcript};
use std::sync::Arc;
use tracing::{debug, error, info};

pub const GREETING: &str = "Hello! I'm Gemini. How can I assist you today?";

/// Progress of the in-flight exchange, reported by [`ChatOrchestrator::pump`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// The provider accepted the turn; fragments follow.
    Opened { reply: MessageId },
    /// A fragment was appended to the reply.
    Fragment { reply: MessageId, text: String },
    /// The reply stream ended normally.
    Completed { reply: MessageId },
    /// The exchange failed; the reply now holds the failure text.
    Failed { reply: MessageId },
}

impl ChatEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::Completed { .. } | ChatEvent::Failed { .. })
    }
}

enum Exchange {
    Opening(BoxFuture<'static, Result<FragmentStream, StudioError>>),
    Streaming(FragmentStream),
}

struct InFlight {
    reply: MessageId,
    exchange: Exchange,
}

enum Step {
    Opened,
    Fragment(String),
    Completed,
    Failed(StudioError),
}

pub struct ChatOrchestrator {
    gateway: Arc<dyn GenerativeGateway>,
    session: Option<Arc<dyn ChatSession>>,
    transcript: Transcript,
    in_flight: Option<InFlight>,
}

impl ChatOrchestrator {
    pub fn new(gateway: Arc<dyn GenerativeGateway>) -> Self {
        Self {
            gateway,
            session: None,
            transcript: Transcript::new(),
            in_flight: None,
        }
    }

    /// Open the provider session and seed the transcript with the greeting.
    /// Later calls are ignored.
    pub fn initialize(&mut self) {
        if self.session.is_some() {
            return;
        }
        self.session = Some(self.gateway.open_chat_session());
        self.transcript.push(Message::ai(GREETING));
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Id of the AI message currently being filled, if any.
    #[cfg(test)]
    fn pending_reply(&self) -> Option<MessageId> {
        self.in_flight.as_ref().map(|f| f.reply)
    }

    /// Start an exchange for `text`.
    ///
    /// Returns false without touching any state when the text is blank, an
    /// exchange is already pending, or no session is open.
    pub fn send(&mut self, text: &str) -> bool {
        if text.trim().is_empty() || self.is_pending() {
            return false;
        }
        let Some(session) = self.session.clone() else {
            return false;
        };

        self.transcript.push(Message::user(text));
        let reply = self.transcript.push(Message::ai(""));
        debug!(%reply, "Exchange started");

        let text = text.to_string();
        let opening = async move { session.send_message_stream(&text).await }.boxed();
        self.in_flight = Some(InFlight {
            reply,
            exchange: Exchange::Opening(opening),
        });
        true
    }

    /// Advance the in-flight exchange by one step.
    ///
    /// Returns `None` when nothing is pending. After a terminal event the
    /// orchestrator is idle again.
    pub async fn pump(&mut self) -> Option<ChatEvent> {
        let in_flight = self.in_flight.as_mut()?;
        let reply = in_flight.reply;

        let step = match &mut in_flight.exchange {
            Exchange::Opening(opening) => match opening.await {
                Ok(stream) => {
                    in_flight.exchange = Exchange::Streaming(stream);
                    Step::Opened
                }
                Err(e) => Step::Failed(e),
            },
            Exchange::Streaming(stream) => match stream.next().await {
                Some(Ok(fragment)) => Step::Fragment(fragment),
                Some(Err(e)) => Step::Failed(e),
                None => Step::Completed,
            },
        };

        let event = match step {
            Step::Opened => ChatEvent::Opened { reply },
            Step::Fragment(text) => {
                self.transcript.append_text(reply, &text);
                ChatEvent::Fragment { reply, text }
            }
            Step::Completed => {
                self.in_flight = None;
                info!(%reply, "Reply complete");
                ChatEvent::Completed { reply }
            }
            Step::Failed(e) => {
                self.in_flight = None;
                error!(%reply, error = %e, "Error sending message");
                self.transcript.replace_text(reply, CHAT_FAILURE_MESSAGE);
                ChatEvent::Failed { reply }
            }
        };
        Some(event)
    }

    /// Drive the in-flight exchange to its end, reporting every event.
    pub async fn finish<F>(&mut self, mut observer: F) -> Option<ChatEvent>
    where
        F: FnMut(&ChatEvent, &Transcript),
    {
        while let Some(event) = self.pump().await {
            observer(&event, &self.transcript);
            if event.is_terminal() {
                return Some(event);
            }
        }
        None
    }
}
