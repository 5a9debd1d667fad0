use crate::chat::message::{MessageId, Transcript};
use crate::chat::{ChatEvent, ChatOrchestrator};
use crate::cli::{Command, ViewKind};
use crate::commands::{StudioState, View, dispatcher::CommandDispatcher};
use crate::config::Settings;
use crate::core::error::{CHAT_FAILURE_MESSAGE, IMAGE_FAILURE_MESSAGE, StudioError};
use crate::display;
use crate::image::types::{AspectRatio, ImageCount};
use crate::image::{GenerationOutcome, ImageStudio, save_all};
use crate::input;
use crate::providers::GenerativeGateway;
use is_terminal::IsTerminal;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub struct Application {
    pub settings: Arc<Settings>,
    pub gateway: Arc<dyn GenerativeGateway>,
    pub command_dispatcher: CommandDispatcher,
}

impl Application {
    pub fn new(
        settings: Arc<Settings>,
        gateway: Arc<dyn GenerativeGateway>,
        command_dispatcher: CommandDispatcher,
    ) -> Self {
        Self {
            settings,
            gateway,
            command_dispatcher,
        }
    }

    pub async fn run(&self, command: Option<Command>) -> Result<(), StudioError> {
        match command.unwrap_or(Command::Repl {
            view: ViewKind::Chat,
        }) {
            Command::Repl { view } => self.handle_repl(view).await,
            Command::Chat { message } => {
                let context = read_piped_stdin()?;
                self.handle_one_shot_chat(message.join(" "), context).await
            }
            Command::Image {
                prompt,
                count,
                aspect_ratio,
                output,
            } => {
                self.handle_one_shot_image(prompt.join(" "), count, aspect_ratio, output)
                    .await
            }
        }
    }

    async fn handle_repl(&self, view: ViewKind) -> Result<(), StudioError> {
        info!(chat_model = %self.settings.chat_model, image_model = %self.settings.image_model, "Starting studio");
        let mut state = StudioState::new(Arc::clone(&self.gateway), Arc::clone(&self.settings), view);
        announce(&state);

        let mut editor = input::create_editor(self.command_dispatcher.clone())?;
        let mut mounts = state.mounts();

        loop {
            let Some(line) = input::read_input(&mut editor, state.kind())? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(result) = self.command_dispatcher.execute_line(line, &mut state) {
                match result {
                    Ok(Some(output)) => display::display_info(&output),
                    Ok(None) => {}
                    Err(e) => display::display_error(&e.to_string()),
                }
                if !state.should_continue {
                    break;
                }
                if state.mounts() != mounts {
                    mounts = state.mounts();
                    announce(&state);
                }
                continue;
            }

            match &mut state.view {
                View::Chat(chat) => {
                    stream_reply(chat, line).await;
                }
                View::Image(studio) => {
                    studio.set_prompt(line);
                    match generate(studio).await {
                        Some(GenerationOutcome::Images(n)) if n > 0 => {
                            display::display_info("Use /save [dir] to write them to disk.")
                        }
                        Some(GenerationOutcome::Failed) => display::display_error(
                            studio.last_error().unwrap_or(IMAGE_FAILURE_MESSAGE),
                        ),
                        _ => {}
                    }
                }
            }
        }

        input::save_history(&mut editor)?;
        Ok(())
    }

    async fn handle_one_shot_chat(
        &self,
        message: String,
        context: Option<String>,
    ) -> Result<(), StudioError> {
        let query = compose_query(&message, context.as_deref());

        let mut chat = ChatOrchestrator::new(Arc::clone(&self.gateway));
        chat.initialize();
        if !chat.send(&query) {
            return Err(StudioError::Input("No message provided".to_string()));
        }

        let render_markdown = io::stdout().is_terminal();
        let outcome = chat
            .finish(|event, transcript| {
                if let ChatEvent::Fragment { text, .. } = event {
                    display::display_fragment(text);
                } else if let ChatEvent::Completed { reply } = event {
                    let text = reply_text(transcript, *reply);
                    if render_markdown && display::looks_like_markdown(text) {
                        display::replace_with_markdown(text);
                    } else {
                        display::end_reply(text, false);
                    }
                }
            })
            .await;

        match outcome {
            Some(ChatEvent::Failed { .. }) => {
                Err(StudioError::Transport(CHAT_FAILURE_MESSAGE.to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn handle_one_shot_image(
        &self,
        prompt: String,
        count: Option<ImageCount>,
        aspect_ratio: Option<AspectRatio>,
        output: Option<PathBuf>,
    ) -> Result<(), StudioError> {
        let mut studio = ImageStudio::new(Arc::clone(&self.gateway)).with_defaults(
            count.unwrap_or(self.settings.number_of_images),
            aspect_ratio.unwrap_or(self.settings.aspect_ratio),
        );
        studio.set_prompt(prompt);

        match generate(&mut studio).await {
            Some(GenerationOutcome::Images(_)) => {
                let dir = output.unwrap_or_else(|| self.settings.output_dir.clone());
                let paths = save_all(studio.results(), &dir)?;
                display::display_saved(&paths);
                Ok(())
            }
            Some(GenerationOutcome::Failed) => Err(StudioError::Transport(
                studio
                    .last_error()
                    .unwrap_or(IMAGE_FAILURE_MESSAGE)
                    .to_string(),
            )),
            None => Err(StudioError::Input("Prompt must not be empty".to_string())),
        }
    }
}

/// Piped input, if any, used as context for a one-shot chat.
fn read_piped_stdin() -> Result<Option<String>, StudioError> {
    if io::stdin().is_terminal() {
        return Ok(None);
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| StudioError::Input(format!("Failed to read from stdin: {}", e)))?;
    Ok(Some(buffer))
}

/// Context goes first, separated from the message by a blank line.
fn compose_query(message: &str, context: Option<&str>) -> String {
    match (message.trim(), context.map(str::trim)) {
        ("", Some(ctx)) if !ctx.is_empty() => ctx.to_string(),
        (msg, Some(ctx)) if !ctx.is_empty() => format!("{}\n\n{}", ctx, msg),
        (msg, _) => msg.to_string(),
    }
}

fn announce(state: &StudioState) {
    match &state.view {
        View::Chat(chat) => {
            display::display_view_banner(
                "Chat",
                "Type a message to talk to Gemini. /image opens the image studio, /help lists commands.",
            );
            for message in chat.transcript() {
                display::display_message(message);
            }
        }
        View::Image(studio) => {
            display::display_view_banner(
                "Image",
                "Describe the image you want. /ratio and /count adjust the output, /chat goes back.",
            );
            display::display_info(&format!(
                "Images: {}  Aspect ratio: {}",
                studio.number_of_images(),
                studio.aspect_ratio()
            ));
        }
    }
}

fn reply_text(transcript: &Transcript, reply: MessageId) -> &str {
    transcript.get(reply).map(|m| m.text()).unwrap_or_default()
}

/// Send `line` and print the reply as it streams in.
async fn stream_reply(chat: &mut ChatOrchestrator, line: &str) {
    if !chat.send(line) {
        return;
    }

    display::begin_reply();
    chat.finish(|event, transcript| match event {
        ChatEvent::Opened { .. } => display::reply_opened(),
        ChatEvent::Fragment { text, .. } => display::display_fragment(text),
        ChatEvent::Completed { reply } => display::end_reply(reply_text(transcript, *reply), false),
        ChatEvent::Failed { reply } => display::end_reply(reply_text(transcript, *reply), true),
    })
    .await;
}

/// Issue a generation for the studio's current parameters and list the
/// results. `None` when nothing was issued; failures are left to the caller.
async fn generate(studio: &mut ImageStudio) -> Option<GenerationOutcome> {
    if !studio.generate() {
        return None;
    }
    display::display_generating(studio.number_of_images().get(), studio.aspect_ratio().as_str());

    let outcome = studio.settle().await;
    if let Some(GenerationOutcome::Images(_)) = outcome {
        display::display_image_results(studio.results());
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::create_command_registry;
    use crate::config::ApiKey;
    use crate::image::types::ImagePayload;
    use crate::providers::scripted::{ScriptedGateway, Turn};

    fn app(gateway: &ScriptedGateway) -> Application {
        let settings = Settings::with_api_key(ApiKey::new("k"));
        Application::new(
            Arc::new(settings),
            Arc::new(gateway.clone()),
            create_command_registry(),
        )
    }

    #[test]
    fn query_puts_context_before_the_message() {
        assert_eq!(compose_query("why?", Some("log line\n")), "log line\n\nwhy?");
        assert_eq!(compose_query("  ", Some("only context")), "only context");
        assert_eq!(compose_query("just asking", Some("  \n")), "just asking");
        assert_eq!(compose_query("just asking", None), "just asking");
    }

    #[tokio::test]
    async fn one_shot_chat_sends_piped_context_with_the_message() {
        let gateway = ScriptedGateway::new().with_turn(Turn::fragments(&["It failed."]));
        let app = app(&gateway);

        app.handle_one_shot_chat("what happened?".to_string(), Some("error: disk full\n".to_string()))
            .await
            .unwrap();

        assert_eq!(gateway.sent_messages(), vec!["error: disk full\n\nwhat happened?"]);
    }

    #[tokio::test]
    async fn one_shot_chat_failure_is_a_transport_error() {
        let gateway = ScriptedGateway::new().with_turn(Turn::fail_after(&["par"]));
        let err = app(&gateway)
            .handle_one_shot_chat("hi".to_string(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, StudioError::Transport(m) if m == CHAT_FAILURE_MESSAGE));
    }

    #[tokio::test]
    async fn one_shot_chat_without_input_is_rejected() {
        let gateway = ScriptedGateway::new();
        let err = app(&gateway)
            .handle_one_shot_chat("   ".to_string(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, StudioError::Input(_)));
        assert!(gateway.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn one_shot_image_saves_the_batch() {
        let gateway = ScriptedGateway::new().with_images(vec![ImagePayload::new("image/jpeg", vec![7])]);
        let dir = tempfile::tempdir().unwrap();

        app(&gateway)
            .handle_one_shot_image(
                "a lighthouse".to_string(),
                None,
                Some(AspectRatio::Wide),
                Some(dir.path().to_path_buf()),
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read(dir.path().join("gemini-image-1.jpeg")).unwrap(), vec![7]);
        assert_eq!(gateway.image_requests()[0].aspect_ratio, AspectRatio::Wide);
    }

    #[tokio::test]
    async fn one_shot_image_failure_is_a_transport_error() {
        let gateway = ScriptedGateway::new().with_image_failure();
        let dir = tempfile::tempdir().unwrap();

        let err = app(&gateway)
            .handle_one_shot_image("a lighthouse".to_string(), None, None, Some(dir.path().to_path_buf()))
            .await
            .unwrap_err();

        assert!(matches!(err, StudioError::Transport(m) if m == IMAGE_FAILURE_MESSAGE));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn one_shot_empty_batch_saves_nothing() {
        let gateway = ScriptedGateway::new();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out");

        app(&gateway)
            .handle_one_shot_image("a lighthouse".to_string(), None, None, Some(output.clone()))
            .await
            .unwrap();

        assert_eq!(gateway.image_requests().len(), 1);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn one_shot_image_needs_a_prompt() {
        let gateway = ScriptedGateway::new();
        let err = app(&gateway)
            .handle_one_shot_image(" ".to_string(), None, None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, StudioError::Input(_)));
        assert!(gateway.image_requests().is_empty());
    }
}
