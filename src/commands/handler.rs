use super::StudioState;
use crate::cli::ViewKind;
use crate::core::error::StudioError;
use crate::image::ImageStudio;
use crate::image::save_all;
use crate::image::types::{ASPECT_RATIOS, AspectRatio};
use console::style;
use std::path::PathBuf;

pub trait CommandHandler {
    fn execute(&self, state: &mut StudioState, args: &[&str]) -> Result<Option<String>, StudioError>;
    fn help(&self) -> &'static str;
}

pub struct QuitCommand;
pub struct HelpCommand;
pub struct ChatViewCommand;
pub struct ImageViewCommand;
pub struct RatioCommand;
pub struct CountCommand;
pub struct PromptCommand;
pub struct SaveImagesCommand;

fn image_view(state: &mut StudioState) -> Result<&mut ImageStudio, StudioError> {
    state
        .image_studio()
        .ok_or_else(|| StudioError::Input("Switch to the image view first (/image)".to_string()))
}

impl CommandHandler for QuitCommand {
    fn execute(&self, state: &mut StudioState, _args: &[&str]) -> Result<Option<String>, StudioError> {
        state.should_continue = false;
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/quit - Exit the studio"
    }
}

impl CommandHandler for HelpCommand {
    fn execute(
        &self,
        _state: &mut StudioState,
        _args: &[&str],
    ) -> Result<Option<String>, StudioError> {
        let title = style("Available Commands").bold().underlined();
        let help_text = vec![
            title.to_string(),
            style(ChatViewCommand.help()).to_string(),
            style(ImageViewCommand.help()).to_string(),
            style(RatioCommand.help()).to_string(),
            style(CountCommand.help()).to_string(),
            style(PromptCommand.help()).to_string(),
            style(SaveImagesCommand.help()).to_string(),
            style(HelpCommand.help()).to_string(),
            style(QuitCommand.help()).to_string(),
        ]
        .join("\n");

        Ok(Some(help_text))
    }

    fn help(&self) -> &'static str {
        "/help - Show available commands"
    }
}

impl CommandHandler for ChatViewCommand {
    fn execute(&self, state: &mut StudioState, _args: &[&str]) -> Result<Option<String>, StudioError> {
        state.mount(ViewKind::Chat);
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/chat - Start a new chat"
    }
}

impl CommandHandler for ImageViewCommand {
    fn execute(&self, state: &mut StudioState, _args: &[&str]) -> Result<Option<String>, StudioError> {
        state.mount(ViewKind::Image);
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/image - Open the image studio; plain input then becomes the prompt"
    }
}

impl CommandHandler for RatioCommand {
    fn execute(&self, state: &mut StudioState, args: &[&str]) -> Result<Option<String>, StudioError> {
        let studio = image_view(state)?;
        match args.first() {
            None => {
                let choices: Vec<&str> = ASPECT_RATIOS.iter().map(|r| r.as_str()).collect();
                Ok(Some(format!(
                    "Aspect ratio: {} (choices: {})",
                    studio.aspect_ratio(),
                    choices.join(", ")
                )))
            }
            Some(value) => {
                let ratio = value.parse::<AspectRatio>()?;
                studio.set_aspect_ratio(ratio);
                Ok(Some(format!("Aspect ratio set to {}", ratio)))
            }
        }
    }

    fn help(&self) -> &'static str {
        "/ratio [1:1|3:4|4:3|9:16|16:9] - Show or set the aspect ratio"
    }
}

impl CommandHandler for CountCommand {
    fn execute(&self, state: &mut StudioState, args: &[&str]) -> Result<Option<String>, StudioError> {
        let studio = image_view(state)?;
        match args.first() {
            None => Ok(Some(format!("Number of images: {}", studio.number_of_images()))),
            Some(value) => {
                let count = value
                    .parse::<u8>()
                    .map_err(|_| StudioError::Input(format!("Not a number: {}", value)))?;
                studio.set_number_of_images(count)?;
                Ok(Some(format!("Number of images set to {}", count)))
            }
        }
    }

    fn help(&self) -> &'static str {
        "/count [1-4] - Show or set how many images to generate"
    }
}

impl CommandHandler for PromptCommand {
    fn execute(&self, state: &mut StudioState, _args: &[&str]) -> Result<Option<String>, StudioError> {
        let studio = image_view(state)?;
        let prompt = if studio.prompt().is_empty() {
            "(none)"
        } else {
            studio.prompt()
        };
        Ok(Some(format!(
            "Prompt: {}\nImages: {}  Aspect ratio: {}",
            prompt,
            studio.number_of_images(),
            studio.aspect_ratio()
        )))
    }

    fn help(&self) -> &'static str {
        "/prompt - Show the current prompt and parameters"
    }
}

impl CommandHandler for SaveImagesCommand {
    fn execute(&self, state: &mut StudioState, args: &[&str]) -> Result<Option<String>, StudioError> {
        let dir = args
            .first()
            .map(PathBuf::from)
            .unwrap_or_else(|| state.settings.output_dir.clone());
        let studio = image_view(state)?;
        if studio.results().is_empty() {
            return Ok(Some("No images to save.".to_string()));
        }

        let paths = save_all(studio.results(), &dir)?;
        let lines: Vec<String> = paths
            .iter()
            .map(|p| format!("Saved {}", p.display()))
            .collect();
        Ok(Some(lines.join("\n")))
    }

    fn help(&self) -> &'static str {
        "/save [dir] - Write the current images to disk"
    }
}
