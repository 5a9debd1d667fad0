use super::{
    StudioState,
    handler::{
        ChatViewCommand, CountCommand, HelpCommand, ImageViewCommand, PromptCommand, QuitCommand,
        RatioCommand, SaveImagesCommand,
    },
    registry::CommandRegistry,
};
use crate::core::error::StudioError;
use std::sync::Arc;

#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    pub fn execute(
        &self,
        command: &str,
        args: &[&str],
        state: &mut StudioState,
    ) -> Result<Option<String>, StudioError> {
        self.registry.execute(command, args, state)
    }

    /// Run a `/command arg...` line. Returns `None` for lines that are not commands.
    pub fn execute_line(
        &self,
        line: &str,
        state: &mut StudioState,
    ) -> Option<Result<Option<String>, StudioError>> {
        let rest = line.strip_prefix('/')?;
        let parts: Vec<&str> = rest.split_whitespace().collect();
        let (command, args) = parts.split_first()?;
        Some(self.execute(command, args, state))
    }

    pub fn get_command_names(&self) -> Vec<String> {
        self.registry.get_command_names()
    }
}

pub fn create_command_registry() -> CommandDispatcher {
    let mut registry = CommandRegistry::new();

    registry.register("quit", QuitCommand);
    registry.register("help", HelpCommand);
    registry.register("chat", ChatViewCommand);
    registry.register("image", ImageViewCommand);
    registry.register("ratio", RatioCommand);
    registry.register("count", CountCommand);
    registry.register("prompt", PromptCommand);
    registry.register("save", SaveImagesCommand);

    CommandDispatcher::new(Arc::new(registry))
}
