use crate::cli::ViewKind;
use crate::commands::dispatcher::CommandDispatcher;
use crate::config::Config;
use crate::core::error::StudioError;

use console::style;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::{Highlighter, MatchingBracketHighlighter};
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::history::FileHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config as EditorConfig, Context, EditMode, Editor, Helper};
use std::borrow::Cow;
use std::fs;

pub type StudioEditor = Editor<StudioHelper, FileHistory>;

/// Completes slash commands from the registry.
pub struct CommandCompleter {
    commands: CommandDispatcher,
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let Some(typed) = line.get(..pos).and_then(|head| head.strip_prefix('/')) else {
            return Ok((pos, Vec::new()));
        };
        if typed.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }

        let matches: Vec<Pair> = self
            .commands
            .get_command_names()
            .into_iter()
            .filter(|cmd| cmd.starts_with(typed))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd,
            })
            .collect();

        Ok((1, matches))
    }
}

pub struct StudioHelper {
    completer: CommandCompleter,
    highlighter: MatchingBracketHighlighter,
    hinter: HistoryHinter,
}

impl StudioHelper {
    pub fn new(commands: CommandDispatcher) -> Self {
        Self {
            completer: CommandCompleter { commands },
            highlighter: MatchingBracketHighlighter::new(),
            hinter: HistoryHinter {},
        }
    }
}

impl Helper for StudioHelper {}

impl Completer for StudioHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        self.completer.complete(line, pos, ctx)
    }
}

impl Hinter for StudioHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

impl Highlighter for StudioHelper {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        self.highlighter.highlight(line, pos)
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(style(hint).dim().to_string())
    }

    fn highlight_candidate<'c>(
        &self,
        candidate: &'c str,
        completion: CompletionType,
    ) -> Cow<'c, str> {
        self.highlighter.highlight_candidate(candidate, completion)
    }
}

// Prompts are free text; every line is accepted as typed.
impl Validator for StudioHelper {}

/// Creates a configured rustyline editor with the saved history loaded.
pub fn create_editor(commands: CommandDispatcher) -> Result<StudioEditor, StudioError> {
    let config = EditorConfig::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .build();

    let mut editor = Editor::with_config(config)
        .map_err(|e| StudioError::Input(format!("Failed to create line editor: {}", e)))?;
    editor.set_helper(Some(StudioHelper::new(commands)));

    // A missing history file is normal on first run.
    let _ = editor.load_history(&Config::history_path());

    Ok(editor)
}

fn prompt_for(view: ViewKind) -> String {
    let label = match view {
        ViewKind::Chat => "chat",
        ViewKind::Image => "image",
    };
    if cfg!(windows) && std::env::var("PSModulePath").is_ok() {
        format!("{}> ", label)
    } else {
        format!("{}{} ", style(label).bold().cyan(), style(">").bold().cyan())
    }
}

/// Reads a line of input. `None` means the user asked to leave.
pub fn read_input(editor: &mut StudioEditor, view: ViewKind) -> Result<Option<String>, StudioError> {
    match editor.readline(&prompt_for(view)) {
        Ok(line) => {
            if !line.trim().is_empty() {
                editor
                    .add_history_entry(&line)
                    .map_err(|e| StudioError::Input(format!("Failed to add history entry: {}", e)))?;
            }
            Ok(Some(line))
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
            println!("Exiting...");
            Ok(None)
        }
        Err(err) => Err(StudioError::Input(format!("Input error: {}", err))),
    }
}

/// Saves the editor history
pub fn save_history(editor: &mut StudioEditor) -> Result<(), StudioError> {
    let history_path = Config::history_path();
    if let Some(parent) = history_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    editor
        .save_history(&history_path)
        .map_err(|e| StudioError::Input(format!("Failed to save history: {}", e)))
}
