use crate::image::types::{AspectRatio, ImageCount};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Gemini chat and image studio for the terminal", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Text model used for chat
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Model used for image generation
    #[arg(long, global = true)]
    pub image_model: Option<String>,

    /// Override the provider endpoint
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive studio (default)
    Repl {
        /// View to open first
        #[arg(long, value_enum, default_value_t = ViewKind::Chat)]
        view: ViewKind,
    },

    /// Send a single message and stream the reply. Piped stdin is prepended as context
    Chat {
        message: Vec<String>,
    },

    /// Generate images for a prompt and save them
    Image {
        #[arg(required = true)]
        prompt: Vec<String>,

        /// Number of images (1-4)
        #[arg(short = 'n', long)]
        count: Option<ImageCount>,

        /// Aspect ratio: 1:1, 3:4, 4:3, 9:16 or 16:9
        #[arg(short, long)]
        aspect_ratio: Option<AspectRatio>,

        /// Directory the images are written to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewKind {
    Chat,
    Image,
}
