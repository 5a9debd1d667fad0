mod app;
mod chat;
mod cli;
mod commands;
mod config;
mod core;
mod display;
mod image;
mod input;
mod providers;

use crate::app::Application;
use crate::cli::Args;
use crate::commands::create_command_registry;
use crate::config::{ApiKey, Config, Settings};
use crate::core::error::StudioError;
use crate::core::logging;
use crate::providers::gemini::GeminiGateway;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::warn;

async fn run() -> Result<(), StudioError> {
    let args = Args::parse();
    let config = Config::load()?;
    let api_key = ApiKey::from_env()?;
    let settings = Settings::resolve(config, &args, api_key);

    logging::init(&settings.log_level);
    if let Err(e) = Config::write_default_if_missing() {
        warn!(path = %Config::config_path().display(), error = %e, "Could not write default config");
    }

    let settings = Arc::new(settings);
    let gateway = Arc::new(GeminiGateway::new(&settings));
    let app = Application::new(settings, gateway, create_command_registry());

    app.run(args.command).await
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display::display_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
