//! marklive - live markdown preview with debounced, race-free rendering.

#![allow(dead_code)]

mod cli;
mod config;
mod editor;
mod error;
mod logger;
mod render;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::PreviewConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = PreviewConfig::load(&cli)?;
    if let Some(path) = &config.config_path {
        debug!("config"; "loaded {}", path.display());
    }

    // The editing pipeline is cooperative; one thread is enough.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(async {
        match &cli.command {
            Commands::Render { file, json, .. } => cli::render::render_file(file, *json, &config).await,
            Commands::Watch { file, .. } => cli::watch::watch_file(file, &config).await,
            Commands::Features { .. } => {
                cli::features::print_features(&config);
                Ok(())
            }
        }
    })
}
