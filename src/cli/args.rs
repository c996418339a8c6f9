//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Live markdown preview with debounced, race-free rendering
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: marklive.toml, searched upward)
    #[arg(short = 'C', long, global = true, default_value = crate::config::DEFAULT_CONFIG, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Validate and render a markdown file once
    #[command(visible_alias = "r")]
    Render {
        /// Markdown file to render
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,

        /// Write HTML to this file instead of stdout
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,

        /// Print the document tree as JSON instead of HTML
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        args: RenderArgs,
    },

    /// Re-render a markdown file on every change
    #[command(visible_alias = "w")]
    Watch {
        /// Markdown file to watch
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,

        /// HTML output file (default: FILE with an .html extension)
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,

        /// Debounce window in milliseconds
        #[arg(short, long, value_name = "MS")]
        debounce: Option<u64>,

        #[command(flatten)]
        args: RenderArgs,
    },

    /// List the syntax features the renderer supports
    #[command(visible_alias = "f")]
    Features {
        /// Report plain CommonMark features only
        #[arg(long)]
        no_gfm: bool,
    },
}

/// Shared renderer arguments for Render and Watch commands
#[derive(clap::Args, Debug, Clone)]
pub struct RenderArgs {
    /// Maximum content length in characters
    #[arg(short = 'm', long = "max-length", value_name = "N")]
    pub max_length: Option<usize>,

    /// Disable tables, strikethrough, task lists and autolinks
    #[arg(long)]
    pub no_gfm: bool,
}
