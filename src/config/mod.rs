//! Preview configuration management for `marklive.toml`.
//!
//! # Sections
//!
//! | Section      | Purpose                                         |
//! |--------------|-------------------------------------------------|
//! | `[editor]`   | Debounce window and validation limit            |
//! | `[settings]` | Initial `EditorSettings`                        |
//! | `[render]`   | Markdown dialect                                |
//! | `[output]`   | Where `render` and `watch` write HTML           |
//!
//! Every field is optional. CLI flags override the file.

mod error;

pub use error::ConfigError;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::{Cli, Commands, RenderArgs};
use crate::editor::{EditorConfig, EditorSettings};
use crate::render::MarkdownOptions;
use crate::{debug, log};

/// Default config file name, searched upward from the current directory.
pub const DEFAULT_CONFIG: &str = "marklive.toml";

/// Upper bound for `editor.debounce_ms`.
const MAX_DEBOUNCE_MS: u64 = 10_000;

/// Root configuration structure representing marklive.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Absolute path to the loaded config file, if any (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    pub editor: EditorSection,
    pub settings: EditorSettings,
    pub render: RenderSection,
    pub output: OutputSection,
}

/// `[editor]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSection {
    pub debounce_ms: u64,
    /// Validation limit in characters.
    pub max_content_length: usize,
}

impl Default for EditorSection {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            max_content_length: 100_000,
        }
    }
}

/// `[render]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSection {
    /// Tables, strikethrough, task lists and autolinks.
    pub gfm: bool,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self { gfm: true }
    }
}

/// `[output]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub path: Option<PathBuf>,
}

impl PreviewConfig {
    /// Load configuration for the parsed command line.
    ///
    /// Searches upward from cwd for the config file. A missing default file
    /// means defaults; a missing file named with `-C` is an error.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.resolve_output_path(path.parent().unwrap_or(Path::new(".")));
                config.config_path = Some(path);
                config
            }
            None if cli.config != Path::new(DEFAULT_CONFIG) => {
                return Err(ConfigError::Io(
                    cli.config.clone(),
                    std::io::Error::from(std::io::ErrorKind::NotFound),
                ));
            }
            None => {
                debug!("config"; "{} not found, using defaults", DEFAULT_CONFIG);
                Self::default()
            }
        };

        config.apply_command_options(&cli.command);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let (config, _) = Self::parse_with_ignored(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Expand `~` and anchor a relative output path at the config directory.
    fn resolve_output_path(&mut self, root: &Path) {
        if let Some(path) = self.output.path.take() {
            let path = expand_tilde(&path);
            self.output.path = Some(if path.is_relative() { root.join(path) } else { path });
        }
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_command_options(&mut self, command: &Commands) {
        match command {
            Commands::Render { output, args, .. } => {
                self.apply_output(output.as_deref());
                self.apply_render_args(args);
            }
            Commands::Watch {
                output,
                debounce,
                args,
                ..
            } => {
                self.apply_output(output.as_deref());
                Self::update_option(&mut self.editor.debounce_ms, debounce.as_ref());
                self.apply_render_args(args);
            }
            Commands::Features { no_gfm } => {
                if *no_gfm {
                    self.render.gfm = false;
                }
            }
        }
    }

    fn apply_render_args(&mut self, args: &RenderArgs) {
        Self::update_option(&mut self.editor.max_content_length, args.max_length.as_ref());
        if args.no_gfm {
            self.render.gfm = false;
        }
    }

    /// CLI paths stay relative to cwd.
    fn apply_output(&mut self, output: Option<&Path>) {
        if let Some(path) = output {
            self.output.path = Some(expand_tilde(path));
        }
    }

    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.editor.max_content_length == 0 {
            return Err(ConfigError::Validation(
                "editor.max_content_length must be greater than 0".to_string(),
            ));
        }
        if self.editor.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::Validation(format!(
                "editor.debounce_ms must be at most {MAX_DEBOUNCE_MS}, got {}",
                self.editor.debounce_ms
            )));
        }
        Ok(())
    }

    // ========================================================================
    // accessors
    // ========================================================================

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.editor.debounce_ms)
    }

    pub fn markdown_options(&self) -> MarkdownOptions {
        MarkdownOptions {
            gfm: self.render.gfm,
            max_length: self.editor.max_content_length,
        }
    }

    /// Controller options for a session starting with `initial_content`.
    pub fn editor_config(&self, initial_content: impl Into<String>) -> EditorConfig {
        EditorConfig::default()
            .with_initial_content(initial_content)
            .with_settings(self.settings)
            .with_debounce(self.debounce())
            .with_max_content_length(self.editor.max_content_length)
            .with_gfm(self.render.gfm)
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

/// Find config file by searching upward from current directory
///
/// ```text
/// /home/user/notes/drafts/   ← cwd
/// /home/user/notes/marklive.toml  ← found!
/// ```
fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let cwd = std::env::current_dir().ok()?;
    let mut current = cwd.as_path();
    loop {
        let candidate = current.join(config_name);
        if candidate.exists() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}
