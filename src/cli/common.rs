//! Helpers shared by the render and watch commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::editor::{EditorSettings, Theme};
use crate::render::decode_content;
use crate::render::document::escape;

/// Read a file and decode it into editable text.
pub fn read_source(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))?;
    decode_content(bytes).with_context(|| format!("cannot edit `{}`", path.display()))
}

/// Wrap an HTML fragment into a standalone page.
pub fn html_page(title: &str, body: &str, settings: &EditorSettings) -> String {
    let theme = match settings.theme {
        Theme::Light => "light",
        Theme::Dark => "dark",
    };
    format!(
        "<!DOCTYPE html>\n<html data-theme=\"{theme}\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        escape(title, false)
    )
}

/// Write `contents` to `path`, creating parent directories.
pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write `{}`", path.display()))
}

/// File name for display, falling back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
