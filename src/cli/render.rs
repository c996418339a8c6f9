//! `marklive render`: validate and render a file once.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use super::common::{display_name, html_page, read_source, write_output};
use crate::config::PreviewConfig;
use crate::editor::ProcessingCoordinator;
use crate::log;
use crate::render::{MarkdownRenderer, Rendered};

pub async fn render_file(file: &Path, json: bool, config: &PreviewConfig) -> Result<()> {
    let text = read_source(file)?;
    let rendered = render_text(text, config).await?;

    let body = if json {
        serde_json::to_string_pretty(&rendered.document())?
    } else {
        rendered.to_html()
    };

    match &config.output.path {
        Some(path) => {
            let contents = if json {
                body
            } else {
                html_page(&display_name(file), &body, &config.settings)
            };
            write_output(path, &contents)?;
            log!("render"; "{} -> {}", display_name(file), path.display());
        }
        None => println!("{body}"),
    }
    Ok(())
}

/// Run one snapshot through the same validate-then-render path the editor uses.
async fn render_text(text: String, config: &PreviewConfig) -> Result<Rendered> {
    let renderer = MarkdownRenderer::new(config.markdown_options());
    let coordinator = ProcessingCoordinator::new(Arc::new(renderer));
    Ok(coordinator.process_content(text).await?)
}
