//! `marklive watch`: live preview of one markdown file.
//!
//! ```text
//! notify thread ──► source events ──► EditorController::set_raw_content
//!                                          │ debounce + render
//! HTML file ◄── write_preview ◄── committed ContentChange
//! ```
//!
//! The output file only ever holds the last successful render. Failures go
//! to the status line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::common::{display_name, html_page, read_source, write_output};
use crate::config::PreviewConfig;
use crate::editor::{ChangeCause, ContentChange, EditorController, EditorSettings};
use crate::logger::{status_error, status_pending, status_success};
use crate::{debug, log};

/// How long shutdown waits for an in-flight render.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn watch_file(file: &Path, config: &PreviewConfig) -> Result<()> {
    let file = file
        .canonicalize()
        .with_context(|| format!("cannot watch `{}`", file.display()))?;
    let output = config
        .output
        .path
        .clone()
        .unwrap_or_else(|| default_output(&file));
    if output == file {
        bail!("output `{}` would overwrite the watched file", output.display());
    }

    let mut shutdown = setup_shutdown_handler()?;
    let mut source = SourceWatcher::new(&file)?;
    let initial = read_source(&file)?;

    let (commit_tx, mut commit_rx) = mpsc::unbounded_channel::<ContentChange>();
    let editor = EditorController::new(config.editor_config(initial).on_content_change(
        move |change| {
            if matches!(change.cause, ChangeCause::Rendered | ChangeCause::Failed) {
                let _ = commit_tx.send(change.clone());
            }
        },
    ));

    let preview = Preview {
        title: display_name(&file),
        output,
        settings: config.settings,
    };
    log!("watch"; "{} -> {}", display_name(&file), preview.output.display());

    loop {
        tokio::select! {
            biased;
            Some(()) = shutdown.recv() => break,
            Some(change) = commit_rx.recv() => preview.apply(&change),
            Some(()) = source.changed() => match read_source(&file) {
                Ok(text) if text == editor.content().raw() => {}
                Ok(text) => {
                    editor.set_raw_content(text);
                    status_pending(&format!("editing: {}", preview.title));
                }
                Err(e) => status_error(&format!("failed to read {}", preview.title), &format!("{e:#}")),
            },
            else => break,
        }
    }

    log!("watch"; "shutting down...");
    if editor.is_pending() {
        editor.force_flush();
    }
    while editor.is_processing() {
        match tokio::time::timeout(DRAIN_TIMEOUT, commit_rx.recv()).await {
            Ok(Some(change)) => preview.apply(&change),
            _ => break,
        }
    }
    while let Ok(change) = commit_rx.try_recv() {
        preview.apply(&change);
    }
    editor.dispose();
    Ok(())
}

/// `notes.md` -> `notes.html` next to the source.
fn default_output(file: &Path) -> PathBuf {
    file.with_extension("html")
}

struct Preview {
    title: String,
    output: PathBuf,
    settings: EditorSettings,
}

impl Preview {
    fn apply(&self, change: &ContentChange) {
        if let Some(err) = &change.error {
            status_error(&format!("failed: {}", self.title), &err.to_string());
            return;
        }
        let Some(rendered) = change.content.processed() else {
            return;
        };
        let page = html_page(&self.title, &rendered.to_html(), &self.settings);
        match write_output(&self.output, &page) {
            Ok(()) => status_success(&format!("rendered: {}", self.title)),
            Err(e) => status_error(&format!("failed to write {}", self.output.display()), &format!("{e:#}")),
        }
    }
}

/// Watches the parent directory so editors that save by rename are seen too.
struct SourceWatcher {
    /// Watcher handle (must be kept alive)
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<()>,
}

impl SourceWatcher {
    fn new(file: &Path) -> notify::Result<Self> {
        // notify is callback based; bridge through a thread into tokio
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;
        let dir = file.parent().unwrap_or(Path::new("."));
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        // capacity 1: bursts collapse, the reader always re-reads the whole file
        let (tx, rx) = mpsc::channel(1);
        let target = file.to_path_buf();
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) if touches(&event, &target) => {
                        if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(()) {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => log!("watch"; "notify error: {}", e),
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    async fn changed(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

fn touches(event: &notify::Event, target: &Path) -> bool {
    (event.kind.is_modify() || event.kind.is_create()) && event.paths.iter().any(|p| p == target)
}

/// Route Ctrl+C into the watch loop.
fn setup_shutdown_handler() -> Result<mpsc::UnboundedReceiver<()>> {
    let (tx, rx) = mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        debug!("watch"; "interrupt received");
        let _ = tx.send(());
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))?;
    Ok(rx)
}
