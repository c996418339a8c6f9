//! Editor controller.
//!
//! Owns the canonical [`EditorContent`] of one session. Edits land in `raw`
//! immediately; the debouncer settles them; settled input is handed to the
//! processing coordinator when live preview is on; committed outcomes flow
//! back into `processed` or the surfaced error.
//!
//! Callbacks from the debouncer and the coordinator only hold a weak
//! reference, and everything is a no-op once the controller is disposed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use super::content::{EditorContent, EditorSettings};
use super::debounce::Debouncer;
use super::processor::{Commit, ProcessingCoordinator};
use crate::debug;
use crate::error::ProcessError;
use crate::render::{FeatureSet, MarkdownOptions, MarkdownRenderer, Renderer};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 100_000;

pub type ContentObserver = Box<dyn Fn(&ContentChange) + Send + Sync>;

/// Construction options for [`EditorController`].
pub struct EditorConfig {
    pub initial_content: String,
    pub initial_settings: EditorSettings,
    pub debounce_delay: Duration,
    pub max_content_length: usize,
    pub gfm: bool,
    pub on_content_change: Option<ContentObserver>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            initial_content: String::new(),
            initial_settings: EditorSettings::default(),
            debounce_delay: DEFAULT_DEBOUNCE,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            gfm: true,
            on_content_change: None,
        }
    }
}

impl EditorConfig {
    pub fn with_initial_content(mut self, content: impl Into<String>) -> Self {
        self.initial_content = content.into();
        self
    }

    pub fn with_settings(mut self, settings: EditorSettings) -> Self {
        self.initial_settings = settings;
        self
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    pub fn with_max_content_length(mut self, max: usize) -> Self {
        self.max_content_length = max;
        self
    }

    pub fn with_gfm(mut self, gfm: bool) -> Self {
        self.gfm = gfm;
        self
    }

    /// Observer called after every content change, outside any lock.
    pub fn on_content_change(mut self, observer: impl Fn(&ContentChange) + Send + Sync + 'static) -> Self {
        self.on_content_change = Some(Box::new(observer));
        self
    }
}

/// What triggered a [`ContentChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    Edited,
    Rendered,
    Failed,
    ErrorCleared,
    SettingsChanged,
}

/// Snapshot delivered to the content observer.
#[derive(Debug, Clone)]
pub struct ContentChange {
    pub cause: ChangeCause,
    pub content: EditorContent,
    pub error: Option<ProcessError>,
}

/// Where the pipeline currently is for the latest edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `raw` differs from what `processed` was built from, and nothing is scheduled.
    Editing,
    Debouncing,
    Processing,
    Settled,
}

pub struct EditorController {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<EditorState>,
    debouncer: Debouncer<String>,
    processor: ProcessingCoordinator,
    observer: Option<ContentObserver>,
    disposed: AtomicBool,
}

struct EditorState {
    content: EditorContent,
    settings: EditorSettings,
    /// Generation of the last commit applied to `content`.
    applied: u64,
    /// Raw snapshot the current `processed` was built from.
    processed_from: Option<String>,
}

impl EditorController {
    /// Create a controller backed by the markdown renderer.
    ///
    /// Must be called from within a tokio runtime. The initial content is
    /// processed right away when live preview is on.
    pub fn new(config: EditorConfig) -> Self {
        let renderer = MarkdownRenderer::new(MarkdownOptions {
            gfm: config.gfm,
            max_length: config.max_content_length,
        });
        Self::with_renderer(config, Arc::new(renderer))
    }

    /// Create a controller with a custom renderer. `max_content_length` and
    /// `gfm` are then the renderer's concern.
    pub fn with_renderer(config: EditorConfig, renderer: Arc<dyn Renderer>) -> Self {
        let EditorConfig {
            initial_content,
            initial_settings,
            debounce_delay,
            on_content_change,
            ..
        } = config;

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let settled = weak.clone();
            let debouncer = Debouncer::new(initial_content.clone(), debounce_delay, move |raw: String| {
                if let Some(inner) = settled.upgrade() {
                    inner.on_settled(raw);
                }
            });

            let committed = weak.clone();
            let processor = ProcessingCoordinator::with_commit_hook(renderer, move |commit: &Commit| {
                if let Some(inner) = committed.upgrade() {
                    inner.on_commit(commit);
                }
            });

            Inner {
                state: Mutex::new(EditorState {
                    content: EditorContent::new(initial_content.clone()),
                    settings: initial_settings,
                    applied: 0,
                    processed_from: None,
                }),
                debouncer,
                processor,
                observer: on_content_change,
                disposed: AtomicBool::new(false),
            }
        });

        inner.on_settled(initial_content);
        Self { inner }
    }

    /// Replace the raw text. Updates `raw` synchronously and restarts the
    /// debounce window.
    pub fn set_raw_content(&self, raw: impl Into<String>) {
        let inner = &self.inner;
        if inner.is_disposed() {
            return;
        }
        let raw = raw.into();
        let error = inner.processor.error();
        let change = {
            let mut state = inner.state.lock();
            state.content.set_raw(raw.clone());
            ContentChange {
                cause: ChangeCause::Edited,
                content: state.content.clone(),
                error,
            }
        };
        inner.notify(&change);
        inner.debouncer.observe(raw);
    }

    /// Settle the latest edit now instead of waiting for the window.
    pub fn force_flush(&self) {
        if !self.inner.is_disposed() {
            self.inner.debouncer.force_flush();
        }
    }

    pub fn clear_error(&self) {
        let inner = &self.inner;
        if inner.is_disposed() {
            return;
        }
        inner.processor.clear_error();
        let change = {
            let state = inner.state.lock();
            ContentChange {
                cause: ChangeCause::ErrorCleared,
                content: state.content.clone(),
                error: None,
            }
        };
        inner.notify(&change);
    }

    /// Replace the settings. Turning live preview on processes the current
    /// debounced content.
    pub fn set_settings(&self, settings: EditorSettings) {
        let inner = &self.inner;
        if inner.is_disposed() {
            return;
        }
        let error = inner.processor.error();
        let (change, enabled) = {
            let mut state = inner.state.lock();
            let enabled = !state.settings.live_preview && settings.live_preview;
            state.settings = settings;
            let change = ContentChange {
                cause: ChangeCause::SettingsChanged,
                content: state.content.clone(),
                error,
            };
            (change, enabled)
        };
        inner.notify(&change);
        if enabled {
            inner.on_settled(inner.debouncer.debounced());
        }
    }

    pub fn content(&self) -> EditorContent {
        self.inner.state.lock().content.clone()
    }

    pub fn settings(&self) -> EditorSettings {
        self.inner.state.lock().settings
    }

    pub fn error(&self) -> Option<ProcessError> {
        self.inner.processor.error()
    }

    pub fn is_pending(&self) -> bool {
        self.inner.debouncer.is_pending()
    }

    pub fn is_processing(&self) -> bool {
        self.inner.processor.is_processing()
    }

    /// Debouncing or processing.
    pub fn is_busy(&self) -> bool {
        self.is_pending() || self.is_processing()
    }

    pub fn phase(&self) -> Phase {
        if self.is_pending() {
            return Phase::Debouncing;
        }
        if self.is_processing() {
            return Phase::Processing;
        }
        let state = self.inner.state.lock();
        match &state.processed_from {
            Some(raw) if raw == state.content.raw() => Phase::Settled,
            _ => Phase::Editing,
        }
    }

    pub fn supported_features(&self) -> FeatureSet {
        self.inner.processor.supported_features()
    }

    /// Stop all scheduling. In-flight work may finish but is never applied.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::SeqCst) {
            self.inner.debouncer.dispose();
            debug!("editor"; "controller disposed");
        }
    }
}

impl Drop for EditorController {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Inner {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn notify(&self, change: &ContentChange) {
        if let Some(observer) = &self.observer {
            observer(change);
        }
    }

    fn on_settled(&self, raw: String) {
        if self.is_disposed() {
            return;
        }
        if !self.state.lock().settings.live_preview {
            debug!("editor"; "live preview off, skipping render");
            return;
        }
        let pending = self.processor.process_content(raw);
        tokio::spawn(async move {
            if let Err(err) = pending.await {
                debug!("editor"; "processing failed: {}", err);
            }
        });
    }

    fn on_commit(&self, commit: &Commit) {
        if self.is_disposed() {
            return;
        }
        let change = {
            let mut state = self.state.lock();
            if commit.generation <= state.applied {
                return;
            }
            state.applied = commit.generation;
            let cause = match &commit.outcome {
                Ok(rendered) => {
                    state.content.set_processed(rendered.clone());
                    state.processed_from = Some(commit.raw.clone());
                    ChangeCause::Rendered
                }
                Err(_) => ChangeCause::Failed,
            };
            ContentChange {
                cause,
                content: state.content.clone(),
                error: commit.outcome.as_ref().err().cloned(),
            }
        };
        self.notify(&change);
    }
}
