//! Test renderer whose render calls can be held open and released in any order.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::{FeatureSet, MarkdownOptions, MarkdownRenderer, RenderFuture, Renderer, ValidationResult};
use crate::error::RenderError;

/// Holds one render call open until released.
pub struct Gate(oneshot::Sender<Option<RenderError>>);

impl Gate {
    /// Let the held render call finish normally.
    pub fn release(self) {
        let _ = self.0.send(None);
    }

    /// Make the held render call fail with `err`.
    pub fn fail(self, err: RenderError) {
        let _ = self.0.send(Some(err));
    }
}

/// Markdown renderer that records every render input and can hold calls open.
pub struct GatedRenderer {
    inner: MarkdownRenderer,
    gates: Mutex<HashMap<String, oneshot::Receiver<Option<RenderError>>>>,
    calls: Mutex<Vec<String>>,
}

impl GatedRenderer {
    pub fn new(max_length: usize) -> Self {
        Self {
            inner: MarkdownRenderer::new(MarkdownOptions {
                gfm: true,
                max_length,
            }),
            gates: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Hold the next render call for `content` until the returned gate is used.
    pub fn gate(&self, content: &str) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(content.to_string(), rx);
        Gate(tx)
    }

    /// Every content passed to `render`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl Renderer for GatedRenderer {
    fn validate(&self, content: &str) -> ValidationResult {
        self.inner.validate(content)
    }

    fn render(&self, content: &str) -> RenderFuture {
        self.calls.lock().push(content.to_string());
        let gate = self.gates.lock().remove(content);
        let render = self.inner.render(content);
        Box::pin(async move {
            if let Some(rx) = gate
                && let Ok(Some(err)) = rx.await
            {
                return Err(err);
            }
            render.await
        })
    }

    fn supported_features(&self) -> FeatureSet {
        self.inner.supported_features()
    }
}
