//! Processing coordinator.
//!
//! Runs validate-then-render for content snapshots and keeps the shared
//! `is_processing`/`error` state consistent when calls overlap. Every call is
//! tagged with a generation number at call time; only an outcome newer than
//! the last committed one may touch shared state, so a slow render of old
//! input can never overwrite the result of newer input.
//!
//! Superseded render work is not cancelled. It runs to completion and its
//! outcome is returned to its own caller, but it is never committed.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::debug;
use crate::error::ProcessError;
use crate::render::{FeatureSet, Rendered, Renderer};

/// Outcome of one `process_content` call, owned by that call's caller.
pub type ProcessFuture = Pin<Box<dyn Future<Output = Result<Rendered, ProcessError>> + Send + 'static>>;

/// Outcome that won the right to update shared state.
#[derive(Debug, Clone)]
pub struct Commit {
    pub generation: u64,
    /// Snapshot the outcome was produced from.
    pub raw: String,
    pub outcome: Result<Rendered, ProcessError>,
}

type CommitHook = Box<dyn Fn(&Commit) + Send + Sync>;

#[derive(Clone)]
pub struct ProcessingCoordinator {
    shared: Arc<Shared>,
}

struct Shared {
    renderer: Arc<dyn Renderer>,
    issued: AtomicU64,
    state: Mutex<ProcessingState>,
    on_commit: Option<CommitHook>,
}

#[derive(Debug, Default)]
struct ProcessingState {
    is_processing: bool,
    error: Option<ProcessError>,
    committed: u64,
}

impl ProcessingCoordinator {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self::build(renderer, None)
    }

    /// Like [`new`](Self::new), calling `hook` after every commit.
    ///
    /// The hook runs outside the coordinator's lock, possibly synchronously
    /// inside `process_content` when validation fails.
    pub fn with_commit_hook(renderer: Arc<dyn Renderer>, hook: impl Fn(&Commit) + Send + Sync + 'static) -> Self {
        Self::build(renderer, Some(Box::new(hook)))
    }

    fn build(renderer: Arc<dyn Renderer>, on_commit: Option<CommitHook>) -> Self {
        Self {
            shared: Arc::new(Shared {
                renderer,
                issued: AtomicU64::new(0),
                state: Mutex::new(ProcessingState::default()),
                on_commit,
            }),
        }
    }

    /// Validate and render `raw`.
    ///
    /// The generation is issued, `is_processing` set and the previous error
    /// cleared before this returns. Invalid input is committed right away and
    /// the renderer is never called for it.
    pub fn process_content(&self, raw: String) -> ProcessFuture {
        let generation = self.shared.issued.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.shared.state.lock();
            state.is_processing = true;
            state.error = None;
        }
        debug!("editor"; "generation {} issued ({} bytes)", generation, raw.len());

        let shared = Arc::clone(&self.shared);
        if let Err(err) = shared.renderer.validate(&raw).into_result() {
            let err = ProcessError::from(err);
            shared.commit(generation, raw, Err(err.clone()));
            return Box::pin(async move { Err::<Rendered, _>(err) });
        }

        let render = shared.renderer.render(&raw);
        Box::pin(async move {
            let outcome = render.await.map_err(|err| ProcessError::Render(err.normalize()));
            shared.commit(generation, raw, outcome.clone());
            outcome
        })
    }

    /// Drop the current error. In-flight work is unaffected.
    pub fn clear_error(&self) {
        self.shared.state.lock().error = None;
    }

    pub fn is_processing(&self) -> bool {
        self.shared.state.lock().is_processing
    }

    pub fn error(&self) -> Option<ProcessError> {
        self.shared.state.lock().error.clone()
    }

    /// Generation of the most recent `process_content` call.
    pub fn latest_generation(&self) -> u64 {
        self.shared.issued.load(Ordering::SeqCst)
    }

    pub fn supported_features(&self) -> FeatureSet {
        self.shared.renderer.supported_features()
    }
}

impl Shared {
    fn commit(&self, generation: u64, raw: String, outcome: Result<Rendered, ProcessError>) {
        {
            let mut state = self.state.lock();
            if generation <= state.committed {
                debug!("editor"; "generation {} discarded, {} already committed", generation, state.committed);
                return;
            }
            state.committed = generation;
            state.error = outcome.as_ref().err().cloned();
            if generation == self.issued.load(Ordering::SeqCst) {
                state.is_processing = false;
            }
        }
        debug!("editor"; "generation {} committed", generation);

        if let Some(hook) = &self.on_commit {
            hook(&Commit {
                generation,
                raw,
                outcome,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::test_util::settle;
    use crate::error::{RenderError, ValidationError};
    use crate::render::testing::GatedRenderer;

    fn heading(rendered: &Rendered) -> String {
        rendered.document().and_then(|doc| doc.find("h1")).map(|h| h.text()).unwrap_or_default()
    }

    fn coordinator(max_length: usize) -> (ProcessingCoordinator, Arc<GatedRenderer>) {
        let renderer = Arc::new(GatedRenderer::new(max_length));
        (ProcessingCoordinator::new(renderer.clone()), renderer)
    }

    #[tokio::test]
    async fn test_success_commits() {
        let (coord, _) = coordinator(100);
        let pending = coord.process_content("# Hi".to_string());
        assert!(coord.is_processing());

        let rendered = pending.await.unwrap();
        assert_eq!(heading(&rendered), "Hi");
        assert!(!coord.is_processing());
        assert_eq!(coord.error(), None);
    }

    #[tokio::test]
    async fn test_validation_failure_skips_renderer() {
        let (coord, renderer) = coordinator(10);
        let pending = coord.process_content("x".repeat(11));

        // committed before the future is even polled
        assert!(!coord.is_processing());
        assert_eq!(
            coord.error(),
            Some(ProcessError::Validation(ValidationError::ContentTooLarge { max: 10 }))
        );

        let err = pending.await.unwrap_err();
        assert_eq!(err.to_string(), "Content exceeds maximum length of 10 characters");
        assert!(renderer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_order_completion() {
        let (coord, renderer) = coordinator(100);
        let gate_a = renderer.gate("# A");
        let gate_b = renderer.gate("# B");

        let a = tokio::spawn(coord.process_content("# A".to_string()));
        let b = tokio::spawn(coord.process_content("# B".to_string()));
        settle().await;
        assert_eq!(renderer.calls(), vec!["# A", "# B"]);

        gate_b.release();
        let b = b.await.unwrap().unwrap();
        assert_eq!(heading(&b), "B");
        assert!(!coord.is_processing());

        gate_a.fail(RenderError::Failed("late".to_string()));
        let a = a.await.unwrap();
        // the caller still sees its own outcome
        assert!(a.is_err());
        // but shared state keeps the newer result
        assert_eq!(coord.error(), None);
        assert!(!coord.is_processing());
    }

    #[tokio::test]
    async fn test_processing_until_latest_finishes() {
        let (coord, renderer) = coordinator(100);
        let gate_a = renderer.gate("# A");
        let gate_b = renderer.gate("# B");

        let a = tokio::spawn(coord.process_content("# A".to_string()));
        let b = tokio::spawn(coord.process_content("# B".to_string()));
        settle().await;

        gate_a.release();
        assert_eq!(heading(&a.await.unwrap().unwrap()), "A");
        assert!(coord.is_processing());

        gate_b.release();
        b.await.unwrap().unwrap();
        assert!(!coord.is_processing());
    }

    #[tokio::test]
    async fn test_commit_hook_sees_only_newer_outcomes() {
        let renderer = Arc::new(GatedRenderer::new(100));
        let commits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&commits);
        let coord = ProcessingCoordinator::with_commit_hook(renderer.clone(), move |commit| {
            sink.lock().push((commit.generation, commit.raw.clone()));
        });

        let gate_a = renderer.gate("# A");
        let a = tokio::spawn(coord.process_content("# A".to_string()));
        coord.process_content("# B".to_string()).await.unwrap();
        gate_a.release();
        a.await.unwrap().unwrap();

        assert_eq!(*commits.lock(), vec![(2, "# B".to_string())]);
        assert_eq!(coord.latest_generation(), 2);
    }

    #[tokio::test]
    async fn test_render_error_is_normalized() {
        let (coord, renderer) = coordinator(100);
        let gate = renderer.gate("# A");
        let pending = tokio::spawn(coord.process_content("# A".to_string()));
        settle().await;
        gate.fail(RenderError::Failed(String::new()));

        let err = pending.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "Processing failed");
        assert_eq!(coord.error(), Some(err));
    }

    #[tokio::test]
    async fn test_render_error_keeps_message() {
        let (coord, renderer) = coordinator(100);
        let gate = renderer.gate("# A");
        let pending = tokio::spawn(coord.process_content("# A".to_string()));
        settle().await;
        gate.fail(RenderError::Failed("parser stalled".to_string()));

        let err = pending.await.unwrap().unwrap_err();
        assert_eq!(
            err,
            ProcessError::Render(RenderError::ProcessingFailed("parser stalled".to_string()))
        );
        assert_eq!(err.to_string(), "parser stalled");
        assert_eq!(coord.error(), Some(err));
    }

    #[tokio::test]
    async fn test_new_call_clears_error() {
        let (coord, _) = coordinator(3);
        let _ = coord.process_content("toolong".to_string()).await;
        assert!(coord.error().is_some());

        let pending = coord.process_content("ok".to_string());
        assert_eq!(coord.error(), None);
        pending.await.unwrap();
        assert_eq!(coord.error(), None);
    }

    #[tokio::test]
    async fn test_clear_error_is_idempotent() {
        let (coord, _) = coordinator(3);
        let _ = coord.process_content("toolong".to_string()).await;
        coord.clear_error();
        coord.clear_error();
        assert_eq!(coord.error(), None);
        assert!(!coord.is_processing());
    }

    #[tokio::test]
    async fn test_whitespace_renders_empty() {
        let (coord, _) = coordinator(100);
        assert_eq!(coord.process_content("  \n".to_string()).await, Ok(Rendered::Empty));
    }
}
