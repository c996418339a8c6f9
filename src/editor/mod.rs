//! Live editing pipeline.
//!
//! Raw text flows through a debouncer into the processing coordinator, and
//! committed results flow back into the controller's canonical content.
//!
//! - [`content`] - `EditorContent` and `EditorSettings`
//! - [`debounce`] - trailing-edge debouncer
//! - [`processor`] - generation-tagged validate/render coordinator
//! - [`controller`] - `EditorController`, the public entry point

pub mod content;
pub mod controller;
pub mod debounce;
pub mod processor;

pub use content::{EditorContent, EditorSettings, Theme};
pub use controller::{ChangeCause, ContentChange, EditorConfig, EditorController, Phase};
pub use processor::{Commit, ProcessingCoordinator};
