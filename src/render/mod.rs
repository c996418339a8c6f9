//! Renderer collaborator.
//!
//! The editing pipeline treats rendering as opaque: it only needs to validate a
//! snapshot synchronously, render it asynchronously, and ask what the renderer
//! supports.
//!
//! - [`document`] - displayable tree and HTML serialization
//! - [`markdown`] - `pulldown-cmark` backed [`Renderer`]
//! - [`validate`] - validation helpers shared by renderers

pub mod document;
pub mod markdown;
pub mod validate;

#[cfg(test)]
pub mod testing;

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::RenderError;

pub use document::{Document, Element, Node};
pub use markdown::{MarkdownOptions, MarkdownRenderer};
pub use validate::{ValidationResult, decode_content};

/// Pending render call. Owns everything it needs, so it can outlive the call site.
pub type RenderFuture = Pin<Box<dyn Future<Output = Result<Rendered, RenderError>> + Send + 'static>>;

/// Names of the syntax features a renderer understands.
pub type FeatureSet = BTreeSet<&'static str>;

/// Successful render output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Input was empty or whitespace only.
    Empty,
    Document(Arc<Document>),
}

impl Rendered {
    pub fn document(&self) -> Option<&Document> {
        match self {
            Self::Empty => None,
            Self::Document(doc) => Some(doc),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// HTML fragment; empty string for [`Rendered::Empty`].
    pub fn to_html(&self) -> String {
        self.document().map(Document::to_html).unwrap_or_default()
    }
}

/// Converts validated text into a displayable tree.
pub trait Renderer: Send + Sync + 'static {
    /// Pure, synchronous check run before every render call.
    fn validate(&self, content: &str) -> ValidationResult;

    /// Render a snapshot that passed validation.
    fn render(&self, content: &str) -> RenderFuture;

    /// Static capability introspection.
    fn supported_features(&self) -> FeatureSet;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_empty() {
        let rendered = Rendered::Empty;
        assert!(rendered.is_empty());
        assert!(rendered.document().is_none());
        assert_eq!(rendered.to_html(), "");
    }

    #[test]
    fn test_rendered_document() {
        let rendered = Rendered::Document(Arc::new(Document::new(Element::new("article"))));
        assert!(!rendered.is_empty());
        assert_eq!(rendered.to_html(), "<article></article>");
    }
}
