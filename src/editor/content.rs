//! Editor content and settings.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::render::Rendered;

/// Canonical content of one editor session.
///
/// Only the controller mutates it. `is_empty` is derived from `raw`, and
/// `last_modified` never moves backwards, even if the system clock does.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorContent {
    raw: String,
    processed: Option<Rendered>,
    last_modified: SystemTime,
}

impl EditorContent {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            processed: None,
            last_modified: SystemTime::now(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Last successfully committed render, if any.
    pub fn processed(&self) -> Option<&Rendered> {
        self.processed.as_ref()
    }

    pub fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    /// True when `raw` is empty or whitespace only.
    pub fn is_empty(&self) -> bool {
        self.raw.trim().is_empty()
    }

    pub(crate) fn set_raw(&mut self, raw: String) {
        self.raw = raw;
        self.last_modified = SystemTime::now().max(self.last_modified);
    }

    pub(crate) fn set_processed(&mut self, processed: Rendered) {
        self.processed = Some(processed);
    }
}

impl Default for EditorContent {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// Color theme of the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Per-session editor settings.
///
/// Only `live_preview` affects the pipeline: when off, settled input is not
/// processed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub theme: Theme,
    pub preview_enabled: bool,
    pub syntax_highlighting: bool,
    pub live_preview: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            preview_enabled: true,
            syntax_highlighting: true,
            live_preview: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_empty_tracks_trimmed_raw() {
        let cases = [
            ("", true),
            ("   ", true),
            ("\n\t \r\n", true),
            ("\u{3000}", true),
            ("a", false),
            ("  # Title  ", false),
            ("\n.\n", false),
        ];
        let mut content = EditorContent::default();
        for (raw, empty) in cases {
            content.set_raw(raw.to_string());
            assert_eq!(content.is_empty(), empty, "raw = {raw:?}");
            assert_eq!(content.is_empty(), content.raw().trim().is_empty());
        }
    }

    #[test]
    fn test_last_modified_is_monotonic() {
        let mut content = EditorContent::new("a");
        let mut previous = content.last_modified();
        for raw in ["ab", "abc", "abcd", "abc"] {
            content.set_raw(raw.to_string());
            assert!(content.last_modified() >= previous);
            previous = content.last_modified();
        }
    }

    #[test]
    fn test_set_raw_keeps_processed() {
        let mut content = EditorContent::new("a");
        content.set_processed(Rendered::Empty);
        content.set_raw("b".to_string());
        assert_eq!(content.processed(), Some(&Rendered::Empty));
    }

    #[test]
    fn test_settings_partial_toml() {
        let settings: EditorSettings = toml::from_str("theme = \"dark\"\nlive_preview = false").unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert!(!settings.live_preview);
        assert!(settings.preview_enabled);
        assert!(settings.syntax_highlighting);
    }
}
