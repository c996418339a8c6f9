//! `marklive features`: print what the renderer understands.

use crate::config::PreviewConfig;
use crate::render::{FeatureSet, MarkdownRenderer, Renderer};

pub fn print_features(config: &PreviewConfig) {
    for feature in features(config) {
        println!("{feature}");
    }
}

fn features(config: &PreviewConfig) -> FeatureSet {
    MarkdownRenderer::new(config.markdown_options()).supported_features()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gfm_toggle() {
        let mut config = PreviewConfig::default();
        assert!(features(&config).contains("tables"));

        config.render.gfm = false;
        let plain = features(&config);
        assert!(!plain.contains("tables"));
        assert!(plain.contains("headers"));
    }
}
