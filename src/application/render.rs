//! Markdown rendering for lesson content.
//!
//! A Comrak pipeline with Ammonia sanitisation. Rendering is infallible from
//! the caller's perspective: [`render_or_raw`] falls back to the raw source
//! when the pipeline reports an error, so a malformed lesson body can never
//! fail a page load.

use std::sync::Arc;

use comrak::{Arena, format_html, parse_document};
use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::warn;

const SOURCE: &str = "aula::render";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("markdown formatting failed: {0}")]
    Format(#[from] std::fmt::Error),
    #[error("rendered markdown was not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Comrak-based rendering pipeline with Ammonia sanitisation.
pub struct MarkdownRenderService {
    options: comrak::Options<'static>,
    sanitizer: ammonia::Builder<'static>,
}

impl MarkdownRenderService {
    fn new() -> Self {
        Self {
            options: default_options(),
            sanitizer: ammonia::Builder::default(),
        }
    }

    /// Render markdown to sanitized HTML.
    pub fn render(&self, markdown: &str) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);

        let mut buffer = String::new();
        format_html(root, &self.options, &mut buffer)?;

        Ok(self.sanitizer.clean(&buffer).to_string())
    }

    /// Render markdown, falling back to the raw source on failure.
    pub fn render_or_raw(&self, markdown: &str) -> String {
        match self.render(markdown) {
            Ok(html) => html,
            Err(err) => {
                warn!(target: SOURCE, error = %err, "markdown rendering failed, serving raw source");
                markdown.to_string()
            }
        }
    }
}

impl Default for MarkdownRenderService {
    fn default() -> Self {
        Self::new()
    }
}

fn default_options() -> comrak::Options<'static> {
    let mut options = comrak::Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options
}

static RENDER_SERVICE: Lazy<Arc<MarkdownRenderService>> =
    Lazy::new(|| Arc::new(MarkdownRenderService::new()));

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<MarkdownRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_basic_markdown() {
        let service = MarkdownRenderService::new();
        let html = service.render("# Welcome\n\nSome *emphasis*.").unwrap();
        assert!(html.contains("<h1>"));
        assert!(html.contains("<em>emphasis</em>"));
    }

    #[test]
    fn sanitizes_script_tags() {
        let service = MarkdownRenderService::new();
        let html = service
            .render("hello <script>alert('x')</script> world")
            .unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("hello"));
    }

    #[test]
    fn tables_are_rendered() {
        let service = MarkdownRenderService::new();
        let html = service.render("| a | b |\n|---|---|\n| 1 | 2 |").unwrap();
        assert!(html.contains("<table>"));
    }

    #[test]
    fn render_or_raw_returns_html_on_success() {
        let service = MarkdownRenderService::new();
        let html = service.render_or_raw("plain text");
        assert!(html.contains("plain text"));
    }
}
