//! Renderer contract shared by the image, text and XML strategies.

use std::sync::Arc;

use crate::bitmap::DecodedBitmap;
use crate::error::DecodeError;
use crate::imaging::ImageRenderer;
use crate::text::TextRenderer;
use crate::xml::{XmlFallback, XmlRenderer};

/// Kind-specific preview output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewPayload {
    Bitmap(DecodedBitmap),
    Text(String),
    Xml(String),
    /// Entries with no preview strategy.
    Empty,
}

impl PreviewPayload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PreviewPayload::Text(s) | PreviewPayload::Xml(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bitmap(&self) -> Option<&DecodedBitmap> {
        match self {
            PreviewPayload::Bitmap(b) => Some(b),
            _ => None,
        }
    }
}

/// Converts raw entry bytes into a preview payload.
///
/// `extension_hint` is the entry's extension without the dot, in any case.
/// Implementations must not keep state between calls that changes the result.
pub trait Renderer: Send + Sync {
    fn render(&self, bytes: &[u8], extension_hint: &str) -> Result<PreviewPayload, DecodeError>;
}

/// One renderer per previewable content kind.
#[derive(Clone)]
pub struct RendererSet {
    pub image: Arc<dyn Renderer>,
    pub text: Arc<dyn Renderer>,
    pub xml: Arc<dyn Renderer>,
}

impl RendererSet {
    pub fn new(image: Arc<dyn Renderer>, text: Arc<dyn Renderer>, xml: Arc<dyn Renderer>) -> Self {
        Self { image, text, xml }
    }

    /// Standard renderers with the given malformed-XML policy.
    pub fn with_xml_fallback(fallback: XmlFallback) -> Self {
        Self {
            image: Arc::new(ImageRenderer::new()),
            text: Arc::new(TextRenderer),
            xml: Arc::new(XmlRenderer::new(fallback)),
        }
    }
}

impl Default for RendererSet {
    fn default() -> Self {
        Self::with_xml_fallback(XmlFallback::default())
    }
}

impl std::fmt::Debug for RendererSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererSet").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_accessors() {
        let text = PreviewPayload::Text("hello".into());
        assert_eq!(text.as_text(), Some("hello"));
        assert!(text.as_bitmap().is_none());

        let xml = PreviewPayload::Xml("<a/>".into());
        assert_eq!(xml.as_text(), Some("<a/>"));

        assert!(PreviewPayload::Empty.as_text().is_none());
    }

    #[test]
    fn default_set_renders_text() {
        let set = RendererSet::default();
        let out = set.text.render(b"plain", "txt").unwrap();
        assert_eq!(out, PreviewPayload::Text("plain".into()));
    }
}
