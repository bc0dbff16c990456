// XML preview: decode as text, then re-serialize with indentation

use log::debug;
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

use crate::error::DecodeError;
use crate::render::{PreviewPayload, Renderer};
use crate::text::decode_text;

/// What to do when entry text is not well-formed XML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlFallback {
    /// Show the decoded text unchanged.
    #[default]
    RawText,
    /// Report `DecodeError::XmlParseFailure`.
    Fail,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlRenderer {
    fallback: XmlFallback,
}

impl XmlRenderer {
    pub fn new(fallback: XmlFallback) -> Self {
        Self { fallback }
    }

    pub fn fallback(&self) -> XmlFallback {
        self.fallback
    }
}

impl Renderer for XmlRenderer {
    fn render(&self, bytes: &[u8], _extension_hint: &str) -> Result<PreviewPayload, DecodeError> {
        let text = decode_text(bytes)?;
        match pretty_print(&text) {
            Ok(formatted) => Ok(PreviewPayload::Xml(formatted)),
            Err(message) => match self.fallback {
                XmlFallback::RawText => {
                    debug!("xml_fallback_raw reason={}", message);
                    Ok(PreviewPayload::Xml(text))
                }
                XmlFallback::Fail => Err(DecodeError::XmlParseFailure(message)),
            },
        }
    }
}

/// Parse `text` and write it back with two-space indentation.
///
/// Whitespace-only text nodes are dropped. The document must have a root
/// element and every element must be closed.
pub fn pretty_print(text: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);
    reader.check_end_names(true);

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut saw_root = false;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => return Err(format!("at byte {}: {}", reader.buffer_position(), e)),
        };

        match &event {
            Event::Eof => break,
            Event::Start(start) => {
                if open.is_empty() && saw_root {
                    return Err("more than one root element".to_string());
                }
                saw_root = true;
                open.push(start.name().as_ref().to_vec());
            }
            Event::Empty(_) => {
                if open.is_empty() && saw_root {
                    return Err("more than one root element".to_string());
                }
                saw_root = true;
            }
            Event::End(end) => match open.pop() {
                Some(name) if name == end.name().as_ref() => {}
                _ => {
                    return Err(format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(end.name().as_ref())
                    ))
                }
            },
            Event::Text(_) | Event::CData(_) if open.is_empty() => {
                return Err("text outside of the root element".to_string());
            }
            _ => {}
        }

        writer.write_event(event).map_err(|e| e.to_string())?;
    }

    if let Some(name) = open.last() {
        return Err(format!(
            "unclosed element <{}>",
            String::from_utf8_lossy(name)
        ));
    }
    if !saw_root {
        return Err("no root element".to_string());
    }

    String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indents_nested_elements() {
        let out = pretty_print("<a><b>x</b><c/></a>").unwrap();
        assert!(out.starts_with("<a>"));
        assert!(out.contains("\n  <b>x</b>"));
        assert!(out.contains("\n  <c/>"));
        assert!(out.trim_end().ends_with("</a>"));
    }

    #[test]
    fn keeps_declaration_and_attributes() {
        let src = r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="urn:x"><Default Extension="png"/></Types>"#;
        let out = pretty_print(src).unwrap();
        assert!(out.starts_with("<?xml"));
        assert!(out.contains(r#"Extension="png""#));
    }

    #[test]
    fn mismatched_close_is_an_error() {
        assert!(pretty_print("<a><b></a>").is_err());
    }

    #[test]
    fn unclosed_element_is_an_error() {
        let err = pretty_print("<a><b></b>").unwrap_err();
        assert!(err.contains("<a>"));
    }

    #[test]
    fn bare_text_is_not_xml() {
        assert!(pretty_print("just words").is_err());
        assert!(pretty_print("").is_err());
    }

    #[test]
    fn malformed_xml_falls_back_to_raw_text() {
        let renderer = XmlRenderer::new(XmlFallback::RawText);
        let out = renderer.render(b"<a><b></a>", "xml").unwrap();
        assert_eq!(out.as_text(), Some("<a><b></a>"));
    }

    #[test]
    fn malformed_xml_fails_in_strict_mode() {
        let renderer = XmlRenderer::new(XmlFallback::Fail);
        let err = renderer.render(b"<a><b></a>", "xml").unwrap_err();
        assert!(matches!(err, DecodeError::XmlParseFailure(ref m) if !m.is_empty()));
    }

    #[test]
    fn text_decode_failure_propagates() {
        let renderer = XmlRenderer::default();
        let err = renderer.render(&[b'<', 0xFF, b'>'], "xml").unwrap_err();
        assert!(matches!(err, DecodeError::TextDecodeFailure(_)));
    }

    #[test]
    fn well_formed_xml_is_formatted() {
        let renderer = XmlRenderer::default();
        let out = renderer.render(b"<r><i>1</i></r>", "xml").unwrap();
        match out {
            PreviewPayload::Xml(s) => assert!(s.contains("\n  <i>1</i>")),
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
