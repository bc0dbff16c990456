// Text preview: BOM-aware decoding, strict UTF-8 otherwise

use crate::error::DecodeError;
use crate::render::{PreviewPayload, Renderer};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn render(&self, bytes: &[u8], _extension_hint: &str) -> Result<PreviewPayload, DecodeError> {
        decode_text(bytes).map(PreviewPayload::Text)
    }
}

/// Decode entry bytes as text.
///
/// A UTF-16 byte order mark selects UTF-16; everything else must be valid UTF-8
/// (a UTF-8 BOM is dropped).
pub fn decode_text(bytes: &[u8]) -> Result<String, DecodeError> {
    if let Some(rest) = bytes.strip_prefix(&UTF8_BOM) {
        return utf8(rest);
    }
    if let Some(rest) = bytes.strip_prefix(&UTF16_LE_BOM) {
        return utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(&UTF16_BE_BOM) {
        return utf16(rest, u16::from_be_bytes);
    }
    utf8(bytes)
}

fn utf8(bytes: &[u8]) -> Result<String, DecodeError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| DecodeError::TextDecodeFailure(e.to_string()))
}

fn utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String, DecodeError> {
    if bytes.len() % 2 != 0 {
        return Err(DecodeError::TextDecodeFailure(format!(
            "utf-16 data has odd length {}",
            bytes.len()
        )));
    }
    let units = bytes.chunks_exact(2).map(|c| unit([c[0], c[1]]));
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|e| DecodeError::TextDecodeFailure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_utf8() {
        assert_eq!(decode_text("héllo".as_bytes()).unwrap(), "héllo");
    }

    #[test]
    fn utf8_bom_is_dropped() {
        let mut data = UTF8_BOM.to_vec();
        data.extend_from_slice(b"abc");
        assert_eq!(decode_text(&data).unwrap(), "abc");
    }

    #[test]
    fn utf16_le_and_be() {
        let le = [0xFF, 0xFE, b'h', 0x00, b'i', 0x00];
        assert_eq!(decode_text(&le).unwrap(), "hi");

        let be = [0xFE, 0xFF, 0x00, b'h', 0x00, b'i'];
        assert_eq!(decode_text(&be).unwrap(), "hi");
    }

    #[test]
    fn invalid_utf8_reports_decoder_message() {
        let err = decode_text(&[b'o', b'k', 0xC3, 0x28]).unwrap_err();
        match err {
            DecodeError::TextDecodeFailure(msg) => assert!(msg.contains("utf-8")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unpaired_surrogate_fails() {
        let le = [0xFF, 0xFE, 0x00, 0xD8];
        assert!(matches!(
            decode_text(&le),
            Err(DecodeError::TextDecodeFailure(_))
        ));
    }

    #[test]
    fn odd_utf16_length_fails() {
        let le = [0xFF, 0xFE, b'h'];
        assert!(decode_text(&le).is_err());
    }

    #[test]
    fn renderer_wraps_text_payload() {
        let out = TextRenderer.render(b"readme", "txt").unwrap();
        assert_eq!(out, PreviewPayload::Text("readme".into()));
    }
}
