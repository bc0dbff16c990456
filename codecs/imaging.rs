// Image preview: ordered decode chain over raster codecs, metafiles and JPEG XR
// Office packages often mislabel images (a .wmf entry holding EMF data, a .jpg
// holding PNG), so every decoder is tried before giving up.

use image::ImageFormat;
use log::debug;

use crate::bitmap::DecodedBitmap;
use crate::error::DecodeError;
use crate::metafile;
use crate::render::{PreviewPayload, Renderer};
use crate::wdp;

/// One entry of the decode chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageDecoder {
    Jpeg,
    Png,
    Bmp,
    Gif,
    Tiff,
    Emf,
    Wmf,
    Wdp,
}

impl ImageDecoder {
    /// Fixed declared order of the fallback chain.
    pub const ALL: [ImageDecoder; 8] = [
        ImageDecoder::Jpeg,
        ImageDecoder::Png,
        ImageDecoder::Bmp,
        ImageDecoder::Gif,
        ImageDecoder::Tiff,
        ImageDecoder::Emf,
        ImageDecoder::Wmf,
        ImageDecoder::Wdp,
    ];

    /// Map a lower-case extension to its decoder.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jpg" | "jpeg" | "jpe" => Some(ImageDecoder::Jpeg),
            "png" => Some(ImageDecoder::Png),
            "bmp" | "dib" => Some(ImageDecoder::Bmp),
            "gif" => Some(ImageDecoder::Gif),
            "tif" | "tiff" => Some(ImageDecoder::Tiff),
            "emf" => Some(ImageDecoder::Emf),
            "wmf" => Some(ImageDecoder::Wmf),
            "wdp" | "jxr" | "hdp" => Some(ImageDecoder::Wdp),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ImageDecoder::Jpeg => "jpg",
            ImageDecoder::Png => "png",
            ImageDecoder::Bmp => "bmp",
            ImageDecoder::Gif => "gif",
            ImageDecoder::Tiff => "tiff",
            ImageDecoder::Emf => "emf",
            ImageDecoder::Wmf => "wmf",
            ImageDecoder::Wdp => "wdp",
        }
    }

    /// Decode `bytes` with this decoder alone.
    ///
    /// Takes the whole original buffer every time; no decoder sees a stream
    /// another decoder has already consumed.
    pub fn decode(self, bytes: &[u8]) -> Result<DecodedBitmap, String> {
        match self {
            ImageDecoder::Jpeg => decode_raster(bytes, ImageFormat::Jpeg, self.name()),
            ImageDecoder::Png => decode_raster(bytes, ImageFormat::Png, self.name()),
            ImageDecoder::Bmp => decode_raster(bytes, ImageFormat::Bmp, self.name()),
            ImageDecoder::Gif => decode_raster(bytes, ImageFormat::Gif, self.name()),
            ImageDecoder::Tiff => decode_raster(bytes, ImageFormat::Tiff, self.name()),
            ImageDecoder::Emf => metafile::decode_emf(bytes),
            ImageDecoder::Wmf => metafile::decode_wmf(bytes),
            ImageDecoder::Wdp => wdp::decode_wdp(bytes),
        }
    }
}

fn decode_raster(bytes: &[u8], format: ImageFormat, name: &'static str) -> Result<DecodedBitmap, String> {
    let img = image::load_from_memory_with_format(bytes, format).map_err(|e| e.to_string())?;
    Ok(DecodedBitmap::from_dynamic_image(img, name))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRenderer;

impl ImageRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Run the decode chain.
    ///
    /// The hinted decoder goes first; then every decoder in declared order,
    /// the hinted one included. The first success wins. When all fail, the
    /// error carries the last decoder's message.
    pub fn decode(&self, bytes: &[u8], extension_hint: &str) -> Result<DecodedBitmap, DecodeError> {
        let hint = normalize_hint(extension_hint);

        let mut last: Option<(&'static str, String)> = None;
        let hinted = ImageDecoder::from_extension(&hint);

        for decoder in hinted.into_iter().chain(ImageDecoder::ALL) {
            match decoder.decode(bytes) {
                Ok(bitmap) => {
                    debug!(
                        "image_decoded hint={} decoder={} size={}x{}",
                        hint,
                        decoder.name(),
                        bitmap.width,
                        bitmap.height
                    );
                    return Ok(bitmap);
                }
                Err(message) => {
                    debug!("image_decode_attempt_failed decoder={} error={}", decoder.name(), message);
                    last = Some((decoder.name(), message));
                }
            }
        }

        let (decoder, message) = last.unwrap_or(("none", "no decoder attempted".to_string()));
        let message = if message.is_empty() {
            "decoder reported no detail".to_string()
        } else {
            message
        };
        Err(DecodeError::CodecFailure { decoder, message })
    }
}

impl Renderer for ImageRenderer {
    fn render(&self, bytes: &[u8], extension_hint: &str) -> Result<PreviewPayload, DecodeError> {
        self.decode(bytes, extension_hint).map(PreviewPayload::Bitmap)
    }
}

fn normalize_hint(hint: &str) -> String {
    let hint = hint.trim().trim_start_matches('.').to_lowercase();
    if hint.is_empty() {
        "png".to_string()
    } else {
        hint
    }
}
