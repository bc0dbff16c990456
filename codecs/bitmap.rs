// Normalized bitmap produced by every image decoder
// Pixel data is BGRA, 8 bits per channel, rows top to bottom

use image::{DynamicImage, RgbaImage};

/// Decoded image data in BGRA format
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedBitmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // BGRA format
    /// Name of the decoder that produced the bitmap ("png", "emf", ...)
    pub decoder: &'static str,
}

impl std::fmt::Debug for DecodedBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedBitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .field("decoder", &self.decoder)
            .finish()
    }
}

impl DecodedBitmap {
    /// Convert a DynamicImage to BGRA
    pub fn from_dynamic_image(img: DynamicImage, decoder: &'static str) -> Self {
        Self::from_rgba_image(img.to_rgba8(), decoder)
    }

    pub fn from_rgba_image(rgba: RgbaImage, decoder: &'static str) -> Self {
        let (width, height) = (rgba.width(), rgba.height());
        Self {
            width,
            height,
            data: rgba_to_bgra(rgba.as_raw()),
            decoder,
        }
    }

    /// Back to an RGBA buffer, e.g. for saving the preview as PNG.
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, bgra_to_rgba(&self.data))
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Convert RGBA to BGRA
pub(crate) fn rgba_to_bgra(rgba: &[u8]) -> Vec<u8> {
    let mut bgra = Vec::with_capacity(rgba.len());
    for chunk in rgba.chunks_exact(4) {
        bgra.push(chunk[2]); // B
        bgra.push(chunk[1]); // G
        bgra.push(chunk[0]); // R
        bgra.push(chunk[3]); // A
    }
    bgra
}

// Channel swap is symmetric
fn bgra_to_rgba(bgra: &[u8]) -> Vec<u8> {
    rgba_to_bgra(bgra)
}
