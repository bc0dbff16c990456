//! Preview renderers for entries pulled out of document containers

pub mod bitmap;
pub mod error;
pub mod imaging;
pub mod metafile;
pub mod render;
pub mod text;
pub mod wdp;
pub mod xml;

pub use bitmap::DecodedBitmap;
pub use error::DecodeError;
pub use imaging::{ImageDecoder, ImageRenderer};
pub use render::{PreviewPayload, Renderer, RendererSet};
pub use text::{decode_text, TextRenderer};
pub use xml::{pretty_print, XmlFallback, XmlRenderer};
