// Windows metafile (EMF / WMF) rasterization
//
// Only bitmap-bearing records are interpreted: each embedded DIB is blitted onto
// a white canvas sized from the metafile header. Office documents mostly embed
// metafiles as wrappers around a bitmap, which is what this covers.

use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};

use crate::bitmap::DecodedBitmap;

/// Longest canvas side in pixels.
const MAX_CANVAS_SIDE: f64 = 4096.0;
/// Upper bound on records walked per metafile.
const MAX_RECORDS: usize = 1 << 20;

const EMR_HEADER: u32 = 1;
const EMR_EOF: u32 = 14;
const EMR_SETDIBITSTODEVICE: u32 = 80;
const EMR_STRETCHDIBITS: u32 = 81;
const EMF_SIGNATURE: u32 = 0x464D_4520; // " EMF"

const WMF_PLACEABLE_KEY: u32 = 0x9AC6_CDD7;
const META_EOF: u16 = 0x0000;
const META_SETWINDOWORG: u16 = 0x020B;
const META_SETWINDOWEXT: u16 = 0x020C;
const META_DIBBITBLT: u16 = 0x0940;
const META_DIBSTRETCHBLT: u16 = 0x0B41;
const META_SETDIBTODEV: u16 = 0x0D33;
const META_STRETCHDIB: u16 = 0x0F43;

const DIB_PAL_COLORS: u32 = 1;

pub fn decode_emf(bytes: &[u8]) -> Result<DecodedBitmap, String> {
    let header = EmfHeader::parse(bytes)?;
    let frame = header.canvas_rect()?;
    let mut canvas = Canvas::new(frame, frame.width(), frame.height())?;

    let mut offset = header.size;
    let mut drawn = 0usize;

    for _ in 0..MAX_RECORDS {
        if offset + 8 > bytes.len() {
            break;
        }
        let kind = read_u32(bytes, offset)?;
        let size = read_u32(bytes, offset + 4)? as usize;
        if size < 8 || offset + size > bytes.len() {
            return Err(format!("emf record at offset {offset} has invalid size {size}"));
        }
        let record = &bytes[offset..offset + size];

        match kind {
            EMR_EOF => break,
            EMR_STRETCHDIBITS => {
                if let Some(blit) = emf_stretch_dibits(record)? {
                    canvas.draw(&blit.image, blit.dest)?;
                    drawn += 1;
                }
            }
            EMR_SETDIBITSTODEVICE => {
                if let Some(blit) = emf_set_dibits(record)? {
                    canvas.draw(&blit.image, blit.dest)?;
                    drawn += 1;
                }
            }
            _ => {}
        }
        offset += size;
    }

    if drawn == 0 {
        return Err("emf contains no raster records to render".to_string());
    }
    Ok(DecodedBitmap::from_rgba_image(canvas.image, "emf"))
}

pub fn decode_wmf(bytes: &[u8]) -> Result<DecodedBitmap, String> {
    let (placeable, header_at) = if bytes.len() >= 22 && read_u32(bytes, 0)? == WMF_PLACEABLE_KEY {
        let rect = Rect::from_corners(
            read_i16(bytes, 6)? as f64,
            read_i16(bytes, 8)? as f64,
            read_i16(bytes, 10)? as f64,
            read_i16(bytes, 12)? as f64,
        );
        let inch = match read_u16(bytes, 14)? {
            0 => 1440.0,
            n => n as f64,
        };
        (Some((rect, inch)), 22)
    } else {
        (None, 0)
    };

    let kind = read_u16(bytes, header_at)?;
    let header_words = read_u16(bytes, header_at + 2)?;
    if !(kind == 1 || kind == 2) || header_words != 9 {
        return Err("not a windows metafile (bad header)".to_string());
    }

    let mut window_org: Option<(f64, f64)> = None;
    let mut window_ext: Option<(f64, f64)> = None;
    let mut blits = Vec::new();

    let mut offset = header_at + 18;
    for _ in 0..MAX_RECORDS {
        if offset + 6 > bytes.len() {
            break;
        }
        let words = read_u32(bytes, offset)? as usize;
        let function = read_u16(bytes, offset + 4)?;
        let size = words.checked_mul(2).ok_or("wmf record size overflow")?;
        if size < 6 || offset + size > bytes.len() {
            return Err(format!("wmf record at offset {offset} has invalid size {size}"));
        }
        let record = &bytes[offset..offset + size];

        match function {
            META_EOF => break,
            META_SETWINDOWORG if window_org.is_none() => {
                window_org = Some((read_i16(record, 8)? as f64, read_i16(record, 6)? as f64));
            }
            META_SETWINDOWEXT if window_ext.is_none() => {
                window_ext = Some((read_i16(record, 8)? as f64, read_i16(record, 6)? as f64));
            }
            META_STRETCHDIB | META_DIBSTRETCHBLT | META_DIBBITBLT | META_SETDIBTODEV => {
                if let Some(blit) = wmf_blit(function, record)? {
                    blits.push(blit);
                }
            }
            _ => {}
        }
        offset += size;
    }

    if blits.is_empty() {
        return Err("wmf contains no raster records to render".to_string());
    }

    let canvas_rect = match (placeable, window_org, window_ext) {
        (Some((rect, _)), _, _) => rect,
        (None, org, Some((ext_x, ext_y))) => {
            let (x, y) = org.unwrap_or((0.0, 0.0));
            Rect::from_corners(x, y, x + ext_x, y + ext_y)
        }
        (None, _, None) => return Err("wmf has neither placeable header nor window extent".to_string()),
    };
    let (pixel_w, pixel_h) = match placeable {
        Some((rect, inch)) => (rect.width() * 96.0 / inch, rect.height() * 96.0 / inch),
        None => (canvas_rect.width(), canvas_rect.height()),
    };

    let mut canvas = Canvas::new(canvas_rect, pixel_w, pixel_h)?;
    for blit in &blits {
        canvas.draw(&blit.image, blit.dest)?;
    }
    Ok(DecodedBitmap::from_rgba_image(canvas.image, "wmf"))
}

struct EmfHeader {
    size: usize,
    bounds: Rect,
    frame: Rect,
    device: (f64, f64),
    millimeters: (f64, f64),
}

impl EmfHeader {
    fn parse(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() < 88 {
            return Err("too short for an emf header".to_string());
        }
        if read_u32(bytes, 0)? != EMR_HEADER || read_u32(bytes, 40)? != EMF_SIGNATURE {
            return Err("not an enhanced metafile (missing EMF signature)".to_string());
        }
        let size = read_u32(bytes, 4)? as usize;
        if size < 88 || size > bytes.len() {
            return Err(format!("emf header size {size} is invalid"));
        }
        Ok(Self {
            size,
            bounds: read_rect_inclusive(bytes, 8)?,
            frame: read_rect(bytes, 24)?,
            device: (read_i32(bytes, 72)? as f64, read_i32(bytes, 76)? as f64),
            millimeters: (read_i32(bytes, 80)? as f64, read_i32(bytes, 84)? as f64),
        })
    }

    /// Canvas in device units: the header bounds, or the frame converted
    /// from 0.01 mm when the bounds were never computed.
    fn canvas_rect(&self) -> Result<Rect, String> {
        if self.bounds.is_valid() {
            return Ok(self.bounds);
        }
        let (dev_x, dev_y) = self.device;
        let (mm_x, mm_y) = self.millimeters;
        if self.frame.is_valid() && dev_x > 0.0 && dev_y > 0.0 && mm_x > 0.0 && mm_y > 0.0 {
            let sx = dev_x / (mm_x * 100.0);
            let sy = dev_y / (mm_y * 100.0);
            return Ok(Rect::from_corners(
                self.frame.left * sx,
                self.frame.top * sy,
                self.frame.right * sx,
                self.frame.bottom * sy,
            ));
        }
        Err("emf header has no usable bounds".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rect {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

impl Rect {
    fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            left: x0.min(x1),
            top: y0.min(y1),
            right: x0.max(x1),
            bottom: y0.max(y1),
        }
    }

    fn width(&self) -> f64 {
        self.right - self.left
    }

    fn height(&self) -> f64 {
        self.bottom - self.top
    }

    fn is_valid(&self) -> bool {
        self.width() > 0.0 && self.height() > 0.0
    }
}

/// Destination rectangle as stored in a record; negative extents mirror.
#[derive(Debug, Clone, Copy)]
struct Dest {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

struct Blit {
    image: RgbaImage,
    dest: Dest,
}

struct Canvas {
    image: RgbaImage,
    frame: Rect,
    sx: f64,
    sy: f64,
}

impl Canvas {
    fn new(frame: Rect, pixel_w: f64, pixel_h: f64) -> Result<Self, String> {
        if !frame.is_valid() || !(pixel_w >= 1.0 && pixel_h >= 1.0) {
            return Err("metafile canvas is empty".to_string());
        }
        let fit = (MAX_CANVAS_SIDE / pixel_w.max(pixel_h)).min(1.0);
        let w = (pixel_w * fit).round().max(1.0) as u32;
        let h = (pixel_h * fit).round().max(1.0) as u32;
        Ok(Self {
            image: RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])),
            frame,
            sx: w as f64 / frame.width(),
            sy: h as f64 / frame.height(),
        })
    }

    fn draw(&mut self, bitmap: &RgbaImage, dest: Dest) -> Result<(), String> {
        let Dest { mut x, mut y, mut w, mut h } = dest;
        let mut source = bitmap.clone();
        if w < 0.0 {
            x += w;
            w = -w;
            source = imageops::flip_horizontal(&source);
        }
        if h < 0.0 {
            y += h;
            h = -h;
            source = imageops::flip_vertical(&source);
        }

        let pw = (w * self.sx).round();
        let ph = (h * self.sy).round();
        if pw < 1.0 || ph < 1.0 {
            return Ok(());
        }
        let limit = MAX_CANVAS_SIDE * 2.0;
        if pw > limit || ph > limit {
            return Err(format!("metafile blit of {pw}x{ph} px exceeds the canvas limit"));
        }
        let (pw, ph) = (pw as u32, ph as u32);

        let scaled = if source.dimensions() == (pw, ph) {
            source
        } else {
            imageops::resize(&source, pw, ph, FilterType::Triangle)
        };
        let px = ((x - self.frame.left) * self.sx).round() as i64;
        let py = ((y - self.frame.top) * self.sy).round() as i64;
        imageops::overlay(&mut self.image, &scaled, px, py);
        Ok(())
    }
}

fn emf_stretch_dibits(record: &[u8]) -> Result<Option<Blit>, String> {
    if record.len() < 80 {
        return Err("truncated EMR_STRETCHDIBITS record".to_string());
    }
    let bmi = (read_u32(record, 48)? as usize, read_u32(record, 52)? as usize);
    let bits = (read_u32(record, 56)? as usize, read_u32(record, 60)? as usize);
    if bmi.1 == 0 || bits.1 == 0 {
        return Ok(None);
    }
    if read_u32(record, 64)? == DIB_PAL_COLORS {
        return Err("palette-indexed DIBs are not supported".to_string());
    }
    let image = dib_to_image(slice(record, bmi.0, bmi.1)?, slice(record, bits.0, bits.1)?)?;

    let bounds = read_rect_inclusive(record, 8)?;
    let dest = if bounds.is_valid() {
        Dest { x: bounds.left, y: bounds.top, w: bounds.width(), h: bounds.height() }
    } else {
        Dest {
            x: read_i32(record, 24)? as f64,
            y: read_i32(record, 28)? as f64,
            w: read_i32(record, 72)? as f64,
            h: read_i32(record, 76)? as f64,
        }
    };
    Ok(Some(Blit { image, dest }))
}

fn emf_set_dibits(record: &[u8]) -> Result<Option<Blit>, String> {
    if record.len() < 76 {
        return Err("truncated EMR_SETDIBITSTODEVICE record".to_string());
    }
    let bmi = (read_u32(record, 48)? as usize, read_u32(record, 52)? as usize);
    let bits = (read_u32(record, 56)? as usize, read_u32(record, 60)? as usize);
    if bmi.1 == 0 || bits.1 == 0 {
        return Ok(None);
    }
    if read_u32(record, 64)? == DIB_PAL_COLORS {
        return Err("palette-indexed DIBs are not supported".to_string());
    }
    let image = dib_to_image(slice(record, bmi.0, bmi.1)?, slice(record, bits.0, bits.1)?)?;
    let dest = Dest {
        x: read_i32(record, 24)? as f64,
        y: read_i32(record, 28)? as f64,
        w: read_i32(record, 40)? as f64,
        h: read_i32(record, 44)? as f64,
    };
    Ok(Some(Blit { image, dest }))
}

fn wmf_blit(function: u16, record: &[u8]) -> Result<Option<Blit>, String> {
    // Records without a bitmap have size (function >> 8) + 3 words.
    let bare_size = (((function >> 8) as usize) + 3) * 2;
    if function != META_STRETCHDIB && function != META_SETDIBTODEV && record.len() == bare_size {
        return Ok(None);
    }

    // (dest y, dest x, dest h, dest w, dib offset); WMF stores fields in reverse order.
    let (y_at, x_at, h_at, w_at, dib_at) = match function {
        META_STRETCHDIB => (24, 26, 20, 22, 28),
        META_DIBSTRETCHBLT => (22, 24, 18, 20, 26),
        META_DIBBITBLT => (18, 20, 14, 16, 22),
        META_SETDIBTODEV => (20, 22, 16, 18, 24),
        _ => return Ok(None),
    };
    if (function == META_STRETCHDIB && read_u16(record, 10)? as u32 == DIB_PAL_COLORS)
        || (function == META_SETDIBTODEV && read_u16(record, 6)? as u32 == DIB_PAL_COLORS)
    {
        return Err("palette-indexed DIBs are not supported".to_string());
    }
    if record.len() <= dib_at {
        return Err(format!("wmf record 0x{function:04X} carries no bitmap"));
    }

    let image = packed_dib_to_image(&record[dib_at..])?;
    let dest = Dest {
        x: read_i16(record, x_at)? as f64,
        y: read_i16(record, y_at)? as f64,
        w: read_i16(record, w_at)? as f64,
        h: read_i16(record, h_at)? as f64,
    };
    Ok(Some(Blit { image, dest }))
}

/// Length of BITMAPINFO (header, masks and color table) at the start of a packed DIB.
fn dib_info_len(dib: &[u8]) -> Result<usize, String> {
    let header_size = read_u32(dib, 0)? as usize;
    if header_size == 12 {
        let bit_count = read_u16(dib, 10)?;
        let colors = if bit_count <= 8 { 1usize << bit_count } else { 0 };
        return Ok(12 + colors * 3);
    }
    if header_size < 40 {
        return Err(format!("unsupported DIB header size {header_size}"));
    }
    let bit_count = read_u16(dib, 14)?;
    let compression = read_u32(dib, 16)?;
    let clr_used = read_u32(dib, 32)? as usize;
    let colors = match (clr_used, bit_count) {
        (0, b) if b <= 8 => 1usize << b,
        (n, _) => n,
    };
    let masks = match (header_size, compression) {
        (40, 3) => 12,
        (40, 6) => 16,
        _ => 0,
    };
    colors
        .checked_mul(4)
        .and_then(|c| c.checked_add(header_size + masks))
        .ok_or_else(|| "DIB color table size overflow".to_string())
}

fn packed_dib_to_image(dib: &[u8]) -> Result<RgbaImage, String> {
    let info_len = dib_info_len(dib)?;
    if info_len > dib.len() {
        return Err("DIB header runs past the record".to_string());
    }
    dib_to_image(&dib[..info_len], &dib[info_len..])
}

/// Wrap BITMAPINFO + pixel bits in a BMP file header and decode it.
fn dib_to_image(info: &[u8], bits: &[u8]) -> Result<RgbaImage, String> {
    let offset = 14 + info.len();
    let total = offset + bits.len();
    let total_u32 = u32::try_from(total).map_err(|_| "DIB too large".to_string())?;

    let mut bmp = Vec::with_capacity(total);
    bmp.extend_from_slice(b"BM");
    bmp.extend_from_slice(&total_u32.to_le_bytes());
    bmp.extend_from_slice(&[0, 0, 0, 0]);
    bmp.extend_from_slice(&(offset as u32).to_le_bytes());
    bmp.extend_from_slice(info);
    bmp.extend_from_slice(bits);

    image::load_from_memory_with_format(&bmp, ImageFormat::Bmp)
        .map(|img| img.to_rgba8())
        .map_err(|e| format!("embedded DIB: {e}"))
}

fn slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], String> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| format!("range {offset}+{len} is outside the record"))
}

fn read_rect(data: &[u8], offset: usize) -> Result<Rect, String> {
    Ok(Rect {
        left: read_i32(data, offset)? as f64,
        top: read_i32(data, offset + 4)? as f64,
        right: read_i32(data, offset + 8)? as f64,
        bottom: read_i32(data, offset + 12)? as f64,
    })
}

// Device-unit rectangles are inclusive of their right/bottom edge.
fn read_rect_inclusive(data: &[u8], offset: usize) -> Result<Rect, String> {
    let r = read_rect(data, offset)?;
    Ok(Rect {
        right: r.right + 1.0,
        bottom: r.bottom + 1.0,
        ..r
    })
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, String> {
    slice(data, offset, 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_i16(data: &[u8], offset: usize) -> Result<i16, String> {
    read_u16(data, offset).map(|v| v as i16)
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, String> {
    slice(data, offset, 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_i32(data: &[u8], offset: usize) -> Result<i32, String> {
    read_u32(data, offset).map(|v| v as i32)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn put_u16(buf: &mut Vec<u8>, v: u16) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u32(buf: &mut Vec<u8>, v: u32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_i32(buf: &mut Vec<u8>, v: i32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    /// 2x2 24-bit DIB filled with one BGR color: (header, bits).
    fn solid_dib(bgr: [u8; 3]) -> (Vec<u8>, Vec<u8>) {
        let mut info = Vec::new();
        put_u32(&mut info, 40);
        put_i32(&mut info, 2);
        put_i32(&mut info, 2);
        put_u16(&mut info, 1);
        put_u16(&mut info, 24);
        put_u32(&mut info, 0);
        put_u32(&mut info, 16);
        put_u32(&mut info, 0);
        put_u32(&mut info, 0);
        put_u32(&mut info, 0);
        put_u32(&mut info, 0);

        let mut bits = Vec::new();
        for _ in 0..2 {
            bits.extend_from_slice(&bgr);
            bits.extend_from_slice(&bgr);
            bits.extend_from_slice(&[0, 0]);
        }
        (info, bits)
    }

    /// Minimal EMF: header with 10x10 bounds, one STRETCHDIBITS covering it, EOF.
    pub(crate) fn sample_emf(bgr: [u8; 3]) -> Vec<u8> {
        let (info, bits) = solid_dib(bgr);

        let mut stretch = Vec::new();
        put_u32(&mut stretch, EMR_STRETCHDIBITS);
        put_u32(&mut stretch, (80 + info.len() + bits.len()) as u32);
        for v in [0, 0, 9, 9] {
            put_i32(&mut stretch, v);
        }
        for v in [0, 0, 0, 0, 2, 2] {
            put_i32(&mut stretch, v); // xDest yDest xSrc ySrc cxSrc cySrc
        }
        put_u32(&mut stretch, 80);
        put_u32(&mut stretch, info.len() as u32);
        put_u32(&mut stretch, (80 + info.len()) as u32);
        put_u32(&mut stretch, bits.len() as u32);
        put_u32(&mut stretch, 0); // iUsageSrc
        put_u32(&mut stretch, 0x00CC_0020); // SRCCOPY
        put_i32(&mut stretch, 10);
        put_i32(&mut stretch, 10);
        stretch.extend_from_slice(&info);
        stretch.extend_from_slice(&bits);

        let mut eof = Vec::new();
        put_u32(&mut eof, EMR_EOF);
        put_u32(&mut eof, 20);
        put_u32(&mut eof, 0);
        put_u32(&mut eof, 16);
        put_u32(&mut eof, 20);

        let total = 88 + stretch.len() + eof.len();
        let mut emf = Vec::new();
        put_u32(&mut emf, EMR_HEADER);
        put_u32(&mut emf, 88);
        for v in [0, 0, 9, 9] {
            put_i32(&mut emf, v);
        }
        for v in [0, 0, 264, 264] {
            put_i32(&mut emf, v);
        }
        put_u32(&mut emf, EMF_SIGNATURE);
        put_u32(&mut emf, 0x0001_0000);
        put_u32(&mut emf, total as u32);
        put_u32(&mut emf, 3);
        put_u16(&mut emf, 1);
        put_u16(&mut emf, 0);
        put_u32(&mut emf, 0);
        put_u32(&mut emf, 0);
        put_u32(&mut emf, 0);
        put_i32(&mut emf, 1024);
        put_i32(&mut emf, 768);
        put_i32(&mut emf, 270);
        put_i32(&mut emf, 203);
        assert_eq!(emf.len(), 88);

        emf.extend_from_slice(&stretch);
        emf.extend_from_slice(&eof);
        emf
    }

    /// Placeable WMF, 1000x1000 logical units at 1000 units/inch, one STRETCHDIB.
    fn wmf_stretch_dib(bgr: [u8; 3], x: u16, y: u16, w: u16, h: u16) -> Vec<u8> {
        let (info, bits) = solid_dib(bgr);

        let mut stretch = Vec::new();
        let stretch_len = 28 + info.len() + bits.len();
        put_u32(&mut stretch, (stretch_len / 2) as u32);
        put_u16(&mut stretch, META_STRETCHDIB);
        put_u32(&mut stretch, 0x00CC_0020);
        put_u16(&mut stretch, 0); // DIB_RGB_COLORS
        for v in [2u16, 2, 0, 0, h, w, y, x] {
            put_u16(&mut stretch, v);
        }
        stretch.extend_from_slice(&info);
        stretch.extend_from_slice(&bits);
        stretch
    }

    /// Five-word record carrying a (y, x) pair, as SETWINDOWORG and SETWINDOWEXT do.
    fn wmf_point_record(function: u16, x: u16, y: u16) -> Vec<u8> {
        let mut record = Vec::new();
        put_u32(&mut record, 5);
        put_u16(&mut record, function);
        put_u16(&mut record, y);
        put_u16(&mut record, x);
        record
    }

    fn wmf_document(placeable: bool, records: &[Vec<u8>]) -> Vec<u8> {
        let mut wmf = Vec::new();
        if placeable {
            put_u32(&mut wmf, WMF_PLACEABLE_KEY);
            put_u16(&mut wmf, 0);
            for v in [0u16, 0, 1000, 1000] {
                put_u16(&mut wmf, v);
            }
            put_u16(&mut wmf, 1000);
            put_u32(&mut wmf, 0);
            put_u16(&mut wmf, 0);
        }

        let records_len: usize = records.iter().map(Vec::len).sum();
        let max_record = records.iter().map(|r| r.len() / 2).max().unwrap_or(3);
        put_u16(&mut wmf, 1);
        put_u16(&mut wmf, 9);
        put_u16(&mut wmf, 0x0300);
        put_u32(&mut wmf, ((18 + records_len + 6) / 2) as u32);
        put_u16(&mut wmf, 0);
        put_u32(&mut wmf, max_record as u32);
        put_u16(&mut wmf, 0);

        for record in records {
            wmf.extend_from_slice(record);
        }
        put_u32(&mut wmf, 3);
        put_u16(&mut wmf, META_EOF);
        wmf
    }

    pub(crate) fn sample_wmf(bgr: [u8; 3]) -> Vec<u8> {
        wmf_document(true, &[wmf_stretch_dib(bgr, 0, 0, 1000, 1000)])
    }

    fn bgra_at(bitmap: &DecodedBitmap, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * bitmap.width + x) * 4) as usize;
        [bitmap.data[i], bitmap.data[i + 1], bitmap.data[i + 2], bitmap.data[i + 3]]
    }

    #[test]
    fn emf_stretch_dibits_fills_canvas() {
        let bitmap = decode_emf(&sample_emf([0, 0, 255])).unwrap();
        assert_eq!((bitmap.width, bitmap.height), (10, 10));
        assert_eq!(bitmap.decoder, "emf");
        assert_eq!(bgra_at(&bitmap, 5, 5), [0, 0, 255, 255]);
    }

    #[test]
    fn wmf_placeable_stretch_dib() {
        let bitmap = decode_wmf(&sample_wmf([255, 0, 0])).unwrap();
        assert_eq!((bitmap.width, bitmap.height), (96, 96));
        assert_eq!(bgra_at(&bitmap, 48, 48), [255, 0, 0, 255]);
    }

    #[test]
    fn wmf_without_placeable_header_uses_window_extent() {
        let wmf = wmf_document(
            false,
            &[
                wmf_point_record(META_SETWINDOWORG, 10, 20),
                wmf_point_record(META_SETWINDOWEXT, 40, 30),
                wmf_stretch_dib([0, 255, 0], 10, 20, 20, 30),
            ],
        );
        let bitmap = decode_wmf(&wmf).unwrap();
        assert_eq!((bitmap.width, bitmap.height), (40, 30));
        assert_eq!(bgra_at(&bitmap, 5, 15), [0, 255, 0, 255]);
        assert_eq!(bgra_at(&bitmap, 35, 15), [255, 255, 255, 255]);
    }

    #[test]
    fn wmf_without_any_extent_fails() {
        let wmf = wmf_document(false, &[wmf_stretch_dib([0, 0, 0], 0, 0, 10, 10)]);
        let err = decode_wmf(&wmf).unwrap_err();
        assert!(err.contains("window extent"), "{err}");
    }

    #[test]
    fn emf_is_not_a_wmf() {
        assert!(decode_wmf(&sample_emf([0, 0, 0])).is_err());
        assert!(decode_emf(&sample_wmf([0, 0, 0])).is_err());
    }

    #[test]
    fn header_only_emf_has_nothing_to_render() {
        let mut emf = sample_emf([0, 0, 0]);
        emf.truncate(88);
        let err = decode_emf(&emf).unwrap_err();
        assert!(err.contains("no raster"));
    }

    #[test]
    fn oversized_record_is_rejected() {
        let mut emf = sample_emf([0, 0, 0]);
        emf[92..96].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(decode_emf(&emf).is_err());
    }

    #[test]
    fn short_input_is_rejected() {
        assert!(decode_emf(b"tiny").is_err());
        assert!(decode_wmf(b"tiny").is_err());
    }

    #[test]
    fn dib_info_len_counts_color_table() {
        let mut info = vec![0u8; 40];
        info[0..4].copy_from_slice(&40u32.to_le_bytes());
        info[14..16].copy_from_slice(&8u16.to_le_bytes());
        assert_eq!(dib_info_len(&info).unwrap(), 40 + 256 * 4);

        info[32..36].copy_from_slice(&16u32.to_le_bytes());
        assert_eq!(dib_info_len(&info).unwrap(), 40 + 16 * 4);
    }
}
