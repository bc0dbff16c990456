// JPEG XR (HD Photo / .wdp) decoding through a runtime-loaded shim library
//
// The shim exports:
//   int  docpeek_jxr_decode(const uint8_t *data, size_t len,
//                           uint32_t *width, uint32_t *height, uint8_t **bgra);
//   void docpeek_jxr_free(uint8_t *bgra);
// A zero return means `*bgra` holds width * height * 4 bytes of BGRA pixels.

use std::ffi::c_int;
use std::path::PathBuf;

use libloading::Library;

use crate::bitmap::DecodedBitmap;

/// Environment variable overriding the shim location.
pub const JXR_LIBRARY_ENV: &str = "DOCPEEK_JXR_LIB";

const JXR_MAGIC: [u8; 3] = [0x49, 0x49, 0xBC];

type DecodeFn = unsafe extern "C" fn(*const u8, usize, *mut u32, *mut u32, *mut *mut u8) -> c_int;
type FreeFn = unsafe extern "C" fn(*mut u8);

/// True when `bytes` start with the JPEG XR "II\xBC" signature.
pub fn is_jpeg_xr(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[..3] == JXR_MAGIC && bytes[3] <= 1
}

fn jxr_library_path() -> Result<PathBuf, String> {
    if let Some(path) = std::env::var_os(JXR_LIBRARY_ENV) {
        return Ok(PathBuf::from(path));
    }
    let exe = std::env::current_exe().map_err(|e| format!("Failed to resolve executable: {}", e))?;
    let dir = exe
        .parent()
        .ok_or_else(|| "Failed to resolve executable directory".to_string())?;
    Ok(dir.join(libloading::library_filename("docpeek_jxr")))
}

pub fn decode_wdp(bytes: &[u8]) -> Result<DecodedBitmap, String> {
    if !is_jpeg_xr(bytes) {
        return Err("not a JPEG XR stream (missing II\\xBC signature)".to_string());
    }

    let lib_path = jxr_library_path()?;
    let lib = unsafe { Library::new(&lib_path) }
        .map_err(|e| format!("Failed to load {}: {}", lib_path.display(), e))?;

    let decode: libloading::Symbol<DecodeFn> = unsafe { lib.get(b"docpeek_jxr_decode\0") }
        .map_err(|e| format!("Missing symbol docpeek_jxr_decode: {}", e))?;
    let free: libloading::Symbol<FreeFn> = unsafe { lib.get(b"docpeek_jxr_free\0") }
        .map_err(|e| format!("Missing symbol docpeek_jxr_free: {}", e))?;

    let mut width = 0u32;
    let mut height = 0u32;
    let mut pixels: *mut u8 = std::ptr::null_mut();
    let ret = unsafe { decode(bytes.as_ptr(), bytes.len(), &mut width, &mut height, &mut pixels) };

    if ret != 0 || pixels.is_null() {
        if !pixels.is_null() {
            unsafe { free(pixels) };
        }
        return Err(format!("docpeek_jxr_decode failed with code {}", ret));
    }

    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4));
    let data = match len {
        Some(len) if len > 0 => unsafe { std::slice::from_raw_parts(pixels, len) }.to_vec(),
        _ => {
            unsafe { free(pixels) };
            return Err(format!("docpeek_jxr_decode returned invalid size {}x{}", width, height));
        }
    };
    unsafe { free(pixels) };

    Ok(DecodedBitmap {
        width,
        height,
        data,
        decoder: "wdp",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_check() {
        assert!(is_jpeg_xr(&[0x49, 0x49, 0xBC, 0x01, 0x20, 0, 0, 0]));
        assert!(!is_jpeg_xr(&[0x49, 0x49, 0x2A, 0x00])); // little-endian TIFF
        assert!(!is_jpeg_xr(&[0x49, 0x49]));
    }

    #[test]
    fn non_jxr_input_is_rejected_before_loading() {
        let err = decode_wdp(b"\x89PNG\r\n\x1a\n").unwrap_err();
        assert!(err.contains("JPEG XR"));
    }

    #[test]
    fn library_path_names_the_shim() {
        if std::env::var_os(JXR_LIBRARY_ENV).is_some() {
            return;
        }
        let path = jxr_library_path().unwrap();
        let file = path.file_name().unwrap().to_string_lossy();
        assert!(file.contains("docpeek_jxr"));
    }
}
