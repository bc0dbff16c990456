//! Container opening with format fallback.
//!
//! A container is tried as the hinted format first, then as zip, then as every
//! other known format. Each attempt reads the original bytes through its own
//! cursor.

mod sevenz_reader;
mod tar_reader;
mod zip_reader;

use std::io::Read;

use log::{debug, warn};

use crate::config::DEFAULT_MAX_CONTAINER_BYTES;
use crate::entry::RawEntry;
use crate::error::OpenError;

pub use sevenz_reader::SevenZHandle;
pub use tar_reader::TarHandle;
pub use zip_reader::ZipHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    Zip,
    SevenZip,
    Tar,
    TarGz,
    TarZst,
}

impl ArchiveFormat {
    /// Declared order, used after the hinted format and zip.
    pub const ALL: [ArchiveFormat; 5] = [
        ArchiveFormat::Zip,
        ArchiveFormat::SevenZip,
        ArchiveFormat::Tar,
        ArchiveFormat::TarGz,
        ArchiveFormat::TarZst,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::SevenZip => "7z",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarZst => "tar.zst",
        }
    }

    /// Map a file name or bare extension to a format.
    pub fn from_hint(hint: &str) -> Option<Self> {
        let hint = hint.trim().to_lowercase();
        if hint.ends_with(".tar.gz") {
            return Some(ArchiveFormat::TarGz);
        }
        if hint.ends_with(".tar.zst") {
            return Some(ArchiveFormat::TarZst);
        }
        let ext = match hint.rsplit_once('.') {
            Some((_, ext)) => ext,
            None => hint.as_str(),
        };
        match ext {
            "zip" | "docx" | "docm" | "dotx" | "xlsx" | "xlsm" | "pptx" | "pptm" | "ppsx" | "vsdx"
            | "odt" | "ods" | "odp" | "epub" | "xps" | "jar" => Some(ArchiveFormat::Zip),
            "7z" => Some(ArchiveFormat::SevenZip),
            "tar" => Some(ArchiveFormat::Tar),
            "gz" | "tgz" => Some(ArchiveFormat::TarGz),
            "zst" | "tzst" => Some(ArchiveFormat::TarZst),
            _ => None,
        }
    }
}

/// What the visitor receives for each non-directory entry.
#[derive(Debug)]
pub enum VisitedEntry {
    Loaded(RawEntry),
    /// Larger than the entry size limit; its bytes were not read.
    Oversized { path: String, size: u64 },
    /// Listed in the container but its data could not be read (bad checksum,
    /// encryption, unsupported compression method).
    Unreadable { path: String, message: String },
}

/// An opened container with at least one file entry.
pub enum ArchiveHandle<'a> {
    Zip(ZipHandle<'a>),
    SevenZip(SevenZHandle<'a>),
    Tar(TarHandle<'a>),
}

impl<'a> ArchiveHandle<'a> {
    pub fn format(&self) -> ArchiveFormat {
        match self {
            ArchiveHandle::Zip(_) => ArchiveFormat::Zip,
            ArchiveHandle::SevenZip(_) => ArchiveFormat::SevenZip,
            ArchiveHandle::Tar(h) => h.format(),
        }
    }

    /// Number of file entries (directories excluded).
    pub fn entry_count(&self) -> usize {
        match self {
            ArchiveHandle::Zip(h) => h.entry_count(),
            ArchiveHandle::SevenZip(h) => h.entry_count(),
            ArchiveHandle::Tar(h) => h.entry_count(),
        }
    }

    /// Visit file entries in archive order until `f` returns false.
    pub fn visit_entries<F>(&mut self, max_entry_bytes: Option<u64>, f: F) -> Result<(), OpenError>
    where
        F: FnMut(VisitedEntry) -> bool,
    {
        match self {
            ArchiveHandle::Zip(h) => h.visit_entries(max_entry_bytes, f),
            ArchiveHandle::SevenZip(h) => h.visit_entries(max_entry_bytes, f),
            ArchiveHandle::Tar(h) => h.visit_entries(max_entry_bytes, f),
        }
    }
}

impl std::fmt::Debug for ArchiveHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveHandle")
            .field("format", &self.format())
            .field("entries", &self.entry_count())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerOpener {
    max_container_bytes: u64,
}

impl Default for ContainerOpener {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONTAINER_BYTES)
    }
}

impl ContainerOpener {
    pub fn new(max_container_bytes: u64) -> Self {
        Self { max_container_bytes }
    }

    /// Hinted format, then zip, then the rest in declared order; no repeats.
    pub fn attempt_order(name_hint: Option<&str>) -> Vec<ArchiveFormat> {
        let mut order = Vec::with_capacity(ArchiveFormat::ALL.len());
        if let Some(hinted) = name_hint.and_then(ArchiveFormat::from_hint) {
            order.push(hinted);
        }
        for format in ArchiveFormat::ALL {
            if !order.contains(&format) {
                order.push(format);
            }
        }
        order
    }

    /// Open `bytes` as the first format that yields at least one entry.
    ///
    /// When every attempt fails the last error is returned, except that a
    /// container recognized with zero entries reports `EmptyArchive`. Passing
    /// the decompression cap ends the search at once.
    pub fn open<'a>(&self, bytes: &'a [u8], name_hint: Option<&str>) -> Result<ArchiveHandle<'a>, OpenError> {
        let mut last_err: Option<OpenError> = None;
        let mut saw_empty = false;

        for format in Self::attempt_order(name_hint) {
            match self.try_format(format, bytes) {
                Ok(handle) => {
                    debug!(
                        "container_opened format={} entries={} hint={:?}",
                        format.name(),
                        handle.entry_count(),
                        name_hint
                    );
                    return Ok(handle);
                }
                Err(e @ OpenError::IoFailure(_)) => {
                    warn!("container_rejected format={} error={}", format.name(), e);
                    return Err(e);
                }
                Err(e) => {
                    debug!("container_attempt_failed format={} error={}", format.name(), e);
                    saw_empty |= e == OpenError::EmptyArchive;
                    last_err = Some(e);
                }
            }
        }

        if saw_empty {
            return Err(OpenError::EmptyArchive);
        }
        Err(last_err.unwrap_or_else(|| OpenError::UnsupportedFormat("no container format attempted".to_string())))
    }

    fn try_format<'a>(&self, format: ArchiveFormat, bytes: &'a [u8]) -> Result<ArchiveHandle<'a>, OpenError> {
        match format {
            ArchiveFormat::Zip => ZipHandle::open(bytes).map(ArchiveHandle::Zip),
            ArchiveFormat::SevenZip => SevenZHandle::open(bytes).map(ArchiveHandle::SevenZip),
            ArchiveFormat::Tar => TarHandle::open_plain(bytes).map(ArchiveHandle::Tar),
            ArchiveFormat::TarGz => {
                let body = read_limited(
                    flate2::read::GzDecoder::new(bytes),
                    self.max_container_bytes,
                    format,
                )?;
                TarHandle::open_decompressed(body, format).map(ArchiveHandle::Tar)
            }
            ArchiveFormat::TarZst => {
                let decoder = zstd::stream::read::Decoder::new(bytes)
                    .map_err(|e| OpenError::UnsupportedFormat(format!("tar.zst: {}", e)))?;
                let body = read_limited(decoder, self.max_container_bytes, format)?;
                TarHandle::open_decompressed(body, format).map(ArchiveHandle::Tar)
            }
        }
    }
}

/// Drain a decompressor, failing once the output passes `max_output_bytes`.
fn read_limited<R: Read>(mut reader: R, max_output_bytes: u64, format: ArchiveFormat) -> Result<Vec<u8>, OpenError> {
    let max = usize::try_from(max_output_bytes).unwrap_or(usize::MAX);
    let mut out = Vec::with_capacity(std::cmp::min(64 * 1024, max));
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| OpenError::UnsupportedFormat(format!("{}: {}", format.name(), e)))?;
        if n == 0 {
            break;
        }
        if out.len().saturating_add(n) > max {
            return Err(OpenError::IoFailure(format!(
                "{}: decompressed data exceeds limit ({} bytes)",
                format.name(),
                max_output_bytes
            )));
        }
        out.extend_from_slice(&buf[..n]);
    }

    Ok(out)
}
