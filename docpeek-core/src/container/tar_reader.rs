use std::borrow::Cow;
use std::io::{Cursor, Read};

use super::{ArchiveFormat, VisitedEntry};
use crate::entry::RawEntry;
use crate::error::OpenError;

const BLOCK: usize = 512;

/// Tar, plain or already decompressed.
pub struct TarHandle<'a> {
    data: Cow<'a, [u8]>,
    format: ArchiveFormat,
    file_count: usize,
}

impl<'a> TarHandle<'a> {
    pub(crate) fn open_plain(bytes: &'a [u8]) -> Result<Self, OpenError> {
        Self::open_data(Cow::Borrowed(bytes), ArchiveFormat::Tar)
    }

    pub(crate) fn open_decompressed(body: Vec<u8>, format: ArchiveFormat) -> Result<TarHandle<'static>, OpenError> {
        TarHandle::open_data(Cow::Owned(body), format)
    }

    fn open_data(data: Cow<'a, [u8]>, format: ArchiveFormat) -> Result<Self, OpenError> {
        // The tar reader treats a short read as end-of-archive, so anything
        // without one full header block is not a tar at all.
        if data.len() < BLOCK {
            return Err(OpenError::UnsupportedFormat(format!(
                "{}: too short for a tar header ({} bytes)",
                format.name(),
                data.len()
            )));
        }

        let unsupported = |e: std::io::Error| OpenError::UnsupportedFormat(format!("{}: {}", format.name(), e));
        let mut file_count = 0usize;
        {
            let mut archive = tar::Archive::new(Cursor::new(data.as_ref()));
            for entry in archive.entries().map_err(unsupported)? {
                let entry = entry.map_err(unsupported)?;
                if entry.header().entry_type().is_file() {
                    file_count += 1;
                }
            }
        }

        if file_count == 0 {
            return Err(OpenError::EmptyArchive);
        }
        Ok(Self {
            data,
            format,
            file_count,
        })
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    pub fn entry_count(&self) -> usize {
        self.file_count
    }

    pub(crate) fn visit_entries<F>(&mut self, max_entry_bytes: Option<u64>, mut f: F) -> Result<(), OpenError>
    where
        F: FnMut(VisitedEntry) -> bool,
    {
        let mut archive = tar::Archive::new(Cursor::new(self.data.as_ref()));
        let entries = archive
            .entries()
            .map_err(|e| OpenError::io("tar entries", e))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| OpenError::io("tar entry", e))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let path = String::from_utf8_lossy(&entry.path_bytes()).to_string();
            let size = entry.size();
            let visited = if max_entry_bytes.is_some_and(|limit| size > limit) {
                VisitedEntry::Oversized { path, size }
            } else {
                let modified = entry.header().mtime().ok();
                let mut bytes = Vec::with_capacity(size.min(64 * 1024 * 1024) as usize);
                match entry.read_to_end(&mut bytes) {
                    Ok(_) => VisitedEntry::Loaded(RawEntry::from_archive_path(&path, bytes, modified)),
                    Err(e) => VisitedEntry::Unreadable {
                        path,
                        message: e.to_string(),
                    },
                }
            };

            if !f(visited) {
                break;
            }
        }
        Ok(())
    }
}
