use std::io::Cursor;

use log::debug;
use sevenz_rust::{Password, SevenZReader};

use super::VisitedEntry;
use crate::entry::RawEntry;
use crate::error::OpenError;

/// 7z archives. Timestamps are not carried over.
pub struct SevenZHandle<'a> {
    reader: SevenZReader<Cursor<&'a [u8]>>,
    file_count: usize,
}

impl<'a> SevenZHandle<'a> {
    pub(crate) fn open(bytes: &'a [u8]) -> Result<Self, OpenError> {
        let reader = SevenZReader::new(Cursor::new(bytes), bytes.len() as u64, Password::empty())
            .map_err(|e| OpenError::UnsupportedFormat(format!("7z: {}", e)))?;
        let file_count = reader
            .archive()
            .files
            .iter()
            .filter(|entry| !entry.is_directory())
            .count();
        if file_count == 0 {
            return Err(OpenError::EmptyArchive);
        }
        Ok(Self { reader, file_count })
    }

    pub fn entry_count(&self) -> usize {
        self.file_count
    }

    pub(crate) fn visit_entries<F>(&mut self, max_entry_bytes: Option<u64>, mut f: F) -> Result<(), OpenError>
    where
        F: FnMut(VisitedEntry) -> bool,
    {
        self.reader
            .for_each_entries(|entry, reader| {
                if entry.is_directory() {
                    return Ok(true);
                }

                let path = entry.name().to_string();
                let size = entry.size();
                if max_entry_bytes.is_some_and(|limit| size > limit) {
                    // Entries of a solid block share one stream; drain this one
                    // so the next entry starts at its own data.
                    if let Err(e) = std::io::copy(reader, &mut std::io::sink()) {
                        debug!("7z_drain_failed path={} error={}", path, e);
                    }
                    return Ok(f(VisitedEntry::Oversized { path, size }));
                }

                // A bad CRC only surfaces at the end of the entry's stream; the
                // next entry of a solid block still decodes.
                let mut bytes = Vec::with_capacity(size.min(64 * 1024 * 1024) as usize);
                let visited = match reader.read_to_end(&mut bytes) {
                    Ok(_) => VisitedEntry::Loaded(RawEntry::from_archive_path(&path, bytes, None)),
                    Err(e) => VisitedEntry::Unreadable {
                        path,
                        message: e.to_string(),
                    },
                };
                Ok(f(visited))
            })
            .map_err(|e| OpenError::io("7z extraction", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sevenz_rust::{SevenZArchiveEntry, SevenZWriter};

    /// Build a 7z in memory; names ending in '/' become directory entries.
    fn sevenz_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = SevenZWriter::new(Cursor::new(Vec::new())).unwrap();
        for (name, data) in entries {
            let mut entry = SevenZArchiveEntry::new();
            if let Some(dir) = name.strip_suffix('/') {
                entry.name = dir.to_string();
                entry.is_directory = true;
                writer.push_archive_entry(entry, None::<&[u8]>).unwrap();
            } else {
                entry.name = name.to_string();
                writer.push_archive_entry(entry, Some(*data)).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    fn loaded_paths(handle: &mut SevenZHandle<'_>, limit: Option<u64>) -> Vec<String> {
        let mut seen = Vec::new();
        handle
            .visit_entries(limit, |visited| {
                seen.push(match visited {
                    VisitedEntry::Loaded(entry) => entry.full_path(),
                    VisitedEntry::Oversized { path, .. } => format!("oversized:{}", path),
                    VisitedEntry::Unreadable { path, .. } => format!("unreadable:{}", path),
                });
                true
            })
            .unwrap();
        seen
    }

    #[test]
    fn directories_are_not_counted_or_visited() {
        let bytes = sevenz_bytes(&[("docs/", b""), ("docs/a.txt", b"alpha"), ("b.xml", b"<b/>")]);
        let mut handle = SevenZHandle::open(&bytes).unwrap();
        assert_eq!(handle.entry_count(), 2);
        assert_eq!(loaded_paths(&mut handle, None), ["docs/a.txt", "b.xml"]);
    }

    #[test]
    fn oversized_entries_are_reported_without_reading() {
        let big = vec![b'x'; 4096];
        let bytes = sevenz_bytes(&[("big.bin", &big), ("small.txt", b"s")]);
        let mut handle = SevenZHandle::open(&bytes).unwrap();
        assert_eq!(loaded_paths(&mut handle, Some(1024)), ["oversized:big.bin", "small.txt"]);
    }

    #[test]
    fn zip_bytes_are_not_7z() {
        let err = SevenZHandle::open(b"PK\x05\x06 not a 7z").err();
        assert!(matches!(err, Some(OpenError::UnsupportedFormat(_))), "{err:?}");
    }
}
