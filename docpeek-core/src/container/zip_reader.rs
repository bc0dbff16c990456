use std::io::{Cursor, Read};

use chrono::NaiveDate;
use zip::ZipArchive;

use super::VisitedEntry;
use crate::entry::RawEntry;
use crate::error::OpenError;

/// Zip and every zip-based package (OPC, ODF, EPUB).
pub struct ZipHandle<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    file_count: usize,
}

impl<'a> ZipHandle<'a> {
    pub(crate) fn open(bytes: &'a [u8]) -> Result<Self, OpenError> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| OpenError::UnsupportedFormat(format!("zip: {}", e)))?;
        let file_count = archive.file_names().filter(|n| !is_dir_name(n)).count();
        if file_count == 0 {
            return Err(OpenError::EmptyArchive);
        }
        Ok(Self { archive, file_count })
    }

    pub fn entry_count(&self) -> usize {
        self.file_count
    }

    pub(crate) fn visit_entries<F>(&mut self, max_entry_bytes: Option<u64>, mut f: F) -> Result<(), OpenError>
    where
        F: FnMut(VisitedEntry) -> bool,
    {
        for i in 0..self.archive.len() {
            let path = match self.archive.name_for_index(i) {
                Some(name) if is_dir_name(name) => continue,
                Some(name) => name.to_string(),
                None => format!("zip entry #{}", i),
            };

            let visited = match self.archive.by_index(i) {
                Ok(mut file) => {
                    let size = file.size();
                    if max_entry_bytes.is_some_and(|limit| size > limit) {
                        VisitedEntry::Oversized { path, size }
                    } else {
                        let modified = file.last_modified().and_then(dos_time_to_unix);
                        let mut bytes = Vec::with_capacity(size.min(64 * 1024 * 1024) as usize);
                        match file.read_to_end(&mut bytes) {
                            Ok(_) => VisitedEntry::Loaded(RawEntry::from_archive_path(&path, bytes, modified)),
                            Err(e) => VisitedEntry::Unreadable {
                                path,
                                message: e.to_string(),
                            },
                        }
                    }
                }
                Err(e) => VisitedEntry::Unreadable {
                    path,
                    message: e.to_string(),
                },
            };

            if !f(visited) {
                break;
            }
        }
        Ok(())
    }
}

/// Same rule the zip crate applies to `ZipFile::is_dir`.
fn is_dir_name(name: &str) -> bool {
    name.ends_with('/') || name.ends_with('\\')
}

/// DOS timestamps carry no zone; they are read as UTC.
fn dos_time_to_unix(dt: zip::DateTime) -> Option<u64> {
    let secs = NaiveDate::from_ymd_opt(i32::from(dt.year()), dt.month().into(), dt.day().into())?
        .and_hms_opt(dt.hour().into(), dt.minute().into(), dt.second().into())?
        .and_utc()
        .timestamp();
    u64::try_from(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_names_end_in_either_separator() {
        assert!(is_dir_name("word/"));
        assert!(is_dir_name("weird\\"));
        assert!(!is_dir_name("word/document.xml"));
        assert!(!is_dir_name(""));
    }

    #[test]
    fn dos_times_convert_to_unix_seconds() {
        let epoch = zip::DateTime::from_date_and_time(1980, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(dos_time_to_unix(epoch), Some(315_532_800));

        let leap = zip::DateTime::from_date_and_time(2024, 2, 29, 12, 30, 16).unwrap();
        assert_eq!(dos_time_to_unix(leap), Some(1_709_209_816));
    }
}
