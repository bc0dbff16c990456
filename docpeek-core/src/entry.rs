use serde::Serialize;

use crate::classify::ContentKind;

/// One file pulled out of a container.
#[derive(Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Last path segment
    pub name: String,
    /// Directory portion inside the container, '/'-separated, empty at the root
    pub relative_path: String,
    pub bytes: Vec<u8>,
    pub size_bytes: u64,
    /// Seconds since the Unix epoch, when the format records it
    pub last_modified: Option<u64>,
}

impl std::fmt::Debug for RawEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawEntry")
            .field("name", &self.name)
            .field("relative_path", &self.relative_path)
            .field("size_bytes", &self.size_bytes)
            .field("last_modified", &self.last_modified)
            .finish()
    }
}

impl RawEntry {
    /// Build an entry from a path as stored in the archive.
    pub fn from_archive_path(path: &str, bytes: Vec<u8>, last_modified: Option<u64>) -> Self {
        let (relative_path, name) = split_archive_path(path);
        Self {
            name,
            relative_path,
            size_bytes: bytes.len() as u64,
            bytes,
            last_modified,
        }
    }

    /// `relative_path/name`, or just `name` at the root.
    pub fn full_path(&self) -> String {
        if self.relative_path.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.relative_path, self.name)
        }
    }

    /// Extension without the dot, lower-cased; empty when there is none.
    pub fn extension(&self) -> String {
        crate::classify::extension_of(&self.name).unwrap_or_default()
    }
}

/// Normalize an archive path and split it into `(relative_path, name)`.
pub(crate) fn split_archive_path(path: &str) -> (String, String) {
    let path = normalize_archive_rel_path(path);
    match path.rsplit_once('/') {
        Some((dir, name)) => (dir.to_string(), name.to_string()),
        None => (String::new(), path),
    }
}

pub(crate) fn normalize_archive_rel_path(p: &str) -> String {
    let p = p.replace('\\', "/");
    let mut p = p.as_str();
    while let Some(rest) = p.strip_prefix("./") {
        p = rest;
    }
    p.trim_matches('/').to_string()
}

/// Listing record for one preview item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryDescriptor {
    pub name: String,
    pub relative_path: String,
    pub kind: ContentKind,
    pub size_bytes: u64,
    pub last_modified: Option<u64>,
    pub is_image: bool,
    /// MIME type guessed from magic bytes; informational only
    pub sniffed_mime: Option<&'static str>,
}

impl EntryDescriptor {
    pub fn new(entry: &RawEntry, kind: ContentKind) -> Self {
        Self {
            name: entry.name.clone(),
            relative_path: entry.relative_path.clone(),
            kind,
            size_bytes: entry.size_bytes,
            last_modified: entry.last_modified,
            is_image: kind == ContentKind::Image,
            sniffed_mime: infer::get(&entry.bytes).map(|t| t.mime_type()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_directory_and_name() {
        let e = RawEntry::from_archive_path("word/media/image1.png", vec![1, 2, 3], None);
        assert_eq!(e.name, "image1.png");
        assert_eq!(e.relative_path, "word/media");
        assert_eq!(e.size_bytes, 3);
        assert_eq!(e.full_path(), "word/media/image1.png");
        assert_eq!(e.extension(), "png");
    }

    #[test]
    fn root_entries_have_empty_relative_path() {
        let e = RawEntry::from_archive_path("./readme.TXT", Vec::new(), Some(0));
        assert_eq!(e.relative_path, "");
        assert_eq!(e.full_path(), "readme.TXT");
        assert_eq!(e.extension(), "txt");
    }

    #[test]
    fn normalizes_separators() {
        assert_eq!(normalize_archive_rel_path("\\a\\b\\c.xml"), "a/b/c.xml");
        assert_eq!(normalize_archive_rel_path("././x/y/"), "x/y");
    }

    #[test]
    fn descriptor_sniffs_mime() {
        let png_magic = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
        let e = RawEntry::from_archive_path("media/pic.bin", png_magic, None);
        let d = EntryDescriptor::new(&e, ContentKind::Other);
        assert_eq!(d.sniffed_mime, Some("image/png"));
        assert!(!d.is_image);
    }
}
