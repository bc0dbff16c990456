//! Writing preview items to disk.

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Serialize;

use crate::item::PreviewItem;
use crate::session::ProgressFn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Recreate the entry's directory inside the container under the target
    pub keep_structure: bool,
    /// Replace existing files instead of picking a fresh name
    pub overwrite: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedFile {
    /// Entry path inside the container
    pub source: String,
    pub path: PathBuf,
    pub size: u64,
    pub crc32: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportFailure {
    pub source: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub written: Vec<ExportedFile>,
    pub failed: Vec<ExportFailure>,
}

impl ExportReport {
    pub fn total_bytes(&self) -> u64 {
        self.written.iter().map(|f| f.size).sum()
    }
}

/// Write the raw bytes of `items` under `dest`.
///
/// A failing item is recorded in the report and the batch carries on; only an
/// unusable destination directory fails the call.
pub fn export_items(
    items: &[PreviewItem],
    dest: &Path,
    options: ExportOptions,
    progress: Option<&ProgressFn>,
) -> Result<ExportReport> {
    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create output directory: {}", dest.display()))?;

    let total = items.len();
    let mut report = ExportReport::default();
    let mut claimed: HashSet<PathBuf> = HashSet::new();

    for (idx, item) in items.iter().enumerate() {
        let source = item.entry().full_path();
        if let Some(cb) = progress {
            cb(idx, total, &source);
        }

        let result = target_path(dest, item, options)
            .map(|target| unique_target(target, options.overwrite, &claimed))
            .and_then(|target| write_entry(&target, item.raw_bytes()).map(|()| target));

        match result {
            Ok(path) => {
                let bytes = item.raw_bytes();
                claimed.insert(path.clone());
                debug!("export_written entry={} path={}", source, path.display());
                report.written.push(ExportedFile {
                    source,
                    path,
                    size: bytes.len() as u64,
                    crc32: crc32fast::hash(bytes),
                });
            }
            Err(e) => {
                warn!("export_failed entry={} error={:#}", source, e);
                report.failed.push(ExportFailure {
                    source,
                    message: format!("{:#}", e),
                });
            }
        }
    }

    if let Some(cb) = progress {
        cb(total, total, "Export complete");
    }
    Ok(report)
}

fn target_path(dest: &Path, item: &PreviewItem, options: ExportOptions) -> Result<PathBuf> {
    let rel = if options.keep_structure {
        item.entry().full_path()
    } else {
        item.name().to_string()
    };
    let sanitized = sanitize_path(&rel)
        .with_context(|| format!("Entry path has no usable components: {:?}", rel))?;
    Ok(dest.join(sanitized))
}

/// Keep only normal components: no `..`, roots or drive prefixes.
fn sanitize_path(path: &str) -> Option<PathBuf> {
    let mut sanitized = PathBuf::new();
    for component in Path::new(path).components() {
        if let Component::Normal(part) = component {
            sanitized.push(part);
        }
    }
    if sanitized.as_os_str().is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// `stem (n).ext` for the first n that is neither claimed by this batch nor,
/// unless overwriting, present on disk.
fn unique_target(target: PathBuf, overwrite: bool, claimed: &HashSet<PathBuf>) -> PathBuf {
    let taken = |p: &Path| claimed.contains(p) || (!overwrite && p.exists());
    if !taken(&target) {
        return target;
    }

    let parent = target.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = target.extension().map(|e| e.to_string_lossy().to_string());

    let mut n = 1usize;
    loop {
        let name = match &ext {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = parent.join(name);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn write_entry(target: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(target, bytes).with_context(|| format!("Failed to write {}", target.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_drops_traversal() {
        assert_eq!(sanitize_path("../../etc/passwd"), Some(PathBuf::from("etc/passwd")));
        assert_eq!(sanitize_path("/abs/x.png"), Some(PathBuf::from("abs/x.png")));
        assert_eq!(sanitize_path(".."), None);
        assert_eq!(sanitize_path(""), None);
    }

    #[test]
    fn unique_target_numbers_clashes() {
        let dir = tempfile::tempdir().unwrap();
        let mut claimed = HashSet::new();
        let first = dir.path().join("image1.png");
        claimed.insert(first.clone());

        let second = unique_target(first.clone(), false, &claimed);
        assert_eq!(second, dir.path().join("image1 (1).png"));

        claimed.insert(second);
        assert_eq!(
            unique_target(first, true, &claimed),
            dir.path().join("image1 (2).png")
        );
    }

    #[test]
    fn existing_file_is_kept_unless_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("README");
        fs::write(&target, b"old").unwrap();
        let claimed = HashSet::new();

        assert_eq!(unique_target(target.clone(), false, &claimed), dir.path().join("README (1)"));
        assert_eq!(unique_target(target.clone(), true, &claimed), target);
    }
}
