//! Extraction session: open a container, build preview items, track progress.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use docpeek_codecs::{RendererSet, XmlFallback};
use log::{debug, warn};
use parking_lot::Mutex;
use serde::Serialize;

use crate::classify::{ContentKind, EntryClassifier, ExtensionSets};
use crate::config::{DocpeekConfig, EntryFilter, DEFAULT_MAX_CONTAINER_BYTES};
use crate::container::{ContainerOpener, VisitedEntry};
use crate::entry::{split_archive_path, EntryDescriptor};
use crate::error::OpenError;
use crate::export::{export_items, ExportOptions, ExportReport};
use crate::item::{BusyObserver, PreviewItem, PreviewResult};

/// `(current, total, name)` progress callback.
pub type ProgressFn = dyn Fn(usize, usize, &str) + Send + Sync;

/// Cooperative cancellation flag, checked between entries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Opening,
    Ready,
    Extracting,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionProgress {
    pub current: usize,
    pub total: usize,
    /// Most recently visited entry
    pub current_name: String,
}

impl SessionProgress {
    pub fn percent(&self) -> u8 {
        progress_percent(self.current, self.total)
    }
}

/// `current * 100 / total` clamped to 0..=100; 0 when there is nothing to do.
pub fn progress_percent(current: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (current as u128 * 100) / total as u128;
    pct.min(100) as u8
}

/// A container entry whose data could not be read during the open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFailure {
    pub relative_path: String,
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub classifier: EntryClassifier,
    pub renderers: RendererSet,
    pub filter: EntryFilter,
    pub eager_render: bool,
    pub max_entry_bytes: Option<u64>,
    pub max_container_bytes: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            classifier: EntryClassifier::default(),
            renderers: RendererSet::default(),
            filter: EntryFilter::All,
            eager_render: false,
            max_entry_bytes: None,
            max_container_bytes: DEFAULT_MAX_CONTAINER_BYTES,
        }
    }
}

impl SessionSettings {
    pub fn from_config(cfg: &DocpeekConfig) -> Self {
        Self {
            classifier: EntryClassifier::new(ExtensionSets::from_config(&cfg.extensions)),
            renderers: RendererSet::with_xml_fallback(XmlFallback::from(cfg.xml_fallback)),
            filter: cfg.filter,
            eager_render: cfg.eager_render,
            max_entry_bytes: cfg.max_entry_bytes,
            max_container_bytes: cfg.max_container_bytes,
        }
    }

    fn accepts(&self, kind: ContentKind) -> bool {
        match self.filter {
            EntryFilter::All => true,
            EntryFilter::ImagesOnly => kind == ContentKind::Image,
        }
    }
}

/// Preview items of one opened container.
///
/// Opening another container replaces everything; a failed open leaves the
/// session empty.
pub struct ExtractionSession {
    settings: SessionSettings,
    state: SessionState,
    items: Vec<PreviewItem>,
    failed_entries: Vec<EntryFailure>,
    source_name: Option<String>,
    progress: Arc<Mutex<SessionProgress>>,
    busy: Option<Arc<dyn BusyObserver>>,
}

impl Default for ExtractionSession {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

impl std::fmt::Debug for ExtractionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionSession")
            .field("state", &self.state)
            .field("items", &self.items.len())
            .field("failed_entries", &self.failed_entries.len())
            .field("source_name", &self.source_name)
            .field("progress", &*self.progress.lock())
            .finish()
    }
}

impl ExtractionSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            state: SessionState::Empty,
            items: Vec::new(),
            failed_entries: Vec::new(),
            source_name: None,
            progress: Arc::new(Mutex::new(SessionProgress::default())),
            busy: None,
        }
    }

    /// Attach an observer to every item built by later opens.
    pub fn with_busy_observer(mut self, observer: Arc<dyn BusyObserver>) -> Self {
        self.busy = Some(observer);
        self
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    /// Snapshot of the enumeration counters.
    pub fn progress(&self) -> SessionProgress {
        self.progress.lock().clone()
    }

    /// Shared counters, readable from another thread while an open runs.
    pub fn progress_handle(&self) -> Arc<Mutex<SessionProgress>> {
        self.progress.clone()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.failed_entries.clear();
        self.source_name = None;
        self.state = SessionState::Empty;
        *self.progress.lock() = SessionProgress::default();
    }

    pub fn open_path(
        &mut self,
        path: &Path,
        cancel: &CancelToken,
        progress: Option<&ProgressFn>,
    ) -> Result<(), OpenError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.clear();
                return Err(OpenError::io(path.display(), e));
            }
        };
        let name = path.file_name().map(|n| n.to_string_lossy().to_string());
        self.open(&bytes, name.as_deref(), cancel, progress)
    }

    /// Open `bytes`, replacing whatever the session held.
    pub fn open(
        &mut self,
        bytes: &[u8],
        name_hint: Option<&str>,
        cancel: &CancelToken,
        progress: Option<&ProgressFn>,
    ) -> Result<(), OpenError> {
        self.clear();
        self.state = SessionState::Opening;

        match self.enumerate(bytes, name_hint, cancel, progress) {
            Ok((items, failed_entries)) => {
                debug!(
                    "session_opened source={:?} items={} images={} unreadable={}",
                    name_hint,
                    items.len(),
                    items.iter().filter(|i| i.is_image()).count(),
                    failed_entries.len()
                );
                self.items = items;
                self.failed_entries = failed_entries;
                self.source_name = name_hint.map(str::to_string);
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                warn!("session_open_failed source={:?} error={}", name_hint, e);
                self.clear();
                Err(e)
            }
        }
    }

    fn enumerate(
        &self,
        bytes: &[u8],
        name_hint: Option<&str>,
        cancel: &CancelToken,
        progress: Option<&ProgressFn>,
    ) -> Result<(Vec<PreviewItem>, Vec<EntryFailure>), OpenError> {
        if cancel.is_cancelled() {
            return Err(OpenError::Cancelled);
        }

        let opener = ContainerOpener::new(self.settings.max_container_bytes);
        let mut handle = opener.open(bytes, name_hint)?;
        let total = handle.entry_count();

        {
            let mut p = self.progress.lock();
            p.current = 0;
            p.total = total;
        }
        if let Some(cb) = progress {
            cb(0, total, "");
        }

        let settings = &self.settings;
        let mut items: Vec<PreviewItem> = Vec::new();
        let mut failed_entries: Vec<EntryFailure> = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut current = 0usize;
        let mut cancelled = false;

        handle.visit_entries(settings.max_entry_bytes, |visited| {
            if cancel.is_cancelled() {
                cancelled = true;
                return false;
            }
            current += 1;

            let visited_name = match visited {
                VisitedEntry::Oversized { path, size } => {
                    warn!(
                        "entry_skipped reason=too_large path={} size={} limit={:?}",
                        path, size, settings.max_entry_bytes
                    );
                    path
                }
                VisitedEntry::Unreadable { path, message } => {
                    let (relative_path, name) = split_archive_path(&path);
                    if settings.accepts(settings.classifier.classify(&name)) {
                        warn!("entry_unreadable path={} error={}", path, message);
                        failed_entries.push(EntryFailure {
                            relative_path,
                            name,
                            message,
                        });
                    }
                    path
                }
                VisitedEntry::Loaded(entry) => {
                    let path = entry.full_path();
                    let kind = settings.classifier.classify(&entry.name);
                    if settings.accepts(kind) {
                        if seen.insert((entry.relative_path.clone(), entry.name.clone())) {
                            let mut item = PreviewItem::with_kind(entry, kind, &settings.renderers);
                            if let Some(busy) = &self.busy {
                                item = item.with_busy_observer(busy.clone());
                            }
                            if settings.eager_render {
                                item.preview();
                            }
                            items.push(item);
                        } else {
                            warn!("entry_skipped reason=duplicate path={}", path);
                        }
                    }
                    path
                }
            };

            {
                let mut p = self.progress.lock();
                p.current = current;
                p.current_name = visited_name.clone();
            }
            if let Some(cb) = progress {
                cb(current, total, &visited_name);
            }
            true
        })?;

        if cancelled {
            return Err(OpenError::Cancelled);
        }
        Ok((items, failed_entries))
    }

    pub fn items(&self) -> &[PreviewItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn descriptors(&self) -> Vec<EntryDescriptor> {
        self.items.iter().map(PreviewItem::descriptor).collect()
    }

    pub fn find(&self, relative_path: &str, name: &str) -> Option<&PreviewItem> {
        self.items
            .iter()
            .find(|i| i.relative_path() == relative_path && i.name() == name)
    }

    /// Look up `dir/name` (or just `name` at the root).
    pub fn find_path(&self, full_path: &str) -> Option<&PreviewItem> {
        let full_path = full_path.trim_matches('/');
        match full_path.rsplit_once('/') {
            Some((dir, name)) => self.find(dir, name),
            None => self.find("", full_path),
        }
    }

    /// Items whose preview has been computed and failed. Never triggers a render.
    pub fn failed_previews(&self) -> Vec<&PreviewItem> {
        self.items
            .iter()
            .filter(|i| matches!(i.computed_preview(), Some(PreviewResult::Failure(_))))
            .collect()
    }

    /// Entries that were listed in the container but could not be read.
    pub fn failed_entries(&self) -> &[EntryFailure] {
        &self.failed_entries
    }

    pub fn image_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_image()).count()
    }

    /// Write every item under `dest`.
    pub fn extract_to(
        &mut self,
        dest: &Path,
        options: ExportOptions,
        progress: Option<&ProgressFn>,
    ) -> Result<ExportReport> {
        if self.state != SessionState::Ready {
            return Err(anyhow!("Nothing to extract: session is {:?}", self.state));
        }
        self.state = SessionState::Extracting;
        let result = export_items(&self.items, dest, options, progress);
        self.state = SessionState::Ready;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_clamped() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(5, 0), 0);
        assert_eq!(progress_percent(0, 3), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(7, 3), 100);
        assert_eq!(progress_percent(usize::MAX, 1), 100);
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn new_session_is_empty() {
        let session = ExtractionSession::default();
        assert_eq!(session.state(), SessionState::Empty);
        assert!(session.is_empty());
        assert_eq!(session.progress().percent(), 0);
        assert!(session.source_name().is_none());
    }

    #[test]
    fn failed_open_leaves_session_empty() {
        let mut session = ExtractionSession::default();
        let err = session
            .open(b"garbage bytes", Some("x.docx"), &CancelToken::new(), None)
            .unwrap_err();
        assert!(matches!(err, OpenError::UnsupportedFormat(_)));
        assert_eq!(session.state(), SessionState::Empty);
    }

    #[test]
    fn cancelled_before_start() {
        let token = CancelToken::new();
        token.cancel();
        let mut session = ExtractionSession::default();
        let err = session.open(b"anything", None, &token, None).unwrap_err();
        assert_eq!(err, OpenError::Cancelled);
        assert_eq!(session.state(), SessionState::Empty);
    }

    #[test]
    fn open_path_reports_io_failure() {
        let mut session = ExtractionSession::default();
        let err = session
            .open_path(Path::new("/no/such/file.docx"), &CancelToken::new(), None)
            .unwrap_err();
        assert!(matches!(err, OpenError::IoFailure(ref m) if m.contains("file.docx")));
    }

    #[test]
    fn extract_requires_an_open_container() {
        let mut session = ExtractionSession::default();
        let dir = std::env::temp_dir();
        assert!(session.extract_to(&dir, ExportOptions::default(), None).is_err());
    }

    #[test]
    fn settings_follow_config() {
        let cfg = DocpeekConfig {
            filter: EntryFilter::ImagesOnly,
            eager_render: true,
            max_entry_bytes: Some(10),
            ..DocpeekConfig::default()
        };
        let s = SessionSettings::from_config(&cfg);
        assert!(s.accepts(ContentKind::Image));
        assert!(!s.accepts(ContentKind::Text));
        assert!(s.eager_render);
        assert_eq!(s.max_entry_bytes, Some(10));
    }
}
