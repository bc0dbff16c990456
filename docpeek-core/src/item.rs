//! Per-entry preview model with a memoized render.

use std::sync::Arc;

use docpeek_codecs::{DecodeError, DecodedBitmap, PreviewPayload, RendererSet};
use log::debug;
use once_cell::sync::OnceCell;

use crate::classify::{ContentKind, EntryClassifier};
use crate::entry::{EntryDescriptor, RawEntry};

/// Told when a render starts and finishes. Advisory only.
pub trait BusyObserver: Send + Sync {
    fn begin(&self, entry_name: &str);
    fn end(&self, entry_name: &str);
}

/// RAII guard that signals `end` when dropped
struct BusyGuard<'a> {
    observer: Option<&'a dyn BusyObserver>,
    entry_name: &'a str,
}

impl<'a> BusyGuard<'a> {
    fn new(observer: Option<&'a dyn BusyObserver>, entry_name: &'a str) -> Self {
        if let Some(obs) = observer {
            obs.begin(entry_name);
        }
        Self { observer, entry_name }
    }
}

impl<'a> Drop for BusyGuard<'a> {
    fn drop(&mut self) {
        if let Some(obs) = self.observer {
            obs.end(self.entry_name);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewResult {
    Success(PreviewPayload),
    Failure(DecodeError),
}

impl PreviewResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PreviewResult::Success(_))
    }

    pub fn payload(&self) -> Option<&PreviewPayload> {
        match self {
            PreviewResult::Success(p) => Some(p),
            PreviewResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&DecodeError> {
        match self {
            PreviewResult::Success(_) => None,
            PreviewResult::Failure(e) => Some(e),
        }
    }
}

pub struct PreviewItem {
    entry: RawEntry,
    kind: ContentKind,
    renderers: RendererSet,
    busy: Option<Arc<dyn BusyObserver>>,
    preview: OnceCell<PreviewResult>,
}

impl std::fmt::Debug for PreviewItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewItem")
            .field("entry", &self.entry)
            .field("kind", &self.kind)
            .field("preview_computed", &self.is_preview_computed())
            .finish()
    }
}

impl PreviewItem {
    /// Classify `entry` now; rendering waits for the first `preview()` call.
    pub fn from_entry(entry: RawEntry, classifier: &EntryClassifier, renderers: &RendererSet) -> Self {
        let kind = classifier.classify(&entry.name);
        Self::with_kind(entry, kind, renderers)
    }

    /// Build an item for an entry the caller has already classified.
    pub fn with_kind(entry: RawEntry, kind: ContentKind, renderers: &RendererSet) -> Self {
        Self {
            entry,
            kind,
            renderers: renderers.clone(),
            busy: None,
            preview: OnceCell::new(),
        }
    }

    pub fn with_busy_observer(mut self, observer: Arc<dyn BusyObserver>) -> Self {
        self.busy = Some(observer);
        self
    }

    pub fn entry(&self) -> &RawEntry {
        &self.entry
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn relative_path(&self) -> &str {
        &self.entry.relative_path
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn is_image(&self) -> bool {
        self.kind == ContentKind::Image
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.entry.bytes
    }

    pub fn descriptor(&self) -> EntryDescriptor {
        EntryDescriptor::new(&self.entry, self.kind)
    }

    /// Render on first call, then return the stored result.
    pub fn preview(&self) -> &PreviewResult {
        self.preview.get_or_init(|| self.render())
    }

    pub fn is_preview_computed(&self) -> bool {
        self.preview.get().is_some()
    }

    /// The stored result, without triggering a render.
    pub fn computed_preview(&self) -> Option<&PreviewResult> {
        self.preview.get()
    }

    /// Text or XML payload of a successful preview.
    pub fn text(&self) -> Option<&str> {
        self.preview().payload().and_then(PreviewPayload::as_text)
    }

    pub fn bitmap(&self) -> Option<&DecodedBitmap> {
        self.preview().payload().and_then(PreviewPayload::as_bitmap)
    }

    fn render(&self) -> PreviewResult {
        let renderer = match self.kind {
            ContentKind::Image => &self.renderers.image,
            ContentKind::Text => &self.renderers.text,
            ContentKind::Xml => &self.renderers.xml,
            ContentKind::Other => return PreviewResult::Success(PreviewPayload::Empty),
        };

        let _busy = BusyGuard::new(self.busy.as_deref(), &self.entry.name);
        let hint = self.entry.extension();
        match renderer.render(&self.entry.bytes, &hint) {
            Ok(payload) => PreviewResult::Success(payload),
            Err(e) => {
                debug!(
                    "preview_failed entry={} kind={} error={}",
                    self.entry.full_path(),
                    self.kind.as_str(),
                    e
                );
                PreviewResult::Failure(e)
            }
        }
    }
}
