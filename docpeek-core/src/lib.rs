pub mod classify;
pub mod config;
pub mod container;
pub mod entry;
pub mod error;
pub mod export;
pub mod item;
pub mod session;
pub mod worker;

pub use classify::{ContentKind, EntryClassifier, ExtensionSets};
pub use config::{DocpeekConfig, EntryFilter};
pub use container::{ArchiveFormat, ArchiveHandle, ContainerOpener};
pub use entry::{EntryDescriptor, RawEntry};
pub use error::OpenError;
pub use export::{export_items, ExportOptions, ExportReport};
pub use item::{BusyObserver, PreviewItem, PreviewResult};
pub use session::{CancelToken, EntryFailure, ExtractionSession, ProgressFn, SessionProgress, SessionSettings, SessionState};
pub use worker::{spawn_open, OpenEvent, OpenJob};

// Re-export codecs for front ends
pub use docpeek_codecs as codecs;
