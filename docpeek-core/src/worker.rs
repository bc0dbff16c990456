//! Background open: one worker thread, progress streamed over a channel.

use std::sync::Arc;
use std::thread::JoinHandle;

use log::warn;
use parking_lot::Mutex;

use crate::error::OpenError;
use crate::session::{CancelToken, ExtractionSession, SessionProgress, SessionSettings};

/// One enumeration step reported by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenEvent {
    pub current: usize,
    pub total: usize,
    pub name: String,
}

pub struct OpenJob {
    handle: Option<JoinHandle<(ExtractionSession, Result<(), OpenError>)>>,
    events: flume::Receiver<OpenEvent>,
    cancel: CancelToken,
    progress: Arc<Mutex<SessionProgress>>,
    settings: SessionSettings,
}

impl std::fmt::Debug for OpenJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenJob")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("progress", &*self.progress.lock())
            .finish()
    }
}

/// Move `session` onto a worker thread and open `bytes` there.
pub fn spawn_open(mut session: ExtractionSession, bytes: Vec<u8>, name_hint: Option<String>) -> OpenJob {
    let (tx, rx) = flume::unbounded::<OpenEvent>();
    let cancel = CancelToken::new();
    let progress = session.progress_handle();
    let settings = session.settings().clone();

    let worker_cancel = cancel.clone();
    let handle = std::thread::spawn(move || {
        let report = move |current: usize, total: usize, name: &str| {
            // The receiver may have been dropped; the open still runs to completion.
            let _ = tx.send(OpenEvent {
                current,
                total,
                name: name.to_string(),
            });
        };
        let result = session.open(&bytes, name_hint.as_deref(), &worker_cancel, Some(&report));
        (session, result)
    });

    OpenJob {
        handle: Some(handle),
        events: rx,
        cancel,
        progress,
        settings,
    }
}

impl OpenJob {
    /// Progress events; the channel closes when the worker finishes.
    pub fn events(&self) -> &flume::Receiver<OpenEvent> {
        &self.events
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn progress(&self) -> SessionProgress {
        self.progress.lock().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Block until the worker is done and hand back the session.
    pub fn wait(mut self) -> (ExtractionSession, Result<(), OpenError>) {
        let joined = match self.handle.take() {
            Some(handle) => handle.join().ok(),
            None => None,
        };
        match joined {
            Some(done) => done,
            None => {
                warn!("open_worker_panicked");
                (
                    ExtractionSession::new(self.settings.clone()),
                    Err(OpenError::IoFailure("open worker panicked".to_string())),
                )
            }
        }
    }
}
