//! The photo list view: the sink search tasks report into.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::adapter::PhotoListAdapter;
use crate::model::types::{EmptyMessage, SearchType};

/// The screen hosting a view. Only the loading indicator is reachable from here.
pub trait Screen: Send + Sync {
    fn set_loading_indicator(&self, loading: bool);
}

/// State of the photo grid as seen by search tasks.
///
/// Tasks hold it through a `Weak`, so tearing the view down is never blocked
/// by a search in flight. Each search claims a generation when it starts; only
/// the latest one may reset the flags when it completes.
#[derive(Default)]
pub struct PhotoView {
    adapter: PhotoListAdapter,
    generation: AtomicU64,
    search_running: AtomicBool,
    no_more_results: AtomicBool,
    empty_message: Mutex<Option<EmptyMessage>>,
    screen: Mutex<Option<Weak<dyn Screen>>>,
}

impl PhotoView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adapter(&self) -> &PhotoListAdapter {
        &self.adapter
    }

    /// Marks a new search as running and returns its generation.
    pub fn begin_search(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.set_search_running(true);
        generation
    }

    /// False once a newer search has started on this view.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    pub fn set_search_running(&self, running: bool) {
        self.search_running.store(running, Ordering::Release);
    }

    pub fn is_search_running(&self) -> bool {
        self.search_running.load(Ordering::Acquire)
    }

    /// The last page came back empty; there is nothing older to fetch.
    pub fn set_no_more_results(&self, done: bool) {
        self.no_more_results.store(done, Ordering::Release);
    }

    pub fn has_no_more_results(&self) -> bool {
        self.no_more_results.load(Ordering::Acquire)
    }

    pub fn set_empty_message(&self, mode: SearchType) {
        *self.empty_message.lock() = Some(mode.empty_message());
    }

    pub fn clear_empty_message(&self) {
        *self.empty_message.lock() = None;
    }

    pub fn empty_message(&self) -> Option<EmptyMessage> {
        *self.empty_message.lock()
    }

    /// Keeps a non-owning link to the hosting screen.
    pub fn attach_screen(&self, screen: &Arc<dyn Screen>) {
        *self.screen.lock() = Some(Arc::downgrade(screen));
    }

    /// The hosting screen, if it is still around.
    pub fn screen(&self) -> Option<Arc<dyn Screen>> {
        self.screen.lock().as_ref().and_then(Weak::upgrade)
    }
}
