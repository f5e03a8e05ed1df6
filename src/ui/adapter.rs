//! List state behind the photo grid.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::model::types::{FileItem, MimeFilter, SearchType};
use crate::storage::FileStore;

#[derive(Default)]
struct ListState {
    items: Vec<FileItem>,
    paths: HashSet<String>,
    mode: SearchType,
    /// Unix seconds of the oldest item shown; the next page continues below it.
    last_timestamp: i64,
}

/// Ordered file list with the pagination watermark.
///
/// `set_data` and `last_timestamp` may be called from a worker thread; the
/// rest is meant for the UI thread but is synchronized all the same.
#[derive(Default)]
pub struct PhotoListAdapter {
    state: RwLock<ListState>,
    revision: AtomicU64,
}

impl PhotoListAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watermark for the next page, 0 when nothing has been loaded.
    pub fn last_timestamp(&self) -> i64 {
        self.state.read().last_timestamp
    }

    /// Starts paging below `seconds` instead of at the newest file.
    pub fn seed_watermark(&self, seconds: i64) {
        let mut state = self.state.write();
        if state.items.is_empty() {
            state.last_timestamp = seconds.max(0);
        }
    }

    /// Merges a page into the list and the file cache. Returns how many items were added.
    ///
    /// With `replace` the current contents are dropped first. Items already
    /// listed (same remote path) are skipped. A cache write failure is logged
    /// and does not keep the page out of the list.
    pub fn set_data(
        &self,
        items: &[FileItem],
        mode: SearchType,
        store: &FileStore,
        filter: Option<&MimeFilter>,
        replace: bool,
    ) -> usize {
        let owned: Vec<FileItem> = items
            .iter()
            .filter(|item| filter.is_none_or(|f| f.matches(item)))
            .cloned()
            .collect();
        if let Err(err) = store.save_files(&owned) {
            tracing::warn!("caching {} files for {} failed: {err:#}", owned.len(), store.account());
        }

        let mut state = self.state.write();
        if replace {
            state.items.clear();
            state.paths.clear();
            state.last_timestamp = 0;
        }
        state.mode = mode;

        let mut added = 0;
        for item in owned {
            if state.paths.insert(item.remote_path.clone()) {
                state.items.push(item);
                added += 1;
            }
        }

        if mode.is_photo_search() {
            state.items.sort_by(|a, b| b.modified_ms.cmp(&a.modified_ms));
        }
        if let Some(oldest) = state.items.iter().map(|i| i.modified_ms).min() {
            state.last_timestamp = oldest / 1000;
        }
        added
    }

    /// Signals that the list changed and should be redrawn.
    pub fn notify_changed(&self) {
        let rev = self.revision.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(revision = rev, "list_changed");
    }

    /// Number of `notify_changed` calls so far.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn current_items(&self) -> Vec<FileItem> {
        self.state.read().items.clone()
    }

    pub fn mode(&self) -> SearchType {
        self.state.read().mode
    }

    pub fn len(&self) -> usize {
        self.state.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.items.clear();
        state.paths.clear();
        state.last_timestamp = 0;
    }
}
