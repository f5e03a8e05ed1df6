//! Decides when to fetch the next page of photos.

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::model::types::Account;
use crate::remote::SearchOperation;
use crate::storage::FileStore;
use crate::task::{PhotoSearchTask, TaskHandle, TaskSettings};
use crate::ui::{PhotoView, UiHandle};

pub const DEFAULT_PREFETCH_ROWS: usize = 2;

/// Owns the search task currently feeding a [`PhotoView`] and starts new
/// ones on scroll or refresh. Lives on the UI thread.
pub struct PhotoPager {
    view: Arc<PhotoView>,
    account: Account,
    operation: Arc<dyn SearchOperation>,
    store: Arc<FileStore>,
    settings: TaskSettings,
    prefetch_rows: usize,
    runtime: Handle,
    ui: UiHandle,
    current: Option<TaskHandle>,
}

impl PhotoPager {
    pub fn new(
        view: Arc<PhotoView>,
        account: Account,
        operation: Arc<dyn SearchOperation>,
        store: Arc<FileStore>,
        runtime: Handle,
        ui: UiHandle,
    ) -> Self {
        Self {
            view,
            account,
            operation,
            store,
            settings: TaskSettings::default(),
            prefetch_rows: DEFAULT_PREFETCH_ROWS,
            runtime,
            ui,
            current: None,
        }
    }

    pub fn with_settings(mut self, settings: TaskSettings, prefetch_rows: usize) -> Self {
        self.settings = settings;
        self.prefetch_rows = prefetch_rows;
        self
    }

    pub fn view(&self) -> &Arc<PhotoView> {
        &self.view
    }

    pub fn current(&self) -> Option<&TaskHandle> {
        self.current.as_ref()
    }

    fn busy(&self) -> bool {
        self.view.is_search_running() || self.current.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Starts the next page unless one is loading or the listing is exhausted.
    pub fn load_more(&mut self, column_count: usize) -> bool {
        if self.busy() || self.view.has_no_more_results() {
            return false;
        }
        self.start(column_count);
        true
    }

    /// Scroll hook: loads more once the last visible index gets within
    /// `prefetch_rows` grid rows of the end of the list.
    pub fn on_scrolled(&mut self, last_visible: usize, column_count: usize) -> bool {
        let total = self.view.adapter().len();
        let margin = self.prefetch_rows.saturating_mul(column_count.max(1));
        if last_visible.saturating_add(margin).saturating_add(1) < total {
            return false;
        }
        self.load_more(column_count)
    }

    /// Drops what is listed and starts over from the newest photos.
    pub fn refresh(&mut self, column_count: usize) -> &TaskHandle {
        self.shutdown();
        self.view.adapter().clear();
        self.view.set_no_more_results(false);
        self.view.clear_empty_message();
        if let Some(screen) = self.view.screen() {
            screen.set_loading_indicator(true);
        }
        self.start(column_count)
    }

    /// Cancels the running task, if any. Its completion still runs on the UI loop.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.cancel();
        }
    }

    fn start(&mut self, column_count: usize) -> &TaskHandle {
        if let Some(previous) = self.current.take() {
            previous.cancel();
        }
        let task = PhotoSearchTask::new(
            column_count,
            &self.view,
            self.account.clone(),
            Arc::clone(&self.operation),
            Arc::clone(&self.store),
        )
        .with_settings(self.settings);
        self.current.insert(task.execute(&self.runtime, &self.ui))
    }
}

impl Drop for PhotoPager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
