//! One page of photo search, run in the background.
//!
//! A [`PhotoSearchTask`] goes through three phases:
//!
//! 1. **start**, on the caller's (UI) thread: flags the view as searching;
//! 2. **background**, on the tokio runtime: debounce, one blocking remote
//!    call, merge of the page into the view's list;
//! 3. **completion**, posted back to the [`UiLoop`](crate::ui::UiLoop):
//!    clears the loading indicator, redraws or shows the empty state, and
//!    clears the searching flag. Skipped when a newer search has started on
//!    the same view since.
//!
//! The view is only ever held weakly. Cancellation is checked after the
//! debounce and after the remote call; a call already in flight always runs
//! to the end.

pub mod cancel;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use tokio::runtime::Handle;
use tracing::{Instrument, Span};

use crate::model::types::{Account, SearchRequest, SearchResult, SearchType};
use crate::remote::{RemoteError, SearchOperation};
use crate::storage::FileStore;
use crate::ui::{PhotoView, UiHandle};

pub use cancel::CancelToken;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(5000);
pub const DEFAULT_PAGE_MULTIPLIER: usize = 15;

/// Knobs for a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSettings {
    /// Delay before the remote call, so bursts of scroll events collapse into one search.
    pub debounce: Duration,
    /// Page size is this many rows of the grid.
    pub page_multiplier: usize,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            page_multiplier: DEFAULT_PAGE_MULTIPLIER,
        }
    }
}

/// Fetches one page of photos older than the view's watermark and merges it
/// into the view's list.
pub struct PhotoSearchTask {
    column_count: usize,
    account: Account,
    view: Weak<PhotoView>,
    operation: Arc<dyn SearchOperation>,
    store: Arc<FileStore>,
    settings: TaskSettings,
    cancel: CancelToken,
    generation: u64,
    span: Span,
}

impl PhotoSearchTask {
    pub fn new(
        column_count: usize,
        view: &Arc<PhotoView>,
        account: Account,
        operation: Arc<dyn SearchOperation>,
        store: Arc<FileStore>,
    ) -> Self {
        let span = tracing::info_span!("photo_search", account = %account.name());
        Self {
            column_count,
            account,
            view: Arc::downgrade(view),
            operation,
            store,
            settings: TaskSettings::default(),
            cancel: CancelToken::new(),
            generation: 0,
            span,
        }
    }

    pub fn with_settings(mut self, settings: TaskSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Items per page: multiplier times grid columns (at least one column).
    pub fn limit(&self) -> usize {
        self.settings
            .page_multiplier
            .saturating_mul(self.column_count.max(1))
    }

    /// Runs the start phase here, then hands the rest to `runtime`.
    ///
    /// The completion phase is posted to `ui` and runs exactly once, whatever
    /// the outcome. Must be called from the UI thread.
    pub fn execute(mut self, runtime: &Handle, ui: &UiHandle) -> TaskHandle {
        let started = self.on_start();
        let view_alive = started.is_some();
        self.generation = started.unwrap_or_default();
        let cancel = self.cancel.clone();
        let finished = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = bounded(1);

        let span = self.span.clone();
        let task = Arc::new(self);
        let ui = ui.clone();
        let finished_flag = Arc::clone(&finished);
        let body = async move {
            let result = if view_alive {
                Arc::clone(&task).run_background().await
            } else {
                SearchResult::aborted()
            };
            let posted = ui.post(move || {
                task.on_complete(&result);
                finished_flag.store(true, Ordering::Release);
                let _ = done_tx.send(result);
            });
            if !posted {
                tracing::debug!("photo_search_ui_gone");
            }
        };
        runtime.spawn(body.instrument(span));

        TaskHandle {
            cancel,
            finished,
            done: done_rx,
        }
    }

    /// Claims a search generation on the view; `None` when the view is gone.
    fn on_start(&self) -> Option<u64> {
        let _span = self.span.enter();
        let Some(view) = self.view.upgrade() else {
            tracing::debug!("photo_search_start view_gone");
            return None;
        };
        let generation = view.begin_search();
        tracing::info!(columns = self.column_count, generation, "photo_search_start");
        Some(generation)
    }

    async fn run_background(self: Arc<Self>) -> SearchResult {
        if !self.debounce().await {
            tracing::info!(phase = "debounce", "photo_search_cancelled");
            return SearchResult::aborted();
        }

        let worker = Arc::clone(&self);
        let span = self.span.clone();
        let fetch = move || {
            let _span = span.enter();
            worker.fetch_page()
        };
        match tokio::task::spawn_blocking(fetch).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!("photo search worker died: {err}");
                SearchResult::failed(RemoteError::Other(err.to_string()))
            }
        }
    }

    /// Sleeps out the debounce delay. False when cancelled, including during the wait.
    async fn debounce(&self) -> bool {
        let wait = self.settings.debounce;
        if !wait.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.cancel.cancelled() => {}
            }
        }
        !self.cancel.is_cancelled()
    }

    /// Blocking part of the background phase: request, remote call, merge.
    fn fetch_page(&self) -> SearchResult {
        let Some(view) = self.view.upgrade() else {
            tracing::debug!("photo_search view_gone before request");
            return SearchResult::aborted();
        };
        if self.cancel.is_cancelled() {
            tracing::info!(phase = "request", "photo_search_cancelled");
            return SearchResult::aborted();
        }

        let Some(request) = SearchRequest::from_watermark(self.limit(), view.adapter().last_timestamp())
        else {
            return SearchResult::failed(RemoteError::Other("page size must be positive".into()));
        };
        drop(view);

        tracing::info!(limit = request.limit, cursor = ?request.cursor, "photo_search_request");
        let result = self.operation.execute(&self.account, &request);
        if !result.success {
            return result;
        }

        if self.cancel.is_cancelled() {
            tracing::info!(phase = "response", discarded = result.items.len(), "photo_search_cancelled");
            return SearchResult::aborted();
        }
        let Some(view) = self.view.upgrade() else {
            tracing::debug!("photo_search view_gone after response");
            return SearchResult::aborted();
        };

        if result.items.is_empty() {
            view.set_no_more_results(true);
            tracing::info!("photo_search_no_more");
        } else {
            let adapter = view.adapter();
            adapter.set_data(&result.items, SearchType::PhotoSearch, &self.store, None, false);
            tracing::info!(count = result.items.len(), total = adapter.len(), "photo_search_merge");
        }
        result
    }

    fn on_complete(&self, result: &SearchResult) {
        let _span = self.span.enter();
        let Some(view) = self.view.upgrade() else {
            tracing::debug!("photo_search_complete view_gone");
            return;
        };
        let cancelled = self.cancel.is_cancelled();
        if !view.is_current(self.generation) {
            tracing::debug!(generation = self.generation, cancelled, "photo_search_complete superseded");
            return;
        }

        if let Some(screen) = view.screen() {
            screen.set_loading_indicator(false);
        }

        if result.success && !result.items.is_empty() && !cancelled {
            view.clear_empty_message();
            view.adapter().notify_changed();
        } else {
            view.set_empty_message(SearchType::PhotoSearch);
        }
        view.set_search_running(false);

        tracing::info!(
            success = result.success,
            items = result.items.len(),
            cancelled,
            "photo_search_complete"
        );
    }
}

/// Caller's side of a running task, used to cancel it and collect its result.
pub struct TaskHandle {
    cancel: CancelToken,
    finished: Arc<AtomicBool>,
    done: Receiver<SearchResult>,
}

impl TaskHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// True once the completion phase has run on the UI loop.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Takes the result if completion already ran. Yields it only once.
    pub fn try_result(&self) -> Option<SearchResult> {
        self.done.try_recv().ok()
    }

    /// Blocks until completion ran. Only useful when the UI loop is pumped on another thread.
    pub fn wait(&self, timeout: Duration) -> Option<SearchResult> {
        match self.done.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
