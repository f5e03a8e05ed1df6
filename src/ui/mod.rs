//! UI-facing state: the list adapter, the view tasks report into, and the
//! queue that carries work back onto the UI thread.

pub mod adapter;
pub mod event_loop;
pub mod time_parser;
pub mod view;

pub use adapter::PhotoListAdapter;
pub use event_loop::{UiHandle, UiLoop};
pub use view::{PhotoView, Screen};
