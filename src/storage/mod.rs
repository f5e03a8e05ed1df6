//! Local cache of files seen by searches.

pub mod sqlite;

pub use sqlite::FileStore;
