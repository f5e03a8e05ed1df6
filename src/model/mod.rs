//! Data types shared by the search task, the list adapter and the remote layer.

pub mod types;
