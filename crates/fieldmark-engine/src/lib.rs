pub mod cli;
pub mod config;
pub mod session;
pub mod storage;

pub use fieldmark_common::protocol;

pub use session::{PageEvent, PageHandle, PageSession, SessionError};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
