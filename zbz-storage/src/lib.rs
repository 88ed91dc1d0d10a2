//! Reactive storage substrate (C4) and typed watcher state machine (C5).

pub mod provider;
pub mod watcher;

pub use provider::{
    configure, storage, ChangeCallback, ChangeEvent, FilesystemProvider, InMemoryProvider, Operation, StatInfo,
    StorageError, StorageProvider, SubscriptionId,
};
pub use watcher::{Callback, ParseFn, Watcher, WatcherError, WatcherState};
