//! Typed watcher over the storage substrate (C5, spec §4.3): parse,
//! throttle, recover, pause/resume/dismiss.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use crate::provider::{ChangeEvent, Operation, StorageProvider, SubscriptionId};

const DEFAULT_THROTTLE: Duration = Duration::from_millis(100);
const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Active,
    Recovering,
    Paused,
    Dismissed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherError {
    Dismissed,
}

impl std::fmt::Display for WatcherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatcherError::Dismissed => write!(f, "operation on a dismissed watcher"),
        }
    }
}

impl std::error::Error for WatcherError {}

pub type ParseFn<T> = Arc<dyn Fn(&[u8]) -> Result<T, String> + Send + Sync>;
pub type Callback<T> = Arc<dyn Fn(Option<T>, Option<T>, Option<String>) + Send + Sync>;

struct ThrottleState {
    pending: Option<ChangeEvent>,
    scheduled: bool,
}

/// A typed watcher over a single storage key.
pub struct Watcher<T: Clone + Send + Sync + 'static> {
    provider: Arc<dyn StorageProvider>,
    key: String,
    parse: ParseFn<T>,
    state: RwLock<WatcherState>,
    last_value: RwLock<Option<T>>,
    callbacks: RwLock<Vec<Callback<T>>>,
    subscription_id: Mutex<Option<SubscriptionId>>,
    throttle_duration: Duration,
    max_file_size: Option<u64>,
    skip_security_validation: bool,
    throttle: Mutex<ThrottleState>,
    /// Serializes `process()` so callback ordering for this watcher is
    /// strictly serial even when events arrive faster than they're handled.
    process_lock: tokio::sync::Mutex<()>,
}

impl<T: Clone + Send + Sync + 'static> Watcher<T> {
    /// Create and subscribe a new watcher. Starts `active`.
    pub fn new(provider: Arc<dyn StorageProvider>, key: impl Into<String>, parse: ParseFn<T>) -> Arc<Self> {
        Self::with_options(provider, key, parse, DEFAULT_THROTTLE, Some(DEFAULT_MAX_FILE_SIZE), false)
    }

    pub fn with_options(
        provider: Arc<dyn StorageProvider>,
        key: impl Into<String>,
        parse: ParseFn<T>,
        throttle_duration: Duration,
        max_file_size: Option<u64>,
        skip_security_validation: bool,
    ) -> Arc<Self> {
        let key = key.into();
        let watcher = Arc::new(Self {
            provider: provider.clone(),
            key: key.clone(),
            parse,
            state: RwLock::new(WatcherState::Active),
            last_value: RwLock::new(None),
            callbacks: RwLock::new(Vec::new()),
            subscription_id: Mutex::new(None),
            throttle_duration,
            max_file_size,
            skip_security_validation,
            throttle: Mutex::new(ThrottleState {
                pending: None,
                scheduled: false,
            }),
            process_lock: tokio::sync::Mutex::new(()),
        });

        let callback_watcher = watcher.clone();
        let subscription_id = provider.subscribe(
            &key.clone(),
            Arc::new(move |event: &ChangeEvent| {
                callback_watcher.clone().on_change(event.clone());
            }),
        );
        *watcher.subscription_id.lock().expect("watcher lock poisoned") = Some(subscription_id);
        watcher
    }

    pub fn on_change_callback(&self, callback: Callback<T>) {
        self.callbacks.write().expect("watcher lock poisoned").push(callback);
    }

    pub fn state(&self) -> WatcherState {
        *self.state.read().expect("watcher lock poisoned")
    }

    pub fn last_value(&self) -> Option<T> {
        self.last_value.read().expect("watcher lock poisoned").clone()
    }

    pub fn pause(&self) -> Result<(), WatcherError> {
        self.transition_unless_dismissed(WatcherState::Paused)
    }

    pub fn resume(&self) -> Result<(), WatcherError> {
        self.transition_unless_dismissed(WatcherState::Active)
    }

    pub fn dismiss(&self) -> Result<(), WatcherError> {
        let mut state = self.state.write().expect("watcher lock poisoned");
        if *state == WatcherState::Dismissed {
            return Err(WatcherError::Dismissed);
        }
        *state = WatcherState::Dismissed;
        drop(state);
        if let Some(id) = self.subscription_id.lock().expect("watcher lock poisoned").take() {
            self.provider.unsubscribe(id);
        }
        Ok(())
    }

    fn transition_unless_dismissed(&self, next: WatcherState) -> Result<(), WatcherError> {
        let mut state = self.state.write().expect("watcher lock poisoned");
        if *state == WatcherState::Dismissed {
            return Err(WatcherError::Dismissed);
        }
        *state = next;
        Ok(())
    }

    /// Dispatched from the provider's subscription callback. Applies
    /// throttling, then processes the most recent event once the timer fires.
    fn on_change(self: Arc<Self>, event: ChangeEvent) {
        if self.throttle_duration.is_zero() {
            tokio::spawn(async move { self.process(event).await });
            return;
        }

        let mut throttle = self.throttle.lock().expect("watcher lock poisoned");
        throttle.pending = Some(event);
        if throttle.scheduled {
            return;
        }
        throttle.scheduled = true;
        drop(throttle);

        let watcher = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(watcher.throttle_duration).await;
            let latest = {
                let mut throttle = watcher.throttle.lock().expect("watcher lock poisoned");
                throttle.scheduled = false;
                throttle.pending.take()
            };
            if let Some(event) = latest {
                watcher.process(event).await;
            }
        });
    }

    async fn process(self: Arc<Self>, event: ChangeEvent) {
        let _serial = self.process_lock.lock().await;
        if matches!(self.state(), WatcherState::Dismissed) {
            return;
        }
        if event.operation == Operation::Delete {
            return;
        }

        let bytes = match self.provider.get(&event.key).await {
            Some(bytes) => bytes,
            None => return,
        };

        if !self.skip_security_validation {
            if let Some(max) = self.max_file_size {
                if bytes.len() as u64 > max {
                    self.fail(format!("file exceeds max size {max} bytes"));
                    return;
                }
            }
        }

        match (self.parse)(&bytes) {
            Ok(new_value) => {
                let recovering = self.state() == WatcherState::Recovering;
                let old_value = self.last_value();
                *self.last_value.write().expect("watcher lock poisoned") = Some(new_value.clone());
                if recovering {
                    let _ = self.transition_unless_dismissed(WatcherState::Active);
                    tracing::info!(key = %self.key, "watcher recovered");
                }
                self.dispatch(old_value, Some(new_value), None);
            }
            Err(err) => self.fail(err),
        }
    }

    fn fail(&self, err: String) {
        let _ = self.transition_unless_dismissed(WatcherState::Recovering);
        let old = self.last_value();
        tracing::warn!(key = %self.key, error = %err, "watcher parse/security failure");
        self.dispatch(old.clone(), old, Some(err));
    }

    fn dispatch(&self, old: Option<T>, new: Option<T>, err: Option<String>) {
        if self.state() == WatcherState::Paused {
            return;
        }
        let callbacks = self.callbacks.read().expect("watcher lock poisoned").clone();
        for callback in callbacks {
            callback(old.clone(), new.clone(), err.clone());
        }
    }
}
