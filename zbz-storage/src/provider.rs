//! The storage substrate (C4): a provider-abstracted key/value store with
//! change-event fan-out, plus in-memory and filesystem reference
//! implementations.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::{DateTime, Utc};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type SubscriptionId = u64;
pub type ChangeCallback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub key: String,
    pub operation: Operation,
    pub timestamp: DateTime<Utc>,
    pub etag: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct StatInfo {
    pub size: u64,
    pub etag: Option<String>,
    pub modified: DateTime<Utc>,
}

/// Provider-abstracted key/value store. Implementations MUST emit a
/// [`ChangeEvent`] to every subscriber whose prefix matches on every
/// successful `set`/`delete` — `operation` is `Create` or `Update` depending
/// on whether the key existed beforehand.
///
/// TTL may be honored by active deletion or lazy expiry on read; either is
/// permitted, but an expired key must read back as absent.
pub trait StorageProvider: Send + Sync + 'static {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<Bytes>>;
    fn set<'a>(&'a self, key: &'a str, value: Bytes, ttl: Option<Duration>) -> BoxFuture<'a, ()>;
    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ()>;
    fn exists<'a>(&'a self, key: &'a str) -> BoxFuture<'a, bool>;
    fn list<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Vec<String>>;
    fn stat<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<StatInfo>>;
    fn subscribe(&self, prefix: &str, callback: ChangeCallback) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId);
    fn close(&self) -> BoxFuture<'_, ()>;
}

struct Subscription {
    id: SubscriptionId,
    prefix: String,
    callback: ChangeCallback,
}

fn notify(subscriptions: &RwLock<Vec<Subscription>>, event: &ChangeEvent) {
    let guard = subscriptions.read().expect("subscription lock poisoned");
    for sub in guard.iter() {
        if event.key.starts_with(&sub.prefix) {
            (sub.callback)(event);
        }
    }
}

/// In-memory reference provider. Entries carry an optional TTL honored by
/// lazy expiry on `get`/`exists`/`list`.
pub struct InMemoryProvider {
    entries: RwLock<HashMap<String, (Bytes, Instant, Option<Duration>)>>,
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn is_expired(entry: &(Bytes, Instant, Option<Duration>)) -> bool {
        match entry.2 {
            Some(ttl) => entry.1.elapsed() >= ttl,
            None => false,
        }
    }
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageProvider for InMemoryProvider {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<Bytes>> {
        Box::pin(async move {
            let mut guard = self.entries.write().expect("storage lock poisoned");
            match guard.get(key) {
                Some(entry) if Self::is_expired(entry) => {
                    guard.remove(key);
                    None
                }
                Some((value, _, _)) => Some(value.clone()),
                None => None,
            }
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: Bytes, ttl: Option<Duration>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let existed = {
                let guard = self.entries.read().expect("storage lock poisoned");
                guard.get(key).map(|e| !Self::is_expired(e)).unwrap_or(false)
            };
            let size = value.len() as u64;
            self.entries
                .write()
                .expect("storage lock poisoned")
                .insert(key.to_string(), (value, Instant::now(), ttl));
            notify(
                &self.subscriptions,
                &ChangeEvent {
                    key: key.to_string(),
                    operation: if existed { Operation::Update } else { Operation::Create },
                    timestamp: Utc::now(),
                    etag: None,
                    size: Some(size),
                },
            );
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let existed = self.entries.write().expect("storage lock poisoned").remove(key).is_some();
            if existed {
                notify(
                    &self.subscriptions,
                    &ChangeEvent {
                        key: key.to_string(),
                        operation: Operation::Delete,
                        timestamp: Utc::now(),
                        etag: None,
                        size: None,
                    },
                );
            }
        })
    }

    fn exists<'a>(&'a self, key: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move { self.get(key).await.is_some() })
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Vec<String>> {
        Box::pin(async move {
            let mut guard = self.entries.write().expect("storage lock poisoned");
            let expired: Vec<String> = guard
                .iter()
                .filter(|(_, entry)| Self::is_expired(entry))
                .map(|(k, _)| k.clone())
                .collect();
            for key in expired {
                guard.remove(&key);
            }
            guard.keys().filter(|k| k.starts_with(prefix)).cloned().collect()
        })
    }

    fn stat<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<StatInfo>> {
        Box::pin(async move {
            let guard = self.entries.read().expect("storage lock poisoned");
            match guard.get(key) {
                Some(entry) if !Self::is_expired(entry) => Some(StatInfo {
                    size: entry.0.len() as u64,
                    etag: None,
                    modified: Utc::now(),
                }),
                _ => None,
            }
        })
    }

    fn subscribe(&self, prefix: &str, callback: ChangeCallback) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscriptions.write().expect("subscription lock poisoned").push(Subscription {
            id,
            prefix: prefix.to_string(),
            callback,
        });
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions
            .write()
            .expect("subscription lock poisoned")
            .retain(|s| s.id != id);
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.entries.write().expect("storage lock poisoned").clear();
        })
    }
}

/// Filesystem reference provider. Each key maps to a file under `base_dir`;
/// TTL is tracked in a sidecar `<key>.ttl` file holding an RFC3339 expiry
/// timestamp, checked lazily on read.
pub struct FilesystemProvider {
    base_dir: std::path::PathBuf,
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl FilesystemProvider {
    pub fn new(base_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn data_path(&self, key: &str) -> std::path::PathBuf {
        self.base_dir.join(key)
    }

    fn ttl_path(&self, key: &str) -> std::path::PathBuf {
        self.base_dir.join(format!("{key}.ttl"))
    }

    async fn is_expired(&self, key: &str) -> bool {
        match tokio::fs::read_to_string(self.ttl_path(key)).await {
            Ok(contents) => match DateTime::parse_from_rfc3339(contents.trim()) {
                Ok(expires_at) => Utc::now() > expires_at,
                Err(_) => false,
            },
            Err(_) => false,
        }
    }

    async fn purge(&self, key: &str) {
        let _ = tokio::fs::remove_file(self.data_path(key)).await;
        let _ = tokio::fs::remove_file(self.ttl_path(key)).await;
    }
}

impl StorageProvider for FilesystemProvider {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<Bytes>> {
        Box::pin(async move {
            if self.is_expired(key).await {
                self.purge(key).await;
                return None;
            }
            tokio::fs::read(self.data_path(key)).await.ok().map(Bytes::from)
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: Bytes, ttl: Option<Duration>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let existed = tokio::fs::metadata(self.data_path(key)).await.is_ok();
            if let Some(parent) = self.data_path(key).parent() {
                let _ = tokio::fs::create_dir_all(parent).await;
            }
            let size = value.len() as u64;
            let _ = tokio::fs::write(self.data_path(key), &value).await;
            match ttl {
                Some(ttl) => {
                    let expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default();
                    let _ = tokio::fs::write(self.ttl_path(key), expires_at.to_rfc3339()).await;
                }
                None => {
                    let _ = tokio::fs::remove_file(self.ttl_path(key)).await;
                }
            }
            notify(
                &self.subscriptions,
                &ChangeEvent {
                    key: key.to_string(),
                    operation: if existed { Operation::Update } else { Operation::Create },
                    timestamp: Utc::now(),
                    etag: None,
                    size: Some(size),
                },
            );
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let existed = tokio::fs::remove_file(self.data_path(key)).await.is_ok();
            let _ = tokio::fs::remove_file(self.ttl_path(key)).await;
            if existed {
                notify(
                    &self.subscriptions,
                    &ChangeEvent {
                        key: key.to_string(),
                        operation: Operation::Delete,
                        timestamp: Utc::now(),
                        etag: None,
                        size: None,
                    },
                );
            }
        })
    }

    fn exists<'a>(&'a self, key: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move { self.get(key).await.is_some() })
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Vec<String>> {
        Box::pin(async move {
            let mut out = Vec::new();
            let mut entries = match tokio::fs::read_dir(&self.base_dir).await {
                Ok(entries) => entries,
                Err(_) => return out,
            };
            while let Ok(Some(entry)) = entries.next_entry().await {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.ends_with(".ttl") {
                    continue;
                }
                if name.starts_with(prefix) && !self.is_expired(&name).await {
                    out.push(name);
                }
            }
            out
        })
    }

    fn stat<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<StatInfo>> {
        Box::pin(async move {
            if self.is_expired(key).await {
                return None;
            }
            let metadata = tokio::fs::metadata(self.data_path(key)).await.ok()?;
            let modified: DateTime<Utc> = metadata.modified().ok().map(DateTime::from).unwrap_or_else(Utc::now);
            Some(StatInfo {
                size: metadata.len(),
                etag: None,
                modified,
            })
        })
    }

    fn subscribe(&self, prefix: &str, callback: ChangeCallback) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscriptions.write().expect("subscription lock poisoned").push(Subscription {
            id,
            prefix: prefix.to_string(),
            callback,
        });
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions
            .write()
            .expect("subscription lock poisoned")
            .retain(|s| s.id != id);
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {})
    }
}

// ---------------------------------------------------------------------------
// Process-wide singleton. Unlike the logger (C1), storage has no default
// provider: a read before `configure()` fails with `StorageError::NotConfigured`.
// ---------------------------------------------------------------------------

use zbz_core::registry::Provider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    NotConfigured,
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::NotConfigured => write!(f, "storage provider not configured"),
        }
    }
}

impl std::error::Error for StorageError {}

static PROVIDER: std::sync::OnceLock<Provider<dyn StorageProvider>> = std::sync::OnceLock::new();

fn provider_cell() -> &'static Provider<dyn StorageProvider> {
    PROVIDER.get_or_init(Provider::empty)
}

/// Replace the process-wide storage provider.
pub fn configure(provider: Arc<dyn StorageProvider>) {
    provider_cell().set(provider);
}

/// The process-wide storage provider, or an error if `configure` was never called.
pub fn storage() -> Result<Arc<dyn StorageProvider>, StorageError> {
    provider_cell().get().ok_or(StorageError::NotConfigured)
}
