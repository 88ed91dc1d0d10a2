//! Contract/Provider registry (component C6, §4.1).
//!
//! A [`Registry`] maps a deterministic key (e.g. `db:primary:postgres`) to a
//! resolved, type-erased service instance. Resolution is idempotent and
//! race-safe: construction happens outside the write lock is never the
//! goal here (construction side effects like opening a connection must
//! happen exactly once), so the slow path takes a write lock and
//! double-checks before constructing.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// The five contract kinds named in the data model (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    Database,
    Cache,
    Auth,
    Http,
    Core,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContractKind::Database => "db",
            ContractKind::Cache => "cache",
            ContractKind::Auth => "auth",
            ContractKind::Http => "http",
            ContractKind::Core => "core",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub enum RegistryError {
    /// The driver named by a contract is not known to the registry.
    UnknownDriver(String),
    /// Construction failed for a reason specific to the driver.
    ConstructionFailed(String),
    /// An existing entry under this key is a different type than requested.
    TypeMismatch(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::UnknownDriver(d) => write!(f, "unknown driver: {d}"),
            RegistryError::ConstructionFailed(msg) => write!(f, "construction failed: {msg}"),
            RegistryError::TypeMismatch(key) => write!(f, "type mismatch resolving key '{key}'"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// A declarative configuration that resolves to a service instance via a
/// deterministic key.
pub trait Contract: Send + Sync {
    fn kind(&self) -> ContractKind;

    /// Computed from the contract's identifying fields, e.g.
    /// `db:{name}:{driver_name}`. Equal contracts MUST produce equal keys.
    fn key(&self) -> String;
}

/// One kind's map from deterministic key to resolved, type-erased instance.
#[derive(Default)]
pub struct Registry {
    instances: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Resolve `key`, constructing via `construct` on a cache miss.
    ///
    /// On hit, the cached instance is returned without running `construct`.
    /// Construction failure leaves no entry behind.
    pub fn resolve<S, F>(&self, key: &str, construct: F) -> Result<Arc<S>, RegistryError>
    where
        S: Any + Send + Sync + 'static,
        F: FnOnce() -> Result<S, RegistryError>,
    {
        if let Some(existing) = self.instances.read().expect("registry lock poisoned").get(key) {
            return downcast(existing.clone(), key);
        }

        let mut guard = self.instances.write().expect("registry lock poisoned");
        if let Some(existing) = guard.get(key) {
            return downcast(existing.clone(), key);
        }

        let service = construct()?;
        let instance: Arc<dyn Any + Send + Sync> = Arc::new(service);
        guard.insert(key.to_string(), instance.clone());
        downcast(instance, key)
    }

    /// Whether `key` has already been resolved.
    pub fn contains(&self, key: &str) -> bool {
        self.instances.read().expect("registry lock poisoned").contains_key(key)
    }

    /// Test/shutdown helper: drops every resolved instance.
    pub fn clear(&self) {
        self.instances.write().expect("registry lock poisoned").clear();
    }
}

fn downcast<S: Any + Send + Sync + 'static>(
    instance: Arc<dyn Any + Send + Sync>,
    key: &str,
) -> Result<Arc<S>, RegistryError> {
    instance
        .downcast::<S>()
        .map_err(|_| RegistryError::TypeMismatch(key.to_string()))
}

/// A thin, swappable indirection to a not-yet-resolved service (§4.1).
///
/// Lets an engine be configured with `set_database(provider)` before the
/// concrete driver is known, and lets contracts be replaced without
/// touching engine code.
pub struct Provider<S: ?Sized> {
    inner: RwLock<Option<Arc<S>>>,
}

impl<S: ?Sized> Default for Provider<S> {
    fn default() -> Self {
        Provider {
            inner: RwLock::new(None),
        }
    }
}

impl<S: ?Sized> Provider<S> {
    pub fn empty() -> Self {
        Provider::default()
    }

    pub fn set(&self, service: Arc<S>) {
        *self.inner.write().expect("provider lock poisoned") = Some(service);
    }

    pub fn get(&self) -> Option<Arc<S>> {
        self.inner.read().expect("provider lock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget(u32);

    #[test]
    fn resolve_constructs_once_per_key() {
        let registry = Registry::new();
        let calls = std::sync::atomic::AtomicU32::new(0);
        let build = || {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Widget(7))
        };
        let a = registry.resolve("widget:a", build).unwrap();
        let b = registry.resolve("widget:a", || Ok(Widget(99))).unwrap();
        assert_eq!(a.0, 7);
        assert_eq!(b.0, 7);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn resolve_propagates_construction_error_without_caching() {
        let registry = Registry::new();
        let first: Result<Arc<Widget>, RegistryError> =
            registry.resolve("widget:b", || Err(RegistryError::ConstructionFailed("no creds".into())));
        assert!(first.is_err());
        assert!(!registry.contains("widget:b"));
    }

    #[test]
    fn provider_returns_none_until_configured() {
        let provider: Provider<Widget> = Provider::empty();
        assert!(provider.get().is_none());
        provider.set(Arc::new(Widget(1)));
        assert_eq!(provider.get().unwrap().0, 1);
    }
}
