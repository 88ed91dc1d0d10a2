//! Typed hook bus: event-type strings mapped to ordered lists of byte
//! handlers, with serialization happening once at the emission boundary.
//!
//! Dispatch within a type is strictly sequential and insertion-ordered —
//! unlike a typical pub/sub bus, handlers are awaited in place rather than
//! spawned, so side effects (e.g. "persist, then notify") are observable in
//! registration order. A handler that errors is logged and swallowed: hook
//! errors must never propagate back into the emitter, since the logger
//! itself emits through this bus and an unswallowed error there would
//! recurse.

pub mod envelope;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub use envelope::Envelope;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
type RawHandler = Arc<dyn Fn(Vec<u8>) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct HookStats {
    pub total_handlers: usize,
    pub per_type: HashMap<String, usize>,
}

struct Inner {
    handlers: RwLock<HashMap<String, Vec<RawHandler>>>,
}

/// In-process typed pub/sub bus. Cheap to clone; all clones share the same
/// handler table.
#[derive(Clone)]
pub struct HookBus {
    inner: Arc<Inner>,
}

impl HookBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                handlers: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register a handler for `event_type`. The handler receives the typed
    /// payload only — envelope metadata is consumed internally, matching the
    /// "user handler is `(T) -> err`" contract.
    pub fn on<T, F, Fut>(&self, event_type: impl Into<String>, handler: F)
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let raw: RawHandler = Arc::new(move |bytes: Vec<u8>| {
            let handler = handler.clone();
            Box::pin(async move {
                let envelope: Envelope<T> =
                    serde_json::from_slice(&bytes).map_err(|e| format!("envelope decode failed: {e}"))?;
                handler(envelope.data).await
            })
        });
        self.push(event_type.into(), raw);
    }

    /// Register a transform handler: deserializes `TIn`, applies `f`, and on
    /// success re-emits the result under `out_type`. The re-emitted envelope
    /// inherits the original timestamp and metadata; its source is the
    /// original source prefixed `"transform-"`.
    pub fn transform<TIn, TOut, F, Fut>(&self, in_type: impl Into<String>, out_type: impl Into<String>, f: F)
    where
        TIn: DeserializeOwned + Send + 'static,
        TOut: Serialize + Send + 'static,
        F: Fn(TIn) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TOut, String>> + Send + 'static,
    {
        let bus = self.clone();
        let out_type = out_type.into();
        let f = Arc::new(f);
        let raw: RawHandler = Arc::new(move |bytes: Vec<u8>| {
            let f = f.clone();
            let bus = bus.clone();
            let out_type = out_type.clone();
            Box::pin(async move {
                let envelope: Envelope<TIn> =
                    serde_json::from_slice(&bytes).map_err(|e| format!("envelope decode failed: {e}"))?;
                let out = f(envelope.data).await?;
                let source = format!("transform-{}", envelope.source);
                let mut out_envelope = Envelope::new(out_type.clone(), source, out);
                out_envelope.timestamp = envelope.timestamp;
                out_envelope.metadata = envelope.metadata;
                bus.emit_envelope(out_envelope).await
            })
        });
        self.push(in_type.into(), raw);
    }

    /// Serialize `data` into an envelope once and dispatch to every handler
    /// registered for `event_type`, in insertion order. Handler errors are
    /// logged and swallowed — emission always succeeds as long as `data`
    /// itself serializes.
    pub async fn emit<T: Serialize>(
        &self,
        event_type: impl Into<String>,
        source: impl Into<String>,
        data: T,
        metadata: HashMap<String, Value>,
    ) -> Result<(), String> {
        let envelope = Envelope::new(event_type, source, data).with_metadata(metadata);
        self.emit_envelope(envelope).await
    }

    async fn emit_envelope<T: Serialize>(&self, envelope: Envelope<T>) -> Result<(), String> {
        let event_type = envelope.event_type.clone();
        let bytes = serde_json::to_vec(&envelope).map_err(|e| format!("envelope encode failed: {e}"))?;

        let handlers = {
            let guard = self.inner.handlers.read().expect("hook bus lock poisoned");
            guard.get(&event_type).cloned().unwrap_or_default()
        };

        for handler in handlers {
            if let Err(err) = handler(bytes.clone()).await {
                tracing::error!(event_type = %event_type, error = %err, "hook handler failed");
            }
        }
        Ok(())
    }

    fn push(&self, event_type: String, handler: RawHandler) {
        let mut guard = self.inner.handlers.write().expect("hook bus lock poisoned");
        guard.entry(event_type).or_default().push(handler);
    }

    /// Empty all registered handlers. Test-only: production code should
    /// never need to reset a live bus.
    pub fn reset(&self) {
        self.inner.handlers.write().expect("hook bus lock poisoned").clear();
    }

    pub fn stats(&self) -> HookStats {
        let guard = self.inner.handlers.read().expect("hook bus lock poisoned");
        let per_type: HashMap<String, usize> = guard.iter().map(|(k, v)| (k.clone(), v.len())).collect();
        let total_handlers = per_type.values().sum();
        HookStats { total_handlers, per_type }
    }
}

impl Default for HookBus {
    fn default() -> Self {
        Self::new()
    }
}

/// `LogSink` adapter: forwards every log entry onto a `HookBus` as a
/// `LogEntryCreated` event, the sanctioned logger-to-hook-bus integration
/// point (spec §4.4).
pub struct LogEntrySink {
    bus: HookBus,
}

impl LogEntrySink {
    pub fn new(bus: HookBus) -> Self {
        Self { bus }
    }
}

impl zbz_core::log::LogSink for LogEntrySink {
    fn on_log(&self, entry: &zbz_core::log::LogEntry) {
        let bus = self.bus.clone();
        let entry = entry.clone();
        tokio::spawn(async move {
            let _ = bus.emit("LogEntryCreated", "logger", entry, HashMap::new()).await;
        });
    }
}

pub mod prelude {
    pub use crate::{Envelope, HookBus, HookStats, LogEntrySink};
}
