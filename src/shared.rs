//! Hot-swappable engine handle.
//!
//! The request path loads the current [`Engine`] snapshot without locking;
//! the control plane builds a replacement and stores it atomically. A request
//! in flight keeps the snapshot it started with.

use arc_swap::{ArcSwap, Guard};
use std::sync::Arc;

use crate::dataset::DatasetLoader;
use crate::engine::{DatasetSource, Decision, Engine};
use crate::error::LoadError;
use crate::normalize::RawAddress;

/// An engine reference that can be replaced while readers are active.
pub struct SharedEngine {
    inner: ArcSwap<Engine>,
    loader: DatasetLoader,
}

impl SharedEngine {
    /// Wrap an engine; reloads use a native-endian loader.
    pub fn new(engine: Engine) -> Self {
        Self::with_loader(engine, DatasetLoader::new())
    }

    pub fn with_loader(engine: Engine, loader: DatasetLoader) -> Self {
        Self {
            inner: ArcSwap::from_pointee(engine),
            loader,
        }
    }

    /// Current snapshot.
    #[inline]
    pub fn load(&self) -> Guard<Arc<Engine>> {
        self.inner.load()
    }

    /// Current snapshot as an owned `Arc`.
    pub fn snapshot(&self) -> Arc<Engine> {
        self.inner.load_full()
    }

    #[inline]
    pub fn decide(&self, raw: impl Into<RawAddress>) -> Decision {
        self.inner.load().decide(raw)
    }

    /// Replace the engine.
    pub fn store(&self, engine: Engine) {
        self.inner.store(Arc::new(engine));
    }

    /// Build a new engine from `source` and swap it in.
    ///
    /// On failure the current engine stays in place.
    pub fn reload(&self, source: impl Into<DatasetSource>) -> Result<(), LoadError> {
        let engine = Engine::load_with(source, self.loader)?;
        self.inner.store(Arc::new(engine));
        log::info!("Hot reloaded IP ranges");
        Ok(())
    }
}
