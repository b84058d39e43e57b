//! Redblock - a low-latency IP range access-control engine.
//!
//! This crate decides, for every incoming connection, whether the source
//! address falls inside a blocked IPv4 range. Ranges come from a flat binary
//! dataset and carry an opaque classification (`kind`) that is reported back
//! on a match.
//!
//! # Features
//!
//! - **Flat binary datasets**: fixed 12-byte records, no header
//! - **First-match-wins**: overlapping ranges resolve by load order
//! - **O(log n) decisions**: allocation-free and lock-free on the request path
//! - **IPv4-mapped IPv6**: `::ffff:a.b.c.d` is evaluated as `a.b.c.d`
//! - **Fail-open**: native IPv6 and unloaded datasets always allow
//! - **Hot reload**: build a new engine and swap it in atomically
//!
//! # Quick Start
//!
//! ```ignore
//! use redblock::{Decision, Engine};
//! use std::net::SocketAddr;
//!
//! let engine = Engine::load(std::path::Path::new("/etc/nginx/redblock_ranges.bin"))?;
//!
//! let peer: SocketAddr = "10.0.0.5:51234".parse()?;
//! match engine.decide(peer) {
//!     Decision::Allow => { /* continue */ }
//!     Decision::Deny { kind } => { /* respond 401 */ }
//! }
//! ```
//!
//! # Hot Reload
//!
//! ```ignore
//! use redblock::{Engine, SharedEngine};
//!
//! let shared = SharedEngine::new(Engine::load(path)?);
//!
//! // request path
//! let decision = shared.decide(peer);
//!
//! // control plane; a failed reload keeps the current engine
//! shared.reload(path)?;
//! ```
//!
//! # Configuration Units
//!
//! Hosts with several scopes describe them in YAML; a unit without its own
//! dataset inherits its parent's engine. See [`FilterConfig`] and [`Units`].

mod config;
mod engine;
mod error;
mod index;
mod normalize;
mod shared;

pub mod converter;
pub mod dataset;
pub mod feeds;

// Re-export core types
pub use error::{Error, LoadError, LoadWarning, Result};
pub use dataset::{ByteOrder, Dataset, DatasetInfo, DatasetLoader, DatasetWriter, IpRange};
pub use engine::{DatasetSource, Decision, Engine, EngineState};
pub use index::RangeIndex;
pub use normalize::{normalize, Normalized, RawAddress};
pub use shared::SharedEngine;

// Re-export configuration
pub use config::{FailurePolicy, FilterConfig, UnitConfig, Units};
