//! Access decision engine.
//!
//! An [`Engine`] is built once on the control plane and then shared
//! read-only by every request. It has no refresh method: reloading means
//! building a new engine and swapping the reference (see
//! [`SharedEngine`](crate::SharedEngine)).

use std::fmt;
use std::path::{Path, PathBuf};

use crate::dataset::{Dataset, DatasetInfo, DatasetLoader, IpRange};
use crate::error::{LoadError, LoadWarning};
use crate::index::RangeIndex;
use crate::normalize::{normalize, Normalized, RawAddress};

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Allow,
    /// The address is inside a blocked range of the given kind
    Deny { kind: u32 },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn is_denied(&self) -> bool {
        !self.is_allowed()
    }

    /// Kind of the matching range, if denied.
    pub fn kind(&self) -> Option<u32> {
        match self {
            Decision::Allow => None,
            Decision::Deny { kind } => Some(*kind),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow => write!(f, "ALLOW"),
            Decision::Deny { kind } => write!(f, "DENY kind={}", kind),
        }
    }
}

/// Where a dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for DatasetSource {
    fn from(path: PathBuf) -> Self {
        DatasetSource::Path(path)
    }
}

impl From<&Path> for DatasetSource {
    fn from(path: &Path) -> Self {
        DatasetSource::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for DatasetSource {
    fn from(data: Vec<u8>) -> Self {
        DatasetSource::Bytes(data)
    }
}

/// Lifecycle state of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No dataset; every decision is `Allow`
    Unloaded,
    /// Dataset present and evaluated
    Loaded,
}

#[derive(Debug)]
struct LoadedSet {
    index: RangeIndex,
    info: DatasetInfo,
    warnings: Vec<LoadWarning>,
}

/// Immutable access-control engine.
#[derive(Debug, Default)]
pub struct Engine {
    loaded: Option<LoadedSet>,
}

impl Engine {
    /// An engine with no dataset. Fails open on every decision.
    pub fn unloaded() -> Self {
        Self { loaded: None }
    }

    /// Load a native-endian dataset.
    pub fn load(source: impl Into<DatasetSource>) -> Result<Self, LoadError> {
        Self::load_with(source, DatasetLoader::new())
    }

    /// Load a dataset with an explicit loader.
    pub fn load_with(
        source: impl Into<DatasetSource>,
        loader: DatasetLoader,
    ) -> Result<Self, LoadError> {
        let dataset = match source.into() {
            DatasetSource::Path(path) => loader.load_path(&path)?,
            DatasetSource::Bytes(data) => loader.load_bytes(&data)?,
        };
        Self::from_dataset(dataset)
    }

    /// Build an engine from an already decoded dataset.
    pub fn from_dataset(dataset: Dataset) -> Result<Self, LoadError> {
        let Dataset {
            ranges,
            warnings,
            info,
        } = dataset;
        let index = RangeIndex::build(ranges)?;

        log::info!(
            "Loaded {} IP ranges from {} (sha256 {})",
            index.len(),
            info.source,
            info.fingerprint()
        );

        Ok(Self {
            loaded: Some(LoadedSet {
                index,
                info,
                warnings,
            }),
        })
    }

    /// Build an engine directly from ranges in precedence order.
    pub fn from_ranges(ranges: Vec<IpRange>) -> Result<Self, LoadError> {
        let index = RangeIndex::build(ranges)?;
        let info = DatasetInfo {
            source: "<ranges>".to_string(),
            records: index.len(),
            trailing_bytes: 0,
            sha256: [0; 32],
        };
        Ok(Self {
            loaded: Some(LoadedSet {
                index,
                info,
                warnings: Vec::new(),
            }),
        })
    }

    /// Load a dataset for `unit`, falling back to an unloaded engine.
    ///
    /// A failure is logged once here and never again on the request path.
    pub fn load_or_disabled(
        source: impl Into<DatasetSource>,
        loader: DatasetLoader,
        unit: &str,
    ) -> Self {
        match Self::load_with(source, loader) {
            Ok(engine) => engine,
            Err(e) => {
                log::error!(
                    "[redblock] unit '{}': {}; IP filtering disabled for this unit",
                    unit,
                    e
                );
                Self::unloaded()
            }
        }
    }

    /// Decide whether a connection from `raw` is allowed.
    ///
    /// Never fails: unsupported address families and unloaded engines allow.
    #[inline]
    pub fn decide(&self, raw: impl Into<RawAddress>) -> Decision {
        match normalize(raw.into()) {
            Normalized::V4(addr) => self.decide_addr(addr),
            Normalized::Unsupported => Decision::Allow,
        }
    }

    /// Decide for an already normalized address.
    #[inline]
    pub fn decide_addr(&self, addr: u32) -> Decision {
        let Some(loaded) = &self.loaded else {
            return Decision::Allow;
        };
        match loaded.index.lookup(addr) {
            Some(kind) => Decision::Deny { kind },
            None => Decision::Allow,
        }
    }

    /// The range that decides `raw`, with its load index.
    ///
    /// Meant for decision tracing; `decide` is the hot-path call.
    pub fn explain(&self, raw: impl Into<RawAddress>) -> Option<(usize, IpRange)> {
        let addr = normalize(raw.into()).addr()?;
        let loaded = self.loaded.as_ref()?;
        loaded.index.find(addr).map(|(i, range)| (i, *range))
    }

    pub fn state(&self) -> EngineState {
        if self.loaded.is_some() {
            EngineState::Loaded
        } else {
            EngineState::Unloaded
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn info(&self) -> Option<&DatasetInfo> {
        self.loaded.as_ref().map(|l| &l.info)
    }

    /// Non-fatal load warnings.
    pub fn warnings(&self) -> &[LoadWarning] {
        self.loaded.as_ref().map_or(&[], |l| l.warnings.as_slice())
    }

    pub fn range_count(&self) -> usize {
        self.loaded.as_ref().map_or(0, |l| l.index.len())
    }

    pub fn index(&self) -> Option<&RangeIndex> {
        self.loaded.as_ref().map(|l| &l.index)
    }
}
