//! Configuration units.
//!
//! A unit is one host configuration scope (a virtual host, a location) that
//! owns a reference to one [`Engine`]. Units may name a parent; a unit that
//! does not name its own dataset shares the parent's engine. Inheritance is
//! resolved once, when the units are assembled.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dataset::{ByteOrder, DatasetLoader};
use crate::engine::{Decision, Engine};
use crate::error::{Error, Result};
use crate::normalize::RawAddress;

/// What to do when a unit's dataset fails to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log once and run the unit with filtering disabled
    #[default]
    FailOpen,
    /// Propagate the load error to the caller
    Abort,
}

/// Configuration of a single unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConfig {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub dataset: Option<PathBuf>,
    #[serde(default)]
    pub byte_order: ByteOrder,
    #[serde(default)]
    pub on_load_failure: FailurePolicy,
}

impl UnitConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            dataset: None,
            byte_order: ByteOrder::Native,
            on_load_failure: FailurePolicy::FailOpen,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_dataset(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset = Some(path.into());
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_load_failure = policy;
        self
    }
}

/// Top-level filter configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub units: Vec<UnitConfig>,
}

impl FilterConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }
}

/// Assembled units, each holding its resolved engine.
#[derive(Debug, Default)]
pub struct Units {
    engines: AHashMap<String, Arc<Engine>>,
}

impl Units {
    /// Load every unit's dataset and resolve inheritance.
    pub fn assemble(config: &FilterConfig) -> Result<Self> {
        let mut by_name: AHashMap<&str, &UnitConfig> = AHashMap::new();
        for unit in &config.units {
            if by_name.insert(unit.name.as_str(), unit).is_some() {
                return Err(Error::Config(format!("duplicate unit: {}", unit.name)));
            }
        }

        let mut units = Units::default();
        for unit in &config.units {
            let mut chain = Vec::new();
            units.resolve(unit, &by_name, &mut chain)?;
        }
        Ok(units)
    }

    fn resolve(
        &mut self,
        unit: &UnitConfig,
        by_name: &AHashMap<&str, &UnitConfig>,
        chain: &mut Vec<String>,
    ) -> Result<Arc<Engine>> {
        if let Some(engine) = self.engines.get(&unit.name) {
            return Ok(Arc::clone(engine));
        }
        if chain.contains(&unit.name) {
            return Err(Error::Config(format!(
                "inheritance cycle through unit: {}",
                unit.name
            )));
        }
        chain.push(unit.name.clone());

        let engine = match (&unit.dataset, &unit.parent) {
            (Some(path), _) => Arc::new(load_unit(unit, path)?),
            (None, Some(parent)) => {
                let parent = by_name.get(parent.as_str()).ok_or_else(|| {
                    Error::Config(format!(
                        "unit {} names unknown parent: {}",
                        unit.name, parent
                    ))
                })?;
                self.resolve(parent, by_name, chain)?
            }
            (None, None) => Arc::new(Engine::unloaded()),
        };

        chain.pop();
        self.engines.insert(unit.name.clone(), Arc::clone(&engine));
        Ok(engine)
    }

    /// Engine for `unit`.
    pub fn engine(&self, unit: &str) -> Option<&Arc<Engine>> {
        self.engines.get(unit)
    }

    /// Decide for a request arriving in `unit`.
    pub fn decide(&self, unit: &str, raw: impl Into<RawAddress>) -> Result<Decision> {
        self.engines
            .get(unit)
            .map(|engine| engine.decide(raw))
            .ok_or_else(|| Error::UnknownUnit(unit.to_string()))
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.engines.keys().map(String::as_str)
    }
}

fn load_unit(unit: &UnitConfig, path: &Path) -> Result<Engine> {
    let loader = DatasetLoader::with_byte_order(unit.byte_order);
    match unit.on_load_failure {
        FailurePolicy::FailOpen => Ok(Engine::load_or_disabled(path, loader, &unit.name)),
        FailurePolicy::Abort => Engine::load_with(path, loader).map_err(|e| {
            log::error!("[redblock] unit '{}': {}", unit.name, e);
            Error::Load(e)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
units:
  - name: default
    dataset: /etc/nginx/redblock_ranges.bin
  - name: api
    parent: default
    byte_order: big
    on_load_failure: abort
"#;
        let config = FilterConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.units.len(), 2);
        assert_eq!(
            config.units[0].dataset.as_deref(),
            Some(Path::new("/etc/nginx/redblock_ranges.bin"))
        );
        assert_eq!(config.units[0].on_load_failure, FailurePolicy::FailOpen);
        assert_eq!(config.units[1].parent.as_deref(), Some("default"));
        assert_eq!(config.units[1].byte_order, ByteOrder::Big);
        assert_eq!(config.units[1].on_load_failure, FailurePolicy::Abort);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            FilterConfig::from_yaml_str("units: [ { nom: x } ]"),
            Err(Error::Yaml(_))
        ));
    }

    #[test]
    fn test_unit_without_dataset_or_parent_is_unloaded() {
        let config = FilterConfig {
            units: vec![UnitConfig::new("bare")],
        };
        let units = Units::assemble(&config).unwrap();
        assert!(!units.engine("bare").unwrap().is_loaded());
    }

    #[test]
    fn test_duplicate_unit_rejected() {
        let config = FilterConfig {
            units: vec![UnitConfig::new("a"), UnitConfig::new("a")],
        };
        assert!(matches!(Units::assemble(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let config = FilterConfig {
            units: vec![UnitConfig::new("child").with_parent("ghost")],
        };
        assert!(matches!(Units::assemble(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_cycle_rejected() {
        let config = FilterConfig {
            units: vec![
                UnitConfig::new("a").with_parent("b"),
                UnitConfig::new("b").with_parent("a"),
            ],
        };
        assert!(matches!(Units::assemble(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_unit_decide() {
        let units = Units::default();
        let addr: std::net::IpAddr = "10.0.0.1".parse().unwrap();
        assert!(matches!(units.decide("nope", addr), Err(Error::UnknownUnit(_))));
    }
}
