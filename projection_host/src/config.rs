//! Host configuration, loaded from YAML.
//!
//! ```yaml
//! journal: data/events.log      # optional, in-memory when absent
//! fault_policy: halt            # halt | skip
//! projection:
//!   name: parity
//!   mode: source_faithful       # source_faithful | per_parity
//!   source_streams: [odd, even]
//!   options:
//!     key: value
//!     anotherKey: AanotherValue
//! ```
//!
//! Every field has a default; an empty document yields the projection as
//! originally declared.

use std::fs;
use std::path::{Path, PathBuf};

use parity_projection::ProjectionDefinition;
use serde::{Deserialize, Serialize};

use crate::error::HostError;

/// What the session does with an event the projection faults on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Stop and report; the event is retried on the next run.
    #[default]
    Halt,
    /// Log, count and move past the event.
    Skip,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    pub journal: Option<PathBuf>,
    pub fault_policy: FaultPolicy,
    pub projection: ProjectionDefinition,
}

impl HostConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, HostError> {
        // serde_yaml reads an empty document as unit, not as an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, HostError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), HostError> {
        self.projection.validate()?;
        Ok(())
    }
}
