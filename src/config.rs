//! Typed pipeline configuration.
//!
//! Every section has a default matching the original survey layout, so an
//! empty file is a valid configuration. Values are checked when loaded, not
//! when first used.
//!
//! ```toml
//! [renames]
//! "Yield (t)" = "total_production"
//! "Hectares" = "area_ha"
//!
//! [limits]
//! efficiency_ceiling = 8.0
//!
//! [cv]
//! n_folds = 5
//!
//! [search]
//! n_trials = 20
//! seed = 7
//!
//! [search.space]
//! max_depth = [3, 4]
//! learning_rate = [0.05, 0.1]
//! ```

use crate::automl::SearchConfig;
use crate::error::{CosechaError, Result};
use crate::model_selection::GroupKFold;
use crate::schema::RenameTable;
use crate::validation::ValidityLimits;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Complete configuration of a cleaning and evaluation run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Source header variant to canonical field
    pub renames: RenameTable,
    /// Physical validity bounds
    pub limits: ValidityLimits,
    /// Grouped cross-validation settings
    pub cv: GroupKFold,
    /// Hyperparameter search settings
    pub search: SearchConfig,
}

impl PipelineConfig {
    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::InvalidHyperparameter`] naming the first
    /// out-of-domain value.
    pub fn validate(&self) -> Result<()> {
        self.limits.validate()?;
        self.search.validate()
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::Config`] for malformed TOML or unknown keys,
    /// and validation errors for out-of-domain values.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::Config`] naming the file when it cannot be
    /// read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|err| {
            CosechaError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        let config = Self::from_toml_str(&source).map_err(|err| match err {
            CosechaError::Config(msg) => CosechaError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Serializes to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::Serialization`] if encoding fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|err| CosechaError::Serialization(err.to_string()))
    }
}
