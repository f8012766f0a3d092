//! Command implementations

pub(crate) mod audit;
pub(crate) mod clean;
pub(crate) mod evaluate;
pub(crate) mod predict;
pub(crate) mod tune;

use crate::error::{CliError, Result};
use cosecha::config::PipelineConfig;
use cosecha::dataset::CleanDataset;
use cosecha::model_selection::GroupKFold;
use std::path::Path;

/// Fails early with a clear message when `path` is not a readable file.
pub(crate) fn require_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(CliError::NotAFile(path.to_path_buf()));
    }
    Ok(())
}

/// The configuration file if given, defaults otherwise.
pub(crate) fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            require_file(path)?;
            Ok(PipelineConfig::load(path)?)
        }
        None => Ok(PipelineConfig::default()),
    }
}

/// Reads a persisted clean dataset.
pub(crate) fn load_dataset(path: &Path) -> Result<CleanDataset> {
    require_file(path)?;
    Ok(CleanDataset::load_csv(path)?)
}

/// `--folds` when given, the configured splitter otherwise.
pub(crate) fn fold_splitter(folds: Option<usize>, config: &PipelineConfig) -> Result<GroupKFold> {
    match folds {
        Some(k) => Ok(GroupKFold::new(k)?),
        None => Ok(config.cv),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_file_missing() {
        let err = require_file(Path::new("/nonexistent/clean.csv")).expect_err("missing");
        assert!(matches!(err, CliError::FileNotFound(_)));
    }

    #[test]
    fn test_require_file_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = require_file(dir.path()).expect_err("directory");
        assert!(matches!(err, CliError::NotAFile(_)));
    }

    #[test]
    fn test_fold_splitter_prefers_flag() {
        let config = PipelineConfig::default();
        assert_eq!(fold_splitter(Some(3), &config).expect("valid").n_folds(), 3);
        assert_eq!(fold_splitter(None, &config).expect("valid").n_folds(), 5);
        assert!(fold_splitter(Some(1), &config).is_err());
    }
}
