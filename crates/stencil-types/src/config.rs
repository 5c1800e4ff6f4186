// ─────────────────────────────────────────────────────────────────────
// SCPN Stencil — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::error::{StencilError, StencilResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Parameters of one stencil run.
///
/// `workers` is normally supplied by the execution environment; when it is
/// absent the launcher picks a count itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub nx: usize,
    pub ny: usize,
    pub niters: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Local threads each worker uses for the interior sweep.
    #[serde(default = "default_threads_per_worker")]
    pub threads_per_worker: usize,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_threads_per_worker() -> usize {
    1
}
fn default_output() -> PathBuf {
    PathBuf::from("stencil.pgm")
}

impl RunConfig {
    pub fn new(nx: usize, ny: usize, niters: usize) -> Self {
        RunConfig {
            nx,
            ny,
            niters,
            workers: None,
            threads_per_worker: default_threads_per_worker(),
            output: default_output(),
        }
    }

    /// Load from a JSON file and validate.
    pub fn from_file(path: impl AsRef<Path>) -> StencilResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StencilResult<()> {
        if self.nx == 0 || self.ny == 0 {
            return Err(StencilError::InvalidParameters(format!(
                "Grid dimensions must be positive, got nx={} ny={}",
                self.nx, self.ny
            )));
        }
        if self.niters == 0 {
            return Err(StencilError::InvalidParameters(
                "Iteration count must be positive".to_string(),
            ));
        }
        if self.threads_per_worker == 0 {
            return Err(StencilError::InvalidParameters(
                "threads_per_worker must be >= 1".to_string(),
            ));
        }
        if self.workers == Some(0) {
            return Err(StencilError::InvalidParameters(
                "Worker count must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "stencil_config_{}_{}.json",
            name,
            std::process::id()
        ))
    }

    #[test]
    fn test_defaults_filled_from_partial_json() {
        let cfg: RunConfig =
            serde_json::from_str(r#"{"nx": 1024, "ny": 768, "niters": 100}"#).expect("parse");
        assert_eq!(cfg, RunConfig::new(1024, 768, 100));
        assert_eq!(cfg.output, PathBuf::from("stencil.pgm"));
        assert_eq!(cfg.threads_per_worker, 1);
        assert!(cfg.workers.is_none());
    }

    #[test]
    fn test_from_file_roundtrip() {
        let mut cfg = RunConfig::new(64, 32, 5);
        cfg.workers = Some(4);
        cfg.threads_per_worker = 2;
        let path = temp_path("roundtrip");
        std::fs::write(&path, serde_json::to_string_pretty(&cfg).expect("ser")).expect("write");
        let loaded = RunConfig::from_file(&path).expect("load");
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        for cfg in [
            RunConfig::new(0, 4, 1),
            RunConfig::new(4, 0, 1),
            RunConfig::new(4, 4, 0),
        ] {
            match cfg.validate() {
                Err(StencilError::InvalidParameters(_)) => {}
                other => panic!("Unexpected result: {other:?}"),
            }
        }
        let mut cfg = RunConfig::new(4, 4, 1);
        cfg.workers = Some(0);
        assert!(cfg.validate().is_err());
        cfg.workers = None;
        cfg.threads_per_worker = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_from_file_missing_is_io_error() {
        let err = RunConfig::from_file(temp_path("does_not_exist")).expect_err("missing file");
        assert!(matches!(err, StencilError::Io(_)), "got {err:?}");
    }
}
