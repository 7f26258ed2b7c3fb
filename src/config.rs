// ⚙️ Pipeline Configuration - paths, source coverage, join strategies
//
// Every field has a default, so an empty qb_reconcile.toml is a valid config:
//
//   raw_dir = "data/raw"
//   output_csv = "data/processed/qb_season.csv"
//   database = "data/qb_sqlite.db"
//   team_crosswalk = "xwalks/team_name_xwalk.csv"
//   classification_crosswalk = "xwalks/elite_system_fraud.csv"
//
//   [sources.salary]
//   first_season = 2013

use crate::error::{PipelineError, Result};
use crate::merge::JoinStrategy;
use crate::sources::SourceKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "qb_reconcile.toml";

/// Per-source snapshot naming, coverage and join strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Snapshot stem; falls back to the source's default stem
    pub file_stem: Option<String>,
    /// Seasons before this one skip the source entirely
    pub first_season: Option<u16>,
    /// Ignored for the base source
    pub strategy: Option<JoinStrategy>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub passing: SourceConfig,
    pub advanced: SourceConfig,
    pub salary: SourceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub raw_dir: PathBuf,
    pub sources: SourcesConfig,
    /// Built-in mascot table when unset
    pub team_crosswalk: Option<PathBuf>,
    /// Classification columns stay null when unset
    pub classification_crosswalk: Option<PathBuf>,
    pub output_csv: PathBuf,
    pub database: Option<PathBuf>,
    pub audit_json: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            raw_dir: PathBuf::from("data/raw"),
            sources: SourcesConfig::default(),
            team_crosswalk: None,
            classification_crosswalk: None,
            output_csv: PathBuf::from("data/processed/qb_season.csv"),
            database: None,
            audit_json: None,
        }
    }
}

impl PipelineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `path` when it exists, defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn source(&self, kind: SourceKind) -> &SourceConfig {
        match kind {
            SourceKind::Passing => &self.sources.passing,
            SourceKind::Advanced => &self.sources.advanced,
            SourceKind::Salary => &self.sources.salary,
        }
    }

    pub fn file_stem(&self, kind: SourceKind) -> &str {
        self.source(kind)
            .file_stem
            .as_deref()
            .unwrap_or_else(|| kind.default_file_stem())
    }

    pub fn strategy(&self, kind: SourceKind) -> JoinStrategy {
        self.source(kind).strategy.unwrap_or(JoinStrategy::PrimaryWithFallback)
    }
}

/// `from..=to`, rejecting an inverted range
pub fn season_range(from: u16, to: u16) -> Result<RangeInclusive<u16>> {
    if from > to {
        return Err(PipelineError::Config(format!(
            "season range {}..={} is empty",
            from, to
        )));
    }
    Ok(from..=to)
}
