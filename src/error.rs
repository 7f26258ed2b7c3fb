// 🚨 Pipeline Errors
// Structural violations are fatal and carry the season/source that produced them.
// Value-level problems (bad numeric text, crosswalk misses) never reach this type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Identity string did not decompose into given name + family name
    #[error("malformed name '{name}' ({context})")]
    MalformedName { name: String, context: String },

    /// Source-local derived metric failed structural or range validation
    #[error("malformed record '{value}' in season {season}: {reason}")]
    MalformedRecord {
        season: u16,
        value: String,
        reason: String,
    },

    /// Join key is not unique in one of the joined tables
    #[error("non-unique join key {key} in {dataset} table for season {season}")]
    MergeCardinality {
        season: u16,
        dataset: String,
        key: String,
    },

    /// Row count changed across a join step
    #[error("row count changed while joining {dataset} for season {season}: expected {expected}, got {actual}")]
    RowCountMismatch {
        season: u16,
        dataset: String,
        expected: usize,
        actual: usize,
    },

    /// Two sources contributed the same metric column
    #[error("column '{column}' from {dataset} already present in season {season}")]
    ColumnConflict {
        season: u16,
        dataset: String,
        column: String,
    },

    /// Raw table is missing a header the cleaner cannot do without
    #[error("{dataset} table for season {season} is missing column '{column}'")]
    MissingColumn {
        dataset: String,
        season: u16,
        column: String,
    },

    /// Wraps an inner error with the season/source pair it came from
    #[error("season {season} ({dataset}): {error}")]
    Season {
        season: u16,
        dataset: String,
        #[source]
        error: Box<PipelineError>,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PipelineError {
    /// Attach season/source context, leaving already-wrapped errors alone
    pub fn in_season(self, season: u16, source: &str) -> Self {
        match self {
            PipelineError::Season { .. } => self,
            other => PipelineError::Season {
                season,
                dataset: source.to_string(),
                error: Box::new(other),
            },
        }
    }

    /// True for invariant violations that abort a season's merge
    pub fn is_structural(&self) -> bool {
        match self {
            PipelineError::MergeCardinality { .. }
            | PipelineError::RowCountMismatch { .. }
            | PipelineError::ColumnConflict { .. } => true,
            PipelineError::Season { error, .. } => error.is_structural(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
