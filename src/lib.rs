// QB Season Reconciliation - Core Library
// Three sites, three spellings of every quarterback, one row per player-season.

pub mod aggregate;
pub mod audit;
pub mod config;
pub mod crosswalk;
pub mod db;
pub mod error;
pub mod export;
pub mod identity;
pub mod merge;
pub mod record;
pub mod sources;
pub mod table;

// Re-export commonly used types
pub use aggregate::{Aggregator, SeasonSource};
pub use audit::{RunReport, SeasonAudit, SourceAudit};
pub use config::{season_range, PipelineConfig, SourceConfig};
pub use crosswalk::{ClassificationCrosswalk, TeamCrosswalk};
pub use db::{insert_event, load_season_records, record_run, setup_database, verify_count, Event};
pub use error::{PipelineError, Result};
pub use export::{write_csv, write_csv_to};
pub use identity::{
    normalize_person, normalize_team, person_key_from_full_name, person_key_from_label, strip_award_markers,
    strip_periods, PersonKey, TeamCode,
};
pub use merge::{FallbackMatch, JoinReport, JoinStrategy, MergeEngine, MergeOutcome};
pub use record::{canonical_columns, AnalyticTable, SeasonRecord, SeasonTable};
pub use sources::{
    cleaner_for, AdvancedCleaner, CsvSnapshotAdapter, PassingCleaner, SalaryCleaner, SourceAdapter, SourceCleaner,
    SourceKind,
};
pub use table::{CleanedRow, CleanedTable, ColumnSpec, ColumnType, RawTable, Value};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
