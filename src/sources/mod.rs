// 🏗️ Source Framework - one adapter + one cleaner per site
//
// SourceAdapter : fetch(season) -> RawTable      (retrieval, external concern)
// SourceCleaner : clean(raw, season) -> CleanedTable  (normalization, ours)
//
// Dispatch is a closed enum. Adding a site means a new SourceKind variant and
// a new cleaner; nothing existing is touched.

pub mod advanced;
pub mod passing;
pub mod salary;

pub use advanced::AdvancedCleaner;
pub use passing::PassingCleaner;
pub use salary::SalaryCleaner;

use crate::crosswalk::TeamCrosswalk;
use crate::error::{PipelineError, Result};
use crate::identity::{person_key_from_full_name, PersonKey, TeamCode};
use crate::table::{CleanedTable, ColumnSpec, ColumnType, RawTable, Value};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ============================================================================
// SOURCE KIND
// ============================================================================

/// Which site a table came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Play-by-play stats site: the base population
    Passing,
    /// Advanced-metrics site
    Advanced,
    /// Salary/cap site, keyed by mascot rather than abbreviation
    Salary,
}

impl SourceKind {
    /// Merge order; the first entry defines who exists this season
    pub const ALL: [SourceKind; 3] = [SourceKind::Passing, SourceKind::Advanced, SourceKind::Salary];

    /// Short code for errors, logs and reports
    pub fn code(&self) -> &'static str {
        match self {
            SourceKind::Passing => "passing",
            SourceKind::Advanced => "advanced",
            SourceKind::Salary => "salary",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Passing => "Play-by-play passing stats",
            SourceKind::Advanced => "Advanced metrics",
            SourceKind::Salary => "Salary cap",
        }
    }

    /// Default snapshot file stem (`<stem>_<season>.csv`)
    pub fn default_file_stem(&self) -> &'static str {
        match self {
            SourceKind::Passing => "qb_season_pfr",
            SourceKind::Advanced => "qb_season_fo",
            SourceKind::Salary => "qb_salary",
        }
    }
}

// ============================================================================
// TRAITS
// ============================================================================

/// Retrieval contract: one raw table per season, no retries
pub trait SourceAdapter {
    fn kind(&self) -> SourceKind;

    fn fetch(&self, season: u16) -> Result<RawTable>;
}

/// Normalization contract: raw table → one row per (PersonKey, TeamCode)
pub trait SourceCleaner {
    fn kind(&self) -> SourceKind;

    fn clean(&self, raw: RawTable, season: u16) -> Result<CleanedTable>;

    /// Metric used to pick a single row when a key repeats
    fn tie_break_metric(&self) -> &'static str;
}

/// Static source → cleaner mapping
pub fn cleaner_for(kind: SourceKind, teams: &TeamCrosswalk) -> Box<dyn SourceCleaner> {
    match kind {
        SourceKind::Passing => Box::new(PassingCleaner::new()),
        SourceKind::Advanced => Box::new(AdvancedCleaner::new()),
        SourceKind::Salary => Box::new(SalaryCleaner::new(teams.clone())),
    }
}

// ============================================================================
// CSV SNAPSHOT ADAPTER
// ============================================================================

/// Reads `<dir>/<file_stem>_<season>.csv` saved from the site's table
pub struct CsvSnapshotAdapter {
    kind: SourceKind,
    dir: PathBuf,
    file_stem: String,
}

impl CsvSnapshotAdapter {
    pub fn new(kind: SourceKind, dir: impl Into<PathBuf>) -> Self {
        CsvSnapshotAdapter {
            kind,
            dir: dir.into(),
            file_stem: kind.default_file_stem().to_string(),
        }
    }

    pub fn with_file_stem(mut self, file_stem: &str) -> Self {
        self.file_stem = file_stem.to_string();
        self
    }

    pub fn path_for(&self, season: u16) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", self.file_stem, season))
    }
}

impl SourceAdapter for CsvSnapshotAdapter {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn fetch(&self, season: u16) -> Result<RawTable> {
        let path = self.path_for(season);
        let table = read_raw_csv(&path)?;
        debug!(
            source = self.kind.code(),
            season,
            rows = table.len(),
            path = %path.display(),
            "read raw snapshot"
        );
        Ok(table)
    }
}

/// Read any CSV into a RawTable; ragged rows are allowed
pub fn read_raw_csv(path: &Path) -> Result<RawTable> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }

    Ok(RawTable::new(headers, rows))
}

// ============================================================================
// SHARED CLEANING HELPERS
// ============================================================================

/// Column specs resolved against one raw table's headers
pub(crate) struct ResolvedColumns {
    /// (spec, raw index) for every column present this season
    pub present: Vec<(ColumnSpec, usize)>,
}

impl ResolvedColumns {
    /// Required headers must exist; optional ones are dropped when missing so
    /// the column is absent for the season rather than zero-filled.
    pub fn resolve(raw: &RawTable, specs: &[ColumnSpec], kind: SourceKind, season: u16) -> Result<Self> {
        let mut present = Vec::new();

        for spec in specs {
            match raw.column_index(&spec.raw_header) {
                Some(index) => present.push((spec.clone(), index)),
                None if spec.optional => {
                    debug!(source = kind.code(), season, column = %spec.name, "optional column absent");
                }
                None => {
                    return Err(PipelineError::MissingColumn {
                        dataset: kind.code().to_string(),
                        season,
                        column: spec.raw_header.clone(),
                    })
                }
            }
        }

        Ok(ResolvedColumns { present })
    }

    pub fn names(&self) -> Vec<String> {
        self.present.iter().map(|(spec, _)| spec.name.clone()).collect()
    }

    /// Typed values for one raw row, aligned with `names()`
    pub fn values(&self, raw: &RawTable, row: &[String]) -> Vec<Value> {
        self.present
            .iter()
            .map(|(spec, index)| spec.column_type.parse(raw.cell(row, *index)))
            .collect()
    }
}

/// Index of a header the cleaner cannot work without
pub(crate) fn require_column(raw: &RawTable, header: &str, kind: SourceKind, season: u16) -> Result<usize> {
    raw.column_index(header).ok_or_else(|| PipelineError::MissingColumn {
        dataset: kind.code().to_string(),
        season,
        column: header.to_string(),
    })
}

/// Header rows repeated inside the table body ("Player" under "Player")
pub(crate) fn is_repeated_header(raw: &RawTable, row: &[String], key_columns: &[usize]) -> bool {
    key_columns.iter().any(|&index| {
        let cell = raw.cell(row, index).trim();
        raw.headers
            .get(index)
            .map(|header| !cell.is_empty() && cell == header.trim())
            .unwrap_or(false)
    })
}

/// Collapse duplicate keys by the cleaner's tie-break metric and log the outcome
pub(crate) fn finalize(mut table: CleanedTable, tie_break_metric: &str, raw_rows: usize) -> CleanedTable {
    let dropped = table.dedupe_by_max(tie_break_metric);
    if dropped > 0 {
        info!(
            source = %table.source,
            season = table.season,
            dropped,
            metric = tie_break_metric,
            "collapsed duplicate keys to max-metric row"
        );
    }
    info!(
        source = %table.source,
        season = table.season,
        raw_rows,
        cleaned_rows = table.len(),
        columns = table.columns.len(),
        "cleaned source table"
    );
    table
}

/// Strict key for full-name sources; a malformed name reports its raw row
pub(crate) fn full_name_key(raw_name: &str, kind: SourceKind, line: usize, team: &TeamCode) -> Result<PersonKey> {
    person_key_from_full_name(raw_name).map_err(|err| match err {
        PipelineError::MalformedName { name, context } => PipelineError::MalformedName {
            name,
            context: format!("{} row {} ({}): {}", kind.code(), line, team, context),
        },
        other => other,
    })
}

/// Integer view of a raw cell, used for filters (games started etc.)
pub(crate) fn integer_cell(raw: &RawTable, row: &[String], index: usize) -> Option<i64> {
    match ColumnType::Integer.parse(raw.cell(row, index)) {
        Value::Int(v) => Some(v),
        _ => None,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_source_order_starts_with_base_population() {
        assert_eq!(SourceKind::ALL[0], SourceKind::Passing);
        assert_eq!(SourceKind::Salary.code(), "salary");
    }

    #[test]
    fn test_cleaner_dispatch_matches_kind() {
        let teams = TeamCrosswalk::builtin();
        for kind in SourceKind::ALL {
            assert_eq!(cleaner_for(kind, &teams).kind(), kind);
        }
    }

    #[test]
    fn test_csv_snapshot_adapter_reads_season_file() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = CsvSnapshotAdapter::new(SourceKind::Advanced, dir.path());

        let mut file = File::create(adapter.path_for(2019)).unwrap();
        writeln!(file, "Player,Team,DYAR").unwrap();
        writeln!(file, "T.Brady,NE,1000").unwrap();
        writeln!(file, "Player,Team,DYAR").unwrap();
        writeln!(file, "short,row").unwrap();
        drop(file);

        let raw = adapter.fetch(2019).unwrap();
        assert_eq!(raw.headers, vec!["Player", "Team", "DYAR"]);
        assert_eq!(raw.len(), 3);
        assert_eq!(raw.cell(&raw.rows[2], 2), "");
    }

    #[test]
    fn test_missing_snapshot_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = CsvSnapshotAdapter::new(SourceKind::Passing, dir.path()).with_file_stem("nothing");
        assert!(matches!(adapter.fetch(2020), Err(PipelineError::Io(_))));
    }

    #[test]
    fn test_resolve_drops_missing_optional_and_rejects_missing_required() {
        let raw = RawTable::from_strs(&["Player", "Att"], &[]);
        let specs = vec![
            ColumnSpec::required("att", "Att", ColumnType::Integer),
            ColumnSpec::optional("qbr", "QBR", ColumnType::Real),
        ];
        let resolved = ResolvedColumns::resolve(&raw, &specs, SourceKind::Passing, 2005).unwrap();
        assert_eq!(resolved.names(), vec!["att"]);

        let specs = vec![ColumnSpec::required("cmp", "Cmp", ColumnType::Integer)];
        let err = ResolvedColumns::resolve(&raw, &specs, SourceKind::Passing, 2005)
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::MissingColumn { .. }));
    }

    #[test]
    fn test_repeated_header_detection() {
        let raw = RawTable::from_strs(&["Player", "Tm"], &[&["Player", "Tm"], &["Tom Brady", "NE"]]);
        assert!(is_repeated_header(&raw, &raw.rows[0], &[0, 1]));
        assert!(!is_repeated_header(&raw, &raw.rows[1], &[0, 1]));
    }
}
