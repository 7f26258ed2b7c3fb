// 🧾 Season Records - the merged, canonical shape
//
// SeasonRecord  : one row per (PersonKey, TeamCode, season)
// SeasonTable   : every record the merge built for one season
// AnalyticTable : all requested seasons, concatenated and sorted
//
// Identity is fixed at construction. Metrics are keyed by canonical column name;
// a column the season never had is simply absent and reads back as Null.

use crate::error::{PipelineError, Result};
use crate::identity::{PersonKey, TeamCode};
use crate::table::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity columns, in output order
pub const IDENTITY_COLUMNS: [&str; 4] = ["player", "player_full_name", "season", "team"];

/// Metric columns, in output order
pub const METRIC_COLUMNS: [&str; 39] = [
    "age",
    "games",
    "games_started",
    "qb_wins",
    "att",
    "cmp",
    "cmp_pct",
    "yds",
    "yds_per_game",
    "yds_per_att",
    "yds_per_cmp",
    "sacks",
    "sack_yds",
    "sack_pct",
    "dpi_count",
    "dpi_yards",
    "adj_yds_per_att",
    "net_yds_per_att",
    "adj_net_yds_per_att",
    "td",
    "td_pct",
    "int",
    "int_pct",
    "fourth_qtr_comebacks",
    "game_winning_drives",
    "qb_rating",
    "qbr",
    "pro_bowl",
    "all_pro",
    "dyar",
    "yar",
    "dvoa",
    "voa",
    "efctv_yds",
    "salary_cap_value",
    "cash_spent",
    "elite",
    "system",
    "fraud",
];

static NULL: Value = Value::Null;

/// Full canonical header: identity columns then metrics
pub fn canonical_columns() -> Vec<&'static str> {
    IDENTITY_COLUMNS.iter().chain(METRIC_COLUMNS.iter()).copied().collect()
}

// ============================================================================
// SEASON RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonRecord {
    person_key: PersonKey,
    display_name: Option<String>,
    team_code: TeamCode,
    season: u16,
    metrics: BTreeMap<String, Value>,
}

impl SeasonRecord {
    pub fn new(person_key: PersonKey, display_name: Option<String>, team_code: TeamCode, season: u16) -> Self {
        SeasonRecord {
            person_key,
            display_name,
            team_code,
            season,
            metrics: BTreeMap::new(),
        }
    }

    pub fn person_key(&self) -> &PersonKey {
        &self.person_key
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn team_code(&self) -> &TeamCode {
        &self.team_code
    }

    pub fn season(&self) -> u16 {
        self.season
    }

    pub fn key(&self) -> (PersonKey, TeamCode) {
        (self.person_key.clone(), self.team_code.clone())
    }

    /// Metric value; Null when the column is absent
    pub fn metric(&self, column: &str) -> &Value {
        self.metrics.get(column).unwrap_or(&NULL)
    }

    pub(crate) fn set_metric(&mut self, column: &str, value: Value) {
        self.metrics.insert(column.to_string(), value);
    }

    /// Text of any canonical column (identity or metric) for export
    pub fn cell(&self, column: &str) -> String {
        match column {
            "player" => self.person_key.to_string(),
            "player_full_name" => self.display_name.clone().unwrap_or_default(),
            "season" => self.season.to_string(),
            "team" => self.team_code.to_string(),
            metric => self.metric(metric).to_cell(),
        }
    }
}

// ============================================================================
// SEASON TABLE
// ============================================================================

/// Merge output for one season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonTable {
    pub season: u16,
    /// Metric columns contributed this season, in join order
    pub columns: Vec<String>,
    pub records: Vec<SeasonRecord>,
}

impl SeasonTable {
    pub fn new(season: u16) -> Self {
        SeasonTable {
            season,
            columns: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Register a metric column; a second contributor is a ColumnConflict
    pub fn add_column(&mut self, column: &str, dataset: &str) -> Result<()> {
        if self.has_column(column) {
            return Err(PipelineError::ColumnConflict {
                season: self.season,
                dataset: dataset.to_string(),
                column: column.to_string(),
            });
        }
        self.columns.push(column.to_string());
        Ok(())
    }
}

// ============================================================================
// ANALYTIC TABLE
// ============================================================================

/// Multi-season result, ordered by (person_key, season, team_code)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticTable {
    pub seasons: Vec<u16>,
    pub records: Vec<SeasonRecord>,
}

impl AnalyticTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a finished season; records are not touched afterwards
    pub fn append(&mut self, table: SeasonTable) {
        self.seasons.push(table.season);
        self.records.extend(table.records);
    }

    pub fn sort(&mut self) {
        self.records.sort_by(|a, b| {
            a.person_key
                .cmp(&b.person_key)
                .then(a.season.cmp(&b.season))
                .then(a.team_code.cmp(&b.team_code))
        });
    }

    /// Rows as text cells in canonical column order
    pub fn rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        let columns = canonical_columns();
        self.records
            .iter()
            .map(move |record| columns.iter().map(|c| record.cell(c)).collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================
