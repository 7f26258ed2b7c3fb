// 🗂️ Run Report - what every season read, dropped, matched and recovered
//
// Serialized to JSON next to the output so a run can be explained after the fact.

use crate::error::Result;
use crate::merge::{FallbackMatch, JoinReport};
use crate::table::{CleanedTable, RawTable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAudit {
    pub source: String,
    pub raw_rows: usize,
    pub cleaned_rows: usize,
    pub duplicates_dropped: usize,
    /// SHA-256 of the raw table as fetched
    pub fingerprint: String,
}

impl SourceAudit {
    /// Raw-side counts, taken before the cleaner consumes the table
    pub fn capture(source: &str, raw: &RawTable) -> Self {
        SourceAudit {
            source: source.to_string(),
            raw_rows: raw.len(),
            cleaned_rows: 0,
            duplicates_dropped: 0,
            fingerprint: raw.fingerprint(),
        }
    }

    pub fn cleaned(mut self, cleaned: &CleanedTable) -> Self {
        self.cleaned_rows = cleaned.len();
        self.duplicates_dropped = cleaned.duplicates_dropped;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonAudit {
    pub season: u16,
    pub records: usize,
    pub sources: Vec<SourceAudit>,
    /// Sources not published yet for this season
    #[serde(default)]
    pub skipped_sources: Vec<String>,
    pub joins: Vec<JoinReport>,
    pub fallback_matches: Vec<FallbackMatch>,
}

impl SeasonAudit {
    pub fn new(season: u16) -> Self {
        SeasonAudit {
            season,
            records: 0,
            sources: Vec::new(),
            skipped_sources: Vec::new(),
            joins: Vec::new(),
            fallback_matches: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub seasons: Vec<SeasonAudit>,
}

impl RunReport {
    pub fn start() -> Self {
        RunReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            seasons: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn total_records(&self) -> usize {
        self.seasons.iter().map(|s| s.records).sum()
    }

    pub fn fallback_matches(&self) -> impl Iterator<Item = &FallbackMatch> {
        self.seasons.iter().flat_map(|s| s.fallback_matches.iter())
    }

    pub fn summary(&self) -> String {
        let unmatched: usize = self
            .seasons
            .iter()
            .flat_map(|s| s.joins.iter())
            .map(|j| j.unmatched)
            .sum();
        format!(
            "run {}: {} season(s), {} records, {} fallback recoveries, {} unmatched join rows",
            self.run_id,
            self.seasons.len(),
            self.total_records(),
            self.fallback_matches().count(),
            unmatched
        )
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
