// 🔗 Merge Engine - one season, N sources, one row per base key
//
// base ──left join (person_key, team_code)──▶ advanced
//      ──left join (person_key, team_code)──▶ salary
//                 └─ fallback (person_key, season) for rows still unmatched
//                    (source key must be unique, else MergeCardinality)
//
// Invariants checked on every join:
//   - join keys unique on both sides          (MergeCardinality)
//   - metric columns disjoint across sources  (ColumnConflict)
//   - row count never changes                 (RowCountMismatch)
//   - primary + fallback + unmatched == base  (RowCountMismatch)

use crate::error::{PipelineError, Result};
use crate::identity::{PersonKey, TeamCode};
use crate::record::{SeasonRecord, SeasonTable};
use crate::table::{CleanedTable, Value};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinStrategy {
    /// Exact (person_key, team_code) only
    Primary,
    /// Exact first, then (person_key, season) for base rows still unmatched
    PrimaryWithFallback,
}

/// Match accounting for one join step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReport {
    pub source: String,
    pub base_rows: usize,
    pub matched_primary: usize,
    pub matched_fallback: usize,
    pub unmatched: usize,
}

impl JoinReport {
    fn new(source: &str, base_rows: usize) -> Self {
        JoinReport {
            source: source.to_string(),
            base_rows,
            matched_primary: 0,
            matched_fallback: 0,
            unmatched: 0,
        }
    }

    pub fn matched(&self) -> usize {
        self.matched_primary + self.matched_fallback
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} matched ({} primary, {} fallback), {} unmatched",
            self.source,
            self.matched(),
            self.base_rows,
            self.matched_primary,
            self.matched_fallback,
            self.unmatched
        )
    }
}

/// A base row recovered by the relaxed key, kept for audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackMatch {
    pub source: String,
    pub season: u16,
    pub person_key: PersonKey,
    pub base_team: TeamCode,
    pub source_team: TeamCode,
}

/// Everything a season's merge produced
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub table: SeasonTable,
    pub joins: Vec<JoinReport>,
    pub fallback_matches: Vec<FallbackMatch>,
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct MergeEngine;

impl MergeEngine {
    pub fn new() -> Self {
        MergeEngine
    }

    /// Build the season table from the base population and left-join each source in order
    pub fn merge(
        &self,
        season: u16,
        base: CleanedTable,
        sources: Vec<(CleanedTable, JoinStrategy)>,
    ) -> Result<MergeOutcome> {
        let mut table = self.seed(season, base)?;
        let mut joins = Vec::with_capacity(sources.len());
        let mut fallback_matches = Vec::new();

        for (source, strategy) in sources {
            let (report, recovered) = self.join(&mut table, &source, strategy)?;
            info!(season, "{}", report.summary());
            joins.push(report);
            fallback_matches.extend(recovered);
        }

        ensure_unique(table.records.iter().map(|r| r.key()), season, "merged")?;

        Ok(MergeOutcome {
            table,
            joins,
            fallback_matches,
        })
    }

    /// Base rows become the season's records, one per key
    fn seed(&self, season: u16, base: CleanedTable) -> Result<SeasonTable> {
        ensure_unique(base.rows.iter().map(|r| r.key()), season, &base.source)?;

        let mut table = SeasonTable::new(season);
        for column in &base.columns {
            table.add_column(column, &base.source)?;
        }

        for row in base.rows {
            let mut record = SeasonRecord::new(row.person_key, row.display_name, row.team_code, season);
            for (column, value) in base.columns.iter().zip(row.values) {
                record.set_metric(column, value);
            }
            table.records.push(record);
        }

        debug!(season, source = %base.source, rows = table.len(), "seeded base population");
        Ok(table)
    }

    fn join(
        &self,
        table: &mut SeasonTable,
        source: &CleanedTable,
        strategy: JoinStrategy,
    ) -> Result<(JoinReport, Vec<FallbackMatch>)> {
        let season = table.season;
        let base_rows = table.len();

        ensure_unique(source.rows.iter().map(|r| r.key()), season, &source.source)?;
        for column in &source.columns {
            table.add_column(column, &source.source)?;
        }

        let mut report = JoinReport::new(&source.source, base_rows);
        let mut recovered = Vec::new();

        // base record index → source row index
        let mut assignment: Vec<Option<usize>> = vec![None; base_rows];

        let by_key: HashMap<(PersonKey, TeamCode), usize> = source
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| (row.key(), index))
            .collect();

        for (i, record) in table.records.iter().enumerate() {
            if let Some(&j) = by_key.get(&record.key()) {
                assignment[i] = Some(j);
                report.matched_primary += 1;
            }
        }

        if strategy == JoinStrategy::PrimaryWithFallback {
            self.fallback(table, source, &mut assignment, &mut report, &mut recovered)?;
        }

        report.unmatched = assignment.iter().filter(|a| a.is_none()).count();

        for (record, assigned) in table.records.iter_mut().zip(&assignment) {
            for (c, column) in source.columns.iter().enumerate() {
                let value = assigned
                    .and_then(|j| source.rows[j].values.get(c).cloned())
                    .unwrap_or(Value::Null);
                record.set_metric(column, value);
            }
        }

        if table.len() != base_rows {
            return Err(PipelineError::RowCountMismatch {
                season,
                dataset: source.source.clone(),
                expected: base_rows,
                actual: table.len(),
            });
        }

        let accounted = report.matched_primary + report.matched_fallback + report.unmatched;
        if accounted != base_rows {
            return Err(PipelineError::RowCountMismatch {
                season,
                dataset: source.source.clone(),
                expected: base_rows,
                actual: accounted,
            });
        }

        Ok((report, recovered))
    }

    /// Second pass for base rows still unmatched, keyed by (person_key, season)
    /// against every source row
    ///
    /// A relaxed key held by more than one source row would fan the join out.
    fn fallback(
        &self,
        table: &SeasonTable,
        source: &CleanedTable,
        assignment: &mut [Option<usize>],
        report: &mut JoinReport,
        recovered: &mut Vec<FallbackMatch>,
    ) -> Result<()> {
        let mut candidates: HashMap<(&PersonKey, u16), Vec<usize>> = HashMap::new();
        for (j, row) in source.rows.iter().enumerate() {
            candidates.entry((&row.person_key, source.season)).or_default().push(j);
        }

        // base order keeps recoveries deterministic
        for (i, record) in table.records.iter().enumerate() {
            if assignment[i].is_some() {
                continue;
            }
            let Some(rows) = candidates.get(&(record.person_key(), record.season())) else {
                continue;
            };

            if rows.len() > 1 {
                return Err(PipelineError::MergeCardinality {
                    season: table.season,
                    dataset: source.source.clone(),
                    key: format!("{}/{}", record.person_key(), record.season()),
                });
            }

            let j = rows[0];
            assignment[i] = Some(j);
            report.matched_fallback += 1;

            let matched = FallbackMatch {
                source: source.source.clone(),
                season: table.season,
                person_key: record.person_key().clone(),
                base_team: record.team_code().clone(),
                source_team: source.rows[j].team_code.clone(),
            };
            info!(
                season = table.season,
                source = %source.source,
                player = %matched.person_key,
                base_team = %matched.base_team,
                source_team = %matched.source_team,
                "recovered row on fallback key"
            );
            recovered.push(matched);
        }

        Ok(())
    }
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_unique<I>(keys: I, season: u16, dataset: &str) -> Result<()>
where
    I: Iterator<Item = (PersonKey, TeamCode)>,
{
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key.clone()) {
            return Err(PipelineError::MergeCardinality {
                season,
                dataset: dataset.to_string(),
                key: format!("{}/{}", key.0, key.1),
            });
        }
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
