// 📅 Multi-Season Aggregator - fetch → clean → merge → annotate, per season
//
// Seasons are independent: nothing computed for one season is visible to the
// next. The first registered source is the base population; an error anywhere
// aborts the run and names the season (and source) it came from.

use crate::audit::{RunReport, SeasonAudit, SourceAudit};
use crate::config::PipelineConfig;
use crate::crosswalk::{ClassificationCrosswalk, TeamCrosswalk};
use crate::error::{PipelineError, Result};
use crate::merge::{JoinStrategy, MergeEngine};
use crate::record::{AnalyticTable, SeasonTable};
use crate::sources::{cleaner_for, CsvSnapshotAdapter, SourceAdapter, SourceCleaner, SourceKind};
use crate::table::CleanedTable;
use std::ops::RangeInclusive;
use tracing::info;

/// One registered source: where its rows come from and how they join
pub struct SeasonSource {
    pub adapter: Box<dyn SourceAdapter>,
    pub cleaner: Box<dyn SourceCleaner>,
    pub strategy: JoinStrategy,
    pub first_season: Option<u16>,
}

impl SeasonSource {
    pub fn kind(&self) -> SourceKind {
        self.cleaner.kind()
    }

    pub fn covers(&self, season: u16) -> bool {
        self.first_season.map_or(true, |first| season >= first)
    }
}

pub struct Aggregator {
    sources: Vec<SeasonSource>,
    classification: Option<ClassificationCrosswalk>,
    engine: MergeEngine,
}

impl Aggregator {
    pub fn new() -> Self {
        Aggregator {
            sources: Vec::new(),
            classification: None,
            engine: MergeEngine::new(),
        }
    }

    /// Register a source; the first one registered is the base population
    pub fn with_source(mut self, source: SeasonSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_classification(mut self, crosswalk: ClassificationCrosswalk) -> Self {
        self.classification = Some(crosswalk);
        self
    }

    /// CSV snapshots for all three sites plus whatever crosswalks are configured
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let teams = match &config.team_crosswalk {
            Some(path) => TeamCrosswalk::from_csv(path)?,
            None => TeamCrosswalk::builtin(),
        };

        let mut aggregator = Aggregator::new();
        for kind in SourceKind::ALL {
            let adapter = CsvSnapshotAdapter::new(kind, &config.raw_dir).with_file_stem(config.file_stem(kind));
            aggregator = aggregator.with_source(SeasonSource {
                adapter: Box::new(adapter),
                cleaner: cleaner_for(kind, &teams),
                strategy: config.strategy(kind),
                first_season: config.source(kind).first_season,
            });
        }

        if let Some(path) = &config.classification_crosswalk {
            aggregator = aggregator.with_classification(ClassificationCrosswalk::from_csv(path)?);
        }

        Ok(aggregator)
    }

    /// Build one season's merged table and its audit entry
    pub fn run_season(&self, season: u16) -> Result<(SeasonTable, SeasonAudit)> {
        let (base_source, joined_sources) = self
            .sources
            .split_first()
            .ok_or_else(|| PipelineError::Config("no sources registered".to_string()))?;

        if !base_source.covers(season) {
            return Err(PipelineError::Config(format!(
                "base source {} has no data for season {}",
                base_source.kind().code(),
                season
            )));
        }

        let mut audit = SeasonAudit::new(season);
        let base = self.fetch_and_clean(base_source, season, &mut audit)?;

        let mut joins = Vec::new();
        for source in joined_sources {
            if !source.covers(season) {
                info!(season, source = source.kind().code(), "source not published for season, skipping");
                audit.skipped_sources.push(source.kind().code().to_string());
                continue;
            }
            joins.push((self.fetch_and_clean(source, season, &mut audit)?, source.strategy));
        }

        let outcome = self
            .engine
            .merge(season, base, joins)
            .map_err(|e| e.in_season(season, "merge"))?;
        let mut table = outcome.table;

        if let Some(crosswalk) = &self.classification {
            crosswalk
                .annotate(&mut table)
                .map_err(|e| e.in_season(season, "classification"))?;
        }

        audit.records = table.len();
        audit.joins = outcome.joins;
        audit.fallback_matches = outcome.fallback_matches;

        info!(season, records = table.len(), columns = table.columns.len(), "season merged");
        Ok((table, audit))
    }

    fn fetch_and_clean(
        &self,
        source: &SeasonSource,
        season: u16,
        audit: &mut SeasonAudit,
    ) -> Result<CleanedTable> {
        let code = source.kind().code();
        let raw = source.adapter.fetch(season).map_err(|e| e.in_season(season, code))?;
        let captured = SourceAudit::capture(code, &raw);
        let cleaned = source
            .cleaner
            .clean(raw, season)
            .map_err(|e| e.in_season(season, code))?;

        audit.sources.push(captured.cleaned(&cleaned));
        Ok(cleaned)
    }

    /// Run every season in the range, concatenate, sort
    pub fn aggregate(&self, seasons: RangeInclusive<u16>) -> Result<(AnalyticTable, RunReport)> {
        let mut report = RunReport::start();
        let mut analytic = AnalyticTable::new();

        info!(run_id = %report.run_id, from = seasons.start(), to = seasons.end(), "starting run");

        for season in seasons {
            let (table, audit) = self.run_season(season)?;
            analytic.append(table);
            report.seasons.push(audit);
        }

        analytic.sort();
        report.finish();
        info!("{}", report.summary());

        Ok((analytic, report))
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{AdvancedCleaner, PassingCleaner, SalaryCleaner};
    use crate::table::{RawTable, Value};
    use std::collections::HashMap;

    struct FixtureAdapter {
        kind: SourceKind,
        seasons: HashMap<u16, RawTable>,
    }

    impl SourceAdapter for FixtureAdapter {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn fetch(&self, season: u16) -> Result<RawTable> {
            self.seasons.get(&season).cloned().ok_or_else(|| {
                PipelineError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "no fixture"))
            })
        }
    }

    const PASSING_HEADERS: &[&str] = &[
        "Player", "Tm", "Age", "Pos", "G", "GS", "QBrec", "Cmp", "Att", "Cmp%", "Yds", "TD", "TD%", "Int", "Int%",
        "Y/A", "AY/A", "Y/C", "Y/G", "Rate", "Sk", "Yds", "Sk%", "NY/A", "ANY/A",
    ];

    fn passing(rows: &[(&str, &str, &str)]) -> RawTable {
        let rows: Vec<Vec<&str>> = rows
            .iter()
            .map(|(name, team, att)| {
                vec![
                    *name, *team, "30", "QB", "16", "16", "10-6-0", "350", *att, "64.0", "4000", "25", "4.5", "10",
                    "1.8", "7.2", "7.4", "11.4", "250.0", "95.0", "30", "200", "5.0", "6.5", "6.7",
                ]
            })
            .collect();
        let rows: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
        RawTable::from_strs(PASSING_HEADERS, &rows)
    }

    fn advanced(rows: &[(&str, &str, &str)]) -> RawTable {
        let rows: Vec<Vec<&str>> = rows
            .iter()
            .map(|(name, team, dyar)| vec![*name, *team, *dyar, "100", "10.0%", "9.0%", "3000", "1/10"])
            .collect();
        let rows: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
        RawTable::from_strs(&["Player", "Team", "DYAR", "YAR", "DVOA", "VOA", "EYds", "DPI"], &rows)
    }

    fn salary(rows: &[(&str, &str, &str)]) -> RawTable {
        let rows: Vec<Vec<&str>> = rows.iter().map(|(name, team, cap)| vec![*name, *team, *cap]).collect();
        let rows: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
        RawTable::from_strs(&["Player", "Team", "Salary Cap Value"], &rows)
    }

    fn source(
        kind: SourceKind,
        cleaner: Box<dyn SourceCleaner>,
        seasons: Vec<(u16, RawTable)>,
        first_season: Option<u16>,
    ) -> SeasonSource {
        SeasonSource {
            adapter: Box::new(FixtureAdapter {
                kind,
                seasons: seasons.into_iter().collect(),
            }),
            cleaner,
            strategy: JoinStrategy::PrimaryWithFallback,
            first_season,
        }
    }

    fn aggregator() -> Aggregator {
        Aggregator::new()
            .with_source(source(
                SourceKind::Passing,
                Box::new(PassingCleaner::new()),
                vec![
                    (2019, passing(&[("Tom Brady", "NWE", "613"), ("Drew Brees", "NOR", "378")])),
                    (2020, passing(&[("Tom Brady", "TAM", "610"), ("Aaron Rodgers", "GNB", "526")])),
                ],
                None,
            ))
            .with_source(source(
                SourceKind::Advanced,
                Box::new(AdvancedCleaner::new()),
                vec![
                    (2019, advanced(&[("T.Brady", "NE", "500"), ("D.Brees", "NO", "900")])),
                    (2020, advanced(&[("T.Brady", "TB", "1000")])),
                ],
                None,
            ))
            .with_source(source(
                SourceKind::Salary,
                Box::new(SalaryCleaner::default()),
                vec![(2020, salary(&[("Tom Brady", "Bucs", "$25,000,000"), ("Aaron Rodgers", "Packers", "$21,642,000")]))],
                Some(2020),
            ))
    }

    #[test]
    fn test_aggregate_two_seasons() {
        let (table, report) = aggregator().aggregate(2019..=2020).unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(table.seasons, vec![2019, 2020]);

        let keys: Vec<(String, u16)> = table
            .records
            .iter()
            .map(|r| (r.person_key().to_string(), r.season()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("ARodgers".to_string(), 2020),
                ("DBrees".to_string(), 2019),
                ("TBrady".to_string(), 2019),
                ("TBrady".to_string(), 2020),
            ]
        );

        // 2019 predates salary coverage: column absent, reads as null
        let brady_2019 = &table.records[2];
        assert_eq!(brady_2019.metric("dyar"), &Value::Int(500));
        assert!(brady_2019.metric("salary_cap_value").is_null());
        assert_eq!(report.seasons[0].skipped_sources, vec!["salary"]);

        // "Bucs" is not a known mascot; the fallback pass recovers it
        let brady_2020 = &table.records[3];
        assert_eq!(brady_2020.team_code().as_str(), "TB");
        assert_eq!(brady_2020.metric("salary_cap_value"), &Value::Int(25_000_000));
        assert_eq!(report.fallback_matches().count(), 1);

        assert_eq!(report.total_records(), 4);
        assert_eq!(report.seasons[1].sources.len(), 3);
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn test_missing_snapshot_names_season_and_source() {
        let err = aggregator().aggregate(2019..=2021).unwrap_err();
        match err {
            PipelineError::Season { season, dataset, .. } => {
                assert_eq!(season, 2021);
                assert_eq!(dataset, "passing");
            }
            other => panic!("expected Season wrapper, got {:?}", other),
        }
    }

    #[test]
    fn test_no_sources_is_config_error() {
        assert!(matches!(
            Aggregator::new().run_season(2020),
            Err(PipelineError::Config(_))
        ));
    }
}
