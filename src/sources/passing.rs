// 🏈 Passing Cleaner - play-by-play stats site (base population)
//
// Raw table quirks handled here:
//   - header row repeated every ~30 rows inside the body
//   - "Tom Brady*+" : `*` = Pro Bowl, `+` = All-Pro
//   - QBrec "9-3-0" instead of a wins column
//   - QBR / 4QC / GWD only exist for later seasons

use super::{finalize, full_name_key, integer_cell, is_repeated_header, require_column, ResolvedColumns, SourceCleaner, SourceKind};
use crate::error::{PipelineError, Result};
use crate::identity::{normalize_team, strip_award_markers};
use crate::table::{CleanedRow, CleanedTable, ColumnSpec, ColumnType, RawTable, Value};
use tracing::debug;

/// Last season of the 16-game schedule
const LAST_SIXTEEN_GAME_SEASON: u16 = 2020;

/// Regular-season games a quarterback could have started
pub fn max_games(season: u16) -> u32 {
    if season <= LAST_SIXTEEN_GAME_SEASON {
        16
    } else {
        17
    }
}

/// Wins from a "W-L-T" record; ties count half
///
/// Zero starts or an empty record yields `None`. A record with the wrong
/// shape, a non-numeric part, or a game total outside the season's range
/// is a `MalformedRecord`.
pub fn qb_wins(games_started: i64, record: &str, season: u16) -> Result<Option<f64>> {
    let record = record.trim();
    if games_started == 0 || record.is_empty() {
        return Ok(None);
    }

    let malformed = |reason: String| PipelineError::MalformedRecord {
        season,
        value: record.to_string(),
        reason,
    };

    let parts: Vec<&str> = record.split('-').collect();
    if parts.len() != 3 {
        return Err(malformed(format!("expected W-L-T, found {} component(s)", parts.len())));
    }

    let mut wlt = [0.0_f64; 3];
    for (slot, part) in wlt.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| malformed(format!("component '{}' is not numeric", part.trim())))?;
    }

    let wins = wlt[0] + wlt[2] * 0.5;
    let losses = wlt[1] + wlt[2] * 0.5;
    let total = wins + losses;

    if total < 1.0 || total > max_games(season) as f64 {
        return Err(malformed(format!(
            "{} games outside 1..={} for season {}",
            total,
            max_games(season),
            season
        )));
    }

    Ok(Some(wins))
}

// ============================================================================
// CLEANER
// ============================================================================

pub struct PassingCleaner;

impl PassingCleaner {
    pub fn new() -> Self {
        PassingCleaner
    }

    fn column_specs() -> Vec<ColumnSpec> {
        use ColumnType::*;
        vec![
            ColumnSpec::required("age", "Age", Integer),
            ColumnSpec::required("games", "G", Integer),
            ColumnSpec::required("games_started", "GS", Integer),
            ColumnSpec::required("cmp", "Cmp", Integer),
            ColumnSpec::required("att", "Att", Integer),
            ColumnSpec::required("cmp_pct", "Cmp%", Percent),
            ColumnSpec::required("yds", "Yds", Integer),
            ColumnSpec::required("td", "TD", Integer),
            ColumnSpec::required("td_pct", "TD%", Percent),
            ColumnSpec::required("int", "Int", Integer),
            ColumnSpec::required("int_pct", "Int%", Percent),
            ColumnSpec::required("yds_per_att", "Y/A", Real),
            ColumnSpec::required("adj_yds_per_att", "AY/A", Real),
            ColumnSpec::required("yds_per_cmp", "Y/C", Real),
            ColumnSpec::required("yds_per_game", "Y/G", Real),
            ColumnSpec::required("qb_rating", "Rate", Real),
            ColumnSpec::optional("qbr", "QBR", Real),
            ColumnSpec::required("sacks", "Sk", Integer),
            ColumnSpec::required("sack_yds", "Yds.1", Integer),
            ColumnSpec::required("sack_pct", "Sk%", Percent),
            ColumnSpec::required("net_yds_per_att", "NY/A", Real),
            ColumnSpec::required("adj_net_yds_per_att", "ANY/A", Real),
            ColumnSpec::optional("fourth_qtr_comebacks", "4QC", Integer),
            ColumnSpec::optional("game_winning_drives", "GWD", Integer),
        ]
    }

    /// Computed columns appended after the header-backed ones
    fn derived_specs() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::derived("qb_wins", ColumnType::Real),
            ColumnSpec::derived("pro_bowl", ColumnType::Integer),
            ColumnSpec::derived("all_pro", ColumnType::Integer),
        ]
    }
}

impl Default for PassingCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceCleaner for PassingCleaner {
    fn kind(&self) -> SourceKind {
        SourceKind::Passing
    }

    fn tie_break_metric(&self) -> &'static str {
        "att"
    }

    fn clean(&self, raw: RawTable, season: u16) -> Result<CleanedTable> {
        let kind = self.kind();
        let player_col = require_column(&raw, "Player", kind, season)?;
        let team_col = require_column(&raw, "Tm", kind, season)?;
        let pos_col = require_column(&raw, "Pos", kind, season)?;
        let gs_col = require_column(&raw, "GS", kind, season)?;
        let record_col = require_column(&raw, "QBrec", kind, season)?;

        let resolved = ResolvedColumns::resolve(&raw, &Self::column_specs(), kind, season)?;
        let mut columns = resolved.names();
        columns.extend(Self::derived_specs().into_iter().map(|spec| spec.name));

        let mut table = CleanedTable::new(kind.code(), season, columns);
        let mut skipped_non_qb = 0usize;

        for (line, row) in raw.rows.iter().enumerate() {
            if is_repeated_header(&raw, row, &[player_col, team_col]) {
                continue;
            }

            let raw_name = raw.cell(row, player_col).trim();
            if raw_name.is_empty() {
                continue;
            }

            if raw.cell(row, pos_col).trim() != "QB" {
                skipped_non_qb += 1;
                continue;
            }

            let team_code = normalize_team(raw.cell(row, team_col));
            let person_key = full_name_key(raw_name, kind, line + 2, &team_code)?;

            let starts = integer_cell(&raw, row, gs_col).unwrap_or(0);
            let wins = qb_wins(starts, raw.cell(row, record_col), season)?;

            let mut values = resolved.values(&raw, row);
            values.push(wins.map(Value::Real).unwrap_or(Value::Null));
            values.push(Value::Int(raw_name.contains('*') as i64));
            values.push(Value::Int(raw_name.contains('+') as i64));

            table.rows.push(CleanedRow {
                person_key,
                display_name: Some(strip_award_markers(raw_name)),
                team_code,
                values,
            });
        }

        debug!(source = kind.code(), season, skipped_non_qb, "position filter applied");

        Ok(finalize(table, self.tie_break_metric(), raw.len()))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const HEADERS: &[&str] = &[
        "Rk", "Player", "Tm", "Age", "Pos", "G", "GS", "QBrec", "Cmp", "Att", "Cmp%", "Yds", "TD", "TD%", "Int",
        "Int%", "1D", "Lng", "Y/A", "AY/A", "Y/C", "Y/G", "Rate", "QBR", "Sk", "Yds", "Sk%", "NY/A", "ANY/A",
        "4QC", "GWD",
    ];

    fn passing_row<'a>(name: &'a str, team: &'a str, pos: &'a str, gs: &'a str, rec: &'a str, att: &'a str) -> Vec<&'a str> {
        vec![
            "1", name, team, "43", pos, "16", gs, rec, "373", att, "65.7", "4633", "40", "6.6", "12", "2.0", "220",
            "50", "7.6", "7.9", "12.4", "289.6", "102.2", "63.5", "21", "143", "3.3", "7.1", "7.3", "2", "3",
        ]
    }

    fn raw(rows: Vec<Vec<&str>>) -> RawTable {
        let rows: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
        RawTable::from_strs(HEADERS, &rows)
    }

    #[test]
    fn test_qb_wins_from_record() {
        assert_eq!(qb_wins(12, "9-3-0", 2020).unwrap(), Some(9.0));
        assert_eq!(qb_wins(16, "10-5-1", 2019).unwrap(), Some(10.5));
        assert_eq!(qb_wins(17, "12-5-0", 2021).unwrap(), Some(12.0));
    }

    #[test]
    fn test_qb_wins_null_without_starts_or_record() {
        assert_eq!(qb_wins(0, "", 2020).unwrap(), None);
        assert_eq!(qb_wins(0, "1-0-0", 2020).unwrap(), None);
        assert_eq!(qb_wins(3, "  ", 2020).unwrap(), None);
    }

    #[test]
    fn test_qb_wins_rejects_bad_records() {
        // 17 games before the schedule expanded
        let err = qb_wins(16, "12-5-0", 2020).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRecord { season: 2020, .. }));

        assert!(qb_wins(12, "9-3", 2020).is_err());
        assert!(qb_wins(12, "9-x-0", 2020).is_err());
        assert!(qb_wins(1, "0-0-0", 2020).is_err());
        assert!(qb_wins(12, "NaN-0-0", 2020).is_err());
        assert!(qb_wins(12, "9-inf-0", 2020).is_err());
    }

    #[test]
    fn test_max_games_by_season() {
        assert_eq!(max_games(1999), 16);
        assert_eq!(max_games(2020), 16);
        assert_eq!(max_games(2021), 17);
    }

    #[test]
    fn test_clean_filters_and_derives() {
        let table = PassingCleaner::new()
            .clean(
                raw(vec![
                    passing_row("Tom Brady*+", "NWE", "QB", "16", "12-4-0", "581"),
                    HEADERS.to_vec(),
                    passing_row("Julian Edelman", "NWE", "WR", "0", "", "2"),
                    passing_row("", "NWE", "QB", "0", "", "0"),
                    passing_row("Philip Rivers", "SDG", "QB", "16", "9-7-0", "570"),
                ]),
                2017,
            )
            .unwrap();

        assert_eq!(table.len(), 2);
        let brady = &table.rows[0];
        assert_eq!(brady.person_key.as_str(), "TBrady");
        assert_eq!(brady.team_code.as_str(), "NE");
        assert_eq!(brady.display_name.as_deref(), Some("Tom Brady"));
        assert_eq!(table.value(brady, "qb_wins"), Some(&Value::Real(12.0)));
        assert_eq!(table.value(brady, "pro_bowl"), Some(&Value::Int(1)));
        assert_eq!(table.value(brady, "all_pro"), Some(&Value::Int(1)));
        assert_eq!(table.value(brady, "sack_yds"), Some(&Value::Int(143)));
        assert_eq!(table.value(brady, "cmp_pct"), Some(&Value::Real(65.7)));

        let rivers = &table.rows[1];
        assert_eq!(rivers.team_code.as_str(), "LAC");
        assert_eq!(table.value(rivers, "pro_bowl"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_optional_columns_absent_in_early_seasons() {
        let headers: Vec<&str> = HEADERS.iter().copied().filter(|h| !matches!(*h, "QBR" | "4QC" | "GWD")).collect();
        let full = passing_row("Dan Marino", "MIA", "QB", "16", "8-8-0", "600");
        let row: Vec<&str> = HEADERS
            .iter()
            .zip(full)
            .filter(|(h, _)| !matches!(**h, "QBR" | "4QC" | "GWD"))
            .map(|(_, c)| c)
            .collect();

        let table = PassingCleaner::new()
            .clean(RawTable::from_strs(&headers, &[row.as_slice()]), 1995)
            .unwrap();

        assert!(table.column_index("qbr").is_none());
        assert!(table.column_index("fourth_qtr_comebacks").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_duplicate_key_keeps_most_attempts() {
        let table = PassingCleaner::new()
            .clean(
                raw(vec![
                    passing_row("Josh Smith", "NWE", "QB", "2", "1-1-0", "40"),
                    passing_row("Jake Smith", "NWE", "QB", "10", "6-4-0", "300"),
                ]),
                2018,
            )
            .unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.duplicates_dropped, 1);
        assert_eq!(table.rows[0].display_name.as_deref(), Some("Jake Smith"));
    }

    #[test]
    fn test_single_token_name_reports_row() {
        let err = PassingCleaner::new()
            .clean(raw(vec![passing_row("Tebow", "DEN", "QB", "11", "7-4-0", "271")]), 2011)
            .unwrap_err();
        match err {
            PipelineError::MalformedName { name, context } => {
                assert_eq!(name, "Tebow");
                assert!(context.contains("row 2"));
            }
            other => panic!("expected MalformedName, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_record_fails_clean() {
        let err = PassingCleaner::new()
            .clean(raw(vec![passing_row("Tom Brady", "NWE", "QB", "16", "9-9-0", "500")]), 2010)
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRecord { .. }));
    }
}
