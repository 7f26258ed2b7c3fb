// 💰 Salary Cleaner - salary/cap site
//
// Teams are mascots ("Patriots"), money is "$25,000,000", and a player traded
// mid-season can appear more than once for the same team.

use super::{finalize, full_name_key, is_repeated_header, require_column, SourceCleaner, SourceKind};
use crate::crosswalk::TeamCrosswalk;
use crate::error::{PipelineError, Result};
use crate::identity::normalize_team;
use crate::table::{parse_currency, CleanedRow, CleanedTable, RawTable, Value};
use tracing::warn;

/// Older exports say "Salary Cap Value", newer ones "Cap Number"
const CAP_HEADERS: [&str; 2] = ["Salary Cap Value", "Cap Number"];
const CASH_HEADER: &str = "Cash Spent";

pub struct SalaryCleaner {
    teams: TeamCrosswalk,
}

impl SalaryCleaner {
    pub fn new(teams: TeamCrosswalk) -> Self {
        SalaryCleaner { teams }
    }
}

impl Default for SalaryCleaner {
    fn default() -> Self {
        Self::new(TeamCrosswalk::builtin())
    }
}

impl SourceCleaner for SalaryCleaner {
    fn kind(&self) -> SourceKind {
        SourceKind::Salary
    }

    fn tie_break_metric(&self) -> &'static str {
        "salary_cap_value"
    }

    fn clean(&self, raw: RawTable, season: u16) -> Result<CleanedTable> {
        let kind = self.kind();
        let player_col = require_column(&raw, "Player", kind, season)?;
        let team_col = require_column(&raw, "Team", kind, season)?;
        let cap_col = CAP_HEADERS
            .iter()
            .find_map(|header| raw.column_index(header))
            .ok_or_else(|| PipelineError::MissingColumn {
                dataset: kind.code().to_string(),
                season,
                column: CAP_HEADERS[0].to_string(),
            })?;
        let cash_col = raw.column_index(CASH_HEADER);

        let mut columns = vec!["salary_cap_value".to_string()];
        if cash_col.is_some() {
            columns.push("cash_spent".to_string());
        }

        let mut table = CleanedTable::new(kind.code(), season, columns);
        let mut unmapped: Vec<String> = Vec::new();

        for (line, row) in raw.rows.iter().enumerate() {
            if is_repeated_header(&raw, row, &[player_col, team_col]) {
                continue;
            }

            let raw_name = raw.cell(row, player_col).trim();
            if raw_name.is_empty() {
                continue;
            }

            let mascot = raw.cell(row, team_col).trim();
            let team_code = match self.teams.lookup(mascot) {
                Some(code) => code.clone(),
                None => {
                    if !unmapped.iter().any(|m| m == mascot) {
                        unmapped.push(mascot.to_string());
                    }
                    normalize_team(mascot)
                }
            };

            let person_key = full_name_key(raw_name, kind, line + 2, &team_code)?;

            let mut values: Vec<Value> = vec![parse_currency(raw.cell(row, cap_col))];
            if let Some(index) = cash_col {
                values.push(parse_currency(raw.cell(row, index)));
            }

            table.rows.push(CleanedRow {
                person_key,
                display_name: Some(raw_name.to_string()),
                team_code,
                values,
            });
        }

        if !unmapped.is_empty() {
            warn!(
                source = kind.code(),
                season,
                mascots = %unmapped.join(", "),
                "mascots missing from team crosswalk, kept as raw labels"
            );
        }

        Ok(finalize(table, self.tie_break_metric(), raw.len()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
