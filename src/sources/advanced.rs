// 📈 Advanced Cleaner - advanced-metrics site
//
// Names arrive pre-abbreviated ("T.Brady", "A.J.McCarron"), some seasons ship
// the header as the first body row, and DPI is packed as "count/yards".

use super::{finalize, is_repeated_header, require_column, ResolvedColumns, SourceCleaner, SourceKind};
use crate::error::Result;
use crate::identity::{normalize_team, person_key_from_label};
use crate::table::{CleanedRow, CleanedTable, ColumnSpec, ColumnType, RawTable, Value};
use tracing::debug;

pub struct AdvancedCleaner;

impl AdvancedCleaner {
    pub fn new() -> Self {
        AdvancedCleaner
    }

    fn column_specs() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::required("dyar", "DYAR", ColumnType::Integer),
            ColumnSpec::required("yar", "YAR", ColumnType::Integer),
            ColumnSpec::required("dvoa", "DVOA", ColumnType::Percent),
            ColumnSpec::required("voa", "VOA", ColumnType::Percent),
            ColumnSpec::required("efctv_yds", "EYds", ColumnType::Integer),
        ]
    }
}

impl Default for AdvancedCleaner {
    fn default() -> Self {
        Self::new()
    }
}

/// "12/98" → (12, 98); anything else nulls both halves
pub fn split_dpi(raw: &str) -> (Value, Value) {
    let mut parts = raw.trim().split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(count), Some(yards), None) => {
            match (ColumnType::Integer.parse(count), ColumnType::Integer.parse(yards)) {
                (Value::Int(c), Value::Int(y)) => (Value::Int(c), Value::Int(y)),
                _ => (Value::Null, Value::Null),
            }
        }
        _ => (Value::Null, Value::Null),
    }
}

impl SourceCleaner for AdvancedCleaner {
    fn kind(&self) -> SourceKind {
        SourceKind::Advanced
    }

    fn tie_break_metric(&self) -> &'static str {
        "dyar"
    }

    fn clean(&self, mut raw: RawTable, season: u16) -> Result<CleanedTable> {
        let kind = self.kind();
        let raw_rows = raw.len();

        if raw.headers.first().map(|h| h.as_str()) != Some("Player") && raw.promote_first_row() {
            debug!(source = kind.code(), season, "promoted first row to header");
        }

        let player_col = require_column(&raw, "Player", kind, season)?;
        let team_col = require_column(&raw, "Team", kind, season)?;
        let dpi_col = require_column(&raw, "DPI", kind, season)?;

        let resolved = ResolvedColumns::resolve(&raw, &Self::column_specs(), kind, season)?;
        let mut columns = resolved.names();
        columns.push("dpi_count".to_string());
        columns.push("dpi_yards".to_string());

        let mut table = CleanedTable::new(kind.code(), season, columns);

        for row in &raw.rows {
            if is_repeated_header(&raw, row, &[player_col, team_col]) {
                continue;
            }

            let label = raw.cell(row, player_col).trim();
            if label.is_empty() {
                continue;
            }

            let mut values = resolved.values(&raw, row);
            let (dpi_count, dpi_yards) = split_dpi(raw.cell(row, dpi_col));
            values.push(dpi_count);
            values.push(dpi_yards);

            table.rows.push(CleanedRow {
                person_key: person_key_from_label(label)?,
                display_name: None,
                team_code: normalize_team(raw.cell(row, team_col)),
                values,
            });
        }

        Ok(finalize(table, self.tie_break_metric(), raw_rows))
    }
}

// ============================================================================
// TESTS
// ============================================================================
