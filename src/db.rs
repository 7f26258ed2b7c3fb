// 🗄️ SQLite Load - qb_season table + events audit trail
//
// qb_season mirrors the CSV export column-for-column, keyed by
// (player, season, team). Reloading a season replaces its rows.

use crate::audit::RunReport;
use crate::error::Result;
use crate::record::{canonical_columns, AnalyticTable};
use crate::table::Value;
use chrono::{DateTime, Utc};
use rusqlite::types::{ToSqlOutput, Value as SqlValue};
use rusqlite::{params, params_from_iter, Connection, ToSql};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Metric columns stored as INTEGER; everything else numeric is REAL
const INTEGER_COLUMNS: &[&str] = &[
    "age",
    "games",
    "games_started",
    "att",
    "cmp",
    "yds",
    "sacks",
    "sack_yds",
    "dpi_count",
    "dpi_yards",
    "td",
    "int",
    "fourth_qtr_comebacks",
    "game_winning_drives",
    "pro_bowl",
    "all_pro",
    "dyar",
    "yar",
    "efctv_yds",
    "salary_cap_value",
    "cash_spent",
];

fn column_definition(column: &str) -> String {
    let sql_type = match column {
        "player" | "team" => "TEXT NOT NULL",
        "player_full_name" => "TEXT NULL",
        "season" => "INTEGER NOT NULL",
        c if INTEGER_COLUMNS.contains(&c) => "INTEGER NULL",
        _ => "REAL NULL",
    };
    format!("\"{}\" {}", column, sql_type)
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Int(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Real(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Text(s) => ToSqlOutput::Owned(SqlValue::Text(s.clone())),
        })
    }
}

// ============================================================================
// EVENTS
// ============================================================================

/// One entry in the audit trail
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    let columns: Vec<String> = canonical_columns().into_iter().map(column_definition).collect();
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS qb_season (
                {},
                PRIMARY KEY(player, season, team)
            )",
            columns.join(",\n                ")
        ),
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute("CREATE INDEX IF NOT EXISTS idx_qb_season_season ON qb_season(season)", [])?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// LOAD
// ============================================================================

/// Insert or replace every record; returns rows written
pub fn load_season_records(conn: &mut Connection, table: &AnalyticTable) -> Result<usize> {
    let columns = canonical_columns();
    let quoted: Vec<String> = columns.iter().map(|c| format!("\"{}\"", c)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT OR REPLACE INTO qb_season ({}) VALUES ({})",
        quoted.join(", "),
        placeholders.join(", ")
    );

    let tx = conn.transaction()?;
    let mut written = 0;
    {
        let mut stmt = tx.prepare(&sql)?;
        for record in &table.records {
            let values: Vec<Value> = columns
                .iter()
                .map(|column| match *column {
                    "player" => Value::Text(record.person_key().to_string()),
                    "player_full_name" => record
                        .display_name()
                        .map(|n| Value::Text(n.to_string()))
                        .unwrap_or(Value::Null),
                    "season" => Value::Int(record.season() as i64),
                    "team" => Value::Text(record.team_code().to_string()),
                    metric => record.metric(metric).clone(),
                })
                .collect();
            written += stmt.execute(params_from_iter(values.iter()))?;
        }
    }
    tx.commit()?;

    info!(rows = written, "loaded qb_season");
    Ok(written)
}

/// Log the run and each fallback recovery to the events table
pub fn record_run(conn: &Connection, report: &RunReport) -> Result<usize> {
    let run_id = report.run_id.to_string();
    let mut events = vec![Event::new(
        "run_completed",
        "run",
        &run_id,
        serde_json::json!({
            "seasons": report.seasons.iter().map(|s| s.season).collect::<Vec<_>>(),
            "records": report.total_records(),
            "started_at": report.started_at.to_rfc3339(),
            "finished_at": report.finished_at.map(|t| t.to_rfc3339()),
        }),
        "qb_reconcile",
    )];

    for matched in report.fallback_matches() {
        events.push(Event::new(
            "fallback_match",
            "run",
            &run_id,
            serde_json::to_value(matched)?,
            "merge_engine",
        ));
    }

    for event in &events {
        insert_event(conn, event)?;
    }
    Ok(events.len())
}

pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM qb_season", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::SeasonAudit;
    use crate::identity::{PersonKey, TeamCode};
    use crate::merge::FallbackMatch;
    use crate::record::{SeasonRecord, SeasonTable};

    fn analytic(cap: i64) -> AnalyticTable {
        let mut season = SeasonTable::new(2020);
        let mut record = SeasonRecord::new(
            PersonKey::from("TBrady"),
            Some("Tom Brady".to_string()),
            TeamCode::from("TB"),
            2020,
        );
        record.set_metric("int", Value::Int(12));
        record.set_metric("cmp_pct", Value::Real(65.7));
        record.set_metric("salary_cap_value", Value::Int(cap));
        season.records.push(record);
        season
            .records
            .push(SeasonRecord::new(PersonKey::from("DBrees"), None, TeamCode::from("NO"), 2020));

        let mut table = AnalyticTable::new();
        table.append(season);
        table
    }

    #[test]
    fn test_load_is_idempotent_per_key() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        assert_eq!(load_season_records(&mut conn, &analytic(25_000_000)).unwrap(), 2);
        load_season_records(&mut conn, &analytic(30_000_000)).unwrap();
        assert_eq!(verify_count(&conn).unwrap(), 2);

        let (cap, int, full_name): (i64, i64, Option<String>) = conn
            .query_row(
                "SELECT salary_cap_value, \"int\", player_full_name FROM qb_season WHERE player = 'TBrady'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(cap, 30_000_000);
        assert_eq!(int, 12);
        assert_eq!(full_name.as_deref(), Some("Tom Brady"));

        let qbr: Option<f64> = conn
            .query_row("SELECT qbr FROM qb_season WHERE player = 'DBrees'", [], |row| row.get(0))
            .unwrap();
        assert!(qbr.is_none());
    }

    #[test]
    fn test_setup_twice_is_harmless() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        setup_database(&conn).unwrap();
        assert_eq!(verify_count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_record_run_logs_fallbacks() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let mut report = RunReport::start();
        let mut season = SeasonAudit::new(2020);
        season.records = 2;
        season.fallback_matches.push(FallbackMatch {
            source: "salary".to_string(),
            season: 2020,
            person_key: PersonKey::from("JSmith"),
            base_team: TeamCode::from("NE"),
            source_team: TeamCode::from("PAT"),
        });
        report.seasons.push(season);
        report.finish();

        assert_eq!(record_run(&conn, &report).unwrap(), 2);

        let mut stmt = conn
            .prepare("SELECT event_type, data FROM events WHERE entity_type = 'run' AND entity_id = ?1 ORDER BY id")
            .unwrap();
        let events: Vec<(String, serde_json::Value)> = stmt
            .query_map([report.run_id.to_string()], |row| {
                let data: String = row.get(1)?;
                Ok((row.get(0)?, serde_json::from_str(&data).unwrap()))
            })
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, "run_completed");
        assert_eq!(events[0].1["records"], 2);
        assert_eq!(events[1].0, "fallback_match");
        assert_eq!(events[1].1["source_team"], "PAT");
    }
}
