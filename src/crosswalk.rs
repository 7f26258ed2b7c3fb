// 🔀 Crosswalks - lookup tables as data
//
// TeamCrosswalk           : salary-site mascot → TeamCode ("Patriots" → NE)
// ClassificationCrosswalk : player → elite / system / fraud flags
//
// Both load from simple two-sided CSVs. A miss is never an error: the caller
// logs it and carries on with Null / a best-effort code.

use crate::error::{PipelineError, Result};
use crate::identity::{normalize_team, person_key_from_label, PersonKey, TeamCode};
use crate::record::SeasonTable;
use crate::sources::read_raw_csv;
use crate::table::{ColumnType, Value};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

/// Mascots as the salary site prints them (current and historical)
const BUILTIN_MASCOTS: &[(&str, &str)] = &[
    ("Cardinals", "ARI"),
    ("Falcons", "ATL"),
    ("Ravens", "BAL"),
    ("Bills", "BUF"),
    ("Panthers", "CAR"),
    ("Bears", "CHI"),
    ("Bengals", "CIN"),
    ("Browns", "CLE"),
    ("Cowboys", "DAL"),
    ("Broncos", "DEN"),
    ("Lions", "DET"),
    ("Packers", "GB"),
    ("Texans", "HOU"),
    ("Colts", "IND"),
    ("Jaguars", "JAX"),
    ("Chiefs", "KC"),
    ("Chargers", "LAC"),
    ("Rams", "LAR"),
    ("Raiders", "LV"),
    ("Dolphins", "MIA"),
    ("Vikings", "MIN"),
    ("Patriots", "NE"),
    ("Saints", "NO"),
    ("Giants", "NYG"),
    ("Jets", "NYJ"),
    ("Eagles", "PHI"),
    ("Steelers", "PIT"),
    ("Seahawks", "SEA"),
    ("49ers", "SF"),
    ("Buccaneers", "TB"),
    ("Titans", "TEN"),
    ("Commanders", "WAS"),
    ("Football Team", "WAS"),
    ("Redskins", "WAS"),
    ("Multiple Teams", "2TM"),
];

// ============================================================================
// TEAM CROSSWALK
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct TeamCrosswalkRow {
    mascot: String,
    team: String,
}

#[derive(Debug, Clone, Default)]
pub struct TeamCrosswalk {
    teams: HashMap<String, TeamCode>,
}

impl TeamCrosswalk {
    pub fn builtin() -> Self {
        let teams = BUILTIN_MASCOTS
            .iter()
            .map(|(mascot, team)| (mascot.to_string(), TeamCode::from(*team)))
            .collect();
        TeamCrosswalk { teams }
    }

    /// Load `mascot,team` pairs; team labels go through `normalize_team`
    ///
    /// Malformed rows and rows with a blank mascot or team are skipped, so
    /// those mascots stay misses.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(File::open(path)?);

        let mut teams = HashMap::new();
        let mut skipped = 0;
        for (index, row) in reader.deserialize::<TeamCrosswalkRow>().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(path = %path.display(), line = index + 2, error = %e, "skipping malformed crosswalk row");
                    skipped += 1;
                    continue;
                }
            };

            let (mascot, team) = (row.mascot.trim(), row.team.trim());
            if mascot.is_empty() || team.is_empty() {
                warn!(path = %path.display(), line = index + 2, mascot, "skipping crosswalk row without a team");
                skipped += 1;
                continue;
            }
            teams.insert(mascot.to_string(), normalize_team(team));
        }

        info!(path = %path.display(), entries = teams.len(), skipped, "loaded team crosswalk");
        Ok(TeamCrosswalk { teams })
    }

    pub fn lookup(&self, mascot: &str) -> Option<&TeamCode> {
        self.teams.get(mascot.trim())
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

// ============================================================================
// CLASSIFICATION CROSSWALK
// ============================================================================

/// Column names the classification file contributes
pub const CLASSIFICATION_COLUMNS: [&str; 3] = ["elite", "system", "fraud"];

const CLASSIFICATION_DATASET: &str = "classification";

#[derive(Debug, Clone, Default)]
pub struct ClassificationCrosswalk {
    players: HashMap<PersonKey, [Value; 3]>,
}

impl ClassificationCrosswalk {
    /// Load `player,elite,system,fraud`; a player listed twice is rejected
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = read_raw_csv(path)?;

        let missing = |column: &str| {
            PipelineError::Config(format!("{} has no '{}' column", path.display(), column))
        };
        let player_col = raw.column_index("player").ok_or_else(|| missing("player"))?;
        let mut flag_cols = [0usize; 3];
        for (slot, column) in flag_cols.iter_mut().zip(CLASSIFICATION_COLUMNS) {
            *slot = raw.column_index(column).ok_or_else(|| missing(column))?;
        }

        let mut players = HashMap::new();
        for row in &raw.rows {
            let label = raw.cell(row, player_col).trim();
            if label.is_empty() {
                continue;
            }

            let key = person_key_from_label(label)?;
            let flags = flag_cols.map(|index| ColumnType::Real.parse(raw.cell(row, index)));

            if players.insert(key.clone(), flags).is_some() {
                return Err(PipelineError::Config(format!(
                    "{} lists player {} more than once",
                    path.display(),
                    key
                )));
            }
        }

        info!(path = %path.display(), entries = players.len(), "loaded classification crosswalk");
        Ok(ClassificationCrosswalk { players })
    }

    pub fn lookup(&self, key: &PersonKey) -> Option<&[Value; 3]> {
        self.players.get(key)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Left-join the flags onto a merged season; returns how many records matched
    pub fn annotate(&self, table: &mut SeasonTable) -> Result<usize> {
        for column in CLASSIFICATION_COLUMNS {
            table.add_column(column, CLASSIFICATION_DATASET)?;
        }

        let mut matched = 0;
        let mut misses = Vec::new();

        for record in table.records.iter_mut() {
            match self.players.get(record.person_key()) {
                Some(flags) => {
                    for (column, value) in CLASSIFICATION_COLUMNS.iter().zip(flags.iter()) {
                        record.set_metric(column, value.clone());
                    }
                    matched += 1;
                }
                None => {
                    for column in CLASSIFICATION_COLUMNS {
                        record.set_metric(column, Value::Null);
                    }
                    misses.push(record.person_key().to_string());
                }
            }
        }

        if !misses.is_empty() {
            warn!(
                season = table.season,
                missing = misses.len(),
                players = %misses.join(", "),
                "players absent from classification crosswalk"
            );
        }

        Ok(matched)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SeasonRecord;
    use std::io::Write;

    #[test]
    fn test_builtin_mascots() {
        let teams = TeamCrosswalk::builtin();
        assert_eq!(teams.lookup("Patriots").map(|t| t.as_str()), Some("NE"));
        assert_eq!(teams.lookup(" Redskins ").map(|t| t.as_str()), Some("WAS"));
        assert!(teams.lookup("Pats").is_none());
    }

    #[test]
    fn test_team_crosswalk_from_csv_normalizes_codes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("team_name_xwalk.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "mascot,team").unwrap();
        writeln!(file, "Patriots,NWE").unwrap();
        writeln!(file, "Chargers,SDG").unwrap();
        drop(file);

        let teams = TeamCrosswalk::from_csv(&path).unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams.lookup("Patriots").map(|t| t.as_str()), Some("NE"));
        assert_eq!(teams.lookup("Chargers").map(|t| t.as_str()), Some("LAC"));
    }

    #[test]
    fn test_team_crosswalk_skips_malformed_and_blank_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("team_name_xwalk.csv");
        std::fs::write(&path, "mascot,team\nPatriots,NE\nBucs\nJets,\nDolphins,  \nBills,BUF\n").unwrap();

        let teams = TeamCrosswalk::from_csv(&path).unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams.lookup("Patriots").map(|t| t.as_str()), Some("NE"));
        assert_eq!(teams.lookup("Bills").map(|t| t.as_str()), Some("BUF"));
        assert!(teams.lookup("Bucs").is_none());
        assert!(teams.lookup("Jets").is_none());
        assert!(teams.lookup("Dolphins").is_none());
    }

    fn classification_file(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("elite_system_fraud.csv");
        let mut file = File::create(&path).unwrap();
        write!(file, "player,elite,system,fraud\n{}", body).unwrap();
        path
    }

    #[test]
    fn test_classification_annotates_and_nulls_misses() {
        let dir = tempfile::tempdir().unwrap();
        let path = classification_file(&dir, "Tom Brady,1,0,0\nA.J. McCarron,0,0,1\n");
        let crosswalk = ClassificationCrosswalk::from_csv(&path).unwrap();
        assert_eq!(crosswalk.len(), 2);

        let mut table = SeasonTable::new(2016);
        table.records.push(SeasonRecord::new(PersonKey::from("TBrady"), None, TeamCode::from("NE"), 2016));
        table.records.push(SeasonRecord::new(PersonKey::from("DBrees"), None, TeamCode::from("NO"), 2016));

        let matched = crosswalk.annotate(&mut table).unwrap();

        assert_eq!(matched, 1);
        assert!(table.has_column("elite"));
        assert_eq!(table.records[0].metric("elite"), &Value::Real(1.0));
        assert_eq!(table.records[0].metric("fraud"), &Value::Real(0.0));
        assert!(table.records[1].metric("elite").is_null());
    }

    #[test]
    fn test_classification_rejects_duplicate_player() {
        let dir = tempfile::tempdir().unwrap();
        let path = classification_file(&dir, "Tom Brady,1,0,0\nTom Brady*,0,1,0\n");
        assert!(matches!(
            ClassificationCrosswalk::from_csv(&path),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_annotate_twice_conflicts() {
        let crosswalk = ClassificationCrosswalk::default();
        let mut table = SeasonTable::new(2016);
        crosswalk.annotate(&mut table).unwrap();
        assert!(crosswalk.annotate(&mut table).is_err());
    }
}
