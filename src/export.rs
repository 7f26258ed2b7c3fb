// 📤 CSV Export - canonical column order, nulls as empty cells

use crate::error::Result;
use crate::record::{canonical_columns, AnalyticTable};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Write the table to any writer; returns rows written
pub fn write_csv_to<W: Write>(table: &AnalyticTable, writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(canonical_columns())?;

    let mut written = 0;
    for row in table.rows() {
        wtr.write_record(&row)?;
        written += 1;
    }

    wtr.flush()?;
    Ok(written)
}

pub fn write_csv<P: AsRef<Path>>(table: &AnalyticTable, path: P) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let written = write_csv_to(table, File::create(path)?)?;
    info!(path = %path.display(), rows = written, "wrote season records");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{PersonKey, TeamCode};
    use crate::record::{SeasonRecord, SeasonTable};
    use crate::table::Value;

    fn sample() -> AnalyticTable {
        let mut season = SeasonTable::new(2020);
        let mut record = SeasonRecord::new(
            PersonKey::from("TBrady"),
            Some("Tom Brady".to_string()),
            TeamCode::from("TB"),
            2020,
        );
        record.set_metric("att", Value::Int(610));
        record.set_metric("cmp_pct", Value::Real(65.7));
        record.set_metric("qbr", Value::Null);
        season.records.push(record);

        let mut table = AnalyticTable::new();
        table.append(season);
        table
    }

    #[test]
    fn test_header_and_null_cells() {
        let mut buffer = Vec::new();
        let written = write_csv_to(&sample(), &mut buffer).unwrap();
        assert_eq!(written, 1);

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("player,player_full_name,season,team,age,games"));
        assert!(header.ends_with("elite,system,fraud"));

        let row: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(&row[..4], &["TBrady", "Tom Brady", "2020", "TB"]);
        assert_eq!(row[4], "");
        assert_eq!(row[8], "610");
        assert_eq!(row[10], "65.7");
        assert_eq!(row.len(), 43);
    }

    #[test]
    fn test_write_csv_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed").join("qb_season.csv");
        assert_eq!(write_csv(&sample(), &path).unwrap(), 1);
        assert!(path.exists());
    }
}
