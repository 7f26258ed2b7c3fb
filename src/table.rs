// 📋 Table Model - raw cells in, typed cells out
//
// RawTable      : what an adapter hands over (header row + string cells)
// ColumnSpec    : one declared metric column and its coercion rule
// CleanedTable  : one row per (PersonKey, TeamCode) for a single source + season
//
// Coercion is declared per column so a reviewer can see exactly which columns
// may turn into Null. Unparseable text never raises.

use crate::identity::{PersonKey, TeamCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

// ============================================================================
// VALUE
// ============================================================================

/// A single typed cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Text form used by the CSV export (Null → empty cell)
    pub fn to_cell(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(v) => v.to_string(),
            Value::Real(v) => v.to_string(),
            Value::Text(s) => s.clone(),
        }
    }

    /// Descending order with Null last; used for duplicate tie-breaks
    fn rank_desc(a: &Value, b: &Value) -> Ordering {
        match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

// ============================================================================
// COLUMN TYPES
// ============================================================================

/// Declared coercion for a raw text column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// Whole number ("4,057" → 4057)
    Integer,
    /// Decimal number ("7.8")
    Real,
    /// Percentage text ("23.5%" → 23.5)
    Percent,
    /// Currency text ("$25,000,000" → 25000000)
    Currency,
    /// Kept verbatim
    Text,
}

impl ColumnType {
    /// Parse a raw cell; anything that does not fit the declared type is Null
    pub fn parse(&self, raw: &str) -> Value {
        let raw = raw.trim();
        if raw.is_empty() {
            return Value::Null;
        }

        match self {
            ColumnType::Integer => parse_integer(raw),
            ColumnType::Real => parse_real(raw),
            ColumnType::Percent => parse_percent(raw),
            ColumnType::Currency => parse_currency(raw),
            ColumnType::Text => Value::Text(raw.to_string()),
        }
    }
}

fn parse_integer(raw: &str) -> Value {
    let digits: String = raw.chars().filter(|c| *c != ',').collect();

    if let Ok(v) = digits.parse::<i64>() {
        return Value::Int(v);
    }

    // "12.0" style exports of whole numbers
    match digits.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Value::Int(v as i64),
        _ => Value::Null,
    }
}

fn parse_real(raw: &str) -> Value {
    let digits: String = raw.chars().filter(|c| *c != ',').collect();
    match digits.parse::<f64>() {
        Ok(v) if v.is_finite() => Value::Real(v),
        _ => Value::Null,
    }
}

/// "23.5%" → 23.5, "-4.1%" → -4.1
pub fn parse_percent(raw: &str) -> Value {
    parse_real(raw.trim().trim_end_matches('%').trim())
}

/// "$25,000,000" → 25000000, "($1,200)" → -1200
pub fn parse_currency(raw: &str) -> Value {
    let trimmed = raw.trim();
    let negative = trimmed.starts_with('-') || (trimmed.starts_with('(') && trimmed.ends_with(')'));

    let digits: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if digits.is_empty() {
        return Value::Null;
    }

    match parse_integer(&digits) {
        Value::Int(v) => Value::Int(if negative { -v } else { v }),
        _ => match parse_real(&digits) {
            Value::Real(v) => Value::Real(if negative { -v } else { v }),
            other => other,
        },
    }
}

// ============================================================================
// COLUMN SPEC
// ============================================================================

/// One metric column a cleaner contributes to the merged record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Canonical output name (e.g. "cmp_pct")
    pub name: String,
    /// Header in the raw table (e.g. "Cmp%")
    pub raw_header: String,
    pub column_type: ColumnType,
    /// Optional columns may be missing from a season's raw table
    pub optional: bool,
}

impl ColumnSpec {
    pub fn required(name: &str, raw_header: &str, column_type: ColumnType) -> Self {
        ColumnSpec {
            name: name.to_string(),
            raw_header: raw_header.to_string(),
            column_type,
            optional: false,
        }
    }

    pub fn optional(name: &str, raw_header: &str, column_type: ColumnType) -> Self {
        ColumnSpec {
            optional: true,
            ..ColumnSpec::required(name, raw_header, column_type)
        }
    }

    /// Column computed by the cleaner rather than read from a header
    pub fn derived(name: &str, column_type: ColumnType) -> Self {
        ColumnSpec::required(name, "", column_type)
    }
}

// ============================================================================
// RAW TABLE
// ============================================================================

/// Positionally-indexed table exactly as the adapter produced it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Repeated headers get a `.N` suffix ("Yds", "Yds" → "Yds", "Yds.1")
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        RawTable {
            headers: disambiguate_headers(headers),
            rows,
        }
    }

    /// Build from string slices (handy for fixtures)
    pub fn from_strs(headers: &[&str], rows: &[&[&str]]) -> Self {
        RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a header (exact match after trimming)
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == header)
    }

    /// Cell text, empty string when the row is short
    pub fn cell<'a>(&self, row: &'a [String], index: usize) -> &'a str {
        row.get(index).map(|s| s.as_str()).unwrap_or("")
    }

    /// Replace headers with the first data row (embedded header tables)
    pub fn promote_first_row(&mut self) -> bool {
        if self.rows.is_empty() {
            return false;
        }
        self.headers = disambiguate_headers(self.rows.remove(0));
        true
    }

    /// SHA-256 over headers and cells, recorded in the audit report
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.headers.join("\u{1f}"));
        for row in &self.rows {
            hasher.update("\u{1e}");
            hasher.update(row.join("\u{1f}"));
        }
        format!("{:x}", hasher.finalize())
    }
}

fn disambiguate_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .map(|header| {
            let header = header.trim().to_string();
            let count = seen.entry(header.clone()).or_insert(0);
            let name = if *count == 0 {
                header.clone()
            } else {
                format!("{}.{}", header, count)
            };
            *count += 1;
            name
        })
        .collect()
}

// ============================================================================
// CLEANED TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedRow {
    pub person_key: PersonKey,
    /// Full name when the source publishes one
    pub display_name: Option<String>,
    pub team_code: TeamCode,
    /// Aligned with `CleanedTable::columns`
    pub values: Vec<Value>,
}

impl CleanedRow {
    pub fn key(&self) -> (PersonKey, TeamCode) {
        (self.person_key.clone(), self.team_code.clone())
    }
}

/// One source's rows for one season, keyed by (PersonKey, TeamCode)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedTable {
    /// Source label used in errors and reports
    pub source: String,
    pub season: u16,
    pub columns: Vec<String>,
    pub rows: Vec<CleanedRow>,
    /// Rows discarded by `dedupe_by_max`
    #[serde(default)]
    pub duplicates_dropped: usize,
}

impl CleanedTable {
    pub fn new(source: &str, season: u16, columns: Vec<String>) -> Self {
        CleanedTable {
            source: source.to_string(),
            season,
            columns,
            rows: Vec::new(),
            duplicates_dropped: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of a named column for one row
    pub fn value<'a>(&self, row: &'a CleanedRow, column: &str) -> Option<&'a Value> {
        self.column_index(column).and_then(|i| row.values.get(i))
    }

    /// First key that appears more than once, if any
    pub fn first_duplicate_key(&self) -> Option<(PersonKey, TeamCode)> {
        let mut seen = HashSet::new();
        for row in &self.rows {
            if !seen.insert(row.key()) {
                return Some(row.key());
            }
        }
        None
    }

    /// Collapse duplicate keys to the row with the highest `metric`
    ///
    /// Null metrics rank lowest; equal metrics keep the earliest row. Survivors
    /// stay in their original order. Returns the number of rows dropped.
    pub fn dedupe_by_max(&mut self, metric: &str) -> usize {
        let metric_index = self.column_index(metric);
        let metric_of = |row: &CleanedRow| -> Value {
            metric_index
                .and_then(|i| row.values.get(i).cloned())
                .unwrap_or(Value::Null)
        };

        // key → index of the current winner
        let mut winners: HashMap<(PersonKey, TeamCode), usize> = HashMap::new();
        for (index, row) in self.rows.iter().enumerate() {
            match winners.get(&row.key()) {
                None => {
                    winners.insert(row.key(), index);
                }
                Some(&current) => {
                    let challenger = metric_of(row);
                    let holder = metric_of(&self.rows[current]);
                    if Value::rank_desc(&challenger, &holder) == Ordering::Less {
                        winners.insert(row.key(), index);
                    }
                }
            }
        }

        let before = self.rows.len();
        let keep: HashSet<usize> = winners.into_values().collect();
        let mut index = 0;
        self.rows.retain(|_| {
            let kept = keep.contains(&index);
            index += 1;
            kept
        });

        let dropped = before - self.rows.len();
        self.duplicates_dropped += dropped;
        dropped
    }
}

// ============================================================================
// TESTS
// ============================================================================
