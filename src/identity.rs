// 🪪 Identity Normalizer - PersonKey + TeamCode
//
// Every source spells the same quarterback and franchise differently:
//   "Tom Brady*+" / "T.Brady"          → PersonKey("TBrady")
//   "SDG" / "SD" / "LAC"               → TeamCode("LAC")
//
// Pure functions over a static remap table. Nothing here touches I/O.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// PERSON KEY
// ============================================================================

/// Canonical join identity for a player: given-name initial(s) + family name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PersonKey(String);

impl PersonKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonKey {
    fn from(key: &str) -> Self {
        PersonKey(key.to_string())
    }
}

// ============================================================================
// TEAM CODE
// ============================================================================

/// Canonical franchise abbreviation, one per franchise per season
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamCode(String);

impl TeamCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TeamCode {
    fn from(code: &str) -> Self {
        TeamCode(code.to_string())
    }
}

/// Relocated franchises and abbreviations that differ between sources
const TEAM_REMAP: &[(&str, &str)] = &[
    ("STL", "LAR"),
    ("SDG", "LAC"),
    ("SD", "LAC"),
    ("GNB", "GB"),
    ("TAM", "TB"),
    ("KAN", "KC"),
    ("NOR", "NO"),
    ("NWE", "NE"),
    ("SFO", "SF"),
    ("JAC", "JAX"),
    ("OAK", "LV"),
    ("LVR", "LV"),
];

/// Map a raw team label to its current code
///
/// Unknown labels pass through unchanged: an unmapped but valid code must not
/// block the pipeline.
pub fn normalize_team(raw_label: &str) -> TeamCode {
    let label = raw_label.trim();

    let code = TEAM_REMAP
        .iter()
        .find(|(from, _)| *from == label)
        .map(|(_, to)| *to)
        .unwrap_or(label);

    TeamCode(code.to_string())
}

// ============================================================================
// NAME NORMALIZATION
// ============================================================================

/// Remove post-season honor markers (`*` Pro Bowl, `+` All-Pro)
pub fn strip_award_markers(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '*' && *c != '+')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Remove periods left in a normalized key ("AJMcCarron." → "AJMcCarron")
pub fn strip_periods(key: &str) -> String {
    key.chars().filter(|c| *c != '.').collect()
}

/// Reduce a full name to a PersonKey
///
/// "Tom Brady"        → "TBrady"
/// "A.J. McCarron"    → "AJMcCarron"
/// "Jean-Paul Smith"  → "JPSmith"
/// "Odell Beckham Jr" → "OBeckhamJr"
///
/// Markers and trailing periods are NOT handled here; see
/// `strip_award_markers` and `strip_periods`.
pub fn normalize_person(full_name: &str) -> Result<PersonKey> {
    let tokens: Vec<&str> = full_name.split_whitespace().collect();

    if tokens.len() < 2 {
        return Err(PipelineError::MalformedName {
            name: full_name.to_string(),
            context: format!("expected given name and family name, found {} token(s)", tokens.len()),
        });
    }

    let mut key = given_name_initials(tokens[0]);
    for family in &tokens[1..] {
        key.push_str(family);
    }

    Ok(PersonKey(key))
}

/// Initial(s) of a given name
///
/// Already-punctuated or hyphenated given names keep one initial per part.
fn given_name_initials(given: &str) -> String {
    if given.contains('.') || given.contains('-') {
        let initials: String = given
            .split(|c| c == '.' || c == '-')
            .filter_map(|part| part.chars().next())
            .collect();

        if !initials.is_empty() {
            return initials;
        }
    }

    given.chars().next().map(String::from).unwrap_or_default()
}

/// Strict path for sources that always publish full names
///
/// Markers are stripped first, periods last; a single-token name is an error.
pub fn person_key_from_full_name(name: &str) -> Result<PersonKey> {
    let key = normalize_person(&strip_award_markers(name))?;
    Ok(PersonKey(strip_periods(key.as_str())))
}

/// Derive a PersonKey from whatever label a source publishes
///
/// Full names ("Tom Brady*") go through `normalize_person`; single-token labels
/// are already abbreviated ("T.Brady") and only lose their periods. Running
/// this on its own output returns the same key.
pub fn person_key_from_label(label: &str) -> Result<PersonKey> {
    let cleaned = strip_award_markers(label);

    if cleaned.is_empty() {
        return Err(PipelineError::MalformedName {
            name: label.to_string(),
            context: "empty player label".to_string(),
        });
    }

    let key = if cleaned.split_whitespace().count() >= 2 {
        normalize_person(&cleaned)?.0
    } else {
        cleaned
    };

    Ok(PersonKey(strip_periods(&key)))
}

// ============================================================================
// TESTS
// ============================================================================
