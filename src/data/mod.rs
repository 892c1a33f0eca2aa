pub mod seed;
pub use seed::serie_a_roster;

use chrono::NaiveDate;
use csv::StringRecord;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::models::{HistoricalResult, TeamSeasonRecord};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to open results file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("results file has no '{0}' column")]
    MissingColumn(&'static str),
    #[error("row {row}: invalid {field} value '{value}'")]
    InvalidField {
        row: usize,
        field: &'static str,
        value: String,
    },
}

/// Aggregates of a synthetic league-average team, used for teams missing from the roster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageRecord {
    pub matches_played: f64,
    pub goals_for: f64,
    pub goals_against: f64,
}

/// Immutable in-memory roster keyed by exact (case-sensitive) team name.
#[derive(Debug, Clone)]
pub struct RosterStore {
    records: Vec<TeamSeasonRecord>,
    index: HashMap<String, usize>,
    average: AverageRecord,
}

impl RosterStore {
    pub fn new(records: Vec<TeamSeasonRecord>) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(i, record)| (record.team_name.clone(), i))
            .collect();
        let average = average_of(&records);
        Self { records, index, average }
    }

    pub fn serie_a() -> Self {
        Self::new(serie_a_roster())
    }

    pub fn lookup(&self, team_name: &str) -> Option<&TeamSeasonRecord> {
        self.index.get(team_name).map(|&i| &self.records[i])
    }

    pub fn average(&self) -> AverageRecord {
        self.average
    }

    pub fn records(&self) -> &[TeamSeasonRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Most similar roster name, used only as a hint in logs.
    pub fn closest_name(&self, team_name: &str) -> Option<&str> {
        let lowered = team_name.to_lowercase();
        self.records
            .iter()
            .map(|r| (r.team_name.as_str(), strsim::jaro_winkler(&lowered, &r.team_name.to_lowercase())))
            .filter(|(_, score)| *score >= 0.8)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(name, _)| name)
    }
}

fn average_of(records: &[TeamSeasonRecord]) -> AverageRecord {
    if records.is_empty() {
        return AverageRecord {
            matches_played: 0.0,
            goals_for: 0.0,
            goals_against: 0.0,
        };
    }
    let n = records.len() as f64;
    let sum = |f: fn(&TeamSeasonRecord) -> u32| records.iter().map(|r| f(r) as f64).sum::<f64>() / n;
    AverageRecord {
        matches_played: sum(|r| r.matches_played),
        goals_for: sum(|r| r.goals_for),
        goals_against: sum(|r| r.goals_against),
    }
}

// ── historical results ──────────────────────────────────────────────────────

/// Canonical column name followed by the football-data.co.uk alias.
const HOME_COLUMN: (&str, &str) = ("home", "HomeTeam");
const AWAY_COLUMN: (&str, &str) = ("away", "AwayTeam");
const HOME_GOALS_COLUMN: (&str, &str) = ("home_goals", "FTHG");
const AWAY_GOALS_COLUMN: (&str, &str) = ("away_goals", "FTAG");
const DATE_COLUMN: (&str, &str) = ("date", "Date");

pub fn load_results(path: &Path) -> Result<Vec<HistoricalResult>, DataError> {
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_results(file)
}

/// Parses a results CSV. Any malformed row rejects the whole file.
pub fn parse_results<R: Read>(reader: R) -> Result<Vec<HistoricalResult>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let home_idx = column_index(&headers, HOME_COLUMN)?;
    let away_idx = column_index(&headers, AWAY_COLUMN)?;
    let home_goals_idx = column_index(&headers, HOME_GOALS_COLUMN)?;
    let away_goals_idx = column_index(&headers, AWAY_GOALS_COLUMN)?;
    let date_idx = column_index(&headers, DATE_COLUMN)?;

    let mut results = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 2; // 1-based, after the header line
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let field = |idx: usize| record.get(idx).unwrap_or("");
        let home = field(home_idx);
        let away = field(away_idx);
        if home.is_empty() {
            return Err(invalid(row, "home", home));
        }
        if away.is_empty() {
            return Err(invalid(row, "away", away));
        }

        let home_goals = field(home_goals_idx)
            .parse::<u32>()
            .map_err(|_| invalid(row, "home_goals", field(home_goals_idx)))?;
        let away_goals = field(away_goals_idx)
            .parse::<u32>()
            .map_err(|_| invalid(row, "away_goals", field(away_goals_idx)))?;
        let date = parse_match_date(field(date_idx)).ok_or_else(|| invalid(row, "date", field(date_idx)))?;

        results.push(HistoricalResult {
            home: home.to_string(),
            away: away.to_string(),
            home_goals,
            away_goals,
            date,
        });
    }

    Ok(results)
}

fn column_index(headers: &StringRecord, (name, alias): (&'static str, &str)) -> Result<usize, DataError> {
    headers
        .iter()
        .position(|h| h == name || h == alias)
        .ok_or(DataError::MissingColumn(name))
}

fn invalid(row: usize, field: &'static str, value: &str) -> DataError {
    DataError::InvalidField {
        row,
        field,
        value: value.to_string(),
    }
}

/// Accepts `YYYY-MM-DD` (optionally followed by a time), `DD/MM/YYYY` and `DD/MM/YY`.
pub fn parse_match_date(raw: &str) -> Option<NaiveDate> {
    let date = raw.split(|c| c == 'T' || c == ' ').next()?;
    if date.contains('/') {
        let year_len = date.rsplit('/').next().map_or(0, str::len);
        let format = if year_len == 2 { "%d/%m/%y" } else { "%d/%m/%Y" };
        NaiveDate::parse_from_str(date, format).ok()
    } else {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_lookup_is_exact_and_case_sensitive() {
        let roster = RosterStore::serie_a();
        assert_eq!(roster.len(), 20);
        let inter = roster.lookup("Inter").unwrap();
        assert_eq!((inter.matches_played, inter.goals_for, inter.goals_against), (18, 40, 15));
        assert!(roster.lookup("inter").is_none());
        assert!(roster.lookup("Inter ").is_none());
        assert!(roster.lookup("Nonexistent FC").is_none());
    }

    #[test]
    fn test_average_is_mean_of_aggregates() {
        let roster = RosterStore::new(vec![
            TeamSeasonRecord::new("A", 10, 20, 5),
            TeamSeasonRecord::new("B", 20, 10, 25),
        ]);
        let avg = roster.average();
        assert_eq!(avg.matches_played, 15.0);
        assert_eq!(avg.goals_for, 15.0);
        assert_eq!(avg.goals_against, 15.0);
    }

    #[test]
    fn test_closest_name_hint() {
        let roster = RosterStore::serie_a();
        assert_eq!(roster.closest_name("inter"), Some("Inter"));
        assert_eq!(roster.closest_name("Juventus FC"), Some("Juventus"));
        assert_eq!(roster.closest_name("zzzzzz"), None);
    }

    #[test]
    fn test_parse_results_canonical_headers() {
        let csv = "home,away,home_goals,away_goals,date\n\
                   Inter,Pisa,3,0,2025-09-14\n\
                   Milan,Genoa,1,1,2025-09-15\n";
        let results = parse_results(csv.as_bytes()).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].home, "Inter");
        assert_eq!(results[0].home_goals, 3);
        assert_eq!(results[1].date, NaiveDate::from_ymd_opt(2025, 9, 15).unwrap());
    }

    #[test]
    fn test_parse_results_football_data_headers() {
        let csv = "Div,Date,HomeTeam,AwayTeam,FTHG,FTAG,FTR\n\
                   I1,24/08/2025,Genoa,Lecce,0,0,D\n\
                   I1,25/08/25,Inter,Torino,5,0,H\n\
                   ,,,,,,\n";
        let results = parse_results(csv.as_bytes()).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].date, NaiveDate::from_ymd_opt(2025, 8, 24).unwrap());
        assert_eq!(results[1].date, NaiveDate::from_ymd_opt(2025, 8, 25).unwrap());
        assert_eq!(results[1].home_goals, 5);
    }

    #[test]
    fn test_parse_results_missing_column() {
        let csv = "home,away,home_goals,date\nInter,Pisa,3,2025-09-14\n";
        let err = parse_results(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn("away_goals")));
    }

    #[test]
    fn test_parse_results_rejects_bad_rows() {
        let csv = "home,away,home_goals,away_goals,date\nInter,Pisa,three,0,2025-09-14\n";
        assert!(matches!(
            parse_results(csv.as_bytes()),
            Err(DataError::InvalidField { field: "home_goals", row: 2, .. })
        ));

        let csv = "home,away,home_goals,away_goals,date\nInter,Pisa,3,0,not-a-date\n";
        assert!(matches!(
            parse_results(csv.as_bytes()),
            Err(DataError::InvalidField { field: "date", .. })
        ));
    }

    #[test]
    fn test_parse_match_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_match_date("2024-01-15"), Some(expected));
        assert_eq!(parse_match_date("2024-01-15T20:45:00"), Some(expected));
        assert_eq!(parse_match_date("15/01/2024"), Some(expected));
        assert_eq!(parse_match_date("15/01/24"), Some(expected));
        assert_eq!(parse_match_date("2024/13/45"), None);
    }
}
