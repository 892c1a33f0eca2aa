use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Season aggregates for one team in the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSeasonRecord {
    pub team_name: String,
    pub matches_played: u32,
    pub goals_for: u32,
    pub goals_against: u32,
}

impl TeamSeasonRecord {
    pub fn new(team_name: &str, matches_played: u32, goals_for: u32, goals_against: u32) -> Self {
        Self {
            team_name: team_name.to_string(),
            matches_played,
            goals_for,
            goals_against,
        }
    }
}

/// Expected goals for each side of one fixture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalRatePair {
    lambda_home: f64,
    lambda_away: f64,
}

impl GoalRatePair {
    /// Both rates must be finite and strictly positive.
    pub fn new(lambda_home: f64, lambda_away: f64) -> Option<Self> {
        let valid = |lambda: f64| lambda.is_finite() && lambda > 0.0;
        if valid(lambda_home) && valid(lambda_away) {
            Some(Self { lambda_home, lambda_away })
        } else {
            None
        }
    }

    /// Clamps both rates from below. `floor` must be positive.
    pub fn floored(lambda_home: f64, lambda_away: f64, floor: f64) -> Self {
        Self {
            lambda_home: lambda_home.max(floor),
            lambda_away: lambda_away.max(floor),
        }
    }

    pub fn lambda_home(&self) -> f64 {
        self.lambda_home
    }

    pub fn lambda_away(&self) -> f64 {
        self.lambda_away
    }

    pub fn total(&self) -> f64 {
        self.lambda_home + self.lambda_away
    }
}

/// A final score, home goals first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scoreline {
    pub home: usize,
    pub away: usize,
}

impl fmt::Display for Scoreline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

impl Serialize for Scoreline {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Response payload of `POST /predict`. Probabilities are percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchPrediction {
    pub home_win_prob: f64,
    pub draw_prob: f64,
    pub away_win_prob: f64,
    pub expected_goals_home: f64,
    pub expected_goals_away: f64,
    pub expected_goals_total: f64,
    pub both_teams_to_score_prob: f64,
    #[serde(rename = "over_25_prob")]
    pub over_under_prob: f64,
    pub most_likely_scoreline: Scoreline,
}

/// One finished match from the historical results file.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalResult {
    pub home: String,
    pub away: String,
    pub home_goals: u32,
    pub away_goals: u32,
    pub date: NaiveDate,
}

// API request/response types
#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    pub home_team: String,
    pub away_team: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}
