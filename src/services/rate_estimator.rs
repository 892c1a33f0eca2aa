use std::sync::Arc;

use crate::data::RosterStore;
use crate::models::GoalRatePair;

/// Additive home-advantage bias, in goals.
pub const HOME_BIAS: f64 = 0.1;
/// Lower bound on either side's expected goals.
pub const MIN_LAMBDA: f64 = 0.2;

/// Per-match scoring and conceding rates of one side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamRates {
    pub attack: f64,
    pub defence: f64,
}

impl TeamRates {
    fn from_aggregates(matches_played: f64, goals_for: f64, goals_against: f64) -> Self {
        let games = matches_played.max(1.0);
        Self {
            attack: goals_for / games,
            defence: goals_against / games,
        }
    }
}

/// Heuristic expected-goals estimator over the season roster.
#[derive(Debug, Clone)]
pub struct RateEstimator {
    roster: Arc<RosterStore>,
}

impl RateEstimator {
    pub fn new(roster: Arc<RosterStore>) -> Self {
        Self { roster }
    }

    pub fn roster(&self) -> &RosterStore {
        &self.roster
    }

    /// Rates of a roster team, or of the league-average team when the name is unknown.
    pub fn team_rates(&self, team_name: &str) -> TeamRates {
        match self.roster.lookup(team_name) {
            Some(record) => TeamRates::from_aggregates(
                record.matches_played as f64,
                record.goals_for as f64,
                record.goals_against as f64,
            ),
            None => {
                match self.roster.closest_name(team_name) {
                    Some(hint) => tracing::info!(
                        "Unknown team '{}' (closest roster entry '{}'), using league-average rates",
                        team_name,
                        hint
                    ),
                    None => tracing::info!("Unknown team '{}', using league-average rates", team_name),
                }
                self.league_average_rates()
            }
        }
    }

    pub fn league_average_rates(&self) -> TeamRates {
        let avg = self.roster.average();
        TeamRates::from_aggregates(avg.matches_played, avg.goals_for, avg.goals_against)
    }

    /// Expected goals for a fixture. Never fails.
    pub fn estimate(&self, home_name: &str, away_name: &str) -> GoalRatePair {
        let home = self.team_rates(home_name);
        let away = self.team_rates(away_name);
        combine(home, away)
    }
}

/// Blend attack against the opponent's defence, with the home bias and floor applied.
pub fn combine(home: TeamRates, away: TeamRates) -> GoalRatePair {
    GoalRatePair::floored(
        (home.attack + away.defence) / 2.0 + HOME_BIAS,
        (away.attack + home.defence) / 2.0 - HOME_BIAS,
        MIN_LAMBDA,
    )
}
