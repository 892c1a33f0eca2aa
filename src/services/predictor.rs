use std::fmt;
use std::sync::Arc;

use crate::data::RosterStore;
use crate::models::{GoalRatePair, MatchPrediction};
use crate::services::fit_model::{FitPrediction, OutcomeModel};
use crate::services::markets::{self, MarketSummary};
use crate::services::rate_estimator::RateEstimator;
use crate::services::scoregrid::{ScorelineMatrix, MAX_GOALS};
use crate::utils::{round_goals, round_prob};

/// Which path produced a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionSource {
    FitModel,
    Heuristic,
}

impl fmt::Display for PredictionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionSource::FitModel => write!(f, "fit model"),
            PredictionSource::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// Raw result of either path, before the shared market math.
enum PathOutcome {
    Fitted(FitPrediction),
    Heuristic(GoalRatePair),
}

/// Stateless per request; shares only the immutable roster and optional fitted model.
pub struct PredictionEngine {
    estimator: RateEstimator,
    fit_model: Option<Arc<dyn OutcomeModel>>,
}

impl PredictionEngine {
    pub fn new(roster: Arc<RosterStore>, fit_model: Option<Arc<dyn OutcomeModel>>) -> Self {
        Self {
            estimator: RateEstimator::new(roster),
            fit_model,
        }
    }

    pub fn has_fit_model(&self) -> bool {
        self.fit_model.is_some()
    }

    pub fn roster(&self) -> &RosterStore {
        self.estimator.roster()
    }

    pub fn predict(&self, home: &str, away: &str) -> MatchPrediction {
        self.predict_with_source(home, away).0
    }

    /// Fit model first; any failure falls back to the heuristic for this request only.
    pub fn predict_with_source(&self, home: &str, away: &str) -> (MatchPrediction, PredictionSource) {
        let outcome = self
            .fit_model
            .as_ref()
            .and_then(|model| match model.predict(home, away) {
                Ok(prediction) => Some(PathOutcome::Fitted(prediction)),
                Err(e) => {
                    tracing::warn!(
                        "{} prediction failed for {} vs {}, using heuristic: {}",
                        model.name(),
                        home,
                        away,
                        e
                    );
                    None
                }
            })
            .unwrap_or_else(|| PathOutcome::Heuristic(self.estimator.estimate(home, away)));

        let (prediction, source) = match outcome {
            PathOutcome::Fitted(fit) => {
                let markets = markets::extract(&ScorelineMatrix::build(&fit.rates, MAX_GOALS));
                let outcome_probs = (fit.home_win * 100.0, fit.draw * 100.0, fit.away_win * 100.0);
                (assemble(outcome_probs, &markets, &fit.rates), PredictionSource::FitModel)
            }
            PathOutcome::Heuristic(rates) => {
                let markets = markets::extract(&ScorelineMatrix::build(&rates, MAX_GOALS));
                let outcome_probs = (markets.home_win, markets.draw, markets.away_win);
                (assemble(outcome_probs, &markets, &rates), PredictionSource::Heuristic)
            }
        };

        tracing::debug!(
            "Predicted {} vs {} via {}: Home {:.1}%, Draw {:.1}%, Away {:.1}%",
            home,
            away,
            source,
            prediction.home_win_prob,
            prediction.draw_prob,
            prediction.away_win_prob
        );
        (prediction, source)
    }
}

/// Rounds once, at the boundary: probabilities to 1 decimal, goals to 2.
fn assemble(outcome_probs: (f64, f64, f64), markets: &MarketSummary, rates: &GoalRatePair) -> MatchPrediction {
    let (home_win, draw, away_win) = outcome_probs;
    MatchPrediction {
        home_win_prob: round_prob(home_win),
        draw_prob: round_prob(draw),
        away_win_prob: round_prob(away_win),
        expected_goals_home: round_goals(rates.lambda_home()),
        expected_goals_away: round_goals(rates.lambda_away()),
        expected_goals_total: round_goals(rates.total()),
        both_teams_to_score_prob: round_prob(markets.both_teams_to_score),
        over_under_prob: round_prob(markets.over),
        most_likely_scoreline: markets.most_likely,
    }
}
