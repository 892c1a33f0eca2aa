use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use thiserror::Error;

use crate::data::{load_results, DataError};
use crate::models::{GoalRatePair, HistoricalResult};
use crate::services::optimize::{golden_section_max, GoldenSectionConfig};
use crate::services::scoregrid::poisson_marginal;
use crate::utils::days_between;

/// Default time-decay rate, per day.
pub const DEFAULT_XI: f64 = 0.0018;
/// Goals per side in the grid the fitted model prices outcomes over.
pub const MODEL_MAX_GOALS: usize = 10;

const MIN_MATCHES: usize = 10;
const INTERCEPT: usize = 0;
const HOME_ADVANTAGE: usize = 1;
const FIRST_TEAM_PARAM: usize = 2;

#[derive(Debug, Error)]
pub enum FitError {
    #[error("fit model disabled by configuration")]
    Disabled,
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("information matrix is not positive definite (iteration {0})")]
    Singular(usize),
    #[error("non-finite estimate for {0}")]
    NonFinite(String),
    #[error("team '{0}' is not in the fitted model")]
    UnknownTeam(String),
}

/// Outcome probabilities (0..1) and expected goals from a fitted model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitPrediction {
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
    pub rates: GoalRatePair,
}

/// A statistical model that prices 1X2 and expected goals for a fixture directly.
pub trait OutcomeModel: Send + Sync {
    fn name(&self) -> &'static str;
    fn predict(&self, home: &str, away: &str) -> Result<FitPrediction, FitError>;
}

#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Exponential time-decay rate per day; zero weighs every match equally.
    pub xi: f64,
    /// L2 penalty on attack/defence terms, pins down their common offset.
    pub ridge: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            xi: DEFAULT_XI,
            ridge: 1e-3,
            max_iterations: 100,
            tolerance: 1e-8,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamRating {
    pub team: String,
    pub attack: f64,
    pub defence: f64,
}

/// One Poisson observation: goals scored by one side, with the active parameter columns.
struct Observation {
    columns: Vec<usize>,
    goals: f64,
    weight: f64,
    score: (u32, u32),
}

/// Time-weighted Dixon-Coles model.
///
/// `log λ_home = μ + home + attack[home] + defence[away]` and
/// `log λ_away = μ + attack[away] + defence[home]`, with the low-score correction ρ.
/// A higher `defence` means the side concedes more.
#[derive(Debug, Clone)]
pub struct DixonColesModel {
    teams: HashMap<String, usize>,
    names: Vec<String>,
    intercept: f64,
    home_advantage: f64,
    attack: Vec<f64>,
    defence: Vec<f64>,
    rho: f64,
    matches: usize,
    reference_date: NaiveDate,
}

impl DixonColesModel {
    pub fn load_and_fit(path: &Path, config: &FitConfig) -> Result<Self, FitError> {
        let results = load_results(path)?;
        tracing::info!("Loaded {} historical results from {}", results.len(), path.display());
        Self::fit(&results, config)
    }

    pub fn fit(results: &[HistoricalResult], config: &FitConfig) -> Result<Self, FitError> {
        if results.len() < MIN_MATCHES {
            return Err(FitError::InsufficientData(format!(
                "{} matches, need at least {}",
                results.len(),
                MIN_MATCHES
            )));
        }

        let names: Vec<String> = results
            .iter()
            .flat_map(|r| [r.home.clone(), r.away.clone()])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let Some(reference_date) = results.iter().map(|r| r.date).max() else {
            return Err(FitError::InsufficientData("no dated results".to_string()));
        };
        if names.len() < 2 {
            return Err(FitError::InsufficientData(format!("{} distinct teams", names.len())));
        }
        let teams: HashMap<String, usize> = names.iter().enumerate().map(|(i, name)| (name.clone(), i)).collect();
        let n = names.len();

        let weights = match_weights(results, config.xi);
        let observations = observations(results, &weights, &teams);

        let total_weight: f64 = observations.iter().map(|o| o.weight).sum();
        let mean_goals = observations.iter().map(|o| o.weight * o.goals).sum::<f64>() / total_weight;
        if !(mean_goals.is_finite() && mean_goals > 0.0) {
            return Err(FitError::InsufficientData("no goals recorded".to_string()));
        }

        let mut theta: DVector<f64> = DVector::zeros(FIRST_TEAM_PARAM + 2 * n);
        theta[INTERCEPT] = mean_goals.ln();
        let iterations = newton_raphson(&mut theta, &observations, config)?;

        if let Some(i) = theta.iter().position(|v| !v.is_finite()) {
            return Err(FitError::NonFinite(parameter_name(i, &names)));
        }

        let intercept = theta[INTERCEPT];
        let home_advantage = theta[HOME_ADVANTAGE];
        let attack: Vec<f64> = (0..n).map(|i| theta[FIRST_TEAM_PARAM + i]).collect();
        let defence: Vec<f64> = (0..n).map(|i| theta[FIRST_TEAM_PARAM + n + i]).collect();

        let rho = fit_rho(&observations, &theta);
        if !rho.is_finite() {
            return Err(FitError::NonFinite("rho".to_string()));
        }

        tracing::info!(
            "Fitted Dixon-Coles model: {} teams, {} matches, {} Newton iterations, home advantage {:.3}, rho {:.4}",
            n,
            results.len(),
            iterations,
            home_advantage,
            rho
        );

        Ok(Self {
            teams,
            names,
            intercept,
            home_advantage,
            attack,
            defence,
            rho,
            matches: results.len(),
            reference_date,
        })
    }

    pub fn team_count(&self) -> usize {
        self.names.len()
    }

    pub fn matches(&self) -> usize {
        self.matches
    }

    pub fn home_advantage(&self) -> f64 {
        self.home_advantage
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    /// Ratings ordered from strongest (attack minus defence) to weakest.
    pub fn team_ratings(&self) -> Vec<TeamRating> {
        let mut ratings: Vec<TeamRating> = self
            .names
            .iter()
            .enumerate()
            .map(|(i, team)| TeamRating {
                team: team.clone(),
                attack: self.attack[i],
                defence: self.defence[i],
            })
            .collect();
        ratings.sort_by(|a, b| {
            (b.attack - b.defence)
                .partial_cmp(&(a.attack - a.defence))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ratings
    }

    pub fn expected_goals(&self, home: &str, away: &str) -> Result<GoalRatePair, FitError> {
        let h = self.team_index(home)?;
        let a = self.team_index(away)?;
        let lambda_home = (self.intercept + self.home_advantage + self.attack[h] + self.defence[a]).exp();
        let lambda_away = (self.intercept + self.attack[a] + self.defence[h]).exp();
        GoalRatePair::new(lambda_home, lambda_away)
            .ok_or_else(|| FitError::NonFinite(format!("expected goals of {home} v {away}")))
    }

    fn team_index(&self, team: &str) -> Result<usize, FitError> {
        self.teams
            .get(team)
            .copied()
            .ok_or_else(|| FitError::UnknownTeam(team.to_string()))
    }
}

impl OutcomeModel for DixonColesModel {
    fn name(&self) -> &'static str {
        "dixon-coles"
    }

    fn predict(&self, home: &str, away: &str) -> Result<FitPrediction, FitError> {
        let rates = self.expected_goals(home, away)?;
        let home_marginal = poisson_marginal(rates.lambda_home(), MODEL_MAX_GOALS);
        let away_marginal = poisson_marginal(rates.lambda_away(), MODEL_MAX_GOALS);

        let (mut home_win, mut draw, mut away_win) = (0.0, 0.0, 0.0);
        for (h, p_home) in home_marginal.iter().enumerate() {
            for (a, p_away) in away_marginal.iter().enumerate() {
                let tau = tau(h as u32, a as u32, rates.lambda_home(), rates.lambda_away(), self.rho);
                let p = (p_home * p_away * tau).max(0.0);
                match h.cmp(&a) {
                    std::cmp::Ordering::Greater => home_win += p,
                    std::cmp::Ordering::Equal => draw += p,
                    std::cmp::Ordering::Less => away_win += p,
                }
            }
        }

        let total = home_win + draw + away_win;
        if !(total.is_finite() && total > 0.0) {
            return Err(FitError::NonFinite(format!("outcome grid of {home} v {away}")));
        }

        Ok(FitPrediction {
            home_win: home_win / total,
            draw: draw / total,
            away_win: away_win / total,
            rates,
        })
    }
}

/// `exp(-xi * days)` relative to the most recent match.
pub fn match_weights(results: &[HistoricalResult], xi: f64) -> Vec<f64> {
    let Some(latest) = results.iter().map(|r| r.date).max() else {
        return Vec::new();
    };
    results
        .iter()
        .map(|r| (-xi * days_between(r.date, latest) as f64).exp())
        .collect()
}

/// Dixon-Coles adjustment for low-scoring results.
fn tau(home_goals: u32, away_goals: u32, lambda_home: f64, lambda_away: f64, rho: f64) -> f64 {
    match (home_goals, away_goals) {
        (0, 0) => 1.0 - lambda_home * lambda_away * rho,
        (0, 1) => 1.0 + lambda_home * rho,
        (1, 0) => 1.0 + lambda_away * rho,
        (1, 1) => 1.0 - rho,
        _ => 1.0,
    }
}

fn observations(
    results: &[HistoricalResult],
    weights: &[f64],
    teams: &HashMap<String, usize>,
) -> Vec<Observation> {
    let n = teams.len();
    let attack = |team: usize| FIRST_TEAM_PARAM + team;
    let defence = |team: usize| FIRST_TEAM_PARAM + n + team;

    let mut observations = Vec::with_capacity(results.len() * 2);
    for (result, &weight) in results.iter().zip(weights) {
        // Both names come from the same results, so the lookups cannot miss.
        let (Some(&h), Some(&a)) = (teams.get(&result.home), teams.get(&result.away)) else {
            continue;
        };
        let score = (result.home_goals, result.away_goals);
        observations.push(Observation {
            columns: vec![INTERCEPT, HOME_ADVANTAGE, attack(h), defence(a)],
            goals: result.home_goals as f64,
            weight,
            score,
        });
        observations.push(Observation {
            columns: vec![INTERCEPT, attack(a), defence(h)],
            goals: result.away_goals as f64,
            weight,
            score,
        });
    }
    observations
}

fn linear_predictor(theta: &DVector<f64>, columns: &[usize]) -> f64 {
    columns.iter().map(|&c| theta[c]).sum()
}

/// Weighted Poisson log-likelihood (without the constant `log y!`) less the ridge penalty.
fn penalised_log_likelihood(theta: &DVector<f64>, observations: &[Observation], ridge: f64) -> f64 {
    let log_likelihood: f64 = observations
        .iter()
        .map(|o| {
            let eta = linear_predictor(theta, &o.columns);
            o.weight * (o.goals * eta - eta.exp())
        })
        .sum();
    let penalty: f64 = theta.iter().skip(FIRST_TEAM_PARAM).map(|v| v * v).sum();
    log_likelihood - 0.5 * ridge * penalty
}

/// Maximises the penalised log-likelihood in place. Returns the iterations used.
fn newton_raphson(theta: &mut DVector<f64>, observations: &[Observation], config: &FitConfig) -> Result<usize, FitError> {
    let p = theta.len();
    let mut objective = penalised_log_likelihood(theta, observations, config.ridge);

    for iteration in 1..=config.max_iterations {
        let mut gradient: DVector<f64> = DVector::zeros(p);
        let mut information: DMatrix<f64> = DMatrix::zeros(p, p);
        for o in observations {
            let lambda = linear_predictor(theta, &o.columns).exp();
            let residual = o.weight * (o.goals - lambda);
            let curvature = o.weight * lambda;
            for &i in &o.columns {
                gradient[i] += residual;
                for &j in &o.columns {
                    information[(i, j)] += curvature;
                }
            }
        }
        for k in FIRST_TEAM_PARAM..p {
            gradient[k] -= config.ridge * theta[k];
            information[(k, k)] += config.ridge;
        }

        let step = information
            .cholesky()
            .ok_or(FitError::Singular(iteration))?
            .solve(&gradient);

        // Halve the step until the objective stops getting worse.
        let mut scale = 1.0;
        let mut candidate = &*theta + &step;
        let mut candidate_objective = penalised_log_likelihood(&candidate, observations, config.ridge);
        for _ in 0..30 {
            if candidate_objective >= objective {
                break;
            }
            scale *= 0.5;
            candidate = &*theta + &step * scale;
            candidate_objective = penalised_log_likelihood(&candidate, observations, config.ridge);
        }

        let max_change = (&step * scale).amax();
        if candidate_objective >= objective {
            *theta = candidate;
            objective = candidate_objective;
        }
        if max_change < config.tolerance {
            return Ok(iteration);
        }
    }

    tracing::warn!(
        "Newton-Raphson stopped after {} iterations without meeting tolerance {}",
        config.max_iterations,
        config.tolerance
    );
    Ok(config.max_iterations)
}

/// Maximum-likelihood ρ with the Poisson parameters held fixed.
fn fit_rho(observations: &[Observation], theta: &DVector<f64>) -> f64 {
    // Observations come in home/away pairs for each match.
    let low_scores: Vec<(u32, u32, f64, f64, f64)> = observations
        .chunks(2)
        .filter_map(|pair| match pair {
            [home, away] if home.score.0 <= 1 && home.score.1 <= 1 => Some((
                home.score.0,
                home.score.1,
                linear_predictor(theta, &home.columns).exp(),
                linear_predictor(theta, &away.columns).exp(),
                home.weight,
            )),
            _ => None,
        })
        .collect();

    let config = GoldenSectionConfig {
        lower: -0.25,
        upper: 0.25,
        tolerance: 1e-6,
        max_steps: 100,
    };
    let outcome = golden_section_max(config, |rho| {
        low_scores
            .iter()
            .map(|&(h, a, lambda_home, lambda_away, weight)| {
                let t = tau(h, a, lambda_home, lambda_away, rho);
                if t > 0.0 {
                    weight * t.ln()
                } else {
                    f64::NEG_INFINITY
                }
            })
            .sum()
    });
    outcome.optimal_value
}

fn parameter_name(index: usize, names: &[String]) -> String {
    let n = names.len();
    match index {
        INTERCEPT => "intercept".to_string(),
        HOME_ADVANTAGE => "home advantage".to_string(),
        i if i < FIRST_TEAM_PARAM + n => format!("attack of {}", names[i - FIRST_TEAM_PARAM]),
        i => format!("defence of {}", names[i - FIRST_TEAM_PARAM - n]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::*;

    const TEAMS: [(&str, i32); 4] = [("Alpha", 3), ("Beta", 2), ("Gamma", 1), ("Delta", 0)];

    /// Double round-robins where stronger sides score more.
    fn league(rounds: usize, alpha_goals: impl Fn(usize) -> Option<u32>) -> Vec<HistoricalResult> {
        let start = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let mut results = Vec::new();
        let mut day = 0;
        for round in 0..rounds {
            for &(home, home_strength) in &TEAMS {
                for &(away, away_strength) in &TEAMS {
                    if home == away {
                        continue;
                    }
                    let jitter = (round % 2) as i32;
                    let mut home_goals = (home_strength - away_strength + 1 + jitter).clamp(0, 5) as u32;
                    let mut away_goals = (away_strength - home_strength + (round % 3 == 0) as i32).clamp(0, 5) as u32;
                    if let Some(goals) = alpha_goals(round) {
                        if home == "Alpha" {
                            home_goals = goals;
                        } else if away == "Alpha" {
                            away_goals = goals;
                        }
                    }
                    results.push(HistoricalResult {
                        home: home.to_string(),
                        away: away.to_string(),
                        home_goals,
                        away_goals,
                        date: start + chrono::Duration::days(day),
                    });
                    day += 1;
                }
            }
        }
        results
    }

    fn fitted() -> DixonColesModel {
        DixonColesModel::fit(&league(6, |_| None), &FitConfig::default()).unwrap()
    }

    #[test]
    fn test_fit_recovers_team_order() {
        let model = fitted();
        assert_eq!(model.team_count(), 4);
        assert_eq!(model.matches(), 72);
        let ratings = model.team_ratings();
        let order: Vec<&str> = ratings.iter().map(|r| r.team.as_str()).collect();
        assert_eq!(order, vec!["Alpha", "Beta", "Gamma", "Delta"]);
        let alpha = &ratings[0];
        let delta = &ratings[3];
        assert!(alpha.attack > delta.attack);
        assert!(alpha.defence < delta.defence);
        assert!(model.rho().abs() <= 0.25);
        assert!(model.home_advantage() > 0.0);
    }

    #[test]
    fn test_predict_probabilities_are_normalised() {
        let model = fitted();
        let prediction = model.predict("Alpha", "Delta").unwrap();
        assert_float_absolute_eq!(1.0, prediction.home_win + prediction.draw + prediction.away_win, 1e-9);
        assert!(prediction.home_win > prediction.away_win);
        assert!(prediction.rates.lambda_home() > prediction.rates.lambda_away());

        let reverse = model.predict("Delta", "Alpha").unwrap();
        assert!(reverse.away_win > reverse.home_win);
    }

    #[test]
    fn test_predict_unknown_team_fails() {
        let model = fitted();
        assert!(matches!(
            model.predict("Alpha", "Nonexistent FC"),
            Err(FitError::UnknownTeam(team)) if team == "Nonexistent FC"
        ));
    }

    #[test]
    fn test_fit_requires_enough_matches() {
        let results: Vec<HistoricalResult> = league(1, |_| None).into_iter().take(5).collect();
        assert!(matches!(
            DixonColesModel::fit(&results, &FitConfig::default()),
            Err(FitError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_fit_requires_goals() {
        let results: Vec<HistoricalResult> = league(2, |_| None)
            .into_iter()
            .map(|r| HistoricalResult {
                home_goals: 0,
                away_goals: 0,
                ..r
            })
            .collect();
        assert!(matches!(
            DixonColesModel::fit(&results, &FitConfig::default()),
            Err(FitError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_match_weights_decay_with_age() {
        let results = league(1, |_| None);
        let weights = match_weights(&results, 0.01);
        assert_float_absolute_eq!(1.0, *weights.last().unwrap(), 1e-12);
        assert!(weights.windows(2).all(|w| w[0] < w[1]));
        assert_float_absolute_eq!((-0.01f64 * 11.0).exp(), weights[0], 1e-12);

        let flat = match_weights(&results, 0.0);
        assert!(flat.iter().all(|&w| w == 1.0));
    }

    #[test]
    fn test_recent_form_weighs_more() {
        // Alpha is blunt early on and prolific in the last three rounds.
        let results = league(6, |round| Some(if round < 3 { 0 } else { 4 }));
        let alpha_attack = |xi: f64| {
            let config = FitConfig { xi, ..FitConfig::default() };
            let model = DixonColesModel::fit(&results, &config).unwrap();
            model.team_ratings().into_iter().find(|r| r.team == "Alpha").unwrap().attack
        };
        assert!(alpha_attack(0.05) > alpha_attack(0.0));
    }

    #[test]
    fn test_tau_only_touches_low_scores() {
        assert_float_absolute_eq!(1.0 - 1.5 * 1.2 * 0.1, tau(0, 0, 1.5, 1.2, 0.1), 1e-12);
        assert_float_absolute_eq!(1.0 + 1.5 * 0.1, tau(0, 1, 1.5, 1.2, 0.1), 1e-12);
        assert_float_absolute_eq!(1.0 + 1.2 * 0.1, tau(1, 0, 1.5, 1.2, 0.1), 1e-12);
        assert_float_absolute_eq!(0.9, tau(1, 1, 1.5, 1.2, 0.1), 1e-12);
        assert_eq!(1.0, tau(2, 1, 1.5, 1.2, 0.1));
    }

    #[test]
    fn test_load_and_fit_missing_file() {
        let err = DixonColesModel::load_and_fit(Path::new("does/not/exist.csv"), &FitConfig::default()).unwrap_err();
        assert!(matches!(err, FitError::Data(DataError::Io { .. })));
    }
}
