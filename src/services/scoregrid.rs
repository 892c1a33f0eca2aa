use statrs::distribution::{Discrete, Poisson};

use crate::models::GoalRatePair;

/// Highest goal count per side kept in the grid.
pub const MAX_GOALS: usize = 6;

/// Joint probabilities of final scorelines, indexed `[home_goals][away_goals]`.
///
/// Mass beyond `max_goals` on either side is dropped rather than renormalised, so the
/// cells sum to slightly less than one.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorelineMatrix {
    cells: Vec<Vec<f64>>,
}

impl ScorelineMatrix {
    /// Independent Poisson marginals for each side, multiplied cell by cell.
    pub fn build(rates: &GoalRatePair, max_goals: usize) -> Self {
        let home = poisson_marginal(rates.lambda_home(), max_goals);
        let away = poisson_marginal(rates.lambda_away(), max_goals);
        let cells = home
            .iter()
            .map(|&p_home| away.iter().map(|&p_away| p_home * p_away).collect())
            .collect();
        Self { cells }
    }

    /// Wraps pre-computed cells. Rows are home goals; the grid must be square with a
    /// total mass of at most one.
    pub fn from_cells(cells: Vec<Vec<f64>>) -> Option<Self> {
        let size = cells.len();
        let square = size > 0 && cells.iter().all(|row| row.len() == size);
        let valid = cells.iter().flatten().all(|&p| p.is_finite() && p >= 0.0);
        let total: f64 = cells.iter().flatten().sum();
        (square && valid && total <= 1.0 + 1e-9).then_some(Self { cells })
    }

    pub fn max_goals(&self) -> usize {
        self.cells.len() - 1
    }

    pub fn get(&self, home_goals: usize, away_goals: usize) -> f64 {
        self.cells
            .get(home_goals)
            .and_then(|row| row.get(away_goals))
            .copied()
            .unwrap_or(0.0)
    }

    /// Cells as `(home_goals, away_goals, probability)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(h, row)| row.iter().enumerate().map(move |(a, &p)| (h, a, p)))
    }

    pub fn total(&self) -> f64 {
        self.iter().map(|(_, _, p)| p).sum()
    }
}

/// Poisson mass for goal counts `0..=max_goals`.
pub fn poisson_marginal(lambda: f64, max_goals: usize) -> Vec<f64> {
    match Poisson::new(lambda) {
        Ok(dist) => (0..=max_goals as u64).map(|k| dist.pmf(k)).collect(),
        Err(_) => vec![0.0; max_goals + 1],
    }
}
