use crate::models::Scoreline;
use crate::services::scoregrid::ScorelineMatrix;

/// Goal line of the over/under market.
pub const OVER_UNDER_LINE: f64 = 2.5;

/// Markets read off a scoreline matrix, as unrounded percentages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketSummary {
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
    pub both_teams_to_score: f64,
    pub over: f64,
    pub most_likely: Scoreline,
}

pub fn extract(matrix: &ScorelineMatrix) -> MarketSummary {
    let (home_win, draw, away_win) = outcome_probs(matrix);
    MarketSummary {
        home_win: home_win * 100.0,
        draw: draw * 100.0,
        away_win: away_win * 100.0,
        both_teams_to_score: both_teams_to_score(matrix) * 100.0,
        over: over(matrix, OVER_UNDER_LINE) * 100.0,
        most_likely: most_likely_scoreline(matrix),
    }
}

/// Home win, draw and away win mass.
pub fn outcome_probs(matrix: &ScorelineMatrix) -> (f64, f64, f64) {
    matrix
        .iter()
        .fold((0.0, 0.0, 0.0), |(home, draw, away), (h, a, p)| match h.cmp(&a) {
            std::cmp::Ordering::Greater => (home + p, draw, away),
            std::cmp::Ordering::Equal => (home, draw + p, away),
            std::cmp::Ordering::Less => (home, draw, away + p),
        })
}

pub fn both_teams_to_score(matrix: &ScorelineMatrix) -> f64 {
    matrix.iter().filter(|&(h, a, _)| h > 0 && a > 0).map(|(_, _, p)| p).sum()
}

/// Mass of scorelines whose total exceeds `line`.
pub fn over(matrix: &ScorelineMatrix, line: f64) -> f64 {
    matrix
        .iter()
        .filter(|&(h, a, _)| (h + a) as f64 > line)
        .map(|(_, _, p)| p)
        .sum()
}

/// Highest-probability cell. Ties go to the first cell in row-major order.
pub fn most_likely_scoreline(matrix: &ScorelineMatrix) -> Scoreline {
    let mut best = Scoreline { home: 0, away: 0 };
    let mut best_prob = f64::NEG_INFINITY;
    for (home, away, p) in matrix.iter() {
        if p > best_prob {
            best = Scoreline { home, away };
            best_prob = p;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GoalRatePair;
    use crate::services::scoregrid::MAX_GOALS;
    use assert_float_eq::*;

    fn build(home: f64, away: f64) -> ScorelineMatrix {
        ScorelineMatrix::build(&GoalRatePair::new(home, away).unwrap(), MAX_GOALS)
    }

    #[test]
    fn test_outcomes_sum_to_retained_mass() {
        for &(home, away) in &[(0.2, 0.2), (0.5, 1.5), (1.0, 1.0), (1.95, 0.66), (3.0, 3.0), (6.0, 6.0)] {
            let matrix = build(home, away);
            let markets = extract(&matrix);
            let sum = markets.home_win + markets.draw + markets.away_win;
            assert!(sum <= 100.0 + 1e-9, "sum {sum} for ({home}, {away})");
            assert_float_absolute_eq!(matrix.total() * 100.0, sum, 1e-9);
        }
    }

    #[test]
    fn test_truncation_error_bounded_for_typical_rates() {
        // Each side keeps P(X <= 6) >= 0.9985 when lambda <= 1.5.
        for &(home, away) in &[(0.2, 1.5), (1.5, 1.5), (1.0, 0.7), (1.2, 1.4)] {
            let markets = extract(&build(home, away));
            let sum = markets.home_win + markets.draw + markets.away_win;
            assert!(100.0 - sum <= 0.5, "truncation {} for ({home}, {away})", 100.0 - sum);
        }
    }

    #[test]
    fn test_btts_excludes_scoreless_sides() {
        let markets = extract(&build(1.0, 1.0));
        let p0 = f64::exp(-1.0);
        let expected = 100.0 * (1.0 - p0 - p0 + p0 * p0);
        assert_float_absolute_eq!(expected, markets.both_teams_to_score, 0.05);
    }

    #[test]
    fn test_over_line_counts_three_or_more_goals() {
        let cells = vec![
            vec![0.10, 0.10, 0.10],
            vec![0.10, 0.10, 0.10],
            vec![0.10, 0.10, 0.20],
        ];
        let matrix = ScorelineMatrix::from_cells(cells).unwrap();
        // (1,2), (2,1), (2,2)
        assert_float_absolute_eq!(0.40, over(&matrix, OVER_UNDER_LINE), 1e-12);
        assert_float_absolute_eq!(0.50, both_teams_to_score(&matrix), 1e-12);
    }

    #[test]
    fn test_most_likely_tie_break_is_row_major() {
        let cells = vec![
            vec![0.10, 0.30, 0.00],
            vec![0.30, 0.10, 0.00],
            vec![0.00, 0.00, 0.00],
        ];
        let matrix = ScorelineMatrix::from_cells(cells).unwrap();
        assert_eq!(most_likely_scoreline(&matrix).to_string(), "0-1");

        let cells = vec![
            vec![0.00, 0.00, 0.00],
            vec![0.00, 0.00, 0.25],
            vec![0.25, 0.00, 0.00],
        ];
        let matrix = ScorelineMatrix::from_cells(cells).unwrap();
        assert_eq!(most_likely_scoreline(&matrix).to_string(), "1-2");
    }

    #[test]
    fn test_most_likely_for_home_favourite() {
        let markets = extract(&build(1.95, 0.66));
        assert_eq!(markets.most_likely, Scoreline { home: 1, away: 0 });
        assert!(markets.home_win > markets.away_win);
    }
}
