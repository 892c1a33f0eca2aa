use anyhow::Result;

use crate::services::rate_estimator::RateEstimator;
use crate::services::{DixonColesModel, PredictionEngine};

pub fn predict(engine: &PredictionEngine, home: &str, away: &str) -> Result<()> {
    if engine.roster().lookup(home).is_none() {
        println!("⚠️  '{}' is not in the roster, league averages will be used", home);
    }
    if engine.roster().lookup(away).is_none() {
        println!("⚠️  '{}' is not in the roster, league averages will be used", away);
    }

    let (prediction, source) = engine.predict_with_source(home, away);

    println!("🔮 {} vs {} ({}):", home, away, source);
    println!(
        "   Home win: {:.1}% | Draw: {:.1}% | Away win: {:.1}%",
        prediction.home_win_prob, prediction.draw_prob, prediction.away_win_prob
    );
    println!(
        "   Expected goals: {:.2} - {:.2} (total {:.2})",
        prediction.expected_goals_home, prediction.expected_goals_away, prediction.expected_goals_total
    );
    println!(
        "   BTTS: {:.1}% | Over 2.5: {:.1}% | Most likely: {}",
        prediction.both_teams_to_score_prob, prediction.over_under_prob, prediction.most_likely_scoreline
    );
    println!("\n{}", serde_json::to_string_pretty(&prediction)?);

    Ok(())
}

pub fn list_teams(estimator: &RateEstimator) -> Result<()> {
    let roster = estimator.roster();
    println!("📋 Roster ({} teams):\n", roster.len());
    println!("   {:<12} {:>3} {:>4} {:>4} {:>7} {:>7}", "Team", "P", "GF", "GA", "GF/90", "GA/90");

    for record in roster.records() {
        let rates = estimator.team_rates(&record.team_name);
        println!(
            "   {:<12} {:>3} {:>4} {:>4} {:>7.2} {:>7.2}",
            record.team_name, record.matches_played, record.goals_for, record.goals_against, rates.attack, rates.defence
        );
    }

    let average = estimator.league_average_rates();
    println!(
        "\n💡 Unknown teams use the league-average rates: {:.2} scored, {:.2} conceded",
        average.attack, average.defence
    );

    Ok(())
}

pub fn show_ratings(model: Option<&DixonColesModel>) -> Result<()> {
    let Some(model) = model else {
        println!("📭 No fitted model is available; predictions use the roster heuristic.");
        println!("💡 Check GOALMODEL_RESULTS_PATH and GOALMODEL_FIT_ENABLED");
        return Ok(());
    };

    println!(
        "📊 Dixon-Coles ratings ({} teams, {} matches up to {}):",
        model.team_count(),
        model.matches(),
        model.reference_date().format("%Y-%m-%d")
    );
    println!(
        "   Home advantage: {:.3} | rho: {:.4}\n",
        model.home_advantage(),
        model.rho()
    );

    for (i, rating) in model.team_ratings().iter().enumerate() {
        println!(
            "{:>3}. {:<20} attack {:>+7.3} | defence {:>+7.3}",
            i + 1,
            rating.team,
            rating.attack,
            rating.defence
        );
    }

    Ok(())
}
