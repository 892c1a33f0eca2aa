mod api;
mod cli;
mod config;
mod data;
mod models;
mod services;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::config::Settings;
use crate::data::RosterStore;
use crate::services::{DixonColesModel, FitError, OutcomeModel, PredictionEngine, RateEstimator};

#[derive(Parser)]
#[command(name = "goalmodel")]
#[command(about = "Match outcome probabilities and expected goals for football fixtures")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Predict a single fixture
    Predict {
        #[arg(long)]
        home: String,
        #[arg(long)]
        away: String,
    },
    /// List the roster with per-match rates
    Teams,
    /// Show fitted team ratings
    Ratings,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let mut settings = Settings::from_env()?;

    match cli.command {
        Some(Commands::Serve { port }) => {
            if let Some(port) = port {
                settings.port = port;
            }
            let (engine, _) = startup(&settings).await?;
            api::serve(&settings, engine).await?;
        }
        Some(Commands::Predict { home, away }) => {
            let (engine, _) = startup(&settings).await?;
            cli::predict(&engine, &home, &away)?;
        }
        Some(Commands::Teams) => {
            let estimator = RateEstimator::new(Arc::new(RosterStore::serie_a()));
            cli::list_teams(&estimator)?;
        }
        Some(Commands::Ratings) => {
            let (_, model) = startup(&settings).await?;
            cli::show_ratings(model.as_deref())?;
        }
        None => {
            // Default to serving
            let (engine, _) = startup(&settings).await?;
            api::serve(&settings, engine).await?;
        }
    }

    Ok(())
}

/// Loads the roster and, once, the optional fitted model. A failed fit is not fatal.
async fn startup(settings: &Settings) -> Result<(Arc<PredictionEngine>, Option<Arc<DixonColesModel>>)> {
    let roster = Arc::new(RosterStore::serie_a());
    tracing::info!("Loaded roster of {} teams", roster.len());

    let fit_settings = settings.clone();
    let fitted = tokio::task::spawn_blocking(move || fit_model(&fit_settings)).await?;
    let model = match fitted {
        Ok(model) => Some(Arc::new(model)),
        Err(FitError::Disabled) => {
            tracing::info!("Fit model disabled, serving heuristic predictions only");
            None
        }
        Err(e) => {
            tracing::warn!("Fit model unavailable, serving heuristic predictions only: {}", e);
            None
        }
    };

    let outcome_model = model.clone().map(|m| m as Arc<dyn OutcomeModel>);
    let engine = Arc::new(PredictionEngine::new(roster, outcome_model));
    tracing::info!("Prediction engine ready (fit model available: {})", engine.has_fit_model());
    Ok((engine, model))
}

fn fit_model(settings: &Settings) -> Result<DixonColesModel, FitError> {
    if !settings.fit_enabled {
        return Err(FitError::Disabled);
    }
    DixonColesModel::load_and_fit(&settings.results_path, &settings.fit_config())
}
