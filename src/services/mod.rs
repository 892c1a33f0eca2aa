pub mod fit_model;
pub mod markets;
pub mod optimize;
pub mod predictor;
pub mod rate_estimator;
pub mod scoregrid;

pub use fit_model::{DixonColesModel, FitError, OutcomeModel};
pub use predictor::*;
pub use rate_estimator::RateEstimator;
