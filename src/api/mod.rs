use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Settings;
use crate::models::{ErrorResponse, MatchPrediction, PredictRequest};
use crate::services::PredictionEngine;

pub async fn serve(settings: &Settings, engine: Arc<PredictionEngine>) -> anyhow::Result<()> {
    let app = create_router(engine);

    let listener = tokio::net::TcpListener::bind(settings.bind_address()).await?;
    tracing::info!("Goal model API server listening on {}", settings.bind_address());

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn create_router(engine: Arc<PredictionEngine>) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(engine)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request body")]
    InvalidBody(#[from] serde_json::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidBody(e) => {
                tracing::debug!("Rejected request body: {}", e);
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::new("Invalid request body"))).into_response()
            }
        }
    }
}

// POST /predict - Outcome probabilities and expected goals for a fixture
async fn predict_handler(
    State(engine): State<Arc<PredictionEngine>>,
    body: Bytes,
) -> Result<Json<MatchPrediction>, ApiError> {
    let request: PredictRequest = serde_json::from_slice(&body)?;
    let (prediction, source) = engine.predict_with_source(&request.home_team, &request.away_team);
    tracing::info!(
        "Prediction for {} vs {} served by {}",
        request.home_team,
        request.away_team,
        source
    );
    Ok(Json(prediction))
}
