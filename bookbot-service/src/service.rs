//! HTTP surface: routes, shared state and request-scoped middleware.

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::error::{GenerationError, PreferencesError};
use crate::history::HistoryStore;
use crate::i18n::{
    Message, genre_display_names, generation_failed_message, lookup_genre,
    preferences_error_message,
};
use crate::models::{
    FamiliarityLevel, Genre, Language, Preferences, RecommendRequest, RecommendResponse,
};
use crate::workflow::Orchestrator;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub history: Arc<dyn HistoryStore>,
}

type ApiError = (StatusCode, Json<Value>);

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/genres", get(list_genres))
        .route("/api/recommend", post(recommend))
        .layer(from_fn(correlation_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    // Reuse the caller's ID when it sent one
    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let header = HeaderValue::from_str(&correlation_id).ok();
    if let Some(header) = &header {
        request
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, header.clone());
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(header) = header {
        response.headers_mut().insert(CORRELATION_ID_HEADER, header);
    }
    response
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn list_genres() -> Json<Value> {
    let internal: Vec<&str> = Genre::ALL.iter().map(|genre| genre.as_str()).collect();
    Json(json!({
        "en": genre_display_names(Language::En),
        "zh": genre_display_names(Language::Zh),
        "internal": internal,
    }))
}

async fn recommend(
    State(state): State<AppState>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected request body");
        bad_request(Message::InvalidRequestBody.text(Language::En))
    })?;

    let language = match request.language.as_deref() {
        None => Language::default(),
        Some(code) => Language::from_code(code).ok_or_else(|| {
            warn!(language = %code, "Unsupported language");
            bad_request(Message::UnsupportedLanguage.text(Language::En))
        })?,
    };

    let session_id = match request.session_id {
        Some(raw) => Uuid::parse_str(&raw)
            .map_err(|_| {
                warn!(session_id = %raw, "Invalid session ID format");
                bad_request(format!("Invalid session_id: {raw}"))
            })?
            .to_string(),
        None => Uuid::new_v4().to_string(),
    };

    info!(
        session_id = %session_id,
        language = language.code(),
        genres = request.genres.len(),
        books = request.favorite_books.len(),
        "Processing recommendation request"
    );

    let preferences = build_preferences(
        &request.genres,
        request.favorite_books,
        request.familiarity_level,
        language,
    )
    .map_err(|e| {
        warn!(session_id = %session_id, error = %e, "Rejected preferences");
        bad_request(preferences_error_message(&e, language))
    })?;

    let mut exclusion = state
        .history
        .delivered_titles(&session_id)
        .await
        .map_err(|e| {
            error!(session_id = %session_id, error = %e, "Failed to load history");
            internal_error("Failed to load recommendation history")
        })?;
    exclusion.extend(request.exclude);

    match state
        .orchestrator
        .generate(&preferences, &exclusion, language)
        .await
    {
        Ok(recommendations) => {
            let titles: Vec<String> = recommendations
                .iter()
                .map(|recommendation| recommendation.title.clone())
                .collect();
            if let Err(e) = state.history.record(&session_id, &titles).await {
                error!(session_id = %session_id, error = %e, "Failed to record delivered titles");
            }

            Ok(Json(RecommendResponse {
                session_id,
                recommendations,
            }))
        }
        Err(GenerationError::Exhausted { attempts }) => {
            warn!(session_id = %session_id, attempts, "No recommendations generated");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "session_id": session_id,
                    "error": generation_failed_message(language),
                })),
            ))
        }
    }
}

fn build_preferences(
    genre_names: &[String],
    favorite_books: Vec<String>,
    familiarity_level: Option<Value>,
    language: Language,
) -> Result<Preferences, PreferencesError> {
    let genres = genre_names
        .iter()
        .map(|name| {
            lookup_genre(name, language).ok_or_else(|| PreferencesError::UnknownGenre(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let familiarity_level = FamiliarityLevel::new(familiarity_number(familiarity_level)?)?;
    Preferences::new(genres, favorite_books, familiarity_level)
}

/// Integers, whole-number strings and finite floats (truncated) count as numbers.
fn familiarity_number(value: Option<Value>) -> Result<i64, PreferencesError> {
    let number = match &value {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(Value::String(text)) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    number.ok_or_else(|| {
        let shown = value.map(|v| v.to_string()).unwrap_or_else(|| "missing".to_string());
        PreferencesError::FamiliarityNotANumber(shown)
    })
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.into() })),
    )
}

fn internal_error(message: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
}
