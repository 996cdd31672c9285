//! HTTP server exposing the concierge endpoints
//!
//! One route per provider contract plus `/api/chat`, which drives the
//! dialogue controller. Sessions live in memory only; a per-session mutex
//! keeps each conversation to one turn at a time.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use trip_concierge::{
    extract, Attraction, ConciergeError, Config, ConversationMessage, FlightSearchResponse,
    Providers, Session, TripRequest, WeatherReport,
};

struct AppState {
    providers: Providers,
    sessions: Mutex<HashMap<Uuid, Arc<Mutex<Session>>>>,
}

#[derive(Debug, Deserialize)]
struct ParseRequest {
    prompt: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest {
    user_input: String,
    current_details: TripRequest,
}

#[derive(Debug, Deserialize)]
struct QaRequest {
    query: String,
    destination: String,
}

#[derive(Debug, Serialize)]
struct QaResponse {
    answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlightsRequest {
    origin: String,
    destination: String,
    date: String,
    return_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeatherRequest {
    destination: String,
    start_date: String,
    end_date: String,
}

#[derive(Debug, Deserialize)]
struct AttractionsRequest {
    city: String,
}

#[derive(Debug, Serialize)]
struct AttractionsResponse {
    attractions: Vec<Attraction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    session_id: Option<Uuid>,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    session_id: Uuid,
    messages: Vec<ConversationMessage>,
}

/// Library errors mapped onto HTTP statuses with a JSON error body.
struct ApiError(ConciergeError);

impl From<ConciergeError> for ApiError {
    fn from(error: ConciergeError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ConciergeError::DateParseError(_) | ConciergeError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            ConciergeError::LocationNotFound(_) => StatusCode::NOT_FOUND,
            ConciergeError::MissingConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        };
        warn!(error = %self.0, status = status.as_u16(), "Request failed");
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

fn require_nonempty(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ConciergeError::InvalidInput(format!("{field} must not be empty")).into());
    }
    Ok(())
}

async fn parse(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ParseRequest>,
) -> Result<Json<TripRequest>, ApiError> {
    require_nonempty(&request.prompt, "prompt")?;
    let trip = extract::extract_trip_request(&state.providers.llm, &request.prompt).await?;
    Ok(Json(trip))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<TripRequest>, ApiError> {
    require_nonempty(&request.user_input, "userInput")?;
    let trip = extract::update_missing_fields(
        &state.providers.llm,
        &request.user_input,
        &request.current_details,
    )
    .await?;
    Ok(Json(trip))
}

async fn qa(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QaRequest>,
) -> Result<Json<QaResponse>, ApiError> {
    require_nonempty(&request.query, "query")?;
    require_nonempty(&request.destination, "destination")?;
    let answer = state
        .providers
        .llm
        .answer_destination_question(&request.query, &request.destination)
        .await
        .map_err(ConciergeError::from)?;
    Ok(Json(QaResponse { answer }))
}

async fn flights(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FlightsRequest>,
) -> Result<Json<FlightSearchResponse>, ApiError> {
    require_nonempty(&request.origin, "origin")?;
    require_nonempty(&request.destination, "destination")?;
    let response = state
        .providers
        .flights
        .search(
            &request.origin,
            &request.destination,
            &request.date,
            request.return_date.as_deref(),
        )
        .await?;
    Ok(Json(response))
}

async fn weather(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WeatherRequest>,
) -> Result<Json<WeatherReport>, ApiError> {
    require_nonempty(&request.destination, "destination")?;
    let report = state
        .providers
        .weather
        .report(
            &state.providers.llm,
            &request.destination,
            &request.start_date,
            &request.end_date,
        )
        .await?;
    Ok(Json(report))
}

async fn attractions(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AttractionsRequest>,
) -> Result<Json<AttractionsResponse>, ApiError> {
    require_nonempty(&request.city, "city")?;
    let attractions = state.providers.attractions.lookup(&request.city).await?;
    Ok(Json(AttractionsResponse { attractions }))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    require_nonempty(&request.message, "message")?;

    let session_id = request.session_id.unwrap_or_else(Uuid::new_v4);
    let session = {
        let mut sessions = state.sessions.lock().await;
        sessions
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(Session::new())))
            .clone()
    };

    // One turn at a time per conversation.
    let mut session = session.lock().await;
    let messages = session.handle_message(&request.message, &state.providers).await;
    Ok(Json(ChatResponse {
        session_id,
        messages,
    }))
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/parse", post(parse))
        .route("/api/update", post(update))
        .route("/api/qa", post(qa))
        .route("/api/flights", post(flights))
        .route("/api/weather", post(weather))
        .route("/api/attractions", post(attractions))
        .route("/api/chat", post(chat))
        .with_state(state)
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,trip_concierge=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = Config::from_env()?;
    let addr = config.addr.clone();
    let state = Arc::new(AppState {
        providers: Providers::from_config(&config),
        sessions: Mutex::new(HashMap::new()),
    });

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Trip concierge server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
