//! Web server for the planner.
//!
//! Provides a JSON API over the planner session, a WebSocket for live
//! updates, and static file serving for the frontend pages.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tower_http::services::ServeDir;
use uuid::Uuid;

use crate::catalog::{Activity, Ingredient, activities, ingredients};
use crate::chart::ChartData;
use crate::domain::LineItem;
use crate::error::{LedgerError, PlannerError};
use crate::handoff::PlannerParams;
use crate::planner::{
    ExerciseForm, FoodForm, MealForm, PlannerSession, ProfileOutcome, ProgressView, SummaryView,
    WeekView,
};
use crate::profile::{ProfileForm, WeightUnit};
use crate::store::FileStore;

/// Message types for WebSocket broadcast.
#[derive(Clone, Debug)]
pub enum WsMessage {
    /// Planner data changed.
    DataUpdated,
    /// A reload from the store failed.
    Error(String),
}

/// Shared application state.
pub struct AppState {
    pub session: RwLock<PlannerSession<FileStore>>,
    /// Store file, for reloads after external edits.
    pub store_path: PathBuf,
    pub ws_broadcast: broadcast::Sender<WsMessage>,
}

impl AppState {
    pub fn new(session: PlannerSession<FileStore>) -> Self {
        let store_path = session.store().path().to_path_buf();
        let (ws_broadcast, _) = broadcast::channel(16);
        Self {
            session: RwLock::new(session),
            store_path,
            ws_broadcast,
        }
    }

    fn notify_updated(&self) {
        // No subscribers is fine
        let _ = self.ws_broadcast.send(WsMessage::DataUpdated);
    }
}

// === Errors ===

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    details: String,
}

/// [`PlannerError`] as an HTTP response.
pub struct ApiError(PlannerError);

impl From<PlannerError> for ApiError {
    fn from(e: PlannerError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            PlannerError::MissingProfile
            | PlannerError::Ledger(LedgerError::EntryNotFound(_))
            | PlannerError::Ledger(LedgerError::EntryIndexOutOfRange { .. }) => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn code(&self) -> &'static str {
        match &self.0 {
            PlannerError::Validation(_) => "invalid_input",
            PlannerError::Ledger(LedgerError::DayOutOfRange(_)) => "day_out_of_range",
            PlannerError::Ledger(LedgerError::InvalidCalories(_)) => "invalid_calories",
            PlannerError::Ledger(LedgerError::EntryNotFound(_))
            | PlannerError::Ledger(LedgerError::EntryIndexOutOfRange { .. }) => "entry_not_found",
            PlannerError::MissingProfile => "missing_profile",
            PlannerError::UnknownActivity(_) => "unknown_activity",
            PlannerError::UnknownIngredient(_) => "unknown_ingredient",
            PlannerError::EmptyMeal => "empty_meal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.code(),
            details: self.0.to_string(),
        };
        log::debug!("{} {}: {}", status, body.error, body.details);
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// === Request / Response Types ===

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlanRequest {
    /// Handoff query string, e.g. `bmr=1649&tdee=2556&weight=80&goal=75&time=10`.
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightRequest {
    pub weight: f64,
    #[serde(default)]
    pub unit: WeightUnit,
    pub date: Option<NaiveDate>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryCreated {
    pub id: Uuid,
    pub calories: f64,
}

#[derive(Serialize)]
pub struct CatalogResponse {
    pub ingredients: &'static [Ingredient],
    pub activities: &'static [Activity],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffResponse {
    pub exercise_query: String,
}

// === Router Setup ===

/// Creates the application router.
pub fn create_router(state: Arc<AppState>, static_dir: PathBuf) -> Router {
    Router::new()
        .route("/api/profile", get(get_profile).post(post_profile))
        .route("/api/week", get(get_week))
        .route("/api/plan/new", post(post_new_plan))
        .route("/api/days/{day}/food", post(post_food))
        .route("/api/days/{day}/meal", post(post_meal))
        .route("/api/days/{day}/exercise", post(post_exercise))
        .route("/api/days/{day}/entries/{id}", delete(delete_entry))
        .route("/api/summary", get(get_summary))
        .route("/api/chart", get(get_chart))
        .route("/api/weight", post(post_weight))
        .route("/api/progress", get(get_progress))
        .route("/api/handoff/exercise", get(get_exercise_handoff))
        .route("/api/catalog", get(get_catalog))
        .route("/ws", get(ws_handler))
        .fallback_service(ServeDir::new(static_dir).append_index_html_on_directories(true))
        .with_state(state)
}

// === WebSocket Handler ===

/// WebSocket upgrade handler for live updates.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws_connection(socket, state))
}

/// Forwards broadcasts to one client until either side goes away.
async fn handle_ws_connection(mut socket: WebSocket, state: Arc<AppState>) {
    log::info!("WebSocket client connected");

    let mut rx = state.ws_broadcast.subscribe();

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let text = match msg {
                    Ok(WsMessage::DataUpdated) => "reload".to_string(),
                    Ok(WsMessage::Error(err)) => format!("error:{}", err),
                    // Missed some messages, a reload covers them
                    Err(broadcast::error::RecvError::Lagged(_)) => "reload".to_string(),
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    log::info!("WebSocket client disconnected");
}

/// Runs the web server.
pub async fn run_server(
    state: Arc<AppState>,
    port: u16,
    static_dir: PathBuf,
) -> anyhow::Result<()> {
    let app = create_router(state, static_dir);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("Server running at http://localhost:{}", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// === API Handlers ===

/// GET /api/profile - Saved profile with metrics.
async fn get_profile(State(state): State<Arc<AppState>>) -> ApiResult<ProfileOutcome> {
    let session = state.session.read().await;
    Ok(Json(session.current_profile()?))
}

/// POST /api/profile - Onboarding form submission.
async fn post_profile(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ProfileForm>,
) -> ApiResult<ProfileOutcome> {
    let outcome = state.session.write().await.submit_profile(&form, today())?;
    state.notify_updated();
    Ok(Json(outcome))
}

/// GET /api/week - All seven days with entries and budget status.
async fn get_week(State(state): State<Arc<AppState>>) -> ApiResult<WeekView> {
    Ok(Json(state.session.read().await.week_view()?))
}

/// POST /api/plan/new - Reset the week, optionally with handoff parameters.
async fn post_new_plan(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewPlanRequest>,
) -> ApiResult<WeekView> {
    let params = request
        .query
        .as_deref()
        .map(PlannerParams::from_query)
        .transpose()
        .map_err(PlannerError::from)?;

    let mut session = state.session.write().await;
    session.new_plan(params);
    let view = session.week_view()?;
    drop(session);

    state.notify_updated();
    Ok(Json(view))
}

/// POST /api/days/:day/food - Manual food entry.
async fn post_food(
    State(state): State<Arc<AppState>>,
    Path(day): Path<usize>,
    Json(form): Json<FoodForm>,
) -> ApiResult<EntryCreated> {
    let id = state.session.write().await.add_food(day, &form)?;
    state.notify_updated();
    Ok(Json(EntryCreated {
        id,
        calories: form.calories,
    }))
}

/// POST /api/days/:day/meal - Ingredient-built meal.
async fn post_meal(
    State(state): State<Arc<AppState>>,
    Path(day): Path<usize>,
    Json(form): Json<MealForm>,
) -> ApiResult<EntryCreated> {
    let mut session = state.session.write().await;
    let id = session.add_meal(day, &form)?;
    let calories = session
        .ledger()
        .day(day)
        .ok()
        .and_then(|d| d.entries.iter().find(|e| e.id == id))
        .map_or(0.0, |e| e.cal);
    drop(session);

    state.notify_updated();
    Ok(Json(EntryCreated { id, calories }))
}

/// POST /api/days/:day/exercise - Exercise entry.
async fn post_exercise(
    State(state): State<Arc<AppState>>,
    Path(day): Path<usize>,
    Json(form): Json<ExerciseForm>,
) -> ApiResult<EntryCreated> {
    let (id, calories) = state.session.write().await.add_exercise(day, &form)?;
    state.notify_updated();
    Ok(Json(EntryCreated { id, calories }))
}

/// DELETE /api/days/:day/entries/:id - Remove one entry.
async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Path((day, id)): Path<(usize, Uuid)>,
) -> ApiResult<LineItem> {
    let removed = state.session.write().await.remove_entry(day, id)?;
    state.notify_updated();
    Ok(Json(removed))
}

/// GET /api/summary - Weekly totals and weight change estimate.
async fn get_summary(State(state): State<Arc<AppState>>) -> ApiResult<SummaryView> {
    Ok(Json(state.session.read().await.summary()?))
}

/// GET /api/chart - Series for the dashboard charts.
async fn get_chart(State(state): State<Arc<AppState>>) -> ApiResult<ChartData> {
    Ok(Json(state.session.read().await.chart()?))
}

/// POST /api/weight - Record a weigh-in.
async fn post_weight(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WeightRequest>,
) -> ApiResult<ProgressView> {
    let date = request.date.unwrap_or_else(today);
    let mut session = state.session.write().await;
    session.record_weight(date, request.weight, request.unit)?;
    let progress = session.progress(today())?;
    drop(session);

    state.notify_updated();
    Ok(Json(progress))
}

/// GET /api/progress - Weight history projection.
async fn get_progress(State(state): State<Arc<AppState>>) -> ApiResult<ProgressView> {
    Ok(Json(state.session.read().await.progress(today())?))
}

/// GET /api/handoff/exercise - Query string for the exercise page.
async fn get_exercise_handoff(State(state): State<Arc<AppState>>) -> ApiResult<HandoffResponse> {
    let exercise_query = state.session.read().await.exercise_handoff()?;
    Ok(Json(HandoffResponse { exercise_query }))
}

/// GET /api/catalog - Built-in ingredients and activities.
async fn get_catalog() -> Json<CatalogResponse> {
    Json(CatalogResponse {
        ingredients: ingredients(),
        activities: activities(),
    })
}
