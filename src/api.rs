// Coop Ledger - REST API with Axum
// JSON routes over the Store; the dashboard UI is an external client

use crate::db::{Event, Store};
use crate::dashboard::DashboardSummary;
use crate::entities::{
    Activity, ActivityUpdate, Coop, CoopUpdate, Expense, Invoice, InvoiceUpdate, Mortality,
    NewActivity, NewExpense, NewInvoice, NewMortality, NewPurchase, Purchase,
};
use crate::error::FarmError;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, put},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<Store>>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Every request holds the lock for its whole read-modify-write.
    /// Poison is ignored: an unfinished SQLite transaction rolls back on drop.
    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Farm(FarmError),
    /// Body or path could not be parsed
    Rejected(String),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Farm(err) if err.is_client_error() => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Farm(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Rejected(message) => (StatusCode::BAD_REQUEST, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }
        (status, Json(ErrorBody { message })).into_response()
    }
}

impl From<FarmError> for ApiError {
    fn from(err: FarmError) -> Self {
        ApiError::Farm(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected(rejection.body_text())
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "OK", "version": crate::VERSION }))
}

/// GET /api/coops - All coops ordered by number
async fn list_coops(State(state): State<AppState>) -> ApiResult<Vec<Coop>> {
    Ok(Json(state.store().coops()?))
}

/// GET /api/coops/:id
async fn get_coop(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Coop> {
    let Path(id) = id?;
    Ok(Json(state.store().coop(id)?))
}

/// PUT /api/coops/:id - Partial update (quantity, entryDate, status)
async fn update_coop(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<CoopUpdate>, JsonRejection>,
) -> ApiResult<Coop> {
    let Path(id) = id?;
    let Json(update) = body?;
    Ok(Json(state.store().update_coop(id, update)?))
}

/// GET /api/coops/:id/events - Audit trail of one coop
async fn coop_events(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Vec<Event>> {
    let Path(id) = id?;
    Ok(Json(state.store().coop_events(id)?))
}

/// GET /api/purchases
async fn list_purchases(State(state): State<AppState>) -> ApiResult<Vec<Purchase>> {
    Ok(Json(state.store().purchases()?))
}

/// POST /api/purchases - Chicken purchases rotate the coops
async fn create_purchase(
    State(state): State<AppState>,
    body: Result<Json<NewPurchase>, JsonRejection>,
) -> ApiResult<Purchase> {
    let Json(input) = body?;
    Ok(Json(state.store().create_purchase(input)?))
}

/// GET /api/expenses
async fn list_expenses(State(state): State<AppState>) -> ApiResult<Vec<Expense>> {
    Ok(Json(state.store().expenses()?))
}

/// POST /api/expenses
async fn create_expense(
    State(state): State<AppState>,
    body: Result<Json<NewExpense>, JsonRejection>,
) -> ApiResult<Expense> {
    let Json(input) = body?;
    Ok(Json(state.store().create_expense(input)?))
}

/// GET /api/activities
async fn list_activities(State(state): State<AppState>) -> ApiResult<Vec<Activity>> {
    Ok(Json(state.store().activities()?))
}

/// POST /api/activities
async fn create_activity(
    State(state): State<AppState>,
    body: Result<Json<NewActivity>, JsonRejection>,
) -> ApiResult<Activity> {
    let Json(input) = body?;
    Ok(Json(state.store().create_activity(input)?))
}

/// PUT /api/activities/:id
async fn update_activity(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<ActivityUpdate>, JsonRejection>,
) -> ApiResult<Activity> {
    let Path(id) = id?;
    let Json(update) = body?;
    Ok(Json(state.store().update_activity(id, update)?))
}

/// GET /api/invoices
async fn list_invoices(State(state): State<AppState>) -> ApiResult<Vec<Invoice>> {
    Ok(Json(state.store().invoices()?))
}

/// POST /api/invoices - Numbers the invoice and deducts the sales coop
async fn create_invoice(
    State(state): State<AppState>,
    body: Result<Json<NewInvoice>, JsonRejection>,
) -> ApiResult<Invoice> {
    let Json(input) = body?;
    Ok(Json(state.store().create_invoice(input)?))
}

/// PUT /api/invoices/:id
async fn update_invoice(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<InvoiceUpdate>, JsonRejection>,
) -> ApiResult<Invoice> {
    let Path(id) = id?;
    let Json(update) = body?;
    Ok(Json(state.store().update_invoice(id, update)?))
}

/// DELETE /api/invoices/:id - Stock is not restored
async fn delete_invoice(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<serde_json::Value> {
    let Path(id) = id?;
    state.store().delete_invoice(id)?;
    Ok(Json(serde_json::json!({ "message": "Invoice deleted successfully" })))
}

/// GET /api/mortalities
async fn list_mortalities(State(state): State<AppState>) -> ApiResult<Vec<Mortality>> {
    Ok(Json(state.store().mortalities()?))
}

/// POST /api/mortalities - Deducts the coop when it holds enough birds
async fn create_mortality(
    State(state): State<AppState>,
    body: Result<Json<NewMortality>, JsonRejection>,
) -> ApiResult<Mortality> {
    let Json(input) = body?;
    Ok(Json(state.store().create_mortality(input)?))
}

/// GET /api/dashboard - Totals and coop ages as of now
async fn dashboard(State(state): State<AppState>) -> ApiResult<DashboardSummary> {
    Ok(Json(state.store().dashboard(Utc::now())?))
}

// ============================================================================
// Router
// ============================================================================

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/coops", get(list_coops))
        .route("/coops/:id", get(get_coop).put(update_coop))
        .route("/coops/:id/events", get(coop_events))
        .route("/purchases", get(list_purchases).post(create_purchase))
        .route("/expenses", get(list_expenses).post(create_expense))
        .route("/activities", get(list_activities).post(create_activity))
        .route("/activities/:id", put(update_activity))
        .route("/invoices", get(list_invoices).post(create_invoice))
        .route("/invoices/:id", put(update_invoice).delete(delete_invoice))
        .route("/mortalities", get(list_mortalities).post(create_mortality))
        .route("/dashboard", get(dashboard))
        .with_state(state)
}

/// Full application: `/api` routes plus an optional static UI at `/`
pub fn app(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let router = Router::new().nest("/api", api_routes(state));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
