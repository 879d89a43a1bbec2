// Finance Manager - REST API with Axum
// Router lives in the library so handlers can be exercised without a socket

use crate::db::ExpenseStore;
use crate::expense::{Expense, ManualEntry};
use crate::interpreter::interpret;
use crate::summary::Summary;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<ExpenseStore>>,
    income: f64,
    recent_limit: usize,
}

impl AppState {
    pub fn new(store: ExpenseStore, income: f64, recent_limit: usize) -> Self {
        Self {
            db: Arc::new(Mutex::new(store)),
            income,
            recent_limit,
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, ExpenseStore>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::internal("database lock poisoned"))
    }
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    fn not_found(id: i64) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("Expense {} not found", id),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        error!("request failed: {:#}", e);
        Self::internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::err(self.message))).into_response()
    }
}

type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

#[derive(Debug, Deserialize)]
pub struct VoiceRequest {
    pub utterance: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub removed: usize,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/expenses - Newest first
async fn list_expenses(State(state): State<AppState>) -> ApiResult<Vec<Expense>> {
    let expenses = state.store()?.all()?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(expenses))))
}

/// POST /api/expenses - Manual entry
async fn create_expense(
    State(state): State<AppState>,
    Json(entry): Json<ManualEntry>,
) -> ApiResult<Expense> {
    let mut expense = entry.validate(Utc::now()).map_err(|e| ApiError {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        message: e.to_string(),
    })?;

    expense.id = state.store()?.insert(&expense)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(expense))))
}

/// POST /api/voice - Interpret an utterance and store it
async fn create_from_voice(
    State(state): State<AppState>,
    Json(request): Json<VoiceRequest>,
) -> ApiResult<Expense> {
    let mut expense = Expense::from_candidate(interpret(&request.utterance), Utc::now());
    expense.id = state.store()?.insert(&expense)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(expense))))
}

/// PUT /api/expenses/:id - Replace fields of an existing expense
async fn update_expense(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(entry): Json<ManualEntry>,
) -> ApiResult<Expense> {
    let store = state.store()?;
    let existing = store.get(id)?.ok_or_else(|| ApiError::not_found(id))?;

    let mut expense = entry
        .validate(existing.created_at)
        .map_err(|e| ApiError {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: e.to_string(),
        })?;
    expense.id = id;
    if entry.date.is_none() {
        expense.date = existing.date;
    }

    store.update(&expense)?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(expense))))
}

/// DELETE /api/expenses/:id
async fn delete_expense(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<DeletedResponse> {
    let store = state.store()?;
    if store.get(id)?.is_none() {
        return Err(ApiError::not_found(id));
    }
    store.delete(id)?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(DeletedResponse { removed: 1 }))))
}

/// DELETE /api/expenses - Wipe everything
async fn delete_all_expenses(State(state): State<AppState>) -> ApiResult<DeletedResponse> {
    let removed = state.store()?.delete_all()?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(DeletedResponse { removed }))))
}

/// GET /api/summary - Totals, balance, breakdown, recent
async fn get_summary(State(state): State<AppState>) -> ApiResult<Summary> {
    let expenses = state.store()?.all()?;
    let summary = Summary::from_expenses(&expenses, state.income, state.recent_limit);
    Ok((StatusCode::OK, Json(ApiResponse::ok(summary))))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route(
            "/expenses",
            get(list_expenses)
                .post(create_expense)
                .delete(delete_all_expenses),
        )
        .route("/expenses/:id", put(update_expense).delete(delete_expense))
        .route("/voice", post(create_from_voice))
        .route("/summary", get(get_summary))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}
