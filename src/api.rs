// Family Records - REST API with Axum
// JSON front end over the same entry workflow the CLI and TUI use

use crate::record::{NormalizedRecord, RawEntry};
use crate::schema::{CategorySchema, SchemaRegistry};
use crate::store::RecordStore;
use crate::workflow::{EntryWorkflow, Submission, WorkflowError};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::error;

/// Shared application state
pub struct AppState<S: RecordStore> {
    workflow: Arc<Mutex<EntryWorkflow<'static, S>>>,
}

impl<S: RecordStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            workflow: Arc::clone(&self.workflow),
        }
    }
}

impl<S: RecordStore> AppState<S> {
    pub fn new(workflow: EntryWorkflow<'static, S>) -> Self {
        Self {
            workflow: Arc::new(Mutex::new(workflow)),
        }
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            errors: Vec::new(),
        }
    }
}

fn failure(status: StatusCode, errors: Vec<String>) -> Response {
    let body = ApiResponse {
        success: false,
        data: (),
        errors,
    };
    (status, Json(body)).into_response()
}

fn workflow_failure(e: WorkflowError) -> Response {
    match e {
        WorkflowError::UnknownCategory(_) => failure(StatusCode::NOT_FOUND, vec![e.to_string()]),
        WorkflowError::Store(_) => {
            error!("store failure: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, vec![e.to_string()])
        }
    }
}

fn poisoned() -> Response {
    failure(
        StatusCode::INTERNAL_SERVER_ERROR,
        vec!["workflow state unavailable".to_string()],
    )
}

/// Category summary
#[derive(Serialize)]
struct CategoryResponse {
    name: String,
    fields: usize,
    records: usize,
    records_url: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/categories - All categories with record counts
async fn list_categories<S: RecordStore + Send + 'static>(
    State(state): State<AppState<S>>,
) -> Response {
    let Ok(workflow) = state.workflow.lock() else {
        return poisoned();
    };

    let categories: Vec<CategoryResponse> = workflow
        .categories()
        .iter()
        .map(|category| CategoryResponse {
            name: category.name.clone(),
            fields: category.fields.len(),
            records: workflow.records(&category.name).map_or(0, |r| r.len()),
            records_url: format!(
                "/api/categories/{}/records",
                urlencoding::encode(&category.name)
            ),
        })
        .collect();

    (StatusCode::OK, Json(ApiResponse::ok(categories))).into_response()
}

/// GET /api/categories/:name - Field schema of one category
async fn get_schema<S: RecordStore + Send + 'static>(
    State(state): State<AppState<S>>,
    Path(name): Path<String>,
) -> Response {
    let Ok(workflow) = state.workflow.lock() else {
        return poisoned();
    };

    match workflow.schema(&name) {
        Ok(schema) => (StatusCode::OK, Json(ApiResponse::<&CategorySchema>::ok(schema))).into_response(),
        Err(e) => workflow_failure(e),
    }
}

/// GET /api/categories/:name/records - Stored records of one category
async fn get_records<S: RecordStore + Send + 'static>(
    State(state): State<AppState<S>>,
    Path(name): Path<String>,
) -> Response {
    let Ok(workflow) = state.workflow.lock() else {
        return poisoned();
    };

    match workflow.records(&name) {
        Ok(records) => {
            (StatusCode::OK, Json(ApiResponse::<&[NormalizedRecord]>::ok(records))).into_response()
        }
        Err(e) => workflow_failure(e),
    }
}

/// POST /api/categories/:name/records - Validate and append one entry
async fn add_record<S: RecordStore + Send + 'static>(
    State(state): State<AppState<S>>,
    Path(name): Path<String>,
    payload: Result<Json<RawEntry>, JsonRejection>,
) -> Response {
    // Malformed bodies still get the JSON envelope, with axum's status code
    let raw = match payload {
        Ok(Json(raw)) => raw,
        Err(rejection) => return failure(rejection.status(), vec![rejection.body_text()]),
    };

    let Ok(mut workflow) = state.workflow.lock() else {
        return poisoned();
    };

    match workflow.submit(&name, &raw) {
        Ok(Submission::Accepted(record)) => {
            (StatusCode::CREATED, Json(ApiResponse::ok(record))).into_response()
        }
        Ok(Submission::Rejected(errors)) => failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            errors.iter().map(|e| e.to_string()).collect(),
        ),
        Err(e) => workflow_failure(e),
    }
}

/// Build the `/api` router over a workflow.
pub fn router<S: RecordStore + Send + 'static>(state: AppState<S>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/categories", get(list_categories::<S>))
        .route("/categories/:name", get(get_schema::<S>))
        .route(
            "/categories/:name/records",
            get(get_records::<S>).post(add_record::<S>),
        )
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

/// Convenience for binaries: registry + store → router
pub fn app<S: RecordStore + Send + 'static>(
    registry: &'static SchemaRegistry,
    store: S,
) -> Result<Router, WorkflowError> {
    let workflow = EntryWorkflow::open(registry, store)?;
    Ok(router(AppState::new(workflow)))
}

// ============================================================================
// TESTS
// ============================================================================
