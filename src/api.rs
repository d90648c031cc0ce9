use axum::{body::Bytes, extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::error::{WorkerError, WorkerResult};
use crate::worker::{JobRequest, JobResponse, Worker};

pub const SERVICE_NAME: &str = "musaix-audio-analyzer";

#[derive(Clone)]
pub struct AppState {
    pub worker: Arc<Worker>,
    /// Job slots; one permit per job in flight.
    pub job_slots: Arc<Semaphore>,
}

impl AppState {
    /// Jobs run one at a time.
    pub fn new(worker: Arc<Worker>) -> Self {
        Self::with_max_jobs(worker, 1)
    }

    pub fn with_max_jobs(worker: Arc<Worker>, max_jobs: usize) -> Self {
        Self {
            worker,
            job_slots: Arc::new(Semaphore::new(max_jobs.max(1))),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// GET / and GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST / and POST /analyze
///
/// The request body is validated before any download starts. The job waits
/// for a free slot, then runs on the blocking pool since decoding and HTTP
/// calls are synchronous. The slot is released when the job finishes.
pub async fn submit_job(State(state): State<AppState>, body: Bytes) -> WorkerResult<Json<JobResponse>> {
    let job = JobRequest::parse(&body)?;

    let permit = Arc::clone(&state.job_slots)
        .acquire_owned()
        .await
        .map_err(|e| WorkerError::Internal(e.to_string()))?;

    let worker = Arc::clone(&state.worker);
    let response = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        worker.process(job)
    })
    .await
    .map_err(|e| WorkerError::Internal(e.to_string()))?
    .inspect_err(|e| log::error!("Error in analysis function: {}", e))?;

    Ok(Json(response))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check).post(submit_job))
        .route("/health", get(health_check))
        .route("/analyze", axum::routing::post(submit_job))
        .with_state(state)
}
