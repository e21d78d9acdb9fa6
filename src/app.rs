//! X-Ray server API

use crate::analytics;
use crate::app_state::SharedAppState;
use crate::cli::CommandLineArgs;
use crate::error::XRayError;
use crate::metrics;
use crate::models::{
    ApiResponse, BatchCreateCandidatesRequest, Candidate, CandidateQuery, CompleteRunRequest,
    CompleteStepRequest, CreateCandidateRequest, CreateRunRequest, CreateStepRequest,
    FilteringStats, FilteringStatsQuery, IdResponse, Run, RunQuery, RunResponse, Step,
    StepTypeQuery,
};
use crate::validated_json::{OptionalValidatedJson, ValidatedJson, ValidatedQuery};

use axum::{
    extract::{rejection::PathRejection, Path, State},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// `axum::Router` wrapped to remove trailing slashes from request paths
pub type Service = NormalizePath<Router>;

/// Wire form of an [ApiResponse]
#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    data: Option<T>,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    /// Convert from an `ApiResponse` into an `axum::response::Response`.
    fn into_response(self) -> Response {
        let envelope = Envelope {
            success: true,
            message: self.message,
            data: self.data,
        };
        (self.status, Json(envelope)).into_response()
    }
}

/// Initialise the application
///
/// Builds the global Rayon thread pool if Rayon is enabled.
pub fn init(args: &CommandLineArgs) {
    if args.use_rayon {
        let num_threads = args.thread_limit.unwrap_or_else(num_cpus::get);
        tracing::info!("using {} Rayon threads", num_threads);
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .expect("Failed to initialise Rayon thread pool");
    }
}

/// Returns a [crate::app::Service] for the X-Ray server API
///
/// The service is populated with all routes as well as the following middleware:
///
/// * a [tower_http::trace::TraceLayer] for tracing requests and responses and recording metrics
/// * a [tower_http::normalize_path::NormalizePathLayer] for trimming trailing slashes from
///   requests
///
/// # Arguments
///
/// * `state`: Shared application state
pub fn service(state: SharedAppState) -> Service {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

/// Returns an [axum::Router] for the X-Ray server API
///
/// # Arguments
///
/// * `state`: Shared application state
pub fn router(state: SharedAppState) -> Router {
    fn v1() -> Router<SharedAppState> {
        Router::new()
            .route("/runs", post(create_run).get(list_runs))
            .route("/runs/:run_id", get(get_run))
            .route("/runs/:run_id/complete", put(complete_run))
            .route("/runs/:run_id/fail", put(fail_run))
            .route("/runs/:run_id/steps", post(create_step).get(steps_by_run))
            .route("/steps", get(steps_by_type))
            .route("/steps/:step_id", get(get_step))
            .route("/steps/:step_id/complete", put(complete_step))
            .route(
                "/steps/:step_id/candidates",
                post(create_candidate).get(candidates),
            )
            .route("/steps/:step_id/candidates/batch", post(create_candidates))
            .route(
                "/steps/:step_id/candidates/selected",
                get(selected_candidates),
            )
            .route(
                "/steps/:step_id/candidates/rejected",
                get(rejected_candidates),
            )
            .route("/analytics/filtering_stats", get(filtering_stats_v1))
    }

    Router::new()
        .route("/filtering-stats", get(filtering_stats))
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/api/v1", v1())
        .layer(
            TraceLayer::new_for_http()
                .on_request(metrics::request_counter)
                .on_response(metrics::record_response_metrics),
        )
        .with_state(state)
}

async fn create_run(
    State(state): State<SharedAppState>,
    ValidatedJson(request): ValidatedJson<CreateRunRequest>,
) -> Result<ApiResponse<IdResponse>, XRayError> {
    let run_id = state.store.create_run(request)?;
    Ok(ApiResponse::created(
        "Run created successfully",
        IdResponse::of(run_id),
    ))
}

async fn get_run(
    State(state): State<SharedAppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<RunResponse>, XRayError> {
    let Path(run_id) = path?;
    Ok(ApiResponse::ok(state.store.run_details(run_id)?))
}

async fn list_runs(
    State(state): State<SharedAppState>,
    ValidatedQuery(query): ValidatedQuery<RunQuery>,
) -> Result<ApiResponse<Vec<Run>>, XRayError> {
    Ok(ApiResponse::ok(state.store.list_runs(&query)?))
}

async fn complete_run(
    State(state): State<SharedAppState>,
    path: Result<Path<Uuid>, PathRejection>,
    OptionalValidatedJson(request): OptionalValidatedJson<CompleteRunRequest>,
) -> Result<ApiResponse<()>, XRayError> {
    let Path(run_id) = path?;
    let output = request.map(|request| request.output);
    state.store.complete_run(run_id, output)?;
    Ok(ApiResponse::message("Run completed successfully"))
}

async fn fail_run(
    State(state): State<SharedAppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<()>, XRayError> {
    let Path(run_id) = path?;
    state.store.fail_run(run_id)?;
    Ok(ApiResponse::message("Run marked as failed"))
}

async fn create_step(
    State(state): State<SharedAppState>,
    path: Result<Path<Uuid>, PathRejection>,
    ValidatedJson(request): ValidatedJson<CreateStepRequest>,
) -> Result<ApiResponse<IdResponse>, XRayError> {
    let Path(run_id) = path?;
    let step_id = state.store.create_step(run_id, request)?;
    Ok(ApiResponse::created(
        "Step created successfully",
        IdResponse::of(step_id),
    ))
}

async fn steps_by_run(
    State(state): State<SharedAppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<Vec<Step>>, XRayError> {
    let Path(run_id) = path?;
    Ok(ApiResponse::ok(state.store.steps_by_run(run_id)?))
}

async fn get_step(
    State(state): State<SharedAppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<Step>, XRayError> {
    let Path(step_id) = path?;
    Ok(ApiResponse::ok(state.store.get_step(step_id)?))
}

async fn steps_by_type(
    State(state): State<SharedAppState>,
    ValidatedQuery(query): ValidatedQuery<StepTypeQuery>,
) -> Result<ApiResponse<Vec<Step>>, XRayError> {
    let steps = match query.step_type {
        Some(step_type) => state.store.steps_by_type(&step_type)?,
        None => vec![],
    };
    Ok(ApiResponse::ok(steps))
}

async fn complete_step(
    State(state): State<SharedAppState>,
    path: Result<Path<Uuid>, PathRejection>,
    OptionalValidatedJson(request): OptionalValidatedJson<CompleteStepRequest>,
) -> Result<ApiResponse<()>, XRayError> {
    let Path(step_id) = path?;
    state
        .store
        .complete_step(step_id, request.unwrap_or_default())?;
    Ok(ApiResponse::message("Step completed successfully"))
}

async fn create_candidate(
    State(state): State<SharedAppState>,
    path: Result<Path<Uuid>, PathRejection>,
    ValidatedJson(request): ValidatedJson<CreateCandidateRequest>,
) -> Result<ApiResponse<IdResponse>, XRayError> {
    let Path(step_id) = path?;
    let candidate_id = state.store.create_candidate(step_id, request)?;
    Ok(ApiResponse::created(
        "Candidate created successfully",
        IdResponse::of(candidate_id),
    ))
}

async fn create_candidates(
    State(state): State<SharedAppState>,
    path: Result<Path<Uuid>, PathRejection>,
    ValidatedJson(request): ValidatedJson<BatchCreateCandidatesRequest>,
) -> Result<ApiResponse<IdResponse>, XRayError> {
    let Path(step_id) = path?;
    let ids = state.store.create_candidates(step_id, request.candidates)?;
    Ok(ApiResponse::created(
        "Candidates created successfully",
        IdResponse::of_all(ids),
    ))
}

async fn candidates(
    State(state): State<SharedAppState>,
    path: Result<Path<Uuid>, PathRejection>,
    ValidatedQuery(query): ValidatedQuery<CandidateQuery>,
) -> Result<ApiResponse<Vec<Candidate>>, XRayError> {
    let Path(step_id) = path?;
    Ok(ApiResponse::ok(
        state.store.candidates_by_step(step_id, query.selected)?,
    ))
}

async fn selected_candidates(
    State(state): State<SharedAppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<Vec<Candidate>>, XRayError> {
    let Path(step_id) = path?;
    Ok(ApiResponse::ok(
        state.store.candidates_by_step(step_id, Some(true))?,
    ))
}

async fn rejected_candidates(
    State(state): State<SharedAppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<Vec<Candidate>>, XRayError> {
    let Path(step_id) = path?;
    Ok(ApiResponse::ok(
        state.store.candidates_by_step(step_id, Some(false))?,
    ))
}

/// Filtering statistics as a bare JSON object
async fn filtering_stats(
    State(state): State<SharedAppState>,
    ValidatedQuery(query): ValidatedQuery<FilteringStatsQuery>,
) -> Result<Json<FilteringStats>, XRayError> {
    Ok(Json(compute_filtering_stats(state, query).await?))
}

/// Filtering statistics in the API envelope
async fn filtering_stats_v1(
    State(state): State<SharedAppState>,
    ValidatedQuery(query): ValidatedQuery<FilteringStatsQuery>,
) -> Result<ApiResponse<FilteringStats>, XRayError> {
    let stats = compute_filtering_stats(state, query).await?;
    Ok(ApiResponse::ok(stats))
}

/// Compute filtering statistics over the store
///
/// If Rayon is enabled the computation runs on the Rayon thread pool, otherwise inline.
///
/// # Arguments
///
/// * `state`: Shared application state
/// * `query`: Filters selecting the steps to aggregate
async fn compute_filtering_stats(
    state: SharedAppState,
    query: FilteringStatsQuery,
) -> Result<FilteringStats, XRayError> {
    let stats = if state.args.use_rayon {
        tokio_rayon::spawn(move || {
            analytics::filtering_stats_par(&state.store, &state.store, &query)
        })
        .await?
    } else {
        analytics::filtering_stats(&state.store, &state.store, &query)?
    };
    metrics::record_filtering_stats(&stats);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::app_state::AppState;
    use crate::store::Store;

    use axum::{
        body::Body,
        http::{self, Method, Request, StatusCode},
    };
    use clap::Parser;
    use regex::Regex;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot` and `ready`

    fn test_router(use_rayon: bool) -> Router {
        let mut args = CommandLineArgs::parse_from(["xray", "--temporary-storage"]);
        args.use_rayon = use_rayon;
        let state = AppState::with_store(&args, Store::temporary().unwrap());
        router(Arc::new(state))
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        hyper::body::to_bytes(response.into_body())
            .await
            .unwrap()
            .to_vec()
    }

    // Send a request and return the status and JSON body.
    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = body_bytes(response).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn create_run(app: &Router, pipeline_type: &str) -> String {
        let body = json!({"pipelineType": pipeline_type, "pipelineId": "p-1", "input": {}});
        let (status, body) = send(app, Method::POST, "/api/v1/runs", Some(body)).await;
        assert_eq!(StatusCode::CREATED, status);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_step(app: &Router, run_id: &str, step_type: &str, order: i32) -> String {
        let body = json!({"stepName": "step", "stepType": step_type, "order": order});
        let uri = format!("/api/v1/runs/{run_id}/steps");
        let (status, body) = send(app, Method::POST, &uri, Some(body)).await;
        assert_eq!(StatusCode::CREATED, status);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn add_candidates(app: &Router, step_id: &str, selected: usize, rejected: usize) {
        let mut candidates = vec![json!({"data": {}, "selected": true}); selected];
        candidates.extend(vec![
            json!({"data": {}, "selected": false, "rejectionReason": "no"});
            rejected
        ]);
        let uri = format!("/api/v1/steps/{step_id}/candidates/batch");
        let body = json!({ "candidates": candidates });
        let (status, body) = send(app, Method::POST, &uri, Some(body)).await;
        assert_eq!(StatusCode::CREATED, status);
        let count = body["data"]["count"].as_u64().unwrap();
        assert_eq!((selected + rejected) as u64, count);
    }

    #[tokio::test]
    async fn run_lifecycle() {
        let app = test_router(false);
        let run_id = create_run(&app, "search").await;

        let uri = format!("/api/v1/runs/{run_id}");
        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!(true), body["success"]);
        assert_eq!(json!("IN_PROGRESS"), body["data"]["status"]);
        assert_eq!(json!([]), body["data"]["steps"]);

        let uri = format!("/api/v1/runs/{run_id}/complete");
        let (status, body) = send(&app, Method::PUT, &uri, Some(json!({"chosen": 1}))).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!("Run completed successfully"), body["message"]);

        let uri = format!("/api/v1/runs/{run_id}");
        let (_, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(json!("COMPLETED"), body["data"]["status"]);
        assert_eq!(json!({"chosen": 1}), body["data"]["output"]);
    }

    #[tokio::test]
    async fn complete_run_without_body() {
        let app = test_router(false);
        let run_id = create_run(&app, "search").await;
        let uri = format!("/api/v1/runs/{run_id}/complete");
        let (status, _) = send(&app, Method::PUT, &uri, None).await;
        assert_eq!(StatusCode::OK, status);
    }

    #[tokio::test]
    async fn fail_run() {
        let app = test_router(false);
        let run_id = create_run(&app, "search").await;
        let uri = format!("/api/v1/runs/{run_id}/fail");
        let (status, _) = send(&app, Method::PUT, &uri, None).await;
        assert_eq!(StatusCode::OK, status);
        let (_, body) = send(&app, Method::GET, "/api/v1/runs?status=FAILED", None).await;
        assert_eq!(1, body["data"].as_array().unwrap().len());
        let (_, body) = send(&app, Method::GET, "/api/v1/runs?status=COMPLETED", None).await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_run_invalid() {
        let app = test_router(false);
        let body = json!({"pipelineType": " ", "pipelineId": "p-1", "input": {}});
        let (status, body) = send(&app, Method::POST, "/api/v1/runs", Some(body)).await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!(json!(false), body["success"]);
        assert_eq!(json!("request data is not valid"), body["error"]["message"]);
        let re = Regex::new(r"pipelineType is required").unwrap();
        assert!(re.is_match(&body.to_string()), "body: {body}");
    }

    #[tokio::test]
    async fn run_not_found() {
        let app = test_router(false);
        let uri = format!("/api/v1/runs/{}", Uuid::new_v4());
        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        assert_eq!(json!(false), body["success"]);
        let re = Regex::new(r"run not found with id").unwrap();
        assert!(re.is_match(body["error"]["message"].as_str().unwrap()));
    }

    #[tokio::test]
    async fn malformed_id() {
        let app = test_router(false);
        let (status, body) = send(&app, Method::GET, "/api/v1/steps/not-a-uuid", None).await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!(json!("request path is not valid"), body["error"]["message"]);
    }

    #[tokio::test]
    async fn list_runs_inverted_dates() {
        let app = test_router(false);
        let uri = "/api/v1/runs?startDate=2024-01-02T00:00:00&endDate=2024-01-01T00:00:00";
        let (status, body) = send(&app, Method::GET, uri, None).await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        let re = Regex::new(r"startDate must not be after endDate").unwrap();
        assert!(re.is_match(&body.to_string()), "body: {body}");
    }

    #[tokio::test]
    async fn trailing_slash() {
        let args = CommandLineArgs::parse_from(["xray"]);
        let state = AppState::with_store(&args, Store::temporary().unwrap());
        let service = service(Arc::new(state));
        let request = Request::builder()
            .uri("/api/v1/runs/")
            .body(Body::empty())
            .unwrap();
        let response = service.oneshot(request).await.unwrap();
        assert_eq!(StatusCode::OK, response.status());
    }

    #[tokio::test]
    async fn steps_and_candidates() {
        let app = test_router(false);
        let run_id = create_run(&app, "search").await;
        let body = json!({
            "stepName": "price filter",
            "stepType": "filter",
            "order": 2,
            "candidates": [
                {"data": {"sku": "a"}, "selected": true},
                {"data": {"sku": "b"}, "selected": false, "rejectionReason": "price"}
            ]
        });
        let uri = format!("/api/v1/runs/{run_id}/steps");
        let (status, body) = send(&app, Method::POST, &uri, Some(body)).await;
        assert_eq!(StatusCode::CREATED, status);
        let step_id = body["data"]["id"].as_str().unwrap().to_string();
        create_step(&app, &run_id, "rank", 1).await;

        let (_, body) = send(&app, Method::GET, &uri, None).await;
        let orders: Vec<i64> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|step| step["order"].as_i64().unwrap())
            .collect();
        assert_eq!(vec![1, 2], orders);

        let uri = format!("/api/v1/runs/{run_id}");
        let (_, body) = send(&app, Method::GET, &uri, None).await;
        let candidates = body["data"]["steps"][1]["candidates"].as_array().unwrap();
        assert_eq!(2, candidates.len());

        let uri = format!("/api/v1/steps/{step_id}/candidates");
        let candidate = json!({"data": {"sku": "c"}});
        let (status, _) = send(&app, Method::POST, &uri, Some(candidate)).await;
        assert_eq!(StatusCode::CREATED, status);

        let (_, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(3, body["data"].as_array().unwrap().len());
        let uri = format!("/api/v1/steps/{step_id}/candidates?selected=false");
        let (_, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(2, body["data"].as_array().unwrap().len());
        let uri = format!("/api/v1/steps/{step_id}/candidates/selected");
        let (_, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(json!("a"), body["data"][0]["data"]["sku"]);
        let uri = format!("/api/v1/steps/{step_id}/candidates/rejected");
        let (_, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(2, body["data"].as_array().unwrap().len());

        let (_, body) = send(&app, Method::GET, "/api/v1/steps?stepType=filter", None).await;
        assert_eq!(1, body["data"].as_array().unwrap().len());
        let (_, body) = send(&app, Method::GET, "/api/v1/steps", None).await;
        assert_eq!(json!([]), body["data"]);
    }

    #[tokio::test]
    async fn complete_step() {
        let app = test_router(false);
        let run_id = create_run(&app, "search").await;
        let step_id = create_step(&app, &run_id, "filter", 1).await;
        let uri = format!("/api/v1/steps/{step_id}/complete");
        let body = json!({"output": {"kept": 2}, "reasoning": "cheap enough"});
        let (status, _) = send(&app, Method::PUT, &uri, Some(body)).await;
        assert_eq!(StatusCode::OK, status);

        let uri = format!("/api/v1/steps/{step_id}");
        let (_, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(json!("cheap enough"), body["data"]["reasoning"]);
        assert_eq!(json!({"kept": 2}), body["data"]["output"]);
        assert!(body["data"]["completedAt"].is_string());
    }

    #[tokio::test]
    async fn create_step_unknown_run() {
        let app = test_router(false);
        let uri = format!("/api/v1/runs/{}/steps", Uuid::new_v4());
        let body = json!({"stepName": "step", "stepType": "filter", "order": 1});
        let (status, _) = send(&app, Method::POST, &uri, Some(body)).await;
        assert_eq!(StatusCode::NOT_FOUND, status);
    }

    #[tokio::test]
    async fn empty_batch() {
        let app = test_router(false);
        let run_id = create_run(&app, "search").await;
        let step_id = create_step(&app, &run_id, "filter", 1).await;
        let uri = format!("/api/v1/steps/{step_id}/candidates/batch");
        let (status, body) = send(&app, Method::POST, &uri, Some(json!({"candidates": []}))).await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        let re = Regex::new(r"candidates list cannot be empty").unwrap();
        assert!(re.is_match(&body.to_string()), "body: {body}");
    }

    async fn check_filtering_stats(use_rayon: bool) {
        let app = test_router(use_rayon);
        let search = create_run(&app, "search").await;
        let ranking = create_run(&app, "ranking").await;
        let a = create_step(&app, &search, "filter", 1).await;
        let b = create_step(&app, &search, "filter", 2).await;
        create_step(&app, &search, "rank", 3).await;
        let other = create_step(&app, &ranking, "filter", 1).await;
        add_candidates(&app, &a, 90, 10).await;
        add_candidates(&app, &b, 100, 100).await;
        add_candidates(&app, &other, 0, 3).await;

        let uri = "/filtering-stats?pipelineType=search";
        let (status, body) = send(&app, Method::GET, uri, None).await;
        assert_eq!(StatusCode::OK, status);
        let stats: FilteringStats = serde_json::from_value(body).unwrap();
        assert_eq!(2, stats.total_filtering_steps);
        assert_eq!(300, stats.total_input_candidates);
        assert_eq!(190, stats.total_output_candidates);
        assert!((stats.average_rejection_rate - 0.3).abs() < 1e-9);
        assert!((stats.min_rejection_rate - 0.1).abs() < 1e-9);
        assert!((stats.max_rejection_rate - 0.5).abs() < 1e-9);

        let uri = "/api/v1/analytics/filtering_stats?pipelineType=search";
        let (status, body) = send(&app, Method::GET, uri, None).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!(true), body["success"]);
        let enveloped: FilteringStats = serde_json::from_value(body["data"].clone()).unwrap();
        assert_eq!(stats, enveloped);
    }

    #[tokio::test]
    async fn filtering_stats() {
        check_filtering_stats(false).await;
    }

    #[tokio::test]
    async fn filtering_stats_rayon() {
        check_filtering_stats(true).await;
    }

    #[tokio::test]
    async fn filtering_stats_empty() {
        let app = test_router(false);
        let (status, body) = send(&app, Method::GET, "/filtering-stats", None).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(
            json!({
                "totalFilteringSteps": 0,
                "totalInputCandidates": 0,
                "totalOutputCandidates": 0,
                "averageRejectionRate": 0.0,
                "minRejectionRate": 0.0,
                "maxRejectionRate": 0.0
            }),
            body
        );
    }

    #[tokio::test]
    async fn filtering_stats_inverted_dates() {
        let app = test_router(false);
        let uri = "/filtering-stats?startDate=2024-01-02T00:00:00&endDate=2024-01-01T00:00:00";
        let (status, body) = send(&app, Method::GET, uri, None).await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!(json!(false), body["success"]);
    }

    #[tokio::test]
    async fn filtering_stats_malformed_date() {
        let app = test_router(false);
        let uri = "/filtering-stats?startDate=yesterday";
        let (status, body) = send(&app, Method::GET, uri, None).await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        let message = json!("request query is not valid");
        assert_eq!(message, body["error"]["message"]);
    }

    #[tokio::test]
    async fn metrics() {
        let app = test_router(false);
        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(StatusCode::OK, response.status());
    }
}
