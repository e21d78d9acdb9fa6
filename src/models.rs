//! Data types and associated functions and methods

use axum::http::StatusCode;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::Display;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Step type considered by the filtering statistics
pub const FILTER_STEP_TYPE: &str = "filter";

/// Free-form JSON object attached to runs, steps and candidates
pub type JsonObject = Map<String, Value>;

/// Lifecycle status of a run
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Run started and not yet finished
    InProgress,
    /// Run finished successfully
    Completed,
    /// Run finished with a failure
    Failed,
}

/// Outcome of a step
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    /// Step succeeded
    Success,
    /// Step failed
    Failed,
}

/// One execution of a pipeline
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub run_id: Uuid,
    pub pipeline_type: String,
    pub pipeline_id: String,
    pub started_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub status: RunStatus,
    pub input: JsonObject,
    pub output: Option<Value>,
}

/// One stage of a run
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub step_id: Uuid,
    pub run_id: Uuid,
    pub step_name: String,
    pub step_type: String,
    /// Position of the step within its run
    pub order: i32,
    pub started_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub status: StepStatus,
    pub input: Option<JsonObject>,
    pub output: Option<Value>,
    pub reasoning: Option<String>,
    pub metadata: Option<JsonObject>,
}

impl Step {
    /// Returns whether this is a filtering step.
    pub fn is_filter(&self) -> bool {
        self.step_type == FILTER_STEP_TYPE
    }
}

/// An item considered during a step
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub candidate_id: Uuid,
    pub step_id: Uuid,
    pub data: JsonObject,
    pub score: Option<f64>,
    /// True if the candidate was retained, false if it was rejected
    pub selected: bool,
    pub rejection_reason: Option<String>,
    pub metadata: Option<JsonObject>,
}

/// Request data for starting a run
#[derive(Debug, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateRunRequest {
    /// Kind of pipeline, used to filter analytics
    #[validate(custom(function = "validate_not_blank", message = "pipelineType is required"))]
    pub pipeline_type: String,
    /// Caller's identifier for the pipeline execution
    #[validate(custom(function = "validate_not_blank", message = "pipelineId is required"))]
    pub pipeline_id: String,
    /// Input of the pipeline execution
    pub input: JsonObject,
}

/// Request data for recording a candidate
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Validate)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateCandidateRequest {
    pub data: JsonObject,
    pub score: Option<f64>,
    /// Defaults to false (rejected) when absent
    pub selected: Option<bool>,
    pub rejection_reason: Option<String>,
    pub metadata: Option<JsonObject>,
}

/// Request data for recording a step, optionally with its candidates
#[derive(Debug, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateStepRequest {
    #[validate(custom(function = "validate_not_blank", message = "stepName is required"))]
    pub step_name: String,
    #[validate(custom(function = "validate_not_blank", message = "stepType is required"))]
    pub step_type: String,
    pub order: i32,
    pub input: Option<JsonObject>,
    pub output: Option<JsonObject>,
    pub reasoning: Option<String>,
    pub metadata: Option<JsonObject>,
    #[validate]
    pub candidates: Option<Vec<CreateCandidateRequest>>,
}

/// Request data for recording several candidates at once
#[derive(Debug, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields)]
pub struct BatchCreateCandidatesRequest {
    #[validate]
    #[validate(length(min = 1, message = "candidates list cannot be empty"))]
    pub candidates: Vec<CreateCandidateRequest>,
}

/// Request data for completing a run. The whole body is the run output.
#[derive(Debug, Deserialize, PartialEq, Validate)]
#[serde(transparent)]
pub struct CompleteRunRequest {
    pub output: Value,
}

/// Request data for completing a step
#[derive(Debug, Default, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteStepRequest {
    pub output: Option<Value>,
    pub reasoning: Option<String>,
}

/// Query parameters for listing runs
#[derive(Debug, Default, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_run_query"))]
pub struct RunQuery {
    pub pipeline_type: Option<String>,
    pub status: Option<RunStatus>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
}

impl RunQuery {
    /// Returns whether a run satisfies every supplied filter.
    pub fn matches(&self, run: &Run) -> bool {
        self.pipeline_type
            .as_ref()
            .map_or(true, |pipeline_type| *pipeline_type == run.pipeline_type)
            && self.status.map_or(true, |status| status == run.status)
            && within(run.started_at, self.start_date, self.end_date)
    }
}

/// Query parameters for listing steps by type
#[derive(Debug, Default, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StepTypeQuery {
    pub step_type: Option<String>,
}

/// Query parameters for listing candidates of a step
#[derive(Debug, Default, Deserialize, PartialEq, Validate)]
pub struct CandidateQuery {
    pub selected: Option<bool>,
}

/// Filters for the filtering statistics.
///
/// Every filter is optional. An absent pipeline type matches any pipeline and an absent date is
/// an open bound. Present dates are inclusive bounds on the step start time.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_filtering_stats_query"))]
pub struct FilteringStatsQuery {
    pub pipeline_type: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
}

impl FilteringStatsQuery {
    /// Returns whether a step of a run with the given pipeline type satisfies the filters.
    ///
    /// The step type is not checked here.
    pub fn matches(&self, step: &Step, pipeline_type: &str) -> bool {
        self.pipeline_type
            .as_deref()
            .map_or(true, |wanted| wanted == pipeline_type)
            && within(step.started_at, self.start_date, self.end_date)
    }
}

/// Returns whether a timestamp lies within optional inclusive bounds.
fn within(at: NaiveDateTime, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> bool {
    start.map_or(true, |start| at >= start) && end.map_or(true, |end| at <= end)
}

/// Validate that a string contains something other than whitespace
fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Validate that optional date bounds are ordered
fn validate_date_range(
    start_date: &Option<NaiveDateTime>,
    end_date: &Option<NaiveDateTime>,
) -> Result<(), ValidationError> {
    if let (Some(start_date), Some(end_date)) = (start_date, end_date) {
        if start_date > end_date {
            let mut error = ValidationError::new("startDate must not be after endDate");
            error.add_param("startDate".into(), &start_date.to_string());
            error.add_param("endDate".into(), &end_date.to_string());
            return Err(error);
        }
    }
    Ok(())
}

/// Validate run query parameters
fn validate_run_query(query: &RunQuery) -> Result<(), ValidationError> {
    validate_date_range(&query.start_date, &query.end_date)
}

/// Validate filtering statistics query parameters
fn validate_filtering_stats_query(query: &FilteringStatsQuery) -> Result<(), ValidationError> {
    validate_date_range(&query.start_date, &query.end_date)
}

/// Aggregate rejection statistics over filtering steps.
///
/// Every field is always present. When no step contributed, the rates are 0.0.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteringStats {
    /// Number of matched filtering steps, including those without candidates
    pub total_filtering_steps: u64,
    /// Candidates across contributing steps
    pub total_input_candidates: u64,
    /// Selected candidates across contributing steps
    pub total_output_candidates: u64,
    pub average_rejection_rate: f64,
    pub min_rejection_rate: f64,
    pub max_rejection_rate: f64,
}

/// Identifiers of created records
#[derive(Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct IdResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl IdResponse {
    /// Return an IdResponse for a single record.
    pub fn of(id: Uuid) -> Self {
        IdResponse {
            id: Some(id),
            ..Default::default()
        }
    }

    /// Return an IdResponse for several records.
    pub fn of_all(ids: Vec<Uuid>) -> Self {
        let count = ids.len() as u64;
        IdResponse {
            ids: Some(ids),
            count: Some(count),
            ..Default::default()
        }
    }
}

/// A step with its candidates
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct StepResponse {
    #[serde(flatten)]
    pub step: Step,
    pub candidates: Vec<Candidate>,
}

/// A run with its steps, ordered by position
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct RunResponse {
    #[serde(flatten)]
    pub run: Run,
    pub steps: Vec<StepResponse>,
}

/// Envelope of every `/api/v1` response.
pub struct ApiResponse<T> {
    /// HTTP status of the response
    pub status: StatusCode,
    /// Optional human readable message
    pub message: Option<String>,
    /// Response payload
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Return a 200 OK response carrying data.
    pub fn ok(data: T) -> Self {
        ApiResponse {
            status: StatusCode::OK,
            message: None,
            data: Some(data),
        }
    }

    /// Return a 201 Created response carrying data.
    pub fn created(message: &str, data: T) -> Self {
        ApiResponse {
            status: StatusCode::CREATED,
            message: Some(message.to_string()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Return a 200 OK response with a message and no data.
    pub fn message(message: &str) -> Self {
        ApiResponse {
            status: StatusCode::OK,
            message: Some(message.to_string()),
            data: None,
        }
    }
}
