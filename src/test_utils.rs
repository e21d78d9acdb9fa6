use crate::models::*;

use chrono::NaiveDateTime;
use serde_json::json;
use uuid::Uuid;

/// Parse a timestamp of the form `2024-01-01T12:00:00`.
pub(crate) fn datetime(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").unwrap()
}

/// Convert a JSON literal into a JSON object.
pub(crate) fn object(value: serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(object) => object,
        _ => panic!("not a JSON object: {}", value),
    }
}

/// Create a CreateRunRequest object with all fields set.
pub(crate) fn get_test_create_run_request() -> CreateRunRequest {
    CreateRunRequest {
        pipeline_type: "search".to_string(),
        pipeline_id: "p-1".to_string(),
        input: object(json!({"query": "shoes"})),
    }
}

/// Create a CreateCandidateRequest object. Rejected candidates carry a rejection reason.
pub(crate) fn get_test_candidate_request(selected: bool) -> CreateCandidateRequest {
    CreateCandidateRequest {
        data: object(json!({"sku": "sku-1", "price": 42})),
        score: Some(0.5),
        selected: Some(selected),
        rejection_reason: (!selected).then(|| "price above budget".to_string()),
        metadata: None,
    }
}

/// Create a CreateStepRequest object for a filtering step with the given candidates.
pub(crate) fn get_test_create_step_request(
    candidates: Vec<CreateCandidateRequest>,
) -> CreateStepRequest {
    CreateStepRequest {
        step_name: "keyword filter".to_string(),
        step_type: FILTER_STEP_TYPE.to_string(),
        order: 1,
        input: Some(object(json!({"limit": 10}))),
        output: None,
        reasoning: Some("too expensive".to_string()),
        metadata: None,
        candidates: Some(candidates),
    }
}

/// Create a Run object in progress with a fresh ID.
pub(crate) fn get_test_run(pipeline_type: &str, started_at: &str) -> Run {
    Run {
        run_id: Uuid::new_v4(),
        pipeline_type: pipeline_type.to_string(),
        pipeline_id: "p-1".to_string(),
        started_at: datetime(started_at),
        completed_at: None,
        status: RunStatus::InProgress,
        input: object(json!({"query": "shoes"})),
        output: None,
    }
}

/// Create a Step object with fresh step and run IDs.
pub(crate) fn get_test_step(step_type: &str, started_at: &str) -> Step {
    Step {
        step_id: Uuid::new_v4(),
        run_id: Uuid::new_v4(),
        step_name: "test step".to_string(),
        step_type: step_type.to_string(),
        order: 1,
        started_at: datetime(started_at),
        completed_at: None,
        status: StepStatus::Success,
        input: None,
        output: None,
        reasoning: None,
        metadata: None,
    }
}
