use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use trial_screening::screening::{fields_for, TrialType};

use crate::infra::{AppState, ScreeningServiceState};

/// Router for the stub evaluation service, mirroring the upstream API the
/// intake pipeline talks to.
pub fn evaluation_router(state: Arc<ScreeningServiceState>) -> Router {
    Router::new()
        .route("/api", get(api_root))
        .route("/api/trials", get(list_trials))
        .route("/api/trial-fields/:trial_type", get(trial_fields))
        .route("/api/patient/apply", post(patient_apply))
        .route("/api/organization/upload", post(organization_upload))
        .route("/api/analytics", get(analytics))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
}

async fn api_root() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "clinical trial screening" }))
}

async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn list_trials() -> Json<Value> {
    let trials: Vec<Value> = TrialType::ALL
        .iter()
        .map(|trial| {
            let metadata = trial.metadata();
            json!({
                "id": trial.tag(),
                "name": metadata.name,
                "description": metadata.description,
            })
        })
        .collect();
    Json(json!(trials))
}

async fn trial_fields(Path(trial_type): Path<String>) -> Response {
    match TrialType::from_str(&trial_type) {
        Ok(trial) => (StatusCode::OK, Json(fields_for(trial))).into_response(),
        Err(_) => bad_request("Invalid trial type"),
    }
}

#[derive(Debug, Deserialize)]
struct ApplyRequest {
    trial_type: Option<String>,
    patient_data: Option<BTreeMap<String, Value>>,
}

async fn patient_apply(
    State(state): State<Arc<ScreeningServiceState>>,
    headers: HeaderMap,
    Json(payload): Json<ApplyRequest>,
) -> Response {
    let (trial_type, patient_data) = match (payload.trial_type, payload.patient_data) {
        (Some(trial_type), Some(patient_data)) => (trial_type, patient_data),
        _ => return bad_request("Missing trial_type or patient_data"),
    };

    let trial = match TrialType::from_str(&trial_type) {
        Ok(trial) => trial,
        Err(_) => return bad_request(&format!("Unsupported trial type: {trial_type}")),
    };

    if let Some(username) = headers.get("X-Username").and_then(|value| value.to_str().ok()) {
        tracing::info!(%username, trial = %trial, "patient application received");
    }

    let features: BTreeMap<String, String> = patient_data
        .into_iter()
        .map(|(name, value)| (name, json_value_to_string(value)))
        .collect();

    match state.evaluate_application(trial, &features) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(details) => {
            let payload = json!({ "error": "Validation failed", "details": details });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
    }
}

async fn organization_upload(
    State(state): State<Arc<ScreeningServiceState>>,
    mut multipart: Multipart,
) -> Response {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut trial_type: Option<String> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let part = field.name().map(str::to_string);
        match part.as_deref() {
            Some("file") => {
                let name = field.file_name().unwrap_or("upload.csv").to_string();
                match field.bytes().await {
                    Ok(bytes) => file = Some((name, bytes.to_vec())),
                    Err(_) => return bad_request("No file uploaded"),
                }
            }
            Some("trial_type") => {
                trial_type = field.text().await.ok();
            }
            _ => {}
        }
    }

    let trial = match trial_type.as_deref().map(TrialType::from_str) {
        Some(Ok(trial)) => trial,
        Some(Err(_)) => {
            let tag = trial_type.unwrap_or_default();
            return bad_request(&format!("Unsupported trial type: {tag}"));
        }
        None => return bad_request("Trial type not specified"),
    };
    let (file_name, bytes) = match file {
        Some(file) => file,
        None => return bad_request("No file uploaded"),
    };

    if !file_name.to_ascii_lowercase().ends_with(".csv") {
        return bad_request("Unsupported file format. Use CSV.");
    }

    match state.process_cohort(trial, &bytes) {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(message) => bad_request(&message),
    }
}

async fn analytics(State(state): State<Arc<ScreeningServiceState>>) -> Response {
    (StatusCode::OK, Json(state.analytics())).into_response()
}

fn bad_request(message: &str) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

fn json_value_to_string(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => (if flag { "1" } else { "0" }).to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
