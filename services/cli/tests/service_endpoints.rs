use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::util::ServiceExt;
use trial_screening::config::ServiceConfig;
use trial_screening::screening::{
    template_csv, BulkFile, BulkIntakeController, Eligibility, HttpGateway, SessionContext,
    SingleApplicationController, SinglePhase, SubmissionGateway, SubmitAttempt, TrialType,
    UploadAttempt,
};
use trial_screening_cli::{evaluation_router, ScreeningServiceState};

async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn hypertension_payload() -> Value {
    json!({
        "trial_type": "hypertension",
        "patient_data": {
            "age": 45, "gender": "Male", "bmi": 26.5, "glucose": 95,
            "lifestyle_risk": 1, "stress_level": 7, "systolic_bp": 140,
            "diastolic_bp": 85, "cholesterol_total": 220, "comorbidities": 1,
            "consent": "Yes"
        }
    })
}

fn multipart_upload(trial_type: Option<&str>, csv: &str) -> Request<Body> {
    let boundary = "trial-screening-test-boundary";
    let mut body = String::new();
    if let Some(trial_type) = trial_type {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"trial_type\"\r\n\r\n{trial_type}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cohort.csv\"\r\nContent-Type: text/csv\r\n\r\n{csv}\r\n--{boundary}--\r\n"
    ));

    Request::builder()
        .method("POST")
        .uri("/api/organization/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request builds")
}

#[tokio::test]
async fn schema_endpoint_returns_the_ordered_field_list() {
    let app = evaluation_router(Arc::new(ScreeningServiceState::default()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/trial-fields/arthritis")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let fields = body.as_array().expect("array of fields");
    assert_eq!(fields.len(), 9);
    assert_eq!(fields[0]["name"], "age");
    assert_eq!(fields[7]["options"][1]["label"], "Yes");
}

#[tokio::test]
async fn unknown_trial_type_is_a_client_error() {
    let app = evaluation_router(Arc::new(ScreeningServiceState::default()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/trial-fields/oncology")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "Invalid trial type");
}

#[tokio::test]
async fn apply_endpoint_evaluates_a_valid_record() {
    let app = evaluation_router(Arc::new(ScreeningServiceState::default()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/patient/apply")
                .header(header::CONTENT_TYPE, "application/json")
                .header("X-Username", "jordan")
                .body(Body::from(hypertension_payload().to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["patient_id"], 1);
    assert_eq!(body["trial_type"], "hypertension");
    assert_eq!(body["eligibility"], "Eligible");
    assert_eq!(
        body["message"],
        "Application submitted successfully. You are eligible."
    );
}

#[tokio::test]
async fn apply_endpoint_revalidates_server_side() {
    let app = evaluation_router(Arc::new(ScreeningServiceState::default()));

    let mut payload = hypertension_payload();
    payload["patient_data"]["systolic_bp"] = json!(400);
    payload["patient_data"].as_object_mut().expect("object").remove("consent");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/patient/apply")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "Validation failed");
    let details = body["details"].as_array().expect("per-field details");
    assert!(details
        .iter()
        .any(|detail| detail.as_str().unwrap_or_default().contains("Consent")));
    assert!(details
        .iter()
        .any(|detail| detail.as_str().unwrap_or_default().contains("<= 240")));
}

#[tokio::test]
async fn upload_endpoint_reports_per_row_outcomes() {
    let app = evaluation_router(Arc::new(ScreeningServiceState::default()));

    let csv = "age,years_since_diagnosis,tender_joint_count,swollen_joint_count,crp_level,patient_pain_score,egfr,on_biologic_dmards,has_hepatitis\n\
               55,5.2,8,6,15.3,7,75.5,1,0\n\
               62,3.0,1,1,4.0,2,80.0,0,0\n\
               sixty,1.0,2,2,5.0,3,70.0,0,0\n";
    let response = app
        .oneshot(multipart_upload(Some("arthritis"), csv))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["total_processed"], 3);
    assert_eq!(body["eligible"], 1);
    assert_eq!(body["ineligible"], 1);
    assert_eq!(body["errors"], 1);

    let rows = body["results"].as_array().expect("per-row results");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2]["eligibility"], "Error");
    assert!(rows[2]["error"]
        .as_str()
        .expect("error message")
        .contains("could not convert string to float"));
}

#[tokio::test]
async fn upload_endpoint_requires_a_trial_type() {
    let app = evaluation_router(Arc::new(ScreeningServiceState::default()));

    let response = app
        .oneshot(multipart_upload(None, "age\n45\n"))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "Trial type not specified");
}

#[tokio::test]
async fn analytics_reflect_what_was_screened() {
    let state = Arc::new(ScreeningServiceState::default());

    let response = evaluation_router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/patient/apply")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(hypertension_payload().to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let response = evaluation_router(state)
        .oneshot(
            Request::builder()
                .uri("/api/analytics")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let summary = body["summary"].as_array().expect("summary rows");
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0]["trial_type"], "hypertension");
    assert_eq!(summary[0]["total_applications"], 1);
    assert_eq!(summary[0]["eligible"], 1);
    assert!(body["last_updated"].is_string());
}

#[tokio::test]
async fn http_gateway_round_trips_against_a_live_service() {
    let state = Arc::new(ScreeningServiceState::default());
    let app = evaluation_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind an ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    let config = ServiceConfig {
        base_url: format!("http://{addr}"),
        request_timeout: Duration::from_secs(5),
        upload_timeout: Duration::from_secs(120),
    };
    let gateway = HttpGateway::new(&config).expect("client builds");

    // Single applicant flow over real HTTP.
    let mut single = SingleApplicationController::new(SessionContext::anonymous());
    let phase = single
        .select_and_load(&gateway, TrialType::Hypertension)
        .await
        .expect("selection is valid");
    assert_eq!(phase, SinglePhase::Ready);

    for (name, value) in [
        ("age", "45"),
        ("gender", "Male"),
        ("bmi", "26.5"),
        ("glucose", "95"),
        ("lifestyle_risk", "1"),
        ("stress_level", "7"),
        ("systolic_bp", "140"),
        ("diastolic_bp", "85"),
        ("cholesterol_total", "220"),
        ("comorbidities", "1"),
        ("consent", "Yes"),
    ] {
        single.edit_field(name, value).expect("schema field");
    }

    match single.submit(&gateway).await.expect("submit is valid") {
        SubmitAttempt::Accepted(outcome) => {
            assert_eq!(outcome.eligibility, Eligibility::Eligible);
            assert_eq!(outcome.trial_type, TrialType::Hypertension);
        }
        other => panic!("expected acceptance, got {other:?}"),
    }

    // Bulk flow over real HTTP, multipart included.
    let mut bulk = BulkIntakeController::new();
    bulk.choose_trial(TrialType::Hypertension)
        .expect("trial choosable");
    bulk.accept_file(BulkFile::new(
        "cohort.csv",
        Some("text/csv".to_string()),
        template_csv(TrialType::Hypertension).into_bytes(),
    ))
    .expect("file passes the gate");

    match bulk.upload(&gateway).await.expect("upload is valid") {
        UploadAttempt::Completed(results) => {
            assert_eq!(results.total_processed, 1);
            assert_eq!(results.eligible, 1);
        }
        other => panic!("expected completion, got {other:?}"),
    }

    // Both flows show up in the aggregate counts.
    let analytics = gateway.fetch_analytics().await.expect("analytics fetch");
    assert_eq!(analytics.summary.len(), 1);
    assert_eq!(analytics.summary[0].total_applications, 2);
}
