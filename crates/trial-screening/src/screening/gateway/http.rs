use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;

use super::super::catalog::TrialType;
use super::super::coerce::SubmittedRecord;
use super::super::schema::FieldSpec;
use super::super::session::SessionContext;
use super::{
    AnalyticsSummary, BulkFile, BulkResultSet, EligibilityOutcome, GatewayError, SubmissionGateway,
};

/// Header carrying the session user on single submissions.
const USERNAME_HEADER: &str = "X-Username";

/// Gateway implementation talking to the evaluation service over HTTP.
///
/// Two clients: the default one with a short timeout for schema fetches and
/// single submissions, and an upload client with an extended timeout because
/// the service evaluates every cohort row synchronously.
pub struct HttpGateway {
    base_url: String,
    client: Client,
    upload_client: Client,
}

impl HttpGateway {
    pub fn new(config: &ServiceConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| GatewayError::Transport(format!("HTTP client build failed: {err}")))?;
        let upload_client = Client::builder()
            .timeout(config.upload_timeout)
            .build()
            .map_err(|err| GatewayError::Transport(format!("HTTP client build failed: {err}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            upload_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[derive(Serialize)]
struct ApplyRequest<'a> {
    trial_type: TrialType,
    patient_data: &'a SubmittedRecord,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

async fn service_error(response: Response) -> GatewayError {
    let status = response.status().as_u16();
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => "request failed".to_string(),
    };
    GatewayError::Service { status, message }
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    response
        .json::<T>()
        .await
        .map_err(|err| GatewayError::Decode(err.to_string()))
}

fn transport(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport(err.to_string())
}

#[async_trait::async_trait]
impl SubmissionGateway for HttpGateway {
    async fn fetch_schema(&self, trial: TrialType) -> Result<Vec<FieldSpec>, GatewayError> {
        let response = self
            .client
            .get(self.url(&format!("/api/trial-fields/{}", trial.tag())))
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(service_error(response).await);
        }
        decode(response).await
    }

    async fn submit_application(
        &self,
        trial: TrialType,
        record: &SubmittedRecord,
        session: &SessionContext,
    ) -> Result<EligibilityOutcome, GatewayError> {
        let mut request = self.client.post(self.url("/api/patient/apply")).json(&ApplyRequest {
            trial_type: trial,
            patient_data: record,
        });
        if let Some(username) = session.username.as_deref() {
            request = request.header(USERNAME_HEADER, username);
        }

        let response = request.send().await.map_err(transport)?;
        if !response.status().is_success() {
            return Err(service_error(response).await);
        }
        decode(response).await
    }

    async fn submit_cohort(
        &self,
        trial: TrialType,
        file: &BulkFile,
    ) -> Result<BulkResultSet, GatewayError> {
        let mut part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        if let Some(content_type) = file.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|err| GatewayError::Transport(format!("invalid MIME type: {err}")))?;
        }
        let form = Form::new().part("file", part).text("trial_type", trial.tag());

        let response = self
            .upload_client
            .post(self.url("/api/organization/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(service_error(response).await);
        }
        decode(response).await
    }

    async fn fetch_analytics(&self) -> Result<AnalyticsSummary, GatewayError> {
        let response = self
            .client
            .get(self.url("/api/analytics"))
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(service_error(response).await);
        }
        decode(response).await
    }
}
