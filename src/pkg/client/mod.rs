//! HTTP client for the marketplace API, used by the CLI.

pub mod submitter;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use reqwest::{
    StatusCode,
    multipart::{Form, Part},
};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{
    conf::settings,
    pkg::internal::{
        adaptors::jobs::spec::{JobEntry, JobFilter},
        bids::JobBids,
        errors::AppError,
        workflow::{JobDraft, Payload, Staged, encode, job_draft::wire_name},
    },
};

pub const SERVER_ERROR: &str = "Server error. Please try again later.";
pub const NETWORK_ERROR: &str = "Network error. Please check your connection and try again.";

#[derive(Debug, Error)]
pub enum ClientError {
    /// A wizard step does not validate; nothing was sent.
    #[error("{message}")]
    StepBlocked { step: String, message: String },

    #[error("validation failed on {} field(s)", .0.len())]
    Invalid(BTreeMap<String, String>),

    #[error("{}", NETWORK_ERROR)]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Unauthorized { message: String },

    /// The server answered with an error body; its message is kept verbatim.
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        errors: BTreeMap<String, String>,
    },

    #[error("{}", SERVER_ERROR)]
    Malformed,

    /// A newer submission started before this one finished.
    #[error("submission superseded by a newer one")]
    Superseded,
}

impl From<AppError> for ClientError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(fields) => ClientError::Invalid(fields),
            other => {
                let normalized = other.normalize(false);
                ClientError::Rejected {
                    status: normalized.status.as_u16(),
                    message: normalized.body.message,
                    errors: normalized.body.errors.unwrap_or_default(),
                }
            }
        }
    }
}

pub type ClientResult<T> = core::result::Result<T, ClientError>;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: String,
    #[serde(default)]
    errors: BTreeMap<String, String>,
}

/// Maps an HTTP answer onto the client error taxonomy.
pub fn interpret<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> ClientResult<T> {
    if status.is_success() {
        return serde_json::from_slice(body).map_err(|e| {
            tracing::warn!("unreadable success body: {}", e);
            ClientError::Malformed
        });
    }
    let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body) else {
        tracing::warn!("unreadable error body for status {}", status);
        return Err(ClientError::Malformed);
    };
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthorized {
            message: envelope.message,
        });
    }
    Err(ClientError::Rejected {
        status: status.as_u16(),
        message: envelope.message,
        errors: envelope.errors,
    })
}

/// Blocks on the first failing wizard step, then on any field constraint.
pub fn precheck(draft: &JobDraft, today: NaiveDate) -> ClientResult<()> {
    if let Some((step, v)) = draft.first_invalid() {
        return Err(ClientError::StepBlocked {
            step: format!("{:?}", step),
            message: v.error.unwrap_or_default(),
        });
    }
    draft.validate_for_submission(today)?;
    Ok(())
}

pub fn to_form(payload: Payload) -> ClientResult<Form> {
    let mut form = Form::new();
    for (key, value) in payload.fields {
        form = form.text(key, value);
    }
    for file in payload.files {
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;
        form = form.part(file.key, part);
    }
    Ok(form)
}

#[derive(Debug, Deserialize)]
struct JobEnvelope {
    job: JobEntry,
}

#[derive(Debug, Deserialize)]
struct JobListEnvelope {
    jobs: Vec<JobEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadEnvelope {
    file_url: String,
}

#[derive(Debug, Deserialize)]
struct LoginEnvelope {
    token: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        ApiClient {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn from_settings() -> Self {
        Self::new(settings.api_base_url.clone(), Some(settings.api_token.clone()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ClientResult<T> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        interpret(status, &body)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> ClientResult<String> {
        let envelope: LoginEnvelope = self
            .send(
                self.http
                    .post(self.url("/api/login"))
                    .json(&serde_json::json!({ "email": email, "password": password })),
            )
            .await?;
        self.token = Some(envelope.token.clone());
        Ok(envelope.token)
    }

    pub async fn post_payload(&self, payload: Payload) -> ClientResult<JobEntry> {
        let form = to_form(payload)?;
        let envelope: JobEnvelope = self
            .send(self.http.post(self.url("/api/jobs")).multipart(form))
            .await?;
        Ok(envelope.job)
    }

    /// Validates, encodes and posts a draft. The draft itself is never touched.
    pub async fn submit_job(&self, draft: &JobDraft, today: NaiveDate) -> ClientResult<JobEntry> {
        precheck(draft, today)?;
        self.post_payload(encode(draft)?).await
    }

    pub async fn fetch_jobs(&self, filter: &JobFilter) -> ClientResult<Vec<JobEntry>> {
        let mut query: Vec<(&str, String)> = vec![
            ("page", filter.page().to_string()),
            ("limit", filter.limit().to_string()),
        ];
        if let Some(category) = &filter.sub_category {
            query.push(("subCategory", category.clone()));
        }
        if let Some(level) = &filter.experience_level {
            query.push(("experienceLevel", wire_name(level)));
        }
        if let Some(location) = &filter.location {
            query.push(("location", wire_name(location)));
        }
        if let Some(search) = &filter.search {
            query.push(("search", search.clone()));
        }
        let envelope: JobListEnvelope = self
            .send(self.http.get(self.url("/api/jobs/fetch")).query(&query))
            .await?;
        Ok(envelope.jobs)
    }

    pub async fn get_job(&self, job_id: &str) -> ClientResult<JobEntry> {
        let envelope: JobEnvelope = self
            .send(self.http.get(self.url(&format!("/api/jobs/{}", job_id))))
            .await?;
        Ok(envelope.job)
    }

    pub async fn job_bids(&self, job_id: &str) -> ClientResult<JobBids> {
        self.send(self.http.get(self.url(&format!("/api/bids/job/{}", job_id))))
            .await
    }

    pub async fn upload_document(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ClientResult<String> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let form = Form::new().part("document", part);
        let envelope: UploadEnvelope = self
            .send(self.http.post(self.url("/api/upload")).multipart(form))
            .await?;
        Ok(envelope.file_url)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::Value;

    use super::*;
    use crate::pkg::internal::workflow::JobField;

    #[test]
    fn test_rejection_message_is_verbatim() {
        let body = br#"{"success":false,"message":"Duplicate field value entered","errors":{"email":"Email is already in use"}}"#;
        match interpret::<Value>(StatusCode::BAD_REQUEST, body) {
            Err(ClientError::Rejected {
                status,
                message,
                errors,
            }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Duplicate field value entered");
                assert_eq!(errors["email"], "Email is already in use");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unauthorized() {
        let body = br#"{"success":false,"message":"Token expired"}"#;
        let err = interpret::<Value>(StatusCode::UNAUTHORIZED, body).unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized { ref message } if message == "Token expired"));
    }

    #[test]
    fn test_malformed_responses_degrade() {
        let err = interpret::<Value>(StatusCode::BAD_GATEWAY, b"<html>oops</html>").unwrap_err();
        assert_eq!(err.to_string(), SERVER_ERROR);
        let err = interpret::<JobEnvelope>(StatusCode::OK, b"{}").unwrap_err();
        assert!(matches!(err, ClientError::Malformed));
    }

    #[test]
    fn test_precheck_blocks_on_first_step() {
        let draft = JobDraft::new();
        match precheck(&draft, chrono::Utc::now().date_naive()) {
            Err(ClientError::StepBlocked { message, .. }) => {
                assert_eq!(message, "Job title is required")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_precheck_reports_past_deadline() {
        let today = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
        let mut draft = JobDraft::new();
        draft.set_field(JobField::Title("Landing page".into()));
        draft.set_field(JobField::Description("Build a landing page".into()));
        draft.add_skill("React");
        draft.set_field(JobField::Budget(300.0));
        draft.set_field(JobField::Deadline(Some(today - Duration::days(1))));
        match precheck(&draft, today) {
            Err(ClientError::Invalid(fields)) => assert!(fields.contains_key("deadline")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
