use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

use crate::pkg::internal::workflow::job_draft::{
    Attachment, ExperienceLevel, JobDuration, Role, WorkLocation,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobEntry {
    pub job_id: String,
    pub client_id: String,
    pub title: String,
    pub description: String,
    pub sub_category: Option<String>,
    pub skills: Vec<String>,
    pub budget: f64,
    pub deadline: NaiveDate,
    pub duration: JobDuration,
    pub experience_level: ExperienceLevel,
    pub location: WorkLocation,
    pub attachments: Json<Vec<Attachment>>,
    pub is_public: bool,
    pub is_promoted: bool,
    pub invited_freelancers: Vec<String>,
    pub is_crowdsourced: bool,
    pub crowdsourcing_roles: Json<Vec<Role>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

pub(crate) const JOB_COLUMNS: &str = "job_id, client_id, title, description, sub_category, skills, budget, deadline, duration, experience_level, location, attachments, is_public, is_promoted, invited_freelancers, is_crowdsourced, crowdsourcing_roles, status, created_at";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFilter {
    pub sub_category: Option<String>,
    pub experience_level: Option<ExperienceLevel>,
    pub location: Option<WorkLocation>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl JobFilter {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }
}
