use sqlx::{PgConnection, types::Json};

use crate::pkg::internal::adaptors::jobs::spec::{JOB_COLUMNS, JobEntry};
use crate::pkg::internal::validation::new_object_id;
use crate::pkg::internal::workflow::JobDraft;
use crate::prelude::{AppError, Result};

pub struct JobMutator<'a> {
    pool: &'a mut PgConnection,
}

impl<'a> JobMutator<'a> {
    pub fn new(pool: &'a mut PgConnection) -> Self {
        JobMutator { pool }
    }

    /// Persists a validated draft. The deadline must already be set.
    pub async fn create(&mut self, client_id: &str, draft: &JobDraft) -> Result<JobEntry> {
        let deadline = draft
            .deadline
            .ok_or_else(|| AppError::field("deadline", "Deadline is required"))?;
        let row = sqlx::query_as::<_, JobEntry>(&format!(
            r#"
            INSERT INTO jobs (job_id, client_id, title, description, sub_category, skills, budget, deadline,
                duration, experience_level, location, attachments, is_public, is_promoted,
                invited_freelancers, is_crowdsourced, crowdsourcing_roles)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(new_object_id())
        .bind(client_id)
        .bind(draft.title.trim())
        .bind(draft.description.trim())
        .bind(&draft.sub_category)
        .bind(&draft.skills)
        .bind(draft.budget)
        .bind(deadline)
        .bind(draft.duration)
        .bind(draft.experience_level)
        .bind(draft.location)
        .bind(Json(&draft.attachments))
        .bind(draft.is_public)
        .bind(draft.is_promoted)
        .bind(&draft.invited_freelancers)
        .bind(draft.is_crowdsourced)
        .bind(Json(&draft.crowdsourcing_roles))
        .fetch_one(&mut *self.pool)
        .await?;
        Ok(row)
    }

    pub async fn set_status(&mut self, job_id: &str, status: &str) -> Result<Option<JobEntry>> {
        let row = sqlx::query_as::<_, JobEntry>(&format!(
            "UPDATE jobs SET status = $2 WHERE job_id = $1 RETURNING {}",
            JOB_COLUMNS
        ))
        .bind(job_id)
        .bind(status)
        .fetch_optional(&mut *self.pool)
        .await?;
        Ok(row)
    }
}
