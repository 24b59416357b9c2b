use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::pkg::internal::adaptors::jobs::spec::{JOB_COLUMNS, JobEntry, JobFilter};
use crate::prelude::Result;

pub struct JobSelector<'a> {
    pool: &'a mut PgConnection,
}

impl<'a> JobSelector<'a> {
    pub fn new(pool: &'a mut PgConnection) -> Self {
        JobSelector { pool }
    }

    pub async fn get_by_id(&mut self, job_id: &str) -> Result<Option<JobEntry>> {
        let row = sqlx::query_as::<_, JobEntry>(&format!(
            "SELECT {} FROM jobs WHERE job_id = $1",
            JOB_COLUMNS
        ))
        .bind(job_id)
        .fetch_optional(&mut *self.pool)
        .await?;
        Ok(row)
    }

    /// Public jobs, promoted first then newest first.
    pub async fn fetch_public(&mut self, filter: &JobFilter) -> Result<Vec<JobEntry>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM jobs WHERE is_public = TRUE AND status = 'open'",
            JOB_COLUMNS
        ));
        if let Some(category) = &filter.sub_category {
            qb.push(" AND sub_category = ").push_bind(category.clone());
        }
        if let Some(level) = filter.experience_level {
            qb.push(" AND experience_level = ").push_bind(level);
        }
        if let Some(location) = filter.location {
            qb.push(" AND location = ").push_bind(location);
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            qb.push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY is_promoted DESC, created_at DESC LIMIT ")
            .push_bind(filter.limit())
            .push(" OFFSET ")
            .push_bind((filter.page() - 1) * filter.limit());
        let rows = qb
            .build_query_as::<JobEntry>()
            .fetch_all(&mut *self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_by_client(&mut self, client_id: &str) -> Result<Vec<JobEntry>> {
        let rows = sqlx::query_as::<_, JobEntry>(&format!(
            "SELECT {} FROM jobs WHERE client_id = $1 ORDER BY created_at DESC",
            JOB_COLUMNS
        ))
        .bind(client_id)
        .fetch_all(&mut *self.pool)
        .await?;
        Ok(rows)
    }
}
