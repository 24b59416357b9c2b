use sqlx::PgConnection;

use crate::pkg::internal::adaptors::bids::spec::BidEntry;
use crate::prelude::Result;

pub struct BidSelector<'a> {
    pool: &'a mut PgConnection,
}

impl<'a> BidSelector<'a> {
    pub fn new(pool: &'a mut PgConnection) -> Self {
        BidSelector { pool }
    }

    pub async fn get_for_job(&mut self, job_id: &str) -> Result<Vec<BidEntry>> {
        let rows = sqlx::query_as::<_, BidEntry>(
            r#"
            SELECT b.bid_id, b.job_id, b.freelancer_id, u.name AS freelancer_name,
                   b.proposal, b.budget, b.role, b.created_at
            FROM bids b JOIN users u ON u.user_id = b.freelancer_id
            WHERE b.job_id = $1
            ORDER BY b.created_at ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&mut *self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn exists(&mut self, job_id: &str, freelancer_id: &str, role: Option<&str>) -> Result<bool> {
        let found: Option<String> = sqlx::query_scalar(
            "SELECT bid_id FROM bids WHERE job_id = $1 AND freelancer_id = $2 AND role IS NOT DISTINCT FROM $3",
        )
        .bind(job_id)
        .bind(freelancer_id)
        .bind(role)
        .fetch_optional(&mut *self.pool)
        .await?;
        Ok(found.is_some())
    }
}
