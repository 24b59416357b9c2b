use sqlx::PgConnection;

use crate::pkg::internal::adaptors::bids::spec::BidEntry;
use crate::pkg::internal::validation::new_object_id;
use crate::prelude::Result;

pub struct CreateBidData<'b> {
    pub job_id: &'b str,
    pub freelancer_id: &'b str,
    pub proposal: &'b str,
    pub budget: f64,
    pub role: Option<&'b str>,
}

pub struct BidMutator<'a> {
    pool: &'a mut PgConnection,
}

impl<'a> BidMutator<'a> {
    pub fn new(pool: &'a mut PgConnection) -> Self {
        BidMutator { pool }
    }

    pub async fn create(&mut self, bid: CreateBidData<'_>) -> Result<BidEntry> {
        let row = sqlx::query_as::<_, BidEntry>(
            r#"
            WITH inserted AS (
                INSERT INTO bids (bid_id, job_id, freelancer_id, proposal, budget, role)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING bid_id, job_id, freelancer_id, proposal, budget, role, created_at
            )
            SELECT i.bid_id, i.job_id, i.freelancer_id, u.name AS freelancer_name,
                   i.proposal, i.budget, i.role, i.created_at
            FROM inserted i JOIN users u ON u.user_id = i.freelancer_id
            "#,
        )
        .bind(new_object_id())
        .bind(bid.job_id)
        .bind(bid.freelancer_id)
        .bind(bid.proposal)
        .bind(bid.budget)
        .bind(bid.role)
        .fetch_one(&mut *self.pool)
        .await?;
        Ok(row)
    }
}
