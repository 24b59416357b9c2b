use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BidEntry {
    pub bid_id: String,
    pub job_id: String,
    pub freelancer_id: String,
    pub freelancer_name: String,
    pub proposal: String,
    pub budget: f64,
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
}
