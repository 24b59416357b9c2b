use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MessageEntry {
    pub message_id: String,
    pub job_id: String,
    pub sender_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
