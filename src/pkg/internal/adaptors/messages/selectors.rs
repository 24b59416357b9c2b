use sqlx::PgConnection;

use crate::pkg::internal::adaptors::messages::spec::MessageEntry;
use crate::prelude::Result;

pub struct MessageSelector<'a> {
    pool: &'a mut PgConnection,
}

impl<'a> MessageSelector<'a> {
    pub fn new(pool: &'a mut PgConnection) -> Self {
        MessageSelector { pool }
    }

    pub async fn get_for_job(&mut self, job_id: &str) -> Result<Vec<MessageEntry>> {
        let rows = sqlx::query_as::<_, MessageEntry>(
            "SELECT message_id, job_id, sender_id, text, created_at FROM messages
             WHERE job_id = $1 ORDER BY created_at ASC",
        )
        .bind(job_id)
        .fetch_all(&mut *self.pool)
        .await?;
        Ok(rows)
    }
}
