use sqlx::PgConnection;

use crate::pkg::internal::adaptors::messages::spec::MessageEntry;
use crate::pkg::internal::validation::new_object_id;
use crate::prelude::Result;

pub struct MessageMutator<'a> {
    pool: &'a mut PgConnection,
}

impl<'a> MessageMutator<'a> {
    pub fn new(pool: &'a mut PgConnection) -> Self {
        MessageMutator { pool }
    }

    pub async fn create(&mut self, job_id: &str, sender_id: &str, text: &str) -> Result<MessageEntry> {
        let row = sqlx::query_as::<_, MessageEntry>(
            r#"
            INSERT INTO messages (message_id, job_id, sender_id, text)
            VALUES ($1, $2, $3, $4)
            RETURNING message_id, job_id, sender_id, text, created_at
            "#,
        )
        .bind(new_object_id())
        .bind(job_id)
        .bind(sender_id)
        .bind(text)
        .fetch_one(&mut *self.pool)
        .await?;
        Ok(row)
    }
}
