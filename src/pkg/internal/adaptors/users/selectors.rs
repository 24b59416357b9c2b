use sqlx::PgConnection;

use crate::pkg::internal::adaptors::users::spec::{
    FreelancerProfileEntry, USER_COLUMNS, UserCredentials, UserEntry,
};
use crate::prelude::Result;

pub struct UserSelector<'a> {
    pool: &'a mut PgConnection,
}

impl<'a> UserSelector<'a> {
    pub fn new(pool: &'a mut PgConnection) -> Self {
        UserSelector { pool }
    }

    pub async fn get_by_id(&mut self, user_id: &str) -> Result<Option<UserEntry>> {
        let row = sqlx::query_as::<_, UserEntry>(&format!(
            "SELECT {} FROM users WHERE user_id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&mut *self.pool)
        .await?;
        Ok(row)
    }

    pub async fn credentials(&mut self, email: &str) -> Result<Option<UserCredentials>> {
        let row = sqlx::query_as::<_, UserCredentials>(
            "SELECT user_id, password_hash FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&mut *self.pool)
        .await?;
        Ok(row)
    }

    pub async fn profile(&mut self, user_id: &str) -> Result<Option<FreelancerProfileEntry>> {
        let row = sqlx::query_as::<_, FreelancerProfileEntry>(
            r#"
            SELECT user_id, title, description, hourly_rate, skills, experience, education,
                   languages, certificates, portfolio
            FROM freelancer_profiles WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.pool)
        .await?;
        Ok(row)
    }
}
