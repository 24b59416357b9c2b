use sqlx::{PgConnection, types::Json};

use crate::pkg::internal::adaptors::users::spec::{
    FreelancerProfileEntry, USER_COLUMNS, UserEntry, UserRole,
};
use crate::pkg::internal::validation::new_object_id;
use crate::pkg::internal::workflow::RegistrationDraft;
use crate::prelude::Result;

pub struct UserMutator<'a> {
    pool: &'a mut PgConnection,
}

impl<'a> UserMutator<'a> {
    pub fn new(pool: &'a mut PgConnection) -> Self {
        UserMutator { pool }
    }

    pub async fn create(
        &mut self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
        profile_picture: Option<&str>,
    ) -> Result<UserEntry> {
        let row = sqlx::query_as::<_, UserEntry>(&format!(
            r#"
            INSERT INTO users (user_id, name, email, password_hash, role, profile_picture)
            VALUES ($1, $2, lower($3), $4, $5, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(new_object_id())
        .bind(name.trim())
        .bind(email.trim())
        .bind(password_hash)
        .bind(role)
        .bind(profile_picture)
        .fetch_one(&mut *self.pool)
        .await?;
        Ok(row)
    }

    pub async fn create_profile(
        &mut self,
        user_id: &str,
        draft: &RegistrationDraft,
    ) -> Result<FreelancerProfileEntry> {
        let row = sqlx::query_as::<_, FreelancerProfileEntry>(
            r#"
            INSERT INTO freelancer_profiles (user_id, title, description, hourly_rate, skills,
                experience, education, languages, certificates, portfolio)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING user_id, title, description, hourly_rate, skills, experience, education,
                languages, certificates, portfolio
            "#,
        )
        .bind(user_id)
        .bind(draft.title.trim())
        .bind(draft.description.trim())
        .bind(draft.hourly_rate)
        .bind(&draft.skills)
        .bind(Json(&draft.experience))
        .bind(Json(&draft.education))
        .bind(Json(&draft.languages))
        .bind(Json(&draft.certificates))
        .bind(Json(&draft.portfolio))
        .fetch_one(&mut *self.pool)
        .await?;
        Ok(row)
    }
}
