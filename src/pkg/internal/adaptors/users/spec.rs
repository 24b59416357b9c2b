use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

use crate::pkg::internal::workflow::registration::{
    Certificate, Education, Experience, Language, PortfolioItem,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum UserRole {
    Client,
    Freelancer,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserEntry {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct UserCredentials {
    pub user_id: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FreelancerProfileEntry {
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub hourly_rate: f64,
    pub skills: Vec<String>,
    pub experience: Json<Vec<Experience>>,
    pub education: Json<Vec<Education>>,
    pub languages: Json<Vec<Language>>,
    pub certificates: Json<Vec<Certificate>>,
    pub portfolio: Json<Vec<PortfolioItem>>,
}

pub(crate) const USER_COLUMNS: &str = "user_id, name, email, role, profile_picture, created_at";
