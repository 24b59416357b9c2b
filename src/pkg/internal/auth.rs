use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    conf::settings,
    pkg::{
        internal::adaptors::users::{
            selectors::UserSelector,
            spec::{UserEntry, UserRole},
        },
        server::state::AppState,
    },
    prelude::{AppError, Result},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

/// The authenticated caller, attached to requests by the authn middleware.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl From<UserEntry> for User {
    fn from(entry: UserEntry) -> Self {
        User {
            user_id: entry.user_id,
            name: entry.name,
            email: entry.email,
            role: entry.role,
        }
    }
}

impl User {
    pub async fn retrieve(state: &AppState, user_id: &str) -> Result<Option<Self>> {
        let mut conn = state.db_pool.acquire().await?;
        Ok(UserSelector::new(&mut conn)
            .get_by_id(user_id)
            .await?
            .map(User::from))
    }

    pub fn require_role(&self, role: UserRole) -> Result<()> {
        if self.role == role || self.role == UserRole::Admin {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "Only {} accounts can do this",
                crate::pkg::internal::workflow::job_draft::wire_name(&role)
            )))
        }
    }
}

pub fn issue_token_with(secret: &str, user_id: &str, role: UserRole, ttl_hours: i64) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        iat: now,
        exp: now + ttl_hours * 3600,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn verify_token_with(secret: &str, token: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

pub fn issue_token(user_id: &str, role: UserRole) -> Result<String> {
    issue_token_with(&settings.jwt_secret, user_id, role, settings.jwt_expiry_hours)
}

pub fn verify_token(token: &str) -> Result<Claims> {
    verify_token_with(&settings.jwt_secret, token)
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            tracing::error!("password hashing failed: {}", e);
            AppError::new(
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Could not process password",
            )
        })
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("stored password hash is unreadable: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::pkg::internal::errors::ErrorKind;

    #[test]
    fn test_token_roundtrip() -> Result<()> {
        let token = issue_token_with("secret", "507f1f77bcf86cd799439011", UserRole::Client, 1)?;
        let claims = verify_token_with("secret", &token)?;
        assert_eq!(claims.sub, "507f1f77bcf86cd799439011");
        assert_eq!(claims.role, UserRole::Client);
        Ok(())
    }

    #[test]
    fn test_expired_token() {
        let token =
            issue_token_with("secret", "507f1f77bcf86cd799439011", UserRole::Client, -2).unwrap();
        let err = verify_token_with("secret", &token).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExpiredToken);
    }

    #[test]
    fn test_malformed_token() {
        let err = verify_token_with("secret", "not.a.token").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedToken);

        let token =
            issue_token_with("other", "507f1f77bcf86cd799439011", UserRole::Client, 1).unwrap();
        let err = verify_token_with("secret", &token).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedToken);
    }

    #[traced_test]
    #[test]
    fn test_password_hashing() -> Result<()> {
        let hash = hash_password("Secret123")?;
        assert!(verify_password("Secret123", &hash));
        assert!(!verify_password("Secret124", &hash));
        assert!(!verify_password("Secret123", "garbage"));
        Ok(())
    }

    #[test]
    fn test_role_guard() {
        let user = User {
            user_id: "507f1f77bcf86cd799439011".into(),
            name: "c".into(),
            email: "c@example.com".into(),
            role: UserRole::Client,
        };
        assert!(user.require_role(UserRole::Client).is_ok());
        assert!(user.require_role(UserRole::Freelancer).is_err());
    }
}
