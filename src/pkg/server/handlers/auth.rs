use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
};
use serde::{Deserialize, Serialize};

use crate::{
    conf::settings,
    pkg::{
        internal::{
            adaptors::users::{
                mutators::UserMutator,
                selectors::UserSelector,
                spec::{FreelancerProfileEntry, UserEntry, UserRole},
            },
            auth::{User, hash_password, issue_token, verify_password},
            workflow::RegistrationDraft,
        },
        server::{
            middlewares::authn::TOKEN_COOKIE,
            state::{AppState, GetTxn},
        },
    },
    prelude::{AppError, Result},
};

#[derive(Debug, Serialize)]
pub struct RegisterOutput {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginOutput {
    pub success: bool,
    pub token: String,
    pub user: UserEntry,
}

#[derive(Debug, Serialize)]
pub struct MeOutput {
    pub success: bool,
    pub user: UserEntry,
    pub profile: Option<FreelancerProfileEntry>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(draft): Json<RegistrationDraft>,
) -> Result<(StatusCode, Json<RegisterOutput>)> {
    draft.validate_all()?;
    let hash = hash_password(&draft.password)?;

    let mut tx = state.db_pool.begin_txn().await?;
    let user = UserMutator::new(&mut tx)
        .create(
            &draft.name,
            &draft.email,
            &hash,
            UserRole::Freelancer,
            draft.profile_picture.as_deref(),
        )
        .await?;
    UserMutator::new(&mut tx)
        .create_profile(&user.user_id, &draft)
        .await?;
    tx.commit().await?;

    tracing::info!("registered freelancer {}", &user.user_id);
    Ok((
        StatusCode::CREATED,
        Json(RegisterOutput {
            success: true,
            message: "Registration successful".to_string(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<(HeaderMap, Json<LoginOutput>)> {
    if input.email.trim().is_empty() || input.password.is_empty() {
        return Err(AppError::bad_request("Please provide an email and password"));
    }
    let mut conn = state.db_pool.acquire().await?;
    let invalid = || AppError::unauthorized("Invalid credentials");
    let creds = UserSelector::new(&mut conn)
        .credentials(input.email.trim())
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&input.password, &creds.password_hash) {
        tracing::warn!("bad password for {}", &creds.user_id);
        return Err(invalid());
    }
    let user = UserSelector::new(&mut conn)
        .get_by_id(&creds.user_id)
        .await?
        .ok_or_else(invalid)?;
    let token = issue_token(&user.user_id, user.role)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        HeaderValue::from_str(&format!(
            "{}={}; HttpOnly; Path=/; Max-Age={}{}",
            TOKEN_COOKIE,
            &token,
            settings.jwt_expiry_hours * 3600,
            if settings.is_production() { "; Secure" } else { "" }
        ))?,
    );
    tracing::info!("user {} logged in", &user.user_id);
    Ok((
        headers,
        Json(LoginOutput {
            success: true,
            token,
            user,
        }),
    ))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<Arc<User>>,
) -> Result<Json<MeOutput>> {
    let mut conn = state.db_pool.acquire().await?;
    let entry = UserSelector::new(&mut conn)
        .get_by_id(&user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let profile = UserSelector::new(&mut conn).profile(&user.user_id).await?;
    Ok(Json(MeOutput {
        success: true,
        user: entry,
        profile,
    }))
}
