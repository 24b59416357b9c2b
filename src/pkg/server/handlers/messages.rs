use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use super::chat::{load_history, store_message};
use crate::{
    pkg::{
        internal::{adaptors::messages::spec::MessageEntry, auth::User},
        server::state::AppState,
    },
    prelude::Result,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageQuery {
    pub job_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInput {
    pub job_id: String,
    pub text: String,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<Json<Vec<MessageEntry>>> {
    Ok(Json(load_history(&state, &query.job_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<Arc<User>>,
    Json(input): Json<MessageInput>,
) -> Result<(StatusCode, Json<MessageEntry>)> {
    let entry = store_message(&state, &input.job_id, &user.user_id, &input.text).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}
