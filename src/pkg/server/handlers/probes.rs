use axum::{Json, extract::State};
use serde_json::{Value, json};
use sqlx::query;

use crate::{conf::settings, pkg::server::state::AppState, prelude::Result};

pub async fn livez() -> Result<()> {
    tracing::debug!("service is live");
    Ok(())
}

pub async fn healthz(State(state): State<AppState>) -> Result<Json<Value>> {
    query("select 1").execute(&*state.db_pool).await?;
    tracing::debug!("service is healthy");
    Ok(Json(json!({
        "service": settings.service_name,
        "environment": settings.environment,
        "status": "ok",
    })))
}
