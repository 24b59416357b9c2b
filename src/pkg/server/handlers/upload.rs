use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use serde::Serialize;

use crate::{
    conf::settings,
    pkg::{
        internal::{
            auth::User,
            minio::{S3Ops, object_key},
        },
        server::state::AppState,
    },
    prelude::{AppError, Result},
};

pub const DOCUMENT_FIELD: &str = "document";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutput {
    pub success: bool,
    pub file_url: String,
}

pub async fn document(
    State(state): State<AppState>,
    Extension(user): Extension<Arc<User>>,
    mut multipart: Multipart,
) -> Result<Json<UploadOutput>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(DOCUMENT_FIELD) {
            let _ = field.bytes().await?;
            continue;
        }
        let file_name = field.file_name().unwrap_or("document").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await?;
        if data.is_empty() {
            break;
        }
        if data.len() > settings.max_upload_bytes {
            return Err(AppError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("{} exceeds the upload size limit", file_name),
            ));
        }
        let key = object_key("uploads", &file_name);
        let file_url = state
            .s3_client
            .upload_object(&settings.s3_bucket_name, &key, data.into(), &content_type)
            .await?;
        tracing::info!("{} uploaded {}", &user.user_id, &key);
        return Ok(Json(UploadOutput {
            success: true,
            file_url,
        }));
    }
    Err(AppError::bad_request("No file uploaded"))
}
