use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region},
    primitives::ByteStream,
};

use crate::{
    conf::settings,
    pkg::internal::validation::new_object_id,
    prelude::{AppError, Result},
};

pub fn s3_client() -> Client {
    let creds = Credentials::new(
        settings.s3_access_key.clone(),
        settings.s3_secret_key.clone(),
        None,
        None,
        "settings",
    );
    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .endpoint_url(&settings.s3_endpoint)
        .region(Region::new(settings.s3_region.clone()))
        .credentials_provider(creds)
        .force_path_style(true)
        .build();
    Client::from_conf(config)
}

pub async fn create_bucket(
    client: &Client,
    bucket_name: &str,
) -> Result<Option<aws_sdk_s3::operation::create_bucket::CreateBucketOutput>> {
    let create = client.create_bucket().bucket(bucket_name).send().await;
    create.map(Some).or_else(|err| {
        if err
            .as_service_error()
            .map(|se| se.is_bucket_already_exists() || se.is_bucket_already_owned_by_you())
            == Some(true)
        {
            Ok(None)
        } else {
            tracing::error!("could not create bucket {}: {:?}", bucket_name, err);
            Err(AppError::internal(err))
        }
    })
}

/// `brief v2.PDF` -> `uploads/<id>-brief-v2.pdf`
pub fn object_key(prefix: &str, file_name: &str) -> String {
    let cleaned: String = file_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    };
    format!("{}/{}-{}", prefix, new_object_id(), cleaned)
}

pub fn public_url(bucket: &str, key: &str) -> String {
    format!(
        "{}/{}/{}",
        settings.s3_public_url.trim_end_matches('/'),
        bucket,
        key
    )
}

#[allow(async_fn_in_trait)]
pub trait S3Ops {
    /// Stores the object and returns its public url.
    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String>;
}

impl S3Ops for Client {
    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let size = data.len();
        self.put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("upload of {} failed: {:?}", key, e);
                AppError::new(
                    axum::http::StatusCode::BAD_GATEWAY,
                    "File upload failed, please try again",
                )
            })?;
        tracing::debug!("uploaded {} ({} bytes)", key, size);
        Ok(public_url(bucket, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::internal::validation::is_object_id;

    #[test]
    fn test_object_key_is_sanitized() {
        let key = object_key("uploads", "brief v2.PDF");
        assert!(key.starts_with("uploads/"));
        assert!(key.ends_with("-brief-v2.pdf"));
        let id = &key["uploads/".len().."uploads/".len() + 24];
        assert!(is_object_id(id));
        assert!(object_key("uploads", "  ").ends_with("-file"));
    }
}
