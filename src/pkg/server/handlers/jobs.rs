use std::{collections::HashSet, sync::Arc};

use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::{
    conf::settings,
    pkg::{
        internal::{
            adaptors::{
                jobs::{
                    mutators::JobMutator,
                    selectors::JobSelector,
                    spec::{JobEntry, JobFilter},
                },
                users::spec::UserRole,
            },
            auth::User,
            minio::{S3Ops, object_key},
            validation::ensure_object_id,
            workflow::{
                decode_fields,
                encode::ATTACHMENT_PREFIX,
                job_draft::{Attachment, JobDraft, RoleStatus, parse_wire, wire_name},
            },
        },
        server::state::{AppState, GetTxn},
    },
    prelude::{AppError, Result},
};

#[derive(Debug, Serialize)]
pub struct JobOutput {
    pub success: bool,
    pub job: JobEntry,
}

#[derive(Debug, Serialize)]
pub struct JobListOutput {
    pub success: bool,
    pub count: usize,
    pub page: i64,
    pub limit: i64,
    pub jobs: Vec<JobEntry>,
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: String,
}

/// A file part received under `attachment_<n>`.
#[derive(Debug)]
pub struct IncomingFile {
    pub index: usize,
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Pairs each uploaded file with the descriptor at its `attachment_<n>`
/// position. A file whose position has no pending descriptor, or whose
/// position was already claimed, gets a descriptor built from the part itself.
pub fn merge_attachments(
    draft: &mut JobDraft,
    mut files: Vec<IncomingFile>,
) -> Vec<(usize, IncomingFile)> {
    files.sort_by_key(|f| f.index);
    let mut claimed = HashSet::new();
    let mut slots = Vec::with_capacity(files.len());
    for file in files {
        let pending = draft
            .attachments
            .get(file.index)
            .is_some_and(|a| a.url.is_none());
        let slot = if pending && claimed.insert(file.index) {
            file.index
        } else {
            tracing::debug!("no pending descriptor at attachment {}", file.index);
            draft.attachments.push(Attachment {
                name: file.file_name.clone(),
                size: file.data.len() as u64,
                mime_type: file.content_type.clone(),
                url: None,
                content: None,
            });
            draft.attachments.len() - 1
        };
        slots.push((slot, file));
    }
    slots
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<Arc<User>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<JobOutput>)> {
    let mut fields: Vec<(String, String)> = vec![];
    let mut files: Vec<IncomingFile> = vec![];
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        if let Some(index) = name.strip_prefix(ATTACHMENT_PREFIX) {
            let index: usize = index
                .parse()
                .map_err(|_| AppError::field(&name, "Malformed attachment field"))?;
            let file_name = field.file_name().unwrap_or("attachment").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field.bytes().await?;
            if data.len() > settings.max_upload_bytes {
                return Err(AppError::new(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    format!("{} exceeds the upload size limit", file_name),
                ));
            }
            files.push(IncomingFile {
                index,
                file_name,
                content_type,
                data: data.into(),
            });
        } else {
            let value = field.text().await?;
            fields.push((name, value));
        }
    }

    let mut draft = decode_fields(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
    let slots = merge_attachments(&mut draft, files);
    draft.validate_for_submission(Utc::now().date_naive())?;

    let mut set = JoinSet::new();
    for (slot, file) in slots {
        let s3_client = state.s3_client.clone();
        let key = object_key("jobs", &file.file_name);
        set.spawn(async move {
            let url = s3_client
                .upload_object(&settings.s3_bucket_name, &key, file.data, &file.content_type)
                .await?;
            Ok::<(usize, String), AppError>((slot, url))
        });
    }
    while let Some(result) = set.join_next().await {
        let (slot, url) = result.map_err(AppError::internal)??;
        if let Some(attachment) = draft.attachments.get_mut(slot) {
            attachment.url = Some(url);
        }
    }

    let mut tx = state.db_pool.begin_txn().await?;
    let job = JobMutator::new(&mut tx).create(&user.user_id, &draft).await?;
    tx.commit().await?;
    tracing::info!("job {} posted by {}", &job.job_id, &user.user_id);
    Ok((
        StatusCode::CREATED,
        Json(JobOutput { success: true, job }),
    ))
}

pub async fn fetch(
    State(state): State<AppState>,
    Query(filter): Query<JobFilter>,
) -> Result<Json<JobListOutput>> {
    let mut conn = state.db_pool.acquire().await?;
    let jobs = JobSelector::new(&mut conn).fetch_public(&filter).await?;
    tracing::debug!("fetched {} public jobs", jobs.len());
    Ok(Json(JobListOutput {
        success: true,
        count: jobs.len(),
        page: filter.page(),
        limit: filter.limit(),
        jobs,
    }))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobOutput>> {
    ensure_object_id(&job_id, "_id")?;
    let mut conn = state.db_pool.acquire().await?;
    let job = JobSelector::new(&mut conn)
        .get_by_id(&job_id)
        .await?
        .ok_or_else(|| AppError::not_found("Job not found"))?;
    Ok(Json(JobOutput { success: true, job }))
}

pub async fn mine(
    State(state): State<AppState>,
    Extension(user): Extension<Arc<User>>,
) -> Result<Json<Vec<JobEntry>>> {
    let mut conn = state.db_pool.acquire().await?;
    let jobs = JobSelector::new(&mut conn)
        .get_by_client(&user.user_id)
        .await?;
    Ok(Json(jobs))
}

pub async fn set_status(
    State(state): State<AppState>,
    Extension(user): Extension<Arc<User>>,
    Path(job_id): Path<String>,
    Json(input): Json<StatusInput>,
) -> Result<Json<JobOutput>> {
    ensure_object_id(&job_id, "_id")?;
    let status: RoleStatus = parse_wire(&input.status)
        .ok_or_else(|| AppError::field("status", "Status must be open, filled or closed"))?;

    let mut tx = state.db_pool.begin_txn().await?;
    let job = JobSelector::new(&mut tx)
        .get_by_id(&job_id)
        .await?
        .ok_or_else(|| AppError::not_found("Job not found"))?;
    if job.client_id != user.user_id && user.role != UserRole::Admin {
        return Err(AppError::forbidden("Only the job owner can change its status"));
    }
    let job = JobMutator::new(&mut tx)
        .set_status(&job_id, &wire_name(&status))
        .await?
        .ok_or_else(|| AppError::not_found("Job not found"))?;
    tx.commit().await?;
    tracing::info!("job {} is now {:?}", &job_id, status);
    Ok(Json(JobOutput { success: true, job }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::internal::workflow::encode;

    fn file(index: usize, name: &str) -> IncomingFile {
        IncomingFile {
            index,
            file_name: name.into(),
            content_type: "application/pdf".into(),
            data: vec![1, 2, 3],
        }
    }

    fn descriptor(name: &str, url: Option<&str>) -> Attachment {
        Attachment {
            name: name.into(),
            size: 3,
            mime_type: "application/pdf".into(),
            url: url.map(String::from),
            content: None,
        }
    }

    #[test]
    fn test_merge_fills_descriptors_by_position() {
        let mut draft = JobDraft::new();
        draft.attachments = vec![
            descriptor("old.pdf", Some("http://files/old.pdf")),
            descriptor("a.pdf", None),
            descriptor("b.pdf", None),
        ];
        let slots = merge_attachments(&mut draft, vec![file(2, "b.pdf"), file(1, "a.pdf")]);
        let mapped: Vec<(usize, &str)> = slots
            .iter()
            .map(|(slot, f)| (*slot, f.file_name.as_str()))
            .collect();
        assert_eq!(mapped, vec![(1, "a.pdf"), (2, "b.pdf")]);
        assert_eq!(draft.attachments.len(), 3);
    }

    #[test]
    fn test_merge_adds_missing_descriptors() {
        let mut draft = JobDraft::new();
        let slots = merge_attachments(&mut draft, vec![file(0, "brief.pdf")]);
        assert_eq!(slots.len(), 1);
        assert_eq!(draft.attachments.len(), 1);
        assert_eq!(draft.attachments[0].name, "brief.pdf");
        assert_eq!(draft.attachments[0].size, 3);
    }

    #[test]
    fn test_merge_never_overwrites_uploaded_or_claimed_slots() {
        let mut draft = JobDraft::new();
        draft.attachments = vec![
            descriptor("old.pdf", Some("http://files/old.pdf")),
            descriptor("a.pdf", None),
        ];
        let slots = merge_attachments(
            &mut draft,
            vec![file(0, "x.pdf"), file(1, "a.pdf"), file(1, "dup.pdf")],
        );
        let mapped: Vec<(usize, &str)> = slots
            .iter()
            .map(|(slot, f)| (*slot, f.file_name.as_str()))
            .collect();
        assert_eq!(mapped, vec![(2, "x.pdf"), (1, "a.pdf"), (3, "dup.pdf")]);
        assert_eq!(draft.attachments[0].url.as_deref(), Some("http://files/old.pdf"));
        assert_eq!(draft.attachments.len(), 4);
    }

    #[test]
    fn test_encoded_files_land_on_their_descriptors() {
        let mut sent = JobDraft::new();
        sent.attachments = vec![
            descriptor("spec.pdf", None),
            Attachment {
                name: "logo.png".into(),
                size: 2,
                mime_type: "image/png".into(),
                url: None,
                content: Some(vec![9, 9]),
            },
        ];
        let payload = encode(&sent).unwrap();
        let mut received =
            decode_fields(payload.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))).unwrap();
        let files = payload
            .files
            .into_iter()
            .map(|part| IncomingFile {
                index: part.key[ATTACHMENT_PREFIX.len()..].parse().unwrap(),
                file_name: part.file_name,
                content_type: part.content_type,
                data: part.bytes,
            })
            .collect();
        let slots = merge_attachments(&mut received, files);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].0, 1);
        assert_eq!(received.attachments[slots[0].0].name, "logo.png");
        assert_eq!(received.attachments.len(), 2);
    }
}
