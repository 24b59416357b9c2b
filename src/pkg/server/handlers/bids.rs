use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    pkg::{
        internal::{
            adaptors::{
                bids::{
                    mutators::{BidMutator, CreateBidData},
                    selectors::BidSelector,
                    spec::BidEntry,
                },
                jobs::{selectors::JobSelector, spec::JobEntry},
                users::spec::UserRole,
            },
            auth::User,
            bids::{JobBids, organize_bids},
            validation::ensure_object_id,
            workflow::job_draft::RoleStatus,
        },
        server::state::{AppState, GetTxn},
    },
    prelude::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBidInput {
    pub job_id: String,
    #[validate(length(min = 1, message = "Proposal is required"))]
    pub proposal: String,
    #[validate(range(exclusive_min = 0.0, message = "Budget must be greater than 0"))]
    pub budget: f64,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BidOutput {
    pub success: bool,
    pub bid: BidEntry,
}

/// Role rules: a crowdsourced job needs a bid on one of its open roles, any
/// other job takes bids without a role.
pub fn check_bid_role<'a>(job: &JobEntry, role: Option<&'a str>) -> Result<Option<&'a str>> {
    let role = role.map(str::trim).filter(|r| !r.is_empty());
    if job.status != "open" {
        return Err(AppError::bad_request("This job is no longer accepting bids"));
    }
    if !job.is_crowdsourced {
        return match role {
            None => Ok(None),
            Some(_) => Err(AppError::field("role", "This job does not have roles")),
        };
    }
    let Some(role) = role else {
        return Err(AppError::field("role", "Role is required for a crowdsourced job"));
    };
    match job.crowdsourcing_roles.0.iter().find(|r| r.title == role) {
        None => Err(AppError::field("role", format!("No role named {}", role))),
        Some(r) if r.status != RoleStatus::Open => {
            Err(AppError::field("role", format!("Role {} is not open", role)))
        }
        Some(_) => Ok(Some(role)),
    }
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<Arc<User>>,
    Json(input): Json<CreateBidInput>,
) -> Result<(StatusCode, Json<BidOutput>)> {
    user.require_role(UserRole::Freelancer)?;
    ensure_object_id(&input.job_id, "jobId")?;
    input.validate()?;

    let mut tx = state.db_pool.begin_txn().await?;
    let job = JobSelector::new(&mut tx)
        .get_by_id(&input.job_id)
        .await?
        .ok_or_else(|| AppError::not_found("Job not found"))?;
    if job.client_id == user.user_id {
        return Err(AppError::forbidden("You cannot bid on your own job"));
    }
    let role = check_bid_role(&job, input.role.as_deref())?;
    if BidSelector::new(&mut tx)
        .exists(&job.job_id, &user.user_id, role)
        .await?
    {
        return Err(AppError::bad_request("You have already placed this bid"));
    }
    let bid = BidMutator::new(&mut tx)
        .create(CreateBidData {
            job_id: &job.job_id,
            freelancer_id: &user.user_id,
            proposal: input.proposal.trim(),
            budget: input.budget,
            role,
        })
        .await?;
    tx.commit().await?;
    tracing::info!("bid {} placed on job {}", &bid.bid_id, &job.job_id);
    Ok((StatusCode::CREATED, Json(BidOutput { success: true, bid })))
}

pub async fn for_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobBids>> {
    ensure_object_id(&job_id, "jobId")?;
    let mut conn = state.db_pool.acquire().await?;
    let job = JobSelector::new(&mut conn)
        .get_by_id(&job_id)
        .await?
        .ok_or_else(|| AppError::not_found("Job not found"))?;
    let bids = BidSelector::new(&mut conn).get_for_job(&job_id).await?;
    tracing::debug!("{} bids for job {}", bids.len(), &job_id);
    Ok(Json(organize_bids(&job, bids)))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use sqlx::types::Json as SqlJson;

    use super::*;
    use crate::pkg::internal::errors::ErrorKind;
    use crate::pkg::internal::workflow::job_draft::{
        ExperienceLevel, JobDuration, Role, WorkLocation,
    };

    fn job(crowdsourced: bool, roles: Vec<Role>) -> JobEntry {
        JobEntry {
            job_id: "507f1f77bcf86cd799439011".into(),
            client_id: "507f1f77bcf86cd799439012".into(),
            title: "Landing page".into(),
            description: "Build it".into(),
            sub_category: None,
            skills: vec!["React".into()],
            budget: 500.0,
            deadline: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            duration: JobDuration::default(),
            experience_level: ExperienceLevel::default(),
            location: WorkLocation::default(),
            attachments: SqlJson(vec![]),
            is_public: true,
            is_promoted: false,
            invited_freelancers: vec![],
            is_crowdsourced: crowdsourced,
            crowdsourcing_roles: SqlJson(roles),
            status: "open".into(),
            created_at: Utc::now(),
        }
    }

    fn role(title: &str, status: RoleStatus) -> Role {
        Role {
            title: title.into(),
            description: "d".into(),
            skills: vec!["Figma".into()],
            budget: 100.0,
            status,
        }
    }

    #[test]
    fn test_regular_job_rejects_role() {
        let j = job(false, vec![]);
        assert_eq!(check_bid_role(&j, None).unwrap(), None);
        assert_eq!(check_bid_role(&j, Some("  ")).unwrap(), None);
        let err = check_bid_role(&j, Some("Designer")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_crowdsourced_job_requires_open_role() {
        let j = job(
            true,
            vec![role("Designer", RoleStatus::Open), role("QA", RoleStatus::Filled)],
        );
        assert_eq!(check_bid_role(&j, Some("Designer")).unwrap(), Some("Designer"));
        assert!(check_bid_role(&j, None).is_err());
        assert!(check_bid_role(&j, Some("QA")).is_err());
        assert!(check_bid_role(&j, Some("Writer")).is_err());
    }

    #[test]
    fn test_closed_job_rejects_bids() {
        let mut j = job(false, vec![]);
        j.status = "closed".into();
        let err = check_bid_role(&j, None).unwrap_err();
        assert_eq!(err.normalize(false).status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_bid_input_validation() {
        let input: CreateBidInput = serde_json::from_str(
            r#"{"jobId":"507f1f77bcf86cd799439011","proposal":"","budget":0}"#,
        )
        .unwrap();
        let err = AppError::from(input.validate().unwrap_err());
        let body = err.normalize(false).body;
        let errors = body.errors.unwrap();
        assert!(errors.contains_key("proposal"));
        assert!(errors.contains_key("budget"));
    }
}
