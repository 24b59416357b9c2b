use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::pkg::internal::errors::flatten_validation;
use crate::pkg::internal::validation::{invalid, is_object_id};
use crate::prelude::{AppError, Result};

pub const MAX_JOB_SKILLS: usize = 15;

pub const CATEGORIES: &[&str] = &[
    "web-development",
    "mobile-development",
    "design",
    "writing",
    "marketing",
    "data-science",
    "video-editing",
    "admin-support",
    "other",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "job_duration", rename_all = "kebab-case")]
pub enum JobDuration {
    LessThanOneWeek,
    OneToFourWeeks,
    #[default]
    OneToThreeMonths,
    ThreeToSixMonths,
    MoreThanSixMonths,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "experience_level", rename_all = "lowercase")]
pub enum ExperienceLevel {
    Entry,
    #[default]
    Intermediate,
    Expert,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "work_location", rename_all = "kebab-case")]
pub enum WorkLocation {
    #[default]
    Remote,
    OnSite,
    Hybrid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleStatus {
    #[default]
    Open,
    Filled,
    Closed,
}

/// Wire name of an enum value, as serde renders it.
pub fn wire_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(other) => other.to_string(),
        Err(_) => String::new(),
    }
}

pub fn parse_wire<T: for<'de> Deserialize<'de>>(value: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).ok()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct Role {
    #[validate(custom(function = "role_title_present"))]
    pub title: String,
    #[validate(custom(function = "role_description_present"))]
    pub description: String,
    #[validate(length(min = 1, message = "Each role needs at least one skill"))]
    pub skills: Vec<String>,
    #[validate(range(exclusive_min = 0.0, message = "Each role needs a budget greater than 0"))]
    pub budget: f64,
    pub status: RoleStatus,
}

impl Role {
    /// The per-role predicate used by the budget/timeline step.
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.description.trim().is_empty()
            && !self.skills.is_empty()
            && self.budget > 0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(skip)]
    pub content: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct JobDraft {
    #[validate(
        custom(function = "title_present"),
        length(max = 100, message = "Job title cannot exceed 100 characters")
    )]
    pub title: String,
    #[validate(
        custom(function = "description_present"),
        length(max = 4000, message = "Job description cannot exceed 4000 characters")
    )]
    pub description: String,
    #[validate(custom(function = "known_category"))]
    pub sub_category: Option<String>,
    #[validate(
        length(min = 1, max = 15, message = "Select between 1 and 15 skills"),
        custom(function = "unique_skills")
    )]
    pub skills: Vec<String>,
    #[validate(range(exclusive_min = 0.0, message = "Budget must be greater than 0"))]
    pub budget: f64,
    #[validate(required(message = "Deadline is required"))]
    pub deadline: Option<NaiveDate>,
    pub duration: JobDuration,
    pub experience_level: ExperienceLevel,
    pub location: WorkLocation,
    pub attachments: Vec<Attachment>,
    pub is_public: bool,
    pub is_promoted: bool,
    #[validate(custom(function = "freelancer_ids"))]
    pub invited_freelancers: Vec<String>,
    pub is_crowdsourced: bool,
    pub crowdsourcing_roles: Vec<Role>,
}

impl Default for JobDraft {
    fn default() -> Self {
        JobDraft {
            title: String::new(),
            description: String::new(),
            sub_category: None,
            skills: vec![],
            budget: 0.0,
            deadline: None,
            duration: JobDuration::default(),
            experience_level: ExperienceLevel::default(),
            location: WorkLocation::default(),
            attachments: vec![],
            is_public: true,
            is_promoted: false,
            invited_freelancers: vec![],
            is_crowdsourced: false,
            crowdsourcing_roles: vec![],
        }
    }
}

/// One settable field of a [`JobDraft`].
#[derive(Debug, Clone, PartialEq)]
pub enum JobField {
    Title(String),
    Description(String),
    SubCategory(Option<String>),
    Skills(Vec<String>),
    Budget(f64),
    Deadline(Option<NaiveDate>),
    Duration(JobDuration),
    ExperienceLevel(ExperienceLevel),
    Location(WorkLocation),
    Attachments(Vec<Attachment>),
    IsPublic(bool),
    IsPromoted(bool),
    InvitedFreelancers(Vec<String>),
    IsCrowdsourced(bool),
    CrowdsourcingRoles(Vec<Role>),
}

/// One settable field of a [`Role`].
#[derive(Debug, Clone, PartialEq)]
pub enum RoleField {
    Title(String),
    Description(String),
    Skills(Vec<String>),
    Budget(f64),
    Status(RoleStatus),
}

impl JobDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_field(&mut self, field: JobField) {
        match field {
            JobField::Title(v) => self.title = v,
            JobField::Description(v) => self.description = v,
            JobField::SubCategory(v) => self.sub_category = v,
            JobField::Skills(v) => self.skills = v,
            JobField::Budget(v) => self.budget = v,
            JobField::Deadline(v) => self.deadline = v,
            JobField::Duration(v) => self.duration = v,
            JobField::ExperienceLevel(v) => self.experience_level = v,
            JobField::Location(v) => self.location = v,
            JobField::Attachments(v) => self.attachments = v,
            JobField::IsPublic(v) => self.is_public = v,
            JobField::IsPromoted(v) => self.is_promoted = v,
            JobField::InvitedFreelancers(v) => self.invited_freelancers = v,
            // roles are kept when crowdsourcing is switched off
            JobField::IsCrowdsourced(v) => self.is_crowdsourced = v,
            JobField::CrowdsourcingRoles(v) => self.crowdsourcing_roles = v,
        }
    }

    /// Adds a skill unless it is blank, already present or the list is full.
    /// Returns whether the list changed.
    pub fn add_skill(&mut self, skill: &str) -> bool {
        push_unique(&mut self.skills, skill, MAX_JOB_SKILLS)
    }

    pub fn remove_skill(&mut self, skill: &str) -> bool {
        let before = self.skills.len();
        self.skills.retain(|s| s != skill);
        before != self.skills.len()
    }

    pub fn add_role(&self) -> JobDraft {
        let mut next = self.clone();
        next.crowdsourcing_roles.push(Role::default());
        next
    }

    pub fn remove_role(&self, index: usize) -> Result<JobDraft> {
        if index >= self.crowdsourcing_roles.len() {
            return Err(AppError::field(
                "crowdsourcingRoles",
                format!("No role at position {}", index),
            ));
        }
        let mut next = self.clone();
        next.crowdsourcing_roles.remove(index);
        Ok(next)
    }

    /// Returns a copy of the draft with one field of one role replaced.
    pub fn with_role_field(&self, index: usize, field: RoleField) -> Result<JobDraft> {
        let mut next = self.clone();
        let role = next.crowdsourcing_roles.get_mut(index).ok_or_else(|| {
            AppError::field("crowdsourcingRoles", format!("No role at position {}", index))
        })?;
        match field {
            RoleField::Title(v) => role.title = v,
            RoleField::Description(v) => role.description = v,
            RoleField::Skills(v) => role.skills = v,
            RoleField::Budget(v) => role.budget = v,
            RoleField::Status(v) => role.status = v,
        }
        Ok(next)
    }

    /// Field-level checks applied when the whole draft is submitted.
    pub fn validate_for_submission(&self, today: NaiveDate) -> Result<()> {
        let mut fields = BTreeMap::new();
        if let Err(errs) = self.validate() {
            flatten_validation(&errs, "", &mut fields);
        }
        if let Some(deadline) = self.deadline {
            if deadline < today {
                fields
                    .entry("deadline".to_string())
                    .or_insert_with(|| "Deadline cannot be in the past".to_string());
            }
        }
        if self.is_crowdsourced {
            if self.crowdsourcing_roles.is_empty() {
                fields.insert(
                    "crowdsourcingRoles".to_string(),
                    "At least one role is required for a crowdsourced job".to_string(),
                );
            }
            let mut titles = HashSet::new();
            for (idx, role) in self.crowdsourcing_roles.iter().enumerate() {
                let prefix = format!("crowdsourcingRoles[{}]", idx);
                if let Err(errs) = role.validate() {
                    flatten_validation(&errs, &prefix, &mut fields);
                }
                let title = role.title.trim().to_lowercase();
                if !title.is_empty() && !titles.insert(title) {
                    fields
                        .entry(format!("{}.title", prefix))
                        .or_insert_with(|| "Role titles must be unique".to_string());
                }
            }
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(fields))
        }
    }
}

pub(crate) fn push_unique(list: &mut Vec<String>, value: &str, cap: usize) -> bool {
    let value = value.trim();
    if value.is_empty() || list.len() >= cap || list.iter().any(|s| s == value) {
        return false;
    }
    list.push(value.to_string());
    true
}

fn title_present(title: &str) -> core::result::Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(invalid("required", "Job title is required"));
    }
    Ok(())
}

fn description_present(description: &str) -> core::result::Result<(), ValidationError> {
    if description.trim().is_empty() {
        return Err(invalid("required", "Job description is required"));
    }
    Ok(())
}

fn role_title_present(title: &str) -> core::result::Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(invalid("required", "Role title is required"));
    }
    Ok(())
}

fn role_description_present(description: &str) -> core::result::Result<(), ValidationError> {
    if description.trim().is_empty() {
        return Err(invalid("required", "Role description is required"));
    }
    Ok(())
}

fn known_category(category: &str) -> core::result::Result<(), ValidationError> {
    if CATEGORIES.contains(&category) {
        return Ok(());
    }
    Err(invalid("category", "Please select a valid category"))
}

fn unique_skills(skills: &[String]) -> core::result::Result<(), ValidationError> {
    let mut seen = HashSet::new();
    if skills.iter().all(|s| seen.insert(s.as_str())) {
        return Ok(());
    }
    Err(invalid("unique", "Skills must not contain duplicates"))
}

fn freelancer_ids(ids: &[String]) -> core::result::Result<(), ValidationError> {
    if ids.iter().all(|id| is_object_id(id)) {
        return Ok(());
    }
    Err(invalid("id", "Invited freelancers must be valid user ids"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn complete_draft() -> JobDraft {
        let mut draft = JobDraft::new();
        draft.set_field(JobField::Title("Landing page".into()));
        draft.set_field(JobField::Description("Build a landing page".into()));
        draft.set_field(JobField::SubCategory(Some("web-development".into())));
        draft.add_skill("React");
        draft.set_field(JobField::Budget(500.0));
        draft.set_field(JobField::Deadline(NaiveDate::from_ymd_opt(2026, 12, 1)));
        draft
    }

    #[test]
    fn test_add_skill_ignores_duplicates() {
        let mut draft = JobDraft::new();
        assert!(draft.add_skill("Go"));
        assert!(!draft.add_skill("Go"));
        assert!(!draft.add_skill("  "));
        assert_eq!(draft.skills, vec!["Go".to_string()]);
    }

    #[test]
    fn test_add_skill_respects_cap() {
        let mut draft = JobDraft::new();
        for i in 0..20 {
            draft.add_skill(&format!("skill-{}", i));
        }
        assert_eq!(draft.skills.len(), MAX_JOB_SKILLS);
        assert!(draft.remove_skill("skill-0"));
        assert!(draft.add_skill("Rust"));
    }

    #[test]
    fn test_with_role_field_leaves_original_untouched() {
        let draft = JobDraft::new().add_role();
        let next = draft
            .with_role_field(0, RoleField::Title("Designer".into()))
            .unwrap();
        assert_eq!(draft.crowdsourcing_roles[0].title, "");
        assert_eq!(next.crowdsourcing_roles[0].title, "Designer");
        assert!(draft.with_role_field(3, RoleField::Budget(1.0)).is_err());
        assert!(next.remove_role(0).unwrap().crowdsourcing_roles.is_empty());
    }

    #[test]
    fn test_switching_off_crowdsourcing_keeps_roles() {
        let mut draft = JobDraft::new().add_role();
        draft.set_field(JobField::IsCrowdsourced(true));
        draft.set_field(JobField::IsCrowdsourced(false));
        assert_eq!(draft.crowdsourcing_roles.len(), 1);
    }

    #[test]
    fn test_submission_accepts_complete_draft() {
        assert!(complete_draft().validate_for_submission(today()).is_ok());
    }

    #[test]
    fn test_submission_reports_fields() {
        let mut draft = complete_draft();
        draft.set_field(JobField::Title("x".repeat(101)));
        draft.set_field(JobField::Deadline(NaiveDate::from_ymd_opt(2026, 1, 1)));
        draft.set_field(JobField::Skills(vec!["Go".into(), "Go".into()]));
        draft.set_field(JobField::InvitedFreelancers(vec!["nope".into()]));
        match draft.validate_for_submission(today()) {
            Err(AppError::Validation(fields)) => {
                assert_eq!(fields["title"], "Job title cannot exceed 100 characters");
                assert_eq!(fields["deadline"], "Deadline cannot be in the past");
                assert_eq!(fields["skills"], "Skills must not contain duplicates");
                assert!(fields.contains_key("invitedFreelancers"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_submission_checks_roles_only_when_crowdsourced() {
        let mut draft = complete_draft().add_role();
        assert!(draft.validate_for_submission(today()).is_ok());

        draft.set_field(JobField::IsCrowdsourced(true));
        match draft.validate_for_submission(today()) {
            Err(AppError::Validation(fields)) => {
                assert_eq!(fields["crowdsourcingRoles[0].title"], "Role title is required");
                assert!(fields.contains_key("crowdsourcingRoles[0].budget"));
            }
            other => panic!("unexpected {:?}", other),
        }

        draft.set_field(JobField::CrowdsourcingRoles(vec![]));
        match draft.validate_for_submission(today()) {
            Err(AppError::Validation(fields)) => {
                assert!(fields.contains_key("crowdsourcingRoles"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_submission_rejects_duplicate_role_titles() {
        let role = |title: &str| Role {
            title: title.into(),
            description: "Work".into(),
            skills: vec!["Figma".into()],
            budget: 100.0,
            ..Role::default()
        };
        let mut draft = complete_draft();
        draft.set_field(JobField::IsCrowdsourced(true));
        draft.set_field(JobField::CrowdsourcingRoles(vec![
            role("Designer"),
            role("Developer"),
            role(" designer "),
        ]));
        match draft.validate_for_submission(today()) {
            Err(AppError::Validation(fields)) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(
                    fields["crowdsourcingRoles[2].title"],
                    "Role titles must be unique"
                );
            }
            other => panic!("unexpected {:?}", other),
        }

        draft.set_field(JobField::CrowdsourcingRoles(vec![role("Designer"), role("Developer")]));
        assert!(draft.validate_for_submission(today()).is_ok());
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(wire_name(&WorkLocation::OnSite), "on-site");
        assert_eq!(wire_name(&JobDuration::LessThanOneWeek), "less-than-one-week");
        assert_eq!(parse_wire::<ExperienceLevel>("expert"), Some(ExperienceLevel::Expert));
        assert_eq!(parse_wire::<RoleStatus>("pending"), None);
    }

    #[test]
    fn test_draft_json_uses_camel_case() {
        let draft: JobDraft = serde_json::from_str(
            r#"{"title":"t","isCrowdsourced":true,"crowdsourcingRoles":[{"title":"Dev"}]}"#,
        )
        .unwrap();
        assert!(draft.is_crowdsourced);
        assert!(draft.is_public);
        assert_eq!(draft.crowdsourcing_roles[0].status, RoleStatus::Open);
    }
}
