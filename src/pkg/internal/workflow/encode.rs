//! Flattening of a [`JobDraft`] into multipart fields and back.
//!
//! Lists of scalars are keyed `skills[0]`, lists of objects
//! `crowdsourcingRoles[0][title]`, nested lists
//! `crowdsourcingRoles[0][skills][1]`. Binary attachments travel as
//! `attachment_<n>` next to the text fields, where `n` is the position of
//! the attachment's descriptor in the `attachments` list.

use std::collections::BTreeMap;

use super::job_draft::{Attachment, JobDraft, Role, parse_wire, wire_name};
use crate::pkg::internal::validation::parse_date;
use crate::prelude::{AppError, Result};

pub const ATTACHMENT_PREFIX: &str = "attachment_";

#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub key: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl Payload {
    fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

pub fn encode(draft: &JobDraft) -> Result<Payload> {
    let mut payload = Payload::default();
    payload.push("title", draft.title.clone());
    payload.push("description", draft.description.clone());
    if let Some(category) = &draft.sub_category {
        payload.push("subCategory", category.clone());
    }
    for (i, skill) in draft.skills.iter().enumerate() {
        payload.push(format!("skills[{}]", i), skill.clone());
    }
    payload.push("budget", draft.budget.to_string());
    if let Some(deadline) = draft.deadline {
        payload.push("deadline", deadline.format("%Y-%m-%d").to_string());
    }
    payload.push("duration", wire_name(&draft.duration));
    payload.push("experienceLevel", wire_name(&draft.experience_level));
    payload.push("location", wire_name(&draft.location));
    payload.push("isPublic", draft.is_public.to_string());
    payload.push("isPromoted", draft.is_promoted.to_string());
    for (i, id) in draft.invited_freelancers.iter().enumerate() {
        payload.push(format!("invitedFreelancers[{}]", i), id.clone());
    }
    payload.push("isCrowdsourced", draft.is_crowdsourced.to_string());
    for (i, role) in draft.crowdsourcing_roles.iter().enumerate() {
        payload.push(format!("crowdsourcingRoles[{}][title]", i), role.title.clone());
        payload.push(
            format!("crowdsourcingRoles[{}][description]", i),
            role.description.clone(),
        );
        for (j, skill) in role.skills.iter().enumerate() {
            payload.push(format!("crowdsourcingRoles[{}][skills][{}]", i, j), skill.clone());
        }
        payload.push(
            format!("crowdsourcingRoles[{}][budget]", i),
            role.budget.to_string(),
        );
        payload.push(
            format!("crowdsourcingRoles[{}][status]", i),
            wire_name(&role.status),
        );
    }

    if !draft.attachments.is_empty() {
        payload.push("attachments", serde_json::to_string(&draft.attachments)?);
    }
    for (i, attachment) in draft
        .attachments
        .iter()
        .enumerate()
        .filter(|(_, a)| a.content.is_some())
    {
        payload.files.push(FilePart {
            key: format!("{}{}", ATTACHMENT_PREFIX, i),
            file_name: attachment.name.clone(),
            content_type: attachment.mime_type.clone(),
            bytes: attachment.content.clone().unwrap_or_default(),
        });
    }
    Ok(payload)
}

/// `crowdsourcingRoles[0][skills][1]` -> (`crowdsourcingRoles`, [`0`, `skills`, `1`]).
fn split_key(key: &str) -> Option<(&str, Vec<&str>)> {
    let (base, mut rest) = match key.find('[') {
        Some(pos) => (&key[..pos], &key[pos..]),
        None => return Some((key, vec![])),
    };
    let mut segments = vec![];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let end = inner.find(']')?;
        segments.push(&inner[..end]);
        rest = &inner[end + 1..];
    }
    Some((base, segments))
}

fn index(segment: &str, key: &str, errors: &mut BTreeMap<String, String>) -> Option<usize> {
    match segment.parse::<usize>() {
        Ok(i) => Some(i),
        Err(_) => {
            errors.insert(key.to_string(), format!("Invalid index in {}", key));
            None
        }
    }
}

fn number(value: &str, key: &str, label: &str, errors: &mut BTreeMap<String, String>) -> f64 {
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => {
            errors.insert(key.to_string(), format!("{} must be a number", label));
            0.0
        }
    }
}

fn boolean(value: &str) -> bool {
    matches!(value.trim(), "true" | "1" | "on")
}

fn wire<T: for<'de> serde::Deserialize<'de>>(
    value: &str,
    key: &str,
    errors: &mut BTreeMap<String, String>,
) -> Option<T> {
    let parsed = parse_wire(value.trim());
    if parsed.is_none() {
        errors.insert(key.to_string(), format!("Invalid value '{}' for {}", value, key));
    }
    parsed
}

/// Indexed entries are collected sparsely and compacted in index order.
fn compact<T>(entries: BTreeMap<usize, T>) -> Vec<T> {
    entries.into_values().collect()
}

/// Rebuilds a draft from the text fields of an [`encode`]d payload.
/// Unknown keys are ignored.
pub fn decode_fields<'a, I>(fields: I) -> Result<JobDraft>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut draft = JobDraft::new();
    let mut errors = BTreeMap::new();
    let mut skills = BTreeMap::new();
    let mut invited = BTreeMap::new();
    let mut roles: BTreeMap<usize, (Role, BTreeMap<usize, String>)> = BTreeMap::new();

    for (key, value) in fields {
        let Some((base, segments)) = split_key(key) else {
            errors.insert(key.to_string(), format!("Malformed field name {}", key));
            continue;
        };
        match (base, segments.as_slice()) {
            ("title", []) => draft.title = value.to_string(),
            ("description", []) => draft.description = value.to_string(),
            ("subCategory", []) => {
                draft.sub_category = Some(value.to_string()).filter(|v| !v.is_empty())
            }
            ("skills", [i]) => {
                if let Some(i) = index(i, key, &mut errors) {
                    skills.insert(i, value.to_string());
                }
            }
            ("budget", []) => draft.budget = number(value, key, "Budget", &mut errors),
            ("deadline", []) => {
                if value.trim().is_empty() {
                    draft.deadline = None;
                } else {
                    draft.deadline = parse_date(value.trim());
                    if draft.deadline.is_none() {
                        errors.insert(key.to_string(), "Deadline must be a valid date".to_string());
                    }
                }
            }
            ("duration", []) => {
                if let Some(v) = wire(value, key, &mut errors) {
                    draft.duration = v;
                }
            }
            ("experienceLevel", []) => {
                if let Some(v) = wire(value, key, &mut errors) {
                    draft.experience_level = v;
                }
            }
            ("location", []) => {
                if let Some(v) = wire(value, key, &mut errors) {
                    draft.location = v;
                }
            }
            ("isPublic", []) => draft.is_public = boolean(value),
            ("isPromoted", []) => draft.is_promoted = boolean(value),
            ("isCrowdsourced", []) => draft.is_crowdsourced = boolean(value),
            ("invitedFreelancers", [i]) => {
                if let Some(i) = index(i, key, &mut errors) {
                    invited.insert(i, value.to_string());
                }
            }
            ("attachments", []) => match serde_json::from_str::<Vec<Attachment>>(value) {
                Ok(list) => draft.attachments = list,
                Err(_) => {
                    errors.insert(key.to_string(), "Attachments must be a JSON list".to_string());
                }
            },
            ("crowdsourcingRoles", [i, field, rest @ ..]) => {
                let Some(i) = index(i, key, &mut errors) else {
                    continue;
                };
                let (role, role_skills) = roles.entry(i).or_default();
                match (*field, rest) {
                    ("title", []) => role.title = value.to_string(),
                    ("description", []) => role.description = value.to_string(),
                    ("budget", []) => role.budget = number(value, key, "Role budget", &mut errors),
                    ("status", []) => {
                        if let Some(v) = wire(value, key, &mut errors) {
                            role.status = v;
                        }
                    }
                    ("skills", [j]) => {
                        if let Some(j) = index(j, key, &mut errors) {
                            role_skills.insert(j, value.to_string());
                        }
                    }
                    _ => tracing::debug!("ignoring role field {}", key),
                }
            }
            _ => tracing::debug!("ignoring field {}", key),
        }
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    draft.skills = compact(skills);
    draft.invited_freelancers = compact(invited);
    draft.crowdsourcing_roles = roles
        .into_values()
        .map(|(mut role, role_skills)| {
            role.skills = compact(role_skills);
            role
        })
        .collect();
    Ok(draft)
}
