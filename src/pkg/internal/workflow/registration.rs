use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::job_draft::push_unique;
use super::steps::{Staged, StepValidation};
use crate::pkg::internal::validation::{
    email_format, is_strong_password, is_valid_date, is_valid_email, parse_date, password_policy,
};
use crate::prelude::{AppError, Result};

pub const MAX_PROFILE_SKILLS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    pub title: String,
    pub company: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub current: bool,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    pub school: String,
    pub degree: String,
    pub field_of_study: String,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Proficiency {
    #[default]
    Basic,
    Conversational,
    Fluent,
    Native,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Language {
    pub name: String,
    pub proficiency: Proficiency,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Certificate {
    pub name: String,
    pub issuer: String,
    pub issue_date: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortfolioItem {
    pub title: String,
    pub description: String,
    pub url: String,
}

/// Staged freelancer sign-up form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationDraft {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(custom(function = "email_format"))]
    pub email: String,
    #[validate(custom(function = "password_policy"))]
    pub password: String,
    pub profile_picture: Option<String>,
    #[validate(length(min = 1, message = "Professional title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(range(exclusive_min = 0.0, message = "Hourly rate must be greater than 0"))]
    pub hourly_rate: f64,
    #[validate(length(min = 1, max = 5, message = "Select between 1 and 5 skills"))]
    pub skills: Vec<String>,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub languages: Vec<Language>,
    pub certificates: Vec<Certificate>,
    pub portfolio: Vec<PortfolioItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistrationStep {
    Account,
    Profile,
    Skills,
    Experience,
    Education,
    Languages,
    Credentials,
}

impl RegistrationStep {
    pub const ALL: [RegistrationStep; 7] = [
        RegistrationStep::Account,
        RegistrationStep::Profile,
        RegistrationStep::Skills,
        RegistrationStep::Experience,
        RegistrationStep::Education,
        RegistrationStep::Languages,
        RegistrationStep::Credentials,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RegistrationStep::Account => "account",
            RegistrationStep::Profile => "profile",
            RegistrationStep::Skills => "skills",
            RegistrationStep::Experience => "experience",
            RegistrationStep::Education => "education",
            RegistrationStep::Languages => "languages",
            RegistrationStep::Credentials => "credentials",
        }
    }
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

impl Experience {
    fn check(&self, n: usize) -> StepValidation {
        if blank(&self.title) || blank(&self.company) {
            return StepValidation::fail(format!("Experience {} needs a title and a company", n));
        }
        let Some(start) = parse_date(&self.start_date) else {
            return StepValidation::fail(format!("Experience {} needs a valid start date", n));
        };
        if self.current {
            return StepValidation::ok();
        }
        match self.end_date.as_deref().map(parse_date) {
            Some(Some(end)) if end >= start => StepValidation::ok(),
            Some(Some(_)) => StepValidation::fail(format!(
                "Experience {} ends before it starts",
                n
            )),
            _ => StepValidation::fail(format!(
                "Experience {} needs an end date unless it is your current position",
                n
            )),
        }
    }
}

impl Education {
    fn check(&self, n: usize) -> StepValidation {
        if blank(&self.school) || blank(&self.degree) {
            return StepValidation::fail(format!("Education {} needs a school and a degree", n));
        }
        match (self.start_year, self.end_year) {
            (Some(start), Some(end)) if end < start => {
                StepValidation::fail(format!("Education {} ends before it starts", n))
            }
            _ => StepValidation::ok(),
        }
    }
}

impl Staged for RegistrationDraft {
    type Step = RegistrationStep;

    fn steps() -> &'static [RegistrationStep] {
        &RegistrationStep::ALL
    }

    fn validate_step(&self, step: RegistrationStep) -> StepValidation {
        match step {
            RegistrationStep::Account => {
                if blank(&self.name) {
                    StepValidation::fail("Name is required")
                } else if !is_valid_email(&self.email) {
                    StepValidation::fail("Please enter a valid email")
                } else if !is_strong_password(&self.password) {
                    StepValidation::fail(
                        "Password must be at least 8 characters and contain an uppercase letter, a lowercase letter and a number",
                    )
                } else {
                    StepValidation::ok()
                }
            }
            RegistrationStep::Profile => {
                if blank(&self.title) {
                    StepValidation::fail("Professional title is required")
                } else if blank(&self.description) {
                    StepValidation::fail("Description is required")
                } else if self.hourly_rate.is_nan() || self.hourly_rate <= 0.0 {
                    StepValidation::fail("Hourly rate must be greater than 0")
                } else {
                    StepValidation::ok()
                }
            }
            RegistrationStep::Skills => match self.skills.len() {
                0 => StepValidation::fail("Add at least one skill"),
                n if n > MAX_PROFILE_SKILLS => StepValidation::fail("You can add at most 5 skills"),
                _ => StepValidation::ok(),
            },
            RegistrationStep::Experience => self
                .experience
                .iter()
                .enumerate()
                .map(|(i, e)| e.check(i + 1))
                .find(|v| !v.is_valid)
                .unwrap_or_else(StepValidation::ok),
            RegistrationStep::Education => self
                .education
                .iter()
                .enumerate()
                .map(|(i, e)| e.check(i + 1))
                .find(|v| !v.is_valid)
                .unwrap_or_else(StepValidation::ok),
            RegistrationStep::Languages => {
                if self.languages.is_empty() {
                    StepValidation::fail("Add at least one language")
                } else if let Some(i) = self.languages.iter().position(|l| blank(&l.name)) {
                    StepValidation::fail(format!("Language {} needs a name", i + 1))
                } else {
                    StepValidation::ok()
                }
            }
            RegistrationStep::Credentials => {
                if let Some(i) = self
                    .certificates
                    .iter()
                    .position(|c| blank(&c.name) || blank(&c.issuer) || !is_valid_date(&c.issue_date))
                {
                    return StepValidation::fail(format!(
                        "Certificate {} needs a name, an issuer and a valid issue date",
                        i + 1
                    ));
                }
                match self
                    .portfolio
                    .iter()
                    .position(|p| blank(&p.title) || blank(&p.url))
                {
                    Some(i) => StepValidation::fail(format!("Portfolio item {} needs a title and a link", i + 1)),
                    None => StepValidation::ok(),
                }
            }
        }
    }
}

impl RegistrationDraft {
    /// Skill picker entry; duplicates and entries past the cap are dropped.
    pub fn add_skill(&mut self, skill: &str) -> bool {
        push_unique(&mut self.skills, skill, MAX_PROFILE_SKILLS)
    }

    pub fn update_experience(&self, index: usize, entry: Experience) -> Result<Self> {
        let mut next = self.clone();
        *next
            .experience
            .get_mut(index)
            .ok_or_else(|| AppError::field("experience", format!("No entry at position {}", index)))? = entry;
        Ok(next)
    }

    pub fn update_education(&self, index: usize, entry: Education) -> Result<Self> {
        let mut next = self.clone();
        *next
            .education
            .get_mut(index)
            .ok_or_else(|| AppError::field("education", format!("No entry at position {}", index)))? = entry;
        Ok(next)
    }

    /// Every step plus the field checks; failures keyed by field or step name.
    pub fn validate_all(&self) -> Result<()> {
        let mut fields = BTreeMap::new();
        if let Err(errs) = self.validate() {
            if let AppError::Validation(map) = AppError::from(errs) {
                fields.extend(map);
            }
        }
        for step in RegistrationStep::ALL {
            if let StepValidation {
                is_valid: false,
                error: Some(error),
            } = self.validate_step(step)
            {
                fields.entry(step.name().to_string()).or_insert(error);
            }
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(fields))
        }
    }
}
