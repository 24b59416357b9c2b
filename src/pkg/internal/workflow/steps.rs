use serde::{Deserialize, Serialize};

use super::job_draft::JobDraft;

/// Outcome of a single step check. Every staged flow reports this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepValidation {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepValidation {
    pub fn ok() -> Self {
        StepValidation {
            is_valid: true,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        StepValidation {
            is_valid: false,
            error: Some(error.into()),
        }
    }

    fn check(cond: bool, error: &str) -> Self {
        if cond { Self::ok() } else { Self::fail(error) }
    }
}

/// A draft that is filled in over an ordered list of steps.
pub trait Staged {
    type Step: Copy + PartialEq + std::fmt::Debug + 'static;

    fn steps() -> &'static [Self::Step];

    fn validate_step(&self, step: Self::Step) -> StepValidation;

    /// First failing step, if any.
    fn first_invalid(&self) -> Option<(Self::Step, StepValidation)> {
        Self::steps()
            .iter()
            .map(|s| (*s, self.validate_step(*s)))
            .find(|(_, v)| !v.is_valid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStep {
    BasicDetails,
    Skills,
    BudgetTimeline,
    AttachmentsVisibility,
    Preview,
}

impl JobStep {
    pub const ALL: [JobStep; 5] = [
        JobStep::BasicDetails,
        JobStep::Skills,
        JobStep::BudgetTimeline,
        JobStep::AttachmentsVisibility,
        JobStep::Preview,
    ];
}

impl Staged for JobDraft {
    type Step = JobStep;

    fn steps() -> &'static [JobStep] {
        &JobStep::ALL
    }

    fn validate_step(&self, step: JobStep) -> StepValidation {
        match step {
            JobStep::BasicDetails => {
                if self.title.trim().is_empty() {
                    StepValidation::fail("Job title is required")
                } else {
                    StepValidation::check(
                        !self.description.trim().is_empty(),
                        "Job description is required",
                    )
                }
            }
            JobStep::Skills => {
                StepValidation::check(!self.skills.is_empty(), "Add at least one skill")
            }
            JobStep::BudgetTimeline => {
                if self.budget.is_nan() || self.budget <= 0.0 {
                    return StepValidation::fail("Budget must be greater than 0");
                }
                if self.deadline.is_none() {
                    return StepValidation::fail("Deadline is required");
                }
                if !self.is_crowdsourced {
                    return StepValidation::ok();
                }
                if self.crowdsourcing_roles.is_empty() {
                    return StepValidation::fail("Add at least one role for a crowdsourced job");
                }
                match self
                    .crowdsourcing_roles
                    .iter()
                    .position(|r| !r.is_complete())
                {
                    Some(idx) => StepValidation::fail(format!(
                        "Role {} needs a title, a description, at least one skill and a budget greater than 0",
                        idx + 1
                    )),
                    None => StepValidation::ok(),
                }
            }
            JobStep::AttachmentsVisibility | JobStep::Preview => StepValidation::ok(),
        }
    }
}

/// Step navigation over a [`Staged`] draft. Moving forward is gated on the
/// current step; moving back never is.
#[derive(Debug, Clone)]
pub struct Wizard<D: Staged> {
    pub draft: D,
    current: usize,
}

impl<D: Staged> Wizard<D> {
    pub fn new(draft: D) -> Self {
        Wizard { draft, current: 0 }
    }

    pub fn index(&self) -> usize {
        self.current
    }

    pub fn step(&self) -> D::Step {
        D::steps()[self.current]
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == D::steps().len()
    }

    pub fn next(&mut self) -> StepValidation {
        let outcome = self.draft.validate_step(self.step());
        if outcome.is_valid && !self.is_last() {
            self.current += 1;
        }
        outcome
    }

    pub fn back(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    pub fn into_draft(self) -> D {
        self.draft
    }
}
