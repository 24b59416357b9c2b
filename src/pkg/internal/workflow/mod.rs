pub mod encode;
pub mod job_draft;
pub mod registration;
pub mod steps;

pub use encode::{Payload, decode_fields, encode};
pub use job_draft::{JobDraft, JobField, Role, RoleField};
pub use registration::{RegistrationDraft, RegistrationStep};
pub use steps::{JobStep, Staged, StepValidation, Wizard};
