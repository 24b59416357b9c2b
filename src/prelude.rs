pub use crate::pkg::internal::errors::AppError;

pub type Result<T> = core::result::Result<T, AppError>;
