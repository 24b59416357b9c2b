pub mod adaptors;
pub mod auth;
pub mod bids;
pub mod chat;
pub mod errors;
pub mod minio;
pub mod validation;
pub mod workflow;
