pub mod auth;
pub mod bids;
pub mod chat;
pub mod jobs;
pub mod messages;
pub mod probes;
pub mod upload;
