use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;

use super::{ApiClient, ClientError, ClientResult, precheck};
use crate::pkg::internal::{
    adaptors::jobs::spec::JobEntry,
    workflow::{JobDraft, Payload, encode},
};

/// Anything that accepts an encoded job post.
#[allow(async_fn_in_trait)]
pub trait JobSink {
    async fn post_payload(&self, payload: Payload) -> ClientResult<JobEntry>;
}

impl JobSink for ApiClient {
    async fn post_payload(&self, payload: Payload) -> ClientResult<JobEntry> {
        ApiClient::post_payload(self, payload).await
    }
}

/// Last submission wins: every attempt takes a generation, and an answer
/// that comes back after a newer attempt started is reported as
/// [`ClientError::Superseded`] instead of being returned.
pub struct Submitter<S> {
    sink: S,
    generation: AtomicU64,
}

impl<S: JobSink> Submitter<S> {
    pub fn new(sink: S) -> Self {
        Submitter {
            sink,
            generation: AtomicU64::new(0),
        }
    }

    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn submit(&self, draft: &JobDraft, today: NaiveDate) -> ClientResult<JobEntry> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        precheck(draft, today)?;
        let result = self.sink.post_payload(encode(draft)?).await;
        if self.current() != ticket {
            tracing::debug!("dropping answer of submission {}", ticket);
            return Err(ClientError::Superseded);
        }
        result
    }
}
