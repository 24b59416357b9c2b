use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pkg::internal::adaptors::bids::spec::BidEntry;
use crate::pkg::internal::adaptors::jobs::spec::JobEntry;

pub const NO_BIDS_FOR_ROLE: &str = "No bids for this role";
pub const NO_BIDS_FOR_JOB: &str = "No bids for this job yet";

/// Anything bids can be placed against.
pub trait BidTarget {
    fn is_crowdsourced(&self) -> bool;
    fn role_titles(&self) -> Vec<String>;
}

impl BidTarget for JobEntry {
    fn is_crowdsourced(&self) -> bool {
        self.is_crowdsourced
    }

    fn role_titles(&self) -> Vec<String> {
        self.crowdsourcing_roles
            .0
            .iter()
            .map(|r| r.title.clone())
            .collect()
    }
}

/// Bids for a job as the API returns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobBids {
    ByRole(BTreeMap<String, Vec<BidEntry>>),
    Flat(Vec<BidEntry>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BidList {
    Bids(Vec<BidEntry>),
    NoBids(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BidView {
    ByRole(BTreeMap<String, BidList>),
    Job(BidList),
}

fn by_role(bids: Vec<BidEntry>) -> BTreeMap<String, Vec<BidEntry>> {
    let mut grouped: BTreeMap<String, Vec<BidEntry>> = BTreeMap::new();
    for bid in bids {
        if let Some(role) = bid.role.clone() {
            grouped.entry(role).or_default().push(bid);
        }
    }
    grouped
}

/// Arranges stored bids in the shape the job calls for. Every declared role
/// of a crowdsourced job gets an entry, even without bids.
pub fn organize_bids<J: BidTarget + ?Sized>(job: &J, bids: Vec<BidEntry>) -> JobBids {
    if !job.is_crowdsourced() {
        return JobBids::Flat(bids);
    }
    let mut grouped = by_role(bids);
    for title in job.role_titles() {
        grouped.entry(title).or_default();
    }
    JobBids::ByRole(grouped)
}

/// Read-time view of a job's bids with explicit "no bids" markers.
pub fn group_bids<J: BidTarget + ?Sized>(job: &J, bids: JobBids) -> BidView {
    let list = |bids: Vec<BidEntry>, marker: &'static str| {
        if bids.is_empty() {
            BidList::NoBids(marker)
        } else {
            BidList::Bids(bids)
        }
    };
    if job.is_crowdsourced() {
        let grouped = match bids {
            JobBids::ByRole(grouped) => grouped,
            JobBids::Flat(flat) => by_role(flat),
        };
        BidView::ByRole(
            grouped
                .into_iter()
                .map(|(role, bids)| (role, list(bids, NO_BIDS_FOR_ROLE)))
                .collect(),
        )
    } else {
        let flat = match bids {
            JobBids::Flat(flat) => flat,
            JobBids::ByRole(grouped) => grouped.into_values().flatten().collect(),
        };
        BidView::Job(list(flat, NO_BIDS_FOR_JOB))
    }
}
