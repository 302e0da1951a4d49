//! The (type, zone, pricing-mode) cross-product a job may choose from.

use cloud::types::{CandidateRequest, InstanceType};
use queue::job::Job;

/// Build the full candidate list for a job and order it cheapest-first.
///
/// Every eligible type contributes one on-demand candidate; spot
/// candidates are added per priced zone unless the job demands fixed-price
/// capacity. The sort is stable, so equal prices keep insertion order.
pub fn sorted_candidates(eligible: &[&InstanceType], job: &Job) -> Vec<CandidateRequest> {
    let mut candidates = Vec::new();
    for instance in eligible {
        candidates.push(CandidateRequest::ondemand(instance));
        if !job.ondemand {
            for (zone, price) in &instance.spot {
                candidates.push(CandidateRequest::spot(instance, zone, *price));
            }
        }
    }
    candidates.sort_by(|a, b| a.price.total_cmp(&b.price));
    candidates
}
