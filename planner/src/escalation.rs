//! Decides when a job must stop bidding and take fixed-price capacity.
//
//  This module is deliberately pure: no async, no IO.

use cloud::types::{CandidateRequest, InstanceType};
use ledger::model::Tenant;
use queue::job::Job;

use crate::types::ProvisionConfig;

/// Why a job was escalated to on-demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    None,
    /// The job has idled past the tenant's timeout.
    IdleTimeout,
    /// The job description demands fixed-price capacity.
    JobFlagged,
    /// The cheapest candidate is already on-demand.
    OndemandCheapest,
    /// The cheapest spot price is crowding the on-demand price.
    SpotNearOndemand,
}

impl Escalation {
    pub fn is_needed(&self) -> bool {
        !matches!(self, Escalation::None)
    }
}

/// Walk the escalation ladder for one job, in order: idle timeout, the
/// explicit job flag, on-demand already cheapest, spot near on-demand.
///
/// `sorted` must be the ascending-price candidate list; `now` is epoch
/// seconds.
pub fn check_ondemand_needed(
    tenant: &Tenant,
    eligible: &[&InstanceType],
    sorted: &[CandidateRequest],
    job: &Job,
    cfg: &ProvisionConfig,
    now: i64,
) -> Escalation {
    let Some(cheapest) = sorted.first() else {
        return Escalation::None;
    };

    if let Some(instance) = timed_out_fallback(tenant, eligible, job, now) {
        if instance.ondemand < tenant.max_bid_price {
            return Escalation::IdleTimeout;
        }
    }
    if job.ondemand {
        return Escalation::JobFlagged;
    }
    if cheapest.ondemand && cheapest.odp < tenant.max_bid_price {
        return Escalation::OndemandCheapest;
    }
    if cheapest.price > cfg.ondemand_price_threshold * cheapest.odp
        && cheapest.price < tenant.max_bid_price
    {
        return Escalation::SpotNearOndemand;
    }

    Escalation::None
}

/// The cheapest fixed-price type, if the job has idled past the tenant's
/// timeout. A timeout of zero disables the check.
fn timed_out_fallback<'a>(
    tenant: &Tenant,
    eligible: &'a [&InstanceType],
    job: &Job,
    now: i64,
) -> Option<&'a InstanceType> {
    if tenant.timeout <= 0 {
        return None;
    }
    if now - job.req_time <= tenant.timeout {
        return None;
    }
    eligible
        .iter()
        .copied()
        .min_by(|a, b| a.ondemand.total_cmp(&b.ondemand))
}
