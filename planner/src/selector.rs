//! Chooses exactly one instance request for each idle job.

use tracing::{debug, error, info};

use cloud::types::{CandidateRequest, InstanceType};
use ledger::model::Tenant;
use ledger::store::LedgerStore;
use queue::workload::Workload;

use crate::candidates::sorted_candidates;
use crate::eligibility::eligible_instances;
use crate::escalation::check_ondemand_needed;
use crate::types::ProvisionConfig;

/// Walk every idle job in insertion order and set `job.launch` to the
/// single cheapest viable request, escalating to on-demand where policy
/// demands it. Jobs that already carry the open-request cap are dropped
/// from the idle set.
pub async fn select_requests(
    store: &dyn LedgerStore,
    workload: &mut Workload,
    catalog: &[InstanceType],
    cfg: &ProvisionConfig,
    now: i64,
) {
    let tenant = workload.tenant.clone();

    let mut i = 0;
    while i < workload.idle.len() {
        let job = &mut workload.idle[i];

        let eligible = eligible_instances(catalog, job);
        if eligible.is_empty() {
            error!(job = job.id, "no eligible instance type for job");
            i += 1;
            continue;
        }

        let sorted = sorted_candidates(&eligible, job);
        if sorted.is_empty() {
            error!(job = job.id, "no candidate requests for job");
            i += 1;
            continue;
        }

        let escalation = check_ondemand_needed(&tenant, &eligible, &sorted, job, cfg, now);
        if escalation.is_needed() {
            // Rebuild with the job flagged on-demand, which excludes spot;
            // the cheapest remaining candidate is the launch.
            job.ondemand = true;
            let ondemand_only = sorted_candidates(&eligible, job);
            debug!(job = job.id, reason = ?escalation, "escalating to on-demand");
            job.launch = ondemand_only.into_iter().next();
            i += 1;
            continue;
        }

        log_cheapest(&sorted);

        let existing = match store.open_requests(tenant.db_id, job.id).await {
            Ok(open) => open,
            Err(e) => {
                error!(job = job.id, error = %e, "open-request query failed, assuming none");
                Vec::new()
            }
        };
        if existing.len() as i64 >= cfg.max_requests {
            debug!(job = job.id, open = existing.len(), "open-request cap reached, dropping job");
            workload.idle.remove(i);
            continue;
        }

        let mut chosen: Option<CandidateRequest> = None;
        for candidate in &sorted {
            let already_open = existing
                .iter()
                .any(|open| open.sku == candidate.sku && open.zone == candidate.zone);
            if already_open {
                debug!(job = job.id, sku = %candidate.sku, zone = %candidate.zone,
                       "request already open, skipping candidate");
                continue;
            }

            if candidate.price < tenant.max_bid_price {
                match bid_price(&tenant, candidate, cfg) {
                    Some(bid) => {
                        let mut launch = candidate.clone();
                        launch.bid = bid;
                        chosen = Some(launch);
                        break;
                    }
                    None => {
                        error!(job = job.id, sku = %candidate.sku,
                               "bid floor exceeds the tenant cap, rejecting candidate");
                    }
                }
            } else {
                error!(job = job.id, sku = %candidate.sku, zone = %candidate.zone,
                       price = candidate.price, cap = tenant.max_bid_price,
                       "candidate priced at or above the bid cap");
            }
        }

        if let Some(launch) = chosen {
            info!(job = job.id, sku = %launch.sku, zone = %launch.zone, bid = launch.bid,
                  "selected spot request");
            job.launch = Some(launch);
        }
        i += 1;
    }
}

/// Percentage-of-on-demand bid, bounded by the tenant cap. A bid above the
/// cap falls back to the configured floor; a floor above the cap
/// disqualifies the candidate.
fn bid_price(tenant: &Tenant, candidate: &CandidateRequest, cfg: &ProvisionConfig) -> Option<f64> {
    let bid = tenant.bid_percent / 100.0 * candidate.odp;
    if bid <= tenant.max_bid_price {
        Some(bid)
    } else if cfg.bid_floor <= tenant.max_bid_price {
        Some(cfg.bid_floor)
    } else {
        None
    }
}

/// Log the three cheapest options for operator visibility.
fn log_cheapest(sorted: &[CandidateRequest]) {
    for candidate in sorted.iter().take(3) {
        debug!(sku = %candidate.sku, zone = %candidate.zone, price = candidate.price, "candidate");
    }
}
