//! Reconciles the idle set against the request ledger before any
//! selection happens: fulfilled jobs drain out, over-requested jobs back
//! off.

use tracing::{debug, error, warn};

use ledger::store::LedgerStore;
use queue::workload::Workload;

use crate::types::ProvisionConfig;

/// Run both reconciliation phases for one tenant's workload.
///
/// Ledger read failures are logged and treated as "no data": a job is then
/// considered not yet fulfilled and not yet requested, and the request cap
/// still bounds the damage.
pub async fn reconcile(store: &dyn LedgerStore, workload: &mut Workload, cfg: &ProvisionConfig) {
    mark_fulfilled(store, workload).await;
    throttle(store, workload, cfg).await;
}

/// Phase A: flag jobs whose ledger entries have produced enough capacity
/// and drop them from the idle set.
async fn mark_fulfilled(store: &dyn LedgerStore, workload: &mut Workload) {
    let tenant = workload.tenant.db_id;

    for job in workload.idle.iter_mut() {
        let cpus = match store.fulfilled_cpus(tenant, job.id).await {
            Ok(cpus) => cpus,
            Err(e) => {
                error!(job = job.id, error = %e, "fulfilment query failed, assuming none");
                0
            }
        };
        if cpus >= job.req_cpus as i64 {
            job.fulfilled = true;
        }

        // Any fulfilled on-demand request satisfies the job outright,
        // regardless of its CPU count.
        match store.ondemand_fulfilled(tenant, job.id).await {
            Ok(true) => job.fulfilled = true,
            Ok(false) => {}
            Err(e) => {
                error!(job = job.id, error = %e, "fulfilment query failed, assuming none");
            }
        }
    }

    workload.idle.retain(|job| {
        if job.fulfilled {
            debug!(job = job.id, "job fulfilled, leaving the idle set");
        }
        !job.fulfilled
    });
}

/// Phase B: drop jobs that were requested for within the rate window, and
/// jobs that have exhausted their lifetime request budget.
async fn throttle(store: &dyn LedgerStore, workload: &mut Workload, cfg: &ProvisionConfig) {
    let tenant = workload.tenant.db_id;
    let rate = workload.tenant.request_rate;

    let mut kept = Vec::with_capacity(workload.idle.len());
    for job in workload.idle.drain(..) {
        let recent = match store.requests_since(tenant, job.id, rate).await {
            Ok(count) => count,
            Err(e) => {
                error!(job = job.id, error = %e, "request-rate query failed, assuming none");
                0
            }
        };
        if recent > 0 {
            debug!(job = job.id, "requested within the rate window, backing off");
            continue;
        }

        let total = match store.total_requests(tenant, job.id).await {
            Ok(count) => count,
            Err(e) => {
                error!(job = job.id, error = %e, "request-count query failed, assuming none");
                0
            }
        };
        if total > cfg.max_requests {
            warn!(
                job = job.id,
                total, "too many outstanding requests, dropping idle job"
            );
            continue;
        }

        kept.push(job);
    }
    workload.idle = kept;
}
