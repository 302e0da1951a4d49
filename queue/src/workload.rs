//! Per-tick working sets.

use crate::job::{Job, STATUS_IDLE};
use ledger::model::Tenant;

/// Everything the loop tracks for one tenant during a tick: the full
/// observed queue plus the idle candidates still in the running for
/// provisioning. Both sets are rebuilt from scratch every tick.
#[derive(Debug, Clone)]
pub struct Workload {
    pub tenant: Tenant,
    pub jobs: Vec<Job>,
    pub idle: Vec<Job>,
}

impl Workload {
    pub fn new(tenant: Tenant) -> Self {
        Self {
            tenant,
            jobs: Vec::new(),
            idle: Vec::new(),
        }
    }
}

/// Attach each queued job to its owning tenant, collecting the idle jobs
/// that have waited long enough to be provisioned for.
pub fn process_global_queue(jobs: &[Job], tenants: &[Tenant], now: i64) -> Vec<Workload> {
    tenants
        .iter()
        .map(|tenant| {
            let oldest_acceptable = now - tenant.idle_time;
            let mut workload = Workload::new(tenant.clone());
            for job in jobs {
                if job.tenant_address != tenant.condor_address {
                    continue;
                }
                workload.jobs.push(job.clone());
                if job.status == STATUS_IDLE && job.req_time <= oldest_acceptable {
                    workload.idle.push(job.clone());
                }
            }
            workload
        })
        .collect()
}
