//! Turns selected launches into cloud requests and ledger entries.

use tokio::time::{Duration, sleep};
use tracing::{debug, error, info};

use cloud::api::{
    CloudApi, Credentials, RequestSpotInstances, RunInstances, worker_block_devices,
};
use cloud::types::CandidateRequest;
use cloud::userdata;
use ledger::model::{RequestKind, RequestRecord, Tenant};
use ledger::store::LedgerStore;
use queue::job::Job;
use queue::workload::Workload;

const TAG_ATTEMPTS: u32 = 3;
const TAG_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Issue the chosen request for every job in the workload that has one.
///
/// Each placed cloud request is recorded in the ledger before the next job
/// is considered, so a crash mid-pass leaves the ledger consistent with
/// the cloud. A cloud failure skips the job for this tick; the next tick
/// re-evaluates it.
pub async fn request_resources(
    api: &dyn CloudApi,
    store: &dyn LedgerStore,
    workload: &Workload,
    user_data_template: &str,
) {
    let tenant = &workload.tenant;
    let creds = tenant.credentials();

    let mut requested_instances = 0i64;
    let mut requested_cpus = 0i64;

    for job in &workload.idle {
        if job.fulfilled {
            continue;
        }
        let Some(launch) = &job.launch else {
            debug!(job = job.id, "no request selected for job");
            continue;
        };

        requested_instances += launch.count;
        requested_cpus += i64::from(job.req_cpus);

        let user_data = userdata::render(
            user_data_template,
            &tenant.public_ip,
            launch.instance.cpus,
            &tenant.domain,
        );

        if launch.ondemand {
            launch_ondemand(api, store, &creds, tenant, job, launch, user_data).await;
        } else {
            launch_spot(api, store, &creds, tenant, job, launch, user_data).await;
        }
    }

    debug!(
        tenant = %tenant.name,
        instances = requested_instances,
        cpus = requested_cpus,
        "request pass complete"
    );
}

async fn launch_ondemand(
    api: &dyn CloudApi,
    store: &dyn LedgerStore,
    creds: &Credentials,
    tenant: &Tenant,
    job: &Job,
    launch: &CandidateRequest,
    user_data: String,
) {
    let params = RunInstances {
        count: launch.count,
        sku: launch.sku.clone(),
        ami: launch.ami.clone(),
        key_pair: tenant.key_pair.clone(),
        security_group: tenant.security_group.clone(),
        subnet: tenant.subnet.clone(),
        user_data,
        block_devices: worker_block_devices(),
    };

    let ids = match api.run_instances(creds, params).await {
        Ok(ids) => ids,
        Err(e) => {
            error!(job = job.id, error = %e, "on-demand launch failed, skipping job this tick");
            return;
        }
    };

    for id in ids {
        tag_request(api, creds, &id, &tenant.name).await;

        let record = RequestRecord {
            tenant: tenant.db_id,
            instance_type: launch.instance.db_id,
            price: launch.odp,
            job_runner_id: job.id,
            kind: RequestKind::Ondemand,
            request_id: id.clone(),
            subnet: tenant.subnet_db_id,
        };
        if let Err(e) = store.record_request(&record).await {
            error!(job = job.id, request = %id, error = %e,
                   "placed request could not be recorded in the ledger");
        }
        info!(tenant = %tenant.name, sku = %launch.sku, job = job.id, request = %id,
              price = launch.odp, "placed on-demand request");
    }
}

async fn launch_spot(
    api: &dyn CloudApi,
    store: &dyn LedgerStore,
    creds: &Credentials,
    tenant: &Tenant,
    job: &Job,
    launch: &CandidateRequest,
    user_data: String,
) {
    let (Some(subnet), Some(subnet_db_id)) = (
        tenant.subnets.get(&launch.zone),
        tenant.subnets_db_id.get(&launch.zone).copied(),
    ) else {
        error!(job = job.id, zone = %launch.zone, "no subnet mapped for zone, skipping job");
        return;
    };

    let params = RequestSpotInstances {
        bid: launch.bid,
        count: launch.count,
        sku: launch.sku.clone(),
        ami: launch.ami.clone(),
        key_pair: tenant.key_pair.clone(),
        security_group: tenant.security_group.clone(),
        subnet: subnet.clone(),
        user_data,
        block_devices: worker_block_devices(),
    };

    let ids = match api.request_spot_instances(creds, params).await {
        Ok(ids) => ids,
        Err(e) => {
            error!(job = job.id, error = %e, "spot request failed, skipping job this tick");
            return;
        }
    };

    for id in ids {
        tag_request(api, creds, &id, &tenant.name).await;

        let record = RequestRecord {
            tenant: tenant.db_id,
            instance_type: launch.instance.db_id,
            price: launch.bid,
            job_runner_id: job.id,
            kind: RequestKind::Spot,
            request_id: id.clone(),
            subnet: subnet_db_id,
        };
        if let Err(e) = store.record_request(&record).await {
            error!(job = job.id, request = %id, error = %e,
                   "placed request could not be recorded in the ledger");
        }
        info!(tenant = %tenant.name, sku = %launch.sku, zone = %launch.zone, job = job.id,
              request = %id, bid = launch.bid, "placed spot request");
    }
}

/// Apply the tenant and Name tags to a fresh request id, retrying
/// transient failures. Final failure is logged and swallowed; an untagged
/// worker still works.
async fn tag_request(api: &dyn CloudApi, creds: &Credentials, id: &str, tenant_name: &str) {
    let ids = [id.to_string()];
    let tags = [
        ("tenant".to_string(), tenant_name.to_string()),
        ("Name".to_string(), format!("worker@{tenant_name}")),
    ];

    for attempt in 1..=TAG_ATTEMPTS {
        match api.create_tags(creds, &ids, &tags).await {
            Ok(()) => return,
            Err(e) if e.is_transient() && attempt < TAG_ATTEMPTS => {
                debug!(request = id, attempt, error = %e, "tagging failed, retrying");
                sleep(TAG_RETRY_DELAY).await;
            }
            Err(e) => {
                error!(request = id, error = %e, "giving up on tagging request");
                return;
            }
        }
    }
}
