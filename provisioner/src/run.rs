//! The periodic provisioning loop.
//!
//! Per tick: load tenants, probe the queue, reconcile against the ledger,
//! refresh the catalog and spot prices, select one request per idle job,
//! place the requests, reconcile once more. Nothing in a tick is fatal;
//! the loop converges over successive ticks.

use chrono::Utc;
use tokio::time::{Duration, sleep};
use tracing::{Instrument, debug, error, info};

use cloud::api::CloudApi;
use cloud::pricing::refresh_spot_prices;
use common::logger::{TickId, tick_span};
use ledger::store::LedgerStore;
use planner::reconcile::reconcile;
use planner::selector::select_requests;
use planner::types::ProvisionConfig;
use queue::probe::QueueProbe;
use queue::workload::process_global_queue;
use requester::launch::request_resources;

/// Drive ticks forever, `run_rate` seconds apart, until the operator
/// interrupts the process.
pub async fn run(
    api: &dyn CloudApi,
    store: &dyn LedgerStore,
    probe: &dyn QueueProbe,
    cfg: &ProvisionConfig,
    user_data_template: &str,
) -> anyhow::Result<()> {
    info!(run_rate = cfg.run_rate, "provisioner started");

    loop {
        let tick_id = TickId::new();
        tick(api, store, probe, cfg, user_data_template)
            .instrument(tick_span(&tick_id))
            .await;

        tokio::select! {
            _ = sleep(Duration::from_secs(cfg.run_rate)) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                return Ok(());
            }
        }
    }
}

async fn tick(
    api: &dyn CloudApi,
    store: &dyn LedgerStore,
    probe: &dyn QueueProbe,
    cfg: &ProvisionConfig,
    user_data_template: &str,
) {
    let now = Utc::now().timestamp();

    let tenants = match store.load_tenants().await {
        Ok(tenants) => tenants,
        Err(e) => {
            error!(error = %e, "failed to load tenants");
            return;
        }
    };

    let jobs = match probe.global_queue().await {
        Ok(jobs) => jobs,
        Err(e) => {
            error!(error = %e, "failed to read the job queue");
            return;
        }
    };

    let mut workloads = process_global_queue(&jobs, &tenants, now);
    for workload in workloads.iter() {
        debug!(
            tenant = %workload.tenant.name,
            jobs = workload.jobs.len(),
            idle = workload.idle.len(),
            "queue observed"
        );
    }
    for workload in workloads.iter_mut() {
        reconcile(store, workload, cfg).await;
    }

    if tenants.is_empty() {
        debug!("no tenants loaded, skipping provisioning");
        return;
    }

    let mut catalog = match store.load_instance_types().await {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(error = %e, "failed to load the instance catalog");
            return;
        }
    };

    // Spot prices are fetched once per tick with the first tenant's
    // credentials.
    let creds = tenants[0].credentials();
    refresh_spot_prices(api, &creds, &mut catalog).await;

    for workload in workloads.iter_mut() {
        select_requests(store, workload, &catalog, cfg, now).await;
    }
    for workload in workloads.iter() {
        request_resources(api, store, workload, user_data_template).await;
    }
    for workload in workloads.iter_mut() {
        reconcile(store, workload, cfg).await;
    }

    debug!("tick complete");
}
