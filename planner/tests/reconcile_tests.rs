mod mock_ledger;

use std::collections::HashMap;

use ledger::model::Tenant;
use mock_ledger::MockLedger;
use planner::reconcile::reconcile;
use planner::types::ProvisionConfig;
use queue::job::{Job, STATUS_IDLE};
use queue::workload::Workload;

fn cfg(max_requests: i64) -> ProvisionConfig {
    ProvisionConfig {
        ondemand_price_threshold: 0.8,
        max_requests,
        run_rate: 60,
        bid_floor: 0.40,
    }
}

fn mk_tenant(request_rate: i64) -> Tenant {
    Tenant {
        db_id: 1,
        name: "acme".into(),
        access_key: "AK".into(),
        secret_key: "SK".into(),
        vpc: "vpc-1".into(),
        security_group: "sg-1".into(),
        key_pair: "kp".into(),
        public_ip: "10.0.0.1".into(),
        domain: "example.org".into(),
        subnet: "subnet-default".into(),
        subnet_db_id: 10,
        subnets: HashMap::new(),
        subnets_db_id: HashMap::new(),
        max_bid_price: 0.50,
        bid_percent: 50.0,
        timeout: 0,
        idle_time: 0,
        request_rate,
        condor_address: "queue.example.org".into(),
    }
}

fn mk_job(id: i64, req_cpus: i32) -> Job {
    Job::new(
        "queue.example.org".into(),
        id,
        STATUS_IDLE,
        0,
        req_cpus,
        4.0,
        10.0,
        HashMap::new(),
    )
}

fn mk_workload(jobs: Vec<Job>) -> Workload {
    let mut workload = Workload::new(mk_tenant(60));
    workload.jobs = jobs.clone();
    workload.idle = jobs;
    workload
}

#[tokio::test]
async fn enough_fulfilled_cpus_drains_the_job() {
    // Two fulfilled requests of 2 cpus each cover the 4 requested.
    let mut store = MockLedger::new();
    store.fulfilled_cpus.insert(1, 4);

    let mut workload = mk_workload(vec![mk_job(1, 4)]);
    reconcile(&store, &mut workload, &cfg(3)).await;

    assert!(workload.idle.is_empty());
}

#[tokio::test]
async fn partial_fulfilment_keeps_the_job() {
    let mut store = MockLedger::new();
    store.fulfilled_cpus.insert(1, 2);

    let mut workload = mk_workload(vec![mk_job(1, 4)]);
    reconcile(&store, &mut workload, &cfg(3)).await;

    assert_eq!(workload.idle.len(), 1);
    assert!(!workload.idle[0].fulfilled);
}

#[tokio::test]
async fn any_ondemand_fulfilment_drains_the_job() {
    let mut store = MockLedger::new();
    // One fulfilled on-demand request, even with too few cpus.
    store.fulfilled_cpus.insert(1, 1);
    store.ondemand_fulfilled.insert(1, true);

    let mut workload = mk_workload(vec![mk_job(1, 4)]);
    reconcile(&store, &mut workload, &cfg(3)).await;

    assert!(workload.idle.is_empty());
}

#[tokio::test]
async fn recent_request_backs_the_job_off() {
    let mut store = MockLedger::new();
    store.recent_requests.insert(1, 1);

    let mut workload = mk_workload(vec![mk_job(1, 4)]);
    reconcile(&store, &mut workload, &cfg(3)).await;

    assert!(workload.idle.is_empty());
}

#[tokio::test]
async fn exhausted_request_budget_drops_the_job() {
    let mut store = MockLedger::new();
    store.total_requests.insert(1, 4);

    let mut workload = mk_workload(vec![mk_job(1, 4)]);
    reconcile(&store, &mut workload, &cfg(3)).await;

    assert!(workload.idle.is_empty());
}

#[tokio::test]
async fn budget_at_the_cap_is_still_allowed() {
    let mut store = MockLedger::new();
    store.total_requests.insert(1, 3);

    let mut workload = mk_workload(vec![mk_job(1, 4)]);
    reconcile(&store, &mut workload, &cfg(3)).await;

    assert_eq!(workload.idle.len(), 1);
}

#[tokio::test]
async fn untouched_jobs_survive_both_phases() {
    let store = MockLedger::new();

    let mut workload = mk_workload(vec![mk_job(1, 4), mk_job(2, 2)]);
    reconcile(&store, &mut workload, &cfg(3)).await;

    assert_eq!(workload.idle.len(), 2);
}

#[tokio::test]
async fn ledger_failures_keep_jobs_in_play() {
    // A dead ledger reads as "no data": nothing is fulfilled, nothing was
    // requested, so the job stays idle and eligible.
    let mut store = MockLedger::new();
    store.fail_reads = true;

    let mut workload = mk_workload(vec![mk_job(1, 4)]);
    reconcile(&store, &mut workload, &cfg(3)).await;

    assert_eq!(workload.idle.len(), 1);
}
