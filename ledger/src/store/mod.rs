pub mod pg_store;

use crate::model::{OpenRequest, RequestRecord, Tenant};
use cloud::types::InstanceType;

/// Durable state behind the provisioning loop: tenants, the instance
/// catalog, and the append-only request ledger.
///
/// A request counts as *fulfilled* once an instance row has been linked to
/// it by the external collaborator that watches the cloud.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    async fn load_tenants(&self) -> anyhow::Result<Vec<Tenant>>;
    async fn load_instance_types(&self) -> anyhow::Result<Vec<InstanceType>>;

    /// Total CPUs supplied by fulfilled requests for the job.
    async fn fulfilled_cpus(&self, tenant: i32, job: i64) -> anyhow::Result<i64>;

    /// Whether any fulfilled request for the job was on-demand.
    async fn ondemand_fulfilled(&self, tenant: i32, job: i64) -> anyhow::Result<bool>;

    /// Requests recorded for the job within the trailing window.
    async fn requests_since(&self, tenant: i32, job: i64, window_secs: i64)
    -> anyhow::Result<i64>;

    /// Lifetime request count for the job.
    async fn total_requests(&self, tenant: i32, job: i64) -> anyhow::Result<i64>;

    /// Outstanding (sku, zone) pairs already requested for the job.
    async fn open_requests(&self, tenant: i32, job: i64) -> anyhow::Result<Vec<OpenRequest>>;

    /// Append one ledger row; committed before this returns.
    async fn record_request(&self, record: &RequestRecord) -> anyhow::Result<()>;
}
