use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use cloud::types::InstanceType;
use ledger::model::{OpenRequest, RequestRecord, Tenant};
use ledger::store::LedgerStore;

/// In-memory ledger with scripted query answers, keyed by job id.
#[derive(Default)]
pub struct MockLedger {
    pub fulfilled_cpus: HashMap<i64, i64>,
    pub ondemand_fulfilled: HashMap<i64, bool>,
    pub recent_requests: HashMap<i64, i64>,
    pub total_requests: HashMap<i64, i64>,
    pub open_requests: HashMap<i64, Vec<OpenRequest>>,
    pub fail_reads: bool,
    pub records: Mutex<Vec<RequestRecord>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_open(mut self, job: i64, sku: &str, zone: &str) -> Self {
        self.open_requests.entry(job).or_default().push(OpenRequest {
            sku: sku.into(),
            zone: zone.into(),
        });
        self
    }
}

#[async_trait]
impl LedgerStore for MockLedger {
    async fn load_tenants(&self) -> anyhow::Result<Vec<Tenant>> {
        Ok(Vec::new())
    }

    async fn load_instance_types(&self) -> anyhow::Result<Vec<InstanceType>> {
        Ok(Vec::new())
    }

    async fn fulfilled_cpus(&self, _tenant: i32, job: i64) -> anyhow::Result<i64> {
        if self.fail_reads {
            anyhow::bail!("ledger unavailable");
        }
        Ok(self.fulfilled_cpus.get(&job).copied().unwrap_or(0))
    }

    async fn ondemand_fulfilled(&self, _tenant: i32, job: i64) -> anyhow::Result<bool> {
        if self.fail_reads {
            anyhow::bail!("ledger unavailable");
        }
        Ok(self.ondemand_fulfilled.get(&job).copied().unwrap_or(false))
    }

    async fn requests_since(
        &self,
        _tenant: i32,
        job: i64,
        _window_secs: i64,
    ) -> anyhow::Result<i64> {
        if self.fail_reads {
            anyhow::bail!("ledger unavailable");
        }
        Ok(self.recent_requests.get(&job).copied().unwrap_or(0))
    }

    async fn total_requests(&self, _tenant: i32, job: i64) -> anyhow::Result<i64> {
        if self.fail_reads {
            anyhow::bail!("ledger unavailable");
        }
        Ok(self.total_requests.get(&job).copied().unwrap_or(0))
    }

    async fn open_requests(&self, _tenant: i32, job: i64) -> anyhow::Result<Vec<OpenRequest>> {
        if self.fail_reads {
            anyhow::bail!("ledger unavailable");
        }
        Ok(self.open_requests.get(&job).cloned().unwrap_or_default())
    }

    async fn record_request(&self, record: &RequestRecord) -> anyhow::Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
