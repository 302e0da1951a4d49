use std::sync::Mutex;

use async_trait::async_trait;

use cloud::types::InstanceType;
use ledger::model::{OpenRequest, RequestRecord, Tenant};
use ledger::store::LedgerStore;

/// Ledger that only remembers what was appended to it.
#[derive(Default)]
pub struct MockLedger {
    pub fail_writes: bool,
    pub records: Mutex<Vec<RequestRecord>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
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

    async fn fulfilled_cpus(&self, _tenant: i32, _job: i64) -> anyhow::Result<i64> {
        Ok(0)
    }

    async fn ondemand_fulfilled(&self, _tenant: i32, _job: i64) -> anyhow::Result<bool> {
        Ok(false)
    }

    async fn requests_since(
        &self,
        _tenant: i32,
        _job: i64,
        _window_secs: i64,
    ) -> anyhow::Result<i64> {
        Ok(0)
    }

    async fn total_requests(&self, _tenant: i32, _job: i64) -> anyhow::Result<i64> {
        Ok(0)
    }

    async fn open_requests(&self, _tenant: i32, _job: i64) -> anyhow::Result<Vec<OpenRequest>> {
        Ok(Vec::new())
    }

    async fn record_request(&self, record: &RequestRecord) -> anyhow::Result<()> {
        if self.fail_writes {
            anyhow::bail!("ledger unavailable");
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
