//! PostgreSQL-backed implementation of the `LedgerStore` trait.
//!
//! The `instance_request` table is owned (and created) by this store; the
//! tenant, catalog, subnet and fulfilment tables belong to external
//! collaborators and are only read.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use super::LedgerStore;
use crate::model::{OpenRequest, RequestRecord, Tenant};
use cloud::types::InstanceType;

pub struct PgLedgerStore {
    pool: PgPool,
}

/// The global subnet mapping, shaped for tenant snapshots.
struct SubnetMaps {
    /// zone -> cloud subnet id
    by_zone: HashMap<String, String>,
    /// zone -> mapping-table id
    ids_by_zone: HashMap<String, i32>,
    /// cloud subnet id -> mapping-table id
    ids_by_subnet: HashMap<String, i32>,
}

impl PgLedgerStore {
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the ledger table exists.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(url).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS instance_request (
                id SERIAL PRIMARY KEY,
                tenant INTEGER NOT NULL,
                instance_type INTEGER NOT NULL,
                price DOUBLE PRECISION NOT NULL,
                job_runner_id BIGINT NOT NULL,
                request_type TEXT NOT NULL,
                request_id TEXT NOT NULL,
                subnet INTEGER NOT NULL,
                request_time TIMESTAMPTZ NOT NULL DEFAULT now()
            );
        "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    async fn load_subnets(&self) -> anyhow::Result<SubnetMaps> {
        let rows = sqlx::query("SELECT id, zone, subnet_id FROM subnet_mapping")
            .fetch_all(&self.pool)
            .await?;

        let mut maps = SubnetMaps {
            by_zone: HashMap::with_capacity(rows.len()),
            ids_by_zone: HashMap::with_capacity(rows.len()),
            ids_by_subnet: HashMap::with_capacity(rows.len()),
        };
        for row in rows {
            let id: i32 = row.get("id");
            let zone: String = row.get("zone");
            let subnet: String = row.get("subnet_id");

            maps.by_zone.insert(zone.clone(), subnet.clone());
            maps.ids_by_zone.insert(zone, id);
            maps.ids_by_subnet.insert(subnet, id);
        }
        Ok(maps)
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn load_tenants(&self) -> anyhow::Result<Vec<Tenant>> {
        let subnets = self.load_subnets().await?;

        let rows = sqlx::query(
            "SELECT id, name, access_key, secret_key, vpc, security_group, key_pair, \
             public_ip, domain, subnet, max_bid_price, bid_percent, timeout, idle_time, \
             request_rate, condor_address \
             FROM tenant",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut tenants = Vec::with_capacity(rows.len());
        for row in rows {
            let subnet: String = row.get("subnet");
            let subnet_db_id = subnets.ids_by_subnet.get(&subnet).copied().ok_or_else(|| {
                anyhow::anyhow!("tenant subnet {} missing from subnet_mapping", subnet)
            })?;

            tenants.push(Tenant {
                db_id: row.get("id"),
                name: row.get("name"),
                access_key: row.get("access_key"),
                secret_key: row.get("secret_key"),
                vpc: row.get("vpc"),
                security_group: row.get("security_group"),
                key_pair: row.get("key_pair"),
                public_ip: row.get("public_ip"),
                domain: row.get("domain"),
                subnet,
                subnet_db_id,
                subnets: subnets.by_zone.clone(),
                subnets_db_id: subnets.ids_by_zone.clone(),
                max_bid_price: row.get("max_bid_price"),
                bid_percent: row.get::<i32, _>("bid_percent") as f64,
                timeout: row.get::<i32, _>("timeout") as i64,
                idle_time: row.get::<i32, _>("idle_time") as i64,
                request_rate: row.get::<i32, _>("request_rate") as i64,
                condor_address: row.get("condor_address"),
            });
        }
        Ok(tenants)
    }

    async fn load_instance_types(&self) -> anyhow::Result<Vec<InstanceType>> {
        let rows = sqlx::query(
            "SELECT id, type, ondemand_price, cpus, memory, disk, ami \
             FROM instance_type WHERE available = TRUE",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut catalog = Vec::with_capacity(rows.len());
        for row in rows {
            catalog.push(InstanceType {
                db_id: row.get("id"),
                sku: row.get("type"),
                ondemand: row.get("ondemand_price"),
                cpus: row.get("cpus"),
                memory: row.get("memory"),
                disk: row.get("disk"),
                ami: row.get("ami"),
                spot: Default::default(),
            });
        }
        Ok(catalog)
    }

    async fn fulfilled_cpus(&self, tenant: i32, job: i64) -> anyhow::Result<i64> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(instance_type.cpus), 0) AS cpus \
             FROM instance_request \
             JOIN instance_type ON instance_type.id = instance_request.instance_type \
             JOIN instance ON instance.request_id = instance_request.id \
             WHERE instance_request.job_runner_id = $1 AND instance_request.tenant = $2",
        )
        .bind(job)
        .bind(tenant)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("cpus"))
    }

    async fn ondemand_fulfilled(&self, tenant: i32, job: i64) -> anyhow::Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS( \
                 SELECT 1 FROM instance_request \
                 JOIN instance ON instance.request_id = instance_request.id \
                 WHERE instance_request.job_runner_id = $1 \
                   AND instance_request.tenant = $2 \
                   AND instance_request.request_type = 'ondemand') AS fulfilled",
        )
        .bind(job)
        .bind(tenant)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<bool, _>("fulfilled"))
    }

    async fn requests_since(
        &self,
        tenant: i32,
        job: i64,
        window_secs: i64,
    ) -> anyhow::Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS requests FROM instance_request \
             WHERE job_runner_id = $1 AND tenant = $2 \
               AND request_time >= now() - make_interval(secs => $3)",
        )
        .bind(job)
        .bind(tenant)
        .bind(window_secs as f64)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("requests"))
    }

    async fn total_requests(&self, tenant: i32, job: i64) -> anyhow::Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS requests FROM instance_request \
             WHERE job_runner_id = $1 AND tenant = $2",
        )
        .bind(job)
        .bind(tenant)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("requests"))
    }

    async fn open_requests(&self, tenant: i32, job: i64) -> anyhow::Result<Vec<OpenRequest>> {
        let rows = sqlx::query(
            "SELECT instance_type.type AS sku, subnet_mapping.zone AS zone \
             FROM instance_request \
             JOIN instance_type ON instance_type.id = instance_request.instance_type \
             JOIN subnet_mapping ON subnet_mapping.id = instance_request.subnet \
             WHERE instance_request.job_runner_id = $1 AND instance_request.tenant = $2",
        )
        .bind(job)
        .bind(tenant)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| OpenRequest {
                sku: row.get("sku"),
                zone: row.get("zone"),
            })
            .collect())
    }

    async fn record_request(&self, record: &RequestRecord) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO instance_request \
             (tenant, instance_type, price, job_runner_id, request_type, request_id, subnet) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.tenant)
        .bind(record.instance_type)
        .bind(record.price)
        .bind(record.job_runner_id)
        .bind(record.kind.to_string())
        .bind(&record.request_id)
        .bind(record.subnet)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
