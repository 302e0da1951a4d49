//! Common types and the abstraction trait any cloud adapter must provide.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Per-tenant API credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

/// Errors surfaced by a cloud adapter.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("cloud client error: {0}")]
    Client(String),

    #[error("cloud server error: {0}")]
    Server(String),

    #[error("cloud request rejected: {0}")]
    Rejected(String),
}

impl CloudError {
    /// Client and server failures are worth retrying; a rejection of the
    /// request itself is not.
    pub fn is_transient(&self) -> bool {
        matches!(self, CloudError::Client(_) | CloudError::Server(_))
    }
}

/// One block-device entry in the worker launch shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockDevice {
    pub device_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebs: Option<EbsVolume>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EbsVolume {
    pub volume_size: u32,
}

/// The fixed launch shape for workers: a 10 GB root volume and four
/// ephemeral mounts.
pub fn worker_block_devices() -> Vec<BlockDevice> {
    let mut devices = vec![BlockDevice {
        device_name: "/dev/sda1".into(),
        ebs: Some(EbsVolume { volume_size: 10 }),
        virtual_name: None,
    }];
    for (suffix, name) in [
        ("b", "ephemeral0"),
        ("c", "ephemeral1"),
        ("d", "ephemeral2"),
        ("e", "ephemeral3"),
    ] {
        devices.push(BlockDevice {
            device_name: format!("/dev/sd{suffix}"),
            ebs: None,
            virtual_name: Some(name.into()),
        });
    }
    devices
}

/// Parameters for a fixed-price instance launch.
#[derive(Debug, Clone)]
pub struct RunInstances {
    pub count: i64,
    pub sku: String,
    pub ami: String,
    pub key_pair: String,
    pub security_group: String,
    pub subnet: String,
    pub user_data: String,
    pub block_devices: Vec<BlockDevice>,
}

/// Parameters for a bid-priced instance request.
#[derive(Debug, Clone)]
pub struct RequestSpotInstances {
    pub bid: f64,
    pub count: i64,
    pub sku: String,
    pub ami: String,
    pub key_pair: String,
    pub security_group: String,
    pub subnet: String,
    pub user_data: String,
    pub block_devices: Vec<BlockDevice>,
}

/// One spot price observation.
#[derive(Debug, Clone)]
pub struct SpotPrice {
    pub sku: String,
    pub zone: String,
    pub price: f64,
}

/// The operations the provisioner needs from a cloud: instance launches,
/// spot requests, tagging, and spot price history.
///
/// Adapters return the cloud-side request ids so callers can tag them and
/// record them in the ledger.
#[async_trait]
pub trait CloudApi: Send + Sync {
    async fn run_instances(
        &self,
        creds: &Credentials,
        params: RunInstances,
    ) -> Result<Vec<String>, CloudError>;

    async fn request_spot_instances(
        &self,
        creds: &Credentials,
        params: RequestSpotInstances,
    ) -> Result<Vec<String>, CloudError>;

    async fn create_tags(
        &self,
        creds: &Credentials,
        ids: &[String],
        tags: &[(String, String)],
    ) -> Result<(), CloudError>;

    async fn spot_price_history(
        &self,
        creds: &Credentials,
        sku: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SpotPrice>, CloudError>;
}
