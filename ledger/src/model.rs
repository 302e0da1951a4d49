use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use cloud::api::Credentials;

/// A principal with cloud credentials and provisioning policy.
///
/// Loaded fresh from the database every tick and treated as a read-only
/// snapshot within the tick.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub db_id: i32,
    pub name: String,
    pub access_key: String,
    pub secret_key: String,

    // Network placement
    pub vpc: String,
    pub security_group: String,
    pub key_pair: String,
    pub public_ip: String,
    pub domain: String,
    /// Cloud subnet used for on-demand launches.
    pub subnet: String,
    /// Mapping-table id of `subnet`, recorded on on-demand ledger rows.
    pub subnet_db_id: i32,
    /// zone -> cloud subnet id, for spot placement.
    pub subnets: HashMap<String, String>,
    /// zone -> mapping-table id, recorded on spot ledger rows.
    pub subnets_db_id: HashMap<String, i32>,

    // Policy
    pub max_bid_price: f64,
    /// Percentage of the on-demand price offered on spot bids, in [0, 100].
    pub bid_percent: f64,
    /// Seconds a job may idle before it is escalated to on-demand.
    /// Zero disables the escalation.
    pub timeout: i64,
    /// Seconds a job must have waited in the queue before it is provisioned
    /// for at all.
    pub idle_time: i64,
    /// Minimum seconds between two requests for the same job.
    pub request_rate: i64,

    /// Queue binding: jobs whose global id carries this address belong to
    /// the tenant.
    pub condor_address: String,
}

impl Tenant {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
        }
    }
}

/// Pricing mode of a placed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Spot,
    Ondemand,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestKind::Spot => "spot",
            RequestKind::Ondemand => "ondemand",
        };
        f.write_str(s)
    }
}

impl FromStr for RequestKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spot" => Ok(RequestKind::Spot),
            "ondemand" => Ok(RequestKind::Ondemand),
            other => Err(anyhow::anyhow!("Invalid request type value: {}", other)),
        }
    }
}

/// One durable row in the request ledger. The insertion timestamp is the
/// database server clock.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub tenant: i32,
    /// Catalog id of the requested type.
    pub instance_type: i32,
    /// Bid for spot requests, the on-demand price otherwise.
    pub price: f64,
    pub job_runner_id: i64,
    pub kind: RequestKind,
    /// Cloud-side request id.
    pub request_id: String,
    /// Mapping-table id of the subnet the request was placed on.
    pub subnet: i32,
}

/// An outstanding (sku, zone) pair already requested for a job, used by the
/// selector to avoid duplicate requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub sku: String,
    pub zone: String,
}
