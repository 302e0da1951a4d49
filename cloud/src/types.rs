use std::collections::BTreeMap;

/// One catalog row: a purchasable machine shape with its fixed price,
/// plus the per-tick spot price snapshot filled in by
/// `pricing::refresh_spot_prices`.
#[derive(Debug, Clone)]
pub struct InstanceType {
    pub db_id: i32,
    /// Vendor SKU string, e.g. `m4.large`.
    pub sku: String,
    /// Fixed per-hour price for this type.
    pub ondemand: f64,
    pub cpus: i32,
    /// Memory in GB.
    pub memory: f64,
    /// Local disk in GB.
    pub disk: f64,
    pub ami: String,
    /// zone -> current spot price. Empty until the price view refreshes it.
    pub spot: BTreeMap<String, f64>,
}

/// One (type, zone, pricing-mode) combination a job may launch as.
///
/// `zone` is empty for on-demand requests. `price` is what candidates are
/// ordered by: the on-demand price when `ondemand` is set, otherwise the
/// zone's spot price.
#[derive(Debug, Clone)]
pub struct CandidateRequest {
    pub instance: InstanceType,
    pub sku: String,
    pub zone: String,
    pub ami: String,
    pub count: i64,
    /// Effective bid placed at request time; filled in by the selector.
    pub bid: f64,
    pub ondemand: bool,
    /// On-demand price of the type, carried for comparisons.
    pub odp: f64,
    pub price: f64,
}

impl CandidateRequest {
    /// A fixed-price candidate for the type.
    pub fn ondemand(instance: &InstanceType) -> Self {
        Self {
            sku: instance.sku.clone(),
            zone: String::new(),
            ami: instance.ami.clone(),
            count: 1,
            bid: 0.0,
            ondemand: true,
            odp: instance.ondemand,
            price: instance.ondemand,
            instance: instance.clone(),
        }
    }

    /// A bid-priced candidate for the type in one availability zone.
    pub fn spot(instance: &InstanceType, zone: &str, price: f64) -> Self {
        Self {
            sku: instance.sku.clone(),
            zone: zone.to_string(),
            ami: instance.ami.clone(),
            count: 1,
            bid: 0.0,
            ondemand: false,
            odp: instance.ondemand,
            price,
            instance: instance.clone(),
        }
    }
}
