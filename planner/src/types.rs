//! Shared knobs for the provisioning decision passes.

/// Global provisioning limits, loaded from the `[Provision]` section of
/// the configuration file.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// Fraction of the on-demand price above which a spot price is close
    /// enough to on-demand to stop bidding, in (0, 1].
    pub ondemand_price_threshold: f64,

    /// Lifetime cap on ledger entries per job.
    pub max_requests: i64,

    /// Seconds between provisioning ticks.
    pub run_rate: u64,

    /// Fallback bid used when the percentage bid overshoots the tenant's
    /// cap.
    pub bid_floor: f64,
}
