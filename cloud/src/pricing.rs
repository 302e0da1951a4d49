//! Per-tick spot price snapshot.

use chrono::Utc;
use tracing::{debug, warn};

use crate::api::{CloudApi, Credentials};
use crate::types::InstanceType;

/// Refresh the spot price map of every cataloged instance type.
///
/// The history window is collapsed to a single point (`start == end == now`)
/// so the cloud returns only the current price per availability zone. A
/// failed fetch leaves that type without spot candidates this tick.
pub async fn refresh_spot_prices(
    api: &dyn CloudApi,
    creds: &Credentials,
    catalog: &mut [InstanceType],
) {
    let now = Utc::now();
    for instance in catalog.iter_mut() {
        match api.spot_price_history(creds, &instance.sku, now, now).await {
            Ok(prices) => {
                for p in prices {
                    instance.spot.insert(p.zone, p.price);
                }
                debug!(sku = %instance.sku, zones = instance.spot.len(), "refreshed spot prices");
            }
            Err(e) => warn!(sku = %instance.sku, error = %e, "failed to fetch spot prices"),
        }
    }
}
