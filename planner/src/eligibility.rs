//! Determines which instance types can run a given job.
//
//  This module is deliberately pure: no async, no IO.

use cloud::types::InstanceType;
use queue::job::Job;

/// Instance types large enough for the job in every requested dimension.
pub fn eligible_instances<'a>(catalog: &'a [InstanceType], job: &Job) -> Vec<&'a InstanceType> {
    catalog.iter().filter(|instance| fits(instance, job)).collect()
}

fn fits(instance: &InstanceType, job: &Job) -> bool {
    instance.cpus >= job.req_cpus && instance.memory >= job.req_mem && instance.disk >= job.req_disk
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use queue::job::STATUS_IDLE;

    fn instance(sku: &str, cpus: i32, memory: f64, disk: f64) -> InstanceType {
        InstanceType {
            db_id: 0,
            sku: sku.into(),
            ondemand: 1.0,
            cpus,
            memory,
            disk,
            ami: "ami-1".into(),
            spot: Default::default(),
        }
    }

    fn job(cpus: i32, mem: f64, disk: f64) -> Job {
        Job::new("q".into(), 1, STATUS_IDLE, 0, cpus, mem, disk, HashMap::new())
    }

    #[test]
    fn all_dimensions_must_fit() {
        let catalog = [
            instance("small", 2, 4.0, 20.0),
            instance("large", 8, 32.0, 100.0),
        ];

        let eligible = eligible_instances(&catalog, &job(4, 8.0, 10.0));

        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].sku, "large");
    }

    #[test]
    fn exact_fit_is_eligible() {
        let catalog = [instance("exact", 4, 8.0, 10.0)];
        assert_eq!(eligible_instances(&catalog, &job(4, 8.0, 10.0)).len(), 1);
    }

    #[test]
    fn nothing_fits_an_oversized_job() {
        let catalog = [instance("small", 2, 4.0, 20.0)];
        assert!(eligible_instances(&catalog, &job(64, 512.0, 1000.0)).is_empty());
    }

    #[test]
    fn catalog_order_is_preserved() {
        let catalog = [
            instance("b", 8, 32.0, 100.0),
            instance("a", 8, 32.0, 100.0),
        ];

        let eligible = eligible_instances(&catalog, &job(1, 1.0, 1.0));
        let skus: Vec<_> = eligible.iter().map(|i| i.sku.as_str()).collect();
        assert_eq!(skus, ["b", "a"]);
    }
}
