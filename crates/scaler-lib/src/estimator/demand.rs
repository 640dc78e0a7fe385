//! Workload demand aggregation

use crate::models::{ResourceDemandReport, Workload};
use crate::quantity::Quantity;

/// Sums how much of one resource a batch of pending workloads asks for
#[derive(Debug, Clone)]
pub struct ResourceDemandEstimator {
    resource: String,
}

impl ResourceDemandEstimator {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Sum of the resource request over all containers, zero when none asks
    pub fn workload_demand(&self, workload: &Workload) -> Quantity {
        workload
            .containers
            .iter()
            .filter_map(|c| c.requests.get(&self.resource))
            .sum()
    }

    /// Whether any container lists the resource, even with a zero amount
    pub fn workload_requests_resource(&self, workload: &Workload) -> bool {
        workload
            .containers
            .iter()
            .any(|c| c.requests.contains_key(&self.resource))
    }

    /// Aggregate demand over `workloads`.
    ///
    /// Workloads with zero demand are left out of the report. The scalar
    /// fields do not depend on input order.
    pub fn estimate(&self, workloads: &[Workload]) -> ResourceDemandReport {
        let mut report = ResourceDemandReport::default();

        for workload in workloads {
            let demand = self.workload_demand(workload);
            if demand.is_zero() {
                continue;
            }
            report.maximum_demand = report.maximum_demand.max(demand);
            report.total_demand += demand;
            report.workloads.push(workload.clone());
        }

        report
    }
}
