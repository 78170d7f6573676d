// smart-contracts/src/gas.rs

use crate::{ContractError, ContractResult};
use blockchain_core::ResourceLimits;
use serde::{Deserialize, Serialize};

/// Resource cost of each contract operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// CPU per method call
    pub call_cpu: u64,
    /// CPU per argument byte
    pub arg_byte_cpu: u64,
    /// CPU per state read
    pub get_cpu: u64,
    /// CPU per state write
    pub put_cpu: u64,
    /// Memory per byte read from state
    pub read_byte_memory: u64,
    /// Disk per byte written to state
    pub write_byte_disk: u64,
    /// Fee units per UTXO transfer
    pub transfer_xfee: u64,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            call_cpu: 100,
            arg_byte_cpu: 1,
            get_cpu: 10,
            put_cpu: 20,
            read_byte_memory: 1,
            write_byte_disk: 1,
            transfer_xfee: 1,
        }
    }
}

impl ResourceConfig {
    /// Everything free; used when resource accounting is irrelevant
    pub fn free() -> Self {
        Self {
            call_cpu: 0,
            arg_byte_cpu: 0,
            get_cpu: 0,
            put_cpu: 0,
            read_byte_memory: 0,
            write_byte_disk: 0,
            transfer_xfee: 0,
        }
    }

    pub fn call_cost(&self, args_len: usize) -> ResourceLimits {
        ResourceLimits {
            cpu: self
                .call_cpu
                .saturating_add((args_len as u64).saturating_mul(self.arg_byte_cpu)),
            ..Default::default()
        }
    }

    pub fn get_cost(&self, value_len: usize) -> ResourceLimits {
        ResourceLimits {
            cpu: self.get_cpu,
            memory: (value_len as u64).saturating_mul(self.read_byte_memory),
            ..Default::default()
        }
    }

    pub fn put_cost(&self, key_len: usize, value_len: usize) -> ResourceLimits {
        ResourceLimits {
            cpu: self.put_cpu,
            disk: ((key_len + value_len) as u64).saturating_mul(self.write_byte_disk),
            ..Default::default()
        }
    }

    pub fn transfer_cost(&self) -> ResourceLimits {
        ResourceLimits {
            xfee: self.transfer_xfee,
            ..Default::default()
        }
    }
}

/// Resource meter for tracking usage during one call
#[derive(Debug, Clone)]
pub struct ResourceMeter {
    limit: ResourceLimits,
    used: ResourceLimits,
}

impl ResourceMeter {
    pub fn new(limit: ResourceLimits) -> Self {
        Self {
            limit,
            used: ResourceLimits::default(),
        }
    }

    /// Consume resources; nothing is charged if the limit would be exceeded
    pub fn consume(&mut self, cost: &ResourceLimits) -> ContractResult<()> {
        let next = self.used.saturating_add(cost);
        if next.exceeds(&self.limit) {
            return Err(ContractError::OutOfResource(format!(
                "used {:?} plus {:?} exceeds {:?}",
                self.used, cost, self.limit
            )));
        }
        self.used = next;
        Ok(())
    }

    pub fn used(&self) -> ResourceLimits {
        self.used
    }

    pub fn limit(&self) -> ResourceLimits {
        self.limit
    }

    /// Check if any resource has been used up
    pub fn is_exhausted(&self) -> bool {
        self.used.cpu >= self.limit.cpu
            || self.used.memory >= self.limit.memory
            || self.used.disk >= self.limit.disk
            || self.used.xfee >= self.limit.xfee
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_costs() {
        let config = ResourceConfig::default();

        assert_eq!(config.call_cost(5).cpu, 105);
        assert_eq!(config.get_cost(8), ResourceLimits { cpu: 10, memory: 8, ..Default::default() });
        assert_eq!(config.put_cost(1, 3).disk, 4);
        assert_eq!(config.transfer_cost().xfee, 1);
        assert_eq!(ResourceConfig::free().call_cost(100), ResourceLimits::default());
    }

    #[test]
    fn test_resource_meter() {
        let mut meter = ResourceMeter::new(ResourceLimits { cpu: 100, memory: 10, disk: 10, xfee: 1 });

        meter.consume(&ResourceLimits { cpu: 60, ..Default::default() }).unwrap();
        assert_eq!(meter.used().cpu, 60);

        let over = ResourceLimits { cpu: 50, ..Default::default() };
        assert!(matches!(meter.consume(&over), Err(ContractError::OutOfResource(_))));
        assert_eq!(meter.used().cpu, 60, "failed charge leaves usage untouched");

        meter.consume(&ResourceLimits { cpu: 40, ..Default::default() }).unwrap();
        assert!(meter.is_exhausted());
    }

    proptest! {
        #[test]
        fn prop_meter_never_exceeds_limit(costs in proptest::collection::vec(0u64..1_000, 0..32), limit in 0u64..10_000) {
            let mut meter = ResourceMeter::new(ResourceLimits { cpu: limit, ..ResourceLimits::MAX });
            for cpu in costs {
                let _ = meter.consume(&ResourceLimits { cpu, ..Default::default() });
            }
            prop_assert!(meter.used().cpu <= limit);
        }
    }
}
