// blockchain-core/src/types.rs

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::Add;
use std::str::FromStr;

/// Block number/height
pub type BlockNumber = u64;

/// Timestamp in Unix epoch nanoseconds
pub type Timestamp = i64;

/// Gas amount
pub type Gas = u64;

/// Current time in Unix epoch nanoseconds
pub fn now_nanos() -> Timestamp {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

/// Token amount with arbitrary precision.
///
/// Serialized as a decimal string so genesis files and requests stay readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigUint);

impl Amount {
    pub fn new(value: BigUint) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn from_u64(value: u64) -> Self {
        Self(BigUint::from(value))
    }

    pub fn inner(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        if self.0 < other.0 {
            None
        } else {
            Some(Amount(&self.0 - &other.0))
        }
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, other: Amount) -> Amount {
        Amount(self.0 + other.0)
    }
}

impl<'a> Add<&'a Amount> for &'a Amount {
    type Output = Amount;

    fn add(self, other: &Amount) -> Amount {
        Amount(&self.0 + &other.0)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::zero(), |acc, a| acc + a)
    }
}

impl FromStr for Amount {
    type Err = String;

    /// Parse a non-negative base-10 integer
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("bad amount: {:?}", s));
        }
        BigUint::parse_bytes(s.as_bytes(), 10)
            .map(Amount)
            .ok_or_else(|| format!("bad amount: {:?}", s))
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_str_radix(10))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Price of each resource, expressed as units per one gas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPrice {
    pub cpu_rate: u64,
    pub mem_rate: u64,
    pub disk_rate: u64,
    pub xfee_rate: u64,
}

/// Resources a contract call may use, or did use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpu: u64,
    pub memory: u64,
    pub disk: u64,
    pub xfee: u64,
}

impl ResourceLimits {
    /// Limits a pre-execution context starts with
    pub const MAX: ResourceLimits = ResourceLimits {
        cpu: u64::MAX,
        memory: u64::MAX,
        disk: u64::MAX,
        xfee: u64::MAX,
    };

    /// Gas charged for this usage: each resource is divided by its rate,
    /// rounding up. A zero rate makes that resource free.
    pub fn total_gas(&self, price: &GasPrice) -> Gas {
        fn roundup(n: u64, scale: u64) -> u64 {
            if scale == 0 {
                0
            } else {
                n.div_ceil(scale)
            }
        }

        roundup(self.cpu, price.cpu_rate)
            .saturating_add(roundup(self.memory, price.mem_rate))
            .saturating_add(roundup(self.disk, price.disk_rate))
            .saturating_add(roundup(self.xfee, price.xfee_rate))
    }

    pub fn saturating_add(&self, other: &ResourceLimits) -> ResourceLimits {
        ResourceLimits {
            cpu: self.cpu.saturating_add(other.cpu),
            memory: self.memory.saturating_add(other.memory),
            disk: self.disk.saturating_add(other.disk),
            xfee: self.xfee.saturating_add(other.xfee),
        }
    }

    /// True if any resource in `self` is above the same resource in `limit`
    pub fn exceeds(&self, limit: &ResourceLimits) -> bool {
        self.cpu > limit.cpu
            || self.memory > limit.memory
            || self.disk > limit.disk
            || self.xfee > limit.xfee
    }
}
