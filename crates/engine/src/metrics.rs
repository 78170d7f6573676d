// engine/src/metrics.rs

use dashmap::DashMap;

/// Where chain operations report counters and latencies
pub trait MetricsSink: Send + Sync {
    /// One contract invocation; `status` is `OK` or `InvokeError`
    fn contract_invoke(&self, chain: &str, module: &str, contract: &str, method: &str, status: &str);

    /// Latency of a successful contract invocation
    fn contract_invoke_latency(&self, chain: &str, module: &str, contract: &str, method: &str, seconds: f64);

    /// Outcome of a public chain method
    fn call_method(&self, chain: &str, method: &str, code: &str);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn contract_invoke(&self, _: &str, _: &str, _: &str, _: &str, _: &str) {}

    fn contract_invoke_latency(&self, _: &str, _: &str, _: &str, _: &str, _: f64) {}

    fn call_method(&self, _: &str, _: &str, _: &str) {}
}

/// Keeps counters in memory, keyed by their `/`-joined labels
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    invokes: DashMap<String, u64>,
    latencies: DashMap<String, Vec<f64>>,
    calls: DashMap<String, u64>,
}

fn key(labels: &[&str]) -> String {
    labels.join("/")
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invoke_count(&self, chain: &str, module: &str, contract: &str, method: &str, status: &str) -> u64 {
        self.invokes
            .get(&key(&[chain, module, contract, method, status]))
            .map_or(0, |v| *v)
    }

    pub fn latency_samples(&self, chain: &str, module: &str, contract: &str, method: &str) -> usize {
        self.latencies
            .get(&key(&[chain, module, contract, method]))
            .map_or(0, |v| v.len())
    }

    pub fn call_count(&self, chain: &str, method: &str, code: &str) -> u64 {
        self.calls.get(&key(&[chain, method, code])).map_or(0, |v| *v)
    }

    /// All call counters, sorted by key
    pub fn calls_snapshot(&self) -> Vec<(String, u64)> {
        let mut calls: Vec<(String, u64)> = self
            .calls
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        calls.sort();
        calls
    }
}

impl MetricsSink for InMemoryMetrics {
    fn contract_invoke(&self, chain: &str, module: &str, contract: &str, method: &str, status: &str) {
        *self
            .invokes
            .entry(key(&[chain, module, contract, method, status]))
            .or_insert(0) += 1;
    }

    fn contract_invoke_latency(&self, chain: &str, module: &str, contract: &str, method: &str, seconds: f64) {
        self.latencies
            .entry(key(&[chain, module, contract, method]))
            .or_default()
            .push(seconds);
    }

    fn call_method(&self, chain: &str, method: &str, code: &str) {
        *self.calls.entry(key(&[chain, method, code])).or_insert(0) += 1;
    }
}
