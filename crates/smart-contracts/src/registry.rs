// smart-contracts/src/registry.rs

use crate::native::{Counter, Vault};
use blockchain_core::Contract;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of native contract code, keyed by code name
pub struct NativeRegistry {
    codes: HashMap<String, Arc<dyn Contract>>,
}

impl NativeRegistry {
    /// Create a registry holding the built-in codes
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Counter::CODE, Arc::new(Counter));
        registry.register(Vault::CODE, Arc::new(Vault));
        registry
    }

    pub fn empty() -> Self {
        Self {
            codes: HashMap::new(),
        }
    }

    /// Register a custom code
    pub fn register(&mut self, code: &str, contract: Arc<dyn Contract>) {
        self.codes.insert(code.to_string(), contract);
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains_key(code)
    }

    pub fn get(&self, code: &str) -> Option<Arc<dyn Contract>> {
        self.codes.get(code).cloned()
    }

    /// Registered code names, sorted
    pub fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.codes.keys().cloned().collect();
        codes.sort();
        codes
    }
}

impl Default for NativeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
