//! Named pass registry.
//!
//! An explicit, per-invocation object: registration order is an ordered
//! sequence, duplicate names are rejected, and lookup is by name. Nothing
//! is registered through process-global state.

use derive_more::{Display, Error};

use crate::memory::ConvertCedarToMem;
use crate::pass::{Pass, VerifyPass};
use crate::structural::ConvertCedarToFunc;
use crate::target::ConvertToClif;

/// Creates a fresh pass instance.
pub type PassFactory = fn() -> Box<dyn Pass>;

#[derive(Debug, Display, Error)]
#[display("a pass named '{name}' is already registered")]
pub struct DuplicatePass {
    pub name: &'static str,
}

/// Ordered name → pass-factory mapping.
pub struct PassRegistry {
    entries: Vec<(&'static str, PassFactory)>,
}

impl PassRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a factory under a unique name.
    pub fn register(
        &mut self,
        name: &'static str,
        factory: PassFactory,
    ) -> Result<(), DuplicatePass> {
        if self.entries.iter().any(|(n, _)| *n == name) {
            return Err(DuplicatePass { name });
        }
        self.entries.push((name, factory));
        Ok(())
    }

    /// Look up a factory by name.
    pub fn get(&self, name: &str) -> Option<PassFactory> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, f)| *f)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }
}

impl Default for PassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The standard registry: the three lowering stages plus the verifier.
pub fn default_registry() -> PassRegistry {
    let mut registry = PassRegistry::new();
    registry
        .register("convert-cedar-to-func", || Box::new(ConvertCedarToFunc))
        .expect("fresh registry has no duplicates");
    registry
        .register("convert-cedar-to-mem", || Box::new(ConvertCedarToMem))
        .expect("fresh registry has no duplicates");
    registry
        .register("convert-to-clif", || Box::new(ConvertToClif))
        .expect("fresh registry has no duplicates");
    registry
        .register("verify", || Box::new(VerifyPass))
        .expect("fresh registry has no duplicates");
    registry
}
