//! Registry of custom chain verbs.
//!
//! A verb is a named resolver that `Chain::call` appends as a stage. The
//! resolver sees the inputs given at the call site and every value the
//! chain produced so far, and may return a plain value or another chain.

use crate::chain::{Chain, Flow};
use crate::error::{ChainError, Result};
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Names of the built-in chain verbs; these cannot be registered.
pub const RESERVED_VERBS: &[&str] = &[
    "then",
    "rescue",
    "ensure",
    "begin",
    "raise",
    "cancel",
    "canceller",
    "end",
    "speed",
    "async",
    "args",
    "data",
    "wait",
    "till",
    "call",
];

/// Arguments handed to a verb resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct VerbCall {
    /// Values given at the call site.
    pub inputs: Vec<Value>,
    /// Values produced by the chain's earlier stages, oldest first.
    pub results: Vec<Value>,
}

/// A verb implementation.
pub type Resolver = Arc<dyn Fn(VerbCall, &Chain) -> Result<Flow> + Send + Sync>;

/// Registry mapping verb names to resolvers.
///
/// Thread-safe; chains look verbs up when `call` appends the stage, so
/// registration changes only affect calls made afterwards.
#[derive(Default)]
pub struct VerbRegistry {
    verbs: RwLock<HashMap<String, Resolver>>,
}

impl VerbRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a verb, replacing any previous resolver with the same name.
    pub fn register<F, R>(&self, name: impl Into<String>, resolver: F) -> Result<()>
    where
        F: Fn(VerbCall, &Chain) -> Result<R> + Send + Sync + 'static,
        R: Into<Flow>,
    {
        let name = name.into();
        if RESERVED_VERBS.contains(&name.as_str()) {
            return Err(ChainError::ReservedVerb { name });
        }
        let boxed: Resolver = Arc::new(move |call: VerbCall, chain: &Chain| -> Result<Flow> {
            resolver(call, chain).map(Into::into)
        });
        let replaced = self.verbs.write().insert(name.clone(), boxed).is_some();
        tracing::debug!(verb = %name, replaced, "Registered verb");
        Ok(())
    }

    /// Remove a verb. Returns whether it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.verbs.write().remove(name).is_some();
        if removed {
            tracing::debug!(verb = %name, "Unregistered verb");
        }
        removed
    }

    /// Look up a verb.
    pub fn get(&self, name: &str) -> Option<Resolver> {
        self.verbs.read().get(name).cloned()
    }

    /// Check if a verb is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.verbs.read().contains_key(name)
    }

    /// Registered verb names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.verbs.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered verbs.
    pub fn len(&self) -> usize {
        self.verbs.read().len()
    }

    /// Check if no verbs are registered.
    pub fn is_empty(&self) -> bool {
        self.verbs.read().is_empty()
    }
}

impl std::fmt::Debug for VerbRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerbRegistry")
            .field("verbs", &self.names())
            .finish()
    }
}

static GLOBAL_VERBS: OnceLock<Arc<VerbRegistry>> = OnceLock::new();

/// Get the process-wide verb registry.
///
/// Empty at start. Schedulers use it unless given their own registry.
pub fn verbs() -> &'static Arc<VerbRegistry> {
    GLOBAL_VERBS.get_or_init(|| Arc::new(VerbRegistry::new()))
}

/// Register a verb in the process-wide registry.
pub fn register<F, R>(name: impl Into<String>, resolver: F) -> Result<()>
where
    F: Fn(VerbCall, &Chain) -> Result<R> + Send + Sync + 'static,
    R: Into<Flow>,
{
    verbs().register(name, resolver)
}

/// Remove a verb from the process-wide registry.
pub fn unregister(name: &str) -> bool {
    verbs().unregister(name)
}
