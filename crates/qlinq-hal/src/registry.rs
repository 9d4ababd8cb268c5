//! Backend registry for managing available backends.
//!
//! The [`BackendRegistry`] maps case-sensitive backend names to constructors.
//! Adapter crates add their entries explicitly (see
//! `qlinq_adapter_sim::register_backends`); a missing adapter only removes its
//! own entries. Custom backends can bypass the registry entirely through
//! [`Simulator::new`] or [`Simulator::from_factory`].
//!
//! Cross-backend introspection goes through [`BackendRegistry::backend_info`],
//! a snapshot computed on first use and dropped whenever the set of entries
//! changes.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::backend::{Backend, BackendConfig, BackendFactory};
use crate::capability::BackendInfo;
use crate::error::{HalError, HalResult};
use crate::simulator::{Simulator, SimulatorConfig};

/// Constructor type for registered backends.
type Constructor = Box<dyn Fn(BackendConfig) -> HalResult<Box<dyn Backend>> + Send + Sync>;

/// Central registry of simulation backends.
pub struct BackendRegistry {
    /// Backend constructors keyed by name.
    constructors: FxHashMap<String, Constructor>,
    /// Lazily computed capability snapshot.
    info_snapshot: OnceLock<BTreeMap<String, BackendInfo>>,
}

impl BackendRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            constructors: FxHashMap::default(),
            info_snapshot: OnceLock::new(),
        }
    }

    /// Register a backend type under `name`.
    pub fn register<B>(&mut self, name: impl Into<String>)
    where
        B: BackendFactory + 'static,
    {
        self.register_factory(name, |config| {
            let backend = B::from_config(config)?;
            Ok(Box::new(backend) as Box<dyn Backend>)
        });
    }

    /// Register a backend with a custom constructor.
    pub fn register_factory(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(BackendConfig) -> HalResult<Box<dyn Backend>> + Send + Sync + 'static,
    ) {
        let name = name.into();
        debug!("Registering backend: {}", name);
        self.constructors.insert(name, Box::new(factory));
        self.invalidate_backend_info();
    }

    /// Create a backend by name.
    pub fn create(&self, name: &str, config: BackendConfig) -> HalResult<Box<dyn Backend>> {
        let factory = self.constructors.get(name).ok_or_else(|| {
            HalError::Configuration(format!("No backend registered with name '{name}'"))
        })?;
        factory(config)
    }

    /// Create a backend by name and wrap it in a [`Simulator`].
    pub fn simulator(&self, name: &str, config: SimulatorConfig) -> HalResult<Simulator> {
        let backend = self.create(name, BackendConfig::new(name))?;
        Simulator::new(backend, config)
    }

    /// List all registered backend names.
    pub fn available_backends(&self) -> Vec<String> {
        let mut names: Vec<_> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a backend is registered under `name`.
    pub fn has_backend(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Declared capabilities of every constructible backend, by name.
    ///
    /// Computed on first call by constructing each backend with a default
    /// [`BackendConfig`]; entries whose construction fails are left out.
    pub fn backend_info(&self) -> &BTreeMap<String, BackendInfo> {
        self.info_snapshot.get_or_init(|| {
            let mut snapshot = BTreeMap::new();
            for (name, factory) in &self.constructors {
                match factory(BackendConfig::new(name.as_str())) {
                    Ok(backend) => {
                        snapshot.insert(name.clone(), *backend.info());
                    }
                    Err(e) => warn!("Skipping backend '{}' in capability snapshot: {}", name, e),
                }
            }
            debug!(backends = snapshot.len(), "Computed backend capability snapshot");
            snapshot
        })
    }

    /// Drop the capability snapshot so the next [`Self::backend_info`] call
    /// recomputes it.
    pub fn invalidate_backend_info(&mut self) {
        self.info_snapshot.take();
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
