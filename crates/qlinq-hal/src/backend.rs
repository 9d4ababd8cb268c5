//! Backend trait and configuration.
//!
//! The [`Backend`] trait is the contract every simulation adapter implements:
//!
//! ```text
//!   info() ──→ execute(request, rng) ──→ Execution { frequencies, statevector }
//!   (sync, &ref)        (sync)
//! ```
//!
//! ## Method table
//!
//! | Method | Required | Returns |
//! |--------|----------|---------|
//! | `name()` | yes | `&str` |
//! | `info()` | yes | `&BackendInfo` |
//! | `execute()` | yes | `HalResult<Execution>` |
//! | `prepared_state_expectation()` | provided (`None`) | `Option<&dyn PreparedStateExpectation>` |
//!
//! Adapters never see trivial circuits: the [`Simulator`](crate::Simulator)
//! handles zero-width and zero-size circuits itself and validates capability
//! use before delegating.

use num_complex::Complex64;
use qlinq_ir::{Circuit, NoiseModel};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::capability::BackendInfo;
use crate::error::{HalError, HalResult};
use crate::frequencies::{DEFAULT_FREQUENCY_THRESHOLD, Frequencies};
use crate::operator::QubitOperator;

/// Configuration for constructing a backend instance through a registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Name of the backend.
    pub name: String,
    /// Adapter-specific settings.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BackendConfig {
    /// Create a new backend configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Add extra configuration.
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Read an unsigned integer setting.
    pub fn extra_u64(&self, key: &str) -> Option<u64> {
        self.extra.get(key).and_then(serde_json::Value::as_u64)
    }

    /// Read a setting that must fit in a `u32`, rejecting anything else.
    pub fn extra_u32(&self, key: &str) -> HalResult<Option<u32>> {
        let Some(value) = self.extra.get(key) else {
            return Ok(None);
        };
        value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| {
                HalError::Configuration(format!(
                    "'{key}' must be an integer between 0 and {}, got {value}",
                    u32::MAX
                ))
            })
    }

    /// Read a boolean setting.
    pub fn extra_bool(&self, key: &str) -> Option<bool> {
        self.extra.get(key).and_then(serde_json::Value::as_bool)
    }
}

/// Everything an adapter needs to run one circuit.
///
/// Shot count, noise model and threshold come from the owning
/// [`Simulator`](crate::Simulator), so adapters stay stateless across calls.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionRequest<'a> {
    /// Circuit to run. Never zero-width.
    pub circuit: &'a Circuit,
    /// Whether the final statevector should be returned.
    pub return_statevector: bool,
    /// State to start from instead of |0…0⟩.
    pub initial_statevector: Option<&'a [Complex64]>,
    /// Number of shots; `None` requests exact frequencies.
    pub shots: Option<u64>,
    /// Noise model, only ever set for noisy-capable backends.
    pub noise_model: Option<&'a NoiseModel>,
    /// Probability threshold for exact frequency tables.
    pub frequency_threshold: f64,
}

impl<'a> ExecutionRequest<'a> {
    /// Exact, noiseless execution of `circuit` from |0…0⟩.
    pub fn new(circuit: &'a Circuit) -> Self {
        Self {
            circuit,
            return_statevector: false,
            initial_statevector: None,
            shots: None,
            noise_model: None,
            frequency_threshold: DEFAULT_FREQUENCY_THRESHOLD,
        }
    }

    /// Request the final statevector.
    pub fn with_statevector(mut self, return_statevector: bool) -> Self {
        self.return_statevector = return_statevector;
        self
    }

    /// Start from `statevector`.
    pub fn with_initial_statevector(mut self, statevector: Option<&'a [Complex64]>) -> Self {
        self.initial_statevector = statevector;
        self
    }

    /// Sample `shots` outcomes.
    pub fn with_shots(mut self, shots: Option<u64>) -> Self {
        self.shots = shots;
        self
    }

    /// Apply `noise_model`.
    pub fn with_noise_model(mut self, noise_model: Option<&'a NoiseModel>) -> Self {
        self.noise_model = noise_model;
        self
    }

    /// Override the exact-frequency threshold.
    pub fn with_frequency_threshold(mut self, threshold: f64) -> Self {
        self.frequency_threshold = threshold;
        self
    }
}

/// Result of one execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    /// Outcome frequencies, keys listing qubit 0 first.
    pub frequencies: Frequencies,
    /// Final statevector, when requested and available.
    pub statevector: Option<Vec<Complex64>>,
}

/// Adapter-specific exact expectation value of an operator on a prepared
/// statevector.
///
/// When a backend exposes this, the expectation-value engine uses it instead
/// of re-simulating one Pauli circuit per term.
pub trait PreparedStateExpectation: Send + Sync {
    /// ⟨ψ|H|ψ⟩ for `operator` on the `n_qubits`-qubit state `statevector`.
    fn expectation_from_prepared_state(
        &self,
        operator: &QubitOperator,
        n_qubits: u32,
        statevector: &[Complex64],
    ) -> HalResult<Complex64>;
}

/// Trait for simulation backends.
///
/// # Contract
///
/// - `info()` MUST be cached at construction time and never change.
/// - `execute()` MUST NOT mutate the request's circuit or statevector.
/// - `execute()` MUST draw all randomness from `rng`, so that results are
///   reproducible under a fixed seed.
/// - When `request.shots` is set, returned frequencies are empirical and sum
///   to 1; otherwise they are exact probabilities above the threshold.
/// - Statevectors are returned in the order declared by `info()`.
pub trait Backend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Get the declared capabilities of this backend.
    fn info(&self) -> &BackendInfo;

    /// Run a circuit.
    fn execute(&self, request: &ExecutionRequest<'_>, rng: &mut dyn RngCore)
    -> HalResult<Execution>;

    /// Optional exact expectation-value shortcut.
    fn prepared_state_expectation(&self) -> Option<&dyn PreparedStateExpectation> {
        None
    }
}

/// Factory trait for creating backends from configuration.
pub trait BackendFactory: Backend + Sized {
    /// Create a new backend instance from configuration.
    fn from_config(config: BackendConfig) -> HalResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_config_builder() {
        let config = BackendConfig::new("statevector")
            .with_extra("max_qubits", serde_json::json!(12))
            .with_extra("prepared_state_expectation", serde_json::json!(false));

        assert_eq!(config.name, "statevector");
        assert_eq!(config.extra_u64("max_qubits"), Some(12));
        assert_eq!(config.extra_bool("prepared_state_expectation"), Some(false));
        assert_eq!(config.extra_u64("missing"), None);
    }

    #[test]
    fn test_extra_u32_rejects_out_of_range() {
        let config = BackendConfig::new("statevector")
            .with_extra("max_qubits", serde_json::json!(4_294_967_320u64))
            .with_extra("negative", serde_json::json!(-1))
            .with_extra("ok", serde_json::json!(20));

        assert!(matches!(
            config.extra_u32("max_qubits"),
            Err(HalError::Configuration(_))
        ));
        assert!(config.extra_u32("negative").is_err());
        assert_eq!(config.extra_u32("ok").unwrap(), Some(20));
        assert_eq!(config.extra_u32("missing").unwrap(), None);
    }

    #[test]
    fn test_backend_config_flattened_serde() {
        let config: BackendConfig =
            serde_json::from_str(r#"{"name":"trajectory","max_qubits":8}"#).unwrap();
        assert_eq!(config.extra_u64("max_qubits"), Some(8));
    }

    #[test]
    fn test_request_builder() {
        let circuit = Circuit::with_size("c", 2);
        let request = ExecutionRequest::new(&circuit)
            .with_statevector(true)
            .with_shots(Some(10))
            .with_frequency_threshold(1e-6);
        assert!(request.return_statevector);
        assert_eq!(request.shots, Some(10));
        assert!(request.initial_statevector.is_none());
        assert!(request.noise_model.is_none());
        assert_eq!(request.frequency_threshold, 1e-6);
    }
}
