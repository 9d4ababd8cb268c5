//! Error types for the HAL crate.

use qlinq_ir::IrError;
use thiserror::Error;

/// Errors that can occur in simulation and expectation-value operations.
///
/// Every variant is raised at the point of detection and is not retriable:
/// these are configuration and programming errors caught at the API
/// boundary, not transient runtime faults.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// Invalid simulator or backend configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Circuit or operator shape does not fit the register.
    #[error("Circuit shape error: {0}")]
    CircuitShape(String),

    /// Operation requires a capability the backend does not declare.
    #[error("Capability error: {0}")]
    Capability(String),

    /// Malformed Pauli term or operator.
    #[error("Invalid operator: {0}")]
    InvalidOperator(String),

    /// Sampling requested over a distribution with no support.
    #[error("Cannot sample from an empty distribution: no outcome is above the probability threshold")]
    EmptyDistribution,

    /// Parity expectation requested over an empty frequency table.
    #[error("Must pass a non-empty frequency table")]
    EmptyFrequencies,

    /// Statevector has an invalid length.
    #[error("Invalid statevector: {0}")]
    InvalidStatevector(String),

    /// Circuit exceeds backend limits.
    #[error("Circuit exceeds backend capabilities: {0}")]
    CircuitTooLarge(String),

    /// Circuit construction failed.
    #[error(transparent)]
    Ir(#[from] IrError),

    /// Generic backend error.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for HAL operations.
pub type HalResult<T> = Result<T, HalError>;
