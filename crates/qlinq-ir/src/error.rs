//! Error types for the IR crate.

use crate::qubit::QubitId;
use thiserror::Error;

/// Errors that can occur in IR operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit outside the circuit register.
    #[error("Qubit {qubit} not found in circuit of width {width}{}", format_gate_context(.gate_name))]
    QubitNotFound {
        /// The qubit that was not found.
        qubit: QubitId,
        /// Width of the circuit.
        width: u32,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Gate requires different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Duplicate qubit in operation.
    #[error("Duplicate qubit {qubit} in operation{}", format_gate_context(.gate_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Instruction without operands.
    #[error("Instruction '{0}' has no qubit operands")]
    EmptyOperands(String),

    /// Probability outside [0, 1].
    #[error("Invalid probability {value} for {context}: must lie in [0, 1]")]
    InvalidProbability {
        /// Offending value.
        value: f64,
        /// Channel or parameter the value belongs to.
        context: String,
    },
}

/// Helper function to format optional gate context.
#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
