//! Circuit instructions combining operations with operands.

use serde::{Deserialize, Serialize};

use crate::gate::Gate;
use crate::qubit::QubitId;

/// The kind of instruction in a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InstructionKind {
    /// A quantum gate operation.
    Gate(Gate),
    /// Mid-circuit projective measurement in the computational basis.
    Measure,
    /// Reset qubit to |0⟩.
    Reset,
    /// Barrier (synchronization point, no effect on the state).
    Barrier,
}

impl InstructionKind {
    /// Get the name of this instruction kind.
    pub fn name(&self) -> &'static str {
        match self {
            InstructionKind::Gate(g) => g.name(),
            InstructionKind::Measure => "measure",
            InstructionKind::Reset => "reset",
            InstructionKind::Barrier => "barrier",
        }
    }
}

/// A complete instruction with operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The kind of instruction.
    pub kind: InstructionKind,
    /// Qubits this instruction operates on.
    pub qubits: Vec<QubitId>,
}

impl Instruction {
    /// Create a gate instruction.
    pub fn gate(gate: Gate, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Gate(gate),
            qubits: qubits.into_iter().collect(),
        }
    }

    /// Create a single-qubit gate instruction.
    pub fn single_qubit_gate(gate: Gate, qubit: QubitId) -> Self {
        Self::gate(gate, [qubit])
    }

    /// Create a two-qubit gate instruction.
    pub fn two_qubit_gate(gate: Gate, q1: QubitId, q2: QubitId) -> Self {
        Self::gate(gate, [q1, q2])
    }

    /// Create a measurement instruction.
    pub fn measure(qubit: QubitId) -> Self {
        Self {
            kind: InstructionKind::Measure,
            qubits: vec![qubit],
        }
    }

    /// Create a reset instruction.
    pub fn reset(qubit: QubitId) -> Self {
        Self {
            kind: InstructionKind::Reset,
            qubits: vec![qubit],
        }
    }

    /// Create a barrier instruction.
    pub fn barrier(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Barrier,
            qubits: qubits.into_iter().collect(),
        }
    }

    /// Get the name of this instruction.
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Check if this is a gate instruction.
    pub fn is_gate(&self) -> bool {
        matches!(self.kind, InstructionKind::Gate(_))
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        matches!(self.kind, InstructionKind::Measure)
    }

    /// Get the gate if this is a gate instruction.
    pub fn as_gate(&self) -> Option<&Gate> {
        match &self.kind {
            InstructionKind::Gate(g) => Some(g),
            _ => None,
        }
    }

    /// Highest qubit index touched, if any.
    pub fn max_qubit(&self) -> Option<QubitId> {
        self.qubits.iter().copied().max()
    }
}
