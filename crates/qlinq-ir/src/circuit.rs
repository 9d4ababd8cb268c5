//! High-level circuit builder API.

use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::Gate;
use crate::instruction::{Instruction, InstructionKind};
use crate::qubit::QubitId;

/// A quantum circuit.
///
/// An ordered list of instructions over a register of `width` qubits. Every
/// instruction is validated against the register when it is added, so a
/// `Circuit` never addresses a qubit it does not own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCircuit")]
pub struct Circuit {
    /// Name of the circuit.
    name: String,
    /// Number of qubits in the register.
    num_qubits: u32,
    /// Instructions in program order.
    instructions: Vec<Instruction>,
}

/// Unvalidated serde form of a [`Circuit`].
#[derive(Deserialize)]
struct RawCircuit {
    #[serde(default)]
    name: String,
    #[serde(default)]
    num_qubits: Option<u32>,
    #[serde(default)]
    instructions: Vec<Instruction>,
}

impl TryFrom<RawCircuit> for Circuit {
    type Error = IrError;

    fn try_from(raw: RawCircuit) -> IrResult<Self> {
        Circuit::from_instructions(raw.name, raw.num_qubits, raw.instructions)
    }
}

impl Circuit {
    /// Create a new empty circuit with no qubits.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            num_qubits: 0,
            instructions: vec![],
        }
    }

    /// Create an empty circuit over `num_qubits` qubits.
    pub fn with_size(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            instructions: vec![],
        }
    }

    /// Build a circuit from a list of instructions.
    ///
    /// When `num_qubits` is `None` the width is inferred as one past the
    /// highest qubit index used.
    pub fn from_instructions(
        name: impl Into<String>,
        num_qubits: Option<u32>,
        instructions: impl IntoIterator<Item = Instruction>,
    ) -> IrResult<Self> {
        let instructions: Vec<Instruction> = instructions.into_iter().collect();
        let width = num_qubits.unwrap_or_else(|| {
            instructions
                .iter()
                .filter_map(Instruction::max_qubit)
                .max()
                .map_or(0, |q| q.0 + 1)
        });

        let mut circuit = Self::with_size(name, width);
        for instruction in instructions {
            circuit.push(instruction)?;
        }
        Ok(circuit)
    }

    /// Append an instruction after validating its operands.
    pub fn push(&mut self, instruction: Instruction) -> IrResult<&mut Self> {
        self.validate(&instruction)?;
        self.instructions.push(instruction);
        Ok(self)
    }

    fn validate(&self, instruction: &Instruction) -> IrResult<()> {
        let gate_name = || Some(instruction.name().to_string());

        if instruction.qubits.is_empty() {
            return Err(IrError::EmptyOperands(instruction.name().into()));
        }

        if let InstructionKind::Gate(gate) = &instruction.kind {
            let got = instruction.qubits.len() as u32;
            if got != gate.num_qubits() {
                return Err(IrError::QubitCountMismatch {
                    gate_name: gate.name().into(),
                    expected: gate.num_qubits(),
                    got,
                });
            }
        }

        for (i, &qubit) in instruction.qubits.iter().enumerate() {
            if qubit.0 >= self.num_qubits {
                return Err(IrError::QubitNotFound {
                    qubit,
                    width: self.num_qubits,
                    gate_name: gate_name(),
                });
            }
            if instruction.qubits[..i].contains(&qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    gate_name: gate_name(),
                });
            }
        }
        Ok(())
    }

    // =========================================================================
    // Single-qubit gates
    // =========================================================================

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(Gate::H, qubit))
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(Gate::X, qubit))
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(Gate::Y, qubit))
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(Gate::Z, qubit))
    }

    /// Apply S gate.
    pub fn s(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(Gate::S, qubit))
    }

    /// Apply S-dagger gate.
    pub fn sdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(Gate::Sdg, qubit))
    }

    /// Apply T gate.
    pub fn t(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(Gate::T, qubit))
    }

    /// Apply T-dagger gate.
    pub fn tdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(Gate::Tdg, qubit))
    }

    /// Apply sqrt(X) gate.
    pub fn sx(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(Gate::SX, qubit))
    }

    /// Apply sqrt(X)-dagger gate.
    pub fn sxdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(Gate::SXdg, qubit))
    }

    /// Apply Rx rotation gate.
    pub fn rx(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(Gate::Rx(theta), qubit))
    }

    /// Apply Ry rotation gate.
    pub fn ry(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(Gate::Ry(theta), qubit))
    }

    /// Apply Rz rotation gate.
    pub fn rz(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(Gate::Rz(theta), qubit))
    }

    /// Apply phase gate.
    pub fn p(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(Gate::P(theta), qubit))
    }

    /// Apply universal U gate.
    pub fn u(&mut self, theta: f64, phi: f64, lambda: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(
            Gate::U(theta, phi, lambda),
            qubit,
        ))
    }

    // =========================================================================
    // Two-qubit gates
    // =========================================================================

    /// Apply CNOT (CX) gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::two_qubit_gate(Gate::CX, control, target))
    }

    /// Apply CY gate.
    pub fn cy(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::two_qubit_gate(Gate::CY, control, target))
    }

    /// Apply CZ gate.
    pub fn cz(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::two_qubit_gate(Gate::CZ, control, target))
    }

    /// Apply controlled-Hadamard gate.
    pub fn ch(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::two_qubit_gate(Gate::CH, control, target))
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::two_qubit_gate(Gate::Swap, q1, q2))
    }

    /// Apply iSWAP gate.
    pub fn iswap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::two_qubit_gate(Gate::ISwap, q1, q2))
    }

    /// Apply controlled-Rx gate.
    pub fn crx(&mut self, theta: f64, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::two_qubit_gate(Gate::CRx(theta), control, target))
    }

    /// Apply controlled-Ry gate.
    pub fn cry(&mut self, theta: f64, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::two_qubit_gate(Gate::CRy(theta), control, target))
    }

    /// Apply controlled-Rz gate.
    pub fn crz(&mut self, theta: f64, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::two_qubit_gate(Gate::CRz(theta), control, target))
    }

    /// Apply controlled-phase gate.
    pub fn cp(&mut self, theta: f64, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::two_qubit_gate(Gate::CP(theta), control, target))
    }

    // =========================================================================
    // Three-qubit gates
    // =========================================================================

    /// Apply Toffoli (CCX) gate.
    pub fn ccx(&mut self, c1: QubitId, c2: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::gate(Gate::CCX, [c1, c2, target]))
    }

    /// Apply Fredkin (CSWAP) gate.
    pub fn cswap(&mut self, control: QubitId, t1: QubitId, t2: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::gate(Gate::CSwap, [control, t1, t2]))
    }

    // =========================================================================
    // Non-unitary operations
    // =========================================================================

    /// Measure a qubit mid-circuit. Marks the circuit as mixed-state.
    pub fn measure(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::measure(qubit))
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::reset(qubit))
    }

    /// Add a barrier on the given qubits.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        self.push(Instruction::barrier(qubits))
    }

    /// Add a barrier across the whole register.
    pub fn barrier_all(&mut self) -> IrResult<&mut Self> {
        let qubits: Vec<_> = (0..self.num_qubits).map(QubitId).collect();
        self.barrier(qubits)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of qubits in the register.
    pub fn width(&self) -> u32 {
        self.num_qubits
    }

    /// Number of instructions, measurements included.
    pub fn size(&self) -> usize {
        self.instructions.len()
    }

    /// Check if the circuit contains no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Whether the circuit contains a mid-circuit measurement.
    pub fn is_mixed_state(&self) -> bool {
        self.instructions.iter().any(Instruction::is_measure)
    }

    /// Instructions in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Concatenate `other` after `self`.
    ///
    /// The result spans the wider of the two registers; neither input is
    /// modified.
    pub fn compose(&self, other: &Circuit) -> Circuit {
        let mut instructions = Vec::with_capacity(self.size() + other.size());
        instructions.extend_from_slice(&self.instructions);
        instructions.extend_from_slice(&other.instructions);
        Circuit {
            name: self.name.clone(),
            num_qubits: self.num_qubits.max(other.num_qubits),
            instructions,
        }
    }
}

impl Add for &Circuit {
    type Output = Circuit;

    fn add(self, rhs: &Circuit) -> Circuit {
        self.compose(rhs)
    }
}
