//! Measurement-basis and Pauli-application gate lists for operator terms.

use std::f64::consts::FRAC_PI_2;

use qlinq_ir::{Circuit, Gate, Instruction, QubitId};

use crate::error::HalResult;
use crate::operator::{PauliOp, PauliString};

/// Gates rotating each factor of `term` into the computational basis.
///
/// X is measured after Ry(-π/2), Y after Rx(π/2); Z needs no rotation, so a
/// Z-only term (or the identity) yields no gates.
pub fn measurement_basis_gates(term: &PauliString) -> Vec<Instruction> {
    term.ops()
        .iter()
        .filter_map(|&(qubit, op)| match op {
            PauliOp::X => Some(Instruction::single_qubit_gate(
                Gate::Ry(-FRAC_PI_2),
                QubitId(qubit),
            )),
            PauliOp::Y => Some(Instruction::single_qubit_gate(
                Gate::Rx(FRAC_PI_2),
                QubitId(qubit),
            )),
            PauliOp::Z => None,
        })
        .collect()
}

/// The Pauli gates of `term` itself, so that running them maps |ψ⟩ to P|ψ⟩.
pub fn pauli_gates(term: &PauliString) -> Vec<Instruction> {
    term.ops()
        .iter()
        .map(|&(qubit, op)| {
            let gate = match op {
                PauliOp::X => Gate::X,
                PauliOp::Y => Gate::Y,
                PauliOp::Z => Gate::Z,
            };
            Instruction::single_qubit_gate(gate, QubitId(qubit))
        })
        .collect()
}

/// Measurement-basis rotation for `term` as a circuit over `width` qubits.
pub fn measurement_basis_circuit(term: &PauliString, width: u32) -> HalResult<Circuit> {
    Ok(Circuit::from_instructions(
        format!("basis[{term}]"),
        Some(width),
        measurement_basis_gates(term),
    )?)
}

/// Pauli application for `term` as a circuit over `width` qubits.
pub fn pauli_circuit(term: &PauliString, width: u32) -> HalResult<Circuit> {
    Ok(Circuit::from_instructions(
        format!("pauli[{term}]"),
        Some(width),
        pauli_gates(term),
    )?)
}
