//! Quantum gate types.

use serde::{Deserialize, Serialize};

/// Built-in gates with concrete angles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gate {
    // Single-qubit Pauli gates
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,

    // Single-qubit Clifford gates
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,

    // Single-qubit rotation gates
    /// Rotation around X axis.
    Rx(f64),
    /// Rotation around Y axis.
    Ry(f64),
    /// Rotation around Z axis.
    Rz(f64),
    /// Phase gate.
    P(f64),
    /// Universal single-qubit gate U(θ, φ, λ).
    U(f64, f64, f64),

    // Two-qubit gates
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled-Hadamard gate.
    CH,
    /// SWAP gate.
    Swap,
    /// iSWAP gate.
    ISwap,
    /// Controlled rotation around X.
    CRx(f64),
    /// Controlled rotation around Y.
    CRy(f64),
    /// Controlled rotation around Z.
    CRz(f64),
    /// Controlled phase gate.
    CP(f64),

    // Three-qubit gates
    /// Toffoli gate (CCX).
    CCX,
    /// Fredkin gate (CSWAP).
    CSwap,
}

impl Gate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Gate::I => "id",
            Gate::X => "x",
            Gate::Y => "y",
            Gate::Z => "z",
            Gate::H => "h",
            Gate::S => "s",
            Gate::Sdg => "sdg",
            Gate::T => "t",
            Gate::Tdg => "tdg",
            Gate::SX => "sx",
            Gate::SXdg => "sxdg",
            Gate::Rx(_) => "rx",
            Gate::Ry(_) => "ry",
            Gate::Rz(_) => "rz",
            Gate::P(_) => "p",
            Gate::U(_, _, _) => "u",
            Gate::CX => "cx",
            Gate::CY => "cy",
            Gate::CZ => "cz",
            Gate::CH => "ch",
            Gate::Swap => "swap",
            Gate::ISwap => "iswap",
            Gate::CRx(_) => "crx",
            Gate::CRy(_) => "cry",
            Gate::CRz(_) => "crz",
            Gate::CP(_) => "cp",
            Gate::CCX => "ccx",
            Gate::CSwap => "cswap",
        }
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            Gate::I
            | Gate::X
            | Gate::Y
            | Gate::Z
            | Gate::H
            | Gate::S
            | Gate::Sdg
            | Gate::T
            | Gate::Tdg
            | Gate::SX
            | Gate::SXdg
            | Gate::Rx(_)
            | Gate::Ry(_)
            | Gate::Rz(_)
            | Gate::P(_)
            | Gate::U(_, _, _) => 1,

            Gate::CX
            | Gate::CY
            | Gate::CZ
            | Gate::CH
            | Gate::Swap
            | Gate::ISwap
            | Gate::CRx(_)
            | Gate::CRy(_)
            | Gate::CRz(_)
            | Gate::CP(_) => 2,

            Gate::CCX | Gate::CSwap => 3,
        }
    }

    /// Angles carried by this gate, in declaration order.
    pub fn parameters(&self) -> Vec<f64> {
        match *self {
            Gate::Rx(t)
            | Gate::Ry(t)
            | Gate::Rz(t)
            | Gate::P(t)
            | Gate::CRx(t)
            | Gate::CRy(t)
            | Gate::CRz(t)
            | Gate::CP(t) => vec![t],
            Gate::U(theta, phi, lambda) => vec![theta, phi, lambda],
            _ => vec![],
        }
    }
}
