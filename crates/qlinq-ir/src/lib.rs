//! Qlinq Circuit Representation
//!
//! This crate provides the circuit and noise-model value types consumed by the
//! Qlinq simulation layer. Circuits are flat, ordered instruction lists over a
//! fixed-width qubit register; they carry no classical registers because every
//! backend reports measurement statistics as bitstring frequencies.
//!
//! # Core Components
//!
//! - **Qubits**: [`QubitId`] addressing a position in the register
//! - **Gates**: [`Gate`] for the built-in gate set (H, X, CX, ...)
//! - **Instructions**: [`Instruction`] combining an operation with its operands
//! - **Circuit**: [`Circuit`] builder API, concatenation and shape queries
//! - **Noise**: [`NoiseModel`] and [`NoiseChannel`] for noisy backends
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use qlinq_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell_state", 2);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//!
//! assert_eq!(circuit.width(), 2);
//! assert_eq!(circuit.size(), 2);
//! assert!(!circuit.is_mixed_state());
//! ```
//!
//! # Example: Concatenation
//!
//! ```rust
//! use qlinq_ir::{Circuit, QubitId};
//!
//! let mut prep = Circuit::with_size("prep", 1);
//! prep.x(QubitId(0)).unwrap();
//!
//! let mut basis = Circuit::with_size("basis", 2);
//! basis.h(QubitId(1)).unwrap();
//!
//! let full = &prep + &basis;
//! assert_eq!(full.width(), 2);
//! assert_eq!(full.size(), 2);
//! ```
//!
//! # Supported Gates
//!
//! | Gate | Qubits | Description |
//! |------|--------|-------------|
//! | `I` | 1 | Identity |
//! | `H` | 1 | Hadamard gate |
//! | `X`, `Y`, `Z` | 1 | Pauli gates |
//! | `S`, `Sdg`, `T`, `Tdg` | 1 | Phase gates |
//! | `SX`, `SXdg` | 1 | sqrt(X) and its inverse |
//! | `Rx`, `Ry`, `Rz`, `P` | 1 | Rotation and phase gates |
//! | `U` | 1 | Universal single-qubit gate U(θ,φ,λ) |
//! | `CX`, `CY`, `CZ`, `CH` | 2 | Controlled Paulis and Hadamard |
//! | `CRx`, `CRy`, `CRz`, `CP` | 2 | Controlled rotations |
//! | `Swap`, `ISwap` | 2 | Swap gates |
//! | `CCX`, `CSwap` | 3 | Toffoli and Fredkin gates |

pub mod circuit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod noise;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::Gate;
pub use instruction::{Instruction, InstructionKind};
pub use noise::{NoiseChannel, NoiseModel};
pub use qubit::QubitId;
