//! Qlinq Simulation Abstraction Layer
//!
//! This crate unifies heterogeneous circuit-simulation backends behind one
//! synchronous interface and computes operator expectation values correctly
//! whatever capabilities the chosen backend exposes.
//!
//! # Overview
//!
//! - [`BackendInfo`]: the fixed capability descriptor every backend declares
//!   (noisy simulation, statevector access, amplitude bit order)
//! - [`Backend`]: the adapter contract, a single `execute` primitive plus an
//!   optional [`PreparedStateExpectation`] shortcut
//! - [`Simulator`]: validates configuration against the descriptor, handles
//!   trivial circuits and dispatches to the backend
//! - [`Simulator::expectation_value`]: chooses between frequency-based and
//!   statevector-based evaluation of a [`QubitOperator`]
//! - [`frequencies`]: statevector to frequency-table codec with chunked shot
//!   sampling, and the parity expectation of a single term
//! - [`BackendRegistry`]: name-keyed constructors with a lazily computed
//!   capability snapshot
//!
//! # Example: Expectation Value
//!
//! ```ignore
//! use qlinq_hal::{BackendRegistry, QubitOperator, SimulatorConfig};
//! use qlinq_ir::{Circuit, QubitId};
//!
//! let mut registry = BackendRegistry::new();
//! qlinq_adapter_sim::register_backends(&mut registry);
//!
//! let sim = registry.simulator("statevector", SimulatorConfig::new())?;
//!
//! let mut circuit = Circuit::with_size("flip", 1);
//! circuit.x(QubitId(0))?;
//!
//! let op = QubitOperator::from_term("Z0".parse()?, 1.0);
//! let value = sim.expectation_value(&op, &circuit, None)?;
//! assert!((value.re + 1.0).abs() < 1e-12);
//! ```
//!
//! # Implementing a Custom Backend
//!
//! ```ignore
//! use qlinq_hal::{Backend, BackendInfo, Execution, ExecutionRequest, HalResult};
//! use rand::RngCore;
//!
//! struct MyBackend {
//!     info: BackendInfo,
//! }
//!
//! impl Backend for MyBackend {
//!     fn name(&self) -> &str { "my_backend" }
//!     fn info(&self) -> &BackendInfo { &self.info }
//!     fn execute(&self, request: &ExecutionRequest<'_>, rng: &mut dyn RngCore)
//!         -> HalResult<Execution> {
//!         // Run request.circuit, honouring request.shots and request.noise_model
//!         todo!()
//!     }
//! }
//!
//! let sim = qlinq_hal::Simulator::new(Box::new(MyBackend { info }), config)?;
//! ```

pub mod backend;
pub mod basis;
pub mod capability;
pub mod error;
pub mod expectation;
pub mod frequencies;
pub mod operator;
pub mod registry;
pub mod simulator;

pub use backend::{
    Backend, BackendConfig, BackendFactory, Execution, ExecutionRequest, PreparedStateExpectation,
};
pub use basis::{measurement_basis_gates, pauli_gates};
pub use capability::{BackendInfo, StatevectorOrder};
pub use error::{HalError, HalResult};
pub use frequencies::{
    DEFAULT_FREQUENCY_THRESHOLD, Frequencies, SAMPLING_CHUNK_SIZE, expectation_from_frequencies,
    statevector_to_frequencies,
};
pub use operator::{PauliOp, PauliString, QubitOperator};
pub use registry::BackendRegistry;
pub use simulator::{Simulator, SimulatorConfig};
