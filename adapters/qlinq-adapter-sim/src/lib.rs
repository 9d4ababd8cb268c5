//! Qlinq Local Simulators
//!
//! This crate provides the two in-process backends bundled with Qlinq:
//!
//! - [`StatevectorBackend`] (`"statevector"`): exact, noiseless simulation
//!   with statevector access and an exact expectation-value shortcut
//! - [`TrajectoryBackend`] (`"trajectory"`): noisy, shot-based simulation
//!   that only reports measured frequencies
//!
//! Both store amplitudes with qubit `q` at index bit `q`.
//!
//! # Memory
//!
//! | Qubits | Memory |
//! |--------|--------|
//! | 10 | ~16 KB |
//! | 15 | ~512 KB |
//! | 20 | ~16 MB |
//! | 24 | ~256 MB |
//!
//! # Example
//!
//! ```ignore
//! use qlinq_hal::{BackendRegistry, QubitOperator, SimulatorConfig};
//! use qlinq_ir::{Circuit, NoiseChannel, NoiseModel, QubitId};
//!
//! let mut registry = BackendRegistry::new();
//! qlinq_adapter_sim::register_backends(&mut registry);
//!
//! let mut noise = NoiseModel::new();
//! noise.add_quantum_error(NoiseModel::ALL_GATES, NoiseChannel::Depolarizing { p: 0.01 })?;
//!
//! let config = SimulatorConfig::new().with_shots(10_000).with_noise_model(noise);
//! let sim = registry.simulator("trajectory", config)?;
//!
//! let mut circuit = Circuit::with_size("bell", 2);
//! circuit.h(QubitId(0))?.cx(QubitId(0), QubitId(1))?;
//!
//! let zz = QubitOperator::from_term("Z0 Z1".parse()?, 1.0);
//! println!("<ZZ> = {}", sim.expectation_value(&zz, &circuit, None)?.re);
//! ```

mod simulator;
mod statevector;
mod trajectory;

use qlinq_hal::BackendRegistry;

pub use simulator::StatevectorBackend;
pub use statevector::{Statevector, pauli_expectation};
pub use trajectory::TrajectoryBackend;

/// Register every backend in this crate under its default name.
pub fn register_backends(registry: &mut BackendRegistry) {
    registry.register::<StatevectorBackend>(StatevectorBackend::NAME);
    registry.register::<TrajectoryBackend>(TrajectoryBackend::NAME);
}
