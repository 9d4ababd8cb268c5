//! Shot-by-shot trajectory simulation.
//!
//! Each shot replays the circuit on a fresh copy of the initial state,
//! collapsing on mid-circuit measurements and drawing one realisation of
//! every noise channel, then samples a single final outcome. This is the
//! execution path for noisy runs and for circuits that prepare mixed states.

use rand::{Rng, RngCore};
use rustc_hash::FxHashMap;
use tracing::{debug, instrument};

use qlinq_hal::frequencies::index_to_bitstring;
use qlinq_hal::{
    Backend, BackendConfig, BackendFactory, BackendInfo, Execution, ExecutionRequest, Frequencies,
    HalError, HalResult, StatevectorOrder, statevector_to_frequencies,
};
use qlinq_ir::{Circuit, NoiseModel};

use crate::statevector::Statevector;

/// Default qubit limit for trajectory simulation.
const DEFAULT_MAX_QUBITS: u32 = 20;

/// Run `shots` trajectories of `circuit` from `initial`.
pub(crate) fn run_trajectories(
    circuit: &Circuit,
    initial: &Statevector,
    shots: u64,
    noise: Option<&NoiseModel>,
    rng: &mut dyn RngCore,
) -> HalResult<Frequencies> {
    let n_qubits = initial.num_qubits();
    let readout_error = noise.and_then(NoiseModel::readout_error);
    let mut counts: FxHashMap<usize, u64> = FxHashMap::default();

    for shot in 0..shots {
        let mut sv = initial.clone();
        for inst in circuit.instructions() {
            sv.apply(inst, rng);
            let Some(noise) = noise.filter(|_| inst.is_gate()) else {
                continue;
            };
            for channel in noise.channels_for(inst.name()) {
                for qubit in &inst.qubits {
                    sv.apply_channel(qubit.index(), channel, rng)?;
                }
            }
        }

        let mut outcome = sv.sample(rng);
        if let Some(p) = readout_error {
            for qubit in 0..n_qubits {
                if rng.r#gen::<f64>() < p {
                    outcome ^= 1 << qubit;
                }
            }
        }
        *counts.entry(outcome).or_default() += 1;

        if shot > 0 && shot % 10_000 == 0 {
            debug!("Completed {} shots", shot);
        }
    }

    let shots_f = shots as f64;
    Ok(counts
        .into_iter()
        .map(|(outcome, count)| {
            (
                index_to_bitstring(outcome, n_qubits, StatevectorOrder::MsqFirst),
                count as f64 / shots_f,
            )
        })
        .collect())
}

/// Noisy shot-based simulator.
///
/// Declares noisy simulation and no statevector access, so every
/// expectation value it serves goes through measured frequencies. Noise
/// channels act on each qubit a gate touched right after the gate; the
/// readout error flips each reported bit independently.
pub struct TrajectoryBackend {
    /// Backend configuration.
    config: BackendConfig,
    /// Declared capabilities.
    info: BackendInfo,
    /// Maximum number of qubits supported.
    max_qubits: u32,
}

impl TrajectoryBackend {
    /// Registry name.
    pub const NAME: &'static str = "trajectory";

    /// Create a trajectory backend with default settings.
    pub fn new() -> Self {
        Self::with_max_qubits(DEFAULT_MAX_QUBITS)
    }

    /// Create a trajectory backend with a custom qubit limit.
    pub fn with_max_qubits(max_qubits: u32) -> Self {
        Self {
            config: BackendConfig::new(Self::NAME),
            info: BackendInfo::shots_only(true, StatevectorOrder::MsqFirst),
            max_qubits,
        }
    }
}

impl Default for TrajectoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for TrajectoryBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn info(&self) -> &BackendInfo {
        &self.info
    }

    #[instrument(skip(self, request, rng), fields(
        width = request.circuit.width(),
        shots = ?request.shots,
    ))]
    fn execute(
        &self,
        request: &ExecutionRequest<'_>,
        rng: &mut dyn RngCore,
    ) -> HalResult<Execution> {
        let circuit = request.circuit;
        if circuit.width() > self.max_qubits {
            return Err(HalError::CircuitTooLarge(format!(
                "Circuit has {} qubits but trajectory simulator only supports {}",
                circuit.width(),
                self.max_qubits
            )));
        }
        if request.return_statevector || request.initial_statevector.is_some() {
            return Err(HalError::Capability(
                "trajectory backend does not expose statevectors".into(),
            ));
        }
        let shots = request.shots.ok_or_else(|| {
            HalError::Configuration("trajectory backend requires a number of shots".into())
        })?;

        let noise = request.noise_model.filter(|model| !model.is_empty());
        let initial = Statevector::new(circuit.width() as usize);

        let frequencies = if noise.is_none() && !circuit.is_mixed_state() {
            debug!("Noiseless pure circuit, sampling from a single run");
            let mut sv = initial;
            for inst in circuit.instructions() {
                sv.apply(inst, rng);
            }
            statevector_to_frequencies(
                sv.amplitudes(),
                self.info.statevector_order,
                request.frequency_threshold,
                Some(shots),
                rng,
            )?
        } else {
            debug!(shots, "Running trajectories");
            run_trajectories(circuit, &initial, shots, noise, rng)?
        };

        Ok(Execution {
            frequencies,
            statevector: None,
        })
    }
}

impl BackendFactory for TrajectoryBackend {
    fn from_config(config: BackendConfig) -> HalResult<Self> {
        let max_qubits = config
            .extra_u32("max_qubits")?
            .unwrap_or(DEFAULT_MAX_QUBITS);

        Ok(Self {
            config,
            info: BackendInfo::shots_only(true, StatevectorOrder::MsqFirst),
            max_qubits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qlinq_ir::{NoiseChannel, QubitId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn run(
        backend: &TrajectoryBackend,
        circuit: &Circuit,
        shots: u64,
        noise: Option<&NoiseModel>,
    ) -> HalResult<Execution> {
        let request = ExecutionRequest::new(circuit)
            .with_shots(Some(shots))
            .with_noise_model(noise);
        backend.execute(&request, &mut StdRng::seed_from_u64(17))
    }

    #[test]
    fn test_trajectory_info() {
        let backend = TrajectoryBackend::new();
        assert_eq!(backend.name(), "trajectory");
        assert!(backend.info().noisy_simulation);
        assert!(!backend.info().statevector_available);
    }

    #[test]
    fn test_requires_shots() {
        let backend = TrajectoryBackend::new();
        let circuit = Circuit::with_size("c", 1);
        let result = backend.execute(&ExecutionRequest::new(&circuit), &mut StdRng::seed_from_u64(0));
        assert!(matches!(result, Err(HalError::Configuration(_))));
    }

    #[test]
    fn test_rejects_statevector_requests() {
        let backend = TrajectoryBackend::new();
        let circuit = Circuit::with_size("c", 1);
        let request = ExecutionRequest::new(&circuit)
            .with_shots(Some(10))
            .with_statevector(true);
        let result = backend.execute(&request, &mut StdRng::seed_from_u64(0));
        assert!(matches!(result, Err(HalError::Capability(_))));
    }

    #[test]
    fn test_bell_state_without_noise() {
        let backend = TrajectoryBackend::new();
        let mut circuit = Circuit::with_size("bell", 2);
        circuit.h(QubitId(0)).unwrap().cx(QubitId(0), QubitId(1)).unwrap();

        let freqs = run(&backend, &circuit, 1000, None).unwrap().frequencies;
        let p00 = freqs.get("00").unwrap_or(0.0);
        let p11 = freqs.get("11").unwrap_or(0.0);
        assert!((p00 + p11 - 1.0).abs() < 1e-12);
        assert!(p00 > 0.4 && p11 > 0.4);
    }

    #[test]
    fn test_certain_bit_flip_after_x() {
        let backend = TrajectoryBackend::new();
        let mut circuit = Circuit::with_size("flip", 1);
        circuit.x(QubitId(0)).unwrap();

        let mut noise = NoiseModel::new();
        noise
            .add_quantum_error("x", NoiseChannel::BitFlip { p: 1.0 })
            .unwrap();

        let freqs = run(&backend, &circuit, 200, Some(&noise)).unwrap().frequencies;
        assert_eq!(freqs.get("0"), Some(1.0));
    }

    #[test]
    fn test_readout_error_flips_reported_bits() {
        let backend = TrajectoryBackend::new();
        let mut circuit = Circuit::with_size("idle", 2);
        circuit.barrier_all().unwrap();

        let noise = NoiseModel::new().with_readout_error(1.0).unwrap();
        let freqs = run(&backend, &circuit, 100, Some(&noise)).unwrap().frequencies;
        assert_eq!(freqs.get("11"), Some(1.0));
    }

    #[test]
    fn test_mid_circuit_measurement_statistics() {
        let backend = TrajectoryBackend::new();
        let mut circuit = Circuit::with_size("measured", 2);
        circuit
            .h(QubitId(0))
            .unwrap()
            .measure(QubitId(0))
            .unwrap()
            .cx(QubitId(0), QubitId(1))
            .unwrap();

        let freqs = run(&backend, &circuit, 2000, None).unwrap().frequencies;
        assert!(freqs.get("01").is_none() && freqs.get("10").is_none());
        assert!((freqs.get("00").unwrap_or(0.0) - 0.5).abs() < 0.05);
    }

    #[test]
    fn test_too_many_qubits() {
        let backend = TrajectoryBackend::with_max_qubits(3);
        let circuit = Circuit::with_size("wide", 4);
        let result = run(&backend, &circuit, 10, None);
        assert!(matches!(result, Err(HalError::CircuitTooLarge(_))));
    }

    #[test]
    fn test_from_config_reads_max_qubits() {
        let config =
            BackendConfig::new("trajectory").with_extra("max_qubits", serde_json::json!(6));
        let backend = TrajectoryBackend::from_config(config).unwrap();
        assert_eq!(backend.max_qubits, 6);

        let config = BackendConfig::new("trajectory")
            .with_extra("max_qubits", serde_json::json!(4_294_967_320u64));
        assert!(matches!(
            TrajectoryBackend::from_config(config),
            Err(HalError::Configuration(_))
        ));
    }
}
