//! Statevector backend implementation.

use num_complex::Complex64;
use rand::RngCore;
use tracing::{debug, instrument};

use qlinq_hal::frequencies::statevector_qubits;
use qlinq_hal::{
    Backend, BackendConfig, BackendFactory, BackendInfo, Execution, ExecutionRequest, HalError,
    HalResult, PreparedStateExpectation, QubitOperator, StatevectorOrder,
    statevector_to_frequencies,
};

use crate::statevector::{Statevector, pauli_expectation};
use crate::trajectory::run_trajectories;

/// Default qubit limit for statevector simulation.
const DEFAULT_MAX_QUBITS: u32 = 24;

/// Exact, noiseless statevector backend.
///
/// Pure circuits are simulated once; exact frequencies come straight from
/// the final amplitudes and shot counts are sampled from them. Circuits with
/// mid-circuit measurements are replayed shot by shot and never return a
/// statevector.
///
/// The backend also evaluates operators directly on a prepared state, which
/// the expectation-value engine uses in place of one Pauli circuit per term.
pub struct StatevectorBackend {
    /// Backend configuration.
    config: BackendConfig,
    /// Declared capabilities.
    info: BackendInfo,
    /// Maximum number of qubits supported.
    max_qubits: u32,
    /// Whether to offer the prepared-state expectation shortcut.
    prepared_state_expectation: bool,
}

impl StatevectorBackend {
    /// Registry name.
    pub const NAME: &'static str = "statevector";

    /// Create a statevector backend with default settings.
    pub fn new() -> Self {
        Self::with_max_qubits(DEFAULT_MAX_QUBITS)
    }

    /// Create a statevector backend with a custom qubit limit.
    pub fn with_max_qubits(max_qubits: u32) -> Self {
        Self {
            config: BackendConfig::new(Self::NAME),
            info: BackendInfo::statevector(StatevectorOrder::MsqFirst),
            max_qubits,
            prepared_state_expectation: true,
        }
    }

    /// Disable the prepared-state expectation shortcut, so expectation
    /// values go through per-term simulation instead.
    pub fn without_prepared_state_expectation(mut self) -> Self {
        self.prepared_state_expectation = false;
        self
    }

    /// Maximum number of qubits this backend accepts.
    pub fn max_qubits(&self) -> u32 {
        self.max_qubits
    }
}

impl Default for StatevectorBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for StatevectorBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn info(&self) -> &BackendInfo {
        &self.info
    }

    #[instrument(skip(self, request, rng), fields(
        width = request.circuit.width(),
        size = request.circuit.size(),
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
                "Circuit has {} qubits but statevector simulator only supports {}",
                circuit.width(),
                self.max_qubits
            )));
        }
        if request.noise_model.is_some() {
            return Err(HalError::Capability(
                "statevector backend does not simulate noise".into(),
            ));
        }

        let initial = match request.initial_statevector {
            Some(sv) => Statevector::from_amplitudes(sv)?,
            None => Statevector::new(circuit.width() as usize),
        };

        if circuit.is_mixed_state() {
            let shots = request.shots.ok_or_else(|| {
                HalError::Configuration("mixed-state circuits require a number of shots".into())
            })?;
            debug!(shots, "Mixed-state circuit, sampling shot by shot");
            let frequencies = run_trajectories(circuit, &initial, shots, None, rng)?;
            return Ok(Execution {
                frequencies,
                statevector: None,
            });
        }

        let mut state = initial;
        for inst in circuit.instructions() {
            state.apply(inst, rng);
        }
        debug!("Circuit has {} instructions", circuit.size());

        let frequencies = statevector_to_frequencies(
            state.amplitudes(),
            self.info.statevector_order,
            request.frequency_threshold,
            request.shots,
            rng,
        )?;
        Ok(Execution {
            frequencies,
            statevector: request
                .return_statevector
                .then(|| state.into_amplitudes()),
        })
    }

    fn prepared_state_expectation(&self) -> Option<&dyn PreparedStateExpectation> {
        self.prepared_state_expectation
            .then_some(self as &dyn PreparedStateExpectation)
    }
}

impl PreparedStateExpectation for StatevectorBackend {
    fn expectation_from_prepared_state(
        &self,
        operator: &QubitOperator,
        n_qubits: u32,
        statevector: &[Complex64],
    ) -> HalResult<Complex64> {
        let width = statevector_qubits(statevector.len())?;
        if width != n_qubits as usize {
            return Err(HalError::InvalidStatevector(format!(
                "{width}-qubit statevector for a {n_qubits}-qubit register"
            )));
        }
        if let Some(qubit) = operator.max_qubit().filter(|&q| q >= n_qubits) {
            return Err(HalError::CircuitShape(format!(
                "operator acts on qubit {qubit} but the register contains {n_qubits} qubits"
            )));
        }

        Ok(operator
            .terms()
            .map(|(term, coeff)| *coeff * pauli_expectation(statevector, term))
            .sum())
    }
}

impl BackendFactory for StatevectorBackend {
    fn from_config(config: BackendConfig) -> HalResult<Self> {
        let max_qubits = config
            .extra_u32("max_qubits")?
            .unwrap_or(DEFAULT_MAX_QUBITS);
        let prepared_state_expectation = config
            .extra_bool("prepared_state_expectation")
            .unwrap_or(true);

        Ok(Self {
            config,
            info: BackendInfo::statevector(StatevectorOrder::MsqFirst),
            max_qubits,
            prepared_state_expectation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qlinq_ir::{Circuit, NoiseModel, QubitId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn bell() -> Circuit {
        let mut circuit = Circuit::with_size("bell", 2);
        circuit.h(QubitId(0)).unwrap().cx(QubitId(0), QubitId(1)).unwrap();
        circuit
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_statevector_info() {
        let backend = StatevectorBackend::new();
        assert_eq!(backend.name(), "statevector");
        assert_eq!(backend.max_qubits(), 24);
        let info = backend.info();
        assert!(!info.noisy_simulation);
        assert!(info.statevector_available);
        assert_eq!(info.statevector_order, StatevectorOrder::MsqFirst);
        assert!(backend.prepared_state_expectation().is_some());
    }

    #[test]
    fn test_bell_state_exact() {
        let backend = StatevectorBackend::new();
        let circuit = bell();
        let request = ExecutionRequest::new(&circuit).with_statevector(true);
        let result = backend.execute(&request, &mut rng()).unwrap();

        assert_eq!(result.frequencies.len(), 2);
        assert!((result.frequencies.get("00").unwrap() - 0.5).abs() < 1e-12);
        assert!((result.frequencies.get("11").unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(result.statevector.unwrap().len(), 4);
    }

    #[test]
    fn test_bell_state_sampled() {
        let backend = StatevectorBackend::new();
        let circuit = bell();
        let request = ExecutionRequest::new(&circuit).with_shots(Some(1000));
        let result = backend.execute(&request, &mut rng()).unwrap();

        let p00 = result.frequencies.get("00").unwrap_or(0.0);
        let p11 = result.frequencies.get("11").unwrap_or(0.0);
        assert!((p00 + p11 - 1.0).abs() < 1e-12);
        assert!(result.statevector.is_none());
    }

    #[test]
    fn test_ghz_state() {
        let backend = StatevectorBackend::new();
        let mut circuit = Circuit::with_size("ghz", 3);
        circuit
            .h(QubitId(0))
            .unwrap()
            .cx(QubitId(0), QubitId(1))
            .unwrap()
            .cx(QubitId(1), QubitId(2))
            .unwrap();
        let result = backend
            .execute(&ExecutionRequest::new(&circuit), &mut rng())
            .unwrap();

        let keys: Vec<_> = result.frequencies.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["000", "111"]);
    }

    #[test]
    fn test_outcome_keys_list_qubit_zero_first() {
        let backend = StatevectorBackend::new();
        let mut circuit = Circuit::with_size("first", 3);
        circuit.x(QubitId(0)).unwrap();
        let result = backend
            .execute(&ExecutionRequest::new(&circuit), &mut rng())
            .unwrap();
        assert_eq!(result.frequencies.get("100"), Some(1.0));
    }

    #[test]
    fn test_initial_statevector() {
        let backend = StatevectorBackend::new();
        let mut circuit = Circuit::with_size("flip", 1);
        circuit.x(QubitId(0)).unwrap();

        let one = [Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)];
        let request = ExecutionRequest::new(&circuit)
            .with_statevector(true)
            .with_initial_statevector(Some(&one));
        let result = backend.execute(&request, &mut rng()).unwrap();
        assert_eq!(result.frequencies.get("0"), Some(1.0));
    }

    #[test]
    fn test_mixed_state_runs_per_shot() {
        let backend = StatevectorBackend::new();
        let mut circuit = Circuit::with_size("measured", 1);
        circuit.h(QubitId(0)).unwrap().measure(QubitId(0)).unwrap();

        let request = ExecutionRequest::new(&circuit)
            .with_statevector(true)
            .with_shots(Some(500));
        let result = backend.execute(&request, &mut rng()).unwrap();
        assert!(result.statevector.is_none());
        assert!((result.frequencies.total() - 1.0).abs() < 1e-12);

        let without_shots = backend.execute(&ExecutionRequest::new(&circuit), &mut rng());
        assert!(matches!(without_shots, Err(HalError::Configuration(_))));
    }

    #[test]
    fn test_rejects_noise_model() {
        let backend = StatevectorBackend::new();
        let circuit = bell();
        let noise = NoiseModel::new().with_readout_error(0.1).unwrap();
        let request = ExecutionRequest::new(&circuit).with_noise_model(Some(&noise));
        assert!(matches!(
            backend.execute(&request, &mut rng()),
            Err(HalError::Capability(_))
        ));
    }

    #[test]
    fn test_too_many_qubits() {
        let backend = StatevectorBackend::with_max_qubits(5);
        let circuit = Circuit::with_size("test", 10);
        let result = backend.execute(&ExecutionRequest::new(&circuit), &mut rng());
        assert!(matches!(result, Err(HalError::CircuitTooLarge(_))));
    }

    #[test]
    fn test_prepared_state_expectation() {
        let backend = StatevectorBackend::new();
        let circuit = bell();
        let request = ExecutionRequest::new(&circuit).with_statevector(true);
        let sv = backend.execute(&request, &mut rng()).unwrap().statevector.unwrap();

        let mut op = QubitOperator::identity(0.5);
        op.add_term("Z0 Z1".parse().unwrap(), 2.0)
            .add_term("X0".parse().unwrap(), 3.0);
        let value = backend
            .expectation_from_prepared_state(&op, 2, &sv)
            .unwrap();
        assert!((value.re - 2.5).abs() < 1e-12);
        assert!(value.im.abs() < 1e-12);

        let wide = QubitOperator::from_term("Z2".parse().unwrap(), 1.0);
        assert!(matches!(
            backend.expectation_from_prepared_state(&wide, 2, &sv),
            Err(HalError::CircuitShape(_))
        ));
        assert!(matches!(
            backend.expectation_from_prepared_state(&op, 3, &sv),
            Err(HalError::InvalidStatevector(_))
        ));
    }

    #[test]
    fn test_from_config() {
        let config = BackendConfig::new("statevector")
            .with_extra("max_qubits", serde_json::json!(10))
            .with_extra("prepared_state_expectation", serde_json::json!(false));
        let backend = StatevectorBackend::from_config(config).unwrap();
        assert_eq!(backend.max_qubits(), 10);
        assert!(backend.prepared_state_expectation().is_none());
    }

    #[test]
    fn test_from_config_rejects_oversized_max_qubits() {
        let config = BackendConfig::new("statevector")
            .with_extra("max_qubits", serde_json::json!(4_294_967_320u64));
        assert!(matches!(
            StatevectorBackend::from_config(config),
            Err(HalError::Configuration(_))
        ));
    }
}
