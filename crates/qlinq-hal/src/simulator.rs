//! Simulation dispatcher.
//!
//! [`Simulator`] wraps a [`Backend`] with backend-independent policy: it
//! validates the configuration against the backend's [`BackendInfo`] at
//! construction, rejects circuits that cannot be simulated, short-circuits
//! empty circuits without touching the backend, and owns the random number
//! generator every stochastic step draws from.

use std::sync::{Mutex, PoisonError};

use num_complex::Complex64;
use qlinq_ir::{Circuit, NoiseModel};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::backend::{Backend, BackendConfig, BackendFactory, Execution, ExecutionRequest};
use crate::capability::BackendInfo;
use crate::error::{HalError, HalResult};
use crate::frequencies::{DEFAULT_FREQUENCY_THRESHOLD, Frequencies, statevector_to_frequencies};

/// User-facing simulator settings.
///
/// Deserializable from JSON or YAML; absent fields take their defaults.
///
/// ```yaml
/// shots: 10000
/// frequency_threshold: 1.0e-10
/// seed: 42
/// noise_model:
///   gate_channels:
///     all:
///       - type: depolarizing
///         p: 0.01
///   readout_error: 0.02
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Number of shots. `None` requests exact results where possible.
    pub shots: Option<u64>,
    /// Noise model for noisy-capable backends.
    pub noise_model: Option<NoiseModel>,
    /// Probabilities below this are dropped from exact frequency tables.
    pub frequency_threshold: f64,
    /// RNG seed. `None` seeds from system entropy.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            shots: None,
            noise_model: None,
            frequency_threshold: DEFAULT_FREQUENCY_THRESHOLD,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of shots.
    pub fn with_shots(mut self, shots: u64) -> Self {
        self.shots = Some(shots);
        self
    }

    /// Set the noise model.
    pub fn with_noise_model(mut self, noise_model: NoiseModel) -> Self {
        self.noise_model = Some(noise_model);
        self
    }

    /// Set the exact-frequency threshold.
    pub fn with_frequency_threshold(mut self, threshold: f64) -> Self {
        self.frequency_threshold = threshold;
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

fn check_threshold(threshold: f64) -> HalResult<()> {
    if threshold.is_finite() && threshold >= 0.0 {
        Ok(())
    } else {
        Err(HalError::Configuration(format!(
            "frequency threshold must be a non-negative number, got {threshold}"
        )))
    }
}

/// A backend together with its shot count, noise model and RNG.
///
/// Whether shots and a noise model are configured is fixed at construction;
/// their values may change afterwards through [`Simulator::set_shots`] and
/// [`Simulator::set_noise_model`].
pub struct Simulator {
    backend: Box<dyn Backend>,
    shots: Option<u64>,
    noise_model: Option<NoiseModel>,
    frequency_threshold: f64,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("backend", &self.backend.name())
            .field("info", self.backend.info())
            .field("shots", &self.shots)
            .field("noise_model", &self.noise_model)
            .field("frequency_threshold", &self.frequency_threshold)
            .finish_non_exhaustive()
    }
}

impl Simulator {
    /// Wrap `backend`, validating `config` against its declared capabilities.
    ///
    /// Fails with [`HalError::Configuration`] when a noise model is given to a
    /// backend without noisy simulation, or when no shot count is given but
    /// exact computation is impossible (no statevector access, or noise).
    pub fn new(backend: Box<dyn Backend>, config: SimulatorConfig) -> HalResult<Self> {
        let info = *backend.info();

        if config.noise_model.is_some() && !info.noisy_simulation {
            return Err(HalError::Configuration(format!(
                "backend '{}' does not support noise models",
                backend.name()
            )));
        }
        if config.shots.is_none() && (!info.statevector_available || config.noise_model.is_some())
        {
            return Err(HalError::Configuration(format!(
                "a number of shots must be specified for backend '{}'",
                backend.name()
            )));
        }
        if config.shots == Some(0) {
            return Err(HalError::Configuration(
                "number of shots must be positive".into(),
            ));
        }
        check_threshold(config.frequency_threshold)?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        debug!(
            backend = backend.name(),
            shots = ?config.shots,
            noisy = config.noise_model.is_some(),
            "Created simulator"
        );

        Ok(Self {
            backend,
            shots: config.shots,
            noise_model: config.noise_model,
            frequency_threshold: config.frequency_threshold,
            rng: Mutex::new(rng),
        })
    }

    /// Construct backend `B` from `backend_config` and wrap it.
    pub fn from_factory<B>(backend_config: BackendConfig, config: SimulatorConfig) -> HalResult<Self>
    where
        B: BackendFactory + 'static,
    {
        Self::new(Box::new(B::from_config(backend_config)?), config)
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Declared capabilities of the wrapped backend.
    pub fn info(&self) -> &BackendInfo {
        self.backend.info()
    }

    /// Configured shot count.
    pub fn shots(&self) -> Option<u64> {
        self.shots
    }

    /// Configured noise model.
    pub fn noise_model(&self) -> Option<&NoiseModel> {
        self.noise_model.as_ref()
    }

    /// Exact-frequency threshold.
    pub fn frequency_threshold(&self) -> f64 {
        self.frequency_threshold
    }

    /// Change the shot count. Only allowed when one was configured.
    pub fn set_shots(&mut self, shots: u64) -> HalResult<()> {
        if self.shots.is_none() {
            return Err(HalError::Configuration(
                "cannot set shots on a simulator constructed without shots".into(),
            ));
        }
        if shots == 0 {
            return Err(HalError::Configuration(
                "number of shots must be positive".into(),
            ));
        }
        self.shots = Some(shots);
        Ok(())
    }

    /// Replace the noise model. Only allowed when one was configured.
    pub fn set_noise_model(&mut self, noise_model: NoiseModel) -> HalResult<()> {
        if self.noise_model.is_none() {
            return Err(HalError::Configuration(
                "cannot set a noise model on a simulator constructed without one".into(),
            ));
        }
        self.noise_model = Some(noise_model);
        Ok(())
    }

    /// Change the exact-frequency threshold.
    pub fn set_frequency_threshold(&mut self, threshold: f64) -> HalResult<()> {
        check_threshold(threshold)?;
        self.frequency_threshold = threshold;
        Ok(())
    }

    /// Reset the RNG to a fixed seed.
    pub fn reseed(&self, seed: u64) {
        *self.lock_rng() = StdRng::seed_from_u64(seed);
    }

    fn lock_rng(&self) -> std::sync::MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulate `circuit` and return its outcome frequencies, plus the final
    /// statevector when `return_statevector` is set.
    ///
    /// Circuits with no instructions are answered without calling the
    /// backend, unless a noise model is configured: the result is
    /// `initial_statevector` (or |0…0⟩) and its frequencies.
    #[instrument(skip(self, circuit, initial_statevector), fields(
        backend = self.backend.name(),
        width = circuit.width(),
        size = circuit.size(),
    ))]
    pub fn simulate(
        &self,
        circuit: &Circuit,
        return_statevector: bool,
        initial_statevector: Option<&[Complex64]>,
    ) -> HalResult<Execution> {
        let info = self.backend.info();

        if circuit.is_mixed_state() && self.shots.is_none() {
            return Err(HalError::Configuration(
                "circuit contains a mid-circuit measurement and prepares a mixed state; \
                 a number of shots must be configured"
                    .into(),
            ));
        }
        if circuit.width() == 0 {
            return Err(HalError::CircuitShape(
                "cannot simulate a circuit with an empty qubit register".into(),
            ));
        }
        if (return_statevector || initial_statevector.is_some()) && !info.statevector_available {
            return Err(HalError::Capability(format!(
                "statevector not supported by backend '{}'",
                self.backend.name()
            )));
        }
        if let Some(sv) = initial_statevector {
            let expected = 1usize
                .checked_shl(circuit.width())
                .filter(|&len| len == sv.len());
            if expected.is_none() {
                return Err(HalError::InvalidStatevector(format!(
                    "length {} does not match a {}-qubit circuit",
                    sv.len(),
                    circuit.width()
                )));
            }
        }

        if circuit.is_empty() && self.noise_model.is_none() {
            debug!("Empty circuit, skipping backend");
            return self.trivial_execution(circuit, return_statevector, initial_statevector);
        }

        let request = ExecutionRequest::new(circuit)
            .with_statevector(return_statevector)
            .with_initial_statevector(initial_statevector)
            .with_shots(self.shots)
            .with_noise_model(self.noise_model.as_ref())
            .with_frequency_threshold(self.frequency_threshold);

        let mut rng = self.lock_rng();
        self.backend.execute(&request, &mut *rng)
    }

    fn trivial_execution(
        &self,
        circuit: &Circuit,
        return_statevector: bool,
        initial_statevector: Option<&[Complex64]>,
    ) -> HalResult<Execution> {
        match initial_statevector {
            Some(sv) => {
                let frequencies = statevector_to_frequencies(
                    sv,
                    self.backend.info().statevector_order,
                    self.frequency_threshold,
                    self.shots,
                    &mut *self.lock_rng(),
                )?;
                Ok(Execution {
                    frequencies,
                    statevector: return_statevector.then(|| sv.to_vec()),
                })
            }
            None => {
                let statevector = if return_statevector {
                    Some(zero_statevector(circuit.width())?)
                } else {
                    None
                };
                Ok(Execution {
                    frequencies: Frequencies::zero_state(circuit.width() as usize),
                    statevector,
                })
            }
        }
    }
}

/// |0…0⟩ over `width` qubits, failing instead of aborting when it cannot be held in memory.
fn zero_statevector(width: u32) -> HalResult<Vec<Complex64>> {
    let too_large = || {
        HalError::CircuitTooLarge(format!(
            "a {width}-qubit statevector does not fit in memory"
        ))
    };
    let len = 1usize.checked_shl(width).ok_or_else(too_large)?;
    let mut sv = Vec::new();
    sv.try_reserve_exact(len).map_err(|_| too_large())?;
    sv.resize(len, Complex64::new(0.0, 0.0));
    sv[0] = Complex64::new(1.0, 0.0);
    Ok(sv)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backend::PreparedStateExpectation;
    use crate::capability::StatevectorOrder;
    use crate::operator::QubitOperator;
    use qlinq_ir::{NoiseChannel, QubitId};
    use rand::RngCore;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that records calls and reports a fixed outcome.
    pub(crate) struct RecordingBackend {
        info: BackendInfo,
        pub(crate) calls: Arc<AtomicUsize>,
        prepared_value: Option<f64>,
    }

    impl RecordingBackend {
        pub(crate) fn new(info: BackendInfo) -> Self {
            Self {
                info,
                calls: Arc::new(AtomicUsize::new(0)),
                prepared_value: None,
            }
        }

        /// Also answer prepared-state expectations with a fixed `value`.
        pub(crate) fn with_prepared_value(mut self, value: f64) -> Self {
            self.prepared_value = Some(value);
            self
        }
    }

    impl PreparedStateExpectation for RecordingBackend {
        fn expectation_from_prepared_state(
            &self,
            _operator: &QubitOperator,
            _n_qubits: u32,
            _statevector: &[Complex64],
        ) -> HalResult<Complex64> {
            Ok(Complex64::new(self.prepared_value.unwrap_or_default(), 0.0))
        }
    }

    impl Backend for RecordingBackend {
        fn name(&self) -> &str {
            "recording"
        }

        fn info(&self) -> &BackendInfo {
            &self.info
        }

        fn execute(
            &self,
            request: &ExecutionRequest<'_>,
            _rng: &mut dyn RngCore,
        ) -> HalResult<Execution> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let width = request.circuit.width() as usize;
            let mut frequencies = Frequencies::new();
            frequencies.insert("1".repeat(width), 1.0);
            let statevector = request.return_statevector.then(|| {
                let mut sv = vec![Complex64::new(0.0, 0.0); 1 << width];
                sv[(1 << width) - 1] = Complex64::new(1.0, 0.0);
                sv
            });
            Ok(Execution {
                frequencies,
                statevector,
            })
        }

        fn prepared_state_expectation(&self) -> Option<&dyn PreparedStateExpectation> {
            self.prepared_value
                .is_some()
                .then_some(self as &dyn PreparedStateExpectation)
        }
    }

    fn exact_backend() -> RecordingBackend {
        RecordingBackend::new(BackendInfo::statevector(StatevectorOrder::MsqFirst))
    }

    fn noisy_backend() -> RecordingBackend {
        RecordingBackend::new(BackendInfo::shots_only(true, StatevectorOrder::MsqFirst))
    }

    fn depolarizing() -> NoiseModel {
        let mut model = NoiseModel::new();
        model
            .add_quantum_error(NoiseModel::ALL_GATES, NoiseChannel::Depolarizing { p: 0.1 })
            .unwrap();
        model
    }

    #[test]
    fn test_noise_on_noiseless_backend_rejected() {
        let config = SimulatorConfig::new()
            .with_shots(100)
            .with_noise_model(depolarizing());
        let err = Simulator::new(Box::new(exact_backend()), config).unwrap_err();
        assert!(matches!(err, HalError::Configuration(_)));
    }

    #[test]
    fn test_shots_required_without_statevector() {
        let err = Simulator::new(Box::new(noisy_backend()), SimulatorConfig::new()).unwrap_err();
        assert!(matches!(err, HalError::Configuration(_)));
        assert!(Simulator::new(Box::new(noisy_backend()), SimulatorConfig::new().with_shots(10)).is_ok());
    }

    #[test]
    fn test_shots_required_with_noise() {
        let backend = RecordingBackend::new(BackendInfo {
            noisy_simulation: true,
            statevector_available: true,
            statevector_order: StatevectorOrder::MsqFirst,
        });
        let config = SimulatorConfig::new().with_noise_model(depolarizing());
        let err = Simulator::new(Box::new(backend), config).unwrap_err();
        assert!(matches!(err, HalError::Configuration(_)));
    }

    #[test]
    fn test_zero_shots_and_bad_threshold_rejected() {
        let err = Simulator::new(Box::new(exact_backend()), SimulatorConfig::new().with_shots(0))
            .unwrap_err();
        assert!(matches!(err, HalError::Configuration(_)));

        let config = SimulatorConfig::new().with_frequency_threshold(f64::NAN);
        assert!(Simulator::new(Box::new(exact_backend()), config).is_err());
    }

    #[test]
    fn test_empty_circuit_short_circuits() {
        let backend = exact_backend();
        let calls = Arc::clone(&backend.calls);
        let sim = Simulator::new(Box::new(backend), SimulatorConfig::new()).unwrap();

        let circuit = Circuit::with_size("empty", 3);
        let result = sim.simulate(&circuit, true, None).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.frequencies.len(), 1);
        assert_eq!(result.frequencies.get("000"), Some(1.0));
        let sv = result.statevector.unwrap();
        assert_eq!(sv.len(), 8);
        assert_eq!(sv[0], Complex64::new(1.0, 0.0));
        assert!(sv[1..].iter().all(|a| *a == Complex64::new(0.0, 0.0)));
    }

    #[test]
    fn test_wide_empty_circuit_does_not_overflow() {
        let backend = exact_backend();
        let calls = Arc::clone(&backend.calls);
        let sim = Simulator::new(Box::new(backend), SimulatorConfig::new()).unwrap();
        let circuit = Circuit::with_size("wide", 64);

        let err = sim.simulate(&circuit, true, None).unwrap_err();
        assert!(matches!(err, HalError::CircuitTooLarge(_)));

        let result = sim.simulate(&circuit, false, None).unwrap();
        assert_eq!(result.frequencies.get(&"0".repeat(64)), Some(1.0));
        assert!(result.statevector.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_circuit_returns_initial_statevector() {
        let backend = exact_backend();
        let calls = Arc::clone(&backend.calls);
        let sim = Simulator::new(Box::new(backend), SimulatorConfig::new()).unwrap();

        let h = std::f64::consts::FRAC_1_SQRT_2;
        let sv = vec![Complex64::new(0.0, 0.0), Complex64::new(h, 0.0), Complex64::new(0.0, 0.0), Complex64::new(0.0, h)];
        let circuit = Circuit::with_size("empty", 2);
        let result = sim.simulate(&circuit, true, Some(&sv)).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.statevector.as_deref(), Some(sv.as_slice()));
        // msq-first: index 1 is qubit 0 set, index 3 is both set
        assert!((result.frequencies.get("10").unwrap() - 0.5).abs() < 1e-12);
        assert!((result.frequencies.get("11").unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_circuit_with_noise_reaches_backend() {
        let backend = noisy_backend();
        let calls = Arc::clone(&backend.calls);
        let config = SimulatorConfig::new().with_shots(10).with_noise_model(depolarizing());
        let sim = Simulator::new(Box::new(backend), config).unwrap();

        sim.simulate(&Circuit::with_size("empty", 1), false, None).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_width_rejected() {
        let sim = Simulator::new(Box::new(exact_backend()), SimulatorConfig::new()).unwrap();
        let err = sim.simulate(&Circuit::new("nothing"), false, None).unwrap_err();
        assert!(matches!(err, HalError::CircuitShape(_)));
    }

    #[test]
    fn test_mixed_state_requires_shots() {
        let sim = Simulator::new(Box::new(exact_backend()), SimulatorConfig::new()).unwrap();
        let mut circuit = Circuit::with_size("mixed", 1);
        circuit.h(QubitId(0)).unwrap().measure(QubitId(0)).unwrap();
        let err = sim.simulate(&circuit, false, None).unwrap_err();
        assert!(matches!(err, HalError::Configuration(_)));
    }

    #[test]
    fn test_statevector_on_shot_backend_rejected() {
        let sim = Simulator::new(Box::new(noisy_backend()), SimulatorConfig::new().with_shots(5)).unwrap();
        let mut circuit = Circuit::with_size("c", 1);
        circuit.x(QubitId(0)).unwrap();
        let err = sim.simulate(&circuit, true, None).unwrap_err();
        assert!(matches!(err, HalError::Capability(_)));

        let sv = [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
        let err = sim.simulate(&circuit, false, Some(&sv)).unwrap_err();
        assert!(matches!(err, HalError::Capability(_)));
    }

    #[test]
    fn test_initial_statevector_length_checked() {
        let sim = Simulator::new(Box::new(exact_backend()), SimulatorConfig::new()).unwrap();
        let sv = [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
        let err = sim.simulate(&Circuit::with_size("c", 2), false, Some(&sv)).unwrap_err();
        assert!(matches!(err, HalError::InvalidStatevector(_)));
    }

    #[test]
    fn test_setters_preserve_presence() {
        let mut exact = Simulator::new(Box::new(exact_backend()), SimulatorConfig::new()).unwrap();
        assert!(matches!(exact.set_shots(100), Err(HalError::Configuration(_))));
        assert!(matches!(exact.set_noise_model(depolarizing()), Err(HalError::Configuration(_))));
        assert_eq!(exact.shots(), None);

        let config = SimulatorConfig::new().with_shots(10).with_noise_model(depolarizing());
        let mut noisy = Simulator::new(Box::new(noisy_backend()), config).unwrap();
        noisy.set_shots(2048).unwrap();
        assert_eq!(noisy.shots(), Some(2048));
        assert!(noisy.set_shots(0).is_err());
        noisy.set_noise_model(NoiseModel::new()).unwrap();
        assert!(noisy.noise_model().unwrap().is_empty());

        noisy.set_frequency_threshold(1e-6).unwrap();
        assert!(noisy.set_frequency_threshold(-1.0).is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = "shots: 1000\nseed: 7\nnoise_model:\n  readout_error: 0.01\n";
        let config: SimulatorConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.shots, Some(1000));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.frequency_threshold, DEFAULT_FREQUENCY_THRESHOLD);
        assert_eq!(config.noise_model.unwrap().readout_error(), Some(0.01));
    }
}
