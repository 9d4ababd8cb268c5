//! Expectation-value engine.
//!
//! Computes ⟨ψ|H|ψ⟩ for a [`QubitOperator`] H and a state-preparation circuit
//! on whatever backend a [`Simulator`] wraps.
//!
//! # Strategy selection
//!
//! | Condition | Strategy |
//! |-----------|----------|
//! | any coefficient non-real | split H = A + iB, evaluate A and B separately |
//! | noise model, no statevector access, mixed-state or empty circuit | frequencies |
//! | otherwise | statevector |
//!
//! The **frequency** strategy appends each term's measurement-basis rotation
//! to the preparation and reads the term off the outcome parities. Every
//! term starts from the initial statevector (or |0…0⟩), so an empty
//! preparation never materializes a statevector of its own.
//!
//! The **statevector** strategy prepares the state once. A backend-provided
//! [`PreparedStateExpectation`](crate::PreparedStateExpectation) takes over
//! from there when present. Otherwise each term is either applied as Pauli
//! gates and overlapped with the prepared state (no shots), or sampled in
//! its measurement basis (shots configured).
//!
//! Terms are always evaluated independently.

use std::borrow::Cow;

use num_complex::Complex64;
use qlinq_ir::Circuit;
use tracing::{debug, instrument};

use crate::basis::{measurement_basis_circuit, pauli_circuit};
use crate::error::{HalError, HalResult};
use crate::frequencies::expectation_from_frequencies;
use crate::operator::QubitOperator;
use crate::simulator::Simulator;

impl Simulator {
    /// ⟨ψ|H|ψ⟩ for `operator` on the state prepared by `circuit`, optionally
    /// starting from `initial_statevector`.
    ///
    /// Fails with [`HalError::CircuitShape`] naming the first term that
    /// addresses a qubit outside the circuit, and with
    /// [`HalError::Capability`] when an initial statevector is given to a
    /// backend without statevector support.
    #[instrument(skip_all, fields(
        backend = self.backend().name(),
        terms = operator.n_terms(),
        width = circuit.width(),
    ))]
    pub fn expectation_value(
        &self,
        operator: &QubitOperator,
        circuit: &Circuit,
        initial_statevector: Option<&[Complex64]>,
    ) -> HalResult<Complex64> {
        if initial_statevector.is_some() && !self.info().statevector_available {
            return Err(HalError::Capability(format!(
                "statevector not supported by backend '{}'",
                self.backend().name()
            )));
        }

        let width = circuit.width();
        if let Some((term, qubit)) = operator
            .terms()
            .filter_map(|(term, _)| term.max_qubit().map(|q| (term, q)))
            .find(|&(_, q)| q >= width)
        {
            return Err(HalError::CircuitShape(format!(
                "term {term} acts on qubit {qubit} but the circuit contains {width} qubits"
            )));
        }

        if operator.is_real() {
            let value = self.real_expectation(operator, circuit, initial_statevector)?;
            return Ok(Complex64::new(value, 0.0));
        }

        let (real_part, imag_part) = operator.split_real_imag();
        debug!(
            real_terms = real_part.n_terms(),
            imag_terms = imag_part.n_terms(),
            "Splitting complex operator"
        );
        let exp_real = self.real_expectation(&real_part, circuit, initial_statevector)?;
        let exp_imag = self.real_expectation(&imag_part, circuit, initial_statevector)?;
        Ok(Complex64::new(exp_real, exp_imag))
    }

    /// Expectation of an operator whose coefficients are all real.
    fn real_expectation(
        &self,
        operator: &QubitOperator,
        circuit: &Circuit,
        initial_statevector: Option<&[Complex64]>,
    ) -> HalResult<f64> {
        if operator.is_empty() {
            return Ok(0.0);
        }

        let info = self.info();
        let use_frequencies = self.noise_model().is_some()
            || !info.statevector_available
            || circuit.is_mixed_state()
            || circuit.is_empty();

        if use_frequencies {
            debug!("Evaluating expectation from frequencies");
            self.expectation_from_frequency_tables(operator, circuit, initial_statevector)
        } else {
            debug!("Evaluating expectation from statevector");
            self.expectation_from_statevector(operator, circuit, initial_statevector)
        }
    }

    fn missing_statevector(&self) -> HalError {
        HalError::Backend(format!(
            "backend '{}' did not return a statevector",
            self.backend().name()
        ))
    }

    fn expectation_from_statevector(
        &self,
        operator: &QubitOperator,
        circuit: &Circuit,
        initial_statevector: Option<&[Complex64]>,
    ) -> HalResult<f64> {
        let n_qubits = circuit.width();
        let prepared = self.simulate(circuit, true, initial_statevector)?;
        let prepared_state = prepared
            .statevector
            .ok_or_else(|| self.missing_statevector())?;

        if let Some(exact) = self.backend().prepared_state_expectation() {
            debug!("Using backend prepared-state expectation");
            let value = exact.expectation_from_prepared_state(operator, n_qubits, &prepared_state)?;
            return Ok(value.re);
        }

        let mut expectation = 0.0;
        for (term, coeff) in operator.terms() {
            if term.is_identity() {
                expectation += coeff.re;
                continue;
            }

            let term_value: f64 = if self.shots().is_none() {
                let paulis = pauli_circuit(term, n_qubits)?;
                let applied = self.simulate(&paulis, true, Some(&prepared_state))?;
                let pauli_state = applied
                    .statevector
                    .ok_or_else(|| self.missing_statevector())?;
                pauli_state
                    .iter()
                    .zip(&prepared_state)
                    .map(|(p, s)| p.re * s.re + p.im * s.im)
                    .sum()
            } else {
                let basis = measurement_basis_circuit(term, n_qubits)?;
                if basis.is_empty() {
                    expectation_from_frequencies(term, &prepared.frequencies)?
                } else {
                    let measured = self.simulate(&basis, false, Some(&prepared_state))?;
                    expectation_from_frequencies(term, &measured.frequencies)?
                }
            };
            expectation += coeff.re * term_value;
        }
        Ok(expectation)
    }

    fn expectation_from_frequency_tables(
        &self,
        operator: &QubitOperator,
        circuit: &Circuit,
        initial_statevector: Option<&[Complex64]>,
    ) -> HalResult<f64> {
        let n_qubits = circuit.width();

        let mut expectation = 0.0;
        for (term, coeff) in operator.terms() {
            if term.is_identity() {
                expectation += coeff.re;
                continue;
            }

            let basis = measurement_basis_circuit(term, n_qubits)?;
            let full_circuit = if basis.is_empty() {
                Cow::Borrowed(circuit)
            } else {
                Cow::Owned(circuit.compose(&basis))
            };
            let measured = self.simulate(&full_circuit, false, initial_statevector)?;
            expectation += coeff.re * expectation_from_frequencies(term, &measured.frequencies)?;
        }
        Ok(expectation)
    }
}
