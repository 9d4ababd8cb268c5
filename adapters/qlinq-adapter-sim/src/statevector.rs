//! Statevector simulation engine.
//!
//! Amplitude index bit `q` holds qubit `q`, which is the
//! [`StatevectorOrder::MsqFirst`](qlinq_hal::StatevectorOrder::MsqFirst)
//! layout declared by both backends in this crate.

use num_complex::Complex64;
use rand::{Rng, RngCore};
use std::f64::consts::{FRAC_1_SQRT_2, PI};

use qlinq_hal::frequencies::statevector_qubits;
use qlinq_hal::{HalError, HalResult, PauliOp, PauliString};
use qlinq_ir::{Gate, Instruction, InstructionKind, NoiseChannel};

/// Row-major single-qubit operator.
type Matrix2 = [[Complex64; 2]; 2];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

/// A statevector representing a quantum state.
#[derive(Debug, Clone, PartialEq)]
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Number of qubits.
    num_qubits: usize,
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        let size = 1 << num_qubits;
        let mut amplitudes = vec![ZERO; size];
        amplitudes[0] = ONE;
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Copy an existing amplitude vector.
    pub fn from_amplitudes(amplitudes: &[Complex64]) -> HalResult<Self> {
        let num_qubits = statevector_qubits(amplitudes.len())?;
        Ok(Self {
            amplitudes: amplitudes.to_vec(),
            num_qubits,
        })
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Current amplitudes.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Consume into the amplitude vector.
    pub fn into_amplitudes(self) -> Vec<Complex64> {
        self.amplitudes
    }

    /// Apply an instruction to the statevector.
    ///
    /// Measurements collapse the state onto a random outcome and resets
    /// measure then flip back to |0⟩, both drawing from `rng`.
    pub fn apply(&mut self, instruction: &Instruction, rng: &mut dyn RngCore) {
        let qubits: Vec<usize> = instruction.qubits.iter().map(|q| q.index()).collect();
        match instruction.kind {
            InstructionKind::Gate(gate) => self.apply_gate(&gate, &qubits),
            InstructionKind::Measure => {
                for &qubit in &qubits {
                    self.measure(qubit, rng);
                }
            }
            InstructionKind::Reset => {
                for &qubit in &qubits {
                    self.reset(qubit, rng);
                }
            }
            InstructionKind::Barrier => {}
        }
    }

    /// Apply a gate to specific qubits.
    fn apply_gate(&mut self, gate: &Gate, qubits: &[usize]) {
        match *gate {
            // Single-qubit gates
            Gate::I => {}
            Gate::X => self.apply_x(qubits[0]),
            Gate::Y => self.apply_y(qubits[0]),
            Gate::Z => self.apply_z(qubits[0]),
            Gate::H => self.apply_h(qubits[0]),
            Gate::S => self.apply_phase(qubits[0], PI / 2.0),
            Gate::Sdg => self.apply_phase(qubits[0], -PI / 2.0),
            Gate::T => self.apply_phase(qubits[0], PI / 4.0),
            Gate::Tdg => self.apply_phase(qubits[0], -PI / 4.0),
            Gate::SX => self.apply_single(qubits[0], &sx_matrix(false)),
            Gate::SXdg => self.apply_single(qubits[0], &sx_matrix(true)),
            Gate::Rx(theta) => self.apply_single(qubits[0], &rx_matrix(theta)),
            Gate::Ry(theta) => self.apply_single(qubits[0], &ry_matrix(theta)),
            Gate::Rz(theta) => self.apply_single(qubits[0], &rz_matrix(theta)),
            Gate::P(theta) => self.apply_phase(qubits[0], theta),
            Gate::U(theta, phi, lambda) => {
                self.apply_single(qubits[0], &u_matrix(theta, phi, lambda));
            }

            // Two-qubit gates
            Gate::CX => self.apply_cx(qubits[0], qubits[1]),
            Gate::CY => self.apply_controlled(qubits[0], qubits[1], &y_matrix()),
            Gate::CZ => self.apply_cz(qubits[0], qubits[1]),
            Gate::CH => self.apply_controlled(qubits[0], qubits[1], &h_matrix()),
            Gate::Swap => self.apply_swap(qubits[0], qubits[1]),
            Gate::ISwap => self.apply_iswap(qubits[0], qubits[1]),
            Gate::CRx(theta) => self.apply_controlled(qubits[0], qubits[1], &rx_matrix(theta)),
            Gate::CRy(theta) => self.apply_controlled(qubits[0], qubits[1], &ry_matrix(theta)),
            Gate::CRz(theta) => self.apply_controlled(qubits[0], qubits[1], &rz_matrix(theta)),
            Gate::CP(theta) => self.apply_cp(qubits[0], qubits[1], theta),

            // Three-qubit gates
            Gate::CCX => self.apply_ccx(qubits[0], qubits[1], qubits[2]),
            Gate::CSwap => self.apply_cswap(qubits[0], qubits[1], qubits[2]),
        }
    }

    // =========================================================================
    // Single-qubit gate implementations
    // =========================================================================

    fn apply_single(&mut self, qubit: usize, m: &Matrix2) {
        let mask = 1 << qubit;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = m[0][0] * a + m[0][1] * b;
                self.amplitudes[j] = m[1][0] * a + m[1][1] * b;
            }
        }
    }

    fn apply_x(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                self.amplitudes.swap(i, i | mask);
            }
        }
    }

    fn apply_y(&mut self, qubit: usize) {
        self.apply_single(qubit, &y_matrix());
    }

    fn apply_z(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & mask != 0 {
                *amp = -*amp;
            }
        }
    }

    fn apply_h(&mut self, qubit: usize) {
        self.apply_single(qubit, &h_matrix());
    }

    fn apply_phase(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase = Complex64::from_polar(1.0, theta);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & mask != 0 {
                *amp *= phase;
            }
        }
    }

    // =========================================================================
    // Multi-qubit gate implementations
    // =========================================================================

    fn apply_controlled(&mut self, control: usize, target: usize, m: &Matrix2) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = m[0][0] * a + m[0][1] * b;
                self.amplitudes[j] = m[1][0] * a + m[1][1] * b;
            }
        }
    }

    fn apply_cx(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                self.amplitudes.swap(i, i | tgt_mask);
            }
        }
    }

    fn apply_cz(&mut self, control: usize, target: usize) {
        let both = (1 << control) | (1 << target);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & both == both {
                *amp = -*amp;
            }
        }
    }

    fn apply_cp(&mut self, control: usize, target: usize, theta: f64) {
        let both = (1 << control) | (1 << target);
        let phase = Complex64::from_polar(1.0, theta);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & both == both {
                *amp *= phase;
            }
        }
    }

    fn apply_swap(&mut self, q1: usize, q2: usize) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        for i in 0..self.amplitudes.len() {
            if (i & mask1 != 0) && (i & mask2 == 0) {
                self.amplitudes.swap(i, (i & !mask1) | mask2);
            }
        }
    }

    fn apply_iswap(&mut self, q1: usize, q2: usize) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        for i in 0..self.amplitudes.len() {
            if (i & mask1 != 0) && (i & mask2 == 0) {
                let j = (i & !mask1) | mask2;
                let tmp = self.amplitudes[i];
                self.amplitudes[i] = I * self.amplitudes[j];
                self.amplitudes[j] = I * tmp;
            }
        }
    }

    fn apply_ccx(&mut self, c1: usize, c2: usize, target: usize) {
        let controls = (1 << c1) | (1 << c2);
        let tgt_mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if (i & controls == controls) && (i & tgt_mask == 0) {
                self.amplitudes.swap(i, i | tgt_mask);
            }
        }
    }

    fn apply_cswap(&mut self, control: usize, t1: usize, t2: usize) {
        let ctrl_mask = 1 << control;
        let t1_mask = 1 << t1;
        let t2_mask = 1 << t2;
        for i in 0..self.amplitudes.len() {
            if (i & ctrl_mask != 0) && (i & t1_mask != 0) && (i & t2_mask == 0) {
                self.amplitudes.swap(i, (i & !t1_mask) | t2_mask);
            }
        }
    }

    // =========================================================================
    // Non-unitary operations
    // =========================================================================

    /// Probability of reading 1 on `qubit`.
    pub fn probability_of_one(&self, qubit: usize) -> f64 {
        let mask = 1 << qubit;
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|&(i, _)| i & mask != 0)
            .map(|(_, amp)| amp.norm_sqr())
            .sum()
    }

    /// Projective measurement of `qubit`; returns the outcome.
    pub fn measure(&mut self, qubit: usize, rng: &mut dyn RngCore) -> bool {
        let p1 = self.probability_of_one(qubit);
        let outcome = rng.r#gen::<f64>() < p1;
        self.collapse(qubit, outcome, if outcome { p1 } else { 1.0 - p1 });
        outcome
    }

    fn collapse(&mut self, qubit: usize, outcome: bool, probability: f64) {
        let mask = 1 << qubit;
        let norm = probability.sqrt();
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if (i & mask != 0) == outcome && norm > 0.0 {
                *amp /= norm;
            } else {
                *amp = ZERO;
            }
        }
    }

    fn reset(&mut self, qubit: usize, rng: &mut dyn RngCore) {
        if self.measure(qubit, rng) {
            self.apply_x(qubit);
        }
    }

    /// Apply one stochastic realisation of `channel` on `qubit`.
    pub fn apply_channel(
        &mut self,
        qubit: usize,
        channel: &NoiseChannel,
        rng: &mut dyn RngCore,
    ) -> HalResult<()> {
        if let Some((px, py, pz)) = channel.pauli_probabilities() {
            let r: f64 = rng.r#gen();
            if r < px {
                self.apply_x(qubit);
            } else if r < px + py {
                self.apply_y(qubit);
            } else if r < px + py + pz {
                self.apply_z(qubit);
            }
            return Ok(());
        }

        match *channel {
            NoiseChannel::AmplitudeDamping { gamma } => self.apply_damping(qubit, gamma, true, rng),
            NoiseChannel::PhaseDamping { gamma } => self.apply_damping(qubit, gamma, false, rng),
            _ => {
                return Err(HalError::Backend(format!(
                    "unsupported noise channel '{}'",
                    channel.name()
                )));
            }
        }
        Ok(())
    }

    /// Quantum-jump unravelling of amplitude damping (`relax`) or phase
    /// damping with strength `gamma`.
    fn apply_damping(&mut self, qubit: usize, gamma: f64, relax: bool, rng: &mut dyn RngCore) {
        let mask = 1 << qubit;
        let p1 = self.probability_of_one(qubit);
        let p_jump = gamma * p1;

        if p_jump > 0.0 && rng.r#gen::<f64>() < p_jump {
            let scale = p1.sqrt().recip();
            for i in 0..self.amplitudes.len() {
                if i & mask == 0 {
                    let j = i | mask;
                    let excited = self.amplitudes[j] * scale;
                    if relax {
                        self.amplitudes[i] = excited;
                        self.amplitudes[j] = ZERO;
                    } else {
                        self.amplitudes[i] = ZERO;
                        self.amplitudes[j] = excited;
                    }
                }
            }
        } else {
            let decay = (1.0 - gamma).sqrt();
            let norm = (1.0 - p_jump).sqrt();
            if norm == 0.0 {
                return;
            }
            for (i, amp) in self.amplitudes.iter_mut().enumerate() {
                if i & mask != 0 {
                    *amp *= decay;
                }
                *amp /= norm;
            }
        }
    }

    /// Sample a measurement outcome.
    pub fn sample(&self, rng: &mut dyn RngCore) -> usize {
        let r: f64 = rng.r#gen();

        let mut cumulative = 0.0;
        for (i, amp) in self.amplitudes.iter().enumerate() {
            cumulative += amp.norm_sqr();
            if r < cumulative {
                return i;
            }
        }

        // Rounding left the cumulative sum just under 1.
        self.amplitudes
            .iter()
            .rposition(|amp| amp.norm_sqr() > 0.0)
            .unwrap_or(0)
    }
}

/// ⟨ψ|P|ψ⟩ for the Pauli product `term` on `amplitudes`.
///
/// P maps |i⟩ to a phase times |i ⊕ flip⟩, where `flip` marks the X and Y
/// factors; Y contributes a factor of i and Y and Z a sign on set bits. Every
/// qubit in `term` must be below the register width.
pub fn pauli_expectation(amplitudes: &[Complex64], term: &PauliString) -> f64 {
    let mut flip = 0usize;
    let mut sign_mask = 0usize;
    let mut n_y = 0u32;
    for &(qubit, op) in term.ops() {
        let bit = 1usize << qubit;
        match op {
            PauliOp::X => flip |= bit,
            PauliOp::Y => {
                flip |= bit;
                sign_mask |= bit;
                n_y += 1;
            }
            PauliOp::Z => sign_mask |= bit,
        }
    }

    let overlap: Complex64 = amplitudes
        .iter()
        .enumerate()
        .map(|(i, amp)| {
            let term_amp = amplitudes[i ^ flip].conj() * amp;
            if (i & sign_mask).count_ones() % 2 == 0 {
                term_amp
            } else {
                -term_amp
            }
        })
        .sum();
    (I.powu(n_y) * overlap).re
}

fn h_matrix() -> Matrix2 {
    let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
    [[h, h], [h, -h]]
}

fn y_matrix() -> Matrix2 {
    [[ZERO, -I], [I, ZERO]]
}

fn sx_matrix(dagger: bool) -> Matrix2 {
    let p = Complex64::new(0.5, if dagger { -0.5 } else { 0.5 });
    let m = p.conj();
    [[p, m], [m, p]]
}

fn rx_matrix(theta: f64) -> Matrix2 {
    let (s, c) = (theta / 2.0).sin_cos();
    let c = Complex64::new(c, 0.0);
    let neg_i_s = Complex64::new(0.0, -s);
    [[c, neg_i_s], [neg_i_s, c]]
}

fn ry_matrix(theta: f64) -> Matrix2 {
    let (s, c) = (theta / 2.0).sin_cos();
    [
        [Complex64::new(c, 0.0), Complex64::new(-s, 0.0)],
        [Complex64::new(s, 0.0), Complex64::new(c, 0.0)],
    ]
}

fn rz_matrix(theta: f64) -> Matrix2 {
    [
        [Complex64::from_polar(1.0, -theta / 2.0), ZERO],
        [ZERO, Complex64::from_polar(1.0, theta / 2.0)],
    ]
}

fn u_matrix(theta: f64, phi: f64, lambda: f64) -> Matrix2 {
    let (s, c) = (theta / 2.0).sin_cos();
    [
        [Complex64::new(c, 0.0), -Complex64::from_polar(s, lambda)],
        [
            Complex64::from_polar(s, phi),
            Complex64::from_polar(c, phi + lambda),
        ],
    ]
}
