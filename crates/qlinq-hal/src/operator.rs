//! Weighted Pauli-string operators.
//!
//! A [`QubitOperator`] maps [`PauliString`] terms to complex coefficients.
//! Terms are kept in a canonical form (sorted by qubit, identity factors
//! dropped, one factor per qubit) so that equal products always compare equal
//! and accumulate into the same coefficient.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Mul};
use std::str::FromStr;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{HalError, HalResult};

/// Single-qubit Pauli label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PauliOp {
    /// Pauli X.
    X,
    /// Pauli Y.
    Y,
    /// Pauli Z.
    Z,
}

impl PauliOp {
    fn as_char(self) -> char {
        match self {
            PauliOp::X => 'X',
            PauliOp::Y => 'Y',
            PauliOp::Z => 'Z',
        }
    }
}

/// Product of single-qubit Paulis on distinct qubits.
///
/// Displayed and parsed as whitespace-separated factors such as `"X0 Y1 Z3"`.
/// The identity is the empty product, displayed as `"I"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PauliString {
    ops: Vec<(u32, PauliOp)>,
}

impl PauliString {
    /// The identity term.
    pub fn identity() -> Self {
        Self::default()
    }

    /// A single-factor term.
    pub fn single(qubit: u32, op: PauliOp) -> Self {
        Self {
            ops: vec![(qubit, op)],
        }
    }

    /// Build a term from `(qubit, op)` factors in any order.
    ///
    /// Fails if a qubit appears more than once.
    pub fn from_ops(ops: impl IntoIterator<Item = (u32, PauliOp)>) -> HalResult<Self> {
        let mut ops: Vec<_> = ops.into_iter().collect();
        ops.sort_by_key(|&(q, _)| q);
        if let Some(w) = ops.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(HalError::InvalidOperator(format!(
                "qubit {} appears more than once in term",
                w[0].0
            )));
        }
        Ok(Self { ops })
    }

    /// Factors sorted by qubit index.
    pub fn ops(&self) -> &[(u32, PauliOp)] {
        &self.ops
    }

    /// Qubits acted on non-trivially.
    pub fn qubits(&self) -> impl Iterator<Item = u32> + '_ {
        self.ops.iter().map(|&(q, _)| q)
    }

    /// Whether this is the identity term.
    pub fn is_identity(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of non-identity factors.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Same as [`Self::is_identity`].
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Highest qubit index acted on, if any.
    pub fn max_qubit(&self) -> Option<u32> {
        self.ops.last().map(|&(q, _)| q)
    }
}

impl fmt::Display for PauliString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ops.is_empty() {
            return f.write_str("I");
        }
        for (i, (qubit, op)) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}{}", op.as_char(), qubit)?;
        }
        Ok(())
    }
}

impl FromStr for PauliString {
    type Err = HalError;

    fn from_str(s: &str) -> HalResult<Self> {
        let mut ops = Vec::new();
        for token in s.split_whitespace() {
            let mut chars = token.chars();
            let label = chars.next().map(|c| c.to_ascii_uppercase());
            let index = chars.as_str();
            let op = match label {
                Some('I') if index.is_empty() => continue,
                Some('X') => PauliOp::X,
                Some('Y') => PauliOp::Y,
                Some('Z') => PauliOp::Z,
                _ => {
                    return Err(HalError::InvalidOperator(format!(
                        "unrecognized Pauli factor '{token}'"
                    )));
                }
            };
            let qubit = index.parse::<u32>().map_err(|_| {
                HalError::InvalidOperator(format!("missing or invalid qubit index in '{token}'"))
            })?;
            ops.push((qubit, op));
        }
        Self::from_ops(ops)
    }
}

impl TryFrom<String> for PauliString {
    type Error = HalError;

    fn try_from(s: String) -> HalResult<Self> {
        s.parse()
    }
}

impl From<PauliString> for String {
    fn from(term: PauliString) -> Self {
        term.to_string()
    }
}

/// Serialized form of one operator term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermEntry {
    /// The Pauli product.
    pub term: PauliString,
    /// Its coefficient, serialized as `[re, im]`.
    pub coeff: Complex64,
}

/// Linear combination of Pauli strings with complex coefficients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<TermEntry>", into = "Vec<TermEntry>")]
pub struct QubitOperator {
    terms: BTreeMap<PauliString, Complex64>,
}

impl QubitOperator {
    /// Create the zero operator.
    pub fn new() -> Self {
        Self::default()
    }

    /// `coeff · I`.
    pub fn identity(coeff: impl Into<Complex64>) -> Self {
        Self::from_term(PauliString::identity(), coeff)
    }

    /// A single weighted term.
    pub fn from_term(term: PauliString, coeff: impl Into<Complex64>) -> Self {
        let mut op = Self::new();
        op.add_term(term, coeff);
        op
    }

    /// Add `coeff · term`, accumulating onto an existing coefficient.
    pub fn add_term(&mut self, term: PauliString, coeff: impl Into<Complex64>) -> &mut Self {
        *self.terms.entry(term).or_default() += coeff.into();
        self
    }

    /// Terms in canonical order.
    pub fn terms(&self) -> impl Iterator<Item = (&PauliString, &Complex64)> {
        self.terms.iter()
    }

    /// Coefficient of `term`, if present.
    pub fn coefficient(&self, term: &PauliString) -> Option<Complex64> {
        self.terms.get(term).copied()
    }

    /// Number of terms.
    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }

    /// Whether there are no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether every coefficient has a zero imaginary part.
    pub fn is_real(&self) -> bool {
        self.terms.values().all(|c| c.im == 0.0)
    }

    /// Drop terms whose coefficient magnitude is at most `abs_tol`.
    pub fn compress(&mut self, abs_tol: f64) {
        self.terms.retain(|_, c| c.norm() > abs_tol);
    }

    /// Split into real-coefficient operators `(A, B)` with `self = A + iB`.
    ///
    /// Terms whose part is exactly zero are dropped from that half.
    pub fn split_real_imag(&self) -> (QubitOperator, QubitOperator) {
        let mut real = QubitOperator::new();
        let mut imag = QubitOperator::new();
        for (term, coeff) in &self.terms {
            real.terms.insert(term.clone(), Complex64::new(coeff.re, 0.0));
            imag.terms.insert(term.clone(), Complex64::new(coeff.im, 0.0));
        }
        real.compress(0.0);
        imag.compress(0.0);
        (real, imag)
    }

    /// Highest qubit index acted on by any term.
    pub fn max_qubit(&self) -> Option<u32> {
        self.terms.keys().filter_map(PauliString::max_qubit).max()
    }

    /// Smallest register width every term fits in.
    pub fn min_qubits(&self) -> u32 {
        self.max_qubit().map_or(0, |q| q + 1)
    }
}

impl From<Vec<TermEntry>> for QubitOperator {
    fn from(entries: Vec<TermEntry>) -> Self {
        let mut op = QubitOperator::new();
        for entry in entries {
            op.add_term(entry.term, entry.coeff);
        }
        op
    }
}

impl From<QubitOperator> for Vec<TermEntry> {
    fn from(op: QubitOperator) -> Self {
        op.terms
            .into_iter()
            .map(|(term, coeff)| TermEntry { term, coeff })
            .collect()
    }
}

impl fmt::Display for QubitOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return f.write_str("0");
        }
        for (i, (term, coeff)) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            write!(f, "({coeff}) [{term}]")?;
        }
        Ok(())
    }
}

impl Add for QubitOperator {
    type Output = QubitOperator;

    fn add(mut self, rhs: QubitOperator) -> QubitOperator {
        for (term, coeff) in rhs.terms {
            self.add_term(term, coeff);
        }
        self
    }
}

impl Mul<f64> for QubitOperator {
    type Output = QubitOperator;

    fn mul(self, rhs: f64) -> QubitOperator {
        self * Complex64::new(rhs, 0.0)
    }
}

impl Mul<Complex64> for QubitOperator {
    type Output = QubitOperator;

    fn mul(mut self, rhs: Complex64) -> QubitOperator {
        for coeff in self.terms.values_mut() {
            *coeff *= rhs;
        }
        self
    }
}
