//! Frequency tables and the statevector-to-frequency codec.
//!
//! A [`Frequencies`] table maps measurement-outcome bitstrings to either exact
//! probabilities or empirical shot frequencies. Keys always list qubit 0
//! first: `"100"` means qubit 0 measured in |1⟩ and qubits 1 and 2 in |0⟩.
//!
//! The codec is one-way. [`exact_frequencies`] reads probabilities off the
//! amplitudes, keeping only those at or above a threshold, and
//! [`sample_frequencies`] resamples an exact table with a finite number of
//! shots in bounded-memory chunks.

use std::collections::BTreeMap;
use std::collections::btree_map;

use num_complex::Complex64;
use rand::RngCore;
use rand::distributions::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capability::StatevectorOrder;
use crate::error::{HalError, HalResult};
use crate::operator::PauliString;

/// Probabilities below this are omitted from exact frequency tables.
pub const DEFAULT_FREQUENCY_THRESHOLD: f64 = 1e-10;

/// Maximum number of shots drawn per sampling chunk.
pub const SAMPLING_CHUNK_SIZE: u64 = 10_000_000;

/// Sparse histogram of measurement outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frequencies(BTreeMap<String, f64>);

impl Frequencies {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Probability 1.0 on the all-zero outcome of `n_qubits` qubits.
    pub fn zero_state(n_qubits: usize) -> Self {
        let mut table = Self::new();
        table.insert("0".repeat(n_qubits), 1.0);
        table
    }

    /// Set the value for `bitstring`, replacing any previous value.
    pub fn insert(&mut self, bitstring: impl Into<String>, value: f64) {
        self.0.insert(bitstring.into(), value);
    }

    /// Value recorded for `bitstring`, if present.
    pub fn get(&self, bitstring: &str) -> Option<f64> {
        self.0.get(bitstring).copied()
    }

    /// Number of recorded outcomes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no outcome is recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Outcomes in lexicographic order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, f64> {
        self.0.iter()
    }

    /// Sum of all recorded values.
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    /// Bitstring length, taken from the first key.
    pub fn n_qubits(&self) -> Option<usize> {
        self.0.keys().next().map(String::len)
    }

    /// The most likely outcome.
    pub fn most_frequent(&self) -> Option<(&str, f64)> {
        self.0
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, &v)| (k.as_str(), v))
    }

    /// Consume into the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, f64> {
        self.0
    }
}

impl FromIterator<(String, f64)> for Frequencies {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Frequencies {
    type Item = (&'a String, &'a f64);
    type IntoIter = btree_map::Iter<'a, String, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Bitstring encoding
// ---------------------------------------------------------------------------

/// Number of qubits encoded by a statevector of length `len`.
pub fn statevector_qubits(len: usize) -> HalResult<usize> {
    if !len.is_power_of_two() {
        return Err(HalError::InvalidStatevector(format!(
            "length {len} is not a power of two"
        )));
    }
    Ok(len.trailing_zeros() as usize)
}

/// Outcome key for amplitude `index` of a statevector in `order`.
pub fn index_to_bitstring(index: usize, n_qubits: usize, order: StatevectorOrder) -> String {
    let natural = format!("{index:0n_qubits$b}");
    match order {
        StatevectorOrder::LsqFirst => natural,
        StatevectorOrder::MsqFirst => natural.chars().rev().collect(),
    }
}

/// Integer code of an outcome key: character `q` becomes bit `q`.
fn bitstring_to_code(bitstring: &str) -> u64 {
    bitstring
        .bytes()
        .enumerate()
        .filter(|&(_, b)| b == b'1')
        .fold(0, |code, (q, _)| code | (1 << q))
}

/// Outcome key of an integer code: bit `q` becomes character `q`.
fn code_to_bitstring(code: u64, n_qubits: usize) -> String {
    (0..n_qubits)
        .map(|q| if (code >> q) & 1 == 1 { '1' } else { '0' })
        .collect()
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Exact outcome probabilities of `statevector`.
///
/// Outcomes with probability below `threshold` are omitted, so the returned
/// table sums to at most 1.
pub fn exact_frequencies(
    statevector: &[Complex64],
    order: StatevectorOrder,
    threshold: f64,
) -> HalResult<Frequencies> {
    let n_qubits = statevector_qubits(statevector.len())?;
    Ok(statevector
        .iter()
        .enumerate()
        .filter_map(|(i, amplitude)| {
            let probability = amplitude.norm_sqr();
            (probability >= threshold)
                .then(|| (index_to_bitstring(i, n_qubits, order), probability))
        })
        .collect())
}

/// Empirical frequencies of `shots` draws from the exact table `exact`.
///
/// Draws are made in chunks of [`SAMPLING_CHUNK_SIZE`] and only per-outcome
/// counts are kept, so memory does not grow with `shots`. The result is fully
/// determined by the state of `rng`.
pub fn sample_frequencies(
    exact: &Frequencies,
    shots: u64,
    rng: &mut dyn RngCore,
) -> HalResult<Frequencies> {
    sample_in_chunks(exact, shots, SAMPLING_CHUNK_SIZE, rng)
}

pub(crate) fn sample_in_chunks(
    exact: &Frequencies,
    shots: u64,
    chunk_size: u64,
    rng: &mut dyn RngCore,
) -> HalResult<Frequencies> {
    if shots == 0 {
        return Err(HalError::Configuration(
            "number of shots must be positive".into(),
        ));
    }
    let n_qubits = exact.n_qubits().ok_or(HalError::EmptyDistribution)?;

    let (codes, weights): (Vec<u64>, Vec<f64>) = exact
        .iter()
        .map(|(key, &p)| (bitstring_to_code(key), p))
        .unzip();
    let distribution =
        WeightedIndex::new(&weights).map_err(|_| HalError::EmptyDistribution)?;

    let chunk_size = chunk_size.max(1);
    let n_chunks = shots / chunk_size;
    let mut counts = vec![0u64; codes.len()];

    for chunk in 0..=n_chunks {
        let this_chunk = if chunk == n_chunks {
            shots % chunk_size
        } else {
            chunk_size
        };
        for _ in 0..this_chunk {
            counts[distribution.sample(rng)] += 1;
        }
        if this_chunk > 0 {
            debug!(chunk, this_chunk, shots, "Sampled frequency chunk");
        }
    }

    let shots_f = shots as f64;
    Ok(codes
        .iter()
        .zip(&counts)
        .filter(|&(_, &count)| count > 0)
        .map(|(&code, &count)| (code_to_bitstring(code, n_qubits), count as f64 / shots_f))
        .collect())
}

/// Frequencies of `statevector`: exact when `shots` is `None`, sampled
/// otherwise.
pub fn statevector_to_frequencies(
    statevector: &[Complex64],
    order: StatevectorOrder,
    threshold: f64,
    shots: Option<u64>,
    rng: &mut dyn RngCore,
) -> HalResult<Frequencies> {
    let exact = exact_frequencies(statevector, order, threshold)?;
    match shots {
        None => Ok(exact),
        Some(shots) => sample_frequencies(&exact, shots, rng),
    }
}

// ---------------------------------------------------------------------------
// Parity expectation
// ---------------------------------------------------------------------------

/// Expectation of a single Pauli term from outcome frequencies measured in
/// the term's basis.
///
/// Each outcome contributes `(-1)^parity · frequency`, where the parity is
/// taken over the term's qubits. The identity term therefore yields the sum
/// of the frequencies.
pub fn expectation_from_frequencies(
    term: &PauliString,
    frequencies: &Frequencies,
) -> HalResult<f64> {
    let n_qubits = frequencies.n_qubits().ok_or(HalError::EmptyFrequencies)?;

    let mut mask = vec![false; n_qubits];
    for qubit in term.qubits() {
        let slot = mask.get_mut(qubit as usize).ok_or_else(|| {
            HalError::CircuitShape(format!(
                "term {term} addresses qubit {qubit} but outcomes cover {n_qubits} qubits"
            ))
        })?;
        *slot = true;
    }

    Ok(frequencies
        .iter()
        .map(|(outcome, &freq)| {
            let ones = outcome
                .bytes()
                .zip(&mask)
                .filter(|&(bit, &m)| m && bit == b'1')
                .count();
            if ones % 2 == 0 { freq } else { -freq }
        })
        .sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f64::consts::FRAC_1_SQRT_2;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    #[test]
    fn test_bitstring_order() {
        // index 1 = 0b001
        assert_eq!(index_to_bitstring(1, 3, StatevectorOrder::LsqFirst), "001");
        assert_eq!(index_to_bitstring(1, 3, StatevectorOrder::MsqFirst), "100");
        assert_eq!(bitstring_to_code("100"), 1);
        assert_eq!(code_to_bitstring(1, 3), "100");
        assert_eq!(code_to_bitstring(bitstring_to_code("0110"), 4), "0110");
    }

    #[test]
    fn test_exact_frequencies_threshold() {
        let sv = [c(FRAC_1_SQRT_2), c(0.0), c(1e-4), c(FRAC_1_SQRT_2)];
        let freqs = exact_frequencies(&sv, StatevectorOrder::MsqFirst, 1e-10).unwrap();
        assert_eq!(freqs.len(), 3);
        assert!((freqs.get("00").unwrap() - 0.5).abs() < 1e-12);
        assert!((freqs.get("11").unwrap() - 0.5).abs() < 1e-12);
        // index 2 in msq-first order is qubit 1 set
        assert!(freqs.get("01").is_some());

        let coarse = exact_frequencies(&sv, StatevectorOrder::MsqFirst, 1e-6).unwrap();
        assert_eq!(coarse.len(), 2);
    }

    #[test]
    fn test_invalid_statevector_length() {
        let sv = [c(1.0), c(0.0), c(0.0)];
        let err = exact_frequencies(&sv, StatevectorOrder::LsqFirst, 1e-10).unwrap_err();
        assert!(matches!(err, HalError::InvalidStatevector(_)));
    }

    #[test]
    fn test_sampling_empty_support_fails() {
        let sv = [c(1e-8), c(1e-8)];
        let mut rng = StdRng::seed_from_u64(0);
        let exact = exact_frequencies(&sv, StatevectorOrder::LsqFirst, 1e-10).unwrap();
        assert!(exact.is_empty());
        let err = statevector_to_frequencies(
            &sv,
            StatevectorOrder::LsqFirst,
            1e-10,
            Some(100),
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, HalError::EmptyDistribution));
    }

    #[test]
    fn test_sampled_frequencies_sum_to_one() {
        let sv = [c(0.6), c(0.0), c(0.0), c(0.8)];
        let mut rng = StdRng::seed_from_u64(7);
        let freqs =
            statevector_to_frequencies(&sv, StatevectorOrder::MsqFirst, 1e-10, Some(999), &mut rng)
                .unwrap();
        assert!((freqs.total() - 1.0).abs() < 1e-12);
        assert!(freqs.iter().all(|(k, _)| k == "00" || k == "11"));
    }

    #[test]
    fn test_sampling_reproducible_with_seed() {
        let sv = [c(0.5), c(0.5), c(0.5), c(0.5)];
        let exact = exact_frequencies(&sv, StatevectorOrder::LsqFirst, 1e-10).unwrap();
        let a = sample_frequencies(&exact, 5000, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = sample_frequencies(&exact, 5000, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_chunking_does_not_change_samples() {
        let sv = [c(0.5), c(0.5), c(0.5), c(0.5)];
        let exact = exact_frequencies(&sv, StatevectorOrder::LsqFirst, 1e-10).unwrap();
        let whole = sample_in_chunks(&exact, 1234, 1_000_000, &mut StdRng::seed_from_u64(3)).unwrap();
        let chunked = sample_in_chunks(&exact, 1234, 100, &mut StdRng::seed_from_u64(3)).unwrap();
        let exact_multiple = sample_in_chunks(&exact, 1200, 100, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(whole, chunked);
        assert!((exact_multiple.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_shots_rejected() {
        let exact = Frequencies::zero_state(2);
        let err = sample_frequencies(&exact, 0, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, HalError::Configuration(_)));
    }

    #[test]
    fn test_parity_expectation() {
        let mut freqs = Frequencies::new();
        freqs.insert("00", 0.5);
        freqs.insert("10", 0.25);
        freqs.insert("11", 0.25);

        let z0: PauliString = "Z0".parse().unwrap();
        let z1: PauliString = "Z1".parse().unwrap();
        let z0z1: PauliString = "Z0 Z1".parse().unwrap();
        assert!((expectation_from_frequencies(&z0, &freqs).unwrap() - 0.0).abs() < 1e-12);
        assert!((expectation_from_frequencies(&z1, &freqs).unwrap() - 0.5).abs() < 1e-12);
        assert!((expectation_from_frequencies(&z0z1, &freqs).unwrap() - 0.5).abs() < 1e-12);
        let identity = expectation_from_frequencies(&PauliString::identity(), &freqs).unwrap();
        assert!((identity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_parity_rejects_empty_and_wide_terms() {
        let z0: PauliString = "Z0".parse().unwrap();
        let err = expectation_from_frequencies(&z0, &Frequencies::new()).unwrap_err();
        assert!(matches!(err, HalError::EmptyFrequencies));

        let z4: PauliString = "Z4".parse().unwrap();
        let err = expectation_from_frequencies(&z4, &Frequencies::zero_state(2)).unwrap_err();
        assert!(matches!(err, HalError::CircuitShape(_)));
    }
}
