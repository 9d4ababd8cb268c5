//! Backend capability descriptor.
//!
//! Every backend declares a fixed [`BackendInfo`] at construction time. The
//! simulation dispatcher and the expectation-value engine read it to decide
//! which code paths are legal; nothing mutates it afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bit ordering of a backend's statevector amplitude indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatevectorOrder {
    /// The natural binary representation of an amplitude index lists qubit 0
    /// first: qubit 0 is the most significant bit of the index.
    LsqFirst,
    /// The natural binary representation of an amplitude index lists the
    /// highest qubit first: qubit `q` is bit `q` of the index.
    MsqFirst,
}

impl fmt::Display for StatevectorOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatevectorOrder::LsqFirst => f.write_str("lsq_first"),
            StatevectorOrder::MsqFirst => f.write_str("msq_first"),
        }
    }
}

/// Declared capabilities of a simulation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendInfo {
    /// Whether the backend accepts a noise model.
    pub noisy_simulation: bool,
    /// Whether the backend can return and accept statevectors.
    pub statevector_available: bool,
    /// Amplitude index convention of returned statevectors.
    pub statevector_order: StatevectorOrder,
}

impl BackendInfo {
    /// Noiseless backend exposing its statevector.
    pub fn statevector(order: StatevectorOrder) -> Self {
        Self {
            noisy_simulation: false,
            statevector_available: true,
            statevector_order: order,
        }
    }

    /// Noisy backend that only reports sampled frequencies.
    pub fn shots_only(noisy_simulation: bool, order: StatevectorOrder) -> Self {
        Self {
            noisy_simulation,
            statevector_available: false,
            statevector_order: order,
        }
    }
}
