//! Noise channel and noise model types.
//!
//! A [`NoiseModel`] attaches single-qubit [`NoiseChannel`]s to gate names.
//! After a gate executes, every channel registered for that gate name (and
//! every channel registered under [`NoiseModel::ALL_GATES`]) acts on each qubit
//! the gate touched. An optional symmetric readout error flips reported
//! measurement outcomes.
//!
//! Only noisy-capable backends accept a noise model; the simulation layer
//! rejects one at construction time otherwise.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{IrError, IrResult};

/// A single-qubit noise channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum NoiseChannel {
    /// Stochastic Pauli channel: applies X, Y or Z with the given
    /// probabilities, identity otherwise.
    Pauli {
        /// Probability of an X error.
        px: f64,
        /// Probability of a Y error.
        py: f64,
        /// Probability of a Z error.
        pz: f64,
    },

    /// Depolarizing channel: X, Y and Z each with probability `p / 3`.
    Depolarizing {
        /// Total error probability (0.0 to 1.0).
        p: f64,
    },

    /// Bit-flip channel: flips |0⟩ ↔ |1⟩ with probability `p`.
    BitFlip {
        /// Flip probability (0.0 to 1.0).
        p: f64,
    },

    /// Phase-flip channel: applies Z with probability `p`.
    PhaseFlip {
        /// Flip probability (0.0 to 1.0).
        p: f64,
    },

    /// Amplitude damping: models energy relaxation (T1 decay).
    AmplitudeDamping {
        /// Damping parameter (0.0 to 1.0).
        gamma: f64,
    },

    /// Phase damping: models dephasing (T2 decay without energy loss).
    PhaseDamping {
        /// Dephasing parameter (0.0 to 1.0).
        gamma: f64,
    },
}

impl NoiseChannel {
    /// Get a human-readable name for this channel.
    pub fn name(&self) -> &'static str {
        match self {
            NoiseChannel::Pauli { .. } => "pauli",
            NoiseChannel::Depolarizing { .. } => "depolarizing",
            NoiseChannel::BitFlip { .. } => "bit_flip",
            NoiseChannel::PhaseFlip { .. } => "phase_flip",
            NoiseChannel::AmplitudeDamping { .. } => "amplitude_damping",
            NoiseChannel::PhaseDamping { .. } => "phase_damping",
        }
    }

    /// Probabilities of applying (X, Y, Z), for channels that are
    /// stochastic Pauli mixtures. `None` for damping channels.
    pub fn pauli_probabilities(&self) -> Option<(f64, f64, f64)> {
        match *self {
            NoiseChannel::Pauli { px, py, pz } => Some((px, py, pz)),
            NoiseChannel::Depolarizing { p } => Some((p / 3.0, p / 3.0, p / 3.0)),
            NoiseChannel::BitFlip { p } => Some((p, 0.0, 0.0)),
            NoiseChannel::PhaseFlip { p } => Some((0.0, 0.0, p)),
            NoiseChannel::AmplitudeDamping { .. } | NoiseChannel::PhaseDamping { .. } => None,
        }
    }

    /// Check that every probability is in range.
    pub fn validate(&self) -> IrResult<()> {
        let check = |value: f64| -> IrResult<()> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(IrError::InvalidProbability {
                    value,
                    context: self.name().into(),
                })
            }
        };
        match *self {
            NoiseChannel::Pauli { px, py, pz } => {
                check(px)?;
                check(py)?;
                check(pz)?;
                check(px + py + pz)
            }
            NoiseChannel::Depolarizing { p }
            | NoiseChannel::BitFlip { p }
            | NoiseChannel::PhaseFlip { p } => check(p),
            NoiseChannel::AmplitudeDamping { gamma } | NoiseChannel::PhaseDamping { gamma } => {
                check(gamma)
            }
        }
    }
}

impl fmt::Display for NoiseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoiseChannel::Pauli { px, py, pz } => {
                write!(f, "pauli(px={px:.4}, py={py:.4}, pz={pz:.4})")
            }
            NoiseChannel::Depolarizing { p } => write!(f, "depolarizing(p={p:.4})"),
            NoiseChannel::BitFlip { p } => write!(f, "bit_flip(p={p:.4})"),
            NoiseChannel::PhaseFlip { p } => write!(f, "phase_flip(p={p:.4})"),
            NoiseChannel::AmplitudeDamping { gamma } => {
                write!(f, "amplitude_damping(γ={gamma:.4})")
            }
            NoiseChannel::PhaseDamping { gamma } => write!(f, "phase_damping(γ={gamma:.4})"),
        }
    }
}

/// Gate-level noise model for noisy simulation backends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNoiseModel")]
pub struct NoiseModel {
    /// Channels keyed by gate name (`"cx"`, `"h"`, ...) or [`Self::ALL_GATES`].
    gate_channels: BTreeMap<String, Vec<NoiseChannel>>,
    /// Probability that a measured bit is reported flipped.
    readout_error: Option<f64>,
}

#[derive(Deserialize)]
struct RawNoiseModel {
    #[serde(default)]
    gate_channels: BTreeMap<String, Vec<NoiseChannel>>,
    #[serde(default)]
    readout_error: Option<f64>,
}

impl TryFrom<RawNoiseModel> for NoiseModel {
    type Error = IrError;

    fn try_from(raw: RawNoiseModel) -> IrResult<Self> {
        let mut model = NoiseModel::new();
        for (gate, channels) in raw.gate_channels {
            for channel in channels {
                model.add_quantum_error(gate.clone(), channel)?;
            }
        }
        if let Some(p) = raw.readout_error {
            model = model.with_readout_error(p)?;
        }
        Ok(model)
    }
}

impl NoiseModel {
    /// Key under which a channel applies after every gate.
    pub const ALL_GATES: &'static str = "all";

    /// Create an empty noise model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `channel` to act after every gate named `gate`.
    pub fn add_quantum_error(
        &mut self,
        gate: impl Into<String>,
        channel: NoiseChannel,
    ) -> IrResult<&mut Self> {
        channel.validate()?;
        self.gate_channels.entry(gate.into()).or_default().push(channel);
        Ok(self)
    }

    /// Set a symmetric readout error probability.
    pub fn with_readout_error(mut self, p: f64) -> IrResult<Self> {
        if !(0.0..=1.0).contains(&p) {
            return Err(IrError::InvalidProbability {
                value: p,
                context: "readout_error".into(),
            });
        }
        self.readout_error = Some(p);
        Ok(self)
    }

    /// Channels acting after a gate named `gate_name`, gate-specific first.
    pub fn channels_for<'a>(&'a self, gate_name: &str) -> impl Iterator<Item = &'a NoiseChannel> {
        let specific = self.gate_channels.get(gate_name).into_iter().flatten();
        let global = self.gate_channels.get(Self::ALL_GATES).into_iter().flatten();
        specific.chain(global)
    }

    /// Readout error probability, if any.
    pub fn readout_error(&self) -> Option<f64> {
        self.readout_error
    }

    /// Whether the model has no effect on a simulation.
    pub fn is_empty(&self) -> bool {
        self.gate_channels.values().all(Vec::is_empty) && self.readout_error.is_none_or(|p| p == 0.0)
    }
}
