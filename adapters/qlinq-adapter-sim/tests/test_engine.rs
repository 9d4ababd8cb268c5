//! Property tests for the statevector engine.

use num_complex::Complex64;
use proptest::prelude::*;
use qlinq_adapter_sim::{Statevector, pauli_expectation};
use qlinq_hal::{PauliOp, PauliString};
use qlinq_ir::{Gate, Instruction, QubitId};
use rand::SeedableRng;
use rand::rngs::StdRng;

const N_QUBITS: u32 = 3;

fn gate_strategy() -> impl Strategy<Value = Instruction> {
    let angle = -3.2f64..3.2;
    let q = 0..N_QUBITS;
    prop_oneof![
        (q.clone(), angle.clone()).prop_map(|(q, t)| Instruction::single_qubit_gate(
            Gate::Rx(t),
            QubitId(q)
        )),
        (q.clone(), angle.clone()).prop_map(|(q, t)| Instruction::single_qubit_gate(
            Gate::Ry(t),
            QubitId(q)
        )),
        (q.clone(), angle.clone(), angle.clone(), angle.clone()).prop_map(
            |(q, a, b, c)| Instruction::single_qubit_gate(Gate::U(a, b, c), QubitId(q))
        ),
        q.clone()
            .prop_map(|q| Instruction::single_qubit_gate(Gate::H, QubitId(q))),
        q.clone()
            .prop_map(|q| Instruction::single_qubit_gate(Gate::SX, QubitId(q))),
        (q.clone(), 1..N_QUBITS).prop_map(|(c, shift)| Instruction::two_qubit_gate(
            Gate::CX,
            QubitId(c),
            QubitId((c + shift) % N_QUBITS)
        )),
        (q.clone(), 1..N_QUBITS, angle.clone()).prop_map(|(c, shift, t)| {
            Instruction::two_qubit_gate(Gate::CRy(t), QubitId(c), QubitId((c + shift) % N_QUBITS))
        }),
        (q, 1..N_QUBITS).prop_map(|(c, shift)| Instruction::two_qubit_gate(
            Gate::ISwap,
            QubitId(c),
            QubitId((c + shift) % N_QUBITS)
        )),
    ]
}

fn pauli_strategy() -> impl Strategy<Value = PauliString> {
    proptest::collection::vec(
        prop_oneof![
            Just(None),
            Just(Some(PauliOp::X)),
            Just(Some(PauliOp::Y)),
            Just(Some(PauliOp::Z)),
        ],
        N_QUBITS as usize,
    )
    .prop_map(|ops| {
        PauliString::from_ops(
            ops.into_iter()
                .enumerate()
                .filter_map(|(q, op)| op.map(|op| (q as u32, op))),
        )
        .unwrap()
    })
}

fn prepare(gates: &[Instruction]) -> Statevector {
    let mut rng = StdRng::seed_from_u64(0);
    let mut sv = Statevector::new(N_QUBITS as usize);
    for gate in gates {
        sv.apply(gate, &mut rng);
    }
    sv
}

proptest! {
    #[test]
    fn unitary_gates_preserve_norm(gates in proptest::collection::vec(gate_strategy(), 0..30)) {
        let sv = prepare(&gates);
        let norm: f64 = sv.amplitudes().iter().map(Complex64::norm_sqr).sum();
        prop_assert!((norm - 1.0).abs() < 1e-10);
    }

    #[test]
    fn pauli_expectation_is_bounded(
        gates in proptest::collection::vec(gate_strategy(), 0..30),
        term in pauli_strategy(),
    ) {
        let sv = prepare(&gates);
        let value = pauli_expectation(sv.amplitudes(), &term);
        prop_assert!(value.abs() <= 1.0 + 1e-10);
    }

    #[test]
    fn z_expectation_matches_probabilities(gates in proptest::collection::vec(gate_strategy(), 0..30)) {
        let sv = prepare(&gates);
        for q in 0..N_QUBITS {
            let z = PauliString::single(q, PauliOp::Z);
            let expected = 1.0 - 2.0 * sv.probability_of_one(q as usize);
            prop_assert!((pauli_expectation(sv.amplitudes(), &z) - expected).abs() < 1e-10);
        }
    }
}
