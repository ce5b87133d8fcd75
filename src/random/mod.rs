use tracing::trace;

use crate::{
    machine::{Machine, Transition},
    Show,
};

/// Machines produced by this module have states `0..size`, inputs `'a', 'b', ...` and outputs
/// `0..outputs`.
pub type RandomMachine = Machine<u32, char, u32>;

/// Returns the first `count` lowercase letters.
fn letters(count: usize) -> impl Iterator<Item = char> {
    assert!(count <= 26, "at most 26 input symbols are supported");
    (0..count).map(|i| (b'a' + i as u8) as char)
}

/// Generates a complete and deterministic machine with `size` states, `inputs` input symbols and
/// outputs drawn from `0..outputs`. For every state and every input symbol, exactly one transition
/// with a uniformly drawn target and output is created. Depending on the drawn targets, some
/// states may be unreachable from the start state `0`.
pub fn random_machine(
    rng: &mut fastrand::Rng,
    size: usize,
    inputs: usize,
    outputs: usize,
) -> RandomMachine {
    assert!(size > 0 && inputs > 0 && outputs > 0, "machine must not be empty");

    let mut transitions = Vec::with_capacity(size * inputs);
    for q in 0..size as u32 {
        for sym in letters(inputs) {
            let target = rng.u32(..size as u32);
            let output = rng.u32(..outputs as u32);
            transitions.push(Transition::new(q, sym, output, target));
        }
    }

    Machine::from_transitions(transitions, 0)
        .expect("a machine with at least one state and symbol has transitions")
}

/// Generates a machine over the same states and symbols as [`random_machine`], where each of the
/// `size * inputs * outputs` possible pairs of input and output is present in a state with
/// probability `density`, pointing to a uniformly drawn target. The start state always has at
/// least one transition.
pub fn random_nondeterministic_machine(
    rng: &mut fastrand::Rng,
    size: usize,
    inputs: usize,
    outputs: usize,
    density: f64,
) -> RandomMachine {
    assert!(size > 0 && inputs > 0 && outputs > 0, "machine must not be empty");

    let mut transitions = vec![];
    for q in 0..size as u32 {
        for sym in letters(inputs) {
            for output in 0..outputs as u32 {
                if rng.f64() < density {
                    transitions.push(Transition::new(q, sym, output, rng.u32(..size as u32)));
                }
            }
        }
    }
    if !transitions.iter().any(|t| t.source == 0) {
        transitions.push(Transition::new(0, 'a', 0, rng.u32(..size as u32)));
    }

    Machine::from_transitions(transitions, 0).expect("the start state has a transition")
}

/// Returns a copy of `machine` in which the output of one uniformly chosen transition is replaced
/// by a different output from `0..outputs`, this is the classical *output fault*. If `outputs` is
/// less than two, the machine is returned unchanged.
pub fn with_output_fault(
    rng: &mut fastrand::Rng,
    machine: &RandomMachine,
    outputs: usize,
) -> RandomMachine {
    let mut transitions = machine.transitions().to_vec();
    if outputs >= 2 {
        let faulty = &mut transitions[rng.usize(..machine.transitions().len())];
        let shift = rng.u32(1..outputs as u32);
        faulty.output = (faulty.output + shift) % outputs as u32;
        trace!("injected output fault {}", faulty.show());
    }
    Machine::from_transitions(transitions, *machine.start())
        .expect("modified machine has as many transitions as the original")
}

/// Returns a copy of `machine` in which the target of one uniformly chosen transition is redrawn,
/// this is the classical *transfer fault*. The new target may coincide with the old one.
pub fn with_transfer_fault(rng: &mut fastrand::Rng, machine: &RandomMachine) -> RandomMachine {
    let mut transitions = machine.transitions().to_vec();
    let size = machine.size() as u32;
    let faulty = &mut transitions[rng.usize(..machine.transitions().len())];
    faulty.target = rng.u32(..size);
    trace!("injected transfer fault {}", faulty.show());
    Machine::from_transitions(transitions, *machine.start())
        .expect("modified machine has as many transitions as the original")
}
