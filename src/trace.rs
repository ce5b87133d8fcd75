use tracing::{trace, warn};

use crate::{machine::Machine, Show, Symbol};

/// The result of replaying an input word with a [`TraceChecker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay<O> {
    /// All output words that can be produced while consuming the whole input, in the order in
    /// which they were discovered.
    pub traces: Vec<Vec<O>>,
    /// Is `true` if some run was cut off because it exceeded the bound on consecutive empty-input
    /// transitions. In that case `traces` may be incomplete.
    pub truncated: bool,
}

/// Enumerates the output words a [`Machine`] can produce on an input word.
///
/// The search explores every transition whose input matches the next pending symbol, as well as
/// every transition that consumes nothing. As the latter may form cycles, at most
/// `max_empty_hops` of them are taken in a row, by default as many as the machine has states.
#[derive(Debug, Clone)]
pub struct TraceChecker<'a, Q, S, O> {
    machine: &'a Machine<Q, S, O>,
    max_empty_hops: usize,
}

struct Frame<'a, Q, O> {
    state: &'a Q,
    consumed: usize,
    outputs: Vec<O>,
    empty_hops: usize,
}

impl<'a, Q: Symbol, S: Symbol, O: Symbol> TraceChecker<'a, Q, S, O> {
    /// Creates a checker for `machine` with the default bound on empty-input hops.
    pub fn new(machine: &'a Machine<Q, S, O>) -> Self {
        Self {
            machine,
            max_empty_hops: machine.size(),
        }
    }

    /// Sets the maximal number of consecutive transitions that consume nothing.
    pub fn with_max_empty_hops(mut self, max_empty_hops: usize) -> Self {
        self.max_empty_hops = max_empty_hops;
        self
    }

    /// Replays `input` from the start state of the machine. A run produces a trace as soon as the
    /// whole input has been consumed.
    pub fn run(&self, input: &[S]) -> Replay<O> {
        let mut traces = Vec::new();
        let mut truncated = false;

        let mut stack = vec![Frame {
            state: self.machine.start(),
            consumed: 0,
            outputs: Vec::with_capacity(input.len()),
            empty_hops: 0,
        }];

        while let Some(frame) = stack.pop() {
            let Some(next) = input.get(frame.consumed) else {
                trace!("found trace {}", frame.outputs.show());
                traces.push(frame.outputs);
                continue;
            };

            let mut successors = Vec::new();
            for t in self.machine.transitions_from(frame.state) {
                let (consumed, empty_hops) = if t.consumes(next) {
                    (frame.consumed + 1, 0)
                } else if t.input.is_empty() {
                    if frame.empty_hops >= self.max_empty_hops {
                        truncated = true;
                        continue;
                    }
                    (frame.consumed, frame.empty_hops + 1)
                } else {
                    continue;
                };

                let mut outputs = frame.outputs.clone();
                outputs.push(t.output.clone());
                successors.push(Frame {
                    state: &t.target,
                    consumed,
                    outputs,
                    empty_hops,
                });
            }
            // reversed, such that the first transition is explored first
            stack.extend(successors.into_iter().rev());
        }

        if truncated {
            warn!(
                "replay of {} was cut off after {} consecutive empty-input transitions",
                input.show(),
                self.max_empty_hops
            );
        }

        Replay { traces, truncated }
    }
}

/// Returns every output word that `machine` can produce while consuming `input`, in the order in
/// which a depth-first search discovers them.
pub fn traces<Q: Symbol, S: Symbol, O: Symbol>(
    machine: &Machine<Q, S, O>,
    input: &[S],
) -> Vec<Vec<O>> {
    TraceChecker::new(machine).run(input).traces
}

#[cfg(test)]
mod tests {
    use super::TraceChecker;
    use crate::prelude::*;

    #[test]
    fn branching_in_transition_order() {
        let m = Machine::from_transitions(
            [
                Transition::new(0u32, 'a', 'x', 1),
                Transition::new(0, 'a', 'y', 2),
                Transition::new(1, 'b', 'z', 0),
                Transition::new(2, 'b', 'w', 0),
                Transition::new(2, 'b', 'v', 2),
            ],
            0,
        )
        .unwrap();
        assert_eq!(
            traces(&m, &['a', 'b']),
            vec![vec!['x', 'z'], vec!['y', 'w'], vec!['y', 'v']]
        );
        assert!(traces(&m, &['b']).is_empty());
        assert_eq!(traces(&m, &[]), vec![Vec::<char>::new()]);
    }

    #[test]
    fn empty_inputs_are_followed() {
        let m = Machine::from_transitions(
            [
                Transition::empty(0u32, 'e', 1),
                Transition::new(1, 'a', 'x', 1),
                Transition::new(0, 'a', 'y', 0),
            ],
            0,
        )
        .unwrap();
        let replay = TraceChecker::new(&m).run(&['a']);
        assert_eq!(replay.traces, vec![vec!['e', 'x'], vec!['y']]);
        assert!(!replay.truncated);
    }

    #[test_log::test]
    fn empty_input_cycles_are_bounded() {
        let m = Machine::from_transitions(
            [
                Transition::empty(0u32, 'e', 0),
                Transition::new(0, 'a', 'x', 0),
            ],
            0,
        )
        .unwrap();
        let replay = TraceChecker::new(&m).with_max_empty_hops(2).run(&['a']);
        assert_eq!(
            replay.traces,
            vec![vec!['e', 'e', 'x'], vec!['e', 'x'], vec!['x']]
        );
        assert!(replay.truncated);

        let replay = TraceChecker::new(&m).with_max_empty_hops(0).run(&['a', 'a']);
        assert_eq!(replay.traces, vec![vec!['x', 'x']]);
        assert!(replay.truncated);
    }
}
