use std::fmt::Display;

use itertools::Itertools;
use owo_colors::OwoColorize;
use tracing::debug;

use crate::{
    machine::Machine,
    product,
    search::distinguishing_sequences,
    trace::{Replay, TraceChecker},
    Show, Symbol,
};

/// The conclusion of comparing a specification with an implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<S, O> {
    /// The input alphabets differ, so the machines cannot be compared.
    Incompatible,
    /// No distinguishing sequence was found.
    Indistinguishable,
    /// Minimal distinguishing sequences were found, the first one was replayed on both machines.
    Distinguished {
        /// All distinguishing sequences of minimal length, in ascending order.
        sequences: Vec<Vec<S>>,
        /// Replay of the first sequence on the specification.
        spec: Replay<O>,
        /// Replay of the first sequence on the implementation.
        imp: Replay<O>,
    },
}

/// Compares two machines and renders the result in a human readable way through its
/// [`Display`] implementation.
#[derive(Debug, Clone)]
pub struct Report<'a, L, R, S, O> {
    spec: &'a Machine<L, S, O>,
    imp: &'a Machine<R, S, O>,
    outcome: Outcome<S, O>,
}

impl<'a, L: Symbol, R: Symbol, S: Symbol, O: Symbol> Report<'a, L, R, S, O> {
    /// Builds the product of `spec` and `imp`, searches distinguishing sequences in it and replays
    /// the first one on both machines. `max_empty_hops` bounds the replay, see [`TraceChecker`].
    pub fn new(
        spec: &'a Machine<L, S, O>,
        imp: &'a Machine<R, S, O>,
        max_empty_hops: Option<usize>,
    ) -> Self {
        let outcome = match product::build(spec, imp) {
            None => Outcome::Incompatible,
            Some(product) => {
                let sequences = distinguishing_sequences(&product);
                match sequences.first() {
                    None => Outcome::Indistinguishable,
                    Some(first) => {
                        debug!("replaying {} on both machines", first.show());
                        let spec = replay(spec, first, max_empty_hops);
                        let imp = replay(imp, first, max_empty_hops);
                        Outcome::Distinguished {
                            sequences,
                            spec,
                            imp,
                        }
                    }
                }
            }
        };
        Self { spec, imp, outcome }
    }

    /// The outcome of the comparison.
    pub fn outcome(&self) -> &Outcome<S, O> {
        &self.outcome
    }
}

fn replay<Q: Symbol, S: Symbol, O: Symbol>(
    machine: &Machine<Q, S, O>,
    input: &[S],
    max_empty_hops: Option<usize>,
) -> Replay<O> {
    let checker = match max_empty_hops {
        Some(bound) => TraceChecker::new(machine).with_max_empty_hops(bound),
        None => TraceChecker::new(machine),
    };
    checker.run(input)
}

fn show_set<'a, T: Show + 'a, I: IntoIterator<Item = &'a T>>(iter: I) -> String {
    format!("{{{}}}", iter.into_iter().map(|x| x.show()).join(", "))
}

fn transition_table<Q: Symbol, S: Symbol, O: Symbol>(machine: &Machine<Q, S, O>) -> String {
    let mut builder = tabled::builder::Builder::default();
    builder.push_record(["From", "Input", "Output", "To"].map(String::from));
    for t in machine.transitions() {
        builder.push_record([
            t.source.show(),
            t.input.show(),
            t.output.show(),
            t.target.show(),
        ]);
    }
    builder
        .build()
        .with(tabled::settings::Style::rounded())
        .to_string()
}

fn machine_info<Q: Symbol, S: Symbol, O: Symbol>(
    f: &mut std::fmt::Formatter<'_>,
    name: &str,
    machine: &Machine<Q, S, O>,
) -> std::fmt::Result {
    writeln!(f, "{}", name.bold())?;
    writeln!(f, "States: {}", show_set(machine.states()))?;
    writeln!(f, "Start: {}", machine.start().show())?;
    writeln!(f, "Input alphabet: {}", show_set(machine.inputs()))?;
    writeln!(f, "Output alphabet: {}", show_set(machine.outputs()))?;
    writeln!(
        f,
        "Deterministic: {}",
        if machine.is_deterministic() { "yes" } else { "no" }
    )?;
    writeln!(f, "{}", transition_table(machine))
}

fn show_replay<O: Symbol>(replay: &Replay<O>) -> String {
    let traces = if replay.traces.is_empty() {
        "none".dimmed().to_string()
    } else {
        replay.traces.iter().map(|t| t.show()).join(", ")
    };
    if replay.truncated {
        format!("{traces} {}", "(truncated)".yellow())
    } else {
        traces
    }
}

impl<L: Symbol, R: Symbol, S: Symbol, O: Symbol> Display for Report<'_, L, R, S, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        machine_info(f, "Specification", self.spec)?;
        writeln!(f)?;
        machine_info(f, "Implementation", self.imp)?;
        writeln!(f)?;

        match &self.outcome {
            Outcome::Incompatible => writeln!(
                f,
                "{}",
                "machines are incompatible, their input alphabets differ".red()
            ),
            Outcome::Indistinguishable => {
                writeln!(f, "{}", "no distinguishing sequence".yellow())
            }
            Outcome::Distinguished {
                sequences,
                spec,
                imp,
            } => {
                writeln!(
                    f,
                    "Distinguishing sequences: {}",
                    sequences.iter().map(|s| s.show().green().to_string()).join(", ")
                )?;
                writeln!(f, "Specification traces: {}", show_replay(spec))?;
                writeln!(f, "Implementation traces: {}", show_replay(imp))
            }
        }
    }
}
