use thiserror::Error;
use tracing::trace;

use crate::{
    math::{OrderedSet, Set},
    Show, Symbol,
};

/// The input of a [`Transition`]. Apart from the symbols of the input alphabet, a transition may
/// be labelled with the empty input, which means that it moves to its target and emits its output
/// without consuming anything. [`Input::Empty`] is never an element of an input alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Input<S> {
    /// Consumes no input.
    Empty,
    /// Consumes the given symbol.
    Sym(S),
}

impl<S> Input<S> {
    /// Returns the consumed symbol, `None` for [`Input::Empty`].
    pub fn symbol(&self) -> Option<&S> {
        match self {
            Input::Empty => None,
            Input::Sym(sym) => Some(sym),
        }
    }

    /// Returns `true` if and only if nothing is consumed.
    pub fn is_empty(&self) -> bool {
        matches!(self, Input::Empty)
    }
}

impl<S: Show> Show for Input<S> {
    fn show(&self) -> String {
        match self {
            Input::Empty => "ε".to_string(),
            Input::Sym(sym) => sym.show(),
        }
    }
}

/// A transition leads from `source` to `target`, consuming `input` and emitting `output`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Transition<Q, S, O> {
    /// The state in which the transition originates.
    pub source: Q,
    /// The consumed input.
    pub input: Input<S>,
    /// The emitted output.
    pub output: O,
    /// The state that is reached.
    pub target: Q,
}

impl<Q, S, O> Transition<Q, S, O> {
    /// Creates a transition that consumes `input`.
    pub fn new(source: Q, input: S, output: O, target: Q) -> Self {
        Self {
            source,
            input: Input::Sym(input),
            output,
            target,
        }
    }

    /// Creates a transition that consumes nothing.
    pub fn empty(source: Q, output: O, target: Q) -> Self {
        Self {
            source,
            input: Input::Empty,
            output,
            target,
        }
    }

    /// Returns `true` if the transition consumes precisely `sym`.
    pub fn consumes(&self, sym: &S) -> bool
    where
        S: PartialEq,
    {
        self.input.symbol() == Some(sym)
    }
}

impl<Q: Show, S: Show, O: Show> Show for Transition<Q, S, O> {
    fn show(&self) -> String {
        format!(
            "{} --{}/{}--> {}",
            self.source.show(),
            self.input.show(),
            self.output.show(),
            self.target.show()
        )
    }
}

/// Reasons for which a [`Machine`] is rejected at construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MachineError {
    /// The list of transitions is empty.
    #[error("machine has no transitions")]
    NoTransitions,
    /// The start state is not among the states.
    #[error("start state {0} is not a state of the machine")]
    UnknownStart(String),
    /// A transition originates in or leads to an undeclared state.
    #[error("transition {0} refers to a state that does not exist")]
    UnknownState(String),
    /// A transition consumes a symbol missing from the input alphabet.
    #[error("transition {0} consumes a symbol outside of the input alphabet")]
    UnknownInput(String),
    /// A transition emits a symbol missing from the output alphabet.
    #[error("transition {0} emits a symbol outside of the output alphabet")]
    UnknownOutput(String),
}

/// A finite-state output machine. It consists of a set of states, an input and an output
/// alphabet, an ordered list of transitions and a designated start state.
///
/// Machines are immutable once constructed, all operations on them produce fresh values. The
/// transition relation need not be a function: several transitions may share their source and
/// input, which is reported by [`Machine::is_deterministic`] but never assumed by any algorithm
/// in this crate. The order of the transitions only influences the order in which results are
/// discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine<Q, S, O> {
    states: OrderedSet<Q>,
    inputs: OrderedSet<S>,
    outputs: OrderedSet<O>,
    transitions: Vec<Transition<Q, S, O>>,
    start: Q,
}

impl<Q: Symbol, S: Symbol, O: Symbol> Machine<Q, S, O> {
    /// Builds a machine from its components, rejecting it if it has no transitions, if the start
    /// state is unknown or if a transition uses a state or symbol that is not declared.
    pub fn new<X, Y, Z, T>(
        states: X,
        inputs: Y,
        outputs: Z,
        transitions: T,
        start: Q,
    ) -> Result<Self, MachineError>
    where
        X: IntoIterator<Item = Q>,
        Y: IntoIterator<Item = S>,
        Z: IntoIterator<Item = O>,
        T: IntoIterator<Item = Transition<Q, S, O>>,
    {
        let machine = Self::assemble(
            states.into_iter().collect(),
            inputs.into_iter().collect(),
            outputs.into_iter().collect(),
            transitions.into_iter().collect(),
            start,
        );
        machine.validate()?;
        Ok(machine)
    }

    /// Builds a machine whose states and alphabets are precisely the ones that occur in the given
    /// transitions. The start state is always a state of the resulting machine, so validation only
    /// fails if there are no transitions.
    pub fn from_transitions<T>(transitions: T, start: Q) -> Result<Self, MachineError>
    where
        T: IntoIterator<Item = Transition<Q, S, O>>,
    {
        let transitions: Vec<_> = transitions.into_iter().collect();
        let mut states = OrderedSet::from_iter([start.clone()]);
        let mut inputs = OrderedSet::new();
        let mut outputs = OrderedSet::new();
        for t in &transitions {
            states.insert(t.source.clone());
            states.insert(t.target.clone());
            if let Some(sym) = t.input.symbol() {
                inputs.insert(sym.clone());
            }
            outputs.insert(t.output.clone());
        }
        Self::new(states, inputs, outputs, transitions, start)
    }

    /// Builds a machine without validating it. This is used for derived machines such as the
    /// product, which may legitimately have no transitions at all.
    pub(crate) fn assemble(
        states: OrderedSet<Q>,
        inputs: OrderedSet<S>,
        outputs: OrderedSet<O>,
        transitions: Vec<Transition<Q, S, O>>,
        start: Q,
    ) -> Self {
        Self {
            states,
            inputs,
            outputs,
            transitions,
            start,
        }
    }

    fn validate(&self) -> Result<(), MachineError> {
        if self.transitions.is_empty() {
            return Err(MachineError::NoTransitions);
        }
        if !self.states.contains(&self.start) {
            return Err(MachineError::UnknownStart(self.start.show()));
        }
        for t in &self.transitions {
            if !self.states.contains(&t.source) || !self.states.contains(&t.target) {
                return Err(MachineError::UnknownState(t.show()));
            }
            if let Some(sym) = t.input.symbol() {
                if !self.inputs.contains(sym) {
                    return Err(MachineError::UnknownInput(t.show()));
                }
            }
            if !self.outputs.contains(&t.output) {
                return Err(MachineError::UnknownOutput(t.show()));
            }
        }
        Ok(())
    }

    /// Returns `true` if and only if no two transitions share their source state and input.
    pub fn is_deterministic(&self) -> bool {
        let mut seen = Set::default();
        for t in &self.transitions {
            if !seen.insert((&t.source, &t.input)) {
                trace!(
                    "found second transition on {} from {}",
                    t.input.show(),
                    t.source.show()
                );
                return false;
            }
        }
        true
    }

    /// Iterates over the transitions originating in `state`, in the order in which they are stored.
    pub fn transitions_from<'a>(
        &'a self,
        state: &'a Q,
    ) -> impl Iterator<Item = &'a Transition<Q, S, O>> + 'a {
        self.transitions.iter().filter(move |t| &t.source == state)
    }

    /// The states of the machine.
    pub fn states(&self) -> &OrderedSet<Q> {
        &self.states
    }

    /// The input alphabet, which never contains [`Input::Empty`].
    pub fn inputs(&self) -> &OrderedSet<S> {
        &self.inputs
    }

    /// The output alphabet.
    pub fn outputs(&self) -> &OrderedSet<O> {
        &self.outputs
    }

    /// All transitions in their original order.
    pub fn transitions(&self) -> &[Transition<Q, S, O>] {
        &self.transitions
    }

    /// The designated start state.
    pub fn start(&self) -> &Q {
        &self.start
    }

    /// Number of states.
    pub fn size(&self) -> usize {
        self.states.len()
    }
}
