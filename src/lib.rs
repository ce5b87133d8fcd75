//! Library for computing distinguishing sequences of finite-state output machines.
//!
//! A [`Machine`] is a Mealy-style transition system: every transition consumes an input symbol
//! (or nothing, see [`machine::Input::Empty`]) and emits an output symbol. Given a *specification*
//! machine and an *implementation* machine over the same input alphabet, the crate computes input
//! words which force the two machines to behave observably differently. This is the central step of
//! model-based conformance testing.
//!
//! The computation is split into three stages which are usually chained as follows
//! - [`product::build`] constructs the synchronized product of both machines. A product state is a
//!   pair of states, and a product transition exists only where both machines can emit the same
//!   output for the same input.
//! - [`search::distinguishing_sequences`] locates product states at which the machines diverge and
//!   returns all minimal input words that lead into such states along every nondeterministic branch.
//! - [`trace::traces`] replays a word against one of the original machines and enumerates all output
//!   words it may produce, which makes the divergence visible.
//!
//! Absence of a product (the input alphabets differ) and absence of a distinguishing sequence are
//! regular outcomes and not errors.
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The prelude is supposed to make using this package easier. Including everything, i.e.
/// `use distinguish::prelude::*;` should be enough to use the package.
pub mod prelude {
    pub use super::{
        machine::{Input, Machine, MachineError, Transition},
        math,
        parse::{parse_machines, read_machines, ParseError},
        product::{Product, ProductState},
        search::{distinguishing_sequences, Search},
        trace::{traces, Replay, TraceChecker},
        Show, Symbol,
    };

    #[cfg(feature = "report")]
    pub use super::report::{Outcome, Report};
}

/// Definitions of the collection types used throughout the crate.
pub mod math;

/// The machine model, consisting of states, alphabets and transitions.
pub mod machine;
pub use machine::Machine;

/// Synchronized product of two machines.
pub mod product;

/// Locating divergence states and searching for distinguishing sequences.
pub mod search;

/// Replaying input words against a machine.
pub mod trace;

/// Reading machines from their textual representation.
pub mod parse;

/// Human readable rendering of a comparison. This is feature gated behind the `report` feature.
#[cfg(feature = "report")]
pub mod report;

/// Implements the generation of random machines.
#[cfg(feature = "random")]
pub mod random;

use std::{fmt::Debug, hash::Hash};

use itertools::Itertools;

/// A symbol is anything that can be used as a state, an input or an output of a [`Machine`].
pub trait Symbol: Clone + Eq + Ord + Hash + Debug + Show {}

impl<T: Clone + Eq + Ord + Hash + Debug + Show> Symbol for T {}

/// Helper trait which can be used to display states, symbols and words.
pub trait Show {
    /// Returns a human readable representation of `self`, for a state that should be
    /// for example q0, and for a word over single letter symbols it should be the concatenation
    /// of its letters. This is mainly used for reporting and debugging purposes.
    fn show(&self) -> String;
}

impl Show for usize {
    fn show(&self) -> String {
        self.to_string()
    }
}

impl Show for u32 {
    fn show(&self) -> String {
        self.to_string()
    }
}

impl Show for char {
    fn show(&self) -> String {
        self.to_string()
    }
}

impl Show for str {
    fn show(&self) -> String {
        self.to_string()
    }
}

impl Show for String {
    fn show(&self) -> String {
        self.clone()
    }
}

impl<S: Show + ?Sized> Show for &S {
    fn show(&self) -> String {
        S::show(*self)
    }
}

/// Words are shown as the concatenation of their symbols, the empty word as `ε`.
impl<S: Show> Show for [S] {
    fn show(&self) -> String {
        if self.is_empty() {
            return "ε".to_string();
        }
        self.iter().map(|x| x.show()).join("")
    }
}

impl<S: Show> Show for Vec<S> {
    fn show(&self) -> String {
        self.as_slice().show()
    }
}

impl<S: Show, T: Show> Show for (S, T) {
    fn show(&self) -> String {
        format!("({}, {})", self.0.show(), self.1.show())
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    /// Two machines over `{a, b}` which agree on `a` but answer `b` differently in `S1`.
    pub fn diverging_pair() -> (Machine<&'static str, char, u32>, Machine<&'static str, char, u32>) {
        let spec = Machine::from_transitions(
            [
                Transition::new("S0", 'a', 0, "S1"),
                Transition::new("S1", 'b', 1, "S0"),
            ],
            "S0",
        )
        .unwrap();
        let imp = Machine::from_transitions(
            [
                Transition::new("S0", 'a', 0, "S1"),
                Transition::new("S1", 'b', 0, "S0"),
            ],
            "S0",
        )
        .unwrap();
        (spec, imp)
    }

    #[test]
    fn show_words() {
        assert_eq!(vec!['a', 'b'].show(), "ab");
        assert_eq!(Vec::<char>::new().show(), "ε");
        assert_eq!(("S0", 3u32).show(), "(S0, 3)");
    }

    #[test_log::test]
    fn end_to_end() {
        let (spec, imp) = diverging_pair();
        let product = crate::product::build(&spec, &imp).expect("alphabets agree");

        let sequences = distinguishing_sequences(&product);
        assert_eq!(sequences, vec![vec!['a', 'b']]);

        assert_eq!(traces(&spec, &sequences[0]), vec![vec![0, 1]]);
        assert_eq!(traces(&imp, &sequences[0]), vec![vec![0, 0]]);
    }
}
