use std::collections::VecDeque;

use itertools::Itertools;
use tracing::{debug, info, trace};

use crate::{
    machine::Transition,
    math::{Map, OrderedSet},
    product::{Product, ProductState},
    Show, Symbol,
};

/// Searches distinguishing sequences in a [`Product`].
///
/// A product state `q` is *indeterminate* if some input symbol can be consumed by at least one of
/// the two components of `q`, but no product transition on that symbol leaves `q`. Such a symbol
/// is *missing* in `q`: whatever the machines do on it, they cannot agree on the output. The
/// divergence states are the indeterminate states that are the target of some product transition,
/// together with the start state if it is indeterminate itself. Unlike a search over transition
/// targets only, this also detects machines that disagree on their very first output.
///
/// Every divergence state `t` gives rise to candidates `p + m`, where `p` is one of the shortest
/// words leading to `t` and `m` is missing in `t`. As the product may be nondeterministic, a
/// candidate is only valid if *all* states that can be reached on its prefix are divergence states.
#[derive(Debug, Clone)]
pub struct Search<'a, L, R, S, O> {
    product: &'a Product<L, R, S, O>,
    outgoing: Map<&'a ProductState<L, R>, Vec<&'a Transition<ProductState<L, R>, S, O>>>,
    incoming: Map<&'a ProductState<L, R>, Vec<&'a Transition<ProductState<L, R>, S, O>>>,
    distance: Map<&'a ProductState<L, R>, usize>,
    divergent: OrderedSet<&'a ProductState<L, R>>,
}

impl<'a, L: Symbol, R: Symbol, S: Symbol, O: Symbol> Search<'a, L, R, S, O> {
    /// Prepares the search by indexing the transitions of `product`, computing the distance of
    /// every state from the start and collecting the divergence states.
    pub fn new(product: &'a Product<L, R, S, O>) -> Self {
        let mut outgoing: Map<_, Vec<_>> = Map::default();
        let mut incoming: Map<_, Vec<_>> = Map::default();
        for t in product.transitions() {
            outgoing.entry(&t.source).or_default().push(t);
            incoming.entry(&t.target).or_default().push(t);
        }

        let start = product.start();
        let mut distance = Map::from_iter([(start, 0)]);
        let mut queue = VecDeque::from([start]);
        while let Some(q) = queue.pop_front() {
            let d = distance[q];
            for t in outgoing.get(q).into_iter().flatten() {
                if !distance.contains_key(&t.target) {
                    distance.insert(&t.target, d + 1);
                    queue.push_back(&t.target);
                }
            }
        }

        let mut search = Self {
            product,
            outgoing,
            incoming,
            distance,
            divergent: OrderedSet::new(),
        };
        search.divergent = product
            .transitions()
            .iter()
            .map(|t| &t.target)
            .chain(std::iter::once(start))
            .filter(|q| search.is_indeterminate(q))
            .collect();
        debug!(
            "found {} divergence states {{{}}}",
            search.divergent.len(),
            search.divergent.iter().map(|q| q.show()).join(", ")
        );
        search
    }

    /// Returns the input symbols on which some product transition leaves `state`.
    pub fn covered_symbols(&self, state: &ProductState<L, R>) -> OrderedSet<S> {
        self.outgoing
            .get(state)
            .into_iter()
            .flatten()
            .filter_map(|t| t.input.symbol().cloned())
            .collect()
    }

    /// Returns the symbols that one of the components of `state` can consume, but on which the
    /// two machines cannot agree. States that do not belong to the product have no missing symbols.
    pub fn missing_symbols(&self, state: &ProductState<L, R>) -> OrderedSet<S> {
        let Some(enabled) = self.product.enabled(state) else {
            return OrderedSet::new();
        };
        let covered = self.covered_symbols(state);
        enabled.difference(&covered).cloned().collect()
    }

    /// Returns `true` if and only if `state` has at least one missing symbol.
    pub fn is_indeterminate(&self, state: &ProductState<L, R>) -> bool {
        !self.missing_symbols(state).is_empty()
    }

    /// The indeterminate states that serve as targets of candidate sequences.
    pub fn indeterminate_states(&self) -> &OrderedSet<&'a ProductState<L, R>> {
        &self.divergent
    }

    /// Computes the set of all shortest input words on which `target` can be reached from the start
    /// of the product. For the start state this is the set containing only the empty word, for an
    /// unreachable state it is the empty set.
    pub fn shortest_paths(&self, target: &ProductState<L, R>) -> OrderedSet<Vec<S>> {
        let mut paths = OrderedSet::new();
        let Some((target, _)) = self.distance.get_key_value(target) else {
            return paths;
        };

        // walks backwards along edges that decrease the distance by one, collecting reversed words
        let mut stack = vec![(*target, Vec::new())];
        while let Some((q, mut suffix)) = stack.pop() {
            let d = self.distance[q];
            if d == 0 {
                suffix.reverse();
                paths.insert(suffix);
                continue;
            }
            for t in self.incoming.get(q).into_iter().flatten() {
                if self.distance.get(&t.source) != Some(&(d - 1)) {
                    continue;
                }
                if let Some(sym) = t.input.symbol() {
                    let mut extended = suffix.clone();
                    extended.push(sym.clone());
                    stack.push((&t.source, extended));
                }
            }
        }
        paths
    }

    /// Returns all states of the product that can be reached on `word`, following every
    /// transition that matches the respective symbol. If at some point no transition can be
    /// taken, the empty set is returned.
    pub fn reachable_after(&self, word: &[S]) -> OrderedSet<&'a ProductState<L, R>> {
        let mut current = OrderedSet::from_iter([self.product.start()]);
        for sym in word {
            let next: OrderedSet<_> = current
                .iter()
                .flat_map(|q| self.outgoing.get(*q).into_iter().flatten())
                .filter(|t| t.consumes(sym))
                .map(|t| &t.target)
                .collect();
            if next.is_empty() {
                trace!("no transition on {} after {}", sym.show(), word.show());
                return next;
            }
            current = next;
        }
        current
    }

    /// Produces all candidates, i.e. a shortest word leading to a divergence state extended by a
    /// symbol that is missing in that state.
    pub fn candidates(&self) -> OrderedSet<Vec<S>> {
        let mut candidates = OrderedSet::new();
        for &target in &self.divergent {
            let missing = self.missing_symbols(target);
            for path in self.shortest_paths(target) {
                for sym in &missing {
                    let mut candidate = path.clone();
                    candidate.push(sym.clone());
                    candidates.insert(candidate);
                }
            }
        }
        candidates
    }

    /// A candidate is valid if its prefix (everything but the last symbol) can be read and every
    /// state reached on it is a divergence state.
    pub fn is_valid(&self, candidate: &[S]) -> bool {
        let Some((_, prefix)) = candidate.split_last() else {
            return false;
        };
        let reached = self.reachable_after(prefix);
        !reached.is_empty() && reached.iter().all(|q| self.divergent.contains(q))
    }

    /// Returns all valid candidates of minimal length in ascending order.
    pub fn run(&self) -> Vec<Vec<S>> {
        let candidates = self.candidates();
        debug!("checking {} candidate sequences", candidates.len());

        let valid = candidates
            .into_iter()
            .filter(|candidate| {
                let valid = self.is_valid(candidate);
                trace!(
                    "candidate {} is {}",
                    candidate.show(),
                    if valid { "valid" } else { "invalid" }
                );
                valid
            })
            .collect_vec();

        let Some(min_length) = valid.iter().map(Vec::len).min() else {
            info!("no distinguishing sequence exists");
            return vec![];
        };

        let sequences = valid
            .into_iter()
            .filter(|candidate| candidate.len() == min_length)
            .sorted()
            .collect_vec();
        info!(
            "found {} distinguishing sequences of length {min_length}",
            sequences.len()
        );
        sequences
    }
}

/// Computes all distinguishing sequences of minimal length for the machines that make up
/// `product`, sorted in ascending order. See [`Search`] for the details. An empty result means
/// that no distinguishing sequence was found, which is a regular outcome.
pub fn distinguishing_sequences<L, R, S, O>(product: &Product<L, R, S, O>) -> Vec<Vec<S>>
where
    L: Symbol,
    R: Symbol,
    S: Symbol,
    O: Symbol,
{
    Search::new(product).run()
}

#[cfg(test)]
mod tests {
    use super::Search;
    use crate::{prelude::*, product::build, tests::diverging_pair};

    fn machine(transitions: &[(u32, char, u32, u32)]) -> Machine<u32, char, u32> {
        Machine::from_transitions(
            transitions
                .iter()
                .map(|&(p, a, o, q)| Transition::new(p, a, o, q)),
            0,
        )
        .unwrap()
    }

    #[test]
    fn divergence_in_diverging_pair() {
        let (spec, imp) = diverging_pair();
        let product = build(&spec, &imp).unwrap();
        let search = Search::new(&product);

        let s0 = ProductState::new("S0", "S0");
        let s1 = ProductState::new("S1", "S1");
        assert!(!search.is_indeterminate(&s0));
        assert!(search.is_indeterminate(&s1));
        assert_eq!(search.missing_symbols(&s1).into_iter().collect::<Vec<_>>(), vec!['b']);
        assert_eq!(
            search.indeterminate_states().iter().copied().collect::<Vec<_>>(),
            vec![&s1]
        );
        assert_eq!(
            search.shortest_paths(&s1).into_iter().collect::<Vec<_>>(),
            vec![vec!['a']]
        );
        assert_eq!(
            search.shortest_paths(&s0).into_iter().collect::<Vec<_>>(),
            vec![Vec::<char>::new()]
        );
        assert!(search.is_valid(&['a', 'b']));
        assert!(!search.is_valid(&[]));
    }

    #[test]
    fn identical_machines_are_indistinguishable() {
        let m = machine(&[
            (0, 'a', 0, 1),
            (0, 'b', 1, 0),
            (1, 'a', 1, 2),
            (1, 'b', 0, 0),
            (2, 'a', 0, 2),
            (2, 'b', 1, 1),
        ]);
        let product = build(&m, &m).unwrap();
        let search = Search::new(&product);
        assert!(search.indeterminate_states().is_empty());
        assert!(search.candidates().is_empty());
        assert!(distinguishing_sequences(&product).is_empty());
    }

    #[test]
    fn all_shortest_paths_are_collected() {
        let spec = machine(&[
            (0, 'a', 0, 1),
            (0, 'b', 0, 2),
            (1, 'b', 0, 3),
            (2, 'a', 0, 3),
            (3, 'a', 0, 0),
        ]);
        let imp = machine(&[
            (0, 'a', 0, 1),
            (0, 'b', 0, 2),
            (1, 'b', 0, 3),
            (2, 'a', 0, 3),
            (3, 'a', 1, 0),
        ]);
        let product = build(&spec, &imp).unwrap();
        let search = Search::new(&product);

        assert_eq!(
            search
                .shortest_paths(&ProductState::new(3, 3))
                .into_iter()
                .collect::<Vec<_>>(),
            vec![vec!['a', 'b'], vec!['b', 'a']]
        );
        assert_eq!(
            distinguishing_sequences(&product),
            vec![vec!['a', 'b', 'a'], vec!['b', 'a', 'a']]
        );
    }

    #[test]
    fn every_branch_must_diverge() {
        // on `a` both machines either output 0 and go to 1, or output 1 and go to 2. Only from 1
        // they disagree on `b`, so no word forces a divergence.
        let spec = machine(&[(0, 'a', 0, 1), (0, 'a', 1, 2), (1, 'b', 0, 0), (2, 'b', 0, 0)]);
        let imp = machine(&[(0, 'a', 0, 1), (0, 'a', 1, 2), (1, 'b', 1, 0), (2, 'b', 0, 0)]);
        let product = build(&spec, &imp).unwrap();
        let search = Search::new(&product);

        assert_eq!(
            search.candidates().into_iter().collect::<Vec<_>>(),
            vec![vec!['a', 'b']]
        );
        assert_eq!(search.reachable_after(&['a']).len(), 2);
        assert!(!search.is_valid(&['a', 'b']));
        assert!(distinguishing_sequences(&product).is_empty());
    }

    #[test]
    fn unreadable_prefix_is_abandoned() {
        let (spec, imp) = diverging_pair();
        let product = build(&spec, &imp).unwrap();
        let search = Search::new(&product);
        assert!(search.reachable_after(&['b']).is_empty());
        assert!(!search.is_valid(&['b', 'b']));
    }

    #[test]
    fn divergence_in_start_state() {
        let spec = machine(&[(0, 'a', 0, 0)]);
        let imp = machine(&[(0, 'a', 1, 0)]);
        let product = build(&spec, &imp).unwrap();
        assert_eq!(distinguishing_sequences(&product), vec![vec!['a']]);
    }

    #[cfg(feature = "random")]
    #[test_log::test]
    fn random_faults_are_detected_minimally() {
        use crate::random::{random_machine, with_output_fault};

        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for _ in 0..50 {
            let spec = random_machine(&mut rng, 5, 2, 2);
            let imp = with_output_fault(&mut rng, &spec, 2);
            let product = build(&spec, &imp).unwrap();
            let search = Search::new(&product);
            let sequences = search.run();

            let Some(first) = sequences.first() else {
                continue;
            };
            // minimality among all valid candidates
            for candidate in search.candidates() {
                if search.is_valid(&candidate) {
                    assert!(first.len() <= candidate.len());
                }
            }
            assert!(sequences.iter().all(|s| s.len() == first.len()));

            for sequence in &sequences {
                let expected = traces(&spec, sequence);
                let actual = traces(&imp, sequence);
                assert_eq!(expected.len(), 1);
                assert_eq!(actual.len(), 1);
                assert_ne!(expected, actual);
            }
        }
    }

    #[cfg(feature = "random")]
    fn words(alphabet: &[char], len: usize) -> Vec<Vec<char>> {
        (0..len).fold(vec![vec![]], |words, _| {
            words
                .into_iter()
                .flat_map(|w| {
                    alphabet.iter().map(move |&a| {
                        let mut w = w.clone();
                        w.push(a);
                        w
                    })
                })
                .collect()
        })
    }

    /// Compares the result against an exhaustive enumeration of all shorter words.
    #[cfg(feature = "random")]
    #[test_log::test]
    fn no_shorter_word_distinguishes_faulty_machines() {
        use crate::random::{random_machine, with_output_fault, with_transfer_fault, RandomMachine};

        fn check(spec: &RandomMachine, imp: &RandomMachine) {
            let product = build(spec, imp).unwrap();
            let sequences = distinguishing_sequences(&product);
            let alphabet = spec.inputs().iter().copied().collect::<Vec<_>>();

            let Some(first) = sequences.first() else {
                for len in 1..=6 {
                    for word in words(&alphabet, len) {
                        assert_eq!(traces(spec, &word), traces(imp, &word), "{}", word.show());
                    }
                }
                return;
            };

            for sequence in &sequences {
                assert_eq!(sequence.len(), first.len());
                assert_ne!(traces(spec, sequence), traces(imp, sequence));
            }
            for len in 0..first.len() {
                for word in words(&alphabet, len) {
                    assert_eq!(traces(spec, &word), traces(imp, &word), "{}", word.show());
                }
            }
        }

        let mut rng = fastrand::Rng::with_seed(0xfa17);
        for _ in 0..100 {
            let spec = random_machine(&mut rng, 4, 2, 2);
            check(&spec, &with_output_fault(&mut rng, &spec, 2));
            check(&spec, &with_transfer_fault(&mut rng, &spec));
        }
    }
}
