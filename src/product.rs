use std::{collections::VecDeque, ops::Deref};

use itertools::Itertools;
use tracing::{debug, trace};

use crate::{
    machine::{Machine, Transition},
    math::{Map, OrderedSet, Set},
    Show, Symbol,
};

/// A state of the product of two machines, i.e. a pair consisting of a state of the
/// specification and a state of the implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductState<L, R> {
    /// Component of the specification machine.
    pub spec: L,
    /// Component of the implementation machine.
    pub imp: R,
}

impl<L, R> ProductState<L, R> {
    /// Pairs up the two components.
    pub fn new(spec: L, imp: R) -> Self {
        Self { spec, imp }
    }
}

impl<L, R> From<(L, R)> for ProductState<L, R> {
    fn from((spec, imp): (L, R)) -> Self {
        Self::new(spec, imp)
    }
}

impl<L: Show, R: Show> Show for ProductState<L, R> {
    fn show(&self) -> String {
        format!("({}, {})", self.spec.show(), self.imp.show())
    }
}

/// The machine underlying a [`Product`].
pub type ProductMachine<L, R, S, O> = Machine<ProductState<L, R>, S, O>;

/// The synchronized product of a specification and an implementation machine. It dereferences to
/// the product [`Machine`], whose transitions are exactly the moves on which both machines agree.
/// Additionally, the product remembers for each of its states which input symbols at least one of
/// the two components can consume, which is what a divergence is measured against.
#[derive(Debug, Clone)]
pub struct Product<L, R, S, O> {
    machine: ProductMachine<L, R, S, O>,
    enabled: Map<ProductState<L, R>, OrderedSet<S>>,
}

impl<L, R, S, O> Deref for Product<L, R, S, O> {
    type Target = ProductMachine<L, R, S, O>;

    fn deref(&self) -> &Self::Target {
        &self.machine
    }
}

impl<L: Symbol, R: Symbol, S: Symbol, O: Symbol> Product<L, R, S, O> {
    /// Returns the input symbols that the specification or the implementation can consume in the
    /// respective component of `state`. For complete machines, this is the whole input alphabet.
    /// Returns `None` if `state` is not a state of the product.
    pub fn enabled(&self, state: &ProductState<L, R>) -> Option<&OrderedSet<S>> {
        self.enabled.get(state)
    }

    /// Consumes `self` and returns the underlying product machine.
    pub fn into_machine(self) -> ProductMachine<L, R, S, O> {
        self.machine
    }
}

/// Builds the synchronized product of `spec` and `imp`.
///
/// If the two machines have different input alphabets, they cannot be compared and `None` is
/// returned. Otherwise, exploration begins in the pair of start states. For each explored pair
/// `(s, i)`, each input symbol `a` and each output `o` of the union of both output alphabets, every
/// transition `s --a/o--> s'` of `spec` is combined with every transition `i --a/o--> i'` of `imp`
/// into the product transition `(s, i) --a/o--> (s', i')`. Identical transitions are recorded once
/// and every pair is explored at most once, which is tracked with an explicit worklist.
///
/// The product consists only of the reachable pairs, its output alphabet is the union of the
/// output alphabets of `spec` and `imp`. Transitions that consume nothing are not synchronized.
pub fn build<L, R, S, O>(
    spec: &Machine<L, S, O>,
    imp: &Machine<R, S, O>,
) -> Option<Product<L, R, S, O>>
where
    L: Symbol,
    R: Symbol,
    S: Symbol,
    O: Symbol,
{
    if spec.inputs() != imp.inputs() {
        debug!(
            "input alphabets {{{}}} and {{{}}} differ, machines are incompatible",
            spec.inputs().iter().map(Show::show).join(", "),
            imp.inputs().iter().map(Show::show).join(", ")
        );
        return None;
    }

    let inputs = spec.inputs().clone();
    let outputs: OrderedSet<O> = spec.outputs().union(imp.outputs()).cloned().collect();

    let start = ProductState::new(spec.start().clone(), imp.start().clone());
    let mut states = OrderedSet::from_iter([start.clone()]);
    let mut queue = VecDeque::from([start.clone()]);
    let mut transitions = Vec::new();
    let mut recorded = Set::default();
    let mut enabled = Map::default();

    while let Some(q) = queue.pop_front() {
        enabled.insert(
            q.clone(),
            consumable(spec, &q.spec)
                .chain(consumable(imp, &q.imp))
                .collect::<OrderedSet<_>>(),
        );

        for sym in &inputs {
            for out in &outputs {
                for lt in spec
                    .transitions_from(&q.spec)
                    .filter(|t| t.consumes(sym) && &t.output == out)
                {
                    for rt in imp
                        .transitions_from(&q.imp)
                        .filter(|t| t.consumes(sym) && &t.output == out)
                    {
                        let target = ProductState::new(lt.target.clone(), rt.target.clone());
                        let transition =
                            Transition::new(q.clone(), sym.clone(), out.clone(), target.clone());
                        if !recorded.insert(transition.clone()) {
                            continue;
                        }
                        trace!("adding product transition {}", transition.show());
                        transitions.push(transition);

                        if states.insert(target.clone()) {
                            queue.push_back(target);
                        }
                    }
                }
            }
        }
    }

    debug!(
        "product of machines with {} and {} states has {} reachable states and {} transitions",
        spec.size(),
        imp.size(),
        states.len(),
        transitions.len()
    );

    Some(Product {
        machine: Machine::assemble(states, inputs, outputs, transitions, start),
        enabled,
    })
}

/// Iterates over the input symbols (with repetitions) on which `machine` can leave `state`.
fn consumable<'a, Q: Symbol, S: Symbol, O: Symbol>(
    machine: &'a Machine<Q, S, O>,
    state: &'a Q,
) -> impl Iterator<Item = S> + 'a {
    machine
        .transitions_from(state)
        .filter_map(|t| t.input.symbol().cloned())
}
