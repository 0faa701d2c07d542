//! Immutable and-inverter graph used as the bit-level substrate.
//!
//! Nodes are reference counted and never mutated. Every structural operation
//! returns a new [`Aig`] whose nodes are shared with its operands wherever the
//! operation did not need to rewrite them.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Topo;
use thiserror::Error;
use tracing::{debug, trace};

use crate::port::PortKind;

pub type Signal = Arc<Node>;

/// Bit-keyed value assignment.
pub type BitValues = BTreeMap<String, bool>;

/// Separates a wire name from its step index in unrolled circuits.
pub const TIME_DELIMITER: &str = "##time_";

#[derive(Debug)]
pub enum Node {
    Const(bool),
    Input(String),
    /// Current value of a latch.
    Latch(String),
    Not(Signal),
    And(Signal, Signal),
}

impl Node {
    fn children(&self) -> impl Iterator<Item = &Signal> {
        let (a, b) = match self {
            Node::Not(a) => (Some(a), None),
            Node::And(a, b) => (Some(a), Some(b)),
            _ => (None, None),
        };
        a.into_iter().chain(b)
    }
}

pub fn constant(value: bool) -> Signal {
    Arc::new(Node::Const(value))
}

pub fn input(name: impl Into<String>) -> Signal {
    Arc::new(Node::Input(name.into()))
}

pub fn latch(name: impl Into<String>) -> Signal {
    Arc::new(Node::Latch(name.into()))
}

pub fn not(a: &Signal) -> Signal {
    match &**a {
        Node::Const(v) => constant(!v),
        Node::Not(inner) => inner.clone(),
        _ => Arc::new(Node::Not(a.clone())),
    }
}

pub fn and(a: &Signal, b: &Signal) -> Signal {
    match (&**a, &**b) {
        (Node::Const(false), _) | (_, Node::Const(false)) => constant(false),
        (Node::Const(true), _) => b.clone(),
        (_, Node::Const(true)) => a.clone(),
        _ => Arc::new(Node::And(a.clone(), b.clone())),
    }
}

pub fn or(a: &Signal, b: &Signal) -> Signal {
    not(&and(&not(a), &not(b)))
}

pub fn xor(a: &Signal, b: &Signal) -> Signal {
    or(&and(a, &not(b)), &and(&not(a), b))
}

pub fn xnor(a: &Signal, b: &Signal) -> Signal {
    not(&xor(a, b))
}

/// Errors raised by the substrate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AigError {
    #[error("no value supplied for input `{0}`")]
    MissingInput(String),
    #[error("no value supplied for latch `{0}`")]
    MissingLatch(String),
    #[error("unknown {kind} `{name}`")]
    UnknownName { kind: PortKind, name: String },
    #[error("{kind} `{name}` is defined more than once")]
    NameCollision { kind: PortKind, name: String },
    #[error(
        "feedback expects matching name lists, got {inputs} inputs, {outputs} outputs, \
         {latches} latches and {initials} initial values"
    )]
    FeedbackArity {
        inputs: usize,
        outputs: usize,
        latches: usize,
        initials: usize,
    },
}

/// Next-state function and reset value of a latch.
#[derive(Debug, Clone)]
pub struct LatchDef {
    pub next: Signal,
    pub init: bool,
}

impl LatchDef {
    pub fn new(next: Signal, init: bool) -> Self {
        Self { next, init }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Aig {
    pub(crate) inputs: BTreeSet<String>,
    pub(crate) outputs: BTreeMap<String, Signal>,
    pub(crate) latches: BTreeMap<String, LatchDef>,
}

/// Result of [`Aig::unroll`]: the latch-free circuit plus, for every exploded
/// wire, the port it was derived from and its step.
#[derive(Debug, Clone)]
pub struct Unrolled {
    pub aig: Aig,
    pub input_origins: BTreeMap<String, Origin>,
    pub output_origins: BTreeMap<String, Origin>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub kind: PortKind,
    pub name: String,
    pub step: usize,
}

pub fn timed_name(name: &str, step: usize) -> String {
    format!("{name}{TIME_DELIMITER}{step}")
}

impl Aig {
    /// Create a circuit, rejecting duplicate names and references to
    /// undeclared inputs or latches.
    pub fn new<I, O, L>(inputs: I, outputs: O, latches: L) -> Result<Self, AigError>
    where
        I: IntoIterator<Item = String>,
        O: IntoIterator<Item = (String, Signal)>,
        L: IntoIterator<Item = (String, LatchDef)>,
    {
        let mut aig = Aig::default();
        for name in inputs {
            if !aig.inputs.insert(name.clone()) {
                return Err(AigError::NameCollision {
                    kind: PortKind::Input,
                    name,
                });
            }
        }
        for (name, sig) in outputs {
            if aig.outputs.insert(name.clone(), sig).is_some() {
                return Err(AigError::NameCollision {
                    kind: PortKind::Output,
                    name,
                });
            }
        }
        for (name, def) in latches {
            if aig.latches.insert(name.clone(), def).is_some() {
                return Err(AigError::NameCollision {
                    kind: PortKind::Latch,
                    name,
                });
            }
        }
        aig.check_references()?;
        Ok(aig)
    }

    fn check_references(&self) -> Result<(), AigError> {
        for sig in topo_order(self.roots()) {
            match &*sig {
                Node::Input(name) if !self.inputs.contains(name) => {
                    return Err(AigError::UnknownName {
                        kind: PortKind::Input,
                        name: name.clone(),
                    })
                }
                Node::Latch(name) if !self.latches.contains_key(name) => {
                    return Err(AigError::UnknownName {
                        kind: PortKind::Latch,
                        name: name.clone(),
                    })
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub(crate) fn roots(&self) -> impl Iterator<Item = &Signal> {
        self.outputs
            .values()
            .chain(self.latches.values().map(|def| &def.next))
    }

    pub fn inputs(&self) -> &BTreeSet<String> {
        &self.inputs
    }

    pub fn outputs(&self) -> &BTreeMap<String, Signal> {
        &self.outputs
    }

    pub fn latches(&self) -> &BTreeMap<String, LatchDef> {
        &self.latches
    }

    /// Names of one kind of port, in sorted order.
    pub fn names(&self, kind: PortKind) -> BTreeSet<&str> {
        match kind {
            PortKind::Input => self.inputs.iter().map(String::as_str).collect(),
            PortKind::Output => self.outputs.keys().map(String::as_str).collect(),
            PortKind::Latch => self.latches.keys().map(String::as_str).collect(),
        }
    }

    pub fn initial_latches(&self) -> BitValues {
        self.latches
            .iter()
            .map(|(name, def)| (name.clone(), def.init))
            .collect()
    }

    /// Number of distinct and-gates reachable from the outputs and latches.
    pub fn and_count(&self) -> usize {
        topo_order(self.roots())
            .iter()
            .filter(|sig| matches!(***sig, Node::And(..)))
            .count()
    }

    /// Evaluate one step. Every input and every latch must be assigned.
    /// Returns the output values and the next latch values.
    pub fn eval(
        &self,
        inputs: &BitValues,
        latches: &BitValues,
    ) -> Result<(BitValues, BitValues), AigError> {
        if let Some(name) = self.inputs.iter().find(|n| !inputs.contains_key(*n)) {
            return Err(AigError::MissingInput(name.clone()));
        }
        if let Some(name) = self.latches.keys().find(|n| !latches.contains_key(*n)) {
            return Err(AigError::MissingLatch(name.clone()));
        }

        let order = topo_order(self.roots());
        let mut values: HashMap<*const Node, bool> = HashMap::with_capacity(order.len());
        for sig in &order {
            let value = match &**sig {
                Node::Const(v) => *v,
                Node::Input(name) => inputs[name],
                Node::Latch(name) => latches[name],
                Node::Not(a) => !values[&Arc::as_ptr(a)],
                Node::And(a, b) => values[&Arc::as_ptr(a)] && values[&Arc::as_ptr(b)],
            };
            values.insert(Arc::as_ptr(sig), value);
        }

        let outputs = self
            .outputs
            .iter()
            .map(|(name, sig)| (name.clone(), values[&Arc::as_ptr(sig)]))
            .collect();
        let next = self
            .latches
            .iter()
            .map(|(name, def)| (name.clone(), values[&Arc::as_ptr(&def.next)]))
            .collect();
        trace!(nodes = order.len(), "evaluated substrate step");
        Ok((outputs, next))
    }

    fn rewritten<F>(&self, leaf: F) -> Aig
    where
        F: FnMut(&Node) -> Option<Signal>,
    {
        let memo = rewrite(self.roots(), leaf);
        Aig {
            inputs: self.inputs.clone(),
            outputs: self
                .outputs
                .iter()
                .map(|(name, sig)| (name.clone(), lookup(&memo, sig)))
                .collect(),
            latches: self
                .latches
                .iter()
                .map(|(name, def)| {
                    let next = lookup(&memo, &def.next);
                    (name.clone(), LatchDef::new(next, def.init))
                })
                .collect(),
        }
    }

    /// Rename ports of one kind. Names absent from `renames` are kept.
    pub fn rename(
        &self,
        kind: PortKind,
        renames: &BTreeMap<String, String>,
    ) -> Result<Aig, AigError> {
        let renamed = |name: &String| renames.get(name).unwrap_or(name).clone();
        let collision = |name: String| AigError::NameCollision { kind, name };
        match kind {
            PortKind::Output => {
                let mut outputs = BTreeMap::new();
                for (name, sig) in &self.outputs {
                    let name = renamed(name);
                    if outputs.insert(name.clone(), sig.clone()).is_some() {
                        return Err(collision(name));
                    }
                }
                Ok(Aig {
                    inputs: self.inputs.clone(),
                    outputs,
                    latches: self.latches.clone(),
                })
            }
            PortKind::Input => {
                let mut inputs = BTreeSet::new();
                for name in &self.inputs {
                    let name = renamed(name);
                    if !inputs.insert(name.clone()) {
                        return Err(collision(name));
                    }
                }
                let aig = self.rewritten(|node| match node {
                    Node::Input(name) => renames.get(name).map(|n| input(n.as_str())),
                    _ => None,
                });
                Ok(Aig { inputs, ..aig })
            }
            PortKind::Latch => {
                let aig = self.rewritten(|node| match node {
                    Node::Latch(name) => renames.get(name).map(|n| latch(n.as_str())),
                    _ => None,
                });
                let mut latches = BTreeMap::new();
                for (name, def) in aig.latches {
                    let name = renamed(&name);
                    if latches.insert(name.clone(), def).is_some() {
                        return Err(collision(name));
                    }
                }
                Ok(Aig {
                    inputs: aig.inputs,
                    outputs: aig.outputs,
                    latches,
                })
            }
        }
    }

    /// Feed every output of `self` that `other` reads as an input into
    /// `other`. Other inputs are merged by name.
    pub fn seq_compose(&self, other: &Aig) -> Result<Aig, AigError> {
        if let Some(name) = self.latches.keys().find(|n| other.latches.contains_key(*n)) {
            return Err(AigError::NameCollision {
                kind: PortKind::Latch,
                name: name.clone(),
            });
        }
        let interface: BTreeSet<String> = self
            .outputs
            .keys()
            .filter(|n| other.inputs.contains(*n))
            .cloned()
            .collect();
        if let Some(name) = self
            .outputs
            .keys()
            .find(|n| !interface.contains(*n) && other.outputs.contains_key(*n))
        {
            return Err(AigError::NameCollision {
                kind: PortKind::Output,
                name: name.clone(),
            });
        }

        let wired = other.rewritten(|node| match node {
            Node::Input(name) if interface.contains(name) => self.outputs.get(name).cloned(),
            _ => None,
        });

        let mut inputs = self.inputs.clone();
        inputs.extend(
            other
                .inputs
                .iter()
                .filter(|n| !interface.contains(*n))
                .cloned(),
        );
        let mut outputs: BTreeMap<String, Signal> = self
            .outputs
            .iter()
            .filter(|(n, _)| !interface.contains(*n))
            .map(|(n, s)| (n.clone(), s.clone()))
            .collect();
        outputs.extend(wired.outputs);
        let mut latches = self.latches.clone();
        latches.extend(wired.latches);

        debug!(wired = interface.len(), "sequential substrate composition");
        Ok(Aig {
            inputs,
            outputs,
            latches,
        })
    }

    /// Side-by-side union. Inputs with the same name are shared.
    pub fn par_compose(&self, other: &Aig) -> Result<Aig, AigError> {
        if let Some(name) = self.outputs.keys().find(|n| other.outputs.contains_key(*n)) {
            return Err(AigError::NameCollision {
                kind: PortKind::Output,
                name: name.clone(),
            });
        }
        if let Some(name) = self.latches.keys().find(|n| other.latches.contains_key(*n)) {
            return Err(AigError::NameCollision {
                kind: PortKind::Latch,
                name: name.clone(),
            });
        }
        let mut aig = self.clone();
        aig.inputs.extend(other.inputs.iter().cloned());
        aig.outputs
            .extend(other.outputs.iter().map(|(n, s)| (n.clone(), s.clone())));
        aig.latches
            .extend(other.latches.iter().map(|(n, d)| (n.clone(), d.clone())));
        Ok(aig)
    }

    /// Turn `inputs[i]` into the current value of new latch `latches[i]`,
    /// whose next value is `outputs[i]` and whose reset value is `initials[i]`.
    pub fn feedback(
        &self,
        inputs: &[String],
        outputs: &[String],
        latches: &[String],
        initials: &[bool],
        keep_outputs: bool,
    ) -> Result<Aig, AigError> {
        if inputs.len() != outputs.len()
            || inputs.len() != latches.len()
            || inputs.len() != initials.len()
        {
            return Err(AigError::FeedbackArity {
                inputs: inputs.len(),
                outputs: outputs.len(),
                latches: latches.len(),
                initials: initials.len(),
            });
        }

        let mut bound: HashMap<&String, &String> = HashMap::new();
        for (i, l) in inputs.iter().zip(latches) {
            if !self.inputs.contains(i) {
                return Err(AigError::UnknownName {
                    kind: PortKind::Input,
                    name: i.clone(),
                });
            }
            if bound.insert(i, l).is_some() {
                return Err(AigError::NameCollision {
                    kind: PortKind::Input,
                    name: i.clone(),
                });
            }
        }
        let mut fresh = BTreeSet::new();
        for l in latches {
            if self.latches.contains_key(l) || !fresh.insert(l) {
                return Err(AigError::NameCollision {
                    kind: PortKind::Latch,
                    name: l.clone(),
                });
            }
        }
        if let Some(o) = outputs.iter().find(|o| !self.outputs.contains_key(*o)) {
            return Err(AigError::UnknownName {
                kind: PortKind::Output,
                name: o.clone(),
            });
        }

        let wired = self.rewritten(|node| match node {
            Node::Input(name) => bound.get(name).map(|l| latch(l.as_str())),
            _ => None,
        });

        let mut aig = Aig {
            inputs: self
                .inputs
                .iter()
                .filter(|n| !bound.contains_key(*n))
                .cloned()
                .collect(),
            outputs: wired.outputs.clone(),
            latches: wired.latches,
        };
        for ((l, o), init) in latches.iter().zip(outputs).zip(initials) {
            aig.latches
                .insert(l.clone(), LatchDef::new(wired.outputs[o].clone(), *init));
        }
        if !keep_outputs {
            for o in outputs {
                aig.outputs.remove(o);
            }
        }
        debug!(latches = latches.len(), keep_outputs, "substrate feedback");
        Ok(aig)
    }

    /// Expand `horizon` steps into a latch-free circuit. Every wire `w` read or
    /// produced at step `t` becomes `w##time_t`.
    ///
    /// With `init`, step 0 latches take their reset values; otherwise they are
    /// read from inputs `l##time_0`. Unless `omit_latches`, the state after the
    /// last step is exposed as outputs `l##time_{horizon}`.
    pub fn unroll(
        &self,
        horizon: usize,
        init: bool,
        omit_latches: bool,
    ) -> Result<Unrolled, AigError> {
        let mut unrolled = Unrolled {
            aig: Aig::default(),
            input_origins: BTreeMap::new(),
            output_origins: BTreeMap::new(),
        };

        let mut state: BTreeMap<&String, Signal> = BTreeMap::new();
        for (name, def) in &self.latches {
            let value = if init {
                constant(def.init)
            } else {
                input(unrolled.add_input(PortKind::Latch, name, 0)?)
            };
            state.insert(name, value);
        }

        for step in 0..horizon {
            for name in &self.inputs {
                unrolled.add_input(PortKind::Input, name, step)?;
            }
            let memo = rewrite(self.roots(), |node| match node {
                Node::Input(name) => Some(input(timed_name(name, step))),
                Node::Latch(name) => state.get(name).cloned(),
                _ => None,
            });
            for (name, sig) in &self.outputs {
                unrolled.add_output(PortKind::Output, name, step, lookup(&memo, sig))?;
            }
            state = self
                .latches
                .iter()
                .map(|(name, def)| (name, lookup(&memo, &def.next)))
                .collect();
        }

        if !omit_latches {
            for (name, sig) in state {
                unrolled.add_output(PortKind::Latch, name, horizon, sig)?;
            }
        }
        debug!(
            horizon,
            inputs = unrolled.aig.inputs.len(),
            outputs = unrolled.aig.outputs.len(),
            "unrolled substrate"
        );
        Ok(unrolled)
    }
}

impl Unrolled {
    fn add_input(&mut self, kind: PortKind, name: &str, step: usize) -> Result<String, AigError> {
        let timed = timed_name(name, step);
        if !self.aig.inputs.insert(timed.clone()) {
            return Err(AigError::NameCollision {
                kind: PortKind::Input,
                name: timed,
            });
        }
        self.input_origins.insert(
            timed.clone(),
            Origin {
                kind,
                name: name.to_string(),
                step,
            },
        );
        Ok(timed)
    }

    fn add_output(
        &mut self,
        kind: PortKind,
        name: &str,
        step: usize,
        sig: Signal,
    ) -> Result<(), AigError> {
        let timed = timed_name(name, step);
        if self.aig.outputs.insert(timed.clone(), sig).is_some() {
            return Err(AigError::NameCollision {
                kind: PortKind::Output,
                name: timed,
            });
        }
        self.output_origins.insert(
            timed,
            Origin {
                kind,
                name: name.to_string(),
                step,
            },
        );
        Ok(())
    }
}

/// Nodes reachable from `roots`, children before parents.
fn topo_order<'a>(roots: impl IntoIterator<Item = &'a Signal>) -> Vec<Signal> {
    let mut graph: DiGraph<Signal, ()> = DiGraph::new();
    let mut index: HashMap<*const Node, NodeIndex> = HashMap::new();
    let mut stack: Vec<Signal> = roots.into_iter().cloned().collect();
    while let Some(sig) = stack.pop() {
        if index.contains_key(&Arc::as_ptr(&sig)) {
            continue;
        }
        stack.extend(sig.children().cloned());
        index.insert(Arc::as_ptr(&sig), graph.add_node(sig));
    }

    let mut edges = Vec::new();
    for idx in graph.node_indices() {
        for child in graph[idx].children() {
            edges.push((index[&Arc::as_ptr(child)], idx));
        }
    }
    for (from, to) in edges {
        graph.add_edge(from, to, ());
    }

    let mut order = Vec::with_capacity(graph.node_count());
    let mut topo = Topo::new(&graph);
    while let Some(idx) = topo.next(&graph) {
        order.push(graph[idx].clone());
    }
    order
}

/// Rebuild every node reachable from `roots`, replacing the leaves for which
/// `leaf` returns a signal. Nodes whose children are unchanged are reused.
/// The result maps each original node to its replacement.
fn rewrite<'a, F>(
    roots: impl IntoIterator<Item = &'a Signal>,
    mut leaf: F,
) -> HashMap<*const Node, Signal>
where
    F: FnMut(&Node) -> Option<Signal>,
{
    let order = topo_order(roots);
    let mut memo: HashMap<*const Node, Signal> = HashMap::with_capacity(order.len());
    for sig in &order {
        let rebuilt = match &**sig {
            Node::Not(a) => {
                let a2 = &memo[&Arc::as_ptr(a)];
                if Arc::ptr_eq(a, a2) {
                    sig.clone()
                } else {
                    not(a2)
                }
            }
            Node::And(a, b) => {
                let a2 = &memo[&Arc::as_ptr(a)];
                let b2 = &memo[&Arc::as_ptr(b)];
                if Arc::ptr_eq(a, a2) && Arc::ptr_eq(b, b2) {
                    sig.clone()
                } else {
                    and(a2, b2)
                }
            }
            node => leaf(node).unwrap_or_else(|| sig.clone()),
        };
        memo.insert(Arc::as_ptr(sig), rebuilt);
    }
    memo
}

fn lookup(memo: &HashMap<*const Node, Signal>, sig: &Signal) -> Signal {
    memo[&Arc::as_ptr(sig)].clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn bits(list: &[(&str, bool)]) -> BitValues {
        list.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    fn inverter(input_name: &str, output_name: &str) -> Aig {
        Aig::new(
            names(&[input_name]),
            vec![(output_name.to_string(), not(&input(input_name)))],
            vec![],
        )
        .unwrap()
    }

    fn and2() -> Aig {
        Aig::new(
            names(&["a", "b"]),
            vec![("out".to_string(), and(&input("a"), &input("b")))],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn eval_and_truth_table() {
        let aig = and2();
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            let (out, next) = aig
                .eval(&bits(&[("a", a), ("b", b)]), &BitValues::new())
                .unwrap();
            assert_eq!(out["out"], a && b);
            assert!(next.is_empty());
        }
    }

    #[test]
    fn eval_requires_every_input() {
        let aig = and2();
        assert_eq!(
            aig.eval(&bits(&[("a", true)]), &BitValues::new()),
            Err(AigError::MissingInput("b".into()))
        );
    }

    #[test]
    fn new_rejects_undeclared_input() {
        let err = Aig::new(
            names(&["a"]),
            vec![("out".to_string(), and(&input("a"), &input("z")))],
            vec![],
        )
        .unwrap_err();
        assert_eq!(
            err,
            AigError::UnknownName {
                kind: PortKind::Input,
                name: "z".into()
            }
        );
    }

    #[test]
    fn constant_folding() {
        let a = input("a");
        assert!(Arc::ptr_eq(&and(&a, &constant(true)), &a));
        assert!(matches!(*and(&a, &constant(false)), Node::Const(false)));
        assert!(Arc::ptr_eq(&not(&not(&a)), &a));
    }

    #[test]
    fn rename_inputs_rewires_nodes() {
        let renames = BTreeMap::from([("a".to_string(), "x".to_string())]);
        let aig = and2().rename(PortKind::Input, &renames).unwrap();
        assert_eq!(aig.names(PortKind::Input), BTreeSet::from(["b", "x"]));
        let (out, _) = aig
            .eval(&bits(&[("x", true), ("b", true)]), &BitValues::new())
            .unwrap();
        assert!(out["out"]);
    }

    #[test]
    fn rename_collision() {
        let renames = BTreeMap::from([("a".to_string(), "b".to_string())]);
        assert_eq!(
            and2().rename(PortKind::Input, &renames).unwrap_err(),
            AigError::NameCollision {
                kind: PortKind::Input,
                name: "b".into()
            }
        );
    }

    #[test]
    fn seq_compose_wires_interface() {
        // z = !x & b
        let composed = inverter("x", "a").seq_compose(&and2()).unwrap();
        assert_eq!(composed.names(PortKind::Input), BTreeSet::from(["b", "x"]));
        assert_eq!(composed.names(PortKind::Output), BTreeSet::from(["out"]));
        let (out, _) = composed
            .eval(&bits(&[("x", false), ("b", true)]), &BitValues::new())
            .unwrap();
        assert!(out["out"]);
        let (out, _) = composed
            .eval(&bits(&[("x", true), ("b", true)]), &BitValues::new())
            .unwrap();
        assert!(!out["out"]);
    }

    #[test]
    fn seq_compose_rejects_shadowed_output() {
        let err = inverter("x", "out").seq_compose(&and2()).unwrap_err();
        assert_eq!(
            err,
            AigError::NameCollision {
                kind: PortKind::Output,
                name: "out".into()
            }
        );
    }

    #[test]
    fn par_compose_shares_nodes() {
        let left = inverter("x", "y");
        let right = and2();
        let both = left.par_compose(&right).unwrap();
        assert!(Arc::ptr_eq(&both.outputs()["y"], &left.outputs()["y"]));
        assert!(Arc::ptr_eq(&both.outputs()["out"], &right.outputs()["out"]));
        assert_eq!(both.and_count(), 1);
    }

    #[test]
    fn feedback_makes_toggle() {
        let (x, y, s) = (names(&["x"]), names(&["y"]), names(&["s"]));
        let toggle = inverter("x", "y")
            .feedback(&x, &y, &s, &[false], true)
            .unwrap();
        assert!(toggle.inputs().is_empty());
        assert_eq!(toggle.names(PortKind::Latch), BTreeSet::from(["s"]));
        let (out, next) = toggle
            .eval(&BitValues::new(), &toggle.initial_latches())
            .unwrap();
        assert!(out["y"]);
        assert!(next["s"]);
    }

    #[test]
    fn feedback_arity() {
        let (x, s) = (names(&["x"]), names(&["s"]));
        let err = inverter("x", "y")
            .feedback(&x, &[], &s, &[false], false)
            .unwrap_err();
        assert!(matches!(err, AigError::FeedbackArity { outputs: 0, .. }));
    }

    #[test]
    fn unroll_toggle() {
        let (x, y) = (names(&["x"]), names(&["y"]));
        let toggle = inverter("x", "y")
            .feedback(&x, &y, &x, &[false], true)
            .unwrap();
        let unrolled = toggle.unroll(3, true, true).unwrap();
        assert!(unrolled.aig.latches().is_empty());
        let (out, _) = unrolled
            .aig
            .eval(&BitValues::new(), &BitValues::new())
            .unwrap();
        let expected = bits(&[
            ("y##time_0", true),
            ("y##time_1", false),
            ("y##time_2", true),
        ]);
        assert_eq!(out, expected);
        assert_eq!(
            unrolled.output_origins["y##time_2"],
            Origin {
                kind: PortKind::Output,
                name: "y".into(),
                step: 2
            }
        );
    }

    #[test]
    fn unroll_exposes_latches() {
        let (x, y, s) = (names(&["x"]), names(&["y"]), names(&["s"]));
        let toggle = inverter("x", "y")
            .feedback(&x, &y, &s, &[false], false)
            .unwrap();
        let unrolled = toggle.unroll(2, false, false).unwrap();
        assert_eq!(
            unrolled.aig.names(PortKind::Input),
            BTreeSet::from(["s##time_0"])
        );
        assert_eq!(unrolled.input_origins["s##time_0"].kind, PortKind::Latch);
        assert_eq!(unrolled.output_origins["s##time_2"].kind, PortKind::Latch);
        let (out, _) = unrolled
            .aig
            .eval(&bits(&[("s##time_0", true)]), &BitValues::new())
            .unwrap();
        assert!(out["s##time_2"]);
    }
}
