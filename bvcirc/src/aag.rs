//! ASCII AIGER (`aag`) writer for the substrate.
//!
//! Variables are numbered inputs first, then latches, both in name order,
//! then and-gates in depth-first post-order from the outputs (by name)
//! followed by the latch next-state functions (by name). The numbering is
//! therefore a pure function of the circuit.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::aig::{Aig, Node, Signal};

struct Numbering<'a> {
    inputs: HashMap<&'a str, u32>,
    latches: HashMap<&'a str, u32>,
    literals: HashMap<*const Node, u32>,
    ands: Vec<(u32, u32, u32)>,
    next_var: u32,
}

impl<'a> Numbering<'a> {
    fn new(aig: &'a Aig) -> Self {
        let inputs: HashMap<&str, u32> = aig
            .inputs()
            .iter()
            .zip(1..)
            .map(|(name, var)| (name.as_str(), var))
            .collect();
        let first_latch = inputs.len() as u32 + 1;
        let latches: HashMap<&str, u32> = aig
            .latches()
            .keys()
            .zip(first_latch..)
            .map(|(name, var)| (name.as_str(), var))
            .collect();
        let next_var = first_latch + latches.len() as u32;
        Self {
            inputs,
            latches,
            literals: HashMap::new(),
            ands: Vec::new(),
            next_var,
        }
    }

    fn literal(&mut self, root: &Signal) -> u32 {
        let mut stack = vec![(root.clone(), false)];
        while let Some((sig, expanded)) = stack.pop() {
            let key = Arc::as_ptr(&sig);
            if self.literals.contains_key(&key) {
                continue;
            }
            let lit = match &*sig {
                Node::Const(v) => u32::from(*v),
                Node::Input(name) => 2 * self.inputs[name.as_str()],
                Node::Latch(name) => 2 * self.latches[name.as_str()],
                Node::Not(a) if expanded => self.literals[&Arc::as_ptr(a)] ^ 1,
                Node::And(a, b) if expanded => {
                    let lhs = 2 * self.next_var;
                    self.next_var += 1;
                    let rhs0 = self.literals[&Arc::as_ptr(a)];
                    let rhs1 = self.literals[&Arc::as_ptr(b)];
                    self.ands.push((lhs, rhs0.max(rhs1), rhs0.min(rhs1)));
                    lhs
                }
                Node::Not(a) => {
                    stack.push((sig.clone(), true));
                    stack.push((a.clone(), false));
                    continue;
                }
                Node::And(a, b) => {
                    stack.push((sig.clone(), true));
                    stack.push((b.clone(), false));
                    stack.push((a.clone(), false));
                    continue;
                }
            };
            self.literals.insert(key, lit);
        }
        self.literals[&Arc::as_ptr(root)]
    }
}

/// ASCII AIGER rendering, symbol table included.
impl fmt::Display for Aig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut numbering = Numbering::new(self);
        let outputs: Vec<u32> = self
            .outputs()
            .values()
            .map(|sig| numbering.literal(sig))
            .collect();
        let nexts: Vec<u32> = self
            .latches()
            .values()
            .map(|def| numbering.literal(&def.next))
            .collect();

        writeln!(
            f,
            "aag {} {} {} {} {}",
            numbering.next_var - 1,
            self.inputs().len(),
            self.latches().len(),
            outputs.len(),
            numbering.ands.len()
        )?;
        for name in self.inputs() {
            writeln!(f, "{}", 2 * numbering.inputs[name.as_str()])?;
        }
        for ((name, def), next) in self.latches().iter().zip(&nexts) {
            let lit = 2 * numbering.latches[name.as_str()];
            writeln!(f, "{lit} {next} {}", u8::from(def.init))?;
        }
        for lit in &outputs {
            writeln!(f, "{lit}")?;
        }
        for (lhs, rhs0, rhs1) in &numbering.ands {
            writeln!(f, "{lhs} {rhs0} {rhs1}")?;
        }
        for (i, name) in self.inputs().iter().enumerate() {
            writeln!(f, "i{i} {name}")?;
        }
        for (i, name) in self.latches().keys().enumerate() {
            writeln!(f, "l{i} {name}")?;
        }
        for (i, name) in self.outputs().keys().enumerate() {
            writeln!(f, "o{i} {name}")?;
        }
        Ok(())
    }
}

impl Aig {
    /// Render the circuit in ASCII AIGER format.
    pub fn to_aag(&self) -> String {
        self.to_string()
    }

    pub fn write(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        fs::write(path, self.to_aag())
    }
}
