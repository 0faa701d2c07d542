//! Stepwise evaluation of sequential circuits.

use tracing::trace;

use crate::circuit::BvCircuit;
use crate::codec::{blast, Values};
use crate::error::Result;

/// A circuit together with its current latch values.
#[derive(Debug, Clone)]
pub struct Simulator {
    circuit: BvCircuit,
    latches: Values,
    steps: usize,
}

impl Simulator {
    /// Start from `latches`, or from the reset values when `None`.
    pub fn new(circuit: BvCircuit, latches: Option<Values>) -> Result<Self> {
        let latches = match latches {
            Some(latches) => {
                blast(&latches, circuit.latch_map())?;
                latches
            }
            None => circuit.initial_latches()?,
        };
        Ok(Self {
            circuit,
            latches,
            steps: 0,
        })
    }

    /// Evaluate one step and advance the latch state. Returns the outputs and
    /// the latch values for the next step.
    pub fn step(&mut self, inputs: &Values) -> Result<(Values, Values)> {
        let (outputs, next) = self.circuit.call(inputs, Some(&self.latches))?;
        self.latches = next.clone();
        self.steps += 1;
        trace!(step = self.steps, "simulator step");
        Ok((outputs, next))
    }

    pub fn circuit(&self) -> &BvCircuit {
        &self.circuit
    }

    pub fn latches(&self) -> &Values {
        &self.latches
    }

    /// Number of steps taken so far.
    pub fn steps(&self) -> usize {
        self.steps
    }
}

impl BvCircuit {
    pub fn simulator(&self, latches: Option<Values>) -> Result<Simulator> {
        Simulator::new(self.clone(), latches)
    }

    /// Run the circuit over a sequence of inputs, one step per element.
    pub fn simulate<'a, I>(
        &self,
        inputs: I,
        latches: Option<Values>,
    ) -> Result<Vec<(Values, Values)>>
    where
        I: IntoIterator<Item = &'a Values>,
    {
        let mut sim = self.simulator(latches)?;
        inputs.into_iter().map(|step| sim.step(step)).collect()
    }
}
