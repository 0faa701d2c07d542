//! Closing output words back onto input words through new latches.

use std::collections::BTreeSet;

use tracing::debug;

use crate::circuit::BvCircuit;
use crate::codec::Word;
use crate::error::{Error, Result};
use crate::port::PortKind;
use crate::word_map::{indexed_bits, WordMap};

/// Options for [`BvCircuit::feedback`].
///
/// The i-th input, output and latch name describe one register: the latch
/// replaces the input word and is loaded from the output word every step.
#[derive(Debug, Clone, Default)]
pub struct FeedbackConfig {
    /// Input words to turn into latch reads.
    pub inputs: Vec<String>,
    /// Output words that drive the next latch values.
    pub outputs: Vec<String>,
    /// Names of the new latch words. Defaults to the input names.
    pub latches: Option<Vec<String>>,
    /// Reset value per latch. Defaults to all zeros.
    pub initials: Option<Vec<Word>>,
    /// Keep the fed-back outputs visible as outputs.
    pub keep_outputs: bool,
}

impl FeedbackConfig {
    pub fn new<I, O>(inputs: I, outputs: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn latches<L>(mut self, latches: L) -> Self
    where
        L: IntoIterator,
        L::Item: Into<String>,
    {
        self.latches = Some(latches.into_iter().map(Into::into).collect());
        self
    }

    pub fn initials(mut self, initials: impl IntoIterator<Item = Word>) -> Self {
        self.initials = Some(initials.into_iter().collect());
        self
    }

    pub fn keep_outputs(mut self, keep: bool) -> Self {
        self.keep_outputs = keep;
        self
    }
}

impl BvCircuit {
    /// Replace input words with latches fed by output words.
    ///
    /// Each latch has the width of the input it replaces. Its bits are named
    /// `latch[i]` and its reset value comes from `initials` (zeros if absent).
    pub fn feedback(&self, config: &FeedbackConfig) -> Result<BvCircuit> {
        let inputs = &config.inputs;
        let outputs = &config.outputs;
        let latches = config.latches.as_ref().unwrap_or(inputs);
        let arity_error = |latches: usize| Error::FeedbackArity {
            inputs: inputs.len(),
            outputs: outputs.len(),
            latches,
        };
        if outputs.len() != inputs.len() || latches.len() != inputs.len() {
            return Err(arity_error(latches.len()));
        }
        if let Some(initials) = &config.initials {
            if initials.len() != inputs.len() {
                return Err(arity_error(initials.len()));
            }
        }

        let mut dropped = BTreeSet::new();
        let mut fresh = BTreeSet::new();
        let mut in_bits = Vec::new();
        let mut out_bits = Vec::new();
        let mut latch_bits = Vec::new();
        let mut init_bits = Vec::new();
        let mut latch_words = Vec::with_capacity(latches.len());
        for (i, ((input, output), latch)) in inputs.iter().zip(outputs).zip(latches).enumerate() {
            let ins = self
                .input_map()
                .get(input)
                .ok_or_else(|| Error::UnknownWord {
                    kind: PortKind::Input,
                    word: input.clone(),
                })?;
            let outs = self
                .output_map()
                .get(output)
                .ok_or_else(|| Error::UnknownWord {
                    kind: PortKind::Output,
                    word: output.clone(),
                })?;
            if !dropped.insert(input) {
                return Err(Error::DuplicateWord {
                    kind: PortKind::Input,
                    word: input.clone(),
                });
            }
            if self.latch_map().contains(latch) || !fresh.insert(latch) {
                return Err(Error::DuplicateWord {
                    kind: PortKind::Latch,
                    word: latch.clone(),
                });
            }
            let width = ins.len();
            if outs.len() != width {
                return Err(Error::WidthMismatch {
                    word: output.clone(),
                    expected: width,
                    actual: outs.len(),
                });
            }
            match config.initials.as_ref().map(|initials| &initials[i]) {
                Some(init) if init.len() != width => {
                    return Err(Error::WidthMismatch {
                        word: latch.clone(),
                        expected: width,
                        actual: init.len(),
                    })
                }
                Some(init) => init_bits.extend(init.iter().by_vals()),
                None => init_bits.extend(std::iter::repeat(false).take(width)),
            }

            let bits = indexed_bits(latch, width);
            in_bits.extend(ins.iter().cloned());
            out_bits.extend(outs.iter().cloned());
            latch_bits.extend(bits.iter().cloned());
            latch_words.push((latch.clone(), bits));
        }

        let aig = self.aig().feedback(
            &in_bits,
            &out_bits,
            &latch_bits,
            &init_bits,
            config.keep_outputs,
        )?;

        let input_map = self.input_map().without(inputs);
        let output_map = if config.keep_outputs {
            self.output_map().clone()
        } else {
            self.output_map().without(outputs)
        };
        let new_latches = WordMap::from_words(PortKind::Latch, latch_words)?;
        let latch_map = self.latch_map().union(&new_latches, PortKind::Latch)?;

        debug!(
            latches = ?latches,
            bits = latch_bits.len(),
            keep_outputs = config.keep_outputs,
            "feedback"
        );
        BvCircuit::new(aig, input_map, output_map, latch_map)
    }
}
