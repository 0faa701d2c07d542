//! Integer encoding and a library of word-level gates.
//!
//! Every gate names its bits `word[i]`, least significant bit first.

use bitvec::prelude::*;

use crate::aig::{and, constant, input, not, or, xnor, xor, Aig, Signal};
use crate::circuit::BvCircuit;
use crate::codec::Word;
use crate::error::{Error, Result};
use crate::port::PortKind;
use crate::word_map::{indexed_bits, WordMap};

/// Encode `value` as a two's complement (`signed`) or plain binary word.
pub fn encode_int(wordlen: usize, value: i64, signed: bool) -> Result<Word> {
    // every i64 fits once the word reaches 64 bits
    let width = wordlen.min(64) as u32;
    let (low, high) = match (signed, width) {
        (_, 0) => (0, 0),
        (true, w) => (-(1i128 << (w - 1)), (1i128 << (w - 1)) - 1),
        (false, w) => (0, (1i128 << w) - 1),
    };
    if i128::from(value) < low || i128::from(value) > high {
        return Err(Error::ValueOutOfRange { value, wordlen });
    }
    Ok((0..wordlen)
        .map(|i| (value >> i.min(63)) & 1 == 1)
        .collect())
}

/// Decode a word produced by [`encode_int`]. Words wider than 64 bits are
/// truncated to their low 64 bits.
pub fn decode_int(bits: &BitSlice<u8, Lsb0>, signed: bool) -> i64 {
    let width = bits.len().min(64);
    let mut value = 0u64;
    for (i, bit) in bits[..width].iter().by_vals().enumerate() {
        value |= u64::from(bit) << i;
    }
    if signed && width > 0 && width < 64 && bits[width - 1] {
        value |= u64::MAX << width;
    }
    value as i64
}

/// Collects input and output words, then assembles the circuit.
#[derive(Default)]
struct GateBuilder {
    inputs: Vec<(String, usize)>,
    outputs: Vec<(String, Vec<Signal>)>,
}

impl GateBuilder {
    fn input(&mut self, word: &str, wordlen: usize) -> Vec<Signal> {
        self.inputs.push((word.to_string(), wordlen));
        indexed_bits(word, wordlen).into_iter().map(input).collect()
    }

    fn output(mut self, word: &str, bits: Vec<Signal>) -> Self {
        self.outputs.push((word.to_string(), bits));
        self
    }

    fn build(self) -> Result<BvCircuit> {
        let input_map = WordMap::indexed(PortKind::Input, self.inputs)?;
        let mut widths = Vec::with_capacity(self.outputs.len());
        let mut outputs = Vec::new();
        for (word, bits) in self.outputs {
            widths.push((word.clone(), bits.len()));
            outputs.extend(indexed_bits(&word, bits.len()).into_iter().zip(bits));
        }
        let output_map = WordMap::indexed(PortKind::Output, widths)?;
        let aig = Aig::new(input_map.bits().cloned(), outputs, [])?;
        BvCircuit::new(aig, input_map, output_map, WordMap::new())
    }
}

fn all(bits: &[Signal]) -> Signal {
    bits.iter().fold(constant(true), |acc, bit| and(&acc, bit))
}

fn any(bits: &[Signal]) -> Signal {
    bits.iter().fold(constant(false), |acc, bit| or(&acc, bit))
}

fn bitwise(
    wordlen: usize,
    left: &str,
    right: &str,
    output: &str,
    op: fn(&Signal, &Signal) -> Signal,
) -> Result<BvCircuit> {
    let mut gate = GateBuilder::default();
    let l = gate.input(left, wordlen);
    let r = gate.input(right, wordlen);
    let bits = l.iter().zip(&r).map(|(a, b)| op(a, b)).collect();
    gate.output(output, bits).build()
}

/// Constant word driving `output`.
pub fn source(wordlen: usize, value: i64, output: &str, signed: bool) -> Result<BvCircuit> {
    let bits = encode_int(wordlen, value, signed)?
        .iter()
        .by_vals()
        .map(constant)
        .collect();
    GateBuilder::default().output(output, bits).build()
}

/// Absorbs the named words without producing outputs.
pub fn sink<'a>(wordlen: usize, inputs: impl IntoIterator<Item = &'a str>) -> Result<BvCircuit> {
    let mut gate = GateBuilder::default();
    for word in inputs {
        gate.input(word, wordlen);
    }
    gate.build()
}

pub fn identity_gate(wordlen: usize, input: &str, output: &str) -> Result<BvCircuit> {
    let mut gate = GateBuilder::default();
    let bits = gate.input(input, wordlen);
    gate.output(output, bits).build()
}

/// Reverses the bit order of a word.
pub fn reverse_gate(wordlen: usize, input: &str, output: &str) -> Result<BvCircuit> {
    let mut gate = GateBuilder::default();
    let mut bits = gate.input(input, wordlen);
    bits.reverse();
    gate.output(output, bits).build()
}

/// Concatenates two words, `left` in the low bits.
pub fn combine_gate(
    left_wordlen: usize,
    left: &str,
    right_wordlen: usize,
    right: &str,
    output: &str,
) -> Result<BvCircuit> {
    let mut gate = GateBuilder::default();
    let mut bits = gate.input(left, left_wordlen);
    bits.extend(gate.input(right, right_wordlen));
    gate.output(output, bits).build()
}

/// Splits a word into its low `left_wordlen` bits and the remaining
/// `right_wordlen` bits.
pub fn split_gate(
    input: &str,
    left_wordlen: usize,
    left: &str,
    right_wordlen: usize,
    right: &str,
) -> Result<BvCircuit> {
    let mut gate = GateBuilder::default();
    let mut low = gate.input(input, left_wordlen + right_wordlen);
    let high = low.split_off(left_wordlen);
    gate.output(left, low).output(right, high).build()
}

pub fn bitwise_and(wordlen: usize, left: &str, right: &str, output: &str) -> Result<BvCircuit> {
    bitwise(wordlen, left, right, output, and)
}

pub fn bitwise_or(wordlen: usize, left: &str, right: &str, output: &str) -> Result<BvCircuit> {
    bitwise(wordlen, left, right, output, or)
}

pub fn bitwise_xor(wordlen: usize, left: &str, right: &str, output: &str) -> Result<BvCircuit> {
    bitwise(wordlen, left, right, output, xor)
}

pub fn bitwise_negate(wordlen: usize, input: &str, output: &str) -> Result<BvCircuit> {
    let mut gate = GateBuilder::default();
    let bits = gate.input(input, wordlen).iter().map(not).collect();
    gate.output(output, bits).build()
}

/// Ripple-carry adder. The sum wraps modulo `2^wordlen`.
pub fn add_gate(wordlen: usize, left: &str, right: &str, output: &str) -> Result<BvCircuit> {
    let mut gate = GateBuilder::default();
    let l = gate.input(left, wordlen);
    let r = gate.input(right, wordlen);
    let mut carry = constant(false);
    let mut sum = Vec::with_capacity(wordlen);
    for (a, b) in l.iter().zip(&r) {
        let half = xor(a, b);
        sum.push(xor(&half, &carry));
        carry = or(&and(a, b), &and(&carry, &half));
    }
    gate.output(output, sum).build()
}

/// Single-bit `output` set when the two words are equal.
pub fn eq_gate(wordlen: usize, left: &str, right: &str, output: &str) -> Result<BvCircuit> {
    let mut gate = GateBuilder::default();
    let l = gate.input(left, wordlen);
    let r = gate.input(right, wordlen);
    let same: Vec<Signal> = l.iter().zip(&r).map(|(a, b)| xnor(a, b)).collect();
    gate.output(output, vec![all(&same)]).build()
}

pub fn neq_gate(wordlen: usize, left: &str, right: &str, output: &str) -> Result<BvCircuit> {
    let mut gate = GateBuilder::default();
    let l = gate.input(left, wordlen);
    let r = gate.input(right, wordlen);
    let differ: Vec<Signal> = l.iter().zip(&r).map(|(a, b)| xor(a, b)).collect();
    gate.output(output, vec![any(&differ)]).build()
}

pub fn is_zero_gate(wordlen: usize, input: &str, output: &str) -> Result<BvCircuit> {
    let mut gate = GateBuilder::default();
    let bits = gate.input(input, wordlen);
    gate.output(output, vec![not(&any(&bits))]).build()
}

pub fn is_nonzero_gate(wordlen: usize, input: &str, output: &str) -> Result<BvCircuit> {
    let mut gate = GateBuilder::default();
    let bits = gate.input(input, wordlen);
    gate.output(output, vec![any(&bits)]).build()
}
