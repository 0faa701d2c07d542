//! Conversion between word-keyed and bit-keyed value assignments.

use std::collections::BTreeMap;

use bitvec::prelude::*;

use crate::aig::BitValues;
use crate::error::{Error, Result};
use crate::word_map::WordMap;

/// Value of one word, index 0 being the least significant bit.
pub type Word = BitVec<u8, Lsb0>;

/// Word-keyed value assignment.
pub type Values = BTreeMap<String, Word>;

/// Spread every word named by `map` over its bits.
///
/// Words in `values` that `map` does not name are ignored. An empty map
/// yields an empty assignment without looking at `values`.
pub fn blast(values: &Values, map: &WordMap) -> Result<BitValues> {
    let mut bits = BitValues::new();
    for (word, names) in map.iter() {
        let value = values
            .get(word)
            .ok_or_else(|| Error::MissingWord(word.clone()))?;
        if value.len() != names.len() {
            return Err(Error::WidthMismatch {
                word: word.clone(),
                expected: names.len(),
                actual: value.len(),
            });
        }
        bits.extend(names.iter().cloned().zip(value.iter().by_vals()));
    }
    Ok(bits)
}

/// Collect the bits of every word named by `map`.
pub fn unblast(bits: &BitValues, map: &WordMap) -> Result<Values> {
    map.iter()
        .map(|(word, names)| {
            let value = names
                .iter()
                .map(|name| {
                    bits.get(name)
                        .copied()
                        .ok_or_else(|| Error::MissingBit(name.clone()))
                })
                .collect::<Result<Word>>()?;
            Ok((word.clone(), value))
        })
        .collect()
}
