//! Correspondence between word names and ordered bit names.
//!
//! A [`WordMap`] binds each word to the substrate wires that carry it, least
//! significant bit first. Maps are persistent: cloning is cheap and derived
//! maps share structure with the map they came from.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use im::OrdMap;
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::port::PortKind;

/// Bit names of one word, index 0 being the least significant bit.
pub type Bits = Arc<[String]>;

/// Bit names `word[0]`, `word[1]`, ... for a word of the given width.
pub fn indexed_bits(word: &str, width: usize) -> Vec<String> {
    (0..width).map(|i| format!("{word}[{i}]")).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordMap {
    words: OrdMap<String, Bits>,
}

impl WordMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from `(word, bits)` pairs, rejecting empty and repeated words.
    pub fn from_words<I, W, B, S>(kind: PortKind, words: I) -> Result<Self>
    where
        I: IntoIterator<Item = (W, B)>,
        W: Into<String>,
        B: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = WordMap::new();
        for (word, bits) in words {
            let bits: Bits = bits.into_iter().map(Into::into).collect();
            map.insert(kind, word.into(), bits)?;
        }
        Ok(map)
    }

    /// Build a map of `(word, width)` pairs using [`indexed_bits`] naming.
    pub fn indexed<I, W>(kind: PortKind, words: I) -> Result<Self>
    where
        I: IntoIterator<Item = (W, usize)>,
        W: Into<String>,
    {
        Self::from_words(
            kind,
            words.into_iter().map(|(word, width)| {
                let word = word.into();
                let bits = indexed_bits(&word, width);
                (word, bits)
            }),
        )
    }

    /// One single-bit word per name, named after its bit.
    pub fn diagonal<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let words = names
            .into_iter()
            .map(|name| (name.to_string(), Bits::from(vec![name.to_string()])))
            .collect();
        Self { words }
    }

    fn insert(&mut self, kind: PortKind, word: String, bits: Bits) -> Result<()> {
        if bits.is_empty() {
            return Err(Error::EmptyWord { kind, word });
        }
        if self.words.contains_key(&word) {
            return Err(Error::DuplicateWord { kind, word });
        }
        self.words.insert(word, bits);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains_key(word)
    }

    pub fn get(&self, word: &str) -> Option<&Bits> {
        self.words.get(word)
    }

    pub fn width(&self, word: &str) -> Option<usize> {
        self.words.get(word).map(|bits| bits.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Bits)> {
        self.words.iter()
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.words.keys().cloned().collect()
    }

    /// Every bit of every word, words in name order.
    pub fn bits(&self) -> impl Iterator<Item = &String> {
        self.words.values().flat_map(|bits| bits.iter())
    }

    /// Inverse index: bit name to owning word and position within it.
    pub fn bit_index(&self) -> HashMap<&str, (&str, usize)> {
        self.words
            .iter()
            .flat_map(|(word, bits)| {
                bits.iter()
                    .enumerate()
                    .map(move |(pos, bit)| (bit.as_str(), (word.as_str(), pos)))
            })
            .collect()
    }

    /// Copy of the map without the given words. Unknown names are ignored.
    pub fn without<'a>(&self, words: impl IntoIterator<Item = &'a String>) -> WordMap {
        let mut out = self.clone();
        for word in words {
            out.words.remove(word);
        }
        out
    }

    /// Union of two maps. A word present on both sides must be bound to the
    /// same bits and is kept once.
    pub fn union(&self, other: &WordMap, kind: PortKind) -> Result<WordMap> {
        let mut out = self.clone();
        for (word, bits) in other.words.iter() {
            match self.words.get(word) {
                Some(existing) if existing == bits => {}
                Some(_) => {
                    return Err(Error::ConflictingWord {
                        kind,
                        word: word.clone(),
                    })
                }
                None => {
                    out.words.insert(word.clone(), bits.clone());
                }
            }
        }
        Ok(out)
    }

    /// Rename words, keeping their bits. Names absent from `renames` pass
    /// through. Two words ending up with the same name is an error.
    pub fn relabel(&self, kind: PortKind, renames: &BTreeMap<String, String>) -> Result<WordMap> {
        let mut out = WordMap::new();
        for (word, bits) in self.words.iter() {
            let target = renames.get(word).unwrap_or(word).clone();
            out.insert(kind, target, bits.clone())?;
        }
        Ok(out)
    }

    /// Copy of the map with bits renamed. Words and bit order are kept.
    pub fn rename_bits(&self, renames: &BTreeMap<String, String>) -> WordMap {
        let words = self
            .words
            .iter()
            .map(|(word, bits)| {
                let bits: Bits = bits
                    .iter()
                    .map(|bit| renames.get(bit).unwrap_or(bit).clone())
                    .collect();
                (word.clone(), bits)
            })
            .collect();
        WordMap { words }
    }
}

impl Serialize for WordMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.words.iter().map(|(word, bits)| (word, &bits[..])))
    }
}
