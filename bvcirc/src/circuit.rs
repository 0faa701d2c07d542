use std::collections::{BTreeMap, BTreeSet};
use std::ops::{BitOr, Shr};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use crate::aig::Aig;
use crate::codec::{blast, unblast, Values};
use crate::error::{Error, Result};
use crate::port::PortKind;
use crate::word_map::WordMap;

/// A circuit whose ports are named words over the wires of a shared [`Aig`].
///
/// The three word maps partition the substrate's inputs, outputs and latches
/// exactly. Circuits are immutable: every operation returns a new circuit
/// that shares the substrate nodes it did not have to rebuild.
#[derive(Debug, Clone)]
pub struct BvCircuit {
    aig: Arc<Aig>,
    input_map: WordMap,
    output_map: WordMap,
    latch_map: WordMap,
}

/// Word widths per port kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub inputs: BTreeMap<String, usize>,
    pub outputs: BTreeMap<String, usize>,
    pub latches: BTreeMap<String, usize>,
}

fn widths(map: &WordMap) -> BTreeMap<String, usize> {
    map.iter()
        .map(|(word, bits)| (word.clone(), bits.len()))
        .collect()
}

fn shared_words(left: &WordMap, right: &WordMap) -> Vec<String> {
    left.iter()
        .map(|(word, _)| word)
        .filter(|word| right.contains(word))
        .cloned()
        .collect()
}

impl BvCircuit {
    /// Bind word maps to a substrate after checking that they partition its
    /// wires and that no bit belongs to two words.
    pub fn new(
        aig: impl Into<Arc<Aig>>,
        input_map: WordMap,
        output_map: WordMap,
        latch_map: WordMap,
    ) -> Result<Self> {
        let circuit = Self {
            aig: aig.into(),
            input_map,
            output_map,
            latch_map,
        };
        circuit.validate()?;
        Ok(circuit)
    }

    /// Wrap a substrate circuit, making every wire a single-bit word of the
    /// same name.
    pub fn lift(aig: impl Into<Arc<Aig>>) -> Result<Self> {
        let aig = aig.into();
        let input_map = WordMap::diagonal(aig.names(PortKind::Input));
        let output_map = WordMap::diagonal(aig.names(PortKind::Output));
        let latch_map = WordMap::diagonal(aig.names(PortKind::Latch));
        Self::new(aig, input_map, output_map, latch_map)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for kind in PortKind::ALL {
            let map = self.map(kind);
            let wires = self.aig.names(kind);
            let mut mapped = BTreeSet::new();
            for bit in map.bits() {
                if !seen.insert(bit.as_str()) {
                    return Err(Error::DuplicateBit(bit.clone()));
                }
                if !wires.contains(bit.as_str()) {
                    return Err(Error::UnmappedBit {
                        kind,
                        bit: bit.clone(),
                    });
                }
                mapped.insert(bit.as_str());
            }
            if let Some(wire) = wires.difference(&mapped).next() {
                return Err(Error::UnmappedBit {
                    kind,
                    bit: wire.to_string(),
                });
            }
        }
        Ok(())
    }

    fn all_bits(&self) -> impl Iterator<Item = &str> + '_ {
        PortKind::ALL
            .into_iter()
            .flat_map(move |kind| self.map(kind).bits().map(String::as_str))
    }

    /// Copy of the circuit whose bits avoid the names in `taken`, apart from
    /// those in `keep`. Clashing bits get a `#n` suffix.
    fn with_fresh_bits(&self, taken: &BTreeSet<&str>, keep: &BTreeSet<&str>) -> Result<Self> {
        let own: BTreeSet<&str> = self.all_bits().collect();
        let mut used = BTreeSet::new();
        let mut renames = BTreeMap::new();
        for &bit in &own {
            if !taken.contains(bit) || keep.contains(bit) {
                continue;
            }
            let mut n = 1;
            let fresh = loop {
                let candidate = format!("{bit}#{n}");
                let clashes = taken.contains(candidate.as_str())
                    || own.contains(candidate.as_str())
                    || used.contains(&candidate);
                if !clashes {
                    break candidate;
                }
                n += 1;
            };
            used.insert(fresh.clone());
            renames.insert(bit.to_string(), fresh);
        }
        if renames.is_empty() {
            return Ok(self.clone());
        }

        let mut aig = (*self.aig).clone();
        for kind in PortKind::ALL {
            aig = aig.rename(kind, &renames)?;
        }
        trace!(renamed = renames.len(), "freshened clashing bits");
        Self::new(
            aig,
            self.input_map.rename_bits(&renames),
            self.output_map.rename_bits(&renames),
            self.latch_map.rename_bits(&renames),
        )
    }

    pub fn aig(&self) -> &Arc<Aig> {
        &self.aig
    }

    pub fn input_map(&self) -> &WordMap {
        &self.input_map
    }

    pub fn output_map(&self) -> &WordMap {
        &self.output_map
    }

    pub fn latch_map(&self) -> &WordMap {
        &self.latch_map
    }

    pub fn map(&self, kind: PortKind) -> &WordMap {
        match kind {
            PortKind::Input => &self.input_map,
            PortKind::Output => &self.output_map,
            PortKind::Latch => &self.latch_map,
        }
    }

    pub fn inputs(&self) -> BTreeSet<String> {
        self.input_map.names()
    }

    pub fn outputs(&self) -> BTreeSet<String> {
        self.output_map.names()
    }

    pub fn latches(&self) -> BTreeSet<String> {
        self.latch_map.names()
    }

    pub fn signature(&self) -> Signature {
        Signature {
            inputs: widths(&self.input_map),
            outputs: widths(&self.output_map),
            latches: widths(&self.latch_map),
        }
    }

    /// Rename the words of one port kind. Names not in `renames` are kept,
    /// bits are untouched, and a rename that merges two words fails.
    pub fn relabel<I, K, V>(&self, kind: PortKind, renames: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let renames: BTreeMap<String, String> = renames
            .into_iter()
            .map(|(old, new)| (old.into(), new.into()))
            .collect();
        let relabeled = self.map(kind).relabel(kind, &renames)?;
        let mut circuit = self.clone();
        match kind {
            PortKind::Input => circuit.input_map = relabeled,
            PortKind::Output => circuit.output_map = relabeled,
            PortKind::Latch => circuit.latch_map = relabeled,
        }
        Ok(circuit)
    }

    /// Feed the outputs of `self` into the inputs of `other` wherever the
    /// word names coincide.
    pub fn seq_compose(&self, other: &BvCircuit) -> Result<Self> {
        let shared = shared_words(&self.latch_map, &other.latch_map);
        if !shared.is_empty() {
            return Err(Error::SharedLatches(shared));
        }
        let interface: BTreeSet<String> = shared_words(&self.output_map, &other.input_map)
            .into_iter()
            .collect();
        let shadowed: Vec<String> = shared_words(&self.output_map, &other.output_map)
            .into_iter()
            .filter(|word| !interface.contains(word))
            .collect();
        if !shadowed.is_empty() {
            return Err(Error::OutputShadowing(shadowed));
        }

        // input words shared with identical bits stay shared
        let keep: BTreeSet<&str> = other
            .input_map
            .iter()
            .filter(|(word, bits)| {
                !interface.contains(*word) && self.input_map.get(word) == Some(*bits)
            })
            .flat_map(|(_, bits)| bits.iter().map(String::as_str))
            .collect();
        // interface outputs are consumed by the composition
        let consumed: BTreeSet<&str> = interface
            .iter()
            .filter_map(|word| self.output_map.get(word))
            .flat_map(|bits| bits.iter().map(String::as_str))
            .collect();
        let taken: BTreeSet<&str> = self.all_bits().filter(|bit| !consumed.contains(bit)).collect();
        let other = other.with_fresh_bits(&taken, &keep)?;

        // output bits take the names of the input bits they drive
        let mut relabels = BTreeMap::new();
        for (word, outs) in self.output_map.iter() {
            let Some(ins) = other.input_map.get(word) else {
                continue;
            };
            if outs.len() != ins.len() {
                return Err(Error::WidthMismatch {
                    word: word.clone(),
                    expected: ins.len(),
                    actual: outs.len(),
                });
            }
            relabels.extend(outs.iter().cloned().zip(ins.iter().cloned()));
        }

        let upstream = if relabels.is_empty() {
            self.aig.clone()
        } else {
            Arc::new(self.aig.rename(PortKind::Output, &relabels)?)
        };
        let aig = upstream.seq_compose(&other.aig)?;

        let input_map = self
            .input_map
            .union(&other.input_map.without(&interface), PortKind::Input)?;
        let output_map = self
            .output_map
            .without(&interface)
            .union(&other.output_map, PortKind::Output)?;
        let latch_map = self.latch_map.union(&other.latch_map, PortKind::Latch)?;

        debug!(
            interface = ?interface,
            inputs = input_map.len(),
            outputs = output_map.len(),
            "sequential composition"
        );
        Self::new(aig, input_map, output_map, latch_map)
    }

    /// Place two circuits with disjoint ports side by side.
    pub fn par_compose(&self, other: &BvCircuit) -> Result<Self> {
        for kind in PortKind::ALL {
            let words = shared_words(self.map(kind), other.map(kind));
            if !words.is_empty() {
                return Err(Error::Overlap { kind, words });
            }
        }
        let other = other.with_fresh_bits(&self.all_bits().collect(), &BTreeSet::new())?;
        let aig = self.aig.par_compose(&other.aig)?;
        let input_map = self.input_map.union(&other.input_map, PortKind::Input)?;
        let output_map = self.output_map.union(&other.output_map, PortKind::Output)?;
        let latch_map = self.latch_map.union(&other.latch_map, PortKind::Latch)?;
        debug!(
            inputs = input_map.len(),
            outputs = output_map.len(),
            latches = latch_map.len(),
            "parallel composition"
        );
        Self::new(aig, input_map, output_map, latch_map)
    }

    /// Reset values of every latch word.
    pub fn initial_latches(&self) -> Result<Values> {
        unblast(&self.aig.initial_latches(), &self.latch_map)
    }

    /// Evaluate one step, returning the outputs and the next latch values.
    /// Without `latches`, every latch starts from its reset value.
    pub fn call(&self, inputs: &Values, latches: Option<&Values>) -> Result<(Values, Values)> {
        let latch_bits = match latches {
            Some(values) => blast(values, &self.latch_map)?,
            None => self.aig.initial_latches(),
        };
        let (outputs, next) = self
            .aig
            .eval(&blast(inputs, &self.input_map)?, &latch_bits)?;
        Ok((
            unblast(&outputs, &self.output_map)?,
            unblast(&next, &self.latch_map)?,
        ))
    }

    /// Write the substrate in ASCII AIGER format.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        self.aig.write(path)?;
        Ok(())
    }
}

/// `a >> b` is [`BvCircuit::seq_compose`].
///
/// # Panics
///
/// Panics if the composition is invalid.
impl Shr<&BvCircuit> for &BvCircuit {
    type Output = BvCircuit;

    fn shr(self, other: &BvCircuit) -> BvCircuit {
        self.seq_compose(other)
            .unwrap_or_else(|e| panic!("invalid sequential composition: {e}"))
    }
}

/// `a | b` is [`BvCircuit::par_compose`].
///
/// # Panics
///
/// Panics if the circuits share a port name.
impl BitOr<&BvCircuit> for &BvCircuit {
    type Output = BvCircuit;

    fn bitor(self, other: &BvCircuit) -> BvCircuit {
        self.par_compose(other)
            .unwrap_or_else(|e| panic!("invalid parallel composition: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::{and, input, latch, not, xor, BitValues, LatchDef};
    use crate::codec::Word;
    use crate::gates::{
        add_gate, bitwise_and, bitwise_negate, decode_int, encode_int, identity_gate,
    };
    use bitvec::prelude::*;
    use insta::assert_json_snapshot;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;

    fn fixtures() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("fixtures")
    }

    fn word(wordlen: usize, value: i64) -> Word {
        encode_int(wordlen, value, true).unwrap()
    }

    fn values(pairs: &[(&str, Word)]) -> Values {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    /// Two inputs, two outputs and one latch with a non-trivial reset value.
    fn sample_aig() -> Aig {
        let (x, y, s) = (input("x"), input("y"), latch("s"));
        Aig::new(
            ["x", "y"].map(String::from),
            vec![
                ("p".to_string(), and(&x, &not(&s))),
                ("q".to_string(), xor(&y, &s)),
            ],
            vec![("s".to_string(), LatchDef::new(xor(&x, &s), true))],
        )
        .unwrap()
    }

    #[test]
    fn lift_uses_diagonal_maps() {
        let circuit = BvCircuit::lift(sample_aig()).unwrap();
        assert_eq!(
            circuit.inputs(),
            BTreeSet::from(["x".to_string(), "y".to_string()])
        );
        assert_eq!(circuit.latches(), BTreeSet::from(["s".to_string()]));
        assert_eq!(&circuit.output_map().get("p").unwrap()[..], ["p"]);
    }

    #[test]
    fn lift_matches_substrate_evaluation() {
        let aig = sample_aig();
        let circuit = BvCircuit::lift(aig.clone()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..32 {
            let (x, y, s): (bool, bool, bool) = (rng.gen(), rng.gen(), rng.gen());
            let bits = BitValues::from([("x".to_string(), x), ("y".to_string(), y)]);
            let latch_bits = BitValues::from([("s".to_string(), s)]);
            let (outs, next) = aig.eval(&bits, &latch_bits).unwrap();

            let words = values(&[("x", Word::repeat(x, 1)), ("y", Word::repeat(y, 1))]);
            let latches = values(&[("s", Word::repeat(s, 1))]);
            let (word_outs, word_next) = circuit.call(&words, Some(&latches)).unwrap();
            assert_eq!(word_outs["p"][0], outs["p"]);
            assert_eq!(word_outs["q"][0], outs["q"]);
            assert_eq!(word_next["s"][0], next["s"]);
        }
    }

    #[test]
    fn lift_rejects_names_shared_between_kinds() {
        let aig = Aig::new(
            ["a".to_string()],
            vec![("a".to_string(), not(&input("a")))],
            vec![],
        )
        .unwrap();
        assert!(matches!(
            BvCircuit::lift(aig),
            Err(Error::DuplicateBit(bit)) if bit == "a"
        ));
    }

    #[test]
    fn new_rejects_incomplete_maps() {
        let aig = sample_aig();
        let inputs = WordMap::diagonal(["x"]);
        let outputs = WordMap::diagonal(["p", "q"]);
        let latches = WordMap::diagonal(["s"]);
        assert!(matches!(
            BvCircuit::new(aig, inputs, outputs, latches),
            Err(Error::UnmappedBit { kind: PortKind::Input, bit }) if bit == "y"
        ));
    }

    #[test]
    fn call_without_latches_uses_reset_values() {
        let circuit = BvCircuit::lift(sample_aig()).unwrap();
        let words = values(&[("x", bitvec![u8, Lsb0; 1]), ("y", bitvec![u8, Lsb0; 0])]);
        let (outs, next) = circuit.call(&words, None).unwrap();
        // s resets to 1
        assert!(!outs["p"][0]);
        assert!(outs["q"][0]);
        assert!(!next["s"][0]);
        assert_eq!(
            circuit.initial_latches().unwrap(),
            values(&[("s", bitvec![u8, Lsb0; 1])])
        );
    }

    #[test]
    fn relabel_inputs() {
        let circuit = add_gate(4, "a", "b", "out").unwrap();
        let renamed = circuit.relabel(PortKind::Input, [("a", "x")]).unwrap();
        assert_eq!(
            renamed.inputs(),
            BTreeSet::from(["b".to_string(), "x".to_string()])
        );
        let (outs, _) = renamed
            .call(&values(&[("x", word(4, 3)), ("b", word(4, 2))]), None)
            .unwrap();
        assert_eq!(decode_int(&outs["out"], true), 5);
    }

    #[test]
    fn relabel_collision_fails() {
        let circuit = add_gate(4, "a", "b", "out").unwrap();
        assert!(matches!(
            circuit.relabel(PortKind::Input, [("a", "b")]),
            Err(Error::DuplicateWord {
                kind: PortKind::Input,
                ..
            })
        ));
    }

    #[test]
    fn adder_end_to_end() {
        let circuit = add_gate(4, "a", "b", "out").unwrap();
        let (outs, latches) = circuit
            .call(&values(&[("a", word(4, 2)), ("b", word(4, -3))]), None)
            .unwrap();
        assert_eq!(decode_int(&outs["out"], true), -1);
        assert!(latches.is_empty());
    }

    #[test]
    fn seq_compose_wires_interface() {
        let first = add_gate(4, "a", "b", "tmp").unwrap();
        let second = bitwise_negate(4, "tmp", "out").unwrap();
        let composed = first.seq_compose(&second).unwrap();
        assert_eq!(
            composed.inputs(),
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
        assert_eq!(composed.outputs(), BTreeSet::from(["out".to_string()]));
        let (outs, _) = composed
            .call(&values(&[("a", word(4, 1)), ("b", word(4, 2))]), None)
            .unwrap();
        assert_eq!(decode_int(&outs["out"], true), !3);
    }

    #[test]
    fn seq_compose_keeps_non_interface_outputs() {
        let first = &identity_gate(2, "a", "x").unwrap() | &bitwise_negate(2, "b", "y").unwrap();
        let second = identity_gate(2, "x", "z").unwrap();
        let composed = &first >> &second;
        let expected: BTreeSet<String> = first
            .outputs()
            .difference(&BTreeSet::from(["x".to_string()]))
            .cloned()
            .chain(second.outputs())
            .collect();
        assert_eq!(composed.outputs(), expected);
    }

    #[test]
    fn seq_compose_width_mismatch() {
        let first = identity_gate(3, "a", "x").unwrap();
        let second = identity_gate(2, "x", "y").unwrap();
        assert!(matches!(
            first.seq_compose(&second),
            Err(Error::WidthMismatch {
                expected: 2,
                actual: 3,
                ..
            })
        ));
    }

    #[test]
    fn seq_compose_rejects_shadowing() {
        let first = identity_gate(2, "a", "out").unwrap();
        let second = identity_gate(2, "b", "out").unwrap();
        assert!(matches!(
            first.seq_compose(&second),
            Err(Error::OutputShadowing(words)) if words == ["out"]
        ));
    }

    #[test]
    fn seq_compose_rejects_shared_latches() {
        let toggle = BvCircuit::lift(sample_aig()).unwrap();
        let other = toggle
            .relabel(PortKind::Input, [("x", "x2"), ("y", "y2")])
            .unwrap()
            .relabel(PortKind::Output, [("p", "p2"), ("q", "q2")])
            .unwrap();
        assert!(matches!(
            toggle.seq_compose(&other),
            Err(Error::SharedLatches(words)) if words == ["s"]
        ));
    }

    #[test]
    #[should_panic(expected = "invalid sequential composition")]
    fn shr_panics_on_invalid_composition() {
        let first = identity_gate(3, "a", "x").unwrap();
        let second = identity_gate(2, "x", "y").unwrap();
        let _ = &first >> &second;
    }

    #[test]
    fn par_compose_unions_ports() {
        let left = add_gate(2, "a", "b", "sum").unwrap();
        let right = bitwise_negate(3, "c", "neg").unwrap();
        let both = left.par_compose(&right).unwrap();
        let inputs: BTreeSet<String> = left.inputs().union(&right.inputs()).cloned().collect();
        assert_eq!(both.inputs(), inputs);
        assert_eq!(
            both.signature(),
            right.par_compose(&left).unwrap().signature()
        );
        assert_eq!(
            both.aig().and_count(),
            left.aig().and_count() + right.aig().and_count()
        );
    }

    #[test]
    fn par_compose_with_relabeled_copy() {
        let gate = add_gate(2, "a", "b", "o").unwrap();
        let copy = gate
            .relabel(PortKind::Input, [("a", "c"), ("b", "d")])
            .unwrap()
            .relabel(PortKind::Output, [("o", "p")])
            .unwrap();
        let both = &gate | &copy;
        assert_eq!(both.signature(), (&copy | &gate).signature());
        assert_eq!(both.aig().and_count(), 2 * gate.aig().and_count());
        let inputs = values(&[
            ("a", word(2, 1)),
            ("b", word(2, 0)),
            ("c", word(2, 1)),
            ("d", word(2, -2)),
        ]);
        let (outs, _) = both.call(&inputs, None).unwrap();
        assert_eq!(decode_int(&outs["o"], true), 1);
        assert_eq!(decode_int(&outs["p"], true), -1);
    }

    #[test]
    fn seq_compose_without_interface_keeps_wires_apart() {
        let first = identity_gate(1, "a", "x").unwrap();
        let second = identity_gate(1, "x", "y")
            .unwrap()
            .relabel(PortKind::Input, [("x", "q")])
            .unwrap();
        let composed = first.seq_compose(&second).unwrap();
        assert_eq!(
            composed.inputs(),
            BTreeSet::from(["a".to_string(), "q".to_string()])
        );
        assert_eq!(
            composed.outputs(),
            BTreeSet::from(["x".to_string(), "y".to_string()])
        );
        let inputs = values(&[("a", bitvec![u8, Lsb0; 1]), ("q", bitvec![u8, Lsb0; 0])]);
        let (outs, _) = composed.call(&inputs, None).unwrap();
        assert!(outs["x"][0]);
        assert!(!outs["y"][0]);
    }

    #[test]
    fn seq_compose_shares_identical_input_words() {
        let first = identity_gate(2, "a", "x").unwrap();
        let second = bitwise_and(2, "a", "x", "y").unwrap();
        let composed = first.seq_compose(&second).unwrap();
        assert_eq!(composed.inputs(), BTreeSet::from(["a".to_string()]));
        let (outs, _) = composed.call(&values(&[("a", word(2, 1))]), None).unwrap();
        assert_eq!(decode_int(&outs["y"], true), 1);
    }

    #[test]
    fn par_compose_rejects_overlap() {
        let left = bitwise_negate(2, "a", "x").unwrap();
        let right = bitwise_negate(2, "a", "y").unwrap();
        assert!(matches!(
            left.par_compose(&right),
            Err(Error::Overlap {
                kind: PortKind::Input,
                ..
            })
        ));
    }

    #[test]
    fn signature_snapshot() {
        let add = add_gate(4, "a", "b", "tmp").unwrap();
        let mask = bitwise_and(4, "tmp", "mask", "out").unwrap();
        let circuit = &add >> &mask;
        let signature = circuit.signature();
        assert!(signature.latches.is_empty());
        assert_json_snapshot!(json!({
            "inputs": signature.inputs,
            "outputs": signature.outputs,
        }), @r###"
        {
          "inputs": {
            "a": 4,
            "b": 4,
            "mask": 4
          },
          "outputs": {
            "out": 4
          }
        }
        "###);
    }

    #[test]
    fn write_matches_fixture() {
        let circuit = bitwise_and(2, "a", "b", "out").unwrap();
        let path = std::env::temp_dir().join("bvcirc_circuit_write_test.aag");
        circuit.write(&path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        fs::remove_file(path).ok();
        let expected = fs::read_to_string(fixtures().join("and2.aag")).unwrap();
        assert_eq!(written, expected);
    }
}
