//! Expansion of sequential circuits into latch-free circuits over a fixed
//! number of steps.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::aig::Origin;
use crate::circuit::BvCircuit;
use crate::error::{Error, Result};
use crate::port::PortKind;
use crate::word_map::WordMap;

/// Options for [`BvCircuit::unroll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnrollConfig {
    /// Number of steps to expand.
    pub horizon: usize,
    /// Start from the reset values. When false the step 0 latch values
    /// become input words named after the latches.
    pub init: bool,
    /// Drop the final latch values. When false they become output words
    /// named after the latches.
    pub omit_latches: bool,
}

impl Default for UnrollConfig {
    fn default() -> Self {
        Self {
            horizon: 1,
            init: true,
            omit_latches: true,
        }
    }
}

impl UnrollConfig {
    pub fn new(horizon: usize) -> Self {
        Self {
            horizon,
            ..Self::default()
        }
    }
}

type BitIndex<'a> = HashMap<&'a str, (&'a str, usize)>;

impl BvCircuit {
    /// Expand `config.horizon` steps into a circuit without latches.
    ///
    /// Every word keeps its name. Its bits are laid out step by step, so a
    /// word of width `k` becomes `horizon * k` bits wide and step `t` occupies
    /// bits `t * k .. (t + 1) * k`.
    pub fn unroll(&self, config: &UnrollConfig) -> Result<BvCircuit> {
        let aig = self.aig();
        let unrolled = aig.unroll(config.horizon, config.init, config.omit_latches)?;

        let indexes: BTreeMap<PortKind, BitIndex<'_>> = PortKind::ALL
            .into_iter()
            .map(|kind| (kind, self.map(kind).bit_index()))
            .collect();
        let input_map = regroup(PortKind::Input, &unrolled.input_origins, &indexes)?;
        let output_map = regroup(PortKind::Output, &unrolled.output_origins, &indexes)?;

        debug!(
            horizon = config.horizon,
            init = config.init,
            omit_latches = config.omit_latches,
            inputs = input_map.len(),
            outputs = output_map.len(),
            "unroll"
        );
        BvCircuit::new(unrolled.aig, input_map, output_map, WordMap::new())
    }
}

/// Group exploded wires back into words, ordered by step then bit position.
fn regroup(
    kind: PortKind,
    origins: &BTreeMap<String, Origin>,
    indexes: &BTreeMap<PortKind, BitIndex<'_>>,
) -> Result<WordMap> {
    let mut words: BTreeMap<(PortKind, &str), Vec<(usize, usize, &String)>> = BTreeMap::new();
    for (timed, origin) in origins {
        let (word, pos) = indexes
            .get(&origin.kind)
            .and_then(|index| index.get(origin.name.as_str()))
            .copied()
            .ok_or_else(|| Error::UnmappedBit {
                kind: origin.kind,
                bit: origin.name.clone(),
            })?;
        words
            .entry((origin.kind, word))
            .or_default()
            .push((origin.step, pos, timed));
    }
    WordMap::from_words(
        kind,
        words.into_iter().map(|((_, word), mut bits)| {
            bits.sort_unstable();
            (word, bits.into_iter().map(|(_, _, timed)| timed.clone()))
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Values;
    use crate::feedback::FeedbackConfig;
    use crate::gates::{add_gate, bitwise_negate, bitwise_xor, decode_int, source};
    use bitvec::prelude::*;
    use insta::assert_json_snapshot;

    /// `y = !x`, `x` fed back from `y`.
    fn toggle() -> BvCircuit {
        bitwise_negate(1, "x", "y")
            .unwrap()
            .feedback(&FeedbackConfig::new(["x"], ["y"]).keep_outputs(true))
            .unwrap()
    }

    #[test]
    fn toggle_over_three_steps() {
        let unrolled = toggle().unroll(&UnrollConfig::new(3)).unwrap();
        assert!(unrolled.latches().is_empty());
        assert!(unrolled.inputs().is_empty());
        let (outs, latches) = unrolled.call(&Values::new(), None).unwrap();
        assert_eq!(outs["y"], bitvec![u8, Lsb0; 1, 0, 1]);
        assert!(latches.is_empty());
    }

    #[test]
    fn unrolled_bits_are_time_major() {
        let unrolled = toggle().unroll(&UnrollConfig::new(3)).unwrap();
        assert_json_snapshot!(unrolled.output_map(), @r###"
        {
          "y": [
            "y[0]##time_0",
            "y[0]##time_1",
            "y[0]##time_2"
          ]
        }
        "###);
    }

    #[test]
    fn inputs_are_read_per_step() {
        // y = x ^ en, x <- y
        let circuit = bitwise_xor(1, "x", "en", "y")
            .unwrap()
            .feedback(&FeedbackConfig::new(["x"], ["y"]).keep_outputs(true))
            .unwrap();
        let unrolled = circuit.unroll(&UnrollConfig::new(3)).unwrap();
        assert_eq!(unrolled.input_map().width("en"), Some(3));
        let inputs = Values::from([("en".to_string(), bitvec![u8, Lsb0; 1, 0, 1])]);
        let (outs, _) = unrolled.call(&inputs, None).unwrap();
        assert_eq!(outs["y"], bitvec![u8, Lsb0; 1, 1, 0]);
    }

    #[test]
    fn counter_steps_are_consecutive_slices() {
        let one = source(2, 1, "one", false).unwrap();
        let add = add_gate(2, "x", "one", "y").unwrap();
        let counter = (&one >> &add)
            .feedback(&FeedbackConfig::new(["x"], ["y"]).keep_outputs(true))
            .unwrap();
        let unrolled = counter.unroll(&UnrollConfig::new(3)).unwrap();
        assert!(unrolled.latches().is_empty());
        assert_eq!(unrolled.output_map().width("y"), Some(6));
        let (outs, _) = unrolled.call(&Values::new(), None).unwrap();
        let steps: Vec<i64> = outs["y"]
            .chunks(2)
            .map(|step| decode_int(step, false))
            .collect();
        assert_eq!(steps, [1, 2, 3]);
    }

    #[test]
    fn exposes_initial_and_final_latches() {
        let config = UnrollConfig {
            horizon: 3,
            init: false,
            omit_latches: false,
        };
        let unrolled = toggle().unroll(&config).unwrap();
        assert_eq!(unrolled.input_map().width("x"), Some(1));
        assert_eq!(unrolled.output_map().width("x"), Some(1));
        let inputs = Values::from([("x".to_string(), bitvec![u8, Lsb0; 1])]);
        let (outs, _) = unrolled.call(&inputs, None).unwrap();
        assert_eq!(outs["y"], bitvec![u8, Lsb0; 0, 1, 0]);
        assert_eq!(outs["x"], bitvec![u8, Lsb0; 0]);
    }

    #[test]
    fn latch_word_clashing_with_input_word() {
        let circuit = bitwise_xor(1, "a", "en", "y")
            .unwrap()
            .feedback(
                &FeedbackConfig::new(["a"], ["y"])
                    .latches(["s"])
                    .keep_outputs(true),
            )
            .unwrap()
            .relabel(PortKind::Latch, [("s", "en")])
            .unwrap();
        let config = UnrollConfig {
            init: false,
            ..UnrollConfig::new(2)
        };
        assert!(matches!(
            circuit.unroll(&config),
            Err(Error::DuplicateWord { kind: PortKind::Input, word }) if word == "en"
        ));
    }

    #[test]
    fn zero_horizon_keeps_only_latch_words() {
        let config = UnrollConfig {
            horizon: 0,
            init: true,
            omit_latches: false,
        };
        let unrolled = toggle().unroll(&config).unwrap();
        assert!(unrolled.inputs().is_empty());
        assert_eq!(
            unrolled.outputs(),
            std::collections::BTreeSet::from(["x".to_string()])
        );
        let (outs, _) = unrolled.call(&Values::new(), None).unwrap();
        assert_eq!(outs["x"], bitvec![u8, Lsb0; 0]);
    }
}
