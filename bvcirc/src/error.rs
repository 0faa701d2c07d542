//! Error types for the word-level circuit layer.

use thiserror::Error;

use crate::aig::AigError;
use crate::port::PortKind;

/// Result type alias for word-level circuit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building, combining or evaluating bit-vector circuits.
#[derive(Debug, Error)]
pub enum Error {
    /// A word-port map names a word the value assignment does not carry.
    #[error("no value supplied for word `{0}`")]
    MissingWord(String),

    /// A bit-level assignment lacks a bit named by a word-port map.
    #[error("no value supplied for bit `{0}`")]
    MissingBit(String),

    /// A word value or a connected port has the wrong number of bits.
    #[error("word `{word}` has width {expected}, got {actual}")]
    WidthMismatch {
        word: String,
        expected: usize,
        actual: usize,
    },

    /// Port kind tag outside of input, output and latch.
    #[error("unsupported port kind `{0}`")]
    UnsupportedKind(String),

    /// Two words of the same map share a name.
    #[error("{kind} word `{word}` is defined more than once")]
    DuplicateWord { kind: PortKind, word: String },

    /// A bit name is bound to more than one word of a circuit.
    #[error("bit `{0}` is bound to more than one word")]
    DuplicateBit(String),

    /// A word was declared without any bits.
    #[error("{kind} word `{word}` has no bits")]
    EmptyWord { kind: PortKind, word: String },

    /// The same word name is bound to different bits on the two sides of a union.
    #[error("{kind} word `{word}` is bound to different bits on each side")]
    ConflictingWord { kind: PortKind, word: String },

    /// A map bit is missing from the substrate, or a substrate wire is missing from the map.
    #[error("{kind} bit `{bit}` is not shared by the word map and the circuit")]
    UnmappedBit { kind: PortKind, bit: String },

    /// An operation referenced a word the circuit does not have.
    #[error("unknown {kind} word `{word}`")]
    UnknownWord { kind: PortKind, word: String },

    /// Sequential composition of circuits that both declare these latch words.
    #[error("circuits share latch words {0:?}")]
    SharedLatches(Vec<String>),

    /// Sequential composition would hide these upstream outputs behind downstream ones.
    #[error("outputs {0:?} would be shadowed by the downstream circuit")]
    OutputShadowing(Vec<String>),

    /// Parallel composition of circuits with overlapping ports.
    #[error("{kind} words {words:?} appear on both sides of a parallel composition")]
    Overlap { kind: PortKind, words: Vec<String> },

    #[error(
        "feedback expects one output and one latch per input, got {inputs} inputs, \
         {outputs} outputs and {latches} latches"
    )]
    FeedbackArity {
        inputs: usize,
        outputs: usize,
        latches: usize,
    },

    /// An integer does not fit in the requested word length.
    #[error("value {value} does not fit in {wordlen} bits")]
    ValueOutOfRange { value: i64, wordlen: usize },

    #[error(transparent)]
    Substrate(#[from] AigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
