pub mod aag;
pub mod aig;
pub mod circuit;
pub mod codec;
pub mod error;
pub mod feedback;
pub mod gates;
pub mod port;
pub mod sim;
pub mod unroll;
pub mod word_map;

pub use aig::{Aig, AigError, BitValues, LatchDef, Signal};
pub use circuit::{BvCircuit, Signature};
pub use codec::{blast, unblast, Values, Word};
pub use error::{Error, Result};
pub use feedback::FeedbackConfig;
pub use gates::{
    add_gate, bitwise_and, bitwise_negate, bitwise_or, bitwise_xor, combine_gate, decode_int,
    encode_int, eq_gate, identity_gate, is_nonzero_gate, is_zero_gate, neq_gate, reverse_gate,
    sink, source, split_gate,
};
pub use port::PortKind;
pub use sim::Simulator;
pub use unroll::UnrollConfig;
pub use word_map::{indexed_bits, Bits, WordMap};
