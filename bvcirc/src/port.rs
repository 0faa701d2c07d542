use std::convert::TryFrom;
use std::str::FromStr;

use serde::Serialize;

use crate::error::Error;

/// The three kinds of named ports a circuit exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    Input,
    Output,
    Latch,
}

impl PortKind {
    pub const ALL: [PortKind; 3] = [PortKind::Input, PortKind::Output, PortKind::Latch];

    pub fn as_str(self) -> &'static str {
        match self {
            PortKind::Input => "input",
            PortKind::Output => "output",
            PortKind::Latch => "latch",
        }
    }
}

impl TryFrom<char> for PortKind {
    type Error = Error;
    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            'i' => Ok(PortKind::Input),
            'o' => Ok(PortKind::Output),
            'l' => Ok(PortKind::Latch),
            _ => Err(Error::UnsupportedKind(value.to_string())),
        }
    }
}

impl FromStr for PortKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "i" | "input" => Ok(PortKind::Input),
            "o" | "output" => Ok(PortKind::Output),
            "l" | "latch" => Ok(PortKind::Latch),
            _ => Err(Error::UnsupportedKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for PortKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
