//! Circuit ports
//!
//! A port is identified by its name. Names that collide with keywords of the
//! downstream model checker get an alternate on-disk identifier, see
//! [`Port::id`].

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Identifiers reserved by the NuSMV input language
pub const NUSMV_KEYWORDS: &[&str] = &[
    "MODULE", "DEFINE", "MDEFINE", "CONSTANTS", "VAR", "IVAR", "FROZENVAR", "INIT", "TRANS",
    "INVAR", "SPEC", "CTLSPEC", "LTLSPEC", "PSLSPEC", "COMPUTE", "NAME", "INVARSPEC", "FAIRNESS",
    "JUSTICE", "COMPASSION", "ISA", "ASSIGN", "CONSTRAINT", "SIMPWFF", "CTLWFF", "LTLWFF",
    "PSLWFF", "COMPWFF", "IN", "MIN", "MAX", "MIRROR", "PRED", "PREDICATES", "process", "array",
    "of", "boolean", "integer", "real", "word", "word1", "bool", "EX", "AX", "EF", "AF", "EG",
    "AG", "E", "F", "O", "G", "H", "X", "Y", "Z", "A", "U", "S", "V", "T", "BU", "EBF", "ABF",
    "EBG", "ABG", "case", "esac", "mod", "next", "init", "union", "in", "xor", "xnor", "self",
    "TRUE", "FALSE", "count",
];

/// Marker appended to names that collide with a keyword
pub const MANGLE_MARKER: char = '#';

/// Returns the on-disk identifier for a port name
pub fn mangle_id(name: &str) -> Cow<'_, str> {
    if NUSMV_KEYWORDS.contains(&name) {
        Cow::Owned(format!("{}{}", name, MANGLE_MARKER))
    } else {
        Cow::Borrowed(name)
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" => Ok(Direction::Input),
            "output" => Ok(Direction::Output),
            other => Err(format!("unknown port direction '{}'", other)),
        }
    }
}

/// A circuit's external port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub direction: Direction,
    pub width: u32,
}

impl Port {
    pub fn new(name: impl Into<String>, direction: Direction, width: u32) -> Self {
        Self {
            name: name.into(),
            direction,
            width,
        }
    }

    /// Identifier used when the port is written for the model checker
    pub fn id(&self) -> Cow<'_, str> {
        mangle_id(&self.name)
    }

    pub fn is_input(&self) -> bool {
        self.direction == Direction::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == Direction::Output
    }

    /// Canonical `.iface` line, without the trailing newline
    pub fn iface_line(&self) -> String {
        format!("\t{} [{}] {};", self.direction, self.width, self.name)
    }
}
