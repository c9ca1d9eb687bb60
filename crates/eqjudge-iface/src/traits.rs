//! Circuit traits derived from an interface

use crate::error::{IfaceError, Result};
use crate::interface::Interface;
use serde::Serialize;
use std::collections::BTreeSet;

pub const CLK_PORT_NAME: &str = "clk";
pub const RST_PORT_NAME: &str = "rst";
pub const DONTCARE_PORT_NAME: &str = "_DontCare";
pub const DONTCARE_PREFIX: &str = "_DontCare_";

/// Read-only facts about a circuit interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CircuitTraits {
    /// Single-bit `clk` and `rst` inputs are both present
    pub sequential: bool,
    /// A single-bit `_DontCare` output is present
    pub dont_care: bool,
    /// Outputs that carry a per-signal `_DontCare_<name>` companion
    pub dont_cares: BTreeSet<String>,
}

/// Gathers the traits of a circuit from its interface, failing on the first
/// port that breaks a rule.
pub fn detect_circuit_traits(iface: &Interface) -> Result<CircuitTraits> {
    let mut traits = CircuitTraits::default();

    match (iface.get(CLK_PORT_NAME), iface.get(RST_PORT_NAME)) {
        (None, None) => {}
        (Some(_), None) => {
            return Err(IfaceError::invariant(
                CLK_PORT_NAME,
                "sequential circuits need both clk and rst",
            ))
        }
        (None, Some(_)) => {
            return Err(IfaceError::invariant(
                RST_PORT_NAME,
                "sequential circuits need both clk and rst",
            ))
        }
        (Some(clk), Some(rst)) => {
            for port in [clk, rst] {
                if !port.is_input() {
                    return Err(IfaceError::invariant(&port.name, "must be an input port"));
                }
                if port.width != 1 {
                    return Err(IfaceError::invariant(&port.name, "must not be a bus"));
                }
            }
            traits.sequential = true;
        }
    }

    if let Some(port) = iface.get(DONTCARE_PORT_NAME) {
        if !port.is_output() {
            return Err(IfaceError::invariant(&port.name, "must be an output port"));
        }
        if port.width != 1 {
            return Err(IfaceError::invariant(&port.name, "must not be a bus"));
        }
        traits.dont_care = true;
    }

    for port in iface.ports() {
        let Some(target) = port.name.strip_prefix(DONTCARE_PREFIX) else {
            continue;
        };
        if !port.is_output() {
            return Err(IfaceError::invariant(&port.name, "must be an output port"));
        }
        if port.width != 1 {
            return Err(IfaceError::invariant(&port.name, "must not be a bus"));
        }
        match iface.get(target) {
            None => {
                return Err(IfaceError::invariant(
                    &port.name,
                    format!("don't-care target '{}' does not exist", target),
                ))
            }
            Some(t) if !t.is_output() => {
                return Err(IfaceError::invariant(
                    &port.name,
                    format!("don't-care target '{}' must be an output port", target),
                ))
            }
            Some(_) => {
                traits.dont_cares.insert(target.to_string());
            }
        }
    }

    Ok(traits)
}
