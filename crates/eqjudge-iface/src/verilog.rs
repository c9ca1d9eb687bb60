//! Port-list scanner for synthesized Verilog netlists
//!
//! This is a line scanner, not a Verilog parser: it recognises the
//! `module NAME (` headers and the one-declaration-per-line `input`/`output`
//! statements that the synthesizer writes.

use crate::error::{IfaceError, Result};
use crate::interface::{Interface, DONTCARE_HELPER_MARK};
use crate::port::Direction;
use indexmap::IndexMap;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Header the synthesizer prints before the module hierarchy
pub const DESIGN_HIERARCHY_MARKER: &str = "=== design hierarchy ===";

fn module_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^module\s+([a-zA-Z_][a-zA-Z_0-9]*)\s*\(").expect("valid module regex")
    })
}

fn port_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(input|output)\s*(\[\s*(\d+)\s*:\s*(\d+)\s*\])?\s*([a-zA-Z_][a-zA-Z_0-9]*)\s*;",
        )
        .expect("valid port regex")
    })
}

/// Scan a netlist and return every module interface, in declaration order
pub fn parse_verilog(text: &str) -> Result<IndexMap<String, Interface>> {
    let mut modules: IndexMap<String, Interface> = IndexMap::new();
    let mut current: Option<String> = None;

    for (idx, line) in text.lines().enumerate() {
        if let Some(caps) = module_regex().captures(line) {
            let name = caps[1].to_string();
            modules
                .entry(name.clone())
                .or_insert_with(|| Interface::new(name.clone()));
            current = Some(name);
        }

        let Some(caps) = port_regex().captures(line) else {
            continue;
        };
        let port_name = &caps[5];
        if port_name.contains(DONTCARE_HELPER_MARK) {
            continue;
        }

        let module = current.as_ref().ok_or_else(|| IfaceError::Parse {
            line: idx + 1,
            reason: format!("port '{}' declared outside a module", port_name),
        })?;
        let direction = match &caps[1] {
            "input" => Direction::Input,
            _ => Direction::Output,
        };
        let width = match (caps.get(3), caps.get(4)) {
            (Some(msb), Some(lsb)) => {
                let msb: u32 = parse_bound(msb.as_str(), idx + 1)?;
                let lsb: u32 = parse_bound(lsb.as_str(), idx + 1)?;
                msb.abs_diff(lsb) + 1
            }
            _ => 1,
        };

        if let Some(iface) = modules.get_mut(module) {
            iface.add_port(port_name, direction, width)?;
        }
    }

    Ok(modules)
}

fn parse_bound(text: &str, line: usize) -> Result<u32> {
    text.parse().map_err(|_| IfaceError::Parse {
        line,
        reason: format!("bit index '{}' out of range", text),
    })
}

pub fn parse_verilog_file(path: impl AsRef<Path>) -> Result<IndexMap<String, Interface>> {
    let text = std::fs::read_to_string(path)?;
    parse_verilog(&text)
}

/// Identify the top module of a design.
///
/// Uses the first entry of the synthesizer's design hierarchy when the log
/// has one, otherwise the first module declared in the netlist.
pub fn parse_top_module(synth_log: &str, verilog: &str) -> Option<String> {
    if let Some(start) = synth_log.find(DESIGN_HIERARCHY_MARKER) {
        let hierarchy = &synth_log[start + DESIGN_HIERARCHY_MARKER.len()..];
        if let Some(name) = hierarchy
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .and_then(|l| l.split_whitespace().next())
        {
            return Some(name.to_string());
        }
    }

    verilog
        .lines()
        .find_map(|line| module_regex().captures(line).map(|c| c[1].to_string()))
}
