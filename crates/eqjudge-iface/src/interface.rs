//! Circuit interfaces and the canonical `.iface` file format
//!
//! An `.iface` file is a `module <name>;` header followed by one line per
//! port, inputs first and then outputs, each block sorted by port name:
//!
//! ```text
//! module adder;
//! 	input [4] a;
//! 	input [4] b;
//! 	output [5] s;
//! ```
//!
//! Reference and submission interfaces are compared byte for byte in this
//! form, so the layout must never change.

use crate::error::{IfaceError, Result};
use crate::port::{Direction, Port};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Marks a don't-care helper net anywhere in its name
pub const DONTCARE_HELPER_MARK: &str = "_DontCare";

/// A circuit's external interface
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    ports: IndexMap<String, Port>,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ports: IndexMap::new(),
        }
    }

    /// Build an interface from declared `(name, direction, width)` tuples.
    ///
    /// Don't-care helper nets emitted by the synthesizer are skipped.
    pub fn from_declarations<I, S>(name: impl Into<String>, ports: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Direction, u32)>,
        S: Into<String>,
    {
        let mut iface = Interface::new(name);
        for (port_name, direction, width) in ports {
            let port_name = port_name.into();
            if port_name.contains(DONTCARE_HELPER_MARK) {
                continue;
            }
            iface.add_port(port_name, direction, width)?;
        }
        Ok(iface)
    }

    pub fn add_port(&mut self, name: impl Into<String>, direction: Direction, width: u32) -> Result<()> {
        let name = name.into();
        if width == 0 {
            return Err(IfaceError::ZeroWidth {
                module: self.name.clone(),
                port: name,
            });
        }
        if self.ports.contains_key(&name) {
            return Err(IfaceError::DuplicatePort {
                module: self.name.clone(),
                port: name,
            });
        }
        self.ports.insert(name.clone(), Port::new(name, direction, width));
        Ok(())
    }

    pub fn remove_port(&mut self, name: &str) -> Option<Port> {
        self.ports.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Port> {
        self.ports.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ports.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// All ports in declaration order
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    /// Input ports in declaration order
    pub fn inputs(&self) -> impl Iterator<Item = &Port> {
        self.ports.values().filter(|p| p.is_input())
    }

    /// Output ports in declaration order
    pub fn outputs(&self) -> impl Iterator<Item = &Port> {
        self.ports.values().filter(|p| p.is_output())
    }

    pub fn input_names(&self) -> Vec<&str> {
        self.inputs().map(|p| p.name.as_str()).collect()
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.outputs().map(|p| p.name.as_str()).collect()
    }

    fn sorted(&self, direction: Direction) -> Vec<&Port> {
        let mut ports: Vec<&Port> = self
            .ports
            .values()
            .filter(|p| p.direction == direction)
            .collect();
        ports.sort_by(|a, b| a.name.cmp(&b.name));
        ports
    }

    /// True when both interfaces declare the same set of
    /// (name, direction, width) ports, regardless of order.
    pub fn same_ports(&self, other: &Interface) -> bool {
        fn key(iface: &Interface) -> BTreeMap<&str, (Direction, u32)> {
            iface
                .ports
                .values()
                .map(|p| (p.name.as_str(), (p.direction, p.width)))
                .collect()
        }
        key(self) == key(other)
    }

    /// Canonical `.iface` text
    pub fn to_iface_string(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "module {};", self.name);
        for port in self
            .sorted(Direction::Input)
            .into_iter()
            .chain(self.sorted(Direction::Output))
        {
            let _ = writeln!(out, "{}", port.iface_line());
        }
        out
    }

    pub fn write_iface(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_iface_string())?;
        Ok(())
    }

    /// Parse the canonical `.iface` text produced by [`Interface::to_iface_string`]
    pub fn parse_iface(text: &str) -> Result<Self> {
        let mut iface: Option<Interface> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let body = line.strip_suffix(';').ok_or_else(|| IfaceError::Parse {
                line: line_no,
                reason: format!("missing ';' in '{}'", line),
            })?;

            if let Some(name) = body.strip_prefix("module ") {
                if iface.is_some() {
                    return Err(IfaceError::Parse {
                        line: line_no,
                        reason: "more than one module header".to_string(),
                    });
                }
                iface = Some(Interface::new(name.trim()));
                continue;
            }

            let current = iface.as_mut().ok_or_else(|| IfaceError::Parse {
                line: line_no,
                reason: "port declared before the module header".to_string(),
            })?;
            let (direction, width, name) = parse_port_line(body).map_err(|reason| IfaceError::Parse {
                line: line_no,
                reason,
            })?;
            current.add_port(name, direction, width)?;
        }

        iface.ok_or_else(|| IfaceError::Parse {
            line: 0,
            reason: "missing module header".to_string(),
        })
    }

    pub fn read_iface(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse_iface(&text)
    }
}

fn parse_port_line(body: &str) -> std::result::Result<(Direction, u32, &str), String> {
    let mut fields = body.split_whitespace();
    let (Some(dir), Some(width), Some(name), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(format!("expected '<direction> [<width>] <name>', got '{}'", body));
    };

    let direction = dir.parse::<Direction>()?;
    let width = width
        .strip_prefix('[')
        .and_then(|w| w.strip_suffix(']'))
        .and_then(|w| w.parse::<u32>().ok())
        .ok_or_else(|| format!("invalid width '{}'", width))?;
    Ok((direction, width, name))
}
