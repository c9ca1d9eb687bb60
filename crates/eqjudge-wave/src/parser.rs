//! Value-trace reconstruction from a value-change dump
//!
//! The dump only records changes. A dense trace is rebuilt with a
//! carry-forward protocol: every `#<time>` marker opens one new slot per
//! tracked wire holding the wire's previous value (or [`UNOBSERVED`]), and a
//! change record overwrites the newest slot of its wire. Each trace finally
//! drops its newest slot, since the values at the last marker have no settled
//! successor.

use crate::error::{Result, WaveError};
use crate::syntax::{decode_bits, walk_header, HeaderEvent, Sample, ScopeStack};
use indexmap::IndexMap;
use std::io::Read;
use std::path::Path;
use tracing::debug;
use vcd_ng::{FFValueChange, FastFlow, FastFlowToken, Parser, VarType};

/// Slot value for a wire that has not changed yet
pub const UNOBSERVED: Sample = Sample::Int(-1);

const FLOW_BUFFER: usize = 65536;

/// A declared waveform wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireDecl {
    /// Identifier code as written in the dump
    pub id: String,
    pub code: u64,
    pub width: u32,
    pub name: String,
    pub scope: Vec<String>,
}

/// Per-wire value sequences, indexed by identifier code and kept in lockstep
/// with the timestamp count.
#[derive(Debug, Clone, Default)]
pub struct ValueTable {
    slots: IndexMap<u64, Vec<Sample>>,
    ticks: usize,
}

impl ValueTable {
    /// Start tracking a wire, dropping anything recorded under its code before
    pub fn track(&mut self, code: u64) {
        self.slots.insert(code, Vec::new());
    }

    /// Open one slot per wire that is behind the new timestamp
    pub fn tick(&mut self) {
        self.ticks += 1;
        let ticks = self.ticks;
        for values in self.slots.values_mut() {
            if values.len() < ticks {
                let prev = values.last().cloned().unwrap_or(UNOBSERVED);
                values.push(prev);
            }
        }
    }

    /// Record a change on the newest slot. Unknown codes are ignored.
    pub fn change(&mut self, code: u64, value: Sample) {
        if let Some(values) = self.slots.get_mut(&code) {
            match values.last_mut() {
                Some(last) => *last = value,
                None => values.push(value),
            }
        }
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Full, untrimmed sequence of a wire
    pub fn sequence(&self, code: u64) -> Option<&[Sample]> {
        self.slots.get(&code).map(Vec::as_slice)
    }
}

/// A wire's reconstructed trace, with the last provisional slot dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireTrace {
    pub wire_id: String,
    pub scope_path: Vec<String>,
    pub declared_name: String,
    pub width: u32,
    pub values: Vec<Sample>,
}

impl WireTrace {
    pub fn innermost_scope(&self) -> Option<&str> {
        self.scope_path.last().map(String::as_str)
    }
}

/// A parsed waveform
#[derive(Debug, Clone, Default)]
pub struct Waveform {
    pub wires: Vec<WireDecl>,
    pub timestamps: Vec<u64>,
    pub values: ValueTable,
}

impl Waveform {
    /// First declared wire with the given name
    pub fn wire(&self, name: &str) -> Option<&WireDecl> {
        self.wires.iter().find(|w| w.name == name)
    }

    /// Traces for every declared wire, in declaration order
    pub fn traces(&self) -> Vec<WireTrace> {
        self.wires
            .iter()
            .map(|wire| {
                let mut values = self
                    .values
                    .sequence(wire.code)
                    .map(<[Sample]>::to_vec)
                    .unwrap_or_default();
                values.pop();
                WireTrace {
                    wire_id: wire.id.clone(),
                    scope_path: wire.scope.clone(),
                    declared_name: wire.name.clone(),
                    width: wire.width,
                    values,
                }
            })
            .collect()
    }
}

/// Wire declarations of a dump's header, in declaration order
pub(crate) fn read_wires(dump: &[u8]) -> Result<Vec<WireDecl>> {
    let header = Parser::new(dump)
        .parse_header()
        .map_err(|e| WaveError::parse("header", e.to_string()))?;

    let mut wires = Vec::new();
    walk_header(&header.items, &mut ScopeStack::default(), &mut |event, scopes| {
        if let HeaderEvent::Var(var) = event {
            if var.var_type == VarType::Wire {
                wires.push(WireDecl {
                    id: var.code.to_string(),
                    code: var.code.0,
                    width: var.size,
                    name: var.reference.to_string(),
                    scope: scopes.path().to_vec(),
                });
            }
        }
        Ok(())
    })?;
    Ok(wires)
}

/// Parse a complete dump held in memory
pub fn parse_vcd_bytes(dump: &[u8]) -> Result<Waveform> {
    let mut waveform = Waveform {
        wires: read_wires(dump)?,
        ..Default::default()
    };
    for wire in &waveform.wires {
        waveform.values.track(wire.code);
    }

    let mut flow = FastFlow::new(dump, FLOW_BUFFER);
    loop {
        let at = || match waveform.timestamps.last() {
            Some(t) => format!("#{}", t),
            None => "start of body".to_string(),
        };
        let token = flow.next_token().map_err(|e| WaveError::parse(at(), e.to_string()))?;
        match token {
            None => break,
            Some(FastFlowToken::Timestamp(time)) => {
                if let Some(&prev) = waveform.timestamps.last() {
                    if time < prev {
                        return Err(WaveError::parse(
                            at(),
                            format!("timestamp #{} goes back from #{}", time, prev),
                        ));
                    }
                }
                waveform.timestamps.push(time);
                waveform.values.tick();
            }
            Some(FastFlowToken::Value(FFValueChange { id, bits })) => {
                let value = decode_bits(&bits).ok_or_else(|| {
                    WaveError::parse(
                        at(),
                        format!("invalid binary value '{}'", String::from_utf8_lossy(&bits)),
                    )
                })?;
                waveform.values.change(id.0, value);
            }
        }
    }

    debug!(
        "Parsed waveform with {} wires over {} timestamps",
        waveform.wires.len(),
        waveform.timestamps.len()
    );
    Ok(waveform)
}

pub fn parse_vcd<R: Read>(mut reader: R) -> Result<Waveform> {
    let mut dump = Vec::new();
    reader.read_to_end(&mut dump)?;
    parse_vcd_bytes(&dump)
}

pub fn parse_vcd_str(text: &str) -> Result<Waveform> {
    parse_vcd_bytes(text.as_bytes())
}

pub fn parse_vcd_file(path: impl AsRef<Path>) -> Result<Waveform> {
    parse_vcd_bytes(&std::fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(body: &str) -> String {
        format!(
            "$timescale 1ns $end\n\
             $scope module miter $end\n\
             $scope module gold $end\n\
             $var wire 1 n1 a $end\n\
             $var wire 2 n2 y $end\n\
             $upscope $end\n\
             $upscope $end\n\
             $enddefinitions $end\n{}",
            body
        )
    }

    fn ints(values: &[i128]) -> Vec<Sample> {
        values.iter().copied().map(Sample::from).collect()
    }

    fn sequence(waveform: &Waveform, name: &str) -> Vec<Sample> {
        let code = waveform.wire(name).unwrap().code;
        waveform.values.sequence(code).unwrap().to_vec()
    }

    #[test]
    fn test_single_change_trimmed_to_one_entry() {
        let waveform = parse_vcd_str(&header("#0\nb1 n1\n#5\n")).unwrap();

        assert_eq!(waveform.timestamps, vec![0, 5]);
        assert_eq!(sequence(&waveform, "a"), ints(&[1, 1]));

        let traces = waveform.traces();
        let a = traces.iter().find(|t| t.declared_name == "a").unwrap();
        assert_eq!(a.values, ints(&[1]));
        assert_eq!(a.wire_id, "n1");
        assert_eq!(a.scope_path, vec!["miter".to_string(), "gold".to_string()]);
        assert_eq!(a.innermost_scope(), Some("gold"));
    }

    #[test]
    fn test_carry_forward_repeats_previous_value() {
        let waveform = parse_vcd_str(&header("#0\nb10 n2\n#1\n#2\nb01 n2\n#3\n")).unwrap();
        assert_eq!(sequence(&waveform, "y"), ints(&[2, 2, 1, 1]));

        let traces = waveform.traces();
        let y = traces.iter().find(|t| t.declared_name == "y").unwrap();
        assert_eq!(y.values, ints(&[2, 2, 1]));
        assert_eq!(y.width, 2);
    }

    #[test]
    fn test_scalar_changes() {
        let waveform = parse_vcd_str(&header("#0\n1n1\n#1\n0n1\n#2\n")).unwrap();
        assert_eq!(sequence(&waveform, "a"), ints(&[1, 0, 0]));
    }

    #[test]
    fn test_unobserved_wire_uses_sentinel() {
        let waveform = parse_vcd_str(&header("#0\nb1 n1\n#1\n#2\n")).unwrap();
        assert_eq!(sequence(&waveform, "y"), vec![UNOBSERVED; 3]);
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let waveform = parse_vcd_str(&header("#0\nb1 n99\n#1\n")).unwrap();
        assert_eq!(waveform.wires.len(), 2);
        assert_eq!(waveform.values.ticks(), 2);
    }

    #[test]
    fn test_non_wire_vars_are_not_traced() {
        let vcd = "\
$scope module miter $end
$var integer 32 t smt_step $end
$var wire 1 n0 okay $end
$upscope $end
$enddefinitions $end
#0
b0 t
b1 n0
#1
";
        let waveform = parse_vcd_str(vcd).unwrap();
        assert_eq!(waveform.wires.len(), 1);
        assert_eq!(waveform.wires[0].name, "okay");
    }

    #[test]
    fn test_wide_wire() {
        let zeros = "0".repeat(128);
        let top = format!("1{}", "0".repeat(128));
        let vcd = format!(
            "$scope module gold $end\n\
             $var wire 128 n1 a $end\n\
             $var wire 129 n2 s $end\n\
             $upscope $end\n\
             $enddefinitions $end\n\
             #0\nb{} n1\nb{} n2\n#1\n",
            zeros, top
        );

        let waveform = parse_vcd_str(&vcd).unwrap();
        let traces = waveform.traces();
        assert_eq!(traces[0].values, ints(&[0]));
        assert_eq!(
            traces[1].values,
            vec![Sample::Wide("340282366920938463463374607431768211456".to_string())]
        );
    }

    #[test]
    fn test_decreasing_timestamp_rejected() {
        let err = parse_vcd_str(&header("#5\n#3\n")).unwrap_err();
        assert!(matches!(err, WaveError::Parse { .. }));
    }

    #[test]
    fn test_non_binary_value_rejected() {
        let err = parse_vcd_str(&header("#0\nbx n1\n")).unwrap_err();
        assert!(matches!(err, WaveError::Parse { .. }));
    }
}
