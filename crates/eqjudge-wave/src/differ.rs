//! Gold/gate trace comparison
//!
//! Binds the wires declared directly inside the `gold` and `gate` scopes to
//! the submission's interface signals and reports which outputs disagree.

use crate::clean::{GATE_SCOPE, GOLD_SCOPE};
use crate::error::{Result, WaveError};
use crate::parser::WireTrace;
use crate::report::{CircuitKind, Counterexample, SignalValues};
use crate::syntax::Sample;
use eqjudge_iface::traits::CLK_PORT_NAME;
use eqjudge_iface::{Direction, Interface};
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::debug;

/// Which side of the miter a bound output belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Input,
    OutputGold,
    OutputGate,
}

/// Wire traces bound to interface signal names
#[derive(Debug, Default)]
pub struct SignalBindings<'a> {
    pub input: IndexMap<String, &'a [Sample]>,
    pub output_gold: IndexMap<String, &'a [Sample]>,
    pub output_gate: IndexMap<String, &'a [Sample]>,
}

impl<'a> SignalBindings<'a> {
    /// Bind traces against an interface. A wire in any other scope, or one
    /// whose name is not an interface signal, is ignored.
    pub fn bind(traces: &'a [WireTrace], iface: &Interface) -> Result<Self> {
        let mut bindings = SignalBindings::default();
        let mut seen: HashSet<(&[String], &str)> = HashSet::new();

        for trace in traces {
            let gold = match trace.innermost_scope() {
                Some(GOLD_SCOPE) => true,
                Some(GATE_SCOPE) => false,
                _ => continue,
            };
            let name = trace.declared_name.as_str();
            let binding = match iface.get(name).map(|p| p.direction) {
                Some(Direction::Input) => Binding::Input,
                Some(Direction::Output) if gold => Binding::OutputGold,
                Some(Direction::Output) => Binding::OutputGate,
                None => continue,
            };

            if !seen.insert((trace.scope_path.as_slice(), name)) {
                return Err(WaveError::AmbiguousBinding {
                    scope: trace.scope_path.join("."),
                    name: name.to_string(),
                });
            }

            let target = match binding {
                Binding::Input => &mut bindings.input,
                Binding::OutputGold => &mut bindings.output_gold,
                Binding::OutputGate => &mut bindings.output_gate,
            };
            target.insert(name.to_string(), trace.values.as_slice());
        }

        Ok(bindings)
    }

    pub fn kind(&self) -> CircuitKind {
        if self.input.contains_key(CLK_PORT_NAME) {
            CircuitKind::Sequential
        } else {
            CircuitKind::Combinational
        }
    }
}

fn collapse(
    signals: &IndexMap<String, &[Sample]>,
    kind: CircuitKind,
) -> Result<IndexMap<String, SignalValues>> {
    signals
        .iter()
        .map(|(name, values)| {
            let collapsed = match kind {
                CircuitKind::Sequential => SignalValues::Sequence(values.to_vec()),
                CircuitKind::Combinational => SignalValues::Scalar(
                    values
                        .first()
                        .cloned()
                        .ok_or_else(|| WaveError::EmptyTrace(name.clone()))?,
                ),
            };
            Ok((name.clone(), collapsed))
        })
        .collect()
}

/// Build the counterexample for a failed equivalence proof
pub fn diff_traces(traces: &[WireTrace], iface: &Interface) -> Result<Counterexample> {
    let bindings = SignalBindings::bind(traces, iface)?;
    let kind = bindings.kind();

    let input = collapse(&bindings.input, kind)?;
    let expected = collapse(&bindings.output_gold, kind)?;
    let output = collapse(&bindings.output_gate, kind)?;

    let errors: Vec<String> = expected
        .iter()
        .filter(|(name, gold)| output.get(*name) != Some(*gold))
        .map(|(name, _)| name.clone())
        .collect();

    debug!(
        "Counterexample: {} inputs, {} outputs, {} mismatching",
        input.len(),
        expected.len(),
        errors.len()
    );

    Ok(Counterexample {
        kind,
        input,
        output,
        expected,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_vcd_str;

    fn iface(ports: &[(&str, Direction, u32)]) -> Interface {
        Interface::from_declarations("top", ports.iter().copied()).unwrap()
    }

    fn trace(scope: &[&str], name: &str, values: &[i128]) -> WireTrace {
        WireTrace {
            wire_id: format!("n_{}_{}", scope.join("_"), name),
            scope_path: scope.iter().map(|s| s.to_string()).collect(),
            declared_name: name.to_string(),
            width: 1,
            values: values.iter().copied().map(Sample::from).collect(),
        }
    }

    fn scalar(value: i128) -> SignalValues {
        SignalValues::Scalar(Sample::Int(value))
    }

    fn sequence(values: &[i128]) -> SignalValues {
        SignalValues::Sequence(values.iter().copied().map(Sample::from).collect())
    }

    #[test]
    fn test_combinational_collapse_and_errors() {
        let iface = iface(&[
            ("a", Direction::Input, 1),
            ("x", Direction::Output, 1),
            ("y", Direction::Output, 1),
        ]);
        let traces = vec![
            trace(&["miter", "gold"], "a", &[1]),
            trace(&["miter", "gold"], "x", &[0]),
            trace(&["miter", "gold"], "y", &[1]),
            trace(&["miter", "gate"], "a", &[1]),
            trace(&["miter", "gate"], "x", &[0]),
            trace(&["miter", "gate"], "y", &[0]),
            trace(&["miter"], "okay", &[0]),
        ];

        let cex = diff_traces(&traces, &iface).unwrap();
        assert_eq!(cex.kind, CircuitKind::Combinational);
        assert_eq!(cex.input["a"], scalar(1));
        assert_eq!(cex.expected["y"], scalar(1));
        assert_eq!(cex.output["y"], scalar(0));
        assert_eq!(cex.errors, vec!["y".to_string()]);
    }

    #[test]
    fn test_sequential_keeps_sequences() {
        let iface = iface(&[
            ("clk", Direction::Input, 1),
            ("rst", Direction::Input, 1),
            ("q", Direction::Output, 2),
        ]);
        let traces = vec![
            trace(&["gold"], "clk", &[0, 1, 0]),
            trace(&["gold"], "rst", &[1, 0, 0]),
            trace(&["gold"], "q", &[0, 1, 2]),
            trace(&["gate"], "q", &[0, 1, 3]),
        ];

        let cex = diff_traces(&traces, &iface).unwrap();
        assert_eq!(cex.kind, CircuitKind::Sequential);
        assert_eq!(cex.input["clk"], sequence(&[0, 1, 0]));
        assert_eq!(cex.output["q"], sequence(&[0, 1, 3]));
        assert_eq!(cex.errors, vec!["q".to_string()]);
    }

    #[test]
    fn test_missing_gate_output_is_an_error() {
        let iface = iface(&[("a", Direction::Input, 1), ("y", Direction::Output, 1)]);
        let traces = vec![trace(&["gold"], "a", &[0]), trace(&["gold"], "y", &[1])];

        let cex = diff_traces(&traces, &iface).unwrap();
        assert_eq!(cex.errors, vec!["y".to_string()]);
        assert!(cex.output.is_empty());
    }

    #[test]
    fn test_duplicate_binding_in_scope_fails() {
        let iface = iface(&[("a", Direction::Input, 1), ("y", Direction::Output, 1)]);
        let traces = vec![trace(&["gold"], "y", &[1]), trace(&["gold"], "y", &[0])];

        assert!(matches!(
            diff_traces(&traces, &iface),
            Err(WaveError::AmbiguousBinding { .. })
        ));
    }

    #[test]
    fn test_empty_combinational_trace_fails() {
        let iface = iface(&[("a", Direction::Input, 1), ("y", Direction::Output, 1)]);
        let traces = vec![trace(&["gold"], "a", &[])];

        assert!(matches!(
            diff_traces(&traces, &iface),
            Err(WaveError::EmptyTrace(name)) if name == "a"
        ));
    }

    #[test]
    fn test_from_parsed_waveform() {
        let vcd = "\
$scope module miter $end
$var wire 1 n0 okay $end
$scope module gold $end
$var wire 2 n1 a $end
$var wire 2 n2 y $end
$upscope $end
$scope module gate $end
$var wire 2 n1 a $end
$var wire 2 n3 y $end
$upscope $end
$upscope $end
$enddefinitions $end
#0
b0 n0
b10 n1
b11 n2
b01 n3
#1
";
        let waveform = parse_vcd_str(vcd).unwrap();
        let iface = iface(&[("a", Direction::Input, 2), ("y", Direction::Output, 2)]);

        let cex = diff_traces(&waveform.traces(), &iface).unwrap();
        assert_eq!(cex.input["a"], scalar(2));
        assert_eq!(cex.expected["y"], scalar(3));
        assert_eq!(cex.output["y"], scalar(1));
        assert_eq!(cex.errors, vec!["y".to_string()]);
    }
}
