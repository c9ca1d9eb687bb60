//! Waveform handling for failed equivalence proofs
//!
//! This crate provides:
//! - Dense value-trace reconstruction from the checker's value-change dump
//! - A filtered copy of the dump for rendering
//! - Gold/gate trace comparison into a JSON counterexample

pub mod clean;
pub mod differ;
pub mod error;
pub mod parser;
pub mod report;
pub mod syntax;

pub use clean::{clean_vcd, clean_vcd_bytes, clean_vcd_str};
pub use differ::{diff_traces, SignalBindings};
pub use error::{Result, WaveError};
pub use parser::{
    parse_vcd, parse_vcd_bytes, parse_vcd_file, parse_vcd_str, Waveform, WireTrace, UNOBSERVED,
};
pub use report::{CircuitKind, Counterexample, SignalValues};
pub use syntax::Sample;

use eqjudge_iface::Interface;
use std::path::Path;

/// Parse a dump and diff it against an interface in one go
pub fn counterexample_from_file(vcd: impl AsRef<Path>, iface: &Interface) -> Result<Counterexample> {
    let waveform = parse_vcd_file(vcd)?;
    diff_traces(&waveform.traces(), iface)
}
