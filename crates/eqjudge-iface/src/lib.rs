//! Circuit interface model
//!
//! Ports, interfaces and their canonical `.iface` form, the circuit traits
//! derived from an interface, and the port-list scanner used on synthesized
//! netlists.

pub mod error;
pub mod interface;
pub mod port;
pub mod traits;
pub mod verilog;

pub use error::{IfaceError, Result};
pub use interface::Interface;
pub use port::{mangle_id, Direction, Port};
pub use traits::{detect_circuit_traits, CircuitTraits};
pub use verilog::{parse_top_module, parse_verilog, parse_verilog_file};
