//! Minimal waveform copy for external rendering
//!
//! Keeps the miter's `okay` comparison signal and the wires declared
//! directly inside a `gold` or `gate` scope, renamed `<scope>.<name>`.
//! Everything else is dropped together with its value changes: internal
//! (`__`) and per-signal don't-care (`_DontCare_`) wires, non-wire variables
//! such as the checker's step counter, and changes to undeclared ids.

use crate::syntax::{bit_value, walk_header, HeaderEvent, ScopeStack};
use std::collections::HashMap;
use std::io::{Read, Write};
use vcd_ng::{FFValueChange, FastFlow, FastFlowToken, Parser, Value, Var, VarType, VecValue, Writer};

/// Name of the miter's comparison output
pub const OKAY_SIGNAL: &str = "okay";

const INTERNAL_PREFIX: &str = "__";
const DONTCARE_PREFIX: &str = "_DontCare_";

/// Instance scope of the reference design
pub const GOLD_SCOPE: &str = "gold";
/// Instance scope of the submitted design
pub const GATE_SCOPE: &str = "gate";

const FLOW_BUFFER: usize = 65536;

/// Name of a kept wire in the copy, `None` when it is dropped
fn kept_name(scopes: &ScopeStack, var: &Var) -> Option<String> {
    if var.var_type != VarType::Wire {
        return None;
    }
    let name = var.reference.as_str();
    if name == OKAY_SIGNAL {
        return Some(name.to_string());
    }
    match scopes.innermost() {
        Some(scope @ (GOLD_SCOPE | GATE_SCOPE))
            if !name.starts_with(INTERNAL_PREFIX) && !name.starts_with(DONTCARE_PREFIX) =>
        {
            Some(format!("{}.{}", scope, name))
        }
        _ => None,
    }
}

/// Filter a complete dump held in memory
pub fn clean_vcd_bytes<W: Write>(dump: &[u8], out: W) -> std::io::Result<()> {
    let header = Parser::new(dump).parse_header()?;
    let mut writer = Writer::new(out);
    if let Some((ratio, unit)) = header.timescale {
        writer.timescale(ratio, unit)?;
    }

    // Kept id code -> width. Codes are copied unchanged, so an input shared
    // by both instances stays a single signal with two names.
    let mut kept: HashMap<u64, u32> = HashMap::new();
    walk_header(&header.items, &mut ScopeStack::default(), &mut |event, scopes| {
        match event {
            HeaderEvent::Enter(scope) => writer.add_module(&scope.identifier).map(drop),
            HeaderEvent::Leave => writer.upscope(),
            HeaderEvent::Var(var) => match kept_name(scopes, var) {
                Some(name) => {
                    kept.insert(var.code.0, var.size);
                    writer.var_def(VarType::Wire, var.size, var.code, &name, None)
                }
                None => Ok(()),
            },
        }
    })?;
    writer.enddefinitions()?;

    let mut flow = FastFlow::new(dump, FLOW_BUFFER);
    while let Some(token) = flow.next_token()? {
        match token {
            FastFlowToken::Timestamp(time) => writer.timestamp(time)?,
            FastFlowToken::Value(FFValueChange { id, bits }) => {
                // Allowlist: anything not declared as a kept wire is dropped
                let Some(&width) = kept.get(&id.0) else {
                    continue;
                };
                let values: Vec<Value> = bits.iter().map(|&b| bit_value(b)).collect();
                match values.as_slice() {
                    [value] if width == 1 => writer.change_scalar(id, *value)?,
                    _ => writer.change_vector(id, &VecValue::from(values.clone()))?,
                }
            }
        }
    }
    Ok(())
}

/// Filter a waveform down to the interface signals of both instances
pub fn clean_vcd<R: Read, W: Write>(mut reader: R, out: W) -> std::io::Result<()> {
    let mut dump = Vec::new();
    reader.read_to_end(&mut dump)?;
    clean_vcd_bytes(&dump, out)
}

pub fn clean_vcd_str(text: &str) -> std::io::Result<String> {
    let mut out = Vec::new();
    clean_vcd_bytes(text.as_bytes(), &mut out)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}
