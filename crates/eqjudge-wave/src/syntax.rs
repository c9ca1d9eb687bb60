//! Shared walking helpers for the value-change dumps written by the
//! equivalence checker.
//!
//! The header is read into a scope tree by [`vcd_ng::Parser`] and the body is
//! streamed by [`vcd_ng::FastFlow`]. Both the trace parser and the
//! clean-copy filter visit the scope tree with [`walk_header`] and decode
//! value changes with [`decode_bits`].

use serde::Serialize;
use std::fmt;
use vcd_ng::{Scope, ScopeItem, Value, Var};

/// The current scope path while walking the header
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    names: Vec<String>,
}

impl ScopeStack {
    pub fn push(&mut self, name: &str) {
        self.names.push(name.to_string());
    }

    /// Pops the innermost scope; popping an empty stack is ignored
    pub fn pop(&mut self) {
        self.names.pop();
    }

    pub fn innermost(&self) -> Option<&str> {
        self.names.last().map(String::as_str)
    }

    pub fn path(&self) -> &[String] {
        &self.names
    }
}

/// One step of a header walk
#[derive(Debug, Clone, Copy)]
pub enum HeaderEvent<'a> {
    /// A scope was opened; the stack already contains it
    Enter(&'a Scope),
    /// The innermost scope was closed
    Leave,
    Var(&'a Var),
}

/// Visit a scope tree depth-first, in declaration order
pub fn walk_header<'a, F>(
    items: &'a [ScopeItem],
    scopes: &mut ScopeStack,
    visit: &mut F,
) -> std::io::Result<()>
where
    F: FnMut(HeaderEvent<'a>, &ScopeStack) -> std::io::Result<()>,
{
    for item in items {
        match item {
            ScopeItem::Scope(scope) => {
                scopes.push(&scope.identifier);
                visit(HeaderEvent::Enter(scope), scopes)?;
                walk_header(&scope.children, scopes, visit)?;
                scopes.pop();
                visit(HeaderEvent::Leave, scopes)?;
            }
            ScopeItem::Var(var) => visit(HeaderEvent::Var(var), scopes)?,
            #[allow(unreachable_patterns)]
            _ => {}
        }
    }
    Ok(())
}

/// A decoded wire value
///
/// Values up to 127 significant bits are plain integers. Wider values keep
/// every bit as a decimal digit string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Sample {
    Int(i128),
    Wide(String),
}

impl From<i128> for Sample {
    fn from(value: i128) -> Self {
        Sample::Int(value)
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sample::Int(v) => write!(f, "{}", v),
            Sample::Wide(digits) => f.write_str(digits),
        }
    }
}

const DECIMAL_LIMB: u64 = 1_000_000_000;

/// Decimal digits of an arbitrarily wide binary number
fn wide_decimal(bits: &[u8]) -> String {
    // Little-endian base 10^9 limbs
    let mut limbs: Vec<u32> = vec![0];
    for &bit in bits {
        let mut carry = u64::from(bit == b'1');
        for limb in limbs.iter_mut() {
            let v = u64::from(*limb) * 2 + carry;
            *limb = (v % DECIMAL_LIMB) as u32;
            carry = v / DECIMAL_LIMB;
        }
        if carry > 0 {
            limbs.push(carry as u32);
        }
    }

    let mut digits = String::new();
    for (i, limb) in limbs.iter().rev().enumerate() {
        if i == 0 {
            digits.push_str(&limb.to_string());
        } else {
            digits.push_str(&format!("{:09}", limb));
        }
    }
    digits
}

/// Decode the bits of a value change, most significant first.
///
/// Returns `None` for an empty change or one holding `x`/`z` bits.
pub fn decode_bits(bits: &[u8]) -> Option<Sample> {
    if bits.is_empty() || !bits.iter().all(|b| matches!(b, b'0' | b'1')) {
        return None;
    }
    let first_one = bits.iter().position(|&b| b == b'1');
    let significant = match first_one {
        Some(pos) => &bits[pos..],
        None => return Some(Sample::Int(0)),
    };
    if significant.len() > 127 {
        return Some(Sample::Wide(wide_decimal(significant)));
    }
    let value = significant
        .iter()
        .fold(0i128, |acc, &b| (acc << 1) | i128::from(b == b'1'));
    Some(Sample::Int(value))
}

/// Four-state value of one dumped bit
pub fn bit_value(bit: u8) -> Value {
    match bit {
        b'0' => Value::V0,
        b'1' => Value::V1,
        b'z' | b'Z' => Value::Z,
        _ => Value::X,
    }
}
