//! Scalar accessors over a DIE's attributes.
//!
//! Missing attributes are never errors here: every accessor has a zero-ish
//! default, mirroring how sparsely compilers actually emit these fields.

use log::warn;

use crate::die::{AttrValue, Die};
use crate::dw;
use crate::model::Location;
use crate::strings::{strings, StringId};

/// Integer value of an attribute. Address and data forms yield the value,
/// any flag form yields 1, everything else (or absence) yields 0.
pub(crate) fn numeric(die: &Die, at: u32) -> u64 {
    match die.attr(at) {
        None => 0,
        Some(AttrValue::Addr(v)) | Some(AttrValue::Udata(v)) => *v,
        Some(AttrValue::Sdata(v)) => *v as u64,
        Some(AttrValue::Flag(_)) => 1,
        Some(other) => {
            warn!("DW_AT_<{:#x}> has non-numeric form {:?}", at, other);
            0
        }
    }
}

/// Offset-expression value of an attribute: integer forms directly, block
/// forms through the minimal expression evaluator.
pub(crate) fn offset(die: &Die, at: u32) -> u64 {
    match die.attr(at) {
        None => 0,
        Some(AttrValue::Udata(v)) => *v,
        Some(AttrValue::Sdata(v)) => *v as u64,
        Some(AttrValue::Block(b)) | Some(AttrValue::Exprloc(b)) => {
            dwarf_expr(b)
        }
        Some(_) => 0,
    }
}

pub(crate) fn string(die: &Die, at: u32) -> Option<StringId> {
    match die.attr(at) {
        Some(AttrValue::String(s)) => Some(strings().add(s)),
        _ => None,
    }
}

/// Offset of the DIE referenced by `at`, or 0 when absent.
pub(crate) fn type_ref(die: &Die, at: u32) -> u64 {
    match die.attr(at) {
        Some(AttrValue::Ref(off)) => *off,
        _ => 0,
    }
}

/// Entry count of one array dimension: `DW_AT_upper_bound + 1`, 0 when the
/// bound is absent (flexible or incomplete arrays).
pub(crate) fn upper_bound(die: &Die) -> u32 {
    match die.attr(dw::DW_AT_upper_bound) {
        Some(AttrValue::Udata(n)) => (*n as u32).wrapping_add(1),
        Some(AttrValue::Sdata(n)) => (*n as u32).wrapping_add(1),
        _ => 0,
    }
}

/// Classify `DW_AT_location` by its first opcode. The address is only
/// meaningful for [`Location::Global`].
pub(crate) fn location(die: &Die) -> (Location, u64) {
    let expr = match die.attr(dw::DW_AT_location) {
        None => return (Location::Optimized, 0),
        Some(AttrValue::Block(b)) | Some(AttrValue::Exprloc(b)) => b,
        Some(_) => return (Location::Unknown, 0),
    };
    match expr.first() {
        Some(&dw::DW_OP_addr) => (Location::Global, operand_addr(&expr[1..])),
        Some(&op)
            if (dw::DW_OP_reg0..=dw::DW_OP_reg31).contains(&op)
                || (dw::DW_OP_breg0..=dw::DW_OP_breg31).contains(&op) =>
        {
            (Location::Register, 0)
        }
        Some(&dw::DW_OP_fbreg) => (Location::Local, 0),
        _ => (Location::Unknown, 0),
    }
}

fn operand_addr(bytes: &[u8]) -> u64 {
    let mut addr = 0u64;
    for (i, b) in bytes.iter().take(8).enumerate() {
        addr |= (*b as u64) << (i * 8);
    }
    addr
}

/// Evaluate the member-placement subset of DWARF expressions: a single
/// `DW_OP_plus_uconst` or `DW_OP_constu` followed by its ULEB128 operand.
/// Anything else yields `u64::MAX`.
pub(crate) fn dwarf_expr(expr: &[u8]) -> u64 {
    match expr.first() {
        Some(&dw::DW_OP_plus_uconst) | Some(&dw::DW_OP_constu) => {
            uleb128(&expr[1..])
        }
        Some(&op) => {
            warn!("unhandled {:#x} DW_OP_ operation", op);
            u64::MAX
        }
        None => {
            warn!("empty DW_OP_ expression");
            u64::MAX
        }
    }
}

/// Unsigned LEB128. At most ten bytes are consumed; running off either the
/// buffer or the ten-byte limit yields `u64::MAX`, the same saturation
/// libdw applies.
pub(crate) fn uleb128(bytes: &[u8]) -> u64 {
    let mut value = 0u64;
    for (i, b) in bytes.iter().take(10).enumerate() {
        value |= ((b & 0x7f) as u64) << (i * 7);
        if b & 0x80 == 0 {
            return value;
        }
    }
    u64::MAX
}
