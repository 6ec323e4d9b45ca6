//! The DWARF constants this loader recognizes.
//!
//! Only the subset that the tag factory and the attribute decoder actually
//! dispatch on is defined here; the canonical DWARF spellings are kept so
//! the values can be checked against the standard at a glance.
#![allow(non_upper_case_globals)]

use num_enum::{IntoPrimitive, TryFromPrimitive};

pub const DW_AT_location: u32 = 0x02;
pub const DW_AT_name: u32 = 0x03;
pub const DW_AT_byte_size: u32 = 0x0b;
pub const DW_AT_bit_offset: u32 = 0x0c;
pub const DW_AT_bit_size: u32 = 0x0d;
pub const DW_AT_language: u32 = 0x13;
pub const DW_AT_low_pc: u32 = 0x11;
pub const DW_AT_high_pc: u32 = 0x12;
pub const DW_AT_import: u32 = 0x18;
pub const DW_AT_const_value: u32 = 0x1c;
pub const DW_AT_containing_type: u32 = 0x1d;
pub const DW_AT_inline: u32 = 0x20;
pub const DW_AT_upper_bound: u32 = 0x2f;
pub const DW_AT_abstract_origin: u32 = 0x31;
pub const DW_AT_accessibility: u32 = 0x32;
pub const DW_AT_data_member_location: u32 = 0x38;
pub const DW_AT_decl_file: u32 = 0x3a;
pub const DW_AT_decl_line: u32 = 0x3b;
pub const DW_AT_declaration: u32 = 0x3c;
pub const DW_AT_encoding: u32 = 0x3e;
pub const DW_AT_external: u32 = 0x3f;
pub const DW_AT_specification: u32 = 0x47;
pub const DW_AT_type: u32 = 0x49;
pub const DW_AT_virtuality: u32 = 0x4c;
pub const DW_AT_vtable_elem_location: u32 = 0x4d;
pub const DW_AT_ranges: u32 = 0x55;
pub const DW_AT_call_file: u32 = 0x58;
pub const DW_AT_call_line: u32 = 0x59;
pub const DW_AT_MIPS_linkage_name: u32 = 0x2007;
pub const DW_AT_GNU_vector: u32 = 0x2107;

pub const DW_OP_addr: u8 = 0x03;
pub const DW_OP_constu: u8 = 0x10;
pub const DW_OP_plus_uconst: u8 = 0x23;
pub const DW_OP_reg0: u8 = 0x50;
pub const DW_OP_reg31: u8 = 0x6f;
pub const DW_OP_breg0: u8 = 0x70;
pub const DW_OP_breg31: u8 = 0x8f;
pub const DW_OP_fbreg: u8 = 0x91;

pub const DW_ATE_boolean: u64 = 0x02;
pub const DW_ATE_signed: u64 = 0x05;

/// DIE kinds the loader knows how to materialize. Anything else is warned
/// about once per kind and skipped.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u32)]
pub enum TagKind {
    ArrayType = 0x01,
    ClassType = 0x02,
    EnumerationType = 0x04,
    FormalParameter = 0x05,
    ImportedDeclaration = 0x08,
    Label = 0x0a,
    LexicalBlock = 0x0b,
    Member = 0x0d,
    PointerType = 0x0f,
    ReferenceType = 0x10,
    CompileUnit = 0x11,
    StructureType = 0x13,
    SubroutineType = 0x15,
    Typedef = 0x16,
    UnionType = 0x17,
    UnspecifiedParameters = 0x18,
    Inheritance = 0x1c,
    InlinedSubroutine = 0x1d,
    PtrToMemberType = 0x1f,
    SubrangeType = 0x21,
    BaseType = 0x24,
    ConstType = 0x26,
    Enumerator = 0x28,
    Subprogram = 0x2e,
    Variable = 0x34,
    VolatileType = 0x35,
    InterfaceType = 0x38,
    Namespace = 0x39,
    ImportedModule = 0x3a,
}

impl TagKind {
    /// True for kinds that land in a compilation unit's types table.
    pub fn is_type(self) -> bool {
        use TagKind::*;
        matches!(
            self,
            ArrayType
                | BaseType
                | ClassType
                | ConstType
                | EnumerationType
                | InterfaceType
                | Namespace
                | PointerType
                | PtrToMemberType
                | ReferenceType
                | StructureType
                | SubroutineType
                | Typedef
                | UnionType
                | VolatileType
        )
    }
}
