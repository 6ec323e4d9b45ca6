//! The surface this loader consumes from its DWARF reader and ELF host.
//!
//! The reader side hands over one owned [`Die`] tree per compilation unit,
//! with attribute values already classified by form; applying relocations,
//! walking sections and decoding abbreviations are the host's problem. The
//! host side is a pair of small traits: a [`DwarfHost`] yields modules, a
//! [`DwarfModule`] yields units.

use anyhow::Result;

use crate::dw;

/// An attribute value, discriminated by its DWARF form class.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Addr(u64),
    /// `data1`/`data2`/`data4`/`data8`/`udata`.
    Udata(u64),
    Sdata(i64),
    Flag(bool),
    String(String),
    Block(Vec<u8>),
    /// A reference to another DIE, by its offset within the unit.
    Ref(u64),
    Exprloc(Vec<u8>),
}

/// One Debug Information Entry with its children.
#[derive(Debug, Clone, Default)]
pub struct Die {
    /// Raw DWARF tag code.
    pub tag: u32,
    /// Offset of this DIE within its compilation unit.
    pub offset: u64,
    pub attrs: Vec<(u32, AttrValue)>,
    pub children: Vec<Die>,
    /// Address ranges from `DW_AT_ranges`, already resolved against the
    /// range-list section by the reader.
    pub ranges: Vec<(u64, u64)>,
}

impl Die {
    pub fn new(tag: u32, offset: u64) -> Self {
        Die {
            tag,
            offset,
            ..Die::default()
        }
    }

    pub fn attr(&self, at: u32) -> Option<&AttrValue> {
        self.attrs.iter().find(|(a, _)| *a == at).map(|(_, v)| v)
    }

    pub fn has_attr(&self, at: u32) -> bool {
        self.attr(at).is_some()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn low_pc(&self) -> Option<u64> {
        match self.attr(dw::DW_AT_low_pc)? {
            AttrValue::Addr(a) | AttrValue::Udata(a) => Some(*a),
            _ => None,
        }
    }

    /// `DW_AT_high_pc`, with the DWARF 4 offset-from-low form folded in.
    pub fn high_pc(&self) -> Option<u64> {
        match self.attr(dw::DW_AT_high_pc)? {
            AttrValue::Addr(a) => Some(*a),
            AttrValue::Udata(off) => Some(self.low_pc()?.wrapping_add(*off)),
            _ => None,
        }
    }

    pub fn decl_file(&self) -> Option<&str> {
        match self.attr(dw::DW_AT_decl_file)? {
            AttrValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn decl_line(&self) -> u32 {
        match self.attr(dw::DW_AT_decl_line) {
            Some(AttrValue::Udata(n)) => *n as u32,
            Some(AttrValue::Sdata(n)) => *n as u32,
            _ => 0,
        }
    }
}

/// One compilation unit as handed over by the reader.
#[derive(Debug, Clone)]
pub struct Unit {
    pub root: Die,
    pub pointer_size: u8,
    pub offset_size: u8,
}

/// One module of a file: a DWARF-bearing object the host found and
/// relocated. Plain object files have exactly one.
pub trait DwarfModule {
    fn build_id(&self) -> Option<&[u8]> {
        None
    }

    /// The next compilation unit, or `None` when the module is exhausted.
    fn next_unit(&mut self) -> Result<Option<Unit>>;
}

/// The file-level host collaborator.
pub trait DwarfHost {
    type Module: DwarfModule;

    fn filename(&self) -> &str;

    /// The next DWARF-bearing module, or `None` when the file is exhausted.
    /// Modules without debug information are the host's to skip.
    fn next_module(&mut self) -> Result<Option<Self::Module>>;
}
