use crate::attr;
use crate::cu::{FunctionId, LoadCtx, TagRef};
use crate::die::Die;
use crate::dw;
use crate::model::{Member, TagHeader};
use crate::strings::StringId;

/// A class, structure, interface or union type; the header kind tells
/// them apart.
#[derive(Debug, Clone)]
pub struct Composite {
    pub header: TagHeader,
    pub name: Option<StringId>,
    /// Declared size in bytes.
    pub byte_size: u32,
    pub declaration: bool,
    /// Data members and inheritance links, in declaration order.
    pub members: Vec<Member>,
    /// Everything else nested inside: inner types, methods, imports...
    /// The tags themselves live in the unit's tables.
    pub children: Vec<TagRef>,
    /// Member functions that occupy a vtable slot.
    pub vtable: Vec<FunctionId>,
    pub definition_emitted: bool,
    pub fwd_decl_emitted: bool,
    pub resized: bool,
}

impl Composite {
    pub(crate) fn read(die: &Die, ctx: &mut LoadCtx) -> Self {
        Composite {
            header: ctx.header(die),
            name: attr::string(die, dw::DW_AT_name),
            byte_size: attr::numeric(die, dw::DW_AT_byte_size) as u32,
            declaration: attr::numeric(die, dw::DW_AT_declaration) != 0,
            members: Vec::new(),
            children: Vec::new(),
            vtable: Vec::new(),
            definition_emitted: false,
            fwd_decl_emitted: false,
            resized: false,
        }
    }

    pub fn nr_members(&self) -> usize {
        self.members.len()
    }
}
