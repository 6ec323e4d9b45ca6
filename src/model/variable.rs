use crate::attr;
use crate::cu::LoadCtx;
use crate::die::Die;
use crate::dw;
use crate::model::TagHeader;
use crate::strings::StringId;

/// Where a variable lives, classified from the first opcode of its
/// location expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Location {
    #[default]
    Unknown,
    /// Fixed address, kept in [`Variable::addr`].
    Global,
    Register,
    /// Frame-relative.
    Local,
    /// No location at all: optimized out.
    Optimized,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub header: TagHeader,
    pub name: Option<StringId>,
    /// Visible outside its compilation unit.
    pub external: bool,
    /// Non-defining declaration.
    pub declaration: bool,
    pub location: Location,
    pub addr: u64,
}

impl Variable {
    pub(crate) fn read(die: &Die, ctx: &mut LoadCtx) -> Self {
        let declaration = die.has_attr(dw::DW_AT_declaration);
        let (location, addr) = if !declaration && ctx.cu.has_addr_info {
            attr::location(die)
        } else {
            (Location::Unknown, 0)
        };
        Variable {
            header: ctx.header(die),
            name: attr::string(die, dw::DW_AT_name),
            external: die.has_attr(dw::DW_AT_external),
            declaration,
            location,
            addr,
        }
    }
}
