use log::warn;

use crate::attr;
use crate::cu::LoadCtx;
use crate::die::Die;
use crate::dw;
use crate::model::TagHeader;
use crate::strings::StringId;

/// A data member or inheritance link of a composite type; the header kind
/// tells the two apart.
#[derive(Debug, Clone)]
pub struct Member {
    pub header: TagHeader,
    pub name: Option<StringId>,
    pub byte_offset: u32,
    /// Cached after resolution, see the size-cache pass.
    pub byte_size: u32,
    pub bit_offset: u32,
    pub bitfield_offset: u8,
    pub bitfield_size: u8,
    /// Cached after resolution.
    pub bit_size: u32,
    pub accessibility: u8,
    pub virtuality: u8,
}

impl Member {
    pub(crate) fn read(die: &Die, ctx: &mut LoadCtx) -> Self {
        let mut byte_offset =
            attr::offset(die, dw::DW_AT_data_member_location);
        if byte_offset == u64::MAX {
            // Unevaluable location expression; better a zero offset in the
            // output than a sign-extended garbage one.
            warn!(
                "member at {:#x}: unevaluable data member location",
                die.offset
            );
            byte_offset = 0;
        }
        let bitfield_offset = attr::numeric(die, dw::DW_AT_bit_offset) as u8;
        Member {
            header: ctx.header(die),
            name: attr::string(die, dw::DW_AT_name),
            byte_offset: byte_offset as u32,
            byte_size: 0,
            bit_offset: byte_offset as u32 * 8 + bitfield_offset as u32,
            bitfield_offset,
            bitfield_size: attr::numeric(die, dw::DW_AT_bit_size) as u8,
            bit_size: 0,
            accessibility: attr::numeric(die, dw::DW_AT_accessibility) as u8,
            virtuality: attr::numeric(die, dw::DW_AT_virtuality) as u8,
        }
    }
}
