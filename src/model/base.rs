use crate::attr;
use crate::cu::LoadCtx;
use crate::die::Die;
use crate::dw;
use crate::model::TagHeader;
use crate::strings::StringId;

/// A machine-level type: `int`, `unsigned char`, `_Bool`, ...
#[derive(Debug, Clone)]
pub struct BaseType {
    pub header: TagHeader,
    pub name: Option<StringId>,
    pub bit_size: u16,
    pub is_signed: bool,
    pub is_bool: bool,
    pub is_varargs: bool,
}

impl BaseType {
    pub(crate) fn read(die: &Die, ctx: &mut LoadCtx) -> Self {
        let encoding = attr::numeric(die, dw::DW_AT_encoding);
        BaseType {
            header: ctx.header(die),
            name: attr::string(die, dw::DW_AT_name),
            bit_size: (attr::numeric(die, dw::DW_AT_byte_size) * 8) as u16,
            is_signed: encoding == dw::DW_ATE_signed,
            is_bool: encoding == dw::DW_ATE_boolean,
            is_varargs: false,
        }
    }
}
