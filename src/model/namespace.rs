use crate::attr;
use crate::cu::{LoadCtx, TagRef};
use crate::die::Die;
use crate::dw;
use crate::model::TagHeader;
use crate::strings::StringId;

#[derive(Debug, Clone)]
pub struct Namespace {
    pub header: TagHeader,
    pub name: Option<StringId>,
    /// Ordered child tags; the tags themselves live in the unit's tables.
    pub children: Vec<TagRef>,
}

impl Namespace {
    pub(crate) fn read(die: &Die, ctx: &mut LoadCtx) -> Self {
        Namespace {
            header: ctx.header(die),
            name: attr::string(die, dw::DW_AT_name),
            children: Vec::new(),
        }
    }
}
