use std::sync::Arc;

use crate::attr;
use crate::cu::LoadCtx;
use crate::die::Die;
use crate::dw::{self, TagKind};
use crate::model::TagHeader;
use crate::strings::StringId;

#[derive(Debug, Clone)]
pub struct Enumeration {
    pub header: TagHeader,
    pub name: Option<StringId>,
    /// Declared size in bits. Enumerations without `DW_AT_byte_size` get
    /// one machine integer.
    pub bit_size: u16,
    pub declaration: bool,
    /// Shared with recoded copies of this enumeration, see
    /// [`shared_tags`](Self::shared_tags).
    pub enumerators: Arc<Vec<Enumerator>>,
    /// True when `enumerators` aliases another enumeration's list instead
    /// of owning its own.
    pub shared_tags: bool,
    pub definition_emitted: bool,
    pub fwd_decl_emitted: bool,
    pub resized: bool,
}

#[derive(Debug, Clone)]
pub struct Enumerator {
    pub header: TagHeader,
    pub name: Option<StringId>,
    pub value: i64,
}

impl Enumeration {
    pub(crate) fn read(die: &Die, ctx: &mut LoadCtx) -> Self {
        let byte_size = attr::numeric(die, dw::DW_AT_byte_size);
        let bit_size = if byte_size == 0 {
            32
        } else {
            (byte_size * 8) as u16
        };

        let mut enumerators = Vec::new();
        for child in &die.children {
            if child.tag == u32::from(TagKind::Enumerator) {
                enumerators.push(Enumerator {
                    header: ctx.header(child),
                    name: attr::string(child, dw::DW_AT_name),
                    value: attr::numeric(child, dw::DW_AT_const_value) as i64,
                });
            } else {
                ctx.tag_not_handled(child);
            }
        }

        Enumeration {
            header: ctx.header(die),
            name: attr::string(die, dw::DW_AT_name),
            bit_size,
            declaration: attr::numeric(die, dw::DW_AT_declaration) != 0,
            enumerators: Arc::new(enumerators),
            shared_tags: false,
            definition_emitted: false,
            fwd_decl_emitted: false,
            resized: false,
        }
    }
}
