use log::warn;

use crate::attr;
use crate::cu::LoadCtx;
use crate::die::Die;
use crate::dw::{self, TagKind};
use crate::model::TagHeader;

/// Arrays never need more than this many dimensions in the wild; deeper
/// nests are truncated with a warning.
const MAX_DIMENSIONS: usize = 64;

#[derive(Debug, Clone)]
pub struct ArrayType {
    pub header: TagHeader,
    /// Entry count per dimension, outermost first. 0 where the subrange
    /// had no upper bound.
    pub nr_entries: Vec<u32>,
    pub is_vector: bool,
}

impl ArrayType {
    pub fn dimensions(&self) -> usize {
        self.nr_entries.len()
    }

    pub(crate) fn read(die: &Die, ctx: &mut LoadCtx) -> Self {
        let mut array = ArrayType {
            header: ctx.header(die),
            nr_entries: Vec::new(),
            is_vector: die.has_attr(dw::DW_AT_GNU_vector),
        };
        for child in &die.children {
            if child.tag == u32::from(TagKind::SubrangeType) {
                array.nr_entries.push(attr::upper_bound(child));
                if array.nr_entries.len() == MAX_DIMENSIONS {
                    warn!(
                        "array at {:#x}: only {} dimensions are supported",
                        die.offset, MAX_DIMENSIONS
                    );
                    break;
                }
            } else {
                ctx.tag_not_handled(child);
            }
        }
        array
    }
}
