//! Bitfield recoding: synthesize a types-table entry whose storage width
//! is exactly the member's declared width.
//!
//! DWARF describes a `int x : 3` member as having type `int`; downstream
//! consumers want a 3-bit `int`. Qualifier and typedef wrappers are
//! re-created around the narrowed core; base types and enumerations are
//! shared by (name, width) so repeated widths cost one entry.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::warn;

use crate::cu::{Cu, DwarfCu, TypeId};
use crate::dw::TagKind;
use crate::model::{
    BaseType, Enumeration, Enumerator, Tag, TagHeader, Typedef, Wrapper,
};
use crate::strings::StringId;

enum Storage {
    Typedef(Option<StringId>),
    Qualifier(TagKind),
    Base(Option<StringId>),
    Enum {
        name: Option<StringId>,
        enumerators: Arc<Vec<Enumerator>>,
        declaration: bool,
    },
    Other(Option<TagKind>, Option<StringId>),
}

pub(crate) fn recode_bitfield(
    cu: &mut Cu,
    dcu: &DwarfCu,
    id: TypeId,
    bit_size: u16,
) -> Result<TypeId> {
    let storage = match &cu.types[id.0 as usize] {
        Tag::Typedef(t) => Storage::Typedef(t.name),
        Tag::Wrapper(w)
            if matches!(
                w.header.kind,
                TagKind::ConstType | TagKind::VolatileType
            ) =>
        {
            Storage::Qualifier(w.header.kind)
        }
        Tag::Base(b) => Storage::Base(b.name),
        Tag::Enumeration(e) => Storage::Enum {
            name: e.name,
            enumerators: e.enumerators.clone(),
            declaration: e.declaration,
        },
        other => Storage::Other(other.kind(), other.type_name()),
    };

    match storage {
        Storage::Typedef(name) => {
            let inner = wrapped_type(cu, dcu, id)?;
            let recoded = recode_bitfield(cu, dcu, inner, bit_size)?;
            if recoded == inner {
                return Ok(id);
            }
            let mut header = TagHeader::synthetic(TagKind::Typedef);
            header.type_id = recoded;
            Ok(cu.add_type(Tag::Typedef(Typedef { header, name })))
        }
        Storage::Qualifier(kind) => {
            let inner = wrapped_type(cu, dcu, id)?;
            let recoded = recode_bitfield(cu, dcu, inner, bit_size)?;
            if recoded == inner {
                return Ok(id);
            }
            let mut header = TagHeader::synthetic(kind);
            header.type_id = recoded;
            Ok(cu.add_type(Tag::Wrapper(Wrapper { header })))
        }
        Storage::Base(name) => {
            if let Some(existing) = find_base_type(cu, name, bit_size) {
                return Ok(existing);
            }
            let mut header = TagHeader::synthetic(TagKind::BaseType);
            header.top_level = true;
            Ok(cu.add_type(Tag::Base(BaseType {
                header,
                name,
                bit_size,
                is_signed: false,
                is_bool: false,
                is_varargs: false,
            })))
        }
        Storage::Enum {
            name,
            enumerators,
            declaration,
        } => {
            if let Some(existing) = find_enumeration(cu, name, bit_size) {
                return Ok(existing);
            }
            let mut header = TagHeader::synthetic(TagKind::EnumerationType);
            header.top_level = true;
            Ok(cu.add_type(Tag::Enumeration(Enumeration {
                header,
                name,
                bit_size,
                declaration,
                enumerators,
                shared_tags: true,
                definition_emitted: false,
                fwd_decl_emitted: false,
                resized: false,
            })))
        }
        Storage::Other(kind, name) => {
            warn!(
                "can't recode bitfield of kind {:?}, name {:?}, bit_size {}",
                kind, name, bit_size
            );
            Err(anyhow!("bitfield storage has unsupported kind"))
        }
    }
}

/// The type a typedef or qualifier at `id` wraps, by its raw reference.
/// Recoding runs while the wrapper itself may still be unresolved, so the
/// lookup goes through the offset hash rather than the resolved header.
fn wrapped_type(cu: &Cu, dcu: &DwarfCu, id: TypeId) -> Result<TypeId> {
    let header = cu.types[id.0 as usize]
        .header()
        .ok_or_else(|| anyhow!("recoding a void wrapper"))?;
    let raw_id = header
        .raw
        .ok_or_else(|| anyhow!("recoding a synthetic wrapper"))?;
    let type_ref = dcu.raw(raw_id).type_ref;
    dcu.find_type_by_id(type_ref).ok_or_else(|| {
        warn!(
            "couldn't find {:#x} type for {:#x} ({:?})",
            type_ref,
            dcu.raw(raw_id).id,
            header.kind
        );
        anyhow!("wrapped type not in the unit")
    })
}

fn find_base_type(
    cu: &Cu,
    name: Option<StringId>,
    bit_size: u16,
) -> Option<TypeId> {
    cu.types
        .iter()
        .position(|t| match t {
            Tag::Base(b) => b.name == name && b.bit_size == bit_size,
            _ => false,
        })
        .map(|i| TypeId(i as u32))
}

fn find_enumeration(
    cu: &Cu,
    name: Option<StringId>,
    bit_size: u16,
) -> Option<TypeId> {
    cu.types
        .iter()
        .position(|t| match t {
            Tag::Enumeration(e) => e.name == name && e.bit_size == bit_size,
            _ => false,
        })
        .map(|i| TypeId(i as u32))
}
