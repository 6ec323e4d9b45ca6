//! Phase two of the load: rewrite every raw DIE-offset reference into a
//! dense table index.
//!
//! The sweep covers the three tables in order (types, then tags, then
//! functions) and is idempotent: entries synthesized by bitfield recoding
//! carry no raw metadata and are skipped when the growing types table
//! reaches them.

use std::mem;

use log::warn;

use crate::cu::{
    Cu, DwarfCu, FnOwner, FunctionId, RawTag, TagId, TagRef, TypeId,
};
use crate::dw::TagKind;
use crate::model::{LexChild, Tag};
use crate::recode;

pub(crate) fn recode_cu(cu: &mut Cu, dcu: &DwarfCu) {
    // The types table grows while bitfield recoding runs.
    let mut i = 1;
    while i < cu.types.len() {
        recode_type_entry(cu, dcu, TypeId(i as u32));
        i += 1;
    }
    for i in 0..cu.tags.len() {
        recode_tag_entry(cu, dcu, TagId(i as u32));
    }
    for i in 0..cu.functions.len() {
        recode_function_entry(cu, dcu, FunctionId(i as u32));
    }
}

fn recode_type_entry(cu: &mut Cu, dcu: &DwarfCu, id: TypeId) {
    let Some(header) = cu.types[id.0 as usize].header().copied() else {
        return;
    };
    let Some(raw_id) = header.raw else {
        return; // synthetic, nothing left to resolve
    };
    let raw = dcu.raw(raw_id).clone();

    match header.kind {
        TagKind::Typedef => {
            copy_specification_name(cu, dcu, id, &raw);
            resolve_generic(cu, dcu, TagRef::Type(id), &raw);
        }
        TagKind::ClassType
        | TagKind::InterfaceType
        | TagKind::StructureType
        | TagKind::UnionType => {
            copy_specification_name(cu, dcu, id, &raw);
            recode_members(cu, dcu, id);
        }
        TagKind::EnumerationType => {
            copy_specification_name(cu, dcu, id, &raw);
        }
        TagKind::Namespace => {}
        TagKind::SubroutineType => {
            recode_ftype(cu, dcu, FnOwner::Type(id));
            resolve_generic(cu, dcu, TagRef::Type(id), &raw);
        }
        TagKind::PtrToMemberType => {
            match dcu.find_type_by_id(raw.containing_type_ref) {
                Some(t) => {
                    if let Tag::PtrToMember(p) = &mut cu.types[id.0 as usize]
                    {
                        p.containing_type = t;
                    }
                }
                None => warn!(
                    "couldn't find type for containing_type {:#x} of {:#x}",
                    raw.containing_type_ref, raw.id
                ),
            }
            resolve_generic(cu, dcu, TagRef::Type(id), &raw);
        }
        _ => resolve_generic(cu, dcu, TagRef::Type(id), &raw),
    }
}

/// A definition DIE with no name of its own borrows the name of the
/// declaration it is the specification of.
fn copy_specification_name(
    cu: &mut Cu,
    dcu: &DwarfCu,
    id: TypeId,
    raw: &RawTag,
) {
    let named = cu.types[id.0 as usize].type_name().is_some();
    if named || raw.specification_ref == 0 {
        return;
    }
    let name = dcu
        .find_type_by_id(raw.specification_ref)
        .and_then(|spec| cu.type_tag(spec))
        .and_then(Tag::type_name);
    match name {
        Some(name) => match &mut cu.types[id.0 as usize] {
            Tag::Typedef(t) => t.name = Some(name),
            Tag::Enumeration(t) => t.name = Some(name),
            Tag::Composite(t) => t.name = Some(name),
            _ => {}
        },
        None => warn!(
            "couldn't find name for type {:#x}, specification={:#x}",
            raw.id, raw.specification_ref
        ),
    }
}

/// Resolve the members of a composite: bitfields go through recoding,
/// everything else through the types hash.
fn recode_members(cu: &mut Cu, dcu: &DwarfCu, id: TypeId) {
    let mut members = match &mut cu.types[id.0 as usize] {
        Tag::Composite(c) => mem::take(&mut c.members),
        _ => return,
    };
    for member in &mut members {
        let Some(raw_id) = member.header.raw else { continue };
        let raw = dcu.raw(raw_id);
        if member.bitfield_size != 0 {
            match dcu.find_type_by_id(raw.type_ref) {
                Some(storage) => {
                    if let Ok(recoded) = recode::recode_bitfield(
                        cu,
                        dcu,
                        storage,
                        member.bitfield_size as u16,
                    ) {
                        member.header.type_id = recoded;
                    }
                }
                None => warn_type_not_found(TagKind::Member, raw),
            }
            continue;
        }
        if raw.type_ref == 0 {
            member.header.type_id = TypeId::VOID;
        } else {
            match dcu.find_type_by_id(raw.type_ref) {
                Some(t) => member.header.type_id = t,
                None => warn_type_not_found(member.header.kind, raw),
            }
        }
    }
    if let Tag::Composite(c) = &mut cu.types[id.0 as usize] {
        c.members = members;
    }
}

fn recode_tag_entry(cu: &mut Cu, dcu: &DwarfCu, id: TagId) {
    let Some(header) = cu.tags[id.0 as usize].header().copied() else {
        return;
    };
    let Some(raw_id) = header.raw else { return };
    let raw = dcu.raw(raw_id).clone();

    match header.kind {
        // The type slot of an inline expansion holds its abstract origin,
        // a function, so it resolves through the all-tags hash.
        TagKind::InlinedSubroutine => {
            match dcu.find_tag_by_id(raw.type_ref) {
                Some(TagRef::Function(f)) => {
                    if let Tag::InlineExpansion(exp) =
                        &mut cu.tags[id.0 as usize]
                    {
                        exp.origin = Some(f);
                    }
                }
                _ => warn_type_not_found(header.kind, &raw),
            }
        }
        TagKind::ImportedModule => {
            match dcu.find_tag_by_id(raw.type_ref) {
                Some(r) => set_import_target(cu, id, r),
                None => warn_type_not_found(header.kind, &raw),
            }
        }
        // An imported declaration can name a type or a plain tag.
        TagKind::ImportedDeclaration => {
            let target = dcu
                .find_tag_by_id(raw.type_ref)
                .or_else(|| dcu.find_type_by_id(raw.type_ref).map(TagRef::Type));
            match target {
                Some(r) => set_import_target(cu, id, r),
                None => warn_type_not_found(header.kind, &raw),
            }
        }
        _ => resolve_generic(cu, dcu, TagRef::Tag(id), &raw),
    }
}

fn set_import_target(cu: &mut Cu, id: TagId, r: TagRef) {
    if let Tag::Import(import) = &mut cu.tags[id.0 as usize] {
        import.target = Some(r);
    }
}

fn recode_function_entry(cu: &mut Cu, dcu: &DwarfCu, id: FunctionId) {
    let Some(header) =
        cu.functions[id.0 as usize].header().copied()
    else {
        return;
    };
    let Some(raw_id) = header.raw else { return };
    let raw = dcu.raw(raw_id).clone();

    copy_function_name(cu, dcu, id, &raw);

    let mut lexblock = match &mut cu.functions[id.0 as usize] {
        Tag::Function(f) => mem::take(&mut f.lexblock),
        _ => return,
    };
    recode_lexblock(cu, dcu, &mut lexblock);
    if let Tag::Function(f) = &mut cu.functions[id.0 as usize] {
        f.lexblock = lexblock;
    }

    recode_ftype(cu, dcu, FnOwner::Function(id));
    resolve_generic(cu, dcu, TagRef::Function(id), &raw);
}

/// An unnamed function instance borrows its name from its abstract origin
/// or, failing that, its specification.
fn copy_function_name(
    cu: &mut Cu,
    dcu: &DwarfCu,
    id: FunctionId,
    raw: &RawTag,
) {
    let named = match &cu.functions[id.0 as usize] {
        Tag::Function(f) => f.name.is_some(),
        _ => true,
    };
    if named {
        return;
    }
    if raw.abstract_origin_ref == 0 && raw.specification_ref == 0 {
        // Bare declarations legitimately have no name source.
        return;
    }
    let origin = dcu
        .find_tag_by_id(raw.abstract_origin_ref)
        .or_else(|| dcu.find_tag_by_id(raw.specification_ref));
    match origin.and_then(|r| cu.ref_name_and_type(r)) {
        Some((name, _)) => {
            if let Tag::Function(f) = &mut cu.functions[id.0 as usize] {
                f.name = name;
            }
        }
        None => warn!(
            "couldn't find name for function {:#x}, \
             abstract_origin={:#x}, specification={:#x}",
            raw.id, raw.abstract_origin_ref, raw.specification_ref
        ),
    }
}

/// Resolve a signature's parameters. A parameter without a type of its own
/// copies name and type from its abstract origin.
fn recode_ftype(cu: &mut Cu, dcu: &DwarfCu, owner: FnOwner) {
    let mut parms = match owner {
        FnOwner::Type(t) => match &mut cu.types[t.0 as usize] {
            Tag::FType(f) => mem::take(&mut f.parms),
            _ => return,
        },
        FnOwner::Function(f) => match &mut cu.functions[f.0 as usize] {
            Tag::Function(f) => mem::take(&mut f.proto.parms),
            _ => return,
        },
    };
    for parm in &mut parms {
        let Some(raw_id) = parm.header.raw else { continue };
        let raw = dcu.raw(raw_id);
        if raw.type_ref == 0 {
            if raw.abstract_origin_ref == 0 {
                // Function without parameters.
                parm.header.type_id = TypeId::VOID;
                continue;
            }
            match dcu
                .find_tag_by_id(raw.abstract_origin_ref)
                .and_then(|r| cu.ref_name_and_type(r))
            {
                Some((name, type_id)) => {
                    parm.name = name;
                    parm.header.type_id = type_id;
                }
                None => warn_origin_not_found(parm.header.kind, raw),
            }
            continue;
        }
        match dcu.find_type_by_id(raw.type_ref) {
            Some(t) => parm.header.type_id = t,
            None => warn_type_not_found(parm.header.kind, raw),
        }
    }
    match owner {
        FnOwner::Type(t) => {
            if let Tag::FType(f) = &mut cu.types[t.0 as usize] {
                f.parms = parms;
            }
        }
        FnOwner::Function(f) => {
            if let Tag::Function(f) = &mut cu.functions[f.0 as usize] {
                f.proto.parms = parms;
            }
        }
    }
}

fn recode_lexblock(cu: &mut Cu, dcu: &DwarfCu, block: &mut crate::model::LexBlock) {
    for child in &mut block.children {
        match child {
            LexChild::Block(nested) => recode_lexblock(cu, dcu, nested),
            LexChild::Ref(r) => recode_lexblock_ref(cu, dcu, *r),
        }
    }
}

fn recode_lexblock_ref(cu: &mut Cu, dcu: &DwarfCu, r: TagRef) {
    let TagRef::Tag(id) = r else { return };
    let Some(header) = cu.tags[id.0 as usize].header().copied() else {
        return;
    };
    let Some(raw_id) = header.raw else { return };
    let raw = dcu.raw(raw_id).clone();

    match header.kind {
        TagKind::InlinedSubroutine => {
            match dcu.find_tag_by_id(raw.type_ref) {
                Some(TagRef::Function(f)) => {
                    if let Tag::InlineExpansion(exp) =
                        &mut cu.tags[id.0 as usize]
                    {
                        exp.origin = Some(f);
                    }
                    // The origin is the abstract instance; make sure its
                    // parameters are usable from this expansion.
                    recode_ftype(cu, dcu, FnOwner::Function(f));
                }
                _ => warn_type_not_found(header.kind, &raw),
            }
        }
        TagKind::FormalParameter if raw.type_ref == 0 => {
            match dcu
                .find_tag_by_id(raw.abstract_origin_ref)
                .and_then(|o| cu.ref_name_and_type(o))
            {
                Some((name, type_id)) => {
                    if let Tag::Parameter(p) = &mut cu.tags[id.0 as usize] {
                        p.name = name;
                        p.header.type_id = type_id;
                    }
                }
                None => warn_origin_not_found(header.kind, &raw),
            }
        }
        TagKind::Variable if raw.type_ref == 0 => {
            if raw.abstract_origin_ref == 0 {
                // Completely empty variable DIEs do occur.
                return;
            }
            match dcu
                .find_tag_by_id(raw.abstract_origin_ref)
                .and_then(|o| cu.ref_name_and_type(o))
            {
                Some((name, type_id)) => {
                    if let Tag::Variable(v) = &mut cu.tags[id.0 as usize] {
                        v.name = name;
                        v.header.type_id = type_id;
                    }
                }
                None => warn_origin_not_found(header.kind, &raw),
            }
        }
        TagKind::Label => {
            if raw.abstract_origin_ref == 0 {
                return;
            }
            match dcu
                .find_tag_by_id(raw.abstract_origin_ref)
                .and_then(|o| cu.ref_name_and_type(o))
            {
                Some((name, _)) => {
                    if let Tag::Label(l) = &mut cu.tags[id.0 as usize] {
                        l.name = name;
                    }
                }
                None => warn_origin_not_found(header.kind, &raw),
            }
        }
        _ => resolve_generic(cu, dcu, r, &raw),
    }
}

/// The default resolution: no reference means void, otherwise the types
/// hash must know the offset.
fn resolve_generic(cu: &mut Cu, dcu: &DwarfCu, r: TagRef, raw: &RawTag) {
    let resolved = if raw.type_ref == 0 {
        TypeId::VOID
    } else {
        match dcu.find_type_by_id(raw.type_ref) {
            Some(t) => t,
            None => {
                let kind = header_kind(cu, r);
                warn_type_not_found(kind, raw);
                return;
            }
        }
    };
    let header = match r {
        TagRef::Type(t) => cu.types[t.0 as usize].header_mut(),
        TagRef::Tag(t) => cu.tags[t.0 as usize].header_mut(),
        TagRef::Function(f) => cu.functions[f.0 as usize].header_mut(),
        _ => None,
    };
    if let Some(header) = header {
        header.type_id = resolved;
    }
}

fn header_kind(cu: &Cu, r: TagRef) -> TagKind {
    let header = match r {
        TagRef::Type(t) => cu.types[t.0 as usize].header(),
        TagRef::Tag(t) => cu.tags[t.0 as usize].header(),
        TagRef::Function(f) => cu.functions[f.0 as usize].header(),
        _ => None,
    };
    header.map(|h| h.kind).unwrap_or(TagKind::CompileUnit)
}

fn warn_type_not_found(kind: TagKind, raw: &RawTag) {
    warn!(
        "couldn't find {:#x} type for {:#x} ({:?})",
        raw.type_ref, raw.id, kind
    );
}

fn warn_origin_not_found(kind: TagKind, raw: &RawTag) {
    warn!(
        "couldn't find {:#x} abstract_origin for {:#x} ({:?})",
        raw.abstract_origin_ref, raw.id, kind
    );
}
