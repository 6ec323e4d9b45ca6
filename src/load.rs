//! Recursive descent over one unit's DIE tree.
//!
//! Construction is phase one of the two-phase load: every recognized DIE
//! becomes a tag in one of the unit's dense tables (or inside its owning
//! aggregate), hashed by DIE offset, with all cross-references still raw.
//! Phase two is the resolver.

use anyhow::{bail, Result};
use log::warn;

use crate::attr;
use crate::cu::{Cu, DwarfCu, FnOwner, LoadCtx, TagRef};
use crate::die::Die;
use crate::dw::{self, TagKind};
use crate::model::{
    ArrayType, BaseType, Composite, Enumeration, FType, Function, Import,
    InlineExpansion, Label, LexBlock, Member, Namespace, Parameter,
    PtrToMember, Tag, Typedef, Variable, Wrapper,
};

/// Materialize one unit. The root DIE must be a compile unit; its children
/// become the top-level tags.
pub(crate) fn process_unit(
    root: &Die,
    cu: &mut Cu,
    dcu: &mut DwarfCu,
) -> Result<()> {
    if root.tag != u32::from(TagKind::CompileUnit) {
        bail!("expected a compile unit root, got tag {:#x}", root.tag);
    }
    cu.language = attr::numeric(root, dw::DW_AT_language);

    let mut ctx = LoadCtx { cu, dcu };
    for child in &root.children {
        process_tag(child, &mut ctx, true);
    }
    Ok(())
}

/// The top-level dispatch: build a tag for `die`, register it in the right
/// table and hash it. Returns `None` for kinds the loader skips.
fn process_tag(
    die: &Die,
    ctx: &mut LoadCtx,
    top_level: bool,
) -> Option<TagRef> {
    let Ok(kind) = TagKind::try_from(die.tag) else {
        ctx.tag_not_handled(die);
        return None;
    };
    let mut tag = match kind {
        TagKind::ArrayType => Tag::Array(ArrayType::read(die, ctx)),
        TagKind::BaseType => {
            warn_leaf_children(die, kind);
            Tag::Base(BaseType::read(die, ctx))
        }
        TagKind::ConstType
        | TagKind::PointerType
        | TagKind::ReferenceType
        | TagKind::VolatileType => {
            warn_leaf_children(die, kind);
            Tag::Wrapper(Wrapper {
                header: ctx.header(die),
            })
        }
        TagKind::ImportedDeclaration | TagKind::ImportedModule => {
            Tag::Import(Import {
                header: ctx.header(die),
                target: None,
            })
        }
        TagKind::PtrToMemberType => Tag::PtrToMember(PtrToMember {
            header: ctx.header(die),
            containing_type: crate::cu::TypeId::VOID,
        }),
        TagKind::Typedef => {
            warn_leaf_children(die, kind);
            Tag::Typedef(Typedef {
                header: ctx.header(die),
                name: attr::string(die, dw::DW_AT_name),
            })
        }
        TagKind::EnumerationType => {
            Tag::Enumeration(Enumeration::read(die, ctx))
        }
        TagKind::Namespace => return process_namespace(die, ctx, top_level),
        TagKind::ClassType
        | TagKind::InterfaceType
        | TagKind::StructureType
        | TagKind::UnionType => {
            return process_composite(die, ctx, top_level)
        }
        TagKind::Subprogram => return process_function(die, ctx, top_level),
        TagKind::SubroutineType => {
            return process_subroutine_type(die, ctx, top_level)
        }
        TagKind::Variable => Tag::Variable(Variable::read(die, ctx)),
        // Members and parameters do turn up away from their usual parents,
        // typically when an inline expansion was optimized down to loose
        // tags. They stay reachable for abstract-origin lookups.
        TagKind::Member | TagKind::Inheritance => {
            Tag::Member(Member::read(die, ctx))
        }
        TagKind::FormalParameter => {
            Tag::Parameter(Parameter::read(die, ctx))
        }
        _ => {
            ctx.tag_not_handled(die);
            return None;
        }
    };
    if let Some(header) = tag.header_mut() {
        header.top_level = top_level;
    }
    Some(ctx.register(tag, die.offset))
}

fn warn_leaf_children(die: &Die, kind: TagKind) {
    if die.has_children() {
        warn!("{:?} at {:#x} with children", kind, die.offset);
    }
}

fn process_namespace(
    die: &Die,
    ctx: &mut LoadCtx,
    top_level: bool,
) -> Option<TagRef> {
    let id = ctx.cu.reserve_type();
    let mut ns = Namespace::read(die, ctx);
    ns.header.top_level = top_level;
    for child in &die.children {
        if let Some(r) = process_tag(child, ctx, false) {
            ns.children.push(r);
        }
    }
    ctx.register_type_at(id, Tag::Namespace(ns), die.offset);
    Some(TagRef::Type(id))
}

fn process_composite(
    die: &Die,
    ctx: &mut LoadCtx,
    top_level: bool,
) -> Option<TagRef> {
    let id = ctx.cu.reserve_type();
    let mut composite = Composite::read(die, ctx);
    composite.header.top_level = top_level;
    for child in &die.children {
        match TagKind::try_from(child.tag) {
            Ok(TagKind::Member) | Ok(TagKind::Inheritance) => {
                let member = Member::read(child, ctx);
                let idx = composite.members.len() as u32;
                ctx.hash_owned(
                    TagRef::Member(id, idx),
                    member.header.raw,
                    child.offset,
                );
                composite.members.push(member);
            }
            _ => {
                if let Some(r) = process_tag(child, ctx, false) {
                    if let TagRef::Function(fid) = r {
                        if let Some(Tag::Function(f)) = ctx.cu.function(fid)
                        {
                            if f.vtable_entry.is_some() {
                                composite.vtable.push(fid);
                            }
                        }
                    }
                    composite.children.push(r);
                }
            }
        }
    }
    ctx.register_type_at(id, Tag::Composite(composite), die.offset);
    Some(TagRef::Type(id))
}

fn process_subroutine_type(
    die: &Die,
    ctx: &mut LoadCtx,
    top_level: bool,
) -> Option<TagRef> {
    let id = ctx.cu.reserve_type();
    let mut ftype = FType::read(die, ctx);
    ftype.header.top_level = top_level;
    for child in &die.children {
        match TagKind::try_from(child.tag) {
            Ok(TagKind::FormalParameter) => {
                let parm = Parameter::read(child, ctx);
                let idx = ftype.parms.len() as u32;
                ctx.hash_owned(
                    TagRef::Parameter(FnOwner::Type(id), idx),
                    parm.header.raw,
                    child.offset,
                );
                ftype.parms.push(parm);
            }
            Ok(TagKind::UnspecifiedParameters) => {
                ftype.unspec_parms = true;
            }
            _ => {
                process_tag(child, ctx, false);
            }
        }
    }
    ctx.register_type_at(id, Tag::FType(ftype), die.offset);
    Some(TagRef::Type(id))
}

fn process_function(
    die: &Die,
    ctx: &mut LoadCtx,
    top_level: bool,
) -> Option<TagRef> {
    let id = ctx.cu.reserve_function();
    let mut function = Function::read(die, ctx);
    function.proto.header.top_level = top_level;
    process_body(
        &die.children,
        Some((&mut function.proto, FnOwner::Function(id))),
        &mut function.lexblock,
        ctx,
    );
    ctx.register_function_at(id, Tag::Function(function), die.offset);
    Some(TagRef::Function(id))
}

/// Walk the children of a subprogram or lexical block. `ftype` is present
/// only at the subprogram level; parameters found deeper belong to the
/// enclosing block instead.
fn process_body(
    children: &[Die],
    mut ftype: Option<(&mut FType, FnOwner)>,
    block: &mut LexBlock,
    ctx: &mut LoadCtx,
) {
    for child in children {
        let Ok(kind) = TagKind::try_from(child.tag) else {
            ctx.tag_not_handled(child);
            continue;
        };
        match kind {
            TagKind::FormalParameter => {
                let parm = Parameter::read(child, ctx);
                match ftype.as_mut() {
                    Some((ft, owner)) => {
                        let idx = ft.parms.len() as u32;
                        ctx.hash_owned(
                            TagRef::Parameter(*owner, idx),
                            parm.header.raw,
                            child.offset,
                        );
                        ft.parms.push(parm);
                    }
                    // Compilers do emit parameters on optimized-away
                    // scopes; they stay referenceable as abstract origins.
                    None => {
                        let r = ctx.register(Tag::Parameter(parm), child.offset);
                        block.add_ref(r);
                    }
                }
            }
            TagKind::UnspecifiedParameters => {
                if let Some((ft, _)) = ftype.as_mut() {
                    ft.unspec_parms = true;
                }
            }
            TagKind::Variable => {
                let var = Variable::read(child, ctx);
                let r = ctx.register(Tag::Variable(var), child.offset);
                block.add_ref(r);
                block.nr_variables += 1;
            }
            TagKind::Label => {
                let label = Label::read(child, ctx);
                let r = ctx.register(Tag::Label(label), child.offset);
                block.add_ref(r);
                block.nr_labels += 1;
            }
            TagKind::InlinedSubroutine => {
                let (r, size) = process_inline_expansion(child, ctx);
                block.add_ref(r);
                block.nr_inline_expansions += 1;
                block.size_inline_expansions += size as u32;
            }
            TagKind::LexicalBlock => {
                let mut nested = LexBlock::read(child, ctx.cu.has_addr_info);
                process_body(&child.children, None, &mut nested, ctx);
                block.children
                    .push(crate::model::LexChild::Block(nested));
                block.nr_lexblocks += 1;
            }
            _ => {
                process_tag(child, ctx, false);
            }
        }
    }
}

/// Inline expansions register their children first; a nested expansion may
/// be the abstract origin of tags around it.
fn process_inline_expansion(die: &Die, ctx: &mut LoadCtx) -> (TagRef, u64) {
    let exp = InlineExpansion::read(die, ctx);
    let size = exp.size;
    for child in &die.children {
        let Ok(kind) = TagKind::try_from(child.tag) else {
            ctx.tag_not_handled(child);
            continue;
        };
        match kind {
            TagKind::LexicalBlock => {
                // The block itself has nowhere to hang; its contents still
                // land in the tables and stay reachable by offset.
                let mut orphan = LexBlock::read(child, ctx.cu.has_addr_info);
                process_body(&child.children, None, &mut orphan, ctx);
            }
            TagKind::FormalParameter => {}
            TagKind::InlinedSubroutine => {
                process_inline_expansion(child, ctx);
            }
            _ => {
                process_tag(child, ctx, false);
            }
        }
    }
    let r = ctx.register(Tag::InlineExpansion(exp), die.offset);
    (r, size)
}
