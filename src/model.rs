//! The in-memory model one compilation unit is loaded into.
//!
//! Every DIE the loader recognizes becomes one [`Tag`] variant. The common
//! fields every variant carries (kind, resolved type index, top-level flag,
//! raw-metadata link) are factored into [`TagHeader`].

pub mod array;
pub mod base;
pub mod composite;
pub mod enumeration;
pub mod function;
pub mod member;
pub mod namespace;
pub mod variable;

pub use array::ArrayType;
pub use base::BaseType;
pub use composite::Composite;
pub use enumeration::{Enumeration, Enumerator};
pub use function::{
    FType, Function, InlineExpansion, Label, LexBlock, LexChild, Parameter,
};
pub use member::Member;
pub use namespace::Namespace;
pub use variable::{Location, Variable};

use crate::cu::{RawId, TagRef, TypeId};
use crate::dw::TagKind;
use crate::strings::StringId;

/// Fields shared by every materialized DIE.
#[derive(Debug, Clone, Copy)]
pub struct TagHeader {
    pub kind: TagKind,
    /// Resolved type reference: an index into the unit's types table,
    /// [`TypeId::VOID`] when the DIE had no `DW_AT_type`.
    pub type_id: TypeId,
    /// Direct child of the compilation-unit root.
    pub top_level: bool,
    /// Link to the raw DWARF metadata used during resolution. `None` for
    /// synthetic tags created by bitfield recoding, and stale once the
    /// raw arena has been released.
    pub(crate) raw: Option<RawId>,
}

impl TagHeader {
    pub(crate) fn new(kind: TagKind, raw: RawId) -> Self {
        TagHeader {
            kind,
            type_id: TypeId::VOID,
            top_level: false,
            raw: Some(raw),
        }
    }

    /// Header for a tag synthesized after load, with no DWARF backing.
    pub(crate) fn synthetic(kind: TagKind) -> Self {
        TagHeader {
            kind,
            type_id: TypeId::VOID,
            top_level: false,
            raw: None,
        }
    }
}

/// A typedef: a named alias for its target type.
#[derive(Debug, Clone)]
pub struct Typedef {
    pub header: TagHeader,
    pub name: Option<StringId>,
}

/// `const`, `volatile`, pointer and reference types: nothing beyond the
/// header, the target lives in `header.type_id`.
#[derive(Debug, Clone)]
pub struct Wrapper {
    pub header: TagHeader,
}

/// `imported_module` / `imported_declaration`. The import target can be a
/// namespace, a type or a plain tag, so the resolved reference is a full
/// [`TagRef`] rather than a types-table index.
#[derive(Debug, Clone)]
pub struct Import {
    pub header: TagHeader,
    pub target: Option<TagRef>,
}

/// Pointer-to-member type: carries the class it is bound to on top of the
/// member type in the header.
#[derive(Debug, Clone)]
pub struct PtrToMember {
    pub header: TagHeader,
    pub containing_type: TypeId,
}

#[derive(Debug, Clone, Default)]
pub enum Tag {
    /// The reserved entry at index 0 of every types table. Never built by
    /// the factory; also used as the placeholder while an aggregate's slot
    /// is reserved during construction.
    #[default]
    Void,
    Base(BaseType),
    Typedef(Typedef),
    Wrapper(Wrapper),
    Import(Import),
    PtrToMember(PtrToMember),
    Array(ArrayType),
    Enumeration(Enumeration),
    Composite(Composite),
    Namespace(Namespace),
    Member(Member),
    Parameter(Parameter),
    Variable(Variable),
    Label(Label),
    InlineExpansion(InlineExpansion),
    FType(FType),
    Function(Function),
}

impl Tag {
    pub fn header(&self) -> Option<&TagHeader> {
        match self {
            Tag::Void => None,
            Tag::Base(t) => Some(&t.header),
            Tag::Typedef(t) => Some(&t.header),
            Tag::Wrapper(t) => Some(&t.header),
            Tag::Import(t) => Some(&t.header),
            Tag::PtrToMember(t) => Some(&t.header),
            Tag::Array(t) => Some(&t.header),
            Tag::Enumeration(t) => Some(&t.header),
            Tag::Composite(t) => Some(&t.header),
            Tag::Namespace(t) => Some(&t.header),
            Tag::Member(t) => Some(&t.header),
            Tag::Parameter(t) => Some(&t.header),
            Tag::Variable(t) => Some(&t.header),
            Tag::Label(t) => Some(&t.header),
            Tag::InlineExpansion(t) => Some(&t.header),
            Tag::FType(t) => Some(&t.header),
            Tag::Function(t) => Some(&t.proto.header),
        }
    }

    pub fn header_mut(&mut self) -> Option<&mut TagHeader> {
        match self {
            Tag::Void => None,
            Tag::Base(t) => Some(&mut t.header),
            Tag::Typedef(t) => Some(&mut t.header),
            Tag::Wrapper(t) => Some(&mut t.header),
            Tag::Import(t) => Some(&mut t.header),
            Tag::PtrToMember(t) => Some(&mut t.header),
            Tag::Array(t) => Some(&mut t.header),
            Tag::Enumeration(t) => Some(&mut t.header),
            Tag::Composite(t) => Some(&mut t.header),
            Tag::Namespace(t) => Some(&mut t.header),
            Tag::Member(t) => Some(&mut t.header),
            Tag::Parameter(t) => Some(&mut t.header),
            Tag::Variable(t) => Some(&mut t.header),
            Tag::Label(t) => Some(&mut t.header),
            Tag::InlineExpansion(t) => Some(&mut t.header),
            Tag::FType(t) => Some(&mut t.header),
            Tag::Function(t) => Some(&mut t.proto.header),
        }
    }

    pub fn kind(&self) -> Option<TagKind> {
        self.header().map(|h| h.kind)
    }

    /// The name of a named type, for specification copies and the shared
    /// lookups bitfield recoding performs.
    pub fn type_name(&self) -> Option<StringId> {
        match self {
            Tag::Base(t) => t.name,
            Tag::Typedef(t) => t.name,
            Tag::Enumeration(t) => t.name,
            Tag::Composite(t) => t.name,
            Tag::Namespace(t) => t.name,
            _ => None,
        }
    }
}
