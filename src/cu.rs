//! One compilation unit: the three dense tag tables plus, while loading,
//! the offset-keyed side state the resolver rewrites references through.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, OnceLock};

use log::warn;

use crate::attr;
use crate::die::Die;
use crate::dw::{self, TagKind};
use crate::model::{Tag, TagHeader};
use crate::strings::{strings, StringId};

/// Index into a unit's types table. Index 0 is the void type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

impl TypeId {
    pub const VOID: TypeId = TypeId(0);

    pub fn is_void(self) -> bool {
        self == TypeId::VOID
    }
}

/// Index into a unit's tags table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TagId(pub u32);

/// Index into a unit's functions table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FunctionId(pub u32);

/// Index into the per-unit raw-metadata arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawId(pub(crate) u32);

/// The tag owning a parameter list: a function type in the types table or
/// a function in the functions table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FnOwner {
    Type(TypeId),
    Function(FunctionId),
}

/// Address of any tag the per-unit offset hashes can reach: a table entry,
/// a member owned by a composite, or a parameter owned by a signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagRef {
    Type(TypeId),
    Tag(TagId),
    Function(FunctionId),
    Member(TypeId, u32),
    Parameter(FnOwner, u32),
}

/// The raw DWARF cross-reference record carried alongside every tag while
/// the unit loads. All `*_ref` fields are DIE offsets, 0 when absent.
#[derive(Debug, Clone, Default)]
pub struct RawTag {
    /// The DIE's own offset, unique within the unit.
    pub id: u64,
    pub type_ref: u64,
    pub abstract_origin_ref: u64,
    pub specification_ref: u64,
    pub containing_type_ref: u64,
    pub decl_file: Option<StringId>,
    pub decl_line: u32,
    /// Dense index assigned when the tag entered its table.
    pub small_id: u32,
}

/// Load-time state: the raw arena plus the two offset hashes. Dropped when
/// the unit is done, except that the arena moves into the [`Cu`] when the
/// caller asked for extra debug info.
#[derive(Default)]
pub(crate) struct DwarfCu {
    pub(crate) raw: Vec<RawTag>,
    /// Every tag, keyed by DIE offset.
    pub(crate) by_id_any: HashMap<u64, TagRef>,
    /// Type-kind tags only.
    pub(crate) by_id_type: HashMap<u64, TypeId>,
    /// Declaration files repeat in long runs; intern each one once.
    last_decl_file: Option<(String, StringId)>,
}

impl DwarfCu {
    pub(crate) fn find_type_by_id(&self, off: u64) -> Option<TypeId> {
        if off == 0 {
            return None;
        }
        self.by_id_type.get(&off).copied()
    }

    pub(crate) fn find_tag_by_id(&self, off: u64) -> Option<TagRef> {
        if off == 0 {
            return None;
        }
        self.by_id_any.get(&off).copied()
    }

    pub(crate) fn hash(&mut self, off: u64, r: TagRef) {
        let prev = self.by_id_any.insert(off, r);
        debug_assert!(prev.is_none(), "duplicate DIE offset {off:#x}");
        if let TagRef::Type(t) = r {
            self.by_id_type.insert(off, t);
        }
    }

    pub(crate) fn raw(&self, id: RawId) -> &RawTag {
        &self.raw[id.0 as usize]
    }
}

pub struct Cu {
    /// Name of the unit (the root DIE's `DW_AT_name`, possibly empty).
    pub name: String,
    /// File the unit was loaded from.
    pub filename: String,
    pub build_id: Option<Vec<u8>>,
    /// Raw `DW_AT_language` code of the root DIE.
    pub language: u64,
    /// Pointer size in bytes, from the unit header.
    pub addr_size: u8,
    pub extra_dbg_info: bool,
    pub has_addr_info: bool,
    pub uses_global_strings: bool,
    /// Types table; entry 0 is always [`Tag::Void`].
    pub types: Vec<Tag>,
    pub tags: Vec<Tag>,
    pub functions: Vec<Tag>,
    /// Raw metadata, retained only with `extra_dbg_info`.
    pub(crate) raw_info: Option<Vec<RawTag>>,
}

impl Cu {
    pub(crate) fn new(
        name: String,
        filename: String,
        addr_size: u8,
        build_id: Option<Vec<u8>>,
        extra_dbg_info: bool,
        has_addr_info: bool,
    ) -> Self {
        Cu {
            name,
            filename,
            build_id,
            language: 0,
            addr_size,
            extra_dbg_info,
            has_addr_info,
            uses_global_strings: true,
            types: vec![Tag::Void],
            tags: Vec::new(),
            functions: Vec::new(),
            raw_info: None,
        }
    }

    pub fn type_tag(&self, id: TypeId) -> Option<&Tag> {
        self.types.get(id.0 as usize)
    }

    pub fn tag(&self, id: TagId) -> Option<&Tag> {
        self.tags.get(id.0 as usize)
    }

    pub fn function(&self, id: FunctionId) -> Option<&Tag> {
        self.functions.get(id.0 as usize)
    }

    pub(crate) fn add_type(&mut self, tag: Tag) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(tag);
        id
    }

    pub(crate) fn add_tag(&mut self, tag: Tag) -> TagId {
        let id = TagId(self.tags.len() as u32);
        self.tags.push(tag);
        id
    }

    pub(crate) fn add_function(&mut self, tag: Tag) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(tag);
        id
    }

    /// Reserve a types-table slot for an aggregate whose children need to
    /// know its index before it is finished.
    pub(crate) fn reserve_type(&mut self) -> TypeId {
        self.add_type(Tag::Void)
    }

    pub(crate) fn reserve_function(&mut self) -> FunctionId {
        self.add_function(Tag::Void)
    }

    /// Name and resolved type of the tag `r` points at, for the copies the
    /// resolver makes along abstract-origin edges.
    pub(crate) fn ref_name_and_type(
        &self,
        r: TagRef,
    ) -> Option<(Option<StringId>, TypeId)> {
        let tag = match r {
            TagRef::Type(t) => self.type_tag(t)?,
            TagRef::Tag(t) => self.tag(t)?,
            TagRef::Function(f) => self.function(f)?,
            TagRef::Member(t, i) => {
                let m = match self.type_tag(t)? {
                    Tag::Composite(c) => c.members.get(i as usize)?,
                    _ => return None,
                };
                return Some((m.name, m.header.type_id));
            }
            TagRef::Parameter(owner, i) => {
                let parms = match owner {
                    FnOwner::Type(t) => match self.type_tag(t)? {
                        Tag::FType(f) => &f.parms,
                        _ => return None,
                    },
                    FnOwner::Function(f) => match self.function(f)? {
                        Tag::Function(f) => &f.proto.parms,
                        _ => return None,
                    },
                };
                let p = parms.get(i as usize)?;
                return Some((p.name, p.header.type_id));
            }
        };
        match tag {
            Tag::Variable(v) => Some((v.name, v.header.type_id)),
            Tag::Label(l) => Some((l.name, l.header.type_id)),
            Tag::Parameter(p) => Some((p.name, p.header.type_id)),
            Tag::Member(m) => Some((m.name, m.header.type_id)),
            Tag::Function(f) => Some((f.name, f.proto.header.type_id)),
            other => {
                other.header().map(|h| (other.type_name(), h.type_id))
            }
        }
    }

    /// Declaration file of a tag, available with `extra_dbg_info`.
    pub fn decl_file(&self, header: &TagHeader) -> Option<String> {
        let raw = self.raw_entry(header)?;
        strings().lookup(raw.decl_file?)
    }

    /// Declaration line of a tag, available with `extra_dbg_info`.
    pub fn decl_line(&self, header: &TagHeader) -> Option<u32> {
        Some(self.raw_entry(header)?.decl_line)
    }

    /// Original DIE offset of a tag, available with `extra_dbg_info`.
    pub fn orig_id(&self, header: &TagHeader) -> Option<u64> {
        Some(self.raw_entry(header)?.id)
    }

    /// Original raw type reference of a tag, available with
    /// `extra_dbg_info`.
    pub fn orig_type(&self, header: &TagHeader) -> Option<u64> {
        Some(self.raw_entry(header)?.type_ref)
    }

    fn raw_entry(&self, header: &TagHeader) -> Option<&RawTag> {
        self.raw_info.as_ref()?.get(header.raw?.0 as usize)
    }
}

/// Everything the tag factory needs while descending one unit.
pub(crate) struct LoadCtx<'a> {
    pub(crate) cu: &'a mut Cu,
    pub(crate) dcu: &'a mut DwarfCu,
}

impl LoadCtx<'_> {
    /// Allocate the raw-metadata record for `die` and hand back the tag
    /// header cross-linked to it.
    pub(crate) fn header(&mut self, die: &Die) -> TagHeader {
        let kind = TagKind::try_from(die.tag)
            .expect("factory dispatched on an unrecognized tag kind");
        let type_at = match kind {
            TagKind::ImportedModule | TagKind::ImportedDeclaration => {
                dw::DW_AT_import
            }
            _ => dw::DW_AT_type,
        };
        let (decl_file, decl_line) = if self.cu.extra_dbg_info {
            (self.intern_decl_file(die), die.decl_line())
        } else {
            (None, 0)
        };
        let raw = RawTag {
            id: die.offset,
            type_ref: attr::type_ref(die, type_at),
            abstract_origin_ref: attr::type_ref(
                die,
                dw::DW_AT_abstract_origin,
            ),
            specification_ref: attr::type_ref(die, dw::DW_AT_specification),
            containing_type_ref: attr::type_ref(
                die,
                dw::DW_AT_containing_type,
            ),
            decl_file,
            decl_line,
            small_id: 0,
        };
        let raw_id = RawId(self.dcu.raw.len() as u32);
        self.dcu.raw.push(raw);
        TagHeader::new(kind, raw_id)
    }

    fn intern_decl_file(&mut self, die: &Die) -> Option<StringId> {
        let file = die.decl_file()?;
        if let Some((last, id)) = &self.dcu.last_decl_file {
            if last == file {
                return Some(*id);
            }
        }
        let id = strings().add(file);
        self.dcu.last_decl_file = Some((file.to_owned(), id));
        Some(id)
    }

    /// Inline expansions reuse the raw record differently: the type slot
    /// holds the abstract origin and the declaration coordinates hold the
    /// call site.
    pub(crate) fn raw_override_inline(
        &mut self,
        header: &TagHeader,
        origin: u64,
        call_file: Option<StringId>,
        call_line: u32,
    ) {
        if let Some(raw_id) = header.raw {
            let raw = &mut self.dcu.raw[raw_id.0 as usize];
            raw.type_ref = origin;
            raw.decl_file = call_file;
            raw.decl_line = call_line;
        }
    }

    /// Route a finished tag into the right dense table, hash it under its
    /// DIE offset and record the assigned index in its raw metadata.
    pub(crate) fn register(&mut self, tag: Tag, offset: u64) -> TagRef {
        let kind = tag.kind().expect("registering a void tag");
        let raw = tag.header().and_then(|h| h.raw);
        let r = if kind.is_type() {
            TagRef::Type(self.cu.add_type(tag))
        } else if kind == TagKind::Subprogram {
            TagRef::Function(self.cu.add_function(tag))
        } else {
            TagRef::Tag(self.cu.add_tag(tag))
        };
        self.finish(r, raw, offset);
        r
    }

    /// Fill a previously reserved types-table slot.
    pub(crate) fn register_type_at(
        &mut self,
        id: TypeId,
        tag: Tag,
        offset: u64,
    ) {
        let raw = tag.header().and_then(|h| h.raw);
        self.cu.types[id.0 as usize] = tag;
        self.finish(TagRef::Type(id), raw, offset);
    }

    /// Fill a previously reserved functions-table slot.
    pub(crate) fn register_function_at(
        &mut self,
        id: FunctionId,
        tag: Tag,
        offset: u64,
    ) {
        let raw = tag.header().and_then(|h| h.raw);
        self.cu.functions[id.0 as usize] = tag;
        self.finish(TagRef::Function(id), raw, offset);
    }

    /// Hash a tag that lives inside another tag rather than in a table:
    /// a composite's member or a signature's parameter.
    pub(crate) fn hash_owned(
        &mut self,
        r: TagRef,
        raw: Option<RawId>,
        offset: u64,
    ) {
        self.finish(r, raw, offset);
    }

    fn finish(&mut self, r: TagRef, raw: Option<RawId>, offset: u64) {
        if let Some(raw_id) = raw {
            self.dcu.raw[raw_id.0 as usize].small_id = match r {
                TagRef::Type(TypeId(i)) => i,
                TagRef::Tag(TagId(i)) => i,
                TagRef::Function(FunctionId(i)) => i,
                TagRef::Member(_, i) | TagRef::Parameter(_, i) => i,
            };
        }
        self.dcu.hash(offset, r);
    }

    /// Warn about a DIE kind the loader does not materialize, once per
    /// kind for the whole process.
    pub(crate) fn tag_not_handled(&mut self, die: &Die) {
        static WARNED: OnceLock<Mutex<HashSet<u32>>> = OnceLock::new();
        let mut warned =
            WARNED.get_or_init(Mutex::default).lock().unwrap();
        if warned.insert(die.tag) {
            warn!(
                "tag {:#x} @ <{:#x}> not handled",
                die.tag, die.offset
            );
        }
    }
}
