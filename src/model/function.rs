use crate::attr;
use crate::cu::{FunctionId, LoadCtx, TagRef};
use crate::die::Die;
use crate::dw::{self, TagKind};
use crate::model::TagHeader;
use crate::strings::StringId;

/// The call signature shared by function types and functions proper. The
/// header's `type_id` is the return type.
#[derive(Debug, Clone)]
pub struct FType {
    pub header: TagHeader,
    pub parms: Vec<Parameter>,
    /// Declared with a trailing `...`.
    pub unspec_parms: bool,
}

impl FType {
    pub(crate) fn read(die: &Die, ctx: &mut LoadCtx) -> Self {
        debug_assert!(
            die.tag == u32::from(TagKind::Subprogram)
                || die.tag == u32::from(TagKind::SubroutineType)
        );
        FType {
            header: ctx.header(die),
            parms: Vec::new(),
            unspec_parms: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub header: TagHeader,
    pub name: Option<StringId>,
}

impl Parameter {
    pub(crate) fn read(die: &Die, ctx: &mut LoadCtx) -> Self {
        Parameter {
            header: ctx.header(die),
            name: attr::string(die, dw::DW_AT_name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Label {
    pub header: TagHeader,
    pub name: Option<StringId>,
    pub addr: u64,
}

impl Label {
    pub(crate) fn read(die: &Die, ctx: &mut LoadCtx) -> Self {
        Label {
            header: ctx.header(die),
            name: attr::string(die, dw::DW_AT_name),
            addr: if ctx.cu.has_addr_info {
                die.low_pc().unwrap_or(0)
            } else {
                0
            },
        }
    }
}

/// One expansion of an inlined function. The call-site file and line ride
/// on the raw metadata.
#[derive(Debug, Clone)]
pub struct InlineExpansion {
    pub header: TagHeader,
    /// Resolved abstract-origin function, filled in by the resolver.
    pub origin: Option<FunctionId>,
    pub addr: u64,
    pub high_pc: u64,
    /// Code size, summed over all address ranges.
    pub size: u64,
}

impl InlineExpansion {
    pub(crate) fn read(die: &Die, ctx: &mut LoadCtx) -> Self {
        let header = ctx.header(die);
        // An inline expansion's one cross-reference is its abstract origin;
        // its call site takes the declaration-coordinate slots.
        ctx.raw_override_inline(
            &header,
            attr::type_ref(die, dw::DW_AT_abstract_origin),
            attr::string(die, dw::DW_AT_call_file),
            attr::numeric(die, dw::DW_AT_call_line) as u32,
        );

        let mut exp = InlineExpansion {
            header,
            origin: None,
            addr: 0,
            high_pc: 0,
            size: 0,
        };
        if !ctx.cu.has_addr_info {
            return exp;
        }
        exp.addr = die.low_pc().unwrap_or(0);
        exp.high_pc = die.high_pc().unwrap_or(0);
        exp.size = exp.high_pc.wrapping_sub(exp.addr);
        if exp.size == 0 {
            for &(start, end) in &die.ranges {
                exp.size += end - start;
                exp.high_pc = end;
                if exp.addr == 0 {
                    exp.addr = start;
                }
            }
        }
        exp
    }
}

/// A lexical scope inside a function: its own address range plus an
/// ordered list of what it contains.
#[derive(Debug, Clone, Default)]
pub struct LexBlock {
    pub addr: u64,
    pub size: u64,
    pub children: Vec<LexChild>,
    pub nr_inline_expansions: u16,
    pub nr_variables: u16,
    pub nr_labels: u16,
    pub nr_lexblocks: u16,
    pub size_inline_expansions: u32,
}

/// A lexical block's children are either nested blocks, owned here, or
/// references into the unit's tables.
#[derive(Debug, Clone)]
pub enum LexChild {
    Ref(TagRef),
    Block(LexBlock),
}

impl LexBlock {
    pub(crate) fn read(die: &Die, has_addr_info: bool) -> Self {
        let mut block = LexBlock::default();
        if has_addr_info {
            if let Some(low) = die.low_pc() {
                block.addr = low;
                block.size =
                    die.high_pc().map_or(0, |high| high.wrapping_sub(low));
            }
        }
        block
    }

    pub(crate) fn add_ref(&mut self, r: TagRef) {
        self.children.push(LexChild::Ref(r));
    }
}

/// A subprogram: signature, body scope and identity.
#[derive(Debug, Clone)]
pub struct Function {
    pub proto: FType,
    pub lexblock: LexBlock,
    pub name: Option<StringId>,
    pub linkage_name: Option<StringId>,
    /// Raw `DW_AT_inline` code.
    pub inlined: u8,
    pub external: bool,
    /// Had a `DW_AT_abstract_origin` reference.
    pub abstract_origin: bool,
    pub accessibility: u8,
    pub virtuality: u8,
    pub vtable_entry: Option<u64>,
}

impl Function {
    pub(crate) fn read(die: &Die, ctx: &mut LoadCtx) -> Self {
        let has_addr_info = ctx.cu.has_addr_info;
        Function {
            proto: FType::read(die, ctx),
            lexblock: LexBlock::read(die, has_addr_info),
            name: attr::string(die, dw::DW_AT_name),
            linkage_name: attr::string(die, dw::DW_AT_MIPS_linkage_name),
            inlined: attr::numeric(die, dw::DW_AT_inline) as u8,
            external: die.has_attr(dw::DW_AT_external),
            abstract_origin: die.has_attr(dw::DW_AT_abstract_origin),
            accessibility: attr::numeric(die, dw::DW_AT_accessibility) as u8,
            virtuality: attr::numeric(die, dw::DW_AT_virtuality) as u8,
            vtable_entry: die
                .has_attr(dw::DW_AT_vtable_elem_location)
                .then(|| attr::offset(die, dw::DW_AT_vtable_elem_location)),
        }
    }
}
