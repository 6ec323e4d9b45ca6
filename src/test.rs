use rstest::rstest;

use std::sync::Arc;

use anyhow::Result;

use crate::attr;
use crate::cu::{Cu, DwarfCu, TagRef, TypeId};
use crate::die::{AttrValue, Die, DwarfHost, DwarfModule, Unit};
use crate::dw::{self, TagKind};
use crate::model::{
    ArrayType, BaseType, Composite, Enumeration, FType, Function, Import,
    InlineExpansion, Label, LexChild, Location, PtrToMember, Tag, Typedef,
    Variable, Wrapper,
};
use crate::strings::{strings, StringId};
use crate::{load, load_unit, resolve, LoadConf, Steal};

fn die(kind: TagKind, offset: u64) -> Die {
    Die::new(kind.into(), offset)
}

trait DieExt: Sized {
    fn u(self, at: u32, value: u64) -> Self;
    fn s(self, at: u32, value: &str) -> Self;
    fn r(self, at: u32, target: u64) -> Self;
    fn f(self, at: u32) -> Self;
    fn b(self, at: u32, bytes: &[u8]) -> Self;
    fn a(self, at: u32, addr: u64) -> Self;
    fn child(self, child: Die) -> Self;
    fn range(self, start: u64, end: u64) -> Self;
}

impl DieExt for Die {
    fn u(mut self, at: u32, value: u64) -> Self {
        self.attrs.push((at, AttrValue::Udata(value)));
        self
    }

    fn s(mut self, at: u32, value: &str) -> Self {
        self.attrs.push((at, AttrValue::String(value.to_owned())));
        self
    }

    fn r(mut self, at: u32, target: u64) -> Self {
        self.attrs.push((at, AttrValue::Ref(target)));
        self
    }

    fn f(mut self, at: u32) -> Self {
        self.attrs.push((at, AttrValue::Flag(true)));
        self
    }

    fn b(mut self, at: u32, bytes: &[u8]) -> Self {
        self.attrs.push((at, AttrValue::Block(bytes.to_vec())));
        self
    }

    fn a(mut self, at: u32, addr: u64) -> Self {
        self.attrs.push((at, AttrValue::Addr(addr)));
        self
    }

    fn child(mut self, child: Die) -> Self {
        self.children.push(child);
        self
    }

    fn range(mut self, start: u64, end: u64) -> Self {
        self.ranges.push((start, end));
        self
    }
}

fn unit_named(name: &str, children: Vec<Die>) -> Unit {
    let mut root = die(TagKind::CompileUnit, 0x0b)
        .s(dw::DW_AT_name, name)
        .u(dw::DW_AT_language, 1);
    root.children = children;
    Unit {
        root,
        pointer_size: 8,
        offset_size: 8,
    }
}

fn unit_of(children: Vec<Die>) -> Unit {
    unit_named("crt.c", children)
}

fn load_with(children: Vec<Die>, conf: &LoadConf) -> Cu {
    load_unit(unit_of(children), "a.out", None, conf).unwrap()
}

fn load_dies(children: Vec<Die>) -> Cu {
    load_with(
        children,
        &LoadConf {
            get_addr_info: true,
            ..LoadConf::default()
        },
    )
}

fn int_die(offset: u64) -> Die {
    die(TagKind::BaseType, offset)
        .s(dw::DW_AT_name, "int")
        .u(dw::DW_AT_byte_size, 4)
        .u(dw::DW_AT_encoding, dw::DW_ATE_signed)
}

fn name_str(id: Option<StringId>) -> String {
    id.and_then(|i| strings().lookup(i)).unwrap_or_default()
}

fn as_base(tag: &Tag) -> &BaseType {
    match tag {
        Tag::Base(b) => b,
        other => panic!("expected base type, got {other:?}"),
    }
}

fn as_composite(tag: &Tag) -> &Composite {
    match tag {
        Tag::Composite(c) => c,
        other => panic!("expected composite, got {other:?}"),
    }
}

fn as_enumeration(tag: &Tag) -> &Enumeration {
    match tag {
        Tag::Enumeration(e) => e,
        other => panic!("expected enumeration, got {other:?}"),
    }
}

fn as_function(tag: &Tag) -> &Function {
    match tag {
        Tag::Function(f) => f,
        other => panic!("expected function, got {other:?}"),
    }
}

fn as_ftype(tag: &Tag) -> &FType {
    match tag {
        Tag::FType(f) => f,
        other => panic!("expected function type, got {other:?}"),
    }
}

fn as_variable(tag: &Tag) -> &Variable {
    match tag {
        Tag::Variable(v) => v,
        other => panic!("expected variable, got {other:?}"),
    }
}

fn as_typedef(tag: &Tag) -> &Typedef {
    match tag {
        Tag::Typedef(t) => t,
        other => panic!("expected typedef, got {other:?}"),
    }
}

fn as_wrapper(tag: &Tag) -> &Wrapper {
    match tag {
        Tag::Wrapper(w) => w,
        other => panic!("expected wrapper, got {other:?}"),
    }
}

fn as_array(tag: &Tag) -> &ArrayType {
    match tag {
        Tag::Array(a) => a,
        other => panic!("expected array, got {other:?}"),
    }
}

fn as_import(tag: &Tag) -> &Import {
    match tag {
        Tag::Import(i) => i,
        other => panic!("expected import, got {other:?}"),
    }
}

fn as_inline(tag: &Tag) -> &InlineExpansion {
    match tag {
        Tag::InlineExpansion(i) => i,
        other => panic!("expected inline expansion, got {other:?}"),
    }
}

fn as_label(tag: &Tag) -> &Label {
    match tag {
        Tag::Label(l) => l,
        other => panic!("expected label, got {other:?}"),
    }
}

fn as_ptr_to_member(tag: &Tag) -> &PtrToMember {
    match tag {
        Tag::PtrToMember(p) => p,
        other => panic!("expected pointer to member, got {other:?}"),
    }
}

// --- bitfield recoding ---

#[test]
fn int_bitfield_recoding() {
    let cu = load_dies(vec![
        int_die(0x10),
        die(TagKind::StructureType, 0x20)
            .s(dw::DW_AT_name, "s")
            .u(dw::DW_AT_byte_size, 4)
            .child(
                die(TagKind::Member, 0x21)
                    .s(dw::DW_AT_name, "a")
                    .r(dw::DW_AT_type, 0x10)
                    .u(dw::DW_AT_bit_size, 3),
            ),
    ]);
    // void, int:32, struct s, and the synthesized int:3
    assert_eq!(cu.types.len(), 4);
    let s = as_composite(&cu.types[2]);
    let member = &s.members[0];
    assert_eq!(member.header.type_id, TypeId(3));
    assert_eq!(member.byte_size, 4);
    assert_eq!(member.bit_size, 3);

    let recoded = as_base(&cu.types[3]);
    assert_eq!(name_str(recoded.name), "int");
    assert_eq!(recoded.bit_size, 3);
    assert!(recoded.header.top_level);
    assert_eq!(as_base(&cu.types[1]).bit_size, 32);
}

#[test]
fn bitfield_recoding_is_shared() {
    let cu = load_dies(vec![
        int_die(0x10),
        die(TagKind::StructureType, 0x20)
            .u(dw::DW_AT_byte_size, 4)
            .child(
                die(TagKind::Member, 0x21)
                    .s(dw::DW_AT_name, "a")
                    .r(dw::DW_AT_type, 0x10)
                    .u(dw::DW_AT_bit_size, 3),
            )
            .child(
                die(TagKind::Member, 0x22)
                    .s(dw::DW_AT_name, "b")
                    .r(dw::DW_AT_type, 0x10)
                    .u(dw::DW_AT_bit_size, 3)
                    .u(dw::DW_AT_bit_offset, 3),
            ),
    ]);
    let s = as_composite(&cu.types[2]);
    assert_eq!(s.members[0].header.type_id, s.members[1].header.type_id);
    assert_eq!(cu.types.len(), 4);
}

#[test]
fn enumeration_bitfield_shares_enumerators() {
    let cu = load_dies(vec![
        die(TagKind::EnumerationType, 0x10)
            .s(dw::DW_AT_name, "e")
            .u(dw::DW_AT_byte_size, 4)
            .child(
                die(TagKind::Enumerator, 0x11)
                    .s(dw::DW_AT_name, "A")
                    .u(dw::DW_AT_const_value, 1),
            )
            .child(
                die(TagKind::Enumerator, 0x12)
                    .s(dw::DW_AT_name, "B")
                    .u(dw::DW_AT_const_value, 2),
            ),
        die(TagKind::StructureType, 0x20)
            .u(dw::DW_AT_byte_size, 4)
            .child(
                die(TagKind::Member, 0x21)
                    .s(dw::DW_AT_name, "x")
                    .r(dw::DW_AT_type, 0x10)
                    .u(dw::DW_AT_bit_size, 3),
            )
            .child(
                die(TagKind::Member, 0x22)
                    .s(dw::DW_AT_name, "y")
                    .r(dw::DW_AT_type, 0x10)
                    .u(dw::DW_AT_bit_size, 3)
                    .u(dw::DW_AT_bit_offset, 3),
            ),
    ]);
    let original = as_enumeration(&cu.types[1]);
    assert_eq!(original.bit_size, 32);
    assert!(!original.shared_tags);

    let s = as_composite(&cu.types[2]);
    assert_eq!(s.members[0].header.type_id, TypeId(3));
    assert_eq!(s.members[1].header.type_id, TypeId(3));

    let recoded = as_enumeration(&cu.types[3]);
    assert_eq!(recoded.bit_size, 3);
    assert!(recoded.shared_tags);
    assert!(recoded.header.top_level);
    assert!(Arc::ptr_eq(&original.enumerators, &recoded.enumerators));
    assert_eq!(recoded.enumerators.len(), 2);
    assert_eq!(recoded.enumerators[0].value, 1);
    assert_eq!(recoded.enumerators[1].value, 2);
    assert_eq!(s.members[0].byte_size, 4);
    assert_eq!(s.members[0].bit_size, 3);
}

#[test]
fn bitfield_recoding_rebuilds_wrapper_chain() {
    let cu = load_dies(vec![
        int_die(0x10),
        die(TagKind::Typedef, 0x11)
            .s(dw::DW_AT_name, "myint")
            .r(dw::DW_AT_type, 0x10),
        die(TagKind::ConstType, 0x12).r(dw::DW_AT_type, 0x11),
        die(TagKind::StructureType, 0x20)
            .u(dw::DW_AT_byte_size, 4)
            .child(
                die(TagKind::Member, 0x21)
                    .s(dw::DW_AT_name, "m")
                    .r(dw::DW_AT_type, 0x12)
                    .u(dw::DW_AT_bit_size, 3),
            ),
    ]);
    // void, int, myint, const, struct + base:3, typedef:3, const:3
    assert_eq!(cu.types.len(), 8);
    let member = &as_composite(&cu.types[4]).members[0];
    assert_eq!(member.header.type_id, TypeId(7));

    let new_const = as_wrapper(&cu.types[7]);
    assert_eq!(new_const.header.kind, TagKind::ConstType);
    let new_typedef = as_typedef(&cu.types[new_const.header.type_id.0 as usize]);
    assert_eq!(name_str(new_typedef.name), "myint");
    let new_base = as_base(&cu.types[new_typedef.header.type_id.0 as usize]);
    assert_eq!(new_base.bit_size, 3);
    assert_eq!(name_str(new_base.name), "int");

    // the original chain is untouched
    assert_eq!(
        as_wrapper(&cu.types[3]).header.type_id,
        TypeId(2),
        "original const still wraps the typedef"
    );
    assert_eq!(member.byte_size, 4);
    assert_eq!(member.bit_size, 3);
}

#[rstest]
#[case(false)]
#[case(true)]
fn silly_bitfield(#[case] fixup: bool) {
    let cu = load_with(
        vec![
            int_die(0x10),
            die(TagKind::StructureType, 0x20)
                .u(dw::DW_AT_byte_size, 4)
                .child(
                    die(TagKind::Member, 0x21)
                        .s(dw::DW_AT_name, "c")
                        .r(dw::DW_AT_type, 0x10)
                        .u(dw::DW_AT_bit_size, 32),
                ),
        ],
        &LoadConf {
            fixup_silly_bitfields: fixup,
            ..LoadConf::default()
        },
    );
    // width == container width: the existing int:32 is reused
    assert_eq!(cu.types.len(), 3);
    let member = &as_composite(&cu.types[2]).members[0];
    assert_eq!(member.header.type_id, TypeId(1));
    assert_eq!(member.byte_size, 4);
    assert_eq!(member.bit_size, 32);
    if fixup {
        assert_eq!(member.bitfield_size, 0);
        assert_eq!(member.bitfield_offset, 0);
    } else {
        assert_eq!(member.bitfield_size, 32);
    }
}

// --- attribute decoding ---

#[rstest]
#[case(&[0x00], 0)]
#[case(&[0x7f], 127)]
#[case(&[0x80, 0x01], 128)]
#[case(&[0xe5, 0x8e, 0x26], 624_485)]
#[case(&[], u64::MAX)]
#[case(
    &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f],
    u64::MAX
)]
fn uleb128_decoding(#[case] bytes: &[u8], #[case] expected: u64) {
    assert_eq!(attr::uleb128(bytes), expected);
}

#[rstest]
#[case(&[0x23, 0x08], 8)]
#[case(&[0x10, 0x85, 0x02], 261)]
#[case(&[0xff], u64::MAX)]
#[case(&[], u64::MAX)]
fn dwarf_expr_subset(#[case] bytes: &[u8], #[case] expected: u64) {
    assert_eq!(attr::dwarf_expr(bytes), expected);
}

#[test]
fn unsupported_opcode_member_offset() {
    let cu = load_dies(vec![
        int_die(0x10),
        die(TagKind::StructureType, 0x20)
            .u(dw::DW_AT_byte_size, 8)
            .child(
                die(TagKind::Member, 0x21)
                    .s(dw::DW_AT_name, "bad")
                    .r(dw::DW_AT_type, 0x10)
                    .b(dw::DW_AT_data_member_location, &[0xff]),
            )
            .child(
                die(TagKind::Member, 0x22)
                    .s(dw::DW_AT_name, "good")
                    .r(dw::DW_AT_type, 0x10)
                    .b(dw::DW_AT_data_member_location, &[0x23, 0x04]),
            ),
    ]);
    let s = as_composite(&cu.types[2]);
    assert_eq!(s.members[0].byte_offset, 0);
    assert_eq!(s.members[1].byte_offset, 4);
}

#[test]
fn member_layout_is_preserved() {
    let offsets = [0u64, 4, 8, 12];
    let mut s = die(TagKind::StructureType, 0x20).u(dw::DW_AT_byte_size, 16);
    for (i, off) in offsets.iter().enumerate() {
        s = s.child(
            die(TagKind::Member, 0x21 + i as u64)
                .r(dw::DW_AT_type, 0x10)
                .u(dw::DW_AT_data_member_location, *off),
        );
    }
    let cu = load_dies(vec![int_die(0x10), s]);
    let s = as_composite(&cu.types[2]);
    let loaded: Vec<u32> = s.members.iter().map(|m| m.byte_offset).collect();
    assert_eq!(loaded, vec![0, 4, 8, 12]);
}

#[rstest]
#[case(Some(&[0x03u8, 0x00, 0x10, 0, 0, 0, 0, 0, 0][..]), Location::Global)]
#[case(Some(&[0x50][..]), Location::Register)]
#[case(Some(&[0x70, 0x00][..]), Location::Register)]
#[case(Some(&[0x91, 0x7c][..]), Location::Local)]
#[case(Some(&[][..]), Location::Unknown)]
#[case(None, Location::Optimized)]
fn variable_location(
    #[case] expr: Option<&[u8]>,
    #[case] expected: Location,
) {
    let mut var = die(TagKind::Variable, 0x30).s(dw::DW_AT_name, "v");
    if let Some(expr) = expr {
        var = var.b(dw::DW_AT_location, expr);
    }
    let cu = load_dies(vec![var]);
    let v = as_variable(&cu.tags[0]);
    assert_eq!(v.location, expected);
    if expected == Location::Global {
        assert_eq!(v.addr, 0x1000);
    } else {
        assert_eq!(v.addr, 0);
    }
}

#[test]
fn variable_location_needs_addr_info() {
    let var = die(TagKind::Variable, 0x30)
        .s(dw::DW_AT_name, "v")
        .b(dw::DW_AT_location, &[0x50]);
    let cu = load_with(vec![var], &LoadConf::default());
    assert_eq!(as_variable(&cu.tags[0]).location, Location::Unknown);
}

#[test]
fn declaration_variable_skips_location() {
    let var = die(TagKind::Variable, 0x30)
        .s(dw::DW_AT_name, "v")
        .f(dw::DW_AT_declaration)
        .f(dw::DW_AT_external)
        .b(dw::DW_AT_location, &[0x50]);
    let cu = load_dies(vec![var]);
    let v = as_variable(&cu.tags[0]);
    assert_eq!(v.location, Location::Unknown);
    assert!(v.declaration);
    assert!(v.external);
}

// --- arrays ---

#[test]
fn array_upper_bound_semantics() {
    let cu = load_dies(vec![
        int_die(0x10),
        die(TagKind::ArrayType, 0x50)
            .r(dw::DW_AT_type, 0x10)
            .child(die(TagKind::SubrangeType, 0x51).u(dw::DW_AT_upper_bound, 3))
            .child(die(TagKind::SubrangeType, 0x52).u(dw::DW_AT_upper_bound, 7))
            .child(die(TagKind::SubrangeType, 0x53)),
    ]);
    let array = as_array(&cu.types[2]);
    assert_eq!(array.dimensions(), 3);
    assert_eq!(array.nr_entries, vec![4, 8, 0]);
    assert_eq!(array.header.type_id, TypeId(1));
    assert!(!array.is_vector);
}

#[test]
fn array_dimensions_are_capped() {
    let mut array = die(TagKind::ArrayType, 0x50).r(dw::DW_AT_type, 0x10);
    for i in 0..70u64 {
        array = array.child(
            die(TagKind::SubrangeType, 0x100 + i).u(dw::DW_AT_upper_bound, 1),
        );
    }
    let cu = load_dies(vec![int_die(0x10), array]);
    assert_eq!(as_array(&cu.types[2]).dimensions(), 64);
}

#[test]
fn vector_array() {
    let cu = load_dies(vec![
        int_die(0x10),
        die(TagKind::ArrayType, 0x50)
            .r(dw::DW_AT_type, 0x10)
            .f(dw::DW_AT_GNU_vector)
            .child(die(TagKind::SubrangeType, 0x51).u(dw::DW_AT_upper_bound, 3)),
    ]);
    assert!(as_array(&cu.types[2]).is_vector);
}

// --- reference resolution ---

#[test]
fn pointer_without_type_resolves_to_void() {
    let cu = load_dies(vec![die(TagKind::PointerType, 0x60)]);
    let p = as_wrapper(&cu.types[1]);
    assert_eq!(p.header.kind, TagKind::PointerType);
    assert!(p.header.type_id.is_void());
}

#[test]
fn abstract_origin_provides_function_name() {
    let cu = load_dies(vec![
        die(TagKind::Subprogram, 0x30)
            .s(dw::DW_AT_name, "foo")
            .u(dw::DW_AT_inline, 1),
        die(TagKind::Subprogram, 0x40).r(dw::DW_AT_abstract_origin, 0x30),
    ]);
    assert_eq!(name_str(as_function(&cu.functions[0]).name), "foo");
    let f = as_function(&cu.functions[1]);
    assert_eq!(name_str(f.name), "foo");
    assert!(f.abstract_origin);
}

#[test]
fn specification_provides_type_name() {
    let cu = load_dies(vec![
        die(TagKind::StructureType, 0x80)
            .s(dw::DW_AT_name, "S")
            .u(dw::DW_AT_declaration, 1),
        die(TagKind::StructureType, 0x90)
            .u(dw::DW_AT_byte_size, 8)
            .r(dw::DW_AT_specification, 0x80),
    ]);
    assert!(as_composite(&cu.types[1]).declaration);
    assert_eq!(name_str(as_composite(&cu.types[2]).name), "S");
}

#[test]
fn parameter_copies_name_and_type_from_origin() {
    let cu = load_dies(vec![
        int_die(0x10),
        die(TagKind::Subprogram, 0x200)
            .s(dw::DW_AT_name, "g")
            .u(dw::DW_AT_inline, 1)
            .child(
                die(TagKind::FormalParameter, 0x201)
                    .s(dw::DW_AT_name, "p")
                    .r(dw::DW_AT_type, 0x10),
            ),
        die(TagKind::Subprogram, 0x210)
            .s(dw::DW_AT_name, "f")
            .child(
                die(TagKind::FormalParameter, 0x211)
                    .r(dw::DW_AT_abstract_origin, 0x201),
            ),
    ]);
    let concrete = as_function(&cu.functions[1]);
    let parm = &concrete.proto.parms[0];
    assert_eq!(name_str(parm.name), "p");
    assert_eq!(parm.header.type_id, TypeId(1));
}

#[test]
fn ptr_to_member_resolves_containing_type() {
    let cu = load_dies(vec![
        int_die(0x10),
        die(TagKind::StructureType, 0x20)
            .s(dw::DW_AT_name, "S")
            .u(dw::DW_AT_byte_size, 4),
        die(TagKind::PtrToMemberType, 0x30)
            .r(dw::DW_AT_type, 0x10)
            .r(dw::DW_AT_containing_type, 0x20),
    ]);
    let pm = as_ptr_to_member(&cu.types[3]);
    assert_eq!(pm.containing_type, TypeId(2));
    assert_eq!(pm.header.type_id, TypeId(1));
}

#[test]
fn imports_resolve_to_their_targets() {
    let cu = load_dies(vec![
        int_die(0x10),
        die(TagKind::Namespace, 0x300).s(dw::DW_AT_name, "ns").child(
            die(TagKind::Typedef, 0x301)
                .s(dw::DW_AT_name, "T")
                .r(dw::DW_AT_type, 0x10),
        ),
        die(TagKind::ImportedModule, 0x310).r(dw::DW_AT_import, 0x300),
        die(TagKind::ImportedDeclaration, 0x311).r(dw::DW_AT_import, 0x301),
    ]);
    // the namespace reserves its slot before its children land
    assert_eq!(
        as_import(&cu.tags[0]).target,
        Some(TagRef::Type(TypeId(2)))
    );
    assert_eq!(
        as_import(&cu.tags[1]).target,
        Some(TagRef::Type(TypeId(3)))
    );
    match &cu.types[2] {
        Tag::Namespace(ns) => {
            assert_eq!(name_str(ns.name), "ns");
            assert_eq!(ns.children, vec![TagRef::Type(TypeId(3))]);
        }
        other => panic!("expected namespace, got {other:?}"),
    }
}

#[test]
fn unresolvable_reference_stays_void() {
    let cu = load_dies(vec![
        die(TagKind::PointerType, 0x60).r(dw::DW_AT_type, 0xdead)
    ]);
    assert!(as_wrapper(&cu.types[1]).header.type_id.is_void());
}

#[test]
fn resolver_is_idempotent() {
    let unit = unit_of(vec![
        int_die(0x10),
        die(TagKind::StructureType, 0x20)
            .u(dw::DW_AT_byte_size, 4)
            .child(
                die(TagKind::Member, 0x21)
                    .s(dw::DW_AT_name, "a")
                    .r(dw::DW_AT_type, 0x10)
                    .u(dw::DW_AT_bit_size, 3),
            ),
        die(TagKind::Subprogram, 0x30)
            .s(dw::DW_AT_name, "foo")
            .r(dw::DW_AT_type, 0x10),
    ]);
    let mut cu = Cu::new(
        "crt.c".into(),
        "a.out".into(),
        8,
        None,
        false,
        false,
    );
    let mut dcu = DwarfCu::default();
    load::process_unit(&unit.root, &mut cu, &mut dcu).unwrap();

    resolve::recode_cu(&mut cu, &dcu);
    let first = format!("{:?} {:?} {:?}", cu.types, cu.tags, cu.functions);
    resolve::recode_cu(&mut cu, &dcu);
    let second = format!("{:?} {:?} {:?}", cu.types, cu.tags, cu.functions);
    assert_eq!(first, second);
}

// --- functions and lexical scopes ---

#[test]
fn subroutine_type_collects_parameters() {
    let cu = load_dies(vec![
        int_die(0x10),
        die(TagKind::SubroutineType, 0x70)
            .r(dw::DW_AT_type, 0x10)
            .child(
                die(TagKind::FormalParameter, 0x71)
                    .s(dw::DW_AT_name, "x")
                    .r(dw::DW_AT_type, 0x10),
            )
            .child(
                die(TagKind::FormalParameter, 0x72)
                    .s(dw::DW_AT_name, "y")
                    .r(dw::DW_AT_type, 0x10),
            )
            .child(die(TagKind::UnspecifiedParameters, 0x73)),
    ]);
    let ft = as_ftype(&cu.types[2]);
    assert_eq!(ft.parms.len(), 2);
    assert_eq!(name_str(ft.parms[0].name), "x");
    assert_eq!(ft.parms[1].header.type_id, TypeId(1));
    assert!(ft.unspec_parms);
    assert_eq!(ft.header.type_id, TypeId(1), "return type");
    assert!(cu.tags.is_empty(), "parameters are owned by the signature");
}

#[test]
fn function_body_structure() {
    let cu = load_dies(vec![
        int_die(0x10),
        die(TagKind::Subprogram, 0x100)
            .s(dw::DW_AT_name, "f")
            .r(dw::DW_AT_type, 0x10)
            .f(dw::DW_AT_external)
            .a(dw::DW_AT_low_pc, 0x1000)
            .a(dw::DW_AT_high_pc, 0x1100)
            .child(
                die(TagKind::FormalParameter, 0x101)
                    .s(dw::DW_AT_name, "a")
                    .r(dw::DW_AT_type, 0x10),
            )
            .child(
                die(TagKind::Variable, 0x102)
                    .s(dw::DW_AT_name, "v")
                    .r(dw::DW_AT_type, 0x10)
                    .b(dw::DW_AT_location, &[0x91, 0x7c]),
            )
            .child(
                die(TagKind::Label, 0x103)
                    .s(dw::DW_AT_name, "out")
                    .a(dw::DW_AT_low_pc, 0x1080),
            )
            .child(
                die(TagKind::LexicalBlock, 0x104)
                    .a(dw::DW_AT_low_pc, 0x1010)
                    .a(dw::DW_AT_high_pc, 0x1020)
                    .child(
                        die(TagKind::Variable, 0x105)
                            .s(dw::DW_AT_name, "w")
                            .r(dw::DW_AT_type, 0x10),
                    ),
            ),
    ]);
    let f = as_function(&cu.functions[0]);
    assert_eq!(name_str(f.name), "f");
    assert!(f.external);
    assert_eq!(f.proto.header.type_id, TypeId(1), "return type");
    assert_eq!(f.proto.parms.len(), 1);

    let block = &f.lexblock;
    assert_eq!(block.addr, 0x1000);
    assert_eq!(block.size, 0x100);
    assert_eq!(block.nr_variables, 1);
    assert_eq!(block.nr_labels, 1);
    assert_eq!(block.nr_lexblocks, 1);
    assert_eq!(block.children.len(), 3);

    let LexChild::Ref(TagRef::Tag(v)) = &block.children[0] else {
        panic!("expected a variable ref first");
    };
    let v = as_variable(&cu.tags[v.0 as usize]);
    assert_eq!(name_str(v.name), "v");
    assert_eq!(v.location, Location::Local);
    assert_eq!(v.header.type_id, TypeId(1));

    let LexChild::Ref(TagRef::Tag(l)) = &block.children[1] else {
        panic!("expected a label ref second");
    };
    assert_eq!(as_label(&cu.tags[l.0 as usize]).addr, 0x1080);

    let LexChild::Block(nested) = &block.children[2] else {
        panic!("expected the nested block last");
    };
    assert_eq!(nested.addr, 0x1010);
    assert_eq!(nested.size, 0x10);
    assert_eq!(nested.nr_variables, 1);
}

#[test]
fn inline_expansion_sums_ranges_and_finds_origin() {
    let cu = load_dies(vec![
        int_die(0x10),
        die(TagKind::Subprogram, 0x200)
            .s(dw::DW_AT_name, "g")
            .u(dw::DW_AT_inline, 1)
            .child(
                die(TagKind::Variable, 0x202)
                    .s(dw::DW_AT_name, "lv")
                    .r(dw::DW_AT_type, 0x10),
            ),
        die(TagKind::Subprogram, 0x210)
            .s(dw::DW_AT_name, "f")
            .child(
                die(TagKind::InlinedSubroutine, 0x211)
                    .r(dw::DW_AT_abstract_origin, 0x200)
                    .range(0x1000, 0x1010)
                    .range(0x1020, 0x1040),
            )
            .child(
                die(TagKind::Variable, 0x213)
                    .r(dw::DW_AT_abstract_origin, 0x202),
            ),
    ]);
    let f = as_function(&cu.functions[1]);
    assert_eq!(f.lexblock.nr_inline_expansions, 1);
    assert_eq!(f.lexblock.size_inline_expansions, 0x30);

    let LexChild::Ref(TagRef::Tag(exp_id)) = &f.lexblock.children[0] else {
        panic!("expected the expansion first");
    };
    let exp = as_inline(&cu.tags[exp_id.0 as usize]);
    assert_eq!(exp.origin, Some(crate::FunctionId(0)));
    assert_eq!(exp.addr, 0x1000);
    assert_eq!(exp.size, 0x30);

    // the empty local variable copied name and type from its origin
    let LexChild::Ref(TagRef::Tag(var_id)) = &f.lexblock.children[1] else {
        panic!("expected the variable second");
    };
    let v = as_variable(&cu.tags[var_id.0 as usize]);
    assert_eq!(name_str(v.name), "lv");
    assert_eq!(v.header.type_id, TypeId(1));
}

#[test]
fn label_copies_name_from_origin() {
    let cu = load_dies(vec![
        die(TagKind::Subprogram, 0x200)
            .s(dw::DW_AT_name, "g")
            .u(dw::DW_AT_inline, 1)
            .child(
                die(TagKind::Label, 0x203)
                    .s(dw::DW_AT_name, "out")
                    .a(dw::DW_AT_low_pc, 0x1004),
            ),
        die(TagKind::Subprogram, 0x210).s(dw::DW_AT_name, "f").child(
            die(TagKind::Label, 0x214).r(dw::DW_AT_abstract_origin, 0x203),
        ),
    ]);
    let f = as_function(&cu.functions[1]);
    let LexChild::Ref(TagRef::Tag(l)) = &f.lexblock.children[0] else {
        panic!("expected a label ref");
    };
    assert_eq!(name_str(as_label(&cu.tags[l.0 as usize]).name), "out");
}

// --- composites and sizes ---

#[test]
fn member_sizes_follow_resolved_types() {
    let cu = load_dies(vec![
        int_die(0x10),
        die(TagKind::StructureType, 0x40)
            .s(dw::DW_AT_name, "inner")
            .u(dw::DW_AT_byte_size, 12),
        die(TagKind::ArrayType, 0x50)
            .r(dw::DW_AT_type, 0x10)
            .child(die(TagKind::SubrangeType, 0x51).u(dw::DW_AT_upper_bound, 1))
            .child(die(TagKind::SubrangeType, 0x52).u(dw::DW_AT_upper_bound, 2)),
        die(TagKind::PointerType, 0x60).r(dw::DW_AT_type, 0x10),
        die(TagKind::StructureType, 0x20)
            .s(dw::DW_AT_name, "outer")
            .u(dw::DW_AT_byte_size, 48)
            .child(
                die(TagKind::Member, 0x21)
                    .s(dw::DW_AT_name, "x")
                    .r(dw::DW_AT_type, 0x10),
            )
            .child(
                die(TagKind::Member, 0x22)
                    .s(dw::DW_AT_name, "in")
                    .r(dw::DW_AT_type, 0x40)
                    .u(dw::DW_AT_data_member_location, 4),
            )
            .child(
                die(TagKind::Member, 0x23)
                    .s(dw::DW_AT_name, "arr")
                    .r(dw::DW_AT_type, 0x50)
                    .u(dw::DW_AT_data_member_location, 16),
            )
            .child(
                die(TagKind::Member, 0x24)
                    .s(dw::DW_AT_name, "p")
                    .r(dw::DW_AT_type, 0x60)
                    .u(dw::DW_AT_data_member_location, 40),
            ),
    ]);
    let outer = as_composite(&cu.types[5]);
    let sizes: Vec<(u32, u32)> = outer
        .members
        .iter()
        .map(|m| (m.byte_size, m.bit_size))
        .collect();
    assert_eq!(sizes, vec![(4, 32), (12, 96), (24, 192), (8, 64)]);
}

#[test]
fn nested_types_and_methods_live_in_tables() {
    let cu = load_dies(vec![
        int_die(0x10),
        die(TagKind::ClassType, 0x20)
            .s(dw::DW_AT_name, "C")
            .u(dw::DW_AT_byte_size, 16)
            .child(
                die(TagKind::Member, 0x21)
                    .s(dw::DW_AT_name, "n")
                    .r(dw::DW_AT_type, 0x10),
            )
            .child(
                die(TagKind::EnumerationType, 0x22)
                    .s(dw::DW_AT_name, "Mode")
                    .u(dw::DW_AT_byte_size, 4)
                    .child(
                        die(TagKind::Enumerator, 0x23)
                            .s(dw::DW_AT_name, "On")
                            .u(dw::DW_AT_const_value, 0),
                    ),
            )
            .child(
                die(TagKind::Subprogram, 0x24)
                    .s(dw::DW_AT_name, "method")
                    .u(dw::DW_AT_virtuality, 1)
                    .b(dw::DW_AT_vtable_elem_location, &[0x10, 0x02]),
            ),
    ]);
    let class = as_composite(&cu.types[2]);
    assert_eq!(class.nr_members(), 1);
    assert_eq!(
        class.children,
        vec![
            TagRef::Type(TypeId(3)),
            TagRef::Function(crate::FunctionId(0))
        ]
    );
    assert_eq!(class.vtable, vec![crate::FunctionId(0)]);

    let method = as_function(&cu.functions[0]);
    assert_eq!(method.vtable_entry, Some(2));
    assert_eq!(method.virtuality, 1);
    assert_eq!(name_str(as_enumeration(&cu.types[3]).name), "Mode");
}

#[test]
fn enumeration_defaults_to_machine_integer() {
    let cu = load_dies(vec![die(TagKind::EnumerationType, 0x10)
        .s(dw::DW_AT_name, "e")
        .child(
            die(TagKind::Enumerator, 0x11)
                .s(dw::DW_AT_name, "A")
                .u(dw::DW_AT_const_value, 0),
        )]);
    assert_eq!(as_enumeration(&cu.types[1]).bit_size, 32);
}

// --- skipping, driver, configuration ---

#[test]
fn unsupported_kinds_are_skipped() {
    let cu = load_dies(vec![
        Die::new(0x99, 0x10),
        Die::new(0x4109, 0x20),
        int_die(0x30),
    ]);
    assert_eq!(cu.types.len(), 2);
    assert!(cu.tags.is_empty());
    assert!(cu.functions.is_empty());
}

#[test]
fn compile_unit_root_is_required() {
    let unit = Unit {
        root: die(TagKind::Namespace, 0x0b),
        pointer_size: 8,
        offset_size: 8,
    };
    assert!(load_unit(unit, "a.out", None, &LoadConf::default()).is_err());
}

#[test]
fn unit_metadata() {
    let cu = load_dies(vec![int_die(0x10)]);
    assert_eq!(cu.name, "crt.c");
    assert_eq!(cu.filename, "a.out");
    assert_eq!(cu.language, 1);
    assert_eq!(cu.addr_size, 8);
    assert!(cu.uses_global_strings);
    let base = as_base(&cu.types[1]);
    assert!(base.is_signed);
    assert!(!base.is_bool);
    assert!(base.header.top_level);
}

#[test]
fn extra_dbg_info_keeps_raw_metadata() {
    let children = vec![
        int_die(0x10)
            .s(dw::DW_AT_decl_file, "a.c")
            .u(dw::DW_AT_decl_line, 3),
        die(TagKind::Typedef, 0x11)
            .s(dw::DW_AT_name, "t")
            .r(dw::DW_AT_type, 0x10),
    ];
    let cu = load_with(
        children.clone(),
        &LoadConf {
            extra_dbg_info: true,
            ..LoadConf::default()
        },
    );
    let base = as_base(&cu.types[1]);
    assert_eq!(cu.decl_file(&base.header).as_deref(), Some("a.c"));
    assert_eq!(cu.decl_line(&base.header), Some(3));
    assert_eq!(cu.orig_id(&base.header), Some(0x10));
    let td = as_typedef(&cu.types[2]);
    assert_eq!(cu.orig_type(&td.header), Some(0x10));

    let bare = load_with(children, &LoadConf::default());
    let base = as_base(&bare.types[1]);
    assert_eq!(bare.decl_file(&base.header), None);
    assert_eq!(bare.orig_id(&base.header), None);
}

struct TestModule {
    units: Vec<Unit>,
}

impl DwarfModule for TestModule {
    fn build_id(&self) -> Option<&[u8]> {
        Some(b"\xca\xfe")
    }

    fn next_unit(&mut self) -> Result<Option<Unit>> {
        Ok(if self.units.is_empty() {
            None
        } else {
            Some(self.units.remove(0))
        })
    }
}

struct TestHost {
    modules: Vec<TestModule>,
}

impl DwarfHost for TestHost {
    type Module = TestModule;

    fn filename(&self) -> &str {
        "a.out"
    }

    fn next_module(&mut self) -> Result<Option<TestModule>> {
        Ok(if self.modules.is_empty() {
            None
        } else {
            Some(self.modules.remove(0))
        })
    }
}

fn three_unit_host() -> TestHost {
    TestHost {
        modules: vec![TestModule {
            units: vec![
                unit_named("u0.c", vec![int_die(0x10)]),
                unit_named("u1.c", vec![int_die(0x10)]),
                unit_named("u2.c", vec![int_die(0x10)]),
            ],
        }],
    }
}

#[test]
fn steal_callback_controls_ownership() {
    let mut cus = crate::Cus::new();
    let mut conf = LoadConf {
        steal: Some(Box::new(|cu: Cu| {
            if cu.name == "u1.c" {
                Steal::Stolen
            } else {
                Steal::Keep(cu)
            }
        })),
        ..LoadConf::default()
    };
    cus.load_file(&mut three_unit_host(), &mut conf).unwrap();
    let names: Vec<&str> = cus.iter().map(|cu| cu.name.as_str()).collect();
    assert_eq!(names, vec!["u0.c", "u2.c"]);
    assert_eq!(cus.get(0).unwrap().build_id.as_deref(), Some(&b"\xca\xfe"[..]));
}

#[test]
fn steal_stop_aborts_the_file() {
    let mut cus = crate::Cus::new();
    let mut conf = LoadConf {
        steal: Some(Box::new(|_| Steal::Stop)),
        ..LoadConf::default()
    };
    assert!(cus.load_file(&mut three_unit_host(), &mut conf).is_err());
    assert!(cus.is_empty());
}

#[test]
fn file_without_debug_info_fails() {
    let mut cus = crate::Cus::new();
    let mut host = TestHost { modules: vec![] };
    assert!(cus
        .load_file(&mut host, &mut LoadConf::default())
        .is_err());
}
