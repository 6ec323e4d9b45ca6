//! Post-resolution size cache for members.
//!
//! Byte and bit sizes are derived once, after references resolve, so
//! downstream consumers never chase typedef chains themselves. Bitfield
//! members need the integral container behind their (recoded) storage
//! type, which only the base type's canonical name reveals.

use std::collections::HashMap;
use std::mem;
use std::sync::OnceLock;

use crate::cu::{Cu, TypeId};
use crate::dw::TagKind;
use crate::model::{Member, Tag};
use crate::strings::strings;

enum Container {
    Bits(u32),
    /// Scales with the unit's pointer size: `long` and friends.
    Word,
}

fn containers() -> &'static HashMap<&'static str, Container> {
    static TABLE: OnceLock<HashMap<&'static str, Container>> =
        OnceLock::new();
    TABLE.get_or_init(|| {
        use Container::*;
        HashMap::from([
            ("_Bool", Bits(8)),
            ("bool", Bits(8)),
            ("char", Bits(8)),
            ("signed char", Bits(8)),
            ("unsigned char", Bits(8)),
            ("short", Bits(16)),
            ("short int", Bits(16)),
            ("short unsigned int", Bits(16)),
            ("signed short", Bits(16)),
            ("unsigned short", Bits(16)),
            ("int", Bits(32)),
            ("signed int", Bits(32)),
            ("unsigned int", Bits(32)),
            ("signed", Bits(32)),
            ("unsigned", Bits(32)),
            ("long", Word),
            ("long int", Word),
            ("long unsigned int", Word),
            ("signed long", Word),
            ("unsigned long", Word),
            ("long long", Bits(64)),
            ("long long int", Bits(64)),
            ("long long unsigned int", Bits(64)),
            ("signed long long", Bits(64)),
            ("unsigned long long", Bits(64)),
        ])
    })
}

/// Container width in bits for a base type's canonical name, 0 when the
/// name is unknown. Zero sizes deliberately survive into the model so a
/// consumer can spot them.
fn container_bits(name: &str, addr_size: u8) -> u32 {
    match containers().get(name) {
        Some(Container::Bits(bits)) => *bits,
        Some(Container::Word) => addr_size as u32 * 8,
        None => 0,
    }
}

pub(crate) fn cache_member_sizes(cu: &mut Cu, fixup_silly_bitfields: bool) {
    for i in 0..cu.types.len() {
        let mut members = match &mut cu.types[i] {
            Tag::Composite(c) => mem::take(&mut c.members),
            _ => continue,
        };
        for member in &mut members {
            cache_one(cu, member, fixup_silly_bitfields);
        }
        if let Tag::Composite(c) = &mut cu.types[i] {
            c.members = members;
        }
    }
    // Members that ended up outside any composite get the same treatment.
    for i in 0..cu.tags.len() {
        if !matches!(&cu.tags[i], Tag::Member(_)) {
            continue;
        }
        let mut entry = mem::take(&mut cu.tags[i]);
        if let Tag::Member(member) = &mut entry {
            cache_one(cu, member, fixup_silly_bitfields);
        }
        cu.tags[i] = entry;
    }
}

fn cache_one(cu: &Cu, member: &mut Member, fixup_silly_bitfields: bool) {
    if member.bitfield_size == 0 {
        member.byte_size = tag_size(cu, member.header.type_id) as u32;
        member.bit_size = member.byte_size * 8;
        return;
    }

    let storage = strip_wrappers(cu, member.header.type_id);
    let (type_bits, container) = match cu.type_tag(storage) {
        Some(Tag::Enumeration(e)) => (e.bit_size as u32, 32),
        Some(Tag::Base(b)) => {
            let container = b
                .name
                .and_then(|n| strings().lookup(n))
                .map_or(0, |n| container_bits(&n, cu.addr_size));
            (b.bit_size as u32, container)
        }
        _ => return, // recoding failed earlier, sizes stay zero
    };

    member.byte_size = container / 8;
    if container == 0 {
        return;
    }
    if type_bits == container {
        member.bit_size = container;
        if fixup_silly_bitfields {
            // A bitfield as wide as its container isn't one.
            member.bitfield_size = 0;
            member.bitfield_offset = 0;
        }
        return;
    }
    member.bit_size = type_bits;
}

fn strip_wrappers(cu: &Cu, mut id: TypeId) -> TypeId {
    loop {
        match cu.type_tag(id) {
            Some(Tag::Typedef(t)) => id = t.header.type_id,
            Some(Tag::Wrapper(w))
                if matches!(
                    w.header.kind,
                    TagKind::ConstType | TagKind::VolatileType
                ) =>
            {
                id = w.header.type_id
            }
            _ => return id,
        }
    }
}

/// Size in bytes of a resolved type, typedefs and qualifiers followed.
pub fn tag_size(cu: &Cu, id: TypeId) -> u64 {
    if id.is_void() {
        return 0;
    }
    match cu.type_tag(id) {
        None => 0,
        Some(Tag::Base(b)) => b.bit_size as u64 / 8,
        Some(Tag::Enumeration(e)) => e.bit_size as u64 / 8,
        Some(Tag::Typedef(t)) => tag_size(cu, t.header.type_id),
        Some(Tag::Wrapper(w)) => match w.header.kind {
            TagKind::PointerType | TagKind::ReferenceType => {
                cu.addr_size as u64
            }
            _ => tag_size(cu, w.header.type_id),
        },
        Some(Tag::PtrToMember(_)) => cu.addr_size as u64,
        Some(Tag::Array(a)) => {
            let entries: u64 =
                a.nr_entries.iter().map(|&n| n as u64).product();
            entries * tag_size(cu, a.header.type_id)
        }
        Some(Tag::Composite(c)) => c.byte_size as u64,
        Some(_) => 0,
    }
}
