//! Loader for DWARF debug information.
//!
//! Walks the DIE tree of each compilation unit a host hands over, builds a
//! strongly-typed in-memory model of the program's types, functions,
//! variables and lexical structure, then rewrites every cross-DIE
//! reference from a raw file-relative offset into a dense table index.
//! Bitfield members get width-exact synthetic types, and member sizes are
//! cached once resolution is done.
//!
//! The crate is a transform, not a store: opening files, relocating
//! sections and producing the DIE trees is the host collaborator's job
//! (see [`die`]), and finished units go wherever the caller's steal
//! callback puts them.
#![forbid(unsafe_code)]

pub(crate) mod attr;
pub mod cu;
pub mod die;
pub mod dw;
pub(crate) mod load;
pub mod model;
pub(crate) mod recode;
pub(crate) mod resolve;
pub mod sizes;
pub mod strings;

#[cfg(test)]
mod test;

use anyhow::{bail, ensure, Context, Result};

pub use cu::{Cu, FnOwner, FunctionId, TagId, TagRef, TypeId};
pub use die::{AttrValue, Die, DwarfHost, DwarfModule, Unit};
pub use model::Tag;

use cu::DwarfCu;
use die::AttrValue as Av;

/// What the steal callback did with a freshly loaded unit.
pub enum Steal {
    /// Abandon the rest of the file.
    Stop,
    /// The callback took ownership.
    Stolen,
    /// Hand it back to be kept on the file's unit list.
    Keep(Cu),
}

pub type StealFn = Box<dyn FnMut(Cu) -> Steal>;

/// Load options. `steal` sees every unit right after it is fully resolved.
#[derive(Default)]
pub struct LoadConf {
    /// Keep raw DWARF metadata (original offsets, declaration
    /// coordinates) attached to the loaded units.
    pub extra_dbg_info: bool,
    /// Read address information (`low_pc`/`high_pc`/locations); off means
    /// all addresses load as 0.
    pub get_addr_info: bool,
    /// Clear the bitfield fields of members whose declared width equals
    /// their container's width.
    pub fixup_silly_bitfields: bool,
    pub steal: Option<StealFn>,
}

/// The compilation units collected from one or more files.
#[derive(Default)]
pub struct Cus {
    units: Vec<Cu>,
}

impl Cus {
    pub fn new() -> Self {
        Cus::default()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cu> {
        self.units.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&Cu> {
        self.units.get(idx)
    }

    pub fn add(&mut self, cu: Cu) {
        self.units.push(cu);
    }

    /// Load every unit of every DWARF-bearing module of `host`'s file.
    ///
    /// Fails when the file has no debug information at all, when a unit
    /// is malformed at the root, or when the steal callback says stop;
    /// everything milder is warned about and skipped.
    pub fn load_file<H: DwarfHost>(
        &mut self,
        host: &mut H,
        conf: &mut LoadConf,
    ) -> Result<()> {
        let filename = host.filename().to_owned();
        let mut nr_modules = 0u32;
        while let Some(mut module) = host.next_module()? {
            nr_modules += 1;
            self.load_module(&mut module, &filename, conf)?;
        }
        ensure!(nr_modules > 0, "no DWARF debug information in {filename}");
        Ok(())
    }

    fn load_module(
        &mut self,
        module: &mut impl DwarfModule,
        filename: &str,
        conf: &mut LoadConf,
    ) -> Result<()> {
        let build_id = module.build_id().map(<[u8]>::to_vec);
        while let Some(unit) = module.next_unit()? {
            let cu = load_unit(unit, filename, build_id.clone(), &*conf)
                .with_context(|| format!("loading {filename}"))?;
            match conf.steal.as_mut() {
                Some(steal) => match steal(cu) {
                    Steal::Stop => {
                        bail!("loading of {filename} stopped by the caller")
                    }
                    Steal::Stolen => {}
                    Steal::Keep(cu) => self.units.push(cu),
                },
                None => self.units.push(cu),
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Cus {
    type Item = &'a Cu;
    type IntoIter = std::slice::Iter<'a, Cu>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}

/// Run one unit through the whole pipeline: build, resolve, cache sizes.
pub(crate) fn load_unit(
    unit: Unit,
    filename: &str,
    build_id: Option<Vec<u8>>,
    conf: &LoadConf,
) -> Result<Cu> {
    // Nameless compile units exist in the wild; an empty name is fine.
    let name = match unit.root.attr(dw::DW_AT_name) {
        Some(Av::String(s)) => s.clone(),
        _ => String::new(),
    };
    let mut cu = Cu::new(
        name,
        filename.to_owned(),
        unit.pointer_size,
        build_id,
        conf.extra_dbg_info,
        conf.get_addr_info,
    );
    let mut dcu = DwarfCu::default();
    load::process_unit(&unit.root, &mut cu, &mut dcu)
        .with_context(|| format!("unit at {:#x}", unit.root.offset))?;
    resolve::recode_cu(&mut cu, &dcu);
    sizes::cache_member_sizes(&mut cu, conf.fixup_silly_bitfields);
    if cu.extra_dbg_info {
        cu.raw_info = Some(dcu.raw);
    }
    Ok(cu)
}
