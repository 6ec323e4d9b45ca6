//! Process-wide interned string table.
//!
//! Every name the loader touches goes through here exactly once; the handles
//! stay valid for the process lifetime, so compilation units loaded from
//! different files can share them freely. The table is add-only and
//! internally synchronized, callers never lock anything themselves.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// Handle to an interned string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(u32);

#[derive(Default)]
struct Interner {
    by_name: HashMap<String, u32>,
    entries: Vec<String>,
}

#[derive(Default)]
pub struct Strings {
    inner: Mutex<Interner>,
}

impl Strings {
    /// Intern `name`, returning the existing handle when it was seen before.
    pub fn add(&self, name: &str) -> StringId {
        let mut inner = self.inner.lock().unwrap();
        if let Some(&id) = inner.by_name.get(name) {
            return StringId(id);
        }
        let id = inner.entries.len() as u32;
        inner.entries.push(name.to_owned());
        inner.by_name.insert(name.to_owned(), id);
        StringId(id)
    }

    /// Resolve a handle back to its string.
    pub fn lookup(&self, id: StringId) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.entries.get(id.0 as usize).cloned()
    }
}

/// The process-global table. Created on first use; there is no teardown,
/// handles are expected to outlive every compilation unit.
pub fn strings() -> &'static Strings {
    static STRINGS: OnceLock<Strings> = OnceLock::new();
    STRINGS.get_or_init(Strings::default)
}
