//! String interning for identifiers, message tags, and string literals.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;

/// Interned string identifier.
///
/// Equality and hashing are O(1) integer operations; the text lives in the
/// owning [`StringInterner`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Pre-interned empty string.
    pub const EMPTY: Name = Name(0);

    /// Get raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

struct InternInner {
    /// Map from string content to index.
    map: FxHashMap<&'static str, u32>,
    /// Storage for string contents.
    strings: Vec<&'static str>,
}

/// String interner.
///
/// Strings are stored contiguously and never deallocated; a single check is
/// single-threaded, so one lock suffices.
pub struct StringInterner {
    inner: RwLock<InternInner>,
}

impl StringInterner {
    /// Create a new interner with keywords and builtins pre-interned.
    pub fn new() -> Self {
        let mut inner = InternInner {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(64),
        };
        // Empty string at index 0 backs Name::EMPTY.
        inner.map.insert("", 0);
        inner.strings.push("");

        let interner = Self {
            inner: RwLock::new(inner),
        };
        interner.pre_intern();
        interner
    }

    /// Intern a string, returning its Name.
    pub fn intern(&self, s: &str) -> Name {
        {
            let guard = self.inner.read();
            if let Some(&idx) = guard.map.get(s) {
                return Name(idx);
            }
        }

        let mut guard = self.inner.write();
        if let Some(&idx) = guard.map.get(s) {
            return Name(idx);
        }

        // Leak the string to get 'static lifetime.
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let idx = guard.strings.len() as u32;
        guard.strings.push(leaked);
        guard.map.insert(leaked, idx);
        Name(idx)
    }

    /// Look up the string for a Name.
    pub fn lookup(&self, name: Name) -> &'static str {
        let guard = self.inner.read();
        guard.strings[name.0 as usize]
    }

    /// Pre-intern keywords, primitive type names, and builtin functions.
    fn pre_intern(&self) {
        const COMMON: &[&str] = &[
            // Keywords
            "interface", "def", "let", "in", "new", "spawn", "guard",
            "receive", "from", "free", "if", "then", "else", "true", "false",
            // Primitive types
            "Unit", "Int", "String", "Bool",
            // Builtin functions
            "main", "print", "intToString",
        ];
        for s in COMMON {
            self.intern(s);
        }
    }

    /// Get the number of interned strings.
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    /// Check if the interner holds only the empty string.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_and_lookup() {
        let interner = StringInterner::new();

        let hello = interner.intern("hello");
        let world = interner.intern("world");
        let hello2 = interner.intern("hello");

        assert_eq!(hello, hello2);
        assert_ne!(hello, world);
        assert_eq!(interner.lookup(hello), "hello");
        assert_eq!(interner.lookup(world), "world");
    }

    #[test]
    fn empty_string() {
        let interner = StringInterner::new();
        let empty = interner.intern("");
        assert_eq!(empty, Name::EMPTY);
        assert_eq!(interner.lookup(Name::EMPTY), "");
    }

    #[test]
    fn keywords_pre_interned() {
        let interner = StringInterner::new();
        let before = interner.len();
        interner.intern("guard");
        interner.intern("Unit");
        // Already present, nothing new interned.
        assert_eq!(interner.len(), before);
    }
}
