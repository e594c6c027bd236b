//! Interned symbols for dialect, operation, and attribute names.
//!
//! Uses `lasso` for string interning with 4-byte `Spur` keys behind a
//! process-wide `parking_lot` read/write lock.

use std::fmt;
use std::sync::LazyLock;

use lasso::{Rodeo, Spur};
use parking_lot::RwLock;

static INTERNER: LazyLock<RwLock<Rodeo>> = LazyLock::new(|| RwLock::new(Rodeo::default()));

/// An interned string, cheap to copy and compare.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(Spur);

impl Symbol {
    /// Intern a static string and return its symbol. Prefer this over
    /// `from_dynamic` when the text is known at compile time.
    pub fn new(text: &'static str) -> Self {
        Self::get_or_else(text, |rodeo| rodeo.get_or_intern_static(text))
    }

    /// Intern a string and return its symbol.
    pub fn from_dynamic(text: &str) -> Self {
        Self::get_or_else(text, |rodeo| rodeo.get_or_intern(text))
    }

    fn get_or_else(text: &str, f: impl for<'r> FnOnce(&'r mut Rodeo) -> Spur) -> Self {
        let mut lock = INTERNER.upgradable_read();
        Symbol(if let Some(spur) = lock.get(text) {
            spur
        } else {
            lock.with_upgraded(f)
        })
    }

    /// Access the symbol's text without allocating.
    ///
    /// Uses `read_recursive()` so nested symbol operations (Display, ==,
    /// ordering) inside the closure cannot deadlock.
    pub fn with_str<R>(self, f: impl FnOnce(&str) -> R) -> R {
        let lock = INTERNER.read_recursive();
        f(lock.resolve(&self.0))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|s| f.write_str(s))
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|s| write!(f, "Symbol({s:?})"))
    }
}

// Lexicographic ordering: attribute maps keyed by `Symbol` iterate in a
// stable order independent of interning order.
impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        if self.0 == other.0 {
            return std::cmp::Ordering::Equal;
        }
        self.with_str(|a| other.with_str(|b| a.cmp(b)))
    }
}

impl From<&str> for Symbol {
    fn from(text: &str) -> Self {
        Symbol::from_dynamic(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_symbol() {
        assert_eq!(Symbol::new("func"), Symbol::from_dynamic("func"));
        assert_ne!(Symbol::new("func"), Symbol::new("call"));
    }

    #[test]
    fn display_round_trip() {
        let sym = Symbol::new("cedar.alloca_test");
        assert_eq!(sym.to_string(), "cedar.alloca_test");
    }

    #[test]
    fn ordering_is_lexicographic() {
        // Intern in reverse order: ordering must not depend on intern order.
        let z = Symbol::from_dynamic("zzz_order_test");
        let a = Symbol::from_dynamic("aaa_order_test");
        assert!(a < z);
    }
}
