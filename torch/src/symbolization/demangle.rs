//! Symbol demangling
//!
//! Symbol tables hold mangled names. Rust names (`_R...`, and legacy `_ZN...h<hash>E`)
//! go through `rustc_demangle`; remaining Itanium `_Z` names go through
//! `cpp_demangle`. Anything that fails to demangle is returned unchanged.

use cpp_demangle::{DemangleOptions, Symbol};
use rustc_demangle::try_demangle;

/// Demangle a raw symbol name, falling back to the input
#[must_use]
pub fn demangle(raw: &str) -> String {
    if let Ok(demangled) = try_demangle(raw) {
        return format!("{demangled:#}");
    }

    if raw.starts_with("_Z") {
        if let Some(demangled) = Symbol::new(raw)
            .ok()
            .and_then(|symbol| symbol.demangle(&DemangleOptions::default()).ok())
        {
            return demangled;
        }
    }

    raw.to_string()
}
