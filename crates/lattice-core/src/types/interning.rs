//! Interned module identifiers.
//!
//! Module names are written concurrently by every worker, so the interner
//! is the multi-threaded rodeo shared behind an `Arc`.

use std::sync::Arc;

use lasso::ThreadedRodeo;

/// Interned module name. `Copy`, cheap to hash and compare; resolve back
/// to the name through the [`ModuleInterner`] that produced it.
pub type ModuleId = lasso::Spur;

/// Thread-safe module-name interner shared by the heap and all workers.
#[derive(Clone)]
pub struct ModuleInterner {
    rodeo: Arc<ThreadedRodeo>,
}

impl ModuleInterner {
    pub fn new() -> Self {
        Self {
            rodeo: Arc::new(ThreadedRodeo::new()),
        }
    }

    pub fn intern(&self, name: &str) -> ModuleId {
        self.rodeo.get_or_intern(name)
    }

    /// Resolve an id minted by this interner.
    pub fn resolve(&self, id: ModuleId) -> &str {
        self.rodeo.resolve(&id)
    }

    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}

impl Default for ModuleInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ModuleInterner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleInterner")
            .field("len", &self.rodeo.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_stable() {
        let interner = ModuleInterner::new();
        let a = interner.intern("react");
        let b = interner.intern("react");
        assert_eq!(a, b);
        assert_eq!(interner.resolve(a), "react");
    }
}
