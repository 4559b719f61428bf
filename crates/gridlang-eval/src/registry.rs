//! Case-insensitive name → function map.

use std::sync::Arc;

use dashmap::DashMap;

use crate::function::Function;

#[inline]
fn norm(name: &str) -> String {
    name.to_ascii_uppercase()
}

/// The function catalogue an engine dispatches through. Reads are
/// concurrent; registration is expected to happen at startup (hosts that
/// mutate later must synchronise externally, or use [`copy_with`]).
///
/// [`copy_with`]: FunctionRegistry::copy_with
pub struct FunctionRegistry {
    map: DashMap<String, Arc<dyn Function>>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// A registry preloaded with the builtin catalogue.
    pub fn new() -> Self {
        let reg = Self::empty();
        crate::builtins::register_builtins(&reg);
        reg
    }

    /// A registry with no functions at all (used by tests and by hosts that
    /// curate their own catalogue).
    pub fn empty() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    pub fn register(&self, function: Arc<dyn Function>) {
        self.map.insert(norm(function.name()), function);
    }

    pub fn register_all<I>(&self, functions: I)
    where
        I: IntoIterator<Item = Arc<dyn Function>>,
    {
        for f in functions {
            self.register(f);
        }
    }

    /// File an existing function under a second name (`STDEV.S` → `STDEV`).
    pub fn register_alias(&self, alias: &str, target: &str) {
        if let Some(f) = self.get(target) {
            self.map.insert(norm(alias), f);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.map.get(&norm(name)).map(|f| Arc::clone(f.value()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.map.contains_key(&norm(name))
    }

    /// Registered names, sorted, for host UIs.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.map.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// A snapshot of this registry plus the given overrides. The original
    /// is untouched, so hosts can layer session-specific functions over a
    /// shared catalogue.
    pub fn copy_with<I>(&self, overrides: I) -> FunctionRegistry
    where
        I: IntoIterator<Item = Arc<dyn Function>>,
    {
        let snapshot = Self::empty();
        for entry in self.map.iter() {
            snapshot
                .map
                .insert(entry.key().clone(), Arc::clone(entry.value()));
        }
        snapshot.register_all(overrides);
        snapshot
    }
}
