//! Scope and symbol table. Scopes nest, but rather than modeling that nesting
//! with parent pointers (self-referential and awkward to own in Rust), the
//! table is an arena of frames addressed by index, each carrying its
//! parent's index.

use std::collections::HashMap;

use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
    Class,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Type,
    pub params: Vec<(String, Type)>,
    pub is_variadic: bool,
}

impl Symbol {
    pub fn variable(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            kind: SymbolKind::Variable,
            ty,
            params: Vec::new(),
            is_variadic: false,
        }
    }

    pub fn function(
        name: impl Into<String>,
        return_type: Type,
        params: Vec<(String, Type)>,
        is_variadic: bool,
    ) -> Self {
        Self {
            name: name.into(),
            kind: SymbolKind::Function,
            ty: return_type,
            params,
            is_variadic,
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SymbolKind::Class,
            ty: Type::base("void"),
            params: Vec::new(),
            is_variadic: false,
        }
    }
}

pub type ScopeId = usize;

struct Scope {
    symbols: HashMap<String, Symbol>,
    parent: Option<ScopeId>,
}

/// An arena of scope frames. The global scope is created on construction at
/// index 0 and can never be popped.
pub struct ScopeArena {
    scopes: Vec<Scope>,
    current: ScopeId,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                symbols: HashMap::new(),
                parent: None,
            }],
            current: 0,
        }
    }

    pub fn current(&self) -> ScopeId {
        self.current
    }

    pub fn push_scope(&mut self) -> ScopeId {
        let id = self.scopes.len();
        self.scopes.push(Scope {
            symbols: HashMap::new(),
            parent: Some(self.current),
        });
        self.current = id;
        id
    }

    /// Pops back to the current scope's parent. No-op (stays on global) if
    /// already at the global scope.
    pub fn pop_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current].parent {
            self.current = parent;
        }
    }

    /// Defines `symbol` in the current scope. Fails if a symbol with the same
    /// name already exists in this exact scope (shadowing an outer scope is
    /// fine; redefinition within one scope is not).
    pub fn define(&mut self, symbol: Symbol) -> Result<(), String> {
        let scope = &mut self.scopes[self.current];
        if scope.symbols.contains_key(&symbol.name) {
            return Err(format!(
                "Symbol '{}' already defined in current scope.",
                symbol.name
            ));
        }
        scope.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Looks up `name` starting at the current scope and walking parent
    /// links outward.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        let mut scope_id = Some(self.current);
        while let Some(id) = scope_id {
            let scope = &self.scopes[id];
            if let Some(sym) = scope.symbols.get(name) {
                return Some(sym);
            }
            scope_id = scope.parent;
        }
        None
    }

    pub fn is_defined_in_current_scope(&self, name: &str) -> bool {
        self.scopes[self.current].symbols.contains_key(name)
    }
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parent_scopes() {
        let mut arena = ScopeArena::new();
        arena.define(Symbol::variable("x", Type::int())).unwrap();
        arena.push_scope();
        assert!(arena.lookup("x").is_some());
    }

    #[test]
    fn inner_scope_name_is_invisible_after_pop() {
        let mut arena = ScopeArena::new();
        arena.push_scope();
        arena.define(Symbol::variable("y", Type::int())).unwrap();
        arena.pop_scope();
        assert!(arena.lookup("y").is_none());
    }

    #[test]
    fn redefinition_in_same_scope_is_rejected() {
        let mut arena = ScopeArena::new();
        arena.define(Symbol::variable("x", Type::int())).unwrap();
        assert!(arena.define(Symbol::variable("x", Type::float())).is_err());
    }

    #[test]
    fn shadowing_in_inner_scope_is_allowed() {
        let mut arena = ScopeArena::new();
        arena.define(Symbol::variable("x", Type::int())).unwrap();
        arena.push_scope();
        assert!(arena.define(Symbol::variable("x", Type::float())).is_ok());
        assert_eq!(arena.lookup("x").unwrap().ty, Type::float());
    }
}
