use crate::arena::{BumpaloArena, BumpaloVec};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Anything that can be entered into a scope.
pub trait Symbol<'a>: Copy {
    fn name(&self) -> &'a str;
}

/// A read-only name to symbol mapping.
///
/// Tables are arena slices sorted by name, and merged scopes only refer to the tables they
/// compose, so neither building nor merging ever copies a table twice.
#[derive(Debug)]
pub enum Scope<'a, S> {
    Empty,
    Table(&'a [S]),
    /// First-listed scope wins. Never nested and never holds `Empty`.
    Merged(&'a [Scope<'a, S>]),
}

impl<'a, S> Clone for Scope<'a, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, S> Copy for Scope<'a, S> {}

impl<S> Default for Scope<'_, S> {
    fn default() -> Self {
        Scope::Empty
    }
}

impl<'a, S: Symbol<'a>> Scope<'a, S> {
    /// Freezes `symbols` into a table. On duplicate names the first symbol is kept.
    pub fn from_symbols<I>(arena: &'a BumpaloArena, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
    {
        let mut table = BumpaloVec::new_in(arena);

        table.extend(symbols);
        if table.is_empty() {
            return Scope::Empty;
        }

        table.sort_by(|a, b| a.name().cmp(b.name()));
        table.dedup_by(|later, earlier| later.name() == earlier.name());
        Scope::Table(table.into_bump_slice())
    }

    pub fn find(&self, name: &str) -> Option<S> {
        match self {
            Scope::Empty => None,
            Scope::Table(table) => table
                .binary_search_by(|s| s.name().cmp(name))
                .ok()
                .map(|i| table[i]),
            Scope::Merged(scopes) => scopes.iter().find_map(|scope| scope.find(name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Scope::Empty)
    }

    /// Every visible symbol, shadowed ones excluded.
    pub fn symbols(&self) -> Vec<S> {
        match self {
            Scope::Empty => vec![],
            Scope::Table(table) => table.to_vec(),
            Scope::Merged(scopes) => {
                let mut symbols: Vec<S> = vec![];

                for symbol in scopes.iter().flat_map(|scope| scope.symbols()) {
                    if !symbols.iter().any(|s| s.name() == symbol.name()) {
                        symbols.push(symbol);
                    }
                }
                symbols
            }
        }
    }
}

/// Composes read-only scopes with first-listed precedence.
pub fn merge<'a, S>(arena: &'a BumpaloArena, scopes: &[Scope<'a, S>]) -> Scope<'a, S> {
    let mut flat = Vec::with_capacity(scopes.len());

    for scope in scopes {
        match scope {
            Scope::Empty => {}
            Scope::Table(_) => flat.push(*scope),
            Scope::Merged(inner) => flat.extend_from_slice(inner),
        }
    }

    match flat.len() {
        0 => Scope::Empty,
        1 => flat[0],
        _ => Scope::Merged(arena.alloc_slice_copy(&flat)),
    }
}

/// Mutable, single-use accumulator that freezes into a `Scope`.
#[derive(Debug)]
pub struct ScopeBuilder<'a, S> {
    table: HashMap<&'a str, S>,
    base: Scope<'a, S>,
}

impl<S> Default for ScopeBuilder<'_, S> {
    fn default() -> Self {
        Self {
            table: HashMap::new(),
            base: Scope::Empty,
        }
    }
}

impl<'a, S: Symbol<'a>> ScopeBuilder<'a, S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder that falls back to `base` for lookup. Entering a name that `base` already
    /// contains shadows it.
    pub fn with_base(base: Scope<'a, S>) -> Self {
        Self {
            table: HashMap::new(),
            base,
        }
    }

    /// Seeds a builder from `base`: a simple table is copied into the live table, anything
    /// else is retained for fallback lookup.
    pub fn new_from(base: Scope<'a, S>) -> Self {
        match base {
            Scope::Table(symbols) => Self {
                table: symbols.iter().map(|s| (s.name(), *s)).collect(),
                base: Scope::Empty,
            },
            _ => Self::with_base(base),
        }
    }

    /// Returns the symbol now registered under the name and whether `symbol` was inserted.
    /// Only the live table counts as a duplicate, never the base.
    pub fn enter(&mut self, symbol: S) -> (S, bool) {
        match self.table.entry(symbol.name()) {
            Entry::Occupied(entry) => (*entry.get(), false),
            Entry::Vacant(entry) => {
                entry.insert(symbol);
                (symbol, true)
            }
        }
    }

    pub fn reenter(&mut self, symbol: S) {
        self.table.insert(symbol.name(), symbol);
    }

    pub fn find(&self, name: &str) -> Option<S> {
        self.table
            .get(name)
            .copied()
            .or_else(|| self.base.find(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Freezes the live table (leaving it empty) in front of the base.
    pub fn build(&mut self, arena: &'a BumpaloArena) -> Scope<'a, S> {
        let table = std::mem::take(&mut self.table);
        let table = Scope::from_symbols(arena, table.into_iter().map(|(_, s)| s));

        merge(arena, &[table, self.base])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[derive(Debug, PartialEq)]
    struct Named<'a>(&'a str, u32);

    impl<'a> Symbol<'a> for &'a Named<'a> {
        fn name(&self) -> &'a str {
            self.0
        }
    }

    fn named<'a>(arena: &'a BumpaloArena, name: &'a str, n: u32) -> &'a Named<'a> {
        arena.alloc(Named(name, n))
    }

    #[test]
    fn enter_duplicate_keeps_first() {
        let arena = BumpaloArena::new();
        let mut builder = ScopeBuilder::new();

        let (_, inserted) = builder.enter(named(&arena, "a", 1));
        assert!(inserted);

        let (existing, inserted) = builder.enter(named(&arena, "a", 2));
        assert!(!inserted);
        assert_eq!(existing.1, 1);

        let scope = builder.build(&arena);
        assert_eq!(scope.find("a").map(|s| s.1), Some(1));
        assert!(!scope.contains("b"));
    }

    #[test]
    fn reenter_overwrites() {
        let arena = BumpaloArena::new();
        let mut builder = ScopeBuilder::new();

        builder.enter(named(&arena, "a", 1));
        builder.reenter(named(&arena, "a", 2));
        assert_eq!(builder.find("a").map(|s| s.1), Some(2));
    }

    #[test]
    fn build_clears_live_table() {
        let arena = BumpaloArena::new();
        let mut builder = ScopeBuilder::new();

        builder.enter(named(&arena, "a", 1));
        builder.build(&arena);
        assert!(!builder.contains("a"));
    }

    #[test]
    fn merge_precedence_and_flattening() {
        let arena = BumpaloArena::new();
        let first = Scope::from_symbols(&arena, vec![named(&arena, "a", 1)]);
        let second = Scope::from_symbols(
            &arena,
            vec![named(&arena, "a", 2), named(&arena, "b", 2)],
        );
        let third = Scope::from_symbols(&arena, vec![named(&arena, "c", 3)]);

        let inner = merge(&arena, &[first, Scope::Empty, second]);
        assert_matches!(inner, Scope::Merged(scopes) if scopes.len() == 2);

        let outer = merge(&arena, &[inner, third]);
        assert_matches!(outer, Scope::Merged(scopes) if scopes.len() == 3);
        assert_eq!(outer.find("a").map(|s| s.1), Some(1));
        assert_eq!(outer.find("b").map(|s| s.1), Some(2));
        assert_eq!(outer.find("c").map(|s| s.1), Some(3));
        assert_eq!(outer.symbols().len(), 3);

        assert_matches!(merge(&arena, &[Scope::Empty, third]), Scope::Table(_));
        assert_matches!(merge::<&Named<'_>>(&arena, &[]), Scope::Empty);
    }

    #[test]
    fn base_may_be_shadowed() {
        let arena = BumpaloArena::new();
        let base = Scope::from_symbols(&arena, vec![named(&arena, "Int", 0)]);
        let mut builder = ScopeBuilder::with_base(base);

        assert!(builder.contains("Int"));
        let (_, inserted) = builder.enter(named(&arena, "Int", 1));
        assert!(inserted);

        let scope = builder.build(&arena);
        assert_eq!(scope.find("Int").map(|s| s.1), Some(1));
    }

    #[test]
    fn new_from_flattens_simple_scope() {
        let arena = BumpaloArena::new();
        let base = Scope::from_symbols(&arena, vec![named(&arena, "a", 1)]);

        // copied into the live table, so re-entering is a duplicate
        let mut builder = ScopeBuilder::new_from(base);
        let (_, inserted) = builder.enter(named(&arena, "a", 2));
        assert!(!inserted);

        // a merged base is kept for lookup only
        let merged = merge(
            &arena,
            &[base, Scope::from_symbols(&arena, vec![named(&arena, "b", 1)])],
        );
        let mut builder = ScopeBuilder::new_from(merged);
        let (_, inserted) = builder.enter(named(&arena, "a", 2));
        assert!(inserted);
        assert!(builder.contains("b"));
    }
}
