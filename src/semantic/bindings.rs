//! Unification of type symbols.
//!
//! Unbound symbols unified with each other form a group in an `ena` union-find table. When
//! any member of a group gets bound, the type is copied to every other member and each newly
//! bound symbol is queued as "settled" so that the inferencer can wake up whatever waits on it.
use super::errors::InternalError;
use super::types::{SymbolId, Type, TypeKind, TypeSymbol};
use ena::unify::{InPlaceUnificationTable, NoError, UnifyKey, UnifyValue};
use log::trace;
use std::collections::HashMap;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupKey(u32);

/// Members of one binding group.
#[derive(Clone, Debug, Default)]
pub struct Group(Vec<SymbolId>);

impl UnifyKey for GroupKey {
    type Value = Group;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        GroupKey(u)
    }

    fn tag() -> &'static str {
        "GroupKey"
    }
}

impl UnifyValue for Group {
    type Error = NoError;

    fn unify_values(a: &Self, b: &Self) -> Result<Self, Self::Error> {
        let mut members = Vec::with_capacity(a.0.len() + b.0.len());

        members.extend_from_slice(&a.0);
        members.extend_from_slice(&b.0);
        Ok(Group(members))
    }
}

pub struct Bindings<'a> {
    table: InPlaceUnificationTable<GroupKey>,
    keys: HashMap<SymbolId, GroupKey>,
    symbols: HashMap<SymbolId, &'a TypeSymbol<'a>>,
    settled: Vec<&'a TypeSymbol<'a>>,
}

impl<'a> Default for Bindings<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Bindings<'a> {
    pub fn new() -> Self {
        Self {
            table: InPlaceUnificationTable::new(),
            keys: HashMap::new(),
            symbols: HashMap::new(),
            settled: vec![],
        }
    }

    /// Returns the group key of `symbol`, creating a singleton group on first sight.
    fn remember(&mut self, symbol: &'a TypeSymbol<'a>) -> GroupKey {
        if let Some(key) = self.keys.get(&symbol.id()) {
            return *key;
        }

        let key = self.table.new_key(Group(vec![symbol.id()]));

        self.keys.insert(symbol.id(), key);
        self.symbols.insert(symbol.id(), symbol);
        key
    }

    fn members(&mut self, symbol: &'a TypeSymbol<'a>) -> Vec<&'a TypeSymbol<'a>> {
        let key = match self.keys.get(&symbol.id()) {
            Some(key) => *key,
            None => return vec![symbol],
        };
        let group = self.table.probe_value(key);

        group
            .0
            .iter()
            .filter_map(|id| self.symbols.get(id).copied())
            .collect()
    }

    /// Asserts that `t` and `v` denote the same type. Returns `false` when they cannot.
    pub fn unify(
        &mut self,
        t: &'a TypeSymbol<'a>,
        v: &'a TypeSymbol<'a>,
    ) -> Result<bool, InternalError> {
        if std::ptr::eq(t, v) {
            return Ok(true);
        }

        trace!("[unify] {} ~ {}", t, v);
        match (t.r#type(), v.r#type()) {
            (Some(ty), None) => {
                self.bind_type(v, ty)?;
                Ok(true)
            }
            (None, Some(ty)) => {
                self.bind_type(t, ty)?;
                Ok(true)
            }
            (Some(a), Some(b)) => {
                if std::ptr::eq(a, b) {
                    return Ok(true);
                }

                match (a.kind(), b.kind()) {
                    (TypeKind::Array { elements: a, .. }, TypeKind::Array { elements: b, .. }) => {
                        self.unify(a, b)
                    }
                    (TypeKind::Reference { referant: a }, TypeKind::Reference { referant: b }) => {
                        self.unify(a, b)
                    }
                    _ => Ok(false),
                }
            }
            (None, None) => {
                let a = self.remember(t);
                let b = self.remember(v);

                self.table.union(a, b);
                Ok(true)
            }
        }
    }

    /// Binds the unbound `symbol` and everything grouped with it.
    pub fn bind_type(
        &mut self,
        symbol: &'a TypeSymbol<'a>,
        ty: &'a Type<'a>,
    ) -> Result<(), InternalError> {
        symbol.bind(ty)?;
        self.settled.push(symbol);
        self.settle_bound(symbol)
    }

    /// Propagates the type of an already bound `symbol` to the rest of its group.
    pub fn settle_bound(&mut self, symbol: &'a TypeSymbol<'a>) -> Result<(), InternalError> {
        let ty = match symbol.r#type() {
            Some(ty) => ty,
            None => return Ok(()),
        };

        for member in self.members(symbol) {
            if !member.is_bound() {
                member.bind(ty)?;
                self.settled.push(member);
            }
        }
        Ok(())
    }

    /// Symbols bound since the last call.
    pub fn take_settled(&mut self) -> Vec<&'a TypeSymbol<'a>> {
        std::mem::take(&mut self.settled)
    }

    pub fn same_group(&mut self, t: &'a TypeSymbol<'a>, v: &'a TypeSymbol<'a>) -> bool {
        match (self.keys.get(&t.id()), self.keys.get(&v.id())) {
            (Some(a), Some(b)) => {
                let (a, b) = (*a, *b);
                self.table.find(a) == self.table.find(b)
            }
            _ => std::ptr::eq(t, v),
        }
    }
}
