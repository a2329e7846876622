use super::scope::ScopeBuilder;
use super::types::{
    Member, Signature, SymbolId, Type, TypeArena, TypeKind, TypeParts, TypeSymbol,
};
use std::collections::HashMap;

/// Index of a `TypeBuilder` in the binding context that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuilderId(pub(super) usize);

/// Collects the members, signatures and nested types of one type literal.
#[derive(Debug)]
pub struct TypeBuilder<'a> {
    symbol: &'a TypeSymbol<'a>,
    kind: TypeKind<'a>,
    container: Option<&'a TypeSymbol<'a>>,
    members: Vec<&'a Member<'a>>,
    member_scope: ScopeBuilder<'a, &'a Member<'a>>,
    type_scope: ScopeBuilder<'a, &'a TypeSymbol<'a>>,
    signatures: Vec<&'a Signature<'a>>,
    nested: HashMap<SymbolId, BuilderId>,
}

impl<'a> TypeBuilder<'a> {
    pub fn new(
        symbol: &'a TypeSymbol<'a>,
        kind: TypeKind<'a>,
        container: Option<&'a TypeSymbol<'a>>,
    ) -> Self {
        Self {
            symbol,
            kind,
            container,
            members: vec![],
            member_scope: ScopeBuilder::new(),
            type_scope: ScopeBuilder::new(),
            signatures: vec![],
            nested: HashMap::new(),
        }
    }

    pub fn symbol(&self) -> &'a TypeSymbol<'a> {
        self.symbol
    }

    pub fn add_member(&mut self, member: &'a Member<'a>) -> bool {
        let (_, inserted) = self.member_scope.enter(member);

        if inserted {
            self.members.push(member);
        }
        inserted
    }

    pub fn add_signature(&mut self, signature: &'a Signature<'a>) {
        self.signatures.push(signature);
    }

    pub fn add_type_symbol(&mut self, symbol: &'a TypeSymbol<'a>) -> bool {
        self.type_scope.enter(symbol).1
    }

    pub fn find_type_symbol(&self, name: &str) -> Option<&'a TypeSymbol<'a>> {
        self.type_scope.find(name)
    }

    pub fn find_member(&self, name: &str) -> Option<&'a Member<'a>> {
        self.member_scope.find(name)
    }

    pub fn record_nested_type_builder(&mut self, symbol: &'a TypeSymbol<'a>, builder: BuilderId) {
        self.nested.insert(symbol.id(), builder);
    }

    pub fn find_nested_type_builder(&self, symbol: &'a TypeSymbol<'a>) -> Option<BuilderId> {
        self.nested.get(&symbol.id()).copied()
    }

    pub fn nested_type_builders(&self) -> impl Iterator<Item = BuilderId> + '_ {
        self.nested.values().copied()
    }

    /// Freezes the scopes and materializes the type, binding the builder's symbol.
    pub fn build(&mut self, types: &TypeArena<'a>) -> &'a Type<'a> {
        let arena = types.arena();
        let members = types.alloc_members(&std::mem::take(&mut self.members));
        let signatures = types.alloc_signatures(&std::mem::take(&mut self.signatures));

        types.new_type(
            self.symbol,
            TypeParts {
                kind: self.kind,
                members,
                member_scope: Some(self.member_scope.build(arena)),
                type_scope: Some(self.type_scope.build(arena)),
                signatures,
                container: self.container,
            },
        )
    }
}
