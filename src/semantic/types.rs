use super::errors::InternalError;
use super::scope::{Scope, Symbol};
use crate::arena::BumpaloArena;
use crate::syntax::Expression;
use std::cell::Cell;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// A named handle to a type that may not be known yet. Binding is one-shot.
pub struct TypeSymbol<'a> {
    id: SymbolId,
    name: &'a str,
    r#type: Cell<Option<&'a Type<'a>>>,
}

impl<'a> TypeSymbol<'a> {
    pub fn id(&self) -> SymbolId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }

    pub fn r#type(&self) -> Option<&'a Type<'a>> {
        self.r#type.get()
    }

    pub fn is_bound(&self) -> bool {
        self.r#type.get().is_some()
    }

    pub fn bind(&self, ty: &'a Type<'a>) -> Result<(), InternalError> {
        if self.is_bound() {
            return Err(InternalError::SymbolRebound(self.to_string()));
        }

        self.r#type.set(Some(ty));
        Ok(())
    }

    pub fn is_error(&self) -> bool {
        self.r#type().map_or(false, Type::is_error)
    }

    pub fn display_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Debug for TypeSymbol<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSymbol")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl fmt::Display for TypeSymbol<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.r#type() {
            _ if !self.is_anonymous() => {
                if let Some(container) = self.r#type().and_then(Type::container) {
                    write!(f, "{}.", container)?;
                }
                write!(f, "{}", self.name)
            }
            Some(ty) => fmt::Display::fmt(ty, f),
            None => fmt::Display::fmt(&self.id, f),
        }
    }
}

impl<'a> Symbol<'a> for &'a TypeSymbol<'a> {
    fn name(&self) -> &'a str {
        self.name
    }
}

/// Type identity, except that arrays and references compare structurally.
pub fn same_type<'a>(a: &'a TypeSymbol<'a>, b: &'a TypeSymbol<'a>) -> bool {
    if std::ptr::eq(a, b) {
        return true;
    }

    let (t, v) = match (a.r#type(), b.r#type()) {
        (Some(t), Some(v)) => (t, v),
        _ => return false,
    };

    if std::ptr::eq(t, v) {
        return true;
    }

    match (t.kind(), v.kind()) {
        (
            TypeKind::Array { elements, size },
            TypeKind::Array {
                elements: other_elements,
                size: other_size,
            },
        ) => size == other_size && same_type(elements, other_elements),
        (TypeKind::Reference { referant }, TypeKind::Reference { referant: other }) => {
            same_type(referant, other)
        }
        _ => false,
    }
}

#[derive(Debug, Clone, Copy)]
pub enum TypeKind<'a> {
    Record,
    Array {
        elements: &'a TypeSymbol<'a>,
        /// `None` for an unbounded array.
        size: Option<usize>,
    },
    Reference {
        referant: &'a TypeSymbol<'a>,
    },
    Module,
    Error,
}

/// An immutable type, built once.
#[derive(Debug)]
pub struct Type<'a> {
    symbol: &'a TypeSymbol<'a>,
    kind: TypeKind<'a>,
    members: &'a [&'a Member<'a>],
    member_scope: Scope<'a, &'a Member<'a>>,
    type_scope: Scope<'a, &'a TypeSymbol<'a>>,
    signatures: &'a [&'a Signature<'a>],
    container: Option<&'a TypeSymbol<'a>>,
}

/// Everything but the symbol that goes into a new `Type`.
#[derive(Debug)]
pub struct TypeParts<'a> {
    pub kind: TypeKind<'a>,
    pub members: &'a [&'a Member<'a>],
    /// Derived from `members` when `None`.
    pub member_scope: Option<Scope<'a, &'a Member<'a>>>,
    pub type_scope: Option<Scope<'a, &'a TypeSymbol<'a>>>,
    pub signatures: &'a [&'a Signature<'a>],
    pub container: Option<&'a TypeSymbol<'a>>,
}

impl<'a> TypeParts<'a> {
    pub fn new(kind: TypeKind<'a>) -> Self {
        Self {
            kind,
            members: &[],
            member_scope: None,
            type_scope: None,
            signatures: &[],
            container: None,
        }
    }
}

impl<'a> Type<'a> {
    pub fn symbol(&self) -> &'a TypeSymbol<'a> {
        self.symbol
    }

    pub fn kind(&self) -> TypeKind<'a> {
        self.kind
    }

    pub fn members(&self) -> &'a [&'a Member<'a>] {
        self.members
    }

    pub fn member_scope(&self) -> Scope<'a, &'a Member<'a>> {
        self.member_scope
    }

    pub fn type_scope(&self) -> Scope<'a, &'a TypeSymbol<'a>> {
        self.type_scope
    }

    pub fn signatures(&self) -> &'a [&'a Signature<'a>] {
        self.signatures
    }

    pub fn container(&self) -> Option<&'a TypeSymbol<'a>> {
        self.container
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, TypeKind::Error)
    }

    pub fn find_member(&self, name: &str) -> Option<&'a Member<'a>> {
        self.member_scope.find(name)
    }

    pub fn find_type(&self, name: &str) -> Option<&'a TypeSymbol<'a>> {
        self.type_scope.find(name)
    }

    pub fn display_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.symbol.is_anonymous() {
            return fmt::Display::fmt(self.symbol, f);
        }

        match self.kind {
            TypeKind::Array {
                elements,
                size: Some(size),
            } => write!(f, "{}[{}]", elements, size),
            TypeKind::Array { elements, .. } => write!(f, "{}[]", elements),
            TypeKind::Reference { referant } => write!(f, "*{}", referant),
            TypeKind::Record | TypeKind::Module | TypeKind::Error => {
                let members = self.members.iter().map(|m| m.to_string());
                let signatures = self.signatures.iter().map(|s| s.to_string());

                write!(f, "<{}>", members.chain(signatures).collect::<Vec<_>>().join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Immutable,
    Mutable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Module-level `let` and builtin operators.
    Value,
    Field(Mutability),
}

#[derive(Debug)]
pub struct Member<'a> {
    name: &'a str,
    r#type: &'a TypeSymbol<'a>,
    kind: MemberKind,
}

impl<'a> Member<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn r#type(&self) -> &'a TypeSymbol<'a> {
        self.r#type
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn is_mutable(&self) -> bool {
        self.kind == MemberKind::Field(Mutability::Mutable)
    }
}

impl<'a> Symbol<'a> for &'a Member<'a> {
    fn name(&self) -> &'a str {
        self.name
    }
}

impl fmt::Display for Member<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.r#type)
    }
}

/// One callable overload.
#[derive(Debug)]
pub struct Signature<'a> {
    receiver: Option<&'a TypeSymbol<'a>>,
    parameters: &'a [Parameter<'a>],
    result: &'a TypeSymbol<'a>,
}

impl<'a> Signature<'a> {
    pub fn receiver(&self) -> Option<&'a TypeSymbol<'a>> {
        self.receiver
    }

    pub fn parameters(&self) -> &'a [Parameter<'a>] {
        self.parameters
    }

    pub fn result(&self) -> &'a TypeSymbol<'a> {
        self.result
    }
}

impl fmt::Display for Signature<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parameters = self
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, p.r#type))
            .collect::<Vec<_>>();

        if parameters.is_empty() {
            write!(f, "{{-> {}}}", self.result)
        } else {
            write!(f, "{{{} -> {}}}", parameters.join(", "), self.result)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Parameter<'a> {
    pub name: &'a str,
    pub r#type: &'a TypeSymbol<'a>,
    /// Satisfies the parameter when a call leaves it unmatched.
    pub default: Option<&'a Expression<'a>>,
}

impl<'a> Parameter<'a> {
    pub fn new(name: &'a str, r#type: &'a TypeSymbol<'a>) -> Self {
        Self {
            name,
            r#type,
            default: None,
        }
    }
}

/// An entry of a module scope. Types and values share one namespace.
#[derive(Debug, Clone, Copy)]
pub enum Declaration<'a> {
    Type(&'a TypeSymbol<'a>),
    Value(&'a Member<'a>),
}

impl<'a> Declaration<'a> {
    pub fn type_symbol(&self) -> Option<&'a TypeSymbol<'a>> {
        if let Declaration::Type(symbol) = self {
            Some(symbol)
        } else {
            None
        }
    }

    pub fn value(&self) -> Option<&'a Member<'a>> {
        if let Declaration::Value(member) = self {
            Some(member)
        } else {
            None
        }
    }
}

impl<'a> Symbol<'a> for Declaration<'a> {
    fn name(&self) -> &'a str {
        match self {
            Declaration::Type(symbol) => symbol.name,
            Declaration::Value(member) => member.name,
        }
    }
}

/// Allocates semantic objects and hands out symbol ids.
#[derive(Debug)]
pub struct TypeArena<'a> {
    arena: &'a BumpaloArena,
    seq: Cell<u32>,
}

impl<'a> TypeArena<'a> {
    pub fn new(arena: &'a BumpaloArena) -> Self {
        Self {
            arena,
            seq: Cell::new(0),
        }
    }

    pub fn arena(&self) -> &'a BumpaloArena {
        self.arena
    }

    pub fn alloc_str(&self, s: &str) -> &'a str {
        self.arena.alloc_str(s)
    }

    pub fn new_symbol(&self, name: &str) -> &'a TypeSymbol<'a> {
        let id = SymbolId(self.seq.get());

        self.seq.set(id.0 + 1);
        self.arena.alloc(TypeSymbol {
            id,
            name: self.alloc_str(name),
            r#type: Cell::new(None),
        })
    }

    pub fn anonymous_symbol(&self) -> &'a TypeSymbol<'a> {
        self.new_symbol("")
    }

    /// Builds a type, binding `symbol` to it when `symbol` is still unbound.
    pub fn new_type(&self, symbol: &'a TypeSymbol<'a>, parts: TypeParts<'a>) -> &'a Type<'a> {
        let arena = self.arena;
        let member_scope = parts
            .member_scope
            .unwrap_or_else(|| Scope::from_symbols(arena, parts.members.iter().copied()));
        let ty = arena.alloc(Type {
            symbol,
            kind: parts.kind,
            members: parts.members,
            member_scope,
            type_scope: parts.type_scope.unwrap_or_default(),
            signatures: parts.signatures,
            container: parts.container,
        });

        if !symbol.is_bound() {
            symbol.r#type.set(Some(ty));
        }
        ty
    }

    pub fn array_type(&self, elements: &'a TypeSymbol<'a>, size: Option<usize>) -> &'a Type<'a> {
        self.new_type(
            self.anonymous_symbol(),
            TypeParts::new(TypeKind::Array { elements, size }),
        )
    }

    pub fn reference_type(&self, referant: &'a TypeSymbol<'a>) -> &'a Type<'a> {
        self.new_type(
            self.anonymous_symbol(),
            TypeParts::new(TypeKind::Reference { referant }),
        )
    }

    /// The sentinel for failed resolutions. A context keeps exactly one.
    pub fn error_type(&self) -> &'a Type<'a> {
        self.new_type(self.new_symbol("Error"), TypeParts::new(TypeKind::Error))
    }

    pub fn member(&self, name: &str, r#type: &'a TypeSymbol<'a>, kind: MemberKind) -> &'a Member<'a> {
        self.arena.alloc(Member {
            name: self.alloc_str(name),
            r#type,
            kind,
        })
    }

    pub fn signature(
        &self,
        receiver: Option<&'a TypeSymbol<'a>>,
        parameters: &[Parameter<'a>],
        result: &'a TypeSymbol<'a>,
    ) -> &'a Signature<'a> {
        self.arena.alloc(Signature {
            receiver,
            parameters: self.arena.alloc_slice_copy(parameters),
            result,
        })
    }

    pub fn alloc_members(&self, members: &[&'a Member<'a>]) -> &'a [&'a Member<'a>] {
        self.arena.alloc_slice_copy(members)
    }

    pub fn alloc_signatures(&self, signatures: &[&'a Signature<'a>]) -> &'a [&'a Signature<'a>] {
        self.arena.alloc_slice_copy(signatures)
    }

    /// A bound record type without members, e.g. a builtin.
    pub fn record(&self, name: &str) -> &'a TypeSymbol<'a> {
        let symbol = self.new_symbol(name);

        self.new_type(symbol, TypeParts::new(TypeKind::Record));
        symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn nested_display_name() {
        let arena = BumpaloArena::new();
        let types = TypeArena::new(&arena);

        let c = types.record("C");
        let n = types.new_symbol("N");
        types.new_type(
            n,
            TypeParts {
                container: Some(c),
                ..TypeParts::new(TypeKind::Record)
            },
        );

        assert_eq!(n.display_name(), "C.N");
        assert_eq!(c.display_name(), "C");
    }

    #[test]
    fn anonymous_display_name() {
        let arena = BumpaloArena::new();
        let types = TypeArena::new(&arena);
        let int = types.record("Int");

        let a = types.member("a", int, MemberKind::Field(Mutability::Immutable));
        let ty = types.new_type(
            types.anonymous_symbol(),
            TypeParts {
                members: types.alloc_members(&[a]),
                ..TypeParts::new(TypeKind::Record)
            },
        );
        assert_eq!(ty.display_name(), "<a: Int>");
        assert_eq!(ty.symbol().display_name(), "<a: Int>");

        let b = types.member("b", int, MemberKind::Field(Mutability::Mutable));
        let add = types.signature(
            None,
            &[Parameter::new("x", int), Parameter::new("y", int)],
            int,
        );
        let ty = types.new_type(
            types.anonymous_symbol(),
            TypeParts {
                members: types.alloc_members(&[a, b]),
                signatures: types.alloc_signatures(&[add]),
                ..TypeParts::new(TypeKind::Record)
            },
        );
        assert_eq!(ty.display_name(), "<a: Int, b: Int, {x: Int, y: Int -> Int}>");
        assert_eq!(ty.find_member("b").map(|m| m.is_mutable()), Some(true));
    }

    #[test]
    fn array_and_reference_display_name() {
        let arena = BumpaloArena::new();
        let types = TypeArena::new(&arena);
        let int = types.record("Int");

        let unbounded = types.array_type(int, None);
        let bounded = types.array_type(int, Some(3));
        let reference = types.reference_type(bounded.symbol());

        assert_eq!(unbounded.display_name(), "Int[]");
        assert_eq!(bounded.display_name(), "Int[3]");
        assert_eq!(reference.display_name(), "*Int[3]");
        assert!(reference.member_scope().is_empty());
        assert!(reference.signatures().is_empty());
    }

    #[test]
    fn unbound_anonymous_symbol() {
        let arena = BumpaloArena::new();
        let types = TypeArena::new(&arena);

        types.new_symbol("T");
        let var = types.anonymous_symbol();
        assert_eq!(var.display_name(), "?1");
    }

    #[test]
    fn bind_once() {
        let arena = BumpaloArena::new();
        let types = TypeArena::new(&arena);
        let int = types.record("Int");
        let boolean = types.record("Boolean");

        let var = types.anonymous_symbol();
        assert!(var.bind(int.r#type().unwrap()).is_ok());
        assert_matches!(
            var.bind(boolean.r#type().unwrap()),
            Err(InternalError::SymbolRebound(_))
        );
        assert_eq!(var.display_name(), "Int");
    }

    #[test]
    fn new_type_keeps_existing_binding() {
        let arena = BumpaloArena::new();
        let types = TypeArena::new(&arena);
        let int = types.record("Int");
        let before = int.r#type().unwrap();

        types.new_type(int, TypeParts::new(TypeKind::Record));
        assert!(std::ptr::eq(int.r#type().unwrap(), before));
    }

    #[test]
    fn structural_sameness() {
        let arena = BumpaloArena::new();
        let types = TypeArena::new(&arena);
        let int = types.record("Int");
        let long = types.record("Long");

        let a = types.array_type(int, None).symbol();
        let b = types.array_type(int, None).symbol();
        let c = types.array_type(long, None).symbol();
        let d = types.array_type(int, Some(2)).symbol();

        assert!(same_type(a, b));
        assert!(!same_type(a, c));
        assert!(!same_type(a, d));
        assert!(same_type(
            types.reference_type(a).symbol(),
            types.reference_type(b).symbol()
        ));
        assert!(!same_type(int, long));
        assert!(!same_type(types.anonymous_symbol(), types.anonymous_symbol()));

        let error = types.error_type();
        assert!(error.symbol().is_error());
        assert!(!int.is_error());
    }
}
