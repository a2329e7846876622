//! Node set
//! --------
//!
//! ```ignore
//! Module         := Binding (";" Binding)*            -- a right-nested Sequence
//! Binding        := LetDefinition | Extension | Expression
//! LetDefinition  := ("let" | "var") Id (":" Type)? ("=" Expression)?
//! Extension      := "extend" Type TypeLiteral
//! Expression     := Literal | Id | Expression "." Id | Expression "(" Argument* ")"
//! Argument       := (Id "=")? Expression
//! Type           := Id | Type "." Id | Type "[" Expression? "]" | "*" Type | TypeLiteral
//! TypeLiteral    := "<" (Member ",")* Member? ">"
//! Member         := "var"? Id ":" Type
//!                 | "{" (Parameter ",")* Parameter? "->" Type "}"
//!                 | "let" Id "=" TypeLiteral
//! Parameter      := Id ":" Type ("=" Expression)?
//! ```
//!
//! Operators reach the binder as calls whose target is a bare name (`+(a, b)`), because the
//! operator vocabulary is owned by the parser.
use super::{EffectiveRange, Locatable};
use crate::arena::BumpaloArena;
use std::cell::Cell;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owner of the arena every node (and every semantic object built from the nodes) lives in.
#[derive(Debug, Default)]
pub struct Ast {
    arena: BumpaloArena,
    seq: Cell<u32>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arena(&self) -> &BumpaloArena {
        &self.arena
    }

    pub fn alloc_expression<'a>(
        &'a self,
        kind: ExpressionKind<'a>,
        range: EffectiveRange,
    ) -> &'a Expression<'a> {
        let id = NodeId(self.seq.get());

        self.seq.set(id.0 + 1);
        self.arena.alloc(Expression { id, kind, range })
    }

    pub fn alloc_str(&self, s: &str) -> &str {
        self.arena.alloc_str(s)
    }

    pub fn alloc_members<'a>(
        &'a self,
        members: &[TypeLiteralMember<'a>],
    ) -> &'a [TypeLiteralMember<'a>] {
        self.arena.alloc_slice_copy(members)
    }

    pub fn alloc_parameters<'a>(
        &'a self,
        parameters: &[Parameter<'a>],
    ) -> &'a [Parameter<'a>] {
        self.arena.alloc_slice_copy(parameters)
    }

    fn expression<'a>(&'a self, kind: ExpressionKind<'a>) -> &'a Expression<'a> {
        self.alloc_expression(kind, EffectiveRange::default())
    }

    // --- Literals

    pub fn literal<'a>(&'a self, literal: Literal<'a>) -> &'a Expression<'a> {
        self.expression(ExpressionKind::Literal(literal))
    }

    pub fn int(&self, value: i32) -> &Expression<'_> {
        self.literal(Literal::Int(value))
    }

    pub fn long(&self, value: i64) -> &Expression<'_> {
        self.literal(Literal::Long(value))
    }

    pub fn double(&self, value: f64) -> &Expression<'_> {
        self.literal(Literal::Double(value))
    }

    pub fn float(&self, value: f32) -> &Expression<'_> {
        self.literal(Literal::Float(value))
    }

    pub fn boolean(&self, value: bool) -> &Expression<'_> {
        self.literal(Literal::Boolean(value))
    }

    pub fn string(&self, value: &str) -> &Expression<'_> {
        let value = self.alloc_str(value);
        self.literal(Literal::String(value))
    }

    // --- Expressions

    pub fn name(&self, name: &str) -> &Expression<'_> {
        let name = self.alloc_str(name);
        self.expression(ExpressionKind::Name(name))
    }

    pub fn selection<'a>(&'a self, target: &'a Expression<'a>, member: &str) -> &'a Expression<'a> {
        self.expression(self.selection_kind(target, member))
    }

    pub(super) fn selection_kind<'a>(
        &'a self,
        target: &'a Expression<'a>,
        member: &str,
    ) -> ExpressionKind<'a> {
        let member = self.alloc_str(member);
        ExpressionKind::Selection(self.arena.alloc(Selection { target, member }))
    }

    pub fn call<'a>(
        &'a self,
        target: &'a Expression<'a>,
        arguments: &[&'a Expression<'a>],
    ) -> &'a Expression<'a> {
        self.expression(self.call_kind(target, arguments))
    }

    pub(super) fn call_kind<'a>(
        &'a self,
        target: &'a Expression<'a>,
        arguments: &[&'a Expression<'a>],
    ) -> ExpressionKind<'a> {
        let arguments = self.arena.alloc_slice_copy(arguments);
        ExpressionKind::Call(self.arena.alloc(Call { target, arguments }))
    }

    pub fn named_argument<'a>(&'a self, name: &str, value: &'a Expression<'a>) -> &'a Expression<'a> {
        self.expression(self.named_argument_kind(name, value))
    }

    pub(super) fn named_argument_kind<'a>(
        &'a self,
        name: &str,
        value: &'a Expression<'a>,
    ) -> ExpressionKind<'a> {
        let name = self.alloc_str(name);
        ExpressionKind::NamedArgument(self.arena.alloc(NamedArgument { name, value }))
    }

    pub fn sequence<'a>(
        &'a self,
        left: &'a Expression<'a>,
        right: &'a Expression<'a>,
    ) -> &'a Expression<'a> {
        self.expression(self.sequence_kind(left, right))
    }

    pub(super) fn sequence_kind<'a>(
        &'a self,
        left: &'a Expression<'a>,
        right: &'a Expression<'a>,
    ) -> ExpressionKind<'a> {
        ExpressionKind::Sequence(self.arena.alloc(Sequence { left, right }))
    }

    /// Chains bindings into right-nested sequence pairs. `None` for an empty list.
    pub fn sequence_of<'a>(&'a self, items: &[&'a Expression<'a>]) -> Option<&'a Expression<'a>> {
        let (last, init) = items.split_last()?;

        Some(
            init.iter()
                .rev()
                .fold(*last, |right, left| self.sequence(left, right)),
        )
    }

    pub fn let_definition<'a>(&'a self, name: &str, value: &'a Expression<'a>) -> &'a Expression<'a> {
        self.definition(name, false, None, Some(value))
    }

    pub fn var_definition<'a>(
        &'a self,
        name: &str,
        type_annotation: Option<&'a Expression<'a>>,
        value: Option<&'a Expression<'a>>,
    ) -> &'a Expression<'a> {
        self.definition(name, true, type_annotation, value)
    }

    pub fn definition<'a>(
        &'a self,
        name: &str,
        mutable: bool,
        type_annotation: Option<&'a Expression<'a>>,
        value: Option<&'a Expression<'a>>,
    ) -> &'a Expression<'a> {
        self.expression(self.definition_kind(name, mutable, type_annotation, value))
    }

    pub(super) fn definition_kind<'a>(
        &'a self,
        name: &str,
        mutable: bool,
        type_annotation: Option<&'a Expression<'a>>,
        value: Option<&'a Expression<'a>>,
    ) -> ExpressionKind<'a> {
        let name = self.alloc_str(name);
        let definition = self.arena.alloc(LetDefinition {
            name,
            mutable,
            type_annotation,
            value,
        });

        ExpressionKind::LetDefinition(definition)
    }

    // --- Types

    pub fn type_literal<'a>(&'a self, members: &[TypeLiteralMember<'a>]) -> &'a Expression<'a> {
        self.expression(self.type_literal_kind(members))
    }

    pub(super) fn type_literal_kind<'a>(
        &'a self,
        members: &[TypeLiteralMember<'a>],
    ) -> ExpressionKind<'a> {
        let members = self.alloc_members(members);
        ExpressionKind::TypeLiteral(self.arena.alloc(TypeLiteral { members }))
    }

    pub fn array_type<'a>(
        &'a self,
        element: &'a Expression<'a>,
        size: Option<&'a Expression<'a>>,
    ) -> &'a Expression<'a> {
        self.expression(self.array_type_kind(element, size))
    }

    pub(super) fn array_type_kind<'a>(
        &'a self,
        element: &'a Expression<'a>,
        size: Option<&'a Expression<'a>>,
    ) -> ExpressionKind<'a> {
        ExpressionKind::ArrayType(self.arena.alloc(ArrayType { element, size }))
    }

    pub fn reference_type<'a>(&'a self, referant: &'a Expression<'a>) -> &'a Expression<'a> {
        self.expression(self.reference_type_kind(referant))
    }

    pub(super) fn reference_type_kind<'a>(
        &'a self,
        referant: &'a Expression<'a>,
    ) -> ExpressionKind<'a> {
        ExpressionKind::ReferenceType(self.arena.alloc(ReferenceType { referant }))
    }

    pub fn extension<'a>(
        &'a self,
        target: &'a Expression<'a>,
        members: &[TypeLiteralMember<'a>],
    ) -> &'a Expression<'a> {
        self.expression(self.extension_kind(target, members))
    }

    pub(super) fn extension_kind<'a>(
        &'a self,
        target: &'a Expression<'a>,
        members: &[TypeLiteralMember<'a>],
    ) -> ExpressionKind<'a> {
        let members = self.alloc_members(members);
        let body = self.arena.alloc(TypeLiteral { members });

        ExpressionKind::Extension(self.arena.alloc(Extension { target, body }))
    }

    // --- Type literal members

    pub fn field<'a>(&'a self, name: &str, r#type: &'a Expression<'a>) -> TypeLiteralMember<'a> {
        self.field_declaration(name, r#type, false)
    }

    pub fn var_field<'a>(&'a self, name: &str, r#type: &'a Expression<'a>) -> TypeLiteralMember<'a> {
        self.field_declaration(name, r#type, true)
    }

    fn field_declaration<'a>(
        &'a self,
        name: &str,
        r#type: &'a Expression<'a>,
        mutable: bool,
    ) -> TypeLiteralMember<'a> {
        let name = self.alloc_str(name);
        let field = self.arena.alloc(FieldDeclaration {
            name,
            r#type,
            mutable,
            range: r#type.range(),
        });

        TypeLiteralMember::Field(field)
    }

    pub fn signature<'a>(
        &'a self,
        parameters: &[Parameter<'a>],
        result: &'a Expression<'a>,
    ) -> TypeLiteralMember<'a> {
        let parameters = self.alloc_parameters(parameters);
        let signature = self.arena.alloc(SignatureDeclaration {
            parameters,
            result,
            range: result.range(),
        });

        TypeLiteralMember::Signature(signature)
    }

    pub fn parameter<'a>(&'a self, name: &str, r#type: &'a Expression<'a>) -> Parameter<'a> {
        Parameter {
            name: self.alloc_str(name),
            r#type,
            default: None,
            range: r#type.range(),
        }
    }

    pub fn parameter_with_default<'a>(
        &'a self,
        name: &str,
        r#type: &'a Expression<'a>,
        default: &'a Expression<'a>,
    ) -> Parameter<'a> {
        Parameter {
            default: Some(default),
            ..self.parameter(name, r#type)
        }
    }

    pub fn nested_type<'a>(&'a self, name: &str, literal: &'a Expression<'a>) -> TypeLiteralMember<'a> {
        let name = self.alloc_str(name);
        let nested = self.arena.alloc(NestedType {
            name,
            literal,
            range: literal.range(),
        });

        TypeLiteralMember::NestedType(nested)
    }
}

#[derive(Debug)]
pub struct Expression<'a> {
    id: NodeId,
    kind: ExpressionKind<'a>,
    range: EffectiveRange,
}

#[derive(Debug, Clone, Copy)]
pub enum ExpressionKind<'a> {
    Literal(Literal<'a>),
    Name(&'a str),
    Selection(&'a Selection<'a>),
    Call(&'a Call<'a>),
    NamedArgument(&'a NamedArgument<'a>),
    Sequence(&'a Sequence<'a>),
    LetDefinition(&'a LetDefinition<'a>),
    TypeLiteral(&'a TypeLiteral<'a>),
    ArrayType(&'a ArrayType<'a>),
    ReferenceType(&'a ReferenceType<'a>),
    Extension(&'a Extension<'a>),
}

impl<'a> Expression<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> ExpressionKind<'a> {
        self.kind
    }

    pub fn literal(&self) -> Option<Literal<'a>> {
        if let ExpressionKind::Literal(literal) = self.kind {
            Some(literal)
        } else {
            None
        }
    }

    pub fn name(&self) -> Option<&'a str> {
        if let ExpressionKind::Name(name) = self.kind {
            Some(name)
        } else {
            None
        }
    }

    pub fn type_literal(&self) -> Option<&'a TypeLiteral<'a>> {
        if let ExpressionKind::TypeLiteral(literal) = self.kind {
            Some(literal)
        } else {
            None
        }
    }

    pub fn named_argument(&self) -> Option<&'a NamedArgument<'a>> {
        if let ExpressionKind::NamedArgument(argument) = self.kind {
            Some(argument)
        } else {
            None
        }
    }
}

impl Locatable for Expression<'_> {
    fn range(&self) -> EffectiveRange {
        self.range
    }
}

impl fmt::Display for Expression<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ExpressionKind::Literal(literal) => fmt::Display::fmt(&literal, f),
            ExpressionKind::Name(name) => write!(f, "{}", name),
            ExpressionKind::Selection(selection) => {
                write!(f, "{}.{}", selection.target, selection.member)
            }
            ExpressionKind::Call(call) => {
                write!(f, "{}(", call.target)?;
                write_joined(f, call.arguments.iter())?;
                write!(f, ")")
            }
            ExpressionKind::NamedArgument(argument) => {
                write!(f, "{} = {}", argument.name, argument.value)
            }
            ExpressionKind::Sequence(sequence) => {
                write!(f, "{}; {}", sequence.left, sequence.right)
            }
            ExpressionKind::LetDefinition(definition) => {
                let keyword = if definition.mutable { "var" } else { "let" };

                write!(f, "{} {}", keyword, definition.name)?;
                if let Some(annotation) = definition.type_annotation {
                    write!(f, ": {}", annotation)?;
                }
                if let Some(value) = definition.value {
                    write!(f, " = {}", value)?;
                }
                Ok(())
            }
            ExpressionKind::TypeLiteral(literal) => fmt::Display::fmt(literal, f),
            ExpressionKind::ArrayType(array) => match array.size {
                Some(size) => write!(f, "{}[{}]", array.element, size),
                None => write!(f, "{}[]", array.element),
            },
            ExpressionKind::ReferenceType(reference) => write!(f, "*{}", reference.referant),
            ExpressionKind::Extension(extension) => {
                write!(f, "extend {} {}", extension.target, extension.body)
            }
        }
    }
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    let mut it = items.peekable();

    while let Some(item) = it.next() {
        write!(f, "{}", item)?;
        if it.peek().is_some() {
            write!(f, ", ")?;
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal<'a> {
    Rune(char),
    Boolean(bool),
    Byte(u8),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    ULong(u64),
    Null,
    String(&'a str),
    UInt(u32),
}

impl fmt::Display for Literal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Rune(c) => write!(f, "'{}'", c),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Byte(b) => write!(f, "{}b", b),
            Literal::Double(d) => write!(f, "{:?}", d),
            Literal::Float(x) => write!(f, "{:?}f", x),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Long(l) => write!(f, "{}l", l),
            Literal::ULong(l) => write!(f, "{}ul", l),
            Literal::Null => write!(f, "null"),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::UInt(u) => write!(f, "{}u", u),
        }
    }
}

#[derive(Debug)]
pub struct Selection<'a> {
    target: &'a Expression<'a>,
    member: &'a str,
}

impl<'a> Selection<'a> {
    pub fn target(&self) -> &'a Expression<'a> {
        self.target
    }

    pub fn member(&self) -> &'a str {
        self.member
    }
}

#[derive(Debug)]
pub struct Call<'a> {
    target: &'a Expression<'a>,
    arguments: &'a [&'a Expression<'a>],
}

impl<'a> Call<'a> {
    pub fn target(&self) -> &'a Expression<'a> {
        self.target
    }

    pub fn arguments(&self) -> &'a [&'a Expression<'a>] {
        self.arguments
    }
}

#[derive(Debug)]
pub struct NamedArgument<'a> {
    name: &'a str,
    value: &'a Expression<'a>,
}

impl<'a> NamedArgument<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn value(&self) -> &'a Expression<'a> {
        self.value
    }
}

/// A cons-like pair of bindings; walked left then right.
#[derive(Debug)]
pub struct Sequence<'a> {
    left: &'a Expression<'a>,
    right: &'a Expression<'a>,
}

impl<'a> Sequence<'a> {
    pub fn left(&self) -> &'a Expression<'a> {
        self.left
    }

    pub fn right(&self) -> &'a Expression<'a> {
        self.right
    }
}

/// `let NAME (: Type)? = value` or `var NAME (: Type)? (= value)?`
#[derive(Debug)]
pub struct LetDefinition<'a> {
    name: &'a str,
    mutable: bool,
    type_annotation: Option<&'a Expression<'a>>,
    value: Option<&'a Expression<'a>>,
}

impl<'a> LetDefinition<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    pub fn type_annotation(&self) -> Option<&'a Expression<'a>> {
        self.type_annotation
    }

    pub fn value(&self) -> Option<&'a Expression<'a>> {
        self.value
    }

    /// Returns the type literal if this is an immutable `let NAME = <...>` type declaration.
    pub fn declared_type_literal(&self) -> Option<&'a TypeLiteral<'a>> {
        if self.mutable || self.type_annotation.is_some() {
            return None;
        }
        self.value?.type_literal()
    }
}

#[derive(Debug)]
pub struct TypeLiteral<'a> {
    members: &'a [TypeLiteralMember<'a>],
}

impl<'a> TypeLiteral<'a> {
    pub fn members(&self) -> &'a [TypeLiteralMember<'a>] {
        self.members
    }
}

impl fmt::Display for TypeLiteral<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<")?;
        write_joined(f, self.members.iter())?;
        write!(f, ">")
    }
}

#[derive(Debug, Clone, Copy)]
pub enum TypeLiteralMember<'a> {
    Field(&'a FieldDeclaration<'a>),
    Signature(&'a SignatureDeclaration<'a>),
    NestedType(&'a NestedType<'a>),
}

impl Locatable for TypeLiteralMember<'_> {
    fn range(&self) -> EffectiveRange {
        match self {
            TypeLiteralMember::Field(field) => field.range,
            TypeLiteralMember::Signature(signature) => signature.range,
            TypeLiteralMember::NestedType(nested) => nested.range,
        }
    }
}

impl fmt::Display for TypeLiteralMember<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeLiteralMember::Field(field) => {
                if field.mutable {
                    write!(f, "var ")?;
                }
                write!(f, "{}: {}", field.name, field.r#type)
            }
            TypeLiteralMember::Signature(signature) => {
                write!(f, "{{")?;
                write_joined(f, signature.parameters.iter())?;
                write!(f, " -> {}}}", signature.result)
            }
            TypeLiteralMember::NestedType(nested) => {
                write!(f, "let {} = {}", nested.name, nested.literal)
            }
        }
    }
}

/// `var? NAME: Type` inside a type literal.
#[derive(Debug)]
pub struct FieldDeclaration<'a> {
    pub name: &'a str,
    pub r#type: &'a Expression<'a>,
    pub mutable: bool,
    pub range: EffectiveRange,
}

/// `{ parameters -> result }` inside a type literal.
#[derive(Debug)]
pub struct SignatureDeclaration<'a> {
    pub parameters: &'a [Parameter<'a>],
    pub result: &'a Expression<'a>,
    pub range: EffectiveRange,
}

#[derive(Debug, Clone, Copy)]
pub struct Parameter<'a> {
    pub name: &'a str,
    pub r#type: &'a Expression<'a>,
    pub default: Option<&'a Expression<'a>>,
    pub range: EffectiveRange,
}

impl Locatable for Parameter<'_> {
    fn range(&self) -> EffectiveRange {
        self.range
    }
}

impl fmt::Display for Parameter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.r#type)?;
        if let Some(default) = self.default {
            write!(f, " = {}", default)?;
        }
        Ok(())
    }
}

/// `let NAME = <...>` inside a type literal.
#[derive(Debug)]
pub struct NestedType<'a> {
    pub name: &'a str,
    pub literal: &'a Expression<'a>,
    pub range: EffectiveRange,
}

#[derive(Debug)]
pub struct ArrayType<'a> {
    element: &'a Expression<'a>,
    size: Option<&'a Expression<'a>>,
}

impl<'a> ArrayType<'a> {
    pub fn element(&self) -> &'a Expression<'a> {
        self.element
    }

    pub fn size(&self) -> Option<&'a Expression<'a>> {
        self.size
    }
}

#[derive(Debug)]
pub struct ReferenceType<'a> {
    referant: &'a Expression<'a>,
}

impl<'a> ReferenceType<'a> {
    pub fn referant(&self) -> &'a Expression<'a> {
        self.referant
    }
}

/// `extend Target <...>`: adds members and signatures to a type declared in the same module.
#[derive(Debug)]
pub struct Extension<'a> {
    target: &'a Expression<'a>,
    body: &'a TypeLiteral<'a>,
}

impl<'a> Extension<'a> {
    pub fn target(&self) -> &'a Expression<'a> {
        self.target
    }

    pub fn body(&self) -> &'a TypeLiteral<'a> {
        self.body
    }
}
