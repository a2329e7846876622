//! Binding of one module.
//!
//! `enter` pre-declares the type literals bound at the top level so that forward references
//! resolve. `build` then declares the module values, fills one `TypeBuilder` per type literal,
//! applies extensions, freezes every builder, and drives the inferencer and the constant
//! evaluator over the values. The result is the `Module` type of the document.
use super::builder::{BuilderId, TypeBuilder};
use super::consteval::{ConstEvaluator, Constant, TypeCode, Value};
use super::errors::{Diagnostic, DiagnosticKind, InternalError};
use super::inferencer::Inferencer;
use super::prelude::Prelude;
use super::scope::{Scope, ScopeBuilder};
use super::types::{
    same_type, Declaration, Member, MemberKind, Mutability, Parameter, Signature, SymbolId, Type,
    TypeArena, TypeKind, TypeParts, TypeSymbol,
};
use crate::arena::BumpaloArena;
use crate::syntax::{
    traverse, Expression, ExpressionKind, Extension, LetDefinition, Locatable,
    SignatureDeclaration, TypeLiteral, TypeLiteralMember, Visitor,
};
use log::debug;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unbound,
    Entered,
    Built,
}

/// A top-level `let` or `var` that is not a type declaration.
#[derive(Debug, Clone, Copy)]
pub struct ModuleValue<'a> {
    node: &'a Expression<'a>,
    definition: &'a LetDefinition<'a>,
    member: &'a Member<'a>,
}

impl<'a> ModuleValue<'a> {
    pub fn node(&self) -> &'a Expression<'a> {
        self.node
    }

    pub fn definition(&self) -> &'a LetDefinition<'a> {
        self.definition
    }

    pub fn member(&self) -> &'a Member<'a> {
        self.member
    }

    pub fn name(&self) -> &'a str {
        self.member.name()
    }

    pub fn r#type(&self) -> &'a TypeSymbol<'a> {
        self.member.r#type()
    }

    pub fn is_mutable(&self) -> bool {
        self.member.is_mutable()
    }
}

pub struct BindingContext<'a> {
    types: &'a TypeArena<'a>,
    prelude: &'a Prelude<'a>,
    module_name: &'a str,
    state: State,
    scope: ScopeBuilder<'a, Declaration<'a>>,
    // Frozen once the module values are declared.
    root: Option<Scope<'a, Declaration<'a>>>,
    declarations: Vec<(&'a TypeSymbol<'a>, &'a TypeLiteral<'a>)>,
    definitions: Vec<(&'a Expression<'a>, &'a LetDefinition<'a>)>,
    extensions: Vec<&'a Extension<'a>>,
    expressions: Vec<&'a Expression<'a>>,
    builders: Vec<TypeBuilder<'a>>,
    parents: Vec<Option<BuilderId>>,
    builder_of: HashMap<SymbolId, BuilderId>,
    defaults: Vec<(&'a Expression<'a>, &'a TypeSymbol<'a>)>,
    values: Vec<ModuleValue<'a>>,
    constants: HashMap<&'a str, Constant>,
    inferencer: Inferencer<'a>,
    evaluator: ConstEvaluator<'a>,
    errors: Vec<Diagnostic>,
    module: Option<&'a Type<'a>>,
}

impl<'a> BindingContext<'a> {
    pub fn new(arena: &'a BumpaloArena, module_name: &str) -> Self {
        let types: &'a TypeArena<'a> = arena.alloc(TypeArena::new(arena));
        let prelude: &'a Prelude<'a> = arena.alloc(Prelude::new(types));

        Self {
            types,
            prelude,
            module_name: types.alloc_str(module_name),
            state: State::Unbound,
            scope: ScopeBuilder::with_base(prelude.scope()),
            root: None,
            declarations: vec![],
            definitions: vec![],
            extensions: vec![],
            expressions: vec![],
            builders: vec![],
            parents: vec![],
            builder_of: HashMap::new(),
            defaults: vec![],
            values: vec![],
            constants: HashMap::new(),
            inferencer: Inferencer::new(prelude),
            evaluator: ConstEvaluator::new(prelude),
            errors: vec![],
            module: None,
        }
    }

    pub fn types(&self) -> &'a TypeArena<'a> {
        self.types
    }

    pub fn prelude(&self) -> &'a Prelude<'a> {
        self.prelude
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    /// The root scope of the module. Only the prelude until the module values are declared.
    pub fn scope(&self) -> Scope<'a, Declaration<'a>> {
        self.root.unwrap_or_else(|| self.prelude.scope())
    }

    pub fn find(&self, name: &str) -> Option<Declaration<'a>> {
        match self.root {
            Some(root) => root.find(name),
            None => self.scope.find(name),
        }
    }

    /// The module type, once built.
    pub fn module(&self) -> Option<&'a Type<'a>> {
        self.module
    }

    /// Type symbols declared at the top level, in source order.
    pub fn declared_types(&self) -> impl Iterator<Item = &'a TypeSymbol<'a>> + '_ {
        self.declarations.iter().map(|(symbol, _)| *symbol)
    }

    pub fn values(&self) -> &[ModuleValue<'a>] {
        &self.values
    }

    /// The folded value of an immutable module value.
    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.get(name)
    }

    pub fn type_of(&self, node: &Expression<'_>) -> Option<&'a TypeSymbol<'a>> {
        self.inferencer.type_of(node)
    }

    fn error<L: Locatable>(&mut self, location: L, kind: DiagnosticKind) {
        self.errors.push(Diagnostic::new(location, kind));
    }

    fn type_error<L: Locatable>(&mut self, location: L, kind: DiagnosticKind) -> &'a TypeSymbol<'a> {
        self.error(location, kind);
        self.prelude.error()
    }

    pub fn enter(&mut self, root: &'a Expression<'a>) -> Result<(), InternalError> {
        match self.state {
            State::Unbound => {}
            State::Entered => return Err(InternalError::AlreadyEntered),
            State::Built => return Err(InternalError::AlreadyBuilt),
        }

        traverse(&mut Enter { context: self }, root);
        self.state = State::Entered;
        Ok(())
    }

    /// Binds the whole module. `root` is only walked if the context was not entered yet.
    pub fn build(&mut self, root: &'a Expression<'a>) -> Result<&'a Type<'a>, InternalError> {
        match self.state {
            State::Unbound => self.enter(root)?,
            State::Entered => {}
            State::Built => return Err(InternalError::AlreadyBuilt),
        }

        self.declare_values();

        let roots = self.declare_types()?;

        self.extend()?;
        for id in roots {
            self.build_type(id)?;
        }

        self.infer()?;
        self.fold_constants();
        self.check_inferred();

        let module = self.build_module();

        self.state = State::Built;
        Ok(module)
    }

    fn declare_values(&mut self) {
        for (node, definition) in std::mem::take(&mut self.definitions) {
            let kind = if definition.is_mutable() {
                MemberKind::Field(Mutability::Mutable)
            } else {
                MemberKind::Value
            };
            let member = self
                .types
                .member(definition.name(), self.types.anonymous_symbol(), kind);

            if self.scope.enter(Declaration::Value(member)).1 {
                debug!("[build] value {}", definition.name());
                self.values.push(ModuleValue {
                    node,
                    definition,
                    member,
                });
            } else {
                self.error(node, DiagnosticKind::DuplicateSymbol);
            }
        }

        let root = self.scope.build(self.types.arena());

        self.root = Some(root);
        self.inferencer.set_scope(root);
    }

    /// Creates a builder for every declared type literal and fills them. Returns the builders
    /// of the top-level declarations.
    fn declare_types(&mut self) -> Result<Vec<BuilderId>, InternalError> {
        let mut roots = vec![];
        let mut literals = vec![];

        for (symbol, literal) in self.declarations.clone() {
            let id = self.new_builder(symbol, None, None);

            roots.push(id);
            literals.push((id, literal));
            self.declare_nested_types(id, literal, &mut literals);
        }

        // Every nested symbol exists before any member is resolved.
        for (id, literal) in literals {
            self.populate(id, literal, None)?;
        }
        Ok(roots)
    }

    fn new_builder(
        &mut self,
        symbol: &'a TypeSymbol<'a>,
        container: Option<&'a TypeSymbol<'a>>,
        parent: Option<BuilderId>,
    ) -> BuilderId {
        let id = BuilderId(self.builders.len());

        self.builders
            .push(TypeBuilder::new(symbol, TypeKind::Record, container));
        self.parents.push(parent);
        self.builder_of.insert(symbol.id(), id);
        id
    }

    /// Declares the nested `let` types of `literal` in builder `id`, recursively, and collects
    /// the nested literals that still have to be populated.
    fn declare_nested_types(
        &mut self,
        id: BuilderId,
        literal: &'a TypeLiteral<'a>,
        literals: &mut Vec<(BuilderId, &'a TypeLiteral<'a>)>,
    ) {
        for &member in literal.members() {
            let nested = match member {
                TypeLiteralMember::NestedType(nested) => nested,
                _ => continue,
            };
            let inner = match nested.literal.type_literal() {
                Some(inner) => inner,
                None => {
                    self.error(nested.literal, DiagnosticKind::ExpectedTypeLiteral);
                    continue;
                }
            };

            let container = self.builders[id.0].symbol();
            let symbol = self.types.new_symbol(nested.name);

            if !self.builders[id.0].add_type_symbol(symbol) {
                self.error(member, DiagnosticKind::DuplicateSymbol);
                continue;
            }

            let child = self.new_builder(symbol, Some(container), Some(id));

            self.builders[id.0].record_nested_type_builder(symbol, child);
            literals.push((child, inner));
            self.declare_nested_types(child, inner, literals);
        }
    }

    /// Adds the fields and signatures of `literal` to builder `id`.
    fn populate(
        &mut self,
        id: BuilderId,
        literal: &'a TypeLiteral<'a>,
        receiver: Option<&'a TypeSymbol<'a>>,
    ) -> Result<(), InternalError> {
        for &member in literal.members() {
            match member {
                TypeLiteralMember::Field(field) => {
                    let ty = self.resolve_type(field.r#type, Some(id))?;
                    let mutability = if field.mutable {
                        Mutability::Mutable
                    } else {
                        Mutability::Immutable
                    };
                    let field = self
                        .types
                        .member(field.name, ty, MemberKind::Field(mutability));

                    if !self.builders[id.0].add_member(field) {
                        self.error(member, DiagnosticKind::DuplicateSymbol);
                    }
                }
                TypeLiteralMember::Signature(signature) => {
                    let signature = self.resolve_signature(signature, receiver, Some(id))?;
                    self.builders[id.0].add_signature(signature);
                }
                TypeLiteralMember::NestedType(_) => {}
            }
        }
        Ok(())
    }

    fn resolve_signature(
        &mut self,
        declaration: &'a SignatureDeclaration<'a>,
        receiver: Option<&'a TypeSymbol<'a>>,
        scope: Option<BuilderId>,
    ) -> Result<&'a Signature<'a>, InternalError> {
        let mut names = HashSet::new();
        let mut parameters = vec![];

        for parameter in declaration.parameters {
            let ty = self.resolve_type(parameter.r#type, scope)?;

            if !names.insert(parameter.name) {
                self.error(parameter, DiagnosticKind::DuplicateSymbol);
                continue;
            }
            if let Some(default) = parameter.default {
                self.defaults.push((default, ty));
            }
            parameters.push(Parameter {
                name: parameter.name,
                r#type: ty,
                default: parameter.default,
            });
        }

        let result = self.resolve_type(declaration.result, scope)?;

        Ok(self.types.signature(receiver, &parameters, result))
    }

    /// Looks `name` up in the nested types of `scope` and of its enclosing builders.
    fn find_type_symbol(&self, name: &str, mut scope: Option<BuilderId>) -> Option<&'a TypeSymbol<'a>> {
        while let Some(id) = scope {
            if let Some(symbol) = self.builders[id.0].find_type_symbol(name) {
                return Some(symbol);
            }
            scope = self.parents[id.0];
        }
        None
    }

    /// Resolves a type expression seen from builder `scope`. Failures report a diagnostic and
    /// resolve to the error type.
    fn resolve_type(
        &mut self,
        node: &'a Expression<'a>,
        scope: Option<BuilderId>,
    ) -> Result<&'a TypeSymbol<'a>, InternalError> {
        let symbol = match node.kind() {
            ExpressionKind::Name(name) => match self.find_type_symbol(name, scope) {
                Some(symbol) => symbol,
                None => match self.find(name) {
                    Some(Declaration::Type(symbol)) => symbol,
                    Some(Declaration::Value(_)) => {
                        self.type_error(node, DiagnosticKind::ExpectedType)
                    }
                    None => self.type_error(node, DiagnosticKind::SymbolNotFound),
                },
            },
            ExpressionKind::Selection(selection) => {
                let target = self.resolve_type(selection.target(), scope)?;

                if target.is_error() {
                    return Ok(target);
                }

                // Built types answer through their frozen scope, the rest through their builder.
                let found = match (target.r#type(), self.builder_of.get(&target.id())) {
                    (Some(ty), _) => ty.find_type(selection.member()),
                    (None, Some(&id)) => self.builders[id.0].find_type_symbol(selection.member()),
                    (None, None) => None,
                };

                match found {
                    Some(symbol) => symbol,
                    None => self.type_error(node, DiagnosticKind::MemberNotFound),
                }
            }
            ExpressionKind::ArrayType(array) => {
                let elements = self.resolve_type(array.element(), scope)?;
                let size = match array.size() {
                    None => None,
                    Some(size) => match self.evaluator.eval(size) {
                        Constant {
                            code: TypeCode::Int,
                            value: Value::Int(n),
                        } if n >= 0 => Some(n as usize),
                        _ => return Ok(self.type_error(size, DiagnosticKind::InvalidArraySize)),
                    },
                };

                self.types.array_type(elements, size).symbol()
            }
            ExpressionKind::ReferenceType(reference) => {
                let referant = self.resolve_type(reference.referant(), scope)?;

                self.types.reference_type(referant).symbol()
            }
            ExpressionKind::TypeLiteral(literal) => {
                let symbol = self.types.anonymous_symbol();
                let id = self.new_builder(symbol, None, scope);
                let mut literals = vec![(id, literal)];

                self.declare_nested_types(id, literal, &mut literals);
                for (id, literal) in literals {
                    self.populate(id, literal, None)?;
                }
                self.build_type(id)?;
                symbol
            }
            _ => self.type_error(node, DiagnosticKind::ExpectedType),
        };

        Ok(symbol)
    }

    fn extend(&mut self) -> Result<(), InternalError> {
        for extension in std::mem::take(&mut self.extensions) {
            let target = self.resolve_type(extension.target(), None)?;

            if target.is_error() {
                continue;
            }

            // Only types still under construction in this module accept new members.
            let id = match self.builder_of.get(&target.id()) {
                Some(&id) if !target.is_bound() => id,
                _ => {
                    self.error(
                        extension.target(),
                        DiagnosticKind::CannotExtend(target.display_name()),
                    );
                    continue;
                }
            };

            debug!("[build] extend {}", target);

            let mut literals = vec![];

            self.declare_nested_types(id, extension.body(), &mut literals);
            self.populate(id, extension.body(), Some(target))?;
            for (id, literal) in literals {
                self.populate(id, literal, None)?;
            }
        }
        Ok(())
    }

    /// Builds the nested types of builder `id`, then the builder itself.
    fn build_type(&mut self, id: BuilderId) -> Result<&'a Type<'a>, InternalError> {
        let nested = self.builders[id.0]
            .nested_type_builders()
            .collect::<Vec<_>>();

        for child in nested {
            self.build_type(child)?;
        }

        let ty = self.builders[id.0].build(self.types);

        debug!("[build] {} = {}", ty.symbol(), ty);
        self.inferencer.bound(ty.symbol())?;
        Ok(ty)
    }

    fn infer(&mut self) -> Result<(), InternalError> {
        for value in self.values.clone() {
            let symbol = value.r#type();

            if let Some(annotation) = value.definition.type_annotation() {
                let annotated = self.resolve_type(annotation, None)?;

                self.inferencer.unify(symbol, annotated)?;
            }

            if let Some(node) = value.definition.value() {
                self.inferencer.infer(node)?;
                self.inferencer.pend(node, move |inferencer, found| {
                    if !inferencer.unify(symbol, found)? && !found.is_error() && !symbol.is_error()
                    {
                        inferencer.error(
                            node,
                            DiagnosticKind::TypeMismatch {
                                expected: symbol.display_name(),
                                found: found.display_name(),
                            },
                        );
                    }
                    Ok(())
                })?;
            }
        }

        for (default, expected) in std::mem::take(&mut self.defaults) {
            self.inferencer.infer(default)?;
            self.inferencer.pend_resolved(default, move |inferencer, ty| {
                let found = ty.symbol();

                if !found.is_error() && !expected.is_error() && !same_type(expected, found) {
                    inferencer.error(
                        default,
                        DiagnosticKind::TypeMismatch {
                            expected: expected.display_name(),
                            found: found.display_name(),
                        },
                    );
                }
                Ok(())
            })?;
        }

        for node in std::mem::take(&mut self.expressions) {
            self.inferencer.infer(node)?;
        }
        Ok(())
    }

    fn fold_constants(&mut self) {
        for value in &self.values {
            let node = match value.definition.value() {
                Some(node) if !value.is_mutable() => node,
                _ => continue,
            };

            // Ill-typed values were already reported by the inferencer.
            if self.inferencer.type_of(node).map_or(true, |ty| ty.is_error()) {
                continue;
            }

            let constant = self.evaluator.eval(node);

            if constant.is_const() {
                self.constants.insert(value.name(), constant);
            }
        }
    }

    fn check_inferred(&mut self) {
        self.inferencer.finish();
        self.errors.extend(self.inferencer.take_errors());
        self.errors.extend(self.evaluator.take_errors());

        for value in &self.values {
            if !value.r#type().is_bound() {
                self.errors.push(Diagnostic::new(
                    value.node,
                    DiagnosticKind::CannotInfer(value.name().to_string()),
                ));
            }
        }
    }

    fn build_module(&mut self) -> &'a Type<'a> {
        let members = self.values.iter().map(|value| value.member).collect::<Vec<_>>();
        let type_scope = Scope::from_symbols(self.types.arena(), self.declared_types());
        let ty = self.types.new_type(
            self.types.new_symbol(self.module_name),
            TypeParts {
                members: self.types.alloc_members(&members),
                type_scope: Some(type_scope),
                ..TypeParts::new(TypeKind::Module)
            },
        );

        debug!("[build] module {} = {}", self.module_name, ty);
        self.module = Some(ty);
        ty
    }
}

/// The Enter pass. Declares `let NAME = <...>` bindings and sorts the others for `build`.
struct Enter<'c, 'a> {
    context: &'c mut BindingContext<'a>,
}

impl<'a> Visitor<'a> for Enter<'_, 'a> {
    fn enter_let_definition(&mut self, node: &'a Expression<'a>, definition: &'a LetDefinition<'a>) {
        let context = &mut *self.context;

        match definition.declared_type_literal() {
            Some(literal) => {
                let symbol = context.types.new_symbol(definition.name());

                if context.scope.enter(Declaration::Type(symbol)).1 {
                    debug!("[enter] {}", symbol);
                    context.declarations.push((symbol, literal));
                } else {
                    context.error(node, DiagnosticKind::DuplicateSymbol);
                }
            }
            None => context.definitions.push((node, definition)),
        }
    }

    fn enter_extension(&mut self, _: &'a Expression<'a>, extension: &'a Extension<'a>) {
        self.context.extensions.push(extension);
    }

    fn enter_expression(&mut self, node: &'a Expression<'a>) {
        self.context.expressions.push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Ast;
    use assert_matches::assert_matches;

    fn messages(context: &BindingContext<'_>) -> Vec<String> {
        context.errors().iter().map(|e| e.message()).collect()
    }

    fn declared<'a>(context: &BindingContext<'a>, name: &str) -> &'a Type<'a> {
        context
            .find(name)
            .and_then(|d| d.type_symbol())
            .and_then(|s| s.r#type())
            .unwrap()
    }

    fn value_type(context: &BindingContext<'_>, name: &str) -> String {
        context
            .find(name)
            .and_then(|d| d.value())
            .unwrap()
            .r#type()
            .display_name()
    }

    fn member_type(ty: &Type<'_>, name: &str) -> String {
        ty.find_member(name).unwrap().r#type().display_name()
    }

    #[test]
    fn duplicate_type_declaration() {
        let ast = Ast::new();
        let mut context = BindingContext::new(ast.arena(), "main");
        let root = ast.sequence(
            ast.let_definition("a", ast.type_literal(&[])),
            ast.let_definition("a", ast.type_literal(&[])),
        );

        context.enter(root).unwrap();
        assert_eq!(context.state(), State::Entered);
        assert_eq!(messages(&context), vec!["Duplicate symbol"]);
        assert_matches!(context.find("a"), Some(Declaration::Type(_)));
        assert_eq!(context.declared_types().count(), 1);
        assert_matches!(context.enter(root), Err(InternalError::AlreadyEntered));
    }

    #[test]
    fn nested_types() {
        let ast = Ast::new();
        let mut context = BindingContext::new(ast.arena(), "main");

        let n = ast.nested_type("N", ast.type_literal(&[ast.field("x", ast.name("Int"))]));
        let c = ast.type_literal(&[
            ast.field("n", ast.name("N")),
            n,
            ast.field("m", ast.selection(ast.name("C"), "N")),
        ]);
        // D refers to C.N before C is declared
        let d = ast.type_literal(&[ast.field("cn", ast.selection(ast.name("C"), "N"))]);
        let root = ast
            .sequence_of(&[ast.let_definition("D", d), ast.let_definition("C", c)])
            .unwrap();

        let module = context.build(root).unwrap();
        assert!(context.errors().is_empty(), "{:?}", context.errors());
        assert_eq!(context.state(), State::Built);

        let c = declared(&context, "C");
        let n = c.find_type("N").unwrap();
        assert_eq!(n.display_name(), "C.N");
        assert_eq!(member_type(n.r#type().unwrap(), "x"), "Int");
        assert_eq!(member_type(c, "n"), "C.N");
        assert_eq!(member_type(c, "m"), "C.N");
        assert_eq!(member_type(declared(&context, "D"), "cn"), "C.N");

        assert_matches!(module.kind(), TypeKind::Module);
        assert_eq!(module.display_name(), "main");
        assert!(module.find_type("C").is_some());
        assert!(module.find_type("N").is_none());
    }

    #[test]
    fn module_values() {
        let ast = Ast::new();
        let mut context = BindingContext::new(ast.arena(), "main");

        let root = ast
            .sequence_of(&[
                ast.let_definition("x", ast.int(1)),
                ast.var_definition("y", Some(ast.name("Long")), None),
                ast.let_definition(
                    "s",
                    ast.call(ast.name("+"), &[ast.string("a"), ast.string("b")]),
                ),
                ast.definition("p", false, Some(ast.name("Point")), Some(ast.name("q"))),
                ast.var_definition("q", Some(ast.name("Point")), None),
                ast.let_definition(
                    "Point",
                    ast.type_literal(&[ast.field("a", ast.name("Int"))]),
                ),
                ast.let_definition("a", ast.selection(ast.name("q"), "a")),
            ])
            .unwrap();

        let module = context.build(root).unwrap();
        assert!(context.errors().is_empty(), "{:?}", context.errors());

        assert_eq!(value_type(&context, "x"), "Int");
        assert_eq!(value_type(&context, "y"), "Long");
        assert_eq!(value_type(&context, "s"), "String");
        assert_eq!(value_type(&context, "p"), "Point");
        assert_eq!(value_type(&context, "q"), "Point");
        assert_eq!(value_type(&context, "a"), "Int");

        let mutable = context
            .values()
            .iter()
            .filter(|v| v.is_mutable())
            .map(|v| v.name())
            .collect::<Vec<_>>();
        assert_eq!(mutable, vec!["y", "q"]);

        assert_eq!(context.constant("x").unwrap().value, Value::Int(1));
        assert_eq!(
            context.constant("s").unwrap().value,
            Value::String("ab".to_string())
        );
        assert!(context.constant("p").is_none());
        assert!(context.constant("y").is_none());

        assert_eq!(module.members().len(), 6);
        assert!(module.find_member("q").unwrap().is_mutable());
        assert!(module.find_type("Point").is_some());
    }

    #[test]
    fn extensions() {
        let ast = Ast::new();
        let mut context = BindingContext::new(ast.arena(), "main");

        let root = ast
            .sequence_of(&[
                ast.let_definition("P", ast.type_literal(&[ast.field("x", ast.name("Int"))])),
                ast.extension(
                    ast.name("P"),
                    &[
                        ast.var_field("y", ast.name("Int")),
                        ast.signature(&[ast.parameter("z", ast.name("Int"))], ast.name("P")),
                    ],
                ),
                ast.extension(ast.name("Int"), &[ast.field("w", ast.name("Int"))]),
                ast.var_definition("v", Some(ast.name("P")), None),
                ast.let_definition("r", ast.call(ast.name("v"), &[ast.int(1)])),
            ])
            .unwrap();

        context.build(root).unwrap();
        assert_eq!(messages(&context), vec!["Cannot extend type Int"]);

        let p = declared(&context, "P");
        let names = p.members().iter().map(|m| m.name()).collect::<Vec<_>>();
        assert_eq!(names, vec!["x", "y"]);
        assert!(p.find_member("y").unwrap().is_mutable());

        let signature = p.signatures()[0];
        assert!(std::ptr::eq(signature.receiver().unwrap(), p.symbol()));
        assert_eq!(signature.to_string(), "{z: Int -> P}");
        assert_eq!(value_type(&context, "r"), "P");
        assert!(declared(&context, "Int").find_member("w").is_none());
    }

    #[test]
    fn array_and_reference_members() {
        let ast = Ast::new();
        let mut context = BindingContext::new(ast.arena(), "main");

        let a = ast.type_literal(&[
            ast.field("xs", ast.array_type(ast.name("Int"), Some(ast.int(3)))),
            ast.field("ys", ast.array_type(ast.name("Int"), None)),
            ast.field("next", ast.reference_type(ast.name("A"))),
            ast.field(
                "negative",
                ast.array_type(
                    ast.name("Int"),
                    Some(ast.call(ast.name("-"), &[ast.int(1)])),
                ),
            ),
            ast.field("text", ast.array_type(ast.name("Int"), Some(ast.string("s")))),
            ast.field(
                "folded_error",
                ast.array_type(
                    ast.name("Int"),
                    Some(ast.call(ast.name("-"), &[ast.string("s")])),
                ),
            ),
        ]);
        let root = ast.let_definition("A", a);

        context.build(root).unwrap();
        assert_eq!(
            messages(&context),
            vec![
                "Invalid array size",
                "Invalid array size",
                "Invalid array size",
                "Expected type Int",
            ]
        );

        let a = declared(&context, "A");
        assert_eq!(member_type(a, "xs"), "Int[3]");
        assert_eq!(member_type(a, "ys"), "Int[]");
        assert_eq!(member_type(a, "next"), "*A");
        assert_eq!(member_type(a, "negative"), "Error");
        assert_eq!(member_type(a, "text"), "Error");
        assert_eq!(member_type(a, "folded_error"), "Error");
    }

    #[test]
    fn build_once() {
        let ast = Ast::new();
        let mut context = BindingContext::new(ast.arena(), "main");
        let root = ast.let_definition("x", ast.int(1));

        assert_eq!(context.state(), State::Unbound);
        context.build(root).unwrap();
        assert_matches!(context.build(root), Err(InternalError::AlreadyBuilt));
        assert_matches!(context.enter(root), Err(InternalError::AlreadyBuilt));
    }

    #[test]
    fn defaults_and_mismatches() {
        let ast = Ast::new();
        let mut context = BindingContext::new(ast.arena(), "main");

        let f = ast.type_literal(&[
            ast.signature(
                &[
                    ast.parameter("a", ast.name("Int")),
                    ast.parameter_with_default("b", ast.name("Int"), ast.int(0)),
                ],
                ast.name("Int"),
            ),
            ast.signature(
                &[ast.parameter_with_default("c", ast.name("String"), ast.int(1))],
                ast.name("Int"),
            ),
        ]);
        let root = ast
            .sequence_of(&[
                ast.let_definition("F", f),
                ast.var_definition("f", Some(ast.name("F")), None),
                ast.let_definition("r", ast.call(ast.name("f"), &[ast.int(1)])),
                ast.definition("x", false, Some(ast.name("Int")), Some(ast.string("s"))),
            ])
            .unwrap();

        context.build(root).unwrap();
        assert_eq!(value_type(&context, "r"), "Int");
        assert_eq!(
            messages(&context),
            vec![
                "Type mismatch: expected Int, found String",
                "Type mismatch: expected String, found Int",
            ]
        );
    }

    #[test]
    fn cyclic_values_cannot_be_inferred() {
        let ast = Ast::new();
        let mut context = BindingContext::new(ast.arena(), "main");

        let root = ast
            .sequence_of(&[
                ast.let_definition("a", ast.name("b")),
                ast.let_definition("b", ast.name("a")),
                ast.let_definition("c", ast.call(ast.name("+"), &[ast.name("a"), ast.int(1)])),
                ast.let_definition("d", ast.int(1)),
            ])
            .unwrap();

        context.build(root).unwrap();
        assert_eq!(
            messages(&context),
            vec![
                "Unresolved type",
                "Cannot infer type of a",
                "Cannot infer type of b",
                "Cannot infer type of c",
            ]
        );
        assert_eq!(value_type(&context, "d"), "Int");
    }

    #[test]
    fn type_resolution_errors() {
        let ast = Ast::new();
        let mut context = BindingContext::new(ast.arena(), "main");

        let t = ast.type_literal(&[
            ast.field("a", ast.name("Missing")),
            ast.field("b", ast.name("x")),
            ast.field("c", ast.selection(ast.name("T"), "Nope")),
            ast.field("a", ast.name("Int")),
            ast.nested_type("N", ast.int(1)),
        ]);
        let root = ast
            .sequence_of(&[
                ast.let_definition("T", t),
                ast.let_definition("x", ast.int(1)),
                ast.let_definition("x", ast.int(2)),
            ])
            .unwrap();

        context.build(root).unwrap();
        assert_eq!(
            messages(&context),
            vec![
                "Duplicate symbol",
                "Expected a type literal",
                "Symbol not found",
                "Expected a type",
                "Member not found",
                "Duplicate symbol",
            ]
        );
        assert_eq!(member_type(declared(&context, "T"), "a"), "Error");
    }

    #[test]
    fn builtins_can_be_shadowed() {
        let ast = Ast::new();
        let mut context = BindingContext::new(ast.arena(), "main");
        let root = ast.sequence(
            ast.let_definition("Int", ast.type_literal(&[ast.field("a", ast.name("Long"))])),
            ast.definition("i", false, Some(ast.name("Int")), None),
        );

        context.build(root).unwrap();
        assert!(context.errors().is_empty(), "{:?}", context.errors());
        assert!(declared(&context, "Int").find_member("a").is_some());
        assert!(!std::ptr::eq(
            declared(&context, "Int").symbol(),
            context.prelude().int
        ));
    }
}
