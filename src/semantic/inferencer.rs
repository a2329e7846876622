//! Continuation-driven type inference.
//!
//! Every expression node is typed exactly once. A consumer that needs a type that is not known
//! yet registers a continuation and returns; the continuation runs synchronously inside the
//! `record` (or unification) that eventually supplies the type.
use super::bindings::Bindings;
use super::errors::{Diagnostic, DiagnosticKind, InternalError};
use super::prelude::Prelude;
use super::scope::Scope;
use super::types::{same_type, Declaration, Signature, SymbolId, Type, TypeSymbol};
use crate::syntax::{Call, EffectiveRange, Expression, ExpressionKind, Locatable, NodeId};
use log::{debug, trace};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Runs once the node it was registered on has a type symbol.
pub type Continuation<'a> =
    Box<dyn FnOnce(&mut Inferencer<'a>, &'a TypeSymbol<'a>) -> Result<(), InternalError> + 'a>;

/// Runs once the symbol it was registered on is bound.
pub type TypeContinuation<'a> =
    Box<dyn FnOnce(&mut Inferencer<'a>, &'a Type<'a>) -> Result<(), InternalError> + 'a>;

type FanIn<'a> =
    Box<dyn FnOnce(&mut Inferencer<'a>, Vec<&'a Type<'a>>) -> Result<(), InternalError> + 'a>;

/// Fan-in state shared by the continuations of one `infer_types_of` call.
struct InferenceWorker<'a> {
    types: Vec<Option<&'a Type<'a>>>,
    remaining: usize,
    continuation: Option<FanIn<'a>>,
}

pub struct Inferencer<'a> {
    prelude: &'a Prelude<'a>,
    scope: Scope<'a, Declaration<'a>>,
    element_types: HashMap<NodeId, &'a TypeSymbol<'a>>,
    pending: HashMap<NodeId, Vec<Continuation<'a>>>,
    type_pending: HashMap<SymbolId, Vec<(EffectiveRange, TypeContinuation<'a>)>>,
    bindings: Bindings<'a>,
    errors: Vec<Diagnostic>,
}

impl<'a> Inferencer<'a> {
    pub fn new(prelude: &'a Prelude<'a>) -> Self {
        Self {
            prelude,
            scope: prelude.scope(),
            element_types: HashMap::new(),
            pending: HashMap::new(),
            type_pending: HashMap::new(),
            bindings: Bindings::new(),
            errors: vec![],
        }
    }

    /// Scope that `Name` nodes resolve through.
    pub fn set_scope(&mut self, scope: Scope<'a, Declaration<'a>>) {
        self.scope = scope;
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.errors)
    }

    pub fn error<L: Locatable>(&mut self, location: L, kind: DiagnosticKind) {
        self.errors.push(Diagnostic::new(location, kind));
    }

    pub fn type_of(&self, node: &Expression<'_>) -> Option<&'a TypeSymbol<'a>> {
        self.element_types.get(&node.id()).copied()
    }

    /// Assigns `symbol` to `node` and wakes up every continuation waiting on it.
    pub fn record(
        &mut self,
        node: &Expression<'_>,
        symbol: &'a TypeSymbol<'a>,
    ) -> Result<(), InternalError> {
        if self.element_types.contains_key(&node.id()) {
            return Err(InternalError::NodeRetyped(node.id()));
        }

        trace!("[record] {} {} : {}", node.id(), node, symbol);
        self.element_types.insert(node.id(), symbol);

        if let Some(continuations) = self.pending.remove(&node.id()) {
            for continuation in continuations {
                continuation(self, symbol)?;
            }
        }
        Ok(())
    }

    fn record_error(&mut self, node: &Expression<'_>) -> Result<(), InternalError> {
        self.record(node, self.prelude.error())
    }

    pub fn pend<F>(&mut self, node: &Expression<'_>, continuation: F) -> Result<(), InternalError>
    where
        F: FnOnce(&mut Inferencer<'a>, &'a TypeSymbol<'a>) -> Result<(), InternalError> + 'a,
    {
        match self.type_of(node) {
            Some(symbol) => continuation(self, symbol),
            None => {
                let continuation: Continuation<'a> = Box::new(continuation);

                self.pending
                    .entry(node.id())
                    .or_default()
                    .push(continuation);
                Ok(())
            }
        }
    }

    /// Waits for `symbol` to be bound. `origin` is reported if it never is.
    pub fn pend_type<F>(
        &mut self,
        symbol: &'a TypeSymbol<'a>,
        origin: EffectiveRange,
        continuation: F,
    ) -> Result<(), InternalError>
    where
        F: FnOnce(&mut Inferencer<'a>, &'a Type<'a>) -> Result<(), InternalError> + 'a,
    {
        match symbol.r#type() {
            Some(ty) => continuation(self, ty),
            None => {
                let continuation: TypeContinuation<'a> = Box::new(continuation);

                self.type_pending
                    .entry(symbol.id())
                    .or_default()
                    .push((origin, continuation));
                Ok(())
            }
        }
    }

    /// Waits for the fully resolved type of `node`.
    pub fn pend_resolved<F>(
        &mut self,
        node: &Expression<'_>,
        continuation: F,
    ) -> Result<(), InternalError>
    where
        F: FnOnce(&mut Inferencer<'a>, &'a Type<'a>) -> Result<(), InternalError> + 'a,
    {
        let origin = node.range();

        self.pend(node, move |inferencer, symbol| {
            inferencer.pend_type(symbol, origin, continuation)
        })
    }

    pub fn unify(
        &mut self,
        t: &'a TypeSymbol<'a>,
        v: &'a TypeSymbol<'a>,
    ) -> Result<bool, InternalError> {
        let unified = self.bindings.unify(t, v)?;

        self.settle()?;
        Ok(unified)
    }

    /// Must be called after binding `symbol` outside of unification.
    pub fn bound(&mut self, symbol: &'a TypeSymbol<'a>) -> Result<(), InternalError> {
        self.bindings.settle_bound(symbol)?;
        self.wake(symbol)?;
        self.settle()
    }

    fn settle(&mut self) -> Result<(), InternalError> {
        loop {
            let settled = self.bindings.take_settled();

            if settled.is_empty() {
                return Ok(());
            }
            for symbol in settled {
                self.wake(symbol)?;
            }
        }
    }

    fn wake(&mut self, symbol: &'a TypeSymbol<'a>) -> Result<(), InternalError> {
        let ty = match symbol.r#type() {
            Some(ty) => ty,
            None => return Ok(()),
        };

        if let Some(continuations) = self.type_pending.remove(&symbol.id()) {
            for (_, continuation) in continuations {
                continuation(self, ty)?;
            }
        }
        Ok(())
    }

    /// Reports every type that was waited on but never became known.
    pub fn finish(&mut self) {
        let mut origins = self
            .type_pending
            .drain()
            .flat_map(|(_, pending)| pending.into_iter().map(|(origin, _)| origin))
            .collect::<Vec<_>>();

        origins.sort();
        for origin in origins {
            self.error(origin, DiagnosticKind::UnresolvedType);
        }
    }

    pub fn infer(&mut self, node: &'a Expression<'a>) -> Result<(), InternalError> {
        match node.kind() {
            ExpressionKind::Literal(literal) => {
                self.record(node, self.prelude.literal_type(&literal))
            }
            ExpressionKind::Name(name) => match self.scope.find(name) {
                Some(Declaration::Value(member)) => self.record(node, member.r#type()),
                Some(Declaration::Type(_)) => {
                    self.error(node, DiagnosticKind::ExpectedValue);
                    self.record_error(node)
                }
                None => {
                    self.error(node, DiagnosticKind::SymbolNotFound);
                    self.record_error(node)
                }
            },
            ExpressionKind::Selection(selection) => {
                let member = selection.member();

                self.infer(selection.target())?;
                self.pend_resolved(selection.target(), move |inferencer, ty| {
                    if ty.is_error() {
                        return inferencer.record_error(node);
                    }

                    match ty.find_member(member) {
                        Some(member) => inferencer.record(node, member.r#type()),
                        None => {
                            inferencer.error(node, DiagnosticKind::MemberNotFound);
                            inferencer.record_error(node)
                        }
                    }
                })
            }
            ExpressionKind::Call(call) => {
                let mut nodes = vec![call.target()];

                nodes.extend_from_slice(call.arguments());
                self.infer_types_of(&nodes, move |inferencer, types| {
                    inferencer.resolve_call(node, call, &types)
                })
            }
            ExpressionKind::NamedArgument(argument) => {
                self.infer(argument.value())?;
                self.pend(argument.value(), move |inferencer, symbol| {
                    inferencer.record(node, symbol)
                })
            }
            _ => {
                self.error(node, DiagnosticKind::UnknownNode);
                self.record_error(node)
            }
        }
    }

    /// Infers every node and calls `continuation` with their resolved types, in order, once
    /// all of them are known.
    fn infer_types_of<F>(
        &mut self,
        nodes: &[&'a Expression<'a>],
        continuation: F,
    ) -> Result<(), InternalError>
    where
        F: FnOnce(&mut Inferencer<'a>, Vec<&'a Type<'a>>) -> Result<(), InternalError> + 'a,
    {
        if nodes.is_empty() {
            return continuation(self, vec![]);
        }

        let worker = Rc::new(RefCell::new(InferenceWorker {
            types: vec![None; nodes.len()],
            remaining: nodes.len(),
            continuation: Some(Box::new(continuation)),
        }));

        for (i, &node) in nodes.iter().enumerate() {
            let worker = Rc::clone(&worker);

            self.infer(node)?;
            self.pend_resolved(node, move |inferencer, ty| {
                // Never call the continuation while the worker is borrowed.
                let ready = {
                    let mut worker = worker.borrow_mut();

                    worker.types[i] = Some(ty);
                    worker.remaining -= 1;
                    if worker.remaining == 0 {
                        let types = worker.types.iter().flatten().copied().collect::<Vec<_>>();
                        worker.continuation.take().map(|c| (c, types))
                    } else {
                        None
                    }
                };

                match ready {
                    Some((continuation, types)) => continuation(inferencer, types),
                    None => Ok(()),
                }
            })?;
        }
        Ok(())
    }

    fn resolve_call(
        &mut self,
        node: &'a Expression<'a>,
        call: &'a Call<'a>,
        types: &[&'a Type<'a>],
    ) -> Result<(), InternalError> {
        let (target, argument_types) = match types.split_first() {
            Some(split) => split,
            None => return self.record_error(node),
        };

        if target.is_error() || argument_types.iter().any(|ty| ty.is_error()) {
            return self.record_error(node);
        }
        if target.signatures().is_empty() {
            self.error(node, DiagnosticKind::NotCallable);
            return self.record_error(node);
        }

        let mut named = vec![];
        let mut positional = vec![];

        for (argument, ty) in call.arguments().iter().zip(argument_types) {
            match argument.named_argument() {
                Some(argument) => named.push((argument.name(), *ty)),
                None => positional.push(*ty),
            }
        }

        match select_signature(target.signatures(), &named, &positional) {
            Some(signature) => {
                debug!("[resolve_call] {} => {}", node, signature);
                self.record(node, signature.result())
            }
            None => {
                debug!("[resolve_call] {} => no match in {}", node, target);
                self.error(node, DiagnosticKind::NoMatchingSignature);
                self.record_error(node)
            }
        }
    }
}

/// First signature accepting the arguments. Named arguments bind by name, the remaining
/// parameters take the positional arguments in order or fall back to their default.
pub fn select_signature<'a>(
    signatures: &[&'a Signature<'a>],
    named: &[(&str, &'a Type<'a>)],
    positional: &[&'a Type<'a>],
) -> Option<&'a Signature<'a>> {
    signatures
        .iter()
        .copied()
        .find(|signature| accepts(signature, named, positional))
}

fn accepts<'a>(
    signature: &Signature<'a>,
    named: &[(&str, &'a Type<'a>)],
    positional: &[&'a Type<'a>],
) -> bool {
    let parameters = signature.parameters();
    let by_name = parameters
        .iter()
        .enumerate()
        .map(|(i, p)| (p.name, i))
        .collect::<HashMap<_, _>>();
    let mut used = vec![false; parameters.len()];

    for (name, ty) in named {
        match by_name.get(name) {
            Some(&i) if !used[i] && same_type(parameters[i].r#type, ty.symbol()) => {
                used[i] = true;
            }
            _ => return false,
        }
    }

    let mut positional = positional.iter();

    for (parameter, _) in parameters.iter().zip(&used).filter(|(_, used)| !**used) {
        match positional.next() {
            Some(ty) if same_type(parameter.r#type, ty.symbol()) => {}
            Some(_) => return false,
            None if parameter.default.is_some() => {}
            None => return false,
        }
    }

    positional.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::BumpaloArena;
    use crate::semantic::scope::merge;
    use crate::semantic::types::{
        MemberKind, Mutability, Parameter, TypeArena, TypeKind, TypeParts,
    };
    use crate::syntax::Ast;
    use assert_matches::assert_matches;

    struct Fixture<'a> {
        types: &'a TypeArena<'a>,
        prelude: &'a Prelude<'a>,
    }

    impl<'a> Fixture<'a> {
        fn new(arena: &'a BumpaloArena) -> Self {
            let types = arena.alloc(TypeArena::new(arena));
            let prelude = arena.alloc(Prelude::new(types));

            Self { types, prelude }
        }

        /// `<a: Int, {x: Int -> Int}, {x: Int, y: Int -> Long}>`
        fn record(&self) -> &'a TypeSymbol<'a> {
            let types = self.types;
            let int = self.prelude.int;
            let a = types.member("a", int, MemberKind::Field(Mutability::Immutable));
            let one = types.signature(None, &[Parameter::new("x", int)], int);
            let two = types.signature(
                None,
                &[Parameter::new("x", int), Parameter::new("y", int)],
                self.prelude.long,
            );
            let symbol = types.new_symbol("R");

            types.new_type(
                symbol,
                TypeParts {
                    members: types.alloc_members(&[a]),
                    signatures: types.alloc_signatures(&[one, two]),
                    ..TypeParts::new(TypeKind::Record)
                },
            );
            symbol
        }

        /// Prelude plus the given module values.
        fn inferencer(&self, values: &[(&str, &'a TypeSymbol<'a>)]) -> Inferencer<'a> {
            let mut inferencer = Inferencer::new(self.prelude);
            let values = values
                .iter()
                .map(|&(name, ty)| {
                    Declaration::Value(self.types.member(name, ty, MemberKind::Value))
                })
                .collect::<Vec<_>>();
            let scope = Scope::from_symbols(self.types.arena(), values);

            inferencer.set_scope(merge(self.types.arena(), &[scope, self.prelude.scope()]));
            inferencer
        }
    }

    fn messages(inferencer: &Inferencer<'_>) -> Vec<String> {
        inferencer.errors().iter().map(|e| e.message()).collect()
    }

    #[test]
    fn write_once() {
        let ast = Ast::new();
        let fixture = Fixture::new(ast.arena());
        let mut inferencer = fixture.inferencer(&[]);

        let node = ast.int(1);
        inferencer.infer(node).unwrap();
        assert_matches!(inferencer.infer(node), Err(InternalError::NodeRetyped(id)) if id == node.id());
    }

    #[test]
    fn pend_before_and_after_record() {
        let ast = Ast::new();
        let fixture = Fixture::new(ast.arena());
        let mut inferencer = fixture.inferencer(&[]);
        let node = ast.name("x");
        let fired = Rc::new(RefCell::new(vec![]));

        let log = Rc::clone(&fired);
        inferencer
            .pend(node, move |_, symbol| {
                log.borrow_mut().push(symbol.display_name());
                Ok(())
            })
            .unwrap();
        assert!(fired.borrow().is_empty());

        inferencer.record(node, fixture.prelude.int).unwrap();
        assert_eq!(*fired.borrow(), vec!["Int".to_string()]);

        let log = Rc::clone(&fired);
        inferencer
            .pend(node, move |_, symbol| {
                log.borrow_mut().push(symbol.display_name());
                Ok(())
            })
            .unwrap();
        assert_eq!(fired.borrow().len(), 2);
    }

    #[test]
    fn literals_and_names() {
        let ast = Ast::new();
        let fixture = Fixture::new(ast.arena());
        let mut inferencer = fixture.inferencer(&[("x", fixture.prelude.string)]);

        let nodes = [ast.int(1), ast.string("s"), ast.name("x"), ast.name("Int"), ast.name("y")];
        for &node in &nodes {
            inferencer.infer(node).unwrap();
        }

        let names = nodes
            .iter()
            .map(|node| inferencer.type_of(node).unwrap().display_name())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Int", "String", "String", "Error", "Error"]);
        assert_eq!(messages(&inferencer), vec!["Expected a value", "Symbol not found"]);
    }

    #[test]
    fn member_not_found() {
        let ast = Ast::new();
        let fixture = Fixture::new(ast.arena());
        let r = fixture.record();
        let mut inferencer = fixture.inferencer(&[("r", r)]);

        let found = ast.selection(ast.name("r"), "a");
        inferencer.infer(found).unwrap();
        assert_eq!(inferencer.type_of(found).unwrap().display_name(), "Int");

        let missing = ast.selection(ast.name("r"), "b");
        inferencer.infer(missing).unwrap();
        assert!(inferencer.type_of(missing).unwrap().is_error());

        // no cascade through the failed selection
        let chained = ast.selection(ast.selection(ast.name("r"), "c"), "d");
        inferencer.infer(chained).unwrap();

        assert_eq!(messages(&inferencer), vec!["Member not found", "Member not found"]);
    }

    #[test]
    fn overload_selection() {
        let ast = Ast::new();
        let fixture = Fixture::new(ast.arena());
        let types = fixture.types;
        let int = fixture.prelude.int;
        let int_type = int.r#type().unwrap();

        let first = types.signature(None, &[Parameter::new("a", int)], int);
        let second = types.signature(
            None,
            &[Parameter::new("a", int), Parameter::new("b", int)],
            int,
        );
        let signatures = [first, second];

        let selected = select_signature(&signatures, &[], &[int_type]);
        assert!(std::ptr::eq(selected.unwrap(), first));

        let selected = select_signature(&signatures, &[("b", int_type)], &[int_type]);
        assert!(std::ptr::eq(selected.unwrap(), second));

        // leftover positional arguments reject every signature
        assert!(select_signature(&signatures, &[], &[int_type, int_type, int_type]).is_none());
        // unknown name
        assert!(select_signature(&signatures, &[("c", int_type)], &[int_type]).is_none());
    }

    #[test]
    fn default_parameter_fills_gap() {
        let ast = Ast::new();
        let fixture = Fixture::new(ast.arena());
        let types = fixture.types;
        let int = fixture.prelude.int;
        let int_type = int.r#type().unwrap();

        let with_default = types.signature(
            None,
            &[
                Parameter::new("a", int),
                Parameter {
                    default: Some(ast.int(0)),
                    ..Parameter::new("b", int)
                },
            ],
            int,
        );
        let signatures = [with_default];

        assert!(select_signature(&signatures, &[], &[int_type]).is_some());
        assert!(select_signature(&signatures, &[], &[]).is_none());
    }

    #[test]
    fn calls() {
        let ast = Ast::new();
        let fixture = Fixture::new(ast.arena());
        let r = fixture.record();
        let mut inferencer = fixture.inferencer(&[("r", r)]);

        let add = ast.call(ast.name("+"), &[ast.int(1), ast.int(2)]);
        let concat = ast.call(
            ast.name("+"),
            &[ast.named_argument("right", ast.string("b")), ast.string("a")],
        );
        let compare = ast.call(ast.name("<"), &[ast.long(1), ast.long(2)]);
        let two = ast.call(ast.name("r"), &[ast.int(1), ast.int(2)]);
        let mismatch = ast.call(ast.name("+"), &[ast.int(1), ast.string("a")]);
        let not_callable = ast.call(ast.int(1), &[]);
        let cascade = ast.call(ast.name("-"), &[mismatch]);

        for &node in &[add, concat, compare, two, cascade, not_callable] {
            inferencer.infer(node).unwrap();
        }

        let display = |node: &Expression<'_>| inferencer.type_of(node).unwrap().display_name();
        assert_eq!(display(add), "Int");
        assert_eq!(display(concat), "String");
        assert_eq!(display(compare), "Boolean");
        assert_eq!(display(two), "Long");
        assert_eq!(display(cascade), "Error");
        assert_eq!(
            messages(&inferencer),
            vec!["No matching signature", "Type is not callable"]
        );
    }

    #[test]
    fn unknown_node() {
        let ast = Ast::new();
        let fixture = Fixture::new(ast.arena());
        let mut inferencer = fixture.inferencer(&[]);

        let node = ast.type_literal(&[]);
        inferencer.infer(node).unwrap();
        assert!(inferencer.type_of(node).unwrap().is_error());
        assert_eq!(messages(&inferencer), vec!["Unknown node"]);
    }

    #[test]
    fn deferred_until_bound() {
        let ast = Ast::new();
        let fixture = Fixture::new(ast.arena());
        let r = fixture.record();
        let later = fixture.types.anonymous_symbol();
        let mut inferencer = fixture.inferencer(&[("later", later)]);

        let selection = ast.selection(ast.name("later"), "a");
        let call = ast.call(ast.name("+"), &[selection, ast.int(1)]);
        inferencer.infer(call).unwrap();
        assert!(inferencer.type_of(selection).is_none());
        assert!(inferencer.type_of(call).is_none());

        assert_matches!(inferencer.unify(later, r), Ok(true));
        assert_eq!(inferencer.type_of(selection).unwrap().display_name(), "Int");
        assert_eq!(inferencer.type_of(call).unwrap().display_name(), "Int");

        inferencer.finish();
        assert!(inferencer.errors().is_empty());
    }

    #[test]
    fn unresolved_types_are_reported() {
        let ast = Ast::new();
        let fixture = Fixture::new(ast.arena());
        let never = fixture.types.anonymous_symbol();
        let mut inferencer = fixture.inferencer(&[("never", never)]);

        let selection = ast.selection(ast.name("never"), "a");
        inferencer.infer(selection).unwrap();
        inferencer.finish();

        assert_eq!(messages(&inferencer), vec!["Unresolved type"]);
    }
}
