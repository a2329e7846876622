use super::tree::{Expression, ExpressionKind, Extension, LetDefinition, Sequence};

/// Visitor over the top-level bindings of a module.
///
/// Only the binding sequence is walked; a visitor that needs the inside of a binding
/// descends on its own.
#[allow(unused_variables)]
pub trait Visitor<'a> {
    fn enter_sequence(&mut self, node: &'a Expression<'a>, sequence: &'a Sequence<'a>) {}
    fn exit_sequence(&mut self, node: &'a Expression<'a>, sequence: &'a Sequence<'a>) {}

    fn enter_let_definition(&mut self, node: &'a Expression<'a>, definition: &'a LetDefinition<'a>) {}

    fn enter_extension(&mut self, node: &'a Expression<'a>, extension: &'a Extension<'a>) {}

    /// Any other top-level expression.
    fn enter_expression(&mut self, node: &'a Expression<'a>) {}
}

pub fn traverse<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, node: &'a Expression<'a>) {
    match node.kind() {
        ExpressionKind::Sequence(sequence) => {
            visitor.enter_sequence(node, sequence);
            traverse(visitor, sequence.left());
            traverse(visitor, sequence.right());
            visitor.exit_sequence(node, sequence);
        }
        ExpressionKind::LetDefinition(definition) => {
            visitor.enter_let_definition(node, definition);
        }
        ExpressionKind::Extension(extension) => {
            visitor.enter_extension(node, extension);
        }
        _ => visitor.enter_expression(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Ast;

    #[derive(Default)]
    struct Collect<'a>(Vec<&'a Expression<'a>>);

    impl<'a> Visitor<'a> for Collect<'a> {
        fn enter_let_definition(&mut self, node: &'a Expression<'a>, _: &'a LetDefinition<'a>) {
            self.0.push(node);
        }

        fn enter_extension(&mut self, node: &'a Expression<'a>, _: &'a Extension<'a>) {
            self.0.push(node);
        }

        fn enter_expression(&mut self, node: &'a Expression<'a>) {
            self.0.push(node);
        }
    }

    #[test]
    fn walks_left_then_right() {
        let ast = Ast::new();
        let a = ast.let_definition("a", ast.int(1));
        let b = ast.let_definition("b", ast.int(2));
        let c = ast.name("a");

        // ((a; b); c)
        let root = ast.sequence(ast.sequence(a, b), c);
        let mut collect = Collect::default();

        traverse(&mut collect, root);
        let ids = collect.0.iter().map(|e| e.id()).collect::<Vec<_>>();

        assert_eq!(ids, vec![a.id(), b.id(), c.id()]);
    }

    #[test]
    fn counts_sequences() {
        #[derive(Default)]
        struct Depth {
            entered: usize,
            exited: usize,
        }

        impl<'a> Visitor<'a> for Depth {
            fn enter_sequence(&mut self, _: &'a Expression<'a>, _: &'a Sequence<'a>) {
                self.entered += 1;
            }

            fn exit_sequence(&mut self, _: &'a Expression<'a>, _: &'a Sequence<'a>) {
                self.exited += 1;
            }
        }

        let ast = Ast::new();
        let items = [ast.int(1), ast.int(2), ast.int(3)];
        let root = ast.sequence_of(&items).unwrap();

        let mut depth = Depth::default();
        traverse(&mut depth, root);
        assert_eq!(depth.entered, 2);
        assert_eq!(depth.exited, 2);
    }
}
