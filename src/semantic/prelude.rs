use super::scope::Scope;
use super::types::{
    Declaration, Member, MemberKind, Parameter, Signature, Type, TypeArena, TypeKind, TypeParts,
    TypeSymbol,
};
use crate::syntax::Literal;

/// Builtin types and primitive operators every module sees.
#[derive(Debug)]
pub struct Prelude<'a> {
    pub boolean: &'a TypeSymbol<'a>,
    pub byte: &'a TypeSymbol<'a>,
    pub double: &'a TypeSymbol<'a>,
    pub float: &'a TypeSymbol<'a>,
    pub int: &'a TypeSymbol<'a>,
    pub long: &'a TypeSymbol<'a>,
    pub null: &'a TypeSymbol<'a>,
    pub rune: &'a TypeSymbol<'a>,
    pub string: &'a TypeSymbol<'a>,
    pub uint: &'a TypeSymbol<'a>,
    pub ulong: &'a TypeSymbol<'a>,
    error: &'a Type<'a>,
    scope: Scope<'a, Declaration<'a>>,
}

impl<'a> Prelude<'a> {
    pub fn new(types: &TypeArena<'a>) -> Self {
        let boolean = types.record("Boolean");
        let byte = types.record("Byte");
        let double = types.record("Double");
        let float = types.record("Float");
        let int = types.record("Int");
        let long = types.record("Long");
        let null = types.record("Null");
        let rune = types.record("Rune");
        let string = types.record("String");
        let uint = types.record("UInt");
        let ulong = types.record("ULong");

        let integral = [byte, int, uint, long, ulong];
        let numeric = [byte, int, uint, long, ulong, float, double];
        let equatable = [byte, int, uint, long, ulong, float, double, string, boolean, rune];

        let mut operators = vec![];

        // Binary and unary arithmetic
        for op in &["+", "-"] {
            let mut signatures = binaries(types, &numeric, None);

            signatures.extend(numeric.iter().map(|&t| unary(types, t, t)));
            if *op == "+" {
                signatures.push(binary(types, string, string));
            }
            operators.push(operator(types, op, &signatures));
        }
        for op in &["*", "/"] {
            operators.push(operator(types, op, &binaries(types, &numeric, None)));
        }
        for op in &["%", "&", "|", "^"] {
            operators.push(operator(types, op, &binaries(types, &integral, None)));
        }

        // Comparison
        for op in &["<", ">", "<=", ">="] {
            let mut signatures = binaries(types, &numeric, Some(boolean));

            signatures.push(binary(types, string, boolean));
            operators.push(operator(types, op, &signatures));
        }
        for op in &["==", "!="] {
            operators.push(operator(types, op, &binaries(types, &equatable, Some(boolean))));
        }

        // Logical
        operators.push(operator(types, "!", &[unary(types, boolean, boolean)]));
        for op in &["and", "or"] {
            operators.push(operator(types, op, &[binary(types, boolean, boolean)]));
        }

        let builtins = [
            boolean, byte, double, float, int, long, null, rune, string, uint, ulong,
        ];
        let declarations = builtins
            .iter()
            .map(|t| Declaration::Type(*t))
            .chain(operators.into_iter().map(Declaration::Value));

        Self {
            boolean,
            byte,
            double,
            float,
            int,
            long,
            null,
            rune,
            string,
            uint,
            ulong,
            error: types.error_type(),
            scope: Scope::from_symbols(types.arena(), declarations),
        }
    }

    pub fn scope(&self) -> Scope<'a, Declaration<'a>> {
        self.scope
    }

    pub fn error(&self) -> &'a TypeSymbol<'a> {
        self.error.symbol()
    }

    pub fn literal_type(&self, literal: &Literal<'_>) -> &'a TypeSymbol<'a> {
        match literal {
            Literal::Rune(_) => self.rune,
            Literal::Boolean(_) => self.boolean,
            Literal::Byte(_) => self.byte,
            Literal::Double(_) => self.double,
            Literal::Float(_) => self.float,
            Literal::Int(_) => self.int,
            Literal::Long(_) => self.long,
            Literal::ULong(_) => self.ulong,
            Literal::Null => self.null,
            Literal::String(_) => self.string,
            Literal::UInt(_) => self.uint,
        }
    }
}

fn operator<'a>(
    types: &TypeArena<'a>,
    name: &str,
    signatures: &[&'a Signature<'a>],
) -> &'a Member<'a> {
    let symbol = types.anonymous_symbol();

    types.new_type(
        symbol,
        TypeParts {
            signatures: types.alloc_signatures(signatures),
            ..TypeParts::new(TypeKind::Record)
        },
    );
    types.member(name, symbol, MemberKind::Value)
}

/// One `(left: T, right: T) -> T` signature per operand type, or `-> result` if given.
fn binaries<'a>(
    types: &TypeArena<'a>,
    operands: &[&'a TypeSymbol<'a>],
    result: Option<&'a TypeSymbol<'a>>,
) -> Vec<&'a Signature<'a>> {
    operands
        .iter()
        .map(|&t| binary(types, t, result.unwrap_or(t)))
        .collect()
}

fn binary<'a>(
    types: &TypeArena<'a>,
    operand: &'a TypeSymbol<'a>,
    result: &'a TypeSymbol<'a>,
) -> &'a Signature<'a> {
    types.signature(
        None,
        &[Parameter::new("left", operand), Parameter::new("right", operand)],
        result,
    )
}

fn unary<'a>(
    types: &TypeArena<'a>,
    operand: &'a TypeSymbol<'a>,
    result: &'a TypeSymbol<'a>,
) -> &'a Signature<'a> {
    types.signature(None, &[Parameter::new("operand", operand)], result)
}
