//! Folding of literal and primitive-operator expressions into typed constants.
//!
//! Only calls whose target is a bare operator name are folded. Anything the evaluator does not
//! understand is `NotConst`, which is not an error.
use super::errors::{Diagnostic, DiagnosticKind};
use super::prelude::Prelude;
use super::types::TypeSymbol;
use crate::syntax::{Expression, ExpressionKind, Literal};
use log::debug;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Boolean,
    Byte,
    Double,
    Float,
    Int,
    Long,
    Null,
    Rune,
    String,
    UInt,
    Error,
    NotConst,
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeCode::Boolean => "Boolean",
            TypeCode::Byte => "Byte",
            TypeCode::Double => "Double",
            TypeCode::Float => "Float",
            TypeCode::Int => "Int",
            TypeCode::Long => "Long",
            TypeCode::Null => "Null",
            TypeCode::Rune => "Rune",
            TypeCode::String => "String",
            TypeCode::UInt => "UInt",
            TypeCode::Error => "Error",
            TypeCode::NotConst => "NotConst",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Byte(u8),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Null,
    Rune(char),
    String(String),
    UInt(u32),
    Unknown,
}

impl Value {
    /// The zero value of a type code.
    pub fn zero(code: TypeCode) -> Self {
        match code {
            TypeCode::Boolean => Value::Boolean(false),
            TypeCode::Byte => Value::Byte(0),
            TypeCode::Double => Value::Double(0.0),
            TypeCode::Float => Value::Float(0.0),
            TypeCode::Int => Value::Int(0),
            TypeCode::Long => Value::Long(0),
            TypeCode::Null => Value::Null,
            TypeCode::Rune => Value::Rune('\0'),
            TypeCode::String => Value::String(String::new()),
            TypeCode::UInt => Value::UInt(0),
            TypeCode::Error | TypeCode::NotConst => Value::Unknown,
        }
    }

    pub fn code(&self) -> TypeCode {
        match self {
            Value::Boolean(_) => TypeCode::Boolean,
            Value::Byte(_) => TypeCode::Byte,
            Value::Double(_) => TypeCode::Double,
            Value::Float(_) => TypeCode::Float,
            Value::Int(_) => TypeCode::Int,
            Value::Long(_) => TypeCode::Long,
            Value::Null => TypeCode::Null,
            Value::Rune(_) => TypeCode::Rune,
            Value::String(_) => TypeCode::String,
            Value::UInt(_) => TypeCode::UInt,
            Value::Unknown => TypeCode::NotConst,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Byte(b) => write!(f, "{}", b),
            Value::Double(d) => write!(f, "{:?}", d),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Null => write!(f, "null"),
            Value::Rune(c) => write!(f, "{:?}", c),
            Value::String(s) => write!(f, "{:?}", s),
            Value::UInt(u) => write!(f, "{}", u),
            Value::Unknown => write!(f, "?"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub code: TypeCode,
    pub value: Value,
}

impl Constant {
    pub fn new(value: Value) -> Self {
        Self {
            code: value.code(),
            value,
        }
    }

    pub fn not_const() -> Self {
        Self {
            code: TypeCode::NotConst,
            value: Value::Unknown,
        }
    }

    /// A failed fold: the zero value of the type that was expected, tagged `Error`.
    pub fn error(expected: TypeCode) -> Self {
        Self {
            code: TypeCode::Error,
            value: Value::zero(expected),
        }
    }

    pub fn is_const(&self) -> bool {
        !matches!(self.code, TypeCode::Error | TypeCode::NotConst)
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            TypeCode::NotConst => write!(f, "<not const>"),
            TypeCode::Error => write!(f, "<error>"),
            _ => fmt::Display::fmt(&self.value, f),
        }
    }
}

enum Folded {
    Value(Value),
    DivideByZero,
    NotConst,
}

macro_rules! fold_integral {
    ($op:expr, $l:expr, $r:expr, $variant:path) => {
        match $op {
            "+" => Folded::Value($variant($l.wrapping_add($r))),
            "-" => Folded::Value($variant($l.wrapping_sub($r))),
            "*" => Folded::Value($variant($l.wrapping_mul($r))),
            "/" | "%" if $r == 0 => Folded::DivideByZero,
            "/" => Folded::Value($variant($l.wrapping_div($r))),
            "%" => Folded::Value($variant($l.wrapping_rem($r))),
            "&" => Folded::Value($variant($l & $r)),
            "^" => Folded::Value($variant($l ^ $r)),
            ">" => Folded::Value(Value::Boolean($l > $r)),
            "<" => Folded::Value(Value::Boolean($l < $r)),
            ">=" => Folded::Value(Value::Boolean($l >= $r)),
            "==" => Folded::Value(Value::Boolean($l == $r)),
            "!=" => Folded::Value(Value::Boolean($l != $r)),
            _ => Folded::NotConst,
        }
    };
}

macro_rules! fold_floating {
    ($op:expr, $l:expr, $r:expr, $variant:path) => {
        match $op {
            "+" => Folded::Value($variant($l + $r)),
            "-" => Folded::Value($variant($l - $r)),
            "*" => Folded::Value($variant($l * $r)),
            "/" if $r == 0.0 => Folded::DivideByZero,
            "/" => Folded::Value($variant($l / $r)),
            ">" => Folded::Value(Value::Boolean($l > $r)),
            "<" => Folded::Value(Value::Boolean($l < $r)),
            ">=" => Folded::Value(Value::Boolean($l >= $r)),
            "==" => Folded::Value(Value::Boolean($l == $r)),
            "!=" => Folded::Value(Value::Boolean($l != $r)),
            _ => Folded::NotConst,
        }
    };
}

/// Operators folded for a left operand of type `code`.
fn binary_operators(code: TypeCode) -> &'static [&'static str] {
    match code {
        TypeCode::Boolean => &["and", "or", "==", "!="],
        TypeCode::Byte | TypeCode::Int | TypeCode::Long => &[
            "+", "-", "*", "/", "%", "&", "^", ">", "<", ">=", "==", "!=",
        ],
        TypeCode::Float | TypeCode::Double => {
            &["+", "-", "*", "/", ">", "<", ">=", "==", "!="]
        }
        TypeCode::String => &["+", ">", "<", ">=", "==", "!="],
        _ => &[],
    }
}

fn is_binary_operator(op: &str) -> bool {
    [TypeCode::Boolean, TypeCode::Int, TypeCode::Float, TypeCode::String]
        .iter()
        .any(|code| binary_operators(*code).iter().any(|o| *o == op))
}

#[derive(Debug)]
pub struct ConstEvaluator<'a> {
    types: HashMap<TypeCode, &'a TypeSymbol<'a>>,
    error: &'a TypeSymbol<'a>,
    errors: Vec<Diagnostic>,
}

impl<'a> ConstEvaluator<'a> {
    pub fn new(prelude: &Prelude<'a>) -> Self {
        let types = vec![
            (TypeCode::Boolean, prelude.boolean),
            (TypeCode::Byte, prelude.byte),
            (TypeCode::Double, prelude.double),
            (TypeCode::Float, prelude.float),
            (TypeCode::Int, prelude.int),
            (TypeCode::Long, prelude.long),
            (TypeCode::Null, prelude.null),
            (TypeCode::Rune, prelude.rune),
            (TypeCode::String, prelude.string),
            (TypeCode::UInt, prelude.uint),
        ];

        Self {
            types: types.into_iter().collect(),
            error: prelude.error(),
            errors: vec![],
        }
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.errors)
    }

    /// The builtin type of a constant; `Error` for codes without one.
    pub fn type_of(&self, code: TypeCode) -> &'a TypeSymbol<'a> {
        self.types.get(&code).copied().unwrap_or(self.error)
    }

    pub fn eval(&mut self, node: &Expression<'_>) -> Constant {
        let constant = match node.kind() {
            ExpressionKind::Literal(literal) => literal_constant(&literal),
            ExpressionKind::Call(call) => match (call.target().name(), call.arguments()) {
                (Some(op), [operand]) => self.eval_unary(op, operand),
                (Some(op), [left, right]) => self.eval_binary(node, op, left, right),
                _ => Constant::not_const(),
            },
            _ => Constant::not_const(),
        };

        debug!("[eval] {} => {:?}", node, constant);
        constant
    }

    fn eval_operand(&mut self, node: &Expression<'_>) -> Constant {
        // Named operands never denote a primitive operation.
        if node.named_argument().is_some() {
            return Constant::not_const();
        }
        self.eval(node)
    }

    fn expected(&mut self, node: &Expression<'_>, code: TypeCode) -> Constant {
        self.errors.push(Diagnostic::new(
            node,
            DiagnosticKind::ExpectedTypeCode(code.to_string()),
        ));
        Constant::error(code)
    }

    fn eval_unary(&mut self, op: &str, operand: &Expression<'_>) -> Constant {
        let expected = match op {
            "!" => TypeCode::Boolean,
            "+" | "-" => TypeCode::Int,
            _ => return Constant::not_const(),
        };
        let value = self.eval_operand(operand);

        match (op, value.code, value.value) {
            (_, TypeCode::NotConst, _) => Constant::not_const(),
            (_, TypeCode::Error, value) => Constant {
                code: TypeCode::Error,
                value,
            },
            ("!", TypeCode::Boolean, Value::Boolean(b)) => Constant::new(Value::Boolean(!b)),
            ("+", TypeCode::Int, value)
            | ("+", TypeCode::Float, value)
            | ("+", TypeCode::Double, value)
            | ("+", TypeCode::Long, value) => Constant::new(value),
            ("-", _, Value::Int(i)) => Constant::new(Value::Int(i.wrapping_neg())),
            ("-", _, Value::Long(l)) => Constant::new(Value::Long(l.wrapping_neg())),
            ("-", _, Value::Float(x)) => Constant::new(Value::Float(-x)),
            ("-", _, Value::Double(d)) => Constant::new(Value::Double(-d)),
            _ => self.expected(operand, expected),
        }
    }

    fn eval_binary(
        &mut self,
        node: &Expression<'_>,
        op: &str,
        left: &Expression<'_>,
        right: &Expression<'_>,
    ) -> Constant {
        let l = self.eval_operand(left);
        let r = self.eval_operand(right);

        if l.code == TypeCode::NotConst || r.code == TypeCode::NotConst {
            return Constant::not_const();
        }
        if l.code == TypeCode::Error {
            return l;
        }
        if r.code == TypeCode::Error {
            return r;
        }

        let operators = binary_operators(l.code);

        if operators.is_empty() || !is_binary_operator(op) {
            return Constant::not_const();
        }
        if r.code != l.code {
            return self.expected(right, l.code);
        }
        if !operators.iter().any(|o| *o == op) {
            return Constant::not_const();
        }

        let folded = match (l.value.clone(), r.value) {
            (Value::Boolean(a), Value::Boolean(b)) => match op {
                "and" => Folded::Value(Value::Boolean(a && b)),
                "or" => Folded::Value(Value::Boolean(a || b)),
                "==" => Folded::Value(Value::Boolean(a == b)),
                "!=" => Folded::Value(Value::Boolean(a != b)),
                _ => Folded::NotConst,
            },
            (Value::Byte(a), Value::Byte(b)) => fold_integral!(op, a, b, Value::Byte),
            (Value::Int(a), Value::Int(b)) => fold_integral!(op, a, b, Value::Int),
            (Value::Long(a), Value::Long(b)) => fold_integral!(op, a, b, Value::Long),
            (Value::Float(a), Value::Float(b)) => fold_floating!(op, a, b, Value::Float),
            (Value::Double(a), Value::Double(b)) => fold_floating!(op, a, b, Value::Double),
            (Value::String(a), Value::String(b)) => match op {
                "+" => Folded::Value(Value::String(a + &b)),
                ">" => Folded::Value(Value::Boolean(a > b)),
                "<" => Folded::Value(Value::Boolean(a < b)),
                ">=" => Folded::Value(Value::Boolean(a >= b)),
                "==" => Folded::Value(Value::Boolean(a == b)),
                "!=" => Folded::Value(Value::Boolean(a != b)),
                _ => Folded::NotConst,
            },
            _ => Folded::NotConst,
        };

        match folded {
            Folded::Value(value) => Constant::new(value),
            Folded::DivideByZero => {
                self.errors
                    .push(Diagnostic::new(node, DiagnosticKind::DivideByZero));
                l
            }
            Folded::NotConst => Constant::not_const(),
        }
    }
}

fn literal_constant(literal: &Literal<'_>) -> Constant {
    match literal {
        Literal::Rune(c) => Constant::new(Value::Rune(*c)),
        Literal::Boolean(b) => Constant::new(Value::Boolean(*b)),
        Literal::Byte(b) => Constant::new(Value::Byte(*b)),
        Literal::Double(d) => Constant::new(Value::Double(*d)),
        Literal::Float(x) => Constant::new(Value::Float(*x)),
        Literal::Int(i) => Constant::new(Value::Int(*i)),
        Literal::Long(l) => Constant::new(Value::Long(*l)),
        Literal::Null => Constant::new(Value::Null),
        Literal::String(s) => Constant::new(Value::String(s.to_string())),
        Literal::UInt(u) => Constant::new(Value::UInt(*u)),
        Literal::ULong(_) => Constant::not_const(),
    }
}
