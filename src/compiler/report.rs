//! The summary printed for a bound module.
use crate::semantic::{BindingContext, Diagnostic, TypeSymbol};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Serialize)]
pub struct Report {
    pub module: String,
    pub types: Vec<TypeEntry>,
    pub values: Vec<ValueEntry>,
    pub diagnostics: Vec<DiagnosticEntry>,
}

#[derive(Debug, Serialize)]
pub struct TypeEntry {
    pub name: String,
    pub members: Vec<String>,
    pub signatures: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ValueEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub mutable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constant: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticEntry {
    pub message: String,
    pub line: u32,
    pub character: u32,
}

impl From<&Diagnostic> for DiagnosticEntry {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self {
            message: diagnostic.message(),
            line: diagnostic.range.start.line,
            character: diagnostic.range.start.character,
        }
    }
}

impl Report {
    pub fn new(context: &BindingContext<'_>) -> Self {
        let mut types = vec![];

        for symbol in context.declared_types() {
            collect_types(symbol, &mut types);
        }

        let values = context
            .values()
            .iter()
            .map(|value| ValueEntry {
                name: value.name().to_string(),
                type_name: value.r#type().display_name(),
                mutable: value.is_mutable(),
                constant: context.constant(value.name()).map(ToString::to_string),
            })
            .collect();

        Self {
            module: context
                .module()
                .map_or_else(String::new, |module| module.display_name()),
            types,
            values,
            diagnostics: context.errors().iter().map(DiagnosticEntry::from).collect(),
        }
    }
}

// Declared types first, each followed by its nested types.
fn collect_types(symbol: &TypeSymbol<'_>, types: &mut Vec<TypeEntry>) {
    let ty = match symbol.r#type() {
        Some(ty) => ty,
        None => return,
    };

    types.push(TypeEntry {
        name: symbol.display_name(),
        members: ty.members().iter().map(|m| m.to_string()).collect(),
        signatures: ty.signatures().iter().map(|s| s.to_string()).collect(),
    });
    for nested in ty.type_scope().symbols() {
        collect_types(nested, types);
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {}", self.module)?;

        for ty in &self.types {
            let body = ty
                .members
                .iter()
                .chain(&ty.signatures)
                .map(String::as_str)
                .collect::<Vec<_>>();

            writeln!(f, "type {} = <{}>", ty.name, body.join(", "))?;
        }

        for value in &self.values {
            let keyword = if value.mutable { "var" } else { "let" };

            write!(f, "{} {}: {}", keyword, value.name, value.type_name)?;
            if let Some(constant) = &value.constant {
                write!(f, " = {}", constant)?;
            }
            writeln!(f)?;
        }

        for diagnostic in &self.diagnostics {
            writeln!(
                f,
                "error {}:{}: {}",
                diagnostic.line, diagnostic.character, diagnostic.message
            )?;
        }
        Ok(())
    }
}
