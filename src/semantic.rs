//! The binder: turns a module AST into a graph of type symbols plus diagnostics.
mod bindings;
mod builder;
mod consteval;
mod context;
mod errors;
mod inferencer;
mod prelude;
mod scope;
mod types;

pub use bindings::Bindings;
pub use builder::{BuilderId, TypeBuilder};
pub use consteval::{ConstEvaluator, Constant, TypeCode, Value};
pub use context::{BindingContext, ModuleValue, State};
pub use errors::{Diagnostic, DiagnosticKind, InternalError};
pub use inferencer::{select_signature, Inferencer};
pub use prelude::Prelude;
pub use scope::{merge, Scope, ScopeBuilder, Symbol};
pub use types::*;
