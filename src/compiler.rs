pub mod cli;
pub mod report;
pub use cli::Command;
pub use report::Report;

use crate::semantic::{BindingContext, InternalError};
use crate::syntax::{Ast, Document, LoweringError};
use log::debug;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error(transparent)]
    InputSourceError(#[from] io::Error),

    #[error("invalid document: {0}")]
    DocumentError(#[from] serde_json::Error),

    #[error(transparent)]
    LoweringError(#[from] LoweringError),

    #[error("internal error: {0}")]
    InternalError(#[from] InternalError),
}

impl From<String> for CompilerError {
    fn from(message: String) -> Self {
        CompilerError::InvalidOption(message)
    }
}

/// Binds `document` as the module `module_name`.
pub fn bind(document: &Document, module_name: &str) -> Result<Report, CompilerError> {
    let ast = Ast::new();
    let root = document.lower(&ast)?;
    let mut context = BindingContext::new(ast.arena(), module_name);

    context.build(root)?;
    debug!(
        "[build] {} finished with {} diagnostic(s)",
        module_name,
        context.errors().len()
    );
    Ok(Report::new(&context))
}
