pub mod document;
mod location;
pub mod traverse;
pub mod tree;

pub use document::{Document, LoweringError};
pub use location::{EffectiveRange, Locatable, Position};
pub use traverse::{traverse, Visitor};
pub use tree::*;
