//! Arena allocation shared by the syntax tree and the semantic graph.
//!
//! Nodes, type symbols and types all live in one `bumpalo` arena and refer to each other
//! with plain `&'a` references, so cyclic type graphs need no reference counting.
pub use bumpalo::collections::Vec as BumpaloVec;
pub use bumpalo::Bump as BumpaloArena;
