//! JSON form of the node set.
//!
//! The parser lives outside this crate; tools hand the binder a finished tree as a document:
//!
//! ```json
//! { "bindings": [
//!     { "kind": "let", "name": "Point",
//!       "value": { "kind": "type_literal", "members": [
//!           { "kind": "field", "name": "x", "type": { "kind": "name", "name": "Int" } } ] } },
//!     { "kind": "let", "name": "a", "value": { "kind": "int", "value": 1 } } ] }
//! ```
use super::tree::{Ast, Expression, ExpressionKind, Literal, Parameter, TypeLiteralMember};
use super::EffectiveRange;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoweringError {
    #[error("document has no bindings")]
    EmptyDocument,
    #[error("empty sequence at {0}")]
    EmptySequence(EffectiveRange),
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Document {
    #[serde(default)]
    pub bindings: Vec<Node>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<EffectiveRange>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Rune { value: char },
    Boolean { value: bool },
    Byte { value: u8 },
    Double { value: f64 },
    Float { value: f32 },
    Int { value: i32 },
    Long { value: i64 },
    #[serde(rename = "ulong")]
    ULong { value: u64 },
    Null,
    String { value: String },
    #[serde(rename = "uint")]
    UInt { value: u32 },
    Name {
        name: String,
    },
    Selection {
        target: Box<Node>,
        member: String,
    },
    Call {
        target: Box<Node>,
        #[serde(default)]
        arguments: Vec<Node>,
    },
    NamedArgument {
        name: String,
        value: Box<Node>,
    },
    Sequence {
        items: Vec<Node>,
    },
    Let {
        name: String,
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        type_annotation: Option<Box<Node>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Box<Node>>,
    },
    Var {
        name: String,
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        type_annotation: Option<Box<Node>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Box<Node>>,
    },
    TypeLiteral {
        #[serde(default)]
        members: Vec<MemberNode>,
    },
    ArrayType {
        element: Box<Node>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<Box<Node>>,
    },
    ReferenceType {
        referant: Box<Node>,
    },
    Extension {
        target: Box<Node>,
        #[serde(default)]
        members: Vec<MemberNode>,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemberNode {
    Field {
        name: String,
        r#type: Node,
        #[serde(default)]
        mutable: bool,
    },
    Signature {
        #[serde(default)]
        parameters: Vec<ParameterNode>,
        result: Node,
    },
    Let {
        name: String,
        value: Node,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParameterNode {
    pub name: String,
    pub r#type: Node,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Node>,
}

impl Document {
    /// Allocates the document's bindings in `ast` as one right-nested sequence.
    pub fn lower<'a>(&self, ast: &'a Ast) -> Result<&'a Expression<'a>, LoweringError> {
        let items = self
            .bindings
            .iter()
            .map(|node| node.lower(ast))
            .collect::<Result<Vec<_>, _>>()?;

        ast.sequence_of(&items).ok_or(LoweringError::EmptyDocument)
    }
}

impl Node {
    pub fn lower<'a>(&self, ast: &'a Ast) -> Result<&'a Expression<'a>, LoweringError> {
        let range = self.range.unwrap_or_default();
        let kind = match &self.kind {
            NodeKind::Rune { value } => ExpressionKind::Literal(Literal::Rune(*value)),
            NodeKind::Boolean { value } => ExpressionKind::Literal(Literal::Boolean(*value)),
            NodeKind::Byte { value } => ExpressionKind::Literal(Literal::Byte(*value)),
            NodeKind::Double { value } => ExpressionKind::Literal(Literal::Double(*value)),
            NodeKind::Float { value } => ExpressionKind::Literal(Literal::Float(*value)),
            NodeKind::Int { value } => ExpressionKind::Literal(Literal::Int(*value)),
            NodeKind::Long { value } => ExpressionKind::Literal(Literal::Long(*value)),
            NodeKind::ULong { value } => ExpressionKind::Literal(Literal::ULong(*value)),
            NodeKind::Null => ExpressionKind::Literal(Literal::Null),
            NodeKind::String { value } => {
                ExpressionKind::Literal(Literal::String(ast.alloc_str(value)))
            }
            NodeKind::UInt { value } => ExpressionKind::Literal(Literal::UInt(*value)),
            NodeKind::Name { name } => ExpressionKind::Name(ast.alloc_str(name)),
            NodeKind::Selection { target, member } => {
                ast.selection_kind(target.lower(ast)?, member)
            }
            NodeKind::Call { target, arguments } => {
                let target = target.lower(ast)?;
                let arguments = lower_all(ast, arguments)?;

                ast.call_kind(target, &arguments)
            }
            NodeKind::NamedArgument { name, value } => {
                ast.named_argument_kind(name, value.lower(ast)?)
            }
            NodeKind::Sequence { items } => {
                let items = lower_all(ast, items)?;
                let (left, rest) = items
                    .split_first()
                    .ok_or(LoweringError::EmptySequence(range))?;

                match ast.sequence_of(rest) {
                    // A one-element sequence is just its element.
                    None => return Ok(*left),
                    Some(right) => ast.sequence_kind(*left, right),
                }
            }
            NodeKind::Let {
                name,
                type_annotation,
                value,
            } => definition(ast, name, false, type_annotation, value)?,
            NodeKind::Var {
                name,
                type_annotation,
                value,
            } => definition(ast, name, true, type_annotation, value)?,
            NodeKind::TypeLiteral { members } => {
                ast.type_literal_kind(&lower_members(ast, members)?)
            }
            NodeKind::ArrayType { element, size } => {
                let element = element.lower(ast)?;
                let size = size.as_ref().map(|size| size.lower(ast)).transpose()?;

                ast.array_type_kind(element, size)
            }
            NodeKind::ReferenceType { referant } => ast.reference_type_kind(referant.lower(ast)?),
            NodeKind::Extension { target, members } => {
                let target = target.lower(ast)?;
                ast.extension_kind(target, &lower_members(ast, members)?)
            }
        };

        Ok(ast.alloc_expression(kind, range))
    }
}

fn lower_all<'a>(ast: &'a Ast, nodes: &[Node]) -> Result<Vec<&'a Expression<'a>>, LoweringError> {
    nodes.iter().map(|node| node.lower(ast)).collect()
}

fn lower_optional<'a>(
    ast: &'a Ast,
    node: &Option<Box<Node>>,
) -> Result<Option<&'a Expression<'a>>, LoweringError> {
    node.as_ref().map(|node| node.lower(ast)).transpose()
}

fn definition<'a>(
    ast: &'a Ast,
    name: &str,
    mutable: bool,
    type_annotation: &Option<Box<Node>>,
    value: &Option<Box<Node>>,
) -> Result<ExpressionKind<'a>, LoweringError> {
    let type_annotation = lower_optional(ast, type_annotation)?;
    let value = lower_optional(ast, value)?;

    Ok(ast.definition_kind(name, mutable, type_annotation, value))
}

fn lower_members<'a>(
    ast: &'a Ast,
    members: &[MemberNode],
) -> Result<Vec<TypeLiteralMember<'a>>, LoweringError> {
    let mut lowered = Vec::with_capacity(members.len());

    for member in members {
        let member = match member {
            MemberNode::Field {
                name,
                r#type,
                mutable,
            } => {
                let r#type = r#type.lower(ast)?;

                if *mutable {
                    ast.var_field(name, r#type)
                } else {
                    ast.field(name, r#type)
                }
            }
            MemberNode::Signature { parameters, result } => {
                let parameters = parameters
                    .iter()
                    .map(|p| p.lower(ast))
                    .collect::<Result<Vec<_>, _>>()?;

                ast.signature(&parameters, result.lower(ast)?)
            }
            MemberNode::Let { name, value } => ast.nested_type(name, value.lower(ast)?),
        };
        lowered.push(member);
    }

    Ok(lowered)
}

impl ParameterNode {
    fn lower<'a>(&self, ast: &'a Ast) -> Result<Parameter<'a>, LoweringError> {
        let r#type = self.r#type.lower(ast)?;

        match &self.default {
            Some(default) => Ok(ast.parameter_with_default(&self.name, r#type, default.lower(ast)?)),
            None => Ok(ast.parameter(&self.name, r#type)),
        }
    }
}
