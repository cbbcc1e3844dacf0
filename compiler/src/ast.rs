use std::fmt;

use crate::source::Span;

pub use brine_rpc_schema::TypeExpr as GenericTypeExpr;

/// A name as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Ident {
        Ident { name: name.into(), span }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A type expression whose leaf is still an unresolved name.
pub type TypeExpr = GenericTypeExpr<Ident>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDefinition {
    pub models:     Vec<ModelDecl>,
    pub procedures: Vec<RpcDecl>,
}

impl ServiceDefinition {
    pub fn is_empty(&self) -> bool {
        self.models.is_empty() && self.procedures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDecl {
    pub name:   Ident,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: Ident,
    pub ty:   TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcDecl {
    pub name:        Ident,
    pub parameters:  Vec<Parameter>,
    pub return_type: Option<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: Ident,
    pub ty:   TypeExpr,
}
