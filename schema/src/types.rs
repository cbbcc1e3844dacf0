use std::fmt;

use serde::Serialize;

/// A stable handle into a [`Service`](crate::Service) type table.
///
/// Handles compare equal exactly when they name the same table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TypeId(usize);

impl TypeId {
    pub fn new(index: usize) -> TypeId {
        TypeId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A type expression: a named leaf wrapped in any number of array and
/// optional layers, innermost first.
///
/// The parser produces `TypeExpr<Ident>` with names still unresolved; the
/// analyzer swaps every leaf for a [`TypeId`] and leaves the wrappers alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "lowercase")]
pub enum TypeExpr<L> {
    Named(L),
    Array(Box<TypeExpr<L>>),
    Optional(Box<TypeExpr<L>>),
}

/// A fully resolved type expression.
pub type TypeRef = TypeExpr<TypeId>;

impl<L> TypeExpr<L> {
    pub fn array(inner: TypeExpr<L>) -> TypeExpr<L> {
        TypeExpr::Array(Box::new(inner))
    }

    pub fn optional(inner: TypeExpr<L>) -> TypeExpr<L> {
        TypeExpr::Optional(Box::new(inner))
    }

    /// The innermost named leaf.
    pub fn leaf(&self) -> &L {
        let mut current = self;
        loop {
            match current {
                TypeExpr::Named(leaf) => return leaf,
                TypeExpr::Array(inner) | TypeExpr::Optional(inner) => current = inner,
            }
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, TypeExpr::Optional(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeExpr::Array(_))
    }

    /// Rebuild the expression with its leaf replaced, keeping every wrapper.
    pub fn try_map_leaf<M, E>(
        &self,
        f: impl FnOnce(&L) -> Result<M, E>,
    ) -> Result<TypeExpr<M>, E> {
        Ok(match self {
            TypeExpr::Named(leaf) => TypeExpr::Named(f(leaf)?),
            TypeExpr::Array(inner) => TypeExpr::array(inner.try_map_leaf(f)?),
            TypeExpr::Optional(inner) => TypeExpr::optional(inner.try_map_leaf(f)?),
        })
    }

    /// Render with `[]` and `?` suffixes, using `name` to spell the leaf.
    pub fn render(&self, name: &impl Fn(&L) -> String) -> String {
        match self {
            TypeExpr::Named(leaf) => name(leaf),
            TypeExpr::Array(inner) => format!("{}[]", inner.render(name)),
            TypeExpr::Optional(inner) => format!("{}?", inner.render(name)),
        }
    }
}

impl<L: fmt::Display> fmt::Display for TypeExpr<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&|leaf: &L| leaf.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty:   TypeRef,
}

impl Field {
    pub fn new(name: String, ty: TypeRef) -> Field {
        Field { name, ty }
    }
}

/// A record type: either a declared `model` or a parameter bundle the
/// compiler synthesized for an `rpc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectType {
    pub name:        String,
    pub fields:      Vec<Field>,
    pub synthesized: bool,
}

impl ObjectType {
    pub fn new(name: String, fields: Vec<Field>) -> ObjectType {
        ObjectType { name, fields, synthesized: false }
    }

    pub fn synthesized(name: String, fields: Vec<Field>) -> ObjectType {
        ObjectType { name, fields, synthesized: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "def", rename_all = "lowercase")]
pub enum Type {
    Scalar(String),
    Object(ObjectType),
}

impl Type {
    pub fn name(&self) -> &str {
        match self {
            Type::Scalar(name) => name,
            Type::Object(object) => &object.name,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Scalar(_))
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            Type::Object(object) => Some(object),
            Type::Scalar(_) => None,
        }
    }

    /// Fields of an object type; empty for scalars.
    pub fn fields(&self) -> &[Field] {
        match self {
            Type::Object(object) => &object.fields,
            Type::Scalar(_) => &[],
        }
    }
}
