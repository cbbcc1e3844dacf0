use std::collections::HashMap;

use serde::Serialize;

use crate::types::{Type, TypeId, TypeRef};

/// A remote procedure after analysis.
///
/// `request` is always an object type (the synthesized `<Name>Params` bundle)
/// when the procedure declares parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rpc {
    pub name:     String,
    pub request:  Option<TypeId>,
    pub response: Option<TypeRef>,
}

/// The frozen output of a successful compile.
///
/// Types are kept in registration order: built-in scalars, declared models,
/// then synthesized parameter bundles in procedure order. Procedures are kept
/// in declaration order. There are no mutating methods; a `Service` is safe to
/// share between generators as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
    types:      Vec<Type>,
    procedures: Vec<Rpc>,

    #[serde(skip)]
    type_index:      HashMap<String, TypeId>,
    #[serde(skip)]
    procedure_index: HashMap<String, usize>,
}

impl Service {
    /// Build a service from an already-resolved type table.
    ///
    /// Every `TypeId` inside `types` and `procedures` must index into `types`.
    /// Names are expected to be unique; on a repeat the first entry wins.
    pub fn new(types: Vec<Type>, procedures: Vec<Rpc>) -> Service {
        let mut type_index = HashMap::with_capacity(types.len());
        for (i, ty) in types.iter().enumerate() {
            type_index.entry(ty.name().to_string()).or_insert(TypeId::new(i));
        }

        let mut procedure_index = HashMap::with_capacity(procedures.len());
        for (i, rpc) in procedures.iter().enumerate() {
            procedure_index.entry(rpc.name.clone()).or_insert(i);
        }

        Service { types, procedures, type_index, procedure_index }
    }

    pub fn types(&self) -> impl Iterator<Item = (TypeId, &Type)> {
        self.types.iter().enumerate().map(|(i, ty)| (TypeId::new(i), ty))
    }

    /// Object types only, declared models before synthesized bundles.
    pub fn user_types(&self) -> impl Iterator<Item = (TypeId, &Type)> {
        self.types().filter(|(_, ty)| !ty.is_scalar())
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Panics if `id` did not come from this service.
    pub fn type_of(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.type_index.get(name).copied()
    }

    pub fn type_named(&self, name: &str) -> Option<&Type> {
        self.lookup(name).map(|id| self.type_of(id))
    }

    pub fn procedures(&self) -> &[Rpc] {
        &self.procedures
    }

    pub fn procedure(&self, name: &str) -> Option<&Rpc> {
        self.procedure_index.get(name).map(|&i| &self.procedures[i])
    }

    /// Spell a resolved type expression using the names in this service.
    pub fn display_type(&self, ty: &TypeRef) -> String {
        ty.render(&|id: &TypeId| self.type_of(*id).name().to_string())
    }
}
