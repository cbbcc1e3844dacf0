use std::collections::{HashMap, HashSet};

use brine_rpc_schema::{Field, Rpc, Service, Type, TypeExpr, TypeId, TypeRef};

use crate::{
    generator::GeneratorOptions,
    traits::CodeGenerator,
    utils::{identifier_or, route_path, to_pascal_case, to_snake_case, NameSet},
};

const HEADER: &str = "// Code generated by brpc. DO NOT EDIT.";

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn",
    "else", "enum", "extern", "false", "fn", "for", "if", "impl", "in",
    "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while",
    // reserved for future use
    "abstract", "become", "box", "do", "final", "gen", "macro", "override",
    "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Names the generated module declares or refers to unqualified.
const RESERVED_TYPE_NAMES: &[&str] = &[
    "ServiceHandler", "ROUTES", "Serialize", "Deserialize",
    "Box", "Option", "Result", "String", "Vec", "Self",
];

/// Writes keywords as raw identifiers. The few keywords that cannot be raw
/// get an underscore suffix instead.
fn escape_rust_keyword(s: &str) -> String {
    match s {
        "crate" | "self" | "Self" | "super" => format!("{}_", s),
        _ if KEYWORDS.contains(&s) => format!("r#{}", s),
        _ => s.to_string(),
    }
}

/// Maps built-in scalars to Rust types when no alias is configured.
fn default_scalar(name: &str) -> &'static str {
    match name {
        "bool"  => "bool",
        "int"   => "i64",
        "float" => "f64",
        _       => "String",
    }
}

/// Rust spellings of user types and procedures for one generated module.
/// Names that collide after case conversion, or with the module's own
/// declarations, get numeric suffixes.
struct RustNames {
    types:   HashMap<TypeId, String>,
    methods: Vec<String>,
}

impl RustNames {
    fn new(service: &Service) -> RustNames {
        let mut taken = NameSet::with_reserved(RESERVED_TYPE_NAMES);
        let types = service
            .user_types()
            .map(|(id, ty)| {
                let base = identifier_or(to_pascal_case(ty.name()), "Model");
                (id, escape_rust_keyword(&taken.claim(&base, "")))
            })
            .collect();

        let mut taken = NameSet::default();
        let methods = service
            .procedures()
            .iter()
            .map(|rpc| {
                let base = identifier_or(to_snake_case(&rpc.name), "call");
                escape_rust_keyword(&taken.claim(&base, "_"))
            })
            .collect();

        RustNames { types, methods }
    }
}

/// Rust field names of one struct, in declaration order.
fn field_names(fields: &[Field]) -> Vec<String> {
    let mut taken = NameSet::default();
    fields
        .iter()
        .map(|field| {
            let base = identifier_or(to_snake_case(&field.name), "field");
            escape_rust_keyword(&taken.claim(&base, "_"))
        })
        .collect()
}

/// Emits `serde` structs for every object type and a `ServiceHandler` trait
/// with one method per procedure.
pub struct RustGenerator<'o> {
    options: &'o GeneratorOptions,
}

impl<'o> RustGenerator<'o> {
    pub fn new(options: &'o GeneratorOptions) -> Self {
        RustGenerator { options }
    }

    fn type_name(&self, service: &Service, names: &RustNames, id: TypeId) -> String {
        if let Some(alias) = self.options.alias(service, id) {
            return alias.to_string();
        }
        match service.type_of(id) {
            Type::Scalar(name) => default_scalar(name).to_string(),
            Type::Object(object) => match names.types.get(&id) {
                Some(name) => name.clone(),
                None => to_pascal_case(&object.name),
            },
        }
    }

    /// `inline` is true while no `Vec` lies between the owning struct and
    /// this position, i.e. while the value would be stored in place.
    fn render(&self, service: &Service, names: &RustNames, owner: TypeId, ty: &TypeRef, inline: bool) -> String {
        match ty {
            TypeExpr::Named(id) => {
                let name = self.type_name(service, names, *id);
                if inline && reaches(service, *id, owner) {
                    format!("Box<{}>", name)
                } else {
                    name
                }
            }
            TypeExpr::Array(inner) => {
                format!("Vec<{}>", self.render(service, names, owner, inner, false))
            }
            TypeExpr::Optional(inner) => {
                format!("Option<{}>", self.render(service, names, owner, inner, inline))
            }
        }
    }

    fn generate_field(
        &self,
        service: &Service,
        names: &RustNames,
        owner: TypeId,
        field: &Field,
        rust_field_name: &str,
    ) -> String {
        let mut lines = Vec::new();
        if rust_field_name.trim_start_matches("r#") != field.name {
            lines.push(format!("    #[serde(rename = \"{}\")]", field.name));
        }
        if field.ty.is_optional() {
            lines.push("    #[serde(default, skip_serializing_if = \"Option::is_none\")]".to_string());
        }
        lines.push(format!(
            "    pub {}: {},",
            rust_field_name,
            self.render(service, names, owner, &field.ty, true)
        ));
        lines.join("\n")
    }

    fn generate_struct(&self, service: &Service, names: &RustNames, id: TypeId) -> String {
        let ty = service.type_of(id);
        let fields: Vec<String> = ty
            .fields()
            .iter()
            .zip(field_names(ty.fields()))
            .map(|(field, rust_name)| self.generate_field(service, names, id, field, &rust_name))
            .collect();

        let derived = "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]";
        let name = self.type_name(service, names, id);
        let mut out = String::new();
        if name != ty.name() {
            out.push_str(&format!("/// `{}`\n", ty.name()));
        }
        if fields.is_empty() {
            out.push_str(&format!("{}\npub struct {} {{}}\n", derived, name));
        } else {
            out.push_str(&format!("{}\npub struct {} {{\n{}\n}}\n", derived, name, fields.join("\n")));
        }
        out
    }

    fn generate_method(&self, service: &Service, names: &RustNames, rpc: &Rpc, method_name: &str) -> String {
        let request = match rpc.request {
            Some(id) => format!(", request: {}", self.type_name(service, names, id)),
            None => String::new(),
        };
        let response = match &rpc.response {
            Some(ty) => self.render_response(service, names, ty),
            None => "()".to_string(),
        };
        format!(
            "    /// `POST {}`\n    fn {}(&self{}) -> Result<{}, Self::Error>;",
            route_path(&rpc.name),
            method_name,
            request,
            response
        )
    }

    fn render_response(&self, service: &Service, names: &RustNames, ty: &TypeRef) -> String {
        match ty {
            TypeExpr::Named(id) => self.type_name(service, names, *id),
            TypeExpr::Array(inner) => format!("Vec<{}>", self.render_response(service, names, inner)),
            TypeExpr::Optional(inner) => format!("Option<{}>", self.render_response(service, names, inner)),
        }
    }

    fn generate_handler(&self, service: &Service, names: &RustNames) -> String {
        let mut lines = vec![
            "/// Server-side handlers, one per procedure.".to_string(),
            "pub trait ServiceHandler {".to_string(),
            "    type Error;".to_string(),
        ];
        for (rpc, method_name) in service.procedures().iter().zip(&names.methods) {
            lines.push(String::new());
            lines.push(self.generate_method(service, names, rpc, method_name));
        }
        lines.push("}".to_string());
        lines.push(String::new());

        let routes: Vec<String> = service
            .procedures()
            .iter()
            .map(|rpc| format!("    \"{}\",", route_path(&rpc.name)))
            .collect();
        lines.push("pub const ROUTES: &[&str] = &[".to_string());
        lines.extend(routes);
        lines.push("];".to_string());

        lines.join("\n")
    }
}

/// Whether `target` can be reached from `from` without passing through an
/// array. A struct holding such a value in place would have infinite size.
fn reaches(service: &Service, from: TypeId, target: TypeId) -> bool {
    let mut seen = HashSet::new();
    let mut stack = vec![from];
    while let Some(id) = stack.pop() {
        if id == target {
            return true;
        }
        if !seen.insert(id) {
            continue;
        }
        for field in service.type_of(id).fields() {
            let mut ty = &field.ty;
            while let TypeExpr::Optional(inner) = ty {
                ty = inner;
            }
            if let TypeExpr::Named(next) = ty {
                stack.push(*next);
            }
        }
    }
    false
}

impl<'o> CodeGenerator for RustGenerator<'o> {
    fn generate(&self, service: &Service) -> String {
        let names = RustNames::new(service);
        let mut rust_code: Vec<String> = vec![
            HEADER.to_string(),
            String::new(),
            "use serde::{Deserialize, Serialize};".to_string(),
            String::new(),
        ];

        for (id, _) in service.user_types() {
            rust_code.push(self.generate_struct(service, &names, id));
        }

        rust_code.push(self.generate_handler(service, &names));
        rust_code.push(String::new());
        rust_code.join("\n")
    }
}
