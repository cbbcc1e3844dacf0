use std::collections::HashMap;

use brine_rpc_schema::{Rpc, Service, Type, TypeExpr, TypeId, TypeRef};

use crate::{
    generator::GeneratorOptions,
    traits::CodeGenerator,
    utils::{identifier_or, route_path, to_lower_camel_case, NameSet},
};

const HEADER: &str = "// Code generated by brpc. DO NOT EDIT.";

/// Names a model cannot take in the client module: its own declarations,
/// predefined types and reserved words.
const RESERVED_TYPE_NAMES: &[&str] = &[
    "Fetcher", "IServiceClient", "ServiceClient", "Promise",
    "any", "bigint", "boolean", "never", "number", "object", "string",
    "symbol", "undefined", "unknown", "void",
    "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "export", "extends", "false",
    "finally", "for", "function", "if", "implements", "import", "in",
    "instanceof", "interface", "let", "new", "null", "package", "private",
    "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "type", "typeof", "var", "while", "with", "yield",
];

/// Members of `ServiceClient` that are not procedures.
const RESERVED_METHOD_NAMES: &[&str] = &["constructor", "fetcher"];

/// TypeScript spellings of user types and procedures for one client.
struct ClientNames {
    types:   HashMap<TypeId, String>,
    methods: Vec<String>,
}

impl ClientNames {
    fn new(service: &Service) -> ClientNames {
        let mut taken = NameSet::with_reserved(RESERVED_TYPE_NAMES);
        let types = service
            .user_types()
            .map(|(id, ty)| (id, taken.claim(ty.name(), "")))
            .collect();

        let mut taken = NameSet::with_reserved(RESERVED_METHOD_NAMES);
        let methods = service
            .procedures()
            .iter()
            .map(|rpc| taken.claim(&identifier_or(to_lower_camel_case(&rpc.name), "call"), ""))
            .collect();

        ClientNames { types, methods }
    }
}

/// Emits a TypeScript client: one object type per model, an
/// `IServiceClient` interface and a `ServiceClient` class that posts each
/// request through a caller-supplied `Fetcher`.
pub struct TypeScriptGenerator<'o> {
    options: &'o GeneratorOptions,
}

fn default_scalar(name: &str) -> &'static str {
    match name {
        "bool"        => "boolean",
        "int"         => "number",
        "float"       => "number",
        _             => "string",
    }
}

impl<'o> TypeScriptGenerator<'o> {
    pub fn new(options: &'o GeneratorOptions) -> Self {
        TypeScriptGenerator { options }
    }

    fn type_name(&self, service: &Service, names: &ClientNames, id: TypeId) -> String {
        if let Some(alias) = self.options.alias(service, id) {
            return alias.to_string();
        }
        match service.type_of(id) {
            Type::Scalar(name) => default_scalar(name).to_string(),
            Type::Object(object) => names.types.get(&id).unwrap_or(&object.name).clone(),
        }
    }

    fn render(&self, service: &Service, names: &ClientNames, ty: &TypeRef) -> String {
        match ty {
            TypeExpr::Named(id) => self.type_name(service, names, *id),
            TypeExpr::Array(inner) => {
                let item = self.render(service, names, inner);
                if inner.is_optional() {
                    format!("({})[]", item)
                } else {
                    format!("{}[]", item)
                }
            }
            TypeExpr::Optional(inner) => format!("{} | null", self.render(service, names, inner)),
        }
    }

    fn write_types(&self, service: &Service, names: &ClientNames, out: &mut Vec<String>) {
        for (id, ty) in service.user_types() {
            let name = self.type_name(service, names, id);
            if name != ty.name() {
                out.push(format!("/** `{}` */", ty.name()));
            }
            out.push(format!("export type {} = {{", name));
            for field in ty.fields() {
                match &field.ty {
                    TypeExpr::Optional(inner) => {
                        out.push(format!("    {}?: {};", field.name, self.render(service, names, inner)))
                    }
                    ty => out.push(format!("    {}: {};", field.name, self.render(service, names, ty))),
                }
            }
            out.push("};".to_string());
            out.push(String::new());
        }
    }

    fn signature(&self, service: &Service, names: &ClientNames, rpc: &Rpc, method_name: &str) -> String {
        let request = match rpc.request {
            Some(id) => format!("request: {}", self.type_name(service, names, id)),
            None => String::new(),
        };
        format!(
            "{}({}): Promise<{}>",
            method_name,
            request,
            self.response_type(service, names, rpc)
        )
    }

    fn response_type(&self, service: &Service, names: &ClientNames, rpc: &Rpc) -> String {
        match &rpc.response {
            Some(ty) => self.render(service, names, ty),
            None => "void".to_string(),
        }
    }

    fn write_interface(&self, service: &Service, names: &ClientNames, out: &mut Vec<String>) {
        out.push("export interface IServiceClient {".to_string());
        for (rpc, method_name) in service.procedures().iter().zip(&names.methods) {
            out.push(format!("    {};", self.signature(service, names, rpc, method_name)));
        }
        out.push("}".to_string());
        out.push(String::new());
    }

    fn write_client(&self, service: &Service, names: &ClientNames, out: &mut Vec<String>) {
        out.push("export type Fetcher = (method: string, data?: unknown) => Promise<unknown>;".to_string());
        out.push(String::new());
        out.push("export class ServiceClient implements IServiceClient {".to_string());
        out.push("    private fetcher: Fetcher;".to_string());
        out.push(String::new());
        out.push("    constructor(fetcher: Fetcher) {".to_string());
        out.push("        this.fetcher = fetcher;".to_string());
        out.push("    }".to_string());

        for (rpc, method_name) in service.procedures().iter().zip(&names.methods) {
            let path = route_path(&rpc.name);
            let argument = if rpc.request.is_some() { "request" } else { "undefined" };

            out.push(String::new());
            out.push(format!("    async {} {{", self.signature(service, names, rpc, method_name)));
            if rpc.response.is_some() {
                out.push(format!("        const data = await this.fetcher(\"{}\", {});", path, argument));
                out.push(format!("        return data as {};", self.response_type(service, names, rpc)));
            } else {
                out.push(format!("        await this.fetcher(\"{}\", {});", path, argument));
            }
            out.push("    }".to_string());
        }

        out.push("}".to_string());
    }
}

impl<'o> CodeGenerator for TypeScriptGenerator<'o> {
    fn generate(&self, service: &Service) -> String {
        let names = ClientNames::new(service);
        let mut out = vec![HEADER.to_string(), String::new()];
        self.write_types(service, &names, &mut out);
        self.write_interface(service, &names, &mut out);
        self.write_client(service, &names, &mut out);
        out.push(String::new());
        out.join("\n")
    }
}
