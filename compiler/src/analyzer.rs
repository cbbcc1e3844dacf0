use std::collections::{HashMap, HashSet};

use brine_rpc_schema::{Field, ObjectType, Rpc, Service, Type, TypeExpr, TypeId, TypeRef, SCALAR_TYPES};
use tracing::{debug, trace};

use crate::{
    ast::{self, FieldDecl, Ident, ModelDecl, Parameter, RpcDecl, ServiceDefinition},
    error::Diagnostic,
    source::Span,
    utils::quote,
};

/// Names that may not be used for a model, field, parameter or procedure.
/// `optional` is held back for a keyword-style optional marker.
pub const RESERVED_NAMES: [&str; 3] = ["model", "rpc", "optional"];

pub const PARAMS_SUFFIX: &str = "Params";

/// A model whose fields still name their types.
struct PendingModel<'d> {
    id:     TypeId,
    decl:   &'d ModelDecl,
    fields: Vec<&'d FieldDecl>,
}

/// Builds the symbol table for one service definition and resolves every
/// type reference in it.
///
/// Runs four passes (built-ins, models, references, procedures) and keeps
/// going after a problem so that all of them are reported at once.
#[derive(Default)]
pub struct Analyzer {
    types:       Vec<Type>,
    index:       HashMap<String, TypeId>,
    procedures:  Vec<Rpc>,
    diagnostics: Vec<Diagnostic>,
}

impl Analyzer {
    pub fn new() -> Analyzer {
        Analyzer::default()
    }

    pub fn analyze(mut self, definition: &ServiceDefinition) -> Result<Service, Vec<Diagnostic>> {
        self.register_builtins();
        let pending = self.register_models(&definition.models);
        self.resolve_references(pending);
        self.register_procedures(&definition.procedures);

        debug!(
            types = self.types.len(),
            procedures = self.procedures.len(),
            diagnostics = self.diagnostics.len(),
            "analyzed service definition"
        );

        if self.diagnostics.is_empty() {
            Ok(Service::new(self.types, self.procedures))
        } else {
            Err(self.diagnostics)
        }
    }

    fn register(&mut self, ty: Type) -> TypeId {
        let id = TypeId::new(self.types.len());
        self.index.insert(ty.name().to_string(), id);
        self.types.push(ty);
        id
    }

    fn check_reserved(&mut self, ident: &Ident, what: &str) {
        if RESERVED_NAMES.contains(&ident.name.as_str()) {
            self.diagnostics.push(Diagnostic::syntax(
                format!("{} name {} is a reserved word", what, quote(&ident.name)),
                Some(ident.span),
            ));
        }
    }

    fn resolve(&self, ty: &ast::TypeExpr) -> Result<TypeRef, Ident> {
        ty.try_map_leaf(|ident| self.index.get(&ident.name).copied().ok_or_else(|| ident.clone()))
    }

    // Pass 1
    fn register_builtins(&mut self) {
        for name in SCALAR_TYPES {
            self.register(Type::Scalar(name.to_string()));
        }
    }

    // Pass 2: declare every model with no fields yet; the first of two
    // same-named models or fields wins.
    fn register_models<'d>(&mut self, models: &'d [ModelDecl]) -> Vec<PendingModel<'d>> {
        let mut pending = Vec::with_capacity(models.len());

        for model in models {
            self.check_reserved(&model.name, "model");
            if self.index.contains_key(&model.name.name) {
                self.diagnostics.push(Diagnostic::duplicate(
                    format!("the type {} is defined twice", quote(&model.name.name)),
                    Some(model.name.span),
                ));
                continue;
            }

            let mut seen = HashSet::new();
            let mut fields = Vec::with_capacity(model.fields.len());
            for field in &model.fields {
                self.check_reserved(&field.name, "field");
                if !seen.insert(field.name.name.as_str()) {
                    self.diagnostics.push(Diagnostic::duplicate(
                        format!(
                            "duplicate field {} in model {}",
                            quote(&field.name.name),
                            quote(&model.name.name)
                        ),
                        Some(field.name.span),
                    ));
                    continue;
                }
                fields.push(field);
            }

            let id = self.register(Type::Object(ObjectType::new(model.name.name.clone(), Vec::new())));
            pending.push(PendingModel { id, decl: model, fields });
        }

        pending
    }

    // Pass 3: only leaves change; array and optional wrappers are kept.
    fn resolve_references(&mut self, pending: Vec<PendingModel<'_>>) {
        for model in pending {
            let mut fields = Vec::with_capacity(model.fields.len());
            for field in model.fields {
                match self.resolve(&field.ty) {
                    Ok(ty) => {
                        trace!(model = %model.decl.name, field = %field.name, ty = %field.ty, "resolved field");
                        fields.push(Field::new(field.name.name.clone(), ty));
                    }
                    Err(missing) => self.diagnostics.push(Diagnostic::undefined(
                        format!(
                            "unknown type {} in {}",
                            quote(&missing.name),
                            quote(&format!("{}.{}", model.decl.name.name, field.name.name))
                        ),
                        Some(missing.span),
                    )),
                }
            }

            if let Type::Object(object) = &mut self.types[model.id.index()] {
                object.fields = fields;
            }
        }
    }

    // Pass 4
    fn register_procedures(&mut self, procedures: &[RpcDecl]) {
        let mut seen = HashSet::new();

        for rpc in procedures {
            self.check_reserved(&rpc.name, "procedure");
            if !seen.insert(rpc.name.name.as_str()) {
                self.diagnostics.push(Diagnostic::duplicate(
                    format!("procedure {} is defined twice", quote(&rpc.name.name)),
                    Some(rpc.name.span),
                ));
                continue;
            }

            let request = self.synthesize_params(rpc);
            if let Some(id) = request {
                self.check_shape(rpc, "request", &TypeExpr::Named(id), rpc.name.span);
            }

            let response = rpc.return_type.as_ref().and_then(|declared| match self.resolve(declared) {
                Ok(ty) => {
                    self.check_shape(rpc, "response", &ty, declared.leaf().span);
                    Some(ty)
                }
                Err(missing) => {
                    self.diagnostics.push(Diagnostic::undefined(
                        format!(
                            "unknown type {} in response of procedure {}",
                            quote(&missing.name),
                            quote(&rpc.name.name)
                        ),
                        Some(missing.span),
                    ));
                    None
                }
            });

            self.procedures.push(Rpc {
                name: rpc.name.name.clone(),
                request,
                response,
            });
        }
    }

    /// Bundle the parameters into a `<Name>Params` object so every procedure
    /// takes at most one request value.
    fn synthesize_params(&mut self, rpc: &RpcDecl) -> Option<TypeId> {
        if rpc.parameters.is_empty() {
            return None;
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(rpc.parameters.len());
        for Parameter { name, ty } in &rpc.parameters {
            self.check_reserved(name, "parameter");
            if !seen.insert(name.name.as_str()) {
                self.diagnostics.push(Diagnostic::duplicate(
                    format!(
                        "duplicate parameter {} in procedure {}",
                        quote(&name.name),
                        quote(&rpc.name.name)
                    ),
                    Some(name.span),
                ));
                continue;
            }
            match self.resolve(ty) {
                Ok(resolved) => fields.push(Field::new(name.name.clone(), resolved)),
                Err(missing) => self.diagnostics.push(Diagnostic::undefined(
                    format!(
                        "unknown type {} for parameter {} of procedure {}",
                        quote(&missing.name),
                        quote(&name.name),
                        quote(&rpc.name.name)
                    ),
                    Some(missing.span),
                )),
            }
        }

        let params_name = format!("{}{}", rpc.name.name, PARAMS_SUFFIX);
        if self.index.contains_key(&params_name) {
            self.diagnostics.push(Diagnostic::duplicate(
                format!(
                    "the parameter model {} for procedure {} collides with an existing type",
                    quote(&params_name),
                    quote(&rpc.name.name)
                ),
                Some(rpc.name.span),
            ));
            return None;
        }

        Some(self.register(Type::Object(ObjectType::synthesized(params_name, fields))))
    }

    // A scalar may only travel inside an object, whatever wraps it.
    fn check_shape(&mut self, rpc: &RpcDecl, side: &str, ty: &TypeRef, span: Span) {
        let leaf = &self.types[ty.leaf().index()];
        if leaf.is_scalar() {
            self.diagnostics.push(Diagnostic::shape(
                format!(
                    "scalar type {} cannot be used directly as the {} of procedure {}; wrap it in a model",
                    quote(leaf.name()),
                    side,
                    quote(&rpc.name.name)
                ),
                Some(span),
            ));
        }
    }
}

pub fn analyze(definition: &ServiceDefinition) -> Result<Service, Vec<Diagnostic>> {
    Analyzer::new().analyze(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use crate::parser::parse_service;

    fn analyze_text(text: &str) -> Result<Service, Vec<Diagnostic>> {
        let (definition, diagnostics) = parse_service(text);
        assert!(diagnostics.is_empty(), "parse diagnostics: {:?}", diagnostics);
        analyze(&definition)
    }

    fn kinds(diagnostics: &[Diagnostic]) -> Vec<DiagnosticKind> {
        diagnostics.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn builtins_come_first() {
        let service = analyze_text("").unwrap();
        let names: Vec<&str> = service.types().map(|(_, ty)| ty.name()).collect();
        assert_eq!(names, SCALAR_TYPES.to_vec());
        assert!(service.procedures().is_empty());
    }

    #[test]
    fn resolves_model_fields() {
        let service = analyze_text("model M { a int b string? c int[] }").unwrap();
        let int = service.lookup("int").unwrap();
        let string = service.lookup("string").unwrap();
        let fields = service.type_named("M").unwrap().fields();
        assert_eq!(fields[0].ty, TypeExpr::Named(int));
        assert_eq!(fields[1].ty, TypeExpr::optional(TypeExpr::Named(string)));
        assert_eq!(fields[2].ty, TypeExpr::array(TypeExpr::Named(int)));
    }

    #[test]
    fn forward_references_resolve() {
        let service = analyze_text("model A { b B } model B { a A[] }").unwrap();
        let a = service.lookup("A").unwrap();
        let b = service.lookup("B").unwrap();
        assert_eq!(service.type_of(a).fields()[0].ty, TypeExpr::Named(b));
        assert_eq!(service.type_of(b).fields()[0].ty, TypeExpr::array(TypeExpr::Named(a)));
    }

    #[test]
    fn synthesizes_params_model() {
        let service = analyze_text("model Foo {} model Bar {} rpc Do(x Foo, y int) Bar").unwrap();
        let rpc = service.procedure("Do").unwrap();
        let request = service.type_of(rpc.request.unwrap());
        assert_eq!(request.name(), "DoParams");
        assert!(request.as_object().unwrap().synthesized);
        let fields: Vec<(&str, String)> = request
            .fields()
            .iter()
            .map(|f| (f.name.as_str(), service.display_type(&f.ty)))
            .collect();
        assert_eq!(fields, vec![("x", "Foo".to_string()), ("y", "int".to_string())]);
        assert_eq!(rpc.response, Some(TypeExpr::Named(service.lookup("Bar").unwrap())));
    }

    #[test]
    fn no_parameters_means_no_request() {
        let service = analyze_text("model Pong {} rpc Ping() Pong rpc Fire()").unwrap();
        assert_eq!(service.procedure("Ping").unwrap().request, None);
        assert_eq!(service.procedure("Fire").unwrap().response, None);
        assert!(service.type_named("PingParams").is_none());
    }

    #[test]
    fn self_reference_shares_the_handle() {
        let service = analyze_text("model Node { next Node? }").unwrap();
        let node = service.lookup("Node").unwrap();
        match &service.type_of(node).fields()[0].ty {
            TypeExpr::Optional(inner) => assert_eq!(**inner, TypeExpr::Named(node)),
            other => panic!("expected optional, got {:?}", other),
        }
    }

    #[test]
    fn undefined_field_type() {
        let errors = analyze_text("model M { a Unknown }").unwrap_err();
        assert_eq!(kinds(&errors), vec![DiagnosticKind::UndefinedSymbol]);
        assert!(errors[0].message.contains("\"Unknown\""));
        assert!(errors[0].message.contains("\"M.a\""));
    }

    #[test]
    fn duplicate_model_keeps_first() {
        let text = "model Foo { a int } model Foo { b string }";
        let (definition, _) = parse_service(text);
        let mut analyzer = Analyzer::new();
        analyzer.register_builtins();
        let pending = analyzer.register_models(&definition.models);
        analyzer.resolve_references(pending);

        assert_eq!(kinds(&analyzer.diagnostics), vec![DiagnosticKind::DuplicateSymbol]);
        let foo = analyzer.index["Foo"];
        let fields = analyzer.types[foo.index()].fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "a");
    }

    #[test]
    fn model_may_not_shadow_scalar() {
        let errors = analyze_text("model int {}").unwrap_err();
        assert_eq!(kinds(&errors), vec![DiagnosticKind::DuplicateSymbol]);
    }

    #[test]
    fn duplicate_field_keeps_first() {
        let errors = analyze_text("model M { a int a string }").unwrap_err();
        assert_eq!(kinds(&errors), vec![DiagnosticKind::DuplicateSymbol]);
        assert!(errors[0].message.contains("duplicate field \"a\""));
    }

    #[test]
    fn duplicate_procedure_and_parameter() {
        let errors = analyze_text("model R {} rpc Do(a int, a int) R rpc Do() R").unwrap_err();
        assert_eq!(
            kinds(&errors),
            vec![DiagnosticKind::DuplicateSymbol, DiagnosticKind::DuplicateSymbol]
        );
        assert!(errors[0].message.contains("parameter \"a\""));
        assert!(errors[1].message.contains("procedure \"Do\""));
    }

    #[test]
    fn scalar_response_is_rejected() {
        let errors = analyze_text("rpc Count() int rpc Ids() uuid[] rpc Name() string?").unwrap_err();
        assert_eq!(kinds(&errors), vec![DiagnosticKind::ShapeRule; 3]);
        assert!(errors[0].message.contains("response of procedure \"Count\""));
    }

    #[test]
    fn scalar_parameters_are_wrapped() {
        let service = analyze_text("model Out {} rpc Add(a int, b int) Out").unwrap();
        let request = service.procedure("Add").unwrap().request.unwrap();
        assert!(!service.type_of(request).is_scalar());
    }

    #[test]
    fn undefined_parameter_and_response() {
        let errors = analyze_text("rpc Do(x Missing) Gone").unwrap_err();
        assert_eq!(
            kinds(&errors),
            vec![DiagnosticKind::UndefinedSymbol, DiagnosticKind::UndefinedSymbol]
        );
        assert!(errors[0].message.contains("parameter \"x\""));
        assert!(errors[1].message.contains("response of procedure \"Do\""));
    }

    #[test]
    fn params_name_collision() {
        let errors = analyze_text("model DoParams {} model R {} rpc Do(a int) R").unwrap_err();
        assert_eq!(kinds(&errors), vec![DiagnosticKind::DuplicateSymbol]);
        assert!(errors[0].message.contains("\"DoParams\""));
    }

    #[test]
    fn reserved_names() {
        let errors = analyze_text("model optional { model int } rpc rpc(optional int)").unwrap_err();
        assert_eq!(kinds(&errors), vec![DiagnosticKind::Syntax; 4]);
    }

    #[test]
    fn diagnostics_accumulate_across_passes() {
        let text = "model A { x Nope } model A {} model R {} rpc Get() int rpc Get() R";
        let errors = analyze_text(text).unwrap_err();
        assert_eq!(
            kinds(&errors),
            vec![
                DiagnosticKind::DuplicateSymbol,
                DiagnosticKind::UndefinedSymbol,
                DiagnosticKind::ShapeRule,
                DiagnosticKind::DuplicateSymbol,
            ]
        );
    }
}
