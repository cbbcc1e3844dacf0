use tracing::debug;

use crate::{
    ast::{FieldDecl, Ident, ModelDecl, Parameter, RpcDecl, ServiceDefinition, TypeExpr},
    error::Diagnostic,
    source::{CharStream, SourceChars, Span},
    token_stream::TokenStream,
    tokenizer::{Token, TokenKind},
    utils::quote,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Model,
    Rpc,
    Optional,
}

impl Keyword {
    pub const ALL: [Keyword; 3] = [Keyword::Model, Keyword::Rpc, Keyword::Optional];

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Model    => "model",
            Keyword::Rpc      => "rpc",
            Keyword::Optional => "optional",
        }
    }

    pub fn from_str(text: &str) -> Option<Keyword> {
        Keyword::ALL.into_iter().find(|kw| kw.as_str() == text)
    }

    /// Words that open a top-level declaration.
    pub fn starts_declaration(self) -> bool {
        matches!(self, Keyword::Model | Keyword::Rpc)
    }
}

fn declaration_keyword(token: &Token) -> Option<Keyword> {
    if token.kind != TokenKind::Identifier {
        return None;
    }
    Keyword::from_str(&token.text).filter(|kw| kw.starts_declaration())
}

type ParseResult<T> = Result<T, Diagnostic>;

/// Array and optional suffixes allowed on a single type. Every later pass
/// walks type expressions recursively, so this bounds their stack use.
pub const MAX_TYPE_DEPTH: usize = 64;

/// Recursive-descent parser over a [`TokenStream`].
///
/// A declaration that fails to parse is reported and dropped; the parser then
/// skips ahead to the next `model` or `rpc` and keeps going, so one run
/// reports every malformed declaration in the file.
pub struct Parser<S> {
    tokens:      TokenStream<S>,
    diagnostics: Vec<Diagnostic>,
    last_span:   Option<Span>,
}

impl<'a> Parser<SourceChars<'a>> {
    pub fn new(text: &'a str) -> Self {
        Parser::from_tokens(TokenStream::from_text(text))
    }
}

impl<S: CharStream> Parser<S> {
    pub fn from_tokens(tokens: TokenStream<S>) -> Self {
        Parser {
            tokens,
            diagnostics: Vec::new(),
            last_span: None,
        }
    }

    /// Parse the whole input. Lexical and syntax diagnostics come back
    /// together, ordered by position.
    pub fn parse(mut self) -> (ServiceDefinition, Vec<Diagnostic>) {
        let mut definition = ServiceDefinition::default();
        let mut recovering = false;

        loop {
            let keyword = match self.tokens.lookahead(0) {
                Ok(token) => declaration_keyword(token),
                Err(_) => break,
            };

            let parsed = match keyword {
                Some(Keyword::Model) => self.model_decl().map(|model| definition.models.push(model)),
                Some(_) => self.rpc_decl().map(|rpc| definition.procedures.push(rpc)),
                None => {
                    let token = match self.tokens.next() {
                        Ok(token) => token,
                        Err(_) => break,
                    };
                    if !recovering {
                        self.diagnostics.push(Diagnostic::syntax(
                            format!("expected keyword \"model\" or \"rpc\" but found {}", token.describe()),
                            Some(token.span),
                        ));
                    }
                    recovering = true;
                    continue;
                }
            };

            recovering = match parsed {
                Ok(()) => false,
                Err(diagnostic) => {
                    self.diagnostics.push(diagnostic);
                    true
                }
            };
        }

        let mut diagnostics = self.tokens.take_diagnostics();
        diagnostics.append(&mut self.diagnostics);
        diagnostics.sort_by_key(|d| d.span.map_or(usize::MAX, |span| span.start.offset));

        debug!(
            models = definition.models.len(),
            procedures = definition.procedures.len(),
            diagnostics = diagnostics.len(),
            "parsed service definition"
        );
        (definition, diagnostics)
    }

    fn end_span(&self) -> Option<Span> {
        self.last_span.map(|span| Span::new(span.end, span.end))
    }

    fn advance(&mut self, expected: &str) -> ParseResult<Token> {
        match self.tokens.next() {
            Ok(token) => {
                self.last_span = Some(token.span);
                Ok(token)
            }
            Err(_) => Err(Diagnostic::syntax(
                format!("expected {} but reached end of input", expected),
                self.end_span(),
            )),
        }
    }

    fn peek_is(&mut self, kind: TokenKind) -> bool {
        matches!(self.tokens.lookahead(0), Ok(token) if token.kind == kind)
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        let token = self.advance(&kind.to_string())?;
        if token.kind != kind {
            return Err(Diagnostic::syntax(
                format!("expected {} but found {}", kind, token.describe()),
                Some(token.span),
            ));
        }
        Ok(token)
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> ParseResult<Token> {
        let expected = format!("keyword {}", quote(keyword.as_str()));
        let token = self.advance(&expected)?;
        if !token.is_word(keyword.as_str()) {
            return Err(Diagnostic::syntax(
                format!("expected {} but found {}", expected, token.describe()),
                Some(token.span),
            ));
        }
        Ok(token)
    }

    fn ident(&mut self) -> ParseResult<Ident> {
        let token = self.expect(TokenKind::Identifier)?;
        Ok(Ident::new(token.text, token.span))
    }

    // model Name { field Type ... }
    fn model_decl(&mut self) -> ParseResult<ModelDecl> {
        self.expect_keyword(Keyword::Model)?;
        let name = self.ident()?;
        self.expect(TokenKind::LeftBrace)?;

        let mut fields = Vec::new();
        while self.peek_is(TokenKind::Identifier) {
            fields.push(self.field_decl()?);
        }

        self.expect(TokenKind::RightBrace)?;
        Ok(ModelDecl { name, fields })
    }

    fn field_decl(&mut self) -> ParseResult<FieldDecl> {
        let name = self.ident()?;
        let ty = self.type_expr()?;
        Ok(FieldDecl { name, ty })
    }

    // rpc Name(param Type, ...) ReturnType?
    fn rpc_decl(&mut self) -> ParseResult<RpcDecl> {
        self.expect_keyword(Keyword::Rpc)?;
        let name = self.ident()?;
        self.expect(TokenKind::LeftParen)?;

        let mut parameters = Vec::new();
        if !self.peek_is(TokenKind::RightParen) {
            loop {
                parameters.push(self.parameter()?);
                if !self.peek_is(TokenKind::Comma) {
                    break;
                }
                self.advance("\",\"")?;
            }
        }
        self.expect(TokenKind::RightParen)?;

        let has_return_type = matches!(
            self.tokens.lookahead(0),
            Ok(token) if token.kind == TokenKind::Identifier && declaration_keyword(token).is_none()
        );
        let return_type = if has_return_type { Some(self.type_expr()?) } else { None };

        Ok(RpcDecl { name, parameters, return_type })
    }

    fn parameter(&mut self) -> ParseResult<Parameter> {
        let name = self.ident()?;
        let ty = self.type_expr()?;
        Ok(Parameter { name, ty })
    }

    // Suffixes wrap what came before them, so `int[]?` is Optional(Array(int)).
    fn type_expr(&mut self) -> ParseResult<TypeExpr> {
        let name = self.ident()?;
        let mut ty = TypeExpr::Named(name.clone());
        let mut depth = 0;
        loop {
            let is_array = if self.peek_is(TokenKind::LeftBracket) {
                true
            } else if self.peek_is(TokenKind::Question) {
                false
            } else {
                return Ok(ty);
            };

            let suffix = self.advance("type suffix")?;
            if depth == MAX_TYPE_DEPTH {
                return Err(Diagnostic::syntax(
                    format!(
                        "type {} has more than {} \"[]\" and \"?\" suffixes",
                        quote(&name.name),
                        MAX_TYPE_DEPTH
                    ),
                    Some(suffix.span),
                ));
            }

            ty = if is_array {
                self.expect(TokenKind::RightBracket)?;
                TypeExpr::array(ty)
            } else {
                TypeExpr::optional(ty)
            };
            depth += 1;
        }
    }
}

/// Parse `text` into declarations plus every lexical and syntax diagnostic.
pub fn parse_service(text: &str) -> (ServiceDefinition, Vec<Diagnostic>) {
    Parser::new(text).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use crate::source::Position;

    fn parse_ok(text: &str) -> ServiceDefinition {
        let (definition, diagnostics) = parse_service(text);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
        definition
    }

    fn names(ty: &TypeExpr) -> String {
        ty.to_string()
    }

    #[test]
    fn parses_model_fields() {
        let definition = parse_ok("model M { a int b string? c int[] }");
        assert_eq!(definition.models.len(), 1);
        let model = &definition.models[0];
        assert_eq!(model.name.name, "M");
        let fields: Vec<(&str, String)> =
            model.fields.iter().map(|f| (f.name.name.as_str(), names(&f.ty))).collect();
        assert_eq!(
            fields,
            vec![("a", "int".to_string()), ("b", "string?".to_string()), ("c", "int[]".to_string())]
        );
    }

    #[test]
    fn suffixes_apply_innermost_first() {
        let definition = parse_ok("model M { x int[]? y string[][] }");
        let x = &definition.models[0].fields[0].ty;
        match x {
            TypeExpr::Optional(inner) => match inner.as_ref() {
                TypeExpr::Array(inner) => assert_eq!(inner.leaf().name, "int"),
                other => panic!("expected array, got {:?}", other),
            },
            other => panic!("expected optional, got {:?}", other),
        }
        let y = &definition.models[0].fields[1].ty;
        assert!(y.is_array());
        assert_eq!(y.to_string(), "string[][]");
    }

    #[test]
    fn parses_rpc_with_parameters_and_return_type() {
        let definition = parse_ok("rpc Do(x Foo, y int) Bar");
        let rpc = &definition.procedures[0];
        assert_eq!(rpc.name.name, "Do");
        assert_eq!(rpc.parameters.len(), 2);
        assert_eq!(rpc.parameters[0].name.name, "x");
        assert_eq!(rpc.parameters[1].ty.to_string(), "int");
        assert_eq!(rpc.return_type.as_ref().map(|t| t.to_string()), Some("Bar".to_string()));
    }

    #[test]
    fn return_type_stops_at_next_declaration() {
        let definition = parse_ok("rpc Ping() rpc Pong() Reply model Reply {}");
        assert_eq!(definition.procedures.len(), 2);
        assert!(definition.procedures[0].parameters.is_empty());
        assert!(definition.procedures[0].return_type.is_none());
        assert_eq!(definition.procedures[1].return_type.as_ref().unwrap().to_string(), "Reply");
        assert_eq!(definition.models.len(), 1);
    }

    #[test]
    fn identifier_spans() {
        let definition = parse_ok("model\n  Entry {}");
        let name = &definition.models[0].name;
        assert_eq!(name.span.start, Position::new(8, 1, 2));
        assert_eq!(name.span.end, Position::new(13, 1, 7));
    }

    #[test]
    fn empty_input() {
        let definition = parse_ok("");
        assert!(definition.is_empty());
    }

    #[test]
    fn reports_stray_tokens_once_and_recovers() {
        let (definition, diagnostics) = parse_service("oops ( ) model M { a int }");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Syntax);
        assert!(diagnostics[0].message.contains("\"model\" or \"rpc\""));
        assert_eq!(definition.models.len(), 1);
    }

    #[test]
    fn malformed_declaration_does_not_hide_the_rest() {
        let text = "model A { x int, y int }\nrpc B(a int b int)\nmodel C { z int }";
        let (definition, diagnostics) = parse_service(text);
        assert_eq!(diagnostics.len(), 2, "{:?}", diagnostics);
        assert!(diagnostics[0].message.contains("expected \"}\" but found \",\""));
        assert_eq!(diagnostics[0].span.unwrap().start.line, 0);
        assert_eq!(diagnostics[1].span.unwrap().start.line, 1);
        assert_eq!(definition.models.len(), 1);
        assert_eq!(definition.models[0].name.name, "C");
        assert!(definition.procedures.is_empty());
    }

    #[test]
    fn missing_closing_brace_at_end_of_input() {
        let (definition, diagnostics) = parse_service("model M { a int");
        assert!(definition.models.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("reached end of input"));
        assert_eq!(diagnostics[0].span.unwrap().start, Position::new(15, 0, 15));
    }

    #[test]
    fn unclosed_array_suffix() {
        let (_, diagnostics) = parse_service("model M { a int[ }");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("expected \"]\""));
    }

    #[test]
    fn lexical_errors_are_merged_in_order() {
        let (definition, diagnostics) = parse_service("model M { a int % }\nmodel N { ! }");
        let kinds: Vec<DiagnosticKind> = diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::Lexical, DiagnosticKind::Lexical]);
        assert_eq!(definition.models.len(), 2);
    }

    #[test]
    fn suffix_depth_is_capped() {
        let text = format!("model Deep {{ d int{} }}\nmodel After {{}}", "[]".repeat(5000));
        let (definition, diagnostics) = parse_service(&text);
        assert_eq!(diagnostics.len(), 1, "{:?}", diagnostics);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Syntax);
        assert!(diagnostics[0].message.contains("more than 64"));
        let prefix = "model Deep { d int".len();
        assert_eq!(diagnostics[0].span.unwrap().start.offset, prefix + 2 * MAX_TYPE_DEPTH);
        assert_eq!(definition.models.len(), 1);
        assert_eq!(definition.models[0].name.name, "After");
    }

    #[test]
    fn suffix_depth_at_the_limit() {
        let text = format!("model M {{ d int{} }}", "?".repeat(MAX_TYPE_DEPTH));
        let definition = parse_ok(&text);
        assert_eq!(definition.models[0].fields[0].ty.to_string(), format!("int{}", "?".repeat(64)));
    }

    #[test]
    fn keyword_lookup() {
        assert_eq!(Keyword::from_str("rpc"), Some(Keyword::Rpc));
        assert_eq!(Keyword::from_str("optional"), Some(Keyword::Optional));
        assert!(!Keyword::Optional.starts_declaration());
        assert_eq!(Keyword::from_str("Model"), None);
    }
}
