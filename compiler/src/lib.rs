//! brine-rpc-compiler
//!
//! This crate implements:
//!  1) A character-level tokenizer and a token stream with arbitrary lookahead,
//!  2) A recursive-descent parser for `.rpc` interface definitions,
//!  3) Semantic analysis (symbol table, reference resolution, parameter
//!     bundles, duplicate/undefined/shape checks) producing a `Service`,
//!  4) Code generation for TypeScript clients and Rust servers,
//!  5) Diagnostics (`Diagnostic`, `DiagnosticReport`) and `CompileError`.

pub mod error;
pub mod source;
pub mod utils;
pub mod tokenizer;
pub mod ring_buffer;
pub mod token_stream;
pub mod ast;
pub mod parser;
pub mod analyzer;
pub mod compiler;
pub mod traits;
pub mod generator;
pub mod gen_typescript;
pub mod gen_rust;

pub use brine_rpc_schema as schema;

pub use compiler::{compile, compile_file};
pub use error::{CompileError, Diagnostic, DiagnosticKind, DiagnosticReport};
pub use generator::{generate, GeneratorOptions, Target, UnknownTarget};
pub use parser::parse_service;
