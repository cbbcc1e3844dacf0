//! brine-rpc
//!
//! Config-driven code generation for Brine RPC service definitions.
//!
//! - `RpcGenConfig` / `load_config` for the JSON config file
//! - `run` to compile a definition and write every configured client and server
//! - Re-exports of the compiler and schema types most callers need

mod config;

pub use config::{load_config, run, ConfigError, Job, RpcGenConfig, TargetConfig};

pub use brine_rpc_compiler::{
    compile, compile_file, generate, CompileError, Diagnostic, DiagnosticKind, DiagnosticReport,
    GeneratorOptions, Target,
};
pub use brine_rpc_schema::{Field, Rpc, Service, Type, TypeId, TypeRef};

pub mod traits {
    pub use brine_rpc_compiler::traits::CodeGenerator;
}

pub mod error {
    pub use crate::config::ConfigError;
    pub use brine_rpc_compiler::error::{CompileError, Diagnostic, DiagnosticKind, DiagnosticReport};
}

pub mod schema {
    pub use brine_rpc_schema::*;
}
