use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use brine_rpc_schema::{Service, TypeId};
use thiserror::Error;
use tracing::debug;

use crate::{
    gen_rust::RustGenerator,
    gen_typescript::TypeScriptGenerator,
    traits::CodeGenerator,
    utils::quote,
};

/// Every language the compiler can emit bindings for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    TypeScript,
    Rust,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown target {}, expected one of: typescript, rust", quote(.0))]
pub struct UnknownTarget(pub String);

impl Target {
    pub const ALL: [Target; 2] = [Target::TypeScript, Target::Rust];

    /// The name used for this target in config files and on the command line.
    pub fn key(self) -> &'static str {
        match self {
            Target::TypeScript => "typescript",
            Target::Rust       => "rust",
        }
    }
}

impl FromStr for Target {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::ALL
            .into_iter()
            .find(|target| target.key() == s)
            .ok_or_else(|| UnknownTarget(s.to_string()))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Per-target settings handed to a generator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Overrides for how a type name is spelled in the target language.
    /// Names not listed fall back to the generator's defaults.
    pub types: BTreeMap<String, String>,
}

impl GeneratorOptions {
    pub fn with_types(types: BTreeMap<String, String>) -> GeneratorOptions {
        GeneratorOptions { types }
    }

    /// The configured spelling for the type behind `id`, if any.
    pub fn alias(&self, service: &Service, id: TypeId) -> Option<&str> {
        self.types.get(service.type_of(id).name()).map(String::as_str)
    }
}

pub fn generate(target: Target, service: &Service, options: &GeneratorOptions) -> String {
    debug!(%target, aliases = options.types.len(), "generating bindings");
    match target {
        Target::TypeScript => TypeScriptGenerator::new(options).generate(service),
        Target::Rust       => RustGenerator::new(options).generate(service),
    }
}
