use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use brine_rpc_compiler::{
    compile, generate, utils::is_identifier, CompileError, GeneratorOptions, Target, UnknownTarget,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not access {}: {source}", .path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Json {
        path:   PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    UnknownTarget(#[from] UnknownTarget),

    #[error("target {target} aliases {name:?}, which is not a valid type name")]
    InvalidAlias { target: String, name: String },

    #[error("{} does not compile: {source}", .path.display())]
    Compile {
        path:   PathBuf,
        #[source]
        source: CompileError,
    },
}

/// Output settings for one generated client or server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(alias = "Output")]
    pub output: PathBuf,

    /// IDL type name -> spelling in the target language.
    #[serde(default)]
    pub types: BTreeMap<String, String>,
}

/// The JSON document driving `brpc run`.
///
/// ```json
/// {
///   "definition": "service.rpc",
///   "clients": { "typescript": { "output": "gen/client.ts", "types": { "uuid": "string" } } },
///   "servers": { "rust": { "output": "gen/server.rs" } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcGenConfig {
    pub definition: PathBuf,

    #[serde(default)]
    pub clients: BTreeMap<String, TargetConfig>,

    #[serde(default)]
    pub servers: BTreeMap<String, TargetConfig>,
}

/// One file to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub target:  Target,
    pub output:  PathBuf,
    pub options: GeneratorOptions,
}

impl RpcGenConfig {
    /// Clients first, then servers, each in key order.
    pub fn jobs(&self) -> Result<Vec<Job>, ConfigError> {
        self.clients
            .iter()
            .chain(self.servers.iter())
            .map(|(key, config)| {
                let target: Target = key.parse()?;
                if let Some(name) = config.types.keys().find(|name| !is_identifier(name)) {
                    return Err(ConfigError::InvalidAlias {
                        target: key.clone(),
                        name:   name.clone(),
                    });
                }
                Ok(Job {
                    target,
                    output:  config.output.clone(),
                    options: GeneratorOptions::with_types(config.types.clone()),
                })
            })
            .collect()
    }

    /// Make every relative path in the config relative to `base` instead.
    pub fn resolve_paths(&mut self, base: &Path) {
        self.definition = base.join(&self.definition);
        for config in self.clients.values_mut().chain(self.servers.values_mut()) {
            config.output = base.join(&config.output);
        }
    }
}

/// Read and validate a config file. Relative paths inside it are resolved
/// against the directory holding the file.
pub fn load_config(path: impl AsRef<Path>) -> Result<RpcGenConfig, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: RpcGenConfig =
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    config.jobs()?;
    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }
    debug!(
        path = %path.display(),
        clients = config.clients.len(),
        servers = config.servers.len(),
        "loaded config"
    );
    Ok(config)
}

/// Compile the definition named by the config at `config_path` and write
/// every configured target. Returns the paths written, in job order.
pub fn run(config_path: impl AsRef<Path>) -> Result<Vec<PathBuf>, ConfigError> {
    let config = load_config(config_path)?;
    let jobs = config.jobs()?;

    let definition = &config.definition;
    let text = fs::read_to_string(definition).map_err(|source| ConfigError::Io {
        path: definition.clone(),
        source,
    })?;
    let service = compile(&text).map_err(|source| ConfigError::Compile {
        path: definition.clone(),
        source,
    })?;

    let mut written = Vec::with_capacity(jobs.len());
    for job in jobs {
        let code = generate(job.target, &service, &job.options);
        if let Some(dir) = job.output.parent() {
            fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(&job.output, code).map_err(|source| ConfigError::Io {
            path: job.output.clone(),
            source,
        })?;
        info!(target = %job.target, path = %job.output.display(), "wrote bindings");
        written.push(job.output);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use brine_rpc_compiler::DiagnosticKind;
    use tempfile::TempDir;

    const DEFINITION: &str = "
model Entry { id uuid name string }
rpc CreateEntry(name string) Entry
rpc ListEntries() Entry[]
";

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn run_writes_every_target() {
        let dir = TempDir::new().unwrap();
        write(&dir, "service.rpc", DEFINITION);
        let config = write(
            &dir,
            "rpc.json",
            r#"{
                "definition": "service.rpc",
                "clients": { "typescript": { "output": "web/client.ts", "types": { "uuid": "UUID" } } },
                "servers": { "rust": { "output": "server/src/api.rs" } }
            }"#,
        );

        let written = run(&config).unwrap();
        assert_eq!(
            written,
            vec![dir.path().join("web/client.ts"), dir.path().join("server/src/api.rs")]
        );

        let ts = fs::read_to_string(&written[0]).unwrap();
        assert!(ts.contains("    id: UUID;"));
        assert!(ts.contains("listEntries(): Promise<Entry[]>;"));

        let rs = fs::read_to_string(&written[1]).unwrap();
        assert!(rs.contains("pub struct CreateEntryParams {"));
        assert!(rs.contains("    pub id: String,"));
    }

    #[test]
    fn paths_resolve_against_config_dir() {
        let dir = TempDir::new().unwrap();
        let config = write(
            &dir,
            "rpc.json",
            r#"{ "definition": "defs/a.rpc", "clients": { "typescript": { "Output": "out.ts" } } }"#,
        );
        let config = load_config(config).unwrap();
        assert_eq!(config.definition, dir.path().join("defs/a.rpc"));
        assert_eq!(config.clients["typescript"].output, dir.path().join("out.ts"));
        assert!(config.servers.is_empty());
    }

    #[test]
    fn unknown_target_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config = write(
            &dir,
            "rpc.json",
            r#"{ "definition": "a.rpc", "servers": { "go-echo": { "output": "server.go" } } }"#,
        );
        match load_config(config) {
            Err(ConfigError::UnknownTarget(UnknownTarget(key))) => assert_eq!(key, "go-echo"),
            other => panic!("expected unknown target, got {:?}", other),
        }
    }

    #[test]
    fn alias_keys_must_be_identifiers() {
        let dir = TempDir::new().unwrap();
        let config = write(
            &dir,
            "rpc.json",
            r#"{ "definition": "a.rpc", "clients": { "typescript": { "output": "c.ts", "types": { "not a name": "string" } } } }"#,
        );
        match load_config(config) {
            Err(ConfigError::InvalidAlias { target, name }) => {
                assert_eq!(target, "typescript");
                assert_eq!(name, "not a name");
            }
            other => panic!("expected invalid alias, got {:?}", other),
        }
    }

    #[test]
    fn malformed_json() {
        let dir = TempDir::new().unwrap();
        let config = write(&dir, "rpc.json", r#"{ "clients": {} }"#);
        assert!(matches!(load_config(config), Err(ConfigError::Json { .. })));
    }

    #[test]
    fn missing_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json");
        match load_config(&path) {
            Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[test]
    fn failed_compile_writes_nothing() {
        let dir = TempDir::new().unwrap();
        write(&dir, "service.rpc", "model Entry { owner User }");
        let config = write(
            &dir,
            "rpc.json",
            r#"{ "definition": "service.rpc", "clients": { "typescript": { "output": "gen/client.ts" } } }"#,
        );

        match run(&config) {
            Err(ConfigError::Compile { source: CompileError::Diagnostics(report), .. }) => {
                assert!(report.has_kind(DiagnosticKind::UndefinedSymbol));
            }
            other => panic!("expected compile error, got {:?}", other),
        }
        assert!(!dir.path().join("gen").exists());
    }
}
