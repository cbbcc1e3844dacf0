use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use brine_rpc::{ConfigError, GeneratorOptions, Service, Target};
use brine_rpc_compiler::{compile, generate, utils::is_identifier, CompileError, DiagnosticReport};

mod report;

#[derive(Parser)]
#[command(name = "brpc")]
#[command(about = "Check Brine RPC service definitions and generate clients and servers from them", long_about = None)]
struct Cli {
    /// Log compiler passes to stderr (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a `.rpc` definition and report any problems
    Check {
        /// Input `.rpc` file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the resolved service as JSON
    Dump {
        /// Input `.rpc` file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Generate bindings for one target
    Gen {
        /// Input `.rpc` file
        #[arg(short, long)]
        input: PathBuf,

        /// `typescript` or `rust`
        #[arg(short, long)]
        target: Target,

        /// Output file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Spell an IDL type differently in the output, e.g. `uuid=UUID`
        #[arg(short = 'T', long = "type", value_name = "NAME=TYPE", value_parser = parse_alias)]
        types: Vec<(String, String)>,
    },

    /// Generate every client and server listed in a config file
    Run {
        /// JSON config file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write {}: {source}", .path.display())]
    Write {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} does not compile", .path.display())]
    Compile {
        path:   PathBuf,
        text:   String,
        report: DiagnosticReport,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not serialize service: {0}")]
    Json(#[from] serde_json::Error),
}

fn parse_alias(arg: &str) -> Result<(String, String), String> {
    let (name, ty) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=TYPE, found {:?}", arg))?;
    if !is_identifier(name) {
        return Err(format!("{:?} is not a valid type name", name));
    }
    Ok((name.to_string(), ty.to_string()))
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn compile_input(path: &Path) -> Result<Service, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    match compile(&text) {
        Ok(service) => Ok(service),
        Err(CompileError::Diagnostics(report)) => Err(CliError::Compile {
            path: path.to_path_buf(),
            text,
            report,
        }),
        Err(CompileError::Io(source)) => Err(CliError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn execute(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Check { input } => {
            let service = compile_input(&input)?;
            println!(
                "{}: ok ({} types, {} procedures)",
                input.display(),
                service.user_types().count(),
                service.procedures().len()
            );
            Ok(())
        }

        Commands::Dump { input } => {
            let service = compile_input(&input)?;
            println!("{}", serde_json::to_string_pretty(&service)?);
            Ok(())
        }

        Commands::Gen { input, target, output, types } => {
            let service = compile_input(&input)?;
            let options = GeneratorOptions::with_types(types.into_iter().collect());
            let code = generate(target, &service, &options);
            match output {
                Some(path) => {
                    fs::write(&path, code).map_err(|source| CliError::Write {
                        path: path.clone(),
                        source,
                    })?;
                    println!("Generated {} code written to {}", target, path.display());
                }
                None => print!("{}", code),
            }
            Ok(())
        }

        Commands::Run { config } => {
            let written = brine_rpc::run(&config)?;
            for path in &written {
                println!("wrote {}", path.display());
            }
            println!("Generation complete");
            Ok(())
        }
    }
}

/// Print `err` to stderr, rendering diagnostics against their source when
/// the source is at hand.
fn report_error(err: &CliError) {
    let (path, text, diagnostics) = match err {
        CliError::Compile { path, text, report } => (path, text.clone(), report),
        CliError::Config(ConfigError::Compile {
            path,
            source: CompileError::Diagnostics(report),
        }) => match fs::read_to_string(path) {
            Ok(text) => (path, text, report),
            Err(_) => {
                eprintln!("error: {}\n{}", err, report);
                return;
            }
        },
        _ => {
            eprintln!("error: {}", err);
            return;
        }
    };

    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let name = path.display().to_string();
    if let Err(render_err) = report::emit_diagnostics(&mut stderr, &name, &text, diagnostics) {
        debug!(error = %render_err, "falling back to plain diagnostics");
        eprintln!("{}", diagnostics);
    }
    eprintln!("error: {} ({} problem(s))", err, diagnostics.len());
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn gen_arguments() {
        let cli = Cli::try_parse_from([
            "brpc", "gen", "-i", "service.rpc", "-t", "rust", "-T", "uuid=uuid::Uuid", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Gen { target, types, output, .. } => {
                assert_eq!(target, Target::Rust);
                assert_eq!(types, vec![("uuid".to_string(), "uuid::Uuid".to_string())]);
                assert!(output.is_none());
            }
            _ => panic!("expected gen"),
        }
    }

    #[test]
    fn unknown_target_is_a_usage_error() {
        assert!(Cli::try_parse_from(["brpc", "gen", "-i", "a.rpc", "-t", "go-echo"]).is_err());
    }

    #[test]
    fn alias_arguments() {
        assert_eq!(parse_alias("date=Date"), Ok(("date".to_string(), "Date".to_string())));
        assert!(parse_alias("date").is_err());
        assert!(parse_alias("no name=Date").is_err());
    }

    #[test]
    fn compile_errors_keep_their_source() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.rpc");
        fs::write(&path, "model A { b B }").unwrap();

        match compile_input(&path) {
            Err(CliError::Compile { text, report, .. }) => {
                assert_eq!(text, "model A { b B }");
                assert_eq!(report.len(), 1);
            }
            other => panic!("expected compile error, got {:?}", other.map(|_| ())),
        }
    }
}
