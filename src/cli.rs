//! CLI: load sources → (rust | describe)
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use polyjson::config::{DEFAULT_DISCRIMINANT, DEFAULT_RUNTIME_CRATE, DEFAULT_SOURCE_MODULE};
use polyjson::diagnostics::Diagnostic;
use polyjson::pipeline;
use polyjson::source::{Loaded, load_sources};
use polyjson::{CapabilitySpec, GenerateConfig, MarkerRule};

/// File name used when `--out` names a directory.
const DEFAULT_FILE_NAME: &str = "polyjson_gen.rs";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// discover the variants of trait-object capabilities and generate tagged JSON codecs for them
#[derive(Parser, Debug)]
#[command(name = "polyjson", version)]
pub struct CommandLineInterface {
    /// debug-level logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// resolve, classify and emit the Rust codec module
    Rust(RustOut),
    /// resolve and classify, then print the descriptors as JSON
    Describe(DescribeOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more inputs: Rust sources or `.json` source models. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// capability to resolve, as `Name[@discriminant][:Variant[=wire],...]`; repeatable
    #[arg(long = "capability", short = 'c', num_args = 1.., required = true)]
    capabilities: Vec<CapabilitySpec>,

    /// JSON field holding the variant's wire name
    #[arg(long, default_value = DEFAULT_DISCRIMINANT)]
    discriminant: String,

    /// which trait methods qualify as the marker operation
    #[arg(long, value_enum, default_value_t = MarkerRule::Signature)]
    marker_rule: MarkerRule,

    /// fail on capability fields whose container shape is not supported
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(clap::Parser, Debug)]
struct RustOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// crate path the generated code reaches the runtime through
    #[arg(long, default_value = DEFAULT_RUNTIME_CRATE)]
    runtime_crate: String,

    /// module the generated code imports the source types from
    #[arg(long, default_value = DEFAULT_SOURCE_MODULE)]
    source_module: String,

    /// output .rs file or directory (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct DescribeOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

/// Where a run failed; each stage has its own exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Config,
    Load,
    Analyze,
    Emit,
}

impl Stage {
    fn exit_code(self) -> i32 {
        match self {
            Stage::Config => 1,
            Stage::Load => 100,
            Stage::Analyze => 200,
            Stage::Emit => 300,
        }
    }
}

#[derive(Debug)]
struct Failure {
    stage: Stage,
    error: anyhow::Error,
}

trait AtStage<T> {
    fn at_stage(self, stage: Stage) -> Result<T, Failure>;
}

impl<T, E: Into<anyhow::Error>> AtStage<T> for Result<T, E> {
    fn at_stage(self, stage: Stage) -> Result<T, Failure> {
        self.map_err(|error| Failure { stage, error: error.into() })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn config(&self) -> GenerateConfig {
        GenerateConfig {
            capabilities: self.capabilities.clone(),
            discriminant: self.discriminant.clone(),
            marker_rule: self.marker_rule,
            strict: self.strict,
            ..GenerateConfig::default()
        }
    }

    fn load(&self) -> Result<Loaded, Failure> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")
            .at_stage(Stage::Load)?;
        tracing::debug!(inputs = source_paths.len(), "resolved input paths");
        let loaded = load_sources(&source_paths).at_stage(Stage::Load)?;
        report(&loaded.diagnostics);
        Ok(loaded)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Runs the command and returns the process exit code.
    pub fn run(&self) -> i32 {
        match self.execute() {
            Ok(()) => 0,
            Err(Failure { stage, error }) => {
                eprintln!("{} {error:#}", "error:".red().bold());
                stage.exit_code()
            }
        }
    }

    fn execute(&self) -> Result<(), Failure> {
        match &self.cmd {
            Command::Rust(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }

                let config = GenerateConfig {
                    runtime_crate: target.runtime_crate.clone(),
                    source_module: target.source_module.clone(),
                    ..target.input_settings.config()
                };
                config.validate().at_stage(Stage::Config)?;

                let loaded = target.input_settings.load()?;
                let generation = pipeline::generate(&loaded.model, &config).map_err(into_failure)?;
                report(&generation.analysis.diagnostics);

                write_output(target.out.as_deref(), &generation.code, DEFAULT_FILE_NAME).at_stage(Stage::Emit)
            }
            Command::Describe(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }

                let config = target.input_settings.config();
                config.validate().at_stage(Stage::Config)?;

                let loaded = target.input_settings.load()?;
                let mut analysis = pipeline::analyze(&loaded.model, &config).map_err(into_failure)?;
                report(&analysis.diagnostics);
                let mut diagnostics = loaded.diagnostics;
                diagnostics.append(&mut analysis.diagnostics);
                analysis.diagnostics = diagnostics;

                let json_src = serde_json::to_string_pretty(&analysis).at_stage(Stage::Emit)?;
                write_output(target.out.as_deref(), &json_src, "polyjson_descriptors.json").at_stage(Stage::Emit)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn into_failure(error: pipeline::Error) -> Failure {
    let stage = match &error {
        pipeline::Error::Config(_) => Stage::Config,
        pipeline::Error::Resolve(_) | pipeline::Error::Classify(_) => Stage::Analyze,
        pipeline::Error::Emit(_) => Stage::Emit,
    };
    Failure { stage, error: error.into() }
}

fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let head = format!("warning[{}]", diagnostic.code.code_str()).yellow().bold();
        match diagnostic.location() {
            Some(location) => eprintln!("{head}: {} {}", diagnostic.message, format!("(at {location})").dimmed()),
            None => eprintln!("{head}: {}", diagnostic.message),
        }
    }
}

/// Writes `contents` to `out` (a file, or `default_name` inside a directory),
/// or to stdout.
fn write_output(out: Option<&Path>, contents: &str, default_name: &str) -> anyhow::Result<()> {
    let Some(out) = out else {
        print!("{contents}");
        return Ok(());
    };
    let path = if out.is_dir() { out.join(default_name) } else { out.to_path_buf() };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = contents.len(), "wrote output");
    Ok(())
}

/// Expand CLI input patterns into concrete file paths.
/// - Supports literal paths and glob patterns (e.g., "data/**/*.rs").
/// - Preserves the order of patterns and their matches.
/// - Errors if a glob pattern matches nothing.
pub fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                anyhow::bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
