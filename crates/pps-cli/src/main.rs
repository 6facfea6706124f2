use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use pps_io::{
    export_artifacts, load_config, load_envelope, load_result, load_state, save_state,
    validate_envelope, validate_result,
};
use pps_merge::{IterationSummary, MergeConfig, MergeEngine};
use pps_pipeline::{
    Generator, ModelConfig, ModelGenerator, Pipeline, StubGenerator, TemplateStore,
};
use pps_schema::{Envelope, EnvelopeMeta, STANDARD_STEP_IDS};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the model API key
const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let matches = cli().get_matches();

    match run(&matches).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// `PPS_LOG`, then `RUST_LOG`, then `warn`; always to stderr
fn init_tracing() {
    let filter = EnvFilter::try_from_env("PPS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn path_arg(name: &'static str) -> Arg {
    Arg::new(name).required(true).value_parser(value_parser!(PathBuf))
}

fn cli() -> Command {
    Command::new("pps")
        .version(env!("CARGO_PKG_VERSION"))
        .about("PPS v1.2 pipeline tools: validate documents, merge results, export state")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Merge configuration (TOML); defaults when omitted"),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate a single document")
                .subcommand_required(true)
                .subcommand(
                    Command::new("envelope")
                        .about("Validate a PPS v1.2 envelope (YAML)")
                        .arg(path_arg("path")),
                )
                .subcommand(
                    Command::new("result")
                        .about("Validate a prompt result v1.2 (YAML)")
                        .arg(path_arg("path")),
                ),
        )
        .subcommand(
            Command::new("merge")
                .about("Merge a result into pipeline state")
                .arg(path_arg("envelope"))
                .arg(path_arg("result"))
                .arg(
                    Arg::new("state-in")
                        .long("state-in")
                        .value_parser(value_parser!(PathBuf))
                        .help("Load applied_index from a state file for dedupe"),
                )
                .arg(
                    Arg::new("state-out")
                        .long("state-out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write merged state to a file"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the iteration summary as JSON"),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Export state as markdown logs plus state.json")
                .arg(path_arg("state"))
                .arg(
                    Arg::new("out")
                        .long("out")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Output directory"),
                ),
        )
        .subcommand(
            Command::new("demo")
                .about("Run the stub pipeline over the standard steps")
                .arg(
                    Arg::new("envelope")
                        .long("envelope")
                        .value_parser(value_parser!(PathBuf))
                        .help("Base envelope (YAML); a built-in one when omitted"),
                )
                .arg(
                    Arg::new("templates")
                        .long("templates")
                        .value_parser(value_parser!(PathBuf))
                        .help("Prompt template directory (<dir>/<prompt_id>.txt)"),
                )
                .arg(state_out_arg()),
        )
        .subcommand(
            Command::new("run")
                .about("Run the standard steps against a hosted model")
                .arg(
                    Arg::new("envelope")
                        .long("envelope")
                        .value_parser(value_parser!(PathBuf))
                        .help("Base envelope (YAML); a built-in one when omitted"),
                )
                .arg(
                    Arg::new("templates")
                        .long("templates")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Prompt template directory (<dir>/<prompt_id>.txt)"),
                )
                .arg(
                    Arg::new("model")
                        .long("model")
                        .default_value(pps_pipeline::DEFAULT_MODEL)
                        .help("Model name"),
                )
                .arg(
                    Arg::new("max-tokens")
                        .long("max-tokens")
                        .default_value("8000")
                        .value_parser(value_parser!(u32))
                        .help("Response token cap"),
                )
                .arg(
                    Arg::new("temperature")
                        .long("temperature")
                        .default_value("0.7")
                        .value_parser(value_parser!(f32))
                        .help("Sampling temperature"),
                )
                .arg(state_out_arg()),
        )
}

fn state_out_arg() -> Arg {
    Arg::new("state-out")
        .long("state-out")
        .value_parser(value_parser!(PathBuf))
        .help("Write final state to a file")
}

async fn run(matches: &ArgMatches) -> Result<bool> {
    let config = load_config(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;

    match matches.subcommand() {
        Some(("validate", args)) => match args.subcommand() {
            Some(("envelope", args)) => validate_envelope_cmd(required(args, "path")?, &config),
            Some(("result", args)) => validate_result_cmd(required(args, "path")?),
            _ => anyhow::bail!("validate needs `envelope` or `result`"),
        },
        Some(("merge", args)) => merge_cmd(
            required(args, "envelope")?,
            required(args, "result")?,
            &MergeOptions {
                state_in: optional(args, "state-in"),
                state_out: optional(args, "state-out"),
                json: args.get_flag("json"),
            },
            config,
        ),
        Some(("export", args)) => export_cmd(required(args, "state")?, required(args, "out")?),
        Some(("demo", args)) => {
            let generator = StubGenerator::new(config.gates.clone());
            let options = PipelineOptions::from_args(args, "stub results");
            pipeline_cmd(Arc::new(generator), &options, config).await
        }
        Some(("run", args)) => {
            let api_key = std::env::var(API_KEY_ENV)
                .with_context(|| format!("{API_KEY_ENV} must be set for `run`"))?;
            let mut model = ModelConfig::new(api_key);
            if let Some(name) = args.get_one::<String>("model") {
                model = model.with_model(name.as_str());
            }
            if let Some(max_tokens) = args.get_one::<u32>("max-tokens") {
                model = model.with_max_tokens(*max_tokens);
            }
            if let Some(temperature) = args.get_one::<f32>("temperature") {
                model = model.with_temperature(*temperature);
            }
            let options = PipelineOptions::from_args(args, "model results");
            pipeline_cmd(Arc::new(ModelGenerator::new(model)), &options, config).await
        }
        _ => anyhow::bail!("no command given, see --help"),
    }
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    optional(args, name).with_context(|| format!("missing <{name}>"))
}

fn optional<'a>(args: &'a ArgMatches, name: &str) -> Option<&'a Path> {
    args.get_one::<PathBuf>(name).map(PathBuf::as_path)
}

fn validate_envelope_cmd(path: &Path, config: &MergeConfig) -> Result<bool> {
    let envelope = load_envelope(path)?;
    let report = validate_envelope(&envelope, &config.gates);
    if !report.is_ok() {
        eprintln!("Validation failed:");
        eprint!("{report}");
        return Ok(false);
    }
    println!("OK");
    println!("  pps_version: {}", envelope.pps_version);
    println!("  meta.prompt_id: {}", envelope.meta.prompt_id);
    println!("  meta.run_id: {}", envelope.meta.run_id);
    Ok(true)
}

fn validate_result_cmd(path: &Path) -> Result<bool> {
    let result = load_result(path)?;
    let report = validate_result(&result);
    if !report.is_ok() {
        eprintln!("Validation failed:");
        eprint!("{report}");
        return Ok(false);
    }
    println!("OK");
    if let Some(meta) = &result.meta {
        println!("  meta.prompt_id: {}", meta.prompt_id);
        println!("  meta.run_id: {}", meta.run_id);
    }
    if let Some(gate) = &result.gate_result {
        println!("  gate_result.status: {}", gate.status);
    }
    Ok(true)
}

struct MergeOptions<'a> {
    state_in: Option<&'a Path>,
    state_out: Option<&'a Path>,
    json: bool,
}

fn merge_cmd(
    envelope_path: &Path,
    result_path: &Path,
    options: &MergeOptions<'_>,
    config: MergeConfig,
) -> Result<bool> {
    let envelope = load_envelope(envelope_path)?;
    let report = validate_envelope(&envelope, &config.gates);
    if !report.is_ok() {
        eprintln!("Envelope validation failed:");
        eprint!("{report}");
        return Ok(false);
    }

    let result = load_result(result_path)?;
    let report = validate_result(&result);
    if !report.is_ok() {
        eprintln!("Result validation failed:");
        eprint!("{report}");
        return Ok(false);
    }

    let applied = match options.state_in {
        Some(path) => load_state(path)?.applied_index,
        None => Vec::new(),
    };

    let outcome = MergeEngine::new(config).merge(&envelope, &result, &applied);
    if !outcome.is_ok() {
        eprintln!("Merge failed:");
        for error in outcome.error_messages() {
            eprintln!("  - {error}");
        }
        return Ok(false);
    }
    for warning in outcome.warning_messages() {
        eprintln!("WARN: {warning}");
    }

    if let (Some(path), Some(state)) = (options.state_out, &outcome.state) {
        save_state(path, state)?;
        println!("State written to {}", path.display());
    }

    if let Some(summary) = &outcome.summary {
        if options.json {
            println!("{}", serde_json::to_string_pretty(summary)?);
        } else {
            print_summary(summary);
        }
    }
    info!(
        entry = %result.applied_entry(),
        warnings = outcome.warnings.len(),
        "merge command done"
    );
    println!("Merge OK.");
    Ok(true)
}

fn export_cmd(state_path: &Path, out: &Path) -> Result<bool> {
    let state = load_state(state_path)?;
    let report = export_artifacts(&state, out)?;
    for path in &report.written {
        println!("Wrote {}", path.display());
    }
    for note in &report.notes {
        println!("{note}");
    }
    info!(written = report.written.len(), out = %out.display(), "export command done");
    Ok(true)
}

struct PipelineOptions<'a> {
    label: &'static str,
    envelope: Option<&'a Path>,
    templates: Option<&'a Path>,
    state_out: Option<&'a Path>,
}

impl<'a> PipelineOptions<'a> {
    fn from_args(args: &'a ArgMatches, label: &'static str) -> Self {
        Self {
            label,
            envelope: optional(args, "envelope"),
            templates: optional(args, "templates"),
            state_out: optional(args, "state-out"),
        }
    }
}

async fn pipeline_cmd(
    generator: Arc<dyn Generator>,
    options: &PipelineOptions<'_>,
    config: MergeConfig,
) -> Result<bool> {
    let base = match options.envelope {
        Some(path) => load_envelope(path)?,
        None => demo_envelope(),
    };

    let mut pipeline = Pipeline::new(MergeEngine::new(config), generator);
    if let Some(dir) = options.templates {
        pipeline = pipeline.with_templates(TemplateStore::Directory(dir.to_path_buf()));
    }

    println!("PPS pipeline: {} over {} steps\n", options.label, pipeline.steps().len());
    let report = pipeline.run(&base).await;
    let total = pipeline.steps().len();
    for (index, step) in report.steps.iter().enumerate() {
        println!("[{}/{total}] {} merged ({})", index + 1, step.prompt_id, step.run_id);
        for warning in &step.warnings {
            eprintln!("WARN: {warning}");
        }
    }

    if let Some(path) = options.state_out {
        save_state(path, &report.state)?;
        println!("\nState written to {}", path.display());
    }

    if let Some(failure) = &report.failure {
        eprintln!("Pipeline stopped: {failure}");
        return Ok(false);
    }
    if let Some(summary) = report.steps.last().and_then(|s| s.summary.as_ref()) {
        print_summary(summary);
    }
    println!("  applied_index: {} entries", report.state.applied_index.len());
    info!(
        steps = report.steps.len(),
        applied = report.state.applied_index.len(),
        "pipeline command done"
    );
    println!("\nDone.");
    Ok(true)
}

fn demo_envelope() -> Envelope {
    let first = STANDARD_STEP_IDS[0];
    let mut envelope = Envelope::new(EnvelopeMeta::new(first, "RUN-DEMO"));
    envelope.project.name = "Demo".to_string();
    envelope.project.brief = "Shared task lists for small teams".to_string();
    envelope.constraints.team_size = "2".to_string();
    envelope.constraints.timeline = "8 weeks".to_string();
    envelope
}

fn or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

fn print_summary(summary: &IterationSummary) {
    println!("\nIteration summary:");
    let label = if summary.active_freeze_label.is_empty() {
        "(none)"
    } else {
        summary.active_freeze_label.as_str()
    };
    println!("  active_freeze_label: {label}");
    println!("  gates_passed: {}", or_none(&summary.gates_passed));
    println!("  gates_failed: {}", or_none(&summary.gates_failed));
    if !summary.next_actions.is_empty() {
        println!("  next_actions:");
        for action in &summary.next_actions {
            println!("    - {action}");
        }
    }
}
