//! # flowboard
//!
//! Command-line runner for the flowboard dataflow orchestrator.

mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use flowboard_checkpoint::{
    CheckpointSaver, MemoryCheckpointSaver, ReconcileMode as StoredReconcileMode, SqliteCheckpointSaver,
};
use flowboard_core::orchestrator::{CheckpointCadence, Orchestrator, OrchestratorConfig};
use flowboard_core::{repository, ConceptRepo, InferenceRepo};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "flowboard")]
#[command(about = "Run and inspect flowboard dataflow orchestration repositories", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (repeatable: -v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format
    #[arg(long, global = true, env = "FLOWBOARD_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Patch,
    Overwrite,
    FillGaps,
}

impl From<ModeArg> for StoredReconcileMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Patch => StoredReconcileMode::Patch,
            ModeArg::Overwrite => StoredReconcileMode::Overwrite,
            ModeArg::FillGaps => StoredReconcileMode::FillGaps,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a repository from scratch
    Run {
        #[arg(long)]
        concepts: PathBuf,
        #[arg(long)]
        inferences: PathBuf,
        #[arg(long)]
        inputs: Option<PathBuf>,
        /// Name of an external collaborator backend; accepted for forward compatibility, the
        /// built-in binary only ships an echoing stand-in (body integrations are out of scope)
        #[arg(long)]
        llm: Option<String>,
        #[arg(long)]
        base_dir: Option<PathBuf>,
        #[arg(long, env = "FLOWBOARD_MAX_CYCLES")]
        max_cycles: Option<u64>,
        #[arg(long, env = "FLOWBOARD_DB_PATH")]
        db_path: Option<PathBuf>,
    },
    /// Resume a run from its latest checkpoint
    Resume {
        #[arg(long)]
        concepts: PathBuf,
        #[arg(long)]
        inferences: PathBuf,
        #[arg(long)]
        inputs: Option<PathBuf>,
        #[arg(long)]
        run_id: String,
        #[arg(long, value_enum, default_value = "patch")]
        mode: ModeArg,
        #[arg(long, env = "FLOWBOARD_MAX_CYCLES")]
        max_cycles: Option<u64>,
        #[arg(long, env = "FLOWBOARD_DB_PATH")]
        db_path: Option<PathBuf>,
    },
    /// Fork a run from a checkpoint into a new run id
    Fork {
        #[arg(long)]
        concepts: PathBuf,
        #[arg(long)]
        inferences: PathBuf,
        #[arg(long)]
        inputs: Option<PathBuf>,
        #[arg(long)]
        from_run: String,
        #[arg(long)]
        new_run_id: Option<String>,
        #[arg(long, value_enum, default_value = "overwrite")]
        mode: ModeArg,
        #[arg(long, env = "FLOWBOARD_MAX_CYCLES")]
        max_cycles: Option<u64>,
        #[arg(long, env = "FLOWBOARD_DB_PATH")]
        db_path: Option<PathBuf>,
    },
    /// List runs known to the checkpoint store
    ListRuns {
        #[arg(long, env = "FLOWBOARD_DB_PATH")]
        db_path: Option<PathBuf>,
    },
    /// List checkpoints for a run (or every run, if omitted)
    ListCheckpoints {
        #[arg(long)]
        run_id: Option<String>,
        #[arg(long, env = "FLOWBOARD_DB_PATH")]
        db_path: Option<PathBuf>,
    },
    /// Export a single checkpoint as JSON
    Export {
        #[arg(long)]
        run_id: String,
        #[arg(long)]
        cycle: Option<u64>,
        #[arg(long)]
        inference_count: Option<u64>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, env = "FLOWBOARD_DB_PATH")]
        db_path: Option<PathBuf>,
    },
    /// Start the HTTP/SSE server, immediately launching the given repository as a live run
    Serve {
        #[arg(long)]
        concepts: PathBuf,
        #[arg(long)]
        inferences: PathBuf,
        #[arg(long)]
        inputs: Option<PathBuf>,
        #[arg(long, default_value = "127.0.0.1:8080", env = "FLOWBOARD_BIND")]
        bind: std::net::SocketAddr,
        #[arg(long, env = "FLOWBOARD_MAX_CYCLES")]
        max_cycles: Option<u64>,
        #[arg(long, env = "FLOWBOARD_DB_PATH")]
        db_path: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8, log_format: &str) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn open_saver(db_path: Option<PathBuf>) -> Result<Arc<dyn CheckpointSaver>> {
    match db_path {
        Some(path) => {
            let saver = SqliteCheckpointSaver::connect(&path.display().to_string())
                .await
                .with_context(|| format!("opening checkpoint database at {}", path.display()))?;
            Ok(Arc::new(saver))
        }
        None => Ok(Arc::new(MemoryCheckpointSaver::new())),
    }
}

fn load_repo(concepts_path: &PathBuf, inferences_path: &PathBuf, inputs_path: &Option<PathBuf>) -> Result<(ConceptRepo, InferenceRepo)> {
    let concept_records = repository::load_concepts(concepts_path)?;
    let mut concepts = ConceptRepo::from_records(concept_records)?;
    if let Some(inputs_path) = inputs_path {
        repository::apply_inputs(&mut concepts, inputs_path)?;
    }
    let inference_records = repository::load_inferences(inferences_path)?;
    let inferences = InferenceRepo::from_records(inference_records, &concepts)?;
    Ok((concepts, inferences))
}

async fn run_command(
    concepts: PathBuf,
    inferences: PathBuf,
    inputs: Option<PathBuf>,
    max_cycles: Option<u64>,
    db_path: Option<PathBuf>,
    file_defaults: &config::FileDefaults,
) -> Result<()> {
    let (concepts, inferences) = load_repo(&concepts, &inferences, &inputs)?;
    let saver = open_saver(config::merge_db_path(db_path, file_defaults)).await?;

    let run_config = OrchestratorConfig {
        max_cycles: config::merge_max_cycles(max_cycles, file_defaults),
        checkpoint_cadence: CheckpointCadence::CycleBoundary,
        ..OrchestratorConfig::default()
    };
    let run_id = run_config.run_id.clone();
    let orchestrator = Orchestrator::with_body(concepts, inferences, run_config, Arc::new(flowboard_core::EchoBody))
        .with_saver(saver);

    let report = orchestrator.run().await?;
    println!("run {run_id} finished after {} cycle(s), deadlocked={}", report.cycles_run, report.deadlocked);
    for (name, value) in &report.final_concepts {
        println!("  {name} = {}", value.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "<empty>".to_string()));
    }
    if report.deadlocked {
        bail!("run deadlocked before completing");
    }
    Ok(())
}

async fn resume_command(
    concepts: PathBuf,
    inferences: PathBuf,
    inputs: Option<PathBuf>,
    run_id: String,
    mode: ModeArg,
    max_cycles: Option<u64>,
    db_path: Option<PathBuf>,
    file_defaults: &config::FileDefaults,
) -> Result<()> {
    let (concepts, inferences) = load_repo(&concepts, &inferences, &inputs)?;
    let saver = open_saver(config::merge_db_path(db_path, file_defaults)).await?;
    let checkpoint = saver
        .latest(&run_id)
        .await?
        .with_context(|| format!("no checkpoint found for run {run_id}"))?;

    let run_config = OrchestratorConfig {
        max_cycles: config::merge_max_cycles(max_cycles, file_defaults),
        run_id: run_id.clone(),
        checkpoint_cadence: CheckpointCadence::CycleBoundary,
    };
    let mut orchestrator = Orchestrator::with_body(concepts, inferences, run_config, Arc::new(flowboard_core::EchoBody))
        .with_saver(saver);
    let (tracker, workspace) =
        {
            let (concepts, blackboard) = orchestrator.concepts_and_blackboard_mut();
            flowboard_core::reconcile::apply(&checkpoint, mode.into(), concepts, blackboard)
        };
    orchestrator.restore_tracker_and_workspace(tracker, workspace);

    let report = orchestrator.run().await?;
    println!("resumed run {run_id} finished after {} cycle(s), deadlocked={}", report.cycles_run, report.deadlocked);
    Ok(())
}

async fn fork_command(
    concepts: PathBuf,
    inferences: PathBuf,
    inputs: Option<PathBuf>,
    from_run: String,
    new_run_id: Option<String>,
    mode: ModeArg,
    max_cycles: Option<u64>,
    db_path: Option<PathBuf>,
    file_defaults: &config::FileDefaults,
) -> Result<()> {
    let (concepts, inferences) = load_repo(&concepts, &inferences, &inputs)?;
    let saver = open_saver(config::merge_db_path(db_path, file_defaults)).await?;
    let checkpoint = saver
        .latest(&from_run)
        .await?
        .with_context(|| format!("no checkpoint found for run {from_run}"))?;

    let new_run_id = new_run_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let run_config = OrchestratorConfig {
        max_cycles: config::merge_max_cycles(max_cycles, file_defaults),
        run_id: new_run_id.clone(),
        checkpoint_cadence: CheckpointCadence::CycleBoundary,
    };
    let mut orchestrator = Orchestrator::with_body(concepts, inferences, run_config, Arc::new(flowboard_core::EchoBody))
        .with_saver(saver);
    let (tracker, workspace) =
        {
            let (concepts, blackboard) = orchestrator.concepts_and_blackboard_mut();
            flowboard_core::reconcile::apply(&checkpoint, mode.into(), concepts, blackboard)
        };
    orchestrator.restore_tracker_and_workspace(tracker, workspace);

    let report = orchestrator.run().await?;
    println!("forked run {new_run_id} (from {from_run}) finished after {} cycle(s)", report.cycles_run);
    Ok(())
}

async fn list_runs_command(db_path: Option<PathBuf>, file_defaults: &config::FileDefaults) -> Result<()> {
    let saver = open_saver(config::merge_db_path(db_path, file_defaults)).await?;
    let runs = saver.list_runs().await?;
    if runs.is_empty() {
        println!("no runs recorded");
        return Ok(());
    }
    for run in runs {
        println!(
            "{}  first={}  last={}  executions={}  max_cycle={}",
            run.run_id, run.first_at, run.last_at, run.execution_count, run.max_cycle
        );
    }
    Ok(())
}

async fn list_checkpoints_command(run_id: Option<String>, db_path: Option<PathBuf>, file_defaults: &config::FileDefaults) -> Result<()> {
    let saver = open_saver(config::merge_db_path(db_path, file_defaults)).await?;
    let run_ids = match run_id {
        Some(id) => vec![id],
        None => saver.list_runs().await?.into_iter().map(|r| r.run_id).collect(),
    };
    for run_id in run_ids {
        let checkpoints = saver.list_checkpoints(&run_id).await?;
        println!("{run_id}: {} checkpoint(s)", checkpoints.len());
        for checkpoint in checkpoints {
            println!("  cycle={} inference_count={} at={}", checkpoint.cycle, checkpoint.inference_count, checkpoint.at);
        }
    }
    Ok(())
}

async fn export_command(
    run_id: String,
    cycle: Option<u64>,
    inference_count: Option<u64>,
    output: Option<PathBuf>,
    db_path: Option<PathBuf>,
    file_defaults: &config::FileDefaults,
) -> Result<()> {
    let saver = open_saver(config::merge_db_path(db_path, file_defaults)).await?;
    let checkpoint = match (cycle, inference_count) {
        (Some(cycle), Some(inference_count)) => saver.get(&run_id, cycle, inference_count).await?,
        _ => saver.latest(&run_id).await?,
    }
    .with_context(|| format!("no checkpoint found for run {run_id}"))?;

    let json = serde_json::to_string_pretty(&checkpoint)?;
    match output {
        Some(path) => std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

async fn serve_command(
    concepts: PathBuf,
    inferences: PathBuf,
    inputs: Option<PathBuf>,
    bind: std::net::SocketAddr,
    max_cycles: Option<u64>,
    db_path: Option<PathBuf>,
    file_defaults: &config::FileDefaults,
) -> Result<()> {
    let (concepts, inferences) = load_repo(&concepts, &inferences, &inputs)?;
    let saver = open_saver(config::merge_db_path(db_path, file_defaults)).await?;

    let run_config = OrchestratorConfig {
        max_cycles: config::merge_max_cycles(max_cycles, file_defaults),
        checkpoint_cadence: CheckpointCadence::CycleBoundary,
        ..OrchestratorConfig::default()
    };
    let run_id = run_config.run_id.clone();
    let registry = flowboard_server::new_registry(saver.clone());
    let orchestrator = Orchestrator::with_body(concepts, inferences, run_config, Arc::new(flowboard_core::EchoBody))
        .with_saver(saver);
    flowboard_server::launch_run(&registry, run_id.clone(), orchestrator);
    println!("serving run {run_id} on http://{bind}");

    flowboard_server::serve(bind, registry).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let file_defaults = match config::load_file_defaults() {
        Ok(defaults) => defaults,
        Err(error) => {
            eprintln!("error: failed to read flowboard.toml: {error:#}");
            return ExitCode::from(2);
        }
    };
    let log_format = config::merge_log_format(cli.log_format, &file_defaults);
    init_logging(cli.verbose, &log_format);

    let result = match cli.command {
        Commands::Run { concepts, inferences, inputs, llm: _, base_dir: _, max_cycles, db_path } => {
            run_command(concepts, inferences, inputs, max_cycles, db_path, &file_defaults).await
        }
        Commands::Resume { concepts, inferences, inputs, run_id, mode, max_cycles, db_path } => {
            resume_command(concepts, inferences, inputs, run_id, mode, max_cycles, db_path, &file_defaults).await
        }
        Commands::Fork { concepts, inferences, inputs, from_run, new_run_id, mode, max_cycles, db_path } => {
            fork_command(concepts, inferences, inputs, from_run, new_run_id, mode, max_cycles, db_path, &file_defaults).await
        }
        Commands::ListRuns { db_path } => list_runs_command(db_path, &file_defaults).await,
        Commands::ListCheckpoints { run_id, db_path } => list_checkpoints_command(run_id, db_path, &file_defaults).await,
        Commands::Export { run_id, cycle, inference_count, output, db_path } => {
            export_command(run_id, cycle, inference_count, output, db_path, &file_defaults).await
        }
        Commands::Serve { concepts, inferences, inputs, bind, max_cycles, db_path } => {
            serve_command(concepts, inferences, inputs, bind, max_cycles, db_path, &file_defaults).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
