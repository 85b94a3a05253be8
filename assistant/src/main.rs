//! `assistant` command line front end.
//!
//! stdout carries only JSON (or the tool list); diagnostics go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use assistant::agents::planner::PlanGenerationError;
use assistant::exit_codes;
use assistant::io::config::{
    AssistantConfig, DEFAULT_CONFIG_PATH, load_effective_config, write_config,
};
use assistant::io::run_record::RunRecorder;
use assistant::logging;
use assistant::orchestrator::Assistant;
use assistant::tools::ToolRegistry;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "assistant",
    version,
    about = "Plan, execute and verify multi-step tasks with external tools"
)]
struct Cli {
    /// Config file (missing file means defaults).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline and print the final payload as JSON.
    Run {
        /// Natural language task.
        task: String,

        /// Write plan, execution and verification artifacts under this directory.
        #[arg(long)]
        record_dir: Option<PathBuf>,
    },
    /// Run only the planner and print the plan as JSON.
    Plan {
        /// Natural language task.
        task: String,
    },
    /// List registered tool names.
    Tools,
    /// Write the default config file.
    InitConfig {
        /// Destination path.
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    // A local `.env` only fills variables the process environment lacks.
    dotenvy::dotenv().ok();
    logging::init();
    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{err:#}");
            if err.downcast_ref::<PlanGenerationError>().is_some() {
                exit_codes::PLAN_FAILED
            } else {
                exit_codes::INVALID
            }
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run { task, record_dir } => {
            cmd_run(&cli.config, &task, record_dir.as_deref()).await
        }
        Command::Plan { task } => cmd_plan(&cli.config, &task).await,
        Command::Tools => cmd_tools(&cli.config),
        Command::InitConfig { path, force } => cmd_init_config(&path, force),
    }
}

async fn cmd_run(config_path: &Path, task: &str, record_dir: Option<&Path>) -> Result<()> {
    let task = require_task(task)?;
    let mut assistant = build_assistant(config_path)?;
    if let Some(dir) = record_dir {
        let recorder = RunRecorder::create(dir)?;
        info!(run_id = recorder.run_id(), dir = %recorder.paths().dir.display(), "recording run");
        assistant = assistant.with_observer(Arc::new(recorder));
    }
    let payload = assistant.run_task(task).await?;
    print_json(&payload)
}

async fn cmd_plan(config_path: &Path, task: &str) -> Result<()> {
    let task = require_task(task)?;
    let assistant = build_assistant(config_path)?;
    let plan = assistant.plan(task).await?;
    print_json(&plan)
}

fn cmd_tools(config_path: &Path) -> Result<()> {
    let config = load_effective_config(config_path)?;
    let registry = ToolRegistry::with_defaults(&config.tools)?;
    for name in registry.names() {
        println!("{name}");
    }
    Ok(())
}

fn cmd_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &AssistantConfig::default())?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn require_task(task: &str) -> Result<&str> {
    let task = task.trim();
    if task.is_empty() {
        bail!("task must not be empty");
    }
    Ok(task)
}

fn build_assistant(config_path: &Path) -> Result<Assistant> {
    let config = load_effective_config(config_path)?;
    Assistant::from_config(&config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("serialize output json")?;
    println!("{rendered}");
    Ok(())
}
