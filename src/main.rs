use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use log::{error, info};

mod config;
mod core;

use crate::config::DispatcherConfig;
use crate::core::{DispatchError, Dispatcher, RunPlan, TmuxLauncher};

#[derive(Parser)]
#[command(version, about = "Launch staggered benchmark runs in detached tmux sessions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open one session per run and start the benchmark in it
    Launch {
        #[command(flatten)]
        common: CommonArgs,

        /// Benchmark script path
        #[arg(long)]
        script: Option<String>,

        /// Python interpreter
        #[arg(long)]
        python: Option<String>,

        /// Terminal multiplexer binary
        #[arg(long)]
        multiplexer: Option<String>,

        /// Let sessions close when the benchmark exits
        #[arg(long)]
        no_hold: bool,

        /// Print the commands without opening any session
        #[arg(long)]
        dry_run: bool,

        /// Print the dispatch report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the run plan as JSON
    Plan {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Show which planned sessions are still open
    Status {
        #[command(flatten)]
        common: CommonArgs,

        /// Terminal multiplexer binary
        #[arg(long)]
        multiplexer: Option<String>,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Dataset passed to every run
    #[arg(short, long)]
    dataset: Option<String>,

    /// JSON plan file replacing the built-in seven-run plan
    #[arg(long)]
    plan: Option<PathBuf>,

    /// JSON dispatcher config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl CommonArgs {
    fn load_config(&self) -> Result<DispatcherConfig, DispatchError> {
        let mut config = match &self.config {
            Some(path) => DispatcherConfig::from_json_file(path)?,
            None => DispatcherConfig::default(),
        };
        if let Some(dataset) = &self.dataset {
            config.dataset = dataset.clone();
        }
        if let Some(plan) = &self.plan {
            config.plan_file = Some(plan.display().to_string());
        }
        Ok(config)
    }
}

fn load_plan(config: &DispatcherConfig, dataset_override: bool) -> Result<RunPlan, DispatchError> {
    match &config.plan_file {
        Some(path) => {
            let mut plan = RunPlan::from_json_file(Path::new(path))?;
            if dataset_override {
                plan.dataset = config.dataset.clone();
            }
            Ok(plan)
        }
        None => Ok(RunPlan::standard(&config.dataset)),
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether every requested session was started
async fn run(cli: Cli) -> Result<bool, DispatchError> {
    match cli.command {
        Command::Launch {
            common,
            script,
            python,
            multiplexer,
            no_hold,
            dry_run,
            json,
        } => {
            let mut config = common.load_config()?;
            if let Some(script) = script {
                config.script = script;
            }
            if let Some(python) = python {
                config.python = python;
            }
            if let Some(multiplexer) = multiplexer {
                config.multiplexer = multiplexer;
            }
            if no_hold {
                config.hold_open = false;
            }
            let plan = load_plan(&config, common.dataset.is_some())?;

            let launcher = Arc::new(TmuxLauncher::new(&config.multiplexer));
            let dispatcher = Dispatcher::new(launcher, config);

            if dry_run {
                info!("Dry run: no sessions will be opened");
                for request in dispatcher.preview(&plan)? {
                    println!("{}\t{}", request.session_name, request.shell_line);
                }
                return Ok(true);
            }

            let report = dispatcher.dispatch(&plan).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for outcome in &report.outcomes {
                    match &outcome.error {
                        None => println!(
                            "{:<8} GPU {}  +{}s  started",
                            outcome.session, outcome.device_id, outcome.start_delay_secs
                        ),
                        Some(e) => println!(
                            "{:<8} GPU {}  +{}s  FAILED: {}",
                            outcome.session, outcome.device_id, outcome.start_delay_secs, e
                        ),
                    }
                }
                println!();
                println!("Attach with: {} attach -t <session>", dispatcher.config().multiplexer);
            }
            Ok(report.all_launched())
        }
        Command::Plan { common } => {
            let config = common.load_config()?;
            let plan = load_plan(&config, common.dataset.is_some())?;
            plan.validate()?;
            println!("{}", plan.to_json_pretty()?);
            Ok(true)
        }
        Command::Status { common, multiplexer } => {
            let mut config = common.load_config()?;
            if let Some(multiplexer) = multiplexer {
                config.multiplexer = multiplexer;
            }
            let plan = load_plan(&config, common.dataset.is_some())?;

            let launcher = Arc::new(TmuxLauncher::new(&config.multiplexer));
            let dispatcher = Dispatcher::new(launcher, config);
            for status in dispatcher.status(&plan).await? {
                let state = if status.running { "running" } else { "closed" };
                println!("{:<8} {}", status.session, state);
            }
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_launch_flags() {
        let cli = Cli::try_parse_from([
            "bench_dispatch", "launch", "--dataset", "bike", "--python", "python3", "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Command::Launch { common, python, dry_run, no_hold, .. } => {
                assert_eq!(common.dataset.as_deref(), Some("bike"));
                assert_eq!(python.as_deref(), Some("python3"));
                assert!(dry_run);
                assert!(!no_hold);
            }
            _ => panic!("expected launch"),
        }
    }

    // Without a plan file the dataset flag selects the standard plan's dataset
    #[test]
    fn test_load_plan_defaults_to_standard() {
        let config = DispatcherConfig {
            dataset: "bike".to_string(),
            ..Default::default()
        };
        let plan = load_plan(&config, true).unwrap();
        assert_eq!(plan, RunPlan::standard("bike"));
    }

    #[test]
    fn test_dataset_flag_overrides_plan_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        let plan = RunPlan::standard("from_file");
        file.write_all(plan.to_json_pretty().unwrap().as_bytes()).unwrap();

        let mut config = DispatcherConfig {
            dataset: "from_flag".to_string(),
            plan_file: Some(file.path().display().to_string()),
            ..Default::default()
        };
        assert_eq!(load_plan(&config, false).unwrap().dataset, "from_file");
        assert_eq!(load_plan(&config, true).unwrap().dataset, "from_flag");

        config.plan_file = None;
        assert_eq!(load_plan(&config, false).unwrap().dataset, "from_flag");
    }
}
