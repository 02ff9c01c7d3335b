use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod logging;
mod orchestrate;
mod patch;
mod python;
mod role;
mod topology;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "trainlaunch")]
#[command(about = "Launcher for scheduler/server/worker distributed training jobs", long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the roles of this rank and wait for all of them.
    Launch {
        rank: u32,

        num_servers: u32,

        num_workers: u32,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the per-role environments as JSON instead of launching.
        #[arg(long)]
        dry_run: bool,
    },

    /// Insert a block of lines after a marker line of a file.
    Patch {
        #[arg(long)]
        target: PathBuf,

        #[arg(long)]
        start_marker: String,

        #[arg(long)]
        end_marker: String,

        #[arg(long, default_value_t = 0)]
        indent_level: usize,

        /// `tab`, `spaces` or `spaces:N`.
        #[arg(long, default_value = "spaces:4")]
        indent_unit: patch::IndentUnit,

        /// Lines to insert; the built-in trace snippet if omitted.
        #[arg(long)]
        content_file: Option<PathBuf>,

        #[arg(long)]
        skip_if_applied: bool,
    },

    /// Run one role (started by `launch`; the role comes from DMLC_ROLE).
    Role {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        python: Option<PathBuf>,

        /// Extra arguments for the training entry point.
        #[arg(last = true)]
        args: Vec<String>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match cli.cmd {
        Commands::Launch {
            rank,
            num_servers,
            num_workers,
            config: config_path,
            dry_run,
        } => {
            let cfg = config::LaunchConfig::load(config_path.as_deref())?;
            let topo = topology::TopologyConfig::new(rank, num_servers, num_workers, &cfg)?;

            if dry_run {
                println!("{}", serde_json::to_string_pretty(&topo.role_envs())?);
                return Ok(ExitCode::SUCCESS);
            }

            let mut role_args = vec!["--log-level".to_string(), cli.log_level.clone()];
            if let Some(path) = &config_path {
                role_args.push("--config".to_string());
                role_args.push(path.display().to_string());
            }
            let command = orchestrate::RoleCommand::from_config(&cfg.launcher, role_args)?;
            let report = orchestrate::launch(&topo, &command)?;
            tracing::info!(
                roles = ?report.launched_roles(),
                states = ?report.states,
                success = report.success(),
                "all role processes exited"
            );

            if report.success() {
                return Ok(ExitCode::SUCCESS);
            }
            for exit in report.exits.iter().filter(|e| !e.success()) {
                eprintln!("{} (pid {}): {}", exit.role, exit.pid, exit.outcome);
            }
            let failed: Vec<&str> = report.failed_roles().iter().map(|r| r.as_str()).collect();
            eprintln!("role processes failed: {}", failed.join(", "));
            Ok(ExitCode::FAILURE)
        }

        Commands::Patch {
            target,
            start_marker,
            end_marker,
            indent_level,
            indent_unit,
            content_file,
            skip_if_applied,
        } => {
            let spec = patch::PatchSpec {
                target,
                start_marker,
                end_marker,
                indent_level,
                indent_unit,
                content: role::load_content(content_file.as_deref())?,
            };
            let outcome = patch::apply(&spec, skip_if_applied)?;
            println!("{}", patch_summary(&outcome));
            Ok(ExitCode::SUCCESS)
        }

        Commands::Role {
            config: config_path,
            python,
            args,
        } => {
            let cfg = config::LaunchConfig::load(config_path.as_deref())?;
            let code = role::run_role(&cfg, python, &args, |k| std::env::var(k).ok())?;
            Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
        }
    }
}

fn patch_summary(outcome: &patch::PatchOutcome) -> String {
    if outcome.skipped {
        return format!("Already patched {}", outcome.target.display());
    }
    match outcome.marker_line {
        Some(line) => format!(
            "Patched {} after line {} ({} lines inserted)",
            outcome.target.display(),
            line,
            outcome.inserted
        ),
        None => format!(
            "Patched {} ({} lines inserted)",
            outcome.target.display(),
            outcome.inserted
        ),
    }
}
