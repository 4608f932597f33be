use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use shipwright::config::Config;
use shipwright::tasks;
use shipwright::watch;
use shipwright::{shlog, DeployTarget, Error, Options, Registry, Result, RunContext, StepOutcome};

/// Shipwright - build and release pipeline runner for a WordPress plugin
#[derive(Parser, Debug)]
#[command(name = "shipwright")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    SHIPWRIGHT_DEBUG=1    Enable debug logging (alternative to --debug)"
)]
pub struct Cli {
    /// Enable debug logging (writes to ~/.shipwright/shipwright.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run a single named task
    Run {
        /// Task name (see `shipwright list`)
        task: String,
    },

    /// Run the full deploy pipeline
    Deploy {
        /// Deploy target: wporg, github or copy
        #[arg(long, default_value = "wporg")]
        target: String,

        /// Version to release (defaults to the version in the plugin header)
        #[arg(long)]
        version: Option<String>,

        /// Skip the interactive confirmation
        #[arg(long, short = 'y')]
        yes: bool,

        /// Assets were already built; leave the build step out
        #[arg(long)]
        skip_build: bool,

        /// Override the configured GitHub repository (OWNER/REPO)
        #[arg(long)]
        repo: Option<String>,

        /// Skip minification
        #[arg(long)]
        no_minify: bool,

        /// Log remote side effects without performing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Rewrite version strings across source files
    Bump {
        /// The new version, e.g. 1.5.0
        version: String,
    },

    /// Watch source paths and rebuild on change
    Watch,

    /// List registered tasks
    List,
}

fn main() {
    let cli = Cli::parse();
    shipwright::log::init_with_debug(cli.debug);

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut registry = Registry::new();
    tasks::register_all(&mut registry)?;

    if cli.command == Command::List {
        for name in registry.names() {
            println!("  {}", name);
        }
        return Ok(());
    }

    let root = std::env::current_dir()?;
    let config = Config::load(&root)?;
    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Command::Run { task } => {
            let ctx = Arc::new(RunContext::new(config, root, Options::default()));
            let outcome = rt.block_on(registry.run(&task, ctx))?;
            report_outcome(&task, outcome);
        }
        Command::Deploy {
            target,
            version,
            yes,
            skip_build,
            repo,
            no_minify,
            dry_run,
        } => {
            let target: DeployTarget = target.parse()?;
            let (owner, repo) = split_repo(repo)?;
            let opts = Options {
                target,
                version,
                minify: !no_minify,
                owner,
                repo,
                assume_yes: yes,
                dry_run,
                built: skip_build,
                ..Options::default()
            };
            let ctx = Arc::new(RunContext::new(config, root, opts));
            shlog!("deploy start ({})", ctx.run_id);

            let outcome = rt.block_on(registry.run("deploy", ctx.clone()))?;
            match outcome {
                StepOutcome::Continue => {
                    println!("Deploy complete ({}).", ctx.run_id.short());
                }
                StepOutcome::SkipRest => {}
            }
        }
        Command::Bump { version } => {
            let opts = Options {
                version: Some(version.clone()),
                ..Options::default()
            };
            let ctx = Arc::new(RunContext::new(config, root, opts));
            rt.block_on(registry.run("bump-versions", ctx))?;
            println!("Version strings set to {}.", version);
        }
        Command::Watch => {
            let ctx = Arc::new(RunContext::new(config, root, Options::default()));
            let cancel = CancellationToken::new();
            let signal_cancel = cancel.clone();
            rt.block_on(async {
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        signal_cancel.cancel();
                    }
                });
                watch::watch(&registry, ctx, cancel).await
            })?;
        }
        Command::List => unreachable!("handled above"),
    }

    Ok(())
}

fn report_outcome(task: &str, outcome: StepOutcome) {
    match outcome {
        StepOutcome::Continue => println!("Task '{}' complete.", task),
        StepOutcome::SkipRest => println!("Task '{}' ended early.", task),
    }
}

/// Split an OWNER/REPO override into its parts.
fn split_repo(repo: Option<String>) -> Result<(Option<String>, Option<String>)> {
    match repo {
        None => Ok((None, None)),
        Some(value) => match value.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => {
                Ok((Some(owner.to_string()), Some(repo.to_string())))
            }
            _ => Err(Error::Validation(format!(
                "Invalid repository '{}' (expected OWNER/REPO)",
                value
            ))),
        },
    }
}
