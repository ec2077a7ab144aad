//! pclc CLI - compiler for PCL (Python-C linked) documents.

mod build;
mod builder;
mod clean;
mod colors;
mod diagnostics;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pclc_core::AbortHandle;

use builder::BuildArgs;

#[derive(Parser)]
#[command(name = "pclc")]
#[command(about = "Build and run documents that mix C and Python blocks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, build, then run __pcl_main__.py
    Run {
        #[command(flatten)]
        args: BuildArgs,
    },

    /// Extract and build only (no execution)
    Build {
        #[command(flatten)]
        args: BuildArgs,
    },

    /// Delete the generated build/ and dist/ directories
    Clean {
        /// Path to the document (.pcl file)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let abort = AbortHandle::new();

    let result = match cli.command {
        Commands::Run { args } => {
            let handle = abort.clone();
            interruptible(abort, move || run::execute(&args, &handle)).await
        }
        Commands::Build { args } => {
            let handle = abort.clone();
            interruptible(abort, move || build::execute(&args, &handle)).await
        }
        Commands::Clean { file } => clean::execute(&file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_error(err),
    }
}

/// Run a blocking command, killing its child processes on Ctrl-C.
async fn interruptible<F>(abort: AbortHandle, command: F) -> anyhow::Result<()>
where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
{
    let mut task = tokio::task::spawn_blocking(command);

    tokio::select! {
        result = &mut task => result?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n{}Interrupted, stopping...{}", colors::YELLOW, colors::RESET);
            abort.abort();
            task.await?
        }
    }
}

/// Print an error with its recovery hint and pick the exit status.
///
/// Failures of external processes exit with the process's own status.
fn report_error(err: anyhow::Error) -> ExitCode {
    let (message, code) = match err.downcast_ref::<pclc_core::Error>() {
        Some(core_err) => (core_err.with_hint(), core_err.exit_code()),
        None => (format!("{:#}", err), 1),
    };

    eprintln!("{}error:{} {}", colors::RED, colors::RESET, message);
    ExitCode::from(u8::try_from(code).ok().filter(|c| *c != 0).unwrap_or(1))
}
