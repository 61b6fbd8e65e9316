//! PLC command line
//!
//! Reads a syntax tree serialized as JSON, analyzes it and optionally runs it.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use plc_lang::feedback::RunFeedback;
use plc_lang::Source;

/// PLC analyzer and interpreter
#[derive(Parser, Debug)]
#[command(name = "plc")]
#[command(version)]
#[command(about = "Type-check and interpret PLC syntax trees")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print failures as a JSON report
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a syntax tree
    Check {
        /// Syntax tree file (.json)
        input: PathBuf,
    },
    /// Analyze, then run; the exit status is the value returned by `main`
    Run {
        /// Syntax tree file (.json)
        input: PathBuf,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let (input, execute) = match &cli.command {
        Commands::Check { input } => (input, false),
        Commands::Run { input } => (input, true),
    };

    let mut source = match load(input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };

    let file_name = input.display().to_string();
    let outcome = if execute {
        plc_lang::check_and_run(&mut source).map(|value| Some(value.exit_code()))
    } else {
        plc_lang::analyze(&mut source).map(|()| None)
    };

    match outcome {
        Ok(exit_code) => {
            log::info!("{} finished", file_name);
            if cli.json {
                println!("{}", RunFeedback::success(&file_name, exit_code).to_json());
            } else if !execute {
                println!("No errors found");
            }
            process::exit(exit_code.unwrap_or(0));
        }
        Err(e) => {
            if cli.json {
                println!("{}", RunFeedback::failure(&file_name, &e).to_json());
            } else {
                let location = e.span().map(|span| format!(" at {}", span)).unwrap_or_default();
                eprintln!("{} error[{}]{}: {}", phase_name(&e), e.code(), location, e);
            }
            process::exit(1);
        }
    }
}

fn load(path: &Path) -> Result<Source> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let source: Source =
        serde_json::from_str(&text).with_context(|| format!("parsing syntax tree in {}", path.display()))?;
    log::debug!(
        "loaded {} globals and {} functions from {}",
        source.globals.len(),
        source.functions.len(),
        path.display()
    );
    Ok(source)
}

fn phase_name(error: &plc_lang::Error) -> &'static str {
    match error.phase() {
        plc_lang::Phase::Analysis => "analysis",
        plc_lang::Phase::Runtime => "runtime",
    }
}
