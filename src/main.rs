//! stepscope CLI.
//!
//! Thin wrapper over the library's one operation: read a source file, trace
//! its execution, print the outcome as JSON. The same pipeline serves any
//! embedding layer; this binary exists for manual runs and debugging.

use std::fs;
use std::process;

use clap::{Parser, Subcommand};

use stepscope::{trace_program_with, TraceConfig};

/// Execution-trace engine for small programs.
#[derive(Parser)]
#[command(name = "stepscope", about = "Trace a program's execution step by step")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace a program and print the result as JSON.
    Run {
        /// Path to the source file to trace.
        file: String,

        /// Step budget: the run aborts with a ResourceExceeded error step
        /// once this many line events have been observed.
        #[arg(long, default_value_t = 10_000)]
        max_steps: usize,

        /// Call depth budget.
        #[arg(long, default_value_t = 200)]
        max_call_depth: usize,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            file,
            max_steps,
            max_call_depth,
            pretty,
        } => {
            let source = match fs::read_to_string(&file) {
                Ok(source) => source,
                Err(err) => {
                    eprintln!("error: cannot read '{}': {}", file, err);
                    process::exit(1);
                }
            };
            let config = TraceConfig {
                max_steps,
                max_call_depth,
            };
            let outcome = trace_program_with(&source, config);
            let rendered = if pretty {
                serde_json::to_string_pretty(&outcome)
            } else {
                serde_json::to_string(&outcome)
            };
            match rendered {
                Ok(json) => println!("{}", json),
                Err(err) => {
                    eprintln!("error: failed to encode trace: {}", err);
                    process::exit(1);
                }
            }
        }
    }
}
