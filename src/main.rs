use clap::{Arg, Command};
use cloudlang::{repl, runner};
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    let matches = Command::new("cloudlang")
        .about("A small expression language with closures")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("file")
                .help("The script file to execute")
                .value_name("FILE")
                .index(1),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .help("Start in interactive REPL mode")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("trace-parser")
                .long("trace-parser")
                .help("Log every parse rule as it is entered and left")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    init_tracing(matches.get_flag("trace-parser"));

    match matches.get_one::<String>("file") {
        Some(file_path) if !matches.get_flag("interactive") => run_file(file_path),
        _ => {
            repl::start();
            ExitCode::SUCCESS
        }
    }
}

const PARSER_TRACE: &str = "cloudlang::parser=trace";

/// Logging stays off unless `RUST_LOG` is set or parser tracing was asked for.
fn init_tracing(trace_parser: bool) {
    let filter = match (std::env::var("RUST_LOG").ok(), trace_parser) {
        (None, false) => return,
        (None, true) => EnvFilter::new(PARSER_TRACE),
        (Some(directives), true) => EnvFilter::new(format!("{},{}", directives, PARSER_TRACE)),
        (Some(directives), false) => EnvFilter::new(directives),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_span_events(FmtSpan::ENTER | FmtSpan::CLOSE)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn run_file(path: &str) -> ExitCode {
    let path = Path::new(path);

    if !path.exists() {
        eprintln!("Error: File '{}' not found", path.display());
        return ExitCode::FAILURE;
    }

    match fs::read_to_string(path) {
        Ok(source) => {
            let filename = path.display().to_string();
            if runner::run(&source, Some(&filename)).is_failure() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            ExitCode::FAILURE
        }
    }
}
