use std::process;

use clap::Parser;
use jarvice::cli::args::{Cli, LogLevel};
use jarvice::cli::commands::execute_command;
use jarvice::cli::output;
use jarvice::exitcode;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too
            let code = if e.use_stderr() {
                exitcode::FAILURE
            } else {
                exitcode::OK
            };
            let _ = e.print();
            process::exit(code);
        }
    };

    setup_logging(cli.loglevel);

    if let Err(e) = execute_command(&cli) {
        if e.is_unexpected() {
            tracing::error!(
                "unexpected failure, command line: {}",
                redacted_command_line(std::env::args()).join(" ")
            );
        }
        output::error(&e);
        process::exit(e.exit_code());
    }
}

fn setup_logging(level: LogLevel) {
    let filter = match level {
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    // Create a subscriber with formatted output directed to stderr
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();

    tracing::debug!("log level: {}", filter);
}

/// Command line with the `--apikey` value masked.
fn redacted_command_line(args: impl Iterator<Item = String>) -> Vec<String> {
    let mut masked = Vec::new();
    let mut mask_next = false;
    for arg in args {
        if mask_next {
            masked.push("********".to_string());
            mask_next = false;
        } else if arg == "--apikey" {
            masked.push(arg);
            mask_next = true;
        } else if arg.starts_with("--apikey=") {
            masked.push("--apikey=********".to_string());
        } else {
            masked.push(arg);
        }
    }
    masked
}
