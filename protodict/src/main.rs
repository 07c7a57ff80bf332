//! # Protodict CLI Entry Point
//!
//! The main executable for the protodict tool. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Installs the log subscriber and parses arguments using [`cli::Cli`].
//! 2. **Schema loading**: Reads the descriptor set named on the command line.
//! 3. **Execution**: Delegates the conversion to [`convert`].
//! 4. **Presentation**: Prints the result to standard output, or a formatted error to
//!    standard error with a non-zero exit status.
mod cli;
mod convert;
mod formatter;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use convert::{FromJsonOptions, Schema, ToJsonOptions};
use formatter::{FormattedString, Valid};
use std::io::{Read, Write};
use std::path::Path;
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    init_tracing();
    let args = Cli::parse();

    if let Err(err) = run(args) {
        eprintln!("{}", FormattedString::from(err));
        process::exit(1);
    }
}

/// Logs go to stderr so they never mix with converted output. Set `RUST_LOG` to see them.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(args: Cli) -> anyhow::Result<()> {
    let schema = Schema::from_file(&args.descriptor_set)?;

    match args.command {
        Commands::ToJson {
            message,
            input,
            enum_labels,
            lowercase_enums,
            emit_defaults,
        } => {
            let bytes = read_input(input.as_deref())?;
            let options = ToJsonOptions {
                enum_labels,
                lowercase_enums,
                emit_defaults,
            };
            let json = convert::to_json(schema.message(&message)?, &bytes, options)?;
            println!("{}", FormattedString::from(json));
        }
        Commands::FromJson {
            message,
            body,
            lenient,
            ignore_none,
            validate,
            output,
        } => {
            let options = FromJsonOptions {
                lenient,
                ignore_none,
                validate,
            };
            let bytes = convert::from_json(schema.message(&message)?, body, options)?;
            write_output(output.as_deref(), &bytes)?;
        }
        Commands::Validate { message, body } => {
            convert::validate_body(&schema.message(&message)?, body)?;
            println!("{}", FormattedString::from(Valid(message)));
        }
    }

    Ok(())
}

fn read_input(path: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match path {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read input '{}'", path.display())),
        None => {
            let mut bytes = Vec::new();
            std::io::stdin()
                .read_to_end(&mut bytes)
                .context("Failed to read stdin")?;
            Ok(bytes)
        }
    }
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> anyhow::Result<()> {
    match path {
        Some(path) => std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write output '{}'", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes).context("Failed to write stdout")?;
            stdout.flush().context("Failed to flush stdout")
        }
    }
}
