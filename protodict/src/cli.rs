//! # CLI
//!
//! This module defines the command-line interface of `protodict` using `clap`.
//!
//! It is responsible for parsing user input and performing validation (e.g., ensuring the body is valid JSON).
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "protodict",
    version,
    about = "Convert protobuf messages to JSON and back"
)]
pub struct Cli {
    /// Path to the descriptor set (.bin), as produced by `protoc --descriptor_set_out`
    #[arg(short, long)]
    pub descriptor_set: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a binary message as JSON
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// protodict -d schema.bin to-json my.pkg.Message --input message.bin --enum-labels
    /// ```
    ToJson {
        /// Fully qualified message name (e.g. my.package.Message)
        message: String,

        /// File holding the binary message. Reads stdin when omitted.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print enum values by label instead of number
        #[arg(long)]
        enum_labels: bool,

        /// Lowercase the labels printed with --enum-labels
        #[arg(long, requires = "enum_labels")]
        lowercase_enums: bool,

        /// Print every declared field, filling absent ones with their defaults
        #[arg(long)]
        emit_defaults: bool,
    },

    /// Build a binary message from a JSON body
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// protodict -d schema.bin from-json my.pkg.Message --body '{"key": "value"}' --output message.bin
    /// ```
    FromJson {
        /// Fully qualified message name (e.g. my.package.Message)
        message: String,

        /// JSON object holding the message fields
        #[arg(long, value_parser = parse_body)]
        body: serde_json::Value,

        /// Drop unknown fields and extensions, accept lowercase enum labels
        #[arg(long)]
        lenient: bool,

        /// Leave fields set to null untouched instead of resetting them
        #[arg(long)]
        ignore_none: bool,

        /// Check that every required field is present before converting
        #[arg(long)]
        validate: bool,

        /// File to write the binary message to. Writes stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that a JSON body carries every required field of a message
    Validate {
        /// Fully qualified message name (e.g. my.package.Message)
        message: String,

        /// JSON object holding the message fields
        #[arg(long, value_parser = parse_body)]
        body: serde_json::Value,
    },
}

fn parse_body(value: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(value).map_err(|e| format!("Invalid JSON: {e}"))
}
