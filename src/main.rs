//! Command-line front end: reads a JSON request body and prints the JSON response.

use clap::{Parser, Subcommand};
use dnn_modeler::api::{Modeler, Operation};
use dnn_modeler::config::ModelerConfig;
use std::io::Read;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "dnn-modeler: static shape checks for block-graph networks", long_about = None)]
struct Args {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the block catalog
    Blocks,
    /// Propagate shapes through a graph
    Propagate {
        /// Request body file, or `-` for stdin
        payload: String,
    },
    /// Check every edge for shape compatibility
    Check { payload: String },
    /// Assemble a sequential model summary
    Build { payload: String },
}

impl Command {
    fn split(&self) -> (Operation, Option<&str>) {
        match self {
            Command::Blocks => (Operation::ListBlocks, None),
            Command::Propagate { payload } => (Operation::Propagate, Some(payload)),
            Command::Check { payload } => (Operation::Check, Some(payload)),
            Command::Build { payload } => (Operation::Build, Some(payload)),
        }
    }
}

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read_payload(source: &str) -> std::io::Result<String> {
    if source == "-" {
        let mut body = String::new();
        std::io::stdin().read_to_string(&mut body)?;
        Ok(body)
    } else {
        std::fs::read_to_string(source)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_logging(&args.log_level);

    let config = match &args.config {
        Some(path) => ModelerConfig::load(path)?,
        None => ModelerConfig::default(),
    };
    debug!(?config, "configuration loaded");

    let (op, payload) = args.command.split();
    let body = match payload {
        Some(source) => read_payload(source)?,
        None => String::new(),
    };

    let modeler = Modeler::new(config);
    let response = modeler.handle(op, &body)?;
    let text = if modeler.config().pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{}", text);
    Ok(())
}
