//! kue CLI
//!
//! Usage:
//!   kue [OPTIONS]
//!
//! Options:
//!   --input-directory <DIR>   Directory holding the module files (default ".")
//!   --output-directory <DIR>  Directory outputs are written below (default ".")
//!   --pretty-json [<BOOL>]    Indent JSON output (default true)
//!   -c, --config <FILE>       Settings file (TOML format)
//!   -h, --help                Print help

use std::path::PathBuf;

use clap::Parser;
use env_logger::{Builder, Env};
use log::info;

use kue::{generate, Evaluator, GenerateConfig, GenerateError};

#[derive(Parser)]
#[command(name = "kue")]
#[command(about = "Generate JSON and YAML manifests from constraint templates")]
struct Cli {
    /// Directory holding the module files and an optional instances.json
    #[arg(long, value_name = "DIR")]
    input_directory: Option<PathBuf>,

    /// Directory output paths are resolved against
    #[arg(long, value_name = "DIR")]
    output_directory: Option<PathBuf>,

    /// Indent JSON output
    #[arg(
        long,
        value_name = "BOOL",
        action = clap::ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pretty_json: Option<bool>,

    /// Settings file (TOML format); command-line flags override it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    fn resolve_config(&self) -> Result<GenerateConfig, GenerateError> {
        let mut config = match &self.config {
            Some(path) => GenerateConfig::from_file(path)?,
            None => GenerateConfig::default(),
        };
        if let Some(dir) = &self.input_directory {
            config = config.with_input_directory(dir);
        }
        if let Some(dir) = &self.output_directory {
            config = config.with_output_directory(dir);
        }
        if let Some(pretty) = self.pretty_json {
            config = config.with_pretty_json(pretty);
        }
        Ok(config)
    }
}

/// Logger with an `info` default that `RUST_LOG` overrides
fn logger(env: Env) -> Builder {
    Builder::from_env(env.default_filter_or("info"))
}

fn failure_message(err: &GenerateError, evaluator: &Evaluator) -> String {
    format!("Error: {}", err.render(evaluator))
}

fn main() {
    logger(Env::default()).init();

    let cli = Cli::parse();
    let mut evaluator = Evaluator::new();

    let result = cli
        .resolve_config()
        .and_then(|config| generate(&mut evaluator, &config));

    match result {
        Ok(written) => {
            info!("wrote {} file(s)", written.len());
        }
        Err(e) => {
            eprintln!("{}", failure_message(&e, &evaluator));
            std::process::exit(1);
        }
    }
}
