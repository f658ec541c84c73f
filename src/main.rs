//! OpenAPI from routes - Command-line tool for generating OpenAPI documents.
//!
//! This binary reads an application manifest (the route table plus handler and
//! controller metadata), optionally scans Rust sources for model definitions, and
//! writes the resulting OpenAPI 3 document.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-routes [OPTIONS] <MANIFEST>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-from-routes app.yaml -s ./src -o openapi.yaml
//! ```
//!
//! Generate the JSON document of one group:
//! ```bash
//! openapi-from-routes app.yaml -c docs.yaml -g admin -f json -o admin.json
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! openapi-from-routes app.yaml -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_routes::cli;

fn main() -> Result<()> {
    // Parse first so the verbose flag can pick the log level before anything logs
    let parsed = cli::CliArgs::parse();

    let log_level = if parsed.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI from routes starting...");

    let args = cli::parse_args_from_parsed(parsed)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
