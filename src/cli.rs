use crate::config::DocConfig;
use crate::customizers::Customizers;
use crate::manifest::ApplicationManifest;
use crate::openapi_builder::OpenApiResources;
use crate::parser::{collect_models, AstParser};
use crate::scanner::FileScanner;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use crate::type_resolver::TypeResolver;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// OpenAPI from routes - Generate an OpenAPI 3 document from an application's route table
#[derive(Parser, Debug)]
#[command(name = "openapi-from-routes")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Application manifest (YAML or JSON) listing routes, controllers and handlers
    #[arg(value_name = "MANIFEST")]
    pub manifest_path: PathBuf,

    /// Document configuration file (YAML or JSON)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Directory of Rust sources to read model definitions from (repeatable)
    #[arg(short = 's', long = "source", value_name = "DIR")]
    pub source_dirs: Vec<PathBuf>,

    /// Build the document of this group only
    #[arg(short = 'g', long = "group")]
    pub group: Option<String>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// URL the document is served from; used to derive the server entry
    #[arg(long = "server-url", default_value = "")]
    pub server_url: String,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.manifest_path.is_file() {
        anyhow::bail!("Manifest file does not exist: {}", args.manifest_path.display());
    }
    if let Some(config) = &args.config_path {
        if !config.is_file() {
            anyhow::bail!("Configuration file does not exist: {}", config.display());
        }
    }
    for dir in &args.source_dirs {
        if !dir.is_dir() {
            anyhow::bail!("Source path is not a directory: {}", dir.display());
        }
    }

    info!("Manifest: {}", args.manifest_path.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    let manifest = ApplicationManifest::from_file(&args.manifest_path)
        .with_context(|| format!("Failed to load manifest {}", args.manifest_path.display()))?;
    info!(
        "Loaded {} routes, {} controllers and {} routers",
        manifest.routes.len(),
        manifest.controllers.len(),
        manifest.routers.len()
    );

    let config = match &args.config_path {
        Some(path) => DocConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => DocConfig::default(),
    };

    let mut source_models = Vec::new();
    for dir in &args.source_dirs {
        let scan_result = FileScanner::new(dir.clone())
            .scan()
            .with_context(|| format!("Failed to scan {}", dir.display()))?;
        for warning in &scan_result.warnings {
            warn!("{}", warning);
        }
        let parsed = AstParser::parse_files(&scan_result.rust_files);
        let models = collect_models(&parsed);
        info!("Found {} models in {}", models.len(), dir.display());
        source_models.extend(models);
    }
    let types = TypeResolver::from_sources(source_models, manifest.models.clone());

    let pretty = config.writer_with_default_pretty_printer;
    let resources = OpenApiResources::from_config(
        Arc::new(manifest),
        Arc::new(config),
        Arc::new(types),
        Customizers::default(),
    )
    .context("Invalid group configuration")?;
    let document = resources.get_openapi(args.group.as_deref(), &args.server_url)?;
    info!(
        "Built document with {} paths and {} component schemas",
        document.paths.len(),
        document.components.schemas.len()
    );

    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&document)?,
        OutputFormat::Json => serialize_json(&document, pretty)?,
    };

    match &args.output_path {
        Some(output_path) => {
            write_to_file(&content, output_path)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            info!("Successfully wrote OpenAPI document to {}", output_path.display());
        }
        None => println!("{}", content),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
routes:
  - method: GET
    path: /users/:id
    controller: UserController
    handler: get_user
controllers:
  - name: UserController
    methods:
      - name: get_user
        return_type: User
        parameters:
          - name: id
            type: i64
            bindings:
              - source: path
"#;

    fn args(dir: &TempDir) -> CliArgs {
        let manifest_path = dir.path().join("manifest.yaml");
        fs::write(&manifest_path, MANIFEST).unwrap();
        let source_dir = dir.path().join("src");
        fs::create_dir_all(&source_dir).unwrap();
        fs::write(
            source_dir.join("models.rs"),
            "pub struct User { pub id: i64, pub name: String }",
        )
        .unwrap();
        CliArgs {
            manifest_path,
            config_path: None,
            source_dirs: vec![source_dir],
            group: None,
            output_format: OutputFormat::Json,
            output_path: Some(dir.path().join("out").join("openapi.json")),
            server_url: "http://localhost:8080/v3/api-docs".to_string(),
            verbose: false,
        }
    }

    #[test]
    fn test_cli_parsing() {
        let args = CliArgs::try_parse_from([
            "openapi-from-routes",
            "app.yaml",
            "-c",
            "docs.yaml",
            "-s",
            "src/models",
            "-s",
            "src/dto",
            "-g",
            "admin",
            "-f",
            "json",
        ])
        .unwrap();
        assert_eq!(args.manifest_path, PathBuf::from("app.yaml"));
        assert_eq!(args.source_dirs.len(), 2);
        assert_eq!(args.group.as_deref(), Some("admin"));
        assert_eq!(args.output_format, OutputFormat::Json);
        assert!(args.output_path.is_none());
    }

    #[test]
    fn test_missing_manifest_rejected() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir);
        args.manifest_path = dir.path().join("missing.yaml");
        assert!(parse_args_from_parsed(args).is_err());
    }

    #[test]
    fn test_run_writes_document() {
        let dir = TempDir::new().unwrap();
        let args = parse_args_from_parsed(args(&dir)).unwrap();
        let output = args.output_path.clone().unwrap();
        run(args).unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(json["servers"][0]["url"], "http://localhost:8080");
        assert_eq!(
            json["paths"]["/users/{id}"]["get"]["responses"]["200"]["content"]["*/*"]["schema"]["$ref"],
            "#/components/schemas/User"
        );
        assert_eq!(
            json["components"]["schemas"]["User"]["properties"]["name"]["type"],
            "string"
        );
    }

    #[test]
    fn test_unknown_group_fails() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir);
        args.group = Some("missing".to_string());
        let err = run(args).unwrap_err();
        assert!(err.to_string().contains("No OpenAPI resource found for group: missing"));
    }
}
