//! OpenAPI from routes - OpenAPI 3 documents synthesized from route and handler metadata.
//!
//! The library takes a description of an application's HTTP surface (routes, the
//! controllers and handler methods they dispatch to, router-style function endpoints and
//! the documentation attached to all of them) and builds a complete OpenAPI 3 document:
//! paths, operations, parameters, request bodies, responses, tags, security and
//! component schemas.
//!
//! # Architecture
//!
//! 1. [`manifest`] - The application manifest: routes, controllers, handlers and their docs
//! 2. [`scanner`] and [`parser`] - Collect model definitions from Rust sources with `syn`
//! 3. [`type_resolver`] - Classifies types (scalars, containers, wrappers, models)
//! 4. [`schema_resolver`] - Turns types into schemas and registers component schemas
//! 5. [`parameter_builder`], [`request_body_builder`], [`response_builder`] - Operation parts
//! 6. [`operation_builder`] and [`security`] - Operation-level metadata
//! 7. [`router_operation`] and [`path_matcher`] - Function endpoints and path filters
//! 8. [`assembler`] - Walks routes and merges everything into path items
//! 9. [`openapi_builder`] - Cached per-group document resources
//! 10. [`serializer`] - YAML and JSON output
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_routes::{
//!     config::DocConfig,
//!     manifest::ApplicationManifest,
//!     openapi_builder::OpenApiResource,
//!     parser::{collect_models, AstParser},
//!     scanner::FileScanner,
//!     serializer::serialize_yaml,
//!     type_resolver::TypeResolver,
//! };
//! use std::path::{Path, PathBuf};
//! use std::sync::Arc;
//!
//! let manifest = ApplicationManifest::from_file(Path::new("app.yaml")).unwrap();
//!
//! // Model definitions from source
//! let scan_result = FileScanner::new(PathBuf::from("./src")).scan().unwrap();
//! let parsed = AstParser::parse_files(&scan_result.rust_files);
//! let types = TypeResolver::from_sources(collect_models(&parsed), manifest.models.clone());
//!
//! let resource = OpenApiResource::new(
//!     Arc::new(manifest),
//!     Arc::new(DocConfig::default()),
//!     Arc::new(types),
//! );
//! let document = resource.get_openapi("http://localhost:8080/v3/api-docs");
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod assembler;
pub mod cli;
pub mod config;
pub mod customizers;
pub mod error;
pub mod manifest;
pub mod model;
pub mod openapi_builder;
pub mod operation_builder;
pub mod parameter_builder;
pub mod parser;
pub mod path_matcher;
pub mod request_body_builder;
pub mod response_builder;
pub mod router_operation;
pub mod scanner;
pub mod schema_resolver;
pub mod security;
pub mod serializer;
pub mod type_resolver;
pub mod validation;
