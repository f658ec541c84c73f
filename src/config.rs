//! Document generation settings.
//!
//! `DocConfig` is read once per build and threaded through every builder by `Arc`. The type rule
//! sets are `BTreeSet`s so that adding or removing an entry twice is harmless.

use crate::error::Result;
use crate::manifest::{TypeDescriptor, TypeReplacement};
use crate::model::{Info, Schema, SecurityScheme, Server};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DocConfig {
    pub packages_to_scan: Vec<String>,
    pub packages_to_exclude: Vec<String>,
    pub paths_to_match: Vec<String>,
    pub paths_to_exclude: Vec<String>,
    pub default_consumes_media_type: String,
    pub default_produces_media_type: String,
    pub cache: CacheConfig,
    /// Tag untagged operations with the hyphenated controller name
    pub auto_tag_classes: bool,
    /// Drop component schemas no operation refers to
    pub remove_broken_reference_definitions: bool,
    pub writer_with_default_pretty_printer: bool,
    pub api_docs: ApiDocsConfig,
    pub group_configs: Vec<GroupConfig>,
    pub info: Option<Info>,
    pub servers: Vec<Server>,
    pub security_schemes: BTreeMap<String, SecurityScheme>,
    pub type_rules: TypeRules,
}

impl Default for DocConfig {
    fn default() -> Self {
        Self {
            packages_to_scan: Vec::new(),
            packages_to_exclude: Vec::new(),
            paths_to_match: Vec::new(),
            paths_to_exclude: Vec::new(),
            default_consumes_media_type: "application/json".to_string(),
            default_produces_media_type: "*/*".to_string(),
            cache: CacheConfig::default(),
            auto_tag_classes: true,
            remove_broken_reference_definitions: true,
            writer_with_default_pretty_printer: true,
            api_docs: ApiDocsConfig::default(),
            group_configs: Vec::new(),
            info: None,
            servers: Vec::new(),
            security_schemes: BTreeMap::new(),
            type_rules: TypeRules::default(),
        }
    }
}

impl DocConfig {
    /// Loads configuration from a YAML or JSON file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn is_cache_disabled(&self) -> bool {
        self.cache.disabled
    }

    pub fn group_config(&self, group: &str) -> Option<&GroupConfig> {
        self.group_configs.iter().find(|g| g.group == group)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CacheConfig {
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ApiDocsConfig {
    /// Path the document is served from; stripped from request URLs when deriving servers
    pub path: String,
}

impl Default for ApiDocsConfig {
    fn default() -> Self {
        Self {
            path: "/v3/api-docs".to_string(),
        }
    }
}

/// Path and package filters for one named group of operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GroupConfig {
    pub group: String,
    pub display_name: Option<String>,
    pub packages_to_scan: Vec<String>,
    pub packages_to_exclude: Vec<String>,
    pub paths_to_match: Vec<String>,
    pub paths_to_exclude: Vec<String>,
}

fn set_of(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Type and annotation rules consulted while building operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TypeRules {
    /// Framework-internal parameter types that never appear in the document
    pub ignored_parameter_types: BTreeSet<String>,
    /// Parameter annotations that hide a parameter
    pub ignored_annotations: BTreeSet<String>,
    /// Types documented as `string` / `binary`
    pub file_types: BTreeSet<String>,
    /// Types documented as their first generic argument
    pub response_wrappers: BTreeSet<String>,
    /// Deferred-delivery wrappers; also documented as their first generic argument
    pub deferred_wrappers: BTreeSet<String>,
    /// Return types that carry no body
    pub void_types: BTreeSet<String>,
    /// Return types too generic to describe the body
    pub opaque_return_types: BTreeSet<String>,
    /// Controllers left out of every document
    pub hidden_controllers: BTreeSet<String>,
    pub type_replacements: BTreeMap<String, TypeReplacement>,
}

impl Default for TypeRules {
    fn default() -> Self {
        Self {
            ignored_parameter_types: set_of(&[
                "Context",
                "Validation",
                "Session",
                "FlashScope",
                "Principal",
                "Locale",
                "TimeZone",
                "State",
                "Extension",
                "HeaderMap",
                "HttpRequest",
                "Request",
                "ConnectInfo",
                "Reader",
                "Writer",
            ]),
            ignored_annotations: set_of(&["Hidden"]),
            file_types: set_of(&["FileItem", "File", "InputStream", "Multipart", "TempFile"]),
            response_wrappers: set_of(&[
                "Option", "Box", "Arc", "Rc", "Cow", "Json", "Form", "Query", "Path", "Data",
                "Result",
            ]),
            deferred_wrappers: set_of(&[
                "Future",
                "BoxFuture",
                "Pin",
                "JoinHandle",
                "Task",
                "CompletableFuture",
            ]),
            void_types: set_of(&["()", "Void", "NoContent", "StatusCode"]),
            opaque_return_types: set_of(&[
                "Response",
                "HttpResponse",
                "IntoResponse",
                "Responder",
                "Object",
            ]),
            hidden_controllers: BTreeSet::new(),
            type_replacements: BTreeMap::new(),
        }
    }
}

impl TypeRules {
    pub fn add_ignored_parameter_type(&mut self, name: &str) {
        self.ignored_parameter_types.insert(name.to_string());
    }

    pub fn remove_ignored_parameter_type(&mut self, name: &str) {
        self.ignored_parameter_types.remove(name);
    }

    pub fn add_ignored_annotation(&mut self, name: &str) {
        self.ignored_annotations.insert(name.to_string());
    }

    pub fn add_file_type(&mut self, name: &str) {
        self.file_types.insert(name.to_string());
    }

    pub fn remove_file_type(&mut self, name: &str) {
        self.file_types.remove(name);
    }

    pub fn add_response_wrapper(&mut self, name: &str) {
        self.response_wrappers.insert(name.to_string());
    }

    pub fn remove_response_wrapper(&mut self, name: &str) {
        self.response_wrappers.remove(name);
    }

    pub fn add_void_type(&mut self, name: &str) {
        self.void_types.insert(name.to_string());
    }

    pub fn add_opaque_return_type(&mut self, name: &str) {
        self.opaque_return_types.insert(name.to_string());
    }

    pub fn hide_controller(&mut self, name: &str) {
        self.hidden_controllers.insert(name.to_string());
    }

    pub fn replace_with_type(&mut self, name: &str, replacement: TypeDescriptor) {
        self.type_replacements
            .insert(name.to_string(), TypeReplacement::Type(replacement));
    }

    pub fn replace_with_schema(&mut self, name: &str, schema: Schema) {
        self.type_replacements
            .insert(name.to_string(), TypeReplacement::Schema(schema));
    }

    pub fn remove_replacement(&mut self, name: &str) {
        self.type_replacements.remove(name);
    }

    pub fn is_ignored_parameter_type(&self, name: &str) -> bool {
        self.ignored_parameter_types.contains(name)
    }

    pub fn is_file_type(&self, name: &str) -> bool {
        self.file_types.contains(name)
    }

    pub fn is_wrapper(&self, name: &str) -> bool {
        self.response_wrappers.contains(name) || self.deferred_wrappers.contains(name)
    }

    pub fn is_opaque(&self, name: &str) -> bool {
        self.opaque_return_types.contains(name)
    }

    /// Void types, and deferred wrappers of void (`Future<()>`), recursively
    pub fn is_void(&self, ty: &TypeDescriptor) -> bool {
        if self.void_types.contains(&ty.name) {
            return true;
        }
        if self.deferred_wrappers.contains(&ty.name) {
            return ty.first_generic().map_or(true, |inner| self.is_void(inner));
        }
        false
    }
}
