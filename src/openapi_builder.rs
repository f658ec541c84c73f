//! Document building and caching.
//!
//! An [`OpenApiResource`] owns everything needed to build one document (the manifest, the
//! configuration, the type registry and the customizers) and caches the finished document
//! behind a mutex until [`OpenApiResource::reset`] is called. [`OpenApiResources`] keeps one
//! resource per configured group.

use crate::assembler::OperationAssembler;
use crate::config::{DocConfig, GroupConfig};
use crate::customizers::{Customizers, OpenApiCustomizer, OperationCustomizer, ParameterCustomizer};
use crate::error::{Error, Result};
use crate::manifest::ApplicationManifest;
use crate::model::{OpenApiDocument, Server, SCHEMA_REF_PREFIX};
use crate::path_matcher::{PackageFilter, PathFilter};
use crate::schema_resolver::SchemaResolver;
use crate::security::security_scheme;
use crate::type_resolver::TypeResolver;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Description of the server entry derived from the request URL
pub const GENERATED_SERVER_DESCRIPTION: &str = "Generated server url";

#[derive(Debug, Default)]
struct ResourceState {
    cached: Option<Arc<OpenApiDocument>>,
}

/// Builds, caches and serves the document of one group
pub struct OpenApiResource {
    group: Option<String>,
    manifest: Arc<ApplicationManifest>,
    config: Arc<DocConfig>,
    types: Arc<TypeResolver>,
    customizers: Customizers,
    path_filter: PathFilter,
    package_filter: PackageFilter,
    state: Mutex<ResourceState>,
}

impl OpenApiResource {
    /// Resource for the whole application, filtered by the global configuration only
    pub fn new(manifest: Arc<ApplicationManifest>, config: Arc<DocConfig>, types: Arc<TypeResolver>) -> Self {
        let path_filter = PathFilter::for_group(&config, None);
        let package_filter = PackageFilter::for_group(&config, None);
        Self {
            group: None,
            manifest,
            config,
            types,
            customizers: Customizers::default(),
            path_filter,
            package_filter,
            state: Mutex::new(ResourceState::default()),
        }
    }

    /// Resource for one group. Group filters replace the global ones they overlap with;
    /// group customizers run after the global ones.
    pub fn for_group(
        manifest: Arc<ApplicationManifest>,
        config: Arc<DocConfig>,
        types: Arc<TypeResolver>,
        group: &GroupedOpenApi,
        global_customizers: &Customizers,
    ) -> Self {
        let group_config = group.to_config();
        let path_filter = PathFilter::for_group(&config, Some(&group_config));
        let package_filter = PackageFilter::for_group(&config, Some(&group_config));
        Self {
            group: Some(group.group.clone()),
            manifest,
            config,
            types,
            customizers: global_customizers.merged_with(&group.customizers),
            path_filter,
            package_filter,
            state: Mutex::new(ResourceState::default()),
        }
    }

    pub fn with_customizers(mut self, customizers: Customizers) -> Self {
        self.customizers = customizers;
        self
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Returns the document for a request made to `server_base_url`.
    ///
    /// The document is built on first use, and on every use when caching is disabled. With
    /// the cache enabled, repeated calls for the same server URL return the same `Arc`.
    pub fn get_openapi(&self, server_base_url: &str) -> Arc<OpenApiDocument> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let servers = self.servers(server_base_url);

        let cached = if self.config.is_cache_disabled() {
            None
        } else {
            state.cached.clone()
        };
        let document = match cached {
            Some(cached) if cached.servers == servers => return cached,
            Some(cached) => {
                let mut document = (*cached).clone();
                document.servers = servers;
                document
            }
            None => {
                let mut document = self.build();
                document.servers = servers;
                document
            }
        };

        let document = Arc::new(document);
        state.cached = Some(Arc::clone(&document));
        document
    }

    /// Drops the cached document; the next request rebuilds it
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.cached = None;
        debug!("OpenAPI cache cleared for group {}", self.group.as_deref().unwrap_or("default"));
    }

    /// Configured servers, or one server derived from the request URL
    fn servers(&self, server_base_url: &str) -> Vec<Server> {
        if !self.config.servers.is_empty() {
            return self.config.servers.clone();
        }
        let url = server_base_url
            .strip_suffix(self.config.api_docs.path.as_str())
            .unwrap_or(server_base_url)
            .trim_end_matches('/');
        if url.is_empty() {
            return Vec::new();
        }
        vec![Server {
            url: url.to_string(),
            description: Some(GENERATED_SERVER_DESCRIPTION.to_string()),
        }]
    }

    fn build(&self) -> OpenApiDocument {
        let started = Instant::now();
        let mut document = OpenApiDocument {
            info: self.config.info.clone().unwrap_or_default(),
            ..Default::default()
        };
        self.add_security_schemes(&mut document);

        let mut resolver = SchemaResolver::new(Arc::clone(&self.types), Arc::clone(&self.config));
        let mut assembler = OperationAssembler::new(
            &self.config,
            &self.types,
            &self.customizers,
            &self.path_filter,
            &self.package_filter,
        );
        assembler.calculate_routes(&mut document, &mut resolver, &self.manifest);
        assembler.calculate_router_paths(&mut document, &mut resolver, &self.manifest);

        document.components.schemas.extend(resolver.into_schemas());
        if self.config.remove_broken_reference_definitions {
            remove_unreferenced_schemas(&mut document);
        }

        for customizer in &self.customizers.openapi {
            customizer.customize(&mut document);
        }

        info!(
            "Init duration for OpenAPI document of group {}: {} ms",
            self.group.as_deref().unwrap_or("default"),
            started.elapsed().as_millis()
        );
        document
    }

    /// Schemes declared on visible controllers, then configured schemes, which win on a
    /// name clash
    fn add_security_schemes(&self, document: &mut OpenApiDocument) {
        let schemes = &mut document.components.security_schemes;
        for controller in &self.manifest.controllers {
            if controller.hidden || self.config.type_rules.hidden_controllers.contains(&controller.name) {
                continue;
            }
            schemes.extend(controller.security_schemes.iter().filter_map(security_scheme));
        }
        schemes.extend(self.config.security_schemes.clone());
    }
}

impl std::fmt::Debug for OpenApiResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenApiResource")
            .field("group", &self.group)
            .field("customizers", &self.customizers)
            .finish()
    }
}

/// Drops component schemas that nothing outside the components refers to, directly or
/// through other schemas. References to missing components are logged.
pub fn remove_unreferenced_schemas(document: &mut OpenApiDocument) {
    let schemas = std::mem::take(&mut document.components.schemas);
    let mut pending: VecDeque<String> = match serde_json::to_value(&*document) {
        Ok(value) => {
            let mut refs = Vec::new();
            collect_refs(&value, &mut refs);
            refs.into()
        }
        Err(e) => {
            warn!("Unable to scan document for references, keeping all schemas: {}", e);
            document.components.schemas = schemas;
            return;
        }
    };

    let mut reachable: BTreeSet<String> = BTreeSet::new();
    while let Some(name) = pending.pop_front() {
        if !reachable.insert(name.clone()) {
            continue;
        }
        match schemas.get(&name) {
            Some(schema) => {
                if let Ok(value) = serde_json::to_value(schema) {
                    let mut refs = Vec::new();
                    collect_refs(&value, &mut refs);
                    pending.extend(refs);
                }
            }
            None => warn!("Reference to missing component schema {}", name),
        }
    }

    let before = schemas.len();
    document.components.schemas = schemas
        .into_iter()
        .filter(|(name, _)| reachable.contains(name))
        .collect();
    let removed = before - document.components.schemas.len();
    if removed > 0 {
        debug!("Removed {} unreferenced component schemas", removed);
    }
}

fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                match (key.as_str(), value) {
                    ("$ref", Value::String(reference)) => {
                        if let Some(name) = reference.strip_prefix(SCHEMA_REF_PREFIX) {
                            out.push(name.to_string());
                        }
                    }
                    _ => collect_refs(value, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_refs(item, out)),
        _ => {}
    }
}

/// A named subset of the application's operations
#[derive(Debug, Clone, Default)]
pub struct GroupedOpenApi {
    group: String,
    display_name: Option<String>,
    paths_to_match: Vec<String>,
    paths_to_exclude: Vec<String>,
    packages_to_scan: Vec<String>,
    packages_to_exclude: Vec<String>,
    customizers: Customizers,
}

impl GroupedOpenApi {
    pub fn builder(group: &str) -> GroupedOpenApiBuilder {
        GroupedOpenApiBuilder {
            inner: GroupedOpenApi {
                group: group.to_string(),
                ..Default::default()
            },
        }
    }

    /// Group described by configuration
    pub fn from_config(config: &GroupConfig) -> Result<Self> {
        let mut builder = Self::builder(&config.group)
            .paths_to_match(config.paths_to_match.iter().cloned())
            .paths_to_exclude(config.paths_to_exclude.iter().cloned())
            .packages_to_scan(config.packages_to_scan.iter().cloned())
            .packages_to_exclude(config.packages_to_exclude.iter().cloned());
        if let Some(display_name) = &config.display_name {
            builder = builder.display_name(display_name);
        }
        builder.build()
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.group)
    }

    fn to_config(&self) -> GroupConfig {
        GroupConfig {
            group: self.group.clone(),
            display_name: self.display_name.clone(),
            packages_to_scan: self.packages_to_scan.clone(),
            packages_to_exclude: self.packages_to_exclude.clone(),
            paths_to_match: self.paths_to_match.clone(),
            paths_to_exclude: self.paths_to_exclude.clone(),
        }
    }
}

pub struct GroupedOpenApiBuilder {
    inner: GroupedOpenApi,
}

impl GroupedOpenApiBuilder {
    pub fn display_name(mut self, display_name: &str) -> Self {
        self.inner.display_name = Some(display_name.to_string());
        self
    }

    pub fn paths_to_match<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.paths_to_match.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn paths_to_exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.paths_to_exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn packages_to_scan<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.packages_to_scan.extend(packages.into_iter().map(Into::into));
        self
    }

    pub fn packages_to_exclude<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.packages_to_exclude.extend(packages.into_iter().map(Into::into));
        self
    }

    pub fn add_operation_customizer(mut self, customizer: Arc<dyn OperationCustomizer>) -> Self {
        self.inner.customizers.operation.push(customizer);
        self
    }

    pub fn add_parameter_customizer(mut self, customizer: Arc<dyn ParameterCustomizer>) -> Self {
        self.inner.customizers.parameter.push(customizer);
        self
    }

    pub fn add_openapi_customizer(mut self, customizer: Arc<dyn OpenApiCustomizer>) -> Self {
        self.inner.customizers.openapi.push(customizer);
        self
    }

    /// Fails when the group has no name, or when it selects nothing and customizes nothing
    pub fn build(self) -> Result<GroupedOpenApi> {
        let group = self.inner;
        if group.group.trim().is_empty() {
            return Err(Error::InvalidConfiguration("Group name must not be empty".to_string()));
        }
        let has_filter = !group.paths_to_match.is_empty()
            || !group.paths_to_exclude.is_empty()
            || !group.packages_to_scan.is_empty()
            || !group.packages_to_exclude.is_empty();
        if !has_filter && group.customizers.is_empty() {
            return Err(Error::InvalidConfiguration(format!(
                "Group {} needs at least one path or package filter, or a customizer",
                group.group
            )));
        }
        Ok(group)
    }
}

/// Document resources of an application: one for all operations, one per group
#[derive(Debug)]
pub struct OpenApiResources {
    default: OpenApiResource,
    groups: BTreeMap<String, OpenApiResource>,
}

impl OpenApiResources {
    pub fn new(
        manifest: Arc<ApplicationManifest>,
        config: Arc<DocConfig>,
        types: Arc<TypeResolver>,
        customizers: Customizers,
        groups: Vec<GroupedOpenApi>,
    ) -> Self {
        let groups = groups
            .iter()
            .map(|group| {
                let resource = OpenApiResource::for_group(
                    Arc::clone(&manifest),
                    Arc::clone(&config),
                    Arc::clone(&types),
                    group,
                    &customizers,
                );
                (group.group.clone(), resource)
            })
            .collect();
        let default = OpenApiResource::new(manifest, config, types).with_customizers(customizers);
        Self { default, groups }
    }

    /// Resources for the groups declared in `config`
    pub fn from_config(
        manifest: Arc<ApplicationManifest>,
        config: Arc<DocConfig>,
        types: Arc<TypeResolver>,
        customizers: Customizers,
    ) -> Result<Self> {
        let groups = config
            .group_configs
            .iter()
            .map(GroupedOpenApi::from_config)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(manifest, config, types, customizers, groups))
    }

    pub fn default_resource(&self) -> &OpenApiResource {
        &self.default
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn resource(&self, group: &str) -> Result<&OpenApiResource> {
        self.groups
            .get(group)
            .ok_or_else(|| Error::InvalidArgument(format!("No OpenAPI resource found for group: {}", group)))
    }

    /// Document of `group`, or of the whole application when no group is given
    pub fn get_openapi(&self, group: Option<&str>, server_base_url: &str) -> Result<Arc<OpenApiDocument>> {
        let resource = match group {
            Some(name) => self.resource(name)?,
            None => &self.default,
        };
        Ok(resource.get_openapi(server_base_url))
    }

    pub fn reset(&self) {
        self.default.reset();
        self.groups.values().for_each(OpenApiResource::reset);
    }
}
