//! Operation assembly.
//!
//! Every route and every router operation passes through [`OperationAssembler`], which turns
//! handler metadata into an [`Operation`] and stores it in the document under construction.
//! When a second handler maps to a path and method already built in this pass, the existing
//! operation is reused and filled incrementally rather than replaced.

use crate::config::DocConfig;
use crate::customizers::{Customizers, OperationContext};
use crate::manifest::{ApplicationManifest, Controller, HandlerMethod, OperationDoc, RequestBodyDoc};
use crate::model::{HttpMethod, OpenApiDocument, Operation, RequestBody, Tag};
use crate::operation_builder::{apply_operation_doc, split_camel_case, unique_operation_id, MethodAttributes};
use crate::parameter_builder::ParameterBuilder;
use crate::path_matcher::{PackageFilter, PathFilter};
use crate::request_body_builder::{build_request_body_from_doc, has_schema};
use crate::response_builder::{collect_response_docs, merge_schema, ResponseBuilder};
use crate::router_operation::{merge_router_operations, RouterOperation};
use crate::schema_resolver::SchemaResolver;
use crate::security::effective_security;
use crate::type_resolver::TypeResolver;
use log::{debug, error};
use std::borrow::Cow;
use std::collections::HashSet;

/// Where the operation for a path and method stands when a handler is applied to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    New,
    /// Built from router documentation alone
    ExistingFromDoc,
    /// Already built from another handler in this pass
    ExistingFromOverload,
}

pub struct OperationAssembler<'a> {
    config: &'a DocConfig,
    types: &'a TypeResolver,
    customizers: &'a Customizers,
    path_filter: &'a PathFilter,
    package_filter: &'a PackageFilter,
    handled: HashSet<(String, HttpMethod)>,
}

impl<'a> OperationAssembler<'a> {
    pub fn new(
        config: &'a DocConfig,
        types: &'a TypeResolver,
        customizers: &'a Customizers,
        path_filter: &'a PathFilter,
        package_filter: &'a PackageFilter,
    ) -> Self {
        Self {
            config,
            types,
            customizers,
            path_filter,
            package_filter,
            handled: HashSet::new(),
        }
    }

    pub fn state(&self, document: &OpenApiDocument, path: &str, method: HttpMethod) -> OperationState {
        if self.handled.contains(&(path.to_string(), method)) {
            OperationState::ExistingFromOverload
        } else if document.operation(path, method).is_some() {
            OperationState::ExistingFromDoc
        } else {
            OperationState::New
        }
    }

    fn is_controller_included(&self, controller: &Controller) -> bool {
        !controller.hidden
            && !self.config.type_rules.hidden_controllers.contains(&controller.name)
            && self.package_filter.matches(&controller.package)
    }

    /// Builds an operation for every route of the manifest
    pub fn calculate_routes(
        &mut self,
        document: &mut OpenApiDocument,
        resolver: &mut SchemaResolver,
        manifest: &ApplicationManifest,
    ) {
        for route in &manifest.routes {
            let Some(controller) = manifest.controller(&route.controller) else {
                error!(
                    "Route {} {} names unknown controller {}",
                    route.method, route.path, route.controller
                );
                continue;
            };
            if !self.is_controller_included(controller) {
                debug!("Controller {} excluded, skipping {}", controller.name, route.path);
                continue;
            }
            if !route.path.starts_with('/') {
                debug!("Route path {} is not absolute, skipped", route.path);
                continue;
            }
            let operation = RouterOperation::from_route(route);
            if !self.path_filter.matches(&operation.path) {
                debug!("Path {} filtered out", operation.path);
                continue;
            }
            let Some(handler) = controller.method(&route.handler, &route.parameter_types) else {
                error!(
                    "Route {} {} names unknown handler {}::{}",
                    route.method, route.path, controller.name, route.handler
                );
                continue;
            };
            self.calculate_path(document, resolver, &operation, Some(controller), handler);
        }
    }

    /// Builds the operations of routers declared as data
    pub fn calculate_router_paths(
        &mut self,
        document: &mut OpenApiDocument,
        resolver: &mut SchemaResolver,
        manifest: &ApplicationManifest,
    ) {
        for router in &manifest.routers {
            for operation in merge_router_operations(&router.operations, &router.functions) {
                if !self.path_filter.matches(&operation.path) {
                    debug!("Path {} filtered out", operation.path);
                    continue;
                }
                match (&operation.controller, &operation.handler) {
                    (Some(controller_name), Some(handler_name)) => {
                        let Some(controller) = manifest.controller(controller_name) else {
                            error!(
                                "Router operation {} names unknown controller {}",
                                operation.path, controller_name
                            );
                            continue;
                        };
                        if !self.is_controller_included(controller) {
                            continue;
                        }
                        let Some(handler) = controller.method(handler_name, &operation.parameter_types) else {
                            error!(
                                "Router operation {} names unknown handler {}::{}",
                                operation.path, controller_name, handler_name
                            );
                            continue;
                        };
                        self.calculate_path(document, resolver, &operation, Some(controller), handler);
                    }
                    _ => match &operation.operation {
                        Some(doc) if doc.operation_id.as_deref().is_some_and(|id| !id.trim().is_empty()) => {
                            self.calculate_path_from_doc(document, resolver, &operation, doc);
                        }
                        _ => debug!(
                            "Router operation {} has neither a handler nor an operation id, skipped",
                            operation.path
                        ),
                    },
                }
            }
        }
    }

    /// Builds the operation of `handler` for every method of `route`
    pub fn calculate_path(
        &mut self,
        document: &mut OpenApiDocument,
        resolver: &mut SchemaResolver,
        route: &RouterOperation,
        controller: Option<&Controller>,
        handler: &HandlerMethod,
    ) {
        let handler = with_router_doc(handler, route);
        if handler.is_hidden() {
            debug!("Handler {} is hidden", handler.name);
            return;
        }
        for &method in &route.methods {
            self.calculate_operation(document, resolver, route, method, controller, &handler);
        }
    }

    fn calculate_operation(
        &mut self,
        document: &mut OpenApiDocument,
        resolver: &mut SchemaResolver,
        route: &RouterOperation,
        method: HttpMethod,
        controller: Option<&Controller>,
        handler: &HandlerMethod,
    ) {
        let path = route.path.as_str();
        let state = self.state(document, path, method);
        debug!("Building {} {} from {} ({:?})", method, path, handler.name, state);

        let mut operation = take_operation(document, path, method);
        let mut attrs = MethodAttributes::new(self.config);
        attrs.method_overloaded = state == OperationState::ExistingFromOverload;

        if handler.is_deprecated() {
            operation.deprecated = Some(true);
        }

        attrs.calculate_consumes_produces(
            &[route.consumes.as_slice(), handler.consumes.as_slice()],
            &[route.produces.as_slice(), handler.produces.as_slice()],
        );
        let headers: Vec<String> = route.headers.iter().chain(&handler.headers).cloned().collect();
        attrs.calculate_headers(&headers);
        attrs.calculate_query_params(&handler.query_params);
        attrs.query_params.extend(route.query_params.clone());
        let ignore_view = handler.operation.as_ref().is_some_and(|op| op.ignore_json_view);
        if !ignore_view {
            attrs.json_view = handler.json_view.clone();
        }

        let operation_doc = handler.operation.as_ref();
        if let Some(doc) = operation_doc {
            apply_operation_doc(doc, &mut operation);
        }

        self.calculate_tags(document, controller, handler, &mut operation);
        let method_security = handler
            .security
            .as_deref()
            .or_else(|| operation_doc.and_then(|op| op.security.as_deref()));
        let class_security = controller.and_then(|c| c.security.as_deref());
        if operation.security.is_none() {
            operation.security = effective_security(method_security, class_security);
        }

        let body_doc = handler
            .request_body
            .as_ref()
            .or_else(|| operation_doc.and_then(|op| op.request_body.as_ref()));
        apply_request_body_doc(body_doc, &mut attrs, resolver, &mut operation);

        ParameterBuilder::new(self.config, self.types, &self.customizers.parameter).build(
            resolver,
            controller,
            handler,
            method,
            &attrs,
            &mut operation,
        );

        let responses = ResponseBuilder::new(self.config, self.types);
        let response_docs = collect_response_docs(controller, Some(handler), &[]);
        let return_schema = responses.return_schema(handler, resolver, attrs.json_view.as_deref());
        responses.build(
            resolver,
            &response_docs,
            return_schema,
            handler.response_status,
            &mut attrs,
            &mut operation,
        );

        if operation.summary.as_deref().map_or(true, |s| s.trim().is_empty()) {
            operation.summary = Some(handler.name.clone());
        }

        let context = OperationContext {
            path,
            method,
            controller,
            handler: Some(handler),
        };
        self.publish(document, operation, &handler.name, attrs.method_overloaded, &context);
        self.handled.insert((path.to_string(), method));
    }

    /// Builds an operation described only by router documentation
    pub fn calculate_path_from_doc(
        &mut self,
        document: &mut OpenApiDocument,
        resolver: &mut SchemaResolver,
        route: &RouterOperation,
        doc: &OperationDoc,
    ) {
        if doc.hidden {
            return;
        }
        if route.methods.is_empty() {
            debug!("Router operation {} declares no method, skipped", route.path);
            return;
        }
        let path = route.path.as_str();
        let fallback_id = doc.operation_id.clone().unwrap_or_default();

        for &method in &route.methods {
            let state = self.state(document, path, method);
            let mut operation = take_operation(document, path, method);
            let mut attrs = MethodAttributes::new(self.config);
            attrs.method_overloaded = state == OperationState::ExistingFromOverload;
            attrs.calculate_consumes_produces(&[route.consumes.as_slice()], &[route.produces.as_slice()]);
            attrs.calculate_headers(&route.headers);
            attrs.query_params.extend(route.query_params.clone());

            apply_operation_doc(doc, &mut operation);
            if operation.security.is_none() {
                operation.security = effective_security(doc.security.as_deref(), None);
            }
            apply_request_body_doc(doc.request_body.as_ref(), &mut attrs, resolver, &mut operation);

            ParameterBuilder::new(self.config, self.types, &self.customizers.parameter).build_from_docs(
                resolver,
                &doc.parameters,
                &attrs,
                &mut operation,
            );
            let response_docs = collect_response_docs(None, None, &doc.responses);
            ResponseBuilder::new(self.config, self.types).build(
                resolver,
                &response_docs,
                None,
                None,
                &mut attrs,
                &mut operation,
            );

            let context = OperationContext {
                path,
                method,
                controller: None,
                handler: None,
            };
            self.publish(document, operation, &fallback_id, attrs.method_overloaded, &context);
        }
    }

    /// Existing operation tags, then method tags, then controller tags, without repeats.
    /// Tags that carry a description are also declared on the document.
    fn calculate_tags(
        &self,
        document: &mut OpenApiDocument,
        controller: Option<&Controller>,
        handler: &HandlerMethod,
        operation: &mut Operation,
    ) {
        let controller_tags = controller.map(|c| c.tags.as_slice()).unwrap_or_default();
        for tag in handler.tags.iter().chain(controller_tags) {
            if tag.name.trim().is_empty() {
                continue;
            }
            if !operation.tags.contains(&tag.name) {
                operation.tags.push(tag.name.clone());
            }
            if tag.description.is_some() {
                document.add_tag(Tag {
                    name: tag.name.clone(),
                    description: tag.description.clone(),
                });
            }
        }
        if operation.tags.is_empty() && self.config.auto_tag_classes {
            if let Some(controller) = controller {
                operation.tags.push(split_camel_case(&controller.name));
            }
        }
    }

    /// De-duplicates the operation id, runs operation customizers and stores the operation
    fn publish(
        &self,
        document: &mut OpenApiDocument,
        mut operation: Operation,
        fallback_id: &str,
        overloaded: bool,
        context: &OperationContext<'_>,
    ) {
        let keeps_id = overloaded && operation.operation_id.is_some();
        if !keeps_id {
            let candidate = operation
                .operation_id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| fallback_id.to_string());
            if !candidate.is_empty() {
                operation.operation_id = Some(unique_operation_id(
                    &candidate,
                    document,
                    (context.path, context.method),
                ));
            }
        }

        for customizer in &self.customizers.operation {
            customizer.customize(&mut operation, context);
        }

        document
            .paths
            .entry(context.path.to_string())
            .or_default()
            .set_operation(context.method, operation);
    }
}

/// A handler carrying the router's operation doc when it has none of its own
fn with_router_doc<'h>(handler: &'h HandlerMethod, route: &RouterOperation) -> Cow<'h, HandlerMethod> {
    match (&handler.operation, &route.operation) {
        (None, Some(doc)) => Cow::Owned(HandlerMethod {
            operation: Some(doc.clone()),
            ..handler.clone()
        }),
        _ => Cow::Borrowed(handler),
    }
}

fn take_operation(document: &mut OpenApiDocument, path: &str, method: HttpMethod) -> Operation {
    document
        .paths
        .get_mut(path)
        .and_then(|item| item.take_operation(method))
        .unwrap_or_default()
}

/// Applies a documented request body. An operation that already has a body keeps its
/// description and requirement; documented content is composed with what is there.
fn apply_request_body_doc(
    doc: Option<&RequestBodyDoc>,
    attrs: &mut MethodAttributes,
    resolver: &mut SchemaResolver,
    operation: &mut Operation,
) {
    let Some(body) = doc.and_then(|doc| build_request_body_from_doc(doc, attrs, resolver)) else {
        return;
    };
    attrs.with_request_body_schema_doc = has_schema(&body);
    match operation.request_body.as_mut() {
        None => operation.request_body = Some(body),
        Some(existing) => merge_request_body(existing, body),
    }
}

fn merge_request_body(existing: &mut RequestBody, incoming: RequestBody) {
    if existing.description.is_none() {
        existing.description = incoming.description;
    }
    existing.required = existing.required.or(incoming.required);
    for (media_type, entry) in incoming.content {
        match entry.schema {
            Some(schema) => merge_schema(&mut existing.content, schema, &media_type),
            None => {
                existing.content.entry(media_type).or_insert(entry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customizers::operation_customizer;
    use crate::manifest::{
        BindingAnnotation, BindingSource, MethodParameter, Route, RouterDefinition, RouterOperationDoc,
        SecurityRequirementDoc, TagDoc,
    };
    use crate::model::{ParameterLocation, Schema};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct Fixture {
        config: Arc<DocConfig>,
        types: Arc<TypeResolver>,
        customizers: Customizers,
        path_filter: PathFilter,
        package_filter: PackageFilter,
    }

    impl Fixture {
        fn new(config: DocConfig) -> Self {
            let path_filter = PathFilter::for_group(&config, None);
            let package_filter = PackageFilter::for_group(&config, None);
            Self {
                config: Arc::new(config),
                types: Arc::new(TypeResolver::default()),
                customizers: Customizers::default(),
                path_filter,
                package_filter,
            }
        }

        fn build(&self, manifest: &ApplicationManifest) -> OpenApiDocument {
            let mut document = OpenApiDocument::default();
            let mut resolver = SchemaResolver::new(Arc::clone(&self.types), Arc::clone(&self.config));
            let mut assembler = OperationAssembler::new(
                &self.config,
                &self.types,
                &self.customizers,
                &self.path_filter,
                &self.package_filter,
            );
            assembler.calculate_routes(&mut document, &mut resolver, manifest);
            assembler.calculate_router_paths(&mut document, &mut resolver, manifest);
            document
        }
    }

    fn route(method: HttpMethod, path: &str, controller: &str, handler: &str) -> Route {
        Route {
            method,
            path: path.to_string(),
            controller: controller.to_string(),
            handler: handler.to_string(),
            parameter_types: Vec::new(),
        }
    }

    fn path_param(name: &str, ty: &str) -> MethodParameter {
        let mut parameter = MethodParameter::new(name, ty.parse().unwrap());
        parameter.bindings.push(BindingAnnotation {
            source: BindingSource::Path,
            name: None,
            required: None,
            default_value: None,
        });
        parameter
    }

    fn handler(name: &str, parameters: Vec<MethodParameter>, returns: Option<&str>) -> HandlerMethod {
        HandlerMethod {
            name: name.to_string(),
            parameters,
            return_type: returns.map(|r| r.parse().unwrap()),
            ..Default::default()
        }
    }

    fn manifest(controller: Controller, routes: Vec<Route>) -> ApplicationManifest {
        ApplicationManifest {
            routes,
            controllers: vec![controller],
            ..Default::default()
        }
    }

    #[test]
    fn test_get_by_id() {
        let controller = Controller {
            name: "ItemController".to_string(),
            methods: vec![handler("get_item", vec![path_param("id", "i64")], Some("String"))],
            ..Default::default()
        };
        let manifest = manifest(
            controller,
            vec![route(HttpMethod::Get, "/items/:id", "ItemController", "get_item")],
        );
        let document = Fixture::new(DocConfig::default()).build(&manifest);

        let operation = document.operation("/items/{id}", HttpMethod::Get).unwrap();
        assert_eq!(operation.operation_id.as_deref(), Some("get_item"));
        assert_eq!(operation.summary.as_deref(), Some("get_item"));
        assert_eq!(operation.tags, vec!["item-controller".to_string()]);
        assert_eq!(operation.parameters[0].location, Some(ParameterLocation::Path));
        let ok = &operation.responses["200"];
        assert_eq!(ok.description.as_deref(), Some("OK"));
        assert_eq!(ok.content.as_ref().unwrap()["*/*"].schema, Some(Schema::string()));
    }

    #[test]
    fn test_overloads_compose_one_of() {
        let controller = Controller {
            name: "SearchController".to_string(),
            methods: vec![
                handler("by_id", vec![], Some("i64")),
                handler("by_name", vec![], Some("String")),
            ],
            ..Default::default()
        };
        let manifest = manifest(
            controller,
            vec![
                route(HttpMethod::Get, "/search", "SearchController", "by_id"),
                route(HttpMethod::Get, "/search", "SearchController", "by_name"),
            ],
        );
        let document = Fixture::new(DocConfig::default()).build(&manifest);

        let operation = document.operation("/search", HttpMethod::Get).unwrap();
        assert_eq!(operation.operation_id.as_deref(), Some("by_id"));
        let schema = operation.responses["200"].content.as_ref().unwrap()["*/*"]
            .schema
            .clone()
            .unwrap();
        assert_eq!(
            schema.one_of,
            Some(vec![Schema::with_format("integer", "int64"), Schema::string()])
        );
    }

    #[test]
    fn test_duplicate_operation_ids_are_suffixed() {
        let controller = Controller {
            name: "ItemController".to_string(),
            methods: vec![handler("list", vec![], None)],
            ..Default::default()
        };
        let manifest = manifest(
            controller,
            vec![
                route(HttpMethod::Get, "/items", "ItemController", "list"),
                route(HttpMethod::Get, "/archive", "ItemController", "list"),
            ],
        );
        let document = Fixture::new(DocConfig::default()).build(&manifest);

        assert_eq!(
            document.operation("/items", HttpMethod::Get).unwrap().operation_id.as_deref(),
            Some("list")
        );
        assert_eq!(
            document.operation("/archive", HttpMethod::Get).unwrap().operation_id.as_deref(),
            Some("list_1")
        );
    }

    #[test]
    fn test_tags_and_security() {
        let mut open = handler("open", vec![], None);
        open.security = Some(Vec::new());
        let mut tagged = handler("tagged", vec![], None);
        tagged.tags = vec![TagDoc {
            name: "items".to_string(),
            description: Some("Item operations".to_string()),
        }];
        let controller = Controller {
            name: "ItemController".to_string(),
            tags: vec![TagDoc {
                name: "catalog".to_string(),
                description: None,
            }],
            security: Some(vec![SecurityRequirementDoc {
                name: "bearer".to_string(),
                scopes: Vec::new(),
            }]),
            methods: vec![open, tagged],
            ..Default::default()
        };
        let manifest = manifest(
            controller,
            vec![
                route(HttpMethod::Get, "/open", "ItemController", "open"),
                route(HttpMethod::Get, "/tagged", "ItemController", "tagged"),
            ],
        );
        let document = Fixture::new(DocConfig::default()).build(&manifest);

        let open = document.operation("/open", HttpMethod::Get).unwrap();
        assert_eq!(open.security, Some(Vec::new()));
        assert_eq!(open.tags, vec!["catalog".to_string()]);

        let tagged = document.operation("/tagged", HttpMethod::Get).unwrap();
        assert_eq!(tagged.tags, vec!["items".to_string(), "catalog".to_string()]);
        assert_eq!(tagged.security.as_ref().unwrap()[0].keys().collect::<Vec<_>>(), vec!["bearer"]);
        assert_eq!(document.tags.len(), 1);
        assert_eq!(document.tags[0].name, "items");
    }

    #[test]
    fn test_filters_and_unknown_references() {
        let mut config = DocConfig::default();
        config.paths_to_exclude = vec!["/internal/**".to_string()];
        let controller = Controller {
            name: "ItemController".to_string(),
            methods: vec![handler("list", vec![], None), handler("debug", vec![], None)],
            ..Default::default()
        };
        let manifest = manifest(
            controller,
            vec![
                route(HttpMethod::Get, "/items", "ItemController", "list"),
                route(HttpMethod::Get, "/internal/debug", "ItemController", "debug"),
                route(HttpMethod::Get, "/missing", "ItemController", "nope"),
                route(HttpMethod::Get, "/other", "OtherController", "list"),
                route(HttpMethod::Get, "relative", "ItemController", "list"),
            ],
        );
        let document = Fixture::new(config).build(&manifest);

        assert_eq!(document.paths.keys().collect::<Vec<_>>(), vec!["/items"]);
    }

    #[test]
    fn test_hidden_handlers_and_controllers() {
        let mut hidden = handler("hidden", vec![], None);
        hidden.hidden = true;
        let controller = Controller {
            name: "ItemController".to_string(),
            methods: vec![hidden, handler("shown", vec![], None)],
            ..Default::default()
        };
        let manifest = manifest(
            controller,
            vec![
                route(HttpMethod::Get, "/hidden", "ItemController", "hidden"),
                route(HttpMethod::Get, "/shown", "ItemController", "shown"),
            ],
        );

        let document = Fixture::new(DocConfig::default()).build(&manifest);
        assert_eq!(document.paths.keys().collect::<Vec<_>>(), vec!["/shown"]);

        let mut config = DocConfig::default();
        config.type_rules.hide_controller("ItemController");
        assert!(Fixture::new(config).build(&manifest).paths.is_empty());
    }

    #[test]
    fn test_router_operations() {
        let controller = Controller {
            name: "ItemController".to_string(),
            methods: vec![handler("list", vec![], Some("String"))],
            ..Default::default()
        };
        let router = RouterDefinition {
            operations: vec![
                RouterOperationDoc {
                    path: "/router/items".to_string(),
                    methods: vec![HttpMethod::Get],
                    controller: Some("ItemController".to_string()),
                    handler: Some("list".to_string()),
                    ..Default::default()
                },
                RouterOperationDoc {
                    path: "/router/missing".to_string(),
                    methods: vec![HttpMethod::Get],
                    controller: Some("ItemController".to_string()),
                    handler: Some("nope".to_string()),
                    ..Default::default()
                },
                RouterOperationDoc {
                    path: "/router/health".to_string(),
                    methods: vec![HttpMethod::Get],
                    operation: Some(OperationDoc {
                        operation_id: Some("health".to_string()),
                        summary: Some("Health check".to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ],
            functions: Vec::new(),
        };
        let manifest = ApplicationManifest {
            controllers: vec![controller],
            routers: vec![router],
            ..Default::default()
        };
        let document = Fixture::new(DocConfig::default()).build(&manifest);

        assert_eq!(
            document.paths.keys().collect::<Vec<_>>(),
            vec!["/router/health", "/router/items"]
        );
        let health = document.operation("/router/health", HttpMethod::Get).unwrap();
        assert_eq!(health.operation_id.as_deref(), Some("health"));
        assert_eq!(health.summary.as_deref(), Some("Health check"));
        assert_eq!(health.responses["200"].description.as_deref(), Some("OK"));
        assert!(health.responses["200"].content.is_none());
    }

    #[test]
    fn test_operation_customizers_run_last() {
        let controller = Controller {
            name: "ItemController".to_string(),
            methods: vec![handler("list", vec![], None)],
            ..Default::default()
        };
        let manifest = manifest(
            controller,
            vec![route(HttpMethod::Get, "/items", "ItemController", "list")],
        );
        let mut fixture = Fixture::new(DocConfig::default());
        fixture.customizers.operation.push(operation_customizer(|operation, context| {
            operation.description = Some(format!("{} {}", context.method, context.path));
            operation.summary = None;
        }));
        let document = fixture.build(&manifest);

        let operation = document.operation("/items", HttpMethod::Get).unwrap();
        assert_eq!(operation.description.as_deref(), Some("GET /items"));
        assert_eq!(operation.summary, None);
    }
}
