use crate::config::DocConfig;
use crate::manifest::{ContentDoc, Controller, HandlerMethod, ResponseDoc};
use crate::model::{Content, MediaType, Operation, Response, Schema};
use crate::operation_builder::MethodAttributes;
use crate::schema_resolver::SchemaResolver;
use crate::type_resolver::{TypeKind, TypeResolver};
use http::StatusCode;
use std::collections::BTreeMap;

/// Description of a response whose code has no reason phrase
pub const DEFAULT_DESCRIPTION: &str = "default response";

/// Reason phrase for a status code (`"404"` -> `"Not Found"`)
pub fn reason_phrase(code: &str) -> &'static str {
    StatusCode::from_bytes(code.as_bytes())
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or(DEFAULT_DESCRIPTION)
}

/// Adds `schema` under `media_type`, composing with an existing different schema as
/// `oneOf [first, new]`. A schema already present among the alternatives is not added twice.
///
/// # Arguments
///
/// * `content` - Media type map to update in place
/// * `schema` - Schema contributed by the current handler
/// * `media_type` - Key under which the schema is registered
pub fn merge_schema(content: &mut Content, schema: Schema, media_type: &str) {
    let Some(existing) = content.get_mut(media_type) else {
        content.insert(media_type.to_string(), MediaType::with_schema(schema));
        return;
    };
    existing.schema = Some(match existing.schema.take() {
        None => schema,
        Some(first) if first == schema => first,
        Some(mut composed) if is_one_of(&composed) => {
            let alternatives = composed.one_of.get_or_insert_with(Vec::new);
            if !alternatives.contains(&schema) {
                alternatives.push(schema);
            }
            composed
        }
        Some(first) => Schema {
            one_of: Some(vec![first, schema]),
            ..Default::default()
        },
    });
}

fn is_one_of(schema: &Schema) -> bool {
    schema.one_of.is_some() && schema.schema_type.is_none() && schema.reference.is_none()
}

/// Response docs of a handler: controller level, then the operation doc, then the method.
/// Later docs replace earlier ones with the same status code.
///
/// # Arguments
///
/// * `controller` - Controller owning the handler, for class level responses
/// * `handler` - Handler whose operation and method docs are read
/// * `extra` - Responses declared outside the handler, applied last
///
/// # Returns
///
/// Docs keyed by status code, in code order.
pub fn collect_response_docs<'a>(
    controller: Option<&'a Controller>,
    handler: Option<&'a HandlerMethod>,
    extra: &'a [ResponseDoc],
) -> BTreeMap<String, &'a ResponseDoc> {
    let controller_docs = controller.map(|c| c.responses.as_slice()).unwrap_or_default();
    let operation_docs = handler
        .and_then(|h| h.operation.as_ref())
        .map(|op| op.responses.as_slice())
        .unwrap_or_default();
    let method_docs = handler.map(|h| h.responses.as_slice()).unwrap_or_default();

    controller_docs
        .iter()
        .chain(extra)
        .chain(operation_docs)
        .chain(method_docs)
        .filter(|doc| !doc.response_code.trim().is_empty())
        .map(|doc| (doc.response_code.trim().to_string(), doc))
        .collect()
}

/// Builds the responses of an operation from response docs and the handler's return type
pub struct ResponseBuilder<'a> {
    config: &'a DocConfig,
    types: &'a TypeResolver,
}

impl<'a> ResponseBuilder<'a> {
    pub fn new(config: &'a DocConfig, types: &'a TypeResolver) -> Self {
        Self { config, types }
    }

    /// Schema of the documented return type, or `None` when the handler returns nothing.
    ///
    /// A `document_return_type` overrides the declared one. Wrappers are peeled until a
    /// type that carries the payload is found; opaque types document as a bare object.
    ///
    /// # Arguments
    ///
    /// * `handler` - Handler whose return type is documented
    /// * `resolver` - Registry receiving any component the return type refers to
    /// * `json_view` - View applied to model components, if any
    pub fn return_schema(
        &self,
        handler: &HandlerMethod,
        resolver: &mut SchemaResolver,
        json_view: Option<&str>,
    ) -> Option<Schema> {
        let rules = &self.config.type_rules;
        if let Some(documented) = &handler.document_return_type {
            if rules.is_void(documented) {
                return None;
            }
            return Some(resolver.resolve(documented, json_view));
        }

        let mut current = handler.return_type.as_ref()?;
        loop {
            if rules.is_void(current) {
                return None;
            }
            if rules.is_opaque(&current.name) {
                return Some(Schema::object());
            }
            match self.types.classify(current, rules) {
                TypeKind::Wrapper(Some(inner)) => current = inner,
                TypeKind::Wrapper(None) => return Some(Schema::object()),
                _ => break,
            }
        }
        Some(resolver.resolve(current, json_view))
    }

    /// Attaches documented and computed responses to `operation`.
    ///
    /// Documented responses are applied first. When there are none, a single response is
    /// created for `response_status` (default `200`). Every successful response without
    /// content then receives the return schema on each produces media type.
    ///
    /// # Arguments
    ///
    /// * `resolver` - Registry for components referenced by documented schemas
    /// * `docs` - Response docs from [`collect_response_docs`]
    /// * `return_schema` - Schema from [`ResponseBuilder::return_schema`]
    /// * `response_status` - Status declared on the handler, if any
    /// * `attrs` - Method attributes; marked as carrying response docs when any apply
    /// * `operation` - Operation receiving the responses
    pub fn build(
        &self,
        resolver: &mut SchemaResolver,
        docs: &BTreeMap<String, &ResponseDoc>,
        return_schema: Option<Schema>,
        response_status: Option<u16>,
        attrs: &mut MethodAttributes,
        operation: &mut Operation,
    ) {
        let view = attrs.json_view.clone();
        if !docs.is_empty() {
            attrs.with_api_response_doc = true;
        }
        for (code, doc) in docs {
            let response = self.response_from_doc(doc, return_schema.as_ref(), attrs, resolver, view.as_deref());
            match operation.responses.get_mut(code) {
                Some(existing) if attrs.method_overloaded => merge_response(existing, response),
                _ => {
                    operation.responses.insert(code.clone(), response);
                }
            }
        }

        if operation.responses.is_empty() || response_status.is_some() {
            let code = response_status.map_or_else(|| "200".to_string(), |s| s.to_string());
            operation.responses.entry(code).or_default();
        }

        for (code, response) in operation.responses.iter_mut() {
            if response.reference.is_some() {
                continue;
            }
            if response
                .description
                .as_deref()
                .map_or(true, |d| d.trim().is_empty())
            {
                response.description = Some(reason_phrase(code).to_string());
            }
            if response.content.as_ref().is_some_and(Content::is_empty) {
                response.content = None;
                continue;
            }
            if let Some(content) = response.content.as_mut() {
                if attrs.method_overloaded && !attrs.with_api_response_doc {
                    if let Some(schema) = &return_schema {
                        for media_type in &attrs.method_produces {
                            merge_schema(content, schema.clone(), media_type);
                        }
                    }
                }
            } else if takes_return_content(code) {
                response.content = return_schema
                    .as_ref()
                    .map(|schema| content_for(&attrs.method_produces, schema));
            }
        }
    }

    fn response_from_doc(
        &self,
        doc: &ResponseDoc,
        return_schema: Option<&Schema>,
        attrs: &MethodAttributes,
        resolver: &mut SchemaResolver,
        json_view: Option<&str>,
    ) -> Response {
        if let Some(reference) = &doc.reference {
            return Response {
                reference: Some(reference.clone()),
                ..Default::default()
            };
        }
        Response {
            description: doc.description.clone(),
            content: doc.content.as_ref().map(|entries| {
                build_content(entries, &attrs.method_produces, return_schema, resolver, json_view)
            }),
            reference: None,
        }
    }
}

/// Content for documented media types. An entry without a schema takes `fallback`.
///
/// # Arguments
///
/// * `entries` - Documented content entries
/// * `default_media_types` - Media types used for entries that name none
/// * `fallback` - Schema for entries that document no schema
/// * `resolver` - Registry for components referenced by documented schemas
/// * `json_view` - View applied to model components, if any
pub fn build_content(
    entries: &[ContentDoc],
    default_media_types: &[String],
    fallback: Option<&Schema>,
    resolver: &mut SchemaResolver,
    json_view: Option<&str>,
) -> Content {
    let mut content = Content::new();
    for entry in entries {
        let schema = entry
            .schema
            .as_ref()
            .and_then(|doc| resolver.schema_from_doc(doc, json_view))
            .or_else(|| fallback.cloned());
        let media_types = match &entry.media_type {
            Some(media_type) => std::slice::from_ref(media_type),
            None => default_media_types,
        };
        for media_type in media_types {
            content.insert(
                media_type.clone(),
                MediaType {
                    schema: schema.clone(),
                    example: entry.example.clone(),
                },
            );
        }
    }
    content
}

fn content_for(media_types: &[String], schema: &Schema) -> Content {
    media_types
        .iter()
        .map(|media_type| (media_type.clone(), MediaType::with_schema(schema.clone())))
        .collect()
}

fn takes_return_content(code: &str) -> bool {
    code.starts_with('2') || code == "default"
}

fn merge_response(existing: &mut Response, incoming: Response) {
    if existing
        .description
        .as_deref()
        .map_or(true, |d| d.trim().is_empty())
    {
        existing.description = incoming.description;
    }
    match (existing.content.as_mut(), incoming.content) {
        (Some(content), Some(incoming)) => {
            for (media_type, entry) in incoming {
                match entry.schema {
                    Some(schema) => merge_schema(content, schema, &media_type),
                    None => {
                        content.entry(media_type).or_insert(entry);
                    }
                }
            }
        }
        (None, Some(incoming)) => existing.content = Some(incoming),
        (_, None) => {}
    }
}
