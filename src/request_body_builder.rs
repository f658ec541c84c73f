use crate::manifest::RequestBodyDoc;
use crate::model::{Content, RequestBody, Schema};
use crate::operation_builder::MethodAttributes;
use crate::response_builder::{build_content, merge_schema};
use crate::schema_resolver::SchemaResolver;
use crate::validation::{self, Validation};

pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// A handler parameter that contributes to the request body
#[derive(Debug, Clone)]
pub struct BodyParameter<'a> {
    pub name: String,
    pub schema: Schema,
    pub description: Option<String>,
    pub validations: &'a [Validation],
    pub optional: bool,
    /// Carries annotations or validations, which makes a mandatory body required
    pub annotated: bool,
}

/// Request body under construction for one operation
#[derive(Debug, Clone, Default)]
pub struct RequestBodyInfo {
    request_body: Option<RequestBody>,
    /// Object schema holding one property per body parameter seen so far
    merged_schema: Option<Schema>,
    file_upload: bool,
    parameter_count: usize,
    /// Content contributed by earlier overloads, composed with this handler's schema
    overload_base: Option<Content>,
}

impl RequestBodyInfo {
    pub fn new(request_body: Option<RequestBody>, overloaded: bool) -> Self {
        let overload_base = if overloaded {
            request_body.as_ref().map(|body| body.content.clone())
        } else {
            None
        };
        Self {
            request_body,
            overload_base,
            ..Default::default()
        }
    }

    pub fn request_body(&self) -> Option<&RequestBody> {
        self.request_body.as_ref()
    }

    pub fn merged_schema(&self) -> Option<&Schema> {
        self.merged_schema.as_ref()
    }

    pub fn into_request_body(self) -> Option<RequestBody> {
        self.request_body
    }
}

/// Request body described by a doc. Content entries without a media type are registered
/// under every consumed media type.
///
/// # Arguments
///
/// * `doc` - Request body documentation
/// * `attrs` - Method attributes supplying the consumed media types and view
/// * `resolver` - Registry for components referenced by documented schemas
///
/// # Returns
///
/// `None` when the doc has no description, no required flag and no content.
pub fn build_request_body_from_doc(
    doc: &RequestBodyDoc,
    attrs: &MethodAttributes,
    resolver: &mut SchemaResolver,
) -> Option<RequestBody> {
    let content = build_content(
        &doc.content,
        &attrs.method_consumes,
        None,
        resolver,
        attrs.json_view.as_deref(),
    );
    if doc.description.is_none() && doc.required.is_none() && content.is_empty() {
        return None;
    }
    Some(RequestBody {
        description: doc.description.clone(),
        content,
        required: doc.required,
    })
}

/// Whether any content entry of `body` carries a schema
pub fn has_schema(body: &RequestBody) -> bool {
    body.content.values().any(|media_type| media_type.schema.is_some())
}

/// Folds one body parameter into the request body.
///
/// The first parameter's schema is used as is. From the second parameter on, the body is an
/// object with one property per parameter. A file parameter always produces such an object,
/// sent as `multipart/form-data` unless the handler declares what it consumes.
///
/// # Arguments
///
/// * `info` - Body under construction, updated in place
/// * `parameter` - Parameter decided to be a body candidate
/// * `attrs` - Method attributes; a documented body schema suppresses the computed one
/// * `resolver` - Registry holding the components a parameter description may land on
pub fn calculate_request_body_info(
    info: &mut RequestBodyInfo,
    parameter: BodyParameter<'_>,
    attrs: &MethodAttributes,
    resolver: &mut SchemaResolver,
) {
    let body = info.request_body.get_or_insert_with(RequestBody::default);
    let required = validation::body_required(parameter.validations, parameter.optional, parameter.annotated);
    if body.required.is_none() && required {
        body.required = Some(true);
    }
    if attrs.with_request_body_schema_doc {
        return;
    }

    let mut property = parameter.schema;
    describe(&mut property, parameter.description, resolver);
    validation::apply_to_schema(&mut property, parameter.validations);
    let is_file = property.is_file_or_file_array();
    info.file_upload |= is_file;
    info.parameter_count += 1;

    let merged = info.merged_schema.get_or_insert_with(Schema::object);
    merged.add_property(&parameter.name, property.clone());
    let schema = if info.parameter_count > 1 || is_file {
        merged.clone()
    } else {
        property
    };

    let media_types: Vec<String> = if info.file_upload && !attrs.consumes_declared {
        body.content.retain(|media_type, _| !attrs.method_consumes.contains(media_type));
        vec![MULTIPART_FORM_DATA.to_string()]
    } else {
        attrs.method_consumes.clone()
    };

    match &info.overload_base {
        Some(base) => {
            let mut content = base.clone();
            for media_type in &media_types {
                merge_schema(&mut content, schema.clone(), media_type);
            }
            body.content = content;
        }
        None => {
            for media_type in media_types {
                body.content.entry(media_type).or_default().schema = Some(schema.clone());
            }
        }
    }
}

/// Puts a parameter description on the property, or on the component it refers to
fn describe(schema: &mut Schema, description: Option<String>, resolver: &mut SchemaResolver) {
    let Some(description) = description else {
        return;
    };
    match schema.ref_name().map(str::to_string) {
        Some(component) => {
            if let Some(target) = resolver.component_mut(&component) {
                if target.description.is_none() {
                    target.description = Some(description);
                }
            }
        }
        None => {
            if schema.description.is_none() {
                schema.description = Some(description);
            }
        }
    }
}
