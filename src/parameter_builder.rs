//! Operation parameters and request body from handler parameters.
//!
//! Each handler parameter is classified once into a [`BindingKind`]. Non-body kinds become
//! OpenAPI parameters; body candidates are folded into the request body. Explicit parameter
//! documentation always wins: computed values only fill fields the documentation left blank.

use crate::config::DocConfig;
use crate::customizers::ParameterCustomizer;
use crate::manifest::{
    BindingAnnotation, BindingSource, Controller, HandlerMethod, MethodParameter, ModelDefinition,
    ParameterDoc, TypeDescriptor,
};
use crate::model::{HttpMethod, Operation, Parameter, ParameterLocation, Schema};
use crate::operation_builder::MethodAttributes;
use crate::request_body_builder::{calculate_request_body_info, BodyParameter, RequestBodyInfo};
use crate::schema_resolver::{typed_value, SchemaResolver};
use crate::type_resolver::{apply_rename_rule, TypeKind, TypeResolver};
use crate::validation;
use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Where a handler parameter's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Header,
    Query,
    Path,
    Cookie,
    Body,
}

impl BindingKind {
    /// Binding annotations decide first, by precedence header, query (files excepted), path,
    /// cookie. Then a documented path location, then query for GET and parameter objects.
    /// Anything else is a body candidate.
    pub fn decide(
        parameter: &MethodParameter,
        doc_location: Option<ParameterLocation>,
        method: HttpMethod,
        is_file: bool,
    ) -> Self {
        if parameter.binding(BindingSource::Header).is_some() {
            return BindingKind::Header;
        }
        if parameter.binding(BindingSource::Query).is_some() && !is_file {
            return BindingKind::Query;
        }
        if parameter.binding(BindingSource::Path).is_some() {
            return BindingKind::Path;
        }
        if parameter.binding(BindingSource::Cookie).is_some() {
            return BindingKind::Cookie;
        }
        match doc_location {
            Some(ParameterLocation::Path) => BindingKind::Path,
            _ if method == HttpMethod::Get || parameter.parameter_object => BindingKind::Query,
            _ => BindingKind::Body,
        }
    }

    pub fn location(self) -> Option<ParameterLocation> {
        match self {
            BindingKind::Header => Some(ParameterLocation::Header),
            BindingKind::Query => Some(ParameterLocation::Query),
            BindingKind::Path => Some(ParameterLocation::Path),
            BindingKind::Cookie => Some(ParameterLocation::Cookie),
            BindingKind::Body => None,
        }
    }

    fn source(self) -> Option<BindingSource> {
        match self {
            BindingKind::Header => Some(BindingSource::Header),
            BindingKind::Query => Some(BindingSource::Query),
            BindingKind::Path => Some(BindingSource::Path),
            BindingKind::Cookie => Some(BindingSource::Cookie),
            BindingKind::Body => None,
        }
    }
}

/// Computed facts about one handler parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub name: Option<String>,
    pub kind: BindingKind,
    pub required: bool,
    pub deprecated: bool,
    pub default_value: Option<String>,
    /// Parameter built from explicit documentation, if any
    pub doc_parameter: Option<Parameter>,
}

impl ParameterInfo {
    pub fn new(parameter: &MethodParameter, kind: BindingKind, doc_parameter: Option<Parameter>) -> Self {
        let binding: Option<&BindingAnnotation> = kind.source().and_then(|s| parameter.binding(s));
        let name = binding
            .and_then(|b| b.name.clone())
            .filter(|n| !n.trim().is_empty())
            .or_else(|| parameter.name.clone());
        let default_value = binding
            .and_then(|b| b.default_value.clone())
            .or_else(|| parameter.default_value.clone());
        let required = match kind {
            BindingKind::Path => true,
            BindingKind::Header => {
                binding.and_then(|b| b.required).unwrap_or(false)
                    && !is_optional(parameter)
                    && default_value.is_none()
            }
            _ => {
                binding.and_then(|b| b.required).unwrap_or(true)
                    && !is_optional(parameter)
                    && default_value.is_none()
            }
        };
        Self {
            name,
            kind,
            required,
            deprecated: parameter.deprecated,
            default_value,
            doc_parameter,
        }
    }
}

fn is_optional(parameter: &MethodParameter) -> bool {
    parameter.optional || parameter.ty.name == "Option"
}

/// The parameter docs that apply to one handler: controller level, then method level, then
/// the operation doc. A later doc with the same name replaces an earlier one in place.
#[derive(Debug, Default)]
struct ParameterDocs<'d> {
    docs: Vec<&'d ParameterDoc>,
}

impl<'d> ParameterDocs<'d> {
    fn collect(controller: Option<&'d Controller>, handler: &'d HandlerMethod) -> Self {
        let controller_docs = controller.map(|c| c.parameter_docs.as_slice()).unwrap_or_default();
        let mut docs = Self::default();
        for doc in controller_docs
            .iter()
            .chain(&handler.parameter_docs)
            .chain(handler.operation.iter().flat_map(|op| &op.parameters))
        {
            docs.insert(doc);
        }
        docs
    }

    fn insert(&mut self, doc: &'d ParameterDoc) {
        let existing = named(doc).and_then(|name| self.docs.iter().position(|d| named(d) == Some(name)));
        match existing {
            Some(index) => self.docs[index] = doc,
            None => self.docs.push(doc),
        }
    }

    fn get(&self, name: &str) -> Option<&'d ParameterDoc> {
        self.docs.iter().copied().find(|d| named(d) == Some(name))
    }
}

fn named(doc: &ParameterDoc) -> Option<&str> {
    doc.name.as_deref().filter(|n| !n.trim().is_empty())
}

pub struct ParameterBuilder<'a> {
    config: &'a DocConfig,
    types: &'a TypeResolver,
    customizers: &'a [Arc<dyn ParameterCustomizer>],
}

impl<'a> ParameterBuilder<'a> {
    pub fn new(
        config: &'a DocConfig,
        types: &'a TypeResolver,
        customizers: &'a [Arc<dyn ParameterCustomizer>],
    ) -> Self {
        Self {
            config,
            types,
            customizers,
        }
    }

    /// Hidden by annotation, or a framework type that carries no request data. Parameters
    /// bound to the path or query string are always kept.
    pub fn is_ignored(&self, parameter: &MethodParameter) -> bool {
        let rules = &self.config.type_rules;
        if parameter
            .annotations
            .iter()
            .any(|a| rules.ignored_annotations.contains(a))
        {
            return true;
        }
        if parameter.binding(BindingSource::Path).is_some() || parameter.binding(BindingSource::Query).is_some() {
            return false;
        }
        rules.is_ignored_parameter_type(&parameter.ty.name)
    }

    fn is_file(&self, ty: &TypeDescriptor) -> bool {
        match self.types.classify(ty, &self.config.type_rules) {
            TypeKind::File => true,
            TypeKind::Array { items: Some(items), .. } => self.is_file(items),
            TypeKind::Wrapper(Some(inner)) => self.is_file(inner),
            _ => false,
        }
    }

    /// Parameter described by explicit documentation. Path parameters are always required.
    pub fn parameter_from_doc(
        &self,
        doc: &ParameterDoc,
        resolver: &mut SchemaResolver,
        json_view: Option<&str>,
    ) -> Parameter {
        let required = match doc.location {
            Some(ParameterLocation::Path) => Some(true),
            _ => doc.required,
        };
        Parameter {
            name: named(doc).map(str::to_string),
            location: doc.location,
            description: doc.description.clone(),
            required,
            deprecated: doc.deprecated,
            allow_empty_value: doc.allow_empty_value,
            allow_reserved: doc.allow_reserved,
            style: doc.style,
            explode: doc.explode,
            schema: doc
                .schema
                .as_ref()
                .and_then(|schema| resolver.schema_from_doc(schema, json_view)),
            example: doc.example.clone(),
            reference: doc.reference.clone(),
        }
    }

    /// Starts from the documented parameter and fills its blanks with computed values
    pub fn build_param(
        &self,
        info: &ParameterInfo,
        ty: &TypeDescriptor,
        resolver: &mut SchemaResolver,
        json_view: Option<&str>,
    ) -> Parameter {
        let mut parameter = info.doc_parameter.clone().unwrap_or_default();
        if parameter.name.is_none() {
            parameter.name = info.name.clone();
        }
        if parameter.location.is_none() {
            parameter.location = info.kind.location();
        }
        if parameter.required.is_none() {
            parameter.required = Some(info.required);
        }
        if parameter.deprecated.is_none() && info.deprecated {
            parameter.deprecated = Some(true);
        }
        if parameter.schema.is_none() && parameter.reference.is_none() {
            let mut schema = resolver.resolve(ty, json_view);
            if let Some(raw) = &info.default_value {
                if schema.default.is_none() && schema.reference.is_none() {
                    schema.default = Some(typed_value(&schema, raw));
                }
            }
            parameter.schema = Some(schema);
        }
        parameter
    }

    /// Builds the parameters and request body of `operation` from a handler signature
    pub fn build(
        &self,
        resolver: &mut SchemaResolver,
        controller: Option<&Controller>,
        handler: &HandlerMethod,
        method: HttpMethod,
        attrs: &MethodAttributes,
        operation: &mut Operation,
    ) {
        let view = attrs.json_view.as_deref();
        let docs = ParameterDocs::collect(controller, handler);
        let mut consumed: HashSet<String> = HashSet::new();
        let mut parameters = std::mem::take(&mut operation.parameters);
        let mut body = RequestBodyInfo::new(operation.request_body.take(), attrs.method_overloaded);

        for method_parameter in self.expand_parameter_objects(&handler.parameters) {
            if self.is_ignored(&method_parameter) {
                debug!("Ignoring parameter {:?} of {}", method_parameter.name, handler.name);
                continue;
            }

            let lookup_name = method_parameter
                .bindings
                .iter()
                .find_map(|b| b.name.clone())
                .or_else(|| method_parameter.name.clone());
            let doc = method_parameter
                .doc
                .as_ref()
                .or_else(|| lookup_name.as_deref().and_then(|n| docs.get(n)));
            consumed.extend(lookup_name.iter().cloned());
            if let Some(name) = doc.and_then(named) {
                consumed.insert(name.to_string());
            }
            if doc.is_some_and(|d| d.hidden) {
                continue;
            }

            let doc_parameter = doc.map(|d| self.parameter_from_doc(d, resolver, view));
            let kind = BindingKind::decide(
                &method_parameter,
                doc_parameter.as_ref().and_then(|p| p.location),
                method,
                self.is_file(&method_parameter.ty),
            );

            if kind != BindingKind::Body {
                let info = ParameterInfo::new(&method_parameter, kind, doc_parameter.clone());
                let mut parameter = self.build_param(&info, &method_parameter.ty, resolver, view);
                if parameter.is_valid() {
                    validation::apply_to_parameter(&mut parameter, &method_parameter.validations);
                    for customizer in self.customizers {
                        customizer.customize(&mut parameter, &method_parameter);
                    }
                    merge_parameter(&mut parameters, parameter);
                    continue;
                }
                if method == HttpMethod::Get {
                    debug!("Dropping unnamed parameter of {}", handler.name);
                    continue;
                }
            }

            let schema = doc_parameter
                .as_ref()
                .and_then(|p| p.schema.clone())
                .unwrap_or_else(|| resolver.resolve(&method_parameter.ty, view));
            let body_parameter = BodyParameter {
                name: lookup_name.unwrap_or_else(|| "body".to_string()),
                schema,
                description: doc_parameter.and_then(|p| p.description),
                validations: &method_parameter.validations,
                optional: is_optional(&method_parameter),
                annotated: !method_parameter.annotations.is_empty()
                    || !method_parameter.validations.is_empty(),
            };
            calculate_request_body_info(&mut body, body_parameter, attrs, resolver);
        }

        for doc in &docs.docs {
            if doc.hidden || named(doc).is_some_and(|n| consumed.contains(n)) {
                continue;
            }
            let parameter = self.parameter_from_doc(doc, resolver, view);
            if parameter.is_valid() {
                merge_parameter(&mut parameters, parameter);
            }
        }

        add_conditions(&mut parameters, &attrs.headers, ParameterLocation::Header);
        add_conditions(&mut parameters, &attrs.query_params, ParameterLocation::Query);
        dedupe(&mut parameters);

        operation.parameters = parameters;
        operation.request_body = body.into_request_body();
    }

    /// Parameters of an operation that has documentation but no handler
    pub fn build_from_docs(
        &self,
        resolver: &mut SchemaResolver,
        docs: &[ParameterDoc],
        attrs: &MethodAttributes,
        operation: &mut Operation,
    ) {
        let view = attrs.json_view.as_deref();
        for doc in docs.iter().filter(|d| !d.hidden) {
            let parameter = self.parameter_from_doc(doc, resolver, view);
            if parameter.is_valid() {
                merge_parameter(&mut operation.parameters, parameter);
            }
        }
        add_conditions(&mut operation.parameters, &attrs.headers, ParameterLocation::Header);
        add_conditions(&mut operation.parameters, &attrs.query_params, ParameterLocation::Query);
        dedupe(&mut operation.parameters);
    }

    /// Replaces parameter objects by one query parameter per field of their model
    fn expand_parameter_objects(&self, parameters: &[MethodParameter]) -> Vec<MethodParameter> {
        let mut expanded = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            if !parameter.parameter_object {
                expanded.push(parameter.clone());
                continue;
            }
            match self.model_of(&parameter.ty) {
                Some((model, ty)) => {
                    let mut visited = HashSet::from([model.name.clone()]);
                    self.flatten_fields(model, ty, "", &mut expanded, &mut visited);
                }
                None => expanded.push(parameter.clone()),
            }
        }
        expanded
    }

    /// The struct model behind `ty`, looking through wrappers such as `Query<T>`
    fn model_of<'t>(&'t self, ty: &'t TypeDescriptor) -> Option<(&'t ModelDefinition, &'t TypeDescriptor)> {
        match self.types.classify(ty, &self.config.type_rules) {
            TypeKind::Model(model) if !model.is_enum() && model.newtype_of.is_none() => Some((model, ty)),
            TypeKind::Wrapper(Some(inner)) => self.model_of(inner),
            _ => None,
        }
    }

    fn flatten_fields(
        &self,
        model: &ModelDefinition,
        ty: &TypeDescriptor,
        prefix: &str,
        out: &mut Vec<MethodParameter>,
        visited: &mut HashSet<String>,
    ) {
        let bindings: HashMap<String, TypeDescriptor> = model
            .generics
            .iter()
            .cloned()
            .zip(ty.generics.iter().cloned())
            .collect();

        for field in model.fields.iter().filter(|f| !f.skip) {
            let serialized = field
                .rename
                .clone()
                .unwrap_or_else(|| apply_rename_rule(&field.name, model.rename_all.as_deref()));
            let name = format!("{}{}", prefix, serialized);
            let field_ty = field.ty.substitute(&bindings);

            if let Some((nested, nested_ty)) = self.model_of(&field_ty) {
                if visited.insert(nested.name.clone()) {
                    self.flatten_fields(nested, nested_ty, &format!("{}.", name), out, visited);
                    visited.remove(&nested.name);
                } else {
                    debug!("Recursive parameter object {} not expanded", nested.name);
                }
                continue;
            }

            let mut parameter = MethodParameter::new(&name, field_ty.clone());
            parameter.optional = field.optional;
            parameter.deprecated = field.deprecated;
            parameter.validations = field.validations.clone();
            parameter.bindings.push(BindingAnnotation {
                source: BindingSource::Query,
                name: Some(name.clone()),
                required: None,
                default_value: None,
            });
            if field.description.is_some() {
                parameter.doc = Some(ParameterDoc {
                    name: Some(name.clone()),
                    description: field.description.clone(),
                    ..Default::default()
                });
            }
            out.push(parameter);
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Two entries describe the same parameter when they share a `$ref`, or a name and a
/// compatible location
fn same_parameter(a: &Parameter, b: &Parameter) -> bool {
    if let (Some(x), Some(y)) = (&a.reference, &b.reference) {
        return x == y;
    }
    !is_blank(&a.name)
        && a.name == b.name
        && (a.location.is_none() || b.location.is_none() || a.location == b.location)
}

/// Merges `parameter` into an existing entry for the same parameter, filling only the
/// fields that entry leaves blank. Appends it when there is no such entry.
pub fn merge_parameter(existing: &mut Vec<Parameter>, parameter: Parameter) {
    match existing.iter_mut().find(|p| same_parameter(p, &parameter)) {
        Some(current) => fill_blanks(current, parameter),
        None => existing.push(parameter),
    }
}

fn fill_blanks(target: &mut Parameter, source: Parameter) {
    if is_blank(&target.description) {
        target.description = source.description;
    }
    target.location = target.location.or(source.location);
    target.example = target.example.take().or(source.example);
    target.deprecated = target.deprecated.or(source.deprecated);
    target.required = target.required.or(source.required);
    target.allow_empty_value = target.allow_empty_value.or(source.allow_empty_value);
    target.allow_reserved = target.allow_reserved.or(source.allow_reserved);
    target.schema = target.schema.take().or(source.schema);
    target.style = target.style.or(source.style);
    target.explode = target.explode.or(source.explode);
}

/// Header or query conditions as required parameters with a one-value enum
fn add_conditions(parameters: &mut Vec<Parameter>, conditions: &BTreeMap<String, String>, location: ParameterLocation) {
    for (name, value) in conditions {
        let schema = if value.is_empty() {
            Schema::string()
        } else {
            Schema {
                enum_values: Some(vec![value.clone()]),
                ..Schema::string()
            }
        };
        merge_parameter(
            parameters,
            Parameter {
                name: Some(name.clone()),
                location: Some(location),
                required: Some(true),
                schema: Some(schema),
                ..Default::default()
            },
        );
    }
}

/// Keeps the first parameter of each name and location
fn dedupe(parameters: &mut Vec<Parameter>) {
    let mut seen: HashSet<(Option<String>, Option<ParameterLocation>, Option<String>)> = HashSet::new();
    parameters.retain(|p| seen.insert((p.name.clone(), p.location, p.reference.clone())));
}
