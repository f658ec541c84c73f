//! Application manifest: the route table and handler metadata a document is built from.
//!
//! The manifest is what the host application knows about itself at runtime: which routes
//! exist, which controller method handles each one, what the parameters and return types of
//! those methods are, and what declarative documentation is attached to them. It is loaded
//! from YAML or JSON and consumed read-only.

use crate::error::{Error, Result};
use crate::model::{
    HttpMethod, ParameterLocation, ParameterStyle, Schema, SecurityScheme,
};
use crate::validation::Validation;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Name given to types that cannot be described
pub const UNKNOWN_TYPE: &str = "Unknown";

/// A type as it appears in a handler signature: a name plus generic arguments.
///
/// Written in Rust type syntax (`Page<User>`, `Vec<i64>`, `&str`) and parsed with `syn`.
/// Only the last path segment is kept, so `serde_json::Value` and `Value` are the same type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeDescriptor {
    pub name: String,
    pub generics: Vec<TypeDescriptor>,
}

impl TypeDescriptor {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            generics: Vec::new(),
        }
    }

    pub fn generic(name: &str, generics: Vec<TypeDescriptor>) -> Self {
        Self {
            name: name.to_string(),
            generics,
        }
    }

    /// The unit type
    pub fn void() -> Self {
        Self::named("()")
    }

    pub fn first_generic(&self) -> Option<&TypeDescriptor> {
        self.generics.first()
    }

    /// Converts a `syn` type into a descriptor, discarding references, parentheses and paths
    pub fn from_syn(ty: &syn::Type) -> Self {
        match ty {
            syn::Type::Path(type_path) => match type_path.path.segments.last() {
                Some(segment) => Self {
                    name: segment.ident.to_string(),
                    generics: generic_arguments(&segment.arguments),
                },
                None => Self::named(UNKNOWN_TYPE),
            },
            syn::Type::Reference(reference) => Self::from_syn(&reference.elem),
            syn::Type::Paren(paren) => Self::from_syn(&paren.elem),
            syn::Type::Group(group) => Self::from_syn(&group.elem),
            syn::Type::Slice(slice) => Self::generic("Vec", vec![Self::from_syn(&slice.elem)]),
            syn::Type::Array(array) => Self::generic("Vec", vec![Self::from_syn(&array.elem)]),
            syn::Type::Tuple(tuple) if tuple.elems.is_empty() => Self::void(),
            syn::Type::ImplTrait(impl_trait) => trait_bound_descriptor(impl_trait.bounds.iter()),
            syn::Type::TraitObject(object) => trait_bound_descriptor(object.bounds.iter()),
            _ => Self::named(UNKNOWN_TYPE),
        }
    }

    /// Replaces generic type parameters (`T`) with their bound arguments
    pub fn substitute(&self, bindings: &HashMap<String, TypeDescriptor>) -> TypeDescriptor {
        if self.generics.is_empty() {
            if let Some(bound) = bindings.get(&self.name) {
                return bound.clone();
            }
        }
        TypeDescriptor {
            name: self.name.clone(),
            generics: self.generics.iter().map(|g| g.substitute(bindings)).collect(),
        }
    }
}

fn generic_arguments(arguments: &syn::PathArguments) -> Vec<TypeDescriptor> {
    match arguments {
        syn::PathArguments::AngleBracketed(angle) => angle
            .args
            .iter()
            .filter_map(|arg| match arg {
                syn::GenericArgument::Type(ty) => Some(TypeDescriptor::from_syn(ty)),
                // `impl Future<Output = T>` documents as `Future<T>`
                syn::GenericArgument::AssocType(assoc) => Some(TypeDescriptor::from_syn(&assoc.ty)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn trait_bound_descriptor<'a>(
    mut bounds: impl Iterator<Item = &'a syn::TypeParamBound>,
) -> TypeDescriptor {
    bounds
        .find_map(|bound| match bound {
            syn::TypeParamBound::Trait(trait_bound) => {
                trait_bound.path.segments.last().map(|segment| TypeDescriptor {
                    name: segment.ident.to_string(),
                    generics: generic_arguments(&segment.arguments),
                })
            }
            _ => None,
        })
        .unwrap_or_else(|| TypeDescriptor::named(UNKNOWN_TYPE))
}

impl FromStr for TypeDescriptor {
    type Err = String;

    fn from_str(source: &str) -> std::result::Result<Self, Self::Err> {
        let ty: syn::Type = syn::parse_str(source.trim())
            .map_err(|e| format!("invalid type `{}`: {}", source, e))?;
        Ok(Self::from_syn(&ty))
    }
}

impl TryFrom<String> for TypeDescriptor {
    type Error = String;

    fn try_from(source: String) -> std::result::Result<Self, Self::Error> {
        source.parse()
    }
}

impl From<TypeDescriptor> for String {
    fn from(descriptor: TypeDescriptor) -> Self {
        descriptor.to_string()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.generics.is_empty() {
            let args: Vec<String> = self.generics.iter().map(ToString::to_string).collect();
            write!(f, "<{}>", args.join(", "))?;
        }
        Ok(())
    }
}

/// Everything known about an application's HTTP surface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationManifest {
    pub routes: Vec<Route>,
    pub controllers: Vec<Controller>,
    pub routers: Vec<RouterDefinition>,
    pub models: Vec<ModelDefinition>,
}

impl ApplicationManifest {
    /// Loads a manifest from a YAML or JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading application manifest from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parses a manifest from YAML (JSON is accepted as a subset of YAML)
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(Error::from)
    }

    pub fn controller(&self, name: &str) -> Option<&Controller> {
        self.controllers.iter().find(|c| c.name == name)
    }
}

/// One entry of the host router: a verb and path bound to a controller method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub method: HttpMethod,
    pub path: String,
    pub controller: String,
    pub handler: String,
    /// Parameter types of the handler, needed only to tell overloads with one name apart
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameter_types: Vec<TypeDescriptor>,
}

/// A declaring type that groups handler methods
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Controller {
    pub name: String,
    /// Module path of the controller, e.g. `app::controllers`
    pub package: String,
    pub hidden: bool,
    pub tags: Vec<TagDoc>,
    pub security: Option<Vec<SecurityRequirementDoc>>,
    pub security_schemes: Vec<SecuritySchemeDoc>,
    pub parameter_docs: Vec<ParameterDoc>,
    pub responses: Vec<ResponseDoc>,
    pub methods: Vec<HandlerMethod>,
}

impl Controller {
    /// Finds a handler method by name, narrowing by parameter types when overloads exist
    pub fn method(&self, name: &str, parameter_types: &[TypeDescriptor]) -> Option<&HandlerMethod> {
        let mut candidates = self.methods.iter().filter(|m| m.name == name);
        if parameter_types.is_empty() {
            return candidates.next();
        }
        candidates.find(|m| {
            m.parameters.len() == parameter_types.len()
                && m.parameters
                    .iter()
                    .zip(parameter_types)
                    .all(|(p, ty)| &p.ty == ty)
        })
    }
}

/// A handler method and the documentation attached to it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerMethod {
    pub name: String,
    pub parameters: Vec<MethodParameter>,
    /// Declared return type; absent means the handler returns nothing
    pub return_type: Option<TypeDescriptor>,
    /// Replaces an opaque declared return type for documentation purposes
    pub document_return_type: Option<TypeDescriptor>,
    pub operation: Option<OperationDoc>,
    pub hidden: bool,
    pub deprecated: bool,
    pub tags: Vec<TagDoc>,
    pub security: Option<Vec<SecurityRequirementDoc>>,
    pub parameter_docs: Vec<ParameterDoc>,
    pub responses: Vec<ResponseDoc>,
    pub request_body: Option<RequestBodyDoc>,
    pub response_status: Option<u16>,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    /// Header conditions such as `X-Api-Version=2`
    pub headers: Vec<String>,
    /// Query-param conditions such as `mode=full`
    pub query_params: Vec<String>,
    /// Serialization view the handler renders its models through
    pub json_view: Option<String>,
}

impl HandlerMethod {
    pub fn is_hidden(&self) -> bool {
        self.hidden || self.operation.as_ref().is_some_and(|op| op.hidden)
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecated || self.operation.as_ref().is_some_and(|op| op.deprecated)
    }
}

/// Where a binding annotation says a value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingSource {
    Header,
    #[serde(alias = "param")]
    Query,
    #[serde(alias = "path_param")]
    Path,
    #[serde(alias = "session_param")]
    Cookie,
}

/// A binding annotation on a handler parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingAnnotation {
    pub source: BindingSource,
    /// Name of the bound request value when it differs from the parameter name
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub default_value: Option<String>,
}

/// One parameter of a handler method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodParameter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub bindings: Vec<BindingAnnotation>,
    #[serde(default)]
    pub doc: Option<ParameterDoc>,
    #[serde(default)]
    pub validations: Vec<Validation>,
    /// Other annotations carried by the parameter, by simple name
    #[serde(default)]
    pub annotations: BTreeSet<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    /// Fields of this parameter's model are exposed as individual query parameters
    #[serde(default)]
    pub parameter_object: bool,
}

impl MethodParameter {
    pub fn new(name: &str, ty: TypeDescriptor) -> Self {
        Self {
            name: Some(name.to_string()),
            ty,
            optional: false,
            bindings: Vec::new(),
            doc: None,
            validations: Vec::new(),
            annotations: BTreeSet::new(),
            deprecated: false,
            default_value: None,
            parameter_object: false,
        }
    }

    pub fn binding(&self, source: BindingSource) -> Option<&BindingAnnotation> {
        self.bindings.iter().find(|b| b.source == source)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDoc {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityRequirementDoc {
    pub name: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// A security scheme declared on a controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecuritySchemeDoc {
    pub name: String,
    /// Name of the header, query or cookie parameter carrying an API key
    #[serde(default)]
    pub param_name: Option<String>,
    #[serde(flatten)]
    pub scheme: SecurityScheme,
}

/// Inline schema documentation, or a pointer to the type to document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaDoc {
    pub implementation: Option<TypeDescriptor>,
    pub hidden: bool,
    #[serde(rename = "type")]
    pub schema_type: Option<String>,
    pub format: Option<String>,
    pub description: Option<String>,
    pub allowable_values: Vec<String>,
    pub default_value: Option<String>,
    pub example: Option<Value>,
    /// Documents an array of the described schema
    pub array: bool,
}

/// Explicit documentation for a parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterDoc {
    pub name: Option<String>,
    #[serde(rename = "in")]
    pub location: Option<ParameterLocation>,
    pub description: Option<String>,
    pub required: Option<bool>,
    pub deprecated: Option<bool>,
    pub hidden: bool,
    pub allow_empty_value: Option<bool>,
    pub allow_reserved: Option<bool>,
    pub style: Option<ParameterStyle>,
    pub explode: Option<bool>,
    pub example: Option<Value>,
    pub schema: Option<SchemaDoc>,
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
}

/// One media type entry of a documented body or response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentDoc {
    /// Defaults to every consumed or produced media type of the operation
    pub media_type: Option<String>,
    pub schema: Option<SchemaDoc>,
    pub example: Option<Value>,
}

/// Explicit documentation for one response status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseDoc {
    pub response_code: String,
    pub description: Option<String>,
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    /// `None` derives content from the return type, an empty list documents no content
    pub content: Option<Vec<ContentDoc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestBodyDoc {
    pub description: Option<String>,
    pub required: Option<bool>,
    pub content: Vec<ContentDoc>,
}

/// Operation-level documentation attached to a handler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationDoc {
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,
    pub hidden: bool,
    pub security: Option<Vec<SecurityRequirementDoc>>,
    pub parameters: Vec<ParameterDoc>,
    pub responses: Vec<ResponseDoc>,
    pub request_body: Option<RequestBodyDoc>,
    /// Renders models in full even when the handler declares a view
    pub ignore_json_view: bool,
}

/// A router declared as data rather than through controller routes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterDefinition {
    pub operations: Vec<RouterOperationDoc>,
    pub functions: Vec<RouterFunctionData>,
}

/// Documentation for one operation of a declared router
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterOperationDoc {
    pub path: String,
    pub methods: Vec<HttpMethod>,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    pub headers: Vec<String>,
    pub controller: Option<String>,
    pub handler: Option<String>,
    pub parameter_types: Vec<TypeDescriptor>,
    pub operation: Option<OperationDoc>,
}

/// What the router itself knows about one of its routes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterFunctionData {
    pub path: String,
    pub methods: Vec<HttpMethod>,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    pub headers: Vec<String>,
    pub query_params: BTreeMap<String, String>,
}

/// A model type: a struct with fields, or an enum with unit variants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelDefinition {
    pub name: String,
    /// Generic type parameter names, in declaration order
    pub generics: Vec<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    /// serde `rename_all` rule applied to fields without an explicit rename
    pub rename_all: Option<String>,
    pub fields: Vec<FieldDefinition>,
    /// Serialized names of the unit variants of an enum
    pub variants: Vec<String>,
    /// Inner type of a single-field tuple struct, which serializes as that type
    pub newtype_of: Option<TypeDescriptor>,
}

impl ModelDefinition {
    pub fn is_enum(&self) -> bool {
        !self.variants.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub rename: Option<String>,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub flatten: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub validations: Vec<Validation>,
    /// Serialization views this field belongs to; empty means every view
    #[serde(default)]
    pub views: Vec<String>,
}

impl FieldDefinition {
    pub fn new(name: &str, ty: TypeDescriptor) -> Self {
        Self {
            name: name.to_string(),
            ty,
            optional: false,
            rename: None,
            skip: false,
            flatten: false,
            description: None,
            deprecated: false,
            validations: Vec::new(),
            views: Vec::new(),
        }
    }
}

/// Schema override keyed by type name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeReplacement {
    /// Document the type as another type
    Type(TypeDescriptor),
    /// Document the type with a fixed schema
    Schema(Schema),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_generic_type() {
        let ty: TypeDescriptor = "Page<Vec<User>>".parse().unwrap();
        assert_eq!(ty.name, "Page");
        assert_eq!(ty.generics[0].name, "Vec");
        assert_eq!(ty.generics[0].generics[0].name, "User");
        assert_eq!(ty.to_string(), "Page<Vec<User>>");
    }

    #[test]
    fn test_parse_strips_paths_and_references() {
        let ty: TypeDescriptor = "&'static std::string::String".parse().unwrap();
        assert_eq!(ty, TypeDescriptor::named("String"));

        let ty: TypeDescriptor = "serde_json::Value".parse().unwrap();
        assert_eq!(ty, TypeDescriptor::named("Value"));
    }

    #[test]
    fn test_parse_unit_and_slices() {
        assert_eq!("()".parse::<TypeDescriptor>().unwrap(), TypeDescriptor::void());
        assert_eq!(
            "&[u8]".parse::<TypeDescriptor>().unwrap(),
            TypeDescriptor::generic("Vec", vec![TypeDescriptor::named("u8")])
        );
    }

    #[test]
    fn test_parse_impl_trait_with_associated_output() {
        let ty: TypeDescriptor = "impl Future<Output = ()>".parse().unwrap();
        assert_eq!(ty, TypeDescriptor::generic("Future", vec![TypeDescriptor::void()]));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("Vec<".parse::<TypeDescriptor>().is_err());
    }

    #[test]
    fn test_substitute_generic_parameters() {
        let field: TypeDescriptor = "Vec<T>".parse().unwrap();
        let mut bindings = HashMap::new();
        bindings.insert("T".to_string(), TypeDescriptor::named("User"));
        assert_eq!(field.substitute(&bindings).to_string(), "Vec<User>");
    }

    #[test]
    fn test_manifest_from_yaml() {
        let yaml = r#"
routes:
  - method: GET
    path: /items/{id}
    controller: ItemController
    handler: get_item
controllers:
  - name: ItemController
    package: app::items
    methods:
      - name: get_item
        return_type: Item
        parameters:
          - name: id
            type: i64
            bindings:
              - source: path_param
"#;
        let manifest = ApplicationManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.routes[0].method, HttpMethod::Get);

        let controller = manifest.controller("ItemController").unwrap();
        let handler = controller.method("get_item", &[]).unwrap();
        assert_eq!(handler.return_type, Some(TypeDescriptor::named("Item")));
        assert_eq!(handler.parameters[0].bindings[0].source, BindingSource::Path);
    }

    #[test]
    fn test_overloaded_method_lookup_by_parameter_types() {
        let mut by_id = HandlerMethod {
            name: "find".to_string(),
            ..Default::default()
        };
        by_id.parameters.push(MethodParameter::new("id", TypeDescriptor::named("i64")));
        let mut by_name = by_id.clone();
        by_name.parameters[0] = MethodParameter::new("name", TypeDescriptor::named("String"));

        let controller = Controller {
            name: "Finder".to_string(),
            methods: vec![by_id, by_name],
            ..Default::default()
        };

        let found = controller
            .method("find", &[TypeDescriptor::named("String")])
            .unwrap();
        assert_eq!(found.parameters[0].name.as_deref(), Some("name"));
        assert!(controller.method("find", &[TypeDescriptor::named("bool")]).is_none());
    }

    #[test]
    fn test_type_replacement_untagged() {
        let replacement: TypeReplacement = serde_yaml::from_str("Uuid").unwrap();
        assert_eq!(replacement, TypeReplacement::Type(TypeDescriptor::named("Uuid")));

        let replacement: TypeReplacement =
            serde_yaml::from_str("type: string\nformat: money").unwrap();
        assert!(matches!(replacement, TypeReplacement::Schema(_)));
    }
}
