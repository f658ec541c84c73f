use crate::config::DocConfig;
use crate::manifest::{FieldDefinition, ModelDefinition, SchemaDoc, TypeDescriptor, TypeReplacement};
use crate::model::Schema;
use crate::type_resolver::{apply_rename_rule, TypeKind, TypeResolver};
use crate::validation;
use log::{debug, warn};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Maps type descriptors to OpenAPI schemas.
///
/// Primitive and well-known types are returned inline. Models are registered once under a
/// component name and every later resolution returns a `$ref` to that component, so the
/// registry only ever grows. Resolution never fails: a type that cannot be described is
/// logged and documented as a plain string.
pub struct SchemaResolver {
    types: Arc<TypeResolver>,
    config: Arc<DocConfig>,
    schemas: BTreeMap<String, Schema>,
    in_progress: HashSet<String>,
    /// Newtypes found to contain themselves; registered as components once resolved
    recursive_newtypes: HashSet<String>,
    /// Names being replaced in the current resolution, outermost first
    replacement_chain: Vec<String>,
}

impl SchemaResolver {
    pub fn new(types: Arc<TypeResolver>, config: Arc<DocConfig>) -> Self {
        Self {
            types,
            config,
            schemas: BTreeMap::new(),
            in_progress: HashSet::new(),
            recursive_newtypes: HashSet::new(),
            replacement_chain: Vec::new(),
        }
    }

    /// Seeds the registry with components that already exist in the document
    pub fn with_schemas(mut self, schemas: BTreeMap<String, Schema>) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn schemas(&self) -> &BTreeMap<String, Schema> {
        &self.schemas
    }

    pub fn component(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut Schema> {
        self.schemas.get_mut(name)
    }

    pub fn into_schemas(self) -> BTreeMap<String, Schema> {
        self.schemas
    }

    /// Resolves `ty` to a schema, rendering models through `json_view` when one is given.
    ///
    /// Models are registered as components and come back as `$ref`s. Types that cannot be
    /// resolved, including replacement cycles, are documented as strings.
    ///
    /// # Arguments
    ///
    /// * `ty` - Type to document
    /// * `json_view` - View selecting which model fields are rendered
    pub fn resolve(&mut self, ty: &TypeDescriptor, json_view: Option<&str>) -> Schema {
        let config = Arc::clone(&self.config);
        if let Some(replacement) = config.type_rules.type_replacements.get(&ty.name) {
            match replacement {
                TypeReplacement::Schema(schema) => return schema.clone(),
                TypeReplacement::Type(other) if other != ty => {
                    if self.replacement_chain.contains(&ty.name) {
                        warn!("Type replacement cycle through {}", ty.name);
                        return self.fallback(ty);
                    }
                    self.replacement_chain.push(ty.name.clone());
                    let schema = self.resolve(other, json_view);
                    self.replacement_chain.pop();
                    return schema;
                }
                TypeReplacement::Type(_) => {}
            }
        }

        let types = Arc::clone(&self.types);
        match types.classify(ty, &config.type_rules) {
            TypeKind::Primitive(schema) => schema,
            TypeKind::File => Schema::file(),
            TypeKind::Array { items, unique } => {
                let items = match items {
                    Some(items) => self.resolve(items, json_view),
                    None => self.fallback(ty),
                };
                let mut schema = Schema::array(items);
                if unique {
                    schema.unique_items = Some(true);
                }
                schema
            }
            TypeKind::Map { values } => {
                let values = match values {
                    Some(values) => self.resolve(values, json_view),
                    None => Schema::default(),
                };
                Schema {
                    additional_properties: Some(Box::new(values)),
                    ..Schema::object()
                }
            }
            TypeKind::Wrapper(Some(inner)) => self.resolve(inner, json_view),
            TypeKind::Wrapper(None) => self.fallback(ty),
            TypeKind::Model(model) => self.register_model(ty, model, json_view),
            TypeKind::Unknown => self.fallback(ty),
        }
    }

    fn fallback(&self, ty: &TypeDescriptor) -> Schema {
        warn!("Cannot resolve type {}, documenting it as a string", ty);
        Schema::string()
    }

    /// Component name for a model type: the model name followed by the names of its generic
    /// arguments (`Page<User>` -> `PageUser`), suffixed with the view when one applies.
    pub fn component_name(&self, ty: &TypeDescriptor, json_view: Option<&str>) -> String {
        let mut name = ty.name.clone();
        for argument in &ty.generics {
            name.push_str(&self.name_part(argument));
        }
        match json_view {
            Some(view) => format!("{}_{}", name, view),
            None => name,
        }
    }

    fn name_part(&self, ty: &TypeDescriptor) -> String {
        match self.types.classify(ty, &self.config.type_rules) {
            TypeKind::Wrapper(Some(inner)) => self.name_part(inner),
            _ => {
                let mut part: String = ty.name.chars().filter(|c| c.is_alphanumeric()).collect();
                for argument in &ty.generics {
                    part.push_str(&self.name_part(argument));
                }
                part
            }
        }
    }

    fn register_model(
        &mut self,
        ty: &TypeDescriptor,
        model: &ModelDefinition,
        json_view: Option<&str>,
    ) -> Schema {
        let name = self.component_name(ty, json_view);
        if let Some(inner) = &model.newtype_of {
            return self.resolve_newtype(&name, inner, json_view);
        }

        if self.schemas.contains_key(&name) || self.in_progress.contains(&name) {
            return Schema::reference(&name);
        }

        self.in_progress.insert(name.clone());
        let schema = self.model_schema(ty, model, json_view);
        self.in_progress.remove(&name);

        debug!("Registered component schema {}", name);
        self.schemas.insert(name.clone(), schema);
        Schema::reference(&name)
    }

    /// A newtype documents as its inner type. One that reaches itself through the inner type
    /// becomes a component, so the cycle closes on a `$ref`.
    fn resolve_newtype(&mut self, name: &str, inner: &TypeDescriptor, json_view: Option<&str>) -> Schema {
        if self.schemas.contains_key(name) {
            return Schema::reference(name);
        }
        if self.in_progress.contains(name) {
            debug!("Recursive newtype {} registered as a component", name);
            self.recursive_newtypes.insert(name.to_string());
            return Schema::reference(name);
        }

        self.in_progress.insert(name.to_string());
        let schema = self.resolve(inner, json_view);
        self.in_progress.remove(name);

        if self.recursive_newtypes.remove(name) {
            self.schemas.insert(name.to_string(), schema);
            return Schema::reference(name);
        }
        schema
    }

    fn model_schema(
        &mut self,
        ty: &TypeDescriptor,
        model: &ModelDefinition,
        json_view: Option<&str>,
    ) -> Schema {
        let mut schema = if model.is_enum() {
            Schema {
                enum_values: Some(model.variants.clone()),
                ..Schema::string()
            }
        } else {
            let mut object = Schema::object();
            let mut flattened = HashSet::from([model.name.clone()]);
            let bindings = generic_bindings(model, ty);
            self.collect_properties(model, &bindings, json_view, &mut object, &mut flattened);
            object
        };
        schema.description = model.description.clone();
        if model.deprecated {
            schema.deprecated = Some(true);
        }
        schema
    }

    fn collect_properties(
        &mut self,
        model: &ModelDefinition,
        bindings: &HashMap<String, TypeDescriptor>,
        json_view: Option<&str>,
        schema: &mut Schema,
        flattened: &mut HashSet<String>,
    ) {
        for field in &model.fields {
            if field.skip || hidden_by_view(field, json_view) {
                continue;
            }
            let field_ty = field.ty.substitute(bindings);

            if field.flatten {
                self.flatten_into(&field_ty, json_view, schema, flattened);
                continue;
            }

            let property_name = field
                .rename
                .clone()
                .unwrap_or_else(|| apply_rename_rule(&field.name, model.rename_all.as_deref()));

            let mut property = self.resolve(&field_ty, json_view);
            if property.reference.is_none() {
                if field.description.is_some() {
                    property.description = field.description.clone();
                }
                if field.deprecated {
                    property.deprecated = Some(true);
                }
                validation::apply_to_schema(&mut property, &field.validations);
            }
            schema.add_property(&property_name, property);

            let optional = field.optional || field.ty.name == "Option";
            if !optional || validation::has_required_family(&field.validations) {
                schema.add_required(&property_name);
            }
        }
    }

    /// Inlines the properties of a `#[serde(flatten)]` field
    fn flatten_into(
        &mut self,
        field_ty: &TypeDescriptor,
        json_view: Option<&str>,
        schema: &mut Schema,
        flattened: &mut HashSet<String>,
    ) {
        let types = Arc::clone(&self.types);
        let config = Arc::clone(&self.config);
        match types.classify(field_ty, &config.type_rules) {
            TypeKind::Model(inner) if !inner.is_enum() => {
                if !flattened.insert(inner.name.clone()) {
                    warn!("Recursive flatten of {} ignored", inner.name);
                    return;
                }
                let bindings = generic_bindings(inner, field_ty);
                self.collect_properties(inner, &bindings, json_view, schema, flattened);
            }
            TypeKind::Map { values } => {
                let values = match values {
                    Some(values) => self.resolve(values, json_view),
                    None => Schema::default(),
                };
                schema.additional_properties = Some(Box::new(values));
            }
            TypeKind::Wrapper(Some(inner)) => self.flatten_into(inner, json_view, schema, flattened),
            _ => warn!("Cannot flatten type {}, field ignored", field_ty),
        }
    }

    /// Builds a schema from inline documentation.
    ///
    /// An `implementation` type wins over inline attributes. Returns `None` for hidden schemas
    /// and for docs that describe no shape at all.
    ///
    /// # Arguments
    ///
    /// * `doc` - Inline schema documentation
    /// * `json_view` - View applied when `implementation` names a model
    pub fn schema_from_doc(&mut self, doc: &SchemaDoc, json_view: Option<&str>) -> Option<Schema> {
        if doc.hidden {
            return None;
        }
        let mut schema = if let Some(implementation) = &doc.implementation {
            self.resolve(implementation, json_view)
        } else if let Some(schema_type) = &doc.schema_type {
            Schema {
                format: doc.format.clone(),
                ..Schema::of_type(schema_type)
            }
        } else if !doc.allowable_values.is_empty() {
            Schema::string()
        } else {
            return None;
        };

        if schema.reference.is_none() {
            if !doc.allowable_values.is_empty() {
                schema.enum_values = Some(doc.allowable_values.clone());
            }
            if let Some(raw) = &doc.default_value {
                schema.default = Some(typed_value(&schema, raw));
            }
            if doc.example.is_some() {
                schema.example = doc.example.clone();
            }
            if doc.description.is_some() {
                schema.description = doc.description.clone();
            }
        }

        if doc.array {
            schema = Schema::array(schema);
        }
        Some(schema)
    }
}

fn generic_bindings(model: &ModelDefinition, ty: &TypeDescriptor) -> HashMap<String, TypeDescriptor> {
    model
        .generics
        .iter()
        .cloned()
        .zip(ty.generics.iter().cloned())
        .collect()
}

fn hidden_by_view(field: &FieldDefinition, json_view: Option<&str>) -> bool {
    match json_view {
        Some(view) => !field.views.is_empty() && !field.views.iter().any(|v| v == view),
        None => false,
    }
}

/// Interprets a textual default or example according to the schema type, falling back to
/// the raw string
pub fn typed_value(schema: &Schema, raw: &str) -> Value {
    match schema.schema_type.as_deref() {
        Some("integer") | Some("number") | Some("boolean") => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        }
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Validation;
    use pretty_assertions::assert_eq;

    fn field(name: &str, ty: &str) -> FieldDefinition {
        FieldDefinition::new(name, ty.parse().unwrap())
    }

    fn resolver_with(models: Vec<ModelDefinition>) -> SchemaResolver {
        SchemaResolver::new(
            Arc::new(TypeResolver::new(models)),
            Arc::new(DocConfig::default()),
        )
    }

    fn user() -> ModelDefinition {
        ModelDefinition {
            name: "User".to_string(),
            fields: vec![field("id", "i64"), field("nick_name", "Option<String>")],
            ..Default::default()
        }
    }

    #[test]
    fn test_primitive_and_collection_schemas_are_inline() {
        let mut resolver = resolver_with(vec![]);

        let schema = resolver.resolve(&"Vec<i32>".parse().unwrap(), None);
        assert_eq!(schema, Schema::array(Schema::with_format("integer", "int32")));

        let schema = resolver.resolve(&"HashMap<String, bool>".parse().unwrap(), None);
        assert_eq!(
            schema.additional_properties.as_deref(),
            Some(&Schema::of_type("boolean"))
        );
        assert!(resolver.schemas().is_empty());
    }

    #[test]
    fn test_same_model_twice_registers_one_component() {
        let mut resolver = resolver_with(vec![user()]);

        let first = resolver.resolve(&TypeDescriptor::named("User"), None);
        let second = resolver.resolve(&"Json<User>".parse().unwrap(), None);

        assert_eq!(first, Schema::reference("User"));
        assert_eq!(second, Schema::reference("User"));
        assert_eq!(resolver.schemas().len(), 1);

        let component = resolver.component("User").unwrap();
        let properties = component.properties.as_ref().unwrap();
        assert!(properties.contains_key("nick_name"));
        assert_eq!(component.required, Some(vec!["id".to_string()]));
    }

    #[test]
    fn test_generic_model_gets_concatenated_name() {
        let page = ModelDefinition {
            name: "Page".to_string(),
            generics: vec!["T".to_string()],
            fields: vec![field("items", "Vec<T>"), field("total", "u64")],
            ..Default::default()
        };
        let mut resolver = resolver_with(vec![page, user()]);

        let schema = resolver.resolve(&"Page<User>".parse().unwrap(), None);
        assert_eq!(schema, Schema::reference("PageUser"));

        let items = &resolver.component("PageUser").unwrap().properties.as_ref().unwrap()["items"];
        assert_eq!(items, &Schema::array(Schema::reference("User")));
    }

    #[test]
    fn test_recursive_model_terminates() {
        let node = ModelDefinition {
            name: "Node".to_string(),
            fields: vec![field("children", "Vec<Node>")],
            ..Default::default()
        };
        let mut resolver = resolver_with(vec![node]);

        let schema = resolver.resolve(&TypeDescriptor::named("Node"), None);
        assert_eq!(schema, Schema::reference("Node"));
        let children = &resolver.component("Node").unwrap().properties.as_ref().unwrap()["children"];
        assert_eq!(children, &Schema::array(Schema::reference("Node")));
    }

    #[test]
    fn test_unknown_type_falls_back_to_string() {
        let mut resolver = resolver_with(vec![]);
        let schema = resolver.resolve(&TypeDescriptor::named("Mystery"), None);
        assert_eq!(schema, Schema::string());
    }

    #[test]
    fn test_json_view_filters_fields_under_a_distinct_name() {
        let mut account = ModelDefinition {
            name: "Account".to_string(),
            fields: vec![field("id", "i64"), field("secret", "String")],
            ..Default::default()
        };
        account.fields[1].views = vec!["Internal".to_string()];
        let mut resolver = resolver_with(vec![account]);

        let full = resolver.resolve(&TypeDescriptor::named("Account"), None);
        let summary = resolver.resolve(&TypeDescriptor::named("Account"), Some("Summary"));

        assert_eq!(full, Schema::reference("Account"));
        assert_eq!(summary, Schema::reference("Account_Summary"));
        let summary_props = resolver.component("Account_Summary").unwrap().properties.as_ref().unwrap();
        assert!(!summary_props.contains_key("secret"));
    }

    #[test]
    fn test_flatten_rename_all_and_field_validations() {
        let audit = ModelDefinition {
            name: "Audit".to_string(),
            fields: vec![field("created_by", "String")],
            ..Default::default()
        };
        let mut name = field("display_name", "String");
        name.validations = vec![Validation::Size {
            min: Some(1),
            max: Some(40),
        }];
        let mut audit_field = field("audit", "Audit");
        audit_field.flatten = true;
        let profile = ModelDefinition {
            name: "Profile".to_string(),
            rename_all: Some("camelCase".to_string()),
            fields: vec![name, audit_field],
            ..Default::default()
        };
        let mut resolver = resolver_with(vec![audit, profile]);

        resolver.resolve(&TypeDescriptor::named("Profile"), None);
        let properties = resolver.component("Profile").unwrap().properties.clone().unwrap();

        assert_eq!(properties["displayName"].max_length, Some(40));
        assert!(properties.contains_key("created_by"));
        assert!(!properties.contains_key("audit"));
        assert!(resolver.component("Audit").is_none());
    }

    #[test]
    fn test_type_replacement() {
        let mut config = DocConfig::default();
        config
            .type_rules
            .replace_with_schema("Money", Schema::with_format("string", "decimal"));
        config
            .type_rules
            .replace_with_type("LegacyId", TypeDescriptor::named("i64"));
        let mut resolver = SchemaResolver::new(Arc::new(TypeResolver::default()), Arc::new(config));

        assert_eq!(
            resolver.resolve(&TypeDescriptor::named("Money"), None),
            Schema::with_format("string", "decimal")
        );
        assert_eq!(
            resolver.resolve(&TypeDescriptor::named("LegacyId"), None),
            Schema::with_format("integer", "int64")
        );
    }

    #[test]
    fn test_schema_from_doc() {
        let mut resolver = resolver_with(vec![]);
        let doc = SchemaDoc {
            schema_type: Some("integer".to_string()),
            default_value: Some("10".to_string()),
            allowable_values: vec!["10".to_string(), "20".to_string()],
            ..Default::default()
        };
        let schema = resolver.schema_from_doc(&doc, None).unwrap();
        assert_eq!(schema.default, Some(serde_json::json!(10)));
        assert_eq!(schema.enum_values.as_ref().map(Vec::len), Some(2));

        let hidden = SchemaDoc {
            hidden: true,
            ..doc
        };
        assert!(resolver.schema_from_doc(&hidden, None).is_none());
        assert!(resolver.schema_from_doc(&SchemaDoc::default(), None).is_none());
    }

    #[test]
    fn test_newtypes_inline_unless_recursive() {
        let user_id = ModelDefinition {
            name: "UserId".to_string(),
            newtype_of: Some(TypeDescriptor::named("i64")),
            ..Default::default()
        };
        let forest = ModelDefinition {
            name: "Forest".to_string(),
            newtype_of: Some("Vec<Forest>".parse().unwrap()),
            ..Default::default()
        };
        let mut resolver = resolver_with(vec![user_id, forest]);

        assert_eq!(
            resolver.resolve(&TypeDescriptor::named("UserId"), None),
            Schema::with_format("integer", "int64")
        );
        assert!(resolver.component("UserId").is_none());

        let schema = resolver.resolve(&TypeDescriptor::named("Forest"), None);
        assert_eq!(schema, Schema::reference("Forest"));
        assert_eq!(
            resolver.component("Forest"),
            Some(&Schema::array(Schema::reference("Forest")))
        );
        assert_eq!(
            resolver.resolve(&TypeDescriptor::named("Forest"), None),
            Schema::reference("Forest")
        );
    }

    #[test]
    fn test_replacement_cycle_falls_back_to_string() {
        let mut config = DocConfig::default();
        config.type_rules.replace_with_type("A", TypeDescriptor::named("B"));
        config.type_rules.replace_with_type("B", TypeDescriptor::named("A"));
        let mut resolver = SchemaResolver::new(Arc::new(TypeResolver::default()), Arc::new(config));

        assert_eq!(resolver.resolve(&TypeDescriptor::named("A"), None), Schema::string());
        assert_eq!(resolver.resolve(&TypeDescriptor::named("B"), None), Schema::string());
    }
}
