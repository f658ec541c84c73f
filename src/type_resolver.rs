use crate::config::TypeRules;
use crate::manifest::{ModelDefinition, TypeDescriptor};
use crate::model::Schema;
use log::debug;
use std::collections::HashMap;

/// What a type descriptor denotes, as far as documentation is concerned
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind<'a> {
    /// Documented inline with a fixed schema
    Primitive(Schema),
    /// An uploaded file
    File,
    /// A sequence; `unique` for sets
    Array {
        items: Option<&'a TypeDescriptor>,
        unique: bool,
    },
    /// A string-keyed map
    Map { values: Option<&'a TypeDescriptor> },
    /// Transparent wrapper documented as its first generic argument
    Wrapper(Option<&'a TypeDescriptor>),
    /// A struct or enum registered as a component
    Model(&'a ModelDefinition),
    Unknown,
}

/// Lookup table of model definitions, plus the classification of type descriptors.
///
/// Models come from two places: definitions declared in the manifest and definitions parsed from
/// Rust sources. Both are keyed by simple type name, so `api::User` and `db::User` collide and
/// the last registration wins.
#[derive(Debug, Clone, Default)]
pub struct TypeResolver {
    models: HashMap<String, ModelDefinition>,
}

impl TypeResolver {
    pub fn new(models: Vec<ModelDefinition>) -> Self {
        let mut resolver = Self::default();
        for model in models {
            resolver.register(model);
        }
        resolver
    }

    /// Source models first, manifest models after so that declared metadata wins
    pub fn from_sources(source_models: Vec<ModelDefinition>, manifest_models: Vec<ModelDefinition>) -> Self {
        let mut resolver = Self::new(source_models);
        for model in manifest_models {
            resolver.register(model);
        }
        resolver
    }

    pub fn register(&mut self, model: ModelDefinition) {
        if self.models.contains_key(&model.name) {
            debug!("Model {} registered twice, keeping the later definition", model.name);
        }
        self.models.insert(model.name.clone(), model);
    }

    pub fn lookup(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.get(name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn classify<'a>(&'a self, ty: &'a TypeDescriptor, rules: &TypeRules) -> TypeKind<'a> {
        let name = ty.name.as_str();

        if rules.is_file_type(name) {
            return TypeKind::File;
        }
        if let Some(schema) = primitive_schema(name) {
            return TypeKind::Primitive(schema);
        }
        match name {
            "Vec" | "VecDeque" | "LinkedList" | "BinaryHeap" => {
                return TypeKind::Array {
                    items: ty.first_generic(),
                    unique: false,
                }
            }
            "HashSet" | "BTreeSet" | "IndexSet" => {
                return TypeKind::Array {
                    items: ty.first_generic(),
                    unique: true,
                }
            }
            "HashMap" | "BTreeMap" | "IndexMap" => {
                return TypeKind::Map {
                    values: ty.generics.get(1),
                }
            }
            _ => {}
        }
        // A user model shadows a wrapper of the same name only when it is not used generically
        if let Some(model) = self.lookup(name) {
            if !(rules.is_wrapper(name) && model.generics.is_empty() && !ty.generics.is_empty()) {
                return TypeKind::Model(model);
            }
        }
        if rules.is_wrapper(name) {
            return TypeKind::Wrapper(ty.first_generic());
        }
        TypeKind::Unknown
    }

    /// Simple types are documented inline; everything else is a model or unknown
    pub fn is_simple(&self, ty: &TypeDescriptor, rules: &TypeRules) -> bool {
        match self.classify(ty, rules) {
            TypeKind::Primitive(_) | TypeKind::File | TypeKind::Array { .. } | TypeKind::Map { .. } => true,
            TypeKind::Wrapper(Some(inner)) => self.is_simple(inner, rules),
            TypeKind::Wrapper(None) | TypeKind::Model(_) | TypeKind::Unknown => false,
        }
    }
}

fn primitive_schema(name: &str) -> Option<Schema> {
    let schema = match name {
        "String" | "str" | "char" => Schema::string(),
        "i8" | "i16" | "i32" | "u8" | "u16" | "u32" => Schema::with_format("integer", "int32"),
        "i64" | "u64" | "i128" | "u128" | "isize" | "usize" => Schema::with_format("integer", "int64"),
        "f32" => Schema::with_format("number", "float"),
        "f64" => Schema::with_format("number", "double"),
        "Decimal" | "BigDecimal" => Schema::of_type("number"),
        "bool" => Schema::of_type("boolean"),
        "Uuid" => Schema::with_format("string", "uuid"),
        "DateTime" | "NaiveDateTime" | "OffsetDateTime" | "PrimitiveDateTime" | "SystemTime" => {
            Schema::with_format("string", "date-time")
        }
        "NaiveDate" | "Date" => Schema::with_format("string", "date"),
        "NaiveTime" | "Time" => Schema::with_format("string", "time"),
        "Url" => Schema::with_format("string", "uri"),
        "Bytes" => Schema::with_format("string", "byte"),
        // Free-form JSON
        "Value" | "JsonValue" => Schema::default(),
        _ => return None,
    };
    Some(schema)
}

/// Splits an identifier into words on underscores and lower-to-upper case boundaries
fn split_words(ident: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;
    for c in ident.chars() {
        if c == '_' || c == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if c.is_uppercase() && previous_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        previous_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Applies a serde `rename_all` rule to a field or variant identifier.
///
/// Unknown or absent rules return the identifier unchanged.
pub fn apply_rename_rule(ident: &str, rule: Option<&str>) -> String {
    let Some(rule) = rule else {
        return ident.to_string();
    };
    let words = split_words(ident);
    let lower: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
    let upper: Vec<String> = words.iter().map(|w| w.to_uppercase()).collect();
    match rule {
        "lowercase" => ident.to_lowercase(),
        "UPPERCASE" => ident.to_uppercase(),
        "snake_case" => lower.join("_"),
        "SCREAMING_SNAKE_CASE" => upper.join("_"),
        "kebab-case" => lower.join("-"),
        "SCREAMING-KEBAB-CASE" => upper.join("-"),
        "PascalCase" => words.iter().map(|w| capitalize(w)).collect(),
        "camelCase" => words
            .iter()
            .enumerate()
            .map(|(i, w)| if i == 0 { w.to_lowercase() } else { capitalize(w) })
            .collect(),
        _ => ident.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::FieldDefinition;
    use pretty_assertions::assert_eq;

    fn user_model() -> ModelDefinition {
        ModelDefinition {
            name: "User".to_string(),
            fields: vec![FieldDefinition::new("id", TypeDescriptor::named("i64"))],
            ..Default::default()
        }
    }

    #[test]
    fn test_classify_primitives_and_collections() {
        let resolver = TypeResolver::default();
        let rules = TypeRules::default();

        let ty: TypeDescriptor = "u32".parse().unwrap();
        assert_eq!(
            resolver.classify(&ty, &rules),
            TypeKind::Primitive(Schema::with_format("integer", "int32"))
        );

        let ty: TypeDescriptor = "HashSet<String>".parse().unwrap();
        assert!(matches!(
            resolver.classify(&ty, &rules),
            TypeKind::Array { unique: true, .. }
        ));

        let ty: TypeDescriptor = "BTreeMap<String, i64>".parse().unwrap();
        match resolver.classify(&ty, &rules) {
            TypeKind::Map { values } => assert_eq!(values.unwrap().name, "i64"),
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_models_wrappers_and_files() {
        let resolver = TypeResolver::new(vec![user_model()]);
        let rules = TypeRules::default();

        let ty = TypeDescriptor::named("User");
        assert!(matches!(resolver.classify(&ty, &rules), TypeKind::Model(m) if m.name == "User"));

        let ty: TypeDescriptor = "Json<User>".parse().unwrap();
        assert!(matches!(
            resolver.classify(&ty, &rules),
            TypeKind::Wrapper(Some(inner)) if inner.name == "User"
        ));

        assert_eq!(
            resolver.classify(&TypeDescriptor::named("File"), &rules),
            TypeKind::File
        );
        assert_eq!(
            resolver.classify(&TypeDescriptor::named("Mystery"), &rules),
            TypeKind::Unknown
        );
    }

    #[test]
    fn test_manifest_models_override_source_models() {
        let mut declared = user_model();
        declared.description = Some("declared".to_string());

        let resolver = TypeResolver::from_sources(vec![user_model()], vec![declared]);
        assert_eq!(resolver.len(), 1);
        assert_eq!(
            resolver.lookup("User").unwrap().description.as_deref(),
            Some("declared")
        );
    }

    #[test]
    fn test_is_simple() {
        let resolver = TypeResolver::new(vec![user_model()]);
        let rules = TypeRules::default();
        assert!(resolver.is_simple(&"Option<i64>".parse().unwrap(), &rules));
        assert!(resolver.is_simple(&"Vec<User>".parse().unwrap(), &rules));
        assert!(!resolver.is_simple(&TypeDescriptor::named("User"), &rules));
    }

    #[test]
    fn test_rename_rules() {
        assert_eq!(apply_rename_rule("user_name", Some("camelCase")), "userName");
        assert_eq!(apply_rename_rule("user_name", Some("PascalCase")), "UserName");
        assert_eq!(apply_rename_rule("user_name", Some("kebab-case")), "user-name");
        assert_eq!(apply_rename_rule("user_name", Some("lowercase")), "user_name");
        assert_eq!(apply_rename_rule("OnHold", Some("snake_case")), "on_hold");
        assert_eq!(apply_rename_rule("OnHold", Some("lowercase")), "onhold");
        assert_eq!(apply_rename_rule("OnHold", Some("SCREAMING-KEBAB-CASE")), "ON-HOLD");
        assert_eq!(apply_rename_rule("OnHold", None), "OnHold");
    }
}
