use crate::error::{Error, Result};
use crate::manifest::{FieldDefinition, ModelDefinition, TypeDescriptor};
use crate::type_resolver::apply_rename_rule;
use crate::validation::Validation;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use syn::meta::ParseNestedMeta;
use syn::visit::{self, Visit};

/// Parses Rust model sources with `syn`.
///
/// # Example
///
/// ```no_run
/// use openapi_from_routes::parser::{collect_models, AstParser};
/// use std::path::Path;
///
/// let parsed = AstParser::parse_file(Path::new("src/models.rs")).unwrap();
/// let models = collect_models(&[parsed]);
/// println!("Found {} models", models.len());
/// ```
pub struct AstParser;

/// A parsed source file
#[derive(Debug)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub syntax_tree: syn::File,
}

impl AstParser {
    /// Reads and parses one file.
    ///
    /// # Errors
    ///
    /// `Error::IoError` when the file cannot be read, `Error::ParseError` when it is not valid
    /// Rust.
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());
        let content = fs::read_to_string(path)?;
        let syntax_tree = syn::parse_file(&content).map_err(|e| Error::ParseError {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(ParsedFile {
            path: path.to_path_buf(),
            syntax_tree,
        })
    }

    /// Parses every file, logging and skipping the ones that fail.
    ///
    /// A broken source file costs the models it defines, never the whole document.
    pub fn parse_files(paths: &[PathBuf]) -> Vec<ParsedFile> {
        let parsed: Vec<ParsedFile> = paths
            .iter()
            .filter_map(|path| match Self::parse_file(path) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    None
                }
            })
            .collect();
        debug!("Parsed {} of {} files", parsed.len(), paths.len());
        parsed
    }
}

/// Extracts the model definitions of every struct and enum in the given files,
/// including those nested in inline modules.
pub fn collect_models(files: &[ParsedFile]) -> Vec<ModelDefinition> {
    let mut collector = ModelCollector::default();
    for file in files {
        collector.visit_file(&file.syntax_tree);
    }
    collector.models
}

#[derive(Default)]
struct ModelCollector {
    models: Vec<ModelDefinition>,
}

impl<'ast> Visit<'ast> for ModelCollector {
    fn visit_item_struct(&mut self, item: &'ast syn::ItemStruct) {
        self.models.push(struct_model(item));
        visit::visit_item_struct(self, item);
    }

    fn visit_item_enum(&mut self, item: &'ast syn::ItemEnum) {
        match enum_model(item) {
            Some(model) => self.models.push(model),
            None => debug!("Enum {} carries data, not registered as a model", item.ident),
        }
        visit::visit_item_enum(self, item);
    }
}

fn struct_model(item: &syn::ItemStruct) -> ModelDefinition {
    let serde = SerdeAttributes::from_attrs(&item.attrs);
    let mut model = ModelDefinition {
        name: item.ident.to_string(),
        generics: item
            .generics
            .type_params()
            .map(|p| p.ident.to_string())
            .collect(),
        description: doc_comment(&item.attrs),
        deprecated: has_attribute(&item.attrs, "deprecated"),
        rename_all: serde.rename_all,
        ..Default::default()
    };

    match &item.fields {
        syn::Fields::Named(named) => {
            model.fields = named.named.iter().filter_map(field_definition).collect();
        }
        syn::Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
            model.newtype_of = unnamed
                .unnamed
                .first()
                .map(|field| TypeDescriptor::from_syn(&field.ty));
        }
        _ => {}
    }
    model
}

fn field_definition(field: &syn::Field) -> Option<FieldDefinition> {
    let ident = field.ident.as_ref()?;
    let serde = SerdeAttributes::from_attrs(&field.attrs);
    let ty = TypeDescriptor::from_syn(&field.ty);

    let mut definition = FieldDefinition::new(&ident.to_string(), ty);
    definition.optional = definition.ty.name == "Option" || serde.has_default;
    definition.rename = serde.rename;
    definition.skip = serde.skip;
    definition.flatten = serde.flatten;
    definition.description = doc_comment(&field.attrs);
    definition.deprecated = has_attribute(&field.attrs, "deprecated");
    definition.validations = validations_from_attrs(&field.attrs);
    Some(definition)
}

fn enum_model(item: &syn::ItemEnum) -> Option<ModelDefinition> {
    let serde = SerdeAttributes::from_attrs(&item.attrs);
    let mut variants = Vec::new();
    for variant in &item.variants {
        if !matches!(variant.fields, syn::Fields::Unit) {
            return None;
        }
        let variant_serde = SerdeAttributes::from_attrs(&variant.attrs);
        if variant_serde.skip {
            continue;
        }
        let name = variant_serde.rename.unwrap_or_else(|| {
            apply_rename_rule(&variant.ident.to_string(), serde.rename_all.as_deref())
        });
        variants.push(name);
    }

    Some(ModelDefinition {
        name: item.ident.to_string(),
        description: doc_comment(&item.attrs),
        deprecated: has_attribute(&item.attrs, "deprecated"),
        variants,
        ..Default::default()
    })
}

fn has_attribute(attrs: &[syn::Attribute], name: &str) -> bool {
    attrs.iter().any(|a| a.path().is_ident(name))
}

/// Joins `///` lines into one description
fn doc_comment(attrs: &[syn::Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|a| a.path().is_ident("doc"))
        .filter_map(|a| match &a.meta {
            syn::Meta::NameValue(syn::MetaNameValue {
                value:
                    syn::Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(text),
                        ..
                    }),
                ..
            }) => Some(text.value().trim().to_string()),
            _ => None,
        })
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join(" "))
    }
}

/// The serde attributes that change a model's wire shape
#[derive(Debug, Default)]
struct SerdeAttributes {
    rename: Option<String>,
    rename_all: Option<String>,
    skip: bool,
    flatten: bool,
    has_default: bool,
}

impl SerdeAttributes {
    fn from_attrs(attrs: &[syn::Attribute]) -> Self {
        let mut result = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
            let parsed = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    result.rename = serialized_name(&meta)?;
                } else if meta.path.is_ident("rename_all") {
                    result.rename_all = serialized_name(&meta)?;
                } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                    result.skip = true;
                } else if meta.path.is_ident("flatten") {
                    result.flatten = true;
                } else if meta.path.is_ident("default") {
                    result.has_default = true;
                    skip_meta_value(&meta)?;
                } else {
                    skip_meta_value(&meta)?;
                }
                Ok(())
            });
            if let Err(e) = parsed {
                debug!("Ignoring unparsable serde attribute: {}", e);
            }
        }
        result
    }
}

/// Reads `rename = "x"` or the `serialize` half of `rename(serialize = "x", ...)`
fn serialized_name(meta: &ParseNestedMeta) -> syn::Result<Option<String>> {
    if meta.input.peek(syn::Token![=]) {
        let name: syn::LitStr = meta.value()?.parse()?;
        return Ok(Some(name.value()));
    }
    let mut name = None;
    meta.parse_nested_meta(|inner| {
        let value: syn::LitStr = inner.value()?.parse()?;
        if inner.path.is_ident("serialize") {
            name = Some(value.value());
        }
        Ok(())
    })?;
    Ok(name)
}

/// Consumes the value of an attribute entry this parser does not interpret
fn skip_meta_value(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_meta_value(&inner))?;
    }
    Ok(())
}

fn numeric_value(expr: &syn::Expr) -> Option<f64> {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Int(int),
            ..
        }) => int.base10_parse::<f64>().ok(),
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Float(float),
            ..
        }) => float.base10_parse::<f64>().ok(),
        syn::Expr::Unary(syn::ExprUnary {
            op: syn::UnOp::Neg(_),
            expr,
            ..
        }) => numeric_value(expr).map(|v| -v),
        _ => None,
    }
}

/// Translates `#[validate(...)]` entries in the style of the `validator` crate
fn validations_from_attrs(attrs: &[syn::Attribute]) -> Vec<Validation> {
    let mut validations = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident("validate")) {
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("email") {
                validations.push(Validation::Email);
                skip_meta_value(&meta)?;
            } else if meta.path.is_ident("required") {
                validations.push(Validation::NotNull);
                skip_meta_value(&meta)?;
            } else if meta.path.is_ident("length") {
                let (mut min, mut max) = (None, None);
                meta.parse_nested_meta(|inner| {
                    let expr: syn::Expr = inner.value()?.parse()?;
                    let value = numeric_value(&expr).map(|v| v as u64);
                    if inner.path.is_ident("min") {
                        min = value;
                    } else if inner.path.is_ident("max") {
                        max = value;
                    } else if inner.path.is_ident("equal") {
                        min = value;
                        max = value;
                    }
                    Ok(())
                })?;
                validations.push(Validation::Size { min, max });
            } else if meta.path.is_ident("range") {
                meta.parse_nested_meta(|inner| {
                    let expr: syn::Expr = inner.value()?.parse()?;
                    let Some(value) = numeric_value(&expr) else {
                        return Ok(());
                    };
                    if inner.path.is_ident("min") {
                        validations.push(Validation::Min { value });
                    } else if inner.path.is_ident("max") {
                        validations.push(Validation::Max { value });
                    } else if inner.path.is_ident("exclusive_min") {
                        validations.push(Validation::DecimalMin {
                            value,
                            inclusive: false,
                        });
                    } else if inner.path.is_ident("exclusive_max") {
                        validations.push(Validation::DecimalMax {
                            value,
                            inclusive: false,
                        });
                    }
                    Ok(())
                })?;
            } else {
                skip_meta_value(&meta)?;
            }
            Ok(())
        });
        if let Err(e) = parsed {
            debug!("Ignoring unparsable validate attribute: {}", e);
        }
    }
    validations
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::TempDir;

    fn models_from(code: &str) -> Vec<ModelDefinition> {
        let syntax_tree = syn::parse_file(code).unwrap();
        collect_models(&[ParsedFile {
            path: PathBuf::from("models.rs"),
            syntax_tree,
        }])
    }

    #[test]
    fn test_parse_file_reports_invalid_syntax() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.rs");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"pub struct {").unwrap();

        let result = AstParser::parse_file(&path);
        assert!(matches!(result, Err(Error::ParseError { .. })));
    }

    #[test]
    fn test_parse_files_skips_failures() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good.rs");
        let bad = temp_dir.path().join("bad.rs");
        fs::write(&good, "pub struct User { id: i64 }").unwrap();
        fs::write(&bad, "fn (").unwrap();

        let parsed = AstParser::parse_files(&[good.clone(), bad]);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].path, good);
    }

    #[test]
    fn test_struct_fields_and_serde_attributes() {
        let models = models_from(
            r#"
            /// A registered user
            #[serde(rename_all = "camelCase")]
            pub struct User {
                pub user_id: i64,
                #[serde(rename = "mail")]
                pub email: Option<String>,
                #[serde(skip)]
                pub password_hash: String,
                #[serde(flatten)]
                pub audit: Audit,
                #[serde(default, skip_serializing_if = "Vec::is_empty")]
                pub roles: Vec<String>,
            }
            "#,
        );

        let user = &models[0];
        assert_eq!(user.name, "User");
        assert_eq!(user.description.as_deref(), Some("A registered user"));
        assert_eq!(user.rename_all.as_deref(), Some("camelCase"));

        let email = &user.fields[1];
        assert!(email.optional);
        assert_eq!(email.rename.as_deref(), Some("mail"));
        assert!(user.fields[2].skip);
        assert!(user.fields[3].flatten);
        assert!(user.fields[4].optional);
    }

    #[test]
    fn test_validate_attributes() {
        let models = models_from(
            r#"
            pub struct Signup {
                #[validate(length(min = 3, max = 20), custom(function = "check_name"))]
                pub name: String,
                #[validate(email)]
                pub email: String,
                #[validate(range(min = -1, exclusive_max = 150.5))]
                pub age: i32,
            }
            "#,
        );

        let fields = &models[0].fields;
        assert_eq!(
            fields[0].validations,
            vec![Validation::Size {
                min: Some(3),
                max: Some(20)
            }]
        );
        assert_eq!(fields[1].validations, vec![Validation::Email]);
        assert_eq!(
            fields[2].validations,
            vec![
                Validation::Min { value: -1.0 },
                Validation::DecimalMax {
                    value: 150.5,
                    inclusive: false
                },
            ]
        );
    }

    #[test]
    fn test_unit_enum_with_rename_all() {
        let models = models_from(
            r#"
            #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
            pub enum Status {
                Active,
                OnHold,
                #[serde(rename = "gone")]
                Deleted,
            }
            "#,
        );
        assert_eq!(models[0].variants, vec!["ACTIVE", "ON_HOLD", "gone"]);
    }

    #[test]
    fn test_data_enum_is_not_a_model() {
        let models = models_from("pub enum Event { Created { id: i64 }, Deleted }");
        assert!(models.is_empty());
    }

    #[test]
    fn test_generics_newtypes_and_nested_modules() {
        let models = models_from(
            r#"
            pub struct Page<T> { pub items: Vec<T>, pub total: u64 }
            mod ids {
                pub struct UserId(uuid::Uuid);
            }
            "#,
        );
        assert_eq!(models[0].generics, vec!["T".to_string()]);
        assert_eq!(models[1].name, "UserId");
        assert_eq!(models[1].newtype_of, Some(TypeDescriptor::named("Uuid")));
    }
}
