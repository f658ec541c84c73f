use crate::config::DocConfig;
use crate::manifest::OperationDoc;
use crate::model::{HttpMethod, OpenApiDocument, Operation};
use std::collections::{BTreeMap, HashSet};

/// Per-operation context shared by the parameter, request body and response builders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodAttributes {
    pub method_consumes: Vec<String>,
    pub method_produces: Vec<String>,
    /// Consumes was declared rather than defaulted
    pub consumes_declared: bool,
    /// Header conditions: name to required value, empty when only presence is required
    pub headers: BTreeMap<String, String>,
    pub query_params: BTreeMap<String, String>,
    /// Another handler already contributed to this operation
    pub method_overloaded: bool,
    /// Responses were documented explicitly
    pub with_api_response_doc: bool,
    /// The request body content schema was documented explicitly
    pub with_request_body_schema_doc: bool,
    pub json_view: Option<String>,
    default_consumes: String,
    default_produces: String,
}

impl MethodAttributes {
    pub fn new(config: &DocConfig) -> Self {
        Self {
            default_consumes: config.default_consumes_media_type.clone(),
            default_produces: config.default_produces_media_type.clone(),
            ..Default::default()
        }
    }

    /// Takes the first non-empty declaration of each list, or the configured default
    pub fn calculate_consumes_produces(&mut self, consumes: &[&[String]], produces: &[&[String]]) {
        match consumes.iter().find(|c| !c.is_empty()) {
            Some(declared) => {
                self.method_consumes = declared.to_vec();
                self.consumes_declared = true;
            }
            None => self.method_consumes = vec![self.default_consumes.clone()],
        }
        self.method_produces = match produces.iter().find(|p| !p.is_empty()) {
            Some(declared) => declared.to_vec(),
            None => vec![self.default_produces.clone()],
        };
    }

    /// Parses `Name=value` and bare `Name` conditions. Negated conditions (`!Name`,
    /// `Name!=value`) describe values that must be absent and are not documented.
    pub fn calculate_headers(&mut self, conditions: &[String]) {
        parse_conditions(conditions, &mut self.headers);
    }

    pub fn calculate_query_params(&mut self, conditions: &[String]) {
        parse_conditions(conditions, &mut self.query_params);
    }
}

fn parse_conditions(conditions: &[String], into: &mut BTreeMap<String, String>) {
    for condition in conditions {
        let condition = condition.trim();
        if condition.is_empty() || condition.starts_with('!') || condition.contains("!=") {
            continue;
        }
        let (name, value) = condition.split_once('=').unwrap_or((condition, ""));
        into.insert(name.trim().to_string(), value.trim().to_string());
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn fill_blank(target: &mut Option<String>, source: &Option<String>) {
    if is_blank(target) && !is_blank(source) {
        target.clone_from(source);
    }
}

/// Applies the scalar parts of an operation doc. Values already present win, so the first
/// handler of an overloaded operation keeps its summary and id.
pub fn apply_operation_doc(doc: &OperationDoc, operation: &mut Operation) {
    fill_blank(&mut operation.summary, &doc.summary);
    fill_blank(&mut operation.description, &doc.description);
    fill_blank(&mut operation.operation_id, &doc.operation_id);
    for tag in &doc.tags {
        if !tag.trim().is_empty() && !operation.tags.contains(tag) {
            operation.tags.push(tag.clone());
        }
    }
    if doc.deprecated {
        operation.deprecated = Some(true);
    }
}

/// Returns `candidate`, or `candidate_1`, `candidate_2`, ... when another operation of the
/// document already uses it. The operation at `current` is not counted.
pub fn unique_operation_id(
    candidate: &str,
    document: &OpenApiDocument,
    current: (&str, HttpMethod),
) -> String {
    let taken: HashSet<&str> = document
        .operations()
        .filter(|(path, method, _)| (*path, *method) != current)
        .filter_map(|(_, _, operation)| operation.operation_id.as_deref())
        .collect();
    if !taken.contains(candidate) {
        return candidate.to_string();
    }
    (1..)
        .map(|n| format!("{}_{}", candidate, n))
        .find(|id| !taken.contains(id.as_str()))
        .unwrap_or_else(|| candidate.to_string())
}

/// `UserAccountController` -> `user-account-controller`, `HTTPClient` -> `http-client`
pub fn split_camel_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = (prev.is_uppercase() && c.is_uppercase() && next_lower)
                || (!prev.is_uppercase() && c.is_uppercase())
                || (prev.is_alphabetic() && !c.is_alphabetic());
            if boundary {
                out.push('-');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PathItem;
    use pretty_assertions::assert_eq;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_consumes_produces_defaults() {
        let config = DocConfig::default();
        let mut attrs = MethodAttributes::new(&config);
        attrs.calculate_consumes_produces(&[&[], &[]], &[&[]]);
        assert_eq!(attrs.method_consumes, strings(&["application/json"]));
        assert_eq!(attrs.method_produces, strings(&["*/*"]));
        assert!(!attrs.consumes_declared);

        let declared = strings(&["application/xml"]);
        attrs.calculate_consumes_produces(&[&[], declared.as_slice()], &[declared.as_slice()]);
        assert_eq!(attrs.method_consumes, declared);
        assert!(attrs.consumes_declared);
    }

    #[test]
    fn test_header_conditions() {
        let mut attrs = MethodAttributes::default();
        attrs.calculate_headers(&strings(&["X-Api-Version=2", "X-Token", "!X-Debug", "X-Mode!=legacy"]));
        assert_eq!(attrs.headers.len(), 2);
        assert_eq!(attrs.headers["X-Api-Version"], "2");
        assert_eq!(attrs.headers["X-Token"], "");
    }

    #[test]
    fn test_operation_doc_fills_blanks_only() {
        let mut operation = Operation {
            summary: Some("first".to_string()),
            ..Default::default()
        };
        let doc = OperationDoc {
            summary: Some("second".to_string()),
            description: Some("details".to_string()),
            tags: strings(&["items"]),
            deprecated: true,
            ..Default::default()
        };
        apply_operation_doc(&doc, &mut operation);
        assert_eq!(operation.summary.as_deref(), Some("first"));
        assert_eq!(operation.description.as_deref(), Some("details"));
        assert_eq!(operation.tags, strings(&["items"]));
        assert_eq!(operation.deprecated, Some(true));
    }

    #[test]
    fn test_unique_operation_id() {
        let mut document = OpenApiDocument::default();
        for (path, id) in [("/a", "list"), ("/b", "list_1")] {
            let mut item = PathItem::default();
            item.set_operation(
                HttpMethod::Get,
                Operation {
                    operation_id: Some(id.to_string()),
                    ..Default::default()
                },
            );
            document.paths.insert(path.to_string(), item);
        }

        assert_eq!(unique_operation_id("list", &document, ("/c", HttpMethod::Get)), "list_2");
        assert_eq!(unique_operation_id("list", &document, ("/a", HttpMethod::Get)), "list");
        assert_eq!(unique_operation_id("create", &document, ("/c", HttpMethod::Post)), "create");
    }

    #[test]
    fn test_split_camel_case() {
        assert_eq!(split_camel_case("UserAccountController"), "user-account-controller");
        assert_eq!(split_camel_case("HTTPClient"), "http-client");
        assert_eq!(split_camel_case("V2Api"), "v-2-api");
        assert_eq!(split_camel_case("items"), "items");
    }
}
