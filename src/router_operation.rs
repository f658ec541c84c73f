//! Declarative router operations and their reconciliation with router function data.
//!
//! A router declared as data carries two lists: documentation for each operation, and what
//! the router itself knows about each route (methods, media types, header and query
//! conditions). The two are paired by a small rule table, each tier adding one criterion,
//! and the first tier that yields exactly one candidate wins.

use crate::manifest::{OperationDoc, Route, RouterFunctionData, RouterOperationDoc, TypeDescriptor};
use crate::model::HttpMethod;
use crate::path_matcher::normalize_path_template;
use log::debug;
use std::collections::BTreeMap;

/// One operation ready for assembly, whether it came from a route or a declared router
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouterOperation {
    pub path: String,
    pub methods: Vec<HttpMethod>,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    pub headers: Vec<String>,
    pub query_params: BTreeMap<String, String>,
    pub controller: Option<String>,
    pub handler: Option<String>,
    pub parameter_types: Vec<TypeDescriptor>,
    pub operation: Option<OperationDoc>,
}

impl RouterOperation {
    /// Operation for a single route entry
    pub fn from_route(route: &Route) -> Self {
        Self {
            path: normalize_path_template(&route.path),
            methods: vec![route.method],
            controller: Some(route.controller.clone()),
            handler: Some(route.handler.clone()),
            parameter_types: route.parameter_types.clone(),
            ..Default::default()
        }
    }

    /// Copies router function data into the attributes this operation leaves blank
    pub fn fill_blanks(&mut self, function: &RouterFunctionData) {
        if self.methods.is_empty() {
            self.methods = function.methods.clone();
        }
        if self.consumes.is_empty() {
            self.consumes = function.consumes.clone();
        }
        if self.produces.is_empty() {
            self.produces = function.produces.clone();
        }
        if self.headers.is_empty() {
            self.headers = function.headers.clone();
        }
        if self.query_params.is_empty() {
            self.query_params = function.query_params.clone();
        }
    }
}

impl From<&RouterOperationDoc> for RouterOperation {
    fn from(doc: &RouterOperationDoc) -> Self {
        Self {
            path: normalize_path_template(&doc.path),
            methods: doc.methods.clone(),
            consumes: doc.consumes.clone(),
            produces: doc.produces.clone(),
            headers: doc.headers.clone(),
            query_params: BTreeMap::new(),
            controller: doc.controller.clone(),
            handler: doc.handler.clone(),
            parameter_types: doc.parameter_types.clone(),
            operation: doc.operation.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Criterion {
    Path,
    Methods,
    Produces,
    Consumes,
}

use Criterion::*;

const MATCHER_TIERS: &[&[Criterion]] = &[
    &[Path],
    &[Path, Methods],
    &[Path, Methods, Produces],
    &[Path, Methods, Produces, Consumes],
    &[Path, Methods, Consumes],
    &[Path, Produces],
    &[Path, Produces, Consumes],
    &[Path, Consumes],
];

/// A criterion only takes part when the operation declares the attribute it compares
fn applies(operation: &RouterOperation, criterion: Criterion) -> bool {
    match criterion {
        Path => true,
        Methods => !operation.methods.is_empty(),
        Produces => !operation.produces.is_empty(),
        Consumes => !operation.consumes.is_empty(),
    }
}

fn contained<T: PartialEq>(declared: &[T], available: &[T]) -> bool {
    declared.iter().all(|d| available.contains(d))
}

fn satisfies(operation: &RouterOperation, function: &RouterFunctionData, criterion: Criterion) -> bool {
    match criterion {
        Path => operation.path == normalize_path_template(&function.path),
        Methods => contained(&operation.methods, &function.methods),
        Produces => contained(&operation.produces, &function.produces),
        Consumes => contained(&operation.consumes, &function.consumes),
    }
}

/// The function data uniquely matching `operation`, by the first tier with exactly one
/// candidate. A tier with no candidates ends the search: finer tiers only narrow.
pub fn find_unique_match<'a>(
    operation: &RouterOperation,
    functions: &'a [RouterFunctionData],
) -> Option<&'a RouterFunctionData> {
    for tier in MATCHER_TIERS {
        if !tier.iter().all(|c| applies(operation, *c)) {
            continue;
        }
        let candidates: Vec<&RouterFunctionData> = functions
            .iter()
            .filter(|f| tier.iter().all(|c| satisfies(operation, f, *c)))
            .collect();
        match candidates.as_slice() {
            [single] => return Some(*single),
            [] => return None,
            _ => continue,
        }
    }
    None
}

/// Pairs each declared operation with router function data and returns them sorted by path
/// then methods.
pub fn merge_router_operations(
    docs: &[RouterOperationDoc],
    functions: &[RouterFunctionData],
) -> Vec<RouterOperation> {
    let mut operations: Vec<RouterOperation> = docs.iter().map(RouterOperation::from).collect();

    if operations.len() == 1 && functions.len() == 1 {
        operations[0].fill_blanks(&functions[0]);
    } else {
        for operation in &mut operations {
            match find_unique_match(operation, functions) {
                Some(function) => operation.fill_blanks(function),
                None => debug!(
                    "No unique router function for {} {:?}, left unmerged",
                    operation.path, operation.methods
                ),
            }
        }
    }

    operations.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.methods.cmp(&b.methods)));
    operations
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn function(path: &str, methods: &[HttpMethod], produces: &[&str]) -> RouterFunctionData {
        RouterFunctionData {
            path: path.to_string(),
            methods: methods.to_vec(),
            produces: produces.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    fn doc(path: &str, methods: &[HttpMethod]) -> RouterOperationDoc {
        RouterOperationDoc {
            path: path.to_string(),
            methods: methods.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_operation_takes_single_function_blanks() {
        let functions = vec![function("/other", &[HttpMethod::Post], &["text/plain"])];
        let merged = merge_router_operations(&[doc("/items", &[])], &functions);
        assert_eq!(merged[0].methods, vec![HttpMethod::Post]);
        assert_eq!(merged[0].produces, vec!["text/plain".to_string()]);
    }

    #[test]
    fn test_methods_tier_disambiguates() {
        let functions = vec![
            function("/items", &[HttpMethod::Get], &["application/json"]),
            function("/items", &[HttpMethod::Post], &["application/json"]),
            function("/orders", &[HttpMethod::Get], &[]),
        ];
        let merged = merge_router_operations(&[doc("/items", &[HttpMethod::Post]), doc("/orders", &[])], &functions);

        assert_eq!(merged[0].path, "/items");
        assert_eq!(merged[0].produces, vec!["application/json".to_string()]);
        assert_eq!(merged[1].methods, vec![HttpMethod::Get]);
    }

    #[test]
    fn test_ambiguous_operation_left_unmerged() {
        let functions = vec![
            function("/items", &[HttpMethod::Get], &["application/json"]),
            function("/items", &[HttpMethod::Get], &["application/xml"]),
        ];
        let operation = RouterOperation::from(&doc("/items", &[HttpMethod::Get]));
        assert!(find_unique_match(&operation, &functions).is_none());

        let merged = merge_router_operations(&[doc("/items", &[HttpMethod::Get]), doc("/x", &[])], &functions);
        assert!(merged[0].produces.is_empty());
    }

    #[test]
    fn test_route_operation_normalizes_path() {
        let route = Route {
            method: HttpMethod::Delete,
            path: "/items/<id>/".to_string(),
            controller: "ItemController".to_string(),
            handler: "remove".to_string(),
            parameter_types: Vec::new(),
        };
        let operation = RouterOperation::from_route(&route);
        assert_eq!(operation.path, "/items/{id}");
        assert_eq!(operation.methods, vec![HttpMethod::Delete]);
        assert_eq!(operation.handler.as_deref(), Some("remove"));
    }

    #[test]
    fn test_path_templates_compared_after_normalization() {
        let functions = vec![
            function("/items/:id", &[HttpMethod::Get], &[]),
            function("/items", &[HttpMethod::Get], &[]),
        ];
        let operation = RouterOperation::from(&doc("/items/{id}", &[]));
        let found = find_unique_match(&operation, &functions).unwrap();
        assert_eq!(found.path, "/items/:id");
    }
}
