use crate::manifest::{SecurityRequirementDoc, SecuritySchemeDoc};
use crate::model::{SecurityRequirement, SecurityScheme, SecuritySchemeType};
use log::warn;

/// Converts requirement docs into OpenAPI requirements, one single-entry map per doc.
/// Docs with a blank scheme name are skipped.
pub fn security_requirements(docs: &[SecurityRequirementDoc]) -> Vec<SecurityRequirement> {
    docs.iter()
        .filter(|doc| !doc.name.trim().is_empty())
        .map(|doc| SecurityRequirement::from([(doc.name.clone(), doc.scopes.clone())]))
        .collect()
}

/// Security of one operation.
///
/// A method-level list replaces the class-level one rather than extending it, so an
/// explicitly empty method list clears inherited requirements. `None` when neither level
/// declares anything.
pub fn effective_security(
    method_level: Option<&[SecurityRequirementDoc]>,
    class_level: Option<&[SecurityRequirementDoc]>,
) -> Option<Vec<SecurityRequirement>> {
    method_level.or(class_level).map(security_requirements)
}

/// Converts a declared scheme into a named component. Unnamed schemes are dropped.
pub fn security_scheme(doc: &SecuritySchemeDoc) -> Option<(String, SecurityScheme)> {
    if doc.name.trim().is_empty() {
        warn!("Security scheme without a name ignored");
        return None;
    }
    let mut scheme = doc.scheme.clone();
    if scheme.scheme_type == SecuritySchemeType::ApiKey {
        scheme.name = doc
            .param_name
            .clone()
            .or(scheme.name)
            .or_else(|| Some(doc.name.clone()));
    }
    if scheme.flows.as_ref().is_some_and(|flows| flows.is_empty()) {
        scheme.flows = None;
    }
    Some((doc.name.clone(), scheme))
}
