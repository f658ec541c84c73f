//! Hooks that let callers rewrite generated output.
//!
//! Customizers run synchronously inside the document build, after everything computed has been
//! attached. They may mutate their target arbitrarily; nothing checks that running one twice
//! gives the same result.

use crate::manifest::{Controller, HandlerMethod, MethodParameter};
use crate::model::{HttpMethod, OpenApiDocument, Operation, Parameter};
use std::sync::Arc;

/// What an operation customizer knows about the operation it is handed
#[derive(Debug, Clone, Copy)]
pub struct OperationContext<'a> {
    pub path: &'a str,
    pub method: HttpMethod,
    /// Absent for operations built purely from router documentation
    pub controller: Option<&'a Controller>,
    pub handler: Option<&'a HandlerMethod>,
}

pub trait OperationCustomizer: Send + Sync {
    fn customize(&self, operation: &mut Operation, context: &OperationContext<'_>);
}

impl<F> OperationCustomizer for F
where
    F: Fn(&mut Operation, &OperationContext<'_>) + Send + Sync,
{
    fn customize(&self, operation: &mut Operation, context: &OperationContext<'_>) {
        self(operation, context)
    }
}

pub trait ParameterCustomizer: Send + Sync {
    fn customize(&self, parameter: &mut Parameter, method_parameter: &MethodParameter);
}

impl<F> ParameterCustomizer for F
where
    F: Fn(&mut Parameter, &MethodParameter) + Send + Sync,
{
    fn customize(&self, parameter: &mut Parameter, method_parameter: &MethodParameter) {
        self(parameter, method_parameter)
    }
}

pub trait OpenApiCustomizer: Send + Sync {
    fn customize(&self, openapi: &mut OpenApiDocument);
}

impl<F> OpenApiCustomizer for F
where
    F: Fn(&mut OpenApiDocument) + Send + Sync,
{
    fn customize(&self, openapi: &mut OpenApiDocument) {
        self(openapi)
    }
}

/// Boxes a closure as an operation customizer
pub fn operation_customizer<F>(f: F) -> Arc<dyn OperationCustomizer>
where
    F: Fn(&mut Operation, &OperationContext<'_>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Boxes a closure as a parameter customizer
pub fn parameter_customizer<F>(f: F) -> Arc<dyn ParameterCustomizer>
where
    F: Fn(&mut Parameter, &MethodParameter) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Boxes a closure as a document customizer
pub fn openapi_customizer<F>(f: F) -> Arc<dyn OpenApiCustomizer>
where
    F: Fn(&mut OpenApiDocument) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The customizers that apply to one build
#[derive(Clone, Default)]
pub struct Customizers {
    pub operation: Vec<Arc<dyn OperationCustomizer>>,
    pub parameter: Vec<Arc<dyn ParameterCustomizer>>,
    pub openapi: Vec<Arc<dyn OpenApiCustomizer>>,
}

impl Customizers {
    pub fn is_empty(&self) -> bool {
        self.operation.is_empty() && self.parameter.is_empty() && self.openapi.is_empty()
    }

    /// Global customizers first, then the ones in `other`
    pub fn merged_with(&self, other: &Customizers) -> Customizers {
        Customizers {
            operation: self.operation.iter().chain(&other.operation).cloned().collect(),
            parameter: self.parameter.iter().chain(&other.parameter).cloned().collect(),
            openapi: self.openapi.iter().chain(&other.openapi).cloned().collect(),
        }
    }
}

impl std::fmt::Debug for Customizers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Customizers")
            .field("operation", &self.operation.len())
            .field("parameter", &self.parameter.len())
            .field("openapi", &self.openapi.len())
            .finish()
    }
}
