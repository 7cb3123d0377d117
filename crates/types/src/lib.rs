//! Core type definitions shared across the Arazzo engine workspace.
//!
//! The `arazzo-types` crate centralizes the serde-friendly data structures
//! describing an Arazzo document (workflows, steps, parameters, actions,
//! criteria, components, source descriptions), the dynamically typed
//! [`Value`] the engine traffics in, and the minimal OpenAPI surface the
//! validator consults for operation references.

pub mod document;
pub mod openapi;
pub mod value;
pub mod workflow;

pub use document::{ArazzoDocument, Components, Info, SourceDescription};
pub use openapi::{OpenApiDocument, Operation, PathItem};
pub use value::Value;
pub use workflow::{
    Criterion, ExpressionTypeSpec, FailureAction, Parameter, PayloadReplacement, RequestBody, Step, SuccessAction, Workflow,
};
