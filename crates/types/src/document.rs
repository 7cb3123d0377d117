//! Arazzo document root objects.
//!
//! Fields are deliberately lenient: everything optional or defaulted so an
//! incomplete document still deserializes and the structural validator can
//! report every violation instead of serde rejecting the first one.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;
use crate::workflow::{FailureAction, Parameter, SuccessAction, Workflow};

/// Root of a parsed Arazzo description.
///
/// The document is immutable during execution; the engine shares it
/// read-only across every participating component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArazzoDocument {
    /// Specification version string, expected to be `1.0.x`.
    #[serde(default)]
    pub arazzo: String,
    /// Document metadata.
    #[serde(default)]
    pub info: Option<Info>,
    /// Ordered list of API/Arazzo sources operations resolve against.
    #[serde(default)]
    pub source_descriptions: Vec<SourceDescription>,
    /// Ordered list of workflows.
    #[serde(default)]
    pub workflows: Vec<Workflow>,
    /// Reusable components referenced by `$components.…` expressions.
    #[serde(default)]
    pub components: Option<Components>,
}

impl ArazzoDocument {
    /// Finds a workflow by its identifier.
    pub fn workflow(&self, workflow_id: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|workflow| workflow.workflow_id == workflow_id)
    }
}

/// Title/version metadata for the document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: String,
}

/// A named pointer to an OpenAPI or Arazzo document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceDescription {
    /// Identifier used by `$sourceDescriptions.<name>` expressions.
    #[serde(default)]
    pub name: String,
    /// Location of the referenced document.
    #[serde(default)]
    pub url: String,
    /// Document kind: `openapi`, `arazzo`, or empty for unspecified.
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// Reusable objects addressable through `$components.<type>.<name>`.
///
/// All maps preserve declaration order; iteration order is observable in
/// validator output and the deterministic-run guarantees.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default)]
    pub parameters: IndexMap<String, Parameter>,
    #[serde(default)]
    pub success_actions: IndexMap<String, SuccessAction>,
    #[serde(default)]
    pub failure_actions: IndexMap<String, FailureAction>,
    /// Reusable input values; these may themselves contain runtime
    /// expressions and are resolved once per workflow run.
    #[serde(default)]
    pub inputs: IndexMap<String, Value>,
}
