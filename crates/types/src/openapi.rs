//! Minimal OpenAPI surface for operation-reference validation.
//!
//! The engine never interprets schemas or builds URLs; it only needs to
//! answer "does this `operationId` exist?" and "does this path + method
//! exist?" against attached source documents. This model carries exactly
//! that and ignores everything else in the document.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The slice of an OpenAPI document the validator consults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenApiDocument {
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
}

impl OpenApiDocument {
    /// True when any operation in the document declares the given id.
    pub fn contains_operation_id(&self, operation_id: &str) -> bool {
        self.paths
            .values()
            .flat_map(PathItem::operations)
            .any(|(_, operation)| operation.operation_id.as_deref() == Some(operation_id))
    }

    /// Looks up an operation by path template and lowercase method name.
    pub fn operation(&self, path: &str, method: &str) -> Option<&Operation> {
        self.paths.get(path).and_then(|item| item.operation(method))
    }
}

/// Operations available on a single path template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default)]
    pub get: Option<Operation>,
    #[serde(default)]
    pub put: Option<Operation>,
    #[serde(default)]
    pub post: Option<Operation>,
    #[serde(default)]
    pub delete: Option<Operation>,
    #[serde(default)]
    pub options: Option<Operation>,
    #[serde(default)]
    pub head: Option<Operation>,
    #[serde(default)]
    pub patch: Option<Operation>,
    #[serde(default)]
    pub trace: Option<Operation>,
}

impl PathItem {
    /// Looks up one operation by lowercase method name.
    pub fn operation(&self, method: &str) -> Option<&Operation> {
        match method {
            "get" => self.get.as_ref(),
            "put" => self.put.as_ref(),
            "post" => self.post.as_ref(),
            "delete" => self.delete.as_ref(),
            "options" => self.options.as_ref(),
            "head" => self.head.as_ref(),
            "patch" => self.patch.as_ref(),
            "trace" => self.trace.as_ref(),
            _ => None,
        }
    }

    /// Iterates the defined operations as `(method, operation)` pairs.
    pub fn operations(&self) -> impl Iterator<Item = (&'static str, &Operation)> {
        [
            ("get", self.get.as_ref()),
            ("put", self.put.as_ref()),
            ("post", self.post.as_ref()),
            ("delete", self.delete.as_ref()),
            ("options", self.options.as_ref()),
            ("head", self.head.as_ref()),
            ("patch", self.patch.as_ref()),
            ("trace", self.trace.as_ref()),
        ]
        .into_iter()
        .filter_map(|(method, operation)| operation.map(|operation| (method, operation)))
    }
}

/// One operation; only the id matters for reference checking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub operation_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_operations_by_id_and_path() {
        let document: OpenApiDocument = serde_yaml::from_str(
            r#"
paths:
  /pets:
    get:
      operationId: listPets
    post:
      operationId: createPet
  /pets/{id}:
    get:
      operationId: getPet
"#,
        )
        .expect("parse openapi");

        assert!(document.contains_operation_id("createPet"));
        assert!(!document.contains_operation_id("deletePet"));
        assert!(document.operation("/pets/{id}", "get").is_some());
        assert!(document.operation("/pets/{id}", "delete").is_none());
    }
}
