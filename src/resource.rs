//! Kubernetes objects in unstructured and typed form.
//!
//! Observed objects arrive from the reconciler as arbitrary JSON. They are
//! kept unstructured so that a child resource with a surprising shape never
//! fails an invocation; only the fields a composer actually reads are looked
//! up, and a missing field reads as `None`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ComposeError, ComposeResult};

/// Annotation through which provider controllers report, and accept, the
/// real cloud identifier of a managed resource.
pub const EXTERNAL_NAME_ANNOTATION: &str = "crossplane.io/external-name";

/// A Kubernetes object as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Unstructured(Map<String, Value>);

impl Unstructured {
    /// Creates an empty object.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wraps a JSON object.
    #[must_use]
    pub const fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Converts a typed document into unstructured form.
    pub fn from_typed<T: Serialize>(typed: &T) -> ComposeResult<Self> {
        match serde_json::to_value(typed)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ComposeError::internal(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the object, returning the underlying JSON object.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Returns `kind`, if set.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.0.get("kind").and_then(Value::as_str)
    }

    /// Returns `metadata` if it is present and an object.
    #[must_use]
    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.0.get("metadata").and_then(Value::as_object)
    }

    /// Returns `metadata.name`, if set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.metadata()?.get("name").and_then(Value::as_str)
    }

    /// Returns `metadata.annotations` if present and an object.
    #[must_use]
    pub fn annotations(&self) -> Option<&Map<String, Value>> {
        self.metadata()?.get("annotations").and_then(Value::as_object)
    }

    /// Returns a single annotation value.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations()?.get(key).and_then(Value::as_str)
    }

    /// Returns the external name reported by the provider.
    ///
    /// An empty annotation is treated the same as an absent one: the provider
    /// has not assigned a name yet.
    #[must_use]
    pub fn external_name(&self) -> Option<&str> {
        self.annotation(EXTERNAL_NAME_ANNOTATION)
            .filter(|name| !name.is_empty())
    }
}

impl From<Map<String, Value>> for Unstructured {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Unstructured> for Value {
    fn from(obj: Unstructured) -> Self {
        Value::Object(obj.0)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The subset of Kubernetes object metadata a composer reads or writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// `metadata.name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// `metadata.annotations`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,

    /// `metadata.labels`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

impl ObjectMeta {
    /// Metadata carrying only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Metadata carrying only an external-name annotation.
    #[must_use]
    pub fn with_external_name(external_name: impl Into<String>) -> Self {
        Self::default().external_name(external_name)
    }

    /// Adds an external-name annotation.
    #[must_use]
    pub fn external_name(mut self, external_name: impl Into<String>) -> Self {
        self.annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(EXTERNAL_NAME_ANNOTATION.to_string(), external_name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Unstructured {
        match value {
            Value::Object(map) => Unstructured::from_map(map),
            _ => panic!("test object must be a JSON object"),
        }
    }

    #[test]
    fn external_name_reads_annotation() {
        let group = obj(json!({
            "apiVersion": "azure.upbound.io/v1beta1",
            "kind": "ResourceGroup",
            "metadata": {"annotations": {"crossplane.io/external-name": "rg-123"}}
        }));
        assert_eq!(group.external_name(), Some("rg-123"));
        assert_eq!(group.kind(), Some("ResourceGroup"));
    }

    #[test]
    fn external_name_absent_without_metadata() {
        let group = obj(json!({"kind": "ResourceGroup"}));
        assert!(group.metadata().is_none());
        assert_eq!(group.external_name(), None);
    }

    #[test]
    fn external_name_absent_without_annotations() {
        let group = obj(json!({"metadata": {"name": "g"}}));
        assert_eq!(group.name(), Some("g"));
        assert_eq!(group.external_name(), None);
    }

    #[test]
    fn empty_or_non_string_external_name_is_absent() {
        let empty = obj(json!({"metadata": {"annotations": {"crossplane.io/external-name": ""}}}));
        assert_eq!(empty.external_name(), None);

        let numeric = obj(json!({"metadata": {"annotations": {"crossplane.io/external-name": 7}}}));
        assert_eq!(numeric.external_name(), None);
    }

    #[test]
    fn metadata_that_is_not_an_object_is_ignored() {
        let odd = obj(json!({"metadata": "surprise"}));
        assert!(odd.metadata().is_none());
        assert_eq!(odd.name(), None);
    }

    #[test]
    fn from_typed_rejects_non_objects() {
        let err = Unstructured::from_typed(&42u8).unwrap_err();
        assert!(format!("{err}").contains("number"));
    }

    #[test]
    fn object_meta_skips_unset_fields() {
        let meta = ObjectMeta::with_external_name("acct");
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            value,
            json!({"annotations": {"crossplane.io/external-name": "acct"}})
        );
    }
}
