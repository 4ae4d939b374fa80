//! Function request and response envelope.
//!
//! These types mirror the Crossplane function protocol without depending on
//! any transport. The gRPC adapter converts wire messages into them and
//! back; tests and embedders use them directly.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::compose::{DesiredResources, ObservedResources};
use crate::resource::Unstructured;

/// How long the reconciler may cache a response before calling again.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Readiness of a desired composed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ready {
    /// Let the reconciler derive readiness from the resource's conditions.
    #[default]
    Unspecified,
    /// The resource is ready.
    True,
    /// The resource is not ready.
    False,
}

/// A composite or composed resource in a request or response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposedResource {
    /// The Kubernetes object.
    pub resource: Unstructured,

    /// Secret values published by the resource.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub connection_details: BTreeMap<String, Vec<u8>>,

    /// Readiness, for desired resources.
    #[serde(default)]
    pub ready: Ready,
}

impl ComposedResource {
    /// Wraps a resource with no connection details and unspecified readiness.
    #[must_use]
    pub fn new(resource: Unstructured) -> Self {
        Self {
            resource,
            ..Self::default()
        }
    }
}

/// Observed or desired state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// The composite resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite: Option<ComposedResource>,

    /// Composed resources by function-local key.
    #[serde(default)]
    pub resources: BTreeMap<String, ComposedResource>,
}

impl State {
    /// Returns the composed resources without their envelopes.
    #[must_use]
    pub fn resource_objects(&self) -> ObservedResources {
        self.resources
            .iter()
            .map(|(key, res)| (key.clone(), res.resource.clone()))
            .collect()
    }
}

/// A function invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionRequest {
    /// Opaque tag echoed back in the response.
    #[serde(default)]
    pub tag: String,

    /// State observed by the reconciler.
    #[serde(default)]
    pub observed: State,

    /// Desired state accumulated by earlier functions in the pipeline.
    #[serde(default)]
    pub desired: State,

    /// Function input from the composition pipeline step. Unused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Map<String, Value>>,

    /// Pipeline context shared between functions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

/// Severity of a function result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The invocation failed; the reconciler will not apply the response.
    Fatal,
    /// Something is wrong but the response is still applied.
    Warning,
    /// Informational.
    Normal,
}

/// Who a result is reported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// The composite resource only.
    Composite,
    /// The composite resource and its claim, if any.
    CompositeAndClaim,
}

/// A message the function reports to the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionResult {
    /// Severity.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,

    /// Machine-readable reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Unset means the composite only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
}

impl FunctionResult {
    /// Creates a result with no reason and no explicit target.
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            reason: None,
            target: None,
        }
    }

    /// Sets the target to the composite and its claim.
    pub fn target_composite_and_claim(&mut self) -> &mut Self {
        self.target = Some(Target::CompositeAndClaim);
        self
    }

    /// Sets the target to the composite only.
    pub fn target_composite(&mut self) -> &mut Self {
        self.target = Some(Target::Composite);
        self
    }

    /// Sets a machine-readable reason.
    pub fn with_reason(&mut self, reason: impl Into<String>) -> &mut Self {
        self.reason = Some(reason.into());
        self
    }
}

/// The function's answer to one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    /// Tag of the request being answered.
    pub tag: String,
    /// How long the reconciler may cache this response.
    pub ttl: Duration,
    /// Desired state after this function.
    pub desired: State,

    /// Results, in the order they were added.
    #[serde(default)]
    pub results: Vec<FunctionResult>,

    /// Pipeline context passed on to the next function.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

impl FunctionResponse {
    /// Starts a response to `req`.
    ///
    /// The tag, desired state and context are carried over so that resources
    /// desired by earlier pipeline steps are passed on unchanged.
    #[must_use]
    pub fn to(req: &FunctionRequest, ttl: Duration) -> Self {
        Self {
            tag: req.tag.clone(),
            ttl,
            desired: req.desired.clone(),
            results: Vec::new(),
            context: req.context.clone(),
        }
    }

    /// Adds a normal result.
    pub fn normal(&mut self, message: impl Into<String>) -> &mut FunctionResult {
        self.push(FunctionResult::new(Severity::Normal, message))
    }

    /// Adds a warning result.
    pub fn warning(&mut self, message: impl Into<String>) -> &mut FunctionResult {
        self.push(FunctionResult::new(Severity::Warning, message))
    }

    /// Adds a fatal result.
    pub fn fatal(&mut self, message: impl Into<String>) -> &mut FunctionResult {
        self.push(FunctionResult::new(Severity::Fatal, message))
    }

    /// Adds a result and returns it for further adjustment.
    pub fn push(&mut self, result: FunctionResult) -> &mut FunctionResult {
        self.results.push(result);
        let last = self.results.len() - 1;
        &mut self.results[last]
    }

    /// Returns true if any result is fatal.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.results.iter().any(|r| r.severity == Severity::Fatal)
    }

    /// Merges desired composed resources into the response.
    ///
    /// A key that an earlier step already desired is replaced wholesale, but
    /// its connection details and readiness are kept.
    pub fn set_desired_resources(&mut self, desired: DesiredResources) {
        for (key, resource) in desired {
            match self.desired.resources.entry(key) {
                Entry::Occupied(mut existing) => existing.get_mut().resource = resource,
                Entry::Vacant(slot) => {
                    slot.insert(ComposedResource::new(resource));
                }
            }
        }
    }
}
