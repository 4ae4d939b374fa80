//! Running a composer against a function request.
//!
//! [`StorageFunction`] is the transport-independent core of the server: it
//! reads the observed state out of a [`FunctionRequest`], asks its composer
//! for the desired resources, and reports progress or failure through
//! results on the [`FunctionResponse`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, info_span, warn};

use crate::compose::{Composer, Composition, Variant};
use crate::error::{ComposeError, ValidationError};
use crate::protocol::{FunctionRequest, FunctionResponse, DEFAULT_TTL};

/// A composition function backed by one composer.
#[derive(Debug, Clone)]
pub struct StorageFunction {
    composer: Arc<dyn Composer>,
    ttl: Duration,
}

impl StorageFunction {
    /// Creates a function around `composer`.
    #[must_use]
    pub fn new(composer: Arc<dyn Composer>) -> Self {
        Self {
            composer,
            ttl: DEFAULT_TTL,
        }
    }

    /// Creates the function for a deployment variant.
    #[must_use]
    pub fn for_variant(variant: Variant) -> Self {
        Self::new(variant.composer())
    }

    /// Sets the response TTL.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the composer.
    #[must_use]
    pub fn composer(&self) -> &dyn Composer {
        self.composer.as_ref()
    }

    /// Runs one invocation.
    ///
    /// This never fails at the call level. An XR that cannot be read becomes
    /// a fatal result and leaves the desired state as the request had it.
    #[must_use]
    pub fn run(&self, req: &FunctionRequest) -> FunctionResponse {
        let span = info_span!("run_function", tag = %req.tag, composer = self.composer.name());
        let _enter = span.enter();
        info!("Running function");

        let mut rsp = FunctionResponse::to(req, self.ttl);

        let Some(composite) = req.observed.composite.as_ref() else {
            let err = ComposeError::from(ValidationError::MissingComposite);
            warn!(error = %err, "cannot get xr");
            rsp.fatal(format!("cannot get xr: {err}"));
            return rsp;
        };

        let observed = req.observed.resource_objects();
        match self.composer.compose(&composite.resource, &observed) {
            Ok(Composition { desired, waiting }) => {
                debug!(
                    observed = observed.len(),
                    desired = desired.len(),
                    complete = waiting.is_none(),
                    "composed"
                );
                rsp.set_desired_resources(desired);
                if let Some(waiting) = waiting {
                    rsp.normal(waiting.message()).target_composite_and_claim();
                }
            }
            Err(err) => {
                warn!(error = %err, "composition failed");
                let context = if err.is_validation() {
                    "cannot convert xr"
                } else {
                    "cannot compose resources"
                };
                rsp.fatal(format!("{context}: {err}"));
            }
        }

        rsp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ComposedResource, Severity, State, Target};
    use crate::resource::Unstructured;
    use serde_json::{json, Value};

    fn obj(value: Value) -> Unstructured {
        Unstructured::from_typed(&value).unwrap()
    }

    fn bucket_request(location: &str, observed_group: Option<Value>) -> FunctionRequest {
        let mut observed = State {
            composite: Some(ComposedResource::new(obj(json!({
                "apiVersion": "platform.example.com/v1alpha1",
                "kind": "XStorageBucket",
                "metadata": {"name": "example-xr"},
                "spec": {"parameters": {"location": location, "versioning": false, "acl": "private"}}
            })))),
            ..State::default()
        };
        if let Some(group) = observed_group {
            observed
                .resources
                .insert("group".to_string(), ComposedResource::new(obj(group)));
        }
        FunctionRequest {
            tag: "hello".to_string(),
            observed,
            ..FunctionRequest::default()
        }
    }

    #[test]
    fn waiting_adds_normal_result() {
        let function = StorageFunction::for_variant(Variant::Bucket);
        let rsp = function.run(&bucket_request("us-east-1", None));

        assert_eq!(rsp.tag, "hello");
        assert_eq!(rsp.ttl, DEFAULT_TTL);
        assert_eq!(rsp.desired.resources.keys().collect::<Vec<_>>(), vec!["group"]);
        assert_eq!(rsp.results.len(), 1);
        assert_eq!(rsp.results[0].severity, Severity::Normal);
        assert_eq!(rsp.results[0].message, "waiting for resource group to be created");
        assert_eq!(rsp.results[0].target, Some(Target::CompositeAndClaim));
    }

    #[test]
    fn complete_chain_has_no_results() {
        let group = json!({
            "metadata": {"annotations": {"crossplane.io/external-name": "super-group"}}
        });
        let function = StorageFunction::for_variant(Variant::Bucket);
        let rsp = function.run(&bucket_request("us-east-1", Some(group)));

        assert!(rsp.results.is_empty());
        assert_eq!(rsp.desired.resources.len(), 3);
    }

    #[test]
    fn missing_location_is_fatal() {
        let function = StorageFunction::for_variant(Variant::Bucket);
        let rsp = function.run(&bucket_request("", None));

        assert!(rsp.is_fatal());
        assert!(rsp.results[0].message.starts_with("cannot convert xr"));
        assert!(rsp.desired.resources.is_empty());
    }

    #[test]
    fn missing_composite_is_fatal() {
        let function = StorageFunction::for_variant(Variant::Container);
        let rsp = function.run(&FunctionRequest::default());

        assert!(rsp.is_fatal());
        assert!(rsp.results[0].message.starts_with("cannot get xr"));
    }

    #[test]
    fn custom_ttl_is_reported() {
        let function =
            StorageFunction::for_variant(Variant::Container).with_ttl(Duration::from_secs(5));
        let rsp = function.run(&bucket_request("eastus", None));
        assert_eq!(rsp.ttl, Duration::from_secs(5));
        assert_eq!(function.composer().name(), "deterministic");
    }
}
