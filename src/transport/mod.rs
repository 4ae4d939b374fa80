//! gRPC transport layer for the storage functions.
//!
//! Implements the Crossplane `FunctionRunnerService`. Wire messages are
//! converted into the transport-independent [`crate::protocol`] types, run
//! through a [`StorageFunction`], and converted back. No composition logic
//! lives here.

pub mod convert;

use std::collections::BTreeMap;
use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::debug;

use crate::error::{ComposeError, TransportError};
use crate::function::StorageFunction;
use crate::protocol::{
    ComposedResource, FunctionRequest, FunctionResponse, FunctionResult, Ready, Severity, State,
    Target,
};
use crate::resource::Unstructured;

use convert::{duration_to_proto, json_to_struct, struct_to_json};

/// Generated `apiextensions.fn.proto.v1` messages and service stubs.
#[allow(missing_docs, clippy::pedantic)]
pub mod proto {
    tonic::include_proto!("apiextensions.r#fn.proto.v1");
}

use proto::function_runner_service_server::{FunctionRunnerService, FunctionRunnerServiceServer};

// ----------------------------------------------------------------------------
// Limits
// ----------------------------------------------------------------------------

/// Maximum size of an incoming RunFunctionRequest.
///
/// Requests carry every observed and desired resource of one XR.
const MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024; // 16 MiB

/// gRPC service implementation for a storage function.
#[derive(Debug, Clone)]
pub struct FunctionServiceImpl {
    function: Arc<StorageFunction>,
}

impl FunctionServiceImpl {
    /// Wraps a function for serving.
    #[must_use]
    pub fn new(function: StorageFunction) -> Self {
        Self {
            function: Arc::new(function),
        }
    }

    /// Builds the tonic server, with the request size limit applied.
    #[must_use]
    pub fn into_server(self) -> FunctionRunnerServiceServer<Self> {
        FunctionRunnerServiceServer::new(self).max_decoding_message_size(MAX_REQUEST_BYTES)
    }
}

fn status_from_compose_error(err: ComposeError) -> Status {
    match err {
        ComposeError::Validation(v) => Status::invalid_argument(v.to_string()),
        ComposeError::Transport(t) => Status::invalid_argument(t.to_string()),
        ComposeError::Serialization { message } | ComposeError::Internal { message } => {
            Status::internal(message)
        }
    }
}

fn resource_from_proto(res: proto::Resource) -> Result<ComposedResource, TransportError> {
    let resource = match res.resource {
        Some(s) => Unstructured::from_map(struct_to_json(s)?),
        None => Unstructured::new(),
    };
    let ready = match proto::Ready::try_from(res.ready) {
        Ok(proto::Ready::True) => Ready::True,
        Ok(proto::Ready::False) => Ready::False,
        Ok(proto::Ready::Unspecified) | Err(_) => Ready::Unspecified,
    };
    Ok(ComposedResource {
        resource,
        connection_details: res.connection_details.into_iter().collect(),
        ready,
    })
}

fn resource_to_proto(res: ComposedResource) -> proto::Resource {
    let ready = match res.ready {
        Ready::Unspecified => proto::Ready::Unspecified,
        Ready::True => proto::Ready::True,
        Ready::False => proto::Ready::False,
    };
    proto::Resource {
        resource: Some(json_to_struct(res.resource.into_map())),
        connection_details: res.connection_details.into_iter().collect(),
        ready: ready as i32,
    }
}

fn state_from_proto(state: Option<proto::State>) -> Result<State, TransportError> {
    let Some(state) = state else {
        return Ok(State::default());
    };
    let composite = state.composite.map(resource_from_proto).transpose()?;
    let resources = state
        .resources
        .into_iter()
        .map(|(key, res)| resource_from_proto(res).map(|r| (key, r)))
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    Ok(State {
        composite,
        resources,
    })
}

fn state_to_proto(state: State) -> proto::State {
    proto::State {
        composite: state.composite.map(resource_to_proto),
        resources: state
            .resources
            .into_iter()
            .map(|(key, res)| (key, resource_to_proto(res)))
            .collect(),
    }
}

fn result_to_proto(result: FunctionResult) -> proto::Result {
    let severity = match result.severity {
        Severity::Fatal => proto::Severity::Fatal,
        Severity::Warning => proto::Severity::Warning,
        Severity::Normal => proto::Severity::Normal,
    };
    let target = result.target.map(|t| match t {
        Target::Composite => proto::Target::Composite as i32,
        Target::CompositeAndClaim => proto::Target::CompositeAndClaim as i32,
    });
    proto::Result {
        severity: severity as i32,
        message: result.message,
        reason: result.reason,
        target,
    }
}

/// Converts a wire request into a [`FunctionRequest`].
pub fn request_from_proto(req: proto::RunFunctionRequest) -> Result<FunctionRequest, ComposeError> {
    Ok(FunctionRequest {
        tag: req.meta.map(|m| m.tag).unwrap_or_default(),
        observed: state_from_proto(req.observed)?,
        desired: state_from_proto(req.desired)?,
        input: req.input.map(struct_to_json).transpose()?,
        context: req.context.map(struct_to_json).transpose()?,
    })
}

/// Converts a [`FunctionResponse`] into a wire response.
#[must_use]
pub fn response_to_proto(rsp: FunctionResponse) -> proto::RunFunctionResponse {
    proto::RunFunctionResponse {
        meta: Some(proto::ResponseMeta {
            tag: rsp.tag,
            ttl: Some(duration_to_proto(rsp.ttl)),
        }),
        desired: Some(state_to_proto(rsp.desired)),
        results: rsp.results.into_iter().map(result_to_proto).collect(),
        context: rsp.context.map(json_to_struct),
    }
}

#[tonic::async_trait]
impl FunctionRunnerService for FunctionServiceImpl {
    async fn run_function(
        &self,
        request: Request<proto::RunFunctionRequest>,
    ) -> Result<Response<proto::RunFunctionResponse>, Status> {
        let req = request_from_proto(request.into_inner()).map_err(|err| {
            debug!(error = %err, "rejecting malformed RunFunctionRequest");
            status_from_compose_error(err)
        })?;

        let rsp = self.function.run(&req);
        Ok(Response::new(response_to_proto(rsp)))
    }
}

pub use proto::function_runner_service_client::FunctionRunnerServiceClient;

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{json, Map, Value};
    use tonic::Request;

    use crate::compose::Variant;

    fn to_struct(value: Value) -> prost_types::Struct {
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        json_to_struct(map)
    }

    fn to_json(s: prost_types::Struct) -> Value {
        Value::Object(struct_to_json(s).unwrap())
    }

    fn xr() -> proto::Resource {
        proto::Resource {
            resource: Some(to_struct(json!({
                "apiVersion": "platform.example.com/v1alpha1",
                "kind": "XStorageBucket",
                "metadata": {"name": "example-xr"},
                "spec": {"parameters": {"location": "us-east-1", "acl": "private", "versioning": false}}
            }))),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn run_function_waits_for_resource_group() {
        let svc = FunctionServiceImpl::new(StorageFunction::for_variant(Variant::Bucket));
        let req = proto::RunFunctionRequest {
            meta: Some(proto::RequestMeta {
                tag: "hello".to_string(),
            }),
            observed: Some(proto::State {
                composite: Some(xr()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let rsp = svc.run_function(Request::new(req)).await.unwrap().into_inner();

        let meta = rsp.meta.unwrap();
        assert_eq!(meta.tag, "hello");
        assert_eq!(meta.ttl.unwrap().seconds, 60);

        assert_eq!(rsp.results.len(), 1);
        assert_eq!(rsp.results[0].severity, proto::Severity::Normal as i32);
        assert_eq!(rsp.results[0].message, "waiting for resource group to be created");
        assert_eq!(
            rsp.results[0].target,
            Some(proto::Target::CompositeAndClaim as i32)
        );

        let desired = rsp.desired.unwrap();
        assert_eq!(desired.resources.len(), 1);
        let group = to_json(desired.resources["group"].resource.clone().unwrap());
        assert_eq!(
            group,
            json!({
                "apiVersion": "azure.upbound.io/v1beta1",
                "kind": "ResourceGroup",
                "spec": {"forProvider": {"location": "us-east-1"}}
            })
        );
    }

    #[tokio::test]
    async fn run_function_composes_full_chain() {
        let svc = FunctionServiceImpl::new(StorageFunction::for_variant(Variant::Bucket));
        let group = proto::Resource {
            resource: Some(to_struct(json!({
                "apiVersion": "azure.upbound.io/v1beta1",
                "kind": "ResourceGroup",
                "metadata": {"annotations": {"crossplane.io/external-name": "super-group"}}
            }))),
            ready: proto::Ready::True as i32,
            ..Default::default()
        };
        let req = proto::RunFunctionRequest {
            observed: Some(proto::State {
                composite: Some(xr()),
                resources: [("group".to_string(), group)].into_iter().collect(),
            }),
            context: Some(to_struct(json!({"pipeline": "storage"}))),
            ..Default::default()
        };

        let rsp = svc.run_function(Request::new(req)).await.unwrap().into_inner();
        assert!(rsp.results.is_empty());

        let desired = rsp.desired.unwrap();
        let mut keys: Vec<_> = desired.resources.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["acct", "cont", "group"]);

        let cont = to_json(desired.resources["cont"].resource.clone().unwrap());
        assert_eq!(cont["spec"]["forProvider"]["storageAccountName"], "examplexr");
        assert_eq!(cont["spec"]["forProvider"]["containerAccessType"], "private");

        let context = to_json(rsp.context.unwrap());
        assert_eq!(context, json!({"pipeline": "storage"}));
    }

    #[tokio::test]
    async fn missing_composite_is_a_fatal_result_not_a_status() {
        let svc = FunctionServiceImpl::new(StorageFunction::for_variant(Variant::Bucket));
        let rsp = svc
            .run_function(Request::new(proto::RunFunctionRequest::default()))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(rsp.results.len(), 1);
        assert_eq!(rsp.results[0].severity, proto::Severity::Fatal as i32);
    }

    #[tokio::test]
    async fn value_without_kind_is_invalid_argument() {
        let svc = FunctionServiceImpl::new(StorageFunction::for_variant(Variant::Bucket));
        let broken = prost_types::Struct {
            fields: [("kind".to_string(), prost_types::Value { kind: None })]
                .into_iter()
                .collect(),
        };
        let req = proto::RunFunctionRequest {
            input: Some(broken),
            ..Default::default()
        };

        let status = svc.run_function(Request::new(req)).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn desired_envelope_round_trips() {
        let mut state = State::default();
        state.resources.insert(
            "acct".to_string(),
            ComposedResource {
                resource: Unstructured::from_map(Map::from_iter([(
                    "kind".to_string(),
                    json!("Account"),
                )])),
                connection_details: BTreeMap::from([("key".to_string(), b"v".to_vec())]),
                ready: Ready::False,
            },
        );

        let back = state_from_proto(Some(state_to_proto(state.clone()))).unwrap();
        assert_eq!(back, state);
    }
}
