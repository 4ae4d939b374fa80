//! # xstorage - Crossplane composition functions for Azure storage
//!
//! A composition function is called by the Crossplane reconciler on every
//! pass over a composite resource (XR). It receives the observed XR and the
//! child resources observed so far, and answers with the child resources it
//! wants to exist. It keeps no state between calls.
//!
//! ## Core Concepts
//!
//! - **Composer**: the pure function from observed state to desired state
//! - **Chained composition**: wait for a prerequisite's external name, return a
//!   partial result meanwhile, and finish on a later pass
//! - **Deterministic composition**: derive every name from the XR name and
//!   emit everything at once
//! - **Variant**: a configured composer, chosen per deployment
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xstorage::{Composer, ObservedResources, Variant};
//!
//! let composer = Variant::Bucket.composer();
//! let composition = composer.compose(&observed_xr, &ObservedResources::new())?;
//! // Only the resource group until the reconciler has created it.
//! assert!(!composition.is_complete());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod azure;
pub mod compose;
pub mod error;
pub mod function;
pub mod naming;
pub mod protocol;
pub mod resource;
pub mod xr;

#[cfg(feature = "server")]
pub mod config;

// gRPC adapter (server mode)
#[cfg(feature = "transport-grpc")]
pub mod transport;

// Re-export primary types at crate root for convenience
pub use compose::{
    AccountNameStyle, AccountNaming, ChainedComposer, Composer, Composition, DesiredResources,
    DeterministicComposer, ObservedResources, ResourceKeys, Variant, WaitReason, Waiting,
};
pub use error::{ComposeError, ComposeResult, TransportError, ValidationError};
pub use function::StorageFunction;
pub use protocol::{
    ComposedResource, FunctionRequest, FunctionResponse, FunctionResult, Ready, Severity, State,
    Target, DEFAULT_TTL,
};
pub use resource::{ObjectMeta, Unstructured, EXTERNAL_NAME_ANNOTATION};
pub use xr::{Acl, StorageParameters, StorageXr};
