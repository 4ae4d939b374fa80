//! Composition of desired storage resources.
//!
//! A [`Composer`] is a pure function from the observed XR and the observed
//! child resources to the desired child resources. It keeps no state: any
//! progress made in an earlier pass is rediscovered from the observed
//! resources the reconciler passes back in.
//!
//! Two strategies implement the trait:
//!
//! - [`ChainedComposer`] waits for a prerequisite's provider-assigned
//!   external name before emitting the resources that reference it, and
//!   returns a partial [`Composition`] until then.
//! - [`DeterministicComposer`] derives every name from the XR name and
//!   emits everything on the first pass.
//!
//! [`Variant`] selects a configured composer per deployment.

mod chained;
mod deterministic;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::azure::Managed;
use crate::error::{ComposeResult, ValidationError};
use crate::resource::Unstructured;
use crate::xr::StorageXr;

pub use chained::{AccountNaming, ChainedComposer, ResourceKeys};
pub use deterministic::{AccountNameStyle, DeterministicComposer};

/// Observed child resources, keyed by function-local resource name.
pub type ObservedResources = BTreeMap<String, Unstructured>;

/// Desired child resources, keyed by function-local resource name.
pub type DesiredResources = BTreeMap<String, Unstructured>;

/// Why a chain stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitReason {
    /// The reconciler has not observed the resource yet.
    NotObserved,
    /// The resource exists but the provider has not reported its external name.
    MissingExternalName,
}

/// The dependency a partial composition is waiting on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Waiting {
    /// Function-local key of the dependency.
    pub key: String,
    /// Human-readable description, e.g. "resource group".
    pub description: &'static str,
    /// Why the dependency is not usable yet.
    pub reason: WaitReason,
}

impl Waiting {
    /// Message reported to the composite and claim while waiting.
    #[must_use]
    pub fn message(&self) -> String {
        format!("waiting for {} to be created", self.description)
    }
}

/// Output of one composition pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    /// Resources desired by this pass, by key.
    pub desired: DesiredResources,
    /// Set when the chain stopped before every resource could be specified.
    pub waiting: Option<Waiting>,
}

impl Composition {
    /// Returns true if every resource of the chain was emitted.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.waiting.is_none()
    }

    /// Adds a desired resource under `key`.
    pub fn emit<P: Serialize>(&mut self, key: &str, doc: &Managed<P>) -> ComposeResult<()> {
        self.desired.insert(key.to_string(), doc.to_unstructured()?);
        Ok(())
    }

    /// Marks the composition as waiting on `key` and returns it.
    #[must_use]
    pub fn waiting_on(mut self, key: &str, description: &'static str, reason: WaitReason) -> Self {
        tracing::debug!(waiting_on = key, ?reason, "dependency not ready, returning partial result");
        self.waiting = Some(Waiting {
            key: key.to_string(),
            description,
            reason,
        });
        self
    }
}

/// Looks up the external name of an observed dependency.
///
/// Absence at any level (no entry, no metadata, no annotations, empty
/// annotation) means the dependency is not ready yet, which is not an error.
pub(crate) fn observed_external_name<'a>(
    observed: &'a ObservedResources,
    key: &str,
) -> Result<&'a str, WaitReason> {
    let resource = observed.get(key).ok_or(WaitReason::NotObserved)?;
    resource
        .external_name()
        .ok_or(WaitReason::MissingExternalName)
}

/// Computes desired child resources from observed state.
pub trait Composer: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Composes from an already parsed XR.
    fn compose_xr(&self, xr: &StorageXr, observed: &ObservedResources)
        -> ComposeResult<Composition>;

    /// Composes from the observed XR as received.
    ///
    /// Fails only when the XR does not fit the expected schema.
    fn compose(
        &self,
        xr: &Unstructured,
        observed: &ObservedResources,
    ) -> ComposeResult<Composition> {
        let xr = StorageXr::from_unstructured(xr)?;
        self.compose_xr(&xr, observed)
    }
}

/// The deployable function variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variant {
    /// XStorageBucket: resource group first, then an account named after the
    /// XR and its container.
    #[default]
    Bucket,
    /// XStorageBucket with a provider-named account; the container waits for
    /// the account's external name.
    BucketObserved,
    /// XStorageContainer: `<xr>-account` and `<xr>-container`, no waiting.
    Container,
    /// As `Container`, with the account's cloud name pinned to the
    /// hyphen-stripped XR name.
    ContainerCompact,
}

impl Variant {
    /// All variants, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Bucket,
        Self::BucketObserved,
        Self::Container,
        Self::ContainerCompact,
    ];

    /// Name accepted on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bucket => "bucket",
            Self::BucketObserved => "bucket-observed",
            Self::Container => "container",
            Self::ContainerCompact => "container-compact",
        }
    }

    /// Builds the composer for this variant with the default resource keys.
    #[must_use]
    pub fn composer(self) -> Arc<dyn Composer> {
        self.composer_with_keys(ResourceKeys::default())
    }

    /// Builds the composer for this variant.
    ///
    /// `keys` applies to the chained variants only; deterministic variants
    /// key resources by their derived names.
    #[must_use]
    pub fn composer_with_keys(self, keys: ResourceKeys) -> Arc<dyn Composer> {
        match self {
            Self::Bucket => Arc::new(ChainedComposer::new().with_keys(keys)),
            Self::BucketObserved => Arc::new(
                ChainedComposer::new()
                    .with_keys(keys)
                    .with_account_naming(AccountNaming::Observed),
            ),
            Self::Container => Arc::new(DeterministicComposer::new(AccountNameStyle::Suffixed)),
            Self::ContainerCompact => {
                Arc::new(DeterministicComposer::new(AccountNameStyle::Compact))
            }
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                ValidationError::invalid(
                    "variant",
                    format!("unknown variant '{s}', expected one of: {}", known.join(", ")),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn annotated(external_name: &str) -> Unstructured {
        Unstructured::from_typed(&json!({
            "metadata": {"annotations": {"crossplane.io/external-name": external_name}}
        }))
        .unwrap()
    }

    #[test]
    fn external_name_lookup_distinguishes_reasons() {
        let mut observed = ObservedResources::new();
        assert_eq!(
            observed_external_name(&observed, "group"),
            Err(WaitReason::NotObserved)
        );

        observed.insert("group".to_string(), Unstructured::new());
        assert_eq!(
            observed_external_name(&observed, "group"),
            Err(WaitReason::MissingExternalName)
        );

        observed.insert("group".to_string(), annotated("rg-123"));
        assert_eq!(observed_external_name(&observed, "group"), Ok("rg-123"));
    }

    #[test]
    fn waiting_message_names_the_dependency() {
        let waiting = Waiting {
            key: "rg".to_string(),
            description: "resource group",
            reason: WaitReason::NotObserved,
        };
        assert_eq!(waiting.message(), "waiting for resource group to be created");
    }

    #[test]
    fn variant_parses_and_displays() {
        for variant in Variant::ALL {
            assert_eq!(variant.as_str().parse::<Variant>().unwrap(), variant);
            assert_eq!(variant.to_string(), variant.as_str());
        }
        let err = "kcl".parse::<Variant>().unwrap_err();
        assert!(format!("{err}").contains("bucket-observed"));
    }

    #[test]
    fn variants_map_to_strategies() {
        assert_eq!(Variant::Bucket.composer().name(), "chained");
        assert_eq!(Variant::BucketObserved.composer().name(), "chained");
        assert_eq!(Variant::Container.composer().name(), "deterministic");
        assert_eq!(Variant::ContainerCompact.composer().name(), "deterministic");
    }

    #[test]
    fn chained_variants_honour_custom_group_key() {
        let xr = Unstructured::from_typed(&json!({
            "metadata": {"name": "my-bucket"},
            "spec": {"parameters": {"location": "eastus", "versioning": false, "acl": "private"}}
        }))
        .unwrap();
        let mut observed = ObservedResources::new();
        observed.insert("rg".to_string(), annotated("super-group"));
        observed.insert("acct".to_string(), annotated("acctabc"));
        let keys = ResourceKeys::new("rg", "acct", "cont");

        for variant in [Variant::Bucket, Variant::BucketObserved] {
            let out = variant
                .composer_with_keys(keys.clone())
                .compose(&xr, &observed)
                .unwrap();
            assert!(out.is_complete(), "{variant}");
            assert_eq!(
                out.desired.keys().collect::<Vec<_>>(),
                vec!["acct", "cont", "rg"],
                "{variant}"
            );
        }

        let out = Variant::Container
            .composer_with_keys(keys)
            .compose(&xr, &observed)
            .unwrap();
        assert!(!out.desired.contains_key("rg"));
    }
}
