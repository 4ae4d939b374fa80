//! Desired Azure managed resources.
//!
//! These are the provider documents a composer emits: a Resource Group, a
//! Storage Account and a Storage Container. Every field is optional on the
//! wire and unset fields are omitted, so a serialized document contains
//! exactly what the composer decided and nothing the provider would
//! interpret as an explicit zero value.
//!
//! The shaping rules that are fixed policy (account tier, replication,
//! infrastructure encryption, access-type mapping) live here, next to the
//! types they shape.

use serde::{Deserialize, Serialize};

use crate::error::ComposeResult;
use crate::resource::{ObjectMeta, Unstructured};
use crate::xr::{Acl, StorageParameters};

/// API version of `ResourceGroup`.
pub const RESOURCE_GROUP_API_VERSION: &str = "azure.upbound.io/v1beta1";

/// API version of `Account` and `Container`.
pub const STORAGE_API_VERSION: &str = "storage.azure.upbound.io/v1beta1";

/// Account tier for every storage account.
pub const ACCOUNT_TIER: &str = "Standard";

/// Replication type for every storage account.
pub const ACCOUNT_REPLICATION_TYPE: &str = "LRS";

/// Container access type that allows anonymous blob reads.
pub const ACCESS_TYPE_BLOB: &str = "blob";

/// Container access type that disallows anonymous access.
pub const ACCESS_TYPE_PRIVATE: &str = "private";

/// Generic `spec` wrapper: every managed resource nests its provider
/// arguments under `spec.forProvider`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spec<P> {
    /// Arguments passed to the cloud provider.
    pub for_provider: P,
}

/// A managed resource document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Managed<P> {
    /// `apiVersion`.
    pub api_version: String,
    /// `kind`.
    pub kind: String,

    /// Omitted when the composer sets no name or annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,

    /// `spec`.
    pub spec: Spec<P>,
}

impl<P: Serialize> Managed<P> {
    /// Converts the document into unstructured form for the response.
    pub fn to_unstructured(&self) -> ComposeResult<Unstructured> {
        Unstructured::from_typed(self)
    }
}

/// `ResourceGroup.spec.forProvider`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupParameters {
    /// Azure region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// `Account.spec.forProvider.blobProperties[]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobProperties {
    /// Keep previous versions of overwritten blobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versioning_enabled: Option<bool>,
}

/// `Account.spec.forProvider`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountParameters {
    /// External name of the owning Resource Group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,

    /// Performance tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_tier: Option<String>,

    /// Replication type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_replication_type: Option<String>,

    /// Azure region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Double encryption at the infrastructure layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_encryption_enabled: Option<bool>,

    /// Blob service settings; the provider takes a one-element list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_properties: Option<Vec<BlobProperties>>,
}

/// `Container.spec.forProvider`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerParameters {
    /// Cloud name of the owning Storage Account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_account_name: Option<String>,

    /// `blob` or `private`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_access_type: Option<String>,
}

/// `azure.upbound.io/v1beta1` `ResourceGroup`.
pub type ResourceGroup = Managed<ResourceGroupParameters>;
/// `storage.azure.upbound.io/v1beta1` `Account`.
pub type Account = Managed<AccountParameters>;
/// `storage.azure.upbound.io/v1beta1` `Container`.
pub type Container = Managed<ContainerParameters>;

/// Builds the desired Resource Group.
#[must_use]
pub fn resource_group(params: &StorageParameters) -> ResourceGroup {
    Managed {
        api_version: RESOURCE_GROUP_API_VERSION.to_string(),
        kind: "ResourceGroup".to_string(),
        metadata: None,
        spec: Spec {
            for_provider: ResourceGroupParameters {
                location: Some(params.location.clone()),
            },
        },
    }
}

/// Builds the desired Storage Account.
///
/// `resource_group_name` is the external name of an observed Resource Group,
/// or `None` when the account is not placed in a composed group.
#[must_use]
pub fn account(
    params: &StorageParameters,
    metadata: Option<ObjectMeta>,
    resource_group_name: Option<&str>,
) -> Account {
    Managed {
        api_version: STORAGE_API_VERSION.to_string(),
        kind: "Account".to_string(),
        metadata,
        spec: Spec {
            for_provider: AccountParameters {
                resource_group_name: resource_group_name.map(str::to_string),
                account_tier: Some(ACCOUNT_TIER.to_string()),
                account_replication_type: Some(ACCOUNT_REPLICATION_TYPE.to_string()),
                location: Some(params.location.clone()),
                infrastructure_encryption_enabled: Some(true),
                blob_properties: Some(vec![BlobProperties {
                    versioning_enabled: Some(params.versioning),
                }]),
            },
        },
    }
}

/// Builds the desired Storage Container.
#[must_use]
pub fn container(
    params: &StorageParameters,
    metadata: Option<ObjectMeta>,
    storage_account_name: &str,
) -> Container {
    Managed {
        api_version: STORAGE_API_VERSION.to_string(),
        kind: "Container".to_string(),
        metadata,
        spec: Spec {
            for_provider: ContainerParameters {
                storage_account_name: Some(storage_account_name.to_string()),
                container_access_type: Some(access_type(&params.acl).to_string()),
            },
        },
    }
}

/// Maps the XR's ACL to a container access type.
///
/// Only an explicit public ACL opens the container; anything else,
/// including values this crate does not recognise, stays private.
#[must_use]
pub const fn access_type(acl: &Acl) -> &'static str {
    if acl.is_public() {
        ACCESS_TYPE_BLOB
    } else {
        ACCESS_TYPE_PRIVATE
    }
}
