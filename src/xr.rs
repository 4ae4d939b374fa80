//! The observed composite resource.
//!
//! Two XR kinds feed the storage functions. `XStorageBucket` nests its
//! parameters under `spec.parameters`; `XStorageContainer` puts the same
//! three fields directly under `spec`. Both are read into one
//! [`StorageXr`]. A `spec.parameters` object wins when present.
//!
//! This is the only place an invocation can fail: an XR that does not fit
//! the schema is a fatal error, never a partial result.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ComposeResult, ValidationError};
use crate::resource::Unstructured;

/// Requested access level of the storage container.
///
/// Values other than `public` and `private` are kept verbatim rather than
/// rejected; schema validation belongs to the API server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Acl {
    /// `public`: anonymous blob reads allowed.
    Public,
    /// `private`.
    Private,
    /// Any other value, kept as given.
    Unrecognized(String),
}

impl Acl {
    /// Returns true only for an explicit public ACL.
    #[must_use]
    pub const fn is_public(&self) -> bool {
        matches!(self, Self::Public)
    }
}

impl From<String> for Acl {
    fn from(value: String) -> Self {
        match value.as_str() {
            "public" => Self::Public,
            "private" => Self::Private,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<&str> for Acl {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Acl> for String {
    fn from(acl: Acl) -> Self {
        match acl {
            Acl::Public => "public".to_string(),
            Acl::Private => "private".to_string(),
            Acl::Unrecognized(other) => other,
        }
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
            Self::Unrecognized(other) => write!(f, "{other}"),
        }
    }
}

/// The parameters every storage XR carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageParameters {
    /// Azure region of every composed resource.
    pub location: String,
    /// Whether blob versioning is enabled on the account.
    pub versioning: bool,
    /// Requested container access level.
    pub acl: Acl,
}

/// Wire shape of the parameters before required-field checks.
#[derive(Debug, Deserialize)]
struct RawParameters {
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    versioning: Option<bool>,
    #[serde(default)]
    acl: Option<Acl>,
}

/// A parsed storage XR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageXr {
    /// `metadata.name`; assumed lowercase alphanumeric with hyphens.
    pub name: String,
    /// `kind`, when the XR states one.
    pub kind: Option<String>,
    /// Storage parameters from `spec.parameters` or `spec`.
    pub parameters: StorageParameters,
}

impl StorageXr {
    /// Parses an observed XR.
    pub fn from_unstructured(xr: &Unstructured) -> ComposeResult<Self> {
        let name = match xr.name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(ValidationError::missing("metadata.name").into()),
        };

        let spec = match xr.as_map().get("spec") {
            Some(Value::Object(spec)) => spec,
            Some(_) => {
                return Err(ValidationError::invalid("spec", "expected an object").into());
            }
            None => return Err(ValidationError::missing("spec").into()),
        };

        let (path, raw) = match spec.get("parameters") {
            Some(Value::Object(nested)) => ("spec.parameters", nested),
            Some(_) => {
                return Err(
                    ValidationError::invalid("spec.parameters", "expected an object").into(),
                );
            }
            None => ("spec", spec),
        };

        let raw: RawParameters = serde_json::from_value(Value::Object(raw.clone()))
            .map_err(|e| ValidationError::invalid(path, e.to_string()))?;

        let location = match raw.location {
            Some(location) if !location.trim().is_empty() => location,
            _ => return Err(ValidationError::missing(format!("{path}.location")).into()),
        };
        let versioning = raw
            .versioning
            .ok_or_else(|| ValidationError::missing(format!("{path}.versioning")))?;
        let acl = raw
            .acl
            .ok_or_else(|| ValidationError::missing(format!("{path}.acl")))?;

        Ok(Self {
            name,
            kind: xr.kind().map(str::to_string),
            parameters: StorageParameters {
                location,
                versioning,
                acl,
            },
        })
    }
}
