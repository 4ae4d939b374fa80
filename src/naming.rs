//! Deterministic names derived from the XR name.
//!
//! Storage account names must be 3-24 character lowercase alphanumeric
//! strings that are globally unique within Azure. XR names are lowercase
//! alphanumeric separated by hyphens, so dropping the hyphens usually yields
//! a valid account name. When it does not, the provider reports the error on
//! the account; composing still succeeds.

use std::sync::OnceLock;

use regex::Regex;

/// Suffix of the account name under deterministic naming.
pub const ACCOUNT_SUFFIX: &str = "-account";

/// Suffix of the container name under deterministic naming.
pub const CONTAINER_SUFFIX: &str = "-container";

static ACCOUNT_NAME: OnceLock<Option<Regex>> = OnceLock::new();

fn account_name_regex() -> Option<&'static Regex> {
    ACCOUNT_NAME
        .get_or_init(|| Regex::new(r"^[a-z0-9]{3,24}$").ok())
        .as_ref()
}

/// Derives a storage account name by stripping hyphens from the XR name.
#[must_use]
pub fn account_name_from_xr(xr_name: &str) -> String {
    xr_name.replace('-', "")
}

/// `<xr-name>-account`.
#[must_use]
pub fn suffixed_account_name(xr_name: &str) -> String {
    format!("{xr_name}{ACCOUNT_SUFFIX}")
}

/// `<xr-name>-container`.
#[must_use]
pub fn suffixed_container_name(xr_name: &str) -> String {
    format!("{xr_name}{CONTAINER_SUFFIX}")
}

/// Returns true if `name` satisfies Azure's storage account name format.
///
/// Global uniqueness cannot be checked locally.
#[must_use]
pub fn is_valid_account_name(name: &str) -> bool {
    account_name_regex().is_some_and(|re| re.is_match(name))
}

/// Derives the account name and logs when it will be rejected by Azure.
#[must_use]
pub(crate) fn checked_account_name(xr_name: &str) -> String {
    let name = account_name_from_xr(xr_name);
    if !is_valid_account_name(&name) {
        tracing::warn!(
            xr = xr_name,
            account = %name,
            "derived storage account name is not 3-24 lowercase alphanumeric characters"
        );
    }
    name
}
