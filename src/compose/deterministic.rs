//! Deterministic composition.
//!
//! Every name is derived from the XR name, so nothing has to be observed
//! first and the full set is desired on every pass.

use crate::azure;
use crate::compose::{Composer, Composition, ObservedResources};
use crate::error::ComposeResult;
use crate::naming;
use crate::resource::ObjectMeta;
use crate::xr::StorageXr;

/// How the account's cloud-visible name is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountNameStyle {
    /// `<xr>-account`, via `metadata.name`.
    #[default]
    Suffixed,
    /// The hyphen-stripped XR name, via the external-name annotation. The
    /// object is still keyed and named `<xr>-account`.
    Compact,
}

/// Composer that emits an account and a container named after the XR.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicComposer {
    style: AccountNameStyle,
}

impl DeterministicComposer {
    /// Creates a composer with the given account name style.
    #[must_use]
    pub const fn new(style: AccountNameStyle) -> Self {
        Self { style }
    }

    /// Returns the account name style.
    #[must_use]
    pub const fn style(&self) -> AccountNameStyle {
        self.style
    }
}

impl Composer for DeterministicComposer {
    fn name(&self) -> &'static str {
        "deterministic"
    }

    fn compose_xr(
        &self,
        xr: &StorageXr,
        _observed: &ObservedResources,
    ) -> ComposeResult<Composition> {
        let params = &xr.parameters;
        let account_key = naming::suffixed_account_name(&xr.name);
        let container_key = naming::suffixed_container_name(&xr.name);

        let (account_meta, account_name) = match self.style {
            AccountNameStyle::Suffixed => (ObjectMeta::named(&account_key), account_key.clone()),
            AccountNameStyle::Compact => {
                let name = naming::checked_account_name(&xr.name);
                (ObjectMeta::named(&account_key).external_name(&name), name)
            }
        };

        let mut out = Composition::default();
        out.emit(&account_key, &azure::account(params, Some(account_meta), None))?;
        out.emit(
            &container_key,
            &azure::container(params, Some(ObjectMeta::named(&container_key)), &account_name),
        )?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xr::{Acl, StorageParameters};
    use serde_json::Value;

    fn xr(name: &str) -> StorageXr {
        StorageXr {
            name: name.to_string(),
            kind: Some("XStorageContainer".to_string()),
            parameters: StorageParameters {
                location: "eastus".to_string(),
                versioning: true,
                acl: Acl::Public,
            },
        }
    }

    #[test]
    fn suffixed_names_on_first_pass() {
        let out = DeterministicComposer::new(AccountNameStyle::Suffixed)
            .compose_xr(&xr("my-bucket"), &ObservedResources::new())
            .unwrap();

        assert!(out.is_complete());
        assert_eq!(
            out.desired.keys().collect::<Vec<_>>(),
            vec!["my-bucket-account", "my-bucket-container"]
        );

        let acct = Value::from(out.desired["my-bucket-account"].clone());
        assert_eq!(acct["metadata"]["name"], "my-bucket-account");
        assert!(acct["metadata"].get("annotations").is_none());
        assert!(acct["spec"]["forProvider"].get("resourceGroupName").is_none());

        let cont = Value::from(out.desired["my-bucket-container"].clone());
        assert_eq!(cont["metadata"]["name"], "my-bucket-container");
        assert_eq!(cont["spec"]["forProvider"]["storageAccountName"], "my-bucket-account");
        assert_eq!(cont["spec"]["forProvider"]["containerAccessType"], "blob");
    }

    #[test]
    fn non_public_acl_keeps_container_private() {
        for acl in [Acl::Private, Acl::Unrecognized("readonly".to_string())] {
            let mut xr = xr("my-bucket");
            xr.parameters.acl = acl;
            for style in [AccountNameStyle::Suffixed, AccountNameStyle::Compact] {
                let out = DeterministicComposer::new(style)
                    .compose_xr(&xr, &ObservedResources::new())
                    .unwrap();
                let cont = Value::from(out.desired["my-bucket-container"].clone());
                assert_eq!(cont["spec"]["forProvider"]["containerAccessType"], "private");
            }
        }
    }

    #[test]
    fn compact_style_pins_stripped_name() {
        let composer = DeterministicComposer::new(AccountNameStyle::Compact);
        assert_eq!(composer.style(), AccountNameStyle::Compact);

        let out = composer
            .compose_xr(&xr("my-bucket"), &ObservedResources::new())
            .unwrap();

        let acct = Value::from(out.desired["my-bucket-account"].clone());
        assert_eq!(acct["metadata"]["annotations"]["crossplane.io/external-name"], "mybucket");

        let cont = Value::from(out.desired["my-bucket-container"].clone());
        assert_eq!(cont["spec"]["forProvider"]["storageAccountName"], "mybucket");
    }
}
