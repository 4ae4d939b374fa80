//! Chained external-name composition.
//!
//! The Resource Group is always desired. The Account references the group by
//! its external name, which only exists once the provider has created the
//! group, so the chain stops there until the group is observed with an
//! external-name annotation. The reconciler calls again after every change
//! to a composed resource, so a stopped chain resumes on a later pass.

use crate::azure;
use crate::compose::{observed_external_name, Composer, Composition, ObservedResources};
use crate::error::ComposeResult;
use crate::naming;
use crate::resource::ObjectMeta;
use crate::xr::StorageXr;

/// Function-local keys of the chained resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKeys {
    /// Key of the Resource Group.
    pub group: String,
    /// Key of the Storage Account.
    pub account: String,
    /// Key of the Storage Container.
    pub container: String,
}

impl ResourceKeys {
    /// Creates a key set.
    #[must_use]
    pub fn new(
        group: impl Into<String>,
        account: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            account: account.into(),
            container: container.into(),
        }
    }
}

impl Default for ResourceKeys {
    fn default() -> Self {
        Self::new("group", "acct", "cont")
    }
}

/// Who names the storage account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountNaming {
    /// The account's cloud name is the hyphen-stripped XR name, pinned with
    /// an external-name annotation. The container can reference it in the
    /// same pass.
    #[default]
    Derived,
    /// The provider names the account. The container waits until the
    /// observed account reports its external name.
    Observed,
}

/// Composer that follows the group -> account -> container chain.
#[derive(Debug, Clone, Default)]
pub struct ChainedComposer {
    keys: ResourceKeys,
    account_naming: AccountNaming,
}

impl ChainedComposer {
    /// Creates a composer with default keys and a derived account name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the given resource keys.
    #[must_use]
    pub fn with_keys(mut self, keys: ResourceKeys) -> Self {
        self.keys = keys;
        self
    }

    /// Uses the given account naming mode.
    #[must_use]
    pub const fn with_account_naming(mut self, naming: AccountNaming) -> Self {
        self.account_naming = naming;
        self
    }
}

impl Composer for ChainedComposer {
    fn name(&self) -> &'static str {
        "chained"
    }

    fn compose_xr(
        &self,
        xr: &StorageXr,
        observed: &ObservedResources,
    ) -> ComposeResult<Composition> {
        let params = &xr.parameters;
        let keys = &self.keys;
        let mut out = Composition::default();

        out.emit(&keys.group, &azure::resource_group(params))?;

        let group_name = match observed_external_name(observed, &keys.group) {
            Ok(name) => name,
            Err(reason) => return Ok(out.waiting_on(&keys.group, "resource group", reason)),
        };

        match self.account_naming {
            AccountNaming::Derived => {
                let account_name = naming::checked_account_name(&xr.name);
                let account = azure::account(
                    params,
                    Some(ObjectMeta::with_external_name(&account_name)),
                    Some(group_name),
                );
                out.emit(&keys.account, &account)?;
                out.emit(
                    &keys.container,
                    &azure::container(params, None, &account_name),
                )?;
            }
            AccountNaming::Observed => {
                out.emit(&keys.account, &azure::account(params, None, Some(group_name)))?;

                let account_name = match observed_external_name(observed, &keys.account) {
                    Ok(name) => name,
                    Err(reason) => {
                        return Ok(out.waiting_on(&keys.account, "storage account", reason));
                    }
                };
                out.emit(
                    &keys.container,
                    &azure::container(params, None, account_name),
                )?;
            }
        }

        Ok(out)
    }
}
