//! Tenancy access rule
//!
//! Every read and write against tenant-owned rows passes through this
//! module: row visibility on reads (a row the principal cannot see behaves
//! exactly like a missing row) and a written-value check on writes (the
//! company id in the new row must itself satisfy the rule).
//!
//! The rule is a pure predicate over the membership store: a principal may
//! touch a company's rows iff a membership links them (any role) or the
//! principal carries the global superuser capability.

use crate::{
    error::{Error, Result},
    storage::View,
    types::Principal,
};
use uuid::Uuid;

/// Whether the principal may read or write rows owned by `company_id`.
pub(crate) fn can_access(view: &View<'_>, principal: &Principal, company_id: Uuid) -> Result<bool> {
    if principal.superuser {
        return Ok(true);
    }
    Ok(view.membership(company_id, principal.id)?.is_some())
}

/// WITH-CHECK on writes. Denials carry no identifiers so a rejected write
/// does not reveal whether the target row exists.
pub(crate) fn check_write(
    view: &View<'_>,
    principal: &Principal,
    company_id: Uuid,
) -> Result<()> {
    if can_access(view, principal, company_id)? {
        Ok(())
    } else {
        Err(Error::PermissionDenied)
    }
}
