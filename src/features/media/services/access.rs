//! Read access policy for stored media files.
//!
//! The rules are guard clauses evaluated top to bottom and the first match
//! wins. Operators are let through before the inactive check, so an inactive
//! file stays readable for them while everybody else gets `NotFound`.

use uuid::Uuid;

use crate::features::auth::AuthenticatedUser;
use crate::features::media::models::MediaFile;

/// Why a caller was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Private file requested without credentials
    Anonymous,
    /// Private personal file requested by someone other than its creator
    NotOwner,
}

/// Outcome of the read access policy for one caller and one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    NotFound,
    Unauthorized(Denial),
    /// Allowed only if the caller passes the company read check
    DelegateToCompany(Uuid),
    /// No rule matched
    Unresolvable,
}

pub fn decide_access(file: &MediaFile, caller: Option<&AuthenticatedUser>) -> AccessDecision {
    if file.public_visible && file.is_active {
        return AccessDecision::Allow;
    }

    if caller.is_some_and(AuthenticatedUser::is_operator) {
        return AccessDecision::Allow;
    }

    if !file.is_active {
        return AccessDecision::NotFound;
    }

    if !file.public_visible {
        let Some(caller) = caller else {
            return AccessDecision::Unauthorized(Denial::Anonymous);
        };

        return match file.company_id {
            Some(company_id) => AccessDecision::DelegateToCompany(company_id),
            None if file.created_by == Some(caller.user_id) => AccessDecision::Allow,
            None => AccessDecision::Unauthorized(Denial::NotOwner),
        };
    }

    AccessDecision::Unresolvable
}
