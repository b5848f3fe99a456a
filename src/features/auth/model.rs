use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::shared::constants::ROLE_PLATFORM_OPERATOR;

/// Kind of operation a caller wants to perform on company-owned resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyOperation {
    Read,
    Write,
}

impl std::fmt::Display for CompanyOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompanyOperation::Read => write!(f, "read"),
            CompanyOperation::Write => write!(f, "write"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Caller identity, taken from the `sub` claim
    pub user_id: Uuid,
    pub roles: Vec<String>,
    /// Fine-grained grants such as `company:{id}:read`
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl AuthenticatedUser {
    /// Check if user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Check if user is a platform operator (bypasses ownership checks on reads)
    pub fn is_operator(&self) -> bool {
        self.has_role(ROLE_PLATFORM_OPERATOR)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Fails unless the caller holds a grant for `operation` on `company_id`.
    ///
    /// A write grant implies read access.
    pub fn ensure_company_access(
        &self,
        operation: CompanyOperation,
        company_id: Uuid,
    ) -> Result<(), AppError> {
        let write_grant = format!("company:{}:write", company_id);
        let allowed = match operation {
            CompanyOperation::Write => self.has_permission(&write_grant),
            CompanyOperation::Read => {
                self.has_permission(&write_grant)
                    || self.has_permission(&format!("company:{}:read", company_id))
            }
        };

        if allowed {
            Ok(())
        } else {
            Err(AppError::Unauthorized(format!(
                "No {} access to company {}",
                operation, company_id
            )))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomClaims {
    #[serde(rename = "type")]
    pub token_type: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub roles: Vec<String>,
}
