//! Role resolution against the external user-profile collaborator.
//!
//! Authentication and session issuance live outside this system; here we
//! only answer "what role does this user have", defaulting to `customer`
//! when no profile row exists. Entry points resolve the role once per
//! request and hand the result down — the policy layer never queries twice
//! for the same check.

use async_trait::async_trait;
use model::UserRole;
use repository::RepositoryError;
use tokio_postgres::Client;

/// Resolves a user's marketplace role.
#[async_trait]
pub trait RoleResolver: Send + Sync {
    async fn resolve_user_role(&self, user_id: &str) -> Result<UserRole, RepositoryError>;
}

/// PostgreSQL implementation reading the `user_profiles` table.
pub struct PgRoleResolver {
    db: Client,
}

impl PgRoleResolver {
    pub fn new(db: Client) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoleResolver for PgRoleResolver {
    async fn resolve_user_role(&self, user_id: &str) -> Result<UserRole, RepositoryError> {
        let row = self
            .db
            .query_opt("SELECT role FROM user_profiles WHERE user_id = $1", &[&user_id])
            .await?;
        match row {
            Some(row) => {
                let role: String = row.get("role");
                role.parse()
                    .map_err(|e| RepositoryError::Corrupt(format!("{e}")))
            }
            // No profile yet: every authenticated user is at least a customer.
            None => Ok(UserRole::Customer),
        }
    }
}
