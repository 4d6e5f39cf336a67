//! User rows and account views.

use chrono::{DateTime, Utc};
use serde::Serialize;

use dronshop_core::{UserId, roles};

/// A row from `users`. The password hash is never loaded into this type.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub is_verified: bool,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
}

/// A user together with the role names assigned through `user_roles`.
#[derive(Debug, Clone)]
pub struct Account {
    pub user: User,
    pub roles: Vec<String>,
}

impl Account {
    /// Whether the account holds the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == roles::ADMIN)
    }
}

/// `GET /api/auth/me` response.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: UserId,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
}

impl From<Account> for MeResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.user.id,
            phone: account.user.phone,
            name: account.user.name,
            email: account.user.email,
            roles: account.roles,
        }
    }
}

/// Row in the admin user list.
#[derive(Debug, Serialize)]
pub struct AdminUserOut {
    pub id: UserId,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub is_blocked: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AdminUserOut {
    fn from(account: Account) -> Self {
        let Account { user, roles } = account;
        Self {
            id: user.id,
            phone: user.phone,
            email: user.email,
            name: user.name,
            roles,
            is_blocked: user.is_blocked,
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}
