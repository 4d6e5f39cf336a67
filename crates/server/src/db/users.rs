//! User and role repository.
//!
//! Roles live only in the normalized `roles` / `user_roles` relation.

use std::collections::HashMap;

use sqlx::PgPool;

use dronshop_core::{Email, Phone, RoleId, UserId};

use super::RepositoryError;
use crate::models::{Account, User};

const USER_COLUMNS: &str = "id, phone, email, name, is_verified, is_blocked, created_at";

/// Fields for a new user row.
#[derive(Debug, Default)]
pub struct NewUser<'a> {
    pub phone: Option<&'a Phone>,
    pub email: Option<&'a Email>,
    pub name: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub is_verified: bool,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Get a user by normalized phone number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_phone(&self, phone: &Phone) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE phone = $1"
        ))
        .bind(phone.as_str())
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Get a user by normalized email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Get a user and their password hash by phone.
    ///
    /// Returns `None` if the user does not exist or has no password set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash_by_phone(
        &self,
        phone: &Phone,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        self.get_password_hash("phone", phone.as_str()).await
    }

    /// Get a user and their password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        self.get_password_hash("email", email.as_str()).await
    }

    async fn get_password_hash(
        &self,
        column: &'static str,
        value: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            user: User,
            password_hash: Option<String>,
        }

        let row = sqlx::query_as::<_, Row>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.and_then(|r| r.password_hash.map(|hash| (r.user, hash))))
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the phone or email is already registered.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewUser<'_>) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (phone, email, name, password_hash, is_verified)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(new.phone.map(Phone::as_str))
        .bind(new.email.map(Email::as_str))
        .bind(new.name)
        .bind(new.password_hash)
        .bind(new.is_verified)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_or_database(e, "contact already registered"))
    }

    /// List all users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(users)
    }

    /// Set or clear the blocked flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_blocked(&self, id: UserId, blocked: bool) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET is_blocked = $2 WHERE id = $1")
            .bind(id)
            .bind(blocked)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Set the display name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_name(&self, id: UserId, name: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Delete a user. Role assignments cascade; reviews keep their text.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Roles
    // =========================================================================

    /// Get the ID of a role, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ensure_role(&self, name: &str) -> Result<RoleId, RepositoryError> {
        let id = sqlx::query_scalar::<_, RoleId>(
            "INSERT INTO roles (name) VALUES ($1)
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
             RETURNING id",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }

    /// Assign a role to a user (creating the role if needed). Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn grant_role(&self, user_id: UserId, role: &str) -> Result<(), RepositoryError> {
        let role_id = self.ensure_role(role).await?;
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Remove a role from a user. Removing a role the user lacks is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revoke_role(&self, user_id: UserId, role: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "DELETE FROM user_roles
             WHERE user_id = $1
               AND role_id IN (SELECT id FROM roles WHERE name = $2)",
        )
        .bind(user_id)
        .bind(role)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Role names assigned to a user, sorted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn roles_for(&self, user_id: UserId) -> Result<Vec<String>, RepositoryError> {
        let roles = sqlx::query_scalar::<_, String>(
            "SELECT r.name FROM roles r
             JOIN user_roles ur ON ur.role_id = r.id
             WHERE ur.user_id = $1
             ORDER BY r.name",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(roles)
    }

    /// Role names for many users in one query.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn roles_for_many(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, Vec<String>>, RepositoryError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<i32> = user_ids.iter().map(UserId::as_i32).collect();
        let rows = sqlx::query_as::<_, (UserId, String)>(
            "SELECT ur.user_id, r.name FROM user_roles ur
             JOIN roles r ON r.id = ur.role_id
             WHERE ur.user_id = ANY($1)
             ORDER BY ur.user_id, r.name",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<UserId, Vec<String>> = HashMap::new();
        for (user_id, role) in rows {
            grouped.entry(user_id).or_default().push(role);
        }
        Ok(grouped)
    }

    /// Load a user with their roles.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn account(&self, user: User) -> Result<Account, RepositoryError> {
        let roles = self.roles_for(user.id).await?;
        Ok(Account { user, roles })
    }
}
