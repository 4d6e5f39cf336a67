//! Authentication service.
//!
//! Provides password login, SMS-code login and the dev-mode shortcut
//! accounts. Every successful path ends with an [`Account`] whose roles are
//! read from `user_roles`; callers turn it into a [`TokenPair`].

mod error;
pub mod tokens;

pub use error::AuthError;
pub use tokens::{Claims, TokenError, TokenKind, TokenPair, TokenService};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use tracing::{info, warn};

use dronshop_core::{ContactType, Email, Phone, UserId, roles};

use crate::db::RepositoryError;
use crate::db::bootstrap::DEV_USERS;
use crate::db::users::{NewUser, UserRepository};
use crate::models::{Account, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Fixed dev-mode credentials, keyed by the dev user's name.
const DEV_PASSWORDS: [(&str, &str); 2] = [("admin", "admin123"), ("buyer", "buyer123")];

/// A phone or email, normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contact {
    Phone(Phone),
    Email(Email),
}

impl Contact {
    /// Parse `value` as the given contact type.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidPhone` or `AuthError::InvalidEmail`.
    pub fn parse(kind: ContactType, value: &str) -> Result<Self, AuthError> {
        Ok(match kind {
            ContactType::Phone => Self::Phone(Phone::parse(value)?),
            ContactType::Email => Self::Email(Email::parse(value)?),
        })
    }

    #[must_use]
    pub const fn kind(&self) -> ContactType {
        match self {
            Self::Phone(_) => ContactType::Phone,
            Self::Email(_) => ContactType::Email,
        }
    }
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a verified buyer with a phone or email and a password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` or `AuthError::PasswordMismatch` for
    /// bad passwords and `AuthError::AlreadyRegistered` if the contact is taken.
    pub async fn register_with_password(
        &self,
        contact: &Contact,
        password: &str,
        password_confirm: &str,
    ) -> Result<Account, AuthError> {
        validate_password(password)?;
        if password != password_confirm {
            return Err(AuthError::PasswordMismatch);
        }

        if self.find(contact).await?.is_some() {
            return Err(AuthError::AlreadyRegistered(contact.kind()));
        }

        let password_hash = hash_password(password)?;
        let new = match contact {
            Contact::Phone(phone) => NewUser {
                phone: Some(phone),
                password_hash: Some(&password_hash),
                is_verified: true,
                ..NewUser::default()
            },
            Contact::Email(email) => NewUser {
                email: Some(email),
                password_hash: Some(&password_hash),
                is_verified: true,
                ..NewUser::default()
            },
        };

        let user = self.users.create(&new).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::AlreadyRegistered(contact.kind()),
            other => AuthError::Repository(other),
        })?;
        self.users.grant_role(user.id, roles::BUYER).await?;

        info!(user_id = %user.id, contact_type = %contact.kind(), "User registered with password");
        Ok(self.users.account(user).await?)
    }

    /// Login with a phone or email and a password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the contact/password is wrong
    /// and `AuthError::Blocked` if the account is blocked.
    pub async fn login_with_password(
        &self,
        contact: &Contact,
        password: &str,
    ) -> Result<Account, AuthError> {
        let found = match contact {
            Contact::Phone(phone) => self.users.get_password_hash_by_phone(phone).await?,
            Contact::Email(email) => self.users.get_password_hash_by_email(email).await?,
        };
        let (user, password_hash) = found.ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;
        ensure_not_blocked(&user)?;

        Ok(self.users.account(user).await?)
    }

    // =========================================================================
    // SMS code flow (code already verified by the caller)
    // =========================================================================

    /// Find the user with this phone or create a verified buyer.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Blocked` if the existing account is blocked.
    pub async fn register_by_phone(&self, phone: &Phone) -> Result<Account, AuthError> {
        let user = match self.users.get_by_phone(phone).await? {
            Some(user) => user,
            None => {
                let user = self
                    .users
                    .create(&NewUser {
                        phone: Some(phone),
                        is_verified: true,
                        ..NewUser::default()
                    })
                    .await?;
                self.users.grant_role(user.id, roles::BUYER).await?;
                info!(user_id = %user.id, "Buyer registered by phone");
                user
            }
        };
        ensure_not_blocked(&user)?;
        Ok(self.users.account(user).await?)
    }

    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` for an unknown phone and
    /// `AuthError::Blocked` for a blocked account.
    pub async fn login_by_phone(&self, phone: &Phone) -> Result<Account, AuthError> {
        let user = self
            .users
            .get_by_phone(phone)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        ensure_not_blocked(&user)?;
        Ok(self.users.account(user).await?)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Load the account behind a token subject.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user was deleted.
    pub async fn account(&self, user_id: UserId) -> Result<Account, AuthError> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(self.users.account(user).await?)
    }

    /// Account for a refresh-token exchange; blocked users cannot refresh.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` or `AuthError::Blocked`.
    pub async fn refresh_account(&self, user_id: UserId) -> Result<Account, AuthError> {
        let account = self.account(user_id).await?;
        ensure_not_blocked(&account.user)?;
        Ok(account)
    }

    /// Log in as one of the fixed dev accounts, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::DevLoginDisabled` when `enabled` is false and
    /// `AuthError::InvalidCredentials` for an unknown login or wrong password.
    pub async fn dev_login(
        &self,
        enabled: bool,
        login: &str,
        password: &str,
    ) -> Result<Account, AuthError> {
        if !enabled {
            return Err(AuthError::DevLoginDisabled);
        }

        let known = DEV_PASSWORDS
            .iter()
            .any(|(name, secret)| *name == login && *secret == password);
        let Some((phone, name, role_names)) = DEV_USERS
            .iter()
            .find(|(_, name, _)| known && *name == login)
        else {
            return Err(AuthError::InvalidCredentials);
        };

        let phone = Phone::parse(phone)?;
        let user = match self.users.get_by_phone(&phone).await? {
            Some(user) => user,
            None => {
                self.users
                    .create(&NewUser {
                        phone: Some(&phone),
                        name: Some(*name),
                        is_verified: true,
                        ..NewUser::default()
                    })
                    .await?
            }
        };
        for role in *role_names {
            self.users.grant_role(user.id, role).await?;
        }

        warn!(user_id = %user.id, login, "Dev login used");
        Ok(self.users.account(user).await?)
    }

    async fn find(&self, contact: &Contact) -> Result<Option<User>, RepositoryError> {
        match contact {
            Contact::Phone(phone) => self.users.get_by_phone(phone).await,
            Contact::Email(email) => self.users.get_by_email(email).await,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Reject blocked accounts.
///
/// # Errors
///
/// Returns `AuthError::Blocked` if `user.is_blocked`.
pub fn ensure_not_blocked(user: &User) -> Result<(), AuthError> {
    if user.is_blocked {
        return Err(AuthError::Blocked);
    }
    Ok(())
}

/// Validate password requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or an unparsable hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn user(blocked: bool) -> User {
        User {
            id: UserId::new(1),
            phone: Some("+70000000002".to_string()),
            email: None,
            name: None,
            is_verified: true,
            is_blocked: blocked,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
        assert!(matches!(
            validate_password("1234567"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_blocked_users_are_rejected() {
        assert!(ensure_not_blocked(&user(false)).is_ok());
        assert!(matches!(
            ensure_not_blocked(&user(true)),
            Err(AuthError::Blocked)
        ));
    }

    #[test]
    fn test_contact_parse_normalizes() {
        let phone = Contact::parse(ContactType::Phone, "+7 (000) 000-00-02").unwrap();
        assert_eq!(phone, Contact::Phone(Phone::parse("+70000000002").unwrap()));
        assert_eq!(phone.kind(), ContactType::Phone);

        assert!(matches!(
            Contact::parse(ContactType::Email, "not-an-email"),
            Err(AuthError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_dev_accounts_have_passwords() {
        for (_, name, _) in DEV_USERS {
            assert!(DEV_PASSWORDS.iter().any(|(login, _)| *login == name));
        }
    }
}
