//! Idempotent startup data: base roles, default settings, dev accounts.

use sqlx::PgPool;
use tracing::{info, instrument};

use dronshop_core::{Phone, roles};

use super::RepositoryError;
use super::settings::SettingsRepository;
use super::users::{NewUser, UserRepository};

/// Accounts created when `DEV_SEED` is on: `(phone, name, roles)`.
pub const DEV_USERS: [(&str, &str, &[&str]); 2] = [
    ("+70000000001", "admin", &[roles::BUYER, roles::ADMIN]),
    ("+70000000002", "buyer", &[roles::BUYER]),
];

/// Ensure the rows every deployment relies on exist.
///
/// # Errors
///
/// Returns `RepositoryError` if any query fails.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool, dev_seed: bool) -> Result<(), RepositoryError> {
    let users = UserRepository::new(pool);
    users.ensure_role(roles::ADMIN).await?;
    users.ensure_role(roles::BUYER).await?;

    if SettingsRepository::new(pool).seed_defaults_if_empty().await? {
        info!("Default site settings written");
    }

    if dev_seed {
        for (phone, name, role_names) in DEV_USERS {
            let phone = Phone::parse(phone)
                .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
            let user = match users.get_by_phone(&phone).await? {
                Some(user) => user,
                None => {
                    info!(phone = %phone, "Creating dev user");
                    users
                        .create(&NewUser {
                            phone: Some(&phone),
                            name: Some(name),
                            is_verified: true,
                            ..NewUser::default()
                        })
                        .await?
                }
            };
            for role in role_names {
                users.grant_role(user.id, role).await?;
            }
        }
    }

    Ok(())
}
