//! Admin bootstrap command.
//!
//! ```bash
//! dronshop-cli admin create --phone +79990001122 --name "Store Admin"
//! ```
//!
//! Creates a verified user with the `buyer` and `admin` roles. When the phone
//! is already registered the existing user is promoted instead; `--name` and
//! `--email` are then ignored.

use dronshop_core::{Email, Phone, roles};
use dronshop_server::db::UserRepository;
use dronshop_server::db::users::NewUser;

use super::{CommandError, connect};

/// Create or promote an admin. Returns the user's ID.
pub async fn create(
    phone: &str,
    name: Option<&str>,
    email: Option<&str>,
) -> Result<i32, CommandError> {
    let phone = Phone::parse(phone).map_err(|e| CommandError::Invalid(format!("Invalid phone: {e}")))?;
    let email = email
        .map(Email::parse)
        .transpose()
        .map_err(|e| CommandError::Invalid(format!("Invalid email: {e}")))?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    let user = if let Some(existing) = users.get_by_phone(&phone).await? {
        tracing::info!(user_id = %existing.id, "User exists, granting admin");
        existing
    } else {
        let user = users
            .create(&NewUser {
                phone: Some(&phone),
                email: email.as_ref(),
                name,
                password_hash: None,
                is_verified: true,
            })
            .await?;
        tracing::info!(user_id = %user.id, phone = %phone, "User created");
        user
    };

    users.grant_role(user.id, roles::BUYER).await?;
    users.grant_role(user.id, roles::ADMIN).await?;

    tracing::info!(
        "Admin ready! ID: {}, Phone: {}. Sign in with an SMS code for this phone.",
        user.id,
        phone
    );
    Ok(user.id.as_i32())
}
