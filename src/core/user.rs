//! User business logic - Registration, display names and notification flags.
//!
//! Users are identified by their chat platform id. They are registered on first
//! interaction and never deleted; the `away` and `receives_digest` flags decide who
//! the scheduled jobs notify.

use crate::{
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Finds a user by external id.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_user_by_external_id<C>(db: &C, external_id: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::ExternalId.eq(external_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a user by external id, failing with `UserNotFound` if they never registered.
///
/// # Errors
/// Returns `UserNotFound` or a database error.
pub async fn require_user<C>(db: &C, external_id: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    get_user_by_external_id(db, external_id)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            user_id: external_id.to_string(),
        })
}

/// Registers a new user. Users listed in `admin_ids` are created as admins.
///
/// # Errors
/// Returns a validation error for an empty id or name, or a database error.
pub async fn register_user(
    db: &DatabaseConnection,
    external_id: &str,
    name: &str,
    admin_ids: &[String],
) -> Result<user::Model> {
    if external_id.trim().is_empty() {
        return Err(Error::Validation {
            message: "User id cannot be empty".to_string(),
        });
    }
    let name = validate_name(name)?;

    let is_admin = admin_ids.iter().any(|id| id == external_id);
    let model = user::ActiveModel {
        external_id: Set(external_id.to_string()),
        name: Set(name),
        is_away: Set(false),
        is_admin: Set(is_admin),
        receives_digest: Set(false),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = model.insert(db).await?;
    info!(external_id, is_admin, "Registered new user");
    Ok(created)
}

/// Returns the registered user, registering them with `name` on first interaction.
///
/// # Errors
/// Returns an error if registration or the lookup fails.
pub async fn get_or_register_user(
    db: &DatabaseConnection,
    external_id: &str,
    name: &str,
    admin_ids: &[String],
) -> Result<user::Model> {
    if let Some(existing) = get_user_by_external_id(db, external_id).await? {
        return Ok(existing);
    }
    register_user(db, external_id, name, admin_ids).await
}

/// Changes a user's display name.
///
/// # Errors
/// Returns `UserNotFound`, a validation error for an empty name, or a database error.
pub async fn update_user_name(
    db: &DatabaseConnection,
    external_id: &str,
    new_name: &str,
) -> Result<user::Model> {
    let new_name = validate_name(new_name)?;
    let mut model: user::ActiveModel = require_user(db, external_id).await?.into();
    model.name = Set(new_name);
    model.update(db).await.map_err(Into::into)
}

/// Marks a user as away (no reminders, no digest) or back.
///
/// # Errors
/// Returns `UserNotFound` or a database error.
pub async fn set_away(db: &DatabaseConnection, external_id: &str, away: bool) -> Result<user::Model> {
    let mut model: user::ActiveModel = require_user(db, external_id).await?.into();
    model.is_away = Set(away);
    model.update(db).await.map_err(Into::into)
}

/// Opts a user in or out of the weekly digest.
///
/// # Errors
/// Returns `UserNotFound` or a database error.
pub async fn set_receives_digest(
    db: &DatabaseConnection,
    external_id: &str,
    receives_digest: bool,
) -> Result<user::Model> {
    let mut model: user::ActiveModel = require_user(db, external_id).await?.into();
    model.receives_digest = Set(receives_digest);
    model.update(db).await.map_err(Into::into)
}

/// Users who should get the daily reminder: everyone who is not away.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn reminder_recipients(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .filter(user::Column::IsAway.eq(false))
        .order_by_asc(user::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Users who should get the weekly digest: opted in and not away.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn digest_recipients(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .filter(user::Column::ReceivesDigest.eq(true))
        .filter(user::Column::IsAway.eq(false))
        .order_by_asc(user::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation {
            message: "Name cannot be empty".to_string(),
        });
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_get_or_register_user_registers_once() -> Result<()> {
        let db = setup_test_db().await?;

        let first = get_or_register_user(&db, "123", "Alice", &[]).await?;
        let second = get_or_register_user(&db, "123", "Someone else", &[]).await?;

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Alice");
        assert!(!first.is_admin);
        assert!(!first.is_away);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_admin_from_configured_ids() -> Result<()> {
        let db = setup_test_db().await?;
        let admins = vec!["42".to_string()];

        let admin = register_user(&db, "42", "Admin", &admins).await?;
        let regular = register_user(&db, "43", "Regular", &admins).await?;

        assert!(admin.is_admin);
        assert!(!regular.is_admin);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_user_name() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "7", "Old").await?;

        let updated = update_user_name(&db, "7", "  New Name ").await?;
        assert_eq!(updated.name, "New Name");

        let empty = update_user_name(&db, "7", "   ").await;
        assert!(matches!(empty.unwrap_err(), Error::Validation { message: _ }));

        let missing = update_user_name(&db, "8", "Nobody").await;
        assert!(matches!(missing.unwrap_err(), Error::UserNotFound { user_id: _ }));
        Ok(())
    }

    #[tokio::test]
    async fn test_recipient_lists_respect_flags() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "1", "Anna").await?;
        create_test_user(&db, "2", "Ben").await?;
        create_test_user(&db, "3", "Cleo").await?;

        set_away(&db, "2", true).await?;
        set_receives_digest(&db, "2", true).await?;
        set_receives_digest(&db, "3", true).await?;

        let reminders: Vec<String> = reminder_recipients(&db)
            .await?
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(reminders, vec!["Anna", "Cleo"]);

        let digest: Vec<String> = digest_recipients(&db)
            .await?
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(digest, vec!["Cleo"]);
        Ok(())
    }
}
