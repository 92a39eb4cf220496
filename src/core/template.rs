//! Saved orders - named item lists a user can replay into the current week.
//!
//! Items are stored as JSON in a single column. Names are unique per user, compared
//! ignoring case, like product names.

use crate::{
    core::order::{OrderItemRequest, QuantityLimits, validate_items},
    entities::{SavedOrder, saved_order},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// A decoded saved order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Name the user gave the template
    pub name: String,
    /// Items added when the template is applied
    pub items: Vec<OrderItemRequest>,
}

impl TryFrom<saved_order::Model> for Template {
    type Error = Error;

    fn try_from(model: saved_order::Model) -> Result<Self> {
        Ok(Self {
            items: serde_json::from_str(&model.items)?,
            name: model.name,
        })
    }
}

async fn find_template_model<C>(
    db: &C,
    user_id: i64,
    name: &str,
) -> Result<Option<saved_order::Model>>
where
    C: ConnectionTrait,
{
    let wanted = name.trim().to_lowercase();
    Ok(SavedOrder::find()
        .filter(saved_order::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .find(|t| t.name.to_lowercase() == wanted))
}

/// Saves `items` under `name` for the user.
///
/// # Errors
/// - `Validation` for an empty name or item list
/// - `InvalidQuantity` for any quantity outside `limits`
/// - `TemplateExists` if the user already has a template with this name
pub async fn save_template(
    db: &DatabaseConnection,
    user_id: i64,
    name: &str,
    items: &[OrderItemRequest],
    limits: QuantityLimits,
) -> Result<Template> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation {
            message: "Saved order name cannot be empty".to_string(),
        });
    }
    validate_items(items, limits)?;

    if find_template_model(db, user_id, name).await?.is_some() {
        return Err(Error::TemplateExists {
            name: name.to_string(),
        });
    }

    let now = chrono::Utc::now().naive_utc();
    let model = saved_order::ActiveModel {
        user_id: Set(user_id),
        name: Set(name.to_string()),
        items: Set(serde_json::to_string(items)?),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let saved = model.insert(db).await?;
    info!(user_id, template = name, items = items.len(), "Saved order template");
    Template::try_from(saved)
}

/// Loads one template by name.
///
/// # Errors
/// Returns `TemplateNotFound`, a database error, or a serialization error for a
/// corrupted row.
pub async fn get_template<C>(db: &C, user_id: i64, name: &str) -> Result<Template>
where
    C: ConnectionTrait,
{
    find_template_model(db, user_id, name)
        .await?
        .ok_or_else(|| Error::TemplateNotFound {
            name: name.to_string(),
        })?
        .try_into()
}

/// All templates of the user, sorted by name.
///
/// # Errors
/// Returns an error if the query fails or a row cannot be decoded.
pub async fn list_templates<C>(db: &C, user_id: i64) -> Result<Vec<Template>>
where
    C: ConnectionTrait,
{
    SavedOrder::find()
        .filter(saved_order::Column::UserId.eq(user_id))
        .order_by_asc(saved_order::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(Template::try_from)
        .collect()
}

/// Deletes a template.
///
/// # Errors
/// Returns `TemplateNotFound` or a database error.
pub async fn delete_template(db: &DatabaseConnection, user_id: i64, name: &str) -> Result<()> {
    let model = find_template_model(db, user_id, name)
        .await?
        .ok_or_else(|| Error::TemplateNotFound {
            name: name.to_string(),
        })?;
    SavedOrder::delete_by_id(model.id).exec(db).await?;
    info!(user_id, template = name, "Deleted order template");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn items() -> Vec<OrderItemRequest> {
        vec![
            OrderItemRequest::new("roll", 4),
            OrderItemRequest::new("bread", 1),
        ]
    }

    #[tokio::test]
    async fn test_save_template_validation() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let limits = QuantityLimits::default();

        let result = save_template(&db, 1, "  ", &items(), limits).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        let result = save_template(&db, 1, "weekday", &[], limits).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        let result = save_template(
            &db,
            1,
            "weekday",
            &[OrderItemRequest::new("roll", 0)],
            limits,
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidQuantity { quantity: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_save_and_get_template() -> Result<()> {
        let (db, user) = setup_with_catalog().await?;

        let saved = save_template(&db, user.id, "usual", &items(), QuantityLimits::default())
            .await?;
        assert_eq!(saved.items, items());

        let loaded = get_template(&db, user.id, "USUAL").await?;
        assert_eq!(loaded, saved);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_template_rejected_per_user() -> Result<()> {
        let (db, alice) = setup_with_catalog().await?;
        let bob = create_test_user(&db, "u2", "Bob").await?;
        let limits = QuantityLimits::default();

        save_template(&db, alice.id, "usual", &items(), limits).await?;
        let duplicate = save_template(&db, alice.id, "Usual", &items(), limits).await;
        assert!(matches!(duplicate.unwrap_err(), Error::TemplateExists { name: _ }));

        // Another user may use the same name
        save_template(&db, bob.id, "usual", &items(), limits).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_list_and_delete_templates() -> Result<()> {
        let (db, user) = setup_with_catalog().await?;
        let limits = QuantityLimits::default();
        save_template(&db, user.id, "weekend", &items(), limits).await?;
        save_template(&db, user.id, "monday", &items(), limits).await?;

        let names: Vec<String> = list_templates(&db, user.id)
            .await?
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["monday", "weekend"]);

        delete_template(&db, user.id, "monday").await?;
        assert_eq!(list_templates(&db, user.id).await?.len(), 1);

        let missing = delete_template(&db, user.id, "monday").await;
        assert!(matches!(missing.unwrap_err(), Error::TemplateNotFound { name: _ }));
        let missing = get_template(&db, user.id, "monday").await;
        assert!(matches!(missing.unwrap_err(), Error::TemplateNotFound { name: _ }));
        Ok(())
    }
}
