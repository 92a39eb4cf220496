//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggestions never fail: if the database is unavailable the user simply gets no
//! suggestions and can still type the value by hand.

use crate::{
    bot::BotData,
    core::{product, template, user},
    errors::Error,
};

/// Discord autocomplete limit
const MAX_CHOICES: usize = 25;

/// Provides autocomplete suggestions for product names.
///
/// Returns active products whose name contains the partial input, ignoring case.
pub async fn autocomplete_product_name(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let Ok(products) = product::get_all_active_products(ctx.data().database()).await else {
        return Vec::new();
    };

    let partial_lower = partial.to_lowercase();
    products
        .into_iter()
        .filter(|prod| prod.name.to_lowercase().contains(&partial_lower))
        .map(|prod| prod.name)
        .take(MAX_CHOICES)
        .collect()
}

/// Provides autocomplete suggestions for the invoking user's saved order names.
pub async fn autocomplete_template_name(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let db = ctx.data().database();
    let external_id = ctx.author().id.to_string();

    let Ok(Some(user)) = user::get_user_by_external_id(db, &external_id).await else {
        return Vec::new();
    };
    let Ok(templates) = template::list_templates(db, user.id).await else {
        return Vec::new();
    };

    let partial_lower = partial.to_lowercase();
    templates
        .into_iter()
        .filter(|t| t.name.to_lowercase().contains(&partial_lower))
        .map(|t| t.name)
        .take(MAX_CHOICES)
        .collect()
}

/// Completes the product name of the last entry in an item list such as `roll 2, br`.
pub async fn autocomplete_item_list(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let Ok(products) = product::get_all_active_products(ctx.data().database()).await else {
        return vec![partial.to_string()];
    };
    let names: Vec<String> = products.into_iter().map(|p| p.name).collect();
    complete_item_list(partial, &names)
}

/// Suggests completions for the entry after the last comma.
///
/// An entry that already has a quantity is left as typed. Otherwise every product
/// containing the entry text is offered with quantity 1.
#[must_use]
pub fn complete_item_list(partial: &str, product_names: &[String]) -> Vec<String> {
    let (done, current) = match partial.rsplit_once(',') {
        Some((done, current)) => (format!("{}, ", done.trim_end()), current.trim()),
        None => (String::new(), partial.trim()),
    };

    if current.contains(char::is_whitespace) {
        return vec![partial.to_string()];
    }

    let current_lower = current.to_lowercase();
    let mut suggestions: Vec<String> = product_names
        .iter()
        .filter(|name| name.to_lowercase().contains(&current_lower))
        .map(|name| format!("{done}{name} 1"))
        .take(MAX_CHOICES)
        .collect();
    if suggestions.is_empty() && !partial.trim().is_empty() {
        suggestions.push(partial.to_string());
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["bread".to_string(), "roll".to_string(), "vollkorn".to_string()]
    }

    #[test]
    fn test_complete_first_entry() {
        assert_eq!(complete_item_list("ro", &names()), vec!["roll 1"]);
        assert_eq!(complete_item_list("", &names()).len(), 3);
    }

    #[test]
    fn test_complete_after_comma() {
        assert_eq!(
            complete_item_list("roll 2,  BR", &names()),
            vec!["roll 2, bread 1"]
        );
        assert_eq!(
            complete_item_list("roll 2, ll", &names()),
            vec!["roll 2, roll 1", "roll 2, vollkorn 1"]
        );
    }

    #[test]
    fn test_entry_with_quantity_is_kept() {
        assert_eq!(complete_item_list("roll 2", &names()), vec!["roll 2"]);
        assert_eq!(complete_item_list("bagel", &names()), vec!["bagel"]);
    }
}
