//! Parsing of free-text item lists typed into slash command options.
//!
//! The format is `name quantity` pairs separated by commas, e.g. `roll 2, bread 1`.

use crate::{
    core::order::OrderItemRequest,
    errors::{Error, Result},
};

/// Parses `"roll 2, bread 1"` into item requests.
///
/// Quantities are parsed as plain integers; range checks happen in the core so the
/// configured bounds apply.
///
/// # Errors
/// Returns `Validation` for an empty list, a missing quantity, or a non-numeric quantity.
pub fn parse_items(input: &str) -> Result<Vec<OrderItemRequest>> {
    let items = input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_item)
        .collect::<Result<Vec<_>>>()?;

    if items.is_empty() {
        return Err(Error::Validation {
            message: "Please list at least one item, e.g. `roll 2, bread 1`".to_string(),
        });
    }
    Ok(items)
}

fn parse_item(part: &str) -> Result<OrderItemRequest> {
    let Some((name, quantity)) = part.rsplit_once(char::is_whitespace) else {
        return Err(Error::Validation {
            message: format!("'{part}' needs a quantity, e.g. `{part} 1`"),
        });
    };

    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation {
            message: format!("'{part}' needs a product name"),
        });
    }
    let quantity = quantity.trim().parse::<i64>().map_err(|_| Error::Validation {
        message: format!("'{quantity}' is not a whole number"),
    })?;

    Ok(OrderItemRequest::new(name, quantity))
}
