// src/models/category.rs
// =============================================================================
// Categories group links. Display precedence: higher sort_order comes first.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub name: String,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

/// Ordering for category listings. `Desc` is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Sort orders for a user-supplied sequence: the first item gets the
/// highest value (len), the last gets 1.
pub fn display_orders<T>(items: &[T]) -> impl Iterator<Item = (&T, i64)> {
    let len = items.len() as i64;
    items
        .iter()
        .enumerate()
        .map(move |(i, item)| (item, len - i as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_orders_descend() {
        let names = ["a", "b", "c"];
        let orders: Vec<_> = display_orders(&names).map(|(n, o)| (*n, o)).collect();
        assert_eq!(orders, vec![("a", 3), ("b", 2), ("c", 1)]);
    }
}
