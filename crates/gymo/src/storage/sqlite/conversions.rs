//! SQLite row conversion functions.
//!
//! Pure functions for converting between SQLite rows and domain types.
//! Relation columns are not part of the row; the repository fills them in.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;

use gymo_core::catalog::{Category, Item, Lifecycle, Menu, Price};

/// Reads the four lifecycle columns starting at `offset`.
///
/// Expected columns: is_active, created_at, updated_at, deleted_at
fn row_to_lifecycle(row: &Row, offset: usize) -> rusqlite::Result<Lifecycle> {
    let is_active: bool = row.get(offset)?;
    let created_at: String = row.get(offset + 1)?;
    let updated_at: String = row.get(offset + 2)?;
    let deleted_at: Option<String> = row.get(offset + 3)?;

    Ok(Lifecycle {
        is_active,
        created_at: parse_datetime(offset + 1, &created_at)?,
        updated_at: parse_datetime(offset + 2, &updated_at)?,
        deleted_at: deleted_at
            .map(|s| parse_datetime(offset + 3, &s))
            .transpose()?,
    })
}

/// Convert a SQLite row to a Menu with no category links.
///
/// Expected columns: id, title, description, is_active, created_at, updated_at, deleted_at
pub fn row_to_menu(row: &Row) -> rusqlite::Result<Menu> {
    Ok(Menu {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category_ids: Vec::new(),
        lifecycle: row_to_lifecycle(row, 3)?,
    })
}

/// Convert a SQLite row to a Category with no relations.
///
/// Expected columns: id, title, description, is_active, created_at, updated_at, deleted_at
pub fn row_to_category(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        menu_ids: Vec::new(),
        item_ids: Vec::new(),
        lifecycle: row_to_lifecycle(row, 3)?,
    })
}

/// Convert a SQLite row to an Item.
///
/// Expected columns: id, title, description, price, category_id, is_active,
/// created_at, updated_at, deleted_at
pub fn row_to_item(row: &Row) -> rusqlite::Result<Item> {
    let price: Option<i64> = row.get(3)?;

    Ok(Item {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        price: price.map(Price),
        category_id: row.get(4)?,
        lifecycle: row_to_lifecycle(row, 5)?,
    })
}

/// Parse a datetime from RFC 3339 string.
fn parse_datetime(column: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

/// Format a DateTime for SQLite storage.
///
/// Always microsecond precision with a `Z` suffix, so stored values sort
/// chronologically as plain text.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}
