//! SQLite repository implementation.
//!
//! Implements the repository traits from `gymo_core::storage` using SQLite.
//! Every multi-statement write runs inside one transaction on the
//! `tokio-rusqlite` connection thread.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Params, Row};
use tokio_rusqlite::Connection;

use gymo_core::catalog::{
    ensure_visible, Category, CategoryId, EntityKind, Item, ItemId, Menu, MenuId, NewCategory, NewItem, NewMenu,
    Visibility,
};
use gymo_core::storage::{
    CategoryRepository, ItemRepository, MenuRepository, RepositoryError, Result,
};

use super::conversions::{format_datetime, row_to_category, row_to_item, row_to_menu};
use super::error::{map_tokio_rusqlite_error, ErrorContext};
use super::schema::{self, CATEGORY_COLUMNS, ITEM_COLUMNS, MENU_COLUMNS};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// Outcome of a write that targets one existing row.
enum RowState<T> {
    Missing,
    AlreadyDeleted,
    Rejected(RepositoryError),
    Done(T),
}

impl<T> RowState<T> {
    fn into_result(self, kind: EntityKind, id: i64) -> Result<T> {
        match self {
            RowState::Missing => Err(RepositoryError::NotFound {
                entity_type: kind.display_name(),
                id,
            }),
            RowState::AlreadyDeleted => Err(RepositoryError::Deleted {
                entity_type: kind.display_name(),
                id,
            }),
            RowState::Rejected(err) => Err(err),
            RowState::Done(value) => Ok(value),
        }
    }
}

fn fetch_all<T, P, F>(
    conn: &rusqlite::Connection,
    sql: &str,
    params: P,
    f: F,
) -> rusqlite::Result<Vec<T>>
where
    P: Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, f)?;
    rows.collect()
}

fn fetch_optional<T, P, F>(
    conn: &rusqlite::Connection,
    sql: &str,
    params: P,
    f: F,
) -> rusqlite::Result<Option<T>>
where
    P: Params,
    F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
{
    conn.query_row(sql, params, f).optional()
}

/// Reads `deleted_at` for a row: `None` if the row does not exist.
fn deletion_state(
    conn: &rusqlite::Connection,
    table: &str,
    id: i64,
) -> rusqlite::Result<Option<Option<String>>> {
    fetch_optional(
        conn,
        &format!("SELECT deleted_at FROM {table} WHERE id = ?1"),
        [id],
        |row| row.get(0),
    )
}

/// Explains why a guarded UPDATE touched nothing.
fn untouched_state<T>(
    conn: &rusqlite::Connection,
    table: &str,
    id: i64,
) -> rusqlite::Result<RowState<T>> {
    Ok(match deletion_state(conn, table, id)? {
        Some(Some(_)) => RowState::AlreadyDeleted,
        _ => RowState::Missing,
    })
}

/// Fails with `RelationNotFound` unless every id names a visible row of
/// `table` at this point of the transaction.
fn check_visible(
    conn: &rusqlite::Connection,
    relation: &'static str,
    table: &str,
    ids: &[i64],
) -> rusqlite::Result<Result<()>> {
    if ids.is_empty() {
        return Ok(Ok(()));
    }
    let sql = schema::select_visible_ids(table, ids.len());
    let found: BTreeSet<i64> = fetch_all(conn, &sql, params_from_iter(ids.iter()), |row| row.get(0))?
        .into_iter()
        .collect();
    Ok(ensure_visible(relation, ids, |id| found.contains(&id)))
}

fn check_category_refs(
    conn: &rusqlite::Connection,
    menu_ids: &[MenuId],
    item_ids: &[ItemId],
) -> rusqlite::Result<Result<()>> {
    if let Err(err) = check_visible(conn, "menuIds", "menus", menu_ids)? {
        return Ok(Err(err));
    }
    check_visible(conn, "itemIds", "items", item_ids)
}

fn menu_with_links(conn: &rusqlite::Connection, mut menu: Menu) -> rusqlite::Result<Menu> {
    menu.category_ids = fetch_all(conn, schema::SELECT_CATEGORY_IDS_FOR_MENU, [menu.id], |row| {
        row.get(0)
    })?;
    Ok(menu)
}

fn category_with_links(
    conn: &rusqlite::Connection,
    mut category: Category,
) -> rusqlite::Result<Category> {
    category.menu_ids = fetch_all(
        conn,
        schema::SELECT_MENU_IDS_FOR_CATEGORY,
        [category.id],
        |row| row.get(0),
    )?;
    category.item_ids = fetch_all(
        conn,
        schema::SELECT_ITEM_IDS_FOR_CATEGORY,
        [category.id],
        |row| row.get(0),
    )?;
    Ok(category)
}

fn load_menu(conn: &rusqlite::Connection, id: MenuId) -> rusqlite::Result<Option<Menu>> {
    let sql = schema::select_by_id("menus", MENU_COLUMNS);
    fetch_optional(conn, &sql, [id], row_to_menu)?
        .map(|menu| menu_with_links(conn, menu))
        .transpose()
}

fn load_category(
    conn: &rusqlite::Connection,
    id: CategoryId,
) -> rusqlite::Result<Option<Category>> {
    let sql = schema::select_by_id("categories", CATEGORY_COLUMNS);
    fetch_optional(conn, &sql, [id], row_to_category)?
        .map(|category| category_with_links(conn, category))
        .transpose()
}

fn load_item(conn: &rusqlite::Connection, id: ItemId) -> rusqlite::Result<Option<Item>> {
    let sql = schema::select_by_id("items", ITEM_COLUMNS);
    fetch_optional(conn, &sql, [id], row_to_item)
}

/// Rewrites the menu links and item ownership of one category.
fn write_category_relations(
    conn: &rusqlite::Connection,
    category_id: CategoryId,
    menu_ids: &[MenuId],
    item_ids: &[ItemId],
) -> rusqlite::Result<()> {
    conn.execute(schema::DELETE_LINKS_FOR_CATEGORY, [category_id])?;
    for menu_id in menu_ids {
        conn.execute(schema::INSERT_CATEGORY_MENU, params![category_id, menu_id])?;
    }
    conn.execute(schema::RELEASE_ITEMS, [category_id])?;
    for item_id in item_ids {
        conn.execute(schema::ASSIGN_ITEM, params![category_id, item_id])?;
    }
    Ok(())
}

/// SQLite-based repository implementation.
///
/// Provides async access to SQLite storage for all entity types.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Creates a new repository with a file-based database.
    ///
    /// The database file will be created if it doesn't exist.
    /// Schema tables are created automatically.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::Internal(format!("Cannot open {path}: {e}")))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Creates a new repository with an in-memory database.
    ///
    /// Useful for testing - data is lost when the connection is dropped.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::Internal(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Configure the connection and create the schema.
    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.busy_timeout(BUSY_TIMEOUT).map_err(wrap_err)?;
            conn.pragma_update(None, "foreign_keys", true)
                .map_err(wrap_err)?;
            conn.execute_batch(schema::CREATE_TABLES)
                .map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Schema")))
    }
}

// ============================================================================
// MenuRepository implementation
// ============================================================================

#[async_trait]
impl MenuRepository for SqliteRepository {
    async fn get_menu_by_title(&self, title: &str) -> Result<Option<Menu>> {
        let title = title.to_string();

        self.conn
            .call(move |conn| {
                let sql = schema::select_by_title("menus", MENU_COLUMNS);
                fetch_optional(conn, &sql, [&title], row_to_menu)
                    .and_then(|menu| menu.map(|m| menu_with_links(conn, m)).transpose())
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Menu")))
    }

    async fn create_menu(&self, menu: &NewMenu) -> Result<Menu> {
        let title = menu.title.clone();
        let description = menu.description.clone();
        let now = format_datetime(&Utc::now());

        self.conn
            .call(move |conn| {
                conn.execute(schema::INSERT_MENU, params![title, description, now])
                    .map_err(wrap_err)?;
                let id = conn.last_insert_rowid();
                load_menu(conn, id)
                    .and_then(|menu| menu.ok_or(rusqlite::Error::QueryReturnedNoRows))
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::with_title("Menu", &menu.title)))
    }

    async fn get_menu(&self, id: MenuId, visibility: Visibility) -> Result<Option<Menu>> {
        let menu = self
            .conn
            .call(move |conn| load_menu(conn, id).map_err(wrap_err))
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Menu")))?;

        Ok(menu.filter(|m| m.lifecycle.matches(visibility)))
    }

    async fn get_menus(&self, ids: &[MenuId], visibility: Visibility) -> Result<Vec<Menu>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.to_vec();

        let menus = self
            .conn
            .call(move |conn| {
                let sql = schema::select_by_ids("menus", MENU_COLUMNS, ids.len());
                let rows = fetch_all(conn, &sql, params_from_iter(ids.iter()), row_to_menu)
                    .map_err(wrap_err)?;
                rows.into_iter()
                    .map(|m| menu_with_links(conn, m).map_err(wrap_err))
                    .collect::<tokio_rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Menu")))?;

        Ok(menus
            .into_iter()
            .filter(|m| m.lifecycle.matches(visibility))
            .collect())
    }

    async fn list_menus(&self) -> Result<Vec<Menu>> {
        self.conn
            .call(|conn| {
                let sql = schema::select_visible("menus", MENU_COLUMNS);
                let rows = fetch_all(conn, &sql, [], row_to_menu).map_err(wrap_err)?;
                rows.into_iter()
                    .map(|m| menu_with_links(conn, m).map_err(wrap_err))
                    .collect::<tokio_rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Menu")))
    }

    async fn update_menu(&self, menu: &Menu) -> Result<Menu> {
        let id = menu.id;
        let title = menu.title.clone();
        let description = menu.description.clone();
        let is_active = menu.lifecycle.is_active;
        let now = format_datetime(&Utc::now());

        self.conn
            .call(move |conn| {
                let rows = conn
                    .execute(
                        schema::UPDATE_MENU,
                        params![id, title, description, is_active, now],
                    )
                    .map_err(wrap_err)?;
                if rows == 0 {
                    return untouched_state(conn, "menus", id).map_err(wrap_err);
                }
                let menu = load_menu(conn, id).map_err(wrap_err)?;
                Ok(menu.map_or(RowState::Missing, RowState::Done))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::with_title("Menu", &menu.title)))?
            .into_result(EntityKind::Menu, id)
    }

    async fn soft_delete_menu(&self, id: MenuId, at: DateTime<Utc>) -> Result<()> {
        let at = format_datetime(&at);

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                match deletion_state(&tx, "menus", id).map_err(wrap_err)? {
                    None => return Ok(RowState::Missing),
                    Some(Some(_)) => return Ok(RowState::AlreadyDeleted),
                    Some(None) => {}
                }
                tx.execute(schema::SOFT_DELETE_MENU, params![id, at])
                    .map_err(wrap_err)?;
                tx.execute(schema::DELETE_LINKS_FOR_MENU, [id])
                    .map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(RowState::Done(()))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Menu")))?
            .into_result(EntityKind::Menu, id)
    }

    async fn get_menus_deleted_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Menu>> {
        let cutoff = format_datetime(&cutoff);

        self.conn
            .call(move |conn| {
                let sql = schema::select_deleted_before("menus", MENU_COLUMNS);
                fetch_all(conn, &sql, [&cutoff], row_to_menu).map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Menu")))
    }

    async fn purge_menus(&self, ids: &[MenuId], cutoff: DateTime<Utc>) -> Result<u64> {
        let ids = ids.to_vec();
        let cutoff = format_datetime(&cutoff);

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let mut purged = 0u64;
                for id in &ids {
                    purged += tx
                        .execute(schema::PURGE_MENU, params![id, cutoff])
                        .map_err(wrap_err)? as u64;
                }
                tx.commit().map_err(wrap_err)?;
                Ok(purged)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Menu")))
    }
}

// ============================================================================
// CategoryRepository implementation
// ============================================================================

#[async_trait]
impl CategoryRepository for SqliteRepository {
    async fn get_category_by_title(&self, title: &str) -> Result<Option<Category>> {
        let title = title.to_string();

        self.conn
            .call(move |conn| {
                let sql = schema::select_by_title("categories", CATEGORY_COLUMNS);
                fetch_optional(conn, &sql, [&title], row_to_category)
                    .and_then(|c| c.map(|c| category_with_links(conn, c)).transpose())
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Category")))
    }

    async fn create_category(&self, category: &NewCategory) -> Result<Category> {
        let new = category.clone();
        let now = format_datetime(&Utc::now());

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                if let Err(err) =
                    check_category_refs(&tx, &new.menu_ids, &new.item_ids).map_err(wrap_err)?
                {
                    return Ok(Err(err));
                }
                tx.execute(
                    schema::INSERT_CATEGORY,
                    params![new.title, new.description, now],
                )
                .map_err(wrap_err)?;
                let id = tx.last_insert_rowid();
                write_category_relations(&tx, id, &new.menu_ids, &new.item_ids)
                    .map_err(wrap_err)?;
                let created = load_category(&tx, id)
                    .and_then(|c| c.ok_or(rusqlite::Error::QueryReturnedNoRows))
                    .map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(Ok(created))
            })
            .await
            .map_err(|e| {
                map_tokio_rusqlite_error(e, ErrorContext::with_title("Category", &category.title))
            })?
    }

    async fn get_category(
        &self,
        id: CategoryId,
        visibility: Visibility,
    ) -> Result<Option<Category>> {
        let category = self
            .conn
            .call(move |conn| load_category(conn, id).map_err(wrap_err))
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Category")))?;

        Ok(category.filter(|c| c.lifecycle.matches(visibility)))
    }

    async fn get_categories(
        &self,
        ids: &[CategoryId],
        visibility: Visibility,
    ) -> Result<Vec<Category>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.to_vec();

        let categories = self
            .conn
            .call(move |conn| {
                let sql = schema::select_by_ids("categories", CATEGORY_COLUMNS, ids.len());
                let rows = fetch_all(conn, &sql, params_from_iter(ids.iter()), row_to_category)
                    .map_err(wrap_err)?;
                rows.into_iter()
                    .map(|c| category_with_links(conn, c).map_err(wrap_err))
                    .collect::<tokio_rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Category")))?;

        Ok(categories
            .into_iter()
            .filter(|c| c.lifecycle.matches(visibility))
            .collect())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        self.conn
            .call(|conn| {
                let sql = schema::select_visible("categories", CATEGORY_COLUMNS);
                let rows = fetch_all(conn, &sql, [], row_to_category).map_err(wrap_err)?;
                rows.into_iter()
                    .map(|c| category_with_links(conn, c).map_err(wrap_err))
                    .collect::<tokio_rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Category")))
    }

    async fn update_category(&self, category: &Category) -> Result<Category> {
        let updated = category.clone();
        let id = category.id;
        let now = format_datetime(&Utc::now());

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let rows = tx
                    .execute(
                        schema::UPDATE_CATEGORY,
                        params![
                            updated.id,
                            updated.title,
                            updated.description,
                            updated.lifecycle.is_active,
                            now
                        ],
                    )
                    .map_err(wrap_err)?;
                if rows == 0 {
                    return untouched_state(&tx, "categories", updated.id).map_err(wrap_err);
                }
                if let Err(err) = check_category_refs(&tx, &updated.menu_ids, &updated.item_ids)
                    .map_err(wrap_err)?
                {
                    return Ok(RowState::Rejected(err));
                }
                write_category_relations(&tx, updated.id, &updated.menu_ids, &updated.item_ids)
                    .map_err(wrap_err)?;
                let saved = load_category(&tx, updated.id).map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(saved.map_or(RowState::Missing, RowState::Done))
            })
            .await
            .map_err(|e| {
                map_tokio_rusqlite_error(e, ErrorContext::with_title("Category", &category.title))
            })?
            .into_result(EntityKind::Category, id)
    }

    async fn soft_delete_category(&self, id: CategoryId, at: DateTime<Utc>) -> Result<()> {
        let at = format_datetime(&at);

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                match deletion_state(&tx, "categories", id).map_err(wrap_err)? {
                    None => return Ok(RowState::Missing),
                    Some(Some(_)) => return Ok(RowState::AlreadyDeleted),
                    Some(None) => {}
                }
                tx.execute(schema::SOFT_DELETE_CATEGORY, params![id, at])
                    .map_err(wrap_err)?;
                write_category_relations(&tx, id, &[], &[]).map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(RowState::Done(()))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Category")))?
            .into_result(EntityKind::Category, id)
    }

    async fn get_categories_deleted_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Category>> {
        let cutoff = format_datetime(&cutoff);

        self.conn
            .call(move |conn| {
                let sql = schema::select_deleted_before("categories", CATEGORY_COLUMNS);
                fetch_all(conn, &sql, [&cutoff], row_to_category).map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Category")))
    }

    async fn purge_categories(&self, ids: &[CategoryId], cutoff: DateTime<Utc>) -> Result<u64> {
        let ids = ids.to_vec();
        let cutoff = format_datetime(&cutoff);

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let mut purged = 0u64;
                for id in &ids {
                    purged += tx
                        .execute(schema::PURGE_CATEGORY, params![id, cutoff])
                        .map_err(wrap_err)? as u64;
                }
                tx.commit().map_err(wrap_err)?;
                Ok(purged)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Category")))
    }
}

// ============================================================================
// ItemRepository implementation
// ============================================================================

#[async_trait]
impl ItemRepository for SqliteRepository {
    async fn get_item_by_title(&self, title: &str) -> Result<Option<Item>> {
        let title = title.to_string();

        self.conn
            .call(move |conn| {
                let sql = schema::select_by_title("items", ITEM_COLUMNS);
                fetch_optional(conn, &sql, [&title], row_to_item).map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Item")))
    }

    async fn create_item(&self, item: &NewItem) -> Result<Item> {
        let new = item.clone();
        let now = format_datetime(&Utc::now());

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let category_ids: Vec<CategoryId> = new.category_id.into_iter().collect();
                if let Err(err) =
                    check_visible(&tx, "categoryId", "categories", &category_ids).map_err(wrap_err)?
                {
                    return Ok(Err(err));
                }
                tx.execute(
                    schema::INSERT_ITEM,
                    params![
                        new.title,
                        new.description,
                        new.price.map(|p| p.minor_units()),
                        new.category_id,
                        now
                    ],
                )
                .map_err(wrap_err)?;
                let id = tx.last_insert_rowid();
                let created = load_item(&tx, id)
                    .and_then(|i| i.ok_or(rusqlite::Error::QueryReturnedNoRows))
                    .map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(Ok(created))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::with_title("Item", &item.title)))?
    }

    async fn get_item(&self, id: ItemId, visibility: Visibility) -> Result<Option<Item>> {
        let item = self
            .conn
            .call(move |conn| load_item(conn, id).map_err(wrap_err))
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Item")))?;

        Ok(item.filter(|i| i.lifecycle.matches(visibility)))
    }

    async fn get_items(&self, ids: &[ItemId], visibility: Visibility) -> Result<Vec<Item>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.to_vec();

        let items = self
            .conn
            .call(move |conn| {
                let sql = schema::select_by_ids("items", ITEM_COLUMNS, ids.len());
                fetch_all(conn, &sql, params_from_iter(ids.iter()), row_to_item).map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Item")))?;

        Ok(items
            .into_iter()
            .filter(|i| i.lifecycle.matches(visibility))
            .collect())
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        self.conn
            .call(|conn| {
                let sql = schema::select_visible("items", ITEM_COLUMNS);
                fetch_all(conn, &sql, [], row_to_item).map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Item")))
    }

    async fn update_item(&self, item: &Item) -> Result<Item> {
        let updated = item.clone();
        let id = item.id;
        let now = format_datetime(&Utc::now());

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let rows = tx
                    .execute(
                        schema::UPDATE_ITEM,
                        params![
                            updated.id,
                            updated.title,
                            updated.description,
                            updated.price.map(|p| p.minor_units()),
                            updated.category_id,
                            updated.lifecycle.is_active,
                            now
                        ],
                    )
                    .map_err(wrap_err)?;
                if rows == 0 {
                    return untouched_state(&tx, "items", updated.id).map_err(wrap_err);
                }
                let category_ids: Vec<CategoryId> = updated.category_id.into_iter().collect();
                if let Err(err) =
                    check_visible(&tx, "categoryId", "categories", &category_ids).map_err(wrap_err)?
                {
                    return Ok(RowState::Rejected(err));
                }
                let saved = load_item(&tx, updated.id).map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(saved.map_or(RowState::Missing, RowState::Done))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::with_title("Item", &item.title)))?
            .into_result(EntityKind::Item, id)
    }

    async fn soft_delete_item(&self, id: ItemId, at: DateTime<Utc>) -> Result<()> {
        let at = format_datetime(&at);

        self.conn
            .call(move |conn| {
                match deletion_state(conn, "items", id).map_err(wrap_err)? {
                    None => return Ok(RowState::Missing),
                    Some(Some(_)) => return Ok(RowState::AlreadyDeleted),
                    Some(None) => {}
                }
                conn.execute(schema::SOFT_DELETE_ITEM, params![id, at])
                    .map_err(wrap_err)?;
                Ok(RowState::Done(()))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Item")))?
            .into_result(EntityKind::Item, id)
    }

    async fn get_items_deleted_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Item>> {
        let cutoff = format_datetime(&cutoff);

        self.conn
            .call(move |conn| {
                let sql = schema::select_deleted_before("items", ITEM_COLUMNS);
                fetch_all(conn, &sql, [&cutoff], row_to_item).map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Item")))
    }

    async fn purge_items(&self, ids: &[ItemId], cutoff: DateTime<Utc>) -> Result<u64> {
        let ids = ids.to_vec();
        let cutoff = format_datetime(&cutoff);

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let mut purged = 0u64;
                for id in &ids {
                    purged += tx
                        .execute(schema::PURGE_ITEM, params![id, cutoff])
                        .map_err(wrap_err)? as u64;
                }
                tx.commit().map_err(wrap_err)?;
                Ok(purged)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ErrorContext::new("Item")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use gymo_core::catalog::Price;

    async fn repo() -> SqliteRepository {
        SqliteRepository::new_in_memory().await.unwrap()
    }

    fn new_menu(title: &str) -> NewMenu {
        NewMenu {
            title: title.to_string(),
            description: None,
        }
    }

    fn new_item(title: &str) -> NewItem {
        NewItem {
            title: title.to_string(),
            description: Some("House special".to_string()),
            price: Some(Price(250000)),
            category_id: None,
        }
    }

    #[tokio::test]
    async fn test_menu_create_and_get() {
        let repo = repo().await;
        let menu = repo.create_menu(&new_menu("Lunch")).await.unwrap();

        assert_eq!(menu.title, "Lunch");
        assert!(menu.lifecycle.is_visible());

        let fetched = repo.get_menu(menu.id, Visibility::Visible).await.unwrap();
        assert_eq!(fetched, Some(menu));
    }

    #[tokio::test]
    async fn test_duplicate_title_is_conflict_even_after_soft_delete() {
        let repo = repo().await;
        let menu = repo.create_menu(&new_menu("Lunch")).await.unwrap();
        repo.soft_delete_menu(menu.id, Utc::now()).await.unwrap();

        let result = repo.create_menu(&new_menu("Lunch")).await;
        assert_eq!(
            result,
            Err(RepositoryError::Conflict {
                entity_type: "Menu",
                title: "Lunch".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_update_title_collision_is_conflict() {
        let repo = repo().await;
        repo.create_item(&new_item("Suya")).await.unwrap();
        let mut asun = repo.create_item(&new_item("Asun")).await.unwrap();

        asun.title = "Suya".to_string();
        let result = repo.update_item(&asun).await;
        assert!(matches!(result, Err(RepositoryError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_item_round_trips_price_and_description() {
        let repo = repo().await;
        let item = repo.create_item(&new_item("Suya")).await.unwrap();

        let fetched = repo
            .get_item(item.id, Visibility::Visible)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.price, Some(Price(250000)));
        assert_eq!(fetched.description.as_deref(), Some("House special"));
    }

    #[tokio::test]
    async fn test_soft_delete_states() {
        let repo = repo().await;
        let menu = repo.create_menu(&new_menu("Lunch")).await.unwrap();

        assert!(matches!(
            repo.soft_delete_menu(999, Utc::now()).await,
            Err(RepositoryError::NotFound { id: 999, .. })
        ));

        repo.soft_delete_menu(menu.id, Utc::now()).await.unwrap();
        assert!(matches!(
            repo.soft_delete_menu(menu.id, Utc::now()).await,
            Err(RepositoryError::Deleted { .. })
        ));

        assert!(repo
            .get_menu(menu.id, Visibility::Visible)
            .await
            .unwrap()
            .is_none());
        let any = repo.get_menu(menu.id, Visibility::Any).await.unwrap().unwrap();
        assert!(any.lifecycle.deleted_at.is_some());
        assert!(!any.lifecycle.is_active);
    }

    #[tokio::test]
    async fn test_category_relations_written_and_replaced() {
        let repo = repo().await;
        let lunch = repo.create_menu(&new_menu("Lunch")).await.unwrap();
        let dinner = repo.create_menu(&new_menu("Dinner")).await.unwrap();
        let suya = repo.create_item(&new_item("Suya")).await.unwrap();
        let asun = repo.create_item(&new_item("Asun")).await.unwrap();

        let mut category = repo
            .create_category(&NewCategory {
                title: "Grills".to_string(),
                description: None,
                menu_ids: vec![lunch.id],
                item_ids: vec![suya.id, asun.id],
            })
            .await
            .unwrap();
        assert_eq!(category.menu_ids, vec![lunch.id]);
        assert_eq!(category.item_ids, vec![suya.id, asun.id]);

        category.menu_ids = vec![lunch.id, dinner.id];
        category.item_ids = vec![asun.id];
        let updated = repo.update_category(&category).await.unwrap();
        assert_eq!(updated.menu_ids, vec![lunch.id, dinner.id]);
        assert_eq!(updated.item_ids, vec![asun.id]);

        let suya = repo.get_item(suya.id, Visibility::Any).await.unwrap().unwrap();
        assert_eq!(suya.category_id, None);

        let dinner = repo
            .get_menu(dinner.id, Visibility::Visible)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(dinner.category_ids, vec![category.id]);
    }

    #[tokio::test]
    async fn test_category_soft_delete_detaches_children() {
        let repo = repo().await;
        let menu = repo.create_menu(&new_menu("Lunch")).await.unwrap();
        let item = repo.create_item(&new_item("Suya")).await.unwrap();
        let category = repo
            .create_category(&NewCategory {
                title: "Grills".to_string(),
                description: None,
                menu_ids: vec![menu.id],
                item_ids: vec![item.id],
            })
            .await
            .unwrap();

        repo.soft_delete_category(category.id, Utc::now())
            .await
            .unwrap();

        let menu = repo
            .get_menu(menu.id, Visibility::Visible)
            .await
            .unwrap()
            .unwrap();
        assert!(menu.category_ids.is_empty());
        let item = repo
            .get_item(item.id, Visibility::Visible)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.category_id, None);
    }

    #[tokio::test]
    async fn test_get_many_returns_only_found_rows() {
        let repo = repo().await;
        let a = repo.create_item(&new_item("A")).await.unwrap();
        let b = repo.create_item(&new_item("B")).await.unwrap();
        repo.soft_delete_item(b.id, Utc::now()).await.unwrap();

        let visible = repo
            .get_items(&[a.id, b.id, 77], Visibility::Visible)
            .await
            .unwrap();
        assert_eq!(visible.iter().map(|i| i.id).collect::<Vec<_>>(), vec![a.id]);

        let any = repo
            .get_items(&[a.id, b.id, 77], Visibility::Any)
            .await
            .unwrap();
        assert_eq!(any.len(), 2);

        assert!(repo.get_items(&[], Visibility::Any).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_rechecks_cutoff_and_is_idempotent() {
        let repo = repo().await;
        let now = Utc::now();
        let old = repo.create_menu(&new_menu("Old")).await.unwrap();
        let fresh = repo.create_menu(&new_menu("Fresh")).await.unwrap();
        let live = repo.create_menu(&new_menu("Live")).await.unwrap();

        repo.soft_delete_menu(old.id, now - ChronoDuration::days(45))
            .await
            .unwrap();
        repo.soft_delete_menu(fresh.id, now - ChronoDuration::days(1))
            .await
            .unwrap();

        let cutoff = now - ChronoDuration::days(30);
        let expired = repo.get_menus_deleted_before(cutoff).await.unwrap();
        assert_eq!(expired.iter().map(|m| m.id).collect::<Vec<_>>(), vec![old.id]);

        let purged = repo
            .purge_menus(&[old.id, fresh.id, live.id], cutoff)
            .await
            .unwrap();
        assert_eq!(purged, 1);

        let again = repo.purge_menus(&[old.id], cutoff).await.unwrap();
        assert_eq!(again, 0);

        assert!(repo.get_menu(live.id, Visibility::Visible).await.unwrap().is_some());
        assert!(repo.get_menu(fresh.id, Visibility::Any).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purged_category_releases_items_through_foreign_key() {
        let repo = repo().await;
        let now = Utc::now();
        let item = repo.create_item(&new_item("Suya")).await.unwrap();
        let category = repo
            .create_category(&NewCategory {
                title: "Grills".to_string(),
                description: None,
                menu_ids: vec![],
                item_ids: vec![],
            })
            .await
            .unwrap();

        repo.soft_delete_category(category.id, now - ChronoDuration::days(60))
            .await
            .unwrap();

        // The store refuses this link, so write it underneath.
        let (item_id, category_id) = (item.id, category.id);
        repo.conn
            .call(move |conn| {
                conn.execute(schema::ASSIGN_ITEM, params![category_id, item_id])
                    .map_err(wrap_err)
            })
            .await
            .unwrap();

        let purged = repo
            .purge_categories(&[category.id], now - ChronoDuration::days(30))
            .await
            .unwrap();
        assert_eq!(purged, 1);

        let item = repo
            .get_item(item.id, Visibility::Visible)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.category_id, None);
    }

    #[tokio::test]
    async fn test_updates_to_deleted_rows_are_rejected() {
        let repo = repo().await;
        let item = repo.create_item(&new_item("Suya")).await.unwrap();
        let category = repo
            .create_category(&NewCategory {
                title: "Grills".to_string(),
                description: None,
                menu_ids: vec![],
                item_ids: vec![item.id],
            })
            .await
            .unwrap();

        // A copy read before the delete landed
        let stale = repo
            .get_category(category.id, Visibility::Any)
            .await
            .unwrap()
            .unwrap();
        repo.soft_delete_category(category.id, Utc::now())
            .await
            .unwrap();

        let result = repo.update_category(&stale).await;
        assert_eq!(
            result,
            Err(RepositoryError::Deleted {
                entity_type: "Category",
                id: category.id,
            })
        );

        let row = repo
            .get_category(category.id, Visibility::Any)
            .await
            .unwrap()
            .unwrap();
        assert!(!row.lifecycle.is_active);
        let item = repo.get_item(item.id, Visibility::Any).await.unwrap().unwrap();
        assert_eq!(item.category_id, None);

        let menu = repo.create_menu(&new_menu("Lunch")).await.unwrap();
        repo.soft_delete_menu(menu.id, Utc::now()).await.unwrap();
        assert!(matches!(
            repo.update_menu(&menu).await,
            Err(RepositoryError::Deleted { .. })
        ));

        let mut missing = menu.clone();
        missing.id = 404;
        missing.title = "Nowhere".to_string();
        assert!(matches!(
            repo.update_menu(&missing).await,
            Err(RepositoryError::NotFound { id: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_links_to_deleted_rows_are_refused() {
        let repo = repo().await;
        let menu = repo.create_menu(&new_menu("Lunch")).await.unwrap();
        let item = repo.create_item(&new_item("Suya")).await.unwrap();
        repo.soft_delete_menu(menu.id, Utc::now()).await.unwrap();

        let result = repo
            .create_category(&NewCategory {
                title: "Grills".to_string(),
                description: None,
                menu_ids: vec![menu.id],
                item_ids: vec![item.id],
            })
            .await;
        assert_eq!(
            result,
            Err(RepositoryError::RelationNotFound {
                relation: "menuIds",
                missing: vec![menu.id],
            })
        );
        assert!(repo.get_category_by_title("Grills").await.unwrap().is_none());
        let item = repo.get_item(item.id, Visibility::Any).await.unwrap().unwrap();
        assert_eq!(item.category_id, None);
    }

    #[tokio::test]
    async fn test_item_cannot_join_deleted_category() {
        let repo = repo().await;
        let category = repo
            .create_category(&NewCategory {
                title: "Grills".to_string(),
                description: None,
                menu_ids: vec![],
                item_ids: vec![],
            })
            .await
            .unwrap();
        let mut item = repo.create_item(&new_item("Suya")).await.unwrap();
        repo.soft_delete_category(category.id, Utc::now())
            .await
            .unwrap();

        let mut new = new_item("Asun");
        new.category_id = Some(category.id);
        assert!(matches!(
            repo.create_item(&new).await,
            Err(RepositoryError::RelationNotFound { relation: "categoryId", .. })
        ));
        assert!(repo.get_item_by_title("Asun").await.unwrap().is_none());

        item.category_id = Some(category.id);
        item.title = "Suya Special".to_string();
        assert!(matches!(
            repo.update_item(&item).await,
            Err(RepositoryError::RelationNotFound { relation: "categoryId", .. })
        ));

        // Rolled back as a whole
        let stored = repo.get_item(item.id, Visibility::Any).await.unwrap().unwrap();
        assert_eq!(stored.title, "Suya");
        assert_eq!(stored.category_id, None);
    }
}
