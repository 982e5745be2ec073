//! SQLite schema definitions and SQL query constants.
//!
//! Pure data, no I/O. Timestamps are stored as fixed-width RFC 3339 text so
//! that string comparison orders them correctly.

/// SQL statement to create all tables.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS menus (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL UNIQUE,
    description TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL UNIQUE,
    description TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL UNIQUE,
    description TEXT,
    price INTEGER,
    category_id INTEGER,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT,
    FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS category_menus (
    category_id INTEGER NOT NULL,
    menu_id INTEGER NOT NULL,
    PRIMARY KEY (category_id, menu_id),
    FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE,
    FOREIGN KEY (menu_id) REFERENCES menus(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_menus_deleted_at ON menus(deleted_at);
CREATE INDEX IF NOT EXISTS idx_categories_deleted_at ON categories(deleted_at);
CREATE INDEX IF NOT EXISTS idx_items_deleted_at ON items(deleted_at);
CREATE INDEX IF NOT EXISTS idx_items_category_id ON items(category_id);
CREATE INDEX IF NOT EXISTS idx_category_menus_menu_id ON category_menus(menu_id);
"#;

/// Row filter for the default read path.
pub const VISIBLE: &str = "deleted_at IS NULL AND is_active = 1";

// Menu queries
pub const MENU_COLUMNS: &str =
    "id, title, description, is_active, created_at, updated_at, deleted_at";

pub const INSERT_MENU: &str = r#"
INSERT INTO menus (title, description, is_active, created_at, updated_at)
VALUES (?1, ?2, 1, ?3, ?3)
"#;

pub const UPDATE_MENU: &str = r#"
UPDATE menus
SET title = ?2, description = ?3, is_active = ?4, updated_at = ?5
WHERE id = ?1 AND deleted_at IS NULL
"#;

pub const SOFT_DELETE_MENU: &str = r#"
UPDATE menus
SET deleted_at = ?2, is_active = 0, updated_at = ?2
WHERE id = ?1
"#;

pub const SELECT_CATEGORY_IDS_FOR_MENU: &str = r#"
SELECT category_id FROM category_menus
WHERE menu_id = ?1
ORDER BY category_id
"#;

pub const DELETE_LINKS_FOR_MENU: &str = "DELETE FROM category_menus WHERE menu_id = ?1";

pub const PURGE_MENU: &str = r#"
DELETE FROM menus
WHERE id = ?1 AND deleted_at IS NOT NULL AND deleted_at < ?2
"#;

// Category queries
pub const CATEGORY_COLUMNS: &str =
    "id, title, description, is_active, created_at, updated_at, deleted_at";

pub const INSERT_CATEGORY: &str = r#"
INSERT INTO categories (title, description, is_active, created_at, updated_at)
VALUES (?1, ?2, 1, ?3, ?3)
"#;

pub const UPDATE_CATEGORY: &str = r#"
UPDATE categories
SET title = ?2, description = ?3, is_active = ?4, updated_at = ?5
WHERE id = ?1 AND deleted_at IS NULL
"#;

pub const SOFT_DELETE_CATEGORY: &str = r#"
UPDATE categories
SET deleted_at = ?2, is_active = 0, updated_at = ?2
WHERE id = ?1
"#;

pub const SELECT_MENU_IDS_FOR_CATEGORY: &str = r#"
SELECT menu_id FROM category_menus
WHERE category_id = ?1
ORDER BY menu_id
"#;

pub const SELECT_ITEM_IDS_FOR_CATEGORY: &str = r#"
SELECT id FROM items
WHERE category_id = ?1 AND deleted_at IS NULL
ORDER BY id
"#;

pub const INSERT_CATEGORY_MENU: &str = r#"
INSERT OR IGNORE INTO category_menus (category_id, menu_id)
VALUES (?1, ?2)
"#;

pub const DELETE_LINKS_FOR_CATEGORY: &str = "DELETE FROM category_menus WHERE category_id = ?1";

pub const RELEASE_ITEMS: &str = "UPDATE items SET category_id = NULL WHERE category_id = ?1";

pub const ASSIGN_ITEM: &str = "UPDATE items SET category_id = ?1 WHERE id = ?2";

pub const PURGE_CATEGORY: &str = r#"
DELETE FROM categories
WHERE id = ?1 AND deleted_at IS NOT NULL AND deleted_at < ?2
"#;

// Item queries
pub const ITEM_COLUMNS: &str =
    "id, title, description, price, category_id, is_active, created_at, updated_at, deleted_at";

pub const INSERT_ITEM: &str = r#"
INSERT INTO items (title, description, price, category_id, is_active, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
"#;

pub const UPDATE_ITEM: &str = r#"
UPDATE items
SET title = ?2, description = ?3, price = ?4, category_id = ?5, is_active = ?6, updated_at = ?7
WHERE id = ?1 AND deleted_at IS NULL
"#;

pub const SOFT_DELETE_ITEM: &str = r#"
UPDATE items
SET deleted_at = ?2, is_active = 0, updated_at = ?2
WHERE id = ?1
"#;

pub const PURGE_ITEM: &str = r#"
DELETE FROM items
WHERE id = ?1 AND deleted_at IS NOT NULL AND deleted_at < ?2
"#;

/// `SELECT {columns} FROM {table} WHERE id = ?1`
pub fn select_by_id(table: &str, columns: &str) -> String {
    format!("SELECT {columns} FROM {table} WHERE id = ?1")
}

/// `SELECT {columns} FROM {table} WHERE title = ?1`, deleted rows included.
pub fn select_by_title(table: &str, columns: &str) -> String {
    format!("SELECT {columns} FROM {table} WHERE title = ?1")
}

/// `SELECT {columns} FROM {table} WHERE id IN (?1, ?2, ...)` for `count` ids.
pub fn select_by_ids(table: &str, columns: &str, count: usize) -> String {
    let placeholders = (1..=count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {columns} FROM {table} WHERE id IN ({placeholders}) ORDER BY id")
}

/// Ids among `?1..?count` that name visible rows of `table`.
pub fn select_visible_ids(table: &str, count: usize) -> String {
    let placeholders = (1..=count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT id FROM {table} WHERE id IN ({placeholders}) AND {VISIBLE}")
}

/// Visible rows ordered by id.
pub fn select_visible(table: &str, columns: &str) -> String {
    format!("SELECT {columns} FROM {table} WHERE {VISIBLE} ORDER BY id")
}

/// Rows deleted strictly before `?1`.
pub fn select_deleted_before(table: &str, columns: &str) -> String {
    format!(
        "SELECT {columns} FROM {table} \
         WHERE deleted_at IS NOT NULL AND deleted_at < ?1 ORDER BY id"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_defines_every_table() {
        for table in ["menus", "categories", "items", "category_menus"] {
            assert!(
                CREATE_TABLES.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn test_titles_are_unique_per_table() {
        assert_eq!(CREATE_TABLES.matches("title TEXT NOT NULL UNIQUE").count(), 3);
    }

    #[test]
    fn test_purges_recheck_deleted_at() {
        for purge in [PURGE_MENU, PURGE_CATEGORY, PURGE_ITEM] {
            assert!(purge.contains("deleted_at IS NOT NULL AND deleted_at < ?2"));
        }
    }

    #[test]
    fn test_updates_skip_deleted_rows() {
        for update in [UPDATE_MENU, UPDATE_CATEGORY, UPDATE_ITEM] {
            assert!(update.contains("WHERE id = ?1 AND deleted_at IS NULL"));
        }
    }

    #[test]
    fn test_select_visible_ids() {
        assert_eq!(
            select_visible_ids("menus", 2),
            "SELECT id FROM menus WHERE id IN (?1, ?2) AND deleted_at IS NULL AND is_active = 1"
        );
    }

    #[test]
    fn test_select_visible_filters_and_orders() {
        let sql = select_visible("menus", MENU_COLUMNS);
        assert_eq!(
            sql,
            "SELECT id, title, description, is_active, created_at, updated_at, deleted_at \
             FROM menus WHERE deleted_at IS NULL AND is_active = 1 ORDER BY id"
        );
    }

    #[test]
    fn test_select_by_ids_numbers_placeholders() {
        let sql = select_by_ids("categories", "id", 3);
        assert_eq!(
            sql,
            "SELECT id FROM categories WHERE id IN (?1, ?2, ?3) ORDER BY id"
        );
    }

    #[test]
    fn test_select_deleted_before() {
        let sql = select_deleted_before("items", ITEM_COLUMNS);
        assert!(sql.starts_with("SELECT id, title, description, price"));
        assert!(sql.ends_with("WHERE deleted_at IS NOT NULL AND deleted_at < ?1 ORDER BY id"));
    }
}
