use super::{RepoError, RepoResult, Store};
use crate::models::{Category, CategoryData, Pagination};
use rusqlite::{params, Row};

pub trait CategoryRepository: Send + Sync {
    fn find_one_by_id(&self, id: i64) -> RepoResult<Option<Category>>;
    fn find_all(&self) -> RepoResult<Vec<Category>>;
    fn find_page(&self, pagination: &Pagination) -> RepoResult<Vec<Category>>;
    fn count(&self) -> RepoResult<i64>;
    fn create(&self, data: &CategoryData) -> RepoResult<Category>;
    fn update(&self, category: &Category) -> RepoResult<bool>;
    fn delete_one_by_id(&self, id: i64) -> RepoResult<bool>;
    /// True while at least one post references the category.
    fn is_in_use(&self, id: i64) -> RepoResult<bool>;
}

pub struct SqliteCategoryRepository {
    store: Store,
}

impl SqliteCategoryRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl CategoryRepository for SqliteCategoryRepository {
    fn find_one_by_id(&self, id: i64) -> RepoResult<Option<Category>> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        Ok(sql.query_optional(
            "SELECT id, name FROM categories WHERE id = ?1",
            params![id],
            category_from_row,
        )?)
    }

    fn find_all(&self) -> RepoResult<Vec<Category>> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        Ok(sql.query_all(
            "SELECT id, name FROM categories ORDER BY name, id",
            &[],
            category_from_row,
        )?)
    }

    fn find_page(&self, pagination: &Pagination) -> RepoResult<Vec<Category>> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        Ok(sql.query_all(
            "SELECT id, name FROM categories ORDER BY name, id LIMIT ?1 OFFSET ?2",
            params![i64::from(pagination.per_page()), pagination.offset() as i64],
            category_from_row,
        )?)
    }

    fn count(&self) -> RepoResult<i64> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        Ok(sql.query_row("SELECT COUNT(*) FROM categories", &[], |row| row.get(0))?)
    }

    fn create(&self, data: &CategoryData) -> RepoResult<Category> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        sql.execute(
            "INSERT INTO categories (name) VALUES (?1)",
            params![data.name.trim()],
        )?;
        let id = sql.last_insert_rowid();
        tracing::info!(category_id = id, "Category created");

        sql.query_optional(
            "SELECT id, name FROM categories WHERE id = ?1",
            params![id],
            category_from_row,
        )?
        .ok_or_else(|| RepoError::InvalidData(format!("category {} missing after insert", id)))
    }

    fn update(&self, category: &Category) -> RepoResult<bool> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        let changed = sql.execute(
            "UPDATE categories SET name = ?1 WHERE id = ?2",
            params![category.data.name.trim(), category.id],
        )?;
        Ok(changed > 0)
    }

    fn delete_one_by_id(&self, id: i64) -> RepoResult<bool> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        let deleted = sql.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        if deleted > 0 {
            tracing::info!(category_id = id, "Category deleted");
        }
        Ok(deleted > 0)
    }

    fn is_in_use(&self, id: i64) -> RepoResult<bool> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        Ok(sql.query_row(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE category_id = ?1)",
            params![id],
            |row| row.get(0),
        )?)
    }
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get("id")?,
        data: CategoryData {
            name: row.get("name")?,
        },
    })
}
