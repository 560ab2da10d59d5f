use super::{RepoError, RepoResult, Store};
use crate::models::{Tag, TagData};
use rusqlite::{params, Row};

pub trait TagRepository: Send + Sync {
    fn find_one_by_id(&self, id: i64) -> RepoResult<Option<Tag>>;
    fn find_all(&self) -> RepoResult<Vec<Tag>>;
    fn find_for_post(&self, post_id: i64) -> RepoResult<Vec<Tag>>;
    fn check_slug_availability(&self, slug: &str) -> RepoResult<bool>;
    fn create(&self, data: &TagData) -> RepoResult<Tag>;
    fn update(&self, tag: &Tag) -> RepoResult<bool>;
    fn delete_one_by_id(&self, id: i64) -> RepoResult<bool>;
}

pub struct SqliteTagRepository {
    store: Store,
}

impl SqliteTagRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl TagRepository for SqliteTagRepository {
    fn find_one_by_id(&self, id: i64) -> RepoResult<Option<Tag>> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        Ok(sql.query_optional(
            "SELECT id, title, slug FROM tags WHERE id = ?1",
            params![id],
            tag_from_row,
        )?)
    }

    fn find_all(&self) -> RepoResult<Vec<Tag>> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        Ok(sql.query_all(
            "SELECT id, title, slug FROM tags ORDER BY title",
            &[],
            tag_from_row,
        )?)
    }

    fn find_for_post(&self, post_id: i64) -> RepoResult<Vec<Tag>> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        Ok(sql.query_all(
            "SELECT t.id AS id, t.title AS title, t.slug AS slug
             FROM tags t
             JOIN posts_tags pt ON pt.tag_id = t.id
             WHERE pt.post_id = ?1
             ORDER BY t.title",
            params![post_id],
            tag_from_row,
        )?)
    }

    fn check_slug_availability(&self, slug: &str) -> RepoResult<bool> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        let taken: bool = sql.query_row(
            "SELECT EXISTS(SELECT 1 FROM tags WHERE slug = ?1)",
            params![slug],
            |row| row.get(0),
        )?;
        Ok(!taken)
    }

    fn create(&self, data: &TagData) -> RepoResult<Tag> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        sql.execute(
            "INSERT INTO tags (title, slug) VALUES (?1, ?2)",
            params![data.title.trim(), data.slug],
        )?;
        let id = sql.last_insert_rowid();
        tracing::info!(tag_id = id, slug = %data.slug, "Tag created");

        sql.query_optional(
            "SELECT id, title, slug FROM tags WHERE id = ?1",
            params![id],
            tag_from_row,
        )?
        .ok_or_else(|| RepoError::InvalidData(format!("tag {} missing after insert", id)))
    }

    fn update(&self, tag: &Tag) -> RepoResult<bool> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        let changed = sql.execute(
            "UPDATE tags SET title = ?1, slug = ?2 WHERE id = ?3",
            params![tag.data.title.trim(), tag.data.slug, tag.id],
        )?;
        Ok(changed > 0)
    }

    fn delete_one_by_id(&self, id: i64) -> RepoResult<bool> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        let deleted = sql.execute("DELETE FROM tags WHERE id = ?1", params![id])?;
        if deleted > 0 {
            tracing::info!(tag_id = id, "Tag deleted");
        }
        Ok(deleted > 0)
    }
}

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get("id")?,
        data: TagData {
            title: row.get("title")?,
            slug: row.get("slug")?,
        },
    })
}
