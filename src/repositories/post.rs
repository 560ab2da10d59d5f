use super::{
    next_timestamp, optional_timestamp_column, timestamp_column, RepoError, RepoResult, Store,
};
use crate::db::{timestamp_to_db, LoggedConnection};
use crate::models::{Category, CategoryData, Pagination, Post, PostData};
use chrono::Utc;
use rusqlite::{params, Row, ToSql};
use std::collections::{BTreeMap, HashMap};

const POST_SELECT_SQL: &str = "SELECT
    p.id AS id,
    p.title AS title,
    p.slug AS slug,
    p.image AS image,
    p.description AS description,
    p.body AS body,
    p.created_at AS created_at,
    p.updated_at AS updated_at,
    p.published_at AS published_at,
    p.published AS published,
    p.category_id AS category_id,
    p.author_id AS author_id,
    c.name AS category_name
FROM posts p
LEFT JOIN categories c ON c.id = p.category_id";

// Stays well under SQLite's bound-parameter limit.
const TAG_LOOKUP_CHUNK: usize = 500;

pub trait PostRepository: Send + Sync {
    fn find_one_by_id(&self, id: i64) -> RepoResult<Option<Post>>;
    fn find_all(&self) -> RepoResult<Vec<Post>>;
    /// Most recently updated first.
    fn find_page(&self, pagination: &Pagination) -> RepoResult<Vec<Post>>;
    fn count(&self) -> RepoResult<i64>;
    /// True when no stored post uses `slug`.
    fn check_slug_availability(&self, slug: &str) -> RepoResult<bool>;
    /// Inserts the post and its tag links atomically and returns the stored row.
    fn create(&self, data: &PostData) -> RepoResult<Post>;
    /// Rewrites every field except the author and tag links. False when no row matched.
    fn update(&self, post: &Post) -> RepoResult<bool>;
    /// `update` plus a swap of the tag links for `post.data.tag_ids`, committed together.
    fn update_with_tags(&self, post: &Post) -> RepoResult<bool>;
    fn delete_one_by_id(&self, id: i64) -> RepoResult<bool>;
    fn category_key_pairs(&self) -> RepoResult<BTreeMap<i64, String>>;
    /// Links every tag or none of them.
    fn assign_tags_to_post(&self, post_id: i64, tag_ids: &[i64]) -> RepoResult<()>;
    /// Swaps the post's tag links for `tag_ids` in one transaction.
    fn replace_post_tags(&self, post_id: i64, tag_ids: &[i64]) -> RepoResult<()>;
}

pub struct SqlitePostRepository {
    store: Store,
}

impl SqlitePostRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl PostRepository for SqlitePostRepository {
    fn find_one_by_id(&self, id: i64) -> RepoResult<Option<Post>> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        Ok(find_post(&sql, id)?)
    }

    fn find_all(&self) -> RepoResult<Vec<Post>> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        let mut posts = sql.query_all(
            &format!("{POST_SELECT_SQL} ORDER BY p.id"),
            &[],
            post_from_row,
        )?;
        attach_tag_ids(&sql, &mut posts)?;
        Ok(posts)
    }

    fn find_page(&self, pagination: &Pagination) -> RepoResult<Vec<Post>> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        let limit = i64::from(pagination.per_page());
        let offset = pagination.offset() as i64;
        let mut posts = sql.query_all(
            &format!("{POST_SELECT_SQL} ORDER BY p.updated_at DESC, p.id DESC LIMIT ?1 OFFSET ?2"),
            params![limit, offset],
            post_from_row,
        )?;
        attach_tag_ids(&sql, &mut posts)?;
        Ok(posts)
    }

    fn count(&self) -> RepoResult<i64> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        Ok(sql.query_row("SELECT COUNT(*) FROM posts", &[], |row| row.get(0))?)
    }

    fn check_slug_availability(&self, slug: &str) -> RepoResult<bool> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        let taken: bool = sql.query_row(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE slug = ?1)",
            params![slug],
            |row| row.get(0),
        )?;
        Ok(!taken)
    }

    fn create(&self, data: &PostData) -> RepoResult<Post> {
        let mut conn = self.store.connection()?;
        let now = timestamp_to_db(&Utc::now());
        let published_at = data.published_at.as_ref().map(timestamp_to_db);

        let tx = conn.transaction()?;
        let id = {
            let sql = self.store.logged(&tx);
            sql.execute(
                "INSERT INTO posts (title, slug, image, description, body, created_at, updated_at, published_at, published, category_id, author_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    data.title,
                    data.slug,
                    data.image,
                    data.description,
                    data.body,
                    now,
                    now,
                    published_at,
                    data.published,
                    data.category_id,
                    data.author_id,
                ],
            )?;
            let id = sql.last_insert_rowid();
            insert_tag_links(&sql, id, &data.tag_ids)?;
            id
        };
        tx.commit()?;

        tracing::info!(post_id = id, slug = %data.slug, tags = data.tag_ids.len(), "Post created");

        let sql = self.store.logged(&conn);
        find_post(&sql, id)?
            .ok_or_else(|| RepoError::InvalidData(format!("post {} missing after insert", id)))
    }

    fn update(&self, post: &Post) -> RepoResult<bool> {
        let conn = self.store.connection()?;
        let changed = update_row(&self.store.logged(&conn), post)?;
        if changed {
            tracing::info!(post_id = post.id, "Post updated");
        }
        Ok(changed)
    }

    fn update_with_tags(&self, post: &Post) -> RepoResult<bool> {
        let mut conn = self.store.connection()?;
        let tx = conn.transaction()?;
        {
            let sql = self.store.logged(&tx);
            if !update_row(&sql, post)? {
                return Ok(false);
            }
            sql.execute("DELETE FROM posts_tags WHERE post_id = ?1", params![post.id])?;
            insert_tag_links(&sql, post.id, &post.data.tag_ids)?;
        }
        tx.commit()?;
        tracing::info!(
            post_id = post.id,
            tags = post.data.tag_ids.len(),
            "Post updated with tags"
        );
        Ok(true)
    }

    fn delete_one_by_id(&self, id: i64) -> RepoResult<bool> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        let deleted = sql.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        if deleted > 0 {
            tracing::info!(post_id = id, "Post deleted");
        }
        Ok(deleted > 0)
    }

    fn category_key_pairs(&self) -> RepoResult<BTreeMap<i64, String>> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        let pairs = sql.query_all("SELECT id, name FROM categories", &[], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        Ok(pairs.into_iter().collect())
    }

    fn assign_tags_to_post(&self, post_id: i64, tag_ids: &[i64]) -> RepoResult<()> {
        let mut conn = self.store.connection()?;
        let tx = conn.transaction()?;
        insert_tag_links(&self.store.logged(&tx), post_id, tag_ids)?;
        tx.commit()?;
        Ok(())
    }

    fn replace_post_tags(&self, post_id: i64, tag_ids: &[i64]) -> RepoResult<()> {
        let mut conn = self.store.connection()?;
        let tx = conn.transaction()?;
        {
            let sql = self.store.logged(&tx);
            sql.execute("DELETE FROM posts_tags WHERE post_id = ?1", params![post_id])?;
            insert_tag_links(&sql, post_id, tag_ids)?;
        }
        tx.commit()?;
        tracing::info!(post_id, tags = tag_ids.len(), "Post tags replaced");
        Ok(())
    }
}

/// Rewrites the editable columns; author, creation time and tag links are left alone.
fn update_row(sql: &LoggedConnection<'_>, post: &Post) -> rusqlite::Result<bool> {
    let data = &post.data;
    let updated_at = timestamp_to_db(&next_timestamp(post.updated_at));
    let published_at = data.published_at.as_ref().map(timestamp_to_db);

    let changed = sql.execute(
        "UPDATE posts SET title = ?1, slug = ?2, image = ?3, description = ?4, body = ?5,
             updated_at = ?6, published_at = ?7, published = ?8, category_id = ?9
         WHERE id = ?10",
        params![
            data.title,
            data.slug,
            data.image,
            data.description,
            data.body,
            updated_at,
            published_at,
            data.published,
            data.category_id,
            post.id,
        ],
    )?;
    Ok(changed > 0)
}

fn find_post(sql: &LoggedConnection<'_>, id: i64) -> rusqlite::Result<Option<Post>> {
    let post = sql.query_optional(
        &format!("{POST_SELECT_SQL} WHERE p.id = ?1"),
        params![id],
        post_from_row,
    )?;
    match post {
        Some(post) => {
            let mut posts = vec![post];
            attach_tag_ids(sql, &mut posts)?;
            Ok(posts.pop())
        }
        None => Ok(None),
    }
}

/// Must run inside the caller's transaction; an error leaves it to roll back.
fn insert_tag_links(sql: &LoggedConnection<'_>, post_id: i64, tag_ids: &[i64]) -> rusqlite::Result<()> {
    let mut unique = tag_ids.to_vec();
    unique.sort_unstable();
    unique.dedup();

    for tag_id in unique {
        sql.execute(
            "INSERT INTO posts_tags (post_id, tag_id) VALUES (?1, ?2)",
            params![post_id, tag_id],
        )?;
    }
    Ok(())
}

fn attach_tag_ids(sql: &LoggedConnection<'_>, posts: &mut [Post]) -> rusqlite::Result<()> {
    if posts.is_empty() {
        return Ok(());
    }

    let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    let mut tags_by_post: HashMap<i64, Vec<i64>> = HashMap::new();

    for chunk in ids.chunks(TAG_LOOKUP_CHUNK) {
        let placeholders = chunk.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query = format!(
            "SELECT post_id, tag_id FROM posts_tags WHERE post_id IN ({}) ORDER BY tag_id",
            placeholders
        );
        let params: Vec<&dyn ToSql> = chunk.iter().map(|id| id as &dyn ToSql).collect();
        let links = sql.query_all(&query, params.as_slice(), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        for (post_id, tag_id) in links {
            tags_by_post.entry(post_id).or_default().push(tag_id);
        }
    }

    for post in posts.iter_mut() {
        post.data.tag_ids = tags_by_post.remove(&post.id).unwrap_or_default();
    }
    Ok(())
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    let category_id: i64 = row.get("category_id")?;
    let category_name: Option<String> = row.get("category_name")?;

    Ok(Post {
        id: row.get("id")?,
        data: PostData {
            title: row.get("title")?,
            slug: row.get("slug")?,
            image: row.get("image")?,
            description: row.get("description")?,
            body: row.get("body")?,
            published_at: optional_timestamp_column(row, "published_at")?,
            published: row.get("published")?,
            category_id,
            author_id: row.get("author_id")?,
            tag_ids: Vec::new(),
        },
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
        category: category_name.map(|name| Category {
            id: category_id,
            data: CategoryData { name },
        }),
    })
}
