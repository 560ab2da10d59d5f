use crate::db::{QueryLog, QuerySink, TracingSink};
use crate::repositories::{
    CategoryRepository, PostRepository, SqliteCategoryRepository, SqlitePostRepository,
    SqliteTagRepository, SqliteUserRepository, Store, TagRepository, UserRepository,
};
use crate::{Config, Database};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tera::{Tera, Value};

/// The repositories a request handler may use.
#[derive(Clone)]
pub struct Repositories {
    pub posts: Arc<dyn PostRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    pub fn sqlite(store: Store) -> Self {
        Self {
            posts: Arc::new(SqlitePostRepository::new(store.clone())),
            tags: Arc::new(SqliteTagRepository::new(store.clone())),
            categories: Arc::new(SqliteCategoryRepository::new(store.clone())),
            users: Arc::new(SqliteUserRepository::new(store)),
        }
    }
}

pub struct AppState {
    pub config: Config,
    pub templates: Tera,
    pub repos: Repositories,
    pub query_log: Option<Arc<QueryLog>>,
}

impl AppState {
    pub fn new(
        config: Config,
        repos: Repositories,
        query_log: Option<Arc<QueryLog>>,
    ) -> Result<Self> {
        let mut templates = Tera::default();

        templates.register_filter("format_date", format_date_filter);
        templates.register_filter("truncate_str", truncate_str_filter);
        templates.add_raw_templates(vec![
            ("admin/base.html", include_str!("../../templates/admin/base.html")),
            ("admin/posts/index.html", include_str!("../../templates/admin/posts/index.html")),
            ("admin/posts/view.html", include_str!("../../templates/admin/posts/view.html")),
            ("admin/posts/form.html", include_str!("../../templates/admin/posts/form.html")),
            ("admin/categories/index.html", include_str!("../../templates/admin/categories/index.html")),
            ("admin/categories/form.html", include_str!("../../templates/admin/categories/form.html")),
            ("admin/tags/index.html", include_str!("../../templates/admin/tags/index.html")),
            ("admin/tags/form.html", include_str!("../../templates/admin/tags/form.html")),
            ("admin/users/index.html", include_str!("../../templates/admin/users/index.html")),
            ("admin/users/form.html", include_str!("../../templates/admin/users/form.html")),
            ("admin/users/profile.html", include_str!("../../templates/admin/users/profile.html")),
        ])?;

        Ok(Self {
            config,
            templates,
            repos,
            query_log,
        })
    }

    /// Wires SQLite repositories over `db`, recording statements in a query log when
    /// diagnostics ask for one.
    pub fn from_database(config: Config, db: Database) -> Result<Self> {
        let query_log = config
            .diagnostics
            .query_log
            .then(|| Arc::new(QueryLog::new(config.diagnostics.query_log_capacity)));
        let sink: Arc<dyn QuerySink> = match &query_log {
            Some(log) => log.clone() as Arc<dyn QuerySink>,
            None => Arc::new(TracingSink),
        };
        let repos = Repositories::sqlite(Store::new(db, sink));
        Self::new(config, repos, query_log)
    }
}

fn format_date_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let date_str = match value {
        Value::Null => return Ok(Value::String(String::new())),
        Value::String(s) => s.as_str(),
        _ => return Err(tera::Error::msg("format_date requires a string")),
    };

    let format = args
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("%B %d, %Y %H:%M");

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date_str) {
        return Ok(Value::String(dt.format(format).to_string()));
    }

    Ok(Value::String(date_str.to_string()))
}

fn truncate_str_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("truncate_str requires a string"))?;
    let len = args.get("len").and_then(|v| v.as_u64()).unwrap_or(80) as usize;
    if s.chars().count() > len {
        let truncated: String = s.chars().take(len).collect();
        Ok(Value::String(format!("{}...", truncated)))
    } else {
        Ok(Value::String(s.to_string()))
    }
}
