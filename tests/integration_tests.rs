use blog_admin::db::{QueryLog, TracingSink};
use blog_admin::models::{CategoryData, NewUser, Pagination, PostData, TagData};
use blog_admin::repositories::{
    CategoryRepository, PostRepository, SqliteCategoryRepository, SqlitePostRepository,
    SqliteTagRepository, SqliteUserRepository, Store, TagRepository, UserRepository,
};
use blog_admin::Database;
use chrono::{TimeZone, Utc};
use std::sync::Arc;

fn create_test_db() -> Database {
    let db = Database::open_memory().expect("Failed to create test database");
    db.migrate().expect("Failed to run migrations");
    db
}

fn store(db: &Database) -> Store {
    Store::new(db.clone(), Arc::new(TracingSink))
}

const TEST_PASSWORD: &str = "Password123";
const WRONG_PASSWORD: &str = "WrongPass456";
const NEW_PASSWORD: &str = "NewPass456";

struct Fixture {
    db: Database,
    posts: SqlitePostRepository,
    tags: SqliteTagRepository,
    categories: SqliteCategoryRepository,
    users: SqliteUserRepository,
}

impl Fixture {
    fn new() -> Self {
        let db = create_test_db();
        let store = store(&db);
        Self {
            posts: SqlitePostRepository::new(store.clone()),
            tags: SqliteTagRepository::new(store.clone()),
            categories: SqliteCategoryRepository::new(store.clone()),
            users: SqliteUserRepository::new(store),
            db,
        }
    }

    fn category(&self, name: &str) -> i64 {
        self.categories
            .create(&CategoryData {
                name: name.to_string(),
            })
            .expect("Failed to create category")
            .id
    }

    fn tag(&self, title: &str, slug: &str) -> i64 {
        self.tags
            .create(&TagData {
                title: title.to_string(),
                slug: slug.to_string(),
            })
            .expect("Failed to create tag")
            .id
    }

    fn join_rows(&self) -> i64 {
        let conn = self.db.get().unwrap();
        conn.query_row("SELECT COUNT(*) FROM posts_tags", [], |row| row.get(0))
            .unwrap()
    }
}

fn post_data(slug: &str, category_id: i64) -> PostData {
    PostData {
        title: format!("Post {}", slug),
        slug: slug.to_string(),
        image: None,
        description: "Short description".to_string(),
        body: "Body text".to_string(),
        published_at: None,
        published: false,
        category_id,
        author_id: None,
        tag_ids: Vec::new(),
    }
}

mod post_repository_tests {
    use super::*;

    #[test]
    fn test_create_and_find_round_trip() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        let rust = fx.tag("Rust", "rust");
        let web = fx.tag("Web dev", "web-dev");
        let published_at = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();

        let data = PostData {
            tag_ids: vec![web, rust],
            published: true,
            published_at: Some(published_at),
            image: Some("uploads/cover.jpg".to_string()),
            ..post_data("hello", category_id)
        };
        let created = fx.posts.create(&data).expect("Failed to create post");

        assert!(created.id > 0);
        assert_eq!(created.created_at, created.updated_at);
        assert!((Utc::now() - created.created_at).num_seconds().abs() < 5);
        assert_eq!(created.data.tag_ids, vec![rust, web]);

        let found = fx
            .posts
            .find_one_by_id(created.id)
            .expect("Lookup failed")
            .expect("Post should exist");
        assert_eq!(found.data.title, "Post hello");
        assert_eq!(found.data.slug, "hello");
        assert_eq!(found.data.image.as_deref(), Some("uploads/cover.jpg"));
        assert_eq!(found.data.published_at, Some(published_at));
        assert!(found.data.published);
        assert_eq!(found.data.tag_ids, vec![rust, web]);
        assert_eq!(found.created_at, created.created_at);
        assert_eq!(found.category.map(|c| c.data.name), Some("News".to_string()));
    }

    #[test]
    fn test_find_missing_post_is_none() {
        let fx = Fixture::new();
        assert!(fx.posts.find_one_by_id(42).unwrap().is_none());
    }

    #[test]
    fn test_find_all_in_id_order() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        let first = fx.posts.create(&post_data("first", category_id)).unwrap();
        let second = fx.posts.create(&post_data("second", category_id)).unwrap();

        let ids: Vec<i64> = fx.posts.find_all().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[test]
    fn test_slug_availability() {
        let fx = Fixture::new();
        let category_id = fx.category("News");

        assert!(fx.posts.check_slug_availability("hello").unwrap());
        fx.posts.create(&post_data("hello", category_id)).unwrap();
        assert!(!fx.posts.check_slug_availability("hello").unwrap());
        assert!(fx.posts.check_slug_availability("hello-again").unwrap());
    }

    #[test]
    fn test_duplicate_slug_insert_fails() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        fx.posts.create(&post_data("hello", category_id)).unwrap();
        assert!(fx.posts.create(&post_data("hello", category_id)).is_err());
        assert_eq!(fx.posts.count().unwrap(), 1);
    }

    #[test]
    fn test_update_changes_only_submitted_fields() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        let tag = fx.tag("Rust", "rust");
        let created = fx
            .posts
            .create(&PostData {
                tag_ids: vec![tag],
                ..post_data("hello", category_id)
            })
            .unwrap();

        let mut edited = created.clone();
        edited.data.body = "Rewritten body".to_string();
        edited.data.tag_ids = Vec::new();
        assert!(fx.posts.update(&edited).unwrap());

        let found = fx.posts.find_one_by_id(created.id).unwrap().unwrap();
        assert_eq!(found.data.body, "Rewritten body");
        assert_eq!(found.data.title, created.data.title);
        assert_eq!(found.data.slug, created.data.slug);
        assert_eq!(found.created_at, created.created_at);
        assert!(found.updated_at > created.updated_at);
        // Tag links are not part of an update.
        assert_eq!(found.data.tag_ids, vec![tag]);
    }

    #[test]
    fn test_update_keeps_author() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        let author = fx
            .users
            .create(&NewUser {
                username: "admin".to_string(),
                email: "admin@example.com".to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .unwrap();
        let created = fx
            .posts
            .create(&PostData {
                author_id: Some(author.id),
                ..post_data("hello", category_id)
            })
            .unwrap();

        let mut edited = created.clone();
        edited.data.author_id = None;
        fx.posts.update(&edited).unwrap();

        let found = fx.posts.find_one_by_id(created.id).unwrap().unwrap();
        assert_eq!(found.data.author_id, Some(author.id));
    }

    #[test]
    fn test_update_missing_post_returns_false() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        let mut post = fx.posts.create(&post_data("hello", category_id)).unwrap();
        post.id = 999;
        assert!(!fx.posts.update(&post).unwrap());
    }

    #[test]
    fn test_delete_removes_post_and_links() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        let tag = fx.tag("Rust", "rust");
        let post = fx
            .posts
            .create(&PostData {
                tag_ids: vec![tag],
                ..post_data("hello", category_id)
            })
            .unwrap();
        assert_eq!(fx.join_rows(), 1);

        assert!(fx.posts.delete_one_by_id(post.id).unwrap());
        assert!(fx.posts.find_one_by_id(post.id).unwrap().is_none());
        assert_eq!(fx.join_rows(), 0);
        assert!(!fx.posts.delete_one_by_id(post.id).unwrap());
        // The tag itself survives.
        assert!(fx.tags.find_one_by_id(tag).unwrap().is_some());
    }

    #[test]
    fn test_delete_missing_post_leaves_others() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        fx.posts.create(&post_data("first", category_id)).unwrap();
        fx.posts.create(&post_data("second", category_id)).unwrap();

        assert!(!fx.posts.delete_one_by_id(9999).unwrap());
        assert_eq!(fx.posts.count().unwrap(), 2);
    }

    #[test]
    fn test_pagination() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        for i in 0..12 {
            fx.posts
                .create(&post_data(&format!("post-{}", i), category_id))
                .unwrap();
        }

        let total = fx.posts.count().unwrap();
        assert_eq!(total, 12);

        let first = Pagination::new(1, 5);
        assert_eq!(first.page_count(total), 3);
        assert_eq!(fx.posts.find_page(&first).unwrap().len(), 5);
        assert_eq!(fx.posts.find_page(&Pagination::new(3, 5)).unwrap().len(), 2);
        assert!(fx.posts.find_page(&Pagination::new(4, 5)).unwrap().is_empty());
        // Page 0 behaves like page 1.
        assert_eq!(
            fx.posts.find_page(&Pagination::new(0, 5)).unwrap()[0].id,
            fx.posts.find_page(&first).unwrap()[0].id
        );
    }

    #[test]
    fn test_page_is_ordered_by_last_update() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        let oldest = fx.posts.create(&post_data("oldest", category_id)).unwrap();
        fx.posts.create(&post_data("middle", category_id)).unwrap();
        let newest = fx.posts.create(&post_data("newest", category_id)).unwrap();

        let page = fx.posts.find_page(&Pagination::new(1, 5)).unwrap();
        assert_eq!(page[0].id, newest.id);
        assert_eq!(page[2].id, oldest.id);

        fx.posts.update(&oldest).unwrap();
        let page = fx.posts.find_page(&Pagination::new(1, 5)).unwrap();
        assert_eq!(page[0].id, oldest.id);
    }

    #[test]
    fn test_create_with_unknown_tag_stores_nothing() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        let tag = fx.tag("Rust", "rust");

        let result = fx.posts.create(&PostData {
            tag_ids: vec![tag, 9999],
            ..post_data("hello", category_id)
        });

        assert!(result.is_err());
        assert_eq!(fx.posts.count().unwrap(), 0);
        assert_eq!(fx.join_rows(), 0);
        assert!(fx.posts.check_slug_availability("hello").unwrap());
    }

    #[test]
    fn test_create_with_unknown_category_fails() {
        let fx = Fixture::new();
        assert!(fx.posts.create(&post_data("hello", 77)).is_err());
        assert_eq!(fx.posts.count().unwrap(), 0);
    }

    #[test]
    fn test_assign_tags_is_all_or_nothing() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        let tag = fx.tag("Rust", "rust");
        let post = fx.posts.create(&post_data("hello", category_id)).unwrap();

        assert!(fx.posts.assign_tags_to_post(post.id, &[tag, 9999]).is_err());
        assert_eq!(fx.join_rows(), 0);

        fx.posts.assign_tags_to_post(post.id, &[tag, tag]).unwrap();
        let found = fx.posts.find_one_by_id(post.id).unwrap().unwrap();
        assert_eq!(found.data.tag_ids, vec![tag]);
    }

    #[test]
    fn test_replace_post_tags() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        let rust = fx.tag("Rust", "rust");
        let web = fx.tag("Web dev", "web-dev");
        let post = fx
            .posts
            .create(&PostData {
                tag_ids: vec![rust],
                ..post_data("hello", category_id)
            })
            .unwrap();

        fx.posts.replace_post_tags(post.id, &[web]).unwrap();
        let found = fx.posts.find_one_by_id(post.id).unwrap().unwrap();
        assert_eq!(found.data.tag_ids, vec![web]);

        // A failed replacement keeps the previous links.
        assert!(fx.posts.replace_post_tags(post.id, &[rust, 9999]).is_err());
        let found = fx.posts.find_one_by_id(post.id).unwrap().unwrap();
        assert_eq!(found.data.tag_ids, vec![web]);
    }

    #[test]
    fn test_update_with_tags_swaps_links() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        let rust = fx.tag("Rust", "rust");
        let web = fx.tag("Web dev", "web-dev");
        let mut post = fx
            .posts
            .create(&PostData {
                tag_ids: vec![rust],
                ..post_data("hello", category_id)
            })
            .unwrap();

        post.data.title = "Renamed".to_string();
        post.data.tag_ids = vec![web, web];
        assert!(fx.posts.update_with_tags(&post).unwrap());

        let found = fx.posts.find_one_by_id(post.id).unwrap().unwrap();
        assert_eq!(found.data.title, "Renamed");
        assert_eq!(found.data.tag_ids, vec![web]);
        assert_eq!(fx.join_rows(), 1);
    }

    #[test]
    fn test_update_with_unknown_tag_changes_nothing() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        let rust = fx.tag("Rust", "rust");
        let post = fx
            .posts
            .create(&PostData {
                tag_ids: vec![rust],
                ..post_data("hello", category_id)
            })
            .unwrap();

        let mut edited = post.clone();
        edited.data.title = "Renamed".to_string();
        edited.data.tag_ids = vec![9999];
        assert!(fx.posts.update_with_tags(&edited).is_err());

        let found = fx.posts.find_one_by_id(post.id).unwrap().unwrap();
        assert_eq!(found.data.title, "Post hello");
        assert_eq!(found.data.tag_ids, vec![rust]);
        assert_eq!(found.updated_at, post.updated_at);
    }

    #[test]
    fn test_update_with_tags_missing_post_returns_false() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        let rust = fx.tag("Rust", "rust");
        let mut post = fx.posts.create(&post_data("hello", category_id)).unwrap();
        post.id = 999;
        post.data.tag_ids = vec![rust];
        assert!(!fx.posts.update_with_tags(&post).unwrap());
        assert_eq!(fx.join_rows(), 0);
    }

    #[test]
    fn test_category_key_pairs() {
        let fx = Fixture::new();
        let news = fx.category("News");
        let notes = fx.category("Notes");

        let pairs = fx.posts.category_key_pairs().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs.get(&news).map(String::as_str), Some("News"));
        assert_eq!(pairs.get(&notes).map(String::as_str), Some("Notes"));
    }
}

mod tag_repository_tests {
    use super::*;

    #[test]
    fn test_create_trims_title() {
        let fx = Fixture::new();
        let id = fx.tag("  Rust  ", "rust");
        let tag = fx.tags.find_one_by_id(id).unwrap().unwrap();
        assert_eq!(tag.data.title, "Rust");
        assert_eq!(tag.data.slug, "rust");
    }

    #[test]
    fn test_find_all_ordered_by_title() {
        let fx = Fixture::new();
        fx.tag("Zig", "zig");
        fx.tag("Ada", "ada");
        let titles: Vec<String> = fx
            .tags
            .find_all()
            .unwrap()
            .into_iter()
            .map(|t| t.data.title)
            .collect();
        assert_eq!(titles, vec!["Ada", "Zig"]);
    }

    #[test]
    fn test_find_for_post() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        let rust = fx.tag("Rust", "rust");
        fx.tag("Unused", "unused");
        let post = fx
            .posts
            .create(&PostData {
                tag_ids: vec![rust],
                ..post_data("hello", category_id)
            })
            .unwrap();

        let tags = fx.tags.find_for_post(post.id).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].id, rust);
    }

    #[test]
    fn test_slug_availability_and_update() {
        let fx = Fixture::new();
        let id = fx.tag("Rust", "rust");
        assert!(!fx.tags.check_slug_availability("rust").unwrap());

        let mut tag = fx.tags.find_one_by_id(id).unwrap().unwrap();
        tag.data.slug = "rust-lang".to_string();
        assert!(fx.tags.update(&tag).unwrap());
        assert!(fx.tags.check_slug_availability("rust").unwrap());
        assert!(!fx.tags.check_slug_availability("rust-lang").unwrap());
    }

    #[test]
    fn test_delete_unlinks_posts() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        let rust = fx.tag("Rust", "rust");
        let post = fx
            .posts
            .create(&PostData {
                tag_ids: vec![rust],
                ..post_data("hello", category_id)
            })
            .unwrap();

        assert!(fx.tags.delete_one_by_id(rust).unwrap());
        let found = fx.posts.find_one_by_id(post.id).unwrap().unwrap();
        assert!(found.data.tag_ids.is_empty());
    }
}

mod category_repository_tests {
    use super::*;

    #[test]
    fn test_create_update_and_page() {
        let fx = Fixture::new();
        for name in ["Gamma", "Alpha", "Beta"] {
            fx.category(name);
        }
        assert_eq!(fx.categories.count().unwrap(), 3);

        let names: Vec<String> = fx
            .categories
            .find_all()
            .unwrap()
            .into_iter()
            .map(|c| c.data.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);

        let page = fx.categories.find_page(&Pagination::new(2, 2)).unwrap();
        assert_eq!(page.len(), 1);

        let mut category = fx.categories.find_all().unwrap().remove(0);
        category.data.name = "Aardvark".to_string();
        assert!(fx.categories.update(&category).unwrap());
        let found = fx.categories.find_one_by_id(category.id).unwrap().unwrap();
        assert_eq!(found.data.name, "Aardvark");
    }

    #[test]
    fn test_in_use_category_cannot_be_deleted() {
        let fx = Fixture::new();
        let category_id = fx.category("News");
        let post = fx.posts.create(&post_data("hello", category_id)).unwrap();

        assert!(fx.categories.is_in_use(category_id).unwrap());
        assert!(fx.categories.delete_one_by_id(category_id).is_err());

        fx.posts.delete_one_by_id(post.id).unwrap();
        assert!(!fx.categories.is_in_use(category_id).unwrap());
        assert!(fx.categories.delete_one_by_id(category_id).unwrap());
    }
}

mod user_repository_tests {
    use super::*;

    fn admin(fx: &Fixture) -> blog_admin::models::User {
        fx.users
            .create(&NewUser {
                username: "admin".to_string(),
                email: "admin@example.com".to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .expect("Failed to create user")
    }

    #[test]
    fn test_create_and_authenticate_user() {
        let fx = Fixture::new();
        let user = admin(&fx);
        assert!(user.id > 0);
        assert_ne!(user.password_hash, TEST_PASSWORD);

        let found = fx
            .users
            .authenticate("admin", TEST_PASSWORD)
            .expect("Authentication error")
            .expect("User should be found");
        assert_eq!(found.id, user.id);
        assert_eq!(found.email, "admin@example.com");
    }

    #[test]
    fn test_authenticate_rejects_bad_credentials() {
        let fx = Fixture::new();
        admin(&fx);
        assert!(fx.users.authenticate("admin", WRONG_PASSWORD).unwrap().is_none());
        assert!(fx.users.authenticate("nobody", TEST_PASSWORD).unwrap().is_none());
    }

    #[test]
    fn test_username_availability() {
        let fx = Fixture::new();
        assert!(fx.users.check_username_availability("admin").unwrap());
        admin(&fx);
        assert!(!fx.users.check_username_availability("admin").unwrap());
        assert!(fx.users.find_by_username("admin").unwrap().is_some());
    }

    #[test]
    fn test_email_availability() {
        let fx = Fixture::new();
        assert!(fx.users.check_email_availability("admin@example.com").unwrap());
        admin(&fx);
        assert!(!fx.users.check_email_availability("admin@example.com").unwrap());
        assert!(fx.users.check_email_availability("other@example.com").unwrap());
    }

    #[test]
    fn test_update_email_and_password() {
        let fx = Fixture::new();
        let user = admin(&fx);

        assert!(fx.users.update_email(&user, "new@example.com").unwrap());
        let user = fx.users.find_one_by_id(user.id).unwrap().unwrap();
        assert_eq!(user.email, "new@example.com");

        assert!(fx.users.update_password(&user, NEW_PASSWORD).unwrap());
        assert!(fx.users.authenticate("admin", TEST_PASSWORD).unwrap().is_none());
        assert!(fx.users.authenticate("admin", NEW_PASSWORD).unwrap().is_some());
    }

    #[test]
    fn test_deleting_author_keeps_posts() {
        let fx = Fixture::new();
        let user = admin(&fx);
        let category_id = fx.category("News");
        let post = fx
            .posts
            .create(&PostData {
                author_id: Some(user.id),
                ..post_data("hello", category_id)
            })
            .unwrap();

        assert!(fx.users.delete_one_by_id(user.id).unwrap());
        assert!(fx.users.find_all().unwrap().is_empty());
        let found = fx.posts.find_one_by_id(post.id).unwrap().unwrap();
        assert_eq!(found.data.author_id, None);
    }
}

mod query_log_integration_tests {
    use super::*;

    #[test]
    fn test_repository_statements_reach_the_log() {
        let db = create_test_db();
        let log = Arc::new(QueryLog::new(50));
        let store = Store::new(db, log.clone());
        let categories = SqliteCategoryRepository::new(store.clone());
        let posts = SqlitePostRepository::new(store);

        let category = categories
            .create(&CategoryData {
                name: "News".to_string(),
            })
            .unwrap();
        log.clear();

        posts.create(&post_data("hello", category.id)).unwrap();

        let entries = log.entries();
        let insert = entries
            .iter()
            .find(|r| r.sql.starts_with("INSERT INTO posts "))
            .expect("insert should be logged");
        assert!(insert.params.contains(&"'hello'".to_string()));
    }
}

mod router_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use blog_admin::web::{app, AppState};
    use blog_admin::Config;
    use tower::ServiceExt;

    struct TestApp {
        router: axum::Router,
        fx: Fixture,
    }

    fn test_app(query_log: bool) -> TestApp {
        let fx = Fixture::new();
        fx.users
            .create(&NewUser {
                username: "admin".to_string(),
                email: "admin@example.com".to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .unwrap();

        let mut toml_text = Config::default_toml("Test Blog");
        if query_log {
            toml_text = toml_text.replace("query_log = false", "query_log = true");
        }
        let config: Config = toml::from_str(&toml_text).unwrap();
        let state = AppState::from_database(config, fx.db.clone()).unwrap();

        TestApp {
            router: app(Arc::new(state)),
            fx,
        }
    }

    fn auth_header(password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("admin:{}", password)))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, auth_header(TEST_PASSWORD))
            .body(Body::empty())
            .unwrap()
    }

    fn post_form(uri: &str, form: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, auth_header(TEST_PASSWORD))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_requires_credentials() {
        let t = test_app(false);
        let response = t
            .router
            .clone()
            .oneshot(Request::builder().uri("/admin/posts").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

        let response = t
            .router
            .oneshot(
                Request::builder()
                    .uri("/admin/posts")
                    .header(header::AUTHORIZATION, auth_header(WRONG_PASSWORD))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_post_index_lists_posts() {
        let t = test_app(false);
        let category_id = t.fx.category("News");
        t.fx.posts.create(&post_data("hello", category_id)).unwrap();

        let response = t.router.oneshot(get("/admin/posts")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::X_FRAME_OPTIONS).unwrap(),
            "DENY"
        );
        let body = body_text(response).await;
        assert!(body.contains("Post hello"));
        assert!(body.contains("News"));
    }

    #[tokio::test]
    async fn test_create_post_from_form() {
        let t = test_app(false);
        let category_id = t.fx.category("News");
        let rust = t.fx.tag("Rust", "rust");
        let web = t.fx.tag("Web dev", "web-dev");

        let form = format!(
            "title=Hello&slug=hello&description=Intro&body=Text&category_id={}&published=1&published_at=2024-05-17T14%3A30&tag_ids={}&tag_ids={}",
            category_id, rust, web
        );
        let response = t
            .router
            .oneshot(post_form("/admin/posts", &form))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let post = t.fx.posts.find_all().unwrap().remove(0);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            &format!("/admin/posts/{}", post.id)
        );
        assert_eq!(post.data.tag_ids, vec![rust, web]);
        assert!(post.data.published);
        assert_eq!(
            post.data.published_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 17, 14, 30, 0).unwrap())
        );
        let admin = t.fx.users.find_by_username("admin").unwrap().unwrap();
        assert_eq!(post.data.author_id, Some(admin.id));
    }

    #[tokio::test]
    async fn test_invalid_post_form_is_shown_again() {
        let t = test_app(false);
        let category_id = t.fx.category("News");
        t.fx.posts.create(&post_data("hello", category_id)).unwrap();

        let form = format!(
            "title=Another&slug=hello&description=Intro&body=&category_id={}",
            category_id
        );
        let response = t
            .router
            .oneshot(post_form("/admin/posts", &form))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Slug already used"));
        assert!(body.contains("Body must not be empty"));
        assert!(body.contains("value=\"Another\""));
        assert_eq!(t.fx.posts.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_edit_replaces_tags_and_keeps_slug_check_relaxed() {
        let t = test_app(false);
        let category_id = t.fx.category("News");
        let rust = t.fx.tag("Rust", "rust");
        let web = t.fx.tag("Web dev", "web-dev");
        let post = t
            .fx
            .posts
            .create(&PostData {
                tag_ids: vec![rust],
                ..post_data("hello", category_id)
            })
            .unwrap();

        // Same slug as before: not reported as taken.
        let form = format!(
            "title=Renamed&slug=hello&description=Intro&body=Text&category_id={}&tag_ids={}",
            category_id, web
        );
        let response = t
            .router
            .oneshot(post_form(&format!("/admin/posts/{}", post.id), &form))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let found = t.fx.posts.find_one_by_id(post.id).unwrap().unwrap();
        assert_eq!(found.data.title, "Renamed");
        assert_eq!(found.data.tag_ids, vec![web]);
    }

    #[tokio::test]
    async fn test_edit_with_unknown_tag_is_shown_again() {
        let t = test_app(false);
        let category_id = t.fx.category("News");
        let rust = t.fx.tag("Rust", "rust");
        let post = t
            .fx
            .posts
            .create(&PostData {
                tag_ids: vec![rust],
                ..post_data("hello", category_id)
            })
            .unwrap();

        let form = format!(
            "title=Renamed&slug=hello&description=Intro&body=Text&category_id={}&tag_ids=9999",
            category_id
        );
        let response = t
            .router
            .oneshot(post_form(&format!("/admin/posts/{}", post.id), &form))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Selected tag no longer exists"));

        let found = t.fx.posts.find_one_by_id(post.id).unwrap().unwrap();
        assert_eq!(found.data.title, "Post hello");
        assert_eq!(found.data.tag_ids, vec![rust]);
    }

    #[tokio::test]
    async fn test_create_with_unknown_tag_is_shown_again() {
        let t = test_app(false);
        let category_id = t.fx.category("News");

        let form = format!(
            "title=Hello&slug=hello&description=Intro&body=Text&category_id={}&tag_ids=9999",
            category_id
        );
        let response = t
            .router
            .oneshot(post_form("/admin/posts", &form))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Selected tag no longer exists"));
        assert_eq!(t.fx.posts.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_post_is_not_found() {
        let t = test_app(false);
        let response = t.router.oneshot(get("/admin/posts/999")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_category_in_use_delete_conflicts() {
        let t = test_app(false);
        let category_id = t.fx.category("News");
        t.fx.posts.create(&post_data("hello", category_id)).unwrap();

        let response = t
            .router
            .oneshot(post_form(
                &format!("/admin/categories/{}/delete", category_id),
                "",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(t.fx.categories.find_one_by_id(category_id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_tag_slug_derived_from_title() {
        let t = test_app(false);
        let response = t
            .router
            .oneshot(post_form("/admin/tags", "title=Async+Rust&slug="))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let tags = t.fx.tags.find_all().unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].data.slug, "async-rust");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_reported_on_create() {
        let t = test_app(false);
        let response = t
            .router
            .oneshot(post_form(
                "/admin/users",
                "username=other&email=admin%40example.com&password=Password123&password_confirm=Password123",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Email already used"));
        assert!(!body.contains("Username already taken"));
        assert_eq!(t.fx.users.find_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_profile_email_taken_by_another_user() {
        let t = test_app(false);
        t.fx.users
            .create(&NewUser {
                username: "editor".to_string(),
                email: "editor@example.com".to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .unwrap();

        let response = t
            .router
            .clone()
            .oneshot(post_form("/admin/profile", "email=editor%40example.com"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Email already used"));
        let admin = t.fx.users.find_by_username("admin").unwrap().unwrap();
        assert_eq!(admin.email, "admin@example.com");

        // Resubmitting the current address is not a conflict.
        let response = t
            .router
            .oneshot(post_form("/admin/profile", "email=admin%40example.com"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!body_text(response).await.contains("Email already used"));
    }

    #[tokio::test]
    async fn test_debug_queries_only_when_enabled() {
        let t = test_app(false);
        let response = t.router.oneshot(get("/admin/debug/queries")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let t = test_app(true);
        let response = t
            .router
            .clone()
            .oneshot(get("/admin/posts"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = t.router.oneshot(get("/admin/debug/queries")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["capacity"], 200);
        let queries = json["queries"].as_array().unwrap();
        assert!(queries
            .iter()
            .any(|q| q["sql"].as_str().unwrap().contains("FROM posts")));
    }
}
