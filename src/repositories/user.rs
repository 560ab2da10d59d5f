use super::{next_timestamp, timestamp_column, RepoError, RepoResult, Store};
use crate::db::timestamp_to_db;
use crate::models::{NewUser, User};
use crate::services::auth::{burn_verification, hash_password, verify_password};
use chrono::Utc;
use rusqlite::{params, Row};

const USER_SELECT_SQL: &str =
    "SELECT id, username, email, password_hash, created_at, updated_at FROM users";

pub trait UserRepository: Send + Sync {
    fn find_one_by_id(&self, id: i64) -> RepoResult<Option<User>>;
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    fn find_all(&self) -> RepoResult<Vec<User>>;
    fn check_username_availability(&self, username: &str) -> RepoResult<bool>;
    fn check_email_availability(&self, email: &str) -> RepoResult<bool>;
    fn create(&self, new_user: &NewUser) -> RepoResult<User>;
    fn update_email(&self, user: &User, email: &str) -> RepoResult<bool>;
    fn update_password(&self, user: &User, password: &str) -> RepoResult<bool>;
    fn delete_one_by_id(&self, id: i64) -> RepoResult<bool>;
    /// The user when the password matches, `None` otherwise.
    fn authenticate(&self, username: &str, password: &str) -> RepoResult<Option<User>>;
}

pub struct SqliteUserRepository {
    store: Store,
}

impl SqliteUserRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl UserRepository for SqliteUserRepository {
    fn find_one_by_id(&self, id: i64) -> RepoResult<Option<User>> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        Ok(sql.query_optional(
            &format!("{USER_SELECT_SQL} WHERE id = ?1"),
            params![id],
            user_from_row,
        )?)
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        Ok(sql.query_optional(
            &format!("{USER_SELECT_SQL} WHERE username = ?1"),
            params![username],
            user_from_row,
        )?)
    }

    fn find_all(&self) -> RepoResult<Vec<User>> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        Ok(sql.query_all(
            &format!("{USER_SELECT_SQL} ORDER BY username"),
            &[],
            user_from_row,
        )?)
    }

    fn check_username_availability(&self, username: &str) -> RepoResult<bool> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        let taken: bool = sql.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
            params![username],
            |row| row.get(0),
        )?;
        Ok(!taken)
    }

    fn check_email_availability(&self, email: &str) -> RepoResult<bool> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        let taken: bool = sql.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
            params![email],
            |row| row.get(0),
        )?;
        Ok(!taken)
    }

    fn create(&self, new_user: &NewUser) -> RepoResult<User> {
        let password_hash =
            hash_password(&new_user.password).map_err(|e| RepoError::Hashing(e.to_string()))?;
        let now = timestamp_to_db(&Utc::now());

        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        sql.execute(
            "INSERT INTO users (username, email, password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![new_user.username, new_user.email, password_hash, now, now],
        )?;
        let id = sql.last_insert_rowid();
        tracing::info!(user_id = id, username = %new_user.username, "User created");

        sql.query_optional(
            &format!("{USER_SELECT_SQL} WHERE id = ?1"),
            params![id],
            user_from_row,
        )?
        .ok_or_else(|| RepoError::InvalidData(format!("user {} missing after insert", id)))
    }

    fn update_email(&self, user: &User, email: &str) -> RepoResult<bool> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        let updated_at = timestamp_to_db(&next_timestamp(user.updated_at));
        let changed = sql.execute(
            "UPDATE users SET email = ?1, updated_at = ?2 WHERE id = ?3",
            params![email, updated_at, user.id],
        )?;
        Ok(changed > 0)
    }

    fn update_password(&self, user: &User, password: &str) -> RepoResult<bool> {
        let password_hash =
            hash_password(password).map_err(|e| RepoError::Hashing(e.to_string()))?;
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        let updated_at = timestamp_to_db(&next_timestamp(user.updated_at));
        let changed = sql.execute(
            "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
            params![password_hash, updated_at, user.id],
        )?;
        if changed > 0 {
            tracing::info!(user_id = user.id, "Password changed");
        }
        Ok(changed > 0)
    }

    fn delete_one_by_id(&self, id: i64) -> RepoResult<bool> {
        let conn = self.store.connection()?;
        let sql = self.store.logged(&conn);
        let deleted = sql.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if deleted > 0 {
            tracing::info!(user_id = id, "User deleted");
        }
        Ok(deleted > 0)
    }

    fn authenticate(&self, username: &str, password: &str) -> RepoResult<Option<User>> {
        match self.find_by_username(username)? {
            Some(user) if verify_password(password, &user.password_hash) => Ok(Some(user)),
            Some(_) => Ok(None),
            None => {
                burn_verification(password);
                Ok(None)
            }
        }
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}
