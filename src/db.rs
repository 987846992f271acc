use crate::auth;
use crate::config::Config;
use crate::model::*;
use crate::toggle::BookmarkState;
use anyhow::Result;
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;

const SYSTEM_MIGRATIONS: &[(&str, &str)] = &[(
    "system/000_migrations_table.sql",
    include_str!("migrations/system/000_migrations_table.sql"),
)];

const MIGRATIONS: &[(&str, &str)] = &[("001_schema.sql", include_str!("migrations/001_schema.sql"))];

const POST_COLUMNS: &str =
    "posts.id, posts.title, posts.slug, posts.content, posts.status, posts.views, posts.is_active, posts.user_id, posts.created_at, posts.updated_at";

const USER_COLUMNS: &str = "id, email, username, first_name, last_name, is_active, date_joined";

pub struct Database {
    db: LibsqlDatabase,
    conn: Connection,
    tx_lock: Mutex<()>,
    turso_url: Option<String>,
    turso_auth_token: Option<String>,
}

impl Database {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn is_replica(turso_url: &Option<String>, turso_auth_token: &Option<String>) -> bool {
        turso_url.is_some() && turso_auth_token.is_some()
    }

    pub async fn sync(&self) -> Result<()> {
        if Self::is_replica(&self.turso_url, &self.turso_auth_token) {
            self.db
                .sync()
                .await
                .map_err(|e| anyhow::anyhow!("sync failed: {}", e))?;
        }
        Ok(())
    }

    /// Names already listed in the `_migrations` bookkeeping table.
    async fn applied_migrations(conn: &Connection) -> Result<HashSet<String>> {
        let mut rows = conn.query("SELECT name FROM _migrations", ()).await?;
        let mut names = HashSet::new();
        while let Some(row) = rows.next().await? {
            names.insert(row.get::<String>(0)?);
        }
        Ok(names)
    }

    /// Brings the schema up to date and returns how many migrations ran.
    async fn migrate(conn: &Connection) -> Result<usize> {
        // bookkeeping DDL is idempotent and always runs
        for (name, sql) in SYSTEM_MIGRATIONS {
            conn.execute_batch(sql)
                .await
                .map_err(|e| anyhow::anyhow!("failed to prepare {name}: {e}"))?;
        }

        let applied = Self::applied_migrations(conn).await?;
        let mut ran = 0;
        for (name, sql) in MIGRATIONS {
            if applied.contains(*name) {
                continue;
            }

            tracing::info!(migration = *name, "applying migration");
            conn.execute_batch(sql)
                .await
                .map_err(|e| anyhow::anyhow!("migration {name} failed: {e}"))?;
            conn.execute(
                "INSERT INTO _migrations (name, applied_at) VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                libsql::params![*name],
            )
            .await?;
            ran += 1;
        }

        if ran == 0 {
            tracing::debug!("schema up to date");
        }
        Ok(ran)
    }

    pub async fn new(cfg: &Config, data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(cfg.app.get_db());
        let turso_url = cfg.app.turso_url.clone();
        let turso_auth_token = cfg.app.turso_auth_token.clone();

        let db = match (&turso_url, &turso_auth_token) {
            (Some(url), Some(token)) => {
                tracing::info!("[db] running in synced database mode (offline writes)");
                let sync_interval = Duration::from_secs(cfg.app.sync_interval_seconds);
                Builder::new_synced_database(&path, url.clone(), token.clone())
                    .sync_interval(sync_interval)
                    .build()
                    .await?
            }
            _ => Builder::new_local(&path).build().await?,
        };

        Self::setup(db, turso_url, turso_auth_token).await
    }

    /// Opens a plain local database; `":memory:"` works too.
    pub async fn new_local(path: impl AsRef<Path>) -> Result<Self> {
        let db = Builder::new_local(path.as_ref()).build().await?;
        Self::setup(db, None, None).await
    }

    async fn setup(
        db: LibsqlDatabase,
        turso_url: Option<String>,
        turso_auth_token: Option<String>,
    ) -> Result<Self> {
        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;
        conn.execute("PRAGMA foreign_keys = ON", ()).await?;

        Self::migrate(&conn).await?;

        Ok(Database {
            db,
            conn,
            tx_lock: Mutex::new(()),
            turso_url,
            turso_auth_token,
        })
    }

    // ------------------------------------------------------------------
    // users
    // ------------------------------------------------------------------

    pub async fn create_user(&self, input: NewUser) -> Result<User> {
        let required = [
            ("email", &input.email),
            ("username", &input.username),
            ("first_name", &input.first_name),
            ("last_name", &input.last_name),
            ("password", &input.password),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("users must have a {}", field);
            }
        }

        let email = normalize_email(&input.email);
        let hash = auth::hash_password(&input.password)?;

        let query = format!(
            r#"
            INSERT INTO users (email, username, first_name, last_name, password_hash)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {USER_COLUMNS}
        "#
        );

        let mut rows = self
            .conn
            .query(
                &query,
                libsql::params![
                    email,
                    input.username.trim(),
                    input.first_name.trim(),
                    input.last_name.trim(),
                    hash
                ],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::row_to_user(&row),
            None => anyhow::bail!("failed to create user"),
        }
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let mut rows = self.conn.query(&query, libsql::params![id]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    /// Returns the active user owning `email` when `password` matches.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let query = format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?"
        );
        let mut rows = self
            .conn
            .query(&query, libsql::params![normalize_email(email)])
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let user = Self::row_to_user(&row)?;
        let hash: String = row.get(7)?;

        if !user.is_active || !auth::verify_password(&hash, password)? {
            return Ok(None);
        }
        Ok(Some(user))
    }

    fn row_to_user(row: &libsql::Row) -> Result<User> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            username: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            is_active: row.get::<i64>(5)? != 0,
            date_joined: row.get(6)?,
        })
    }

    // ------------------------------------------------------------------
    // sessions
    // ------------------------------------------------------------------

    pub async fn create_session(&self, user_id: i64, ttl_hours: i64) -> Result<Session> {
        let session = Session {
            key: auth::random_token(),
            user_id,
            csrf_token: auth::random_token(),
            expires_at: (chrono::Utc::now() + chrono::Duration::hours(ttl_hours))
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string(),
        };

        self.conn
            .execute(
                "INSERT INTO sessions (key, user_id, csrf_token, expires_at) VALUES (?, ?, ?, ?)",
                libsql::params![
                    session.key.clone(),
                    session.user_id,
                    session.csrf_token.clone(),
                    session.expires_at.clone()
                ],
            )
            .await?;

        Ok(session)
    }

    /// Live session for `key` together with its active user.
    pub async fn find_session(&self, key: &str) -> Result<Option<(Session, User)>> {
        let query = r#"
            SELECT sessions.key, sessions.user_id, sessions.csrf_token, sessions.expires_at
            FROM sessions
            JOIN users ON users.id = sessions.user_id
            WHERE sessions.key = ?
              AND sessions.expires_at > strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
              AND users.is_active = 1
        "#;

        let mut rows = self.conn.query(query, libsql::params![key]).await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let session = Session {
            key: row.get(0)?,
            user_id: row.get(1)?,
            csrf_token: row.get(2)?,
            expires_at: row.get(3)?,
        };

        match self.get_user(session.user_id).await? {
            Some(user) => Ok(Some((session, user))),
            None => Ok(None),
        }
    }

    pub async fn delete_session(&self, key: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM sessions WHERE key = ?", libsql::params![key])
            .await?;
        Ok(deleted > 0)
    }

    pub async fn delete_expired_sessions(&self) -> Result<u64> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM sessions WHERE expires_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                (),
            )
            .await?;
        Ok(deleted)
    }

    // ------------------------------------------------------------------
    // posts
    // ------------------------------------------------------------------

    pub async fn create_post(&self, user_id: i64, input: NewPost) -> Result<Post> {
        if input.title.trim().is_empty() {
            anyhow::bail!("posts must have a title");
        }

        let query = format!(
            r#"
            INSERT INTO posts (title, slug, content, status, user_id)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {POST_COLUMNS}
        "#
        );

        let mut rows = self
            .conn
            .query(
                &query,
                libsql::params![
                    input.title.trim(),
                    slugify(&input.title),
                    input.content,
                    input.status.as_str(),
                    user_id
                ],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::row_to_post(&row),
            None => anyhow::bail!("failed to create post"),
        }
    }

    pub async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE slug = ?");
        let mut rows = self.conn.query(&query, libsql::params![slug]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_post(&row)?)),
            None => Ok(None),
        }
    }

    /// Active, published post with primary key `id`.
    pub async fn find_published_post(&self, id: i64) -> Result<Option<Post>> {
        let query = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = ? AND is_active = 1 AND status = 'published'"
        );
        let mut rows = self.conn.query(&query, libsql::params![id]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_post(&row)?)),
            None => Ok(None),
        }
    }

    /// Counts one view and returns the refreshed counter.
    pub async fn increment_views(&self, post_id: i64) -> Result<i64> {
        let mut rows = self
            .conn
            .query(
                "UPDATE posts SET views = views + 1 WHERE id = ? RETURNING views",
                libsql::params![post_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => anyhow::bail!("post {} vanished while counting views", post_id),
        }
    }

    pub async fn set_post_active(&self, post_id: i64, active: bool) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE posts SET is_active = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?",
                libsql::params![active as i64, post_id],
            )
            .await?;
        Ok(updated > 0)
    }

    fn row_to_post(row: &libsql::Row) -> Result<Post> {
        let status_str: String = row.get(4)?;
        let status = PostStatus::from_str(&status_str)
            .ok_or_else(|| anyhow::anyhow!("invalid post status: {}", status_str))?;

        Ok(Post {
            id: row.get(0)?,
            title: row.get(1)?,
            slug: row.get(2)?,
            content: row.get(3)?,
            status,
            views: row.get(5)?,
            is_active: row.get::<i64>(6)? != 0,
            user_id: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    // ------------------------------------------------------------------
    // bookmarks
    // ------------------------------------------------------------------

    pub async fn is_bookmarked(&self, post_id: i64, user_id: i64) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM post_bookmarks WHERE post_id = ? AND user_id = ?",
                libsql::params![post_id, user_id],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }

    /// Flips the user's bookmark on a post and returns the new state.
    pub async fn toggle_bookmark(&self, post_id: i64, user_id: i64) -> Result<BookmarkState> {
        let _guard = self.tx_lock.lock().await;

        if self.is_bookmarked(post_id, user_id).await? {
            self.conn
                .execute(
                    "DELETE FROM post_bookmarks WHERE post_id = ? AND user_id = ?",
                    libsql::params![post_id, user_id],
                )
                .await?;
            Ok(BookmarkState::Removed)
        } else {
            self.conn
                .execute(
                    "INSERT INTO post_bookmarks (post_id, user_id) VALUES (?, ?)",
                    libsql::params![post_id, user_id],
                )
                .await?;
            Ok(BookmarkState::Bookmarked)
        }
    }

    /// The user's bookmarked posts that are still active and published, newest bookmark first.
    pub async fn list_bookmarks(&self, user_id: i64, limit: u32, offset: u64) -> Result<Vec<Post>> {
        let query = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            JOIN post_bookmarks ON post_bookmarks.post_id = posts.id
            WHERE post_bookmarks.user_id = ?
              AND posts.is_active = 1
              AND posts.status = 'published'
            ORDER BY post_bookmarks.created_at DESC, posts.id DESC
            LIMIT ? OFFSET ?
        "#
        );

        let mut rows = self
            .conn
            .query(&query, libsql::params![user_id, i64::from(limit), i64::try_from(offset)?])
            .await?;

        let mut posts = vec![];
        while let Some(row) = rows.next().await? {
            posts.push(Self::row_to_post(&row)?);
        }
        Ok(posts)
    }
}

fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Lowercase ASCII slug: alphanumerics kept, everything else collapsed to single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) async fn memory_db() -> Database {
        Database::new_local(":memory:").await.unwrap()
    }

    pub(crate) fn new_user(name: &str) -> NewUser {
        NewUser {
            email: format!("{}@Example.com", name),
            username: name.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password: "hunter22".to_string(),
        }
    }

    pub(crate) fn new_post(title: &str, status: PostStatus) -> NewPost {
        NewPost {
            title: title.to_string(),
            content: "body".to_string(),
            status,
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust   2024 edition "), "rust-2024-edition");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_normalize_email_lowercases_domain_only() {
        assert_eq!(normalize_email(" Ada@Example.COM "), "Ada@example.com");
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = memory_db().await;
        assert_eq!(Database::migrate(db.connection()).await.unwrap(), 0);

        let applied = Database::applied_migrations(db.connection()).await.unwrap();
        assert!(applied.contains("001_schema.sql"));
        assert_eq!(applied.len(), MIGRATIONS.len());
    }

    #[tokio::test]
    async fn test_create_and_authenticate_user() {
        let db = memory_db().await;
        let user = db.create_user(new_user("ada")).await.unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.full_name(), "Ada Lovelace");

        let found = db.authenticate("ada@example.com", "hunter22").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(db.authenticate("ada@example.com", "wrong").await.unwrap().is_none());
        assert!(db.authenticate("bob@example.com", "hunter22").await.unwrap().is_none());

        let mut rows = db
            .connection()
            .query("SELECT password_hash FROM users WHERE id = ?", libsql::params![user.id])
            .await
            .unwrap();
        let stored: String = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert!(stored.starts_with("$argon2"));
        assert!(!stored.contains("hunter22"));
    }

    #[tokio::test]
    async fn test_create_user_requires_fields() {
        let db = memory_db().await;
        let mut input = new_user("ada");
        input.last_name = " ".to_string();
        let err = db.create_user(input).await.unwrap_err();
        assert_eq!(err.to_string(), "users must have a last_name");
    }

    #[tokio::test]
    async fn test_sessions_expire() {
        let db = memory_db().await;
        let user = db.create_user(new_user("ada")).await.unwrap();

        let live = db.create_session(user.id, 1).await.unwrap();
        let expired = db.create_session(user.id, -1).await.unwrap();
        assert_ne!(live.csrf_token, expired.csrf_token);

        assert!(db.find_session(&live.key).await.unwrap().is_some());
        assert!(db.find_session(&expired.key).await.unwrap().is_none());

        assert_eq!(db.delete_expired_sessions().await.unwrap(), 1);
        assert!(db.delete_session(&live.key).await.unwrap());
        assert!(db.find_session(&live.key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_toggle_bookmark_flips_state() {
        let db = memory_db().await;
        let user = db.create_user(new_user("ada")).await.unwrap();
        let post = db
            .create_post(user.id, new_post("First post", PostStatus::Published))
            .await
            .unwrap();
        assert_eq!(post.slug, "first-post");

        assert_eq!(
            db.toggle_bookmark(post.id, user.id).await.unwrap(),
            BookmarkState::Bookmarked
        );
        assert!(db.is_bookmarked(post.id, user.id).await.unwrap());
        assert_eq!(db.list_bookmarks(user.id, 9, 0).await.unwrap().len(), 1);

        assert_eq!(
            db.toggle_bookmark(post.id, user.id).await.unwrap(),
            BookmarkState::Removed
        );
        assert!(!db.is_bookmarked(post.id, user.id).await.unwrap());
        assert!(db.list_bookmarks(user.id, 9, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_bookmarks_hides_inactive_posts() {
        let db = memory_db().await;
        let user = db.create_user(new_user("ada")).await.unwrap();
        let kept = db
            .create_post(user.id, new_post("Kept", PostStatus::Published))
            .await
            .unwrap();
        let hidden = db
            .create_post(user.id, new_post("Hidden", PostStatus::Published))
            .await
            .unwrap();
        db.toggle_bookmark(kept.id, user.id).await.unwrap();
        db.toggle_bookmark(hidden.id, user.id).await.unwrap();
        db.set_post_active(hidden.id, false).await.unwrap();

        let posts = db.list_bookmarks(user.id, 9, 0).await.unwrap();
        assert_eq!(posts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![kept.id]);
        assert!(db.find_published_post(hidden.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_increment_views() {
        let db = memory_db().await;
        let user = db.create_user(new_user("ada")).await.unwrap();
        let post = db
            .create_post(user.id, new_post("Counted", PostStatus::Draft))
            .await
            .unwrap();
        assert_eq!(db.increment_views(post.id).await.unwrap(), 1);
        assert_eq!(db.increment_views(post.id).await.unwrap(), 2);
        assert!(db.find_published_post(post.id).await.unwrap().is_none());
    }
}
