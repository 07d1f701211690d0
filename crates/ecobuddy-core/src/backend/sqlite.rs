use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::password::{hash_password, verify_password};
use super::rows::*;
use super::RowStore;
use crate::error::{EcoError, Result};
use crate::model::*;
use crate::seed;

/// Self-hosted row store: the same tables as the hosted service plus local
/// auth tables, in one SQLite file.
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteBackend {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&path)
            .map_err(|e| EcoError::Storage(format!("failed to open SQLite database: {e}")))?;

        Self::configure_and_init(conn, path)
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            EcoError::Storage(format!("failed to open in-memory SQLite database: {e}"))
        })?;

        Self::configure_and_init(conn, PathBuf::from(":memory:"))
    }

    /// Return the path this database was opened with (`:memory:` for in-memory).
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn configure_and_init(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(|e| EcoError::Storage(format!("failed to set WAL mode: {e}")))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| EcoError::Storage(format!("failed to enable foreign keys: {e}")))?;

        let backend = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };
        backend.create_tables()?;
        Ok(backend)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| EcoError::Storage(format!("failed to acquire database lock: {e}")))
    }

    /// Create all tables and indexes (idempotent).
    fn create_tables(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS auth_users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS auth_sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES auth_users(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                email TEXT NOT NULL,
                name TEXT NOT NULL,
                avatar_url TEXT,
                location TEXT,
                bio TEXT,
                sustainability_score INTEGER NOT NULL DEFAULT 0,
                completed_challenges INTEGER NOT NULL DEFAULT 0,
                streak INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS eco_actions (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                impact_carbon REAL NOT NULL,
                impact_water REAL NOT NULL,
                impact_waste REAL NOT NULL,
                impact_energy REAL NOT NULL,
                difficulty TEXT NOT NULL,
                category TEXT NOT NULL,
                image_url TEXT
            );

            CREATE TABLE IF NOT EXISTS challenges (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                duration INTEGER NOT NULL,
                points INTEGER NOT NULL,
                category TEXT NOT NULL,
                steps TEXT NOT NULL DEFAULT '[]',
                image_url TEXT
            );

            CREATE TABLE IF NOT EXISTS user_challenges (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                user_id TEXT NOT NULL,
                challenge_id TEXT NOT NULL,
                progress INTEGER NOT NULL DEFAULT 0,
                completed INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS community_posts (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                likes INTEGER NOT NULL DEFAULT 0,
                comments INTEGER NOT NULL DEFAULT 0,
                tags TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_user ON auth_sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_user_challenges_user ON user_challenges(user_id, completed);
            CREATE INDEX IF NOT EXISTS idx_posts_created_at ON community_posts(created_at DESC);
            ",
        )
        .map_err(|e| EcoError::Storage(format!("failed to create tables: {e}")))?;

        Ok(())
    }

    /// Insert the bundled catalog rows that are not present yet. Creation
    /// times step back one minute per item so newest-first keeps list order.
    pub fn seed_catalog(&self) -> Result<()> {
        let conn = self.lock()?;
        let now = Utc::now();
        let at = |i: usize| now - Duration::minutes(i as i64);

        for (i, action) in seed::eco_actions().iter().enumerate() {
            let row = EcoActionRow::from_action(action, at(i));
            conn.execute(
                "INSERT OR IGNORE INTO eco_actions
                 (id, created_at, title, description, impact_carbon, impact_water,
                  impact_waste, impact_energy, difficulty, category, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    row.id,
                    ts(row.created_at),
                    row.title,
                    row.description,
                    row.impact_carbon,
                    row.impact_water,
                    row.impact_waste,
                    row.impact_energy,
                    row.difficulty,
                    row.category,
                    row.image_url,
                ],
            )?;
        }

        for (i, challenge) in seed::challenges().iter().enumerate() {
            let row = ChallengeRow::from_challenge(challenge, at(i));
            conn.execute(
                "INSERT OR IGNORE INTO challenges
                 (id, created_at, title, description, duration, points, category, steps, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    row.id,
                    ts(row.created_at),
                    row.title,
                    row.description,
                    row.duration,
                    row.points,
                    row.category,
                    serde_json::to_string(&row.steps)?,
                    row.image_url,
                ],
            )?;
        }

        for post in seed::community_posts() {
            conn.execute(
                "INSERT OR IGNORE INTO community_posts
                 (id, created_at, user_id, title, content, likes, comments, tags)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    post.id,
                    ts(post.created_at),
                    post.user_id,
                    post.title,
                    post.content,
                    post.likes,
                    post.comments,
                    serde_json::to_string(&post.tags)?,
                ],
            )?;
        }

        tracing::debug!(path = %self.path.display(), "catalog seeded");
        Ok(())
    }

    /// Run a blocking closure against the connection on the Tokio blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| EcoError::Storage(format!("failed to acquire database lock: {e}")))?;
            f(&conn)
        })
        .await
        .map_err(|e| EcoError::Storage(format!("task join error: {e}")))?
    }

    /// Like `with_conn`, after checking that `identity` holds a live session.
    async fn with_session<F, T>(&self, identity: &Identity, f: F) -> Result<T>
    where
        F: FnOnce(&Connection, &str) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let token = identity.access_token.clone();
        let user_id = identity.user_id.clone();
        self.with_conn(move |conn| {
            let owner: Option<String> = conn
                .query_row(
                    "SELECT user_id FROM auth_sessions WHERE token = ?1",
                    [&token],
                    |row| row.get(0),
                )
                .optional()?;
            match owner {
                Some(owner) if owner == user_id => f(conn, &user_id),
                _ => Err(EcoError::Auth("invalid or expired session".to_string())),
            }
        })
        .await
    }
}

// -- Row mapping helpers --

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_json_list(s: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

const PROFILE_COLUMNS: &str = "id, created_at, email, name, avatar_url, location, bio, \
     sustainability_score, completed_challenges, streak";

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get(0)?,
        created_at: parse_ts(&row.get::<_, String>(1)?)?,
        email: row.get(2)?,
        name: row.get(3)?,
        avatar_url: row.get(4)?,
        location: row.get(5)?,
        bio: row.get(6)?,
        sustainability_score: row.get(7)?,
        completed_challenges: row.get(8)?,
        streak: row.get(9)?,
    })
}

fn user_challenge_from_row(row: &Row<'_>) -> rusqlite::Result<UserChallengeRow> {
    Ok(UserChallengeRow {
        id: row.get(0)?,
        created_at: parse_ts(&row.get::<_, String>(1)?)?,
        user_id: row.get(2)?,
        challenge_id: row.get(3)?,
        progress: row.get(4)?,
        completed: row.get(5)?,
    })
}

fn fetch_profile(conn: &Connection, user_id: &str) -> Result<Option<UserProfile>> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn
        .query_row(&sql, [user_id], profile_from_row)
        .optional()?)
}

fn new_session(conn: &Connection, user_id: &str, email: &str) -> Result<Identity> {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    let token: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    conn.execute(
        "INSERT INTO auth_sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
        params![token, user_id, ts(Utc::now())],
    )?;
    Ok(Identity {
        user_id: user_id.to_string(),
        email: email.to_string(),
        access_token: token,
    })
}

impl RowStore for SqliteBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity> {
        let email = email.trim().to_lowercase();
        let password = password.to_string();
        self.with_conn(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM auth_users WHERE email = ?1)",
                [&email],
                |row| row.get(0),
            )?;
            if exists {
                return Err(EcoError::Auth("user already registered".to_string()));
            }
            let hash = hash_password(&password)?;
            let user_id = uuid::Uuid::now_v7().to_string();
            conn.execute(
                "INSERT INTO auth_users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![user_id, email, hash, ts(Utc::now())],
            )?;
            new_session(conn, &user_id, &email)
        })
        .await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let email = email.trim().to_lowercase();
        let password = password.to_string();
        self.with_conn(move |conn| {
            let found: Option<(String, String)> = conn
                .query_row(
                    "SELECT id, password_hash FROM auth_users WHERE email = ?1",
                    [&email],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let invalid = || EcoError::Auth("invalid login credentials".to_string());
            let (user_id, hash) = found.ok_or_else(invalid)?;
            if !verify_password(&password, &hash)? {
                return Err(invalid());
            }
            new_session(conn, &user_id, &email)
        })
        .await
    }

    async fn sign_out(&self, identity: &Identity) -> Result<()> {
        let token = identity.access_token.clone();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM auth_sessions WHERE token = ?1", [&token])?;
            Ok(())
        })
        .await
    }

    async fn get_profile(&self, identity: &Identity) -> Result<Option<UserProfile>> {
        self.with_session(identity, |conn, user_id| fetch_profile(conn, user_id))
            .await
    }

    async fn insert_profile(&self, identity: &Identity, profile: &UserProfile) -> Result<UserProfile> {
        let profile = profile.clone();
        self.with_session(identity, move |conn, user_id| {
            if profile.id != user_id {
                return Err(EcoError::Auth("cannot create another user's profile".to_string()));
            }
            conn.execute(
                &format!(
                    "INSERT INTO users ({PROFILE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    profile.id,
                    ts(profile.created_at),
                    profile.email,
                    profile.name,
                    profile.avatar_url,
                    profile.location,
                    profile.bio,
                    profile.sustainability_score,
                    profile.completed_challenges,
                    profile.streak,
                ],
            )?;
            Ok(profile)
        })
        .await
    }

    async fn update_profile(&self, identity: &Identity, update: &ProfileUpdate) -> Result<UserProfile> {
        let update = update.clone();
        self.with_session(identity, move |conn, user_id| {
            let changed = conn.execute(
                "UPDATE users SET
                    name = COALESCE(?1, name),
                    bio = COALESCE(?2, bio),
                    location = COALESCE(?3, location),
                    avatar_url = COALESCE(?4, avatar_url),
                    sustainability_score = COALESCE(?5, sustainability_score),
                    completed_challenges = COALESCE(?6, completed_challenges),
                    streak = COALESCE(?7, streak)
                 WHERE id = ?8",
                params![
                    update.name,
                    update.bio,
                    update.location,
                    update.avatar_url,
                    update.sustainability_score,
                    update.completed_challenges,
                    update.streak,
                    user_id,
                ],
            )?;
            if changed == 0 {
                return Err(EcoError::NotFound(format!("users row {user_id}")));
            }
            fetch_profile(conn, user_id)?
                .ok_or_else(|| EcoError::NotFound(format!("users row {user_id}")))
        })
        .await
    }

    async fn open_user_challenges(&self, identity: &Identity) -> Result<Vec<UserChallengeRow>> {
        self.with_session(identity, |conn, user_id| {
            let mut stmt = conn.prepare(
                "SELECT id, created_at, user_id, challenge_id, progress, completed
                 FROM user_challenges
                 WHERE user_id = ?1 AND completed = 0
                 ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], user_challenge_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn insert_user_challenge(&self, identity: &Identity, row: &UserChallengeRow) -> Result<()> {
        let row = row.clone();
        self.with_session(identity, move |conn, user_id| {
            if row.user_id != user_id {
                return Err(EcoError::Auth("cannot join on behalf of another user".to_string()));
            }
            conn.execute(
                "INSERT INTO user_challenges (id, created_at, user_id, challenge_id, progress, completed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    row.id,
                    ts(row.created_at),
                    row.user_id,
                    row.challenge_id,
                    row.progress,
                    row.completed,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn update_user_challenge(
        &self,
        identity: &Identity,
        challenge_id: &str,
        update: &UserChallengeUpdate,
    ) -> Result<()> {
        let challenge_id = challenge_id.to_string();
        let update = update.clone();
        self.with_session(identity, move |conn, user_id| {
            conn.execute(
                "UPDATE user_challenges SET
                    progress = COALESCE(?1, progress),
                    completed = COALESCE(?2, completed)
                 WHERE user_id = ?3 AND challenge_id = ?4 AND completed = 0",
                params![update.progress, update.completed, user_id, challenge_id],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_challenges(&self) -> Result<Vec<Challenge>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, created_at, title, description, duration, points, category, steps, image_url
                 FROM challenges ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ChallengeRow {
                        id: row.get(0)?,
                        created_at: parse_ts(&row.get::<_, String>(1)?)?,
                        title: row.get(2)?,
                        description: row.get(3)?,
                        duration: row.get(4)?,
                        points: row.get(5)?,
                        category: row.get(6)?,
                        steps: parse_json_list(&row.get::<_, String>(7)?)?,
                        image_url: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(Challenge::from).collect())
        })
        .await
    }

    async fn list_eco_actions(&self) -> Result<Vec<EcoAction>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, created_at, title, description, impact_carbon, impact_water,
                        impact_waste, impact_energy, difficulty, category, image_url
                 FROM eco_actions ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(EcoActionRow {
                        id: row.get(0)?,
                        created_at: parse_ts(&row.get::<_, String>(1)?)?,
                        title: row.get(2)?,
                        description: row.get(3)?,
                        impact_carbon: row.get(4)?,
                        impact_water: row.get(5)?,
                        impact_waste: row.get(6)?,
                        impact_energy: row.get(7)?,
                        difficulty: row.get(8)?,
                        category: row.get(9)?,
                        image_url: row.get(10)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(actions_from_rows(rows))
        })
        .await
    }

    async fn list_community_posts(&self) -> Result<Vec<CommunityPost>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.created_at, p.user_id, p.title, p.content, p.likes, p.comments,
                        p.tags, u.name, u.avatar_url
                 FROM community_posts p
                 LEFT JOIN users u ON u.id = p.user_id
                 ORDER BY p.created_at DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    let author: Option<String> = row.get(8)?;
                    let avatar_url: Option<String> = row.get(9)?;
                    Ok(CommunityPostRow {
                        id: row.get(0)?,
                        created_at: parse_ts(&row.get::<_, String>(1)?)?,
                        user_id: row.get(2)?,
                        title: row.get(3)?,
                        content: row.get(4)?,
                        likes: row.get(5)?,
                        comments: row.get(6)?,
                        tags: parse_json_list(&row.get::<_, String>(7)?)?,
                        users: author.map(|name| PostAuthor {
                            name: Some(name),
                            avatar_url,
                        }),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows.into_iter().map(CommunityPost::from).collect())
        })
        .await
    }
}
