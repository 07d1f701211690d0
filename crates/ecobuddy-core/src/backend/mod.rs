mod password;
mod rest;
pub mod rows;
mod sqlite;

pub use password::{hash_password, verify_password};
pub use rest::RestBackend;
pub use rows::*;
pub use sqlite::SqliteBackend;

use std::future::Future;
use std::time::Duration;

use crate::config::{self, EcoConfig};
use crate::error::{EcoError, Result};
use crate::model::*;

/// Hosted row store plus its auth service.
///
/// Table operations take the caller's [`Identity`]; its access token is what
/// authorizes the request.
pub trait RowStore: Send + Sync {
    // -- Auth --

    fn sign_up(&self, email: &str, password: &str) -> impl Future<Output = Result<Identity>> + Send;

    fn sign_in(&self, email: &str, password: &str) -> impl Future<Output = Result<Identity>> + Send;

    fn sign_out(&self, identity: &Identity) -> impl Future<Output = Result<()>> + Send;

    // -- users --

    /// The signed-in user's row, if one exists.
    fn get_profile(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = Result<Option<UserProfile>>> + Send;

    fn insert_profile(
        &self,
        identity: &Identity,
        profile: &UserProfile,
    ) -> impl Future<Output = Result<UserProfile>> + Send;

    fn update_profile(
        &self,
        identity: &Identity,
        update: &ProfileUpdate,
    ) -> impl Future<Output = Result<UserProfile>> + Send;

    // -- user_challenges --

    /// Open (not completed) participation rows, newest first.
    fn open_user_challenges(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = Result<Vec<UserChallengeRow>>> + Send;

    fn insert_user_challenge(
        &self,
        identity: &Identity,
        row: &UserChallengeRow,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Update the open row for `challenge_id`. Missing rows are not an error.
    fn update_user_challenge(
        &self,
        identity: &Identity,
        challenge_id: &str,
        update: &UserChallengeUpdate,
    ) -> impl Future<Output = Result<()>> + Send;

    // -- Reference data, newest first --

    fn list_challenges(&self) -> impl Future<Output = Result<Vec<Challenge>>> + Send;

    fn list_eco_actions(&self) -> impl Future<Output = Result<Vec<EcoAction>>> + Send;

    fn list_community_posts(&self) -> impl Future<Output = Result<Vec<CommunityPost>>> + Send;
}

/// Enum wrapper for row stores. Dispatches to the concrete implementation.
/// Using an enum instead of `Box<dyn RowStore>` because the trait uses RPITIT.
pub enum Backend {
    Sqlite(SqliteBackend),
    Rest(RestBackend),
}

impl Backend {
    pub fn kind(&self) -> &'static str {
        match self {
            Backend::Sqlite(_) => "sqlite",
            Backend::Rest(_) => "rest",
        }
    }
}

impl RowStore for Backend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity> {
        match self {
            Backend::Sqlite(b) => b.sign_up(email, password).await,
            Backend::Rest(b) => b.sign_up(email, password).await,
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        match self {
            Backend::Sqlite(b) => b.sign_in(email, password).await,
            Backend::Rest(b) => b.sign_in(email, password).await,
        }
    }

    async fn sign_out(&self, identity: &Identity) -> Result<()> {
        match self {
            Backend::Sqlite(b) => b.sign_out(identity).await,
            Backend::Rest(b) => b.sign_out(identity).await,
        }
    }

    async fn get_profile(&self, identity: &Identity) -> Result<Option<UserProfile>> {
        match self {
            Backend::Sqlite(b) => b.get_profile(identity).await,
            Backend::Rest(b) => b.get_profile(identity).await,
        }
    }

    async fn insert_profile(&self, identity: &Identity, profile: &UserProfile) -> Result<UserProfile> {
        match self {
            Backend::Sqlite(b) => b.insert_profile(identity, profile).await,
            Backend::Rest(b) => b.insert_profile(identity, profile).await,
        }
    }

    async fn update_profile(&self, identity: &Identity, update: &ProfileUpdate) -> Result<UserProfile> {
        match self {
            Backend::Sqlite(b) => b.update_profile(identity, update).await,
            Backend::Rest(b) => b.update_profile(identity, update).await,
        }
    }

    async fn open_user_challenges(&self, identity: &Identity) -> Result<Vec<UserChallengeRow>> {
        match self {
            Backend::Sqlite(b) => b.open_user_challenges(identity).await,
            Backend::Rest(b) => b.open_user_challenges(identity).await,
        }
    }

    async fn insert_user_challenge(&self, identity: &Identity, row: &UserChallengeRow) -> Result<()> {
        match self {
            Backend::Sqlite(b) => b.insert_user_challenge(identity, row).await,
            Backend::Rest(b) => b.insert_user_challenge(identity, row).await,
        }
    }

    async fn update_user_challenge(
        &self,
        identity: &Identity,
        challenge_id: &str,
        update: &UserChallengeUpdate,
    ) -> Result<()> {
        match self {
            Backend::Sqlite(b) => b.update_user_challenge(identity, challenge_id, update).await,
            Backend::Rest(b) => b.update_user_challenge(identity, challenge_id, update).await,
        }
    }

    async fn list_challenges(&self) -> Result<Vec<Challenge>> {
        match self {
            Backend::Sqlite(b) => b.list_challenges().await,
            Backend::Rest(b) => b.list_challenges().await,
        }
    }

    async fn list_eco_actions(&self) -> Result<Vec<EcoAction>> {
        match self {
            Backend::Sqlite(b) => b.list_eco_actions().await,
            Backend::Rest(b) => b.list_eco_actions().await,
        }
    }

    async fn list_community_posts(&self) -> Result<Vec<CommunityPost>> {
        match self {
            Backend::Sqlite(b) => b.list_community_posts().await,
            Backend::Rest(b) => b.list_community_posts().await,
        }
    }
}

/// Create the backend selected by `[backend] kind`.
pub fn create_backend(config: &EcoConfig) -> Result<Backend> {
    match config.backend.kind.as_str() {
        "sqlite" => {
            let path = match &config.backend.path {
                Some(p) => std::path::PathBuf::from(p),
                None => default_sqlite_path()?,
            };
            let backend = SqliteBackend::open(&path)?;
            backend.seed_catalog()?;
            Ok(Backend::Sqlite(backend))
        }
        "rest" => {
            let anon_key = config::resolve_anon_key(&config.remote)?;
            let backend = RestBackend::new(
                &config.remote.url,
                &anon_key,
                Duration::from_secs(config.remote.timeout_secs),
            )?;
            Ok(Backend::Rest(backend))
        }
        other => Err(EcoError::Config(format!("unknown backend: {other}"))),
    }
}

/// Default SQLite path: `~/.config/ecobuddy/ecobuddy.db`
fn default_sqlite_path() -> Result<std::path::PathBuf> {
    config::config_dir()
        .map(|p| p.join("ecobuddy.db"))
        .ok_or_else(|| EcoError::Config("cannot determine config directory".to_string()))
}
