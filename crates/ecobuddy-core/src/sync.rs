use std::sync::{Mutex, MutexGuard};

use tokio::sync::watch;

use crate::backend::{Backend, ProfileUpdate, RowStore, UserChallengeRow, UserChallengeUpdate};
use crate::error::{EcoError, Result};
use crate::model::*;
use crate::scope::ViewScope;
use crate::store::{AppStore, Completion, Navigation};

/// A store shared between async callers. The lock is only ever held for one
/// synchronous store operation, never across an await.
pub type SharedStore = Mutex<AppStore>;

pub fn lock_store(store: &SharedStore) -> Result<MutexGuard<'_, AppStore>> {
    store
        .lock()
        .map_err(|e| EcoError::Storage(format!("failed to acquire store lock: {e}")))
}

/// Keeps the store and the backend in step.
///
/// Remote calls run inside the caller's [`ViewScope`]; a cancelled scope
/// returns [`EcoError::Cancelled`] and leaves the store untouched.
pub struct SyncAdapter {
    backend: Backend,
    session: watch::Sender<Option<Identity>>,
}

impl SyncAdapter {
    pub fn new(backend: Backend) -> Self {
        let (session, _) = watch::channel(None);
        Self { backend, session }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Session-change stream. The current value is the signed-in identity.
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.session.subscribe()
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.session.borrow().clone()
    }

    // -- Auth --

    /// Create an account and its `users` row (score, completed, streak all 0).
    pub async fn sign_up(
        &self,
        scope: &ViewScope,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Identity> {
        require_credentials(email, password)?;
        let identity = scope.run(self.backend.sign_up(email, password)).await?;

        let profile = UserProfile::new(
            identity.user_id.clone(),
            identity.email.clone(),
            name.trim().to_string(),
        );
        scope
            .run(self.backend.insert_profile(&identity, &profile))
            .await?;

        tracing::info!(user_id = %identity.user_id, "signed up");
        self.session.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    pub async fn sign_in(&self, scope: &ViewScope, email: &str, password: &str) -> Result<Identity> {
        require_credentials(email, password)?;
        let identity = scope.run(self.backend.sign_in(email, password)).await?;
        tracing::info!(user_id = %identity.user_id, "signed in");
        self.session.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    /// End the session remotely (failures are logged) and clear it locally.
    pub async fn sign_out(&self, scope: &ViewScope, store: &SharedStore) -> Result<Navigation> {
        let identity = lock_store(store)?.identity().cloned();
        if let Some(ref identity) = identity {
            match scope.run(self.backend.sign_out(identity)).await {
                Ok(()) => {}
                Err(EcoError::Cancelled) => return Err(EcoError::Cancelled),
                Err(e) => tracing::warn!("remote sign-out failed: {e}"),
            }
        }
        let nav = lock_store(store)?.sign_out();
        self.session.send_replace(None);
        Ok(nav)
    }

    // -- Hydration --

    /// Point the store at `identity`. When signed in, the user's profile row
    /// and open challenges are fetched first and applied together; a missing
    /// row keeps the current stats.
    ///
    /// Results for an identity that is no longer the adapter's session are
    /// dropped and `Ok(())` is returned, whether the fetch succeeded or failed
    /// (a signed-out token fails with `Auth`). Fetch errors for the current
    /// session are returned.
    pub async fn on_identity_change(
        &self,
        scope: &ViewScope,
        store: &SharedStore,
        identity: Option<Identity>,
    ) -> Result<()> {
        let Some(identity) = identity else {
            lock_store(store)?.set_identity(None);
            return Ok(());
        };

        let fetched = scope
            .run(async {
                tokio::try_join!(
                    self.backend.get_profile(&identity),
                    self.backend.open_user_challenges(&identity),
                )
            })
            .await;
        if let Err(EcoError::Cancelled) = fetched {
            return Err(EcoError::Cancelled);
        }

        let current = self.current_identity().map(|i| i.user_id);
        if current.as_deref() != Some(identity.user_id.as_str()) {
            tracing::debug!(user_id = %identity.user_id, "dropping hydration for stale session");
            return Ok(());
        }
        let (profile, open) = fetched?;

        let mut store = lock_store(store)?;
        store.set_identity(Some(identity.clone()));
        match profile {
            Some(profile) => {
                store.hydrate_profile(profile);
            }
            None => tracing::debug!(user_id = %identity.user_id, "no profile row, keeping local stats"),
        }
        let entries: Vec<(String, u8)> = open
            .into_iter()
            .map(|row| (row.challenge_id, row.progress))
            .collect();
        store.restore_active(&entries);
        Ok(())
    }

    /// Fetch reference data once and swap it into the store. Returns the
    /// community feed, which the store does not hold.
    pub async fn load_catalog(&self, scope: &ViewScope, store: &SharedStore) -> Result<Vec<CommunityPost>> {
        let (challenges, actions, posts) = scope
            .run(async {
                tokio::try_join!(
                    self.backend.list_challenges(),
                    self.backend.list_eco_actions(),
                    self.backend.list_community_posts(),
                )
            })
            .await?;
        tracing::debug!(
            challenges = challenges.len(),
            actions = actions.len(),
            posts = posts.len(),
            "catalog loaded"
        );
        lock_store(store)?.replace_catalog(actions, challenges);
        Ok(posts)
    }

    // -- Write-back --

    /// Save edited profile fields. On rejection the cause is logged and a
    /// generic error returned; the caller keeps the edit for a retry.
    pub async fn save_profile(
        &self,
        scope: &ViewScope,
        store: &SharedStore,
        identity: &Identity,
        edit: &ProfileEdit,
    ) -> Result<UserProfile> {
        let update = ProfileUpdate::from(edit);
        let profile = match scope
            .run(self.backend.update_profile(identity, &update))
            .await
        {
            Ok(profile) => profile,
            Err(EcoError::Cancelled) => return Err(EcoError::Cancelled),
            Err(e) => {
                tracing::warn!(user_id = %identity.user_id, "profile update failed: {e}");
                return Err(EcoError::Backend("failed to update profile".to_string()));
            }
        };
        lock_store(store)?.cache_profile(profile.clone());
        Ok(profile)
    }

    /// Write the counters in `stats` to the user's row. Failures are logged.
    pub async fn push_stats(&self, scope: &ViewScope, identity: &Identity, stats: &UserStats) -> Result<()> {
        let update = ProfileUpdate::from(stats);
        scope
            .run(self.backend.update_profile(identity, &update))
            .await
            .map(|_| ())
            .inspect_err(|e| log_write_failure("stats", e))
    }

    pub async fn record_join(&self, scope: &ViewScope, identity: &Identity, challenge_id: &str) -> Result<()> {
        let row = UserChallengeRow::joined(&identity.user_id, challenge_id);
        scope
            .run(self.backend.insert_user_challenge(identity, &row))
            .await
            .inspect_err(|e| log_write_failure("join", e))
    }

    pub async fn record_completion(
        &self,
        scope: &ViewScope,
        identity: &Identity,
        challenge_id: &str,
    ) -> Result<()> {
        let update = UserChallengeUpdate {
            progress: Some(100),
            completed: Some(true),
        };
        scope
            .run(self.backend.update_user_challenge(identity, challenge_id, &update))
            .await
            .inspect_err(|e| log_write_failure("completion", e))
    }

    pub async fn record_progress(
        &self,
        scope: &ViewScope,
        identity: &Identity,
        challenge_id: &str,
        progress: u8,
    ) -> Result<()> {
        let update = UserChallengeUpdate {
            progress: Some(progress.min(100)),
            completed: None,
        };
        scope
            .run(self.backend.update_user_challenge(identity, challenge_id, &update))
            .await
            .inspect_err(|e| log_write_failure("progress", e))
    }

    // -- Store operations with write-back --
    //
    // Each applies the change locally first, then mirrors it to the backend
    // while signed in. Mirror failures are logged and do not undo the change.

    pub async fn update_user_stats(
        &self,
        scope: &ViewScope,
        store: &SharedStore,
        patch: &UserStatsPatch,
    ) -> Result<UserStats> {
        let (stats, identity) = {
            let mut store = lock_store(store)?;
            let stats = store.update_user_stats(patch).clone();
            (stats, store.identity().cloned())
        };
        if let Some(identity) = identity {
            let _ = self.push_stats(scope, &identity, &stats).await;
        }
        Ok(stats)
    }

    pub async fn join_challenge(&self, scope: &ViewScope, store: &SharedStore, id: &str) -> Result<bool> {
        let (changed, identity) = {
            let mut store = lock_store(store)?;
            (store.join_challenge(id), store.identity().cloned())
        };
        if let (true, Some(identity)) = (changed, identity) {
            let _ = self.record_join(scope, &identity, id).await;
        }
        Ok(changed)
    }

    pub async fn complete_challenge(
        &self,
        scope: &ViewScope,
        store: &SharedStore,
        id: &str,
    ) -> Result<Completion> {
        let (completion, identity) = {
            let mut store = lock_store(store)?;
            (store.complete_challenge(id), store.identity().cloned())
        };
        if let Some(identity) = identity {
            if completion.was_active {
                let _ = self.record_completion(scope, &identity, id).await;
            }
            if completion.rewarded {
                let _ = self.push_stats(scope, &identity, &completion.stats).await;
            }
        }
        Ok(completion)
    }

    pub async fn set_progress(
        &self,
        scope: &ViewScope,
        store: &SharedStore,
        id: &str,
        progress: u8,
    ) -> Result<bool> {
        let (changed, identity) = {
            let mut store = lock_store(store)?;
            (store.set_progress(id, progress), store.identity().cloned())
        };
        if let (true, Some(identity)) = (changed, identity) {
            let _ = self.record_progress(scope, &identity, id, progress).await;
        }
        Ok(changed)
    }
}

fn require_credentials(email: &str, password: &str) -> Result<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(EcoError::InvalidInput(
            "email and password are required".to_string(),
        ));
    }
    Ok(())
}

fn log_write_failure(what: &str, e: &EcoError) {
    if !matches!(e, EcoError::Cancelled) {
        tracing::warn!("failed to sync {what}: {e}");
    }
}
