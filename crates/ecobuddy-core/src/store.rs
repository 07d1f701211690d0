use crate::local::{LocalKv, STATS_KEY};
use crate::model::*;

/// What `complete_challenge` does when the id was never joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionPolicy {
    /// Reward every call, joined or not.
    #[default]
    RewardAlways,
    /// Reward only ids that were in the active set.
    RequireActive,
}

/// Where a view should go after a store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    SignIn,
}

impl Navigation {
    pub fn path(&self) -> &'static str {
        match self {
            Self::SignIn => "/auth",
        }
    }
}

/// Outcome of `complete_challenge`.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub was_active: bool,
    pub rewarded: bool,
    pub stats: UserStats,
}

/// The application state container.
///
/// Owned by the view layer and handed to screens explicitly. All mutation
/// goes through the methods below; every stats change is mirrored to the
/// local key-value store under [`STATS_KEY`].
pub struct AppStore {
    stats: UserStats,
    catalog: Catalog,
    active: Vec<Challenge>,
    dark_mode: bool,
    identity: Option<Identity>,
    profile: Option<UserProfile>,
    policy: CompletionPolicy,
    kv: LocalKv,
}

impl AppStore {
    /// Build a store over `catalog`, reading the stats mirror once.
    /// A missing or unreadable mirror yields default stats.
    pub fn new(catalog: Catalog, kv: LocalKv) -> Self {
        let stats = match kv.get::<UserStats>(STATS_KEY) {
            Ok(Some(stats)) => stats,
            Ok(None) => UserStats::default(),
            Err(e) => {
                tracing::warn!("ignoring unreadable stats mirror: {e}");
                UserStats::default()
            }
        };

        let store = Self {
            stats,
            catalog,
            active: Vec::new(),
            dark_mode: false,
            identity: None,
            profile: None,
            policy: CompletionPolicy::default(),
            kv,
        };
        store.persist_stats();
        store
    }

    pub fn with_policy(mut self, policy: CompletionPolicy) -> Self {
        self.policy = policy;
        self
    }

    // -- Reads --

    pub fn stats(&self) -> &UserStats {
        &self.stats
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn eco_actions(&self) -> &[EcoAction] {
        &self.catalog.actions
    }

    pub fn eco_tips(&self) -> &[EcoTip] {
        &self.catalog.tips
    }

    pub fn challenges(&self) -> &[Challenge] {
        &self.catalog.challenges
    }

    pub fn active_challenges(&self) -> &[Challenge] {
        &self.active
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.iter().any(|c| c.id == id)
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Cached profile row. `None` while signed out or before the first fetch.
    pub fn profile(&self) -> Option<&UserProfile> {
        self.identity.as_ref().and(self.profile.as_ref())
    }

    pub fn policy(&self) -> CompletionPolicy {
        self.policy
    }

    // -- Mutations --

    pub fn update_user_stats(&mut self, patch: &UserStatsPatch) -> &UserStats {
        self.stats.apply(patch);
        self.persist_stats();
        &self.stats
    }

    /// Add a catalog challenge to the active set with zero progress.
    /// Unknown and already-active ids are ignored. Returns whether the set changed.
    pub fn join_challenge(&mut self, id: &str) -> bool {
        if self.is_active(id) {
            return false;
        }
        let Some(challenge) = self.catalog.challenge(id) else {
            tracing::debug!(challenge_id = id, "join ignored: unknown challenge");
            return false;
        };
        self.active.push(challenge.joined());
        true
    }

    /// Drop `id` from the active set and grant the completion reward.
    ///
    /// Under [`CompletionPolicy::RewardAlways`] the reward is granted even if
    /// `id` was never joined.
    pub fn complete_challenge(&mut self, id: &str) -> Completion {
        let before = self.active.len();
        self.active.retain(|c| c.id != id);
        let was_active = self.active.len() != before;

        let rewarded = was_active || self.policy == CompletionPolicy::RewardAlways;
        if rewarded {
            let reward = self.stats.completion_reward();
            self.update_user_stats(&reward);
        } else {
            tracing::debug!(challenge_id = id, "completion not rewarded: challenge not active");
        }

        Completion {
            was_active,
            rewarded,
            stats: self.stats.clone(),
        }
    }

    /// Set progress on an active challenge, clamped to 0-100.
    /// Returns false for ids that are not active.
    pub fn set_progress(&mut self, id: &str, progress: u8) -> bool {
        match self.active.iter_mut().find(|c| c.id == id) {
            Some(challenge) => {
                challenge.progress = Some(progress.min(100));
                true
            }
            None => false,
        }
    }

    pub fn toggle_dark_mode(&mut self) -> bool {
        self.dark_mode = !self.dark_mode;
        self.dark_mode
    }

    /// Forget the session, its cached profile and its active challenges.
    pub fn sign_out(&mut self) -> Navigation {
        if let Some(ref identity) = self.identity {
            tracing::info!(user_id = %identity.user_id, "signed out");
        }
        self.identity = None;
        self.profile = None;
        self.active.clear();
        Navigation::SignIn
    }

    /// Record a session change. Returns whether the signed-in user changed.
    ///
    /// A cached profile belonging to someone else is dropped. Leaving a
    /// signed-in user also drops the active set, which belongs to that user;
    /// challenges joined while signed out carry over into the first sign-in.
    pub fn set_identity(&mut self, identity: Option<Identity>) -> bool {
        let old_user = self.identity.as_ref().map(|i| i.user_id.clone());
        let new_user = identity.as_ref().map(|i| i.user_id.clone());
        let changed = old_user != new_user;

        if new_user.is_none() || self.profile.as_ref().map(|p| &p.id) != new_user.as_ref() {
            self.profile = None;
        }
        if changed && old_user.is_some() {
            tracing::debug!(dropped = self.active.len(), "session changed, clearing active challenges");
            self.active.clear();
        }

        self.identity = identity;
        changed
    }

    /// Cache a fetched profile row and copy its counters into the stats.
    /// Rows for a user other than the signed-in one are dropped.
    pub fn hydrate_profile(&mut self, profile: UserProfile) -> bool {
        if !self.cache_profile(profile) {
            return false;
        }
        if let Some(ref p) = self.profile {
            let patch = UserStatsPatch {
                sustainability_score: Some(p.sustainability_score),
                completed_challenges: Some(p.completed_challenges),
                streak: Some(p.streak),
                ..Default::default()
            };
            self.update_user_stats(&patch);
        }
        true
    }

    /// Cache a profile row without touching the stats (e.g. after a save).
    pub fn cache_profile(&mut self, profile: UserProfile) -> bool {
        match self.identity {
            Some(ref identity) if identity.user_id == profile.id => {
                self.profile = Some(profile);
                true
            }
            _ => {
                tracing::warn!(profile_id = %profile.id, "dropping profile for inactive session");
                false
            }
        }
    }

    /// Rebuild the active set from persisted `(challenge_id, progress)` pairs.
    pub fn restore_active(&mut self, entries: &[(String, u8)]) {
        for (id, progress) in entries {
            if self.join_challenge(id) {
                self.set_progress(id, *progress);
            }
        }
    }

    /// Swap in backend-loaded reference data. Empty lists keep the current data.
    pub fn replace_catalog(&mut self, actions: Vec<EcoAction>, challenges: Vec<Challenge>) {
        if !actions.is_empty() {
            self.catalog.actions = actions;
        }
        if !challenges.is_empty() {
            self.catalog.challenges = challenges;
        }
    }

    fn persist_stats(&self) {
        if let Err(e) = self.kv.set(STATS_KEY, &self.stats) {
            tracing::warn!("failed to mirror stats locally: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    fn store() -> AppStore {
        AppStore::new(seed::catalog(), LocalKv::open_in_memory().unwrap())
    }

    fn identity(user_id: &str) -> Identity {
        Identity {
            user_id: user_id.to_string(),
            email: format!("{user_id}@example.com"),
            access_token: "token".to_string(),
        }
    }

    fn active_ids(store: &AppStore) -> Vec<&str> {
        store
            .active_challenges()
            .iter()
            .map(|c| c.id.as_str())
            .collect()
    }

    #[test]
    fn test_new_store_uses_default_stats() {
        let store = store();
        assert_eq!(store.stats(), &UserStats::default());
        assert!(store.active_challenges().is_empty());
        assert!(!store.dark_mode());
        assert!(store.identity().is_none());
    }

    #[test]
    fn test_update_user_stats_merges() {
        let mut store = store();
        let patch = UserStatsPatch {
            water_usage: Some(250.0),
            streak: Some(3),
            ..Default::default()
        };
        let stats = store.update_user_stats(&patch).clone();
        assert_eq!(stats.water_usage, 250.0);
        assert_eq!(stats.streak, 3);
        assert_eq!(stats.carbon_footprint, 12.5);
        assert_eq!(stats.sustainability_score, 65);
    }

    #[test]
    fn test_update_user_stats_no_range_validation() {
        let mut store = store();
        let patch = UserStatsPatch {
            sustainability_score: Some(250),
            ..Default::default()
        };
        assert_eq!(store.update_user_stats(&patch).sustainability_score, 250);
    }

    #[test]
    fn test_stats_mirror_survives_reconstruction() {
        let kv = LocalKv::open_in_memory().unwrap();
        {
            let mut store = AppStore::new(seed::catalog(), kv.clone());
            store.update_user_stats(&UserStatsPatch {
                energy_saved: Some(999.0),
                ..Default::default()
            });
        }
        let store = AppStore::new(seed::catalog(), kv);
        assert_eq!(store.stats().energy_saved, 999.0);
    }

    #[test]
    fn test_corrupt_mirror_falls_back_to_defaults() {
        let kv = LocalKv::open_in_memory().unwrap();
        kv.set_raw(STATS_KEY, "garbage").unwrap();
        let store = AppStore::new(seed::catalog(), kv.clone());
        assert_eq!(store.stats(), &UserStats::default());
        // the defaults overwrite the bad value
        let stats: Option<UserStats> = kv.get(STATS_KEY).unwrap();
        assert_eq!(stats, Some(UserStats::default()));
    }

    #[test]
    fn test_join_challenge_sets_zero_progress() {
        let mut store = store();
        assert!(store.join_challenge("2"));
        let active = store.active_challenges();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "2");
        assert_eq!(active[0].progress, Some(0));
        // catalog copy untouched
        assert!(store.catalog().challenge("2").unwrap().progress.is_none());
    }

    #[test]
    fn test_join_unknown_challenge_ignored() {
        let mut store = store();
        assert!(!store.join_challenge("does-not-exist"));
        assert!(store.active_challenges().is_empty());
    }

    #[test]
    fn test_join_twice_is_noop() {
        let mut store = store();
        assert!(store.join_challenge("1"));
        assert!(!store.join_challenge("1"));
        assert_eq!(active_ids(&store), vec!["1"]);
    }

    #[test]
    fn test_random_join_sequences_never_duplicate() {
        let ids = ["1", "2", "3", "4", "5", "x"];
        for seed in 0..50u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut store = store();
            for _ in 0..40 {
                let id = ids[rng.gen_range(0..ids.len())];
                store.join_challenge(id);
            }
            let active = active_ids(&store);
            let unique: HashSet<_> = active.iter().collect();
            assert_eq!(unique.len(), active.len(), "duplicate with seed {seed}");
            assert!(!active.contains(&"x"));
        }
    }

    #[test]
    fn test_join_then_complete_meatless_monday() {
        let mut store = store();
        store.join_challenge("2");
        assert_eq!(active_ids(&store), vec!["2"]);

        let completion = store.complete_challenge("2");
        assert!(completion.was_active);
        assert!(completion.rewarded);
        assert!(store.active_challenges().is_empty());
        assert_eq!(completion.stats.completed_challenges, 1);
        assert_eq!(completion.stats.streak, 1);
        assert_eq!(completion.stats.sustainability_score, 70);
    }

    #[test]
    fn test_complete_twice_rewards_each_call() {
        let mut store = store();
        store.join_challenge("3");
        store.complete_challenge("3");
        let second = store.complete_challenge("3");
        assert!(!second.was_active);
        assert!(store.active_challenges().is_empty());
        assert_eq!(second.stats.completed_challenges, 2);
        assert_eq!(second.stats.streak, 2);
        assert_eq!(second.stats.sustainability_score, 75);
    }

    #[test]
    fn test_complete_inactive_rewarded_by_default() {
        let mut store = store();
        let completion = store.complete_challenge("4");
        assert!(!completion.was_active);
        assert!(completion.rewarded);
        assert_eq!(store.stats().completed_challenges, 1);
    }

    #[test]
    fn test_complete_inactive_not_rewarded_when_required_active() {
        let mut store = store().with_policy(CompletionPolicy::RequireActive);
        let completion = store.complete_challenge("4");
        assert!(!completion.rewarded);
        assert_eq!(store.stats(), &UserStats::default());

        store.join_challenge("4");
        let completion = store.complete_challenge("4");
        assert!(completion.rewarded);
        assert_eq!(completion.stats.streak, 1);
    }

    #[test]
    fn test_complete_only_removes_target() {
        let mut store = store();
        store.join_challenge("1");
        store.join_challenge("2");
        store.complete_challenge("1");
        assert_eq!(active_ids(&store), vec!["2"]);
    }

    #[test]
    fn test_completion_is_mirrored() {
        let kv = LocalKv::open_in_memory().unwrap();
        let mut store = AppStore::new(seed::catalog(), kv.clone());
        store.complete_challenge("1");
        let stats: UserStats = kv.get(STATS_KEY).unwrap().unwrap();
        assert_eq!(stats.completed_challenges, 1);
    }

    #[test]
    fn test_toggle_dark_mode_twice_restores() {
        let mut store = store();
        let original = store.dark_mode();
        assert_eq!(store.toggle_dark_mode(), !original);
        assert_eq!(store.toggle_dark_mode(), original);
    }

    #[test]
    fn test_set_progress_clamps_and_ignores_inactive() {
        let mut store = store();
        assert!(!store.set_progress("1", 50));
        store.join_challenge("1");
        assert!(store.set_progress("1", 250));
        assert_eq!(store.active_challenges()[0].progress, Some(100));
    }

    #[test]
    fn test_sign_out_clears_identity_and_profile() {
        let mut store = store();
        store.set_identity(Some(identity("u1")));
        assert!(store.hydrate_profile(UserProfile::new(
            "u1".into(),
            "u1@example.com".into(),
            "Alex".into()
        )));
        assert!(store.profile().is_some());

        let nav = store.sign_out();
        assert_eq!(nav, Navigation::SignIn);
        assert_eq!(nav.path(), "/auth");
        assert!(store.identity().is_none());
        assert!(store.profile().is_none());

        // still none after a stray row arrives for the old session
        assert!(!store.hydrate_profile(UserProfile::new(
            "u1".into(),
            "u1@example.com".into(),
            "Alex".into()
        )));
        assert!(store.profile().is_none());
    }

    #[test]
    fn test_hydrate_profile_copies_counters() {
        let mut store = store();
        store.set_identity(Some(identity("u1")));
        let mut profile = UserProfile::new("u1".into(), "u1@example.com".into(), "Alex".into());
        profile.sustainability_score = 42;
        profile.completed_challenges = 7;
        profile.streak = 3;
        store.hydrate_profile(profile);

        let stats = store.stats();
        assert_eq!(stats.sustainability_score, 42);
        assert_eq!(stats.completed_challenges, 7);
        assert_eq!(stats.streak, 3);
        // gauges untouched
        assert_eq!(stats.water_usage, 320.0);
    }

    #[test]
    fn test_hydrate_profile_for_other_user_dropped() {
        let mut store = store();
        store.set_identity(Some(identity("u1")));
        let profile = UserProfile::new("u2".into(), "u2@example.com".into(), "Sam".into());
        assert!(!store.hydrate_profile(profile));
        assert!(store.profile().is_none());
        assert_eq!(store.stats(), &UserStats::default());
    }

    #[test]
    fn test_set_identity_change_drops_profile() {
        let mut store = store();
        store.set_identity(Some(identity("u1")));
        store.hydrate_profile(UserProfile::new(
            "u1".into(),
            "u1@example.com".into(),
            "Alex".into(),
        ));
        assert!(!store.set_identity(Some(identity("u1"))));
        assert!(store.profile().is_some());

        assert!(store.set_identity(Some(identity("u2"))));
        assert!(store.profile().is_none());
    }

    #[test]
    fn test_sign_out_clears_active_challenges() {
        let mut store = store();
        store.set_identity(Some(identity("u1")));
        store.join_challenge("1");
        store.sign_out();
        assert!(store.active_challenges().is_empty());

        // the next user starts from their own rows only
        store.set_identity(Some(identity("u2")));
        store.restore_active(&[("3".to_string(), 20)]);
        assert_eq!(active_ids(&store), vec!["3"]);
    }

    #[test]
    fn test_switching_users_clears_active_challenges() {
        let mut store = store();
        store.set_identity(Some(identity("u1")));
        store.join_challenge("1");
        store.join_challenge("2");

        // same user again keeps the set
        assert!(!store.set_identity(Some(identity("u1"))));
        assert_eq!(active_ids(&store), vec!["1", "2"]);

        assert!(store.set_identity(Some(identity("u2"))));
        assert!(store.active_challenges().is_empty());

        store.join_challenge("4");
        assert!(store.set_identity(None));
        assert!(store.active_challenges().is_empty());
    }

    #[test]
    fn test_signed_out_joins_carry_into_sign_in() {
        let mut store = store();
        store.join_challenge("2");
        assert!(store.set_identity(Some(identity("u1"))));
        assert_eq!(active_ids(&store), vec!["2"]);
    }

    #[test]
    fn test_restore_active_dedups() {
        let mut store = store();
        store.restore_active(&[
            ("1".to_string(), 30),
            ("1".to_string(), 90),
            ("9".to_string(), 10),
        ]);
        assert_eq!(active_ids(&store), vec!["1"]);
        assert_eq!(store.active_challenges()[0].progress, Some(30));
    }

    #[test]
    fn test_replace_catalog_keeps_seed_on_empty() {
        let mut store = store();
        store.replace_catalog(Vec::new(), Vec::new());
        assert_eq!(store.challenges().len(), 4);

        let mut only = seed::challenges();
        only.truncate(1);
        store.replace_catalog(Vec::new(), only);
        assert_eq!(store.challenges().len(), 1);
        assert_eq!(store.eco_actions().len(), 6);
    }
}
