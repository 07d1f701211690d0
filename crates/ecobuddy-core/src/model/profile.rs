use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated-user handle. Drives which profile row is fetched.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub access_token: String,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// A `users` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub sustainability_score: i64,
    #[serde(default)]
    pub completed_challenges: u32,
    #[serde(default)]
    pub streak: u32,
}

impl UserProfile {
    /// Fresh row written right after sign-up.
    pub fn new(id: String, email: String, name: String) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            email,
            name,
            avatar_url: None,
            location: None,
            bio: None,
            sustainability_score: 0,
            completed_challenges: 0,
            streak: 0,
        }
    }

    pub fn apply(&mut self, edit: &ProfileEdit) {
        if let Some(ref name) = edit.name {
            self.name = name.clone();
        }
        if let Some(ref bio) = edit.bio {
            self.bio = Some(bio.clone());
        }
        if let Some(ref location) = edit.location {
            self.location = Some(location.clone());
        }
        if let Some(ref avatar_url) = edit.avatar_url {
            self.avatar_url = Some(avatar_url.clone());
        }
    }
}

/// Fields the settings screen lets the user change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileEdit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl ProfileEdit {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
